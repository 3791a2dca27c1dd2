//! Seeded lossy link
//!
//! Bernoulli frame drop decision with a deterministic generator, so a trace
//! run is reproducible from its seed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Link dropping each frame independently with a fixed probability
pub struct LossyLink {
    rng: SmallRng,
    loss_rate: f64,
    frames_passed: u64,
    frames_dropped: u64,
}

impl LossyLink {
    /// Create a link with the given loss probability, clamped to [0, 1]
    pub fn new(loss_rate: f64, seed: u64) -> Self {
        LossyLink {
            rng: SmallRng::seed_from_u64(seed),
            loss_rate: loss_rate.clamp(0.0, 1.0),
            frames_passed: 0,
            frames_dropped: 0,
        }
    }

    /// Decide the fate of one frame; true means it crosses the link
    pub fn passes(&mut self) -> bool {
        let passed = self.rng.gen_bool(1.0 - self.loss_rate);
        if passed {
            self.frames_passed += 1;
        } else {
            self.frames_dropped += 1;
        }
        passed
    }

    /// Frames that crossed the link
    pub fn frames_passed(&self) -> u64 {
        self.frames_passed
    }

    /// Frames dropped by the link
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }
}
