//! Thread-safe agreement handles
//!
//! The protocol core requires callers to serialize operations per agreement.
//! For callers that drive an agreement from more than one thread, these
//! handles supply that discipline: a mutex around the originator side, and a
//! recipient wrapper that pushes in-order deliveries into a channel instead
//! of holding a reference back into the upper layer.

use blockack_protocol::bitmap::{BitmapLength, BlockAckBitmap, CompressedBlockAck};
use blockack_protocol::reorder::{Mpdu, RecipientAgreement};
use blockack_protocol::sequence::SeqNumber;
use blockack_protocol::window::OriginatorAgreement;
use blockack_protocol::{AgreementError, MacAddress, OriginatorStats, RecipientStats};
use bytes::Bytes;
use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Cloneable, mutex-guarded handle to an originator agreement
#[derive(Clone)]
pub struct SharedOriginator {
    inner: Arc<Mutex<OriginatorAgreement>>,
}

impl SharedOriginator {
    /// Create a new originator agreement behind a mutex
    pub fn new(
        peer: MacAddress,
        tid: u8,
        buffer_size: u16,
        starting_seq: SeqNumber,
    ) -> Result<Self, AgreementError> {
        let agreement = OriginatorAgreement::new(peer, tid, buffer_size, starting_seq)?;
        Ok(SharedOriginator {
            inner: Arc::new(Mutex::new(agreement)),
        })
    }

    /// Record a transmission
    pub fn notify_transmitted(&self, seq: SeqNumber) {
        self.inner.lock().notify_transmitted(seq);
    }

    /// Record an acknowledgment
    pub fn notify_acked(&self, seq: SeqNumber) {
        self.inner.lock().notify_acked(seq);
    }

    /// Record a retry-limit discard
    pub fn notify_discarded(&self, seq: SeqNumber) {
        self.inner.lock().notify_discarded(seq);
    }

    /// Apply a decoded Block Ack bitmap; returns the newly settled count
    pub fn apply_block_ack(&self, start: SeqNumber, bitmap: &BlockAckBitmap) -> u16 {
        self.inner.lock().apply_block_ack(start, bitmap)
    }

    /// Whether `seq` is still awaiting acknowledgment
    pub fn is_outstanding(&self, seq: SeqNumber) -> bool {
        self.inner.lock().is_outstanding(seq)
    }

    /// Current window head
    pub fn head_sequence(&self) -> SeqNumber {
        self.inner.lock().head_sequence()
    }

    /// Pending sequence numbers, oldest first
    pub fn outstanding(&self) -> Vec<SeqNumber> {
        self.inner.lock().outstanding().collect()
    }

    /// Snapshot of the agreement statistics
    pub fn stats(&self) -> OriginatorStats {
        self.inner.lock().stats().clone()
    }
}

/// Recipient agreement delivering through a channel
///
/// Each MPDU that becomes deliverable is sent into an unbounded channel in
/// order; the upper layer drains the receiving end at its own pace.
pub struct ChannelRecipient {
    inner: Mutex<RecipientAgreement>,
    delivery: Sender<Mpdu>,
}

impl ChannelRecipient {
    /// Create a recipient agreement plus the delivery receiver
    pub fn new(
        peer: MacAddress,
        tid: u8,
        buffer_size: u16,
        starting_seq: SeqNumber,
    ) -> Result<(Self, Receiver<Mpdu>), AgreementError> {
        let agreement = RecipientAgreement::new(peer, tid, buffer_size, starting_seq)?;
        let (tx, rx) = unbounded();
        Ok((
            ChannelRecipient {
                inner: Mutex::new(agreement),
                delivery: tx,
            },
            rx,
        ))
    }

    /// Process a received MPDU; deliveries go into the channel
    ///
    /// Returns the number of MPDUs delivered by this call.
    pub fn notify_received(&self, seq: SeqNumber, payload: Bytes) -> usize {
        let delivered = self.inner.lock().notify_received(seq, payload);
        self.forward(delivered)
    }

    /// Process a Block Ack Request; deliveries go into the channel
    pub fn notify_bar_received(&self, start: SeqNumber) -> usize {
        let delivered = self.inner.lock().notify_bar_received(start);
        self.forward(delivered)
    }

    /// Build the Block Ack response for the current reception state
    pub fn make_block_ack(&self, len: BitmapLength) -> CompressedBlockAck {
        self.inner.lock().make_block_ack(len)
    }

    /// Next sequence number expected for delivery
    pub fn start_sequence(&self) -> SeqNumber {
        self.inner.lock().start_sequence()
    }

    /// Snapshot of the agreement statistics
    pub fn stats(&self) -> RecipientStats {
        self.inner.lock().stats().clone()
    }

    fn forward(&self, delivered: Vec<Mpdu>) -> usize {
        let count = delivered.len();
        for mpdu in delivered {
            if self.delivery.send(mpdu).is_err() {
                warn!("Upper layer dropped the delivery channel");
                break;
            }
        }
        count
    }
}
