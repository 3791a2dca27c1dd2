//! Originator-side transmit window
//!
//! The originator tracks each outstanding MPDU of an agreement in a circular
//! window anchored at the oldest still-open sequence number. A Block Ack
//! bitmap only ever describes positions at or after the window head, so the
//! head must advance past settled entries as soon as they form a contiguous
//! run; otherwise every subsequent bitmap would re-describe settled history.

use crate::agreement::{
    validate_parameters, AgreementError, AgreementKey, MacAddress, OriginatorStats,
};
use crate::bitmap::BlockAckBitmap;
use crate::sequence::{SeqNumber, SEQ_SPACE_HALF_SIZE};
use tracing::{debug, trace};

/// Acknowledgment status of one window position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// No MPDU transmitted at this position yet
    Unused,
    /// Transmitted, acknowledgment outstanding
    Pending,
    /// Settled: acknowledged, or passed over by a discard
    Acked,
}

/// Circular record of acknowledgment status, anchored at a head sequence
/// number
///
/// Index `i` corresponds to the MPDU with sequence number `head + i`.
#[derive(Debug, Clone)]
pub struct TransmitWindow {
    slots: Vec<SlotStatus>,
    head_pos: usize,
    head_seq: SeqNumber,
}

impl TransmitWindow {
    /// Create a cleared window of `capacity` slots anchored at `start`
    pub fn new(capacity: usize, start: SeqNumber) -> Self {
        TransmitWindow {
            slots: vec![SlotStatus::Unused; capacity],
            head_pos: 0,
            head_seq: start,
        }
    }

    /// Number of slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Sequence number of the window head (index 0)
    #[inline]
    pub fn head_sequence(&self) -> SeqNumber {
        self.head_seq
    }

    /// Sequence number of the last window position
    #[inline]
    pub fn end_sequence(&self) -> SeqNumber {
        self.head_seq + (self.capacity() as u16 - 1)
    }

    #[inline]
    fn pos(&self, offset: usize) -> usize {
        (self.head_pos + offset) % self.capacity()
    }

    /// Status of the slot at `offset` from the head
    ///
    /// # Panics
    /// Panics if `offset` is outside the window
    pub fn status_at(&self, offset: usize) -> SlotStatus {
        assert!(
            offset < self.capacity(),
            "Offset {} outside window of {} slots",
            offset,
            self.capacity()
        );
        self.slots[self.pos(offset)]
    }

    pub(crate) fn set_status(&mut self, offset: usize, status: SlotStatus) {
        let pos = self.pos(offset);
        self.slots[pos] = status;
    }

    /// Advance the head by `count` positions, clearing each advanced slot
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            self.slots[self.head_pos] = SlotStatus::Unused;
            self.head_pos = (self.head_pos + 1) % self.capacity();
            self.head_seq.increment();
        }
    }

    /// Set a bit in `bitmap` for every settled position the bitmap covers
    ///
    /// Positions beyond the window capacity are left 0.
    pub fn fill_bitmap(&self, bitmap: &mut BlockAckBitmap) {
        let positions = bitmap.len().bits().min(self.capacity());
        for offset in 0..positions {
            if self.status_at(offset) == SlotStatus::Acked {
                bitmap.set(offset);
            }
        }
    }
}

/// Originator side of one Block Ack agreement
///
/// Owns the transmit window and executes the protocol transitions driven by
/// the external channel-access collaborator: MPDU transmitted, MPDU
/// acknowledged (one call per set bitmap bit), MPDU discarded at the retry
/// limit. Construction validates the negotiated parameters, so every live
/// agreement has an initialized window.
#[derive(Debug)]
pub struct OriginatorAgreement {
    key: AgreementKey,
    buffer_size: u16,
    starting_seq: SeqNumber,
    window: TransmitWindow,
    stats: OriginatorStats,
}

impl OriginatorAgreement {
    /// Create an agreement with a cleared window
    pub fn new(
        peer: MacAddress,
        tid: u8,
        buffer_size: u16,
        starting_seq: SeqNumber,
    ) -> Result<Self, AgreementError> {
        validate_parameters(buffer_size, tid)?;
        Ok(OriginatorAgreement {
            key: AgreementKey::new(peer, tid),
            buffer_size,
            starting_seq,
            window: TransmitWindow::new(buffer_size as usize, starting_seq),
            stats: OriginatorStats::default(),
        })
    }

    /// Re-initialize the window
    ///
    /// A no-op when called with the parameters the agreement already has;
    /// new parameters discard all window state.
    pub fn reinit(&mut self, buffer_size: u16, starting_seq: SeqNumber) -> Result<(), AgreementError> {
        if buffer_size == self.buffer_size && starting_seq == self.starting_seq {
            return Ok(());
        }
        validate_parameters(buffer_size, self.key.tid)?;
        debug!(
            agreement = %self.key,
            buffer_size,
            start = %starting_seq,
            "Re-initializing transmit window"
        );
        self.buffer_size = buffer_size;
        self.starting_seq = starting_seq;
        self.window = TransmitWindow::new(buffer_size as usize, starting_seq);
        Ok(())
    }

    /// Agreement key (peer address, traffic class)
    pub fn key(&self) -> AgreementKey {
        self.key
    }

    /// Negotiated window capacity
    pub fn buffer_size(&self) -> u16 {
        self.buffer_size
    }

    /// Record the transmission of the MPDU with sequence number `seq`
    ///
    /// A sequence number beyond the current window end displaces the head
    /// forward by exactly the overshoot, so `seq` becomes the new window
    /// end; every position pushed out is settled implicitly. A sequence
    /// number within the window causes no displacement. The MPDU's slot is
    /// marked pending unless it is already settled.
    pub fn notify_transmitted(&mut self, seq: SeqNumber) {
        let distance = seq.distance_from(self.window.head_sequence());
        if distance >= SEQ_SPACE_HALF_SIZE {
            trace!(agreement = %self.key, %seq, "Transmit behind window head, ignored");
            return;
        }

        let capacity = self.window.capacity();
        if distance as usize >= capacity {
            let shift = distance as usize - capacity + 1;
            for offset in 0..shift.min(capacity) {
                if self.window.status_at(offset) == SlotStatus::Pending {
                    self.stats.implicitly_settled += 1;
                }
            }
            debug!(
                agreement = %self.key,
                %seq,
                shift,
                head = %self.window.head_sequence(),
                "Transmit beyond window end, sliding window"
            );
            self.window.advance(shift);
        }

        let offset = seq.distance_from(self.window.head_sequence()) as usize;
        if self.window.status_at(offset) != SlotStatus::Acked {
            self.window.set_status(offset, SlotStatus::Pending);
        }
        trace!(agreement = %self.key, %seq, offset, "MPDU transmitted");
    }

    /// Record an acknowledgment for the MPDU with sequence number `seq`
    ///
    /// The head then advances past the contiguous settled run starting at
    /// index 0, leaving it on the oldest still-outstanding position.
    pub fn notify_acked(&mut self, seq: SeqNumber) {
        let distance = seq.distance_from(self.window.head_sequence());
        if distance as usize >= self.window.capacity() {
            trace!(agreement = %self.key, %seq, "Ack outside window, ignored");
            return;
        }

        self.window.set_status(distance as usize, SlotStatus::Acked);
        self.stats.mpdus_acked += 1;
        trace!(agreement = %self.key, %seq, "MPDU acknowledged");
        self.advance_past_settled();
    }

    /// Record that the retry-limit collaborator gave up on `seq`
    ///
    /// Same head advancement as an acknowledgment; the slot counts as
    /// passed over rather than acknowledged.
    pub fn notify_discarded(&mut self, seq: SeqNumber) {
        let distance = seq.distance_from(self.window.head_sequence());
        if distance as usize >= self.window.capacity() {
            trace!(agreement = %self.key, %seq, "Discard outside window, ignored");
            return;
        }

        self.window.set_status(distance as usize, SlotStatus::Acked);
        self.stats.mpdus_discarded += 1;
        debug!(agreement = %self.key, %seq, "MPDU discarded at retry limit");
        self.advance_past_settled();
    }

    /// Apply a decoded Block Ack bitmap anchored at `start`
    ///
    /// One acknowledgment per set bit. Returns the number of positions that
    /// were still open before this bitmap settled them.
    pub fn apply_block_ack(&mut self, start: SeqNumber, bitmap: &BlockAckBitmap) -> u16 {
        let mut newly_settled = 0;
        for position in bitmap.set_positions() {
            let seq = start + position as u16;
            let distance = seq.distance_from(self.window.head_sequence());
            if (distance as usize) < self.window.capacity()
                && self.window.status_at(distance as usize) != SlotStatus::Acked
            {
                newly_settled += 1;
            }
            self.notify_acked(seq);
        }
        newly_settled
    }

    /// Whether `seq` is in the window and awaiting acknowledgment
    pub fn is_outstanding(&self, seq: SeqNumber) -> bool {
        let distance = seq.distance_from(self.window.head_sequence());
        (distance as usize) < self.window.capacity()
            && self.window.status_at(distance as usize) == SlotStatus::Pending
    }

    /// Sequence number of the oldest position still tracked
    pub fn head_sequence(&self) -> SeqNumber {
        self.window.head_sequence()
    }

    /// Status of the window slot at `offset` from the head
    pub fn status_at(&self, offset: usize) -> SlotStatus {
        self.window.status_at(offset)
    }

    /// Read-only view of the transmit window
    pub fn window(&self) -> &TransmitWindow {
        &self.window
    }

    /// Iterate over the pending sequence numbers, oldest first
    pub fn outstanding(&self) -> impl Iterator<Item = SeqNumber> + '_ {
        let head = self.window.head_sequence();
        (0..self.window.capacity())
            .filter(|&offset| self.window.status_at(offset) == SlotStatus::Pending)
            .map(move |offset| head + offset as u16)
    }

    /// Agreement statistics
    pub fn stats(&self) -> &OriginatorStats {
        &self.stats
    }

    fn advance_past_settled(&mut self) {
        let mut run = 0;
        while run < self.window.capacity() && self.window.status_at(run) == SlotStatus::Acked {
            run += 1;
        }
        if run > 0 {
            self.window.advance(run);
            trace!(
                agreement = %self.key,
                advanced = run,
                head = %self.window.head_sequence(),
                "Window head advanced past settled run"
            );
        }
    }
}
