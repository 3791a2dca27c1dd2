//! Recipient-side reordering and reception record
//!
//! The recipient of an agreement keeps two circular structures: the reorder
//! buffer, holding out-of-order payloads until the in-order run at its head
//! can be handed to the upper layer, and the scoreboard, a bit-per-position
//! record of everything received that feeds outgoing Block Ack bitmaps. The
//! two advance independently: the reorder head is the delivery point and
//! only ever moves forward, while the scoreboard head trails the highest
//! received sequence number by the window size.

use crate::agreement::{
    validate_parameters, AgreementError, AgreementKey, MacAddress, RecipientStats,
};
use crate::bitmap::{BitmapLength, BlockAckBitmap, CompressedBlockAck};
use crate::sequence::{SeqControl, SeqNumber, SEQ_SPACE_HALF_SIZE};
use bytes::Bytes;
use tracing::{debug, trace};

/// One in-order data unit handed to the upper layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mpdu {
    /// Sequence number
    pub seq: SeqNumber,
    /// Payload bytes
    pub payload: Bytes,
}

/// Circular payload store anchored at the next sequence number expected for
/// in-order delivery
///
/// Index `i` corresponds to the MPDU expected at `start + i`; a vacant index
/// is a hole.
#[derive(Debug)]
pub struct ReorderBuffer {
    slots: Vec<Option<Bytes>>,
    head_pos: usize,
    start_seq: SeqNumber,
}

impl ReorderBuffer {
    /// Create an empty buffer of `capacity` slots anchored at `start`
    pub fn new(capacity: usize, start: SeqNumber) -> Self {
        ReorderBuffer {
            slots: vec![None; capacity],
            head_pos: 0,
            start_seq: start,
        }
    }

    /// Number of slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Next sequence number expected for delivery
    #[inline]
    pub fn start_sequence(&self) -> SeqNumber {
        self.start_seq
    }

    #[inline]
    fn pos(&self, offset: usize) -> usize {
        (self.head_pos + offset) % self.capacity()
    }

    /// Whether the slot at `offset` from the head holds a payload
    pub fn is_occupied(&self, offset: usize) -> bool {
        offset < self.capacity() && self.slots[self.pos(offset)].is_some()
    }

    /// Store a payload at `offset` from the head
    ///
    /// Returns true if a previously buffered payload was overwritten.
    pub fn store(&mut self, offset: usize, payload: Bytes) -> bool {
        let pos = self.pos(offset);
        self.slots[pos].replace(payload).is_some()
    }

    /// Remove the payload at the head, if any, and advance the delivery
    /// point by one position
    pub fn take_front(&mut self) -> Option<Bytes> {
        let payload = self.slots[self.head_pos].take();
        self.head_pos = (self.head_pos + 1) % self.capacity();
        self.start_seq.increment();
        payload
    }
}

/// Bit-per-position reception record feeding outgoing Block Ack bitmaps
#[derive(Debug)]
pub struct Scoreboard {
    bits: Vec<bool>,
    head_pos: usize,
    start_seq: SeqNumber,
}

impl Scoreboard {
    /// Create a cleared scoreboard of `capacity` positions anchored at
    /// `start`
    pub fn new(capacity: usize, start: SeqNumber) -> Self {
        Scoreboard {
            bits: vec![false; capacity],
            head_pos: 0,
            start_seq: start,
        }
    }

    /// Number of positions
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Sequence number of the scoreboard head
    #[inline]
    pub fn start_sequence(&self) -> SeqNumber {
        self.start_seq
    }

    #[inline]
    fn pos(&self, offset: usize) -> usize {
        (self.head_pos + offset) % self.capacity()
    }

    /// Record the reception of `seq`
    ///
    /// A sequence number beyond the window end slides the window forward so
    /// `seq` becomes the new end; one behind the window is ignored.
    pub fn mark_received(&mut self, seq: SeqNumber) {
        let distance = seq.distance_from(self.start_seq);
        if distance >= SEQ_SPACE_HALF_SIZE {
            return;
        }
        if distance as usize >= self.capacity() {
            self.advance(distance as usize - self.capacity() + 1);
        }
        let offset = seq.distance_from(self.start_seq) as usize;
        let pos = self.pos(offset);
        self.bits[pos] = true;
    }

    /// Reception status of `seq`
    ///
    /// Positions behind the window head were settled earlier and report
    /// true; positions beyond the window end report false.
    pub fn is_received(&self, seq: SeqNumber) -> bool {
        let distance = seq.distance_from(self.start_seq);
        if distance >= SEQ_SPACE_HALF_SIZE {
            return true;
        }
        if distance as usize >= self.capacity() {
            return false;
        }
        self.bits[self.pos(distance as usize)]
    }

    /// Advance the head by `count` positions, clearing each advanced bit
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            self.bits[self.head_pos] = false;
            self.head_pos = (self.head_pos + 1) % self.capacity();
            self.start_seq.increment();
        }
    }

    /// Advance the head to `seq` if it lies ahead of the current head
    pub fn advance_to(&mut self, seq: SeqNumber) {
        let distance = seq.distance_from(self.start_seq);
        if distance > 0 && distance < SEQ_SPACE_HALF_SIZE {
            self.advance(distance as usize);
        }
    }

    /// Set a bit in `bitmap` for every received position the bitmap covers
    ///
    /// Positions beyond the scoreboard capacity are left 0.
    pub fn fill_bitmap(&self, bitmap: &mut BlockAckBitmap) {
        let positions = bitmap.len().bits().min(self.capacity());
        for offset in 0..positions {
            if self.bits[self.pos(offset)] {
                bitmap.set(offset);
            }
        }
    }
}

/// Recipient side of one Block Ack agreement
///
/// Owns the reorder buffer, the scoreboard and the recipient statistics.
/// `notify_received` and `notify_bar_received` return the MPDUs that became
/// deliverable, strictly in sequence order; the caller forwards them to the
/// upper layer.
#[derive(Debug)]
pub struct RecipientAgreement {
    key: AgreementKey,
    buffer_size: u16,
    starting_seq: SeqNumber,
    buffer: ReorderBuffer,
    scoreboard: Scoreboard,
    stats: RecipientStats,
}

impl RecipientAgreement {
    /// Create an agreement with an empty buffer and cleared scoreboard
    pub fn new(
        peer: MacAddress,
        tid: u8,
        buffer_size: u16,
        starting_seq: SeqNumber,
    ) -> Result<Self, AgreementError> {
        validate_parameters(buffer_size, tid)?;
        Ok(RecipientAgreement {
            key: AgreementKey::new(peer, tid),
            buffer_size,
            starting_seq,
            buffer: ReorderBuffer::new(buffer_size as usize, starting_seq),
            scoreboard: Scoreboard::new(buffer_size as usize, starting_seq),
            stats: RecipientStats::default(),
        })
    }

    /// Re-initialize the buffer and scoreboard
    ///
    /// A no-op when called with the parameters the agreement already has;
    /// new parameters discard all buffered state.
    pub fn reinit(&mut self, buffer_size: u16, starting_seq: SeqNumber) -> Result<(), AgreementError> {
        if buffer_size == self.buffer_size && starting_seq == self.starting_seq {
            return Ok(());
        }
        validate_parameters(buffer_size, self.key.tid)?;
        debug!(
            agreement = %self.key,
            buffer_size,
            start = %starting_seq,
            "Re-initializing reorder buffer"
        );
        self.buffer_size = buffer_size;
        self.starting_seq = starting_seq;
        self.buffer = ReorderBuffer::new(buffer_size as usize, starting_seq);
        self.scoreboard = Scoreboard::new(buffer_size as usize, starting_seq);
        Ok(())
    }

    /// Agreement key (peer address, traffic class)
    pub fn key(&self) -> AgreementKey {
        self.key
    }

    /// Negotiated buffer capacity
    pub fn buffer_size(&self) -> u16 {
        self.buffer_size
    }

    /// Process a received MPDU
    ///
    /// Returns the MPDUs that became deliverable in order, possibly none.
    /// A stale retransmission (old half of the space relative to the
    /// delivery point) is dropped. A sequence number beyond the window end
    /// slides the window forward, force-delivering buffered positions that
    /// fall out and abandoning un-received ones as permanent holes. A
    /// duplicate of a buffered MPDU overwrites the payload without a second
    /// delivery.
    pub fn notify_received(&mut self, seq: SeqNumber, payload: Bytes) -> Vec<Mpdu> {
        self.scoreboard.mark_received(seq);

        let distance = seq.distance_from(self.buffer.start_sequence());
        if distance >= SEQ_SPACE_HALF_SIZE {
            self.stats.stale_dropped += 1;
            trace!(agreement = %self.key, %seq, "Stale retransmission dropped");
            return Vec::new();
        }

        let mut delivered = Vec::new();
        let capacity = self.buffer.capacity();
        if distance as usize >= capacity {
            let shift = distance as usize - capacity + 1;
            debug!(
                agreement = %self.key,
                %seq,
                shift,
                start = %self.buffer.start_sequence(),
                "Reception beyond window end, sliding window"
            );
            for _ in 0..shift {
                let head_seq = self.buffer.start_sequence();
                match self.buffer.take_front() {
                    Some(payload) => delivered.push(Mpdu {
                        seq: head_seq,
                        payload,
                    }),
                    None => self.stats.holes_abandoned += 1,
                }
            }
        }

        let offset = seq.distance_from(self.buffer.start_sequence()) as usize;
        if self.buffer.store(offset, payload) {
            self.stats.duplicates_overwritten += 1;
            trace!(agreement = %self.key, %seq, "Duplicate reception overwrote buffered payload");
        }

        self.drain_in_order(&mut delivered);
        self.stats.mpdus_delivered += delivered.len() as u64;
        delivered
    }

    /// Process a Block Ack Request carrying the delivery point `start`
    ///
    /// Everything buffered strictly before `start` is delivered in order,
    /// skipping holes; the window is re-anchored at `start` and the run
    /// that thereby became in-order is delivered as well. A request at or
    /// behind the current delivery point changes nothing.
    pub fn notify_bar_received(&mut self, start: SeqNumber) -> Vec<Mpdu> {
        self.stats.bars_received += 1;

        let distance = start.distance_from(self.buffer.start_sequence());
        if distance == 0 || distance >= SEQ_SPACE_HALF_SIZE {
            trace!(agreement = %self.key, %start, "Block Ack Request at or behind delivery point");
            return Vec::new();
        }

        debug!(
            agreement = %self.key,
            %start,
            from = %self.buffer.start_sequence(),
            "Block Ack Request advances delivery point"
        );

        let mut delivered = Vec::new();
        for _ in 0..distance {
            let head_seq = self.buffer.start_sequence();
            match self.buffer.take_front() {
                Some(payload) => delivered.push(Mpdu {
                    seq: head_seq,
                    payload,
                }),
                None => self.stats.holes_abandoned += 1,
            }
        }

        self.drain_in_order(&mut delivered);
        self.scoreboard.advance_to(start);
        self.stats.mpdus_delivered += delivered.len() as u64;
        delivered
    }

    /// Build the compressed Block Ack response describing the current
    /// reception state, anchored at the scoreboard head
    pub fn make_block_ack(&self, len: BitmapLength) -> CompressedBlockAck {
        let mut bitmap = BlockAckBitmap::new(len);
        self.scoreboard.fill_bitmap(&mut bitmap);
        CompressedBlockAck::new(SeqControl::new(self.scoreboard.start_sequence(), 0), bitmap)
    }

    /// Reception status of `seq` per the scoreboard
    pub fn is_received(&self, seq: SeqNumber) -> bool {
        self.scoreboard.is_received(seq)
    }

    /// Next sequence number expected for delivery
    pub fn start_sequence(&self) -> SeqNumber {
        self.buffer.start_sequence()
    }

    /// Agreement statistics
    pub fn stats(&self) -> &RecipientStats {
        &self.stats
    }

    fn drain_in_order(&mut self, delivered: &mut Vec<Mpdu>) {
        while self.buffer.is_occupied(0) {
            let head_seq = self.buffer.start_sequence();
            if let Some(payload) = self.buffer.take_front() {
                delivered.push(Mpdu {
                    seq: head_seq,
                    payload,
                });
            }
        }
    }
}
