//! Property-based tests for the sequence space, the codec and the
//! ordering invariants
//!
//! These tests use proptest to generate random bitmaps, arrival orders and
//! acknowledgment orders, and verify that serialization roundtrips and the
//! ordering/idempotence invariants hold for all of them.

use blockack_protocol::bitmap::{
    AckSubfield, BitmapLength, BlockAckBitmap, CompressedBlockAck, MultiRecipientBlockAck,
    RecipientInfo,
};
use blockack_protocol::reorder::RecipientAgreement;
use blockack_protocol::sequence::{SeqControl, SeqNumber, MAX_SEQ_NUMBER};
use blockack_protocol::window::{OriginatorAgreement, SlotStatus};
use blockack_protocol::MacAddress;
use bytes::Bytes;
use proptest::prelude::*;

// Property test strategies

fn seq_number_strategy() -> impl Strategy<Value = SeqNumber> {
    (0..=MAX_SEQ_NUMBER).prop_map(SeqNumber::new)
}

fn bitmap_length_strategy() -> impl Strategy<Value = BitmapLength> {
    prop_oneof![
        Just(BitmapLength::Octets1),
        Just(BitmapLength::Octets2),
        Just(BitmapLength::Octets4),
        Just(BitmapLength::Octets8),
        Just(BitmapLength::Octets16),
        Just(BitmapLength::Octets32),
    ]
}

fn bitmap_strategy() -> impl Strategy<Value = BlockAckBitmap> {
    (
        bitmap_length_strategy(),
        prop::collection::btree_set(0usize..256, 0..64),
    )
        .prop_map(|(len, positions)| {
            let mut bitmap = BlockAckBitmap::new(len);
            for position in positions {
                if position < len.bits() {
                    bitmap.set(position);
                }
            }
            bitmap
        })
}

fn subfield_strategy() -> impl Strategy<Value = AckSubfield> {
    (
        0u16..2048,
        any::<bool>(),
        0u8..16,
        prop::option::of((seq_number_strategy(), 0u8..16, bitmap_strategy())),
    )
        .prop_map(|(aid, all_ack, tid, ack)| AckSubfield {
            recipient: RecipientInfo::new(aid, all_ack, tid),
            ack: ack.map(|(seq, fragment, bitmap)| {
                CompressedBlockAck::new(SeqControl::new(seq, fragment), bitmap)
            }),
        })
}

fn arrival_order_strategy() -> impl Strategy<Value = Vec<u16>> {
    (1usize..=64).prop_flat_map(|n| Just((0..n as u16).collect::<Vec<u16>>()).prop_shuffle())
}

// Property tests

proptest! {
    #[test]
    fn prop_distance_injective(a in seq_number_strategy(), b in seq_number_strategy(), r in seq_number_strategy()) {
        prop_assert_eq!(a.distance_from(a), 0);
        if a != b {
            prop_assert_ne!(a.distance_from(r), b.distance_from(r));
        } else {
            prop_assert_eq!(a.distance_from(r), b.distance_from(r));
        }
    }

    #[test]
    fn prop_bitmap_roundtrip(bitmap in bitmap_strategy()) {
        let bytes = bitmap.to_bytes();
        prop_assert_eq!(bytes.len(), bitmap.len().octets());

        let decoded = BlockAckBitmap::from_bytes(&bytes).unwrap();
        prop_assert_eq!(
            decoded.set_positions().collect::<Vec<_>>(),
            bitmap.set_positions().collect::<Vec<_>>()
        );
        prop_assert_eq!(decoded, bitmap);
    }

    #[test]
    fn prop_compressed_roundtrip(
        seq in seq_number_strategy(),
        fragment in 0u8..16,
        bitmap in bitmap_strategy(),
    ) {
        let frame = CompressedBlockAck::new(SeqControl::new(seq, fragment), bitmap);
        let decoded = CompressedBlockAck::from_bytes(&frame.to_bytes()).unwrap();
        prop_assert_eq!(decoded.start.seq(), seq);
        prop_assert_eq!(decoded.start.fragment(), fragment);
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn prop_multi_recipient_roundtrip(
        subfields in prop::collection::vec(subfield_strategy(), 0..5),
    ) {
        let frame = MultiRecipientBlockAck { subfields };
        let lengths: Vec<Option<BitmapLength>> = frame
            .subfields
            .iter()
            .map(|s| s.ack.as_ref().map(|a| a.bitmap.len()))
            .collect();

        let decoded = MultiRecipientBlockAck::from_bytes(&frame.to_bytes(), &lengths).unwrap();
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn prop_delivery_strictly_ordered(arrivals in arrival_order_strategy(), start in seq_number_strategy()) {
        let peer = MacAddress::new([2, 0, 0, 0, 0, 9]);
        let mut agreement = RecipientAgreement::new(peer, 0, 64, start).unwrap();

        let mut delivered = Vec::new();
        for &offset in &arrivals {
            let seq = start + offset;
            delivered.extend(agreement.notify_received(seq, Bytes::new()));
        }

        // Every MPDU arrives within the window, so the final delivery set is
        // exactly the arrival set, strictly in sequence order, no duplicates
        let expected: Vec<u16> = (0..arrivals.len() as u16).map(|o| (start + o).as_raw()).collect();
        prop_assert_eq!(
            delivered.iter().map(|m| m.seq.as_raw()).collect::<Vec<_>>(),
            expected
        );
    }

    #[test]
    fn prop_head_rests_on_oldest_outstanding(acks in Just((0..32u16).collect::<Vec<u16>>()).prop_shuffle()) {
        let peer = MacAddress::new([2, 0, 0, 0, 0, 9]);
        let mut agreement = OriginatorAgreement::new(peer, 0, 32, SeqNumber::new(0)).unwrap();
        for raw in 0..32u16 {
            agreement.notify_transmitted(SeqNumber::new(raw));
        }

        for &raw in &acks {
            agreement.notify_acked(SeqNumber::new(raw));
            // The slot at the head is never left settled
            prop_assert_ne!(agreement.status_at(0), SlotStatus::Acked);
        }

        // Everything acknowledged: the head passed the whole burst
        prop_assert_eq!(agreement.head_sequence(), SeqNumber::new(32));
        prop_assert_eq!(agreement.outstanding().count(), 0);
    }

    #[test]
    fn prop_duplicate_arrivals_deliver_once(
        arrivals in arrival_order_strategy(),
        duplicate_index in 0usize..64,
    ) {
        let peer = MacAddress::new([2, 0, 0, 0, 0, 9]);
        let mut agreement = RecipientAgreement::new(peer, 0, 64, SeqNumber::new(0)).unwrap();

        let duplicate = arrivals[duplicate_index % arrivals.len()];
        let mut delivered = Vec::new();
        for &raw in &arrivals {
            delivered.extend(agreement.notify_received(SeqNumber::new(raw), Bytes::new()));
            if raw == duplicate {
                delivered.extend(agreement.notify_received(SeqNumber::new(raw), Bytes::new()));
            }
        }

        let expected: Vec<u16> = (0..arrivals.len() as u16).collect();
        prop_assert_eq!(
            delivered.iter().map(|m| m.seq.as_raw()).collect::<Vec<_>>(),
            expected
        );
    }
}
