use criterion::{black_box, criterion_group, criterion_main, Criterion};
use blockack_protocol::bitmap::{BitmapLength, BlockAckBitmap, CompressedBlockAck};
use blockack_protocol::reorder::RecipientAgreement;
use blockack_protocol::sequence::{SeqControl, SeqNumber};
use blockack_protocol::window::OriginatorAgreement;
use blockack_protocol::MacAddress;
use bytes::Bytes;

fn bench_compressed_encode(c: &mut Criterion) {
    let mut bitmap = BlockAckBitmap::new(BitmapLength::Octets32);
    for position in (0..256).step_by(3) {
        bitmap.set(position);
    }
    let ba = CompressedBlockAck::new(SeqControl::new(SeqNumber::new(1000), 0), bitmap);

    c.bench_function("compressed_block_ack_encode", |b| {
        b.iter(|| {
            let bytes = black_box(&ba).to_bytes();
            black_box(bytes);
        });
    });
}

fn bench_compressed_decode(c: &mut Criterion) {
    let mut bitmap = BlockAckBitmap::new(BitmapLength::Octets32);
    for position in (0..256).step_by(3) {
        bitmap.set(position);
    }
    let bytes = CompressedBlockAck::new(SeqControl::new(SeqNumber::new(1000), 0), bitmap).to_bytes();

    c.bench_function("compressed_block_ack_decode", |b| {
        b.iter(|| {
            let ba = CompressedBlockAck::from_bytes(black_box(&bytes)).unwrap();
            black_box(ba);
        });
    });
}

fn bench_window_round(c: &mut Criterion) {
    let peer = MacAddress::new([2, 0, 0, 0, 0, 1]);

    c.bench_function("window_transmit_ack_round", |b| {
        b.iter(|| {
            let mut agreement =
                OriginatorAgreement::new(peer, 0, 256, SeqNumber::new(0)).unwrap();
            for seq in 0..256 {
                agreement.notify_transmitted(SeqNumber::new(seq));
            }
            for seq in 0..256 {
                agreement.notify_acked(SeqNumber::new(seq));
            }
            black_box(agreement.head_sequence());
        });
    });
}

fn bench_reorder_out_of_order(c: &mut Criterion) {
    let peer = MacAddress::new([2, 0, 0, 0, 0, 2]);
    let payload = Bytes::from_static(&[0u8; 64]);

    c.bench_function("reorder_reversed_burst", |b| {
        b.iter(|| {
            let mut agreement =
                RecipientAgreement::new(peer, 0, 256, SeqNumber::new(0)).unwrap();
            let mut delivered = 0usize;
            for seq in (0..256u16).rev() {
                delivered += agreement
                    .notify_received(SeqNumber::new(seq), payload.clone())
                    .len();
            }
            black_box(delivered);
        });
    });
}

fn bench_sequence_distance(c: &mut Criterion) {
    let reference = SeqNumber::new(4000);

    c.bench_function("sequence_distance", |b| {
        let mut seq = SeqNumber::new(0);
        b.iter(|| {
            seq.increment();
            black_box(seq.distance_from(reference));
        });
    });
}

criterion_group!(
    benches,
    bench_compressed_encode,
    bench_compressed_decode,
    bench_window_round,
    bench_reorder_out_of_order,
    bench_sequence_distance
);
criterion_main!(benches);
