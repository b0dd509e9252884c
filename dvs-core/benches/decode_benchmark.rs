//! Benchmarks for the DVS packet decoder.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use dvs_core::PacketDecoder;

/// Builds a synthetic capture: a reference timestamp, then alternating
/// column-address and group packets.
fn synthetic_stream(packets: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(packets * 4);

    // Reference timestamp: 1 ms
    data.extend_from_slice(&[0x08, 0x00, 0x00, 0x01]);

    for i in 0..packets {
        if i % 2 == 0 {
            // Column address with a rolling sub-timestamp
            let sub_ts = (i % 1024) as u16;
            let raw_x = (i % 320) as u16;
            data.extend_from_slice(&[
                0x04,
                ((sub_ts >> 5) & 0x1F) as u8,
                (((sub_ts & 0x1F) << 3) | ((raw_x >> 8) & 0x03)) as u8,
                (raw_x & 0xFF) as u8,
            ]);
        } else {
            // Group packet: both bitmasks populated, 16 events
            let grp_addr = ((i % 32) as u8) << 2;
            data.extend_from_slice(&[0x80 | (1 << 2), grp_addr | 0x01, 0xFF, 0xFF]);
        }
    }
    data
}

fn decode_buffer_benchmark(c: &mut Criterion) {
    let data = synthetic_stream(200_000);

    let mut group = c.benchmark_group("decode_buffer");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("synthetic_200k_packets", |b| {
        b.iter(|| {
            let mut decoder = PacketDecoder::new();
            let mut events = Vec::new();
            decoder.decode_buffer(black_box(&data), &mut events);
            black_box(events.len())
        })
    });

    group.finish();
}

fn decode_chunked_benchmark(c: &mut Criterion) {
    // Same stream split into bulk-transfer-sized buffers, exercising the
    // state threading across buffers.
    let data = synthetic_stream(200_000);
    let chunks: Vec<&[u8]> = data.chunks(1024).collect();

    let mut group = c.benchmark_group("decode_chunked");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("chunks_1024", |b| {
        b.iter(|| {
            let mut decoder = PacketDecoder::new();
            let mut events = Vec::new();
            for chunk in &chunks {
                decoder.decode_buffer(black_box(chunk), &mut events);
            }
            black_box(events.len())
        })
    });

    group.finish();
}

criterion_group!(benches, decode_buffer_benchmark, decode_chunked_benchmark);
criterion_main!(benches);
