//! Criterion benchmarks for the tcpmsg message codec.
//!
//! Measures field push/pop on the payload stack and header/frame encoding,
//! which together make up the per-message CPU cost outside of socket I/O.
//!
//! Run with:
//! ```bash
//! cargo bench --package tcpmsg-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tcpmsg_core::protocol::demo::DemoKind;
use tcpmsg_core::protocol::{decode_header, encode_frame, encode_header};
use tcpmsg_core::Message;

// ── Message fixtures ──────────────────────────────────────────────────────────

fn make_ping() -> Message<DemoKind> {
    let mut msg = Message::new(DemoKind::Ping);
    msg.push(1_700_000_000_000u64);
    msg
}

fn make_record() -> Message<DemoKind> {
    let mut msg = Message::new(DemoKind::Text);
    msg.push(42u32).push(-7i16).push(3.5f64).push(true).push([9u8; 16]);
    msg
}

fn make_bulk(len: usize) -> Message<DemoKind> {
    let mut msg = Message::new(DemoKind::Broadcast);
    msg.payload = vec![0xAB; len];
    msg.header.size = len as u64;
    msg
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_pop");

    group.bench_function("record", |b| {
        b.iter(|| {
            let mut msg = make_record();
            let tail: [u8; 16] = msg.pop().expect("pop must succeed");
            let flag: bool = msg.pop().expect("pop must succeed");
            black_box((tail, flag, msg.len()))
        })
    });

    group.bench_function("u64_x64", |b| {
        b.iter(|| {
            let mut msg = Message::new(DemoKind::Text);
            for i in 0..64u64 {
                msg.push(black_box(i));
            }
            let mut sum = 0u64;
            while !msg.is_empty() {
                sum += msg.pop::<u64>().expect("pop must succeed");
            }
            black_box(sum)
        })
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let fixtures: Vec<(&str, Message<DemoKind>)> = vec![
        ("Ping", make_ping()),
        ("Record", make_record()),
        ("Bulk_4KiB", make_bulk(4096)),
        ("Bulk_64KiB", make_bulk(64 * 1024)),
    ];

    let mut group = c.benchmark_group("encode_frame");
    for (name, msg) in &fixtures {
        group.bench_with_input(BenchmarkId::new("msg", name), msg, |b, msg| {
            b.iter(|| encode_frame(black_box(msg)))
        });
    }
    group.finish();
}

fn bench_header(c: &mut Criterion) {
    let header = make_record().header;
    let bytes = encode_header(&header);

    let mut group = c.benchmark_group("header");
    group.bench_function("encode", |b| b.iter(|| encode_header(black_box(&header))));
    group.bench_function("decode", |b| {
        b.iter(|| decode_header::<DemoKind>(black_box(&bytes)).expect("decode must succeed"))
    });
    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_encode, bench_header);
criterion_main!(benches);
