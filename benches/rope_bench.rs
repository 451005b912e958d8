use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cordage::{Rope, RopeBuffer};
use std::time::Duration;

fn sample_text(len: usize) -> Vec<u8> {
    let line = b"the quick brown fox jumps over the lazy dog\n";
    line.iter().copied().cycle().take(len).collect()
}

fn typing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("typing");
    group.measurement_time(Duration::from_secs(10));
    let base = sample_text(1 << 20);

    group.bench_function("cordage_type_1k", |b| {
        b.iter_batched(
            || RopeBuffer::from_bytes(&base),
            |mut buffer| {
                let mut cursor = buffer.cursor_at(base.len() / 2);
                for i in 0..1000u32 {
                    cursor = buffer.insert(cursor, b'a' + (i % 26) as u8);
                }
                black_box(buffer.len())
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("ropey_type_1k", |b| {
        let text = String::from_utf8_lossy(&base).into_owned();
        b.iter_batched(
            || ropey::Rope::from_str(&text),
            |mut rope| {
                let mut at = rope.len_chars() / 2;
                for i in 0..1000u32 {
                    let c = (b'a' + (i % 26) as u8) as char;
                    rope.insert_char(at, c);
                    at += 1;
                }
                black_box(rope.len_bytes())
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("cordage_type_with_snapshots", |b| {
        b.iter_batched(
            || RopeBuffer::from_bytes(&base),
            |mut buffer| {
                let mut snapshots = Vec::new();
                let mut cursor = buffer.cursor_at(base.len() / 2);
                for i in 0..1000u32 {
                    if i % 50 == 0 {
                        snapshots.push(buffer.snapshot());
                    }
                    cursor = buffer.insert(cursor, b'x');
                }
                black_box(snapshots.len())
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn load_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");

    for size in [1 << 16, 1 << 20, 1 << 24].iter() {
        let text = sample_text(*size);
        group.bench_with_input(BenchmarkId::new("cordage", size), &text, |b, text| {
            b.iter(|| black_box(Rope::from_bytes(text).len()))
        });
        let string = String::from_utf8_lossy(&text).into_owned();
        group.bench_with_input(BenchmarkId::new("ropey", size), &string, |b, text| {
            b.iter(|| black_box(ropey::Rope::from_str(text).len_bytes()))
        });
    }

    group.finish();
}

fn lookup_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let buffer = RopeBuffer::from_bytes(&sample_text(1 << 22));
    let lines = buffer.count_lines();

    group.bench_function("cursor_at_point", |b| {
        let mut line = 0;
        b.iter(|| {
            line = (line + 7919) % lines;
            black_box(buffer.cursor_at_point(line, 10).index)
        })
    });

    group.bench_function("line", |b| {
        let mut line = 0;
        b.iter(|| {
            line = (line + 7919) % lines;
            black_box(buffer.line(line).len())
        })
    });

    group.bench_function("split_concat", |b| {
        let rope = buffer.rope();
        let mut at = 0;
        b.iter(|| {
            at = (at + 104_729) % rope.len();
            let (left, right) = rope.split(at);
            black_box(left.concat(&right).len())
        })
    });

    group.finish();
}

criterion_group!(benches, typing_benchmark, load_benchmark, lookup_benchmark);
criterion_main!(benches);
