//! Reconciliation benchmarks.
//!
//! - LIS over shuffled, reversed and mostly-sorted inputs
//! - Full keyed-list updates against the in-memory host
//!
//! Target: a 1000-element reconcile well under a millisecond.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use trellis_core::{longest_increasing_subsequence, reconcile, KeyedList, VecHost};

/// Deterministic permutation of `0..n` (multiplicative step modulo a prime).
fn scrambled(n: usize) -> Vec<isize> {
    const PRIME: usize = 1_000_003;
    let mut items: Vec<(usize, isize)> = (0..n).map(|i| ((i * 7919) % PRIME, i as isize)).collect();
    items.sort_unstable();
    items.into_iter().map(|(_, v)| v).collect()
}

fn bench_lis(c: &mut Criterion) {
    let mut group = c.benchmark_group("lis");
    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));

        let shuffled = scrambled(size);
        group.bench_with_input(BenchmarkId::new("scrambled", size), &shuffled, |b, input| {
            b.iter(|| longest_increasing_subsequence(black_box(input)))
        });

        let reversed: Vec<isize> = (0..size as isize).rev().collect();
        group.bench_with_input(BenchmarkId::new("reversed", size), &reversed, |b, input| {
            b.iter(|| longest_increasing_subsequence(black_box(input)))
        });

        let mut nearly: Vec<isize> = (0..size as isize).collect();
        nearly.swap(0, size - 1);
        group.bench_with_input(BenchmarkId::new("nearly_sorted", size), &nearly, |b, input| {
            b.iter(|| longest_increasing_subsequence(black_box(input)))
        });
    }
    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    let old: Vec<u32> = (0..1_000).collect();
    let mut new = old.clone();
    new.rotate_left(250);
    new.truncate(900);
    new.extend(1_000..1_100);

    group.bench_function("plan_1000", |b| {
        b.iter(|| reconcile(black_box(&old), black_box(&new)))
    });

    group.bench_function("keyed_update_1000", |b| {
        b.iter(|| {
            let mut host = VecHost::<u32>::new();
            let mut list = KeyedList::new();
            let _ = list.update(&mut host, &old);
            list.update(&mut host, black_box(&new))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_lis, bench_reconcile);
criterion_main!(benches);
