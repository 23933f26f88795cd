use criterion::{black_box, criterion_group, criterion_main, Criterion};

use darkreach_sieve::factor_sink::FactorSink;
use darkreach_sieve::kernel::dm_divisor::DMDivisorKernel;
use darkreach_sieve::kernel::fixed_bnc::FixedBNCKernel;
use darkreach_sieve::kernel::multi_factorial::MultiFactorialKernel;
use darkreach_sieve::kernel::smarandache::SmarandacheKernel;
use darkreach_sieve::kernel::SieveKernel;
use darkreach_sieve::term_table::TermTable;

const GROUP: [u64; 4] = [1_000_003, 1_000_033, 1_000_037, 1_000_039];

fn bench_multi_factorial_group(c: &mut Criterion) {
    let kernel = MultiFactorialKernel::new(1, 1, 50_000, vec![]);
    let table = kernel.initial_table();
    let sink = FactorSink::new();
    c.bench_function("multi_factorial::process_group(n!1, 50k range)", |b| {
        b.iter(|| kernel.process_group(black_box(GROUP), &table, &sink));
    });
}

fn bench_dm_divisor_group(c: &mut Criterion) {
    let kernel = DMDivisorKernel::new(127, 1, 1_000_000);
    let table = TermTable::new_range(1, 1_000_000);
    let sink = FactorSink::new();
    c.bench_function("dm_divisor::process_group(1M k range)", |b| {
        b.iter(|| kernel.process_group(black_box(GROUP), &table, &sink));
    });
}

fn bench_fixed_bnc_group(c: &mut Criterion) {
    let kernel = FixedBNCKernel::new(3, 100_000, 1, 1, 1_000_000);
    let table = TermTable::new_range(1, 1_000_000);
    let sink = FactorSink::new();
    c.bench_function("fixed_bnc::process_group(1M k range)", |b| {
        b.iter(|| kernel.process_group(black_box(GROUP), &table, &sink));
    });
}

fn bench_smarandache_group(c: &mut Criterion) {
    let terms: Vec<u64> = (1..=2000).collect();
    let kernel = SmarandacheKernel::new(terms, 4);
    let table = kernel.initial_table();
    let sink = FactorSink::new();
    c.bench_function("smarandache::process_group(2000 terms)", |b| {
        b.iter(|| kernel.process_group(black_box(GROUP), &table, &sink));
    });
}

criterion_group!(
    benches,
    bench_multi_factorial_group,
    bench_dm_divisor_group,
    bench_fixed_bnc_group,
    bench_smarandache_group,
);
criterion_main!(benches);
