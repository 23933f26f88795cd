use criterion::{black_box, criterion_group, criterion_main, Criterion};
use darkreach_sieve::montgomery::{MontgomeryField, MontgomeryVec};
use darkreach_sieve::prime_source::PrimeSource;

fn bench_prime_source_next_chunk(c: &mut Criterion) {
    c.bench_function("prime_source_next_chunk(4096 primes near 1e6)", |b| {
        b.iter(|| {
            let source = PrimeSource::new(black_box(1_000_000), black_box(1_100_000), 4096);
            source.next_chunk().unwrap()
        });
    });
}

fn bench_montgomery_field_new(c: &mut Criterion) {
    c.bench_function("montgomery_field_new(large prime)", |b| {
        b.iter(|| MontgomeryField::new(black_box(999_999_999_999_999_877u64)).unwrap());
    });
}

fn bench_montgomery_vec_mulmod(c: &mut Criterion) {
    let primes = [1_000_003u64, 1_000_033, 1_000_037, 1_000_039];
    let vec = MontgomeryVec::new(primes).unwrap();
    let ns = [12345u64, 67890, 111213, 141516];
    let res = vec.to_res(ns);
    c.bench_function("montgomery_vec_mulmod(4-lane)", |b| {
        b.iter(|| vec.mulmod(black_box(res), black_box(res)));
    });
}

fn bench_montgomery_pow(c: &mut Criterion) {
    let field = MontgomeryField::new(1_000_000_007u64).unwrap();
    let base = field.to_res(123_456_789);
    c.bench_function("montgomery_pow(large exponent)", |b| {
        b.iter(|| field.pow(black_box(base), black_box(987_654_321)));
    });
}

criterion_group!(
    benches,
    bench_prime_source_next_chunk,
    bench_montgomery_field_new,
    bench_montgomery_vec_mulmod,
    bench_montgomery_pow,
);
criterion_main!(benches);
