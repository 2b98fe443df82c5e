use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use num_bigint::BigUint;

use number_theory_core::atkin::atkin_sieve;
use number_theory_core::eisenstein::{self, Eisenstein};
use number_theory_core::qs::{quadratic_sieve, QsParams};

fn bench_atkin(c: &mut Criterion) {
    let mut group = c.benchmark_group("atkin_sieve");
    for len in [10_000u64, 100_000, 1_000_000] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| atkin_sieve(0, len).primes().count());
        });
    }
    group.finish();
}

fn bench_quadratic_sieve(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadratic_sieve");
    group.sample_size(10);
    let targets: [(u64, u64, u64); 3] =
        [(15_347, 30, 200), (67_591, 100, 2_000), (1_042_961, 300, 10_000)];
    for (n, b, t) in targets {
        let n_big = BigUint::from(n);
        let params = QsParams::new(b, t);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n_big, |bench, n| {
            bench.iter(|| quadratic_sieve(n, &params));
        });
    }
    group.finish();
}

fn bench_eisenstein_factorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("eisenstein_factorize");
    for (a, b) in [(40i64, 9i64), (1_234, 567), (98_765, -4_321)] {
        let z = Eisenstein::new(a, b);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_{}", a, b)),
            &z,
            |bench, z| {
                bench.iter(|| eisenstein::factorize(z));
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_atkin,
    bench_quadratic_sieve,
    bench_eisenstein_factorize
);
criterion_main!(benches);
