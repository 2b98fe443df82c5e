use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use std::env;
use std::process;

use number_theory_core::arith::{is_probably_prime, isqrt, sieve_primes};
use number_theory_core::qs::{quadratic_sieve_observed, QsParams};

fn report(n: &BigUint, factor: &BigUint) -> ! {
    let cofactor = n / factor;
    println!("{} = {} x {}", n, factor, cofactor);
    process::exit(0);
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        eprintln!("usage: {} <n> [factor-base-bound] [sieve-length]", args[0]);
        process::exit(1);
    }

    let n: BigUint = match args[1].parse() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("not a decimal integer: {}", args[1]);
            process::exit(1);
        }
    };
    let b: Option<u64> = args.get(2).map(|s| {
        s.parse().unwrap_or_else(|_| {
            eprintln!("not a factor-base bound: {}", s);
            process::exit(1);
        })
    });
    let t: Option<u64> = args.get(3).map(|s| {
        s.parse().unwrap_or_else(|_| {
            eprintln!("not a sieve length: {}", s);
            process::exit(1);
        })
    });

    if n <= BigUint::one() {
        eprintln!("{} has no nontrivial factor", n);
        process::exit(1);
    }
    if n.is_even() {
        report(&n, &BigUint::from(2u32));
    }

    // Front door: strip small factors and primes before the sieve spins up.
    for p in sieve_primes(10_000) {
        let p = BigUint::from(p);
        if &p * &p > n {
            break;
        }
        if (&n % &p).is_zero() {
            report(&n, &p);
        }
    }
    if is_probably_prime(&n, 24) {
        eprintln!("{} is prime", n);
        process::exit(1);
    }
    let s = isqrt(&n);
    if &s * &s == n {
        report(&n, &s);
    }

    let params = {
        let defaults = QsParams::for_bits(n.bits());
        QsParams::new(
            b.unwrap_or(defaults.factor_base_bound),
            t.unwrap_or(defaults.sieve_length),
        )
    };

    println!("factoring n = {} ({} bits)", n, n.bits());
    println!(
        "factor base bound = {}, sieve length = {}",
        params.factor_base_bound, params.sieve_length
    );

    let (factor, stats) = quadratic_sieve_observed(&n, &params, &mut |r| {
        println!(
            "  window {:>4}: {} relations, {} surviving over {} primes",
            r.window, r.relations_collected, r.relations_surviving, r.distinct_primes
        );
    });

    match factor {
        Some(f) => report(&n, &f),
        None => {
            eprintln!(
                "no factor within budget ({} windows, {} relations)",
                stats.windows_sieved, stats.relations_collected
            );
            process::exit(1);
        }
    }
}
