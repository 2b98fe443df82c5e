//! Quadratic sieve factoriser.
//!
//! Collects relations j² − n ≡ ±∏p (mod n) whose values are squarefree
//! and smooth over a factor base, then finds a GF(2) dependency among the
//! exponent-parity vectors and extracts a factor from the resulting
//! square congruence. The factor base comes from the Atkin sieve; the
//! parity vectors are signed prime sets; the dependency comes from the
//! sparse GF(2) solver.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::arith::{is_probably_prime, isqrt, tonelli_shanks};
use crate::atkin::atkin_primes_below;
use crate::gf2::SparseMatrix;
use crate::primeset::SignedPrimeSet;

/// A slot is declared smooth when its residual log drops below a single
/// log 2: rounding slack, and small enough that any surviving cofactor
/// must be 1. A repeated prime leaves at least log p behind, so accepted
/// values are squarefree over the base and the parity set is exact.
const SMOOTH_THRESHOLD: f64 = 0.6;

/// Tuning parameters for one factorisation attempt.
#[derive(Debug, Clone, Serialize)]
pub struct QsParams {
    /// Factor-base bound b: the base holds primes p <= b with (n/p) = 1.
    pub factor_base_bound: u64,
    /// Sieve window length t.
    pub sieve_length: u64,
    /// Window budget: sieving stops after this many windows.
    pub max_windows: u32,
    /// On a trivial gcd, try the remaining kernel vectors and keep
    /// sieving (true), or give up immediately (false).
    pub retry_dependencies: bool,
}

impl QsParams {
    pub fn new(factor_base_bound: u64, sieve_length: u64) -> Self {
        Self {
            factor_base_bound,
            sieve_length,
            max_windows: 64,
            retry_dependencies: true,
        }
    }

    /// Parameters tuned for the bit size of n.
    pub fn for_bits(bits: u64) -> Self {
        let (b, t) = if bits <= 20 {
            (60, 600)
        } else if bits <= 32 {
            (300, 5_000)
        } else if bits <= 48 {
            (3_000, 30_000)
        } else if bits <= 64 {
            (15_000, 120_000)
        } else {
            (60_000, 400_000)
        };
        Self::new(b, t)
    }
}

impl Default for QsParams {
    fn default() -> Self {
        Self::for_bits(48)
    }
}

/// One collected relation: x with x² − n ≡ (sign) · ∏ F (mod n).
#[derive(Debug, Clone)]
pub struct Relation {
    pub x: BigInt,
    pub factors: SignedPrimeSet,
}

/// Per-window progress handed to the observer callback.
#[derive(Debug, Clone, Serialize)]
pub struct WindowReport {
    pub window: i64,
    pub relations_collected: usize,
    pub relations_surviving: usize,
    pub distinct_primes: usize,
}

/// Counters reported alongside the result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QsStats {
    pub windows_sieved: u32,
    pub relations_collected: usize,
    pub relations_surviving: usize,
    pub distinct_primes: usize,
    pub dependencies_tried: usize,
    pub factor_found: bool,
}

/// Factor an odd composite n. Returns a nontrivial factor, or None when
/// the window budget ran out.
pub fn quadratic_sieve(n: &BigUint, params: &QsParams) -> Option<BigUint> {
    quadratic_sieve_with_stats(n, params).0
}

/// As [`quadratic_sieve`], also reporting run counters.
pub fn quadratic_sieve_with_stats(n: &BigUint, params: &QsParams) -> (Option<BigUint>, QsStats) {
    quadratic_sieve_observed(n, params, &mut |_| {})
}

/// Full entry point: the observer is invoked after every sieved window.
pub fn quadratic_sieve_observed(
    n: &BigUint,
    params: &QsParams,
    observer: &mut dyn FnMut(&WindowReport),
) -> (Option<BigUint>, QsStats) {
    let one = BigUint::one();
    assert!(*n > one, "quadratic sieve requires n > 1");
    assert!(n.is_odd(), "quadratic sieve requires odd n");
    assert!(
        !is_probably_prime(n, 24),
        "quadratic sieve requires composite n"
    );

    let mut stats = QsStats::default();

    // A perfect square splits without sieving.
    let s = isqrt(n);
    if &s * &s == *n {
        stats.factor_found = true;
        return (Some(s), stats);
    }

    // Factor base with square roots of n mod p. A prime dividing n is
    // already a factor; an inert prime contributes nothing and is dropped.
    let mut factor_base: Vec<(u64, u64)> = Vec::new();
    for p in atkin_primes_below(params.factor_base_bound + 1) {
        let n_mod_p = (n % BigUint::from(p)).to_u64().expect("residue fits");
        if n_mod_p == 0 {
            stats.factor_found = true;
            return (Some(BigUint::from(p)), stats);
        }
        if p == 2 {
            factor_base.push((2, 1));
        } else if let Some(r) = tonelli_shanks(n_mod_p, p) {
            factor_base.push((p, r));
        }
    }

    let n_int = BigInt::from(n.clone());
    let s_int = BigInt::from(s);
    let t = params.sieve_length;
    let half = BigInt::from(t / 2);

    let mut relations: Vec<Relation> = Vec::new();

    for wc in 0..params.max_windows {
        // window order k = 0, 1, -1, 2, -2, ...
        let k: i64 = if wc % 2 == 1 {
            (wc as i64 + 1) / 2
        } else {
            -(wc as i64 / 2)
        };
        let start = &s_int - &half + BigInt::from(k) * BigInt::from(t);
        sieve_window(&n_int, &start, t, &factor_base, &mut relations);
        stats.windows_sieved += 1;

        let surviving = prune_singletons(&relations);
        let needed = parity_index_count(&surviving);
        stats.relations_collected = relations.len();
        stats.relations_surviving = surviving.len();
        stats.distinct_primes = needed;
        observer(&WindowReport {
            window: k,
            relations_collected: relations.len(),
            relations_surviving: surviving.len(),
            distinct_primes: needed,
        });

        if surviving.len() > needed + 1 {
            if let Some(f) = extract(n, &surviving, params.retry_dependencies, &mut stats) {
                stats.factor_found = true;
                return (Some(f), stats);
            }
            if !params.retry_dependencies {
                // every tried dependency was trivial; give up as asked
                return (None, stats);
            }
        }
    }

    // Budget exhausted. The kernel can be nonempty even below the
    // counting bound, so make one last attempt before reporting failure.
    let surviving = prune_singletons(&relations);
    if !surviving.is_empty() {
        if let Some(f) = extract(n, &surviving, params.retry_dependencies, &mut stats) {
            stats.factor_found = true;
            return (Some(f), stats);
        }
    }
    (None, stats)
}

/// Natural log of |x|, falling back to a bit-length estimate when the
/// magnitude exceeds f64 range.
fn ln_abs(x: &BigInt) -> f64 {
    match x.magnitude().to_f64() {
        Some(v) if v.is_finite() && v > 0.0 => v.ln(),
        _ => x.magnitude().bits() as f64 * std::f64::consts::LN_2,
    }
}

/// Sieve one window [start, start + t), clamped below zero since j and
/// -j carry the same relation. Appends accepted relations to `out`.
fn sieve_window(
    n: &BigInt,
    start: &BigInt,
    t: u64,
    factor_base: &[(u64, u64)],
    out: &mut Vec<Relation>,
) {
    let end = start + BigInt::from(t);
    let lo = if start.is_negative() {
        BigInt::zero()
    } else {
        start.clone()
    };
    if end <= lo {
        return;
    }
    let count = (&end - &lo).to_u64().expect("window length fits") as usize;

    // log|f(j)| and the sign bit, in parallel: this is the bignum-heavy part.
    let mut slots: Vec<(f64, SignedPrimeSet)> = (0..count)
        .into_par_iter()
        .map(|i| {
            let j = &lo + BigInt::from(i);
            let f = &j * &j - n;
            if f.is_zero() {
                return (f64::INFINITY, SignedPrimeSet::new());
            }
            let mut set = SignedPrimeSet::new();
            if f.is_negative() {
                set.negate();
            }
            (ln_abs(&f), set)
        })
        .collect();

    for &(p, r) in factor_base {
        let logp = (p as f64).ln();
        let p_big = BigInt::from(p);
        let lo_mod = lo.mod_floor(&p_big).to_u64().expect("residue fits");
        let roots = [r, (p - r) % p];
        for (ri, &root) in roots.iter().enumerate() {
            if ri == 1 && roots[1] == roots[0] {
                continue;
            }
            let mut i = ((root + p - lo_mod) % p) as usize;
            while i < count {
                slots[i].0 -= logp;
                slots[i].1.toggle(p);
                i += p as usize;
            }
        }
    }

    for (i, (residual, set)) in slots.into_iter().enumerate() {
        if residual < SMOOTH_THRESHOLD {
            out.push(Relation {
                x: &lo + BigInt::from(i),
                factors: set,
            });
        }
    }
}

/// Remove relations carrying a prime (or a lone sign) that appears in
/// exactly one surviving set, repeating until the fixed point: such
/// entries can never cancel in a dependency.
fn prune_singletons(relations: &[Relation]) -> Vec<Relation> {
    let mut keep = vec![true; relations.len()];
    loop {
        let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
        let mut signs = 0usize;
        for (i, rel) in relations.iter().enumerate() {
            if !keep[i] {
                continue;
            }
            if rel.factors.is_negative() {
                signs += 1;
            }
            for p in rel.factors.iter() {
                *counts.entry(p).or_insert(0) += 1;
            }
        }
        let mut removed = false;
        for (i, rel) in relations.iter().enumerate() {
            if !keep[i] {
                continue;
            }
            let singleton = (rel.factors.is_negative() && signs == 1)
                || rel.factors.iter().any(|p| counts[&p] == 1);
            if singleton {
                keep[i] = false;
                removed = true;
            }
        }
        if !removed {
            break;
        }
    }
    relations
        .iter()
        .zip(keep)
        .filter(|(_, k)| *k)
        .map(|(r, _)| r.clone())
        .collect()
}

/// Number of distinct parity indices: the sign counts as index 0 when
/// any surviving relation is negative.
fn parity_index_count(relations: &[Relation]) -> usize {
    let mut primes: BTreeSet<u64> = BTreeSet::new();
    let mut sign = false;
    for r in relations {
        sign |= r.factors.is_negative();
        primes.extend(r.factors.iter());
    }
    primes.len() + sign as usize
}

/// Build the parity matrix, pull kernel vectors from the sparse solver,
/// and try each selected relation subset for a nontrivial factor.
fn extract(
    n: &BigUint,
    relations: &[Relation],
    retry: bool,
    stats: &mut QsStats,
) -> Option<BigUint> {
    let mut primes: BTreeSet<u64> = BTreeSet::new();
    for r in relations {
        primes.extend(r.factors.iter());
    }
    // row 0 is the sign; primes occupy rows 1.. in ascending order
    let row_of: BTreeMap<u64, usize> = primes
        .iter()
        .enumerate()
        .map(|(i, &p)| (p, i + 1))
        .collect();
    let rows = primes.len() + 1;
    let cols = relations
        .iter()
        .map(|r| {
            let mut col = BTreeSet::new();
            if r.factors.is_negative() {
                col.insert(0);
            }
            for p in r.factors.iter() {
                col.insert(row_of[&p]);
            }
            col
        })
        .collect();
    let matrix = SparseMatrix::from_columns(rows, cols).expect("row map covers every prime");

    for v in matrix.null_space() {
        stats.dependencies_tried += 1;
        if let Some(f) = try_dependency(n, relations, v.support()) {
            return Some(f);
        }
        if !retry {
            break;
        }
    }
    None
}

/// Square extraction for one dependency: X = ∏ x_i, Y = ∏ p^(count/2).
/// X² ≡ Y² (mod n) must hold by construction; a violation is a bug and
/// aborts. Returns a factor when gcd(X ± Y, n) is nontrivial.
fn try_dependency(
    n: &BigUint,
    relations: &[Relation],
    selected: &BTreeSet<usize>,
) -> Option<BigUint> {
    let n_int = BigInt::from(n.clone());
    let mut x = BigInt::one();
    let mut counts: BTreeMap<u64, u32> = BTreeMap::new();
    let mut negatives = 0u32;
    for &i in selected {
        let rel = &relations[i];
        x = (&x * &rel.x).mod_floor(&n_int);
        if rel.factors.is_negative() {
            negatives += 1;
        }
        for p in rel.factors.iter() {
            *counts.entry(p).or_insert(0) += 1;
        }
    }
    assert!(
        negatives % 2 == 0,
        "kernel vector selected an odd number of negative relations"
    );

    let mut y = BigUint::one();
    for (&p, &c) in &counts {
        assert!(c % 2 == 0, "prime {} has odd multiplicity in a dependency", p);
        y = y * BigUint::from(p).modpow(&BigUint::from(c / 2), n) % n;
    }
    let x = x.to_biguint().expect("reduced mod positive n");

    assert_eq!(
        (&x * &x) % n,
        (&y * &y) % n,
        "square congruence violated after relation combination"
    );

    let one = BigUint::one();
    let diff = if x >= y { &x - &y } else { &y - &x };
    let g = diff.gcd(n);
    if g > one && g < *n {
        return Some(g);
    }
    let g = ((&x + &y) % n).gcd(n);
    if g > one && g < *n {
        return Some(g);
    }
    None
}
