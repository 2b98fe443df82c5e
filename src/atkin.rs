//! Segmented sieve of Atkin.
//!
//! A segment covers [lo, lo + len) with lo rounded down to a multiple of
//! 60. For each of the 16 residues coprime to 60 the segment keeps one
//! bit-vector of ⌈len/60⌉ wheel rows; bit k of vector j means
//! 60·(lo/60 + k) + r_j is prime. Candidates are toggled by counting
//! lattice-point representations of three binary quadratic forms, then
//! squareful numbers are crossed out by the seed sieve's primes.

use num_integer::Roots;

use crate::arith::sieve_primes;
use crate::crt::chinese_u64;

/// The 16 residues mod 60 coprime to 60 (wheel-30 rolled twice).
pub const WHEEL: [u64; 16] = [
    1, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 49, 53, 59,
];

fn bit_get(words: &[u64], i: u64) -> bool {
    words[(i / 64) as usize] >> (i % 64) & 1 == 1
}

fn bit_toggle(words: &mut [u64], i: u64) {
    words[(i / 64) as usize] ^= 1 << (i % 64);
}

fn bit_clear(words: &mut [u64], i: u64) {
    words[(i / 64) as usize] &= !(1 << (i % 64));
}

/// One sieved segment: frozen after construction.
#[derive(Debug, Clone)]
pub struct AtkinSieve {
    lo: u64,
    len: u64,
    wheels: u64,
    bits: Vec<Vec<u64>>,
}

/// Toggle candidates of the forms c·x² + y² (c = 4 for δ ≡ 1 mod 4 with
/// x-period 15, c = 3 for δ ≡ 1 mod 6 with x-period 10). From a base
/// solution the y-walk advances k by y + 15 as y grows by 30; x-steps of
/// one period leave the residue class unchanged.
fn toggle_quadratic(
    c: u64,
    fstep: u64,
    delta: u64,
    lo_w: u64,
    hi_w: u64,
    hi_n: u64,
    words: &mut [u64],
) {
    for f in 1..=fstep {
        for g in 1..=30u64 {
            if (c * f * f + g * g) % 60 != delta {
                continue;
            }
            let mut x = f;
            while c * x * x < hi_n {
                let mut k = (c * x * x + g * g - delta) / 60;
                let mut y = g;
                while k < hi_w {
                    if k >= lo_w {
                        bit_toggle(words, k - lo_w);
                    }
                    k += y + 15;
                    y += 30;
                }
                x += fstep;
            }
        }
    }
}

/// Toggle candidates of 3·x² − y² with x > y ≥ 1 (δ ≡ 11 mod 12).
/// For fixed x the value falls as y grows, so the y-walk skips forward
/// until the window is entered and stops once it is passed.
fn toggle_difference(delta: u64, lo_w: u64, hi_w: u64, hi_n: u64, words: &mut [u64]) {
    for f in 1..=10u64 {
        for g in 1..=30u64 {
            if (3 * f * f + 3600 - g * g) % 60 != delta {
                continue;
            }
            let mut x = f;
            loop {
                // the smallest value in this column is 3x² − (x−1)² = 2x² + 2x − 1
                if x >= 2 && 2 * x * x + 2 * x - 1 >= hi_n {
                    break;
                }
                let mut y = g;
                while y < x {
                    let n = 3 * x * x - y * y;
                    if n >= hi_n {
                        y += 30;
                        continue;
                    }
                    let k = (n - delta) / 60;
                    if k < lo_w {
                        break;
                    }
                    if k < hi_w {
                        bit_toggle(words, k - lo_w);
                    }
                    y += 30;
                }
                x += 10;
            }
        }
    }
}

/// Sieve the segment [lo, lo + len), lo rounded down to a multiple of 60.
pub fn atkin_sieve(lo: u64, len: u64) -> AtkinSieve {
    let lo = lo - lo % 60;
    let wheels = len.div_ceil(60);
    let lo_w = lo / 60;
    let hi_w = lo_w + wheels;
    let hi_n = hi_w * 60;
    let words = (wheels.div_ceil(64)) as usize;
    let mut bits: Vec<Vec<u64>> = vec![vec![0u64; words]; 16];

    // Toggle phase: dispatch each wheel residue to its quadratic form.
    for (idx, &delta) in WHEEL.iter().enumerate() {
        if delta % 4 == 1 {
            toggle_quadratic(4, 15, delta, lo_w, hi_w, hi_n, &mut bits[idx]);
        } else if delta % 6 == 1 {
            toggle_quadratic(3, 10, delta, lo_w, hi_w, hi_n, &mut bits[idx]);
        } else {
            toggle_difference(delta, lo_w, hi_w, hi_n, &mut bits[idx]);
        }
    }

    // Cross-out phase: clear 60k + δ divisible by p² for seed primes
    // 7 ≤ p ≤ ⌊√hi⌋. The first hit in each class comes from the
    // Chinese remainder combinator.
    let limit = hi_n.sqrt();
    for p in sieve_primes(limit + 1) {
        if p < 7 {
            continue;
        }
        let p2 = p * p;
        for (idx, &delta) in WHEEL.iter().enumerate() {
            let (n0, _) =
                chinese_u64((delta, 60), (0, p2)).expect("60 and p^2 are coprime for p >= 7");
            let mut k = (n0 - delta) / 60;
            if k < lo_w {
                k += (lo_w - k).div_ceil(p2) * p2;
            }
            while k < hi_w {
                bit_clear(&mut bits[idx], k - lo_w);
                k += p2;
            }
        }
    }

    AtkinSieve {
        lo,
        len,
        wheels,
        bits,
    }
}

impl AtkinSieve {
    /// The rounded low bound of the segment.
    pub fn lo(&self) -> u64 {
        self.lo
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Primes of the segment in strictly ascending order. 2, 3, 5 are
    /// produced by the adapter when in range; all other primes come from
    /// the wheel bit-vectors, ascending residue index within each row.
    pub fn primes(&self) -> AtkinPrimes<'_> {
        AtkinPrimes {
            sieve: self,
            small_idx: 0,
            wheel: 0,
            residue: 0,
        }
    }
}

/// Pull iterator over a segment's primes.
pub struct AtkinPrimes<'a> {
    sieve: &'a AtkinSieve,
    small_idx: usize,
    wheel: u64,
    residue: usize,
}

impl Iterator for AtkinPrimes<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let hi = self.sieve.lo + self.sieve.len;
        while self.small_idx < 3 {
            let p = [2u64, 3, 5][self.small_idx];
            self.small_idx += 1;
            if p >= self.sieve.lo && p < hi {
                return Some(p);
            }
        }
        while self.wheel < self.sieve.wheels {
            while self.residue < 16 {
                let r = self.residue;
                self.residue += 1;
                if bit_get(&self.sieve.bits[r], self.wheel) {
                    let n = self.sieve.lo + self.wheel * 60 + WHEEL[r];
                    if n < hi {
                        return Some(n);
                    }
                }
            }
            self.residue = 0;
            self.wheel += 1;
        }
        None
    }
}

/// Convenience: all primes below `bound`, the factor-base source for the
/// quadratic sieve.
pub fn atkin_primes_below(bound: u64) -> Vec<u64> {
    atkin_sieve(0, bound).primes().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arith::sieve_primes;

    #[test]
    fn test_first_segment() {
        let primes: Vec<u64> = atkin_sieve(0, 100).primes().collect();
        assert_eq!(
            primes,
            vec![
                2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73,
                79, 83, 89, 97
            ]
        );
    }

    #[test]
    fn test_matches_eratosthenes_up_to_10000() {
        let atkin: Vec<u64> = atkin_sieve(0, 10_000).primes().collect();
        assert_eq!(atkin, sieve_primes(10_000));
    }

    #[test]
    fn test_inner_segment() {
        let seg: Vec<u64> = atkin_sieve(600, 300).primes().collect();
        let expected: Vec<u64> = sieve_primes(900)
            .into_iter()
            .filter(|&p| p >= 600)
            .collect();
        assert_eq!(seg, expected);
    }

    #[test]
    fn test_lo_rounds_down() {
        let seg = atkin_sieve(1000, 120);
        assert_eq!(seg.lo(), 960);
        let primes: Vec<u64> = seg.primes().collect();
        let expected: Vec<u64> = sieve_primes(1080)
            .into_iter()
            .filter(|&p| p >= 960)
            .collect();
        assert_eq!(primes, expected);
    }

    #[test]
    fn test_large_offset_segment() {
        let seg: Vec<u64> = atkin_sieve(100_020, 600).primes().collect();
        let expected: Vec<u64> = sieve_primes(100_620)
            .into_iter()
            .filter(|&p| p >= 100_020)
            .collect();
        assert_eq!(seg, expected);
    }

    #[test]
    fn test_short_segment_keeps_length() {
        // len not a multiple of 60: enumeration must stop at lo + len
        let primes: Vec<u64> = atkin_sieve(0, 30).primes().collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn test_ascending_order() {
        let primes: Vec<u64> = atkin_sieve(0, 5000).primes().collect();
        assert!(primes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_squareful_candidates_cleared() {
        // 49, 121, 169 and 539 = 7^2 * 11 sit on the wheel but are squareful
        let primes: Vec<u64> = atkin_sieve(0, 600).primes().collect();
        for n in [49u64, 121, 169, 539] {
            assert!(!primes.contains(&n), "{} must be crossed out", n);
        }
    }
}
