//! Chinese remainder combinator for two congruences with possibly
//! non-coprime moduli.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::arith::{extended_gcd, extended_gcd_i128};

/// Combine x ≡ n1 (mod m1) with x ≡ n2 (mod m2).
///
/// Returns (n, L) with L = lcm(m1, m2) and n the canonical representative
/// in [0, L), or None when the congruences are incompatible
/// (gcd(m1, m2) does not divide n1 - n2).
pub fn chinese(c1: (&BigInt, &BigInt), c2: (&BigInt, &BigInt)) -> Option<(BigInt, BigInt)> {
    let (n1, m1) = c1;
    let (n2, m2) = c2;
    assert!(!m1.is_zero() && !m2.is_zero(), "moduli must be nonzero");

    let (d, u, v) = extended_gcd(m1, m2);

    if d.is_one() {
        let l = m1 * m2;
        let n = (&v * m2 * n1 + &u * m1 * n2).mod_floor(&l);
        return Some((n, l));
    }

    if !(n1 - n2).mod_floor(&d).is_zero() {
        return None;
    }

    let l = (m1 / &d) * m2;
    let n = (&v * (m2 / &d) * n1 + &u * (m1 / &d) * n2).mod_floor(&l);
    Some((n, l))
}

/// The u64 specialisation, used where the moduli are small and the call
/// sits in an inner loop (the Atkin cross-out phase). Requires
/// lcm(m1, m2) < 2^63.
pub fn chinese_u64(c1: (u64, u64), c2: (u64, u64)) -> Option<(u64, u64)> {
    let (n1, m1) = (c1.0 as i128, c1.1 as i128);
    let (n2, m2) = (c2.0 as i128, c2.1 as i128);
    assert!(m1 != 0 && m2 != 0, "moduli must be nonzero");

    let (d, u, v) = extended_gcd_i128(m1, m2);

    if d > 1 && (n1 - n2).rem_euclid(d) != 0 {
        return None;
    }

    let l = (m1 / d) * m2;
    assert!(l < 1i128 << 63, "lcm out of range for the u64 combinator");

    // Reduce before every multiplication so intermediates stay below l^2.
    let t1 = v.rem_euclid(l) * ((m2 / d) % l) % l * (n1 % l) % l;
    let t2 = u.rem_euclid(l) * ((m1 / d) % l) % l * (n2 % l) % l;
    let n = (t1 + t2) % l;
    Some((n as u64, l as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: i64) -> BigInt {
        BigInt::from(n)
    }

    #[test]
    fn test_coprime_moduli() {
        let r = chinese((&big(1), &big(2)), (&big(2), &big(3)));
        assert_eq!(r, Some((big(5), big(6))));
    }

    #[test]
    fn test_common_factor_compatible() {
        let r = chinese((&big(3), &big(4)), (&big(5), &big(6)));
        assert_eq!(r, Some((big(11), big(12))));
    }

    #[test]
    fn test_common_factor_incompatible() {
        let r = chinese((&big(3), &big(4)), (&big(2), &big(6)));
        assert_eq!(r, None);
    }

    #[test]
    fn test_result_satisfies_both() {
        for (n1, m1, n2, m2) in [
            (7i64, 9i64, 4i64, 10i64),
            (0, 12, 6, 18),
            (5, 7, 5, 7),
            (13, 30, 3, 20),
        ] {
            match chinese((&big(n1), &big(m1)), (&big(n2), &big(m2))) {
                Some((n, l)) => {
                    assert_eq!(l, big(m1).lcm(&big(m2)), "L must be lcm");
                    assert!((&n - big(n1)).mod_floor(&big(m1)).is_zero());
                    assert!((&n - big(n2)).mod_floor(&big(m2)).is_zero());
                    assert!(n >= BigInt::from(0) && n < l);
                }
                None => {
                    let d = big(m1).gcd(&big(m2));
                    assert!(!(big(n1) - big(n2)).mod_floor(&d).is_zero());
                }
            }
        }
    }

    #[test]
    fn test_u64_agrees_with_big() {
        for (c1, c2) in [
            ((1u64, 2u64), (2u64, 3u64)),
            ((3, 4), (5, 6)),
            ((3, 4), (2, 6)),
            ((17, 60), (0, 49)),
            ((11, 60), (0, 121)),
        ] {
            let small = chinese_u64(c1, c2);
            let b = chinese(
                (&BigInt::from(c1.0), &BigInt::from(c1.1)),
                (&BigInt::from(c2.0), &BigInt::from(c2.1)),
            );
            match (small, b) {
                (Some((n, l)), Some((nb, lb))) => {
                    assert_eq!(BigInt::from(n), nb);
                    assert_eq!(BigInt::from(l), lb);
                }
                (None, None) => {}
                other => panic!("u64 and BigInt variants disagree: {:?}", other),
            }
        }
    }
}
