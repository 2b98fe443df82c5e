//! Shared integer arithmetic: modular primitives, primality testing,
//! square roots, the Eratosthenes seed sieve, and a rational-integer
//! factoriser (trial division plus Pollard rho, Brent variant).

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Modular exponentiation for u64 operands with u128 intermediates.
pub fn mod_pow_u64(base: u64, mut exp: u64, m: u64) -> u64 {
    if m == 1 {
        return 0;
    }
    let m128 = m as u128;
    let mut result = 1u128;
    let mut b = (base % m) as u128;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * b % m128;
        }
        exp >>= 1;
        b = b * b % m128;
    }
    result as u64
}

/// Multiply two u64 values modulo m without overflow.
pub fn mul_mod_u64(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

/// Extended GCD over i128: returns (g, x, y) with a*x + b*y = g.
pub fn extended_gcd_i128(a: i128, b: i128) -> (i128, i128, i128) {
    if a == 0 {
        return (b, 0, 1);
    }
    let (g, x, y) = extended_gcd_i128(b % a, a);
    (g, y - (b / a) * x, x)
}

/// Modular inverse of a mod m for u64 operands. None if gcd(a, m) != 1.
pub fn mod_inv_u64(a: u64, m: u64) -> Option<u64> {
    let (g, x, _) = extended_gcd_i128(a as i128, m as i128);
    if g != 1 {
        return None;
    }
    Some(x.rem_euclid(m as i128) as u64)
}

/// Extended GCD over BigInt: returns (g, x, y) with a*x + b*y = g, g >= 0.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let e = a.extended_gcd(b);
    (e.gcd, e.x, e.y)
}

/// Modular inverse: a^(-1) mod m, or None if gcd(a, m) != 1.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m <= &BigUint::one() {
        return None;
    }
    let a_int = BigInt::from(a.clone());
    let m_int = BigInt::from(m.clone());
    let (g, x, _) = extended_gcd(&a_int, &m_int);
    if !g.is_one() {
        return None;
    }
    let r = x.mod_floor(&m_int);
    Some(r.to_biguint().expect("mod_floor of positive modulus"))
}

/// Integer square root (floor) of a BigUint via Newton's method.
pub fn isqrt(n: &BigUint) -> BigUint {
    if n.is_zero() {
        return BigUint::zero();
    }
    let mut x = n.clone();
    let mut y = (&x + BigUint::one()) >> 1u32;
    while y < x {
        x = y.clone();
        y = (&x + n / &x) >> 1u32;
    }
    x
}

/// Smallest r with r*r >= n.
pub fn isqrt_ceil(n: &BigUint) -> BigUint {
    let s = isqrt(n);
    if &s * &s == *n {
        s
    } else {
        s + BigUint::one()
    }
}

/// Deterministic Miller-Rabin for u64 using the standard witness set.
pub fn is_prime_u64(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }

    let mut d = n - 1;
    let mut s = 0u32;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    let witnesses = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    'outer: for &a in &witnesses {
        if a >= n {
            continue;
        }
        let mut x = mod_pow_u64(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 0..s - 1 {
            x = mul_mod_u64(x, x, n);
            if x == n - 1 {
                continue 'outer;
            }
        }
        return false;
    }
    true
}

/// Draw a uniform BigUint below `bound` (rejection on the top byte).
pub(crate) fn random_below(bound: &BigUint, rng: &mut impl Rng) -> BigUint {
    let bytes = bound.to_bytes_be();
    loop {
        let mut buf = vec![0u8; bytes.len()];
        rng.fill(&mut buf[..]);
        let candidate = BigUint::from_bytes_be(&buf);
        if &candidate < bound {
            return candidate;
        }
    }
}

/// Miller-Rabin probabilistic primality test for BigUint.
pub fn is_probably_prime(n: &BigUint, rounds: u32) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }
    if *n == two || *n == BigUint::from(3u32) {
        return true;
    }
    if n.is_even() {
        return false;
    }
    if let Some(small) = n.to_u64() {
        return is_prime_u64(small);
    }

    let n_minus_1 = n - &one;
    let mut d = n_minus_1.clone();
    let mut r = 0u32;
    while d.is_even() {
        d >>= 1u32;
        r += 1;
    }

    let mut rng = StdRng::seed_from_u64(0x6d69_6c6c_6572);
    'witness: for _ in 0..rounds {
        let a = random_below(&(&n_minus_1 - &one), &mut rng) + &two;
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_1 {
            continue 'witness;
        }
        for _ in 0..r - 1 {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// All primes below `bound` by the Sieve of Eratosthenes. Seeds the Atkin
/// cross-out phase and the small-factor front door of the CLI.
pub fn sieve_primes(bound: u64) -> Vec<u64> {
    if bound < 3 {
        return vec![];
    }
    let limit = bound as usize;
    let mut is_prime = vec![true; limit];
    is_prime[0] = false;
    is_prime[1] = false;
    let mut p = 2usize;
    while p * p < limit {
        if is_prime[p] {
            let mut multiple = p * p;
            while multiple < limit {
                is_prime[multiple] = false;
                multiple += p;
            }
        }
        p += 1;
    }
    (2..limit).filter(|&i| is_prime[i]).map(|i| i as u64).collect()
}

/// Square root of n modulo an odd prime p (Tonelli-Shanks).
/// Returns one root r; the other is p - r. None if n is a non-residue.
pub fn tonelli_shanks(n: u64, p: u64) -> Option<u64> {
    if p == 2 {
        return Some(n % 2);
    }
    let n = n % p;
    if n == 0 {
        return Some(0);
    }
    if mod_pow_u64(n, (p - 1) / 2, p) != 1 {
        return None;
    }

    // p - 1 = q * 2^s with q odd
    let mut q = p - 1;
    let mut s = 0u32;
    while q % 2 == 0 {
        q /= 2;
        s += 1;
    }

    if s == 1 {
        return Some(mod_pow_u64(n, (p + 1) / 4, p));
    }

    // Any quadratic non-residue serves as the generator of the 2-Sylow part.
    let mut z = 2u64;
    while mod_pow_u64(z, (p - 1) / 2, p) != p - 1 {
        z += 1;
    }

    let mut m = s;
    let mut c = mod_pow_u64(z, q, p);
    let mut t = mod_pow_u64(n, q, p);
    let mut r = mod_pow_u64(n, (q + 1) / 2, p);

    loop {
        if t == 1 {
            return Some(r);
        }
        let mut i = 1u32;
        let mut t2 = mul_mod_u64(t, t, p);
        while t2 != 1 {
            t2 = mul_mod_u64(t2, t2, p);
            i += 1;
            if i >= m {
                return None;
            }
        }
        let b = mod_pow_u64(c, 1u64 << (m - i - 1), p);
        m = i;
        c = mul_mod_u64(b, b, p);
        t = mul_mod_u64(t, c, p);
        r = mul_mod_u64(r, b, p);
    }
}

/// Tonelli-Shanks over BigUint, for odd prime moduli beyond u64.
pub fn tonelli_shanks_big(n: &BigUint, p: &BigUint) -> Option<BigUint> {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    if *p == two {
        return Some(n % p);
    }
    let n = n % p;
    if n.is_zero() {
        return Some(BigUint::zero());
    }
    let p_minus_1 = p - &one;
    let half = &p_minus_1 >> 1u32;
    if n.modpow(&half, p) != one {
        return None;
    }

    let mut q = p_minus_1.clone();
    let mut s = 0u32;
    while q.is_even() {
        q >>= 1u32;
        s += 1;
    }

    if s == 1 {
        let exp = (p + &one) >> 2u32;
        return Some(n.modpow(&exp, p));
    }

    let mut z = two.clone();
    while z.modpow(&half, p) != p_minus_1 {
        z += &one;
    }

    let mut m = s;
    let mut c = z.modpow(&q, p);
    let mut t = n.modpow(&q, p);
    let mut r = n.modpow(&((&q + &one) >> 1u32), p);

    loop {
        if t == one {
            return Some(r);
        }
        let mut i = 1u32;
        let mut t2 = t.modpow(&two, p);
        while t2 != one {
            t2 = t2.modpow(&two, p);
            i += 1;
            if i >= m {
                return None;
            }
        }
        let b = c.modpow(&(BigUint::one() << (m - i - 1)), p);
        m = i;
        c = b.modpow(&two, p);
        t = (&t * &c) % p;
        r = (&r * &b) % p;
    }
}

/// Pollard's rho with Brent's cycle detection and batched gcd.
///
/// Returns a nontrivial factor of an odd composite `n`, or None if every
/// attempt cycled trivially. Deterministic: the walk parameters are drawn
/// from a seeded generator.
pub fn pollard_rho_brent(n: &BigUint) -> Option<BigUint> {
    pollard_rho_brent_with_attempts(n, 20)
}

fn pollard_rho_brent_with_attempts(n: &BigUint, max_attempts: u32) -> Option<BigUint> {
    let one = BigUint::one();
    let two = BigUint::from(2u32);

    if *n <= one {
        return None;
    }
    if n.is_even() {
        return Some(two);
    }

    let mut rng = StdRng::seed_from_u64(0x62_72_65_6e_74);

    for _ in 0..max_attempts {
        let c = loop {
            let c = random_below(n, &mut rng);
            if !c.is_zero() && c != n - &two {
                break c;
            }
        };
        let mut y = loop {
            let y = random_below(n, &mut rng);
            if !y.is_zero() {
                break y;
            }
        };

        let f = |x: &BigUint| -> BigUint { (x * x + &c) % n };

        let mut r: u64 = 1;
        let mut q = BigUint::one();
        let mut ys = y.clone();
        let mut x = y.clone();
        let mut d = BigUint::one();
        let mut bailed = false;

        while d == one {
            x = y.clone();
            for _ in 0..r {
                y = f(&y);
            }
            let mut k: u64 = 0;
            while k < r && d == one {
                ys = y.clone();
                let batch = std::cmp::min(128, r - k);
                for _ in 0..batch {
                    y = f(&y);
                    let diff = if y > x { &y - &x } else { &x - &y };
                    q = (q * &diff) % n;
                }
                d = q.gcd(n);
                k += batch;
            }
            r *= 2;
            if r > 1 << 22 {
                bailed = true;
                break;
            }
        }

        if d == *n || bailed {
            // Batch gcd collapsed; replay one step at a time from the save point.
            let d2 = loop {
                ys = f(&ys);
                let diff = if ys > x { &ys - &x } else { &x - &ys };
                let g = diff.gcd(n);
                if g != one {
                    break g;
                }
            };
            if d2 == *n {
                continue;
            }
            return Some(d2);
        }

        if d > one && d < *n {
            return Some(d);
        }
    }

    None
}

/// Factor a positive integer completely into (prime, exponent) pairs,
/// sorted by prime. Trial division strips the small part; Pollard rho
/// (Brent) splits whatever remains.
pub fn factorize(n: &BigUint) -> Vec<(BigUint, u32)> {
    let one = BigUint::one();
    let mut factors: Vec<(BigUint, u32)> = Vec::new();
    if *n <= one {
        return factors;
    }

    let mut remaining = n.clone();
    for p in sieve_primes(10_000) {
        let p_big = BigUint::from(p);
        if &p_big * &p_big > remaining {
            break;
        }
        let mut e = 0u32;
        while (&remaining % &p_big).is_zero() {
            remaining /= &p_big;
            e += 1;
        }
        if e > 0 {
            factors.push((p_big, e));
        }
    }

    let mut stack = vec![remaining];
    while let Some(m) = stack.pop() {
        if m <= one {
            continue;
        }
        if is_probably_prime(&m, 24) {
            if let Some(idx) = factors.iter().position(|(p, _)| *p == m) {
                factors[idx].1 += 1;
            } else {
                factors.push((m, 1));
            }
            continue;
        }
        let d = pollard_rho_brent(&m).expect("composite must split under rho");
        let q = &m / &d;
        stack.push(d);
        stack.push(q);
    }

    factors.sort_by(|(p, _), (q, _)| p.cmp(q));
    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_pow_u64() {
        assert_eq!(mod_pow_u64(2, 10, 1000), 24);
        assert_eq!(mod_pow_u64(3, 0, 7), 1);
        assert_eq!(mod_pow_u64(5, 690, 691), 1);
        assert_eq!(mod_pow_u64(7, 1, 7), 0);
    }

    #[test]
    fn test_mod_inv_u64() {
        assert_eq!(mod_inv_u64(3, 7), Some(5));
        assert_eq!(mod_inv_u64(6, 9), None);
        assert_eq!(mod_inv_u64(2, 691), Some(346));
    }

    #[test]
    fn test_mod_inverse_big() {
        let a = BigUint::from(17u32);
        let m = BigUint::from(43u32);
        let inv = mod_inverse(&a, &m).expect("17 and 43 are coprime");
        assert_eq!((&a * &inv) % &m, BigUint::one());
        assert!(mod_inverse(&BigUint::from(6u32), &BigUint::from(9u32)).is_none());
    }

    #[test]
    fn test_extended_gcd_identity() {
        let a = BigInt::from(240);
        let b = BigInt::from(46);
        let (g, x, y) = extended_gcd(&a, &b);
        assert_eq!(g, BigInt::from(2));
        assert_eq!(&a * &x + &b * &y, g);
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(&BigUint::from(0u32)), BigUint::zero());
        assert_eq!(isqrt(&BigUint::from(15u32)), BigUint::from(3u32));
        assert_eq!(isqrt(&BigUint::from(16u32)), BigUint::from(4u32));
        assert_eq!(isqrt_ceil(&BigUint::from(15u32)), BigUint::from(4u32));
        assert_eq!(isqrt_ceil(&BigUint::from(16u32)), BigUint::from(4u32));
    }

    #[test]
    fn test_is_prime_u64() {
        assert!(is_prime_u64(2));
        assert!(is_prime_u64(691));
        assert!(is_prime_u64(104_729));
        assert!(!is_prime_u64(1));
        assert!(!is_prime_u64(15_347));
    }

    #[test]
    fn test_is_probably_prime_big() {
        // 2^89 - 1 is a Mersenne prime
        let m89 = (BigUint::one() << 89u32) - BigUint::one();
        assert!(is_probably_prime(&m89, 20));
        let composite = &m89 * BigUint::from(3u32);
        assert!(!is_probably_prime(&composite, 20));
    }

    #[test]
    fn test_sieve_primes() {
        assert_eq!(sieve_primes(2), Vec::<u64>::new());
        assert_eq!(sieve_primes(30), vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert_eq!(sieve_primes(100).len(), 25);
    }

    #[test]
    fn test_tonelli_shanks() {
        // 6 is a QR mod 29 (8^2 = 64 = 6 mod 29)
        let r = tonelli_shanks(6, 29).expect("6 is a residue mod 29");
        assert_eq!(mul_mod_u64(r, r, 29), 6);
        // 2 is a non-residue mod 5
        assert!(tonelli_shanks(2, 5).is_none());
        // p = 1 mod 4 exercises the full loop
        let r = tonelli_shanks(10, 13).expect("10 is a residue mod 13");
        assert_eq!(mul_mod_u64(r, r, 13), 10);
    }

    #[test]
    fn test_tonelli_shanks_big() {
        let p = BigUint::from(1_000_000_007u64);
        let a = BigUint::from(4_563_728u64);
        let sq = (&a * &a) % &p;
        let r = tonelli_shanks_big(&sq, &p).expect("square must be a residue");
        assert_eq!((&r * &r) % &p, sq);
    }

    #[test]
    fn test_pollard_rho_brent() {
        let n = BigUint::from(8051u32); // 83 * 97
        let f = pollard_rho_brent(&n).expect("8051 must split");
        assert!((&n % &f).is_zero());
        assert!(f > BigUint::one() && f < n);
    }

    #[test]
    fn test_factorize() {
        let n = BigUint::from(2u32.pow(4) * 3 * 49);
        let factors = factorize(&n);
        assert_eq!(
            factors,
            vec![
                (BigUint::from(2u32), 4),
                (BigUint::from(3u32), 1),
                (BigUint::from(7u32), 2),
            ]
        );
        let product = factors
            .iter()
            .fold(BigUint::one(), |acc, (p, e)| acc * p.pow(*e));
        assert_eq!(product, n);
    }

    #[test]
    fn test_factorize_semiprime() {
        let n = BigUint::from(100_003u64) * BigUint::from(100_019u64);
        let factors = factorize(&n);
        assert_eq!(factors.len(), 2);
        assert_eq!(factors[0], (BigUint::from(100_003u64), 1));
        assert_eq!(factors[1], (BigUint::from(100_019u64), 1));
    }
}
