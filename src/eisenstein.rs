//! Eisenstein integers Z[ω], ω a primitive cube root of unity.
//!
//! Ring arithmetic uses the identity ω² = −1 − ω. The norm
//! N(a + bω) = a² − ab + b² is multiplicative, and the six units are the
//! powers of 1 + ω. Every nonzero element has a unique associate in the
//! first sextant (0 ≤ arg < π/3) and, when its norm is coprime to 3, a
//! unique primary associate congruent to 2 mod 3.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::arith::{factorize as factorize_int, is_probably_prime, isqrt, tonelli_shanks_big};

/// a + bω with arbitrary-precision coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Eisenstein {
    pub a: BigInt,
    pub b: BigInt,
}

impl Eisenstein {
    pub fn new(a: impl Into<BigInt>, b: impl Into<BigInt>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn one() -> Self {
        Self::new(1, 0)
    }

    pub fn omega() -> Self {
        Self::new(0, 1)
    }

    pub fn is_zero(&self) -> bool {
        Zero::is_zero(&self.a) && Zero::is_zero(&self.b)
    }

    /// N(a + bω) = a² − ab + b². Nonnegative; zero only at zero.
    pub fn norm(&self) -> BigInt {
        &self.a * &self.a - &self.a * &self.b + &self.b * &self.b
    }

    /// The complex conjugate (a − b) − bω.
    pub fn conjugate(&self) -> Eisenstein {
        Eisenstein {
            a: &self.a - &self.b,
            b: -&self.b,
        }
    }

    /// The six units: successive powers of 1 + ω.
    pub fn units() -> [Eisenstein; 6] {
        [
            Eisenstein::new(1, 0),
            Eisenstein::new(1, 1),
            Eisenstein::new(0, 1),
            Eisenstein::new(-1, 0),
            Eisenstein::new(-1, -1),
            Eisenstein::new(0, -1),
        ]
    }

    pub fn is_unit(&self) -> bool {
        self.norm().is_one()
    }

    /// The associate in the first sextant: b ≥ 0 and a > b picks out
    /// 0 ≤ arg < π/3. Zero maps to zero.
    pub fn abs(&self) -> Eisenstein {
        if self.is_zero() {
            return Eisenstein::zero();
        }
        for u in Eisenstein::units() {
            let c = self * &u;
            if !c.b.is_negative() && c.a > c.b {
                return c;
            }
        }
        unreachable!("one of the six associates lies in the first sextant");
    }

    /// The associate congruent to 2 mod 3 (a ≡ 2, b ≡ 0), unique when
    /// the norm is coprime to 3; None otherwise.
    pub fn primary(&self) -> Option<Eisenstein> {
        let three = BigInt::from(3);
        let two = BigInt::from(2);
        Eisenstein::units()
            .into_iter()
            .map(|u| self * &u)
            .find(|c| c.a.mod_floor(&three) == two && Zero::is_zero(&c.b.mod_floor(&three)))
    }

    /// Floored Euclidean division: (q, r) with self = q·h + r and
    /// N(r) < N(h).
    pub fn div_mod(&self, h: &Eisenstein) -> (Eisenstein, Eisenstein) {
        self.divide(h, |n, d| n.div_floor(d))
    }

    /// Truncated division: same identity, quotient rounded toward zero.
    pub fn quot_rem(&self, h: &Eisenstein) -> (Eisenstein, Eisenstein) {
        self.divide(h, |n, d| n / d)
    }

    fn divide(
        &self,
        h: &Eisenstein,
        round: impl Fn(&BigInt, &BigInt) -> BigInt,
    ) -> (Eisenstein, Eisenstein) {
        assert!(!h.is_zero(), "division by zero in Z[ω]");
        // self / h = self·h̄ / N(h), rounded coordinate-wise
        let num = self * &h.conjugate();
        let d = h.norm();
        let q = Eisenstein {
            a: round(&num.a, &d),
            b: round(&num.b, &d),
        };
        let r = self - &(&q * h);
        (q, r)
    }

    /// self / d when the division is exact, None otherwise.
    pub fn exact_div(&self, d: &Eisenstein) -> Option<Eisenstein> {
        let (q, r) = self.div_mod(d);
        if r.is_zero() {
            Some(q)
        } else {
            None
        }
    }

    /// Primality in Z[ω]: the prime above 3, rational primes ≡ 2 mod 3,
    /// and elements of rational prime norm ≡ 1 mod 3.
    pub fn is_prime(&self) -> bool {
        if self.is_zero() || self.is_unit() {
            return false;
        }
        let n = self.norm().to_biguint().expect("norm is nonnegative");
        if n == BigUint::from(3u32) {
            return true;
        }
        if is_probably_prime(&n, 24) {
            // norms are never ≡ 2 mod 3, so a prime norm > 3 is ≡ 1
            return true;
        }
        // inert case: an associate of a rational prime p ≡ 2 mod 3
        let s = isqrt(&n);
        if &s * &s == n && &s % 3u32 == BigUint::from(2u32) && is_probably_prime(&s, 24) {
            return Zero::is_zero(&self.abs().b);
        }
        false
    }

    /// An Eisenstein prime of norm p, for a rational prime p ≡ 1 (mod 6).
    ///
    /// With k = p/6, a square root s of 9k² − 1 mod p makes (s − 3k) + ω
    /// a multiple of one prime above p, recovered as a gcd with p.
    pub fn find_prime(p: &BigUint) -> Eisenstein {
        assert!(
            p % 6u32 == BigUint::one() && is_probably_prime(p, 24),
            "find_prime requires a rational prime p ≡ 1 (mod 6)"
        );
        let k = p / 6u32;
        let target = (BigUint::from(9u32) * &k * &k - BigUint::one()) % p;
        let s = tonelli_shanks_big(&target, p).expect("9k² − 1 is a residue when p ≡ 1 mod 6");
        let a = BigInt::from(s) - BigInt::from(3u32) * BigInt::from(k);
        let p_elem = Eisenstein::new(BigInt::from(p.clone()), BigInt::zero());
        let g = euclidean_gcd(&p_elem, &Eisenstein::new(a, 1)).abs();
        assert_eq!(
            g.norm(),
            BigInt::from(p.clone()),
            "gcd with (s − 3k) + ω must have norm p"
        );
        g
    }
}

impl fmt::Display for Eisenstein {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if Zero::is_zero(&self.b) {
            write!(f, "{}", self.a)
        } else if self.b.is_negative() {
            write!(f, "{} - {}ω", self.a, -&self.b)
        } else {
            write!(f, "{} + {}ω", self.a, self.b)
        }
    }
}

impl Add for &Eisenstein {
    type Output = Eisenstein;
    fn add(self, rhs: &Eisenstein) -> Eisenstein {
        Eisenstein {
            a: &self.a + &rhs.a,
            b: &self.b + &rhs.b,
        }
    }
}

impl Sub for &Eisenstein {
    type Output = Eisenstein;
    fn sub(self, rhs: &Eisenstein) -> Eisenstein {
        Eisenstein {
            a: &self.a - &rhs.a,
            b: &self.b - &rhs.b,
        }
    }
}

impl Neg for &Eisenstein {
    type Output = Eisenstein;
    fn neg(self) -> Eisenstein {
        Eisenstein {
            a: -&self.a,
            b: -&self.b,
        }
    }
}

impl Mul for &Eisenstein {
    type Output = Eisenstein;
    /// (a + bω)(c + dω) = (ac − bd) + (bc + ad − bd)ω via ω² = −1 − ω.
    fn mul(self, rhs: &Eisenstein) -> Eisenstein {
        let bd = &self.b * &rhs.b;
        Eisenstein {
            a: &self.a * &rhs.a - &bd,
            b: &self.b * &rhs.a + &self.a * &rhs.b - &bd,
        }
    }
}

/// The division capability shared by the two Euclidean carriers, the
/// rational integers and Z[ω].
pub trait EuclideanRing: Clone {
    /// Floored division: (q, r) with self = q·other + r.
    fn div_mod(&self, other: &Self) -> (Self, Self);
    /// Truncated division, same identity.
    fn quot_rem(&self, other: &Self) -> (Self, Self);
    fn is_zero(&self) -> bool;
}

impl EuclideanRing for BigInt {
    fn div_mod(&self, other: &Self) -> (Self, Self) {
        self.div_mod_floor(other)
    }
    fn quot_rem(&self, other: &Self) -> (Self, Self) {
        self.div_rem(other)
    }
    fn is_zero(&self) -> bool {
        Zero::is_zero(self)
    }
}

impl EuclideanRing for Eisenstein {
    fn div_mod(&self, other: &Self) -> (Self, Self) {
        Eisenstein::div_mod(self, other)
    }
    fn quot_rem(&self, other: &Self) -> (Self, Self) {
        Eisenstein::quot_rem(self, other)
    }
    fn is_zero(&self) -> bool {
        Eisenstein::is_zero(self)
    }
}

/// Euclidean gcd over either carrier, up to a unit.
pub fn euclidean_gcd<T: EuclideanRing>(a: &T, b: &T) -> T {
    let mut a = a.clone();
    let mut b = b.clone();
    while !b.is_zero() {
        let (_, r) = a.div_mod(&b);
        a = std::mem::replace(&mut b, r);
    }
    a
}

/// Factor a nonzero z into primary primes with multiplicity (the prime
/// above 3 is represented by its associate 2 + ω). The trailing unit is
/// not part of the output.
///
/// The norm is factored over Z; each rational prime is then lifted:
/// 3 ramifies, p ≡ 2 mod 3 stays inert with halved exponent, and
/// p ≡ 1 mod 3 splits into a conjugate pair whose exponents are found by
/// stripping p (one of each) and then the conjugate alone.
pub fn factorize(z: &Eisenstein) -> Vec<(Eisenstein, u32)> {
    assert!(!z.is_zero(), "cannot factor zero");
    let mut out = Vec::new();
    let mut rem = z.clone();
    let n = z.norm().to_biguint().expect("norm is nonnegative");

    for (p, e) in factorize_int(&n) {
        if p == BigUint::from(3u32) {
            let pi = Eisenstein::new(2, 1);
            for _ in 0..e {
                rem = rem.exact_div(&pi).expect("3^e in the norm forces (2 + ω)^e");
            }
            out.push((pi, e));
        } else if &p % 3u32 == BigUint::from(2u32) {
            assert!(e % 2 == 0, "inert prime {} must have even norm exponent", p);
            let pe = Eisenstein::new(BigInt::from(p.clone()), BigInt::zero());
            for _ in 0..e / 2 {
                rem = rem.exact_div(&pe).expect("inert prime divides to its exponent");
            }
            out.push((pe, e / 2));
        } else {
            let pi = Eisenstein::find_prime(&p)
                .primary()
                .expect("a split prime has a primary associate");
            let pi_bar = pi.conjugate();
            let p_elem = Eisenstein::new(BigInt::from(p.clone()), BigInt::zero());

            // dividing by p removes one π and one π̄ at once; whichever
            // class is left over comes off one prime at a time
            let mut both = 0u32;
            while let Some(q) = rem.exact_div(&p_elem) {
                rem = q;
                both += 1;
            }
            let mut extra_pi = 0u32;
            while let Some(q) = rem.exact_div(&pi) {
                rem = q;
                extra_pi += 1;
            }
            let mut extra_bar = 0u32;
            while let Some(q) = rem.exact_div(&pi_bar) {
                rem = q;
                extra_bar += 1;
            }
            let k_pi = both + extra_pi;
            let k_bar = both + extra_bar;
            assert_eq!(
                k_pi + k_bar,
                e,
                "split exponents of {} must sum to the norm exponent",
                p
            );
            if k_pi > 0 {
                out.push((pi, k_pi));
            }
            if k_bar > 0 {
                out.push((pi_bar, k_bar));
            }
        }
    }

    assert!(
        rem.is_unit(),
        "non-unit quotient {} after exhausting the norm factors",
        rem
    );
    out
}

/// Eisenstein primes of norm at most `norm_bound`, ascending by norm,
/// every entry in the first sextant. Split and ramified primes (norm q)
/// and inert primes (norm q²) form two ascending streams merged here;
/// within a split pair the smaller ω-coefficient comes first.
pub fn primes(norm_bound: u64) -> Vec<Eisenstein> {
    let rational = crate::arith::sieve_primes(norm_bound + 1);
    let mut split = rational
        .iter()
        .copied()
        .filter(|&q| q == 3 || q % 3 == 1)
        .peekable();
    let mut inert = rational.iter().copied().filter(|&q| q % 3 == 2).peekable();

    let mut out = Vec::new();
    loop {
        let s = split.peek().copied().filter(|&q| q <= norm_bound);
        let i = inert
            .peek()
            .and_then(|&q| q.checked_mul(q))
            .filter(|&n| n <= norm_bound);
        let take_split = match (s, i) {
            (Some(sq), Some(inorm)) => sq < inorm,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        if take_split {
            let q = split.next().expect("peeked");
            if q == 3 {
                out.push(Eisenstein::new(2, 1));
            } else {
                let pi = Eisenstein::find_prime(&BigUint::from(q));
                let sib = pi.conjugate().abs();
                let mut pair = [pi, sib];
                pair.sort_by(|x, y| (&x.b, &x.a).cmp(&(&y.b, &y.a)));
                out.extend(pair);
            }
        } else {
            let q = inert.next().expect("peeked");
            out.push(Eisenstein::new(BigInt::from(q), BigInt::zero()));
        }
    }
    out
}
