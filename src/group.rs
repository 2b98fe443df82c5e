//! Group structure of (Z/mZ)* and discrete logarithms.
//!
//! The multiplicative group mod m is cyclic exactly when m is 2, 4, an
//! odd prime power, or twice an odd prime power. Logarithms mod p^k
//! reduce to the prime case through an explicit additive homomorphism;
//! the prime case is baby-step/giant-step for small p and a Pollard rho
//! walk beyond that.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

use crate::arith::{
    factorize, mod_inv_u64, mod_inverse, mod_pow_u64, mul_mod_u64, random_below,
};
use crate::crt::chinese;

/// Moduli up to this bound use BSGS for the prime-field base case;
/// larger ones use the rho walk.
const BSGS_LIMIT: u64 = 100_000_000;

/// Classification of the moduli whose multiplicative group is cyclic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CyclicGroup {
    Two,
    Four,
    OddPrimePower { p: BigUint, k: u32 },
    TwiceOddPrimePower { p: BigUint, k: u32 },
}

impl CyclicGroup {
    /// Classify m, or None when (Z/mZ)* is not cyclic.
    pub fn classify(m: &BigUint) -> Option<CyclicGroup> {
        let two = BigUint::from(2u32);
        if *m < two {
            return None;
        }
        if *m == two {
            return Some(CyclicGroup::Two);
        }
        if *m == BigUint::from(4u32) {
            return Some(CyclicGroup::Four);
        }
        let factors = factorize(m);
        match factors.as_slice() {
            [(p, k)] if p.is_odd() => Some(CyclicGroup::OddPrimePower {
                p: p.clone(),
                k: *k,
            }),
            [(q, 1), (p, k)] if *q == two && p.is_odd() => {
                Some(CyclicGroup::TwiceOddPrimePower {
                    p: p.clone(),
                    k: *k,
                })
            }
            _ => None,
        }
    }

    pub fn modulus(&self) -> BigUint {
        match self {
            CyclicGroup::Two => BigUint::from(2u32),
            CyclicGroup::Four => BigUint::from(4u32),
            CyclicGroup::OddPrimePower { p, k } => p.pow(*k),
            CyclicGroup::TwiceOddPrimePower { p, k } => p.pow(*k) * 2u32,
        }
    }

    /// The group order φ(m).
    pub fn order(&self) -> BigUint {
        match self {
            CyclicGroup::Two => BigUint::one(),
            CyclicGroup::Four => BigUint::from(2u32),
            CyclicGroup::OddPrimePower { p, k }
            | CyclicGroup::TwiceOddPrimePower { p, k } => (p - 1u32) * p.pow(*k - 1),
        }
    }
}

/// A residue in [0, m) together with the proof that gcd(value, m) = 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultMod {
    value: BigUint,
    modulus: BigUint,
}

impl MultMod {
    /// Reduce value mod m; None when the residue is not invertible.
    pub fn new(value: &BigUint, modulus: &BigUint) -> Option<MultMod> {
        if *modulus < BigUint::from(2u32) {
            return None;
        }
        let v = value % modulus;
        if v.gcd(modulus).is_one() {
            Some(MultMod {
                value: v,
                modulus: modulus.clone(),
            })
        } else {
            None
        }
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }
}

/// A residue that generates its cyclic group.
#[derive(Debug, Clone)]
pub struct PrimitiveRoot {
    residue: MultMod,
}

impl PrimitiveRoot {
    /// Validate a candidate generator; None when it fails the test.
    pub fn new(residue: MultMod, group: &CyclicGroup) -> Option<PrimitiveRoot> {
        assert_eq!(
            *residue.modulus(),
            group.modulus(),
            "residue and group modulus must agree"
        );
        if is_primitive_root(&residue, group) {
            Some(PrimitiveRoot { residue })
        } else {
            None
        }
    }

    /// The smallest generator of the group.
    pub fn find(group: &CyclicGroup) -> PrimitiveRoot {
        let m = group.modulus();
        match group {
            CyclicGroup::Two => PrimitiveRoot {
                residue: MultMod::new(&BigUint::one(), &m).expect("1 is a unit"),
            },
            CyclicGroup::Four => PrimitiveRoot {
                residue: MultMod::new(&BigUint::from(3u32), &m).expect("3 is a unit mod 4"),
            },
            _ => {
                let mut r = BigUint::from(2u32);
                loop {
                    if let Some(candidate) = MultMod::new(&r, &m) {
                        if is_primitive_root(&candidate, group) {
                            return PrimitiveRoot { residue: candidate };
                        }
                    }
                    r += 1u32;
                }
            }
        }
    }

    pub fn residue(&self) -> &MultMod {
        &self.residue
    }
}

/// Primitive-root test. For p^k: r must generate F_p* (checked against
/// every prime q dividing p − 1) and, for k >= 2, satisfy
/// r^(p−1) ≢ 1 (mod p²). For 2p^k the residue is odd by coprimality and
/// the p^k conditions apply to r mod p^k.
fn is_primitive_root(r: &MultMod, group: &CyclicGroup) -> bool {
    let one = BigUint::one();
    match group {
        CyclicGroup::Two => r.value().is_one(),
        CyclicGroup::Four => *r.value() == BigUint::from(3u32),
        CyclicGroup::OddPrimePower { p, k }
        | CyclicGroup::TwiceOddPrimePower { p, k } => {
            let rp = r.value() % p;
            if rp.is_zero() {
                return false;
            }
            let p_minus_1 = p - &one;
            for (q, _) in factorize(&p_minus_1) {
                if rp.modpow(&(&p_minus_1 / &q), p).is_one() {
                    return false;
                }
            }
            if *k >= 2 {
                let p2 = p * p;
                if (r.value() % &p2).modpow(&p_minus_1, &p2).is_one() {
                    return false;
                }
            }
            true
        }
    }
}

/// Knobs for the rho base case; the attempt cap bounds the retry loop
/// over starting pairs.
#[derive(Debug, Clone)]
pub struct DlogParams {
    pub rho_max_attempts: u32,
    pub rho_max_iters: u64,
}

impl Default for DlogParams {
    fn default() -> Self {
        Self {
            rho_max_attempts: 32,
            rho_max_iters: 1 << 26,
        }
    }
}

/// The unique e in [0, ord(a)) with a^e ≡ b (mod m).
/// None only when the rho walk exhausted its attempt budget.
pub fn discrete_log(
    group: &CyclicGroup,
    base: &PrimitiveRoot,
    target: &MultMod,
) -> Option<BigUint> {
    discrete_log_with_params(group, base, target, &DlogParams::default())
}

pub fn discrete_log_with_params(
    group: &CyclicGroup,
    base: &PrimitiveRoot,
    target: &MultMod,
    params: &DlogParams,
) -> Option<BigUint> {
    let m = group.modulus();
    assert_eq!(*base.residue().modulus(), m, "base is not in this group");
    assert_eq!(*target.modulus(), m, "target is not in this group");

    match group {
        CyclicGroup::Two => Some(BigUint::zero()),
        CyclicGroup::Four => {
            if target.value().is_one() {
                Some(BigUint::zero())
            } else {
                Some(BigUint::one())
            }
        }
        CyclicGroup::OddPrimePower { p, k } => dlog_odd_prime_power(
            p,
            *k,
            base.residue().value(),
            target.value(),
            params,
        ),
        CyclicGroup::TwiceOddPrimePower { p, k } => {
            // t ↦ t mod p^k is an isomorphism onto (Z/p^kZ)*
            let pk = p.pow(*k);
            let a = base.residue().value() % &pk;
            let b = target.value() % &pk;
            dlog_odd_prime_power(p, *k, &a, &b, params)
        }
    }
}

/// Bach reduction: the k = 1 base case plus an explicit lift through the
/// additive homomorphism θ onto Z/p^(k−1).
fn dlog_odd_prime_power(
    p: &BigUint,
    k: u32,
    a: &BigUint,
    b: &BigUint,
    params: &DlogParams,
) -> Option<BigUint> {
    let one = BigUint::one();
    if k == 1 {
        return dlog_prime(p, &(a % p), &(b % p), params);
    }

    let e0 = dlog_prime(p, &(a % p), &(b % p), params)?;

    // θ(x) = ((x^(p^k − p^(k−1)) − 1) mod p^(2k−1)) / p^k, taken mod
    // p^(k−1). Writing x^φ = 1 + p^k·z mod p^(2k−1), products add the
    // z parts, so θ is additive and a primitive root maps to a unit.
    let pk = p.pow(k);
    let pk1 = p.pow(k - 1);
    let lift_mod = p.pow(2 * k - 1);
    let exp = &pk - &pk1;
    let theta = |x: &BigUint| -> BigUint {
        let y = x.modpow(&exp, &lift_mod);
        ((y - &one) / &pk) % &pk1
    };

    let ta = theta(a);
    let tb = theta(b);
    let ta_inv = mod_inverse(&ta, &pk1).expect("θ of a primitive root is a unit");
    let c = ta_inv * tb % &pk1;

    let p_minus_1 = p - &one;
    let (e, _) = chinese(
        (&BigInt::from(e0), &BigInt::from(p_minus_1)),
        (&BigInt::from(c), &BigInt::from(pk1)),
    )
    .expect("p − 1 and p^(k−1) are coprime");
    Some(e.to_biguint().expect("canonical representative"))
}

/// Discrete log in F_p*: BSGS below the limit, rho beyond it.
fn dlog_prime(
    p: &BigUint,
    a: &BigUint,
    b: &BigUint,
    params: &DlogParams,
) -> Option<BigUint> {
    if let Some(p64) = p.to_u64() {
        if p64 < BSGS_LIMIT {
            let a64 = a.to_u64().expect("residue below p");
            let b64 = b.to_u64().expect("residue below p");
            return bsgs(p64, a64, b64);
        }
    }
    pollard_rho_dlog(p, a, b, params)
}

/// Baby-step giant-step with m = ⌈√(p−1)⌉ baby steps. The table keeps
/// the smallest exponent per value, so the returned e is the least one.
fn bsgs(p: u64, a: u64, b: u64) -> Option<BigUint> {
    let ord = p - 1;
    let mut m = (ord as f64).sqrt().ceil() as u64;
    while m * m < ord {
        m += 1;
    }

    let mut table: HashMap<u64, u64> = HashMap::with_capacity(m as usize);
    let mut cur = 1u64;
    for j in 0..m {
        table.entry(cur).or_insert(j);
        cur = mul_mod_u64(cur, a, p);
    }

    let giant = mod_inv_u64(mod_pow_u64(a, m, p), p)?;
    let mut gamma = b % p;
    for i in 0..=m {
        if let Some(&j) = table.get(&gamma) {
            return Some(BigUint::from((i * m + j) % ord));
        }
        gamma = mul_mod_u64(gamma, giant, p);
    }
    None
}

/// Pollard rho with the standard three-region walk
/// (x², a·x, b·x by x mod 3) and Floyd collision search. On collision,
/// e·(β₁−β₂) ≡ α₂−α₁ (mod p−1) is solved with a gcd precheck; a large
/// gcd or an unusable collision restarts with a fresh pair.
fn pollard_rho_dlog(
    p: &BigUint,
    a: &BigUint,
    b: &BigUint,
    params: &DlogParams,
) -> Option<BigUint> {
    let one = BigUint::one();
    let ord = p - &one;
    let three = BigUint::from(3u32);
    let two = BigUint::from(2u32);

    let step = |x: &BigUint, alpha: &BigUint, beta: &BigUint| -> (BigUint, BigUint, BigUint) {
        match (x % &three).to_u32().expect("residue mod 3") {
            0 => ((x * x) % p, alpha * &two % &ord, beta * &two % &ord),
            1 => ((x * a) % p, (alpha + &one) % &ord, beta.clone()),
            _ => ((x * b) % p, alpha.clone(), (beta + &one) % &ord),
        }
    };

    let mut rng = StdRng::seed_from_u64(0x74_6f_72_74_6f_69_73_65);
    for _ in 0..params.rho_max_attempts {
        let alpha0 = random_below(&ord, &mut rng);
        let beta0 = random_below(&ord, &mut rng);
        let x0 = a.modpow(&alpha0, p) * b.modpow(&beta0, p) % p;

        let mut tort = (x0.clone(), alpha0.clone(), beta0.clone());
        let mut hare = (x0, alpha0, beta0);
        let mut collided = false;
        for _ in 0..params.rho_max_iters {
            tort = step(&tort.0, &tort.1, &tort.2);
            hare = step(&hare.0, &hare.1, &hare.2);
            hare = step(&hare.0, &hare.1, &hare.2);
            if tort.0 == hare.0 {
                collided = true;
                break;
            }
        }
        if !collided {
            continue;
        }

        let d = (&ord + &tort.2 - &hare.2) % &ord;
        let c = (&ord + &hare.1 - &tort.1) % &ord;
        if d.is_zero() {
            continue;
        }
        let g = d.gcd(&ord);
        if g > BigUint::from(64u32) || !(&c % &g).is_zero() {
            continue;
        }

        let m = &ord / &g;
        let inv = mod_inverse(&(&d / &g), &m).expect("d/g is a unit mod ord/g");
        let e0 = inv * (&c / &g) % &m;
        let g64 = g.to_u64().expect("gcd passed the precheck");
        for i in 0..g64 {
            let e = (&e0 + &m * BigUint::from(i)) % &ord;
            if a.modpow(&e, p) == *b {
                return Some(e);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_of(m: u64) -> CyclicGroup {
        CyclicGroup::classify(&BigUint::from(m)).expect("cyclic modulus")
    }

    #[test]
    fn test_classify() {
        assert_eq!(group_of(2), CyclicGroup::Two);
        assert_eq!(group_of(4), CyclicGroup::Four);
        assert_eq!(
            group_of(27),
            CyclicGroup::OddPrimePower {
                p: BigUint::from(3u32),
                k: 3
            }
        );
        assert_eq!(
            group_of(18),
            CyclicGroup::TwiceOddPrimePower {
                p: BigUint::from(3u32),
                k: 2
            }
        );
        for m in [1u64, 8, 12, 15, 16, 24] {
            assert!(
                CyclicGroup::classify(&BigUint::from(m)).is_none(),
                "(Z/{}Z)* is not cyclic",
                m
            );
        }
    }

    #[test]
    fn test_group_order() {
        assert_eq!(group_of(27).order(), BigUint::from(18u32));
        assert_eq!(group_of(18).order(), BigUint::from(6u32));
        assert_eq!(group_of(4).order(), BigUint::from(2u32));
    }

    #[test]
    fn test_mult_mod_requires_unit() {
        let m = BigUint::from(18u32);
        assert!(MultMod::new(&BigUint::from(5u32), &m).is_some());
        assert!(MultMod::new(&BigUint::from(6u32), &m).is_none());
        assert!(MultMod::new(&BigUint::from(23u32), &m).is_some()); // reduces to 5
    }

    #[test]
    fn test_find_primitive_root() {
        let g = group_of(13);
        let root = PrimitiveRoot::find(&g);
        assert_eq!(*root.residue().value(), BigUint::from(2u32));

        let g = group_of(18);
        let root = PrimitiveRoot::find(&g);
        assert_eq!(*root.residue().value(), BigUint::from(5u32));
    }

    #[test]
    fn test_primitive_root_rejects_non_generator() {
        let g = group_of(13);
        // 3 has order 3 mod 13 (27 = 1)
        let three = MultMod::new(&BigUint::from(3u32), &BigUint::from(13u32)).unwrap();
        assert!(PrimitiveRoot::new(three, &g).is_none());
    }

    #[test]
    fn test_prime_power_needs_p_squared_condition() {
        // 14 generates mod 29 but 14^28 ≡ 1 (mod 29²), so it fails mod 29²
        let g29 = group_of(29);
        let m29 = BigUint::from(29u32);
        let c = MultMod::new(&BigUint::from(14u32), &m29).unwrap();
        assert!(PrimitiveRoot::new(c, &g29).is_some());

        let g841 = group_of(841);
        let m841 = BigUint::from(841u32);
        let c = MultMod::new(&BigUint::from(14u32), &m841).unwrap();
        assert!(PrimitiveRoot::new(c, &g841).is_none());
    }

    #[test]
    fn test_dlog_scenario_mod_13() {
        let g = group_of(13);
        let a = PrimitiveRoot::find(&g);
        let b = MultMod::new(&BigUint::from(11u32), &BigUint::from(13u32)).unwrap();
        assert_eq!(discrete_log(&g, &a, &b), Some(BigUint::from(7u32)));
    }

    #[test]
    fn test_dlog_trivial_groups() {
        let g2 = group_of(2);
        let a = PrimitiveRoot::find(&g2);
        let b = MultMod::new(&BigUint::one(), &BigUint::from(2u32)).unwrap();
        assert_eq!(discrete_log(&g2, &a, &b), Some(BigUint::zero()));

        let g4 = group_of(4);
        let a = PrimitiveRoot::find(&g4);
        let b1 = MultMod::new(&BigUint::one(), &BigUint::from(4u32)).unwrap();
        let b3 = MultMod::new(&BigUint::from(3u32), &BigUint::from(4u32)).unwrap();
        assert_eq!(discrete_log(&g4, &a, &b1), Some(BigUint::zero()));
        assert_eq!(discrete_log(&g4, &a, &b3), Some(BigUint::one()));
    }

    #[test]
    fn test_dlog_round_trip_prime_powers() {
        for m in [27u64, 81, 343, 18, 50, 121] {
            let g = group_of(m);
            let a = PrimitiveRoot::find(&g);
            let modulus = g.modulus();
            let order = g.order().to_u64().unwrap();
            for e in [0u64, 1, 5, order - 1, order / 2 + 1] {
                let b_val = a.residue().value().modpow(&BigUint::from(e), &modulus);
                let b = MultMod::new(&b_val, &modulus).unwrap();
                let found = discrete_log(&g, &a, &b).expect("dlog must exist");
                assert_eq!(
                    found,
                    BigUint::from(e % order),
                    "dlog of {}^{} mod {}",
                    a.residue().value(),
                    e,
                    m
                );
            }
        }
    }

    #[test]
    fn test_dlog_rho_large_prime() {
        // 2^31 − 1 is prime with primitive root 7; forces the rho path.
        let p = BigUint::from(2_147_483_647u64);
        let g = CyclicGroup::classify(&p).expect("prime modulus");
        let a_val = MultMod::new(&BigUint::from(7u32), &p).unwrap();
        let a = PrimitiveRoot::new(a_val, &g).expect("7 generates F_p*");
        let e = BigUint::from(1_234_567_890u64);
        let b_val = BigUint::from(7u32).modpow(&e, &p);
        let b = MultMod::new(&b_val, &p).unwrap();
        let found = discrete_log(&g, &a, &b).expect("rho must collide");
        assert_eq!(found, e);
    }

    #[test]
    #[should_panic(expected = "not in this group")]
    fn test_dlog_modulus_mismatch_is_a_caller_bug() {
        let g = group_of(13);
        let a = PrimitiveRoot::find(&g);
        let b = MultMod::new(&BigUint::from(2u32), &BigUint::from(11u32)).unwrap();
        let _ = discrete_log(&g, &a, &b);
    }
}
