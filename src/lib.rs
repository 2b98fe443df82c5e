//! Algorithmic core of a number-theory library.
//!
//! The main entry points:
//! - [`qs::quadratic_sieve`] factors an odd composite by smooth-relation
//!   collection and a GF(2) dependency.
//! - [`atkin::atkin_sieve`] generates primes in a segment by wheel-30
//!   lattice-point toggles.
//! - [`group::discrete_log`] computes discrete logarithms in the cyclic
//!   groups (Z/mZ)*.
//! - [`eisenstein::Eisenstein`] provides ring arithmetic, Euclidean
//!   division, primality, and factorisation over Z[ω].

pub mod arith;
pub mod atkin;
pub mod crt;
pub mod eisenstein;
pub mod gf2;
pub mod group;
pub mod primeset;
pub mod qs;

pub use atkin::{atkin_sieve, AtkinSieve};
pub use crt::chinese;
pub use eisenstein::Eisenstein;
pub use gf2::{Gf2Vector, SparseMatrix};
pub use group::{discrete_log, CyclicGroup, MultMod, PrimitiveRoot};
pub use primeset::SignedPrimeSet;
pub use qs::{quadratic_sieve, QsParams};
