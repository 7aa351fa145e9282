//! Algebraic operations over the BN254 pairing groups
//!
//! [`Ops`] bundles the arithmetic the pair-encoding templates are written
//! against: scalar-field operations on `Z`, generator lifts and scalings in
//! the source groups `G`/`H`, target-group accumulation in `Gt`, the bilinear
//! pairing, and a full-domain hash (FDH) into either source group.
//!
//! ## Conventions
//!
//! - `Gt` is additive: `add_gt` is target-group multiplication, `reset_gt` is
//!   unity, `scale_gt(z, x)` is exponentiation by `z`.
//! - `reset_g`/`reset_h` return the explicit group identity, i.e. the image
//!   of the generator under scalar 0. Accumulation loops in the templates
//!   start from these values.
//! - FDH outputs are derived with BLAKE3 under a fixed domain-separation
//!   preamble and memoised per `"<idx>:<arg>"` key, so repeated hashes of
//!   the same slot are free.

use std::collections::BTreeMap;
use std::io::Read;

use ark_bn254::Bn254;
use ark_ec::pairing::Pairing;
use ark_ec::Group;
use ark_ff::{Field, One, PrimeField, UniformRand, Zero};
use blake3::Hasher;

use crate::{Gt, G, H, Z};

/// Fixed preamble separating FDH derivations from any other BLAKE3 use.
const FDH_DST: &[u8] = b"maabe.fdh.v1";

/// Arithmetic bundle consumed by the scheme templates.
///
/// Trivially constructible and cloneable; the only state is the FDH memo
/// table, which is a pure cache (two `Ops` instances always agree on every
/// operation).
#[derive(Clone, Debug, Default)]
pub struct Ops {
    /// Memoised hash-to-field scalars, keyed by `"<idx>:<arg>"`.
    fdhs: BTreeMap<String, Z>,
}

impl Ops {
    /// Create a fresh operations bundle with an empty FDH cache.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------ Scalars ------------------------------

    /// Sample a scalar uniformly modulo the group order.
    ///
    /// Randomness comes from the process-wide CSPRNG; sampling is the only
    /// shared resource of the whole engine.
    pub fn sample_z(&self) -> Z {
        Z::rand(&mut rand::thread_rng())
    }

    /// The scalar 1.
    #[inline]
    pub fn one_z(&self) -> Z {
        Z::one()
    }

    /// Embed a small signed integer into the scalar field.
    pub fn set_z(&self, val: i64) -> Z {
        if val < 0 {
            -Z::from(val.unsigned_abs())
        } else {
            Z::from(val as u64)
        }
    }

    /// Read a decimal string (optionally sign-prefixed) into the field.
    ///
    /// Non-digit characters are a template bug, not a runtime condition.
    pub fn read_z(&self, s: &str) -> Z {
        let (neg, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut acc = Z::zero();
        let ten = Z::from(10u64);
        for c in digits.chars() {
            let d = c.to_digit(10).expect("decimal digit in scalar literal");
            acc = acc * ten + Z::from(d as u64);
        }
        if neg {
            -acc
        } else {
            acc
        }
    }

    /// `lhs + rhs` in the scalar field.
    #[inline]
    pub fn add_z(&self, lhs: Z, rhs: Z) -> Z {
        lhs + rhs
    }

    /// `lhs - rhs` in the scalar field.
    #[inline]
    pub fn sub_z(&self, lhs: Z, rhs: Z) -> Z {
        lhs - rhs
    }

    /// `lhs * rhs` in the scalar field.
    #[inline]
    pub fn mul_z(&self, lhs: Z, rhs: Z) -> Z {
        lhs * rhs
    }

    /// `0 - arg`.
    #[inline]
    pub fn neg_z(&self, arg: Z) -> Z {
        -arg
    }

    /// Modular inverse.
    ///
    /// Field elements are kept canonically reduced, so no normalisation is
    /// needed before inverting. Inverting zero is a template bug.
    pub fn inv_z(&self, arg: Z) -> Z {
        arg.inverse().expect("modular inverse of zero")
    }

    /// Scale a scalar by a small signed integer.
    #[inline]
    pub fn scale_z(&self, lhs: i64, rhs: Z) -> Z {
        self.set_z(lhs) * rhs
    }

    /// The scalar 0, the neutral starting value of scalar accumulations.
    #[inline]
    pub fn reset_z(&self) -> Z {
        Z::zero()
    }

    // ------------------------------ Group G ------------------------------

    /// `z · g1` for the fixed generator `g1`.
    #[inline]
    pub fn lift_g(&self, z: Z) -> G {
        G::generator() * z
    }

    /// `z · p`.
    #[inline]
    pub fn scale_g(&self, z: Z, p: G) -> G {
        p * z
    }

    /// `p + q`.
    #[inline]
    pub fn add_g(&self, p: G, q: G) -> G {
        p + q
    }

    /// The explicit identity of `G` (`lift_g(0)`).
    #[inline]
    pub fn reset_g(&self) -> G {
        G::zero()
    }

    /// Full-domain hash of `"<idx>:<arg>"` into `G`.
    ///
    /// `idx` provides domain separation between hash families.
    pub fn fdh_g(&mut self, idx: u32, arg: &str) -> G {
        G::generator() * self.fdh_scalar(idx, arg)
    }

    // ------------------------------ Group H ------------------------------

    /// `z · g2` for the fixed generator `g2`.
    #[inline]
    pub fn lift_h(&self, z: Z) -> H {
        H::generator() * z
    }

    /// `z · p`.
    #[inline]
    pub fn scale_h(&self, z: Z, p: H) -> H {
        p * z
    }

    /// `p + q`.
    #[inline]
    pub fn add_h(&self, p: H, q: H) -> H {
        p + q
    }

    /// The explicit identity of `H` (`lift_h(0)`).
    #[inline]
    pub fn reset_h(&self) -> H {
        H::zero()
    }

    /// Full-domain hash of `"<idx>:<arg>"` into `H`.
    pub fn fdh_h(&mut self, idx: u32, arg: &str) -> H {
        H::generator() * self.fdh_scalar(idx, arg)
    }

    // ------------------------------ Group Gt -----------------------------

    /// `e(g1, g2)^z`.
    #[inline]
    pub fn lift_gt(&self, z: Z) -> Gt {
        Gt::generator() * z
    }

    /// `x^z` (additively: `z · x`).
    #[inline]
    pub fn scale_gt(&self, z: Z, x: Gt) -> Gt {
        x * z
    }

    /// Target-group multiplication.
    #[inline]
    pub fn add_gt(&self, x: Gt, y: Gt) -> Gt {
        x + y
    }

    /// Target-group inversion.
    #[inline]
    pub fn inv_gt(&self, x: Gt) -> Gt {
        -x
    }

    /// Target-group unity, the neutral starting value of pairing products.
    #[inline]
    pub fn reset_gt(&self) -> Gt {
        Gt::zero()
    }

    /// A uniformly random target-group element.
    pub fn random_gt(&self) -> Gt {
        Gt::rand(&mut rand::thread_rng())
    }

    /// The bilinear map `e: G × H → Gt`.
    #[inline]
    pub fn pair(&self, g: G, h: H) -> Gt {
        Bn254::pairing(g, h)
    }

    // ------------------------------ Internals -----------------------------

    /// Hash-to-field under the FDH preamble, memoised per key.
    fn fdh_scalar(&mut self, idx: u32, arg: &str) -> Z {
        debug_assert!(!arg.is_empty(), "FDH argument must be non-empty");
        let key = format!("{idx}:{arg}");
        if let Some(z) = self.fdhs.get(&key) {
            return *z;
        }
        let mut h = Hasher::new();
        h.update(FDH_DST);
        h.update(b":key:");
        h.update(&(key.len() as u64).to_be_bytes());
        h.update(key.as_bytes());
        let mut xof = h.finalize_xof();
        let mut buf = [0u8; 64];
        let _ = xof.read(&mut buf);
        let z = Z::from_le_bytes_mod_order(&buf);
        self.fdhs.insert(key, z);
        z
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_ops_match_field_arithmetic() {
        let ops = Ops::new();
        let a = ops.sample_z();
        let b = ops.sample_z();

        assert_eq!(ops.add_z(a, b), a + b);
        assert_eq!(ops.sub_z(a, b), a - b);
        assert_eq!(ops.mul_z(a, b), a * b);
        assert_eq!(ops.add_z(a, ops.neg_z(a)), Z::zero());
        assert_eq!(ops.reset_z(), Z::zero());
        assert_eq!(ops.one_z(), Z::one());
    }

    #[test]
    fn read_z_parses_decimal_literals() {
        let ops = Ops::new();
        assert_eq!(ops.read_z("0"), Z::zero());
        assert_eq!(ops.read_z("1"), Z::one());
        assert_eq!(ops.read_z("123"), ops.set_z(123));
        assert_eq!(ops.read_z("-7"), ops.set_z(-7));
        // Multi-limb literal: 2^64 = 18446744073709551616.
        let two64 = Z::from(u64::MAX) + Z::one();
        assert_eq!(ops.read_z("18446744073709551616"), two64);
    }

    #[test]
    fn inverse_cancels_multiplication() {
        let ops = Ops::new();
        for _ in 0..8 {
            let a = ops.sample_z();
            if a.is_zero() {
                continue;
            }
            assert_eq!(ops.mul_z(a, ops.inv_z(a)), Z::one());
        }
        // Inverses of negated representatives are exact as well.
        let a = ops.set_z(42);
        assert_eq!(ops.mul_z(ops.neg_z(a), ops.inv_z(ops.neg_z(a))), Z::one());
    }

    #[test]
    fn scale_by_negative_int_matches_neg() {
        let ops = Ops::new();
        let a = ops.sample_z();
        assert_eq!(ops.scale_z(-1, a), ops.neg_z(a));
        assert_eq!(ops.scale_z(3, a), a + a + a);
    }

    #[test]
    fn group_laws_hold_in_g_and_h() {
        let ops = Ops::new();
        let a = ops.sample_z();
        let p = ops.lift_g(a);

        assert_eq!(ops.add_g(p, ops.reset_g()), p);
        assert_eq!(ops.scale_g(Z::zero(), p), ops.reset_g());
        assert_eq!(ops.scale_g(Z::one(), p), p);

        let q = ops.lift_h(a);
        assert_eq!(ops.add_h(q, ops.reset_h()), q);
        assert_eq!(ops.scale_h(Z::zero(), q), ops.reset_h());
        assert_eq!(ops.scale_h(Z::one(), q), q);
    }

    #[test]
    fn lift_is_additive() {
        let ops = Ops::new();
        let a = ops.sample_z();
        let b = ops.sample_z();
        assert_eq!(ops.lift_g(a + b), ops.add_g(ops.lift_g(a), ops.lift_g(b)));
        assert_eq!(ops.lift_h(a + b), ops.add_h(ops.lift_h(a), ops.lift_h(b)));
        assert_eq!(
            ops.lift_gt(a + b),
            ops.add_gt(ops.lift_gt(a), ops.lift_gt(b))
        );
    }

    #[test]
    fn pairing_is_bilinear_on_lifts() {
        let ops = Ops::new();
        let a = ops.sample_z();
        let b = ops.sample_z();
        assert_eq!(ops.pair(ops.lift_g(a), ops.lift_h(b)), ops.lift_gt(a * b));
    }

    #[test]
    fn gt_inverse_and_unity() {
        let ops = Ops::new();
        let x = ops.random_gt();
        assert_eq!(ops.add_gt(x, ops.inv_gt(x)), ops.reset_gt());
        assert_eq!(ops.add_gt(x, ops.reset_gt()), x);
    }

    #[test]
    fn fdh_is_deterministic_and_memoised() {
        let mut ops = Ops::new();
        let p1 = ops.fdh_g(0, "AA.aa:00");
        let p2 = ops.fdh_g(0, "AA.aa:00");
        assert_eq!(p1, p2);

        // A fresh instance derives the same point from scratch.
        let mut other = Ops::new();
        assert_eq!(other.fdh_g(0, "AA.aa:00"), p1);
    }

    #[test]
    fn fdh_separates_domains_and_inputs() {
        let mut ops = Ops::new();
        let base = ops.fdh_g(0, "AA.aa:00");
        assert_ne!(ops.fdh_g(1, "AA.aa:00"), base);
        assert_ne!(ops.fdh_g(0, "AA.aa:01"), base);
    }

    #[test]
    fn fdh_g_and_h_agree_under_the_pairing() {
        let mut ops = Ops::new();
        let g = ops.fdh_g(2, "slot");
        let h = ops.fdh_h(2, "slot");
        // Same derived scalar on both sides of the pairing.
        assert_eq!(
            ops.pair(g, H::generator()),
            ops.pair(G::generator(), h)
        );
    }
}
