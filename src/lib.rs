//! Crate root: public surface, group aliases, and scheme-wide invariants
//!
//! This module is the single canonical entry-point for downstream users of
//! the library. It centralizes the scalar/group aliases over the BN254
//! pairing, the shared error categories, and re-exports the submodules that
//! implement the multi-authority ABE engine.
//!
//! ## Invariants
//!
//! - **Field & curve.** The scalar field is `ark_bn254::Fr` (`Z` in this
//!   crate). The two source groups are `G1`/`G2` projective points on BN254
//!   (`G` and `H`), the target group is `PairingOutput<Bn254>` (`Gt`). Gt is
//!   written additively: `Gt::zero()` is the multiplicative unity of the
//!   target field and `+` is target-group multiplication. We **forbid
//!   unsafe** throughout the crate.
//!
//! - **One environment per run.** [`Env`] carries the master secret, the LSSS
//!   shares, the two GID scalars, and the lazily memoised per-attribute
//!   scalars. The same `Env` instance must be threaded through
//!   setup → keygen → encrypt → decrypt; the memoisation is what makes the
//!   key-side and ciphertext-side polynomials agree.
//!
//! - **Failure mode.** Construction-time precondition violations (malformed
//!   entries, conflicting attribute bindings, missing or ambiguous negation
//!   alternatives) surface as precise typed errors. An unsatisfied policy is
//!   a normal `None` from decrypt, never an error.
//!
//! ## Example
//!
//! ```
//! use maabe::{AbeScheme, Env, Ops, Policy, UserAttributes};
//!
//! let mut attrs = UserAttributes::new();
//! attrs.add_attr("HOSPITAL.role:doctor").unwrap();
//! attrs.add_attr("REGION.site:north").unwrap();
//! let policy = Policy::new(attrs.clone());
//!
//! let ops = Ops::new();
//! let env = Env::new(&attrs, &policy, ops.clone()).unwrap();
//! let mut scheme = AbeScheme::new(env, ops);
//!
//! let (msk, mpk) = scheme.setup();
//! let usk = scheme.keygen(&msk, &attrs);
//! let ct = scheme.encrypt(&mpk, &policy);
//!
//! let recovered = scheme.decrypt(&usk, &ct).unwrap().expect("policy holds");
//! assert_eq!(recovered, ct.blinding_poly);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

use ark_ec::pairing::PairingOutput;

/// Key material and ciphertext artifacts (string-keyed element dictionaries).
pub mod artifacts;
/// Attribute entries, user attribute sets, policies, and LSSS sharing.
pub mod attrs;
/// Per-run environment: universe bookkeeping, shares, memoised randomness.
pub mod env;
/// Correctness harness over synthetic attribute sets.
pub mod harness;
/// Algebraic operations on scalars, source groups, and the target group.
pub mod ops;
/// The four pair-encoding algorithms: setup, keygen, encrypt, decrypt.
pub mod scheme;

// ============================================================================
// Canonical aliases (centralization)
// ============================================================================

/// Scalar field element (BN254 `Fr`).
pub type Z = ark_bn254::Fr;

/// First source group (BN254 `G1`, projective).
pub type G = ark_bn254::G1Projective;

/// Second source group (BN254 `G2`, projective).
pub type H = ark_bn254::G2Projective;

/// Pairing target group, additively written (`zero()` is unity).
pub type Gt = PairingOutput<ark_bn254::Bn254>;

// ============================================================================
// Root-level re-exports
// ============================================================================

pub use crate::artifacts::{Ciphertext, MasterPublicKey, MasterSecretKey, UserSecretKey};
pub use crate::attrs::{AttributeError, Entry, Policy, UserAttributes};
pub use crate::env::{Env, EnvError};
pub use crate::ops::Ops;
pub use crate::scheme::AbeScheme;
