//! Key material and ciphertext artifacts
//!
//! The pair-encoding templates address every published element through flat
//! string-keyed dictionaries (`"alpha_<auth>"`, `"k_<attr>"`, `"c_<row>"`,
//! …), so the artifacts are thin bundles of ordered maps from names to group
//! elements. Which names exist, and what each element encodes, is fixed by
//! the scheme driver in [`crate::scheme`].
//!
//! Lifecycle: master keys live for the scheme instance, a user secret key per
//! user, a ciphertext per message. None of these are serialized; hybrid
//! KEM/DEM wrapping of the blinding element is a caller concern.

use std::collections::BTreeMap;

use crate::attrs::{Policy, UserAttributes};
use crate::{Gt, G, H, Z};

/// Master secret key: scalar dictionaries over template-generated names.
///
/// `alphas` holds the per-authority master scalars, `common_vars` the
/// cross-attribute common variables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MasterSecretKey {
    /// Per-authority `α` scalars.
    pub alphas: BTreeMap<String, Z>,
    /// Common variables shared across attributes of an authority.
    pub common_vars: BTreeMap<String, Z>,
}

/// Master public key: the image of the MSK under lift and pairing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MasterPublicKey {
    /// `e(g, h)^α` per authority.
    pub alphas: BTreeMap<String, Gt>,
    /// Common variables lifted into `G`.
    pub common_vars_g: BTreeMap<String, G>,
    /// Common variables lifted into `H`.
    pub common_vars_h: BTreeMap<String, H>,
}

/// User secret key: the attribute set plus its key polynomials.
///
/// "Non-lone" variables are randomness reused across rows (the GID lifts and
/// the per-authority/per-attribute bindings); "polys" are the per-attribute
/// key polynomials. Both groups carry a half of the material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserSecretKey {
    /// The attribute set this key was issued for.
    pub user_attrs: UserAttributes,
    /// Reusable randomness published in `G`.
    pub non_lone_vars_g: BTreeMap<String, G>,
    /// Reusable randomness published in `H`.
    pub non_lone_vars_h: BTreeMap<String, H>,
    /// Per-attribute key polynomials in `G`.
    pub polys_g: BTreeMap<String, G>,
    /// Per-attribute key polynomials in `H`.
    pub polys_h: BTreeMap<String, H>,
}

/// Ciphertext: the policy, the per-row polynomials, and the blinding mask.
#[derive(Clone, Debug, PartialEq)]
pub struct Ciphertext {
    /// The access policy this ciphertext is labelled with.
    pub policy: Policy,
    /// Per-row randomness published in `G`.
    pub non_lone_vars_g: BTreeMap<String, G>,
    /// Per-row randomness published in `H`.
    pub non_lone_vars_h: BTreeMap<String, H>,
    /// Per-row primary polynomials in `G`.
    pub primary_polys_g: BTreeMap<String, G>,
    /// Per-row primary polynomials in `H`.
    pub primary_polys_h: BTreeMap<String, H>,
    /// Per-row secondary polynomials in the target group.
    pub secondary_polys: BTreeMap<String, Gt>,
    /// The target-group mask a satisfying key recovers.
    pub blinding_poly: Gt,
}
