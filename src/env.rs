//! Per-run environment: universe bookkeeping and randomness coordination
//!
//! [`Env`] is built once per `(user attributes, policy)` pair and threaded
//! through all four algorithms of a run. It owns everything the algorithms
//! must agree on:
//!
//! - the universe of authorities, labels, and attribute values (the union of
//!   the policy and the user set), with the `attr → auth` and `attr → lbl`
//!   maps validated for consistency at construction;
//! - the master secret and its LSSS shares `λ` / `μ`, drawn exactly once;
//! - the two GID scalars binding a user's key material to one identity;
//! - the per-attribute scalars `x_attr`, sampled on first read and memoised
//!   so keygen and encrypt observe the same value.
//!
//! The memoisation is the only mutation after construction; an `Env` must
//! not be shared across scheme instances or threads.

use std::collections::{BTreeMap, BTreeSet};

use ark_ff::Zero;
use tracing::debug;

use crate::attrs::{Entry, Policy, UserAttributes};
use crate::ops::Ops;
use crate::{G, H, Z};

/// Precondition violations raised by environment construction and accessors.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// The same attribute value is claimed by two authorities.
    #[error("attribute `{attr}` is bound to conflicting authorities `{existing}` and `{incoming}`")]
    ConflictingAuthority {
        /// The attribute value.
        attr: String,
        /// Authority recorded first.
        existing: String,
        /// Authority of the conflicting entry.
        incoming: String,
    },
    /// The same attribute value is claimed under two labels.
    #[error("attribute `{attr}` is bound to conflicting labels `{existing}` and `{incoming}`")]
    ConflictingLabel {
        /// The attribute value.
        attr: String,
        /// Label recorded first.
        existing: String,
        /// Label of the conflicting entry.
        incoming: String,
    },
    /// Lookup of an attribute outside the run's universe.
    #[error("attribute `{0}` is not part of this run's universe")]
    UnknownAttribute(String),
    /// A negated row where the user holds the forbidden value itself.
    #[error("negation at row {row} is not satisfied: the attribute itself is present")]
    NegatedAttributePresent {
        /// The offending LSSS row.
        row: usize,
    },
    /// A negated row with no alternative value at the slot.
    #[error("negation at row {row} is not satisfied: no alternative is present")]
    NoAlternative {
        /// The offending LSSS row.
        row: usize,
    },
    /// A negated row with two or more alternatives at the slot.
    #[error("negation at row {row} is not satisfied: more than one alternative is present")]
    AmbiguousAlternative {
        /// The offending LSSS row.
        row: usize,
    },
}

/// Deterministic per-run bookkeeping shared by the four algorithms.
#[derive(Clone, Debug)]
pub struct Env {
    ops: Ops,
    policy: Vec<Entry>,
    negs: Vec<usize>,
    user_attrs: Vec<Entry>,
    auths: BTreeSet<String>,
    lbls: BTreeSet<String>,
    attr_uni: BTreeSet<String>,
    attr_to_auth: BTreeMap<String, String>,
    attr_to_lbl: BTreeMap<String, String>,
    secret: Z,
    rgid_g: Z,
    rgid_h: Z,
    lambdas: Vec<Z>,
    mus: Vec<Z>,
    xattrs: BTreeMap<String, Z>,
}

impl Env {
    /// Build the environment for one run.
    ///
    /// Collects the universe over the policy and the user set, validates the
    /// attribute maps, samples the master secret and the GID scalars, and
    /// derives the LSSS shares. Fails if any attribute value is bound to two
    /// different authorities or labels.
    pub fn new(attrs: &UserAttributes, policy: &Policy, ops: Ops) -> Result<Self, EnvError> {
        let mut env = Env {
            ops,
            policy: policy.conjunction.clone(),
            negs: policy.negations.clone(),
            user_attrs: attrs.entries.clone(),
            auths: BTreeSet::new(),
            lbls: BTreeSet::new(),
            attr_uni: BTreeSet::new(),
            attr_to_auth: BTreeMap::new(),
            attr_to_lbl: BTreeMap::new(),
            secret: Z::zero(),
            rgid_g: Z::zero(),
            rgid_h: Z::zero(),
            lambdas: Vec::new(),
            mus: Vec::new(),
            xattrs: BTreeMap::new(),
        };

        for entry in policy.conjunction.iter().chain(attrs.entries.iter()) {
            env.absorb(entry)?;
        }

        env.secret = env.ops.sample_z();
        env.rgid_g = env.ops.sample_z();
        env.rgid_h = env.ops.sample_z();
        let (lambdas, mus) = policy.share_secret(env.secret, &env.ops);
        env.lambdas = lambdas;
        env.mus = mus;

        debug!(
            authorities = env.auths.len(),
            labels = env.lbls.len(),
            attributes = env.attr_uni.len(),
            rows = env.policy.len(),
            negated = env.negs.len(),
            "environment constructed"
        );
        Ok(env)
    }

    /// Record one entry into the universe, rejecting conflicting bindings.
    fn absorb(&mut self, entry: &Entry) -> Result<(), EnvError> {
        self.auths.insert(entry.auth.clone());
        self.lbls.insert(entry.lbl.clone());
        self.attr_uni.insert(entry.attr.clone());

        match self.attr_to_auth.get(&entry.attr) {
            Some(existing) if existing != &entry.auth => {
                return Err(EnvError::ConflictingAuthority {
                    attr: entry.attr.clone(),
                    existing: existing.clone(),
                    incoming: entry.auth.clone(),
                });
            }
            _ => {
                self.attr_to_auth
                    .insert(entry.attr.clone(), entry.auth.clone());
            }
        }
        match self.attr_to_lbl.get(&entry.attr) {
            Some(existing) if existing != &entry.lbl => {
                return Err(EnvError::ConflictingLabel {
                    attr: entry.attr.clone(),
                    existing: existing.clone(),
                    incoming: entry.lbl.clone(),
                });
            }
            _ => {
                self.attr_to_lbl
                    .insert(entry.attr.clone(), entry.lbl.clone());
            }
        }
        Ok(())
    }

    // --------------------------- Universe queries ---------------------------

    /// All authorities, in sorted order.
    pub fn get_authorities(&self) -> Vec<String> {
        self.auths.iter().cloned().collect()
    }

    /// All attribute values, in sorted order.
    pub fn get_attribute_universe(&self) -> Vec<String> {
        self.attr_uni.iter().cloned().collect()
    }

    /// The user's attribute values, in insertion order.
    pub fn get_user_attributes(&self) -> Vec<String> {
        self.user_attrs.iter().map(|e| e.attr.clone()).collect()
    }

    /// All labels, in sorted order.
    pub fn get_labels(&self) -> Vec<String> {
        self.lbls.iter().cloned().collect()
    }

    // ----------------------------- Row queries ------------------------------

    /// Every LSSS row index.
    pub fn get_lsss_rows(&self) -> Vec<usize> {
        (0..self.policy.len()).collect()
    }

    /// The non-negated row indices.
    pub fn get_pos_lsss_rows(&self) -> Vec<usize> {
        (0..self.policy.len())
            .filter(|i| !self.negs.contains(i))
            .collect()
    }

    /// The negated row indices.
    pub fn get_neg_lsss_rows(&self) -> Vec<usize> {
        (0..self.policy.len())
            .filter(|i| self.negs.contains(i))
            .collect()
    }

    /// Deduplication indices.
    ///
    /// Currently the constant `[1]`: every attribute is unique in all
    /// aspects. Extension point for encodings that deduplicate shared slots.
    pub fn get_deduplication_idcs(&self) -> Vec<usize> {
        vec![1]
    }

    /// Row indices entering the final linear combination.
    pub fn get_linear_combination_idcs(&self) -> Vec<usize> {
        (0..self.policy.len()).collect()
    }

    /// Non-negated rows of the final linear combination.
    pub fn get_positive_linear_combination_idcs(&self) -> Vec<usize> {
        self.get_pos_lsss_rows()
    }

    /// Negated rows of the final linear combination.
    pub fn get_negative_linear_combination_idcs(&self) -> Vec<usize> {
        self.get_neg_lsss_rows()
    }

    // -------------------------- String conversions --------------------------

    /// Authority name as a dictionary key fragment.
    pub fn auth_to_string(&self, auth: &str) -> String {
        auth.to_string()
    }

    /// Attribute value as a dictionary key fragment.
    pub fn attr_to_string(&self, attr: &str) -> String {
        attr.to_string()
    }

    /// Label as a dictionary key fragment.
    pub fn lbl_to_string(&self, lbl: &str) -> String {
        lbl.to_string()
    }

    /// Row index as a dictionary key fragment.
    pub fn ls_row_to_string(&self, i: usize) -> String {
        i.to_string()
    }

    /// Deduplication index as a dictionary key fragment.
    pub fn dedup_idx_to_string(&self, i: usize) -> String {
        i.to_string()
    }

    // --------------------------- Row/attr resolvers --------------------------

    /// The authority controlling an attribute value.
    pub fn attr_to_auth(&self, attr: &str) -> Result<String, EnvError> {
        self.attr_to_auth
            .get(attr)
            .cloned()
            .ok_or_else(|| EnvError::UnknownAttribute(attr.to_string()))
    }

    /// The label an attribute value is filed under.
    pub fn attr_to_lbl(&self, attr: &str) -> Result<String, EnvError> {
        self.attr_to_lbl
            .get(attr)
            .cloned()
            .ok_or_else(|| EnvError::UnknownAttribute(attr.to_string()))
    }

    /// Deduplication index of a row (constant 1, see
    /// [`Env::get_deduplication_idcs`]).
    pub fn ls_row_to_dedup_idx(&self, _i: usize) -> usize {
        1
    }

    /// Authority of row `i`.
    pub fn ls_row_to_auth(&self, i: usize) -> &str {
        &self.policy[i].auth
    }

    /// Label of row `i`.
    pub fn ls_row_to_lbl(&self, i: usize) -> &str {
        &self.policy[i].lbl
    }

    /// Attribute value of row `i`.
    pub fn ls_row_to_attr(&self, i: usize) -> &str {
        &self.policy[i].attr
    }

    /// The unique alternative the user holds at a negated row's slot.
    ///
    /// Fails unless the user has exactly one entry with the row's authority
    /// and label and a different value.
    pub fn ls_row_to_alt_attr(&self, i: usize) -> Result<String, EnvError> {
        let (auth, lbl, trgt) = (
            self.ls_row_to_auth(i),
            self.ls_row_to_lbl(i),
            self.ls_row_to_attr(i),
        );
        let alts: Vec<&Entry> = self
            .user_attrs
            .iter()
            .filter(|e| e.auth == auth && e.lbl == lbl && e.attr != trgt)
            .collect();
        match alts.len() {
            0 => Err(EnvError::NoAlternative { row: i }),
            1 => Ok(alts[0].attr.clone()),
            _ => Err(EnvError::AmbiguousAlternative { row: i }),
        }
    }

    // --------------------------- Scalar accessors ---------------------------

    /// The GID scalar lifted into `G`.
    pub fn get_rgid_g(&self) -> G {
        self.ops.lift_g(self.rgid_g)
    }

    /// The GID scalar lifted into `H`.
    pub fn get_rgid_h(&self) -> H {
        self.ops.lift_h(self.rgid_h)
    }

    /// The master secret of this run.
    pub fn get_secret(&self) -> Z {
        self.secret
    }

    /// Share of the secret at row `i` (`Σ λ_i = secret`).
    pub fn get_lambda(&self, i: usize) -> Z {
        self.lambdas[i]
    }

    /// Share of zero at row `i` (`Σ μ_i = 0`).
    pub fn get_mu(&self, i: usize) -> Z {
        self.mus[i]
    }

    /// Linear-combination coefficient of row `i`.
    ///
    /// Constant 1 for a conjunction: every row participates with unit weight.
    pub fn get_epsilon(&self, _i: usize) -> Z {
        self.ops.read_z("1")
    }

    /// The per-attribute scalar, sampled on first read and memoised.
    ///
    /// Two reads of the same value always agree, which is what couples the
    /// key-side and ciphertext-side polynomials of one run.
    pub fn get_xattr(&mut self, attr: &str) -> Z {
        if let Some(x) = self.xattrs.get(attr) {
            return *x;
        }
        let x = self.ops.sample_z();
        self.xattrs.insert(attr.to_string(), x);
        x
    }

    /// The x-scalar of the unique alternative at a negated row.
    ///
    /// Unlike [`Env::ls_row_to_alt_attr`], holding the forbidden value itself
    /// is reported as its own violation.
    pub fn get_xattr_alt(&mut self, row: usize) -> Result<Z, EnvError> {
        let (auth, lbl, trgt) = (
            self.ls_row_to_auth(row).to_string(),
            self.ls_row_to_lbl(row).to_string(),
            self.ls_row_to_attr(row).to_string(),
        );
        let mut alts = Vec::new();
        for entry in &self.user_attrs {
            if entry.auth == auth && entry.lbl == lbl {
                if entry.attr == trgt {
                    return Err(EnvError::NegatedAttributePresent { row });
                }
                alts.push(entry.attr.clone());
            }
        }
        match alts.len() {
            0 => Err(EnvError::NoAlternative { row }),
            1 => Ok(self.get_xattr(&alts[0])),
            _ => Err(EnvError::AmbiguousAlternative { row }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
