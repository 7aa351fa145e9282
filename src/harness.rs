//! End-to-end correctness harness over synthetic attribute sets
//!
//! Builds a synthetic user attribute set, derives either the matching
//! positive policy or its fully-negated counterpart, runs
//! setup → keygen → encrypt → decrypt through one shared environment, and
//! reports whether decryption succeeded *and* recovered exactly the
//! ciphertext's blinding mask.

use tracing::info;

use crate::attrs::{AttributeError, Entry, Policy, UserAttributes};
use crate::env::{Env, EnvError};
use crate::ops::Ops;
use crate::scheme::AbeScheme;

/// Failures of harness set-up (the pipeline itself reports via the result).
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Synthetic attribute generation failed.
    #[error(transparent)]
    Attribute(#[from] AttributeError),
    /// Environment construction or accessor failed.
    #[error(transparent)]
    Env(#[from] EnvError),
}

/// The fully-negated counterpart of an attribute set: per entry, the same
/// slot with value `<orig>_neg`, every row negated.
pub fn negated_policy_for(attrs: &UserAttributes) -> Policy {
    let mut policy_attrs = UserAttributes::new();
    let mut negs = Vec::with_capacity(attrs.entries.len());
    for (i, entry) in attrs.entries.iter().enumerate() {
        negs.push(i);
        policy_attrs.add_entry(Entry {
            auth: entry.auth.clone(),
            lbl: entry.lbl.clone(),
            attr: format!("{}_neg", entry.attr),
        });
    }
    Policy::with_negations(policy_attrs, negs)
}

/// Run one full pipeline over `policy_len` synthetic attributes.
///
/// Returns `Ok(true)` iff decryption succeeds and the recovered mask equals
/// `ct.blinding_poly`. `policy_len` is capped at 100 by the synthetic
/// generator.
pub fn check_correctness(
    policy_len: usize,
    multi_auth: bool,
    use_negs: bool,
) -> Result<bool, HarnessError> {
    let user_attrs = UserAttributes::random(policy_len, multi_auth)?;
    let policy = if use_negs {
        negated_policy_for(&user_attrs)
    } else {
        Policy::new(user_attrs.clone())
    };

    info!(%user_attrs, %policy, "checking correctness");

    let ops = Ops::new();
    let env = Env::new(&user_attrs, &policy, ops.clone())?;
    let mut scheme = AbeScheme::new(env, ops);

    let (msk, mpk) = scheme.setup();
    let usk = scheme.keygen(&msk, &user_attrs);
    let ct = scheme.encrypt(&mpk, &policy);

    let recovered = scheme.decrypt(&usk, &ct)?;
    Ok(matches!(recovered, Some(mask) if mask == ct.blinding_poly))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_policies_decrypt_across_lengths() {
        for len in [1usize, 2, 5] {
            assert!(check_correctness(len, false, false).unwrap());
            assert!(check_correctness(len, true, false).unwrap());
        }
    }

    #[test]
    fn negated_policies_decrypt_across_lengths() {
        for len in [1usize, 3] {
            assert!(check_correctness(len, false, true).unwrap());
            assert!(check_correctness(len, true, true).unwrap());
        }
    }

    #[test]
    fn negated_policy_shape_matches_the_attribute_set() {
        let attrs = UserAttributes::random(4, true).unwrap();
        let policy = negated_policy_for(&attrs);
        assert_eq!(policy.conjunction.len(), 4);
        assert_eq!(policy.negations, vec![0, 1, 2, 3]);
        for (row, entry) in policy.conjunction.iter().zip(attrs.entries.iter()) {
            assert_eq!(row.auth, entry.auth);
            assert_eq!(row.lbl, entry.lbl);
            assert_eq!(row.attr, format!("{}_neg", entry.attr));
        }
        assert!(policy.is_satisfied(&attrs));
    }

    #[test]
    fn oversized_requests_are_rejected() {
        assert!(matches!(
            check_correctness(101, true, false),
            Err(HarnessError::Attribute(_))
        ));
    }
}
