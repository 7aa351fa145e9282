//! Attribute entries, user attribute sets, and conjunction policies
//!
//! An [`Entry`] names one attribute *slot* (authority + label) together with
//! the assigned *value*; its parse form is `"AUTH.LBL:ATTR"`. A [`Policy`] is
//! a conjunction of entries, where selected rows may be negated in the
//! one-alternative (OT) sense: a negated row is satisfied only when the user
//! holds **exactly one** entry with the same authority and label but a
//! different value.
//!
//! The LSSS layer lives here as well: [`Policy::share_secret`] splits the
//! master secret into per-row shares `λ` (summing to the secret) and `μ`
//! (summing to zero). Shares are drawn exactly once per run, at environment
//! construction; drawing fresh shares later would break the algebraic
//! coupling between keygen and encrypt.

use std::fmt;
use std::str::FromStr;

use ark_ff::Zero;

use crate::ops::Ops;
use crate::Z;

/// Hard cap of the synthetic attribute generator.
pub const MAX_SYNTHETIC_ATTRS: usize = 100;

/// Errors raised by attribute and policy construction.
#[derive(Debug, thiserror::Error)]
pub enum AttributeError {
    /// The parse form must contain both separators, `.` before `:`.
    #[error("malformed attribute entry `{0}` (expected `AUTH.LBL:ATTR`)")]
    MalformedEntry(String),
    /// The synthetic generator refuses oversized sets.
    #[error("synthetic attribute sets support at most {max} entries (got {got})")]
    TooManyAttributes {
        /// Requested set size.
        got: usize,
        /// The supported maximum.
        max: usize,
    },
}

// ============================================================================
// Entry
// ============================================================================

/// One atomic attribute: `(authority, label, value)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Issuing authority.
    pub auth: String,
    /// Attribute label (the slot under the authority).
    pub lbl: String,
    /// Assigned attribute value.
    pub attr: String,
}

impl FromStr for Entry {
    type Err = AttributeError;

    /// Split on the first `.` and the first following `:`; no escaping.
    /// Empty components are accepted but not meaningful.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (auth, rest) = s
            .split_once('.')
            .ok_or_else(|| AttributeError::MalformedEntry(s.to_string()))?;
        let (lbl, attr) = rest
            .split_once(':')
            .ok_or_else(|| AttributeError::MalformedEntry(s.to_string()))?;
        Ok(Entry {
            auth: auth.to_string(),
            lbl: lbl.to_string(),
            attr: attr.to_string(),
        })
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.auth, self.lbl, self.attr)
    }
}

// ============================================================================
// UserAttributes
// ============================================================================

/// Ordered sequence of entries held by one user.
///
/// No two entries should share a slot, except that evaluating a negated
/// policy row expects exactly one alternative value at that slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserAttributes {
    /// The user's entries, in insertion order.
    pub entries: Vec<Entry>,
}

impl UserAttributes {
    /// An empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and append one entry.
    pub fn add_attr(&mut self, s: &str) -> Result<(), AttributeError> {
        self.entries.push(s.parse()?);
        Ok(())
    }

    /// Append an already-built entry.
    pub fn add_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Componentwise membership test.
    pub fn has_attr(&self, entry: &Entry) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    /// Build a synthetic attribute set of `count` entries.
    ///
    /// Entry `i` is labelled `<'a'+i/26><'a'+i%26>` with value
    /// `<'0'+i/10><'0'+i%10>`; with `multi_auth` each entry gets its own
    /// authority `<'A'+i/26><'A'+i%26>`, otherwise all share `"AA"`. The
    /// value encoding is what bounds the set to [`MAX_SYNTHETIC_ATTRS`].
    pub fn random(count: usize, multi_auth: bool) -> Result<Self, AttributeError> {
        if count > MAX_SYNTHETIC_ATTRS {
            return Err(AttributeError::TooManyAttributes {
                got: count,
                max: MAX_SYNTHETIC_ATTRS,
            });
        }
        let pair = |base: u8, div: usize, i: usize| -> String {
            let hi = (base + (i / div) as u8) as char;
            let lo = (base + (i % div) as u8) as char;
            [hi, lo].iter().collect()
        };
        let mut attrs = UserAttributes::new();
        for i in 0..count {
            attrs.add_entry(Entry {
                auth: if multi_auth {
                    pair(b'A', 26, i)
                } else {
                    "AA".to_string()
                },
                lbl: pair(b'a', 26, i),
                attr: pair(b'0', 10, i),
            });
        }
        Ok(attrs)
    }
}

impl fmt::Display for UserAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, "]")
    }
}

// ============================================================================
// Policy
// ============================================================================

/// A conjunction of entries with optional OT-negated rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Policy {
    /// The conjuncts, one LSSS row each.
    pub conjunction: Vec<Entry>,
    /// Indices of negated rows.
    pub negations: Vec<usize>,
}

impl Policy {
    /// A purely positive conjunction over the given entries.
    pub fn new(attrs: UserAttributes) -> Self {
        Policy {
            conjunction: attrs.entries,
            negations: Vec::new(),
        }
    }

    /// A conjunction with the listed row indices negated.
    pub fn with_negations(attrs: UserAttributes, negations: Vec<usize>) -> Self {
        Policy {
            conjunction: attrs.entries,
            negations,
        }
    }

    /// Whether row `i` is negated.
    #[inline]
    pub fn is_negated(&self, i: usize) -> bool {
        self.negations.contains(&i)
    }

    /// Satisfaction check.
    ///
    /// A positive row requires the exact entry; a negated row requires
    /// exactly one entry at the same slot with a different value. Zero or
    /// two-plus alternatives both fail. The empty conjunction is satisfied.
    pub fn is_satisfied(&self, user_attrs: &UserAttributes) -> bool {
        for (i, curr) in self.conjunction.iter().enumerate() {
            if self.is_negated(i) {
                let num_alts = user_attrs
                    .entries
                    .iter()
                    .filter(|e| e.auth == curr.auth && e.lbl == curr.lbl && e.attr != curr.attr)
                    .count();
                if num_alts != 1 {
                    return false;
                }
            } else if !user_attrs.has_attr(curr) {
                return false;
            }
        }
        true
    }

    /// Split `secret` into per-row shares `(λ, μ)` with `Σ λ_i = secret` and
    /// `Σ μ_i = 0`.
    ///
    /// Rows `1..n` receive `-v_i` / `-v'_i` for fresh uniform `v_i`, `v'_i`;
    /// row 0 absorbs the sums. The returned vectors are never empty, so a
    /// degenerate empty conjunction still carries a well-formed share of the
    /// secret.
    pub fn share_secret(&self, secret: Z, ops: &Ops) -> (Vec<Z>, Vec<Z>) {
        let mut lambdas = vec![Z::zero()];
        let mut mus = vec![Z::zero()];
        let mut random_sum_lambda = Z::zero();
        let mut random_sum_mu = Z::zero();

        for _ in 1..self.conjunction.len() {
            let v = ops.sample_z();
            lambdas.push(ops.neg_z(v));
            random_sum_lambda = ops.add_z(random_sum_lambda, v);

            let v_prime = ops.sample_z();
            mus.push(ops.neg_z(v_prime));
            random_sum_mu = ops.add_z(random_sum_mu, v_prime);
        }
        lambdas[0] = ops.add_z(secret, random_sum_lambda);
        mus[0] = random_sum_mu;
        (lambdas, mus)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.conjunction.iter().enumerate() {
            if i > 0 {
                write!(f, " && ")?;
            }
            if self.is_negated(i) {
                write!(f, "!")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_parse_round_trip() {
        let e: Entry = "A.L:X".parse().unwrap();
        assert_eq!(e.auth, "A");
        assert_eq!(e.lbl, "L");
        assert_eq!(e.attr, "X");
        assert_eq!(e.to_string(), "A.L:X");
    }

    #[test]
    fn entry_splits_on_first_separators_only() {
        let e: Entry = "A.L.M:X:Y".parse().unwrap();
        assert_eq!(e.auth, "A");
        assert_eq!(e.lbl, "L.M");
        assert_eq!(e.attr, "X:Y");
    }

    #[test]
    fn entry_accepts_empty_components() {
        let e: Entry = ".:".parse().unwrap();
        assert_eq!(e, Entry::default());
    }

    #[test]
    fn entry_rejects_missing_separators() {
        assert!(matches!(
            "AL:X".parse::<Entry>(),
            Err(AttributeError::MalformedEntry(_))
        ));
        assert!(matches!(
            "A.LX".parse::<Entry>(),
            Err(AttributeError::MalformedEntry(_))
        ));
    }

    #[test]
    fn has_attr_is_componentwise() {
        let mut attrs = UserAttributes::new();
        attrs.add_attr("A.L:X").unwrap();
        assert!(attrs.has_attr(&"A.L:X".parse().unwrap()));
        assert!(!attrs.has_attr(&"A.L:Y".parse().unwrap()));
    }

    #[test]
    fn positive_policy_requires_every_entry() {
        let mut attrs = UserAttributes::new();
        attrs.add_attr("A.L:X").unwrap();
        attrs.add_attr("B.M:Y").unwrap();
        let policy = Policy::new(attrs.clone());
        assert!(policy.is_satisfied(&attrs));

        let mut missing_one = UserAttributes::new();
        missing_one.add_attr("A.L:X").unwrap();
        assert!(!policy.is_satisfied(&missing_one));
    }

    #[test]
    fn empty_conjunction_is_satisfied() {
        let policy = Policy::new(UserAttributes::new());
        assert!(policy.is_satisfied(&UserAttributes::new()));
    }

    #[test]
    fn negated_row_needs_exactly_one_alternative() {
        let mut policy_attrs = UserAttributes::new();
        policy_attrs.add_attr("A.L:X").unwrap();
        let policy = Policy::with_negations(policy_attrs, vec![0]);

        // One alternative value at the slot: satisfied.
        let mut one_alt = UserAttributes::new();
        one_alt.add_attr("A.L:Y").unwrap();
        assert!(policy.is_satisfied(&one_alt));

        // No entry at the slot: unsatisfied.
        assert!(!policy.is_satisfied(&UserAttributes::new()));

        // Two alternatives: ambiguous, unsatisfied.
        let mut two_alts = one_alt.clone();
        two_alts.add_attr("A.L:Z").unwrap();
        assert!(!policy.is_satisfied(&two_alts));

        // Only the forbidden value itself: unsatisfied.
        let mut exact = UserAttributes::new();
        exact.add_attr("A.L:X").unwrap();
        assert!(!policy.is_satisfied(&exact));
    }

    #[test]
    fn shares_sum_to_secret_and_zero() {
        let ops = Ops::new();
        for n in [1usize, 2, 5, 9] {
            let attrs = UserAttributes::random(n, true).unwrap();
            let policy = Policy::new(attrs);
            let secret = ops.sample_z();
            let (lambdas, mus) = policy.share_secret(secret, &ops);

            assert_eq!(lambdas.len(), n);
            assert_eq!(mus.len(), n);
            assert_eq!(lambdas.iter().sum::<Z>(), secret);
            assert!(mus.iter().sum::<Z>().is_zero());
        }
    }

    #[test]
    fn single_row_share_is_the_secret() {
        let ops = Ops::new();
        let policy = Policy::new(UserAttributes::random(1, false).unwrap());
        let secret = ops.sample_z();
        let (lambdas, mus) = policy.share_secret(secret, &ops);
        assert_eq!(lambdas, vec![secret]);
        assert_eq!(mus, vec![Z::zero()]);
    }

    #[test]
    fn synthetic_sets_are_bounded_and_well_formed() {
        assert!(matches!(
            UserAttributes::random(101, true),
            Err(AttributeError::TooManyAttributes { got: 101, max: 100 })
        ));

        let single = UserAttributes::random(30, false).unwrap();
        assert_eq!(single.entries.len(), 30);
        assert!(single.entries.iter().all(|e| e.auth == "AA"));
        assert_eq!(single.entries[29].lbl, "bd");
        assert_eq!(single.entries[29].attr, "29");

        let multi = UserAttributes::random(30, true).unwrap();
        assert_eq!(multi.entries[0].auth, "AA");
        assert_eq!(multi.entries[27].auth, "BB");
    }

    #[test]
    fn policy_display_marks_negations() {
        let mut attrs = UserAttributes::new();
        attrs.add_attr("A.L:X").unwrap();
        attrs.add_attr("B.M:Y").unwrap();
        let policy = Policy::with_negations(attrs, vec![1]);
        assert_eq!(policy.to_string(), "A.L:X && !B.M:Y");
    }
}
