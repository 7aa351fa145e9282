//! The four pair-encoding algorithms: setup, keygen, encrypt, decrypt
//!
//! Each algorithm is a fixed arithmetic template over the dictionaries of
//! [`crate::artifacts`], parameterised by the per-run [`Env`] and the
//! arithmetic in [`Ops`]. The encoding is an AW11-style multi-authority
//! ciphertext-policy scheme for conjunctions with one-alternative negations,
//! converted to the Type-3 setting: every published variable carries a half
//! in each source group, and the two GID scalars are independently
//! load-bearing (the `H` side carries `α` and the `μ` shares, the `G` side
//! carries the second common-variable leg).
//!
//! ## Per-authority variables
//!
//! Setup draws `α_A`, `b_A`, `b'_A` for every authority `A` in the universe
//! and publishes `e(g,h)^{α_A}`, plus `b_A`/`b'_A` lifted into both groups.
//!
//! ## Row identity
//!
//! For a row with attribute `a`, authority `A`, shares `λ_i`/`μ_i` and row
//! randomness `s_i`, the decryption quotient of a matching key recovers
//!
//! ```text
//! X_i = e(g,h)^{α_A·λ_i + r_h·μ_i}
//! ```
//!
//! so the product over all rows telescopes to the blinding mask
//! `e(g,h)^{Σ_A α_A·σ_A}` (`σ_A` the authority's slice of the secret): the
//! `λ_i` regroup by authority and the `μ_i` cancel under the single
//! coefficient `r_h`. A negated row evaluates the quotient at the user's
//! unique alternative value and strips the `x_a − x_{a'}` residual with the
//! per-authority GID bindings.

use std::collections::BTreeMap;

use ark_ff::Zero;
use tracing::debug;

use crate::artifacts::{Ciphertext, MasterPublicKey, MasterSecretKey, UserSecretKey};
use crate::attrs::{Policy, UserAttributes};
use crate::env::{Env, EnvError};
use crate::ops::Ops;
use crate::{Gt, Z};

/// Driver for one scheme instance.
///
/// Owns the per-run environment; the four algorithms must all go through the
/// same instance so they observe the same shares and memoised scalars.
#[derive(Clone, Debug)]
pub struct AbeScheme {
    env: Env,
    ops: Ops,
}

impl AbeScheme {
    /// Bind a scheme instance to its per-run environment.
    pub fn new(env: Env, ops: Ops) -> Self {
        AbeScheme { env, ops }
    }

    /// Draw the master key pair for every authority in the universe.
    pub fn setup(&self) -> (MasterSecretKey, MasterPublicKey) {
        let mut msk = MasterSecretKey::default();
        let mut mpk = MasterPublicKey::default();

        for auth in self.env.get_authorities() {
            let alpha = self.ops.sample_z();
            let b = self.ops.sample_z();
            let bp = self.ops.sample_z();

            let a_name = format!("alpha_{}", self.env.auth_to_string(&auth));
            let b_name = format!("b_{}", self.env.auth_to_string(&auth));
            let bp_name = format!("bp_{}", self.env.auth_to_string(&auth));

            mpk.alphas.insert(a_name.clone(), self.ops.lift_gt(alpha));
            mpk.common_vars_g.insert(b_name.clone(), self.ops.lift_g(b));
            mpk.common_vars_g
                .insert(bp_name.clone(), self.ops.lift_g(bp));
            mpk.common_vars_h.insert(b_name.clone(), self.ops.lift_h(b));
            mpk.common_vars_h
                .insert(bp_name.clone(), self.ops.lift_h(bp));

            msk.alphas.insert(a_name, alpha);
            msk.common_vars.insert(b_name, b);
            msk.common_vars.insert(bp_name, bp);
        }

        debug!(authorities = msk.alphas.len(), "setup complete");
        (msk, mpk)
    }

    /// Issue a user secret key over `user_attrs`, bound to this run's GID.
    ///
    /// Every attribute polynomial incorporates the lifted GID scalars, which
    /// is what ties the whole key to a single identity and defeats mixing
    /// attributes from different users.
    pub fn keygen(&mut self, msk: &MasterSecretKey, user_attrs: &UserAttributes) -> UserSecretKey {
        let mut usk = UserSecretKey {
            user_attrs: user_attrs.clone(),
            ..Default::default()
        };

        let rgid_g = self.env.get_rgid_g();
        let rgid_h = self.env.get_rgid_h();
        usk.non_lone_vars_g.insert("rgid".to_string(), rgid_g);
        usk.non_lone_vars_h.insert("rgid".to_string(), rgid_h);

        // Per-authority GID bindings, consumed by negated rows.
        for auth in self.env.get_authorities() {
            let auth_str = self.env.auth_to_string(&auth);
            let b = *msk
                .common_vars
                .get(&format!("b_{auth_str}"))
                .expect("authority common variable missing from MSK");
            let bp = *msk
                .common_vars
                .get(&format!("bp_{auth_str}"))
                .expect("authority common variable missing from MSK");
            usk.non_lone_vars_h
                .insert(format!("rb_{auth_str}"), self.ops.scale_h(b, rgid_h));
            usk.non_lone_vars_g
                .insert(format!("rbp_{auth_str}"), self.ops.scale_g(bp, rgid_g));
        }

        // Per-attribute key polynomial pair, with fresh non-lone scalars.
        for entry in &user_attrs.entries {
            let auth_str = self.env.auth_to_string(&entry.auth);
            let attr_str = self.env.attr_to_string(&entry.attr);
            let alpha = *msk
                .alphas
                .get(&format!("alpha_{auth_str}"))
                .expect("authority alpha missing from MSK");
            let b = *msk
                .common_vars
                .get(&format!("b_{auth_str}"))
                .expect("authority common variable missing from MSK");
            let bp = *msk
                .common_vars
                .get(&format!("bp_{auth_str}"))
                .expect("authority common variable missing from MSK");

            let x = self.env.get_xattr(&entry.attr);
            let t = self.ops.sample_z();
            let u = self.ops.sample_z();

            // k_h = h^{α + r_h·b·x + t}
            let k_h = self.ops.add_h(
                self.ops.lift_h(self.ops.add_z(alpha, t)),
                self.ops.scale_h(self.ops.mul_z(b, x), rgid_h),
            );
            usk.polys_h.insert(format!("k_{attr_str}"), k_h);
            usk.non_lone_vars_h
                .insert(format!("t_{attr_str}"), self.ops.lift_h(t));

            // k_g = g^{r_g·b'·x + u}
            let k_g = self.ops.add_g(
                self.ops.scale_g(self.ops.mul_z(bp, x), rgid_g),
                self.ops.lift_g(u),
            );
            usk.polys_g.insert(format!("k_{attr_str}"), k_g);
            usk.non_lone_vars_g
                .insert(format!("t_{attr_str}"), self.ops.lift_g(u));
        }

        debug!(attributes = usk.polys_h.len(), "user secret key issued");
        usk
    }

    /// Label a fresh ciphertext with `policy` and mask it for this run.
    pub fn encrypt(&mut self, mpk: &MasterPublicKey, policy: &Policy) -> Ciphertext {
        let mut ct = Ciphertext {
            policy: policy.clone(),
            non_lone_vars_g: BTreeMap::new(),
            non_lone_vars_h: BTreeMap::new(),
            primary_polys_g: BTreeMap::new(),
            primary_polys_h: BTreeMap::new(),
            secondary_polys: BTreeMap::new(),
            blinding_poly: self.ops.reset_gt(),
        };

        // Authority-specific slices of the secret, accumulated row by row.
        let mut auth_shares: BTreeMap<String, Z> = BTreeMap::new();

        for i in self.env.get_lsss_rows() {
            let attr = self.env.ls_row_to_attr(i).to_string();
            let auth_str = self.env.auth_to_string(self.env.ls_row_to_auth(i));
            let row = self.env.ls_row_to_string(i);

            let x = self.env.get_xattr(&attr);
            let lambda = self.env.get_lambda(i);
            let mu = self.env.get_mu(i);
            let s = self.ops.sample_z();

            let b_g = *mpk
                .common_vars_g
                .get(&format!("b_{auth_str}"))
                .expect("authority common variable missing from MPK");
            let bp_h = *mpk
                .common_vars_h
                .get(&format!("bp_{auth_str}"))
                .expect("authority common variable missing from MPK");
            let alpha_gt = *mpk
                .alphas
                .get(&format!("alpha_{auth_str}"))
                .expect("authority alpha missing from MPK");

            ct.non_lone_vars_g
                .insert(format!("s_{row}"), self.ops.lift_g(s));
            ct.non_lone_vars_h
                .insert(format!("s_{row}"), self.ops.lift_h(s));

            // c_i = g^{s·b·x + μ}
            let c = self.ops.add_g(
                self.ops.scale_g(self.ops.mul_z(s, x), b_g),
                self.ops.lift_g(mu),
            );
            ct.primary_polys_g.insert(format!("c_{row}"), c);

            // d_i = h^{s·b'·x}
            let d = self.ops.scale_h(self.ops.mul_z(s, x), bp_h);
            ct.primary_polys_h.insert(format!("d_{row}"), d);

            // cp_i = e(g,h)^{α·(λ + s)}
            ct.secondary_polys.insert(
                format!("cp_{row}"),
                self.ops.scale_gt(self.ops.add_z(lambda, s), alpha_gt),
            );

            let slice = auth_shares.entry(auth_str).or_insert_with(Z::zero);
            *slice = self.ops.add_z(*slice, lambda);
        }

        // blinding = Π_A e(g,h)^{α_A·σ_A}
        let mut blinding = self.ops.reset_gt();
        for (auth_str, sigma) in auth_shares {
            let alpha_gt = *mpk
                .alphas
                .get(&format!("alpha_{auth_str}"))
                .expect("authority alpha missing from MPK");
            blinding = self.ops.add_gt(blinding, self.ops.scale_gt(sigma, alpha_gt));
        }
        ct.blinding_poly = blinding;

        debug!(rows = ct.secondary_polys.len(), "ciphertext assembled");
        ct
    }

    /// Recover the blinding mask, or `None` if the policy is unsatisfied.
    ///
    /// Positive rows evaluate the quotient at the row's own attribute;
    /// negated rows evaluate it at the user's unique alternative and strip
    /// the mismatch residual. Environment accessor failures past the
    /// satisfaction gate indicate a malformed attribute set and surface as
    /// errors.
    pub fn decrypt(
        &mut self,
        usk: &UserSecretKey,
        ct: &Ciphertext,
    ) -> Result<Option<Gt>, EnvError> {
        if !ct.policy.is_satisfied(&usk.user_attrs) {
            debug!("policy not satisfied, refusing to decrypt");
            return Ok(None);
        }

        let mut acc = self.ops.reset_gt();

        for i in self.env.get_positive_linear_combination_idcs() {
            let attr = self.env.ls_row_to_attr(i).to_string();
            let x_i = self.row_quotient(usk, ct, i, &attr);
            acc = self
                .ops
                .add_gt(acc, self.ops.scale_gt(self.env.get_epsilon(i), x_i));
        }

        for i in self.env.get_negative_linear_combination_idcs() {
            let attr = self.env.ls_row_to_attr(i).to_string();
            let alt = self.env.ls_row_to_alt_attr(i)?;
            let mut x_i = self.row_quotient(usk, ct, i, &alt);

            // Strip the residual e^{δ·(r_h·s·b − r_g·s·b')} left by the
            // x-value mismatch, δ = x_attr − x_alt ≠ 0.
            let x_row = self.env.get_xattr(&attr);
            let x_alt = self.env.get_xattr_alt(i)?;
            let delta = self.ops.sub_z(x_row, x_alt);

            let row = self.env.ls_row_to_string(i);
            let auth_str = self.env.auth_to_string(self.env.ls_row_to_auth(i));
            let s_g = *ct
                .non_lone_vars_g
                .get(&format!("s_{row}"))
                .expect("row randomness missing from ciphertext");
            let s_h = *ct
                .non_lone_vars_h
                .get(&format!("s_{row}"))
                .expect("row randomness missing from ciphertext");
            let rb = *usk
                .non_lone_vars_h
                .get(&format!("rb_{auth_str}"))
                .expect("authority GID binding missing from USK");
            let rbp = *usk
                .non_lone_vars_g
                .get(&format!("rbp_{auth_str}"))
                .expect("authority GID binding missing from USK");

            let e1 = self.ops.pair(s_g, rb);
            let e2 = self.ops.pair(rbp, s_h);
            x_i = self
                .ops
                .add_gt(x_i, self.ops.inv_gt(self.ops.scale_gt(delta, e1)));
            x_i = self.ops.add_gt(x_i, self.ops.scale_gt(delta, e2));

            acc = self
                .ops
                .add_gt(acc, self.ops.scale_gt(self.env.get_epsilon(i), x_i));
        }

        Ok(Some(acc))
    }

    /// The seven-term pairing quotient of one row, evaluated with the key
    /// polynomials of `key_attr`.
    ///
    /// For a matching attribute this equals `e(g,h)^{α·λ_i + r_h·μ_i}`; for
    /// an alternative value it additionally carries the mismatch residual
    /// the caller strips.
    fn row_quotient(&self, usk: &UserSecretKey, ct: &Ciphertext, i: usize, key_attr: &str) -> Gt {
        let row = self.env.ls_row_to_string(i);
        let k_name = format!("k_{}", self.env.attr_to_string(key_attr));
        let t_name = format!("t_{}", self.env.attr_to_string(key_attr));

        let k_h = *usk
            .polys_h
            .get(&k_name)
            .expect("key polynomial missing from USK");
        let k_g = *usk
            .polys_g
            .get(&k_name)
            .expect("key polynomial missing from USK");
        let t_h = *usk
            .non_lone_vars_h
            .get(&t_name)
            .expect("attribute randomness missing from USK");
        let u_g = *usk
            .non_lone_vars_g
            .get(&t_name)
            .expect("attribute randomness missing from USK");
        let rgid_g = *usk
            .non_lone_vars_g
            .get("rgid")
            .expect("GID lift missing from USK");
        let rgid_h = *usk
            .non_lone_vars_h
            .get("rgid")
            .expect("GID lift missing from USK");

        let s_g = *ct
            .non_lone_vars_g
            .get(&format!("s_{row}"))
            .expect("row randomness missing from ciphertext");
        let s_h = *ct
            .non_lone_vars_h
            .get(&format!("s_{row}"))
            .expect("row randomness missing from ciphertext");
        let c = *ct
            .primary_polys_g
            .get(&format!("c_{row}"))
            .expect("primary polynomial missing from ciphertext");
        let d = *ct
            .primary_polys_h
            .get(&format!("d_{row}"))
            .expect("primary polynomial missing from ciphertext");
        let cp = *ct
            .secondary_polys
            .get(&format!("cp_{row}"))
            .expect("secondary polynomial missing from ciphertext");

        let mut acc = cp;
        acc = self.ops.add_gt(acc, self.ops.pair(c, rgid_h));
        acc = self.ops.add_gt(acc, self.ops.inv_gt(self.ops.pair(s_g, k_h)));
        acc = self.ops.add_gt(acc, self.ops.pair(s_g, t_h));
        acc = self.ops.add_gt(acc, self.ops.pair(k_g, s_h));
        acc = self.ops.add_gt(acc, self.ops.inv_gt(self.ops.pair(u_g, s_h)));
        acc = self.ops.add_gt(acc, self.ops.inv_gt(self.ops.pair(rgid_g, d)));
        acc
    }
}

// ============================================================================
// Tests
// ============================================================================
