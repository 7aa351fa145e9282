//! Correctness runner and micro-timer for the ABE engine
//!
//! Runs the end-to-end pipeline over a synthetic attribute set, checks that
//! decryption recovers the ciphertext mask exactly, and (optionally) reports
//! per-algorithm wall-clock averages.
//!
//! Flags:
//!   --policy-len N     attributes/rows in the synthetic run (default 5, max 100)
//!   --multi-auth BOOL  distinct authority per row (default false → all "AA")
//!   --ot-negs BOOL     also run the fully-negated policy (default false)
//!   --iters N          timing iterations per algorithm (default 0 → skip)

#![forbid(unsafe_code)]

use std::env;
use std::time::{Duration, Instant};

use maabe::harness::{check_correctness, negated_policy_for};
use maabe::{AbeScheme, Env, Ops, Policy, UserAttributes};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn parse_bool(s: &str) -> bool {
    matches!(s, "1" | "true" | "True" | "TRUE" | "yes" | "y")
}

/// Which algorithm a timing iteration measures.
#[derive(Clone, Copy)]
enum Stage {
    Setup,
    Keygen,
    Encrypt,
    Decrypt,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::Setup => "SETUP",
            Stage::Keygen => "KEYGEN",
            Stage::Encrypt => "ENCRYPT",
            Stage::Decrypt => "DECRYPT",
        }
    }
}

/// Build a fresh pipeline and time exactly one stage of it.
fn time_stage(
    stage: Stage,
    policy_len: usize,
    multi_auth: bool,
    use_negs: bool,
) -> anyhow::Result<Duration> {
    let user_attrs = UserAttributes::random(policy_len, multi_auth)?;
    let policy = if use_negs {
        negated_policy_for(&user_attrs)
    } else {
        Policy::new(user_attrs.clone())
    };

    let ops = Ops::new();
    let env = Env::new(&user_attrs, &policy, ops.clone())?;
    let mut scheme = AbeScheme::new(env, ops);

    if let Stage::Setup = stage {
        let t = Instant::now();
        let _ = scheme.setup();
        return Ok(t.elapsed());
    }
    let (msk, mpk) = scheme.setup();

    if let Stage::Keygen = stage {
        let t = Instant::now();
        let _ = scheme.keygen(&msk, &user_attrs);
        return Ok(t.elapsed());
    }
    let usk = scheme.keygen(&msk, &user_attrs);

    if let Stage::Encrypt = stage {
        let t = Instant::now();
        let _ = scheme.encrypt(&mpk, &policy);
        return Ok(t.elapsed());
    }
    let ct = scheme.encrypt(&mpk, &policy);

    let t = Instant::now();
    let recovered = scheme.decrypt(&usk, &ct)?;
    let elapsed = t.elapsed();
    anyhow::ensure!(
        recovered.as_ref() == Some(&ct.blinding_poly),
        "timed decryption did not recover the mask"
    );
    Ok(elapsed)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let policy_len: usize = parse_flag(&args, "--policy-len")
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);
    let multi_auth = parse_flag(&args, "--multi-auth")
        .map(|s| parse_bool(&s))
        .unwrap_or(false);
    let ot_negs = parse_flag(&args, "--ot-negs")
        .map(|s| parse_bool(&s))
        .unwrap_or(false);
    let iters: usize = parse_flag(&args, "--iters")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    println!("policy_len = {policy_len}");
    println!("multi_auth = {multi_auth}");
    println!("ot_negs    = {ot_negs}");

    let mut is_correct = check_correctness(policy_len, multi_auth, false)?;
    println!("positive policy: {}", if is_correct { "ok" } else { "MISMATCH" });

    if ot_negs {
        let negated_ok = check_correctness(policy_len, multi_auth, true)?;
        println!("negated policy:  {}", if negated_ok { "ok" } else { "MISMATCH" });
        is_correct &= negated_ok;
    }

    if iters > 0 {
        for stage in [Stage::Setup, Stage::Keygen, Stage::Encrypt, Stage::Decrypt] {
            let mut total = Duration::ZERO;
            for _ in 0..iters {
                total += time_stage(stage, policy_len, multi_auth, ot_negs)?;
            }
            println!(
                "{:<8} avg over {} iters: {:?}",
                stage.name(),
                iters,
                total / iters as u32
            );
        }
    }

    anyhow::ensure!(is_correct, "decryption failed");
    println!("decryption successful");
    Ok(())
}
