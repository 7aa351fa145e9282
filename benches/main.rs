use criterion::{black_box, criterion_group, criterion_main, Criterion};

use maabe::harness::negated_policy_for;
use maabe::{AbeScheme, Env, Ops, Policy, UserAttributes};

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn bench_pipeline(criterion: &mut Criterion, label: &str, use_negs: bool) {
    let policy_len = env_usize("POLICY_LEN", 5);
    let multi_auth = env_bool("MULTI_AUTH", false);

    let user_attrs = UserAttributes::random(policy_len, multi_auth).expect("policy_len <= 100");
    let policy = if use_negs {
        negated_policy_for(&user_attrs)
    } else {
        Policy::new(user_attrs.clone())
    };

    let ops = Ops::new();
    let env = Env::new(&user_attrs, &policy, ops.clone()).expect("consistent universe");
    let mut scheme = AbeScheme::new(env, ops);

    let (msk, mpk) = scheme.setup();
    let usk = scheme.keygen(&msk, &user_attrs);
    let ct = scheme.encrypt(&mpk, &policy);

    criterion.bench_function(&format!("{label} setup"), |b| {
        b.iter(|| scheme.setup())
    });
    criterion.bench_function(&format!("{label} keygen"), |b| {
        b.iter(|| scheme.keygen(black_box(&msk), black_box(&user_attrs)))
    });
    criterion.bench_function(&format!("{label} encrypt"), |b| {
        b.iter(|| scheme.encrypt(black_box(&mpk), black_box(&policy)))
    });
    criterion.bench_function(&format!("{label} decrypt"), |b| {
        b.iter(|| scheme.decrypt(black_box(&usk), black_box(&ct)).unwrap())
    });
}

fn bench_positive(criterion: &mut Criterion) {
    bench_pipeline(criterion, "positive", false);
}

fn bench_negated(criterion: &mut Criterion) {
    if env_bool("OT_NEGS", true) {
        bench_pipeline(criterion, "negated", true);
    }
}

criterion_group!(
    name = abe_benches;
    config = Criterion::default().sample_size(10);
    targets = bench_positive, bench_negated,
);

criterion_main!(abe_benches);
