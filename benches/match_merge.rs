use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use rollcall::{canonicalize_name, CandidateRecord, MatcherConfig, NameAlias, ReconcileConfig, Reconciler};

const GROUPS: usize = 70;
const PER_GROUP: usize = 10;

/// 700 people in 70 groups; every tenth secondary surname needs an alias.
fn rosters() -> (Vec<CandidateRecord>, Vec<CandidateRecord>, MatcherConfig) {
    let mut primary = Vec::with_capacity(GROUPS * PER_GROUP);
    let mut secondary = Vec::with_capacity(GROUPS * PER_GROUP);
    let mut matcher = MatcherConfig::default()
        .expecting_groups(GROUPS)
        .expecting_persons(GROUPS * PER_GROUP);

    for g in 0..GROUPS {
        let group = format!("Constituency {g}");
        for p in 0..PER_GROUP {
            let forename = format!("Forename{p}");
            let surname = format!("Surname{g}x{p}");
            primary.push(
                CandidateRecord::new(&forename, &surname, &group)
                    .with_party("Lab")
                    .with_email(format!("{surname}@example.org")),
            );

            let b_surname = if p == 0 {
                let variant = format!("{surname}-variant");
                matcher = matcher.with_surname_alias(NameAlias::new(&variant, &surname).in_group(&group));
                variant
            } else {
                surname.to_uppercase()
            };
            secondary.push(
                CandidateRecord::new(forename.to_uppercase(), b_surname, group.to_uppercase())
                    .with_email(format!("office.{g}.{p}@example.org")),
            );
        }
    }
    (primary, secondary, matcher)
}

fn bench_match_merge(c: &mut Criterion) {
    let (primary, secondary, matcher) = rosters();
    let mut config = ReconcileConfig::default();
    config.matcher = matcher;
    let reconciler = Reconciler::new(&config).unwrap();

    let mut group = c.benchmark_group("reconcile");
    group.throughput(Throughput::Elements(primary.len() as u64));
    group.bench_function("match_merge_700", |b| {
        b.iter(|| {
            let report = reconciler.reconcile(black_box(&primary), black_box(&secondary)).unwrap();
            black_box(report.records.len())
        });
    });
    group.finish();
}

fn bench_canonicalize(c: &mut Criterion) {
    let names = ["o'brien", "MACDONALD", "newry and armagh", "DUNWOODY-KNEAFSEY", "mcintyre"];
    c.bench_function("canonicalize/mixed", |b| {
        b.iter(|| {
            for name in names {
                black_box(canonicalize_name(black_box(name)));
            }
        });
    });
}

criterion_group!(benches, bench_match_merge, bench_canonicalize);
criterion_main!(benches);
