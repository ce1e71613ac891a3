use std::fs;

use rollcall::{CandidateRecord, ConfigError, ReconcileConfig, Reconciler, RollcallError};

#[test]
fn load_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollcall.json");
    fs::write(
        &path,
        r#"{
            "matcher": {
                "group_aliases": {"Yorkshire & Humber": "Yorkshire and the Humber"},
                "forename_aliases": [{"from": "Nick", "to": "Nicholas", "surname": "Griffin"}],
                "expected_groups": 2,
                "group_headcounts": {"Wales": 1, "Yorkshire and the Humber": 1}
            },
            "merger": {
                "email_blacklist": [
                    {"forename": "Jill", "surname": "Evans", "group": "Wales", "emails": ["stale@example.org"]}
                ],
                "field_precedence": {"image": "secondary"},
                "party_labels": {"plaid": "Plaid Cymru"}
            },
            "resolver": {"workers": 2, "context_hints": {"Dr Tony Wright": "Cannock Chase"}}
        }"#,
    )
    .unwrap();

    let config = ReconcileConfig::load(&path).unwrap();
    assert_eq!(config.resolver.workers, 2);
    assert_eq!(config.resolver.context_hints.len(), 1);

    let reconciler = Reconciler::new(&config).unwrap();
    let a = vec![
        CandidateRecord::new("Jill", "Evans", "Wales")
            .with_party("Plaid")
            .with_image("a.jpg"),
        CandidateRecord::new("Nicholas", "Griffin", "Yorkshire and the Humber"),
    ];
    let b = vec![
        CandidateRecord::new("Jill", "Evans", "Wales")
            .with_email("stale@example.org")
            .with_email("jill@example.org")
            .with_image("b.jpg"),
        CandidateRecord::new("Nick", "Griffin", "Yorkshire & Humber"),
    ];

    let report = reconciler.reconcile(&a, &b).unwrap();
    assert_eq!(report.summary.merge.both, 2);
    assert_eq!(report.summary.merge.emails_vetoed, 1);

    let evans = &report.records[0];
    assert_eq!(evans.party(), "Plaid Cymru");
    assert_eq!(evans.emails(), ["jill@example.org"]);
    assert_eq!(evans.image(), Some("b.jpg"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ReconcileConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));

    let err: RollcallError = err.into();
    assert!(!err.is_integrity());
}

#[test]
fn malformed_json_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let err = ReconcileConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn empty_alias_entry_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aliases.json");
    fs::write(&path, r#"{"matcher": {"surname_aliases": [{"from": "", "to": "Paisley Jnr"}]}}"#).unwrap();

    let err = ReconcileConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}
