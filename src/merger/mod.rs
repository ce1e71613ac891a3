//! Roster merging: one canonical record per matched key.

mod config;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::matcher::{MatchedPair, RecordMatcher};
use crate::record::{dedup_emails, CandidateRecord, CanonicalRecord, PersonKey, Provenance};

pub use config::{BlacklistEntry, FieldPrecedence, MergerConfig, SecondaryOnlyPolicy, Source};

/// Counts reported after a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Records built from a matched pair.
    pub both: usize,
    /// Records built from roster A alone.
    pub primary_only: usize,
    /// Secondary-only records emitted.
    pub secondary_included: usize,
    /// Secondary-only records left out.
    pub secondary_dropped: usize,
    /// Roster B addresses removed by the blacklist.
    pub emails_vetoed: usize,
}

/// Merged roster plus what was left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Canonical records, primary key order first.
    pub records: Vec<CanonicalRecord>,
    /// Secondary-only records dropped under [`SecondaryOnlyPolicy::Drop`].
    pub dropped_secondary: Vec<CandidateRecord>,
    /// Counts.
    pub summary: MergeSummary,
}

/// Folds matched pairs into canonical records.
#[derive(Debug, Clone)]
pub struct RosterMerger {
    config: MergerConfig,
    blacklist: HashMap<PersonKey, HashSet<String>>,
}

impl RosterMerger {
    /// Creates a merger whose blacklist groups are only normalized, not
    /// aliased.
    #[must_use]
    pub fn new(config: MergerConfig) -> Self {
        let blacklist = config.blacklist_by_key(str::to_string);
        Self { config, blacklist }
    }

    /// Creates a merger whose blacklist keys are built with `matcher`'s group
    /// rewrites and aliases, so entries line up with the keys it pairs under.
    #[must_use]
    pub fn for_matcher(config: MergerConfig, matcher: &RecordMatcher) -> Self {
        let blacklist = config.blacklist_by_key(|group| matcher.canonical_group(group));
        Self { config, blacklist }
    }

    /// The configuration this merger was built from.
    #[must_use]
    pub fn config(&self) -> &MergerConfig {
        &self.config
    }

    /// Merges `pairs` into canonical records.
    ///
    /// Primary-derived records keep the order of `pairs`; secondary-only
    /// records, when included, follow all of them.
    #[must_use]
    pub fn merge(&self, pairs: &[MatchedPair]) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut secondary_records = Vec::new();
        let mut secondary_keys: HashSet<&PersonKey> = HashSet::new();

        for pair in pairs {
            if let MatchedPair::Both { key, .. } | MatchedPair::SecondaryOnly { key, .. } = pair {
                secondary_keys.insert(key);
            }
            match pair {
                MatchedPair::Both { key, primary, secondary, .. } => {
                    let record = self.merge_pair(key, primary, secondary, &mut outcome.summary);
                    outcome.records.push(record);
                    outcome.summary.both += 1;
                }
                MatchedPair::PrimaryOnly { key, record } => {
                    let emails = dedup_emails(record.emails.iter().map(String::as_str));
                    outcome.records.push(self.single(key, record, emails, Provenance::PrimaryOnly));
                    outcome.summary.primary_only += 1;
                }
                MatchedPair::SecondaryOnly { key, record } => match self.config.secondary_only {
                    SecondaryOnlyPolicy::Include => {
                        let allowed = self.allowed_secondary_emails(key, record, &mut outcome.summary);
                        let emails = dedup_emails(allowed.iter().map(String::as_str));
                        secondary_records.push(self.single(key, record, emails, Provenance::SecondaryOnly));
                        outcome.summary.secondary_included += 1;
                    }
                    SecondaryOnlyPolicy::Drop => {
                        debug!(key = %key, name = %record.display_name(), "dropping secondary-only record");
                        outcome.dropped_secondary.push(record.clone());
                        outcome.summary.secondary_dropped += 1;
                    }
                },
            }
        }
        outcome.records.extend(secondary_records);

        for key in self.blacklist.keys().filter(|key| !secondary_keys.contains(key)) {
            warn!(key = %key, "email blacklist entry matches no secondary record");
        }

        let s = outcome.summary;
        info!(
            records = outcome.records.len(),
            both = s.both,
            primary_only = s.primary_only,
            secondary_included = s.secondary_included,
            secondary_dropped = s.secondary_dropped,
            emails_vetoed = s.emails_vetoed,
            "rosters merged"
        );
        outcome
    }

    fn merge_pair(
        &self,
        key: &PersonKey,
        primary: &CandidateRecord,
        secondary: &CandidateRecord,
        summary: &mut MergeSummary,
    ) -> CanonicalRecord {
        let precedence = self.config.field_precedence;

        let name_source = match precedence.name {
            Source::Primary if blank_name(primary) => Source::Secondary,
            Source::Secondary if blank_name(secondary) => Source::Primary,
            other => other,
        };
        let named = match name_source {
            Source::Primary => primary,
            Source::Secondary => secondary,
        };

        let secondary_emails = self.allowed_secondary_emails(key, secondary, summary);
        let emails = dedup_emails(
            secondary_emails
                .iter()
                .map(String::as_str)
                .chain(primary.emails.iter().map(String::as_str)),
        );

        CanonicalRecord::new(
            key.clone(),
            named.forename.trim().to_string(),
            named.surname.trim().to_string(),
            precedence.group.pick(&primary.group, &secondary.group).trim().to_string(),
            self.tidy_party(precedence.party.pick(&primary.party, &secondary.party)),
            emails,
            precedence
                .image
                .pick_opt(primary.image.as_deref(), secondary.image.as_deref())
                .map(str::to_string),
            precedence
                .fax
                .pick_opt(primary.fax.as_deref(), secondary.fax.as_deref())
                .map(str::to_string),
            Provenance::Both,
        )
    }

    fn single(
        &self,
        key: &PersonKey,
        record: &CandidateRecord,
        emails: Vec<String>,
        provenance: Provenance,
    ) -> CanonicalRecord {
        CanonicalRecord::new(
            key.clone(),
            record.forename.trim().to_string(),
            record.surname.trim().to_string(),
            record.group.trim().to_string(),
            self.tidy_party(&record.party),
            emails,
            record.image.clone(),
            record.fax.clone(),
            provenance,
        )
    }

    fn allowed_secondary_emails(
        &self,
        key: &PersonKey,
        record: &CandidateRecord,
        summary: &mut MergeSummary,
    ) -> Vec<String> {
        let Some(vetoed) = self.blacklist.get(key) else {
            return record.emails.clone();
        };
        record
            .emails
            .iter()
            .filter(|email| {
                let blocked = vetoed.contains(&email.trim().to_lowercase());
                if blocked {
                    debug!(key = %key, email = %email, "secondary email vetoed");
                    summary.emails_vetoed += 1;
                }
                !blocked
            })
            .cloned()
            .collect()
    }

    fn tidy_party(&self, raw: &str) -> String {
        match &self.config.party_labels {
            Some(labels) => labels.tidy(raw),
            None => raw.trim().to_string(),
        }
    }
}

fn blank_name(record: &CandidateRecord) -> bool {
    record.forename.trim().is_empty() && record.surname.trim().is_empty()
}
