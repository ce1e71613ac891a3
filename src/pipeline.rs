//! End-to-end reconciliation: match, merge, check.

use serde::Serialize;
use tracing::info;

use crate::config::ReconcileConfig;
use crate::error::{IntegrityError, RollcallResult};
use crate::integrity::check_cardinality;
use crate::matcher::{DuplicateKey, MatchOutcome, RecordMatcher};
use crate::merger::{MergeSummary, RosterMerger};
use crate::record::{CandidateRecord, CanonicalRecord};

/// Counts for one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Rows read from roster A.
    pub primary_rows: usize,
    /// Rows read from roster B.
    pub secondary_rows: usize,
    /// Pairs that needed a name alias.
    pub matched_via_alias: usize,
    /// Rows set aside as duplicate keys.
    pub duplicates: usize,
    /// Merge counts.
    pub merge: MergeSummary,
}

/// The merged roster and everything a reviewer needs to trust it.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// Canonical records in output order.
    pub records: Vec<CanonicalRecord>,
    /// Secondary-only rows that were not emitted.
    pub dropped_secondary: Vec<CandidateRecord>,
    /// Duplicate-key rows from either roster.
    pub duplicates: Vec<DuplicateKey>,
    /// Counts.
    pub summary: ReconcileSummary,
}

impl ReconcileReport {
    /// Stable digest of the merged roster.
    ///
    /// Periodic re-runs compare this to tell whether anything changed.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for record in &self.records {
            for field in [record.forename(), record.surname(), record.group(), record.party()] {
                hasher.update(field.as_bytes());
                hasher.update(&[0x1f]);
            }
            for email in record.emails() {
                hasher.update(email.as_bytes());
                hasher.update(&[0x1d]);
            }
            hasher.update(record.fax().unwrap_or_default().as_bytes());
            hasher.update(&[0x1f]);
            hasher.update(record.image().unwrap_or_default().as_bytes());
            hasher.update(&[0x1e]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Runs matcher, merger and the post-merge headcount check.
#[derive(Debug, Clone)]
pub struct Reconciler {
    matcher: RecordMatcher,
    merger: RosterMerger,
}

impl Reconciler {
    /// Builds a reconciler from a run config.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the matcher tables do not compile.
    pub fn new(config: &ReconcileConfig) -> RollcallResult<Self> {
        let matcher = RecordMatcher::new(config.matcher.clone())?;
        let merger = RosterMerger::for_matcher(config.merger.clone(), &matcher);
        Ok(Self { matcher, merger })
    }

    /// Matches only, for callers that want to inspect pairs.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError` if a roster fails its configured counts.
    pub fn match_only(
        &self,
        primary: &[CandidateRecord],
        secondary: &[CandidateRecord],
    ) -> Result<MatchOutcome, IntegrityError> {
        self.matcher.match_rosters(primary, secondary)
    }

    /// Reconciles two rosters.
    ///
    /// No record is produced if either roster fails an integrity check.
    ///
    /// # Errors
    ///
    /// Returns `RollcallError::Integrity` on a failed count, before or after
    /// merging.
    pub fn reconcile(
        &self,
        primary: &[CandidateRecord],
        secondary: &[CandidateRecord],
    ) -> RollcallResult<ReconcileReport> {
        let matched = self.matcher.match_rosters(primary, secondary)?;
        let merged = self.merger.merge(&matched.pairs);

        // Every emitted record must still be a distinct person.
        check_cardinality(&merged.records, |r| r.key().clone(), merged.records.len())
            .map_err(|err| err.with_scope("distinct persons in merged roster"))?;

        let summary = ReconcileSummary {
            primary_rows: primary.len(),
            secondary_rows: secondary.len(),
            matched_via_alias: matched.via_alias(),
            duplicates: matched.duplicates.len(),
            merge: merged.summary,
        };
        info!(
            primary_rows = summary.primary_rows,
            secondary_rows = summary.secondary_rows,
            records = merged.records.len(),
            "reconciliation finished"
        );

        Ok(ReconcileReport {
            records: merged.records,
            dropped_secondary: merged.dropped_secondary,
            duplicates: matched.duplicates,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<CandidateRecord> {
        vec![
            CandidateRecord::new("Gerry", "Adams", "Belfast West").with_email("g@x.org"),
            CandidateRecord::new("Jill", "Evans", "Wales"),
        ]
    }

    #[test]
    fn reconcile_identical_rosters() {
        let reconciler = Reconciler::new(&ReconcileConfig::default()).unwrap();
        let report = reconciler.reconcile(&roster(), &roster()).unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.summary.merge.both, 2);
        assert!(report.dropped_secondary.is_empty());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let reconciler = Reconciler::new(&ReconcileConfig::default()).unwrap();
        let first = reconciler.reconcile(&roster(), &roster()).unwrap().fingerprint();
        let again = reconciler.reconcile(&roster(), &roster()).unwrap().fingerprint();
        assert_eq!(first, again);
        assert_eq!(first.len(), 64);

        let mut changed = roster();
        changed[1] = changed[1].clone().with_email("jill@x.org");
        let other = reconciler.reconcile(&changed, &roster()).unwrap().fingerprint();
        assert_ne!(first, other);
    }

    #[test]
    fn blacklist_group_follows_matcher_aliases() {
        let mut config = ReconcileConfig::default();
        config.matcher = config.matcher.with_group_alias("Newry & Armagh", "Newry and Armagh");
        config.merger = config
            .merger
            .with_blacklisted_email("Dominic", "Bradley", "Newry & Armagh", "bad@x.org");
        let reconciler = Reconciler::new(&config).unwrap();

        let a = vec![CandidateRecord::new("Dominic", "Bradley", "Newry and Armagh").with_email("d@x.org")];
        let b = vec![CandidateRecord::new("Dominic", "Bradley", "Newry & Armagh").with_email("bad@x.org")];
        let report = reconciler.reconcile(&a, &b).unwrap();

        assert_eq!(report.records[0].emails(), ["d@x.org"]);
        assert_eq!(report.summary.merge.emails_vetoed, 1);
    }

    #[test]
    fn integrity_failure_produces_no_records() {
        let mut config = ReconcileConfig::default();
        config.matcher.expected_persons = Some(108);
        let reconciler = Reconciler::new(&config).unwrap();
        let err = reconciler.reconcile(&roster(), &roster()).unwrap_err();
        assert!(err.is_integrity());
    }
}
