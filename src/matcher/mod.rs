//! Record matching: pairs two rosters of the same population by exact key.
//!
//! # Semantics
//! - Both rosters are keyed through the same canonical group table.
//! - A secondary record is matched on its direct key first. Only when that key
//!   is absent from the primary roster are forename and surname aliases tried.
//! - Each primary key is consumed at most once.
//! - Cardinality invariants are checked after keys are built and before any
//!   pairing happens. A violation aborts the match.

mod config;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{IntegrityError, ValidationError};
use crate::integrity::{check_cardinality, check_group_sizes};
use crate::record::{normalize_part, CandidateRecord, PersonKey};

pub use config::{CompiledTables, GroupRewrite, MatcherConfig, NameAlias};
use config::CompiledAlias;

/// Which roster a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RosterSide {
    /// Roster A, the preferred source.
    Primary,
    /// Roster B.
    Secondary,
}

impl fmt::Display for RosterSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// Result of pairing one key across the two rosters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedPair {
    /// Both rosters have the person.
    Both {
        /// The primary roster's key.
        key: PersonKey,
        /// Record from roster A.
        primary: CandidateRecord,
        /// Record from roster B.
        secondary: CandidateRecord,
        /// True if the pairing needed a forename or surname alias.
        via_alias: bool,
    },
    /// Only roster A has the person.
    PrimaryOnly {
        /// The primary roster's key.
        key: PersonKey,
        /// Record from roster A.
        record: CandidateRecord,
    },
    /// Only roster B has the person.
    SecondaryOnly {
        /// The secondary record's direct key.
        key: PersonKey,
        /// Record from roster B.
        record: CandidateRecord,
    },
}

impl MatchedPair {
    /// The key this pair is filed under.
    #[must_use]
    pub fn key(&self) -> &PersonKey {
        match self {
            Self::Both { key, .. } | Self::PrimaryOnly { key, .. } | Self::SecondaryOnly { key, .. } => key,
        }
    }

    /// Returns true for a fully matched pair.
    #[must_use]
    pub const fn is_both(&self) -> bool {
        matches!(self, Self::Both { .. })
    }
}

/// A record dropped because an earlier record in the same roster had its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    /// Roster the duplicate was found in.
    pub side: RosterSide,
    /// The shared key.
    pub key: PersonKey,
    /// The dropped record.
    pub record: CandidateRecord,
}

/// Pairs plus the duplicates that were set aside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Primary-key order, then secondary-only pairs in roster B order.
    pub pairs: Vec<MatchedPair>,
    /// Later records whose key repeated an earlier one.
    pub duplicates: Vec<DuplicateKey>,
}

impl MatchOutcome {
    /// Number of fully matched pairs.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.pairs.iter().filter(|p| p.is_both()).count()
    }

    /// Number of pairs that needed an alias.
    #[must_use]
    pub fn via_alias(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| matches!(p, MatchedPair::Both { via_alias: true, .. }))
            .count()
    }

    /// Number of primary-only pairs.
    #[must_use]
    pub fn primary_only(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| matches!(p, MatchedPair::PrimaryOnly { .. }))
            .count()
    }

    /// Number of secondary-only pairs.
    #[must_use]
    pub fn secondary_only(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| matches!(p, MatchedPair::SecondaryOnly { .. }))
            .count()
    }
}

struct KeyedRoster {
    entries: Vec<(PersonKey, CandidateRecord)>,
    duplicates: Vec<DuplicateKey>,
}

/// Pairs rosters using exact keys and configured alias tables.
#[derive(Debug, Clone)]
pub struct RecordMatcher {
    config: MatcherConfig,
    tables: CompiledTables,
    group_headcounts: BTreeMap<String, usize>,
}

impl RecordMatcher {
    /// Validates and compiles `config`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for an invalid rewrite or alias entry.
    pub fn new(config: MatcherConfig) -> Result<Self, ValidationError> {
        let tables = config.compile()?;
        let group_headcounts = config
            .group_headcounts
            .iter()
            .map(|(group, count)| (tables.canonical_group(group), *count))
            .collect();
        Ok(Self {
            config,
            tables,
            group_headcounts,
        })
    }

    /// The configuration this matcher was built from.
    #[must_use]
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Builds the direct key of a record.
    #[must_use]
    pub fn key_for(&self, record: &CandidateRecord) -> PersonKey {
        PersonKey::new(
            &record.surname,
            &record.forename,
            &self.tables.canonical_group(&record.group),
        )
    }

    /// Maps a raw group through the configured rewrites and aliases.
    #[must_use]
    pub fn canonical_group(&self, raw: &str) -> String {
        self.tables.canonical_group(raw)
    }

    /// Builds the alias-corrected key of a secondary record, if any alias applies.
    #[must_use]
    pub fn alias_key_for(&self, record: &CandidateRecord) -> Option<PersonKey> {
        let surname = normalize_part(&record.surname);
        let forename = normalize_part(&record.forename);
        let group = self.tables.canonical_group(&record.group);

        let new_forename = first_alias(&self.tables.forename_aliases, &forename, &surname, &forename, &group, "forename");
        let new_surname = first_alias(&self.tables.surname_aliases, &surname, &surname, &forename, &group, "surname");
        if new_forename.is_none() && new_surname.is_none() {
            return None;
        }

        Some(PersonKey::new(
            new_surname.unwrap_or(&surname),
            new_forename.unwrap_or(&forename),
            &group,
        ))
    }

    /// Pairs roster A (primary) with roster B (secondary).
    ///
    /// # Errors
    ///
    /// Returns an `IntegrityError` if either roster fails a configured
    /// group count, person count or per-group headcount.
    pub fn match_rosters(
        &self,
        primary: &[CandidateRecord],
        secondary: &[CandidateRecord],
    ) -> Result<MatchOutcome, IntegrityError> {
        let primary = self.key_roster(primary, RosterSide::Primary)?;
        let secondary = self.key_roster(secondary, RosterSide::Secondary)?;

        let index: HashMap<&PersonKey, usize> = primary
            .entries
            .iter()
            .enumerate()
            .map(|(idx, (key, _))| (key, idx))
            .collect();
        let mut partners: Vec<Option<(CandidateRecord, bool)>> = vec![None; primary.entries.len()];
        // Direct keys claim their slots before any alias is tried.
        let mut pending = Vec::new();
        for (key, record) in secondary.entries {
            match index.get(&key) {
                Some(&idx) => partners[idx] = Some((record, false)),
                None => pending.push((key, record)),
            }
        }

        let mut leftovers = Vec::new();
        for (key, record) in pending {
            let target = self
                .alias_key_for(&record)
                .and_then(|alias| index.get(&alias).copied());
            match target {
                Some(idx) if partners[idx].is_none() => {
                    debug!(key = %key, target = %primary.entries[idx].0, "matched through alias");
                    partners[idx] = Some((record, true));
                }
                Some(idx) => {
                    warn!(
                        key = %key,
                        target = %primary.entries[idx].0,
                        "alias target already paired; keeping secondary record unmatched"
                    );
                    leftovers.push(MatchedPair::SecondaryOnly { key, record });
                }
                None => leftovers.push(MatchedPair::SecondaryOnly { key, record }),
            }
        }

        let mut pairs: Vec<MatchedPair> = primary
            .entries
            .into_iter()
            .zip(partners)
            .map(|((key, record), partner)| match partner {
                Some((secondary, via_alias)) => MatchedPair::Both {
                    key,
                    primary: record,
                    secondary,
                    via_alias,
                },
                None => MatchedPair::PrimaryOnly { key, record },
            })
            .collect();
        pairs.extend(leftovers);

        let mut duplicates = primary.duplicates;
        duplicates.extend(secondary.duplicates);

        let outcome = MatchOutcome { pairs, duplicates };
        info!(
            matched = outcome.matched(),
            via_alias = outcome.via_alias(),
            primary_only = outcome.primary_only(),
            secondary_only = outcome.secondary_only(),
            duplicates = outcome.duplicates.len(),
            "rosters matched"
        );
        Ok(outcome)
    }

    fn key_roster(&self, records: &[CandidateRecord], side: RosterSide) -> Result<KeyedRoster, IntegrityError> {
        let keyed: Vec<(PersonKey, &CandidateRecord)> = records.iter().map(|r| (self.key_for(r), r)).collect();
        self.check_invariants(&keyed, side)?;

        let mut seen: HashSet<PersonKey> = HashSet::with_capacity(keyed.len());
        let mut entries = Vec::with_capacity(keyed.len());
        let mut duplicates = Vec::new();
        for (key, record) in keyed {
            if !seen.insert(key.clone()) {
                warn!(side = %side, key = %key, name = %record.display_name(), "duplicate key; keeping first record");
                duplicates.push(DuplicateKey {
                    side,
                    key,
                    record: record.clone(),
                });
            } else {
                entries.push((key, record.clone()));
            }
        }
        Ok(KeyedRoster { entries, duplicates })
    }

    fn check_invariants(&self, keyed: &[(PersonKey, &CandidateRecord)], side: RosterSide) -> Result<(), IntegrityError> {
        if let Some(expected) = self.config.expected_groups {
            check_cardinality(keyed, |(key, _)| key.group().to_string(), expected)
                .map_err(|err| err.with_scope(format!("distinct groups in {side} roster")))
                .inspect_err(|err| warn!(error = %err, "integrity check failed"))?;
        }
        if let Some(expected) = self.config.expected_persons {
            check_cardinality(keyed, |(key, _)| key.clone(), expected)
                .map_err(|err| err.with_scope(format!("distinct persons in {side} roster")))
                .inspect_err(|err| warn!(error = %err, "integrity check failed"))?;
        }
        if !self.group_headcounts.is_empty() {
            let mut distinct: Vec<&PersonKey> = keyed.iter().map(|(key, _)| key).collect();
            distinct.sort();
            distinct.dedup();
            check_group_sizes(distinct, |key| key.group().to_string(), &self.group_headcounts)
                .map_err(|err| err.with_scope(format!("{side} roster")))
                .inspect_err(|err| warn!(error = %err, "integrity check failed"))?;
        }
        Ok(())
    }
}

fn first_alias<'a>(
    aliases: &'a [CompiledAlias],
    value: &str,
    surname: &str,
    forename: &str,
    group: &str,
    part: &'static str,
) -> Option<&'a str> {
    let mut applicable = aliases.iter().filter(|a| a.applies(value, surname, forename, group));
    let first = applicable.next()?;
    for other in applicable.filter(|a| a.to != first.to) {
        warn!(
            part,
            value,
            chosen = %first.to,
            ignored = %other.to,
            "ambiguous alias; using first entry"
        );
    }
    Some(first.to.as_str())
}
