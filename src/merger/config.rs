//! Merger configuration.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::label::PartyLabels;
use crate::record::PersonKey;

/// Which roster a scalar field is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Roster A.
    #[default]
    Primary,
    /// Roster B.
    Secondary,
}

impl Source {
    /// Picks `primary` or `secondary`, falling back to the other one when the
    /// preferred value is blank.
    #[must_use]
    pub fn pick<'a>(self, primary: &'a str, secondary: &'a str) -> &'a str {
        let (preferred, other) = match self {
            Self::Primary => (primary, secondary),
            Self::Secondary => (secondary, primary),
        };
        if preferred.trim().is_empty() {
            other
        } else {
            preferred
        }
    }

    /// Option form of [`Source::pick`].
    #[must_use]
    pub fn pick_opt<'a>(self, primary: Option<&'a str>, secondary: Option<&'a str>) -> Option<&'a str> {
        match self {
            Self::Primary => primary.or(secondary),
            Self::Secondary => secondary.or(primary),
        }
    }
}

/// Preferred source per scalar field of a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldPrecedence {
    /// Forename and surname display casing. Taken together from one side.
    pub name: Source,
    /// Group display name.
    pub group: Source,
    /// Party label.
    pub party: Source,
    /// Image reference.
    pub image: Source,
    /// Fax number.
    pub fax: Source,
}

/// What happens to records only roster B has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryOnlyPolicy {
    /// Leave them out of the merged roster and report them.
    #[default]
    Drop,
    /// Emit them after every primary-derived record.
    Include,
}

/// Addresses roster B must not contribute for one person.
///
/// `group` goes through the same rewrites and aliases as roster groups when
/// the merger is built with [`RosterMerger::for_matcher`](super::RosterMerger::for_matcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    /// Forename.
    pub forename: String,
    /// Surname.
    pub surname: String,
    /// Group, in any spelling the matcher maps to the person's group.
    pub group: String,
    /// Vetoed addresses; compared case-insensitively.
    pub emails: Vec<String>,
}

/// Merger tables and policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergerConfig {
    /// Per-person email vetoes applied to roster B addresses.
    #[serde(default)]
    pub email_blacklist: Vec<BlacklistEntry>,
    /// Preferred source per field.
    #[serde(default)]
    pub field_precedence: FieldPrecedence,
    /// Handling of secondary-only records.
    #[serde(default)]
    pub secondary_only: SecondaryOnlyPolicy,
    /// Party label expansions. Labels are passed through untouched when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_labels: Option<PartyLabels>,
}

impl MergerConfig {
    /// Vetoes `email` from roster B for the given person.
    #[must_use]
    pub fn with_blacklisted_email(
        mut self,
        forename: impl Into<String>,
        surname: impl Into<String>,
        group: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        self.email_blacklist.push(BlacklistEntry {
            forename: forename.into(),
            surname: surname.into(),
            group: group.into(),
            emails: vec![email.into()],
        });
        self
    }

    /// Sets the field precedence.
    #[must_use]
    pub fn with_precedence(mut self, precedence: FieldPrecedence) -> Self {
        self.field_precedence = precedence;
        self
    }

    /// Sets the secondary-only policy.
    #[must_use]
    pub fn with_secondary_only(mut self, policy: SecondaryOnlyPolicy) -> Self {
        self.secondary_only = policy;
        self
    }

    /// Sets the party label table.
    #[must_use]
    pub fn with_party_labels(mut self, labels: PartyLabels) -> Self {
        self.party_labels = Some(labels);
        self
    }

    /// Vetoed addresses by person key. `canonical_group` maps each entry's
    /// group the same way the matcher maps roster groups.
    pub(crate) fn blacklist_by_key(&self, canonical_group: impl Fn(&str) -> String) -> HashMap<PersonKey, HashSet<String>> {
        let mut by_key: HashMap<PersonKey, HashSet<String>> = HashMap::new();
        for entry in &self.email_blacklist {
            let key = PersonKey::new(&entry.surname, &entry.forename, &canonical_group(&entry.group));
            by_key
                .entry(key)
                .or_default()
                .extend(entry.emails.iter().map(|e| e.trim().to_lowercase()));
        }
        by_key
    }
}
