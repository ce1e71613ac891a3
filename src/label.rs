//! Party and role label tidying.
//!
//! Sources abbreviate party names (`Lab`, `Plaid`) or append them in
//! parentheses (`Scottish National Party (SNP)`). Labels are tidied before
//! they reach the merger so both rosters speak the same vocabulary.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PARENTHESISED: OnceLock<Regex> = OnceLock::new();

fn parenthesised() -> &'static Regex {
    PARENTHESISED.get_or_init(|| Regex::new(r"\(.*?\)").expect("static regex"))
}

fn label_key(short: &str) -> String {
    short.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Expansion table for abbreviated party labels.
///
/// Keys are compared case-insensitively with whitespace runs collapsed, both
/// when inserted (or deserialized) and when looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct PartyLabels(BTreeMap<String, String>);

impl From<BTreeMap<String, String>> for PartyLabels {
    fn from(table: BTreeMap<String, String>) -> Self {
        Self(table.into_iter().map(|(short, full)| (label_key(&short), full)).collect())
    }
}

impl From<PartyLabels> for BTreeMap<String, String> {
    fn from(labels: PartyLabels) -> Self {
        labels.0
    }
}

impl Default for PartyLabels {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        for (short, full) in [
            ("lab", "Labour"),
            ("lib dem", "Liberal Democrat"),
            ("con", "Conservative"),
            ("plaid", "Plaid Cymru"),
        ] {
            table.insert(short.to_string(), full.to_string());
        }
        Self(table)
    }
}

impl PartyLabels {
    /// An expansion table with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds or replaces an expansion.
    pub fn insert(&mut self, short: &str, full: impl Into<String>) {
        self.0.insert(label_key(short), full.into());
    }

    /// Strips parenthesised abbreviations and expands known short forms.
    ///
    /// ```
    /// use rollcall::label::PartyLabels;
    ///
    /// let labels = PartyLabels::default();
    /// assert_eq!(labels.tidy("Lab"), "Labour");
    /// assert_eq!(labels.tidy("Scottish National Party (SNP)"), "Scottish National Party");
    /// ```
    #[must_use]
    pub fn tidy(&self, raw: &str) -> String {
        let stripped = parenthesised().replace_all(raw, "");
        let label = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        match self.0.get(&label_key(&label)) {
            Some(full) => full.clone(),
            None => label,
        }
    }

    /// Number of expansions in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the table has no expansions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
