//! Matcher configuration: alias tables and expected counts.
//!
//! Tables are plain data loaded once per run. [`MatcherConfig::compile`]
//! validates them and produces the lookup form the matcher works with.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::record::normalize_part;

/// One regex rewrite applied to group names before the alias lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRewrite {
    /// Pattern matched against the tidied group name.
    pub pattern: String,
    /// Replacement, `$1`-style captures allowed.
    pub replacement: String,
}

/// A secondary-roster spelling that maps onto a primary-roster spelling.
///
/// `surname` and `forename` restrict the alias to one person (original
/// secondary values); `group` restricts it to one canonical group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAlias {
    /// Secondary-roster spelling.
    pub from: String,
    /// Primary-roster spelling.
    pub to: String,
    /// Only apply to records with this surname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    /// Only apply to records with this forename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forename: Option<String>,
    /// Only apply within this group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl NameAlias {
    /// Creates an unscoped alias.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            surname: None,
            forename: None,
            group: None,
        }
    }

    /// Restricts the alias to records with this surname.
    #[must_use]
    pub fn for_surname(mut self, surname: impl Into<String>) -> Self {
        self.surname = Some(surname.into());
        self
    }

    /// Restricts the alias to records with this forename.
    #[must_use]
    pub fn for_forename(mut self, forename: impl Into<String>) -> Self {
        self.forename = Some(forename.into());
        self
    }

    /// Restricts the alias to one group.
    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Matcher tables and invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Group spelling variant -> canonical group.
    #[serde(default)]
    pub group_aliases: BTreeMap<String, String>,
    /// Regex rewrites applied, in order, before `group_aliases`.
    #[serde(default)]
    pub group_rewrites: Vec<GroupRewrite>,
    /// Forename aliases, tried in table order.
    #[serde(default)]
    pub forename_aliases: Vec<NameAlias>,
    /// Surname aliases, tried in table order.
    #[serde(default)]
    pub surname_aliases: Vec<NameAlias>,
    /// Distinct groups each roster must contain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_groups: Option<usize>,
    /// Distinct persons each roster must contain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_persons: Option<usize>,
    /// Persons expected per canonical group.
    #[serde(default)]
    pub group_headcounts: BTreeMap<String, usize>,
}

impl MatcherConfig {
    /// Adds a group alias.
    #[must_use]
    pub fn with_group_alias(mut self, variant: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.group_aliases.insert(variant.into(), canonical.into());
        self
    }

    /// Adds a group rewrite.
    #[must_use]
    pub fn with_group_rewrite(mut self, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.group_rewrites.push(GroupRewrite {
            pattern: pattern.into(),
            replacement: replacement.into(),
        });
        self
    }

    /// Appends a forename alias.
    #[must_use]
    pub fn with_forename_alias(mut self, alias: NameAlias) -> Self {
        self.forename_aliases.push(alias);
        self
    }

    /// Appends a surname alias.
    #[must_use]
    pub fn with_surname_alias(mut self, alias: NameAlias) -> Self {
        self.surname_aliases.push(alias);
        self
    }

    /// Sets the expected number of distinct groups.
    #[must_use]
    pub fn expecting_groups(mut self, count: usize) -> Self {
        self.expected_groups = Some(count);
        self
    }

    /// Sets the expected number of distinct persons.
    #[must_use]
    pub fn expecting_persons(mut self, count: usize) -> Self {
        self.expected_persons = Some(count);
        self
    }

    /// Sets the expected headcount of one group.
    #[must_use]
    pub fn with_group_headcount(mut self, group: impl Into<String>, count: usize) -> Self {
        self.group_headcounts.insert(group.into(), count);
        self
    }

    /// Validates the tables and compiles them for lookup.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPattern` for a rewrite that does not
    /// compile and `ValidationError::EmptyAlias` for an alias entry with an
    /// empty side.
    pub fn compile(&self) -> Result<CompiledTables, ValidationError> {
        let rewrites = self
            .group_rewrites
            .iter()
            .map(|rw| {
                Regex::new(&rw.pattern)
                    .map(|re| (re, rw.replacement.clone()))
                    .map_err(|err| ValidationError::InvalidPattern {
                        pattern: rw.pattern.clone(),
                        reason: err.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut group_aliases = BTreeMap::new();
        for (index, (variant, canonical)) in self.group_aliases.iter().enumerate() {
            let variant = normalize_part(variant);
            let canonical = normalize_part(canonical);
            if variant.is_empty() || canonical.is_empty() {
                return Err(ValidationError::EmptyAlias {
                    table: "group_aliases".to_string(),
                    index,
                });
            }
            group_aliases.insert(variant, canonical);
        }

        let mut tables = CompiledTables {
            rewrites,
            group_aliases,
            forename_aliases: Vec::new(),
            surname_aliases: Vec::new(),
        };
        tables.forename_aliases = compile_aliases(&self.forename_aliases, "forename_aliases", &tables)?;
        tables.surname_aliases = compile_aliases(&self.surname_aliases, "surname_aliases", &tables)?;
        Ok(tables)
    }
}

fn compile_aliases(
    aliases: &[NameAlias],
    table: &str,
    tables: &CompiledTables,
) -> Result<Vec<CompiledAlias>, ValidationError> {
    aliases
        .iter()
        .enumerate()
        .map(|(index, alias)| {
            let from = normalize_part(&alias.from);
            let to = normalize_part(&alias.to);
            if from.is_empty() || to.is_empty() {
                return Err(ValidationError::EmptyAlias {
                    table: table.to_string(),
                    index,
                });
            }
            Ok(CompiledAlias {
                from,
                to,
                surname: alias.surname.as_deref().map(normalize_part),
                forename: alias.forename.as_deref().map(normalize_part),
                group: alias.group.as_deref().map(|g| tables.canonical_group(g)),
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledAlias {
    pub(crate) from: String,
    pub(crate) to: String,
    surname: Option<String>,
    forename: Option<String>,
    group: Option<String>,
}

impl CompiledAlias {
    /// Checks the scope against the record's original normalized values.
    pub(crate) fn applies(&self, value: &str, surname: &str, forename: &str, group: &str) -> bool {
        self.from == value
            && self.surname.as_deref().map_or(true, |s| s == surname)
            && self.forename.as_deref().map_or(true, |f| f == forename)
            && self.group.as_deref().map_or(true, |g| g == group)
    }
}

/// Validated, lookup-ready form of a [`MatcherConfig`].
#[derive(Debug, Clone)]
pub struct CompiledTables {
    rewrites: Vec<(Regex, String)>,
    group_aliases: BTreeMap<String, String>,
    pub(crate) forename_aliases: Vec<CompiledAlias>,
    pub(crate) surname_aliases: Vec<CompiledAlias>,
}

impl CompiledTables {
    /// Maps a raw group name to its canonical normalized form.
    ///
    /// Rewrites run on the tidied name first, then the alias table applies to
    /// the normalized result.
    #[must_use]
    pub fn canonical_group(&self, raw: &str) -> String {
        let mut group = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        for (re, replacement) in &self.rewrites {
            group = re.replace_all(&group, replacement.as_str()).into_owned();
        }
        let group = normalize_part(&group);
        self.group_aliases.get(&group).cloned().unwrap_or(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_run_before_aliases() {
        let tables = MatcherConfig::default()
            .with_group_rewrite(r"^(North|South|East|West) Belfast$", "Belfast $1")
            .with_group_alias("Belfast North", "Belfast North (NI)")
            .compile()
            .unwrap();
        assert_eq!(tables.canonical_group("North  Belfast"), "belfast north (ni)");
        assert_eq!(tables.canonical_group("Foyle"), "foyle");
    }

    #[test]
    fn invalid_rewrite_is_rejected() {
        let err = MatcherConfig::default()
            .with_group_rewrite("(unclosed", "x")
            .compile()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPattern { .. }));
    }

    #[test]
    fn empty_alias_is_rejected() {
        let err = MatcherConfig::default()
            .with_surname_alias(NameAlias::new("  ", "Paisley Jnr"))
            .compile()
            .unwrap_err();
        match err {
            ValidationError::EmptyAlias { table, index } => {
                assert_eq!(table, "surname_aliases");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn alias_scope_uses_canonical_group() {
        let tables = MatcherConfig::default()
            .with_group_alias("Newry & Armagh", "Newry and Armagh")
            .with_surname_alias(NameAlias::new("Mallon", "Mallon Snr").in_group("Newry & Armagh"))
            .compile()
            .unwrap();
        let alias = &tables.surname_aliases[0];
        assert!(alias.applies("mallon", "mallon", "seamus", "newry and armagh"));
        assert!(!alias.applies("mallon", "mallon", "seamus", "foyle"));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: MatcherConfig = serde_json::from_str(r#"{"expected_groups": 18}"#).unwrap();
        assert_eq!(cfg.expected_groups, Some(18));
        assert!(cfg.group_aliases.is_empty());
        assert!(cfg.surname_aliases.is_empty());
    }
}
