//! In-memory register backend.
//!
//! Holds a list of memberships (who sat for what, between which dates) and
//! answers lookups against it. Intended for tests, fixtures and small
//! snapshot files exported from the real register.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RegisterError};
use crate::record::normalize_part;
use crate::register::traits::{IdentityRegister, PersonId};

fn lock_err(context: &'static str) -> RegisterError {
    RegisterError::BackendError(format!("poisoned lock: {context}"))
}

/// One term of office for one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Register identifier of the person.
    pub person_id: PersonId,
    /// Full name as the register spells it.
    pub name: String,
    /// Other full names the person is known by during this term.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Constituency, region or body. `None` for bodies resolved by name alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// First day of the term (inclusive).
    pub start: NaiveDate,
    /// Last day of the term (inclusive). `None` while the term is current.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl Membership {
    /// Creates an open-ended membership.
    #[must_use]
    pub fn new(
        person_id: impl Into<String>,
        name: impl Into<String>,
        context: Option<&str>,
        start: NaiveDate,
    ) -> Self {
        Self {
            person_id: PersonId::new(person_id),
            name: name.into(),
            aliases: Vec::new(),
            context: context.map(str::to_string),
            start,
            end: None,
        }
    }

    /// Closes the term on `end` (inclusive).
    #[must_use]
    pub fn ending(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    /// Adds an alternative spelling of the full name.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Returns true if `date` falls within the term.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Deserialize)]
struct RegisterFile {
    memberships: Vec<Membership>,
}

#[derive(Debug, Default)]
struct RegisterState {
    memberships: Vec<Membership>,
    by_name: HashMap<String, Vec<usize>>,
    contexts: HashSet<String>,
}

impl RegisterState {
    fn index(&mut self, membership: Membership) {
        let idx = self.memberships.len();
        let names = std::iter::once(&membership.name).chain(membership.aliases.iter());
        let mut keys: BTreeSet<String> = BTreeSet::new();
        for name in names {
            keys.insert(normalize_part(name));
        }
        for key in keys {
            self.by_name.entry(key).or_default().push(idx);
        }
        if let Some(context) = &membership.context {
            self.contexts.insert(normalize_part(context));
        }
        self.memberships.push(membership);
    }
}

/// Thread-safe in-memory register.
#[derive(Debug, Default)]
pub struct InMemoryRegister {
    state: RwLock<RegisterState>,
}

impl InMemoryRegister {
    /// Creates an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a register holding `memberships`.
    #[must_use]
    pub fn from_memberships(memberships: impl IntoIterator<Item = Membership>) -> Self {
        let mut state = RegisterState::default();
        for membership in memberships {
            state.index(membership);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Loads a register snapshot from a JSON file of the form
    /// `{"memberships": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` or `ConfigError::Parse`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: RegisterFile = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_memberships(file.memberships))
    }

    /// Adds a membership.
    ///
    /// # Errors
    ///
    /// Returns `RegisterError::BackendError` if the lock is poisoned.
    pub fn insert(&self, membership: Membership) -> Result<(), RegisterError> {
        let mut state = self.state.write().map_err(|_| lock_err("register.insert"))?;
        state.index(membership);
        Ok(())
    }

    /// Number of memberships held.
    ///
    /// # Errors
    ///
    /// Returns `RegisterError::BackendError` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, RegisterError> {
        let state = self.state.read().map_err(|_| lock_err("register.len"))?;
        Ok(state.memberships.len())
    }

    /// Returns true if the register holds no memberships.
    ///
    /// # Errors
    ///
    /// Returns `RegisterError::BackendError` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, RegisterError> {
        Ok(self.len()? == 0)
    }
}

impl IdentityRegister for InMemoryRegister {
    fn lookup(
        &self,
        name: &str,
        context: Option<&str>,
        as_of: NaiveDate,
    ) -> Result<Option<PersonId>, RegisterError> {
        let state = self.state.read().map_err(|_| lock_err("register.lookup"))?;

        let context_key = context.map(normalize_part).filter(|c| !c.is_empty());
        if let Some(key) = &context_key {
            if !state.contexts.contains(key) {
                return Err(RegisterError::UnknownContext {
                    context: context.unwrap_or_default().to_string(),
                });
            }
        }

        let Some(indices) = state.by_name.get(&normalize_part(name)) else {
            return Ok(None);
        };

        let candidates: BTreeSet<&PersonId> = indices
            .iter()
            .map(|&i| &state.memberships[i])
            .filter(|m| m.covers(as_of))
            .filter(|m| match &context_key {
                Some(key) => m.context.as_deref().map(normalize_part).as_ref() == Some(key),
                None => true,
            })
            .map(|m| &m.person_id)
            .collect();

        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.into_iter().next().cloned()),
            _ => Err(RegisterError::Ambiguous {
                name: name.to_string(),
                candidates: candidates.into_iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn register() -> InMemoryRegister {
        InMemoryRegister::from_memberships([
            Membership::new("person/1", "Gareth Thomas", Some("Clwyd West"), date(1997, 5, 1))
                .ending(date(2005, 5, 5)),
            Membership::new("person/2", "Gareth Thomas", Some("Harrow West"), date(1997, 5, 1)),
            Membership::new("person/3", "Ian Paisley", Some("North Antrim"), date(1970, 6, 18))
                .ending(date(2010, 4, 12)),
            Membership::new("person/4", "Ian Paisley Jnr", Some("North Antrim"), date(2010, 5, 6))
                .with_alias("Ian Paisley"),
            Membership::new("person/5", "David Steel", Some("House of Lords"), date(1997, 1, 1)),
        ])
    }

    #[test]
    fn context_disambiguates_shared_name() {
        let reg = register();
        let id = reg.lookup("Gareth Thomas", Some("Harrow West"), date(2004, 12, 7)).unwrap();
        assert_eq!(id, Some(PersonId::new("person/2")));
    }

    #[test]
    fn shared_name_without_context_is_ambiguous() {
        let reg = register();
        let err = reg.lookup("Gareth Thomas", None, date(2004, 12, 7)).unwrap_err();
        match err {
            RegisterError::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn membership_window_applies() {
        let reg = register();
        let before = reg.lookup("Ian Paisley", Some("North Antrim"), date(2006, 2, 15)).unwrap();
        let after = reg.lookup("Ian Paisley", Some("North Antrim"), date(2012, 1, 1)).unwrap();
        assert_eq!(before, Some(PersonId::new("person/3")));
        assert_eq!(after, Some(PersonId::new("person/4")));
    }

    #[test]
    fn out_of_term_is_no_match() {
        let reg = register();
        let id = reg.lookup("Gareth Thomas", Some("Clwyd West"), date(2006, 1, 1)).unwrap();
        assert_eq!(id, None);
    }

    #[test]
    fn unknown_context_is_an_error() {
        let reg = register();
        let err = reg.lookup("Ian Paisley", Some("Atlantis"), date(2006, 2, 15)).unwrap_err();
        assert!(matches!(err, RegisterError::UnknownContext { .. }));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let reg = register();
        let id = reg.lookup("DAVID  steel", Some("house of lords"), date(2006, 4, 10)).unwrap();
        assert_eq!(id, Some(PersonId::new("person/5")));
    }

    #[test]
    fn insert_extends_register() {
        let reg = InMemoryRegister::new();
        assert!(reg.is_empty().unwrap());
        reg.insert(Membership::new("person/9", "Jill Evans", Some("Wales"), date(1999, 6, 10)))
            .unwrap();
        assert_eq!(reg.len().unwrap(), 1);
        assert!(reg.lookup("Jill Evans", Some("Wales"), date(2009, 1, 1)).unwrap().is_some());
    }
}
