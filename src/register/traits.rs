//! The lookup contract for an external identity register.
//!
//! The register owns the identifier space and its update lifecycle. rollcall
//! only ever asks it one question: who held this name, in this context, on
//! this date?

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RegisterError;

/// Stable person identifier issued by the register.
///
/// # Examples
///
/// ```
/// use rollcall::PersonId;
///
/// let id = PersonId::new("uk.org.publicwhip/person/10001");
/// assert_eq!(id.to_string(), "uk.org.publicwhip/person/10001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    /// Wraps a register identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookup contract for a register of office-holders.
///
/// # Semantics
/// - Implementations apply their own membership windowing: the same name may
///   resolve to different people (or nobody) depending on `as_of`.
/// - `Ok(None)` means nobody matched.
/// - `Err(RegisterError::UnknownContext)` means the context itself could not be
///   interpreted.
pub trait IdentityRegister: Send + Sync {
    /// Looks up a canonical name, optional affiliation context and date.
    fn lookup(
        &self,
        name: &str,
        context: Option<&str>,
        as_of: NaiveDate,
    ) -> Result<Option<PersonId>, RegisterError>;
}

impl<R: IdentityRegister + ?Sized> IdentityRegister for Arc<R> {
    fn lookup(
        &self,
        name: &str,
        context: Option<&str>,
        as_of: NaiveDate,
    ) -> Result<Option<PersonId>, RegisterError> {
        (**self).lookup(name, context, as_of)
    }
}

impl<R: IdentityRegister + ?Sized> IdentityRegister for &R {
    fn lookup(
        &self,
        name: &str,
        context: Option<&str>,
        as_of: NaiveDate,
    ) -> Result<Option<PersonId>, RegisterError> {
        (**self).lookup(name, context, as_of)
    }
}
