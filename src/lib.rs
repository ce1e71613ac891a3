//! # rollcall - identity resolution and roster reconciliation
//!
//! rollcall turns noisy, independently scraped observations of elected
//! representatives into stable identities and reconciled rosters.
//!
//! ## Core Concepts
//!
//! - **Observation**: a scraped `(name, context, date)` claim about a person
//! - **IdentityRegister**: the external authority that maps a canonical name,
//!   context and date to a stable [`PersonId`]
//! - **PersonKey**: the exact join key (surname, forename, canonical group)
//!   used to pair two rosters; all tolerance comes from explicit alias tables
//! - **CanonicalRecord**: the single merged record per person
//!
//! ## Usage
//!
//! ```
//! use rollcall::{CandidateRecord, ReconcileConfig, Reconciler};
//!
//! let a = vec![CandidateRecord::new("Jill", "Evans", "Wales").with_email("j@x.com")];
//! let b = vec![CandidateRecord::new("JILL", "EVANS", "Wales").with_email("J@X.COM")];
//!
//! let reconciler = Reconciler::new(&ReconcileConfig::default())?;
//! let report = reconciler.reconcile(&a, &b)?;
//! assert_eq!(report.records[0].emails(), ["j@x.com"]);
//! # Ok::<(), rollcall::RollcallError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Names and inputs
pub mod error;
pub mod label;
pub mod name;
pub mod observation;
pub mod record;

// Resolution
pub mod register;
pub mod resolver;

// Reconciliation
pub mod config;
pub mod integrity;
pub mod matcher;
pub mod merger;
pub mod pipeline;
pub mod roster;

pub mod telemetry;

// Re-export primary types at crate root for convenience
pub use config::ReconcileConfig;
pub use error::{
    ConfigError, FailureKind, IntegrityError, RegisterError, ResolutionFailure, RollcallError, RollcallResult,
    RosterError, ValidationError,
};
pub use integrity::{check_cardinality, check_group_sizes};
pub use label::PartyLabels;
pub use matcher::{MatchOutcome, MatchedPair, MatcherConfig, NameAlias, RecordMatcher, RosterSide};
pub use merger::{FieldPrecedence, MergeOutcome, MergerConfig, RosterMerger, SecondaryOnlyPolicy, Source};
pub use name::{canonicalize_name, split_full_name, strip_honorifics, NameOrder};
pub use observation::{Observation, SourceTag};
pub use pipeline::{ReconcileReport, ReconcileSummary, Reconciler};
pub use record::{CandidateRecord, CanonicalRecord, PersonKey, Provenance};
pub use register::{IdentityRegister, InMemoryRegister, Membership, PersonId};
pub use resolver::{IdentityResolver, ResolveSummary, ResolvedIdentity, ResolverOptions};
pub use roster::{
    read_roster, read_roster_file, read_roster_file_with_order, read_roster_with_order, write_roster,
    write_roster_file, RosterOptions,
};
pub use telemetry::init_tracing;
