//! Identity resolution: noisy (name, context, date) triples to register ids.
//!
//! Every observation resolves independently. A failure never stops the batch;
//! it becomes an empty output slot plus a diagnostic line, so output stays in
//! line-for-line correspondence with input.

mod pool;

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FailureKind, RegisterError, ResolutionFailure};
use crate::name::{canonicalize_name, strip_honorifics, tidy_whitespace};
use crate::observation::{Observation, SourceTag, DEFAULT_DELIMITER};
use crate::register::{IdentityRegister, PersonId};

/// Outcome of resolving one observation.
pub type ResolvedIdentity = Result<PersonId, ResolutionFailure>;

fn default_true() -> bool {
    true
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

fn default_workers() -> usize {
    1
}

/// How the resolver prepares names and schedules lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Drop titles and post-nominals before lookup.
    #[serde(default = "default_true")]
    pub strip_honorifics: bool,
    /// Run names through [`canonicalize_name`] before lookup.
    #[serde(default = "default_true")]
    pub canonicalize: bool,
    /// Field separator for observation lines.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Worker threads for batch resolution. `1` resolves on the calling thread.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Contexts to assume for raw names that are known to be ambiguous when
    /// an observation arrives without one, e.g. `Dr Tony Wright` ->
    /// `Cannock Chase`. Keys are matched on the tidied raw name.
    #[serde(default)]
    pub context_hints: BTreeMap<String, String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            strip_honorifics: true,
            canonicalize: true,
            delimiter: DEFAULT_DELIMITER,
            workers: 1,
            context_hints: BTreeMap::new(),
        }
    }
}

/// Counts reported after a resolution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveSummary {
    /// Input lines seen.
    pub total: usize,
    /// Lines that produced an identifier.
    pub resolved: usize,
    /// Lines that produced an empty slot.
    pub failed: usize,
}

impl ResolveSummary {
    fn record(&mut self, outcome: &ResolvedIdentity) {
        self.total += 1;
        if outcome.is_ok() {
            self.resolved += 1;
        } else {
            self.failed += 1;
        }
    }
}

fn failure_kind(err: RegisterError) -> FailureKind {
    match err {
        RegisterError::UnknownContext { .. } => FailureKind::ContextLookup {
            detail: err.to_string(),
        },
        RegisterError::Ambiguous { candidates, .. } => FailureKind::Ambiguous { candidates },
        RegisterError::BackendError(detail) => FailureKind::RegisterUnavailable { detail },
    }
}

/// Resolves observations against an [`IdentityRegister`].
#[derive(Debug)]
pub struct IdentityResolver<R> {
    register: R,
    options: ResolverOptions,
}

impl<R: IdentityRegister> IdentityResolver<R> {
    /// Creates a resolver over `register`.
    pub fn new(register: R, options: ResolverOptions) -> Self {
        Self { register, options }
    }

    /// The options this resolver was built with.
    #[must_use]
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Applies the configured clean-up to a raw name.
    #[must_use]
    pub fn normalize_name(&self, raw: &str) -> String {
        let mut name = tidy_whitespace(raw);
        if self.options.strip_honorifics {
            name = strip_honorifics(&name);
        }
        if self.options.canonicalize {
            name = canonicalize_name(&name);
        }
        name
    }

    fn context_hint(&self, name: &str) -> Option<&str> {
        if self.options.context_hints.is_empty() {
            return None;
        }
        let hint = self.options.context_hints.get(&tidy_whitespace(name))?;
        debug!(name, context = %hint, "using context hint");
        Some(hint.as_str())
    }

    /// Resolves a single triple.
    ///
    /// Register errors are caught and turned into failures here; the
    /// underlying cause only goes to the debug log.
    pub fn resolve(&self, name: &str, context: Option<&str>, as_of: NaiveDate) -> ResolvedIdentity {
        let canonical = self.normalize_name(name);
        let context = context
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or_else(|| self.context_hint(name));

        let kind = match self.register.lookup(&canonical, context, as_of) {
            Ok(Some(id)) => {
                debug!(name = %canonical, context = context.unwrap_or(""), %as_of, person = %id, "resolved");
                return Ok(id);
            }
            Ok(None) => FailureKind::NoMatch,
            Err(err) => {
                debug!(name = %canonical, context = context.unwrap_or(""), %as_of, cause = %err, "register lookup error");
                failure_kind(err)
            }
        };

        let failure = ResolutionFailure::new(name, context.map(str::to_string), Some(as_of), kind);
        warn!(
            name = %failure.name,
            context = failure.context.as_deref().unwrap_or(""),
            %as_of,
            kind = failure.kind.name(),
            "failed to resolve"
        );
        Err(failure)
    }

    /// Resolves a parsed observation.
    pub fn resolve_observation(&self, observation: &Observation) -> ResolvedIdentity {
        self.resolve(
            &observation.raw_name,
            observation.role_context.as_deref(),
            observation.as_of_date,
        )
    }

    /// Parses and resolves one input line. `line_no` is 1-based.
    pub fn resolve_line(&self, line: &str, line_no: usize, source: &SourceTag) -> ResolvedIdentity {
        let observation = self.parse_line(line, line_no, source)?;
        self.resolve_observation(&observation)
    }

    fn parse_line(&self, line: &str, line_no: usize, source: &SourceTag) -> Result<Observation, ResolutionFailure> {
        Observation::parse_line(line, self.options.delimiter, line_no, source.clone()).map_err(|err| {
            warn!(line = line_no, error = %err, "malformed observation");
            ResolutionFailure::new(
                line.trim_end_matches(['\r', '\n']),
                None,
                None,
                FailureKind::MalformedInput {
                    detail: err.to_string(),
                },
            )
        })
    }

    /// Resolves a batch, preserving input order.
    ///
    /// With `workers > 1` lookups run on a bounded worker pool.
    ///
    /// # Errors
    ///
    /// Returns an I/O error only if a worker thread cannot be spawned.
    pub fn resolve_batch(&self, observations: &[Observation]) -> io::Result<Vec<ResolvedIdentity>> {
        if self.options.workers <= 1 || observations.len() < 2 {
            return Ok(observations.iter().map(|o| self.resolve_observation(o)).collect());
        }
        pool::resolve_in_pool(self, observations, self.options.workers)
    }

    /// Reads observation lines from `input`, writes one id or empty line per
    /// input line to `output`, and one diagnostic line per failure to
    /// `diagnostics`.
    ///
    /// With a single worker each output line is flushed as soon as it is
    /// known, so the resolver can sit at the end of a pipe.
    ///
    /// A line that is not valid UTF-8 is a malformed-input failure for that
    /// line only.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from the reader or writers.
    pub fn resolve_stream<I, O, D>(
        &self,
        mut input: I,
        mut output: O,
        mut diagnostics: D,
        source: &SourceTag,
    ) -> io::Result<ResolveSummary>
    where
        I: BufRead,
        O: Write,
        D: Write,
    {
        let mut summary = ResolveSummary::default();

        let mut buf = Vec::new();
        let mut line_no = 0;

        if self.options.workers <= 1 {
            while let Some(raw) = read_raw_line(&mut input, &mut buf)? {
                line_no += 1;
                let outcome = match raw {
                    Ok(line) => self.resolve_line(&line, line_no, source),
                    Err(bytes) => Err(undecodable(&bytes, line_no)),
                };
                write_outcome(&outcome, &mut output, &mut diagnostics)?;
                summary.record(&outcome);
            }
        } else {
            let mut parsed = Vec::new();
            while let Some(raw) = read_raw_line(&mut input, &mut buf)? {
                line_no += 1;
                parsed.push(match raw {
                    Ok(line) => self.parse_line(&line, line_no, source),
                    Err(bytes) => Err(undecodable(&bytes, line_no)),
                });
            }

            let observations: Vec<Observation> =
                parsed.iter().filter_map(|p| p.as_ref().ok().cloned()).collect();
            let mut resolved = self.resolve_batch(&observations)?.into_iter();

            for slot in parsed {
                let outcome = match slot {
                    Ok(_) => resolved
                        .next()
                        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "resolver lost a result"))?,
                    Err(failure) => Err(failure),
                };
                write_outcome(&outcome, &mut output, &mut diagnostics)?;
                summary.record(&outcome);
            }
        }

        info!(
            total = summary.total,
            resolved = summary.resolved,
            failed = summary.failed,
            "resolution finished"
        );
        Ok(summary)
    }
}

/// One input line without its terminator; raw bytes when it is not UTF-8.
type RawLine = Result<String, Vec<u8>>;

fn read_raw_line<I: BufRead>(input: &mut I, buf: &mut Vec<u8>) -> io::Result<Option<RawLine>> {
    buf.clear();
    if input.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8(buf.clone()).map_err(|err| err.into_bytes())))
}

fn undecodable(bytes: &[u8], line_no: usize) -> ResolutionFailure {
    warn!(line = line_no, "observation is not valid UTF-8");
    ResolutionFailure::new(
        String::from_utf8_lossy(bytes),
        None,
        None,
        FailureKind::MalformedInput {
            detail: format!("line {line_no} is not valid UTF-8"),
        },
    )
}

fn write_outcome<O: Write, D: Write>(outcome: &ResolvedIdentity, output: &mut O, diagnostics: &mut D) -> io::Result<()> {
    match outcome {
        Ok(id) => writeln!(output, "{id}")?,
        Err(failure) => {
            writeln!(output)?;
            writeln!(diagnostics, "{failure}")?;
            diagnostics.flush()?;
        }
    }
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::{InMemoryRegister, Membership};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolver(workers: usize) -> IdentityResolver<InMemoryRegister> {
        let register = InMemoryRegister::from_memberships([
            Membership::new("person/10001", "Gerry Adams", Some("Belfast West"), date(1997, 5, 1)),
            Membership::new("person/10002", "Michael McGimpsey", Some("Belfast South"), date(1998, 6, 25)),
            Membership::new("person/10003", "Tony Wright", Some("Cannock Chase"), date(1997, 5, 1)),
            Membership::new("person/10004", "Tony Wright", Some("Great Yarmouth"), date(1997, 5, 1)),
        ]);
        IdentityResolver::new(
            register,
            ResolverOptions {
                workers,
                ..ResolverOptions::default()
            },
        )
    }

    #[test]
    fn normalizes_noisy_names_before_lookup() {
        let r = resolver(1);
        let id = r.resolve("MR MICHAEL MCGIMPSEY MLA", Some("Belfast South"), date(2006, 2, 15));
        assert_eq!(id, Ok(PersonId::new("person/10002")));
    }

    #[test]
    fn no_match_carries_triple() {
        let r = resolver(1);
        let failure = r.resolve("Nobody Known", Some("Belfast West"), date(2006, 2, 15)).unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoMatch);
        assert_eq!(failure.name, "Nobody Known");
        assert_eq!(failure.context.as_deref(), Some("Belfast West"));
        assert_eq!(failure.as_of, Some(date(2006, 2, 15)));
    }

    #[test]
    fn bad_context_is_a_recoverable_failure() {
        let r = resolver(1);
        let failure = r.resolve("Gerry Adams", Some("Atlantis"), date(2006, 2, 15)).unwrap_err();
        assert!(failure.is_context_lookup());
    }

    #[test]
    fn ambiguous_name_is_a_failure() {
        let r = resolver(1);
        let failure = r.resolve("Dr Tony Wright", None, date(2004, 12, 7)).unwrap_err();
        assert!(matches!(failure.kind, FailureKind::Ambiguous { ref candidates } if candidates.len() == 2));
    }

    #[test]
    fn context_hint_breaks_ambiguity() {
        let mut r = resolver(1);
        r.options
            .context_hints
            .insert("Dr Tony Wright".to_string(), "Cannock Chase".to_string());
        let id = r.resolve("Dr  Tony Wright", None, date(2004, 12, 7));
        assert_eq!(id, Ok(PersonId::new("person/10003")));

        // An explicit context always wins over a hint.
        let id = r.resolve("Dr Tony Wright", Some("Great Yarmouth"), date(2004, 12, 7));
        assert_eq!(id, Ok(PersonId::new("person/10004")));
    }

    #[test]
    fn stream_keeps_line_correspondence() {
        let r = resolver(1);
        let input = "Gerry Adams#Belfast West#2006-02-15\n\
                     Nobody#Belfast West#2006-02-15\n\
                     garbage line\n\
                     Tony Wright#Great Yarmouth#2004-12-07\n";
        let mut out = Vec::new();
        let mut diag = Vec::new();
        let summary = r
            .resolve_stream(input.as_bytes(), &mut out, &mut diag, &SourceTag::new("test"))
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, "person/10001\n\n\nperson/10004\n");
        assert_eq!(summary, ResolveSummary { total: 4, resolved: 2, failed: 2 });

        let diag = String::from_utf8(diag).unwrap();
        assert_eq!(diag.lines().count(), 2);
        assert!(diag.contains("failed to match Nobody (Belfast West) 2006-02-15"));
    }

    #[test]
    fn undecodable_line_fails_alone() {
        let mut input = b"Gerry Adams#Belfast West#2006-02-15\n".to_vec();
        input.extend_from_slice(b"Se\xe1n Neeson#East Antrim#2006-02-15\n");
        input.extend_from_slice(b"Michael McGimpsey#Belfast South#2006-02-15\n");

        for workers in [1, 2] {
            let mut out = Vec::new();
            let mut diag = Vec::new();
            let summary = resolver(workers)
                .resolve_stream(input.as_slice(), &mut out, &mut diag, &SourceTag::new("test"))
                .unwrap();

            assert_eq!(String::from_utf8(out).unwrap(), "person/10001\n\nperson/10002\n");
            assert_eq!(summary, ResolveSummary { total: 3, resolved: 2, failed: 1 });
            let diag = String::from_utf8(diag).unwrap();
            assert_eq!(diag.lines().count(), 1);
            assert!(diag.contains("not valid UTF-8"), "{diag}");
        }
    }

    /// Register whose backend is down for one name.
    struct FlakyRegister(InMemoryRegister);

    impl IdentityRegister for FlakyRegister {
        fn lookup(&self, name: &str, context: Option<&str>, as_of: NaiveDate) -> Result<Option<PersonId>, RegisterError> {
            if name == "Michael McGimpsey" {
                return Err(RegisterError::BackendError("connection reset".to_string()));
            }
            self.0.lookup(name, context, as_of)
        }
    }

    #[test]
    fn backend_error_fails_only_its_line() {
        let register = FlakyRegister(InMemoryRegister::from_memberships([Membership::new(
            "person/10001",
            "Gerry Adams",
            Some("Belfast West"),
            date(1997, 5, 1),
        )]));
        let input = "Michael McGimpsey#Belfast South#2006-02-15\n\
                     Gerry Adams#Belfast West#2006-02-15\n";

        for workers in [1, 2] {
            let r = IdentityResolver::new(
                &register,
                ResolverOptions {
                    workers,
                    ..ResolverOptions::default()
                },
            );
            let mut out = Vec::new();
            let mut diag = Vec::new();
            let summary = r
                .resolve_stream(input.as_bytes(), &mut out, &mut diag, &SourceTag::new("test"))
                .unwrap();

            assert_eq!(String::from_utf8(out).unwrap(), "\nperson/10001\n");
            assert_eq!(summary, ResolveSummary { total: 2, resolved: 1, failed: 1 });
            let diag = String::from_utf8(diag).unwrap();
            assert!(diag.starts_with("failed to match Michael McGimpsey (Belfast South) 2006-02-15"), "{diag}");
            assert!(diag.contains("connection reset"), "{diag}");
        }

        let failure = IdentityResolver::new(&register, ResolverOptions::default())
            .resolve("Michael McGimpsey", Some("Belfast South"), date(2006, 2, 15))
            .unwrap_err();
        assert!(matches!(failure.kind, FailureKind::RegisterUnavailable { .. }));
    }

    #[test]
    fn pooled_batch_preserves_order() {
        let r = resolver(3);
        let names = ["Gerry Adams", "Nobody", "Michael McGimpsey", "Gerry Adams", "Nobody Else"];
        let contexts = ["Belfast West", "Belfast West", "Belfast South", "Belfast West", "Belfast South"];
        let observations: Vec<Observation> = names
            .iter()
            .zip(contexts)
            .map(|(n, c)| Observation::new(*n, Some(c), date(2006, 2, 15), SourceTag::new("test")))
            .collect();

        let results = r.resolve_batch(&observations).unwrap();
        let ids: Vec<Option<String>> = results
            .iter()
            .map(|r| r.as_ref().ok().map(ToString::to_string))
            .collect();
        assert_eq!(
            ids,
            vec![
                Some("person/10001".to_string()),
                None,
                Some("person/10002".to_string()),
                Some("person/10001".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn pooled_stream_matches_sequential_stream() {
        let input = "Gerry Adams#Belfast West#2006-02-15\n\
                     bad\n\
                     Michael McGimpsey#Belfast South#2006-02-15\n";

        let mut seq_out = Vec::new();
        resolver(1)
            .resolve_stream(input.as_bytes(), &mut seq_out, io::sink(), &SourceTag::new("t"))
            .unwrap();

        let mut pool_out = Vec::new();
        resolver(2)
            .resolve_stream(input.as_bytes(), &mut pool_out, io::sink(), &SourceTag::new("t"))
            .unwrap();

        assert_eq!(seq_out, pool_out);
    }
}
