use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rollcall::{
    canonicalize_name, init_tracing, read_roster_file_with_order, write_roster, write_roster_file, IdentityResolver,
    InMemoryRegister, NameOrder, ReconcileConfig, Reconciler, RollcallResult, SourceTag,
};

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Resolve and reconcile rosters of elected representatives", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical casing of each name (stdin when no names are given)
    Canonicalize {
        names: Vec<String>,
    },
    /// Resolve name#context#date lines from stdin to register ids on stdout
    Resolve {
        /// Register snapshot (JSON)
        #[arg(long)]
        register: PathBuf,
        /// Run configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Worker threads; overrides the config
        #[arg(long)]
        workers: Option<usize>,
        /// Field delimiter; overrides the config
        #[arg(long)]
        delimiter: Option<char>,
    },
    /// Merge two roster CSVs into one
    Merge {
        /// Roster A, the preferred source
        #[arg(long)]
        primary: PathBuf,
        /// Roster B
        #[arg(long)]
        secondary: PathBuf,
        /// Run configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output CSV; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
        /// Layout of `Name`-only columns in both rosters
        /// (forename-first, surname-last, surname-first); overrides the config
        #[arg(long)]
        name_order: Option<NameOrder>,
    },
}

fn load_config(path: Option<&Path>) -> RollcallResult<ReconcileConfig> {
    match path {
        Some(path) => Ok(ReconcileConfig::load(path)?),
        None => Ok(ReconcileConfig::default()),
    }
}

fn canonicalize(names: &[String]) -> RollcallResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if names.is_empty() {
        for line in io::stdin().lock().lines() {
            writeln!(out, "{}", canonicalize_name(line?.trim()))?;
        }
    } else {
        for name in names {
            writeln!(out, "{}", canonicalize_name(name))?;
        }
    }
    Ok(())
}

fn resolve(
    register: &Path,
    config: Option<&Path>,
    workers: Option<usize>,
    delimiter: Option<char>,
) -> RollcallResult<()> {
    let mut options = load_config(config)?.resolver;
    if let Some(workers) = workers {
        options.workers = workers;
    }
    if let Some(delimiter) = delimiter {
        options.delimiter = delimiter;
    }

    let register = InMemoryRegister::from_json_file(register)?;
    let resolver = IdentityResolver::new(register, options);
    let summary = resolver.resolve_stream(
        io::stdin().lock(),
        io::stdout().lock(),
        io::stderr().lock(),
        &SourceTag::new("stdin"),
    )?;
    tracing::debug!(?summary, "resolve finished");
    Ok(())
}

fn merge(
    primary: &Path,
    secondary: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    name_order: Option<NameOrder>,
) -> RollcallResult<()> {
    let config = load_config(config)?;
    let reconciler = Reconciler::new(&config)?;

    let roster = config.roster;
    let primary = read_roster_file_with_order(primary, name_order.unwrap_or(roster.primary_name_order))?;
    let secondary = read_roster_file_with_order(secondary, name_order.unwrap_or(roster.secondary_name_order))?;
    let report = reconciler.reconcile(&primary, &secondary)?;

    match output {
        Some(path) => write_roster_file(path, &report.records)?,
        None => write_roster(io::stdout().lock(), &report.records)?,
    }

    for dropped in &report.dropped_secondary {
        eprintln!("secondary only, not merged: {} ({})", dropped.display_name(), dropped.group);
    }
    for duplicate in &report.duplicates {
        eprintln!(
            "duplicate in {} roster, ignored: {} ({})",
            duplicate.side,
            duplicate.record.display_name(),
            duplicate.record.group
        );
    }
    let s = report.summary;
    eprintln!(
        "merged {} records: {} matched ({} via alias), {} primary only, {} secondary included, {} secondary dropped",
        report.records.len(),
        s.merge.both,
        s.matched_via_alias,
        s.merge.primary_only,
        s.merge.secondary_included,
        s.merge.secondary_dropped,
    );
    eprintln!("fingerprint {}", report.fingerprint());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Canonicalize { names } => canonicalize(names),
        Commands::Resolve {
            register,
            config,
            workers,
            delimiter,
        } => resolve(register, config.as_deref(), *workers, *delimiter),
        Commands::Merge {
            primary,
            secondary,
            config,
            output,
            name_order,
        } => merge(primary, secondary, config.as_deref(), output.as_deref(), *name_order),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "rollcall failed");
            eprintln!("rollcall: {err}");
            if err.is_integrity() {
                ExitCode::from(3)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

