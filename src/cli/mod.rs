//! # CLI Module
//!
//! Command-line interface for the catalog relinker.
//!
//! ## Usage
//! ```bash
//! # Import a photo tree into the catalog
//! photo-relink import ~/Photos --db catalog.db
//!
//! # Reconnect records after files moved on disk
//! photo-relink reconcile ~/Photos --db catalog.db
//!
//! # Preview a template-driven rename
//! photo-relink rename --db catalog.db --format "{timestamp}_{old_name}" --dry-run
//!
//! # Inspect the audit trail
//! photo-relink history --db catalog.db --limit 20
//! ```

use photo_relink::core::catalog::{CatalogStore, SqliteCatalog};
use photo_relink::core::hasher::HashAlgorithm;
use photo_relink::core::matcher::MetricKind;
use photo_relink::core::mover::{MoveStatus, TransactionalMover};
use photo_relink::core::pipeline::{ReconcileOutcome, Reconciler};
use photo_relink::core::planner::{
    RenameBatch, RenamePlanner, SplitDirs, TemplateConfig, TemplatePolicy,
};
use photo_relink::error::Result;
use photo_relink::events::{
    Event, EventChannel, EventReceiver, HashEvent, MoveEvent, PassEvent,
};
use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

/// Nothing to do: catalog and disk already agree
const EXIT_NO_CHANGES: u8 = 0;
/// Changes were applied (or would be, in dry-run mode)
const EXIT_CHANGES_APPLIED: u8 = 2;
/// Unresolved conflicts or failures requiring attention
const EXIT_UNRESOLVED: u8 = 3;

/// Photo Relink - reconnect your catalog with files that moved
#[derive(Parser, Debug)]
#[command(name = "photo-relink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Re-associate catalog records with files found under a root
    Reconcile {
        /// Directory tree to scan
        root: PathBuf,

        /// Catalog database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Scan only the top level of the root
        #[arg(long)]
        no_recursive: bool,

        /// Report planned updates without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Minimum filename similarity for duplicate disambiguation (0-1)
        #[arg(long, default_value = "0.5")]
        threshold: f64,

        /// Content digest algorithm
        #[arg(short, long, default_value = "sha256")]
        algorithm: Algorithm,

        /// Filename similarity metric for duplicate disambiguation
        #[arg(short, long, default_value = "levenshtein")]
        metric: Metric,

        /// Include hidden files and directories
        #[arg(long)]
        include_hidden: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Insert files the catalog does not know yet
    Import {
        /// Directory tree to scan
        root: PathBuf,

        /// Catalog database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Scan only the top level of the root
        #[arg(long)]
        no_recursive: bool,

        /// Content digest algorithm
        #[arg(short, long, default_value = "sha256")]
        algorithm: Algorithm,

        /// Include hidden files and directories
        #[arg(long)]
        include_hidden: bool,
    },

    /// Rename cataloged files under a naming template
    Rename {
        /// Catalog database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Filename template, e.g. "{timestamp}_{old_name}".
        /// Tags: {timestamp} {year} {month} {isoyear} {isoweek} {isoday}
        /// {old_name} {hash} {regex}
        #[arg(short = 's', long)]
        format: Option<String>,

        /// Regex with capture groups run against the old path, feeding {regex}
        #[arg(short = 'r', long = "match")]
        pattern: Option<String>,

        /// Expansion for the captured groups ($1, $2, ...)
        #[arg(short = 'R', long)]
        expand: Option<String>,

        /// New base directory to restructure under
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Base the stored paths currently live under
        #[arg(long)]
        old_base: Option<PathBuf>,

        /// Keep only the first N components of the relative directory
        #[arg(short, long)]
        level: Option<usize>,

        /// Subdivide the target directory by capture date
        #[arg(short = 'T', long)]
        split_dirs: Option<SplitArg>,

        /// Replace whitespace in new paths with this string
        #[arg(short, long)]
        whitespace: Option<String>,

        /// strftime format for the {timestamp} tag
        #[arg(short, long)]
        date_format: Option<String>,

        /// Print the planned renames without moving anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the audit trail of applied path changes
    History {
        /// Catalog database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Show at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// SHA-256 - cryptographic content digest (default)
    Sha256,
    /// XXH3 - much faster, for large trusted collections
    Xxh3,
}

impl From<Algorithm> for HashAlgorithm {
    fn from(algo: Algorithm) -> Self {
        match algo {
            Algorithm::Sha256 => HashAlgorithm::Sha256,
            Algorithm::Xxh3 => HashAlgorithm::Xxh3,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Metric {
    /// Normalized edit distance (default)
    Levenshtein,
    /// Character-bigram overlap, insensitive to token order
    TokenOverlap,
}

impl From<Metric> for MetricKind {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Levenshtein => MetricKind::Levenshtein,
            Metric::TokenOverlap => MetricKind::TokenOverlap,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplitArg {
    /// base/2024/
    Year,
    /// base/2024/Jun/
    Month,
}

impl From<SplitArg> for SplitDirs {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::Year => SplitDirs::Year,
            SplitArg::Month => SplitDirs::Month,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (planned updates only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<ExitCode> {
    photo_relink::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Reconcile {
            root,
            db,
            no_recursive,
            dry_run,
            threshold,
            algorithm,
            metric,
            include_hidden,
            output,
        } => run_reconcile(
            root,
            db,
            !no_recursive,
            dry_run,
            threshold,
            algorithm.into(),
            metric.into(),
            include_hidden,
            output,
        ),
        Commands::Import {
            root,
            db,
            no_recursive,
            algorithm,
            include_hidden,
        } => run_import(root, db, !no_recursive, algorithm.into(), include_hidden),
        Commands::Rename {
            db,
            format,
            pattern,
            expand,
            base,
            old_base,
            level,
            split_dirs,
            whitespace,
            date_format,
            dry_run,
            yes,
        } => run_rename(RenameArgs {
            db,
            format,
            pattern,
            expand,
            base,
            old_base,
            level,
            split_dirs,
            whitespace,
            date_format,
            dry_run,
            yes,
        }),
        Commands::History { db, limit } => run_history(db, limit),
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photo-relink")
        .join("catalog.db")
}

fn open_catalog(db: Option<PathBuf>) -> Result<SqliteCatalog> {
    let path = db.unwrap_or_else(default_db_path);
    Ok(SqliteCatalog::open(&path)?)
}

/// Drive a progress bar from core events on a separate thread
fn spawn_progress(receiver: EventReceiver, progress: Option<ProgressBar>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress else { continue };
            match event {
                Event::Pass(PassEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Hash(HashEvent::Started { total_files }) => {
                    pb.set_length(total_files as u64);
                }
                Event::Hash(HashEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                }
                Event::Move(MoveEvent::Started { total_intents }) => {
                    pb.set_length(total_intents as u64);
                    pb.set_position(0);
                    pb.set_message("Moving".to_string());
                }
                Event::Move(MoveEvent::Applied { .. }) | Event::Move(MoveEvent::Failed { .. }) => {
                    pb.inc(1);
                }
                Event::Pass(PassEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
    })
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    pb
}

#[allow(clippy::too_many_arguments)]
fn run_reconcile(
    root: PathBuf,
    db: Option<PathBuf>,
    recursive: bool,
    dry_run: bool,
    threshold: f64,
    algorithm: HashAlgorithm,
    metric: MetricKind,
    include_hidden: bool,
    output: OutputFormat,
) -> Result<ExitCode> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Photo Relink").bold().cyan(),
            style(if dry_run { "(dry run)" } else { "" }).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let catalog = open_catalog(db)?;

    let reconciler = Reconciler::builder()
        .root(root)
        .recursive(recursive)
        .include_hidden(include_hidden)
        .algorithm(algorithm)
        .metric(metric)
        .threshold(threshold)
        .dry_run(dry_run)
        .build();

    let (sender, receiver) = EventChannel::new();
    let progress = matches!(output, OutputFormat::Pretty).then(progress_bar);
    let event_thread = spawn_progress(receiver, progress);

    let outcome = reconciler.run(&catalog, &sender);

    drop(sender);
    event_thread.join().ok();

    let outcome = outcome?;

    match output {
        OutputFormat::Pretty => print_pretty_outcome(&term, &outcome),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
        }
        OutputFormat::Minimal => {
            for decision in outcome.report.relocations() {
                println!(
                    "{} -> {}",
                    decision.stored_path.display(),
                    decision.resolved_path.display()
                );
            }
        }
    }

    let code = if outcome.needs_attention() {
        EXIT_UNRESOLVED
    } else if outcome.relocations_found() > 0 {
        EXIT_CHANGES_APPLIED
    } else {
        EXIT_NO_CHANGES
    };
    Ok(ExitCode::from(code))
}

fn print_pretty_outcome(term: &Term, outcome: &ReconcileOutcome) {
    term.write_line("").ok();
    term.write_line(&format!(
        "{} Reconciliation {}",
        style("✓").green().bold(),
        if outcome.dry_run { "previewed" } else { "complete" }
    ))
    .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} records matched in {:.1}s",
        style(outcome.report.decisions.len()).cyan(),
        outcome.duration_ms as f64 / 1000.0
    ))
    .ok();

    let verb = if outcome.dry_run {
        "would be reconnected"
    } else {
        "reconnected"
    };
    let relocated = if outcome.dry_run {
        outcome.relocations_found()
    } else {
        outcome.updated
    };
    term.write_line(&format!("  {} {}", style(relocated).cyan(), verb))
        .ok();

    if !outcome.report.missing.is_empty() {
        term.write_line(&format!(
            "  {} missing from disk",
            style(outcome.report.missing.len()).yellow()
        ))
        .ok();
    }

    if !outcome.report.unknown.is_empty() {
        term.write_line(&format!(
            "  {} unknown files (run `import` to catalog them)",
            style(outcome.report.unknown.len()).yellow()
        ))
        .ok();
    }

    let error_count = outcome.scan_errors.len() + outcome.hash_errors.len();
    if error_count > 0 {
        term.write_line(&format!(
            "  {} files could not be read",
            style(error_count).yellow()
        ))
        .ok();
    }

    if !outcome.report.unresolved_records.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!(
            "{}",
            style("Unresolved records:").bold().underlined()
        ))
        .ok();
        for unresolved in &outcome.report.unresolved_records {
            term.write_line(&format!(
                "  {} record {} ({}): {}",
                style("?").yellow(),
                unresolved.record_id,
                unresolved.stored_path.display(),
                unresolved.reason
            ))
            .ok();
        }
    }

    if !outcome.commit_failures.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Commit failures:").bold().red()))
            .ok();
        for failure in &outcome.commit_failures {
            term.write_line(&format!(
                "  {} record {}: {}",
                style("✗").red(),
                failure.record_id,
                failure.message
            ))
            .ok();
        }
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "{}",
        style("Remember: reconciliation never deletes files.").dim()
    ))
    .ok();
}

fn run_import(
    root: PathBuf,
    db: Option<PathBuf>,
    recursive: bool,
    algorithm: HashAlgorithm,
    include_hidden: bool,
) -> Result<ExitCode> {
    let term = Term::stderr();
    let catalog = open_catalog(db)?;

    let reconciler = Reconciler::builder()
        .root(root)
        .recursive(recursive)
        .include_hidden(include_hidden)
        .algorithm(algorithm)
        .build();

    let (sender, receiver) = EventChannel::new();
    let event_thread = spawn_progress(receiver, Some(progress_bar()));

    let added = reconciler.import_new(&catalog, &sender);

    drop(sender);
    event_thread.join().ok();

    let added = added?;
    term.write_line(&format!(
        "{} {} new records imported",
        style("✓").green().bold(),
        style(added).cyan()
    ))
    .ok();

    let code = if added > 0 {
        EXIT_CHANGES_APPLIED
    } else {
        EXIT_NO_CHANGES
    };
    Ok(ExitCode::from(code))
}

struct RenameArgs {
    db: Option<PathBuf>,
    format: Option<String>,
    pattern: Option<String>,
    expand: Option<String>,
    base: Option<PathBuf>,
    old_base: Option<PathBuf>,
    level: Option<usize>,
    split_dirs: Option<SplitArg>,
    whitespace: Option<String>,
    date_format: Option<String>,
    dry_run: bool,
    yes: bool,
}

fn run_rename(args: RenameArgs) -> Result<ExitCode> {
    let term = Term::stderr();
    let catalog = open_catalog(args.db)?;
    let records = catalog.load_records()?;

    if records.is_empty() {
        term.write_line("Catalog is empty; nothing to rename.").ok();
        return Ok(ExitCode::from(EXIT_NO_CHANGES));
    }

    let policy = TemplatePolicy::new(TemplateConfig {
        template: args.format,
        date_format: args.date_format,
        pattern: args.pattern,
        expand: args.expand,
        whitespace: args.whitespace,
        level: args.level,
        split_dirs: args.split_dirs.map(Into::into),
        new_base: args.base,
        old_base: args.old_base,
    })?;

    let hasher = HashAlgorithm::Sha256.hasher();
    let planner = RenamePlanner::new(&policy, hasher.as_ref());
    let batch = planner.plan(&records);

    print_rename_batch(&term, &batch);

    if args.dry_run {
        for intent in &batch.intents {
            println!(
                "{} --> {}",
                intent.old_path.display(),
                intent.new_path.display()
            );
        }
        let code = if !batch.rejected.is_empty() {
            EXIT_UNRESOLVED
        } else if batch.has_work() {
            EXIT_CHANGES_APPLIED
        } else {
            EXIT_NO_CHANGES
        };
        return Ok(ExitCode::from(code));
    }

    if !batch.has_work() {
        let code = if batch.rejected.is_empty() {
            EXIT_NO_CHANGES
        } else {
            EXIT_UNRESOLVED
        };
        return Ok(ExitCode::from(code));
    }

    if !args.yes && !confirm_batch(&term, &batch) {
        term.write_line("Skipping rename and database update.").ok();
        return Ok(ExitCode::from(EXIT_NO_CHANGES));
    }

    let (sender, receiver) = EventChannel::new();
    let event_thread = spawn_progress(receiver, Some(progress_bar()));

    let mover = TransactionalMover::new(&catalog);
    let report = mover.apply(&batch.intents, &sender);

    drop(sender);
    event_thread.join().ok();

    term.write_line("").ok();
    term.write_line(&format!(
        "{} {} moved, {} failed",
        style("✓").green().bold(),
        style(report.applied()).cyan(),
        style(report.failed()).yellow()
    ))
    .ok();

    let mut inconsistent = 0;
    for outcome in report.inconsistent() {
        inconsistent += 1;
        term.write_line(&format!(
            "  {} record {} moved to {} but the catalog update failed - fix manually",
            style("✗").red().bold(),
            outcome.record_id,
            outcome.new_path.display()
        ))
        .ok();
    }

    for outcome in &report.outcomes {
        if let MoveStatus::FilesystemFailed { message } = &outcome.status {
            term.write_line(&format!(
                "  {} record {}: {}",
                style("✗").red(),
                outcome.record_id,
                message
            ))
            .ok();
        }
    }

    let code = if inconsistent > 0 || report.failed() > 0 || !batch.rejected.is_empty() {
        EXIT_UNRESOLVED
    } else if report.applied() > 0 {
        EXIT_CHANGES_APPLIED
    } else {
        EXIT_NO_CHANGES
    };
    Ok(ExitCode::from(code))
}

fn print_rename_batch(term: &Term, batch: &RenameBatch) {
    term.write_line(&format!(
        "{} to rename, {} unchanged, {} rejected",
        style(batch.intents.len()).cyan(),
        style(batch.unchanged).dim(),
        style(batch.rejected.len()).yellow()
    ))
    .ok();

    for rejected in &batch.rejected {
        term.write_line(&format!(
            "  {} record {} ({}): {}",
            style("!").yellow(),
            rejected.record_id,
            rejected.old_path.display(),
            rejected.reason
        ))
        .ok();
    }
}

/// Show a sample of the batch and ask for confirmation
fn confirm_batch(term: &Term, batch: &RenameBatch) -> bool {
    term.write_line("").ok();
    for intent in batch.intents.iter().take(5) {
        term.write_line(&format!(
            "  {} -> {}",
            intent.old_path.display(),
            intent.new_path.display()
        ))
        .ok();
    }
    if batch.intents.len() > 5 {
        term.write_line(&format!("  ... and {} more", batch.intents.len() - 5))
            .ok();
    }

    term.write_str(&format!(
        "Rename/move {} files with these changes? [y/N]: ",
        batch.intents.len()
    ))
    .ok();

    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

fn run_history(db: Option<PathBuf>, limit: Option<usize>) -> Result<ExitCode> {
    let catalog = open_catalog(db)?;
    let entries = catalog.audit_log(limit)?;

    if entries.is_empty() {
        println!("No path changes recorded yet.");
        return Ok(ExitCode::from(EXIT_NO_CHANGES));
    }

    for entry in &entries {
        println!(
            "{} {:9} record {:5} {} -> {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.operation.as_str(),
            entry.record_id,
            entry.old_path.display(),
            entry.new_path.display()
        );
    }

    Ok(ExitCode::from(EXIT_NO_CHANGES))
}
