//! `refload run` command - execute a load or preview run
//!
//! Wires the run together in the fixed order the loader depends on: open
//! the report logs, validate configuration, open the store, resolve the
//! run-scoped keys, purge the prior load, preload the caches, stream the
//! input through the pipeline, then import the emitted file. Preview mode
//! follows the same path with the purge, the bulk file, and the import
//! suppressed.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use chrono::Local;
use console::style;
use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::args::{GlobalOpts, OutputFormat};
use crate::core::cache::{AssocIndex, AssocTypeCache, KeyAllocator};
use crate::core::config::{RawConfig, RunConfig, RunMode};
use crate::core::pipeline::{CreatorSource, Pipeline, RunStats};
use crate::core::report::{RunLogs, STAMP_FORMAT};
use crate::core::resolver::{AccessionResolver, ReferenceResolver, Resolver, UserResolver};
use crate::core::store::Store;
use crate::core::writer::BulkWriter;

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Path to the target store
    #[arg(long, env = "REFLOAD_DATABASE")]
    pub database: Option<PathBuf>,

    /// Processing mode: load or preview
    #[arg(long, env = "REFLOAD_MODE")]
    pub mode: Option<String>,

    /// Object-type label the associations attach to
    #[arg(long, env = "REFLOAD_OBJECT_TYPE")]
    pub object_type: Option<String>,

    /// Tab-delimited input file
    #[arg(long, env = "REFLOAD_INPUT")]
    pub input: Option<PathBuf>,

    /// Creator login applied to every record (omit to read it per line)
    #[arg(long, env = "REFLOAD_CREATED_BY")]
    pub created_by: Option<String>,

    /// Directory for the report files and the bulk file
    /// (default: the input file's directory)
    #[arg(long, env = "REFLOAD_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Everything the summary reports about a finished run.
#[derive(Serialize)]
struct RunSummary {
    mode: &'static str,
    #[serde(flatten)]
    stats: RunStats,
    errors_logged: usize,
    bulk_file: Option<PathBuf>,
    rows_imported: Option<usize>,
    diagnostics_log: PathBuf,
    error_log: PathBuf,
}

pub fn run(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let cfg = RawConfig {
        database: args.database,
        mode: args.mode,
        object_type: args.object_type,
        input: args.input,
        created_by: args.created_by,
        output_dir: args.output_dir,
    }
    .validate()
    .into_diagnostic()?;

    let started = Local::now();
    let load_date = started.format(STAMP_FORMAT).to_string();

    fs::create_dir_all(&cfg.output_dir).into_diagnostic()?;
    let mut logs = RunLogs::open(&cfg.input, &cfg.output_dir, &started).into_diagnostic()?;

    // end stamps and flush happen on fatal paths too
    let outcome = execute(&cfg, &load_date, &mut logs);
    let errors_logged = logs.error_count();
    let summary = RunSummary {
        mode: cfg.mode.as_str(),
        stats: match &outcome {
            Ok((stats, _)) => *stats,
            Err(_) => RunStats::default(),
        },
        errors_logged,
        bulk_file: outcome
            .as_ref()
            .ok()
            .and_then(|(_, bulk)| bulk.as_ref().map(|(path, _)| path.clone())),
        rows_imported: outcome
            .as_ref()
            .ok()
            .and_then(|(_, bulk)| bulk.as_ref().map(|(_, rows)| *rows)),
        diagnostics_log: logs.diag_path().to_path_buf(),
        error_log: logs.error_path().to_path_buf(),
    };
    logs.finish().into_diagnostic()?;
    outcome?;

    if !global.quiet {
        print_summary(&summary, global.format)?;
    }

    Ok(())
}

type BulkOutcome = Option<(PathBuf, usize)>;

fn execute(
    cfg: &RunConfig,
    load_date: &str,
    logs: &mut RunLogs,
) -> Result<(RunStats, BulkOutcome)> {
    let mut store = Store::open(&cfg.database).into_diagnostic()?;

    logs.diag(&format!("Database: {}", cfg.database.display()))
        .into_diagnostic()?;
    logs.diag(&format!("Mode: {}", cfg.mode.as_str()))
        .into_diagnostic()?;
    logs.diag(&format!("Input File: {}", cfg.input.display()))
        .into_diagnostic()?;

    let object_type_key = store
        .object_type_key(&cfg.object_type)
        .into_diagnostic()?
        .ok_or_else(|| miette!("unknown object type: '{}'", cfg.object_type))?;
    logs.diag(&format!(
        "Object Type: {} (key {object_type_key})",
        cfg.object_type
    ))
    .into_diagnostic()?;

    // per-run creator resolves once; an unknown login is a per-record
    // problem, so the run continues and logs it on every line
    let run_creator = cfg
        .created_by
        .as_deref()
        .map(|login| (login, UserResolver::new(&store).resolve(login)));
    match &run_creator {
        Some((login, key)) => logs
            .diag(&format!("Created By: {login} (key {key:?})"))
            .into_diagnostic()?,
        None => logs.diag("Created By: per-line").into_diagnostic()?,
    }

    let creator_key = run_creator.as_ref().and_then(|(_, key)| *key);
    if cfg.mode == RunMode::Load {
        if let Some(key) = creator_key {
            let purged = store
                .purge_prior_load(object_type_key, key)
                .into_diagnostic()?;
            logs.diag(&format!("Purged prior rows: {purged}"))
                .into_diagnostic()?;
        }
    }

    let types = AssocTypeCache::load(&store, object_type_key).into_diagnostic()?;
    let index = AssocIndex::load(&store, object_type_key, creator_key).into_diagnostic()?;
    let allocator = KeyAllocator::init(&store).into_diagnostic()?;
    logs.diag(&format!(
        "Preloaded: {} association types, {} existing keys, next key {}",
        types.len(),
        index.len(),
        allocator.peek()
    ))
    .into_diagnostic()?;

    let input = File::open(&cfg.input)
        .map_err(|e| miette!("could not open input file {}: {e}", cfg.input.display()))?;
    let mut writer = if cfg.mode.is_preview() {
        None
    } else {
        Some(BulkWriter::create(&cfg.input, &cfg.output_dir).into_diagnostic()?)
    };

    let objects = AccessionResolver::new(&store, object_type_key);
    let references = ReferenceResolver::new(&store);
    let users = UserResolver::new(&store);
    let mut pipeline = Pipeline {
        object_type_key,
        load_date,
        objects: &objects,
        references: &references,
        types: &types,
        creator: match run_creator {
            Some((login, key)) => CreatorSource::PerRun { login, key },
            None => CreatorSource::PerLine(&users),
        },
        index,
        allocator,
    };
    let stats = pipeline
        .process(BufReader::new(input), writer.as_mut(), logs)
        .into_diagnostic()?;
    logs.diag(&format!(
        "Processed: {} lines, {} accepted, {} invalid, {} duplicates",
        stats.lines, stats.accepted, stats.invalid, stats.duplicates
    ))
    .into_diagnostic()?;

    let bulk = match writer {
        Some(w) => {
            let path = w.finish().into_diagnostic()?;
            let rows = store.bulk_import(&path).into_diagnostic()?;
            logs.diag(&format!(
                "Bulk import: {rows} rows from {}",
                path.display()
            ))
            .into_diagnostic()?;
            Some((path, rows))
        }
        None => None,
    };

    Ok((stats, bulk))
}

fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(summary).into_diagnostic()?
            );
        }
        OutputFormat::Text => {
            println!("{}", style("─".repeat(50)).dim());
            println!(
                "{} ({} mode)",
                style("Run Summary").bold(),
                summary.mode
            );
            println!("{}", style("─".repeat(50)).dim());
            println!("  Lines read:       {}", style(summary.stats.lines).cyan());
            println!(
                "  Accepted:         {}",
                style(summary.stats.accepted).green()
            );
            if summary.stats.invalid > 0 {
                println!("  Invalid:          {}", style(summary.stats.invalid).red());
            }
            if summary.stats.duplicates > 0 {
                println!(
                    "  Duplicates:       {}",
                    style(summary.stats.duplicates).yellow()
                );
            }
            if summary.errors_logged > 0 {
                println!(
                    "  Errors logged:    {} (see {})",
                    style(summary.errors_logged).red(),
                    summary.error_log.display()
                );
            }
            if let Some(path) = &summary.bulk_file {
                println!("  Bulk file:        {}", path.display());
            }
            if let Some(rows) = summary.rows_imported {
                println!("  Rows imported:    {}", style(rows).green());
            }
        }
    }
    Ok(())
}
