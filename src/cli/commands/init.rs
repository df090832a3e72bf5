//! `refload init` command - create an empty store with the loader schema

use console::style;
use miette::{miette, IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::core::store::Store;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Path for the new store
    #[arg(long, env = "REFLOAD_DATABASE")]
    pub database: Option<PathBuf>,

    /// Replace an existing store
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let database = args
        .database
        .ok_or_else(|| miette!("missing required parameter: --database (or REFLOAD_DATABASE)"))?;

    if database.exists() {
        if !args.force {
            return Err(miette!(
                "store already exists: {} (use --force to replace it)",
                database.display()
            ));
        }
        std::fs::remove_file(&database).into_diagnostic()?;
    }

    Store::create(&database).into_diagnostic()?;

    println!(
        "{} Initialized store at {}",
        style("✓").green(),
        style(database.display()).cyan()
    );

    Ok(())
}
