//! Diff Command
//!
//! Runs only the command-surface parity check and prints the report.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use cmdparity_common::WalkStrategy;
use cmdparity_e2e::check_parity;

use crate::commands::{Session, StrategyArg};
use crate::output::{print_report, print_success, print_value, OutputFormat};

#[derive(Args)]
pub struct DiffArgs {
    /// Walk strategy (defaults to `hammer.walk_strategy`)
    #[arg(short, long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Reference tree (defaults to `hammer.reference_file`)
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Compare a saved `full-help` dump instead of the live server
    #[arg(long)]
    pub help_dump: Option<PathBuf>,
}

impl DiffArgs {
    pub fn strategy(&self, default: WalkStrategy) -> WalkStrategy {
        self.strategy.map(Into::into).unwrap_or(default)
    }
}

pub fn execute(args: DiffArgs, session: &Session, format: OutputFormat) -> Result<()> {
    let settings = &session.settings;
    let reference = args
        .reference
        .clone()
        .unwrap_or_else(|| settings.reference_file());
    let strategy = args.strategy(settings.hammer.walk_strategy);

    let outcome = check_parity(&session.context(), &reference, strategy)
        .context("Parity check could not run")?;

    match format {
        OutputFormat::Table => {
            if outcome.is_parity() {
                print_success(&format!(
                    "{} command(s) match {}",
                    outcome.commands_checked,
                    reference.display()
                ));
            } else {
                print_report(&outcome.report());
            }
        }
        _ => print_value(&outcome, format),
    }

    if !outcome.is_parity() {
        anyhow::bail!(
            "{} command(s) differ from the reference",
            outcome.differences.keys().filter(|p| p.contains(' ')).count()
        );
    }
    Ok(())
}
