//! Capture Command
//!
//! Walks the live tool and writes a fresh reference tree.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use cmdparity_e2e::tree::{fingerprint, to_reference_json};

use crate::commands::{Session, StrategyArg};
use crate::output::print_success;

#[derive(Args)]
pub struct CaptureArgs {
    /// Where to write the reference tree
    #[arg(short, long)]
    pub output: PathBuf,

    /// Walk strategy (defaults to `hammer.walk_strategy`)
    #[arg(short, long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Capture from a saved `full-help` dump instead of the live server
    #[arg(long)]
    pub help_dump: Option<PathBuf>,
}

pub fn execute(args: CaptureArgs, session: &Session) -> Result<()> {
    let settings = &session.settings;
    let strategy = args
        .strategy
        .map(Into::into)
        .unwrap_or(settings.hammer.walk_strategy);

    let walk = session.context().walker().walk(strategy)?;
    let tree = walk.to_tree(&settings.hammer.program);
    let json = to_reference_json(&tree)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&args.output, &json)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    print_success(&format!(
        "Captured {} command(s) to {} (sha256 {})",
        tree.count_nodes(),
        args.output.display(),
        fingerprint(json.as_bytes())
    ));
    Ok(())
}
