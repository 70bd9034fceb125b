//! Run Command
//!
//! Runs the registered cases and writes `test-results.json`.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use cmdparity_e2e::{cases, SuiteRunner};

use crate::commands::Session;
use crate::output::{print_list, print_success, CaseRow, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Run only cases carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only the case with this id
    #[arg(short, long, conflicts_with = "tag")]
    pub case: Option<String>,

    /// List the registered cases without running them
    #[arg(short, long)]
    pub list: bool,
}

pub fn list(format: OutputFormat) {
    let rows: Vec<CaseRow> = cases::registry().iter().map(CaseRow::from).collect();
    print_list(&rows, format);
}

pub fn execute(args: RunArgs, session: &Session, format: OutputFormat) -> Result<()> {
    let runner = SuiteRunner::new(session.context(), cases::registry());

    let result = match (&args.case, &args.tag) {
        (Some(id), _) => runner.run_case(id)?,
        (None, Some(tag)) => runner.run_tagged(tag),
        (None, None) => runner.run_all(),
    };
    let path = runner.write_results(&result)?;

    print_list(&result.results, format);
    if format == OutputFormat::Table {
        println!(
            "{} passed, {} failed, {} skipped, {} deselected in {} ms",
            result.passed.to_string().green(),
            result.failed.to_string().red(),
            result.skipped.to_string().yellow(),
            result.deselected,
            result.duration_ms
        );
        println!("Results: {}", path.display());
    }

    if !result.success() {
        anyhow::bail!("{} case(s) failed", result.failed);
    }
    if format == OutputFormat::Table {
        print_success("All selected cases passed or were skipped");
    }
    Ok(())
}
