//! Command-surface parity check

use serde::Serialize;
use std::path::Path;
use tracing::info;

use cmdparity_common::{IssueTracker, WalkStrategy};

use crate::differ::{diff_trees, Differences};
use crate::error::{E2eError, E2eResult};
use crate::report::format_differences;
use crate::runner::SuiteContext;
use crate::tree::ReferenceTree;
use crate::walker::LiveWalk;

/// Differences found by one parity check
#[derive(Debug, Clone, Serialize)]
pub struct ParityOutcome {
    pub differences: Differences,
    pub reference_fingerprint: String,
    pub commands_checked: usize,
}

impl ParityOutcome {
    pub fn report(&self) -> String {
        format_differences(&self.differences)
    }

    /// An empty report means full parity
    pub fn is_parity(&self) -> bool {
        self.report().is_empty()
    }

    /// Fail with the whole report once, if there is anything to report
    pub fn into_result(self) -> E2eResult<()> {
        let report = self.report();
        if report.is_empty() {
            Ok(())
        } else {
            Err(E2eError::AssertionFailed(format!("\n{}", report)))
        }
    }
}

/// Compare an already discovered walk against a reference tree
pub fn compare_walk(reference: &ReferenceTree, walk: &LiveWalk, issues: &dyn IssueTracker) -> ParityOutcome {
    ParityOutcome {
        differences: diff_trees(&reference.root, walk, issues),
        reference_fingerprint: reference.fingerprint.clone(),
        commands_checked: walk.commands.len(),
    }
}

/// Load the reference, walk the live tool and compare the two
pub fn check_parity(ctx: &SuiteContext<'_>, reference_file: &Path, strategy: WalkStrategy) -> E2eResult<ParityOutcome> {
    let reference = ReferenceTree::load(reference_file)?;
    info!(
        "Loaded reference {} ({} command(s), sha256 {})",
        reference_file.display(),
        reference.root.count_nodes(),
        reference.fingerprint
    );

    let walk = ctx.walker().walk(strategy)?;
    let outcome = compare_walk(&reference, &walk, ctx.issues);
    info!(
        "Checked {} command(s), {} with differences",
        outcome.commands_checked,
        outcome.differences.len()
    );
    Ok(outcome)
}
