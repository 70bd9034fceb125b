//! Reference vs live comparison

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use cmdparity_common::IssueTracker;

use crate::tree::CommandNode;
use crate::walker::{LiveCommand, LiveWalk};

/// Delta for one command path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DifferenceRecord {
    pub command_path: String,
    /// The live command has no counterpart in the reference tree
    pub is_new_command: bool,
    pub added_options: BTreeSet<String>,
    pub removed_options: BTreeSet<String>,
    pub added_subcommands: BTreeSet<String>,
    pub removed_subcommands: BTreeSet<String>,
}

impl DifferenceRecord {
    pub fn new_command(command_path: &str) -> Self {
        Self {
            command_path: command_path.to_string(),
            is_new_command: true,
            ..Default::default()
        }
    }

    pub fn has_changes(&self) -> bool {
        !(self.added_options.is_empty()
            && self.removed_options.is_empty()
            && self.added_subcommands.is_empty()
            && self.removed_subcommands.is_empty())
    }
}

/// Differences keyed by rendered command path
pub type Differences = BTreeMap<String, DifferenceRecord>;

#[derive(Debug, Clone, Copy)]
pub enum PathRule {
    Exact(&'static str),
    Contains(&'static str),
}

impl PathRule {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathRule::Exact(expected) => path == *expected,
            PathRule::Contains(fragment) => path.contains(fragment),
        }
    }
}

/// An option the live tool reports only because of a tracked defect
#[derive(Debug, Clone, Copy)]
pub struct KnownIssueSuppression {
    pub issue: &'static str,
    pub rule: PathRule,
    pub option: &'static str,
}

pub const KNOWN_ISSUE_SUPPRESSIONS: &[KnownIssueSuppression] = &[
    KnownIssueSuppression {
        issue: "BZ:1666687",
        rule: PathRule::Exact("hammer report-template create"),
        option: "interactive",
    },
    KnownIssueSuppression {
        issue: "BZ:1666687",
        rule: PathRule::Exact("hammer report-template update"),
        option: "interactive",
    },
    KnownIssueSuppression {
        issue: "BZ:1666687",
        rule: PathRule::Contains("hammer virt-who-config fetch"),
        option: "output",
    },
];

/// Options to add to the live set of `path` while their issues are open
pub fn suppressed_options(path: &str, issues: &dyn IssueTracker) -> BTreeSet<String> {
    KNOWN_ISSUE_SUPPRESSIONS
        .iter()
        .filter(|s| s.rule.matches(path) && issues.is_open(s.issue))
        .map(|s| s.option.to_string())
        .collect()
}

/// Accumulates differences while live commands are fed in
pub struct TreeDiffer<'a> {
    reference: &'a CommandNode,
    issues: &'a dyn IssueTracker,
    differences: Differences,
}

impl<'a> TreeDiffer<'a> {
    pub fn new(reference: &'a CommandNode, issues: &'a dyn IssueTracker) -> Self {
        Self {
            reference,
            issues,
            differences: Differences::new(),
        }
    }

    pub fn compare(&mut self, live: &LiveCommand) {
        let path = live.path.to_string();

        let expected = match self.reference.find(&live.path) {
            Some(node) => node,
            None => {
                debug!("{} is not in the reference tree", path);
                self.differences
                    .insert(path.clone(), DifferenceRecord::new_command(&path));
                return;
            }
        };

        // Injected names count as present but are never reported as added
        let injected = suppressed_options(&path, self.issues);
        let mut options = live.options.clone();
        options.extend(injected.iter().cloned());
        let subcommands = live.subcommand_set();
        let expected_subcommands = expected.subcommand_names();

        let record = DifferenceRecord {
            command_path: path.clone(),
            is_new_command: false,
            added_options: options
                .difference(&expected.options)
                .filter(|name| !injected.contains(*name))
                .cloned()
                .collect(),
            removed_options: expected.options.difference(&options).cloned().collect(),
            added_subcommands: subcommands.difference(&expected_subcommands).cloned().collect(),
            removed_subcommands: expected_subcommands.difference(&subcommands).cloned().collect(),
        };

        if record.has_changes() {
            self.differences.insert(path, record);
        }
    }

    pub fn finish(self) -> Differences {
        self.differences
    }
}

/// Compare every command of a live walk against the reference tree
pub fn diff_trees(reference: &CommandNode, walk: &LiveWalk, issues: &dyn IssueTracker) -> Differences {
    let mut differ = TreeDiffer::new(reference, issues);
    for command in &walk.commands {
        differ.compare(command);
    }
    differ.finish()
}
