//! cmdparity suite
//!
//! Checks that the live hammer CLI on a server still exposes the command
//! surface captured in a reference tree, and runs the other hammer cases.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SuiteRunner                           │
//! │    CaseDescriptor table -> filter -> run -> SuiteResult     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  hammer_all_options                                         │
//! │    ReferenceTree::load(file) ──────────┐                    │
//! │    LiveWalker::walk(strategy) ─────────┤                    │
//! │      RemoteExecutor + HelpParser       ▼                    │
//! │                                  TreeDiffer                 │
//! │                    (known-issue suppressions applied)       │
//! │                                        │                    │
//! │                                        ▼                    │
//! │                            format_differences               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod case;
pub mod cases;
pub mod differ;
pub mod error;
pub mod help;
pub mod parity;
pub mod report;
pub mod runner;
pub mod tree;
pub mod walker;

pub use case::{CaseDescriptor, SkipCondition};
pub use differ::{diff_trees, DifferenceRecord, Differences, TreeDiffer};
pub use error::{E2eError, E2eResult};
pub use help::{HammerHelpParser, HelpParser, ParsedHelp};
pub use parity::{check_parity, compare_walk, ParityOutcome};
pub use report::format_differences;
pub use runner::{CaseOutcome, CaseResult, SuiteContext, SuiteResult, SuiteRunner};
pub use tree::{CommandNode, CommandPath, ReferenceTree};
pub use walker::{LiveCommand, LiveWalk, LiveWalker};
