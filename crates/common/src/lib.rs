//! cmdparity Common Library
//!
//! Settings, remote command execution and known-issue lookups shared by
//! the suite runner and the CLI.

pub mod error;
pub mod issues;
pub mod remote;
pub mod server;
pub mod settings;

pub use error::{Error, Result};
pub use issues::{tracker_from_settings, IssueTracker, StaticIssueTracker};
pub use remote::{CommandOutput, LocalExecutor, RemoteExecutor, ReplayExecutor, SshExecutor};
pub use server::{GpgKeyDefaults, GpgKeyFields, ServerConfig};
pub use settings::{Settings, WalkStrategy};

/// cmdparity version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
