//! CLI Commands

pub mod capture;
pub mod diff;
pub mod run;
pub mod settings;

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::Path;
use tracing::info;

use cmdparity_common::{
    tracker_from_settings, IssueTracker, LocalExecutor, RemoteExecutor, ReplayExecutor, Settings,
    SshExecutor, WalkStrategy,
};
use cmdparity_e2e::{HammerHelpParser, SuiteContext};

/// How to discover the live command tree
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    /// One `full-help` call
    FullHelp,
    /// One `--help` call per command
    Recursive,
}

impl From<StrategyArg> for WalkStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::FullHelp => WalkStrategy::FullHelp,
            StrategyArg::Recursive => WalkStrategy::Recursive,
        }
    }
}

/// Loaded settings plus the collaborators a suite context borrows
pub struct Session {
    pub settings: Settings,
    executor: Box<dyn RemoteExecutor>,
    issues: Box<dyn IssueTracker>,
    parser: HammerHelpParser,
}

impl Session {
    /// Connect to the server named in the settings over ssh
    pub fn connect(settings: Settings) -> Result<Self> {
        let executor = SshExecutor::from_settings(&settings).context("Cannot reach the server")?;
        info!("Using {}@{} over ssh", executor.user, executor.host);
        Self::with_executor(settings, Box::new(executor))
    }

    /// Run hammer on this machine, for use on the server itself
    pub fn local(settings: Settings) -> Result<Self> {
        info!("Running {} locally", settings.hammer.program);
        Self::with_executor(settings, Box::new(LocalExecutor))
    }

    /// Local execution when `local` is set, ssh otherwise
    pub fn live(settings: Settings, local: bool) -> Result<Self> {
        if local {
            Self::local(settings)
        } else {
            Self::connect(settings)
        }
    }

    /// Answer `<program> full-help` from a saved dump instead of the server
    pub fn replay(settings: Settings, help_dump: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(help_dump)
            .with_context(|| format!("Failed to read help dump {}", help_dump.display()))?;
        let command = format!("{} full-help", settings.hammer.program);
        info!("Replaying `{}` from {}", command, help_dump.display());
        Self::with_executor(settings, Box::new(ReplayExecutor::new().with_stdout(&command, &text)))
    }

    /// Replay when a dump is given, a live session otherwise
    pub fn open(
        settings: Settings,
        help_dump: Option<&Path>,
        strategy: WalkStrategy,
        local: bool,
    ) -> Result<Self> {
        match help_dump {
            Some(_) if strategy == WalkStrategy::Recursive => {
                anyhow::bail!("--help-dump only holds full-help output; use --strategy full-help")
            }
            Some(path) => Self::replay(settings, path),
            None => Self::live(settings, local),
        }
    }

    fn with_executor(settings: Settings, executor: Box<dyn RemoteExecutor>) -> Result<Self> {
        let issues = tracker_from_settings(&settings).context("Failed to set up issue lookups")?;
        Ok(Self {
            settings,
            executor,
            issues,
            parser: HammerHelpParser::new(),
        })
    }

    pub fn context(&self) -> SuiteContext<'_> {
        SuiteContext::new(
            &self.settings,
            self.executor.as_ref(),
            self.issues.as_ref(),
            &self.parser,
        )
    }
}

/// Load settings rooted at `root`
pub fn load_settings(root: &Path) -> Result<Settings> {
    Settings::load(root).with_context(|| format!("Failed to load settings from {}", root.display()))
}
