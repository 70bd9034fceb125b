//! cmdparity CLI - Main Entry Point
//!
//! Runs the hammer suite against a server, checks command-surface parity on
//! its own and captures fresh reference trees.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{capture, diff, run, settings, Session};
use output::print_error;

/// cmdparity - hammer command-surface parity suite
#[derive(Parser)]
#[command(name = "cmdparity")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding settings.yaml (defaults to $CMDPARITY_DIR or the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Log format
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Run hammer on this machine instead of over ssh
    #[arg(long, global = true)]
    local: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the registered cases
    Run(run::RunArgs),

    /// Compare the live command tree with the reference
    Diff(diff::DiffArgs),

    /// Write the live command tree as a new reference
    Capture(capture::CaptureArgs),

    /// Validate and show settings
    Settings(settings::SettingsArgs),

    /// Show version information
    Version,
}

fn init_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.with_target(false).init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let root = cli.root.clone().unwrap_or_else(cmdparity_common::Settings::root_from_env);

    match cli.command {
        Commands::Run(args) if args.list => run::list(cli.format),
        Commands::Run(args) => {
            let session = Session::live(commands::load_settings(&root)?, cli.local)?;
            run::execute(args, &session, cli.format)?;
        }
        Commands::Diff(args) => {
            let settings = commands::load_settings(&root)?;
            let strategy = args.strategy(settings.hammer.walk_strategy);
            let session = Session::open(settings, args.help_dump.as_deref(), strategy, cli.local)?;
            diff::execute(args, &session, cli.format)?;
        }
        Commands::Capture(args) => {
            let settings = commands::load_settings(&root)?;
            let strategy = args
                .strategy
                .map(Into::into)
                .unwrap_or(settings.hammer.walk_strategy);
            let session = Session::open(settings, args.help_dump.as_deref(), strategy, cli.local)?;
            capture::execute(args, &session)?;
        }
        Commands::Settings(args) => {
            let settings = commands::load_settings(&root)?;
            settings::execute(args, &settings, cli.format)?;
        }
        Commands::Version => {
            println!("cmdparity v{}", cmdparity_common::VERSION);
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    if let Err(e) = execute(cli) {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_diff_flags() {
        let cli = Cli::try_parse_from([
            "cmdparity",
            "--root",
            "/srv/suite",
            "diff",
            "--strategy",
            "recursive",
            "--reference",
            "ref.json",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/srv/suite")));
        match cli.command {
            Commands::Diff(args) => {
                assert!(matches!(args.strategy, Some(commands::StrategyArg::Recursive)));
                assert_eq!(args.reference, Some(PathBuf::from("ref.json")));
            }
            _ => panic!("expected diff"),
        }
    }

    #[test]
    fn test_local_flag_is_global() {
        let cli = Cli::try_parse_from(["cmdparity", "capture", "--output", "ref.json", "--local"]).unwrap();
        assert!(cli.local);
        let cli = Cli::try_parse_from(["cmdparity", "--local", "run", "--tag", "tier1"]).unwrap();
        assert!(cli.local);
        assert!(!Cli::try_parse_from(["cmdparity", "diff"]).unwrap().local);
    }

    #[test]
    fn test_case_and_tag_conflict() {
        assert!(Cli::try_parse_from(["cmdparity", "run", "--case", "a", "--tag", "tier1"]).is_err());
    }
}
