//! Live command tree discovery
//!
//! The walker is driven entirely by what the live tool reports: there is no
//! list of commands to expect up front.

use std::collections::BTreeSet;
use tracing::{debug, info};

use cmdparity_common::{RemoteExecutor, WalkStrategy};

use crate::error::E2eResult;
use crate::help::{HelpParser, ParsedHelp};
use crate::tree::{CommandNode, CommandPath};

/// A command as reported by the live tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveCommand {
    pub path: CommandPath,
    pub options: BTreeSet<String>,
    /// Declared subcommands, in the order the tool printed them
    pub subcommands: Vec<String>,
}

impl LiveCommand {
    pub fn from_help(path: CommandPath, help: &ParsedHelp) -> Self {
        Self {
            path,
            options: help.option_names(),
            subcommands: help.subcommand_names(),
        }
    }

    pub fn subcommand_set(&self) -> BTreeSet<String> {
        self.subcommands.iter().cloned().collect()
    }
}

/// Every command visited by one walk, in visit order
#[derive(Debug, Clone, Default)]
pub struct LiveWalk {
    pub commands: Vec<LiveCommand>,
}

impl LiveWalk {
    /// Assemble the visited commands into a tree rooted at `program`.
    ///
    /// Declared subcommands that were never visited become empty leaves so
    /// the tree keeps every name the tool reported.
    pub fn to_tree(&self, program: &str) -> CommandNode {
        let mut root = CommandNode::new(program);
        for command in &self.commands {
            root.ensure(&command.path)
                .options
                .extend(command.options.iter().cloned());
            for name in &command.subcommands {
                root.ensure(&command.path.child(name));
            }
        }
        root
    }
}

/// One command's slice of `full-help` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpBlock<'a> {
    /// Invocation text with the ` >` separators removed
    pub invocation: String,
    pub lines: Vec<&'a str>,
}

/// Split `full-help` output into per-command blocks.
///
/// A block starts at a line beginning with `program` that is directly
/// followed by a line starting with `-`. Anything before the first block is
/// the banner and is dropped.
pub fn split_full_help<'a>(output: &'a str, program: &str) -> Vec<HelpBlock<'a>> {
    let lines: Vec<&str> = output.lines().collect();
    let is_header = |i: usize| {
        lines[i].starts_with(program)
            && lines.get(i + 1).map_or(false, |next| next.starts_with('-'))
    };

    let mut blocks: Vec<HelpBlock<'a>> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if is_header(i) {
            blocks.push(HelpBlock {
                invocation: line.replace(" >", ""),
                lines: Vec::new(),
            });
        } else if let Some(block) = blocks.last_mut() {
            block.lines.push(*line);
        }
    }
    blocks
}

/// Discovers the live command tree through a [`RemoteExecutor`]
pub struct LiveWalker<'a> {
    executor: &'a dyn RemoteExecutor,
    parser: &'a dyn HelpParser,
    program: String,
}

impl<'a> LiveWalker<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, parser: &'a dyn HelpParser, program: &str) -> Self {
        Self {
            executor,
            parser,
            program: program.to_string(),
        }
    }

    pub fn walk(&self, strategy: WalkStrategy) -> E2eResult<LiveWalk> {
        let walk = match strategy {
            WalkStrategy::FullHelp => self.walk_full_help()?,
            WalkStrategy::Recursive => self.walk_recursive()?,
        };
        info!("Discovered {} live command(s)", walk.commands.len());
        Ok(walk)
    }

    fn walk_full_help(&self) -> E2eResult<LiveWalk> {
        let command = format!("{} full-help", self.program);
        let output = self.executor.run(&command)?.check(&command)?;

        let commands = split_full_help(&output.stdout, &self.program)
            .into_iter()
            .map(|block| {
                let help = self.parser.parse(&block.lines);
                LiveCommand::from_help(CommandPath::parse(&block.invocation), &help)
            })
            .collect();

        Ok(LiveWalk { commands })
    }

    fn walk_recursive(&self) -> E2eResult<LiveWalk> {
        let mut walk = LiveWalk::default();
        self.visit(CommandPath::root(&self.program), &mut walk)?;
        Ok(walk)
    }

    fn visit(&self, path: CommandPath, walk: &mut LiveWalk) -> E2eResult<()> {
        let command = format!("{} --help", path);
        debug!("Walking {}", path);
        let output = self.executor.run(&command)?.check(&command)?;

        let lines: Vec<&str> = output.lines().collect();
        let help = self.parser.parse(&lines);
        let live = LiveCommand::from_help(path, &help);
        let children: Vec<CommandPath> = live.subcommands.iter().map(|name| live.path.child(name)).collect();
        walk.commands.push(live);

        for child in children {
            self.visit(child, walk)?;
        }
        Ok(())
    }
}
