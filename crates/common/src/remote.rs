//! Command execution on the server under test

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Captured result of one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }

    /// Turn a non-zero status into [`Error::CommandFailed`]
    pub fn check(self, command: &str) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs a shell command line and waits for it to finish
pub trait RemoteExecutor {
    fn run(&self, command: &str) -> Result<CommandOutput>;
}

impl<T: RemoteExecutor + ?Sized> RemoteExecutor for &T {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        (**self).run(command)
    }
}

impl<T: RemoteExecutor + ?Sized> RemoteExecutor for Box<T> {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        (**self).run(command)
    }
}

/// Executes commands on the server through the system `ssh` client
#[derive(Debug, Clone)]
pub struct SshExecutor {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub key_path: Option<PathBuf>,
    pub connect_timeout_secs: u64,
}

impl SshExecutor {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let host = settings
            .server
            .hostname
            .clone()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::SettingNotFound("server.hostname".to_string()))?;

        Ok(Self {
            host,
            user: settings.server.ssh_username.clone(),
            port: settings.server.ssh_port,
            key_path: settings
                .server
                .ssh_key_path
                .as_deref()
                .map(|p| settings.resolve(p)),
            connect_timeout_secs: settings.server.ssh_connect_timeout_secs,
        })
    }

    /// Arguments passed to `ssh` for `command`
    pub fn args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
            "-p".to_string(),
            self.port.to_string(),
        ];
        if let Some(key) = &self.key_path {
            args.push("-i".to_string());
            args.push(key.to_string_lossy().into_owned());
        }
        args.push(format!("{}@{}", self.user, self.host));
        args.push("--".to_string());
        args.push(command.to_string());
        args
    }
}

impl RemoteExecutor for SshExecutor {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        debug!("ssh {}@{}: {}", self.user, self.host, command);
        capture(Command::new("ssh").args(self.args(command)), "ssh")
    }
}

/// Executes commands on this machine through `sh -c`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

impl RemoteExecutor for LocalExecutor {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        debug!("sh -c: {}", command);
        capture(Command::new("sh").arg("-c").arg(command), "sh")
    }
}

/// Answers commands from canned outputs and records every call.
///
/// Used to replay a saved `full-help` dump offline and as a test double.
#[derive(Debug, Default)]
pub struct ReplayExecutor {
    outputs: HashMap<String, CommandOutput>,
    calls: RefCell<Vec<String>>,
}

impl ReplayExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with a successful run printing `stdout`
    pub fn with_stdout(self, command: &str, stdout: &str) -> Self {
        self.with_output(
            command,
            CommandOutput {
                stdout: stdout.to_string(),
                ..Default::default()
            },
        )
    }

    pub fn with_output(mut self, command: &str, output: CommandOutput) -> Self {
        self.outputs.insert(command.to_string(), output);
        self
    }

    /// Commands received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl RemoteExecutor for ReplayExecutor {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(command.to_string());
        Ok(self.outputs.get(command).cloned().unwrap_or_else(|| CommandOutput {
            stderr: format!("no canned output for `{}`", command),
            status: 127,
            ..Default::default()
        }))
    }
}

fn capture(cmd: &mut Command, program: &str) -> Result<CommandOutput> {
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|source| Error::Spawn {
            program: program.to_string(),
            source,
        })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        // Killed by a signal
        status: output.status.code().unwrap_or(-1),
    })
}
