//! Host abstraction
//!
//! Everything the bootstrap does to the machine (probing PATH, running
//! commands, spawning the server, looking at the process table) goes
//! through the [`Host`] trait so runs can be replayed against a fake host.

pub mod system;

use crate::errors::{PrepError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::path::{Path, PathBuf};

pub use system::SystemHost;

/// Where a command's stdout/stderr go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Shared with our terminal
    Inherit,
    /// Collected into the outcome
    Capture,
    /// Dropped
    Discard,
    /// Appended to a log file
    File(PathBuf),
}

/// A command to execute on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<Bytes>,
    pub output: OutputMode,
}

impl CommandSpec {
    /// New command with inherited output
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
            output: OutputMode::Inherit,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: Bytes) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Prefix with a privilege command such as `sudo`; empty leaves it as is
    pub fn elevated(self, privilege_command: &str) -> Self {
        let privilege_command = privilege_command.trim();
        if privilege_command.is_empty() {
            return self;
        }

        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);

        Self {
            program: privilege_command.to_string(),
            args,
            ..self
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit status, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success() -> Self {
        Self {
            status: Some(0),
            ..Default::default()
        }
    }

    pub fn with_status(status: i32) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a non-zero exit into [`PrepError::CommandFailed`]
    pub fn check(self, spec: &CommandSpec) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(PrepError::CommandFailed {
                command: spec.to_string(),
                status: self.status,
            })
        }
    }
}

/// A background server process owned by this run
#[async_trait]
pub trait ServerProcess: Send + Sync {
    /// Process id captured at spawn time
    fn id(&self) -> u32;

    /// Whether the process has already exited; reaps it if so
    fn has_exited(&mut self) -> Result<bool>;

    /// Forcefully stop this process and reap it
    async fn terminate(&mut self) -> Result<()>;
}

/// Operations the bootstrap performs against the machine
#[async_trait]
pub trait Host: Send + Sync {
    /// Whether `program` resolves on the search path
    fn has_command(&self, program: &str) -> bool;

    /// Whether a regular file exists at `path`
    fn file_exists(&self, path: &Path) -> bool;

    /// Run a command to completion
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome>;

    /// Start a command in the background
    async fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn ServerProcess>>;

    /// Whether `pid` is present (and not a zombie) in the process table
    fn is_process_running(&self, pid: u32) -> bool;
}
