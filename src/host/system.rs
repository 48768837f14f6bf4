//! Real host backed by tokio processes and the sysinfo process table

use super::{CommandOutcome, CommandSpec, Host, OutputMode, ServerProcess};
use crate::errors::{PrepError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use sysinfo::{Pid, ProcessStatus, System};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// How long to wait for a killed server to be reaped
const REAP_TIMEOUT: Duration = Duration::from_secs(10);

/// The machine we are running on
#[derive(Debug, Default, Clone)]
pub struct SystemHost;

impl SystemHost {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `program` the way a shell would
    pub fn which(program: &str) -> Option<PathBuf> {
        if program.contains('/') {
            let path = PathBuf::from(program);
            return is_executable(&path).then_some(path);
        }

        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }

    fn build(spec: &CommandSpec) -> Result<Command> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        cmd.stdin(if spec.stdin.is_some() { Stdio::piped() } else { Stdio::null() });

        match &spec.output {
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Discard => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
            OutputMode::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let log = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                let log_err = log.try_clone()?;
                cmd.stdout(Stdio::from(log)).stderr(Stdio::from(log_err));
            }
        }

        Ok(cmd)
    }

    async fn feed_stdin(child: &mut Child, spec: &CommandSpec) -> Result<()> {
        if let (Some(input), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
            stdin.write_all(input).await?;
            stdin.shutdown().await?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[async_trait]
impl Host for SystemHost {
    fn has_command(&self, program: &str) -> bool {
        Self::which(program).is_some()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome> {
        tracing::debug!(command = %spec, "running command");

        let mut child = Self::build(spec)?
            .spawn()
            .map_err(|source| PrepError::SpawnFailed {
                command: spec.to_string(),
                source,
            })?;

        Self::feed_stdin(&mut child, spec).await?;

        let output = child.wait_with_output().await?;
        let outcome = CommandOutcome {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        tracing::debug!(command = %spec, status = ?outcome.status, "command finished");
        Ok(outcome)
    }

    async fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn ServerProcess>> {
        let mut cmd = Self::build(spec)?;

        // Own process group: a Ctrl-C aimed at us does not reach the server.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| PrepError::SpawnFailed {
            command: spec.to_string(),
            source,
        })?;

        Self::feed_stdin(&mut child, spec).await?;

        let pid = child.id().ok_or_else(|| {
            PrepError::Generic(format!("`{}` exited immediately after spawn", spec))
        })?;

        tracing::info!(command = %spec, pid, "spawned background process");
        Ok(Box::new(ChildProcess { child, pid }))
    }

    fn is_process_running(&self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let mut sys = System::new();
        if !sys.refresh_process(pid) {
            return false;
        }

        sys.process(pid)
            .map(|process| !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
            .unwrap_or(false)
    }
}

/// Background child spawned by [`SystemHost::spawn`]
struct ChildProcess {
    child: Child,
    pid: u32,
}

#[async_trait]
impl ServerProcess for ChildProcess {
    fn id(&self) -> u32 {
        self.pid
    }

    fn has_exited(&mut self) -> Result<bool> {
        match self.child.try_wait()? {
            Some(status) => {
                tracing::debug!(pid = self.pid, ?status, "server exited");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn terminate(&mut self) -> Result<()> {
        if let Some(status) = self.child.try_wait()? {
            tracing::debug!(pid = self.pid, ?status, "server already exited");
            return Ok(());
        }

        self.child.start_kill()?;

        match timeout(REAP_TIMEOUT, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::debug!(pid = self.pid, ?status, "server reaped");
                Ok(())
            }
            Err(_) => Err(PrepError::Generic(format!(
                "Server process {} did not exit within {}s of being killed",
                self.pid,
                REAP_TIMEOUT.as_secs()
            ))),
        }
    }
}
