//! Ollama server launch and teardown
//!
//! The server is started as a background child and stopped through the
//! handle captured at spawn. Other `ollama serve` processes on the host
//! are never touched.

use crate::config::ServerConfig;
use crate::errors::Result;
use crate::host::{CommandSpec, Host, OutputMode, ServerProcess};
use std::path::PathBuf;

/// A running server started by this run
pub struct ServerHandle {
    process: Box<dyn ServerProcess>,
    pid: u32,
}

impl ServerHandle {
    pub fn new(process: Box<dyn ServerProcess>) -> Self {
        let pid = process.id();
        Self { process, pid }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the server has already died
    pub fn has_exited(&mut self) -> Result<bool> {
        self.process.has_exited()
    }

    /// Stop exactly the process we started
    pub async fn terminate(mut self) -> Result<u32> {
        tracing::info!(pid = self.pid, "terminating server");
        self.process.terminate().await?;
        Ok(self.pid)
    }

    /// Let the server outlive this run
    pub fn detach(self) -> u32 {
        tracing::info!(pid = self.pid, "leaving server running");
        self.pid
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle").field("pid", &self.pid).finish()
    }
}

/// Starts `ollama serve`
pub struct ServerLauncher<'a> {
    config: &'a ServerConfig,
    log_file: Option<PathBuf>,
}

impl<'a> ServerLauncher<'a> {
    pub fn new(config: &'a ServerConfig, log_file: Option<PathBuf>) -> Self {
        Self { config, log_file }
    }

    pub fn serve_command(&self) -> CommandSpec {
        let output = match &self.log_file {
            Some(path) => OutputMode::File(path.clone()),
            None => OutputMode::Discard,
        };

        CommandSpec::new(self.config.binary.as_str())
            .arg("serve")
            .env("OLLAMA_HOST", self.config.address())
            .output(output)
    }

    /// Spawn the server in the background
    pub async fn launch(&self, host: &dyn Host) -> Result<ServerHandle> {
        let process = host.spawn(&self.serve_command()).await?;
        Ok(ServerHandle::new(process))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_command_discards_output_by_default() {
        let config = ServerConfig::default();
        let launcher = ServerLauncher::new(&config, None);
        let command = launcher.serve_command();

        assert_eq!(command.to_string(), "ollama serve");
        assert_eq!(command.output, OutputMode::Discard);
        assert_eq!(
            command.env,
            vec![("OLLAMA_HOST".to_string(), "127.0.0.1:11434".to_string())]
        );
    }

    #[test]
    fn test_serve_command_logs_to_file() {
        let config = ServerConfig::default();
        let log = PathBuf::from("/tmp/ollama-serve.log");
        let launcher = ServerLauncher::new(&config, Some(log.clone()));

        assert_eq!(launcher.serve_command().output, OutputMode::File(log));
    }
}
