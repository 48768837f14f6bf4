//! Model fetch and listing through the server's own CLI

use crate::config::ServerConfig;
use crate::errors::Result;
use crate::host::{CommandSpec, Host, OutputMode};
use crate::models::types::ListedModel;

/// Drives `ollama pull` and `ollama list` against one server address
pub struct ModelCli<'a> {
    binary: &'a str,
    address: String,
}

impl<'a> ModelCli<'a> {
    pub fn new(config: &'a ServerConfig) -> Self {
        Self {
            binary: &config.binary,
            address: config.address(),
        }
    }

    /// The client side of the CLI talks to whatever `OLLAMA_HOST` names
    fn command(&self, subcommand: &str) -> CommandSpec {
        CommandSpec::new(self.binary)
            .arg(subcommand)
            .env("OLLAMA_HOST", self.address.as_str())
    }

    pub fn pull_command(&self, model: &str) -> CommandSpec {
        self.command("pull").arg(model)
    }

    pub fn list_command(&self) -> CommandSpec {
        self.command("list").output(OutputMode::Capture)
    }

    /// Download `model` into the server's store; progress goes to the terminal
    pub async fn pull(&self, host: &dyn Host, model: &str) -> Result<()> {
        let command = self.pull_command(model);
        host.run(&command).await?.check(&command)?;
        Ok(())
    }

    /// Installed models, plus the raw table for display
    pub async fn list(&self, host: &dyn Host) -> Result<(Vec<ListedModel>, String)> {
        let command = self.list_command();
        let outcome = host.run(&command).await?.check(&command)?;
        Ok((ListedModel::parse_table(&outcome.stdout), outcome.stdout))
    }
}
