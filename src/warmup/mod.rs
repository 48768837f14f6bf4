//! Model warmup
//!
//! Runs the lab's warmup script when present, otherwise sends one
//! priming generate request. Never fails the run.

use crate::config::{ServerConfig, WarmupConfig};
use crate::host::{CommandSpec, Host};
use crate::models::{GenerateRequest, ServerApi};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What the warmup step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmupOutcome {
    /// External script exited zero
    Script(PathBuf),
    /// Built-in priming request succeeded
    Primed { load_ms: Option<u64> },
    Skipped(String),
    Failed(String),
}

impl WarmupOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, WarmupOutcome::Failed(_))
    }
}

impl fmt::Display for WarmupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarmupOutcome::Script(path) => write!(f, "warmup script {} completed", path.display()),
            WarmupOutcome::Primed { load_ms: Some(ms) } => write!(f, "model primed (loaded in {}ms)", ms),
            WarmupOutcome::Primed { load_ms: None } => write!(f, "model primed"),
            WarmupOutcome::Skipped(reason) => write!(f, "warmup skipped: {}", reason),
            WarmupOutcome::Failed(reason) => write!(f, "warmup failed: {}", reason),
        }
    }
}

/// Primes the pulled model
pub struct Warmup<'a> {
    config: &'a WarmupConfig,
    server: &'a ServerConfig,
    candidates: Vec<PathBuf>,
}

impl<'a> Warmup<'a> {
    /// `candidates` are tried in order; the first existing file is the script
    pub fn new(config: &'a WarmupConfig, server: &'a ServerConfig, candidates: Vec<PathBuf>) -> Self {
        Self {
            config,
            server,
            candidates,
        }
    }

    /// Run the warmup, swallowing any failure into the outcome
    pub async fn run(&self, host: &dyn Host, api: &dyn ServerApi) -> WarmupOutcome {
        if !self.config.enabled {
            return WarmupOutcome::Skipped("disabled in config".to_string());
        }

        let script = self.candidates.iter().find(|path| host.file_exists(path));
        let outcome = match script {
            Some(script) => self.run_script(host, script).await,
            None if self.config.builtin => self.prime(api).await,
            None => WarmupOutcome::Skipped("no warmup script found".to_string()),
        };

        if let WarmupOutcome::Failed(reason) = &outcome {
            tracing::warn!(%reason, "warmup failed, continuing");
        }
        outcome
    }

    pub fn script_command(&self, script: &Path) -> CommandSpec {
        CommandSpec::new("sh")
            .arg(script.to_string_lossy())
            .env("OLLAMA_HOST", self.server.address())
    }

    async fn run_script(&self, host: &dyn Host, script: &Path) -> WarmupOutcome {
        let command = self.script_command(script);
        tracing::info!(command = %command, "running warmup script");

        match host.run(&command).await {
            Ok(outcome) if outcome.is_success() => WarmupOutcome::Script(script.to_path_buf()),
            Ok(outcome) => WarmupOutcome::Failed(match outcome.status {
                Some(code) => format!("{} exited with status {}", script.display(), code),
                None => format!("{} was terminated by a signal", script.display()),
            }),
            Err(e) => WarmupOutcome::Failed(e.to_string()),
        }
    }

    async fn prime(&self, api: &dyn ServerApi) -> WarmupOutcome {
        let request = GenerateRequest {
            model: self.server.model.clone(),
            prompt: self.config.prompt.clone(),
            stream: false,
            keep_alive: self.config.keep_alive.clone(),
        };
        tracing::info!(model = %self.server.model, "sending priming request");

        match api
            .generate(&request, Duration::from_secs(self.config.timeout_secs))
            .await
        {
            Ok(response) => WarmupOutcome::Primed {
                load_ms: response.load_ms(),
            },
            Err(e) => WarmupOutcome::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{PrepError, Result};
    use crate::host::{CommandOutcome, ServerProcess};
    use crate::models::{GenerateResponse, ModelInfo};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Host whose every command ends the way `result` says
    struct FakeHost {
        files: Vec<PathBuf>,
        result: fn(&CommandSpec) -> Result<CommandOutcome>,
        ran: Mutex<Vec<CommandSpec>>,
    }

    impl FakeHost {
        fn new(files: &[&str], result: fn(&CommandSpec) -> Result<CommandOutcome>) -> Self {
            Self {
                files: files.iter().map(PathBuf::from).collect(),
                result,
                ran: Mutex::new(Vec::new()),
            }
        }

        fn ran(&self) -> Vec<CommandSpec> {
            self.ran.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Host for FakeHost {
        fn has_command(&self, _program: &str) -> bool {
            true
        }

        fn file_exists(&self, path: &Path) -> bool {
            self.files.iter().any(|f| f == path)
        }

        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome> {
            self.ran.lock().unwrap().push(spec.clone());
            (self.result)(spec)
        }

        async fn spawn(&self, _spec: &CommandSpec) -> Result<Box<dyn ServerProcess>> {
            Err(PrepError::Generic("not supported".to_string()))
        }

        fn is_process_running(&self, _pid: u32) -> bool {
            false
        }
    }

    struct SilentApi;

    #[async_trait]
    impl ServerApi for SilentApi {
        async fn is_available(&self) -> bool {
            false
        }

        async fn version(&self) -> Result<String> {
            Err(PrepError::OllamaApiError("down".to_string()))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }

        async fn generate(&self, _request: &GenerateRequest, _timeout: Duration) -> Result<GenerateResponse> {
            Err(PrepError::OllamaApiError("down".to_string()))
        }
    }

    fn succeed(_: &CommandSpec) -> Result<CommandOutcome> {
        Ok(CommandOutcome::success())
    }

    fn candidates(paths: &[&str]) -> Vec<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            WarmupOutcome::Primed { load_ms: Some(1200) }.to_string(),
            "model primed (loaded in 1200ms)"
        );
        assert_eq!(
            WarmupOutcome::Failed("boom".to_string()).to_string(),
            "warmup failed: boom"
        );
        assert!(WarmupOutcome::Failed(String::new()).is_failure());
        assert!(!WarmupOutcome::Skipped(String::new()).is_failure());
    }

    #[tokio::test]
    async fn test_first_existing_candidate_runs_with_server_address() {
        let config = WarmupConfig::default();
        let server = ServerConfig {
            port: 9090,
            ..Default::default()
        };
        let host = FakeHost::new(&["/opt/bin/warmup.sh"], succeed);
        let warmup = Warmup::new(
            &config,
            &server,
            candidates(&["/work/warmup.sh", "/opt/bin/warmup.sh"]),
        );

        let outcome = warmup.run(&host, &SilentApi).await;

        assert_eq!(outcome, WarmupOutcome::Script(PathBuf::from("/opt/bin/warmup.sh")));
        let ran = host.ran();
        assert_eq!(ran.len(), 1);
        assert_eq!(ran[0].to_string(), "sh /opt/bin/warmup.sh");
        assert_eq!(
            ran[0].env,
            vec![("OLLAMA_HOST".to_string(), "127.0.0.1:9090".to_string())]
        );
    }

    #[tokio::test]
    async fn test_script_spawn_error_is_tolerated() {
        let config = WarmupConfig::default();
        let server = ServerConfig::default();
        let host = FakeHost::new(&["/lab/warmup.sh"], |spec| {
            Err(PrepError::SpawnFailed {
                command: spec.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "sh not found"),
            })
        });

        let outcome = Warmup::new(&config, &server, candidates(&["/lab/warmup.sh"]))
            .run(&host, &SilentApi)
            .await;

        match outcome {
            WarmupOutcome::Failed(reason) => assert!(reason.contains("sh not found")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_script_killed_by_signal() {
        let config = WarmupConfig::default();
        let server = ServerConfig::default();
        let host = FakeHost::new(&["/lab/warmup.sh"], |_| Ok(CommandOutcome::default()));

        let outcome = Warmup::new(&config, &server, candidates(&["/lab/warmup.sh"]))
            .run(&host, &SilentApi)
            .await;

        assert_eq!(
            outcome,
            WarmupOutcome::Failed("/lab/warmup.sh was terminated by a signal".to_string())
        );
    }

    #[tokio::test]
    async fn test_script_non_zero_exit() {
        let config = WarmupConfig::default();
        let server = ServerConfig::default();
        let host = FakeHost::new(&["/lab/warmup.sh"], |_| Ok(CommandOutcome::with_status(4)));

        let outcome = Warmup::new(&config, &server, candidates(&["/lab/warmup.sh"]))
            .run(&host, &SilentApi)
            .await;

        assert_eq!(
            outcome,
            WarmupOutcome::Failed("/lab/warmup.sh exited with status 4".to_string())
        );
    }

    #[tokio::test]
    async fn test_no_script_and_no_builtin_skips() {
        let config = WarmupConfig {
            builtin: false,
            ..Default::default()
        };
        let server = ServerConfig::default();
        let host = FakeHost::new(&[], succeed);

        let outcome = Warmup::new(&config, &server, candidates(&["/lab/warmup.sh"]))
            .run(&host, &SilentApi)
            .await;

        assert!(matches!(outcome, WarmupOutcome::Skipped(_)));
        assert!(host.ran().is_empty());
    }

    #[tokio::test]
    async fn test_builtin_prime_failure_is_tolerated() {
        let config = WarmupConfig::default();
        let server = ServerConfig::default();
        let host = FakeHost::new(&[], succeed);

        let outcome = Warmup::new(&config, &server, Vec::new())
            .run(&host, &SilentApi)
            .await;

        assert!(outcome.is_failure());
    }
}
