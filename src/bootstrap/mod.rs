//! Bootstrap pipeline
//!
//! Runs the steps in a fixed order and stops at the first fatal error:
//! prerequisites, server install, launch, readiness, pull, list, warmup,
//! teardown. Warmup is the only step allowed to fail.

use crate::config::Config;
use crate::daemon::{ServerHandle, ServerLauncher};
use crate::display::Console;
use crate::errors::{PrepError, Result};
use crate::host::{Host, SystemHost};
use crate::installer::{HttpFetcher, ScriptFetcher, ServerInstall, ServerInstaller};
use crate::models::{ListedModel, ModelCli, OllamaClient, ServerApi};
use crate::packages::{DependencyInstaller, InstallOutcome};
use crate::readiness::{Readiness, ReadinessPoller};
use crate::warmup::{Warmup, WarmupOutcome};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::Instrument;
use uuid::Uuid;

/// Pipeline steps in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Dependencies,
    InstallServer,
    LaunchServer,
    WaitReady,
    PullModel,
    ListModels,
    Warmup,
    Teardown,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::Dependencies,
        Step::InstallServer,
        Step::LaunchServer,
        Step::WaitReady,
        Step::PullModel,
        Step::ListModels,
        Step::Warmup,
        Step::Teardown,
    ];

    /// 1-based position for the status line
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            Step::Dependencies => "Checking prerequisites",
            Step::InstallServer => "Installing Ollama",
            Step::LaunchServer => "Starting Ollama server",
            Step::WaitReady => "Waiting for server",
            Step::PullModel => "Pulling model",
            Step::ListModels => "Listing models",
            Step::Warmup => "Warming up model",
            Step::Teardown => "Stopping server",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Timing and result of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub duration_ms: u64,
    pub succeeded: bool,
}

/// How the run left the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Terminated(u32),
    LeftRunning(u32),
}

/// Everything a finished run did
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub model: String,
    pub dependency: InstallOutcome,
    pub install: ServerInstall,
    pub readiness: Readiness,
    pub models: Vec<ListedModel>,
    pub warmup: WarmupOutcome,
    pub server: ServerState,
    pub steps: Vec<StepRecord>,
}

impl BootstrapReport {
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.steps.iter().map(|s| s.duration_ms).sum())
    }

    /// Whether the pulled model shows up in the listing
    pub fn model_listed(&self) -> bool {
        self.models.iter().any(|m| m.name == self.model)
    }
}

/// Results of the steps that need a live server
struct Served {
    readiness: Readiness,
    models: Vec<ListedModel>,
    warmup: WarmupOutcome,
}

/// The bootstrap pipeline
pub struct Bootstrap {
    config: Config,
    host: Arc<dyn Host>,
    fetcher: Arc<dyn ScriptFetcher>,
    api: Arc<dyn ServerApi>,
    console: Console,
    interrupt: Arc<Notify>,
}

impl Bootstrap {
    /// Pipeline against the real machine
    pub fn new(config: Config, console: Console) -> Result<Self> {
        let fetcher = HttpFetcher::new(Duration::from_secs(config.installer.fetch_timeout_secs))?;
        let api = OllamaClient::new(Some(config.ollama_url()))?;

        Ok(Self::with_parts(
            config,
            Arc::new(SystemHost::new()),
            Arc::new(fetcher),
            Arc::new(api),
            console,
        ))
    }

    /// Pipeline with explicit collaborators
    pub fn with_parts(
        config: Config,
        host: Arc<dyn Host>,
        fetcher: Arc<dyn ScriptFetcher>,
        api: Arc<dyn ServerApi>,
        console: Console,
    ) -> Self {
        Self {
            config,
            host,
            fetcher,
            api,
            console,
            interrupt: Arc::new(Notify::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Notifying this stops the run like Ctrl-C does
    pub fn interrupt_handle(&self) -> Arc<Notify> {
        self.interrupt.clone()
    }

    /// Run every step in order
    pub async fn run(&self) -> Result<BootstrapReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("bootstrap", %run_id, model = %self.config.server.model);
        self.run_steps(run_id).instrument(span).await
    }

    async fn run_steps(&self, run_id: Uuid) -> Result<BootstrapReport> {
        let started_at = Utc::now();
        let mut steps = Vec::with_capacity(Step::ALL.len());
        let host = self.host.as_ref();

        let packages = DependencyInstaller::new(&self.config.packages);
        let dependency = self
            .timed(&mut steps, Step::Dependencies, packages.ensure(host))
            .await?;
        match &dependency {
            InstallOutcome::AlreadyInstalled => self
                .console
                .success(&format!("{} already installed", self.config.packages.utility)),
            InstallOutcome::Installed { manager, packages } => self
                .console
                .success(&format!("Installed {} with {}", packages.join(" "), manager)),
        }

        let installer = ServerInstaller::new(&self.config.installer, &self.config.server.binary);
        let install = self
            .timed(
                &mut steps,
                Step::InstallServer,
                installer.install(host, self.fetcher.as_ref()),
            )
            .await?;
        match &install {
            ServerInstall::Skipped => self.console.success("Ollama already installed"),
            ServerInstall::Installed { verified: true, .. } => {
                self.console.success("Ollama installed (checksum verified)")
            }
            ServerInstall::Installed { sha256, verified: false } => {
                self.console.success("Ollama installed");
                self.console
                    .warning(&format!("Installer was not checksum-pinned (sha256 {})", sha256));
            }
        }

        let launcher = ServerLauncher::new(&self.config.server, self.config.server_log_path());
        let mut handle = self
            .timed(&mut steps, Step::LaunchServer, launcher.launch(host))
            .await?;
        let pid = handle.pid();
        self.console.success(&format!("Server started (pid {})", pid));

        // The server sits in its own process group, so Ctrl-C only reaches us.
        let served = tokio::select! {
            biased;
            _ = self.interrupted() => {
                tracing::warn!(pid, "interrupted, stopping server");
                Err(PrepError::Interrupted)
            }
            served = self.with_server(&mut handle, &mut steps) => served,
        };

        let served = match served {
            Ok(served) => served,
            Err(e) => {
                self.stop_after_failure(handle).await;
                return Err(e);
            }
        };

        self.console.step(Step::Teardown.number(), Step::ALL.len(), Step::Teardown.label());
        let start = Instant::now();
        let server = if self.config.server.keep_running {
            let pid = handle.detach();
            Self::record(&mut steps, Step::Teardown, start, true);
            self.console
                .info(&format!("Leaving server running (pid {})", pid));
            ServerState::LeftRunning(pid)
        } else {
            let result = handle.terminate().await;
            Self::record(&mut steps, Step::Teardown, start, result.is_ok());
            let pid = result?;
            self.console
                .success(&format!("Server stopped (pid {})", pid));
            ServerState::Terminated(pid)
        };

        Ok(BootstrapReport {
            run_id,
            started_at,
            model: self.config.server.model.clone(),
            dependency,
            install,
            readiness: served.readiness,
            models: served.models,
            warmup: served.warmup,
            server,
            steps,
        })
    }

    /// Steps that talk to the running server
    async fn with_server(&self, handle: &mut ServerHandle, steps: &mut Vec<StepRecord>) -> Result<Served> {
        let host = self.host.as_ref();
        let model = self.config.server.model.as_str();

        let poller = ReadinessPoller::from_config(&self.config.readiness);
        let spinner = self.console.spinner("Waiting for the server to come up");
        let readiness = self
            .timed(
                steps,
                Step::WaitReady,
                poller.wait_ready(host, handle, self.api.as_ref()),
            )
            .await;
        spinner.finish_and_clear();
        let readiness = readiness?;
        self.console.success(&format!(
            "Server ready after {}ms ({} polls)",
            readiness.waited.as_millis(),
            readiness.polls
        ));

        let cli = ModelCli::new(&self.config.server);
        self.timed(steps, Step::PullModel, cli.pull(host, model)).await?;
        self.console.success(&format!("Pulled {}", model));

        let (models, table) = self.timed(steps, Step::ListModels, cli.list(host)).await?;
        for line in table.lines().filter(|l| !l.trim().is_empty()) {
            self.console.info(line);
        }

        self.console.step(Step::Warmup.number(), Step::ALL.len(), Step::Warmup.label());
        let start = Instant::now();
        let warmup = Warmup::new(
            &self.config.warmup,
            &self.config.server,
            self.config.warmup_script_candidates(),
        )
        .run(host, self.api.as_ref())
        .await;
        Self::record(steps, Step::Warmup, start, !warmup.is_failure());
        match &warmup {
            WarmupOutcome::Failed(_) => self.console.warning(&warmup.to_string()),
            WarmupOutcome::Skipped(_) => self.console.info(&warmup.to_string()),
            _ => self.console.success(&warmup.to_string()),
        }

        Ok(Served {
            readiness,
            models,
            warmup,
        })
    }

    /// Resolves on Ctrl-C or when the interrupt handle is notified
    async fn interrupted(&self) {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                    self.interrupt.notified().await;
                }
            }
            _ = self.interrupt.notified() => {}
        }
    }

    async fn stop_after_failure(&self, handle: ServerHandle) {
        let pid = handle.pid();
        match handle.terminate().await {
            Ok(_) => self
                .console
                .detail(&format!("Stopped server (pid {}) after failure", pid)),
            Err(e) => {
                tracing::warn!(pid, error = %e, "could not stop server after failure");
                self.console
                    .warning(&format!("Server pid {} may still be running: {}", pid, e));
            }
        }
    }

    /// Announce, run and record a fatal step
    async fn timed<T, F>(&self, steps: &mut Vec<StepRecord>, step: Step, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        self.console.step(step.number(), Step::ALL.len(), step.label());
        let start = Instant::now();
        let result = fut.await;
        Self::record(steps, step, start, result.is_ok());

        if let Err(e) = &result {
            tracing::error!(step = %step, error = %e, "step failed");
        }
        result
    }

    fn record(steps: &mut Vec<StepRecord>, step: Step, start: Instant, succeeded: bool) {
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(step = %step, duration_ms, succeeded, "step finished");
        steps.push(StepRecord {
            step,
            duration_ms,
            succeeded,
        });
    }
}
