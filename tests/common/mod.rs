//! Shared fakes for driving the bootstrap without touching the machine

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use ollamaprep::config::Config;
use ollamaprep::errors::{PrepError, Result};
use ollamaprep::host::{CommandOutcome, CommandSpec, Host, ServerProcess};
use ollamaprep::installer::ScriptFetcher;
use ollamaprep::models::{GenerateRequest, GenerateResponse, ModelInfo, ServerApi};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SERVER_PID: u32 = 4242;
pub const WARMUP_SCRIPT: &str = "/lab/warmup.sh";
pub const INSTALL_SCRIPT: &[u8] = b"#!/bin/sh\necho installing ollama\n";

pub const LIST_OUTPUT: &str = "\
NAME                    ID              SIZE      MODIFIED
qwen2.5-coder:1.5b      6d3abb8d2d53    986 MB    2 seconds ago
";

/// Config tuned for fast tests
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.readiness.poll_interval_ms = 5;
    config.readiness.timeout_secs = 1;
    config.readiness.settle_secs = 0;
    config.warmup.script = Some(WARMUP_SCRIPT.to_string());
    config.display.show_spinner = false;
    config
}

/// Host that records every command and simulates one server process
pub struct MockHost {
    commands: HashSet<String>,
    files: HashSet<PathBuf>,
    failures: Vec<(String, i32)>,
    hangs: Vec<String>,
    list_output: String,
    specs: Mutex<Vec<CommandSpec>>,
    log: Arc<Mutex<Vec<String>>>,
    stdin: Mutex<Vec<Bytes>>,
    server_alive: Arc<AtomicBool>,
    server_appears: bool,
    server_crashes: bool,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            commands: HashSet::new(),
            files: HashSet::new(),
            failures: Vec::new(),
            hangs: Vec::new(),
            list_output: LIST_OUTPUT.to_string(),
            specs: Mutex::new(Vec::new()),
            log: Arc::new(Mutex::new(Vec::new())),
            stdin: Mutex::new(Vec::new()),
            server_alive: Arc::new(AtomicBool::new(false)),
            server_appears: true,
            server_crashes: false,
        }
    }

    /// Host with the utility and a warmup script already in place
    pub fn prepared() -> Self {
        Self::new()
            .with_commands(&["zstd", "apt-get"])
            .with_file(WARMUP_SCRIPT)
    }

    pub fn with_commands(mut self, commands: &[&str]) -> Self {
        self.commands.extend(commands.iter().map(|c| c.to_string()));
        self
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.files.insert(PathBuf::from(path));
        self
    }

    /// Commands whose display starts with `prefix` exit with `status`
    pub fn failing(mut self, prefix: &str, status: i32) -> Self {
        self.failures.push((prefix.to_string(), status));
        self
    }

    /// Commands whose display starts with `prefix` never finish
    pub fn hanging(mut self, prefix: &str) -> Self {
        self.hangs.push(prefix.to_string());
        self
    }

    /// Spawned server exits straight away
    pub fn server_crashes(mut self) -> Self {
        self.server_crashes = true;
        self
    }

    /// Spawned server never shows up in the process table
    pub fn server_never_appears(mut self) -> Self {
        self.server_appears = false;
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// First recorded command (run or spawn) whose display starts with `prefix`
    pub fn spec(&self, prefix: &str) -> Option<CommandSpec> {
        self.specs
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.to_string().starts_with(prefix))
            .cloned()
    }

    pub fn stdin_payloads(&self) -> Vec<Bytes> {
        self.stdin.lock().unwrap().clone()
    }

    pub fn server_alive(&self) -> bool {
        self.server_alive.load(Ordering::SeqCst)
    }

    /// Position of the first log entry equal to `entry`
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.log().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.log().iter().filter(|e| *e == entry).count()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Host for MockHost {
    fn has_command(&self, program: &str) -> bool {
        self.commands.contains(program)
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome> {
        let display = spec.to_string();
        self.push(format!("run: {}", display));
        self.specs.lock().unwrap().push(spec.clone());
        if let Some(input) = &spec.stdin {
            self.stdin.lock().unwrap().push(input.clone());
        }

        if self.hangs.iter().any(|p| display.starts_with(p.as_str())) {
            std::future::pending::<()>().await;
        }

        if let Some((_, status)) = self.failures.iter().find(|(p, _)| display.starts_with(p.as_str())) {
            return Ok(CommandOutcome::with_status(*status));
        }

        let mut outcome = CommandOutcome::success();
        if spec.args.first().map(String::as_str) == Some("list") {
            outcome.stdout = self.list_output.clone();
        }
        Ok(outcome)
    }

    async fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn ServerProcess>> {
        self.push(format!("spawn: {}", spec));
        self.specs.lock().unwrap().push(spec.clone());
        self.server_alive
            .store(self.server_appears && !self.server_crashes, Ordering::SeqCst);
        Ok(Box::new(MockProcess {
            alive: self.server_alive.clone(),
            exited: self.server_crashes,
            log: self.log.clone(),
        }))
    }

    fn is_process_running(&self, pid: u32) -> bool {
        pid == SERVER_PID && self.server_alive.load(Ordering::SeqCst)
    }
}

struct MockProcess {
    alive: Arc<AtomicBool>,
    exited: bool,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ServerProcess for MockProcess {
    fn id(&self) -> u32 {
        SERVER_PID
    }

    fn has_exited(&mut self) -> Result<bool> {
        Ok(self.exited)
    }

    async fn terminate(&mut self) -> Result<()> {
        self.exited = true;
        self.log.lock().unwrap().push(format!("kill: {}", SERVER_PID));
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Ollama API double
pub struct MockApi {
    available: bool,
    generate_ok: bool,
    pub generate_calls: AtomicU32,
}

impl MockApi {
    pub fn up() -> Self {
        Self {
            available: true,
            generate_ok: true,
            generate_calls: AtomicU32::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            available: false,
            ..Self::up()
        }
    }

    pub fn failing_generate(mut self) -> Self {
        self.generate_ok = false;
        self
    }

    pub fn generate_count(&self) -> u32 {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServerApi for MockApi {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn version(&self) -> Result<String> {
        if self.available {
            Ok("0.5.7".to_string())
        } else {
            Err(PrepError::OllamaApiError("connection refused".to_string()))
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }

    async fn generate(&self, _request: &GenerateRequest, _timeout: Duration) -> Result<GenerateResponse> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.generate_ok {
            Ok(serde_json::from_str(r#"{"response": "Hello!", "done": true, "load_duration": 1500000000}"#)?)
        } else {
            Err(PrepError::OllamaApiError("model failed to load".to_string()))
        }
    }
}

/// Installer source double
pub struct MockFetcher {
    script: Option<Bytes>,
    pub fetches: AtomicU32,
}

impl MockFetcher {
    pub fn serving(script: &'static [u8]) -> Self {
        Self {
            script: Some(Bytes::from_static(script)),
            fetches: AtomicU32::new(0),
        }
    }

    pub fn offline() -> Self {
        Self {
            script: None,
            fetches: AtomicU32::new(0),
        }
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.script.clone().ok_or_else(|| PrepError::InstallerFetch {
            url: url.to_string(),
            reason: "network unreachable".to_string(),
        })
    }
}
