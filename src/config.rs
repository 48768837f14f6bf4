//! Configuration management for ollamaprep
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.ollamaprep/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::errors::{PrepError, Result};

/// Model pulled when nothing else is configured
pub const DEFAULT_MODEL: &str = "qwen2.5-coder:1.5b";

/// Upstream installer script
pub const DEFAULT_INSTALLER_URL: &str = "https://ollama.com/install.sh";

/// Complete configuration for ollamaprep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub packages: PackagesConfig,
    pub installer: InstallerConfig,
    pub readiness: ReadinessConfig,
    pub warmup: WarmupConfig,
    pub display: DisplayConfig,
}

/// Ollama server process and connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub binary: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    /// Leave the server running after the run instead of stopping it
    pub keep_running: bool,
    /// Where `ollama serve` output goes; discarded when unset
    pub log_file: Option<String>,
}

/// Prerequisite package configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Command that must resolve on PATH
    pub utility: String,
    /// Installed alongside the utility
    pub extras: Vec<String>,
    /// Prefix for install commands; empty runs them unprivileged
    pub privilege_command: String,
}

/// Server installer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub url: String,
    /// Pinned SHA-256 of the installer script (hex)
    pub sha256: Option<String>,
    /// Passed to the installer as OLLAMA_VERSION
    pub version: Option<String>,
    pub skip_if_installed: bool,
    pub fetch_timeout_secs: u64,
}

/// Readiness polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
    pub settle_secs: u64,
    pub require_api: bool,
}

/// Warmup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    pub enabled: bool,
    /// External warmup script; a relative path is looked up in the working
    /// directory, then next to the executable
    pub script: Option<String>,
    /// Send a priming request when no script is found
    pub builtin: bool,
    pub prompt: String,
    pub keep_alive: String,
    pub timeout_secs: u64,
}

/// Terminal output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub default_verbosity: String,
    pub show_spinner: bool,
    pub color_output: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary: "ollama".to_string(),
            host: "127.0.0.1".to_string(),
            port: 11434,
            model: DEFAULT_MODEL.to_string(),
            keep_running: false,
            log_file: None,
        }
    }
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            utility: "zstd".to_string(),
            extras: vec!["curl".to_string(), "ca-certificates".to_string()],
            privilege_command: "sudo".to_string(),
        }
    }
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_INSTALLER_URL.to_string(),
            sha256: None,
            version: None,
            skip_if_installed: false,
            fetch_timeout_secs: 60,
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            timeout_secs: 120,
            settle_secs: 5,
            require_api: true,
        }
    }
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            script: Some("warmup.sh".to_string()),
            builtin: true,
            prompt: "Say hello in one short sentence.".to_string(),
            keep_alive: "30m".to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
            show_spinner: true,
            color_output: true,
        }
    }
}

impl ServerConfig {
    /// `host:port` the server listens on, as `OLLAMA_HOST` expects it
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ReadinessConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

impl PackagesConfig {
    /// Utility followed by the extras, in install order
    pub fn install_set(&self) -> Vec<String> {
        let mut packages = Vec::with_capacity(self.extras.len() + 1);
        packages.push(self.utility.clone());
        packages.extend(self.extras.iter().cloned());
        packages
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PrepError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ollamaprep").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.binary.trim().is_empty() {
            return Err(PrepError::ConfigError(
                "server.binary must not be empty".to_string()
            ));
        }

        if self.server.model.trim().is_empty() {
            return Err(PrepError::ConfigError(
                "server.model must not be empty".to_string()
            ));
        }

        if self.server.port == 0 {
            return Err(PrepError::ConfigError(
                "server.port must be greater than 0".to_string()
            ));
        }

        if self.packages.utility.trim().is_empty() {
            return Err(PrepError::ConfigError(
                "packages.utility must not be empty".to_string()
            ));
        }

        if !self.installer.url.starts_with("https://") {
            return Err(PrepError::ConfigError(format!(
                "installer.url must use https: {}",
                self.installer.url
            )));
        }

        if let Some(digest) = &self.installer.sha256 {
            let valid = digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit());
            if !valid {
                return Err(PrepError::ConfigError(
                    "installer.sha256 must be 64 hex characters".to_string()
                ));
            }
        }

        if self.readiness.poll_interval_ms == 0 {
            return Err(PrepError::ConfigError(
                "readiness.poll_interval_ms must be greater than 0".to_string()
            ));
        }

        if self.readiness.timeout_secs == 0 {
            return Err(PrepError::ConfigError(
                "readiness.timeout_secs must be greater than 0".to_string()
            ));
        }

        if self.readiness.poll_interval() > self.readiness.timeout() {
            return Err(PrepError::ConfigError(
                "readiness.poll_interval_ms must not exceed readiness.timeout_secs".to_string()
            ));
        }

        match self.display.default_verbosity.as_str() {
            "quiet" | "normal" | "verbose" | "very_verbose" => {}
            _ => return Err(PrepError::ConfigError(
                format!("Invalid verbosity level: {}", self.display.default_verbosity)
            )),
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PrepError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| PrepError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.server.host, self.server.port)
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Server log file, if configured
    pub fn server_log_path(&self) -> Option<PathBuf> {
        self.server.log_file.as_deref().map(Self::expand_path)
    }

    /// Places to look for the warmup script, in lookup order
    ///
    /// Absolute paths are used as is. A relative path is tried in the
    /// working directory first, then next to the executable.
    pub fn warmup_script_candidates(&self) -> Vec<PathBuf> {
        let Some(script) = self.warmup.script.as_deref() else {
            return Vec::new();
        };
        let script = Self::expand_path(script);
        if script.is_absolute() {
            return vec![script];
        }

        let mut candidates = Vec::with_capacity(2);
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(&script));
        }
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            let beside_exe = dir.join(&script);
            if !candidates.contains(&beside_exe) {
                candidates.push(beside_exe);
            }
        }
        if candidates.is_empty() {
            candidates.push(script);
        }
        candidates
    }
}
