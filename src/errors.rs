//! Error types for ollamaprep
//!
//! Every fatal condition of a bootstrap run maps to one variant here,
//! and each variant knows which process exit code it produces.

use thiserror::Error;

/// Exit code for a fully successful run
pub const EXIT_CODE_SUCCESS: i32 = 0;

/// Exit code for any fatal error without a more specific status
pub const EXIT_CODE_FAILURE: i32 = 1;

/// Exit code when the host cannot be prepared (no supported package manager)
pub const EXIT_CODE_SETUP_NEEDED: i32 = 2;

/// Exit code after Ctrl-C, as a shell reports SIGINT
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Main error type for bootstrap runs
#[derive(Error, Debug)]
pub enum PrepError {
    /// No supported package manager found on the host
    #[error("No supported package manager found (tried: {tried})")]
    UnsupportedPackageManager { tried: String },

    /// An external command exited unsuccessfully
    #[error("Command `{command}` failed with {}", describe_status(.status))]
    CommandFailed { command: String, status: Option<i32> },

    /// An external command could not be started at all
    #[error("Failed to start `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Downloading the server installer failed
    #[error("Failed to fetch installer from {url}: {reason}")]
    InstallerFetch { url: String, reason: String },

    /// Installer digest did not match the pinned checksum
    #[error("Installer checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Server process did not become ready in time
    #[error("Server not ready after {waited_ms}ms: {reason}")]
    ReadinessTimeout { waited_ms: u64, reason: String },

    /// Server process exited while we were waiting for it
    #[error("Server process {pid} exited before becoming ready")]
    ServerExited { pid: u32 },

    /// The run was interrupted (Ctrl-C) while the server was up
    #[error("Interrupted, server stopped")]
    Interrupted,

    /// Ollama API errors
    #[error("Ollama API error: {0}")]
    OllamaApiError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

/// Result type alias for bootstrap operations
pub type Result<T> = std::result::Result<T, PrepError>;

impl PrepError {
    /// Process exit code for this error
    ///
    /// Failed commands propagate their own status, like a shell in strict mode.
    pub fn exit_code(&self) -> i32 {
        match self {
            PrepError::UnsupportedPackageManager { .. } => EXIT_CODE_SETUP_NEEDED,
            PrepError::Interrupted => EXIT_CODE_INTERRUPTED,
            PrepError::CommandFailed {
                status: Some(code), ..
            } if *code != 0 => *code,
            _ => EXIT_CODE_FAILURE,
        }
    }

    /// Whether the error means the host itself is unsupported
    pub fn is_setup_needed(&self) -> bool {
        matches!(self, PrepError::UnsupportedPackageManager { .. })
    }
}

impl From<toml::de::Error> for PrepError {
    fn from(err: toml::de::Error) -> Self {
        PrepError::ConfigError(format!("Failed to parse config: {}", err))
    }
}

impl From<toml::ser::Error> for PrepError {
    fn from(err: toml::ser::Error) -> Self {
        PrepError::ConfigError(format!("Failed to serialize config: {}", err))
    }
}

/// Convert anyhow errors to PrepError
impl From<anyhow::Error> for PrepError {
    fn from(err: anyhow::Error) -> Self {
        PrepError::Generic(err.to_string())
    }
}
