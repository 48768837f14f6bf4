//! Ollama server installation
//!
//! Downloads the upstream install script, checks it against a pinned
//! SHA-256 when one is configured, and pipes it to `sh -s`.

use crate::config::InstallerConfig;
use crate::errors::{PrepError, Result};
use crate::host::{CommandSpec, Host};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Installer scripts are small; anything bigger is not what we asked for
const MAX_SCRIPT_BYTES: usize = 4 * 1024 * 1024;

/// Source of the installer script
#[async_trait]
pub trait ScriptFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Fetches scripts over HTTPS
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .https_only(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ScriptFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let fetch_error = |reason: String| PrepError::InstallerFetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| fetch_error(e.to_string()))?;
            if body.len() + chunk.len() > MAX_SCRIPT_BYTES {
                return Err(fetch_error(format!(
                    "script larger than {} bytes",
                    MAX_SCRIPT_BYTES
                )));
            }
            body.extend_from_slice(&chunk);
        }

        if body.is_empty() {
            return Err(fetch_error("empty response body".to_string()));
        }

        Ok(body.freeze())
    }
}

/// Hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Check `script` against the pinned digest, if any
pub fn verify_checksum(script: &[u8], expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let actual = sha256_hex(script);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(PrepError::ChecksumMismatch {
            expected: expected.trim().to_lowercase(),
            actual,
        })
    }
}

/// What the install step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerInstall {
    /// Binary already on PATH and reinstall was not requested
    Skipped,
    Installed {
        sha256: String,
        verified: bool,
    },
}

/// Installs the Ollama server binary
pub struct ServerInstaller<'a> {
    config: &'a InstallerConfig,
    binary: &'a str,
}

impl<'a> ServerInstaller<'a> {
    pub fn new(config: &'a InstallerConfig, binary: &'a str) -> Self {
        Self { config, binary }
    }

    /// Command that executes a downloaded script
    pub fn install_command(&self, script: Bytes) -> CommandSpec {
        let mut command = CommandSpec::new("sh").arg("-s").stdin(script);
        if let Some(version) = &self.config.version {
            command = command.env("OLLAMA_VERSION", version.as_str());
        }
        command
    }

    /// Fetch, verify and run the installer
    pub async fn install(&self, host: &dyn Host, fetcher: &dyn ScriptFetcher) -> Result<ServerInstall> {
        if self.config.skip_if_installed && host.has_command(self.binary) {
            tracing::info!(binary = %self.binary, "server already installed, skipping installer");
            return Ok(ServerInstall::Skipped);
        }

        let script = fetcher.fetch(&self.config.url).await?;
        let sha256 = sha256_hex(&script);

        let verified = self.config.sha256.is_some();
        if verified {
            verify_checksum(&script, self.config.sha256.as_deref())?;
            tracing::info!(%sha256, "installer checksum verified");
        } else {
            tracing::warn!(
                url = %self.config.url,
                %sha256,
                "running installer without a pinned checksum"
            );
        }

        let command = self.install_command(script);
        host.run(&command).await?.check(&command)?;

        Ok(ServerInstall::Installed { sha256, verified })
    }
}
