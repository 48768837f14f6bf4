//! Ollama HTTP API client
//!
//! Used for readiness probing, warmup, the `models` subcommand and the
//! doctor. Pulling and listing during the bootstrap go through the
//! server's CLI instead.

use crate::errors::{PrepError, Result};
use crate::models::types::{
    GenerateRequest, GenerateResponse, ModelInfo, ModelsResponse, VersionResponse,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Default Ollama endpoint
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// The slice of the Ollama API the bootstrap depends on
#[async_trait]
pub trait ServerApi: Send + Sync {
    /// Whether the API answers at all
    async fn is_available(&self) -> bool;

    /// Server version string
    async fn version(&self) -> Result<String>;

    /// Installed models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// One non-streaming generation, used to load a model into memory
    async fn generate(&self, request: &GenerateRequest, timeout: Duration) -> Result<GenerateResponse>;
}

/// HTTP client for the Ollama API
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Base URL for Ollama API (default: http://127.0.0.1:11434)
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ServerApi for OllamaClient {
    async fn is_available(&self) -> bool {
        match self
            .client
            .get(self.url("/api/version"))
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn version(&self) -> Result<String> {
        let response = self.client.get(self.url("/api/version")).send().await?;

        if !response.status().is_success() {
            return Err(PrepError::OllamaApiError(format!(
                "API returned status: {}",
                response.status()
            )));
        }

        let version: VersionResponse = response.json().await?;
        Ok(version.version)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| PrepError::OllamaApiError(format!("Failed to connect to Ollama: {}", e)))?;

        if !response.status().is_success() {
            return Err(PrepError::OllamaApiError(format!(
                "API returned status: {}",
                response.status()
            )));
        }

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| PrepError::OllamaApiError(format!("Failed to parse response: {}", e)))?;

        Ok(models.models)
    }

    async fn generate(&self, request: &GenerateRequest, timeout: Duration) -> Result<GenerateResponse> {
        let response = self
            .client
            .post(self.url("/api/generate"))
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PrepError::OllamaApiError(format!(
                "generate returned {}: {}",
                status,
                body.trim()
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new(None).unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_client_custom_url() {
        let client = OllamaClient::new(Some("http://localhost:8080/".to_string())).unwrap();
        assert_eq!(client.url("/api/tags"), "http://localhost:8080/api/tags");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Port 9 (discard) is never an Ollama server.
        let client = OllamaClient::new(Some("http://127.0.0.1:9".to_string())).unwrap();
        assert!(!client.is_available().await);
        assert!(client.list_models().await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires Ollama running
    async fn test_version_integration() {
        let client = OllamaClient::new(None).unwrap();
        assert!(client.version().await.is_ok());
    }
}
