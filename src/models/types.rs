//! Type definitions for the Ollama API and `ollama list` output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Information about an installed Ollama model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name (e.g., "llama3.1:8b")
    pub name: String,

    /// Model size in bytes
    pub size: u64,

    /// Last modification time
    pub modified_at: DateTime<Utc>,

    /// Model digest/hash
    pub digest: String,

    /// Model details (optional, from API)
    #[serde(default)]
    pub details: Option<ModelDetails>,
}

/// Detailed model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub family: Option<String>,

    /// Parameter size (e.g., "7B", "13B")
    #[serde(default)]
    pub parameter_size: Option<String>,

    /// Quantization level (e.g., "Q4_0", "Q4_K_M")
    #[serde(default)]
    pub quantization_level: Option<String>,
}

/// Response from Ollama /api/tags endpoint
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// Response from Ollama /api/version endpoint
#[derive(Debug, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Body of a non-streaming /api/generate request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub keep_alive: String,
}

/// Final /api/generate response
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,

    #[serde(default)]
    pub done: bool,

    /// Nanoseconds spent loading the model
    #[serde(default)]
    pub load_duration: Option<u64>,

    /// Nanoseconds for the whole request
    #[serde(default)]
    pub total_duration: Option<u64>,
}

impl GenerateResponse {
    pub fn load_ms(&self) -> Option<u64> {
        self.load_duration.map(|ns| ns / 1_000_000)
    }
}

/// One row of `ollama list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedModel {
    pub name: String,
    pub id: String,
    pub size: String,
}

impl ListedModel {
    /// Parse `ollama list` table output, skipping the header row
    pub fn parse_table(output: &str) -> Vec<ListedModel> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| !line.trim_start().starts_with("NAME"))
            .filter_map(|line| {
                let mut columns = line.split_whitespace();
                let name = columns.next()?.to_string();
                let id = columns.next().unwrap_or_default().to_string();
                let size = match (columns.next(), columns.next()) {
                    (Some(amount), Some(unit)) => format!("{} {}", amount, unit),
                    (Some(amount), None) => amount.to_string(),
                    _ => String::new(),
                };
                Some(ListedModel { name, id, size })
            })
            .collect()
    }
}

impl ModelInfo {
    /// Format the model size in human-readable format
    pub fn formatted_size(&self) -> String {
        format_size(self.size)
    }

    /// Get a short description of the model
    pub fn description(&self) -> String {
        if let Some(ref details) = self.details {
            let parts: Vec<String> = [&details.parameter_size, &details.quantization_level]
                .into_iter()
                .flatten()
                .cloned()
                .collect();

            if !parts.is_empty() {
                return parts.join(" ");
            }
        }

        self.formatted_size()
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.description())
    }
}

/// Format bytes into human-readable size
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base: f64 = 1024.0;
    let exponent = (bytes as f64).log(base).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let size = bytes as f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1073741824), "1.00 GB");
    }

    #[test]
    fn test_parse_list_table() {
        let output = "\
NAME                    ID              SIZE      MODIFIED
qwen2.5-coder:1.5b      6d3abb8d2d53    986 MB    2 seconds ago
llama3.2:1b             baf6a787fdff    1.3 GB    3 days ago
";
        let models = ListedModel::parse_table(output);
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "qwen2.5-coder:1.5b");
        assert_eq!(models[0].id, "6d3abb8d2d53");
        assert_eq!(models[0].size, "986 MB");
        assert_eq!(models[1].name, "llama3.2:1b");
    }

    #[test]
    fn test_parse_empty_list() {
        let output = "NAME    ID    SIZE    MODIFIED\n";
        assert!(ListedModel::parse_table(output).is_empty());
        assert!(ListedModel::parse_table("").is_empty());
    }

    #[test]
    fn test_model_info_from_tags_json() {
        let json = r#"{
            "models": [{
                "name": "qwen2.5-coder:1.5b",
                "size": 986061892,
                "modified_at": "2024-11-12T10:00:00Z",
                "digest": "6d3abb8d2d53",
                "details": {"parameter_size": "1.5B", "quantization_level": "Q4_K_M"}
            }]
        }"#;
        let response: ModelsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.models.len(), 1);
        assert_eq!(response.models[0].description(), "1.5B Q4_K_M");
        assert_eq!(response.models[0].to_string(), "qwen2.5-coder:1.5b (1.5B Q4_K_M)");
    }

    #[test]
    fn test_generate_response_load_ms() {
        let json = r#"{"response": "Hello!", "done": true, "load_duration": 2500000000}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert!(response.done);
        assert_eq!(response.load_ms(), Some(2500));
    }
}
