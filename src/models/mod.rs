//! Ollama model access
//!
//! - `ollama pull` / `ollama list` through the host ([`ModelCli`])
//! - The HTTP API for probing and priming ([`OllamaClient`])

pub mod cli;
pub mod client;
pub mod types;

pub use cli::ModelCli;
pub use client::{OllamaClient, ServerApi};
pub use types::{GenerateRequest, GenerateResponse, ListedModel, ModelInfo};
