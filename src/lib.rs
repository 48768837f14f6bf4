//! ollamaprep - workshop host bootstrap for local Ollama models
//!
//! Installs the prerequisites and the Ollama server, starts the server,
//! pulls the lab model, warms it up and stops the server again.
//!
//! # Architecture
//!
//! - [`host`]: every side effect on the machine, behind the `Host` trait
//! - [`packages`], [`installer`], [`daemon`], [`readiness`], [`models`],
//!   [`warmup`]: one module per pipeline step
//! - [`bootstrap`]: runs the steps in order
//! - [`doctor`]: read-only health checks

pub mod errors;

// Re-export commonly used types
pub use errors::{PrepError, Result};

pub mod cli;
pub mod config;
pub mod display;
pub mod logging;

pub mod host;
pub mod packages;
pub mod installer;
pub mod daemon;
pub mod readiness;
pub mod models;
pub mod warmup;

pub mod bootstrap;
pub mod doctor;

pub use bootstrap::{Bootstrap, BootstrapReport};
pub use config::Config;
pub use display::Console;
