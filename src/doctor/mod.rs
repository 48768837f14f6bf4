//! Doctor command - host readiness checks

use crate::config::Config;
use crate::errors::Result;
use crate::host::{Host, SystemHost};
use crate::models::{OllamaClient, ServerApi};
use crate::packages::PackageManager;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Free space below which model pulls are likely to fail
const MIN_DISK_GB: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

impl CheckStatus {
    fn symbol(&self) -> &str {
        match self {
            Self::Pass => "✓",
            Self::Warning => "⚠",
            Self::Fail => "✗",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub latency_ms: Option<u64>,
}

impl HealthCheck {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            latency_ms: None,
        }
    }

    fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn check(&self, name: &str) -> Option<&HealthCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn print(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║ ollamaprep Host Health Check                          ║");
        println!("╚═══════════════════════════════════════════════════════╝\n");

        for check in &self.checks {
            let latency = check.latency_ms
                .map(|ms| format!(" ({}ms)", ms))
                .unwrap_or_default();

            println!("  {} {:<20} {}{}",
                check.status.symbol(),
                format!("{}:", check.name),
                check.message,
                latency
            );
        }

        println!();

        if self.is_healthy() {
            println!("  ✓ Host can be bootstrapped - run: ollamaprep\n");
        } else {
            println!("  ✗ Some checks failed - fix them before running ollamaprep\n");
        }
    }
}

pub struct Doctor {
    config: Config,
    host: Arc<dyn Host>,
    api: Arc<dyn ServerApi>,
}

impl Doctor {
    pub fn new(config: Config) -> Result<Self> {
        let api = OllamaClient::new(Some(config.ollama_url()))?;
        Ok(Self::with_parts(config, Arc::new(SystemHost::new()), Arc::new(api)))
    }

    pub fn with_parts(config: Config, host: Arc<dyn Host>, api: Arc<dyn ServerApi>) -> Self {
        Self { config, host, api }
    }

    pub async fn run_checks(&self) -> Result<HealthReport> {
        let mut checks = vec![
            self.check_utility(),
            self.check_package_manager(),
            self.check_server_binary(),
        ];

        let api = self.check_server_api().await;
        let api_up = api.status == CheckStatus::Pass;
        checks.push(api);
        if api_up {
            checks.push(self.check_model().await);
        }

        checks.push(self.check_disk_space());
        checks.push(self.check_cpu());
        checks.push(self.check_network().await);

        Ok(HealthReport { checks })
    }

    pub fn check_utility(&self) -> HealthCheck {
        let utility = &self.config.packages.utility;
        if self.host.has_command(utility) {
            HealthCheck::new("Prerequisites", CheckStatus::Pass, format!("{} installed", utility))
        } else {
            HealthCheck::new(
                "Prerequisites",
                CheckStatus::Warning,
                format!("{} missing - will be installed", utility),
            )
        }
    }

    pub fn check_package_manager(&self) -> HealthCheck {
        match PackageManager::detect(self.host.as_ref()) {
            Some(manager) => {
                HealthCheck::new("Package Manager", CheckStatus::Pass, manager.to_string())
            }
            None if self.host.has_command(&self.config.packages.utility) => HealthCheck::new(
                "Package Manager",
                CheckStatus::Warning,
                "None supported (not needed, prerequisites present)",
            ),
            None => HealthCheck::new(
                "Package Manager",
                CheckStatus::Fail,
                "None of apt, dnf, yum, pacman found",
            ),
        }
    }

    pub fn check_server_binary(&self) -> HealthCheck {
        let binary = &self.config.server.binary;
        if self.host.has_command(binary) {
            HealthCheck::new("Ollama Binary", CheckStatus::Pass, format!("{} on PATH", binary))
        } else {
            HealthCheck::new(
                "Ollama Binary",
                CheckStatus::Warning,
                "Not installed - will be installed",
            )
        }
    }

    pub async fn check_server_api(&self) -> HealthCheck {
        let start = Instant::now();

        match self.api.version().await {
            Ok(version) => HealthCheck::new(
                "Ollama API",
                CheckStatus::Pass,
                format!("Running (v{})", version),
            )
            .with_latency(start.elapsed().as_millis() as u64),
            Err(_) => HealthCheck::new(
                "Ollama API",
                CheckStatus::Warning,
                "Not running - ollamaprep starts it during the run",
            ),
        }
    }

    pub async fn check_model(&self) -> HealthCheck {
        let model = &self.config.server.model;
        match self.api.list_models().await {
            Ok(models) if models.iter().any(|m| &m.name == model) => {
                HealthCheck::new("Model", CheckStatus::Pass, format!("{} available", model))
            }
            Ok(_) => HealthCheck::new(
                "Model",
                CheckStatus::Warning,
                format!("{} not pulled yet", model),
            ),
            Err(e) => HealthCheck::new("Model", CheckStatus::Warning, format!("Could not check: {}", e)),
        }
    }

    fn check_disk_space(&self) -> HealthCheck {
        use sysinfo::Disks;

        let disks = Disks::new_with_refreshed_list();
        let home = dirs::home_dir().unwrap_or_else(|| "/".into());

        // Longest mount point containing the home directory holds the model store.
        let disk = disks
            .iter()
            .filter(|disk| home.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len());

        match disk {
            Some(disk) => {
                let available_gb = disk.available_space() / 1_000_000_000;
                if available_gb >= MIN_DISK_GB {
                    HealthCheck::new(
                        "Disk Space",
                        CheckStatus::Pass,
                        format!("{} GB available", available_gb),
                    )
                } else {
                    HealthCheck::new(
                        "Disk Space",
                        CheckStatus::Warning,
                        format!("Low: {} GB (recommend {}GB+)", available_gb, MIN_DISK_GB),
                    )
                }
            }
            None => HealthCheck::new("Disk Space", CheckStatus::Warning, "Could not determine"),
        }
    }

    fn check_cpu(&self) -> HealthCheck {
        let cores = num_cpus::get();
        let status = if cores >= 2 { CheckStatus::Pass } else { CheckStatus::Warning };
        HealthCheck::new("CPU", status, format!("{} cores", cores))
    }

    async fn check_network(&self) -> HealthCheck {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
        {
            Ok(client) => client,
            Err(e) => return HealthCheck::new("Network", CheckStatus::Warning, e.to_string()),
        };

        let start = Instant::now();
        match client.head(&self.config.installer.url).send().await {
            Ok(response) if response.status().is_success() || response.status().is_redirection() => {
                HealthCheck::new("Network", CheckStatus::Pass, "Installer reachable")
                    .with_latency(start.elapsed().as_millis() as u64)
            }
            Ok(response) => HealthCheck::new(
                "Network",
                CheckStatus::Warning,
                format!("Installer returned {}", response.status()),
            ),
            Err(_) => HealthCheck::new(
                "Network",
                CheckStatus::Fail,
                "Offline - installer and model downloads need network access",
            ),
        }
    }
}
