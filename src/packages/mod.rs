//! Prerequisite installation
//!
//! Makes sure the compression utility the Ollama installer needs is on
//! PATH, installing it with whichever package manager the host has.

use crate::config::PackagesConfig;
use crate::errors::{PrepError, Result};
use crate::host::{CommandSpec, Host};
use std::fmt;

/// Package managers we know how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
    Pacman,
}

impl PackageManager {
    /// Probe order: first match wins
    pub const PRIORITY: [PackageManager; 4] = [
        PackageManager::Apt,
        PackageManager::Dnf,
        PackageManager::Yum,
        PackageManager::Pacman,
    ];

    /// Executable probed on PATH
    pub fn binary(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Pacman => "pacman",
        }
    }

    /// First supported manager present on the host
    pub fn detect(host: &dyn Host) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|manager| host.has_command(manager.binary()))
    }

    /// Commands that install `packages`, in execution order
    pub fn install_commands(&self, packages: &[String], privilege_command: &str) -> Vec<CommandSpec> {
        let commands = match self {
            PackageManager::Apt => vec![
                CommandSpec::new("apt-get").arg("update"),
                CommandSpec::new("apt-get").args(["install", "-y"]).args(packages.iter().cloned()),
            ],
            PackageManager::Dnf => vec![
                CommandSpec::new("dnf").args(["install", "-y"]).args(packages.iter().cloned()),
            ],
            PackageManager::Yum => vec![
                CommandSpec::new("yum").args(["install", "-y"]).args(packages.iter().cloned()),
            ],
            PackageManager::Pacman => vec![
                CommandSpec::new("pacman").args(["-Sy", "--noconfirm"]).args(packages.iter().cloned()),
            ],
        };

        commands
            .into_iter()
            .map(|cmd| cmd.elevated(privilege_command))
            .collect()
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageManager::Apt => "apt",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Pacman => "pacman",
        };
        f.write_str(name)
    }
}

/// What the dependency step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    AlreadyInstalled,
    Installed {
        manager: PackageManager,
        packages: Vec<String>,
    },
}

/// Installs the prerequisite utility when missing
pub struct DependencyInstaller<'a> {
    config: &'a PackagesConfig,
}

impl<'a> DependencyInstaller<'a> {
    pub fn new(config: &'a PackagesConfig) -> Self {
        Self { config }
    }

    /// Ensure the utility is available, installing it if needed
    pub async fn ensure(&self, host: &dyn Host) -> Result<InstallOutcome> {
        if host.has_command(&self.config.utility) {
            tracing::info!(utility = %self.config.utility, "already installed");
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        let manager = PackageManager::detect(host).ok_or_else(|| {
            PrepError::UnsupportedPackageManager {
                tried: PackageManager::PRIORITY
                    .iter()
                    .map(|m| m.binary())
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        })?;

        let packages = self.config.install_set();
        tracing::info!(%manager, ?packages, "installing prerequisites");

        for command in manager.install_commands(&packages, &self.config.privilege_command) {
            host.run(&command).await?.check(&command)?;
        }

        Ok(InstallOutcome::Installed { manager, packages })
    }
}
