//! Server readiness polling
//!
//! Bounded poll on the captured pid (and optionally the HTTP API),
//! followed by a fixed settle delay before the first real request.

use crate::config::ReadinessConfig;
use crate::daemon::ServerHandle;
use crate::errors::{PrepError, Result};
use crate::host::Host;
use crate::models::ServerApi;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// How the wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    /// Time until the server looked ready, settle excluded
    pub waited: Duration,
    pub polls: u32,
    pub api_checked: bool,
}

/// Waits for a freshly spawned server
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    interval: Duration,
    timeout: Duration,
    settle: Duration,
    require_api: bool,
}

impl ReadinessPoller {
    pub fn new(interval: Duration, timeout: Duration, settle: Duration, require_api: bool) -> Self {
        Self {
            interval,
            timeout,
            settle,
            require_api,
        }
    }

    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self::new(
            config.poll_interval(),
            config.timeout(),
            config.settle(),
            config.require_api,
        )
    }

    /// Block until the server's pid is in the process table (and the API
    /// answers, when required), then sleep the settle delay. A server that
    /// has already exited fails the wait at the next poll.
    pub async fn wait_ready(
        &self,
        host: &dyn Host,
        server: &mut ServerHandle,
        api: &dyn ServerApi,
    ) -> Result<Readiness> {
        let pid = server.pid();
        let start = Instant::now();
        let mut polls = 0u32;
        let mut observed = false;

        loop {
            polls += 1;

            if server.has_exited()? {
                tracing::warn!(pid, polls, "server exited during startup");
                return Err(PrepError::ServerExited { pid });
            }

            if host.is_process_running(pid) {
                if !observed {
                    tracing::debug!(pid, polls, "server process observed");
                    observed = true;
                }
                if !self.require_api || api.is_available().await {
                    break;
                }
            } else if observed {
                return Err(PrepError::ServerExited { pid });
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                let reason = if observed {
                    "process running but API not answering"
                } else {
                    "process never observed in the process table"
                };
                return Err(PrepError::ReadinessTimeout {
                    waited_ms: elapsed.as_millis() as u64,
                    reason: reason.to_string(),
                });
            }

            sleep(self.interval.min(self.timeout - elapsed)).await;
        }

        let waited = start.elapsed();
        tracing::info!(pid, polls, waited_ms = waited.as_millis() as u64, "server ready");

        if !self.settle.is_zero() {
            tracing::debug!(settle_ms = self.settle.as_millis() as u64, "settling");
            sleep(self.settle).await;
        }

        Ok(Readiness {
            waited,
            polls,
            api_checked: self.require_api,
        })
    }
}
