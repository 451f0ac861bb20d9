//! Bounded execution context for blocking bucket probes.
//!
//! A [`ProbePool`] is acquired once per process and shared by every
//! provisioning attempt. Probes run as tracked tasks on the pool rather than
//! on the caller's task, and a semaphore bounds how many run at once.
//!
//! Dropping the future returned by [`ProbePool::run`] cancels the probe task,
//! which drops the probe future together with any connection it holds.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{BucketLocation, Credentials};
use crate::probe::{BucketProbe, ProbeOutcome};

/// Tracing target for the probe pool.
pub const TRACING_TARGET: &str = "nvisy_destination::pool";

/// Default maximum number of probes running at once.
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 16;

/// Default probe timeout: 30 seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// Detail reported for probes submitted to, or interrupted by, a shut down pool.
pub const POOL_SHUT_DOWN: &str = "probe pool is shut down";

/// Configuration for the probe pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ProbePoolConfig {
    /// Maximum number of probes running at once
    #[cfg_attr(
        feature = "config",
        arg(
            long = "probe-max-concurrent",
            env = "PROBE_MAX_CONCURRENT",
            default_value_t = DEFAULT_MAX_CONCURRENT_PROBES
        )
    )]
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,

    /// Probe timeout in seconds (0 disables the timeout)
    #[cfg_attr(
        feature = "config",
        arg(long = "probe-timeout", env = "PROBE_TIMEOUT_SECS")
    )]
    #[serde(default)]
    pub probe_timeout_secs: Option<u64>,
}

fn default_max_concurrent_probes() -> usize {
    DEFAULT_MAX_CONCURRENT_PROBES
}

impl Default for ProbePoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
            probe_timeout_secs: None,
        }
    }
}

impl ProbePoolConfig {
    /// Set the maximum number of probes running at once.
    #[must_use]
    pub fn with_max_concurrent_probes(mut self, max: usize) -> Self {
        self.max_concurrent_probes = max;
        self
    }

    /// Set the probe timeout in seconds (0 disables the timeout).
    #[must_use]
    pub fn with_probe_timeout_secs(mut self, secs: u64) -> Self {
        self.probe_timeout_secs = Some(secs);
        self
    }

    /// Returns the concurrency limit, never less than one.
    #[inline]
    pub fn effective_max_concurrent_probes(&self) -> usize {
        self.max_concurrent_probes.max(1)
    }

    /// Returns the probe timeout, `None` if disabled.
    #[inline]
    pub fn probe_timeout(&self) -> Option<Duration> {
        let secs = self
            .probe_timeout_secs
            .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS);
        if secs == 0 {
            None
        } else {
            Some(Duration::from_secs(secs))
        }
    }
}

struct ProbePoolInner {
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    config: ProbePoolConfig,
}

impl Drop for ProbePoolInner {
    fn drop(&mut self) {
        // Last owner gone without an orderly shutdown.
        self.shutdown.cancel();
        self.tracker.close();
        self.semaphore.close();
    }
}

/// Process-wide, cloneable pool that runs bucket probes.
#[derive(Clone)]
pub struct ProbePool {
    inner: Arc<ProbePoolInner>,
}

impl ProbePool {
    /// Acquires a new probe pool.
    pub fn new(config: ProbePoolConfig) -> Self {
        let permits = config.effective_max_concurrent_probes();

        tracing::info!(
            target: TRACING_TARGET,
            max_concurrent_probes = permits,
            probe_timeout = ?config.probe_timeout(),
            "Probe pool created"
        );

        let inner = ProbePoolInner {
            semaphore: Arc::new(Semaphore::new(permits)),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            config,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Acquires a new probe pool with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ProbePoolConfig::default())
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &ProbePoolConfig {
        &self.inner.config
    }

    /// Returns the number of probe tasks currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Returns the number of probes that could start right now.
    pub fn available_permits(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Runs a single probe on the pool.
    ///
    /// Waits for a free slot, then runs the probe as a tracked task. Timeouts
    /// and pool shutdown are reported as [`ProbeOutcome::TransportFailure`].
    pub async fn run(
        &self,
        probe: Arc<dyn BucketProbe>,
        location: BucketLocation,
        credentials: Credentials,
    ) -> ProbeOutcome {
        if self.is_shut_down() {
            return ProbeOutcome::TransportFailure(POOL_SHUT_DOWN.to_owned());
        }

        let cancel = self.inner.shutdown.child_token();
        // Cancels the probe task if this future is dropped before it resolves.
        let _guard = cancel.clone().drop_guard();

        let permit = tokio::select! {
            permit = self.inner.semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return ProbeOutcome::TransportFailure(POOL_SHUT_DOWN.to_owned()),
            },
            () = cancel.cancelled() => {
                return ProbeOutcome::TransportFailure(POOL_SHUT_DOWN.to_owned());
            }
        };

        let timeout = self.inner.config.probe_timeout();
        let bucket = location.bucket.clone();

        let task = self.inner.tracker.spawn(async move {
            let _permit = permit;
            let probe_future = async {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, probe.probe(&location, &credentials))
                        .await
                        .unwrap_or_else(|_| {
                            ProbeOutcome::TransportFailure(format!(
                                "probe timed out after {}s",
                                limit.as_secs()
                            ))
                        }),
                    None => probe.probe(&location, &credentials).await,
                }
            };

            tokio::select! {
                () = cancel.cancelled() => None,
                outcome = probe_future => Some(outcome),
            }
        });

        match task.await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    bucket = %bucket,
                    "Probe cancelled by pool shutdown"
                );
                ProbeOutcome::TransportFailure(POOL_SHUT_DOWN.to_owned())
            }
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    bucket = %bucket,
                    error = %e,
                    "Probe task failed"
                );
                ProbeOutcome::TransportFailure(format!("probe task failed: {e}"))
            }
        }
    }

    /// Shuts the pool down.
    ///
    /// Cancels outstanding probes and waits for every probe task to finish.
    /// Later calls to [`run`](Self::run) fail with [`POOL_SHUT_DOWN`].
    pub async fn shutdown(&self) {
        tracing::info!(
            target: TRACING_TARGET,
            in_flight = self.in_flight(),
            "Shutting down probe pool"
        );

        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.semaphore.close();

        tracing::info!(target: TRACING_TARGET, "Probe pool shut down");
    }
}

impl std::fmt::Debug for ProbePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbePool")
            .field("config", &self.inner.config)
            .field("in_flight", &self.in_flight())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
