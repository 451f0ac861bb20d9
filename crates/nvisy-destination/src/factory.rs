//! Destination provisioning.
//!
//! [`DestinationFactory::build`] runs a strictly ordered pipeline:
//!
//! 1. parse the raw configuration ([`Configuration::parse`]),
//! 2. probe the bucket on the shared [`ProbePool`],
//! 3. classify the probe outcome ([`ErrorClassifier::classify`]),
//! 4. provision a [`DestinationHandle`].
//!
//! Every call ends in exactly one [`DestinationError`] or one handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use crate::DestinationType;
use crate::classify::ErrorClassifier;
use crate::config::Configuration;
use crate::error::{DestinationError, Result};
use crate::handle::DestinationHandle;
use crate::pool::ProbePool;
use crate::probe::{BucketProbe, S3Probe};

/// Tracing target for destination provisioning.
pub const TRACING_TARGET: &str = "nvisy_destination::factory";

/// Validates destination configurations and provisions handles.
///
/// Cheap to share behind an `Arc`; concurrent [`build`](Self::build) calls
/// share only the probe pool and the live handle counter.
pub struct DestinationFactory {
    probe: Arc<dyn BucketProbe>,
    pool: ProbePool,
    classifier: ErrorClassifier,
    live_handles: Arc<AtomicUsize>,
}

impl DestinationFactory {
    /// Creates a factory for `destination_type` backed by `probe`.
    pub fn new(
        destination_type: DestinationType,
        probe: Arc<dyn BucketProbe>,
        pool: ProbePool,
    ) -> Self {
        Self {
            probe,
            pool,
            classifier: ErrorClassifier::new(destination_type),
            live_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a factory for S3-compatible buckets.
    pub fn s3(pool: ProbePool) -> Self {
        Self::new(DestinationType::s3(), Arc::new(S3Probe::new()), pool)
    }

    /// Replaces the error classifier.
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Returns the destination type.
    pub fn destination_type(&self) -> &DestinationType {
        self.classifier.destination_type()
    }

    /// Returns the probe pool.
    pub fn pool(&self) -> &ProbePool {
        &self.pool
    }

    /// Returns the number of provisioned handles not yet released.
    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::Acquire)
    }

    /// Validates `raw` and provisions a handle for it.
    ///
    /// Dropping the returned future before it resolves cancels the bucket
    /// probe and never leaves a handle behind.
    ///
    /// # Errors
    ///
    /// - [`DestinationError::MalformedConfiguration`] if `raw` fails to parse;
    ///   no probe is attempted.
    /// - [`DestinationError::InvalidConfiguration`] if the bucket does not exist.
    /// - [`DestinationError::AccessDenied`] if the credentials are rejected.
    /// - [`DestinationError::ConnectionFailed`] if the storage service cannot
    ///   be reached or the connection cannot be established.
    pub async fn build(&self, raw: &Value) -> Result<DestinationHandle> {
        let destination = self.destination_type();

        let configuration = Configuration::parse(raw).inspect_err(|e| {
            tracing::warn!(
                target: TRACING_TARGET,
                destination = %destination,
                error = %e,
                "Rejected malformed destination configuration"
            );
        })?;

        let location = configuration.location();
        let credentials = configuration.credentials();

        tracing::debug!(
            target: TRACING_TARGET,
            destination = %destination,
            bucket = %location,
            "Probing destination bucket"
        );

        let outcome = self
            .pool
            .run(self.probe.clone(), location.clone(), credentials.clone())
            .await;

        if let Some(err) = self.classifier.classify(outcome, configuration.original()) {
            tracing::warn!(
                target: TRACING_TARGET,
                destination = %destination,
                bucket = %location,
                kind = err.kind_str(),
                error = %err,
                "Destination validation failed"
            );
            return Err(err);
        }

        let operator = self.probe.connect(location, credentials).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET,
                destination = %destination,
                bucket = %location,
                error = %e,
                "Failed to open destination connection"
            );
            DestinationError::connection_failed(self.classifier.connection_message(), e.to_string())
        })?;

        Ok(DestinationHandle::new(
            operator,
            destination.clone(),
            configuration,
            self.live_handles.clone(),
        ))
    }
}

impl std::fmt::Debug for DestinationFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationFactory")
            .field("destination_type", self.destination_type())
            .field("pool", &self.pool)
            .field("live_handles", &self.live_handles())
            .finish_non_exhaustive()
    }
}
