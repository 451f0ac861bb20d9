//! Provisioned destination handles.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use jiff::Timestamp;
use opendal::{Operator, Writer};
use url::Url;

use crate::DestinationType;
use crate::config::Configuration;

/// Tracing target for destination handles.
pub const TRACING_TARGET: &str = "nvisy_destination::handle";

/// A validated, write-capable connection to a destination bucket.
///
/// Only [`DestinationFactory::build`](crate::DestinationFactory::build) creates
/// handles, and only after the bucket probe succeeded. The underlying
/// connection is released exactly once, when the handle is dropped or
/// explicitly [released](Self::release).
pub struct DestinationHandle {
    operator: Operator,
    destination_type: DestinationType,
    configuration: Configuration,
    provisioned_at: Timestamp,
    live: Arc<AtomicUsize>,
}

impl DestinationHandle {
    pub(crate) fn new(
        operator: Operator,
        destination_type: DestinationType,
        configuration: Configuration,
        live: Arc<AtomicUsize>,
    ) -> Self {
        live.fetch_add(1, Ordering::AcqRel);

        tracing::info!(
            target: TRACING_TARGET,
            destination = %destination_type,
            bucket = %configuration.location(),
            "Destination handle provisioned"
        );

        Self {
            operator,
            destination_type,
            configuration,
            provisioned_at: Timestamp::now(),
            live,
        }
    }

    /// Returns the destination type.
    pub fn destination_type(&self) -> &DestinationType {
        &self.destination_type
    }

    /// Returns the bucket URL this handle writes to.
    pub fn bucket(&self) -> &Url {
        self.configuration.bucket()
    }

    /// Returns the validated configuration.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Returns when the handle was provisioned.
    pub fn provisioned_at(&self) -> Timestamp {
        self.provisioned_at
    }

    /// Opens an upload stream to `key`.
    pub async fn writer(&self, key: &str) -> opendal::Result<Writer> {
        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            "Opening upload stream"
        );

        self.operator.writer(key).await
    }

    /// Uploads `data` to `key` in a single request.
    pub async fn write(&self, key: &str, data: impl Into<Bytes>) -> opendal::Result<()> {
        let data = data.into();

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            size = data.len(),
            "Writing object"
        );

        self.operator.write(key, data).await?;
        Ok(())
    }

    /// Releases the handle and its connection.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DestinationHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);

        tracing::info!(
            target: TRACING_TARGET,
            destination = %self.destination_type,
            bucket = %self.configuration.location(),
            "Destination handle released"
        );
    }
}

impl std::fmt::Debug for DestinationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationHandle")
            .field("destination_type", &self.destination_type)
            .field("bucket", &self.configuration.bucket().as_str())
            .field("provisioned_at", &self.provisioned_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mock::MockProbe;
    use crate::probe::{BucketProbe, ProbeOutcome};

    fn handle(live: &Arc<AtomicUsize>) -> DestinationHandle {
        let configuration = Configuration::parse(&json!({
            "bucket": "s3://exports/daily",
            "credentials": { "accessKey": "AKIA", "secretKey": "secret" }
        }))
        .unwrap();

        let operator = MockProbe::new(ProbeOutcome::Success)
            .connect(configuration.location(), configuration.credentials())
            .unwrap();

        DestinationHandle::new(operator, DestinationType::s3(), configuration, live.clone())
    }

    #[test]
    fn drop_releases_exactly_once() {
        let live = Arc::new(AtomicUsize::new(0));

        let first = handle(&live);
        let second = handle(&live);
        assert_eq!(live.load(Ordering::SeqCst), 2);

        first.release();
        assert_eq!(live.load(Ordering::SeqCst), 1);

        drop(second);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn write_and_stream_upload() {
        let live = Arc::new(AtomicUsize::new(0));
        let handle = handle(&live);

        handle.write("a.json", "{}").await.unwrap();

        let mut writer = handle.writer("b.ndjson").await.unwrap();
        writer.write(Bytes::from_static(b"line 1\n")).await.unwrap();
        writer.write(Bytes::from_static(b"line 2\n")).await.unwrap();
        writer.close().await.unwrap();

        let data = handle.operator.read("a.json").await.unwrap();
        assert_eq!(data.to_vec(), b"{}");

        let data = handle.operator.read("b.ndjson").await.unwrap();
        assert_eq!(data.to_vec(), b"line 1\nline 2\n");
    }

    #[test]
    fn debug_hides_credentials() {
        let live = Arc::new(AtomicUsize::new(0));
        let handle = handle(&live);
        let debug = format!("{handle:?}");
        assert!(debug.contains("s3://exports/daily"));
        assert!(!debug.contains("secret"));
    }
}
