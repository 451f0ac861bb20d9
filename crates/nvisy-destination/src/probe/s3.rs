//! S3-compatible bucket probe.
//!
//! Works with AWS S3, MinIO, and any S3-compatible service.

use futures::TryStreamExt;
use opendal::{Operator, services};

use super::{BucketProbe, ProbeOutcome, TRACING_TARGET};
use crate::config::{BucketLocation, Credentials};

/// Region used when the credentials do not name one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Probes S3-compatible buckets through OpenDAL.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Probe;

impl S3Probe {
    /// Creates a new S3 probe.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl BucketProbe for S3Probe {
    async fn probe(&self, location: &BucketLocation, credentials: &Credentials) -> ProbeOutcome {
        let operator = match self.connect(location, credentials) {
            Ok(operator) => operator,
            Err(e) => return ProbeOutcome::TransportFailure(e.to_string()),
        };

        tracing::debug!(
            target: TRACING_TARGET,
            bucket = %location.bucket,
            root = %location.root,
            "Probing bucket"
        );

        // Listing at most one entry is a single metadata-only request that
        // fails with 404 for missing buckets and 403 for rejected credentials.
        let result = match operator.lister_with("/").limit(1).await {
            Ok(mut lister) => lister.try_next().await.map(|_| ()),
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(()) => ProbeOutcome::Success,
            Err(e) => ProbeOutcome::from_storage_error(&e),
        };

        tracing::debug!(
            target: TRACING_TARGET,
            bucket = %location.bucket,
            outcome = ?outcome,
            "Bucket probe complete"
        );

        outcome
    }

    fn connect(
        &self,
        location: &BucketLocation,
        credentials: &Credentials,
    ) -> opendal::Result<Operator> {
        let region = credentials.region.as_deref().unwrap_or(DEFAULT_REGION);

        let mut builder = services::S3::default()
            .bucket(&location.bucket)
            .root(&location.root)
            .region(region)
            .access_key_id(&credentials.access_key)
            .secret_access_key(&credentials.secret_key)
            .disable_config_load();

        if let Some(ref endpoint) = location.endpoint {
            builder = builder.endpoint(endpoint);
        }

        Operator::new(builder).map(|op| op.finish())
    }
}
