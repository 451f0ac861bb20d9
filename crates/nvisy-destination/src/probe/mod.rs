//! Remote bucket checks.
//!
//! A probe performs a single metadata-only request against a bucket and
//! reports what happened as a [`ProbeOutcome`]. Interpreting the outcome is
//! left to [`ErrorClassifier`](crate::ErrorClassifier).

mod s3;

use opendal::Operator;
pub use s3::{DEFAULT_REGION, S3Probe};

use crate::config::{BucketLocation, Credentials};

/// Tracing target for bucket probes.
pub const TRACING_TARGET: &str = "nvisy_destination::probe";

/// Result of checking a bucket's existence and reachability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The bucket exists and the credentials grant access.
    Success,
    /// The bucket does not exist.
    NotFound,
    /// The credentials were rejected.
    Forbidden,
    /// The request did not produce a usable answer.
    TransportFailure(String),
}

impl ProbeOutcome {
    /// Maps an HTTP status code returned by the storage service.
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            404 => Self::NotFound,
            401 | 403 => Self::Forbidden,
            other => Self::TransportFailure(format!("unexpected status {other}")),
        }
    }

    /// Maps an error returned by the storage client.
    ///
    /// The storage client does not always agree with the HTTP status on the
    /// error kind (S3 reports `NoSuchBucket` as a configuration error), so a
    /// 401, 403 or 404 response status takes precedence over the kind.
    pub fn from_storage_error(err: &opendal::Error) -> Self {
        use opendal::ErrorKind;

        let detail = err.to_string();
        if let Some(status @ (401 | 403 | 404)) = response_status(&detail) {
            return Self::from_status(status);
        }

        match err.kind() {
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::PermissionDenied => Self::Forbidden,
            _ => Self::TransportFailure(detail),
        }
    }
}

/// Extracts the HTTP status from the `response` context of a storage error.
fn response_status(detail: &str) -> Option<u16> {
    let (_, rest) = detail.split_once("status: ")?;
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(rest, |end| &rest[..end]);
    digits.parse().ok()
}

/// Storage client capability consumed by the destination factory.
///
/// Implementations perform exactly one logical request per [`probe`] call
/// and never retry; retry policy belongs to the transport.
///
/// [`probe`]: BucketProbe::probe
#[async_trait::async_trait]
pub trait BucketProbe: Send + Sync + 'static {
    /// Checks that the bucket exists and the credentials grant access.
    async fn probe(&self, location: &BucketLocation, credentials: &Credentials) -> ProbeOutcome;

    /// Builds the connection that backs a provisioned handle.
    fn connect(
        &self,
        location: &BucketLocation,
        credentials: &Credentials,
    ) -> opendal::Result<Operator>;
}
