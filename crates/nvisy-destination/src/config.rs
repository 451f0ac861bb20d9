//! Destination configuration parsing.
//!
//! A configuration is accepted only in one shape:
//!
//! ```json
//! {
//!   "bucket": "s3://my-bucket/exports",
//!   "credentials": { "accessKey": "...", "secretKey": "...", "region": "eu-west-1" }
//! }
//! ```
//!
//! Parsing is purely structural and never touches the network.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{DestinationError, Result};

/// Tracing target for configuration parsing.
pub const TRACING_TARGET: &str = "nvisy_destination::config";

/// Object storage credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Credentials {
    /// Access key ID.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Storage region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Credentials {
    /// Creates new credentials without a region.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: None,
        }
    }

    /// Sets the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.access_key.trim().is_empty() {
            return Err(DestinationError::malformed(
                "credentials.accessKey must not be empty",
            ));
        }

        if self.secret_key.trim().is_empty() {
            return Err(DestinationError::malformed(
                "credentials.secretKey must not be empty",
            ));
        }

        if self.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(DestinationError::malformed(
                "credentials.region must not be empty when present",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .field("region", &self.region)
            .finish()
    }
}

/// Wire shape of the configuration before semantic checks.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfiguration {
    bucket: String,
    credentials: Credentials,
}

/// A parsed, immutable destination configuration.
#[derive(Clone, PartialEq)]
pub struct Configuration {
    bucket: Url,
    credentials: Credentials,
    location: BucketLocation,
    original: Value,
}

impl Configuration {
    /// Parses and shape-checks a structured configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::MalformedConfiguration`] when a required
    /// field is absent or mistyped, an unknown field is present, the bucket
    /// is not a usable storage URL, or a credential is empty.
    pub fn parse(raw: &Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(DestinationError::malformed(
                "configuration must be a JSON object",
            ));
        }

        let parsed: RawConfiguration = serde_json::from_value(raw.clone())
            .map_err(|e| DestinationError::malformed(e.to_string()))?;

        let bucket = Url::parse(&parsed.bucket).map_err(|e| {
            DestinationError::malformed(format!("bucket is not a valid URL: {e}"))
        })?;

        let location = BucketLocation::from_url(&bucket)?;
        parsed.credentials.validate()?;

        tracing::debug!(
            target: TRACING_TARGET,
            bucket = %location.bucket,
            endpoint = ?location.endpoint,
            root = %location.root,
            "Configuration parsed"
        );

        Ok(Self {
            bucket,
            credentials: parsed.credentials,
            location,
            original: raw.clone(),
        })
    }

    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::MalformedConfiguration`] when the text is
    /// not valid JSON or fails [`Configuration::parse`].
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| DestinationError::malformed(format!("invalid JSON: {e}")))?;
        Self::parse(&raw)
    }

    /// Returns the bucket URL.
    pub fn bucket(&self) -> &Url {
        &self.bucket
    }

    /// Returns the credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the resolved bucket location.
    pub fn location(&self) -> &BucketLocation {
        &self.location
    }

    /// Returns the configuration exactly as supplied.
    pub fn original(&self) -> &Value {
        &self.original
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The original input carries the secret key in plain text.
        f.debug_struct("Configuration")
            .field("bucket", &self.bucket.as_str())
            .field("credentials", &self.credentials)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// A bucket URL resolved into what a storage client needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketLocation {
    /// Custom endpoint, `None` for the provider's default endpoint.
    pub endpoint: Option<String>,
    /// Bucket name.
    pub bucket: String,
    /// Root path inside the bucket, always starting and ending with `/`.
    pub root: String,
}

impl BucketLocation {
    /// Resolves a bucket URL.
    ///
    /// - `s3://<bucket>[/<prefix>]` uses the default endpoint.
    /// - `http(s)://<host>[:<port>]/<bucket>[/<prefix>]` uses a path-style
    ///   custom endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::MalformedConfiguration`] for other schemes
    /// or when no bucket name can be derived.
    pub fn from_url(url: &Url) -> Result<Self> {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match url.scheme() {
            "s3" => {
                let bucket = url
                    .host_str()
                    .filter(|h| !h.is_empty())
                    .ok_or_else(|| DestinationError::malformed("bucket URL has no bucket name"))?;

                Ok(Self {
                    endpoint: None,
                    bucket: bucket.to_owned(),
                    root: root_from_segments(&segments),
                })
            }
            "http" | "https" => {
                if url.host_str().is_none() {
                    return Err(DestinationError::malformed("bucket URL has no host"));
                }

                let (bucket, prefix) = segments
                    .split_first()
                    .ok_or_else(|| DestinationError::malformed("bucket URL has no bucket name"))?;

                Ok(Self {
                    endpoint: Some(url[..url::Position::BeforePath].to_owned()),
                    bucket: (*bucket).to_owned(),
                    root: root_from_segments(prefix),
                })
            }
            other => Err(DestinationError::malformed(format!(
                "unsupported bucket URL scheme `{other}`"
            ))),
        }
    }
}

impl std::fmt::Display for BucketLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.endpoint {
            Some(endpoint) => write!(f, "{endpoint}/{}{}", self.bucket, self.root),
            None => write!(f, "s3://{}{}", self.bucket, self.root),
        }
    }
}

fn root_from_segments(segments: &[&str]) -> String {
    if segments.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::DestinationErrorKind;

    fn valid() -> Value {
        json!({
            "bucket": "s3://exports/daily",
            "credentials": { "accessKey": "AKIA", "secretKey": "secret", "region": "eu-west-1" }
        })
    }

    fn malformed_reason(raw: Value) -> String {
        match Configuration::parse(&raw) {
            Err(DestinationError::MalformedConfiguration { reason }) => reason,
            other => panic!("expected malformed configuration, got {other:?}"),
        }
    }

    #[test]
    fn parses_s3_url() {
        let config = Configuration::parse(&valid()).unwrap();
        assert_eq!(config.bucket().as_str(), "s3://exports/daily");
        assert_eq!(config.credentials().access_key, "AKIA");
        assert_eq!(config.credentials().region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.original(), &valid());

        let location = config.location();
        assert_eq!(location.endpoint, None);
        assert_eq!(location.bucket, "exports");
        assert_eq!(location.root, "/daily/");
    }

    #[test]
    fn parses_path_style_endpoint() {
        let raw = json!({
            "bucket": "http://localhost:9000/exports/a/b",
            "credentials": { "accessKey": "minio", "secretKey": "minio123" }
        });
        let config = Configuration::parse(&raw).unwrap();
        let location = config.location();
        assert_eq!(location.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(location.bucket, "exports");
        assert_eq!(location.root, "/a/b/");
        assert_eq!(location.to_string(), "http://localhost:9000/exports/a/b/");
        assert!(config.credentials().region.is_none());
    }

    #[test]
    fn from_json_text() {
        let text = r#"{"bucket":"s3://b","credentials":{"accessKey":"a","secretKey":"s"}}"#;
        let config = Configuration::from_json(text).unwrap();
        assert_eq!(config.location().root, "/");

        let err = Configuration::from_json("{ not json").unwrap_err();
        assert_eq!(err.kind(), DestinationErrorKind::MalformedConfiguration);
    }

    #[test]
    fn rejects_missing_fields() {
        let reason = malformed_reason(json!({ "credentials": valid()["credentials"] }));
        assert!(reason.contains("bucket"), "{reason}");

        let reason = malformed_reason(json!({ "bucket": "s3://b" }));
        assert!(reason.contains("credentials"), "{reason}");

        let reason = malformed_reason(json!({
            "bucket": "s3://b",
            "credentials": { "accessKey": "a" }
        }));
        assert!(reason.contains("secretKey"), "{reason}");
    }

    #[test]
    fn rejects_mistyped_fields() {
        malformed_reason(json!({ "bucket": 42, "credentials": valid()["credentials"] }));
        malformed_reason(json!({ "bucket": "s3://b", "credentials": "a:s" }));
        malformed_reason(json!({
            "bucket": "s3://b",
            "credentials": { "accessKey": 1, "secretKey": "s" }
        }));
        malformed_reason(json!(["s3://b"]));
        malformed_reason(Value::Null);
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut raw = valid();
        raw["prefix"] = json!("x");
        malformed_reason(raw);

        let mut raw = valid();
        raw["credentials"]["sessionToken"] = json!("t");
        malformed_reason(raw);
    }

    #[test]
    fn rejects_bad_urls() {
        let creds = valid()["credentials"].clone();

        let reason = malformed_reason(json!({ "bucket": "not a url", "credentials": creds }));
        assert!(reason.starts_with("bucket is not a valid URL"), "{reason}");

        let reason = malformed_reason(json!({ "bucket": "ftp://host/b", "credentials": creds }));
        assert_eq!(reason, "unsupported bucket URL scheme `ftp`");

        let reason = malformed_reason(json!({ "bucket": "https://host/", "credentials": creds }));
        assert_eq!(reason, "bucket URL has no bucket name");
    }

    #[test]
    fn rejects_empty_credentials() {
        let reason = malformed_reason(json!({
            "bucket": "s3://b",
            "credentials": { "accessKey": " ", "secretKey": "s" }
        }));
        assert_eq!(reason, "credentials.accessKey must not be empty");

        let reason = malformed_reason(json!({
            "bucket": "s3://b",
            "credentials": { "accessKey": "a", "secretKey": "" }
        }));
        assert_eq!(reason, "credentials.secretKey must not be empty");
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("AKIA", "top-secret").with_region("us-east-1");
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKIA"));
        assert!(!debug.contains("top-secret"));
    }

    #[test]
    fn configuration_debug_redacts_secret() {
        let raw = json!({
            "bucket": "s3://exports/daily",
            "credentials": { "accessKey": "AKIA", "secretKey": "top-secret" }
        });
        let config = Configuration::parse(&raw).unwrap();

        let debug = format!("{config:?}");
        assert!(debug.contains("s3://exports/daily"));
        assert!(debug.contains("AKIA"));
        assert!(!debug.contains("top-secret"));
    }
}
