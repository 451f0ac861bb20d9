//! Destination error types.

use serde_json::Value;
use strum::{AsRefStr, IntoStaticStr};

use crate::DestinationType;

/// Reason reported when the probed bucket does not exist.
pub const BUCKET_DOES_NOT_EXIST: &str = "Bucket does not exist";

/// Message reported when the storage service rejects the credentials.
pub const ACCESS_DENIED: &str = "Access denied";

/// Default message reported for transport-level failures.
pub const DEFAULT_CONNECTION_FAILED: &str = "Connection failed";

/// Result type for destination operations.
pub type Result<T, E = DestinationError> = std::result::Result<T, E>;

/// Categories of [`DestinationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DestinationErrorKind {
    /// The configuration failed to parse or shape-check.
    MalformedConfiguration,
    /// The configuration is well-formed but semantically invalid.
    InvalidConfiguration,
    /// The storage service rejected the credentials.
    AccessDenied,
    /// The storage service could not be reached.
    ConnectionFailed,
}

/// Reasons a destination cannot be provisioned.
///
/// The taxonomy is closed: every failed provisioning attempt ends in exactly
/// one of these variants. Messages and reason lists are stable literals that
/// callers may match on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DestinationError {
    /// The configuration failed to parse or shape-check.
    #[error("malformed configuration: {reason}")]
    MalformedConfiguration {
        /// What is wrong with the input.
        reason: String,
    },

    /// The configuration is well-formed but semantically invalid.
    #[error("invalid configuration for {destination_type}: {}", reasons.join(", "))]
    InvalidConfiguration {
        /// Destination that rejected the configuration.
        destination_type: DestinationType,
        /// The configuration as supplied by the caller.
        original_config: Value,
        /// Ordered, non-empty list of reasons.
        reasons: Vec<String>,
    },

    /// The storage service rejected the credentials.
    #[error("{message} for {destination_type}")]
    AccessDenied {
        /// Destination that rejected the credentials.
        destination_type: DestinationType,
        /// The configuration as supplied by the caller.
        original_config: Value,
        /// Human-readable message.
        message: String,
    },

    /// Transport-level failure distinct from a semantic rejection.
    #[error("{message}: {detail}")]
    ConnectionFailed {
        /// Human-readable message.
        message: String,
        /// Transport detail (DNS, timeout, malformed response).
        detail: String,
    },
}

impl DestinationError {
    /// Creates a new malformed configuration error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedConfiguration {
            reason: reason.into(),
        }
    }

    /// Creates a new invalid configuration error carrying a single reason.
    pub fn invalid(
        destination_type: DestinationType,
        original_config: Value,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfiguration {
            destination_type,
            original_config,
            reasons: vec![reason.into()],
        }
    }

    /// Creates a new access denied error.
    pub fn access_denied(
        destination_type: DestinationType,
        original_config: Value,
        message: impl Into<String>,
    ) -> Self {
        Self::AccessDenied {
            destination_type,
            original_config,
            message: message.into(),
        }
    }

    /// Creates a new connection failure.
    pub fn connection_failed(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> DestinationErrorKind {
        match self {
            Self::MalformedConfiguration { .. } => DestinationErrorKind::MalformedConfiguration,
            Self::InvalidConfiguration { .. } => DestinationErrorKind::InvalidConfiguration,
            Self::AccessDenied { .. } => DestinationErrorKind::AccessDenied,
            Self::ConnectionFailed { .. } => DestinationErrorKind::ConnectionFailed,
        }
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind().into()
    }

    /// Returns the destination type, if the error carries one.
    pub fn destination_type(&self) -> Option<&DestinationType> {
        match self {
            Self::InvalidConfiguration {
                destination_type, ..
            }
            | Self::AccessDenied {
                destination_type, ..
            } => Some(destination_type),
            Self::MalformedConfiguration { .. } | Self::ConnectionFailed { .. } => None,
        }
    }

    /// Returns the original configuration, if the error carries one.
    pub fn original_config(&self) -> Option<&Value> {
        match self {
            Self::InvalidConfiguration {
                original_config, ..
            }
            | Self::AccessDenied {
                original_config, ..
            } => Some(original_config),
            Self::MalformedConfiguration { .. } | Self::ConnectionFailed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn s3() -> DestinationType {
        DestinationType::new("s3", semver::Version::new(1, 0, 0))
    }

    #[test]
    fn kind_strings_are_snake_case() {
        let err = DestinationError::malformed("missing field `bucket`");
        assert_eq!(err.kind_str(), "malformed_configuration");

        let err = DestinationError::connection_failed(DEFAULT_CONNECTION_FAILED, "dns error");
        assert_eq!(err.kind(), DestinationErrorKind::ConnectionFailed);
        assert_eq!(err.kind_str(), "connection_failed");
    }

    #[test]
    fn display_uses_literal_messages() {
        let err = DestinationError::invalid(s3(), json!({}), BUCKET_DOES_NOT_EXIST);
        assert_eq!(
            err.to_string(),
            "invalid configuration for s3@1.0.0: Bucket does not exist"
        );

        let err = DestinationError::access_denied(s3(), json!({}), ACCESS_DENIED);
        assert_eq!(err.to_string(), "Access denied for s3@1.0.0");

        let err = DestinationError::connection_failed(DEFAULT_CONNECTION_FAILED, "timed out");
        assert_eq!(err.to_string(), "Connection failed: timed out");
    }

    #[test]
    fn diagnostics_only_on_semantic_errors() {
        let config = json!({ "bucket": "s3://data" });
        let err = DestinationError::access_denied(s3(), config.clone(), ACCESS_DENIED);
        assert_eq!(err.destination_type(), Some(&s3()));
        assert_eq!(err.original_config(), Some(&config));

        let err = DestinationError::malformed("not an object");
        assert!(err.destination_type().is_none());
        assert!(err.original_config().is_none());
    }
}
