//! Probe outcome classification.

use serde_json::Value;

use crate::DestinationType;
use crate::error::{
    ACCESS_DENIED, BUCKET_DOES_NOT_EXIST, DEFAULT_CONNECTION_FAILED, DestinationError,
};
use crate::probe::ProbeOutcome;

/// Maps probe outcomes onto the [`DestinationError`] taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassifier {
    destination_type: DestinationType,
    connection_message: String,
}

impl ErrorClassifier {
    /// Creates a classifier for the given destination.
    pub fn new(destination_type: DestinationType) -> Self {
        Self {
            destination_type,
            connection_message: DEFAULT_CONNECTION_FAILED.to_owned(),
        }
    }

    /// Sets the message reported with [`DestinationError::ConnectionFailed`].
    pub fn with_connection_message(mut self, message: impl Into<String>) -> Self {
        self.connection_message = message.into();
        self
    }

    /// Returns the destination this classifier reports for.
    pub fn destination_type(&self) -> &DestinationType {
        &self.destination_type
    }

    /// Returns the message reported with connection failures.
    pub fn connection_message(&self) -> &str {
        &self.connection_message
    }

    /// Classifies a probe outcome.
    ///
    /// Returns `None` for [`ProbeOutcome::Success`] and exactly one error
    /// for every other outcome.
    pub fn classify(
        &self,
        outcome: ProbeOutcome,
        original_config: &Value,
    ) -> Option<DestinationError> {
        match outcome {
            ProbeOutcome::Success => None,
            ProbeOutcome::NotFound => Some(DestinationError::invalid(
                self.destination_type.clone(),
                original_config.clone(),
                BUCKET_DOES_NOT_EXIST,
            )),
            ProbeOutcome::Forbidden => Some(DestinationError::access_denied(
                self.destination_type.clone(),
                original_config.clone(),
                ACCESS_DENIED,
            )),
            ProbeOutcome::TransportFailure(detail) => Some(DestinationError::connection_failed(
                self.connection_message.clone(),
                detail,
            )),
        }
    }
}
