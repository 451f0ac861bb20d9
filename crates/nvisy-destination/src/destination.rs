//! Destination identity.

use derive_more::Display;
use semver::Version;
use serde::{Deserialize, Serialize};

/// Identifies a destination connector by name and version.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{name}@{version}")]
pub struct DestinationType {
    /// Connector name (e.g. `s3`).
    pub name: String,
    /// Connector version.
    pub version: Version,
}

impl DestinationType {
    /// Creates a new destination type.
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// The S3-compatible object storage destination shipped with this crate.
    pub fn s3() -> Self {
        Self::new("s3", Version::new(1, 0, 0))
    }
}
