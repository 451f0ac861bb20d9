//! Prelude module for convenient imports.

pub use crate::classify::ErrorClassifier;
pub use crate::config::{Configuration, Credentials};
pub use crate::destination::DestinationType;
pub use crate::error::{DestinationError, DestinationErrorKind, Result};
pub use crate::factory::DestinationFactory;
pub use crate::handle::DestinationHandle;
pub use crate::pool::{ProbePool, ProbePoolConfig};
pub use crate::probe::{BucketProbe, ProbeOutcome, S3Probe};
