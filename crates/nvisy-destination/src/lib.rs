#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod classify;
mod config;
mod destination;
mod error;
mod factory;
mod handle;
mod pool;
mod probe;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

#[doc(hidden)]
pub mod prelude;

pub use classify::ErrorClassifier;
pub use config::{BucketLocation, Configuration, Credentials};
pub use destination::DestinationType;
pub use error::{
    ACCESS_DENIED, BUCKET_DOES_NOT_EXIST, DEFAULT_CONNECTION_FAILED, DestinationError,
    DestinationErrorKind, Result,
};
pub use factory::DestinationFactory;
pub use handle::DestinationHandle;
pub use pool::{
    DEFAULT_MAX_CONCURRENT_PROBES, DEFAULT_PROBE_TIMEOUT_SECS, POOL_SHUT_DOWN, ProbePool,
    ProbePoolConfig,
};
pub use probe::{BucketProbe, DEFAULT_REGION, ProbeOutcome, S3Probe};

/// Tracing target for destination operations.
pub const TRACING_TARGET: &str = "nvisy_destination";
