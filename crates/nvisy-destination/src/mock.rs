//! Mock bucket probe for testing.
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! nvisy-destination = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nvisy_destination::mock::MockProbe;
//! use nvisy_destination::{DestinationFactory, DestinationType, ProbeOutcome, ProbePool};
//!
//! let probe = Arc::new(MockProbe::new(ProbeOutcome::NotFound));
//! let factory = DestinationFactory::new(DestinationType::s3(), probe.clone(), ProbePool::with_defaults());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use opendal::{Operator, services};

use crate::config::{BucketLocation, Credentials};
use crate::probe::{BucketProbe, ProbeOutcome};

/// Probe that returns a fixed outcome and counts its resources.
///
/// Every call to [`probe`](BucketProbe::probe) opens a simulated connection
/// that is closed when the probe future completes or is dropped. Handles are
/// backed by OpenDAL's in-memory service.
#[derive(Debug)]
pub struct MockProbe {
    outcome: ProbeOutcome,
    hang: bool,
    calls: AtomicUsize,
    open: Arc<AtomicUsize>,
}

impl MockProbe {
    /// Creates a probe that always reports `outcome`.
    pub fn new(outcome: ProbeOutcome) -> Self {
        Self {
            outcome,
            hang: false,
            calls: AtomicUsize::new(0),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a probe that never resolves.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(ProbeOutcome::Success)
        }
    }

    /// Returns how many probes were started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns how many simulated connections are currently open.
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

struct Connection(Arc<AtomicUsize>);

impl Connection {
    fn open(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl BucketProbe for MockProbe {
    async fn probe(&self, _location: &BucketLocation, _credentials: &Credentials) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _connection = Connection::open(&self.open);

        if self.hang {
            std::future::pending::<()>().await;
        }

        tokio::task::yield_now().await;
        self.outcome.clone()
    }

    fn connect(
        &self,
        location: &BucketLocation,
        _credentials: &Credentials,
    ) -> opendal::Result<Operator> {
        let builder = services::Memory::default().root(&location.root);
        Operator::new(builder).map(|op| op.finish())
    }
}
