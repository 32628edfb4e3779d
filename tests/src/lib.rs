//! Tessera Testing Framework
//!
//! Fake collaborators for the gateway core, so the registry, hook protocol
//! and global-module cascade can be exercised without a network, a real
//! policy engine or a cache server.

pub mod managers;

pub use engine::{CountingEngineFactory, FakeEngine};
pub use globals::RecordingGlobals;
pub use harness::Harness;
pub use hooks::ScriptedHook;
pub use managers::{FakeAdmin, NoopSync};

use parking_lot::Mutex;
use std::sync::Arc;

/// Ordered log of side effects shared by the fakes, e.g. `engine.close:acme`.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Events with the given prefix, in order.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

#[macro_export]
macro_rules! assert_events {
    ($log:expr, $prefix:expr, [$($event:expr),* $(,)?]) => {
        let got = $log.matching($prefix);
        let want: Vec<String> = vec![$($event.to_string()),*];
        assert_eq!(
            got, want,
            "Expected events with prefix '{}' to be {:?}, but got {:?}",
            $prefix, want, got
        );
    };
}
