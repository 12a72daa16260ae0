//! tests/common/harness.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "merlin_timer=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// A cloneable firing counter for callback assertions.
#[derive(Clone, Default)]
pub struct FireCounter {
    count: Arc<AtomicUsize>,
}

impl FireCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that bumps this counter on every firing.
    pub fn callback(&self) -> impl Fn() + Send + Sync + 'static {
        let count = Arc::clone(&self.count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Polls until the counter reaches `expected` or `deadline` passes.
    /// Returns whether the target was reached.
    pub fn wait_for(&self, expected: usize, deadline: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if self.count() >= expected {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        self.count() >= expected
    }
}
