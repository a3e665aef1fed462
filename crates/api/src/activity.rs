use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Reference-counted count of in-flight API requests.
///
/// The presentation layer can poll [`NetworkActivity::is_active`] to drive
/// a busy indicator. Cloning shares the underlying counter.
#[derive(Clone, Debug, Default)]
pub struct NetworkActivity {
    in_flight: Arc<AtomicUsize>,
}

impl NetworkActivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request; the count drops when the guard does.
    pub fn begin(&self) -> ActivityGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        ActivityGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Returns `true` while at least one request is in flight.
    pub fn is_active(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// RAII handle for one in-flight request.
#[must_use]
pub struct ActivityGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
