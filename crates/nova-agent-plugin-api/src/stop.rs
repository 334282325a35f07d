//! Cooperative stop signal handed to every worker

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    requested: Mutex<bool>,
    condvar: Condvar,
}

/// Stop signal shared between the supervisor and one worker
///
/// Cloning yields another handle to the same signal. Once requested it stays
/// requested; there is no reset.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

impl StopSignal {
    /// Create a new, unset stop signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal and wake every waiter
    pub fn request(&self) {
        let mut requested = self.inner.requested.lock();
        *requested = true;
        self.inner.condvar.notify_all();
    }

    /// Check if a stop has been requested
    pub fn is_requested(&self) -> bool {
        *self.inner.requested.lock()
    }

    /// Block until a stop is requested
    pub fn wait(&self) {
        let mut requested = self.inner.requested.lock();
        while !*requested {
            self.inner.condvar.wait(&mut requested);
        }
    }

    /// Block for at most `timeout`, returning early if a stop is requested
    ///
    /// Returns `true` if the stop was requested. A timeout too large to
    /// represent as a deadline waits without one.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut requested = self.inner.requested.lock();
        while !*requested {
            if self
                .inner
                .condvar
                .wait_until(&mut requested, deadline)
                .timed_out()
            {
                break;
            }
        }
        *requested
    }
}
