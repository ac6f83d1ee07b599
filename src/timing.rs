//! Rate limiting for high-frequency UI events

use std::future::Future;
use std::time::Duration;

use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant};

pub const SCROLL_THROTTLE: Duration = Duration::from_millis(200);

/// Trailing-edge debouncer. Every call re-arms the quiet period; the action
/// runs once the period elapses without another call
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn call<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }

        let delay = self.delay;

        self.pending = Some(task::spawn(async move {
            time::sleep(delay).await;
            action.await;
        }));
    }

    /// Drops the armed action, if any, without running it
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Leading-edge gate: the first call in a window passes, the rest are
/// swallowed until the window elapses
#[derive(Debug)]
pub struct Throttle {
    window: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn allow(&mut self) -> bool {
        let now = Instant::now();

        match self.last {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
