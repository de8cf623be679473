//! Cancellable one-shot timer.
//!
//! Playback holds (the 2-second silent-segment fallback, wink clearing) and
//! the blink loop all need timers that can be revoked at teardown, so every
//! delayed action goes through a handle that owns its task. Dropping the
//! handle cancels the pending fire.

use std::time::Duration;
use tokio::task::JoinHandle;

/// A spawned delay that runs `on_fire` once, unless cancelled first.
pub struct OneShotTimer {
    handle: JoinHandle<()>,
}

impl OneShotTimer {
    /// Spawn a timer on the current runtime. `on_fire` runs after `delay`.
    pub fn spawn(delay: Duration, on_fire: impl FnOnce() + Send + 'static) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });
        Self { handle }
    }

    /// Revoke the timer. No-op if it already fired.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the timer task has completed (fired or cancelled).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
