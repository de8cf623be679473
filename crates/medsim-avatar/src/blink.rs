//! Automatic blinking and wink flags.
//!
//! The blink loop is independent of playback: it fires a 200 ms blink at a
//! random interval uniformly chosen from [1000 ms, 5000 ms), rescheduling
//! itself until the scheduler is shut down. Wink flags are set by the
//! playback driver when a segment carries the wink special action.

use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// How long one blink holds the lids closed.
pub const BLINK_HOLD: Duration = Duration::from_millis(200);

/// Blink/wink flags shared between the blink loop, the playback driver, and
/// the blend engine. Plain atomics — all writers live on cooperative tasks.
#[derive(Debug, Default)]
pub struct GazeFlags {
    blink: AtomicBool,
    wink_left: AtomicBool,
    wink_right: AtomicBool,
}

impl GazeFlags {
    pub fn blink(&self) -> bool {
        self.blink.load(Ordering::Acquire)
    }

    pub fn wink_left(&self) -> bool {
        self.wink_left.load(Ordering::Acquire)
    }

    pub fn wink_right(&self) -> bool {
        self.wink_right.load(Ordering::Acquire)
    }

    pub fn set_blink(&self, on: bool) {
        self.blink.store(on, Ordering::Release);
    }

    pub fn set_wink_left(&self, on: bool) {
        self.wink_left.store(on, Ordering::Release);
    }

    pub fn set_wink_right(&self, on: bool) {
        self.wink_right.store(on, Ordering::Release);
    }

    /// The left lid should be closed this frame (blink or left wink).
    pub fn left_closed(&self) -> bool {
        self.blink() || self.wink_left()
    }

    /// The right lid should be closed this frame (blink or right wink).
    pub fn right_closed(&self) -> bool {
        self.blink() || self.wink_right()
    }
}

/// Self-rescheduling blink task. Aborted on [`shutdown`](Self::shutdown) or drop.
pub struct BlinkScheduler {
    handle: JoinHandle<()>,
}

impl BlinkScheduler {
    /// Spawn the blink loop on the current runtime.
    pub fn spawn(flags: Arc<GazeFlags>) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                let wait = {
                    let mut rng = rand::thread_rng();
                    Duration::from_millis(rng.gen_range(1000..5000))
                };
                tokio::time::sleep(wait).await;
                debug!("blink");
                flags.set_blink(true);
                tokio::time::sleep(BLINK_HOLD).await;
                flags.set_blink(false);
            }
        });
        Self { handle }
    }

    /// Cancel the pending blink and stop the loop.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for BlinkScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
