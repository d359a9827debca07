//! Step setup barrier: recorder + speech readiness with a hard timeout

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
enum Flag {
    Recorder,
    Speech,
}

struct Inner {
    recorder_ready: AtomicBool,
    speech_done: AtomicBool,
    forced: AtomicBool,
}

/// Set-once readiness flag handed to a collaborator's completion callback.
///
/// Clonable and safe to fire from any task; repeated calls are no-ops.
#[derive(Clone)]
pub struct ReadyHandle {
    inner: Arc<Inner>,
    flag: Flag,
}

impl ReadyHandle {
    pub fn mark_ready(&self) {
        let cell = match self.flag {
            Flag::Recorder => &self.inner.recorder_ready,
            Flag::Speech => &self.inner.speech_done,
        };
        if !cell.swap(true, Ordering::SeqCst) {
            debug!(flag = ?self.flag, "barrier_flag_set");
        }
    }
}

/// Gates a step on recorder readiness and instruction-speech completion.
///
/// A fresh barrier is built for every step. `wait` polls the flags and
/// force-satisfies the barrier after the hard timeout so one wedged
/// collaborator can never stall the protocol.
pub struct ReadinessBarrier {
    inner: Arc<Inner>,
}

impl ReadinessBarrier {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                recorder_ready: AtomicBool::new(false),
                speech_done: AtomicBool::new(false),
                forced: AtomicBool::new(false),
            }),
        }
    }

    pub fn recorder_handle(&self) -> ReadyHandle {
        ReadyHandle { inner: Arc::clone(&self.inner), flag: Flag::Recorder }
    }

    pub fn speech_handle(&self) -> ReadyHandle {
        ReadyHandle { inner: Arc::clone(&self.inner), flag: Flag::Speech }
    }

    pub fn is_satisfied(&self) -> bool {
        self.inner.recorder_ready.load(Ordering::SeqCst)
            && self.inner.speech_done.load(Ordering::SeqCst)
    }

    /// True if the barrier only resolved via the hard timeout
    pub fn was_forced(&self) -> bool {
        self.inner.forced.load(Ordering::SeqCst)
    }

    /// Poll until both flags are set, or force-satisfy at `timeout`.
    /// Returns true on a clean resolve, false when forced.
    pub async fn wait(&self, poll: Duration, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_satisfied() {
                return !self.was_forced();
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    recorder_ready = %self.inner.recorder_ready.load(Ordering::SeqCst),
                    speech_done = %self.inner.speech_done.load(Ordering::SeqCst),
                    timeout_ms = %timeout.as_millis(),
                    "barrier_timeout_forced"
                );
                self.inner.forced.store(true, Ordering::SeqCst);
                self.inner.recorder_ready.store(true, Ordering::SeqCst);
                self.inner.speech_done.store(true, Ordering::SeqCst);
                return false;
            }
            tokio::time::sleep(poll).await;
        }
    }
}

impl Default for ReadinessBarrier {
    fn default() -> Self {
        Self::new()
    }
}
