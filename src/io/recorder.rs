//! Per-step video/sensor recorder capability
//!
//! Recorder startup is the slow half of step setup, so `begin_step` only
//! requests initialization and fires the barrier handle from a background
//! task once recording is live.

use crate::services::barrier::ReadyHandle;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Records raw sensor data for one step at a time
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Request recording for a step; `ready` fires once frames are flowing.
    /// Must return promptly so instruction speech can start in parallel.
    async fn begin_step(&self, step_index: usize, step_name: &str, ready: ReadyHandle)
        -> Result<()>;

    /// Stop recording for the step and flush
    async fn end_step(&self, step_index: usize) -> Result<()>;
}

/// Recorder stand-in that becomes ready after a fixed startup delay
pub struct SimRecorder {
    startup_delay: Duration,
}

impl SimRecorder {
    pub fn new(startup_delay: Duration) -> Self {
        Self { startup_delay }
    }

    fn spawn_startup(&self, step_index: usize, ready: ReadyHandle) -> JoinHandle<()> {
        let delay = self.startup_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            ready.mark_ready();
            info!(step = %step_index, "recorder_ready");
        })
    }
}

#[async_trait]
impl Recorder for SimRecorder {
    async fn begin_step(
        &self,
        step_index: usize,
        step_name: &str,
        ready: ReadyHandle,
    ) -> Result<()> {
        debug!(step = %step_index, name = %step_name, "recorder_init_requested");
        self.spawn_startup(step_index, ready);
        Ok(())
    }

    async fn end_step(&self, step_index: usize) -> Result<()> {
        info!(step = %step_index, "recorder_stopped");
        Ok(())
    }
}
