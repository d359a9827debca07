//! Gaze sample sources
//!
//! A source pushes raw vertical-gaze samples into the pipeline channel at
//! its own cadence. The scripted source replays a fixed segment script at
//! 30 Hz for rig runs and tests.

use crate::domain::types::GazeSample;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Default sample cadence (30 Hz)
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(33);

/// Producer of raw gaze samples
#[async_trait]
pub trait GazeSource: Send {
    /// Push samples into `sample_tx` until the script ends or shutdown
    async fn run(
        &mut self,
        sample_tx: mpsc::Sender<GazeSample>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()>;
}

/// One stretch of constant gaze offset in a scripted run
#[derive(Debug, Clone, Copy)]
pub struct ScriptSegment {
    /// Signed offset from baseline, positive toward UP
    pub value: f64,
    pub duration: Duration,
}

impl ScriptSegment {
    pub fn new(value: f64, duration: Duration) -> Self {
        Self { value, duration }
    }
}

/// Replays a segment script as a steady sample stream
pub struct ScriptedGazeSource {
    segments: Vec<ScriptSegment>,
    sample_interval: Duration,
}

impl ScriptedGazeSource {
    pub fn new(segments: Vec<ScriptSegment>) -> Self {
        Self { segments, sample_interval: DEFAULT_SAMPLE_INTERVAL }
    }

    pub fn with_interval(segments: Vec<ScriptSegment>, sample_interval: Duration) -> Self {
        Self { segments, sample_interval }
    }
}

#[async_trait]
impl GazeSource for ScriptedGazeSource {
    async fn run(
        &mut self,
        sample_tx: mpsc::Sender<GazeSample>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        info!(
            segments = %self.segments.len(),
            interval_ms = %self.sample_interval.as_millis(),
            "gaze_source_started"
        );

        for (i, segment) in self.segments.iter().enumerate() {
            let samples = (segment.duration.as_millis() / self.sample_interval.as_millis())
                .max(1) as u64;
            debug!(segment = %i, value = %segment.value, samples = %samples, "segment_started");

            for _ in 0..samples {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("gaze_source_shutdown");
                            return Ok(());
                        }
                    }
                    _ = tokio::time::sleep(self.sample_interval) => {
                        let sample = GazeSample::new(segment.value, tokio::time::Instant::now());
                        if sample_tx.send(sample).await.is_err() {
                            debug!("gaze_sample_channel_closed");
                            return Ok(());
                        }
                    }
                }
            }
        }

        info!("gaze_source_script_finished");
        Ok(())
    }
}
