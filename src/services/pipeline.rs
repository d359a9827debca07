//! Sample-to-event pipeline task
//!
//! Owns the classifier and hold tracker, consuming raw samples from the
//! gaze source and publishing classified events to the orchestrator.

use crate::domain::types::{GazeEvent, GazeSample};
use crate::services::classifier::GazeClassifier;
use crate::services::hold_tracker::HoldTracker;
use smallvec::SmallVec;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

/// Control messages from the orchestrator
#[derive(Debug)]
pub enum PipelineControl {
    /// Drop classifier and run state at a step boundary, discarding any
    /// samples already queued
    Reset,
    /// Start accumulating raw gaze values for a baseline estimate
    BeginCalibration,
    /// Install the accumulated mean as the new baseline and reply with it
    /// (`None` when no samples arrived during the window)
    EndCalibration(oneshot::Sender<Option<f64>>),
}

/// Raw-value accumulator for one calibration window
#[derive(Default)]
struct CalibrationWindow {
    sum: f64,
    count: u32,
}

impl CalibrationWindow {
    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

/// Classification pipeline task state
pub struct GazePipeline {
    classifier: GazeClassifier,
    tracker: HoldTracker,
    /// Offset subtracted from every raw value before classification;
    /// replaced by the window mean on calibration
    baseline: f64,
    calibration: Option<CalibrationWindow>,
    sample_rx: mpsc::Receiver<GazeSample>,
    control_rx: mpsc::Receiver<PipelineControl>,
    event_tx: mpsc::Sender<GazeEvent>,
    shutdown: watch::Receiver<bool>,
}

impl GazePipeline {
    pub fn new(
        classifier: GazeClassifier,
        tracker: HoldTracker,
        sample_rx: mpsc::Receiver<GazeSample>,
        control_rx: mpsc::Receiver<PipelineControl>,
        event_tx: mpsc::Sender<GazeEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            classifier,
            tracker,
            baseline: 0.0,
            calibration: None,
            sample_rx,
            control_rx,
            event_tx,
            shutdown,
        }
    }

    /// Main loop: runs until shutdown or the sample channel closes.
    ///
    /// Control messages take priority over samples so a reset discards
    /// everything queued before it.
    pub async fn run(mut self) {
        info!("pipeline_started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("pipeline_shutdown");
                        return;
                    }
                }
                Some(control) = self.control_rx.recv() => {
                    match control {
                        PipelineControl::Reset => {
                            self.classifier.reset();
                            self.tracker.reset();
                            self.calibration = None;
                            while self.sample_rx.try_recv().is_ok() {}
                            debug!("pipeline_reset");
                        }
                        PipelineControl::BeginCalibration => {
                            self.calibration = Some(CalibrationWindow::default());
                            debug!("calibration_started");
                        }
                        PipelineControl::EndCalibration(reply) => {
                            let mean = self.calibration.take().and_then(|w| w.mean());
                            if let Some(mean) = mean {
                                self.baseline = mean;
                                info!(baseline = %self.baseline, "baseline_installed");
                            }
                            let _ = reply.send(mean);
                        }
                    }
                }
                sample = self.sample_rx.recv() => {
                    let Some(sample) = sample else {
                        info!("pipeline_sample_channel_closed");
                        return;
                    };
                    for event in self.process_sample(sample) {
                        if self.event_tx.send(event).await.is_err() {
                            info!("pipeline_event_channel_closed");
                            return;
                        }
                    }
                }
            }
        }
    }

    fn process_sample(&mut self, sample: GazeSample) -> SmallVec<[GazeEvent; 2]> {
        if let Some(window) = self.calibration.as_mut() {
            window.sum += sample.value;
            window.count += 1;
        }
        let adjusted = GazeSample::new(sample.value - self.baseline, sample.timestamp);
        let symbol = self.classifier.classify(adjusted);
        self.tracker.observe(symbol, sample.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{EventKind, GazeSymbol};
    use std::time::Duration;
    use tokio::time::Instant;

    fn spawn_pipeline() -> (
        mpsc::Sender<GazeSample>,
        mpsc::Sender<PipelineControl>,
        mpsc::Receiver<GazeEvent>,
        watch::Sender<bool>,
    ) {
        let classifier = GazeClassifier::new(0.012, 0.005, Duration::from_millis(200));
        let tracker = HoldTracker::new(&[Duration::from_secs(1), Duration::from_secs(3)]);
        let (sample_tx, sample_rx) = mpsc::channel(64);
        let (control_tx, control_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let pipeline = GazePipeline::new(
            classifier,
            tracker,
            sample_rx,
            control_rx,
            event_tx,
            shutdown_rx,
        );
        tokio::spawn(pipeline.run());
        (sample_tx, control_tx, event_rx, shutdown_tx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_up_run_produces_event() {
        let (sample_tx, _control_tx, mut event_rx, _shutdown) = spawn_pipeline();
        let t0 = Instant::now();

        // 300ms of UP, then back to neutral past the cooldown
        for i in 0..10 {
            let at = t0 + Duration::from_millis(33 * i);
            sample_tx.send(GazeSample::new(0.03, at)).await.unwrap();
        }
        for i in 10..20 {
            let at = t0 + Duration::from_millis(33 * i);
            sample_tx.send(GazeSample::new(0.0, at)).await.unwrap();
        }
        drop(sample_tx);

        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.symbol, GazeSymbol::Up);
        assert_eq!(event.kind, EventKind::Quick);
        assert!(event_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_neutral_produces_long_events() {
        let (sample_tx, _control_tx, mut event_rx, _shutdown) = spawn_pipeline();
        let t0 = Instant::now();

        // 3.3s of neutral at 30Hz
        for i in 0..100 {
            let at = t0 + Duration::from_millis(33 * i);
            sample_tx.send(GazeSample::new(0.0, at)).await.unwrap();
        }
        drop(sample_tx);

        let first = event_rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::Long);
        assert_eq!(first.symbol, GazeSymbol::Neutral);
        assert_eq!(first.duration, Duration::from_secs(1));

        let second = event_rx.recv().await.unwrap();
        assert_eq!(second.duration, Duration::from_secs(3));
        assert!(event_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_pending_run() {
        let (sample_tx, control_tx, mut event_rx, _shutdown) = spawn_pipeline();
        let t0 = Instant::now();

        for i in 0..10 {
            let at = t0 + Duration::from_millis(33 * i);
            sample_tx.send(GazeSample::new(0.03, at)).await.unwrap();
        }
        // Let the samples drain before the reset so ordering is deterministic
        tokio::time::sleep(Duration::from_millis(10)).await;
        control_tx.send(PipelineControl::Reset).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(sample_tx);

        // The UP run was discarded by the reset, so no quick event arrives
        assert!(event_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_queued_samples() {
        let (sample_tx, control_tx, mut event_rx, _shutdown) = spawn_pipeline();
        let t0 = Instant::now();

        // A full quick UP run is already queued when the reset lands; the
        // reset must win and none of those samples may produce an event.
        for i in 0..10 {
            let at = t0 + Duration::from_millis(33 * i);
            sample_tx.send(GazeSample::new(0.03, at)).await.unwrap();
        }
        for i in 10..20 {
            let at = t0 + Duration::from_millis(33 * i);
            sample_tx.send(GazeSample::new(0.0, at)).await.unwrap();
        }
        control_tx.send(PipelineControl::Reset).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(sample_tx);

        assert!(event_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_calibration_installs_mean_baseline() {
        let (sample_tx, control_tx, mut event_rx, _shutdown) = spawn_pipeline();
        let t0 = Instant::now();

        control_tx.send(PipelineControl::BeginCalibration).await.unwrap();
        // Constant drift of +0.02, which reads as UP until recalibrated
        for i in 0..10 {
            let at = t0 + Duration::from_millis(33 * i);
            sample_tx.send(GazeSample::new(0.02, at)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (reply_tx, reply_rx) = oneshot::channel();
        control_tx.send(PipelineControl::EndCalibration(reply_tx)).await.unwrap();
        let mean = reply_rx.await.unwrap().unwrap();
        assert!((mean - 0.02).abs() < 1e-9);

        // Post-calibration the same drifted value classifies as neutral
        control_tx.send(PipelineControl::Reset).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        for i in 0..20 {
            let at = t0 + Duration::from_secs(1) + Duration::from_millis(33 * i);
            sample_tx.send(GazeSample::new(0.02, at)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(sample_tx);

        assert!(event_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_calibration_window_replies_none() {
        let (_sample_tx, control_tx, _event_rx, _shutdown) = spawn_pipeline();

        control_tx.send(PipelineControl::BeginCalibration).await.unwrap();
        let (reply_tx, reply_rx) = oneshot::channel();
        control_tx.send(PipelineControl::EndCalibration(reply_tx)).await.unwrap();
        assert_eq!(reply_rx.await.unwrap(), None);
    }
}
