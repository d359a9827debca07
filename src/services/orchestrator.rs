//! Step orchestrator - drives the test protocol from start to finish
//!
//! Each step runs through a fixed phase sequence: reset per-step state,
//! request recorder init then instruction speech (in parallel), await the
//! readiness barrier, settle, play the start cue, execute the step's
//! detection logic bounded by its max duration, then stop the recorder and
//! persist the summary. Exactly one summary is produced per started step.

use crate::domain::step::{
    epoch_ms, new_uuid_v7, SessionReport, StepDescriptor, StepKind, StepOutcome, StepPhase,
    StepSummary,
};
use crate::domain::types::{EventKind, GazeEvent, MorseAction};
use crate::io::executor::CommandExecutor;
use crate::io::recorder::Recorder;
use crate::io::report::ReportWriter;
use crate::io::speaker::{CuePlayer, Speaker};
use crate::services::barrier::ReadinessBarrier;
use crate::services::morse::MorseDecoder;
use crate::services::pipeline::PipelineControl;
use crate::services::sequence::{command_for_pattern, SequenceRecognizer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Orchestrator timing knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between barrier resolution and the start cue
    pub settle: Duration,
    /// Pause between the start cue and the executing phase
    pub post_cue: Duration,
    pub barrier_poll: Duration,
    pub barrier_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            post_cue: Duration::from_millis(500),
            barrier_poll: Duration::from_millis(100),
            barrier_timeout: Duration::from_secs(10),
        }
    }
}

/// Drives the ordered step protocol over the classified event stream
pub struct StepOrchestrator {
    config: OrchestratorConfig,
    steps: Vec<StepDescriptor>,
    recorder: Arc<dyn Recorder>,
    speaker: Arc<dyn Speaker>,
    cue: Arc<dyn CuePlayer>,
    executor: Arc<dyn CommandExecutor>,
    writer: ReportWriter,
    sequence: SequenceRecognizer,
    morse: MorseDecoder,
    event_rx: mpsc::Receiver<GazeEvent>,
    pipeline_tx: mpsc::Sender<PipelineControl>,
    shutdown: watch::Receiver<bool>,
}

impl StepOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        steps: Vec<StepDescriptor>,
        recorder: Arc<dyn Recorder>,
        speaker: Arc<dyn Speaker>,
        cue: Arc<dyn CuePlayer>,
        executor: Arc<dyn CommandExecutor>,
        writer: ReportWriter,
        sequence: SequenceRecognizer,
        morse: MorseDecoder,
        event_rx: mpsc::Receiver<GazeEvent>,
        pipeline_tx: mpsc::Sender<PipelineControl>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            steps,
            recorder,
            speaker,
            cue,
            executor,
            writer,
            sequence,
            morse,
            event_rx,
            pipeline_tx,
            shutdown,
        }
    }

    /// Run the whole protocol, returning the final session report.
    ///
    /// Steps advance unconditionally; only external cancellation ends the
    /// session before the last step.
    pub async fn run(mut self) -> SessionReport {
        let session_id = new_uuid_v7();
        let started_at = epoch_ms();
        info!(session = %session_id, steps = %self.steps.len(), "session_started");

        let steps = std::mem::take(&mut self.steps);
        let mut summaries = Vec::with_capacity(steps.len());
        let mut cancelled = false;

        for step in &steps {
            let (summary, step_cancelled) = self.run_step(step).await;
            self.writer.write_summary(&summary);
            summaries.push(summary);
            if step_cancelled {
                cancelled = true;
                break;
            }
        }

        let mut report = SessionReport::new(session_id, started_at, summaries);
        report.cancelled = cancelled;
        self.writer.write_report(&report);
        info!(
            session = %report.session_id,
            completed = %report.completed_count(),
            incomplete = %report.incomplete_count(),
            cancelled = %report.cancelled,
            "session_finished"
        );
        report
    }

    /// Run one step through its full phase sequence.
    /// Returns the summary and whether cancellation was observed.
    async fn run_step(&mut self, step: &StepDescriptor) -> (StepSummary, bool) {
        let mut summary = StepSummary::new(step);
        summary.mark(StepPhase::StepStarting);
        info!(
            step = %step.index,
            name = %step.name,
            kind = %step.kind.as_str(),
            "step_started"
        );

        // Fresh per-step detection state
        self.sequence.reset();
        self.morse.deactivate();
        if self.pipeline_tx.send(PipelineControl::Reset).await.is_err() {
            warn!(step = %step.index, "pipeline_control_channel_closed");
        }
        while self.event_rx.try_recv().is_ok() {}

        // Recorder init is requested before speech so the slow half of the
        // setup runs for the whole speech duration.
        let barrier = ReadinessBarrier::new();
        if let Err(e) = self
            .recorder
            .begin_step(step.index, step.name, barrier.recorder_handle())
            .await
        {
            warn!(step = %step.index, error = %e, "recorder_init_failed");
            barrier.recorder_handle().mark_ready();
        }
        if let Err(e) = self.speaker.speak(step.instruction, barrier.speech_handle()).await {
            warn!(step = %step.index, error = %e, "speech_failed");
            barrier.speech_handle().mark_ready();
        }

        summary.mark(StepPhase::AwaitingBarrier);
        let mut shutdown = self.shutdown.clone();
        let clean = tokio::select! {
            clean = barrier.wait(self.config.barrier_poll, self.config.barrier_timeout) => clean,
            _ = cancelled(&mut shutdown) => {
                return self.abort_step(step, summary).await;
            }
        };
        if !clean {
            summary.setup_timed_out = true;
        }

        summary.mark(StepPhase::Settling);
        tokio::select! {
            _ = tokio::time::sleep(self.config.settle) => {}
            _ = cancelled(&mut shutdown) => {
                return self.abort_step(step, summary).await;
            }
        }

        summary.mark(StepPhase::Cueing);
        if let Err(e) = self.cue.play().await {
            warn!(step = %step.index, error = %e, "cue_failed");
        }
        tokio::select! {
            _ = tokio::time::sleep(self.config.post_cue) => {}
            _ = cancelled(&mut shutdown) => {
                return self.abort_step(step, summary).await;
            }
        }

        // Events classified during setup must not count as detections:
        // reset the run state and drop anything already queued.
        if self.pipeline_tx.send(PipelineControl::Reset).await.is_err() {
            warn!(step = %step.index, "pipeline_control_channel_closed");
        }
        while self.event_rx.try_recv().is_ok() {}

        summary.mark(StepPhase::Executing);
        if matches!(step.kind, StepKind::MorseText) {
            self.morse.activate();
        }
        if matches!(step.kind, StepKind::Calibration { .. })
            && self.pipeline_tx.send(PipelineControl::BeginCalibration).await.is_err()
        {
            warn!(step = %step.index, "pipeline_control_channel_closed");
        }
        let outcome = self.execute_step(step, &mut summary).await;

        summary.mark(StepPhase::StepCompleting);
        if let Err(e) = self.recorder.end_step(step.index).await {
            warn!(step = %step.index, error = %e, "recorder_stop_failed");
        }
        summary.complete(outcome);
        info!(
            step = %step.index,
            outcome = %outcome.as_str(),
            det = %summary.detection_count,
            cmd = %summary.command_count,
            "step_finished"
        );
        (summary, *self.shutdown.borrow())
    }

    /// Close out a step that was interrupted by cancellation
    async fn abort_step(
        &mut self,
        step: &StepDescriptor,
        mut summary: StepSummary,
    ) -> (StepSummary, bool) {
        warn!(step = %step.index, "step_cancelled");
        if let Err(e) = self.recorder.end_step(step.index).await {
            warn!(step = %step.index, error = %e, "recorder_stop_failed");
        }
        summary.complete(StepOutcome::Incomplete);
        (summary, true)
    }

    /// The executing phase: consume classified events until the step's
    /// success criterion or its max duration.
    async fn execute_step(
        &mut self,
        step: &StepDescriptor,
        summary: &mut StepSummary,
    ) -> StepOutcome {
        let now = Instant::now();
        let deadline = now + step.max_duration;
        // Window steps succeed by simply outlasting their window
        let window_end = match &step.kind {
            StepKind::Calibration { collect } => Some(now + *collect),
            StepKind::NeutralHold { window } => Some(now + *window),
            _ => None,
        };
        let expected_command = match &step.kind {
            StepKind::Sequence { pattern, .. } => command_for_pattern(pattern),
            _ => None,
        };
        let mut completed_reps: u32 = 0;

        let Self {
            ref mut event_rx,
            ref mut sequence,
            ref mut morse,
            ref executor,
            ref cue,
            ref pipeline_tx,
            ref shutdown,
            ..
        } = *self;
        let mut shutdown = shutdown.clone();

        loop {
            tokio::select! {
                _ = cancelled(&mut shutdown) => {
                    warn!(step = %step.index, "execution_cancelled");
                    return StepOutcome::Incomplete;
                }
                _ = tokio::time::sleep_until(window_end.unwrap_or(deadline)), if window_end.is_some() => {
                    if matches!(step.kind, StepKind::Calibration { .. }) {
                        let (reply_tx, reply_rx) = oneshot::channel();
                        if pipeline_tx.send(PipelineControl::EndCalibration(reply_tx)).await.is_ok() {
                            match reply_rx.await {
                                Ok(Some(mean)) => {
                                    summary.baseline = Some(mean);
                                    info!(step = %step.index, baseline = %mean, "baseline_recorded");
                                }
                                Ok(None) => warn!(step = %step.index, "calibration_window_empty"),
                                Err(_) => warn!(step = %step.index, "calibration_reply_dropped"),
                            }
                        }
                    }
                    return StepOutcome::Completed;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(
                        step = %step.index,
                        max_ms = %step.max_duration.as_millis(),
                        "execution_timeout"
                    );
                    return StepOutcome::Incomplete;
                }
                Some(event) = event_rx.recv() => {
                    debug!(
                        step = %step.index,
                        symbol = %event.symbol,
                        kind = %event.kind.as_str(),
                        duration_ms = %event.duration.as_millis(),
                        "step_event"
                    );
                    match &step.kind {
                        StepKind::Calibration { .. } => {
                            if event.symbol.is_directional() {
                                summary.detection_count += 1;
                            }
                        }
                        StepKind::QuickGaze { direction, target } => {
                            if event.kind == EventKind::Quick && event.symbol == *direction {
                                summary.detection_count += 1;
                                if summary.detection_count >= *target {
                                    return StepOutcome::Completed;
                                }
                            }
                        }
                        StepKind::Sequence { repetitions, .. } => {
                            if event.is_quick_directional() {
                                summary.detection_count += 1;
                            }
                            if let Some(command) = sequence.on_event(&event) {
                                summary.command_count += 1;
                                if let Err(e) = executor.execute(command).await {
                                    warn!(command = %command, error = %e, "command_execute_failed");
                                }
                                if Some(command) == expected_command {
                                    completed_reps += 1;
                                    if completed_reps >= *repetitions {
                                        return StepOutcome::Completed;
                                    }
                                }
                            }
                        }
                        StepKind::LongHold { direction, hold, repetitions } => {
                            if event.kind == EventKind::Long
                                && event.symbol == *direction
                                && event.duration >= *hold
                            {
                                summary.detection_count += 1;
                                info!(
                                    step = %step.index,
                                    rep = %summary.detection_count,
                                    "hold_completed"
                                );
                                // Progress beep after each completed hold
                                if let Err(e) = cue.play().await {
                                    warn!(step = %step.index, error = %e, "cue_failed");
                                }
                                if summary.detection_count >= *repetitions {
                                    return StepOutcome::Completed;
                                }
                            }
                        }
                        StepKind::NeutralHold { .. } => {
                            if event.symbol.is_directional() {
                                summary.false_detections += 1;
                                warn!(
                                    step = %step.index,
                                    symbol = %event.symbol,
                                    "false_detection"
                                );
                            }
                        }
                        StepKind::MorseText => {
                            if event.is_quick_directional() {
                                summary.detection_count += 1;
                            }
                            for action in morse.on_event(&event) {
                                if let MorseAction::Submit(text) = action {
                                    info!(step = %step.index, text = %text, "text_submitted");
                                    return StepOutcome::Completed;
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Resolves once the shutdown flag flips to true; never resolves if the
/// sender is gone without having flipped it.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
