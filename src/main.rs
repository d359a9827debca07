//! Gaze rig - gaze-event classification and test protocol orchestration
//!
//! Runs the reference 14-step protocol against a scripted gaze source,
//! with simulated recorder/speech/cue collaborators, and writes step
//! summaries plus a final session report.
//!
//! Module structure:
//! - `domain/` - Core types (samples, events, steps, summaries)
//! - `io/` - Collaborator capabilities and report output
//! - `services/` - Classification, recognition, orchestration
//! - `infra/` - Configuration

use clap::Parser;
use gaze_rig::domain::step::{reference_protocol, StepDescriptor, StepKind};
use gaze_rig::domain::types::GazeSymbol;
use gaze_rig::infra::Config;
use gaze_rig::io::executor::LoggingExecutor;
use gaze_rig::io::gaze_source::{GazeSource, ScriptSegment, ScriptedGazeSource};
use gaze_rig::io::recorder::SimRecorder;
use gaze_rig::io::report::ReportWriter;
use gaze_rig::io::speaker::{SimCuePlayer, SimSpeaker};
use gaze_rig::services::classifier::GazeClassifier;
use gaze_rig::services::hold_tracker::HoldTracker;
use gaze_rig::services::morse::MorseDecoder;
use gaze_rig::services::orchestrator::{OrchestratorConfig, StepOrchestrator};
use gaze_rig::services::pipeline::GazePipeline;
use gaze_rig::services::sequence::SequenceRecognizer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Gaze rig - scripted gaze protocol test runner
#[derive(Parser, Debug)]
#[command(name = "gaze-rig", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

const UP_VALUE: f64 = 0.03;
const DOWN_VALUE: f64 = -0.03;

fn segment(symbol: GazeSymbol, duration: Duration) -> ScriptSegment {
    let value = match symbol {
        GazeSymbol::Up => UP_VALUE,
        GazeSymbol::Down => DOWN_VALUE,
        GazeSymbol::Neutral => 0.0,
    };
    ScriptSegment::new(value, duration)
}

/// Build a gaze script that walks the whole protocol.
///
/// Each step gets a generous neutral lead to cover its setup phases, then
/// the activity its success criterion asks for. Timing is approximate;
/// steps that drift out of alignment simply time out and the session
/// still completes.
fn demo_script(steps: &[StepDescriptor]) -> Vec<ScriptSegment> {
    use GazeSymbol::Neutral;

    let mut script = Vec::new();
    for step in steps {
        // Setup: speech (word count x 600ms), settle, cue, post-cue pause
        let words = step.instruction.split_whitespace().count() as u64;
        script.push(segment(Neutral, Duration::from_millis(600 * words + 3000)));

        match &step.kind {
            StepKind::Calibration { collect } => {
                script.push(segment(Neutral, *collect + Duration::from_secs(1)));
            }
            StepKind::QuickGaze { direction, target } => {
                for _ in 0..*target {
                    script.push(segment(*direction, Duration::from_millis(400)));
                    script.push(segment(Neutral, Duration::from_millis(400)));
                }
            }
            StepKind::Sequence { pattern, repetitions } => {
                for _ in 0..*repetitions {
                    for symbol in pattern {
                        script.push(segment(*symbol, Duration::from_millis(350)));
                        script.push(segment(Neutral, Duration::from_millis(350)));
                    }
                    script.push(segment(Neutral, Duration::from_secs(1)));
                }
            }
            StepKind::LongHold { direction, hold, repetitions } => {
                for _ in 0..*repetitions {
                    script.push(segment(*direction, *hold + Duration::from_millis(600)));
                    script.push(segment(Neutral, Duration::from_millis(1500)));
                }
            }
            StepKind::NeutralHold { window } => {
                script.push(segment(Neutral, *window + Duration::from_secs(1)));
            }
            StepKind::MorseText => {
                // Not part of the reference protocol; leave the decoder idle
                script.push(segment(Neutral, Duration::from_secs(5)));
            }
        }
    }
    script
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("gaze-rig starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        threshold_up = %config.threshold_up(),
        threshold_down = %config.threshold_down(),
        cooldown_ms = %config.cooldown().as_millis(),
        submit_hold_ms = %config.submit_hold().as_millis(),
        barrier_timeout_ms = %config.barrier_timeout().as_millis(),
        summaries_file = %config.summaries_file(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Channels: source -> pipeline -> orchestrator (bounded for backpressure)
    let (sample_tx, sample_rx) = mpsc::channel(1024);
    let (control_tx, control_rx) = mpsc::channel(8);
    let (event_tx, event_rx) = mpsc::channel(256);

    // Start the classification pipeline
    let classifier =
        GazeClassifier::new(config.threshold_up(), config.threshold_down(), config.cooldown());
    let tracker = HoldTracker::new(&config.long_thresholds());
    let pipeline = GazePipeline::new(
        classifier,
        tracker,
        sample_rx,
        control_rx,
        event_tx,
        shutdown_rx.clone(),
    );
    tokio::spawn(pipeline.run());

    // Start the scripted gaze source
    let steps = reference_protocol();
    let mut source =
        ScriptedGazeSource::with_interval(demo_script(&steps), config.sample_interval());
    let source_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) = source.run(sample_tx, source_shutdown).await {
            tracing::error!(error = %e, "gaze_source_error");
        }
    });

    // Simulated collaborators
    let recorder: Arc<dyn gaze_rig::io::recorder::Recorder> =
        Arc::new(SimRecorder::new(config.recorder_startup()));
    let speaker: Arc<dyn gaze_rig::io::speaker::Speaker> =
        Arc::new(SimSpeaker::new(config.speech_per_word(), config.speech_min()));
    let cue: Arc<dyn gaze_rig::io::speaker::CuePlayer> =
        Arc::new(SimCuePlayer::new(config.cue_duration()));
    let executor: Arc<dyn gaze_rig::io::executor::CommandExecutor> = Arc::new(LoggingExecutor);
    let writer = ReportWriter::new(config.summaries_file(), config.report_file());

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run the protocol to completion
    let orchestrator = StepOrchestrator::new(
        OrchestratorConfig {
            settle: config.settle(),
            post_cue: config.post_cue(),
            barrier_poll: config.barrier_poll(),
            barrier_timeout: config.barrier_timeout(),
        },
        steps,
        recorder,
        speaker,
        cue,
        executor,
        writer,
        SequenceRecognizer::new(config.sequence_max_gap()),
        MorseDecoder::new(config.submit_hold()),
        event_rx,
        control_tx,
        shutdown_rx,
    );
    let report = orchestrator.run().await;

    info!(
        completed = %report.completed_count(),
        incomplete = %report.incomplete_count(),
        "gaze-rig shutdown complete"
    );
    Ok(())
}
