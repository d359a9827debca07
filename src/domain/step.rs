//! Step protocol data model: descriptors, per-step summaries, session report

use crate::domain::types::GazeSymbol;
use serde::Serialize;
use smallvec::SmallVec;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// A 4-symbol directional pattern matched by the sequence recognizer
pub type PatternSymbols = SmallVec<[GazeSymbol; 4]>;

/// What a step asks the participant to do
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Collect a gaze baseline over the collection window
    Calibration { collect: Duration },
    /// Count quick gazes in one direction until `target` is reached
    QuickGaze { direction: GazeSymbol, target: u32 },
    /// Count completed 4-symbol pattern repetitions
    Sequence { pattern: PatternSymbols, repetitions: u32 },
    /// Count sustained holds of `hold` in one direction
    LongHold { direction: GazeSymbol, hold: Duration, repetitions: u32 },
    /// Hold neutral for the full window; directional events are false positives
    NeutralHold { window: Duration },
    /// Morse text entry until the decoder submits
    MorseText,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Calibration { .. } => "calibration",
            StepKind::QuickGaze { direction: GazeSymbol::Up, .. } => "quick_up",
            StepKind::QuickGaze { .. } => "quick_down",
            StepKind::Sequence { .. } => "sequence",
            StepKind::LongHold { direction: GazeSymbol::Up, .. } => "long_up",
            StepKind::LongHold { .. } => "long_down",
            StepKind::NeutralHold { .. } => "neutral_hold",
            StepKind::MorseText => "morse_text",
        }
    }
}

/// One entry in the ordered test protocol. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct StepDescriptor {
    pub index: usize,
    pub name: &'static str,
    pub kind: StepKind,
    pub instruction: &'static str,
    /// Upper bound on the executing phase; the step is forcibly completed here
    pub max_duration: Duration,
}

fn pattern(symbols: [GazeSymbol; 4]) -> PatternSymbols {
    SmallVec::from_slice(&symbols)
}

/// The reference 14-step protocol.
pub fn reference_protocol() -> Vec<StepDescriptor> {
    use GazeSymbol::{Down, Up};

    let calibration = |index: usize, name: &'static str| StepDescriptor {
        index,
        name,
        kind: StepKind::Calibration { collect: Duration::from_secs(5) },
        instruction: "Look at the red dot and keep your head still. Wait for the beep to begin.",
        max_duration: Duration::from_secs(30),
    };

    vec![
        calibration(0, "Initial Calibration"),
        StepDescriptor {
            index: 1,
            name: "UP-DOWN-UP-DOWN Sequence",
            kind: StepKind::Sequence { pattern: pattern([Up, Down, Up, Down]), repetitions: 3 },
            instruction: "Look UP, then DOWN, then UP, then DOWN as fast as you can. \
                          Repeat 3 times. Wait for the beep to begin.",
            max_duration: Duration::from_secs(60),
        },
        StepDescriptor {
            index: 2,
            name: "Quick UP Gazes",
            kind: StepKind::QuickGaze { direction: Up, target: 5 },
            instruction: "Look UP 5 times as fast as you can. Wait for the beep to begin.",
            max_duration: Duration::from_secs(30),
        },
        calibration(3, "Calibration"),
        StepDescriptor {
            index: 4,
            name: "Quick DOWN Gazes",
            kind: StepKind::QuickGaze { direction: Down, target: 5 },
            instruction: "Look DOWN 5 times as fast as you can. Wait for the beep to begin.",
            max_duration: Duration::from_secs(30),
        },
        calibration(5, "Calibration"),
        StepDescriptor {
            index: 6,
            name: "DOWN-DOWN-UP-UP Sequence",
            kind: StepKind::Sequence { pattern: pattern([Down, Down, Up, Up]), repetitions: 3 },
            instruction: "Look DOWN twice, then UP twice as fast as you can. \
                          Repeat 3 times. Wait for the beep to begin.",
            max_duration: Duration::from_secs(60),
        },
        calibration(7, "Calibration"),
        StepDescriptor {
            index: 8,
            name: "DOWN-UP-DOWN-UP Sequence",
            kind: StepKind::Sequence { pattern: pattern([Down, Up, Down, Up]), repetitions: 3 },
            instruction: "Look DOWN, then UP, then DOWN, then UP as fast as you can. \
                          Repeat 3 times. Wait for the beep to begin.",
            max_duration: Duration::from_secs(60),
        },
        calibration(9, "Calibration"),
        StepDescriptor {
            index: 10,
            name: "Long DOWN Holds",
            kind: StepKind::LongHold {
                direction: Down,
                hold: Duration::from_secs(5),
                repetitions: 3,
            },
            instruction: "Look DOWN until you hear a beep, then return to neutral. \
                          Repeat 3 times. Wait for the beep to begin.",
            max_duration: Duration::from_secs(160),
        },
        calibration(11, "Calibration"),
        StepDescriptor {
            index: 12,
            name: "Long UP Holds",
            kind: StepKind::LongHold {
                direction: Up,
                hold: Duration::from_secs(5),
                repetitions: 3,
            },
            instruction: "Look UP until you hear a beep, then return to neutral. \
                          Repeat 3 times. Wait for the beep to begin.",
            max_duration: Duration::from_secs(160),
        },
        StepDescriptor {
            index: 13,
            name: "Neutral Hold",
            kind: StepKind::NeutralHold { window: Duration::from_secs(10) },
            instruction: "Look straight ahead and keep your eyes still. \
                          Wait for the beep to begin.",
            max_duration: Duration::from_secs(30),
        },
    ]
}

/// Step outcome after completion
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum StepOutcome {
    InProgress,
    /// Target count/duration reached
    Completed,
    /// Forcibly completed at max duration or cancelled
    Incomplete,
}

impl StepOutcome {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            StepOutcome::InProgress => "in_progress",
            StepOutcome::Completed => "completed",
            StepOutcome::Incomplete => "incomplete",
        }
    }
}

/// Orchestrator phases, recorded as transition timestamps in the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    StepStarting,
    AwaitingBarrier,
    Settling,
    Cueing,
    Executing,
    StepCompleting,
}

impl StepPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepPhase::StepStarting => "step_starting",
            StepPhase::AwaitingBarrier => "awaiting_barrier",
            StepPhase::Settling => "settling",
            StepPhase::Cueing => "cueing",
            StepPhase::Executing => "executing",
            StepPhase::StepCompleting => "step_completing",
        }
    }
}

/// A phase transition with its epoch-ms timestamp
#[derive(Debug, Clone)]
pub struct PhaseTransition {
    pub phase: StepPhase,
    pub ts: u64,
}

/// Summary record for one completed step
#[derive(Debug, Clone)]
pub struct StepSummary {
    pub sid: String, // UUIDv7 summary id
    pub index: usize,
    pub name: String,
    pub kind: String,
    pub outcome: StepOutcome,
    pub transitions: Vec<PhaseTransition>,
    /// Quick/long detections collected during the executing phase
    pub detection_count: u32,
    /// Recognized sequence commands during the executing phase
    pub command_count: u32,
    /// False directional detections (neutral-hold steps only)
    pub false_detections: u32,
    /// Whether the setup barrier force-satisfied on timeout
    pub setup_timed_out: bool,
    /// Mean gaze offset installed as the baseline (calibration steps only)
    pub baseline: Option<f64>,
    pub started_at: u64,
    pub ended_at: Option<u64>,
}

impl StepSummary {
    pub fn new(descriptor: &StepDescriptor) -> Self {
        Self {
            sid: new_uuid_v7(),
            index: descriptor.index,
            name: descriptor.name.to_string(),
            kind: descriptor.kind.as_str().to_string(),
            outcome: StepOutcome::InProgress,
            transitions: Vec::with_capacity(8),
            detection_count: 0,
            command_count: 0,
            false_detections: 0,
            setup_timed_out: false,
            baseline: None,
            started_at: epoch_ms(),
            ended_at: None,
        }
    }

    /// Record a phase transition at the current time
    pub fn mark(&mut self, phase: StepPhase) {
        self.transitions.push(PhaseTransition { phase, ts: epoch_ms() });
    }

    /// Mark the step as finished
    pub fn complete(&mut self, outcome: StepOutcome) {
        self.outcome = outcome;
        self.ended_at = Some(epoch_ms());
    }

    /// Convert to short-key JSON string
    pub fn to_json(&self) -> String {
        let mut obj = serde_json::Map::new();
        obj.insert("sid".to_string(), serde_json::Value::String(self.sid.clone()));
        obj.insert("step".to_string(), serde_json::Value::Number(self.index.into()));
        obj.insert("name".to_string(), serde_json::Value::String(self.name.clone()));
        obj.insert("kind".to_string(), serde_json::Value::String(self.kind.clone()));
        obj.insert(
            "out".to_string(),
            serde_json::Value::String(self.outcome.as_str().to_string()),
        );
        obj.insert("det".to_string(), serde_json::Value::Number(self.detection_count.into()));
        obj.insert("cmd".to_string(), serde_json::Value::Number(self.command_count.into()));
        if self.false_detections > 0 {
            obj.insert(
                "false_det".to_string(),
                serde_json::Value::Number(self.false_detections.into()),
            );
        }
        if self.setup_timed_out {
            obj.insert("setup_timeout".to_string(), serde_json::Value::Bool(true));
        }
        if let Some(baseline) = self.baseline {
            obj.insert("baseline".to_string(), serde_json::json!(baseline));
        }
        obj.insert("t0".to_string(), serde_json::Value::Number(self.started_at.into()));
        if let Some(ended) = self.ended_at {
            obj.insert("t1".to_string(), serde_json::Value::Number(ended.into()));
        }
        let transitions: Vec<serde_json::Value> = self
            .transitions
            .iter()
            .map(|t| {
                serde_json::json!({
                    "ph": t.phase.as_str(),
                    "ts": t.ts,
                })
            })
            .collect();
        obj.insert("tr".to_string(), serde_json::Value::Array(transitions));

        serde_json::Value::Object(obj).to_string()
    }
}

/// Final report assembled from all step summaries
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: String,
    pub started_at: u64,
    pub ended_at: u64,
    pub cancelled: bool,
    pub summaries: Vec<StepSummary>,
}

impl SessionReport {
    pub fn new(session_id: String, started_at: u64, summaries: Vec<StepSummary>) -> Self {
        Self { session_id, started_at, ended_at: epoch_ms(), cancelled: false, summaries }
    }

    pub fn completed_count(&self) -> usize {
        self.summaries.iter().filter(|s| s.outcome == StepOutcome::Completed).count()
    }

    pub fn incomplete_count(&self) -> usize {
        self.summaries.iter().filter(|s| s.outcome == StepOutcome::Incomplete).count()
    }

    pub fn to_json(&self) -> String {
        let steps: Vec<serde_json::Value> = self
            .summaries
            .iter()
            .map(|s| {
                serde_json::from_str(&s.to_json())
                    .unwrap_or(serde_json::Value::Null)
            })
            .collect();

        serde_json::json!({
            "session": self.session_id,
            "t0": self.started_at,
            "t1": self.ended_at,
            "cancelled": self.cancelled,
            "total": self.summaries.len(),
            "completed": self.completed_count(),
            "incomplete": self.incomplete_count(),
            "steps": steps,
        })
        .to_string()
    }
}
