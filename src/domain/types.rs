//! Shared types for the gaze protocol rig

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Classified vertical gaze direction for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GazeSymbol {
    Up,
    Down,
    Neutral,
}

impl GazeSymbol {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            GazeSymbol::Up => "UP",
            GazeSymbol::Down => "DOWN",
            GazeSymbol::Neutral => "NEUTRAL",
        }
    }

    /// True for UP/DOWN, false for NEUTRAL
    #[inline]
    pub fn is_directional(&self) -> bool {
        !matches!(self, GazeSymbol::Neutral)
    }
}

impl std::fmt::Display for GazeSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GazeSymbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(GazeSymbol::Up),
            "DOWN" => Ok(GazeSymbol::Down),
            "NEUTRAL" => Ok(GazeSymbol::Neutral),
            other => Err(format!("unknown gaze symbol: {other}")),
        }
    }
}

/// One raw vertical-gaze measurement from the detector.
///
/// `value` is the signed offset from the calibrated baseline, positive
/// toward UP, expressed as a fraction of face height. Not retained beyond
/// classification.
#[derive(Debug, Clone, Copy)]
pub struct GazeSample {
    pub value: f64,
    pub timestamp: Instant,
}

impl GazeSample {
    #[inline]
    pub fn new(value: f64, timestamp: Instant) -> Self {
        Self { value, timestamp }
    }
}

/// Whether a gaze run ended before or crossed a long-hold threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Run ended before any long threshold; classified at run end
    Quick,
    /// Run crossed a configured threshold; classified at the crossing
    Long,
}

impl EventKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Quick => "quick",
            EventKind::Long => "long",
        }
    }
}

/// A classified gaze run, emitted by the hold tracker.
///
/// A quick event carries the full run duration. A long event carries the
/// elapsed duration at the threshold crossing, so a single run may emit
/// one long event per configured threshold (never two for the same one).
#[derive(Debug, Clone, Copy)]
pub struct GazeEvent {
    pub symbol: GazeSymbol,
    pub kind: EventKind,
    pub start: Instant,
    pub duration: Duration,
}

impl GazeEvent {
    pub fn quick(symbol: GazeSymbol, start: Instant, duration: Duration) -> Self {
        Self { symbol, kind: EventKind::Quick, start, duration }
    }

    pub fn long(symbol: GazeSymbol, start: Instant, duration: Duration) -> Self {
        Self { symbol, kind: EventKind::Long, start, duration }
    }

    #[inline]
    pub fn is_quick_directional(&self) -> bool {
        self.kind == EventKind::Quick && self.symbol.is_directional()
    }
}

/// Command fired when a 4-symbol sequence pattern completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommandId {
    ModeSwitch,
    Enter,
    Escape,
    Windows,
}

impl CommandId {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandId::ModeSwitch => "mode_switch",
            CommandId::Enter => "enter",
            CommandId::Escape => "escape",
            CommandId::Windows => "windows",
        }
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action produced by the Morse decoder for one incoming gaze event
#[derive(Debug, Clone, PartialEq)]
pub enum MorseAction {
    /// A dot or dash was appended to the pending-letter buffer
    Symbol(char),
    /// Pending buffer resolved to a character and appended to the text
    Letter(char),
    /// Pending buffer had no table entry; placeholder appended
    Unmapped(String),
    /// Literal space appended to the text
    Space,
    /// Last decoded character removed
    Backspace,
    /// Pending buffer discarded without decoding
    ClearPending,
    /// Six-dot command: pending buffer and decoded text both cleared
    ClearAll,
    /// Text finalized; decoder deactivated
    Submit(String),
}

impl MorseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MorseAction::Symbol(_) => "symbol",
            MorseAction::Letter(_) => "letter",
            MorseAction::Unmapped(_) => "unmapped",
            MorseAction::Space => "space",
            MorseAction::Backspace => "backspace",
            MorseAction::ClearPending => "clear_pending",
            MorseAction::ClearAll => "clear_all",
            MorseAction::Submit(_) => "submit",
        }
    }
}
