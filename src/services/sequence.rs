//! Four-symbol command pattern recognition over quick gaze events

use crate::domain::types::{CommandId, GazeEvent, GazeSymbol};
use smallvec::SmallVec;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use GazeSymbol::{Down as D, Up as U};

/// The four recognized command patterns, checked in catalogue order
const PATTERNS: [([GazeSymbol; 4], CommandId); 4] = [
    ([U, D, U, D], CommandId::ModeSwitch),
    ([D, U, D, U], CommandId::Enter),
    ([U, U, D, D], CommandId::Escape),
    ([D, D, U, U], CommandId::Windows),
];

/// Look up the command a 4-symbol pattern maps to, if any
pub fn command_for_pattern(pattern: &[GazeSymbol]) -> Option<CommandId> {
    PATTERNS
        .iter()
        .find(|(p, _)| p.as_slice() == pattern)
        .map(|&(_, command)| command)
}

/// Recognizes 4-symbol command patterns in the quick-event stream.
///
/// Only quick directional events participate; long events and NEUTRAL are
/// ignored. The recognizer keeps the last four accepted symbols, dropping
/// any prefix older than `max_gap` relative to the newest event, and fires
/// a command as soon as the window matches a catalogue entry. The window
/// is cleared on a match so one gesture can never fire two commands.
pub struct SequenceRecognizer {
    max_gap: Duration,
    window: SmallVec<[(GazeSymbol, Instant); 4]>,
}

impl SequenceRecognizer {
    pub fn new(max_gap: Duration) -> Self {
        Self { max_gap, window: SmallVec::new() }
    }

    /// Feed one classified gaze event; returns a command if the event
    /// completes a pattern.
    pub fn on_event(&mut self, event: &GazeEvent) -> Option<CommandId> {
        if !event.is_quick_directional() {
            return None;
        }

        let at = event.start + event.duration;
        // Consecutive window entries are always within max_gap of each
        // other, so one check against the newest entry suffices.
        if let Some(&(_, last_at)) = self.window.last() {
            if at.duration_since(last_at) > self.max_gap {
                debug!(dropped = %self.window.len(), "sequence_window_stale");
                self.window.clear();
            }
        }

        if self.window.len() == 4 {
            self.window.remove(0);
        }
        self.window.push((event.symbol, at));

        if self.window.len() < 4 {
            return None;
        }

        let symbols: SmallVec<[GazeSymbol; 4]> =
            self.window.iter().map(|(s, _)| *s).collect();
        for (pattern, command) in PATTERNS {
            if symbols.as_slice() == pattern {
                info!(command = %command, "sequence_matched");
                self.window.clear();
                return Some(command);
            }
        }
        debug!(len = %self.window.len(), "sequence_no_match");
        None
    }

    /// Clear the symbol window (step boundaries)
    pub fn reset(&mut self) {
        self.window.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.window.len()
    }
}
