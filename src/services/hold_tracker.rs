//! Run-duration tracking: classifies symbol runs as quick or long

use crate::domain::types::{GazeEvent, GazeSymbol};
use smallvec::SmallVec;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Tracks the current symbol run and emits classified events.
///
/// A run is a maximal stretch of identical accepted symbols. Each
/// configured threshold the run crosses emits exactly one `long` event at
/// the crossing; if the run ends without crossing any threshold, exactly
/// one `quick` event is emitted at run end. Quick and long are mutually
/// exclusive per run. NEUTRAL runs participate identically — their long
/// events drive the Morse control actions.
pub struct HoldTracker {
    /// Ascending long-hold thresholds; one long event fires per crossing
    thresholds: SmallVec<[Duration; 3]>,
    current: GazeSymbol,
    run_start: Option<Instant>,
    /// How many thresholds the current run has already crossed
    crossed: usize,
}

impl HoldTracker {
    pub fn new(thresholds: &[Duration]) -> Self {
        let mut thresholds: SmallVec<[Duration; 3]> = SmallVec::from_slice(thresholds);
        thresholds.sort();
        Self { thresholds, current: GazeSymbol::Neutral, run_start: None, crossed: 0 }
    }

    /// Observe one accepted symbol at `now`, returning any events it closes
    /// or crossings it produces. Call once per classified sample.
    pub fn observe(&mut self, symbol: GazeSymbol, now: Instant) -> SmallVec<[GazeEvent; 2]> {
        let mut events = SmallVec::new();

        let run_start = match self.run_start {
            Some(start) => start,
            None => {
                self.current = symbol;
                self.run_start = Some(now);
                return events;
            }
        };

        if symbol == self.current {
            let elapsed = now.duration_since(run_start);
            while self.crossed < self.thresholds.len() && elapsed >= self.thresholds[self.crossed]
            {
                let threshold = self.thresholds[self.crossed];
                debug!(
                    symbol = %self.current,
                    threshold_ms = %threshold.as_millis(),
                    "long_hold_crossed"
                );
                events.push(GazeEvent::long(self.current, run_start, threshold));
                self.crossed += 1;
            }
            return events;
        }

        // Run ended: a run that never went long is reported as quick
        if self.crossed == 0 {
            let duration = now.duration_since(run_start);
            debug!(
                symbol = %self.current,
                duration_ms = %duration.as_millis(),
                "quick_run_ended"
            );
            events.push(GazeEvent::quick(self.current, run_start, duration));
        }

        self.current = symbol;
        self.run_start = Some(now);
        self.crossed = 0;
        events
    }

    /// Discard the current run without emitting (step boundaries)
    pub fn reset(&mut self) {
        self.current = GazeSymbol::Neutral;
        self.run_start = None;
        self.crossed = 0;
    }

    pub fn current(&self) -> GazeSymbol {
        self.current
    }
}
