//! Per-sample gaze classification with threshold + cooldown debouncing

use crate::domain::types::{GazeSample, GazeSymbol};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Classifies raw gaze samples into UP/DOWN/NEUTRAL symbols.
///
/// Thresholds are asymmetric (down is more sensitive than up on real
/// faces). A symbol transition is only accepted once `cooldown` has
/// elapsed since the last accepted transition, which suppresses flapping
/// when the signal jitters around a threshold. Boundary-exact values
/// classify as NEUTRAL.
pub struct GazeClassifier {
    threshold_up: f64,
    threshold_down: f64,
    cooldown: Duration,
    current: GazeSymbol,
    last_transition: Option<Instant>,
}

impl GazeClassifier {
    pub fn new(threshold_up: f64, threshold_down: f64, cooldown: Duration) -> Self {
        Self {
            threshold_up,
            threshold_down,
            cooldown,
            current: GazeSymbol::Neutral,
            last_transition: None,
        }
    }

    /// Classify one sample, returning the accepted symbol for it.
    ///
    /// During cooldown the previously accepted symbol is held.
    pub fn classify(&mut self, sample: GazeSample) -> GazeSymbol {
        let raw = self.raw_symbol(sample.value);

        if raw == self.current {
            return self.current;
        }

        // Transition requested: only accept outside the cooldown window
        if let Some(last) = self.last_transition {
            if sample.timestamp.duration_since(last) < self.cooldown {
                return self.current;
            }
        }

        debug!(
            from = %self.current,
            to = %raw,
            value = %sample.value,
            "gaze_transition"
        );
        self.current = raw;
        self.last_transition = Some(sample.timestamp);
        self.current
    }

    fn raw_symbol(&self, value: f64) -> GazeSymbol {
        if value > self.threshold_up {
            GazeSymbol::Up
        } else if value < -self.threshold_down {
            GazeSymbol::Down
        } else {
            GazeSymbol::Neutral
        }
    }

    /// Reset to neutral, forgetting cooldown state (step boundaries)
    pub fn reset(&mut self) {
        self.current = GazeSymbol::Neutral;
        self.last_transition = None;
    }

    pub fn current(&self) -> GazeSymbol {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> GazeClassifier {
        GazeClassifier::new(0.012, 0.005, Duration::from_millis(200))
    }

    fn sample(value: f64, at: Instant) -> GazeSample {
        GazeSample::new(value, at)
    }

    #[test]
    fn test_threshold_classification() {
        let mut c = classifier();
        let t0 = Instant::now();

        assert_eq!(c.classify(sample(0.02, t0)), GazeSymbol::Up);
        assert_eq!(
            c.classify(sample(-0.01, t0 + Duration::from_millis(300))),
            GazeSymbol::Down
        );
        assert_eq!(
            c.classify(sample(0.001, t0 + Duration::from_millis(600))),
            GazeSymbol::Neutral
        );
    }

    #[test]
    fn test_boundary_exact_is_neutral() {
        let mut c = classifier();
        let t0 = Instant::now();

        assert_eq!(c.classify(sample(0.012, t0)), GazeSymbol::Neutral);
        assert_eq!(
            c.classify(sample(-0.005, t0 + Duration::from_millis(300))),
            GazeSymbol::Neutral
        );
    }

    #[test]
    fn test_cooldown_suppresses_flapping() {
        let mut c = classifier();
        let t0 = Instant::now();

        assert_eq!(c.classify(sample(0.02, t0)), GazeSymbol::Up);
        // Jitter back toward neutral inside the cooldown window: held at UP
        assert_eq!(
            c.classify(sample(0.0, t0 + Duration::from_millis(50))),
            GazeSymbol::Up
        );
        assert_eq!(
            c.classify(sample(0.02, t0 + Duration::from_millis(100))),
            GazeSymbol::Up
        );
        // Past the cooldown the transition is accepted
        assert_eq!(
            c.classify(sample(0.0, t0 + Duration::from_millis(250))),
            GazeSymbol::Neutral
        );
    }

    #[test]
    fn test_no_transitions_closer_than_cooldown() {
        let mut c = classifier();
        let t0 = Instant::now();

        // Alternate UP/DOWN every 50ms for 2s; accepted transitions must
        // never be closer together than the cooldown.
        let mut accepted: Vec<(GazeSymbol, Instant)> = Vec::new();
        let mut last = GazeSymbol::Neutral;
        for i in 0..40 {
            let at = t0 + Duration::from_millis(50 * i);
            let value = if i % 2 == 0 { 0.02 } else { -0.02 };
            let symbol = c.classify(sample(value, at));
            if symbol != last {
                accepted.push((symbol, at));
                last = symbol;
            }
        }

        for pair in accepted.windows(2) {
            let gap = pair[1].1.duration_since(pair[0].1);
            assert!(gap >= Duration::from_millis(200), "transition gap {gap:?}");
        }
    }

    #[test]
    fn test_matching_symbol_does_not_consume_cooldown() {
        let mut c = classifier();
        let t0 = Instant::now();

        assert_eq!(c.classify(sample(0.02, t0)), GazeSymbol::Up);
        // Staying UP for a while, then a legal transition right at cooldown
        assert_eq!(
            c.classify(sample(0.02, t0 + Duration::from_millis(150))),
            GazeSymbol::Up
        );
        assert_eq!(
            c.classify(sample(-0.02, t0 + Duration::from_millis(200))),
            GazeSymbol::Down
        );
    }

    #[test]
    fn test_reset() {
        let mut c = classifier();
        let t0 = Instant::now();
        c.classify(sample(0.02, t0));
        assert_eq!(c.current(), GazeSymbol::Up);

        c.reset();
        assert_eq!(c.current(), GazeSymbol::Neutral);
        // First transition after reset is accepted immediately
        assert_eq!(
            c.classify(sample(-0.02, t0 + Duration::from_millis(10))),
            GazeSymbol::Down
        );
    }
}
