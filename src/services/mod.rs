//! Service layer - classification, recognition, and protocol orchestration
//!
//! - `classifier` - Raw sample to UP/DOWN/NEUTRAL with cooldown debounce
//! - `hold_tracker` - Symbol runs to quick/long events
//! - `sequence` - 4-symbol command pattern recognition
//! - `morse` - Gaze-driven Morse text entry
//! - `barrier` - Per-step setup readiness gate
//! - `pipeline` - Sample-to-event plumbing task
//! - `orchestrator` - The step protocol state machine

pub mod barrier;
pub mod classifier;
pub mod hold_tracker;
pub mod morse;
pub mod orchestrator;
pub mod pipeline;
pub mod sequence;
