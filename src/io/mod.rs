//! IO layer - collaborator capabilities and report output
//!
//! - `gaze_source` - Raw sample producers (scripted 30 Hz replay)
//! - `recorder` - Per-step recorder capability + simulated variant
//! - `speaker` - Instruction speech and audio cue capabilities
//! - `executor` - Command dispatch capability
//! - `report` - JSONL step summaries and the final session report

pub mod executor;
pub mod gaze_source;
pub mod recorder;
pub mod report;
pub mod speaker;
