//! Domain types for the gaze protocol rig
//!
//! - `types` - Gaze samples, classified events, commands, Morse actions
//! - `step` - Step protocol descriptors, summaries, session report

pub mod step;
pub mod types;
