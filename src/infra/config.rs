//! Configuration loading from TOML files
//!
//! The binary picks the file via its --config flag (default
//! config/dev.toml); a missing or malformed file falls back to the
//! built-in defaults.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// UP threshold on the signed baseline offset (fraction of face height)
    #[serde(default = "default_threshold_up")]
    pub threshold_up: f64,
    /// DOWN threshold; more sensitive than UP on real faces
    #[serde(default = "default_threshold_down")]
    pub threshold_down: f64,
    /// Minimum spacing between accepted symbol transitions
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Sample cadence of the gaze source (30 Hz)
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Hold requirement for the long-hold test steps
    #[serde(default = "default_long_hold_ms")]
    pub long_hold_ms: u64,
}

fn default_threshold_up() -> f64 {
    0.012
}

fn default_threshold_down() -> f64 {
    0.005
}

fn default_cooldown_ms() -> u64 {
    200
}

fn default_sample_interval_ms() -> u64 {
    33
}

fn default_long_hold_ms() -> u64 {
    5000
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold_up: default_threshold_up(),
            threshold_down: default_threshold_down(),
            cooldown_ms: default_cooldown_ms(),
            sample_interval_ms: default_sample_interval_ms(),
            long_hold_ms: default_long_hold_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MorseConfig {
    /// Neutral hold that commits the pending buffer as a letter
    #[serde(default = "default_letter_hold_ms")]
    pub letter_hold_ms: u64,
    /// Neutral hold that submits the decoded text
    #[serde(default = "default_submit_hold_ms")]
    pub submit_hold_ms: u64,
}

fn default_letter_hold_ms() -> u64 {
    1000
}

fn default_submit_hold_ms() -> u64 {
    3000
}

impl Default for MorseConfig {
    fn default() -> Self {
        Self {
            letter_hold_ms: default_letter_hold_ms(),
            submit_hold_ms: default_submit_hold_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SequenceConfig {
    /// Maximum spacing between consecutive symbols of one pattern
    #[serde(default = "default_max_gap_ms")]
    pub max_gap_ms: u64,
}

fn default_max_gap_ms() -> u64 {
    2000
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self { max_gap_ms: default_max_gap_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepsConfig {
    /// Pause between barrier resolution and the start cue
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Pause between the start cue and the executing phase
    #[serde(default = "default_post_cue_ms")]
    pub post_cue_ms: u64,
    #[serde(default = "default_barrier_poll_ms")]
    pub barrier_poll_ms: u64,
    #[serde(default = "default_barrier_timeout_ms")]
    pub barrier_timeout_ms: u64,
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_post_cue_ms() -> u64 {
    500
}

fn default_barrier_poll_ms() -> u64 {
    100
}

fn default_barrier_timeout_ms() -> u64 {
    10000
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            post_cue_ms: default_post_cue_ms(),
            barrier_poll_ms: default_barrier_poll_ms(),
            barrier_timeout_ms: default_barrier_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Simulated speech time per instruction word
    #[serde(default = "default_speech_ms_per_word")]
    pub speech_ms_per_word: u64,
    /// Floor on simulated speech time
    #[serde(default = "default_speech_min_ms")]
    pub speech_min_ms: u64,
    /// Start/progress beep length
    #[serde(default = "default_cue_ms")]
    pub cue_ms: u64,
}

fn default_speech_ms_per_word() -> u64 {
    600
}

fn default_speech_min_ms() -> u64 {
    1000
}

fn default_cue_ms() -> u64 {
    300
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            speech_ms_per_word: default_speech_ms_per_word(),
            speech_min_ms: default_speech_min_ms(),
            cue_ms: default_cue_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// Simulated recorder startup time
    #[serde(default = "default_recorder_startup_ms")]
    pub startup_ms: u64,
}

fn default_recorder_startup_ms() -> u64 {
    500
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self { startup_ms: default_recorder_startup_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// File path for step summaries (JSONL format)
    #[serde(default = "default_summaries_file")]
    pub summaries_file: String,
    /// File path for the final session report (JSON)
    #[serde(default = "default_report_file")]
    pub report_file: String,
}

fn default_summaries_file() -> String {
    "out/summaries.jsonl".to_string()
}

fn default_report_file() -> String {
    "out/report.json".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            summaries_file: default_summaries_file(),
            report_file: default_report_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub morse: MorseConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
    #[serde(default)]
    pub steps: StepsConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    threshold_up: f64,
    threshold_down: f64,
    cooldown_ms: u64,
    sample_interval_ms: u64,
    long_hold_ms: u64,
    letter_hold_ms: u64,
    submit_hold_ms: u64,
    sequence_max_gap_ms: u64,
    settle_ms: u64,
    post_cue_ms: u64,
    barrier_poll_ms: u64,
    barrier_timeout_ms: u64,
    speech_ms_per_word: u64,
    speech_min_ms: u64,
    cue_ms: u64,
    recorder_startup_ms: u64,
    summaries_file: String,
    report_file: String,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        Self {
            threshold_up: toml_config.detection.threshold_up,
            threshold_down: toml_config.detection.threshold_down,
            cooldown_ms: toml_config.detection.cooldown_ms,
            sample_interval_ms: toml_config.detection.sample_interval_ms,
            long_hold_ms: toml_config.detection.long_hold_ms,
            letter_hold_ms: toml_config.morse.letter_hold_ms,
            submit_hold_ms: toml_config.morse.submit_hold_ms,
            sequence_max_gap_ms: toml_config.sequence.max_gap_ms,
            settle_ms: toml_config.steps.settle_ms,
            post_cue_ms: toml_config.steps.post_cue_ms,
            barrier_poll_ms: toml_config.steps.barrier_poll_ms,
            barrier_timeout_ms: toml_config.steps.barrier_timeout_ms,
            speech_ms_per_word: toml_config.audio.speech_ms_per_word,
            speech_min_ms: toml_config.audio.speech_min_ms,
            cue_ms: toml_config.audio.cue_ms,
            recorder_startup_ms: toml_config.recorder.startup_ms,
            summaries_file: toml_config.report.summaries_file,
            report_file: toml_config.report.report_file,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load from a known path, falling back to defaults on any error
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// The ascending hold thresholds the pipeline tracker watches:
    /// letter commit, submit, and the long-hold step requirement.
    pub fn long_thresholds(&self) -> Vec<Duration> {
        let mut ms = vec![self.letter_hold_ms, self.submit_hold_ms, self.long_hold_ms];
        ms.sort_unstable();
        ms.dedup();
        ms.into_iter().map(Duration::from_millis).collect()
    }

    // Getters for all config fields
    pub fn threshold_up(&self) -> f64 {
        self.threshold_up
    }

    pub fn threshold_down(&self) -> f64 {
        self.threshold_down
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn long_hold(&self) -> Duration {
        Duration::from_millis(self.long_hold_ms)
    }

    pub fn submit_hold(&self) -> Duration {
        Duration::from_millis(self.submit_hold_ms)
    }

    pub fn sequence_max_gap(&self) -> Duration {
        Duration::from_millis(self.sequence_max_gap_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn post_cue(&self) -> Duration {
        Duration::from_millis(self.post_cue_ms)
    }

    pub fn barrier_poll(&self) -> Duration {
        Duration::from_millis(self.barrier_poll_ms)
    }

    pub fn barrier_timeout(&self) -> Duration {
        Duration::from_millis(self.barrier_timeout_ms)
    }

    pub fn speech_per_word(&self) -> Duration {
        Duration::from_millis(self.speech_ms_per_word)
    }

    pub fn speech_min(&self) -> Duration {
        Duration::from_millis(self.speech_min_ms)
    }

    pub fn cue_duration(&self) -> Duration {
        Duration::from_millis(self.cue_ms)
    }

    pub fn recorder_startup(&self) -> Duration {
        Duration::from_millis(self.recorder_startup_ms)
    }

    pub fn summaries_file(&self) -> &str {
        &self.summaries_file
    }

    pub fn report_file(&self) -> &str {
        &self.report_file
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.threshold_up(), 0.012);
        assert_eq!(config.threshold_down(), 0.005);
        assert_eq!(config.cooldown(), Duration::from_millis(200));
        assert_eq!(config.submit_hold(), Duration::from_secs(3));
        assert_eq!(config.sequence_max_gap(), Duration::from_secs(2));
        assert_eq!(config.barrier_timeout(), Duration::from_secs(10));
        assert_eq!(config.summaries_file(), "out/summaries.jsonl");
    }

    #[test]
    fn test_long_thresholds_sorted_and_deduped() {
        let config = Config::default();
        assert_eq!(
            config.long_thresholds(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(5)
            ]
        );
    }

    #[test]
    fn test_empty_toml_parses_to_defaults() {
        let toml_config: TomlConfig = toml::from_str("").unwrap();
        let config = Config::from_toml(toml_config, "empty");
        assert_eq!(config.threshold_up(), 0.012);
        assert_eq!(config.settle(), Duration::from_secs(1));
    }
}
