//! Integration tests for configuration loading

use gaze_rig::infra::Config;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[detection]
threshold_up = 0.02
threshold_down = 0.008
cooldown_ms = 150
sample_interval_ms = 16
long_hold_ms = 4000

[morse]
letter_hold_ms = 800
submit_hold_ms = 2500

[sequence]
max_gap_ms = 1500

[steps]
settle_ms = 750
post_cue_ms = 250
barrier_poll_ms = 50
barrier_timeout_ms = 8000

[audio]
speech_ms_per_word = 500
speech_min_ms = 900
cue_ms = 200

[recorder]
startup_ms = 300

[report]
summaries_file = "test-out/summaries.jsonl"
report_file = "test-out/report.json"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.threshold_up(), 0.02);
    assert_eq!(config.threshold_down(), 0.008);
    assert_eq!(config.cooldown(), Duration::from_millis(150));
    assert_eq!(config.sample_interval(), Duration::from_millis(16));
    assert_eq!(config.submit_hold(), Duration::from_millis(2500));
    assert_eq!(config.sequence_max_gap(), Duration::from_millis(1500));
    assert_eq!(config.settle(), Duration::from_millis(750));
    assert_eq!(config.barrier_timeout(), Duration::from_millis(8000));
    assert_eq!(config.recorder_startup(), Duration::from_millis(300));
    assert_eq!(config.summaries_file(), "test-out/summaries.jsonl");
    assert_eq!(config.report_file(), "test-out/report.json");
    assert_eq!(
        config.long_thresholds(),
        vec![
            Duration::from_millis(800),
            Duration::from_millis(2500),
            Duration::from_millis(4000)
        ]
    );
}

#[test]
fn test_partial_config_uses_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();

    // Only override detection; everything else should keep its default
    let config_content = r#"
[detection]
threshold_up = 0.05
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.threshold_up(), 0.05);
    assert_eq!(config.threshold_down(), 0.005);
    assert_eq!(config.cooldown(), Duration::from_millis(200));
    assert_eq!(config.barrier_timeout(), Duration::from_secs(10));
    assert_eq!(config.summaries_file(), "out/summaries.jsonl");
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.threshold_up(), 0.012);
    assert_eq!(config.threshold_down(), 0.005);
    assert_eq!(config.submit_hold(), Duration::from_secs(3));
}

#[test]
fn test_invalid_toml_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[detection\nthreshold_up = ").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}
