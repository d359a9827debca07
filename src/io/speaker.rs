//! Spoken instruction and audio cue capabilities

use crate::services::barrier::ReadyHandle;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Speaks step instructions out loud
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Start speaking `text`; `done` fires when speech has finished.
    /// Must return promptly so it overlaps recorder startup.
    async fn speak(&self, text: &str, done: ReadyHandle) -> Result<()>;
}

/// Plays the short start/progress beep
#[async_trait]
pub trait CuePlayer: Send + Sync {
    async fn play(&self) -> Result<()>;
}

/// Speaker stand-in that "speaks" for a word-count-scaled duration
pub struct SimSpeaker {
    per_word: Duration,
    min_duration: Duration,
}

impl SimSpeaker {
    pub fn new(per_word: Duration, min_duration: Duration) -> Self {
        Self { per_word, min_duration }
    }

    /// Estimated speech time: per-word rate with a floor
    pub fn estimate(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as u32;
        (self.per_word * words).max(self.min_duration)
    }
}

impl Default for SimSpeaker {
    fn default() -> Self {
        Self::new(Duration::from_millis(600), Duration::from_secs(1))
    }
}

#[async_trait]
impl Speaker for SimSpeaker {
    async fn speak(&self, text: &str, done: ReadyHandle) -> Result<()> {
        let duration = self.estimate(text);
        debug!(words = %text.split_whitespace().count(), ms = %duration.as_millis(), "speech_started");
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            done.mark_ready();
            info!("speech_done");
        });
        Ok(())
    }
}

/// Cue stand-in: a fixed-length beep
pub struct SimCuePlayer {
    duration: Duration,
}

impl SimCuePlayer {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Default for SimCuePlayer {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

#[async_trait]
impl CuePlayer for SimCuePlayer {
    async fn play(&self) -> Result<()> {
        tokio::time::sleep(self.duration).await;
        debug!(ms = %self.duration.as_millis(), "cue_played");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::barrier::ReadinessBarrier;

    #[test]
    fn test_speech_estimate_scales_with_words() {
        let speaker = SimSpeaker::default();
        // One word still takes the minimum
        assert_eq!(speaker.estimate("Wait."), Duration::from_secs(1));
        // Five words at 600ms each
        assert_eq!(
            speaker.estimate("Look UP five times quickly"),
            Duration::from_millis(3000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sim_speaker_fires_done_handle() {
        let speaker = SimSpeaker::default();
        let barrier = ReadinessBarrier::new();
        barrier.recorder_handle().mark_ready();

        speaker.speak("Look UP five times quickly", barrier.speech_handle()).await.unwrap();
        assert!(!barrier.is_satisfied());

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert!(barrier.is_satisfied());
    }
}
