// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback settings.
//!
//! Settings are stored as RON. Every field has a default, so a settings file
//! only needs to name the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default settings file name
pub const SETTINGS_FILE_NAME: &str = "titlecard.ron";

/// Longest wait a single scene can get
pub const MAX_SCENE_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors raised while loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Timing and sound options for playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Interval between progress samples, in milliseconds
    pub frame_interval_ms: u64,
    /// How long the finished state stays visible before resetting, in milliseconds
    pub completion_grace_ms: u64,
    /// Shortest wait a scene gets, in seconds
    pub min_scene_duration: f32,
    /// Whether scene transitions play the swoosh cue
    pub sound_enabled: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            completion_grace_ms: 480,
            min_scene_duration: 0.1,
            sound_enabled: true,
        }
    }
}

impl PlaybackSettings {
    /// Parse settings from a RON string
    pub fn from_ron_str(text: &str) -> Result<Self, SettingsError> {
        Ok(ron::from_str(text)?)
    }

    /// Load settings from a RON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_ron_str(&text)?;
        tracing::debug!("Loaded playback settings from {}", path.display());
        Ok(settings)
    }

    /// Progress sampling period (never zero)
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    /// Hold time between natural completion and the reset
    pub fn completion_grace(&self) -> Duration {
        Duration::from_millis(self.completion_grace_ms)
    }

    /// Wait for a scene of `duration` seconds.
    ///
    /// Zero, negative and non-finite durations clamp to `min_scene_duration`.
    /// Nothing waits longer than [`MAX_SCENE_WAIT`].
    pub fn scene_wait(&self, duration: f32) -> Duration {
        let floor = if self.min_scene_duration.is_finite() {
            self.min_scene_duration.max(0.001)
        } else {
            0.001
        };
        let seconds = if duration.is_finite() { duration.max(floor) } else { floor };
        Duration::try_from_secs_f32(seconds)
            .map_or(MAX_SCENE_WAIT, |wait| wait.min(MAX_SCENE_WAIT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PlaybackSettings::default();
        assert_eq!(settings.frame_interval(), Duration::from_millis(16));
        assert_eq!(settings.completion_grace(), Duration::from_millis(480));
        assert!(settings.sound_enabled);
    }

    #[test]
    fn test_partial_settings_file() {
        let settings = PlaybackSettings::from_ron_str("(sound_enabled: false)").unwrap();
        assert!(!settings.sound_enabled);
        assert_eq!(settings.completion_grace_ms, 480);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            PlaybackSettings::from_ron_str("(frame_interval_ms: \"fast\")"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_scene_wait_clamps_degenerate_durations() {
        let settings = PlaybackSettings::default();
        assert_eq!(settings.scene_wait(2.0), Duration::from_secs(2));
        assert_eq!(settings.scene_wait(0.0), Duration::from_secs_f32(0.1));
        assert_eq!(settings.scene_wait(-3.0), Duration::from_secs_f32(0.1));
        assert_eq!(settings.scene_wait(f32::NAN), Duration::from_secs_f32(0.1));
    }

    #[test]
    fn test_scene_wait_has_a_ceiling() {
        let settings = PlaybackSettings::default();
        assert_eq!(settings.scene_wait(1.0e20), MAX_SCENE_WAIT);
        assert_eq!(settings.scene_wait(f32::MAX), MAX_SCENE_WAIT);
        assert_eq!(settings.scene_wait(90_000.0), MAX_SCENE_WAIT);

        let huge_floor = PlaybackSettings {
            min_scene_duration: 1.0e30,
            ..PlaybackSettings::default()
        };
        assert_eq!(huge_floor.scene_wait(0.0), MAX_SCENE_WAIT);
    }

    #[test]
    fn test_zero_frame_interval_is_raised() {
        let settings = PlaybackSettings {
            frame_interval_ms: 0,
            ..PlaybackSettings::default()
        };
        assert_eq!(settings.frame_interval(), Duration::from_millis(1));
    }
}
