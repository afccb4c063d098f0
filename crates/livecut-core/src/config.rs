// crates/livecut-core/src/config.rs
// Session configuration — pure data, no device handles.
// Deserialized via serde from the JSON config file livecut-app loads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::SourceId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("audio_input_device_id {0} is not listed in active_microphone_ids")]
    MainAudioNotActive(u32),
    #[error("file mode requires audio_filenames and video_filenames of equal length ({audio} vs {video})")]
    UnpairedFiles { audio: usize, video: usize },
    #[error("file mode requires at least one audio/video filename pair")]
    NoFiles,
    #[error("live mode requires at least one active camera and one active microphone")]
    NoDevices,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeSection {
    /// true — capture from devices; false — read the configured files.
    pub live_mode: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveSection {
    #[serde(default)]
    pub active_microphone_ids: Vec<u32>,
    #[serde(default)]
    pub active_camera_ids:     Vec<u32>,
    /// The microphone routed directly to the audio sinks, never vote-gated.
    /// Must appear in `active_microphone_ids`.
    #[serde(default)]
    pub audio_input_device_id: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesSection {
    #[serde(default)]
    pub audio_filenames: Vec<String>,
    #[serde(default)]
    pub video_filenames: Vec<String>,
    /// The file routed directly to the audio sinks, never vote-gated.
    #[serde(default)]
    pub main_audio_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputAudioSection {
    pub audio_output_device_id: u32,
    /// Write the main audio channel to `audio_filename`.
    pub audio_file:             bool,
    #[serde(default = "default_audio_filename")]
    pub audio_filename:         String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputVideoSection {
    /// Write the elected video feed to `video_filename`.
    pub video_file:     bool,
    #[serde(default = "default_video_filename")]
    pub video_filename: String,
}

fn default_audio_filename() -> String { "output_audio.wav".into() }
fn default_video_filename() -> String { "output_video.avi".into() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mode:         ModeSection,
    #[serde(default)]
    pub live:         LiveSection,
    #[serde(default)]
    pub files:        FilesSection,
    pub output_audio: OutputAudioSection,
    pub output_video: OutputVideoSection,

    /// Audio wire format.
    #[serde(default = "default_sample_rate")]
    pub sample_rate:    u32,
    #[serde(default)]
    pub use_f32_audio:  bool,
    /// Consecutive tallies a challenger must win before a switch commits.
    #[serde(default = "default_thrash_limit")]
    pub thrash_limit:   u32,
    /// Feature sliding-window length, in feature ticks.
    #[serde(default = "default_window_length")]
    pub window_length:  usize,
    /// Output video frame rate.
    #[serde(default = "default_fps")]
    pub video_fps:      u32,
    /// Relative say of each feature in the tally.
    #[serde(default = "default_feature_weight")]
    pub audio_feature_weight:  f64,
    #[serde(default = "default_feature_weight")]
    pub motion_feature_weight: f64,
}

fn default_sample_rate()   -> u32   { 16_000 }
fn default_thrash_limit()  -> u32   { 30 }
fn default_window_length() -> usize { 50 }
fn default_fps()           -> u32   { 30 }
fn default_feature_weight() -> f64  { 0.5 }

impl Config {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Cross-field checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode.live_mode {
            if self.live.active_camera_ids.is_empty() || self.live.active_microphone_ids.is_empty()
            {
                return Err(ConfigError::NoDevices);
            }
            if !self
                .live
                .active_microphone_ids
                .contains(&self.live.audio_input_device_id)
            {
                return Err(ConfigError::MainAudioNotActive(self.live.audio_input_device_id));
            }
        } else {
            if self.files.audio_filenames.len() != self.files.video_filenames.len() {
                return Err(ConfigError::UnpairedFiles {
                    audio: self.files.audio_filenames.len(),
                    video: self.files.video_filenames.len(),
                });
            }
            if self.files.audio_filenames.is_empty() {
                return Err(ConfigError::NoFiles);
            }
        }
        Ok(())
    }

    /// Audio source ids paired with the video source they speak for,
    /// in config order. The pairing is positional in file mode and
    /// positional across the id lists in live mode.
    pub fn audio_video_pairs(&self) -> Vec<(SourceId, SourceId)> {
        if self.mode.live_mode {
            self.live
                .active_microphone_ids
                .iter()
                .zip(&self.live.active_camera_ids)
                .map(|(&m, &c)| (SourceId::Microphone(m), SourceId::Camera(c)))
                .collect()
        } else {
            self.files
                .audio_filenames
                .iter()
                .zip(&self.files.video_filenames)
                .map(|(a, v)| (SourceId::AudioFile(a.clone()), SourceId::VideoFile(v.clone())))
                .collect()
        }
    }

    pub fn video_source_ids(&self) -> Vec<SourceId> {
        if self.mode.live_mode {
            self.live.active_camera_ids.iter().map(|&c| SourceId::Camera(c)).collect()
        } else {
            self.files
                .video_filenames
                .iter()
                .map(|v| SourceId::VideoFile(v.clone()))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_mode_config() -> Config {
        Config::from_json(
            r#"{
                "mode": { "live_mode": false },
                "files": {
                    "audio_filenames": ["a0.wav", "a1.wav"],
                    "video_filenames": ["v0.avi", "v1.avi"],
                    "main_audio_file": "a0.wav"
                },
                "output_audio": {
                    "audio_output_device_id": 0,
                    "audio_file": true,
                    "audio_filename": "out.wav"
                },
                "output_video": { "video_file": true, "video_filename": "out.avi" }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn file_mode_parses_and_validates() {
        let cfg = file_mode_config();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sample_rate, 16_000);
        assert_eq!(cfg.thrash_limit, 30);
    }

    #[test]
    fn unpaired_files_are_rejected() {
        let mut cfg = file_mode_config();
        cfg.files.video_filenames.pop();
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::UnpairedFiles { audio: 2, video: 1 })
        );
    }

    #[test]
    fn main_audio_must_be_an_active_microphone() {
        let mut cfg = file_mode_config();
        cfg.mode.live_mode = true;
        cfg.live.active_camera_ids = vec![0];
        cfg.live.active_microphone_ids = vec![1, 2];
        cfg.live.audio_input_device_id = 3;
        assert_eq!(cfg.validate(), Err(ConfigError::MainAudioNotActive(3)));
    }

    #[test]
    fn audio_video_pairs_follow_config_order() {
        let cfg = file_mode_config();
        let pairs = cfg.audio_video_pairs();
        assert_eq!(
            pairs[0],
            (
                SourceId::AudioFile("a0.wav".into()),
                SourceId::VideoFile("v0.avi".into())
            )
        );
        assert_eq!(pairs.len(), 2);
    }
}
