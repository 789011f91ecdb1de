//! Settings persistence
//!
//! Settings are stored as JSON at `~/.config/pcmkit/settings.json`. Every field
//! is optional in the file; missing fields take the built-in defaults.

use crate::error::{Error, Result};
use crate::wav::{PcmFormat, DEFAULT_BUFFER_SIZE};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Raw PCM file used when no path is given
    pub pcm_path: PathBuf,
    /// WAV file used when no path is given
    pub wav_path: PathBuf,
    /// AAC file used when no path is given
    pub aac_path: PathBuf,
    /// Layout of raw PCM files
    pub format: PcmFormat,
    /// Capture device, "default" to let PipeWire pick
    pub device: String,
    /// Device buffers to capture before stopping
    pub packet_limit: u32,
    /// AAC target bitrate in bits per second
    pub bitrate: u32,
    /// Copy chunk size for WAV wrapping
    pub buffer_size: usize,
    /// Where timestamped recordings go
    pub recordings_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pcm_path: PathBuf::from("audio.pcm"),
            wav_path: PathBuf::from("audio.wav"),
            aac_path: PathBuf::from("audio.aac"),
            format: PcmFormat::default(),
            device: "default".to_string(),
            packet_limit: 5000,
            bitrate: 32000,
            buffer_size: DEFAULT_BUFFER_SIZE,
            recordings_dir: default_recordings_dir(),
        }
    }
}

impl Settings {
    /// Get the default settings file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pcmkit").join("settings.json"))
    }

    /// Load settings
    ///
    /// An explicit `path` must exist. Without one, the default file is read if
    /// present and built-in defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                _ => {
                    debug!("No settings file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
            Error::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::config(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;

        fs::write(path, contents)
            .map_err(|e| Error::config(format!("Failed to write {}: {}", path.display(), e)))?;

        Ok(())
    }
}

fn default_recordings_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pcmkit")
        .join("recordings")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.pcm_path, PathBuf::from("audio.pcm"));
        assert_eq!(settings.format, PcmFormat::new(2, 48000, 16));
        assert_eq!(settings.packet_limit, 5000);
        assert_eq!(settings.bitrate, 32000);
        assert_eq!(settings.device, "default");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "format": { "channels": 1, "sample_rate": 16000, "bits_per_sample": 16 }, "bitrate": 64000 }"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.format, PcmFormat::new(1, 16000, 16));
        assert_eq!(settings.bitrate, 64000);
        assert_eq!(settings.wav_path, PathBuf::from("audio.wav"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.device = "alsa_input.usb".to_string();
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(Some(&path)).unwrap(), settings);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/settings.json"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(Some(&path)), Err(Error::Config(_))));
    }
}
