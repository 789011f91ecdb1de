//! Recording PCM files from a capture device

use super::capture::{self, CaptureConfig, CaptureSummary, CAPTURE_SUPPORTED};
use crate::error::{Error, Result};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Raw PCM recorder
pub struct PcmRecorder {
    config: CaptureConfig,
    recordings_dir: PathBuf,
}

impl PcmRecorder {
    /// Create a new recorder writing timestamped files under `recordings_dir`
    pub fn new(config: CaptureConfig, recordings_dir: impl AsRef<Path>) -> Self {
        Self {
            config,
            recordings_dir: recordings_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the capture configuration
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Ensure the recordings directory exists
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.recordings_dir)
    }

    /// Generate a unique filename for a new recording
    pub fn generate_filename(&self) -> PathBuf {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let uuid = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        self.recordings_dir
            .join(format!("recording_{}_{}.pcm", timestamp, uuid))
    }

    /// Record into `path`, creating or truncating it
    pub fn record(&self, path: &Path) -> Result<CaptureSummary> {
        self.config.validate()?;
        if !CAPTURE_SUPPORTED {
            return capture::capture(&self.config, std::io::sink(), path);
        }

        let file = File::create(path).map_err(|e| Error::sink_unavailable(path, e))?;
        let summary = capture::capture(&self.config, BufWriter::new(file), path)?;

        info!(
            "Recorded {} buffers ({} bytes, {:.2}s, peak {:.2}) to {}",
            summary.packets,
            summary.bytes,
            summary.format.duration_seconds(summary.bytes),
            summary.peak_level,
            path.display()
        );
        Ok(summary)
    }

    /// Record into a freshly named file in the recordings directory
    pub fn record_timestamped(&self) -> Result<(PathBuf, CaptureSummary)> {
        self.ensure_dir()
            .map_err(|e| Error::sink_unavailable(&self.recordings_dir, e))?;

        let path = self.generate_filename();
        let summary = self.record(&path)?;
        Ok((path, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::PcmFormat;

    fn recorder(dir: &Path) -> PcmRecorder {
        let config = CaptureConfig {
            device: "default".to_string(),
            format: PcmFormat::new(2, 48000, 16),
            packet_limit: 10,
        };
        PcmRecorder::new(config, dir)
    }

    #[test]
    fn test_generated_filenames_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder(dir.path());

        let first = recorder.generate_filename();
        let second = recorder.generate_filename();
        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(dir.path()));

        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("recording_"));
        assert!(name.ends_with(".pcm"));
        // recording_ + YYYYmmdd_HHMMSS + _ + 8 hex + .pcm
        assert_eq!(name.len(), 10 + 15 + 1 + 8 + 4);
    }

    #[test]
    fn test_invalid_config_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder(dir.path());
        recorder.config.format.bits_per_sample = 8;

        let path = dir.path().join("audio.pcm");
        assert!(matches!(
            recorder.record(&path),
            Err(Error::InvalidFormatParameters(_))
        ));
        assert!(!path.exists());
    }

    #[cfg(not(feature = "capture"))]
    #[test]
    fn test_record_without_capture_support() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder(dir.path());
        let path = dir.path().join("audio.pcm");

        assert!(matches!(recorder.record(&path), Err(Error::Capture(_))));
        assert!(!path.exists());
    }
}
