//! Reading back WAV files

use super::header::{PcmFormat, WavHeader, HEADER_LEN};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Summary of an existing WAV file
#[derive(Debug, Clone)]
pub struct WavInfo {
    pub format: PcmFormat,
    pub sample_format: hound::SampleFormat,
    /// Sample frames per channel
    pub frames: u32,
    /// Canonical header check, present when requested
    pub canonical: Option<std::result::Result<WavHeader, String>>,
}

impl WavInfo {
    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.format.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.format.sample_rate as f64
    }
}

/// Describe the WAV file at `path`
///
/// With `strict`, the first 44 bytes are also checked against the canonical layout.
pub fn inspect(path: &Path, strict: bool) -> Result<WavInfo> {
    let reader = hound::WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) => Error::source_unavailable(path, io),
        other => Error::MalformedHeader(other.to_string()),
    })?;

    let spec = reader.spec();
    let format = PcmFormat::new(spec.channels, spec.sample_rate, spec.bits_per_sample);

    let canonical = if strict {
        let mut bytes = [0u8; HEADER_LEN];
        let mut file = File::open(path).map_err(|e| Error::source_unavailable(path, e))?;
        Some(match file.read_exact(&mut bytes) {
            Ok(()) => WavHeader::parse(&bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        })
    } else {
        None
    };

    Ok(WavInfo {
        format,
        sample_format: spec.sample_format,
        frames: reader.duration(),
        canonical,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::pcm_to_wav;

    #[test]
    fn test_inspect_converted_file() {
        let dir = tempfile::tempdir().unwrap();
        let pcm = dir.path().join("audio.pcm");
        let wav = dir.path().join("audio.wav");
        std::fs::write(&pcm, vec![0u8; 192000]).unwrap();
        pcm_to_wav(PcmFormat::new(2, 48000, 16), &pcm, &wav).unwrap();

        let info = inspect(&wav, true).unwrap();
        assert_eq!(info.format, PcmFormat::new(2, 48000, 16));
        assert_eq!(info.frames, 48000);
        assert_eq!(info.duration_seconds(), 1.0);
        assert!(matches!(info.canonical, Some(Ok(_))));
    }

    #[test]
    fn test_inspect_hound_written_float_file() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&wav, spec).unwrap();
        for _ in 0..1600 {
            writer.write_sample(0.25f32).unwrap();
        }
        writer.finalize().unwrap();

        let info = inspect(&wav, true).unwrap();
        assert_eq!(info.sample_format, hound::SampleFormat::Float);
        assert_eq!(info.frames, 1600);
        // IEEE float is not the canonical integer PCM layout
        assert!(matches!(info.canonical, Some(Err(_))));
    }

    #[test]
    fn test_inspect_missing_file() {
        let err = inspect(Path::new("/nonexistent/x.wav"), false).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }
}
