//! AAC encoder using fdk-aac
//!
//! Produces ADTS-framed AAC-LC so the output file is playable on its own.

#![cfg_attr(not(feature = "fdk"), allow(dead_code))]

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::wav::PcmFormat;
use std::path::Path;

/// AAC frame size - always 1024 samples per channel
pub const AAC_FRAME_SIZE: usize = 1024;

/// Output buffer per channel, enough for one encoded frame
const MAX_PACKET_BYTES_PER_CHANNEL: usize = 768;

/// AAC encoder configuration
#[derive(Debug, Clone)]
pub struct AacEncoderConfig {
    /// Layout of the PCM input
    pub format: PcmFormat,
    /// Target bitrate in bits per second
    pub bitrate: u32,
}

impl AacEncoderConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            format: settings.format,
            bitrate: settings.bitrate,
        }
    }

    /// fdk-aac takes interleaved 16-bit mono or stereo
    pub fn validate(&self) -> Result<()> {
        self.format.validate()?;

        if self.format.bits_per_sample != 16 {
            return Err(Error::invalid_format(format!(
                "AAC encoding needs 16-bit PCM, got {}-bit",
                self.format.bits_per_sample
            )));
        }

        if !matches!(self.format.channels, 1 | 2) {
            return Err(Error::invalid_format(format!(
                "AAC encoding supports mono or stereo, got {} channels",
                self.format.channels
            )));
        }

        if self.bitrate == 0 {
            return Err(Error::invalid_format("bitrate must be positive"));
        }

        Ok(())
    }

    /// Bytes of PCM consumed per AAC frame
    pub fn frame_bytes(&self) -> usize {
        AAC_FRAME_SIZE * self.format.block_align() as usize
    }
}

/// Result of an encode run
#[derive(Debug, Clone, Default)]
pub struct EncodeSummary {
    /// Input frames of `AAC_FRAME_SIZE` samples, the last one padded
    pub frames: u64,
    /// ADTS packets written, including those drained after the input ended
    pub packets: u64,
    /// AAC bytes written
    pub bytes: u64,
}

/// Silent frames needed to push `delay` samples per channel out of the encoder
///
/// One frame more than the delay covers, for the frame still sitting in the
/// encoder's input buffer.
fn drain_frame_count(delay: usize) -> usize {
    delay.div_ceil(AAC_FRAME_SIZE) + 1
}

/// Convert little-endian byte pairs to samples
fn samples_from_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

/// Encode the PCM file at `pcm_path` into an ADTS AAC file at `aac_path`
#[cfg(feature = "fdk")]
pub fn encode_file(
    config: &AacEncoderConfig,
    pcm_path: &Path,
    aac_path: &Path,
) -> Result<EncodeSummary> {
    use super::fill_buffer;
    use fdk_aac::enc::{
        AudioObjectType, BitRate, ChannelMode, Encoder as FdkEncoder, EncoderParams, Transport,
    };
    use log::{debug, info};
    use std::fs::File;
    use std::io::{BufReader, BufWriter, Write};

    config.validate()?;

    let channel_mode = match config.format.channels {
        1 => ChannelMode::Mono,
        _ => ChannelMode::Stereo,
    };

    let params = EncoderParams {
        bit_rate: BitRate::Cbr(config.bitrate),
        sample_rate: config.format.sample_rate,
        transport: Transport::Adts,
        channels: channel_mode,
        audio_object_type: AudioObjectType::Mpeg4LowComplexity,
    };

    let encoder = FdkEncoder::new(params)
        .map_err(|e| Error::codec(format!("Failed to create AAC encoder: {:?}", e)))?;

    let source = File::open(pcm_path).map_err(|e| Error::source_unavailable(pcm_path, e))?;
    let mut reader = BufReader::new(source);

    let sink = File::create(aac_path).map_err(|e| Error::sink_unavailable(aac_path, e))?;
    let mut writer = BufWriter::new(sink);

    let frame_bytes = config.frame_bytes();
    let mut input = vec![0u8; frame_bytes];
    let mut output = vec![0u8; MAX_PACKET_BYTES_PER_CHANNEL * config.format.channels as usize];
    let mut summary = EncodeSummary::default();

    loop {
        let read = fill_buffer(&mut reader, &mut input)
            .map_err(|e| Error::source_unavailable(pcm_path, e))?;
        if read == 0 {
            break;
        }

        if read < frame_bytes {
            // Pad the final frame with silence
            debug!("Padding last frame: {} of {} bytes", read, frame_bytes);
            input[read..].fill(0);
        }

        let samples = samples_from_bytes(&input);
        encode_frame(&encoder, &samples, &mut output, &mut writer, aac_path, &mut summary)?;
        summary.frames += 1;

        if read < frame_bytes {
            break;
        }
    }

    // The encoder holds back its codec delay; push silence through until it is out
    if summary.frames > 0 {
        let delay = encoder
            .info()
            .map_err(|e| Error::codec(format!("Failed to query AAC encoder: {:?}", e)))?
            .nDelay as usize;
        let drain_frames = drain_frame_count(delay);
        debug!(
            "Draining encoder: {} samples of delay, {} silent frames",
            delay, drain_frames
        );

        let silence = vec![0i16; AAC_FRAME_SIZE * config.format.channels as usize];
        for _ in 0..drain_frames {
            encode_frame(&encoder, &silence, &mut output, &mut writer, aac_path, &mut summary)?;
        }
    }

    writer
        .flush()
        .map_err(|e| Error::write_failure(aac_path, e))?;

    info!(
        "Encoded {} frames of {} into {} ({} packets, {} bytes at {} bit/s)",
        summary.frames,
        config.format,
        aac_path.display(),
        summary.packets,
        summary.bytes,
        config.bitrate
    );
    Ok(summary)
}

/// Feed one frame of interleaved samples and write whatever the encoder emits
#[cfg(feature = "fdk")]
fn encode_frame<W: std::io::Write>(
    encoder: &fdk_aac::enc::Encoder,
    samples: &[i16],
    output: &mut [u8],
    writer: &mut W,
    aac_path: &Path,
    summary: &mut EncodeSummary,
) -> Result<()> {
    let mut offset = 0;

    while offset < samples.len() {
        let encode_info = encoder
            .encode(&samples[offset..], output)
            .map_err(|e| Error::codec(format!("AAC encoding failed: {:?}", e)))?;

        if encode_info.output_size > 0 {
            writer
                .write_all(&output[..encode_info.output_size])
                .map_err(|e| Error::write_failure(aac_path, e))?;
            summary.bytes += encode_info.output_size as u64;
            summary.packets += 1;
        }

        if encode_info.input_consumed == 0 && encode_info.output_size == 0 {
            return Err(Error::codec("AAC encoder stopped accepting input"));
        }
        offset += encode_info.input_consumed;
    }

    Ok(())
}

/// Encode the PCM file at `pcm_path` into an ADTS AAC file at `aac_path`
#[cfg(not(feature = "fdk"))]
pub fn encode_file(
    config: &AacEncoderConfig,
    _pcm_path: &Path,
    _aac_path: &Path,
) -> Result<EncodeSummary> {
    config.validate()?;
    Err(Error::codec(
        "built without AAC encoding support, rebuild with --features fdk",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(channels: u16, bits: u16) -> AacEncoderConfig {
        AacEncoderConfig {
            format: PcmFormat::new(channels, 48000, bits),
            bitrate: 32000,
        }
    }

    #[test]
    fn test_rejects_unsupported_layouts() {
        assert!(config(2, 16).validate().is_ok());
        assert!(config(1, 16).validate().is_ok());
        assert!(matches!(
            config(2, 24).validate(),
            Err(Error::InvalidFormatParameters(_))
        ));
        assert!(matches!(
            config(6, 16).validate(),
            Err(Error::InvalidFormatParameters(_))
        ));
    }

    #[test]
    fn test_frame_bytes() {
        assert_eq!(config(2, 16).frame_bytes(), 4096);
        assert_eq!(config(1, 16).frame_bytes(), 2048);
    }

    #[test]
    fn test_samples_from_bytes() {
        assert_eq!(samples_from_bytes(&[0x01, 0x00, 0xff, 0xff]), vec![1, -1]);
    }

    #[test]
    fn test_drain_frame_count() {
        assert_eq!(drain_frame_count(0), 1);
        assert_eq!(drain_frame_count(1024), 2);
        assert_eq!(drain_frame_count(2048), 3);
        assert_eq!(drain_frame_count(2049), 4);
    }

    #[test]
    fn test_invalid_input_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pcm = dir.path().join("audio.pcm");
        let aac = dir.path().join("audio.aac");
        std::fs::write(&pcm, [0u8; 64]).unwrap();

        assert!(encode_file(&config(2, 8), &pcm, &aac).is_err());
        assert!(!aac.exists());
    }

    #[cfg(feature = "fdk")]
    #[test]
    fn test_encode_then_decode_keeps_layout() {
        let dir = tempfile::tempdir().unwrap();
        let pcm = dir.path().join("tone.pcm");
        let aac = dir.path().join("tone.aac");
        let decoded = dir.path().join("decoded.pcm");

        // half a second of a 440 Hz stereo tone
        let bytes: Vec<u8> = (0..24000)
            .flat_map(|i| {
                let t = i as f32 / 48000.0;
                let s = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 8000.0) as i16;
                [s, s]
            })
            .flat_map(|s| s.to_le_bytes())
            .collect();
        std::fs::write(&pcm, &bytes).unwrap();

        let summary = encode_file(&config(2, 16), &pcm, &aac).unwrap();
        assert_eq!(summary.frames, 24);
        assert!(summary.packets > 24);
        assert!(summary.bytes > 0);

        let spec = crate::codec::decode_file(&aac, &decoded).unwrap();
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.channels, 2);
        assert!(spec.bytes > 0);
    }

    #[cfg(feature = "fdk")]
    #[test]
    fn test_encoder_is_drained_at_end_of_input() {
        let dir = tempfile::tempdir().unwrap();
        let pcm = dir.path().join("tone.pcm");
        let aac = dir.path().join("tone.aac");
        let decoded = dir.path().join("decoded.pcm");

        // three frames of a loud stereo tone, no trailing silence
        let input_frames = 3 * AAC_FRAME_SIZE;
        let bytes: Vec<u8> = (0..input_frames)
            .flat_map(|i| {
                let t = i as f32 / 48000.0;
                let s = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 16000.0) as i16;
                [s, s]
            })
            .flat_map(|s| s.to_le_bytes())
            .collect();
        std::fs::write(&pcm, &bytes).unwrap();

        encode_file(&config(2, 16), &pcm, &aac).unwrap();
        crate::codec::decode_file(&aac, &decoded).unwrap();

        let samples = samples_from_bytes(&std::fs::read(&decoded).unwrap());
        let audible: Vec<usize> = samples
            .chunks_exact(2)
            .enumerate()
            .filter(|(_, frame)| frame[0].unsigned_abs() > 1000)
            .map(|(i, _)| i)
            .collect();

        let first = *audible.first().unwrap();
        let last = *audible.last().unwrap();
        // the codec delay shifts the tone, but all of it must come back out
        assert!(last >= input_frames + AAC_FRAME_SIZE, "tone ends at frame {}", last);
        assert!(
            last - first + 1 >= input_frames - 64,
            "only {} of {} frames audible",
            last - first + 1,
            input_frames
        );
    }
}
