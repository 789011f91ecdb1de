//! AAC decoder using Symphonia
//!
//! Reads ADTS-framed AAC and writes interleaved signed 16-bit PCM.
//! HE-AAC (SBR/PS) streams are not supported by Symphonia.

use crate::error::{Error, Result};
use crate::wav::PcmFormat;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Layout of the decoded PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSpec {
    pub sample_rate: u32,
    pub channels: u16,
    /// Sample frames per channel
    pub frames: u64,
    /// PCM bytes written
    pub bytes: u64,
}

impl DecodedSpec {
    /// Format of the written PCM, for wrapping into WAV
    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat::new(self.channels, self.sample_rate, 16)
    }
}

/// Decode the AAC file at `aac_path` into raw PCM at `pcm_path`
pub fn decode_file(aac_path: &Path, pcm_path: &Path) -> Result<DecodedSpec> {
    let file = File::open(aac_path).map_err(|e| Error::source_unavailable(aac_path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(
        aac_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("aac"),
    );

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::codec(format!("Failed to probe {}: {}", aac_path.display(), e)))?;

    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::codec("No supported audio track found"))?;

    let track_id = track.id;
    let mut spec = DecodedSpec {
        sample_rate: track.codec_params.sample_rate.unwrap_or(0),
        channels: track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(0),
        frames: 0,
        bytes: 0,
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::codec(format!("Unsupported codec: {}", e)))?;

    debug!(
        "Decoding track {} of {} ({} Hz, {} channels advertised)",
        track_id,
        aac_path.display(),
        spec.sample_rate,
        spec.channels
    );

    let sink = File::create(pcm_path).map_err(|e| Error::sink_unavailable(pcm_path, e))?;
    let mut writer = BufWriter::new(sink);
    let mut sample_buffer: Option<SampleBuffer<i16>> = None;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::codec(format!("Failed to read packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(message)) => {
                warn!("Skipping corrupt AAC packet: {}", message);
                continue;
            }
            Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(Error::codec(format!("AAC decode error: {}", e))),
        };

        let audio_spec = *decoded.spec();
        let channel_count = audio_spec.channels.count();
        spec.sample_rate = audio_spec.rate;
        spec.channels = channel_count as u16;

        // Initialize or grow the sample buffer
        let needed = decoded.capacity() * channel_count;
        if sample_buffer
            .as_ref()
            .map_or(true, |buffer| buffer.capacity() < needed)
        {
            sample_buffer = Some(SampleBuffer::<i16>::new(
                decoded.capacity() as u64,
                audio_spec,
            ));
        }

        let Some(buffer) = sample_buffer.as_mut() else {
            continue;
        };
        buffer.copy_interleaved_ref(decoded);

        let samples = buffer.samples();
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        writer
            .write_all(&pcm)
            .map_err(|e| Error::write_failure(pcm_path, e))?;

        spec.frames += (samples.len() / channel_count.max(1)) as u64;
        spec.bytes += pcm.len() as u64;
    }

    writer
        .flush()
        .map_err(|e| Error::write_failure(pcm_path, e))?;

    info!(
        "Decoded {} into {} ({} frames, {} Hz, {} channels)",
        aac_path.display(),
        pcm_path.display(),
        spec.frames,
        spec.sample_rate,
        spec.channels
    );
    Ok(spec)
}
