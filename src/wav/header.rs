//! WAV header layout and format parameters

use super::{DATA_CHUNK, FMT_CHUNK, RIFF_MAGIC, WAVE_MAGIC};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a canonical WAV header in bytes
pub const HEADER_LEN: usize = 44;

/// Size of the "fmt " chunk body for plain PCM
const FMT_CHUNK_SIZE: u32 = 16;

/// WAVE_FORMAT_PCM
const AUDIO_FORMAT_PCM: u16 = 1;

/// Header bytes counted by the RIFF size field (all but its own id and size)
const RIFF_OVERHEAD: u32 = HEADER_LEN as u32 - 8;

/// Sample layout of a headerless PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Number of interleaved channels
    pub channels: u16,
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Bits per sample per channel
    pub bits_per_sample: u16,
}

impl PcmFormat {
    pub fn new(channels: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample,
        }
    }

    /// Check that the parameters describe a representable PCM layout
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(Error::invalid_format("channel count must be positive"));
        }

        if self.sample_rate == 0 {
            return Err(Error::invalid_format("sample rate must be positive"));
        }

        if self.bits_per_sample == 0 {
            return Err(Error::invalid_format("bits per sample must be positive"));
        }

        let frame_bits = u32::from(self.bits_per_sample) * u32::from(self.channels);
        if frame_bits % 8 != 0 {
            return Err(Error::invalid_format(format!(
                "{} bits x {} channels is not a whole number of bytes",
                self.bits_per_sample, self.channels
            )));
        }

        let block_align = u16::try_from(frame_bits / 8).map_err(|_| {
            Error::invalid_format(format!("block align of {} bytes is too large", frame_bits / 8))
        })?;

        if self.sample_rate.checked_mul(u32::from(block_align)).is_none() {
            return Err(Error::invalid_format(format!(
                "byte rate of {} Hz x {} bytes overflows",
                self.sample_rate, block_align
            )));
        }

        Ok(())
    }

    /// Bytes per sample frame (all channels, one instant)
    ///
    /// Only meaningful for a format that passed `validate`.
    pub fn block_align(&self) -> u16 {
        (u32::from(self.bits_per_sample) * u32::from(self.channels) / 8) as u16
    }

    /// Bytes of audio per second of playback
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(u32::from(self.block_align()))
    }

    /// Playback duration of `data_len` bytes in this format
    pub fn duration_seconds(&self, data_len: u64) -> f64 {
        let byte_rate = self.byte_rate();
        if byte_rate == 0 {
            return 0.0;
        }
        data_len as f64 / byte_rate as f64
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 16,
        }
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ch, {} Hz, {}-bit",
            self.channels, self.sample_rate, self.bits_per_sample
        )
    }
}

/// Canonical 44-byte WAV header: RIFF chunk, 16-byte "fmt " chunk, "data" chunk
///
/// Integer fields are always little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: PcmFormat,
    /// Length of the PCM payload following the header
    pub data_size: u32,
}

impl WavHeader {
    /// Build a header for `data_len` bytes of PCM in `format`
    pub fn new(format: PcmFormat, data_len: u64) -> Result<Self> {
        format.validate()?;

        let data_size = u32::try_from(data_len)
            .ok()
            .filter(|size| size.checked_add(RIFF_OVERHEAD).is_some())
            .ok_or(Error::PayloadTooLarge(data_len))?;

        Ok(Self { format, data_size })
    }

    /// Value of the RIFF chunk size field (file size minus 8)
    pub fn riff_size(&self) -> u32 {
        self.data_size + RIFF_OVERHEAD
    }

    /// Serialize field by field in on-disk order
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let format = &self.format;
        let mut bytes = [0u8; HEADER_LEN];

        bytes[0..4].copy_from_slice(RIFF_MAGIC);
        bytes[4..8].copy_from_slice(&self.riff_size().to_le_bytes());
        bytes[8..12].copy_from_slice(WAVE_MAGIC);

        bytes[12..16].copy_from_slice(FMT_CHUNK);
        bytes[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
        bytes[20..22].copy_from_slice(&AUDIO_FORMAT_PCM.to_le_bytes());
        bytes[22..24].copy_from_slice(&format.channels.to_le_bytes());
        bytes[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
        bytes[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
        bytes[32..34].copy_from_slice(&format.block_align().to_le_bytes());
        bytes[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

        bytes[36..40].copy_from_slice(DATA_CHUNK);
        bytes[40..44].copy_from_slice(&self.data_size.to_le_bytes());

        bytes
    }

    /// Parse a canonical header, rejecting anything this crate would not write
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::MalformedHeader(format!(
                "need {} bytes, have {}",
                HEADER_LEN,
                bytes.len()
            )));
        }

        if &bytes[0..4] != RIFF_MAGIC || &bytes[8..12] != WAVE_MAGIC {
            return Err(Error::MalformedHeader("not a RIFF/WAVE file".to_string()));
        }
        if &bytes[12..16] != FMT_CHUNK {
            return Err(Error::MalformedHeader("fmt chunk is not first".to_string()));
        }
        if &bytes[36..40] != DATA_CHUNK {
            return Err(Error::MalformedHeader("data chunk does not follow fmt".to_string()));
        }

        let fmt_size = read_u32(bytes, 16);
        if fmt_size != FMT_CHUNK_SIZE {
            return Err(Error::MalformedHeader(format!(
                "fmt chunk is {} bytes, expected {}",
                fmt_size, FMT_CHUNK_SIZE
            )));
        }

        let audio_format = read_u16(bytes, 20);
        if audio_format != AUDIO_FORMAT_PCM {
            return Err(Error::MalformedHeader(format!(
                "audio format {} is not integer PCM",
                audio_format
            )));
        }

        let format = PcmFormat {
            channels: read_u16(bytes, 22),
            sample_rate: read_u32(bytes, 24),
            bits_per_sample: read_u16(bytes, 34),
        };
        format.validate()?;

        let byte_rate = read_u32(bytes, 28);
        let block_align = read_u16(bytes, 32);
        if block_align != format.block_align() || byte_rate != format.byte_rate() {
            return Err(Error::MalformedHeader(format!(
                "derived fields disagree: block align {} (expected {}), byte rate {} (expected {})",
                block_align,
                format.block_align(),
                byte_rate,
                format.byte_rate()
            )));
        }

        let header = Self::new(format, u64::from(read_u32(bytes, 40)))?;
        let riff_size = read_u32(bytes, 4);
        if riff_size != header.riff_size() {
            return Err(Error::MalformedHeader(format!(
                "RIFF size {} does not match data size {}",
                riff_size, header.data_size
            )));
        }

        Ok(header)
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_stereo_scenario_layout() {
        let header = WavHeader::new(PcmFormat::new(2, 48000, 16), 4000).unwrap();
        let bytes = header.to_bytes();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(read_u32(&bytes, 4), 4036);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(read_u32(&bytes, 16), 16);
        assert_eq!(read_u16(&bytes, 20), 1);
        assert_eq!(read_u16(&bytes, 22), 2);
        assert_eq!(read_u32(&bytes, 24), 48000);
        assert_eq!(read_u32(&bytes, 28), 192000);
        assert_eq!(read_u16(&bytes, 32), 4);
        assert_eq!(read_u16(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(read_u32(&bytes, 40), 4000);
    }

    #[test]
    fn test_empty_payload() {
        let header = WavHeader::new(PcmFormat::default(), 0).unwrap();
        assert_eq!(header.data_size, 0);
        assert_eq!(header.riff_size(), 36);
    }

    #[test]
    fn test_rejects_fractional_block_align() {
        let err = PcmFormat::new(1, 48000, 12).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidFormatParameters(_)));

        // 24 bits per frame is a whole number of bytes
        assert!(PcmFormat::new(2, 48000, 12).validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_parameters() {
        assert!(PcmFormat::new(0, 48000, 16).validate().is_err());
        assert!(PcmFormat::new(2, 0, 16).validate().is_err());
        assert!(PcmFormat::new(2, 48000, 0).validate().is_err());
    }

    #[test]
    fn test_rejects_overflowing_byte_rate() {
        let format = PcmFormat::new(8, u32::MAX, 32);
        assert!(matches!(
            format.validate(),
            Err(Error::InvalidFormatParameters(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let max = u64::from(u32::MAX - RIFF_OVERHEAD);
        assert!(WavHeader::new(PcmFormat::default(), max).is_ok());
        assert!(matches!(
            WavHeader::new(PcmFormat::default(), max + 1),
            Err(Error::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn test_parse_rejects_tampered_fields() {
        let mut bytes = WavHeader::new(PcmFormat::default(), 10).unwrap().to_bytes();
        bytes[32] = 3;
        assert!(matches!(
            WavHeader::parse(&bytes),
            Err(Error::MalformedHeader(_))
        ));

        let mut bytes = WavHeader::new(PcmFormat::default(), 10).unwrap().to_bytes();
        bytes[0] = b'X';
        assert!(WavHeader::parse(&bytes).is_err());

        assert!(WavHeader::parse(&bytes[..20]).is_err());
    }

    #[test]
    fn test_duration() {
        let format = PcmFormat::new(2, 48000, 16);
        assert_eq!(format.duration_seconds(192000), 1.0);
        assert_eq!(format.duration_seconds(96000), 0.5);
    }

    fn valid_format() -> impl Strategy<Value = PcmFormat> {
        (1u16..=8, 1u32..=192_000, prop::sample::select(vec![8u16, 16, 24, 32]))
            .prop_map(|(channels, rate, bits)| PcmFormat::new(channels, rate, bits))
    }

    proptest! {
        #[test]
        fn test_header_fields_consistent(format in valid_format(), len in 0u64..=u64::from(u32::MAX - 36)) {
            let header = WavHeader::new(format, len).unwrap();
            let bytes = header.to_bytes();
            prop_assert_eq!(bytes.len(), HEADER_LEN);

            let parsed = WavHeader::parse(&bytes).unwrap();
            prop_assert_eq!(u64::from(parsed.data_size), len);
            prop_assert_eq!(u64::from(parsed.riff_size()), len + 36);
            prop_assert_eq!(
                parsed.format.block_align(),
                format.bits_per_sample * format.channels / 8
            );
            prop_assert_eq!(
                parsed.format.byte_rate(),
                format.sample_rate * u32::from(parsed.format.block_align())
            );
        }
    }
}
