//! Canonical PCM WAV support
//!
//! This module provides:
//! - The fixed 44-byte RIFF/WAVE header (`WavHeader`) and its format parameters (`PcmFormat`)
//! - Wrapping of headerless PCM files into WAV (`PcmToWav`)
//! - Inspection of existing WAV files via hound

mod header;
mod inspect;
mod muxer;

pub use header::PcmFormat;
pub use inspect::inspect;
pub use muxer::{pcm_to_wav, PcmToWav, DEFAULT_BUFFER_SIZE};

/// RIFF chunk identifiers
pub const RIFF_MAGIC: &[u8; 4] = b"RIFF";
pub const WAVE_MAGIC: &[u8; 4] = b"WAVE";
pub const FMT_CHUNK: &[u8; 4] = b"fmt ";
pub const DATA_CHUNK: &[u8; 4] = b"data";
