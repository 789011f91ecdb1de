//! Audio capture module using PipeWire
//!
//! This module provides:
//! - Device capture of interleaved 16-bit PCM into raw files
//! - Per-buffer volume metering
//! - Timestamped recording names

mod capture;
mod recorder;

pub use capture::CaptureConfig;
pub use recorder::PcmRecorder;
