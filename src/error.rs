//! Error types for pcmkit

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pcmkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while recording, converting or transcoding audio
#[derive(Error, Debug)]
pub enum Error {
    /// Input file missing, unreadable, or shorter than its reported length
    #[error("cannot read source {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output file could not be created or opened for writing
    #[error("cannot create sink {}: {source}", path.display())]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Channel count, sample rate or bit depth rejected
    #[error("invalid format parameters: {0}")]
    InvalidFormatParameters(String),

    /// PCM payload too large to describe in a RIFF header
    #[error("PCM payload of {0} bytes does not fit in a WAV file")]
    PayloadTooLarge(u64),

    /// Bytes that do not form a canonical 44-byte PCM WAV header
    #[error("malformed WAV header: {0}")]
    MalformedHeader(String),

    /// Write, flush or rename failed after the sink was opened
    #[error("failed writing {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Audio device or PipeWire stream error
    #[error("capture error: {0}")]
    Capture(String),

    /// Encoder or decoder library error
    #[error("codec error: {0}")]
    Codec(String),

    /// Settings file error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    pub fn sink_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::SinkUnavailable {
            path: path.into(),
            source,
        }
    }

    pub fn write_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::WriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid format parameters error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFormatParameters(msg.into())
    }

    /// Create a capture error
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Error::Capture(msg.into())
    }

    /// Create a codec error
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        Error::Codec(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}
