//! Command-line interface for pcmkit
//!
//! Handles argument parsing and logging configuration.

use crate::wav::PcmFormat;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

/// pcmkit - record PCM audio, wrap it into WAV and round-trip it through AAC
#[derive(Parser, Debug)]
#[command(name = "pcmkit")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace (includes per-buffer capture logs), -vvvv = all deps
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (default: ~/.config/pcmkit/settings.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the PCM layout from settings
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FormatArgs {
    /// Channel count
    #[arg(short = 'c', long)]
    pub channels: Option<u16>,

    /// Sample rate in Hz
    #[arg(short = 'r', long)]
    pub sample_rate: Option<u32>,

    /// Bits per sample
    #[arg(short = 'b', long = "bits")]
    pub bits_per_sample: Option<u16>,
}

impl FormatArgs {
    /// Apply the given overrides on top of `base`
    pub fn apply(&self, base: PcmFormat) -> PcmFormat {
        PcmFormat {
            channels: self.channels.unwrap_or(base.channels),
            sample_rate: self.sample_rate.unwrap_or(base.sample_rate),
            bits_per_sample: self.bits_per_sample.unwrap_or(base.bits_per_sample),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture PCM from an audio device into a raw file
    Record {
        /// Raw PCM output (default from settings)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write to a uniquely named file in the recordings directory
        #[arg(long, conflicts_with = "output")]
        timestamped: bool,

        /// Device buffers to capture before stopping
        #[arg(short = 'n', long)]
        packets: Option<u32>,

        /// PipeWire node to capture from
        #[arg(short, long)]
        device: Option<String>,

        /// Also wrap the capture into this WAV file
        #[arg(long, value_name = "WAV")]
        wav: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Wrap headerless PCM into a WAV file
    Pcm2wav {
        /// Raw PCM input (default from settings)
        input: Option<PathBuf>,

        /// WAV output (default from settings)
        output: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,

        /// Write to a temporary file and rename it into place when done
        #[arg(long)]
        atomic: bool,

        /// Copy chunk size in bytes
        #[arg(long)]
        buffer_size: Option<usize>,
    },

    /// Encode 16-bit PCM into ADTS AAC
    Encode {
        /// Raw PCM input (default from settings)
        input: Option<PathBuf>,

        /// AAC output (default from settings)
        output: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,

        /// Target bitrate in bits per second
        #[arg(long)]
        bitrate: Option<u32>,
    },

    /// Decode ADTS AAC into 16-bit PCM
    Decode {
        /// AAC input (default from settings)
        input: Option<PathBuf>,

        /// Raw PCM output (default from settings)
        output: Option<PathBuf>,

        /// Also wrap the decoded PCM into this WAV file
        #[arg(long, value_name = "WAV")]
        wav: Option<PathBuf>,
    },

    /// Show the format and duration of a WAV file
    Info {
        /// WAV file to inspect
        input: PathBuf,

        /// Also check that the header is the canonical 44-byte layout
        #[arg(long)]
        strict: bool,
    },

    /// Print the effective settings as JSON
    Config {
        /// Save them to the settings file
        #[arg(long)]
        write: bool,
    },
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Base level for all modules - keep at warn to suppress noisy deps
    builder.filter_level(LevelFilter::Warn);

    // Set pcmkit modules to requested verbosity level
    builder.filter_module("pcmkit", args.log_level());

    // Codec and audio server libraries only at -vvvv (very verbose)
    if args.verbose >= 4 {
        builder.filter_module("symphonia", args.log_level());
        builder.filter_module("symphonia_codec_aac", args.log_level());
        builder.filter_module("pipewire", args.log_level());
    }

    builder.format_timestamp_millis().init();
}
