//! pcmkit - PCM capture, WAV wrapping and AAC transcoding tools
//!
//! This is the main entry point for the pcmkit command-line tool.

mod audio;
mod cli;
mod codec;
mod error;
mod settings;
mod wav;

use anyhow::{Context, Result};
use audio::{CaptureConfig, PcmRecorder};
use clap::Parser;
use cli::{Command, FormatArgs};
use codec::AacEncoderConfig;
use log::{error, info};
use settings::Settings;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use wav::PcmToWav;

fn main() -> ExitCode {
    // Parse command-line arguments and initialize logging
    let args = cli::Args::parse();
    cli::init_logging(&args);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: cli::Args) -> Result<()> {
    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;

    match args.command {
        Command::Record {
            output,
            timestamped,
            packets,
            device,
            wav,
            format,
        } => record(&settings, output, timestamped, packets, device, wav, &format),
        Command::Pcm2wav {
            input,
            output,
            format,
            atomic,
            buffer_size,
        } => {
            let input = input.unwrap_or_else(|| settings.pcm_path.clone());
            let output = output.unwrap_or_else(|| settings.wav_path.clone());
            let converter = PcmToWav::new(format.apply(settings.format))
                .with_buffer_size(buffer_size.unwrap_or(settings.buffer_size))
                .with_atomic(atomic);

            let written = converter.convert(&input, &output).with_context(|| {
                format!("Failed to convert {} to WAV", input.display())
            })?;
            println!(
                "{} -> {} ({} bytes of PCM)",
                input.display(),
                output.display(),
                written
            );
            Ok(())
        }
        Command::Encode {
            input,
            output,
            format,
            bitrate,
        } => {
            let input = input.unwrap_or_else(|| settings.pcm_path.clone());
            let output = output.unwrap_or_else(|| settings.aac_path.clone());
            let mut config = AacEncoderConfig::from_settings(&settings);
            config.format = format.apply(config.format);
            config.bitrate = bitrate.unwrap_or(config.bitrate);

            let summary = codec::encode_file(&config, &input, &output)
                .with_context(|| format!("Failed to encode {}", input.display()))?;
            println!(
                "{} -> {} ({} frames, {} bytes)",
                input.display(),
                output.display(),
                summary.frames,
                summary.bytes
            );
            Ok(())
        }
        Command::Decode { input, output, wav } => {
            let input = input.unwrap_or_else(|| settings.aac_path.clone());
            let output = output.unwrap_or_else(|| settings.pcm_path.clone());

            let spec = codec::decode_file(&input, &output)
                .with_context(|| format!("Failed to decode {}", input.display()))?;
            println!(
                "{} -> {} ({} Hz, {} channels, {} frames)",
                input.display(),
                output.display(),
                spec.sample_rate,
                spec.channels,
                spec.frames
            );

            if let Some(wav_path) = wav {
                wrap(spec.pcm_format(), &output, &wav_path)?;
            }
            Ok(())
        }
        Command::Info { input, strict } => info_command(&input, strict),
        Command::Config { write } => {
            println!("{}", serde_json::to_string_pretty(&settings)?);

            if write {
                let path = match args.config {
                    Some(path) => path,
                    None => Settings::default_path()
                        .context("No configuration directory on this system")?,
                };
                settings.save(&path)?;
                info!("Saved settings to {}", path.display());
            }
            Ok(())
        }
    }
}

fn record(
    settings: &Settings,
    output: Option<PathBuf>,
    timestamped: bool,
    packets: Option<u32>,
    device: Option<String>,
    wav: Option<PathBuf>,
    format: &FormatArgs,
) -> Result<()> {
    let mut config = CaptureConfig::from_settings(settings);
    config.format = format.apply(config.format);
    config.packet_limit = packets.unwrap_or(config.packet_limit);
    if let Some(device) = device {
        config.device = device;
    }

    let recorder = PcmRecorder::new(config, &settings.recordings_dir);
    info!(
        "Recording {} from '{}'",
        recorder.config().format,
        recorder.config().device
    );

    let (path, summary) = if timestamped {
        recorder.record_timestamped()?
    } else {
        let path = output.unwrap_or_else(|| settings.pcm_path.clone());
        let summary = recorder
            .record(&path)
            .with_context(|| format!("Failed to record into {}", path.display()))?;
        (path, summary)
    };

    println!(
        "Recorded {} ({} buffers, {} bytes, {})",
        path.display(),
        summary.packets,
        summary.bytes,
        summary.format
    );

    if let Some(wav_path) = wav {
        wrap(summary.format, &path, &wav_path)?;
    }
    Ok(())
}

/// Wrap a freshly produced PCM file into WAV
fn wrap(format: wav::PcmFormat, pcm_path: &Path, wav_path: &Path) -> Result<()> {
    let written = wav::pcm_to_wav(format, pcm_path, wav_path)
        .with_context(|| format!("Failed to wrap {} into WAV", pcm_path.display()))?;
    println!(
        "{} -> {} ({} bytes of PCM)",
        pcm_path.display(),
        wav_path.display(),
        written
    );
    Ok(())
}

fn info_command(input: &Path, strict: bool) -> Result<()> {
    let info = wav::inspect(input, strict)
        .with_context(|| format!("Failed to inspect {}", input.display()))?;

    println!("{}", input.display());
    println!("  channels:        {}", info.format.channels);
    println!("  sample rate:     {} Hz", info.format.sample_rate);
    println!("  bits per sample: {}", info.format.bits_per_sample);
    println!("  sample format:   {:?}", info.sample_format);
    println!("  frames:          {}", info.frames);
    println!("  duration:        {:.3}s", info.duration_seconds());

    match info.canonical {
        Some(Ok(header)) => println!(
            "  canonical:       yes ({} data bytes)",
            header.data_size
        ),
        Some(Err(reason)) => println!("  canonical:       no ({})", reason),
        None => {}
    }
    Ok(())
}
