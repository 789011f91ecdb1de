//! Audio capture using PipeWire
//!
//! Appends raw device buffers to a sink with per-buffer level metering.

#![cfg_attr(not(feature = "capture"), allow(dead_code))]

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::wav::PcmFormat;
use log::trace;
use std::io::{self, Write};
use std::path::Path;

/// Whether this build can talk to an audio device
pub const CAPTURE_SUPPORTED: bool = cfg!(feature = "capture");

/// Audio capture configuration
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// PipeWire node name, "default" to auto-connect
    pub device: String,
    /// Requested sample layout (16-bit only)
    pub format: PcmFormat,
    /// Number of device buffers to capture
    pub packet_limit: u32,
}

impl CaptureConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            device: settings.device.clone(),
            format: settings.format,
            packet_limit: settings.packet_limit,
        }
    }

    /// Check the request before opening anything
    pub fn validate(&self) -> Result<()> {
        self.format.validate()?;
        if self.format.bits_per_sample != 16 {
            return Err(Error::invalid_format(format!(
                "capture records signed 16-bit samples, not {}-bit",
                self.format.bits_per_sample
            )));
        }
        if self.packet_limit == 0 {
            return Err(Error::invalid_format("packet limit must be positive"));
        }
        Ok(())
    }
}

/// Result of a finished capture
#[derive(Clone, Debug)]
pub struct CaptureSummary {
    pub packets: u32,
    pub bytes: u64,
    /// Format the device actually delivered
    pub format: PcmFormat,
    pub peak_level: f32,
}

/// Running level statistics over captured buffers
#[derive(Clone, Debug, Default)]
pub struct CaptureStats {
    pub packets: u32,
    pub bytes: u64,
    /// Highest absolute sample seen (0.0 - 1.0)
    pub peak_level: f32,
}

impl CaptureStats {
    /// Account for one buffer of signed 16-bit little-endian samples
    ///
    /// Returns the buffer's RMS level.
    pub fn process(&mut self, chunk: &[u8]) -> f32 {
        self.packets += 1;
        self.bytes += chunk.len() as u64;

        let samples = s16le_to_f32(chunk);
        let rms = calculate_rms(&samples);

        self.peak_level = self.peak_level.max(calculate_peak(&samples));
        rms
    }
}

/// Capture state shared with the PipeWire callbacks
pub(crate) struct CaptureSession<W: Write> {
    sink: W,
    stats: CaptureStats,
    format: PcmFormat,
    packet_limit: u32,
    error: Option<io::Error>,
}

impl<W: Write> CaptureSession<W> {
    pub(crate) fn new(sink: W, config: &CaptureConfig) -> Self {
        Self {
            sink,
            stats: CaptureStats::default(),
            format: config.format,
            packet_limit: config.packet_limit,
            error: None,
        }
    }

    /// Write one device buffer; returns false once capture should stop
    pub(crate) fn push(&mut self, chunk: &[u8]) -> bool {
        if self.error.is_some() {
            return false;
        }

        if let Err(e) = self.sink.write_all(chunk) {
            self.error = Some(e);
            return false;
        }

        let rms = self.stats.process(chunk);
        trace!(
            "pkt size is {} bytes, count={}, rms={:.3}",
            chunk.len(),
            self.stats.packets,
            rms
        );

        self.stats.packets < self.packet_limit
    }

    /// Flush the sink and report what was captured
    pub(crate) fn finish(&mut self, sink_path: &Path) -> Result<CaptureSummary> {
        if let Some(e) = self.error.take() {
            return Err(Error::write_failure(sink_path, e));
        }
        self.sink
            .flush()
            .map_err(|e| Error::write_failure(sink_path, e))?;

        Ok(CaptureSummary {
            packets: self.stats.packets,
            bytes: self.stats.bytes,
            format: self.format,
            peak_level: self.stats.peak_level,
        })
    }
}

/// Capture from the configured device into `sink` until the packet limit is reached
#[cfg(feature = "capture")]
pub fn capture<W: Write + 'static>(
    config: &CaptureConfig,
    sink: W,
    sink_path: &Path,
) -> Result<CaptureSummary> {
    use log::{info, warn};
    use pipewire as pw;
    use pw::spa;
    use pw::spa::param::format::{MediaSubtype, MediaType};
    use pw::spa::param::format_utils;
    use pw::spa::pod::Pod;
    use std::cell::RefCell;
    use std::rc::Rc;

    config.validate()?;
    pw::init();

    let mainloop = pw::main_loop::MainLoopRc::new(None)
        .map_err(|e| Error::capture(format!("Failed to create PipeWire main loop: {}", e)))?;

    let context = pw::context::ContextRc::new(&mainloop, None)
        .map_err(|e| Error::capture(format!("Failed to create PipeWire context: {}", e)))?;

    let core = context
        .connect_rc(None)
        .map_err(|e| Error::capture(format!("Failed to connect to PipeWire: {}", e)))?;

    let session = Rc::new(RefCell::new(CaptureSession::new(sink, config)));
    let stream_error: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));

    let mut props = pw::properties::properties! {
        *pw::keys::MEDIA_TYPE => "Audio",
        *pw::keys::MEDIA_CATEGORY => "Capture",
        *pw::keys::MEDIA_ROLE => "Production",
        *pw::keys::APP_NAME => "pcmkit",
    };
    if config.device != "default" {
        props.insert(*pw::keys::TARGET_OBJECT, config.device.as_str());
    }

    let stream = pw::stream::StreamBox::new(&core, "pcmkit-capture", props)
        .map_err(|e| Error::capture(format!("Failed to create PipeWire stream: {}", e)))?;

    let param_session = session.clone();
    let process_session = session.clone();
    let state_error = stream_error.clone();
    let process_loop = mainloop.downgrade();
    let state_loop = mainloop.downgrade();

    let _listener = stream
        .add_local_listener_with_user_data(spa::param::audio::AudioInfoRaw::default())
        .state_changed(move |_, _, _old, new| {
            if let pw::stream::StreamState::Error(message) = new {
                *state_error.borrow_mut() = Some(message);
                if let Some(mainloop) = state_loop.upgrade() {
                    mainloop.quit();
                }
            }
        })
        .param_changed(move |_, audio_info, id, param| {
            let Some(param) = param else { return };
            if id != spa::param::ParamType::Format.as_raw() {
                return;
            }

            let (media_type, media_subtype) = match format_utils::parse_format(param) {
                Ok(v) => v,
                Err(_) => return,
            };

            if media_type != MediaType::Audio || media_subtype != MediaSubtype::Raw {
                return;
            }

            if let Err(e) = audio_info.parse(param) {
                warn!("Failed to parse negotiated audio format: {:?}", e);
                return;
            }

            let negotiated =
                PcmFormat::new(audio_info.channels() as u16, audio_info.rate(), 16);
            info!(
                "Capture stream format: {} ({:?})",
                negotiated,
                audio_info.format()
            );

            let mut session = param_session.borrow_mut();
            if negotiated != session.format {
                warn!(
                    "Device delivers {} instead of the requested {}",
                    negotiated, session.format
                );
            }
            session.format = negotiated;
        })
        .process(move |stream, _| {
            let Some(mut buffer) = stream.dequeue_buffer() else {
                return;
            };

            let datas = buffer.datas_mut();
            if datas.is_empty() {
                return;
            }

            let data = &mut datas[0];
            let offset = data.chunk().offset() as usize;
            let size = data.chunk().size() as usize;

            if let Some(bytes) = data.data() {
                let end = (offset + size).min(bytes.len());
                let start = offset.min(end);

                if !process_session.borrow_mut().push(&bytes[start..end]) {
                    if let Some(mainloop) = process_loop.upgrade() {
                        mainloop.quit();
                    }
                }
            }
        })
        .register()
        .map_err(|e| Error::capture(format!("Failed to register stream listener: {}", e)))?;

    // Request S16LE at the configured rate and channel count
    let mut audio_info = spa::param::audio::AudioInfoRaw::new();
    audio_info.set_format(spa::param::audio::AudioFormat::S16LE);
    audio_info.set_rate(config.format.sample_rate);
    audio_info.set_channels(u32::from(config.format.channels));

    let obj = spa::pod::Object {
        type_: spa::utils::SpaTypes::ObjectParamFormat.as_raw(),
        id: spa::param::ParamType::EnumFormat.as_raw(),
        properties: audio_info.into(),
    };

    let values: Vec<u8> = spa::pod::serialize::PodSerializer::serialize(
        std::io::Cursor::new(Vec::new()),
        &spa::pod::Value::Object(obj),
    )
    .map_err(|e| Error::capture(format!("Failed to serialize audio format: {:?}", e)))?
    .0
    .into_inner();

    let pod = Pod::from_bytes(&values)
        .ok_or_else(|| Error::capture("Serialized audio format is not a valid pod"))?;
    let mut params = [pod];

    stream
        .connect(
            spa::utils::Direction::Input,
            None,
            pw::stream::StreamFlags::AUTOCONNECT
                | pw::stream::StreamFlags::MAP_BUFFERS
                | pw::stream::StreamFlags::RT_PROCESS,
            &mut params,
        )
        .map_err(|e| Error::capture(format!("Failed to connect stream: {}", e)))?;

    info!(
        "Capturing {} buffers from device '{}'",
        config.packet_limit, config.device
    );

    // Run until the packet limit or an error quits the loop
    mainloop.run();

    if let Some(message) = stream_error.borrow_mut().take() {
        return Err(Error::capture(format!("PipeWire stream failed: {}", message)));
    }

    let summary = session.borrow_mut().finish(sink_path);
    summary
}

/// Capture from the configured device into `sink` until the packet limit is reached
#[cfg(not(feature = "capture"))]
pub fn capture<W: Write + 'static>(
    config: &CaptureConfig,
    _sink: W,
    _sink_path: &Path,
) -> Result<CaptureSummary> {
    config.validate()?;
    Err(Error::capture(
        "built without capture support, rebuild with --features capture",
    ))
}

/// Decode signed 16-bit little-endian bytes to normalized floats
pub fn s16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

/// Calculate RMS volume from samples
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Calculate peak volume from samples
pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}
