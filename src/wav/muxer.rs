//! Wrapping headerless PCM into a WAV file

use super::header::{PcmFormat, WavHeader};
use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Default copy chunk size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Which side of the payload copy failed
#[derive(Debug)]
enum CopyFailure {
    Read(io::Error),
    Write(io::Error),
}

/// PCM to WAV converter
pub struct PcmToWav {
    format: PcmFormat,
    buffer_size: usize,
    atomic: bool,
}

impl PcmToWav {
    /// Create a converter for PCM laid out as `format`
    pub fn new(format: PcmFormat) -> Self {
        Self {
            format,
            buffer_size: DEFAULT_BUFFER_SIZE,
            atomic: false,
        }
    }

    /// Set the copy chunk size
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Write to a temporary sibling file and rename it into place on success
    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    /// Convert `pcm_path` into a WAV file at `wav_path`
    ///
    /// Returns the number of payload bytes written. Nothing is created at
    /// `wav_path` when the format is invalid or the source cannot be opened,
    /// and a `wav_path` naming the source file itself is refused.
    pub fn convert(&self, pcm_path: &Path, wav_path: &Path) -> Result<u64> {
        self.format.validate()?;

        let mut source =
            File::open(pcm_path).map_err(|e| Error::source_unavailable(pcm_path, e))?;
        let data_len = source
            .metadata()
            .map_err(|e| Error::source_unavailable(pcm_path, e))?
            .len();
        let header = WavHeader::new(self.format, data_len)?;

        if same_file(pcm_path, wav_path) {
            return Err(Error::sink_unavailable(
                wav_path,
                io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("output is the input file {}", pcm_path.display()),
                ),
            ));
        }

        debug!(
            "WAV header for {}: {}, block align {}, byte rate {}, data {} bytes",
            pcm_path.display(),
            self.format,
            self.format.block_align(),
            self.format.byte_rate(),
            header.data_size
        );

        let target = if self.atomic {
            partial_path(wav_path)
        } else {
            wav_path.to_path_buf()
        };

        let result = self.write_file(&header, &mut source, pcm_path, &target);

        if self.atomic {
            match result {
                Ok(_) => {
                    if let Err(e) = fs::rename(&target, wav_path) {
                        discard_partial(&target);
                        return Err(Error::write_failure(wav_path, e));
                    }
                }
                Err(_) => discard_partial(&target),
            }
        }

        let written = result?;
        info!(
            "Wrapped {} into {} ({} bytes of PCM, {:.2}s)",
            pcm_path.display(),
            wav_path.display(),
            written,
            self.format.duration_seconds(written)
        );
        Ok(written)
    }

    fn write_file(
        &self,
        header: &WavHeader,
        source: &mut File,
        pcm_path: &Path,
        target: &Path,
    ) -> Result<u64> {
        let file = File::create(target).map_err(|e| Error::sink_unavailable(target, e))?;
        let mut writer = BufWriter::new(file);

        let written = self
            .write_stream(header, source, &mut writer)
            .map_err(|failure| match failure {
                CopyFailure::Read(e) => Error::source_unavailable(pcm_path, e),
                CopyFailure::Write(e) => Error::write_failure(target, e),
            })?;

        let file = writer
            .into_inner()
            .map_err(|e| Error::write_failure(target, e.into_error()))?;
        if self.atomic {
            file.sync_all()
                .map_err(|e| Error::write_failure(target, e))?;
        }

        Ok(written)
    }

    /// Write the header then exactly `header.data_size` bytes from `reader`
    fn write_stream<R: Read, W: Write>(
        &self,
        header: &WavHeader,
        reader: &mut R,
        writer: &mut W,
    ) -> std::result::Result<u64, CopyFailure> {
        writer
            .write_all(&header.to_bytes())
            .map_err(CopyFailure::Write)?;

        let expected = u64::from(header.data_size);
        let mut payload = reader.take(expected);
        let mut buffer = vec![0u8; self.buffer_size];
        let mut copied = 0u64;

        loop {
            let n = match payload.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CopyFailure::Read(e)),
            };
            writer.write_all(&buffer[..n]).map_err(CopyFailure::Write)?;
            copied += n as u64;
        }

        if copied < expected {
            return Err(CopyFailure::Read(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("source ended after {} of {} bytes", copied, expected),
            )));
        }

        writer.flush().map_err(CopyFailure::Write)?;
        Ok(copied)
    }
}

/// Convert `pcm_path` into `wav_path` with default options
pub fn pcm_to_wav(format: PcmFormat, pcm_path: &Path, wav_path: &Path) -> Result<u64> {
    PcmToWav::new(format).convert(pcm_path, wav_path)
}

/// Temporary sibling used for atomic writes
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

fn discard_partial(target: &Path) {
    if let Err(e) = fs::remove_file(target) {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", target.display(), e);
        }
    }
}

/// Whether both paths resolve to one existing file
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
