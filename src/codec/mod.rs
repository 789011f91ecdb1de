//! AAC transcoding of raw PCM files
//!
//! Encoding goes through the Fraunhofer FDK AAC library (cargo feature `fdk`),
//! decoding through Symphonia. Both read and write headerless interleaved
//! signed 16-bit little-endian PCM.

mod decoder;
mod encoder;

pub use decoder::decode_file;
pub use encoder::{encode_file, AacEncoderConfig};

use std::io::{ErrorKind, Read};

/// Read until `buf` is full or the reader is exhausted, returning the bytes read
#[cfg_attr(not(feature = "fdk"), allow(dead_code))]
fn fill_buffer<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most three bytes per call
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let len = buf.len().min(3);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn test_fill_buffer_across_short_reads() {
        let mut reader = Trickle(Cursor::new((0..10).collect()));
        let mut buf = [0u8; 8];

        assert_eq!(fill_buffer(&mut reader, &mut buf).unwrap(), 8);
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(fill_buffer(&mut reader, &mut buf).unwrap(), 2);
        assert_eq!(fill_buffer(&mut reader, &mut buf).unwrap(), 0);
    }
}
