//! Compression strategies and the chunked compress-and-digest loop.

use bzip2::write::BzEncoder;
use flate2::write::DeflateEncoder;
use std::io::{self, Read, Write};

use super::structures::{CompressionLevel, CompressionMethod};
use crate::io::{CountingWriter, HashingReader};

/// Bytes pulled from a source per iteration.
pub const STREAM_CHUNK_SIZE: usize = 1024 * 1024;

/// Result of compressing one entry's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest {
    /// CRC32 of the uncompressed bytes.
    pub crc32: u32,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
}

/// A streaming encoder that hands its output writer back when finished.
pub trait Compressor<W: Write>: Write {
    fn finish_stream(self: Box<Self>) -> io::Result<W>;
}

/// Pass-through "encoder" for the store method.
struct Stored<W>(W);

impl<W: Write> Write for Stored<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> Compressor<W> for Stored<W> {
    fn finish_stream(self: Box<Self>) -> io::Result<W> {
        Ok(self.0)
    }
}

impl<W: Write> Compressor<W> for DeflateEncoder<W> {
    fn finish_stream(self: Box<Self>) -> io::Result<W> {
        (*self).finish()
    }
}

impl<W: Write> Compressor<W> for BzEncoder<W> {
    fn finish_stream(self: Box<Self>) -> io::Result<W> {
        (*self).finish()
    }
}

/// Build the encoder for `method`, writing into `out`.
pub fn encoder<'w, W: Write + 'w>(
    method: CompressionMethod,
    level: CompressionLevel,
    out: W,
) -> Box<dyn Compressor<W> + 'w> {
    match method {
        CompressionMethod::Store => Box::new(Stored(out)),
        CompressionMethod::Deflate => Box::new(DeflateEncoder::new(
            out,
            flate2::Compression::new(level.deflate_level()),
        )),
        CompressionMethod::Bzip2 => Box::new(BzEncoder::new(out, bzip2::Compression::default())),
    }
}

/// Compress everything `source` yields into `sink`, one chunk at a time.
///
/// The CRC32 and length are taken from the uncompressed bytes as they are
/// read; the compressed size is what the sink actually accepted.
pub fn compress<R: Read, W: Write>(
    method: CompressionMethod,
    level: CompressionLevel,
    source: R,
    sink: W,
) -> io::Result<Digest> {
    let mut reader = HashingReader::new(source);
    let mut compressor = encoder(method, level, CountingWriter::new(sink));

    let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        compressor.write_all(&buf[..n])?;
    }

    let counter = compressor.finish_stream()?;
    let (crc32, uncompressed_size) = reader.digest();

    Ok(Digest {
        crc32,
        uncompressed_size,
        compressed_size: counter.count(),
    })
}
