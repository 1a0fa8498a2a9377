mod digest;
mod local;
mod stream;

pub use digest::{CountingWriter, HashingReader};
pub(crate) use local::open_destination;
pub use local::FileSink;
pub use stream::StreamSink;

use std::io::{self, Cursor, Seek, SeekFrom, Write};

/// Output contract for an archive.
///
/// A sink is written front to back. Seekable sinks may additionally be
/// repositioned so local headers can be patched in place after their data
/// has been written; non-seekable sinks are only usable in streaming mode.
pub trait Sink: Write {
    /// Whether [`seek_to`](Sink::seek_to) and [`position`](Sink::position) work.
    fn is_seekable(&self) -> bool;

    /// Whether the sink accepts writes.
    fn is_writable(&self) -> bool {
        true
    }

    /// Move the write position to an absolute offset.
    fn seek_to(&mut self, offset: u64) -> io::Result<()>;

    /// Current absolute write position.
    fn position(&mut self) -> io::Result<u64>;
}

impl<T> Sink for Cursor<T>
where
    Cursor<T>: Write + Seek,
{
    fn is_seekable(&self) -> bool {
        true
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(Cursor::position(self))
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }

    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        (**self).seek_to(offset)
    }

    fn position(&mut self) -> io::Result<u64> {
        (**self).position()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }

    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        (**self).seek_to(offset)
    }

    fn position(&mut self) -> io::Result<u64> {
        (**self).position()
    }
}
