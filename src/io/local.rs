use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use super::Sink;
use crate::error::{DirectoryErrorKind, Error, FileErrorKind, Result};

/// Buffered file sink used for path destinations.
pub type FileSink = BufWriter<File>;

/// Whether the descriptor accepts writes. A zero-length write reaches the
/// kernel's access-mode check without touching the file.
fn accepts_writes(file: &File) -> bool {
    let mut handle = file;
    handle.write(&[]).is_ok()
}

/// Pipes, FIFOs and sockets fail `lseek` with `ESPIPE`.
fn can_seek(file: &File) -> bool {
    let mut handle = file;
    handle.stream_position().is_ok()
}

impl Sink for File {
    fn is_seekable(&self) -> bool {
        can_seek(self)
    }

    fn is_writable(&self) -> bool {
        accepts_writes(self)
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    fn position(&mut self) -> io::Result<u64> {
        self.stream_position()
    }
}

impl Sink for BufWriter<File> {
    fn is_seekable(&self) -> bool {
        can_seek(self.get_ref())
    }

    fn is_writable(&self) -> bool {
        accepts_writes(self.get_ref())
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    fn position(&mut self) -> io::Result<u64> {
        self.stream_position()
    }
}

/// Validate and open a new archive file.
///
/// The parent directory must exist and be writable. An existing file is
/// only replaced when `overwrite` is set.
pub(crate) fn open_destination(path: &Path, overwrite: bool) -> Result<FileSink> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let meta = match fs::metadata(directory) {
        Ok(meta) if meta.is_dir() => meta,
        _ => return Err(Error::directory(directory, DirectoryErrorKind::NotExists)),
    };
    if meta.permissions().readonly() {
        return Err(Error::directory(directory, DirectoryErrorKind::NotWriteable));
    }

    let existed = path.exists();
    if existed {
        if !overwrite {
            return Err(Error::file(path, FileErrorKind::Exists));
        }
        fs::remove_file(path).map_err(|_| Error::file(path, FileErrorKind::NotWriteable))?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied if existed => {
                Error::file(path, FileErrorKind::NotWriteable)
            }
            io::ErrorKind::PermissionDenied => {
                Error::directory(directory, DirectoryErrorKind::NotWriteable)
            }
            _ => Error::Io(e),
        })?;

    Ok(BufWriter::new(file))
}
