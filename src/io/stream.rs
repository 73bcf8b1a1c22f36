//! Byte streams with optional rollback support.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// A readable byte source.
///
/// Seekable sources let the resolver rewind after a candidate consumed
/// input it could not decode.
pub trait ReadStream: Read {
    /// Whether [`position`](Self::position) and [`rewind_to`](Self::rewind_to) work.
    fn is_seekable(&self) -> bool;

    /// Returns the current read position.
    fn position(&mut self) -> io::Result<u64>;

    /// Moves the read position back to `position`.
    fn rewind_to(&mut self, position: u64) -> io::Result<()>;
}

/// A writable byte sink.
///
/// Seekable sinks let the resolver discard a failed candidate's partial
/// output by seeking back and truncating.
pub trait WriteStream: Write {
    /// Whether position, rewind and truncate work.
    fn is_seekable(&self) -> bool;

    /// Returns the current write position.
    fn position(&mut self) -> io::Result<u64>;

    /// Moves the write position back to `position`.
    fn rewind_to(&mut self, position: u64) -> io::Result<()>;

    /// Drops everything after `len` bytes.
    fn truncate_at(&mut self, len: u64) -> io::Result<()>;
}

fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "stream is not seekable")
}

impl<T: ReadStream + ?Sized> ReadStream for &mut T {
    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }

    fn position(&mut self) -> io::Result<u64> {
        (**self).position()
    }

    fn rewind_to(&mut self, position: u64) -> io::Result<()> {
        (**self).rewind_to(position)
    }
}

impl<T: WriteStream + ?Sized> WriteStream for &mut T {
    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }

    fn position(&mut self) -> io::Result<u64> {
        (**self).position()
    }

    fn rewind_to(&mut self, position: u64) -> io::Result<()> {
        (**self).rewind_to(position)
    }

    fn truncate_at(&mut self, len: u64) -> io::Result<()> {
        (**self).truncate_at(len)
    }
}

impl ReadStream for File {
    fn is_seekable(&self) -> bool {
        true
    }

    fn position(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    fn rewind_to(&mut self, position: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(position)).map(|_| ())
    }
}

impl WriteStream for File {
    fn is_seekable(&self) -> bool {
        true
    }

    fn position(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    fn rewind_to(&mut self, position: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(position)).map(|_| ())
    }

    fn truncate_at(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl<T: AsRef<[u8]>> ReadStream for Cursor<T> {
    fn is_seekable(&self) -> bool {
        true
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(Cursor::position(self))
    }

    fn rewind_to(&mut self, position: u64) -> io::Result<()> {
        self.set_position(position);
        Ok(())
    }
}

impl WriteStream for Cursor<Vec<u8>> {
    fn is_seekable(&self) -> bool {
        true
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(Cursor::position(self))
    }

    fn rewind_to(&mut self, position: u64) -> io::Result<()> {
        self.set_position(position);
        Ok(())
    }

    fn truncate_at(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len).map_err(io::Error::other)?;
        self.get_mut().truncate(len);
        Ok(())
    }
}

/// Adapts a plain reader or writer (a pipe, a decoder, an encoder) as a
/// non-seekable stream.
#[derive(Debug)]
pub struct Unseekable<T>(T);

impl<T> Unseekable<T> {
    /// Wraps `inner`.
    pub const fn new(inner: T) -> Self {
        Self(inner)
    }

    /// Returns a reference to the wrapped value.
    pub const fn get_ref(&self) -> &T {
        &self.0
    }

    /// Unwraps the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Read> Read for Unseekable<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<T: Write> Write for Unseekable<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<T: Read> ReadStream for Unseekable<T> {
    fn is_seekable(&self) -> bool {
        false
    }

    fn position(&mut self) -> io::Result<u64> {
        Err(unsupported())
    }

    fn rewind_to(&mut self, _position: u64) -> io::Result<()> {
        Err(unsupported())
    }
}

impl<T: Write> WriteStream for Unseekable<T> {
    fn is_seekable(&self) -> bool {
        false
    }

    fn position(&mut self) -> io::Result<u64> {
        Err(unsupported())
    }

    fn rewind_to(&mut self, _position: u64) -> io::Result<()> {
        Err(unsupported())
    }

    fn truncate_at(&mut self, _len: u64) -> io::Result<()> {
        Err(unsupported())
    }
}

/// Reads exactly `N` bytes, or returns `None` if the source ends first.
pub fn read_magic<const N: usize>(source: &mut dyn ReadStream) -> io::Result<Option<[u8; N]>> {
    let mut magic = [0u8; N];
    match source.read_exact(&mut magic) {
        Ok(()) => Ok(Some(magic)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}
