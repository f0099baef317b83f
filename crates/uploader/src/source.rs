//! Where chunk bytes come from during an upload.
//!
//! The uploader never holds the whole payload: it asks its [`ChunkSource`]
//! for one chunk's byte range at a time. In-memory buffers and files support
//! reads in any order; [`ReaderSource`] wraps a forward-only stream and can
//! only be used sequentially.

use std::fs::File;
use std::future::Future;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

/// A payload of known length that can be read by byte range.
pub trait ChunkSource {
    /// Total length in bytes
    fn len(&self) -> u64;

    /// Whether the payload is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether ranges may be requested in any order.
    fn random_access(&self) -> bool {
        true
    }

    /// Read exactly the bytes in `range`.
    fn read(&self, range: Range<u64>) -> impl Future<Output = io::Result<Bytes>> + Send;
}

impl ChunkSource for Bytes {
    fn len(&self) -> u64 {
        Self::len(self) as u64
    }

    fn read(&self, range: Range<u64>) -> impl Future<Output = io::Result<Bytes>> + Send {
        let result = if range.end > ChunkSource::len(self) || range.start > range.end {
            Err(out_of_bounds(&range, ChunkSource::len(self)))
        } else {
            Ok(self.slice(range.start as usize..range.end as usize))
        };
        std::future::ready(result)
    }
}

/// A file read by positioned reads on a blocking thread.
#[derive(Debug, Clone)]
pub struct FileSource {
    file: Arc<Mutex<File>>,
    len: u64,
}

impl FileSource {
    /// Open the file at `path`
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::from_file(File::open(path)?)
    }

    /// Wrap an open file; its current length is the payload length
    pub fn from_file(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            len,
        })
    }
}

impl ChunkSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read(&self, range: Range<u64>) -> impl Future<Output = io::Result<Bytes>> + Send {
        let file = Arc::clone(&self.file);
        let len = self.len;
        async move {
            if range.end > len || range.start > range.end {
                return Err(out_of_bounds(&range, len));
            }
            tokio::task::spawn_blocking(move || -> io::Result<Bytes> {
                let mut file = file.lock();
                file.seek(SeekFrom::Start(range.start))?;
                let mut buf = BytesMut::zeroed((range.end - range.start) as usize);
                file.read_exact(&mut buf)?;
                Ok(buf.freeze())
            })
            .await
            .map_err(io::Error::other)?
        }
    }
}

/// A forward-only reader.
///
/// Ranges must be requested in increasing order; gaps are skipped by reading
/// and discarding. Reads happen on the calling task, so the reader should
/// not block for long.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: Mutex<(R, u64)>,
    len: u64,
}

impl<R: Read> ReaderSource<R> {
    /// Wrap `reader`, which must yield `len` bytes
    pub fn new(reader: R, len: u64) -> Self {
        Self {
            inner: Mutex::new((reader, 0)),
            len,
        }
    }

    fn read_blocking(&self, range: Range<u64>) -> io::Result<Bytes> {
        if range.end > self.len || range.start > range.end {
            return Err(out_of_bounds(&range, self.len));
        }

        let mut guard = self.inner.lock();
        let (reader, position) = &mut *guard;
        if range.start < *position {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("cannot rewind from {position} to {}", range.start),
            ));
        }

        let skip = range.start - *position;
        let skipped = io::copy(&mut reader.by_ref().take(skip), &mut io::sink())?;
        if skipped != skip {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }

        let mut buf = BytesMut::zeroed((range.end - range.start) as usize);
        reader.read_exact(&mut buf)?;
        *position = range.end;
        Ok(buf.freeze())
    }
}

impl<R: Read + Send> ChunkSource for ReaderSource<R> {
    fn len(&self) -> u64 {
        self.len
    }

    fn random_access(&self) -> bool {
        false
    }

    fn read(&self, range: Range<u64>) -> impl Future<Output = io::Result<Bytes>> + Send {
        std::future::ready(self.read_blocking(range))
    }
}

fn out_of_bounds(range: &Range<u64>, len: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("range {range:?} outside source of {len} bytes"),
    )
}
