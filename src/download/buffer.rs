//! Response buffering with spill-to-disk
//!
//! A [`SpillBuffer`] is the write side used while a response streams in. It
//! starts in memory and moves to an anonymous temporary file once the body is
//! known or found to exceed the in-memory ceiling. Sealing it yields a
//! [`ResponseBody`], the read side, which can be opened any number of times.
//! The temporary file is removed when the last `ResponseBody` clone is dropped.

use std::fmt;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Write-only sink for a response body
pub struct SpillBuffer {
    sink: Sink,
    written: u64,
    max_in_memory: u64,
    buffer_size: usize,
}

enum Sink {
    Memory(Vec<u8>),
    File(BufWriter<NamedTempFile>),
}

impl SpillBuffer {
    /// Creates a buffer for a response
    ///
    /// # Arguments
    ///
    /// * `declared_length` - The Content-Length of the response, if known
    /// * `max_in_memory` - Bodies larger than this are kept on disk
    /// * `buffer_size` - Size of the write and read buffers for the disk file
    ///
    /// # Returns
    ///
    /// * `Ok(SpillBuffer)` - The buffer, on disk from the start when the
    ///   declared length already exceeds the ceiling
    /// * `Err(io::Error)` - The temporary file could not be created
    pub fn new(declared_length: Option<u64>, max_in_memory: u64, buffer_size: usize) -> io::Result<Self> {
        let buffer_size = buffer_size.max(1);
        let sink = match declared_length {
            Some(length) if length > max_in_memory => Sink::File(spill_file(buffer_size)?),
            Some(length) => Sink::Memory(Vec::with_capacity(length as usize)),
            None => Sink::Memory(Vec::new()),
        };

        Ok(Self {
            sink,
            written: 0,
            max_in_memory,
            buffer_size,
        })
    }

    /// Appends a chunk of the body, spilling to disk if the ceiling is crossed
    pub fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        if let Sink::Memory(bytes) = &mut self.sink {
            if (bytes.len() + chunk.len()) as u64 > self.max_in_memory {
                let mut file = spill_file(self.buffer_size)?;
                file.write_all(bytes)?;
                self.sink = Sink::File(file);
            }
        }

        match &mut self.sink {
            Sink::Memory(bytes) => bytes.extend_from_slice(chunk),
            Sink::File(file) => file.write_all(chunk)?,
        }
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Number of body bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Returns true once the body lives in a temporary file
    pub fn is_spilled(&self) -> bool {
        matches!(self.sink, Sink::File(_))
    }

    /// Finishes writing and converts the buffer into a readable body
    pub fn seal(self) -> io::Result<ResponseBody> {
        let storage = match self.sink {
            Sink::Memory(bytes) => Storage::Memory(Arc::from(bytes)),
            Sink::File(writer) => {
                let file = writer.into_inner().map_err(|e| e.into_error())?;
                Storage::File {
                    file,
                    buffer_size: self.buffer_size,
                }
            }
        };

        Ok(ResponseBody {
            inner: Arc::new(SealedBody {
                storage,
                len: self.written,
            }),
        })
    }
}

impl fmt::Debug for SpillBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpillBuffer")
            .field("written", &self.written)
            .field("spilled", &self.is_spilled())
            .field("max_in_memory", &self.max_in_memory)
            .finish()
    }
}

fn spill_file(buffer_size: usize) -> io::Result<BufWriter<NamedTempFile>> {
    let file = tempfile::Builder::new()
        .prefix("ripple-crawl-")
        .suffix(".body")
        .tempfile()?;
    Ok(BufWriter::with_capacity(buffer_size, file))
}

/// Read-only, re-openable response body
///
/// Clones share the same underlying bytes or file.
#[derive(Clone)]
pub struct ResponseBody {
    inner: Arc<SealedBody>,
}

struct SealedBody {
    storage: Storage,
    len: u64,
}

enum Storage {
    Memory(Arc<[u8]>),
    File {
        file: NamedTempFile,
        buffer_size: usize,
    },
}

struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl ResponseBody {
    /// A body with no content
    pub fn empty() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// A body held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self {
            inner: Arc::new(SealedBody {
                storage: Storage::Memory(Arc::from(bytes)),
                len,
            }),
        }
    }

    /// Length of the body in bytes
    pub fn len(&self) -> u64 {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Returns true if the body is stored in a temporary file
    pub fn is_on_disk(&self) -> bool {
        matches!(self.inner.storage, Storage::File { .. })
    }

    /// Opens a fresh reader positioned at the start of the body
    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        match &self.inner.storage {
            Storage::Memory(bytes) => Ok(Box::new(Cursor::new(SharedBytes(Arc::clone(bytes))))),
            Storage::File { file, buffer_size } => {
                Ok(Box::new(BufReader::with_capacity(*buffer_size, file.reopen()?)))
            }
        }
    }

    /// Reads the whole body into memory
    pub fn to_vec(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.inner.len as usize);
        self.open()?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Reads the whole body as text, replacing invalid UTF-8 sequences
    pub fn read_to_string_lossy(&self) -> io::Result<String> {
        Ok(String::from_utf8_lossy(&self.to_vec()?).into_owned())
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("len", &self.inner.len)
            .field("on_disk", &self.is_on_disk())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_body_stays_in_memory() {
        let mut buffer = SpillBuffer::new(Some(5), 1024, 16).unwrap();
        buffer.write_chunk(b"hello").unwrap();
        assert!(!buffer.is_spilled());

        let body = buffer.seal().unwrap();
        assert!(!body.is_on_disk());
        assert_eq!(body.len(), 5);
        assert_eq!(body.to_vec().unwrap(), b"hello");
    }

    #[test]
    fn test_declared_length_over_ceiling_goes_to_disk() {
        let buffer = SpillBuffer::new(Some(4096), 1024, 16).unwrap();
        assert!(buffer.is_spilled());
    }

    #[test]
    fn test_undeclared_body_spills_mid_stream() {
        let mut buffer = SpillBuffer::new(None, 8, 4).unwrap();
        buffer.write_chunk(b"12345").unwrap();
        assert!(!buffer.is_spilled());
        buffer.write_chunk(b"67890").unwrap();
        assert!(buffer.is_spilled());
        assert_eq!(buffer.bytes_written(), 10);

        let body = buffer.seal().unwrap();
        assert!(body.is_on_disk());
        assert_eq!(body.read_to_string_lossy().unwrap(), "1234567890");
    }

    #[test]
    fn test_body_can_be_read_repeatedly() {
        let mut buffer = SpillBuffer::new(None, 0, 8).unwrap();
        buffer.write_chunk(b"first read, second read").unwrap();
        let body = buffer.seal().unwrap();
        let shared = body.clone();

        let mut first = String::new();
        body.open().unwrap().read_to_string(&mut first).unwrap();
        let mut second = String::new();
        shared.open().unwrap().read_to_string(&mut second).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, "first read, second read");
    }

    #[test]
    fn test_empty_body() {
        let body = ResponseBody::empty();
        assert!(body.is_empty());
        assert!(body.to_vec().unwrap().is_empty());
    }
}
