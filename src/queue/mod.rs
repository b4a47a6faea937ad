//! Queue Engine: the heart of the crate.
//!
//! Maintains in-memory head/tail cursors and a running used-byte count,
//! executes add/peek/remove, decides when to grow the file, performs
//! wrap-aware reads/writes, relocates straddling elements during expansion,
//! and commits every mutation via a single header rewrite.

pub mod backend;
pub mod element;
pub mod header;

use std::path::Path;

use crate::error::{QueueError, Result};
use backend::{BlockIo, FileBackend};
use header::{Header, HEADER_SIZE, MIN_FILE_SIZE};

/// A persistent, file-backed FIFO queue of opaque byte-string records.
///
/// Generic over `BlockIo` so tests can drive the engine through a
/// fault-injecting adapter; production code uses [`Queue::open`], which
/// wires up a real [`FileBackend`].
pub struct Queue<B: BlockIo> {
    backend: B,
    file_length: u64,
    element_count: u64,
    first_offset: u64,
    last_offset: u64,
    used_bytes: u64,
}

impl Queue<FileBackend> {
    /// Open (creating if necessary) a queue file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_backend(FileBackend::open(path)?)
    }
}

impl<B: BlockIo> Queue<B> {
    /// Open a queue over an arbitrary `BlockIo` backend.
    pub fn open_with_backend(mut backend: B) -> Result<Self> {
        let mut existing_len = backend.len()?;

        if existing_len == 0 {
            log::debug!("initializing fresh queue file at minimum size {MIN_FILE_SIZE}");
            backend.set_len(MIN_FILE_SIZE)?;
            let header = Header::empty(MIN_FILE_SIZE as u32);
            backend.write_at(0, &header.encode())?;
            backend.sync()?;
            existing_len = MIN_FILE_SIZE;
        }

        // Read only as many bytes as actually exist so a file shorter than
        // the header is reported as CorruptHeader rather than an I/O error
        // from a short read.
        let mut header_bytes = vec![0u8; existing_len.min(HEADER_SIZE) as usize];
        backend.read_at(0, &mut header_bytes)?;
        let header = Header::decode(&header_bytes).inspect_err(|err| {
            log::warn!("refusing to open queue file with corrupt header: {err}");
        })?;

        let mut queue = Self {
            backend,
            file_length: header.file_length as u64,
            element_count: header.element_count as u64,
            first_offset: header.first_offset as u64,
            last_offset: header.last_offset as u64,
            used_bytes: 0,
        };
        queue.used_bytes = queue.recompute_used_bytes()?;
        Ok(queue)
    }

    /// Number of live elements currently in the queue.
    pub fn size(&self) -> u64 {
        self.element_count
    }

    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Cached total file length, for callers that want to observe on-disk growth.
    pub fn file_length(&self) -> u64 {
        self.file_length
    }

    /// Direct access to the underlying backend, chiefly for tests that need
    /// to drive a [`backend::FaultInjector`] from outside the crate.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Release the underlying file handle. A no-op beyond dropping `self`,
    /// since every mutation already committed its own durable state.
    pub fn close(self) -> Result<()> {
        Ok(())
    }

    /// Discard all elements, leaving the file's capacity untouched.
    pub fn clear(&mut self) -> Result<bool> {
        let header = Header {
            file_length: self.file_length as u32,
            element_count: 0,
            first_offset: 0,
            last_offset: 0,
        };
        if self.commit_header(&header).is_err() {
            return Ok(false);
        }
        self.element_count = 0;
        self.first_offset = 0;
        self.last_offset = 0;
        self.used_bytes = 0;
        Ok(true)
    }

    /// Append `data` to the tail of the queue.
    pub fn add(&mut self, data: &[u8]) -> Result<bool> {
        let payload_len = u32::try_from(data.len())
            .map_err(|_| QueueError::InvalidArgument("element length exceeds u32::MAX".into()))?
            as u64;
        let required = element::LENGTH_PREFIX_SIZE + payload_len;

        if required > self.capacity() - self.used_bytes {
            if let Err(err) = self.expand_for(required) {
                return match err {
                    QueueError::CapacityExceeded => Err(err),
                    QueueError::Io(_) => Ok(false),
                    other => Err(other),
                };
            }
        }

        let new_offset = match self.next_write_offset() {
            Ok(offset) => offset,
            Err(QueueError::Io(_)) => return Ok(false),
            Err(err) => return Err(err),
        };

        let mut record = Vec::with_capacity(required as usize);
        record.extend_from_slice(&element::encode_length(payload_len as u32));
        record.extend_from_slice(data);
        if self.wrap_write(new_offset, &record).is_err() {
            return Ok(false);
        }

        let new_count = self.element_count + 1;
        let new_first = if self.element_count == 0 {
            new_offset
        } else {
            self.first_offset
        };
        let header = Header {
            file_length: self.file_length as u32,
            element_count: new_count as u32,
            first_offset: new_first as u32,
            last_offset: new_offset as u32,
        };
        if self.commit_header(&header).is_err() {
            return Ok(false);
        }

        self.element_count = new_count;
        self.first_offset = new_first;
        self.last_offset = new_offset;
        self.used_bytes += required;
        Ok(true)
    }

    /// Return a fresh copy of the head element's bytes without removing it.
    pub fn peek(&mut self) -> Result<Option<Vec<u8>>> {
        if self.element_count == 0 {
            return Ok(None);
        }
        let len = self.read_element_length(self.first_offset)?;
        let data_offset = element::next_offset(HEADER_SIZE, self.file_length, self.first_offset, 0);
        let mut buf = vec![0u8; len as usize];
        self.wrap_read(data_offset, &mut buf)?;
        Ok(Some(buf))
    }

    /// Remove exactly the head element.
    pub fn remove(&mut self) -> Result<bool> {
        if self.element_count == 0 {
            return Ok(false);
        }
        let head_len = match self.read_element_length(self.first_offset) {
            Ok(len) => len,
            Err(QueueError::Io(_)) => return Ok(false),
            Err(err) => return Err(err),
        };

        let new_count = self.element_count - 1;
        let (new_first, new_last) = if new_count == 0 {
            (0, 0)
        } else {
            (
                element::next_offset(HEADER_SIZE, self.file_length, self.first_offset, head_len),
                self.last_offset,
            )
        };

        let header = Header {
            file_length: self.file_length as u32,
            element_count: new_count as u32,
            first_offset: new_first as u32,
            last_offset: new_last as u32,
        };
        if self.commit_header(&header).is_err() {
            return Ok(false);
        }

        self.element_count = new_count;
        self.first_offset = new_first;
        self.last_offset = new_last;
        self.used_bytes -= element::LENGTH_PREFIX_SIZE + head_len;
        Ok(true)
    }

    fn capacity(&self) -> u64 {
        self.file_length - HEADER_SIZE
    }

    fn commit_header(&mut self, header: &Header) -> Result<()> {
        self.backend.write_at(0, &header.encode())?;
        self.backend.sync()?;
        Ok(())
    }

    fn next_write_offset(&mut self) -> Result<u64> {
        if self.element_count == 0 {
            Ok(HEADER_SIZE)
        } else {
            let last_len = self.read_element_length(self.last_offset)?;
            Ok(element::next_offset(
                HEADER_SIZE,
                self.file_length,
                self.last_offset,
                last_len,
            ))
        }
    }

    fn read_element_length(&mut self, offset: u64) -> Result<u64> {
        let mut buf = [0u8; element::LENGTH_PREFIX_SIZE as usize];
        self.wrap_read(offset, &mut buf)?;
        Ok(element::decode_length(&buf) as u64)
    }

    /// Reconstruct `used_bytes` from the header alone, in O(1), by reading
    /// only the tail element's length rather than walking every record.
    fn recompute_used_bytes(&mut self) -> Result<u64> {
        if self.element_count == 0 {
            return Ok(0);
        }
        let tail_len = self.read_element_length(self.last_offset)?;
        let end_of_last = element::next_offset(HEADER_SIZE, self.file_length, self.last_offset, tail_len);
        let capacity = self.capacity();
        let used = (end_of_last + capacity - self.first_offset) % capacity;
        Ok(if used == 0 { capacity } else { used })
    }

    /// Write `buf` starting at `offset`, splitting across the end of the
    /// payload area if necessary. Treats the length prefix and payload as
    /// one logical byte string, so a split inside the prefix needs no
    /// special case.
    fn wrap_write(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        let capacity = self.capacity();
        let room_to_end = capacity - (offset - HEADER_SIZE);
        let first_part = room_to_end.min(buf.len() as u64) as usize;
        self.backend.write_at(offset, &buf[..first_part])?;
        if first_part < buf.len() {
            self.backend.write_at(HEADER_SIZE, &buf[first_part..])?;
        }
        Ok(())
    }

    fn wrap_read(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let capacity = self.capacity();
        let room_to_end = capacity - (offset - HEADER_SIZE);
        let first_part = room_to_end.min(buf.len() as u64) as usize;
        self.backend.read_at(offset, &mut buf[..first_part])?;
        if first_part < buf.len() {
            self.backend.read_at(HEADER_SIZE, &mut buf[first_part..])?;
        }
        Ok(())
    }

    /// Double the file length until `required` additional bytes fit, then
    /// perform a single relocation + header commit for the final size.
    fn expand_for(&mut self, required: u64) -> Result<()> {
        let mut new_file_length = self.file_length;
        while (new_file_length - HEADER_SIZE) - self.used_bytes < required {
            new_file_length = new_file_length
                .checked_mul(2)
                .ok_or(QueueError::CapacityExceeded)?;
            if new_file_length > u32::MAX as u64 {
                return Err(QueueError::CapacityExceeded);
            }
        }
        if new_file_length == self.file_length {
            return Ok(());
        }
        self.expand_to(new_file_length)
    }

    fn expand_to(&mut self, new_file_length: u64) -> Result<()> {
        let old_file_length = self.file_length;
        self.backend.set_len(new_file_length)?;

        let mut new_last_offset = self.last_offset;
        if self.element_count > 0 {
            let remaining_to_eof = old_file_length - self.first_offset;
            if self.used_bytes > remaining_to_eof {
                let wrapped_len = self.used_bytes - remaining_to_eof;
                let wrap_end = HEADER_SIZE + wrapped_len;

                let mut relocated = vec![0u8; wrapped_len as usize];
                self.backend.read_at(HEADER_SIZE, &mut relocated)?;
                self.backend.write_at(old_file_length, &relocated)?;
                self.backend.write_at(HEADER_SIZE, &vec![0u8; wrapped_len as usize])?;

                if self.last_offset < wrap_end {
                    new_last_offset = self.last_offset + (old_file_length - HEADER_SIZE);
                }
            }
        }

        let header = Header {
            file_length: new_file_length as u32,
            element_count: self.element_count as u32,
            first_offset: self.first_offset as u32,
            last_offset: new_last_offset as u32,
        };
        self.backend.write_at(0, &header.encode())?;
        self.backend.sync()?;

        log::debug!(
            "expanded queue file from {old_file_length} to {new_file_length} bytes ({} live elements)",
            self.element_count
        );

        self.file_length = new_file_length;
        self.last_offset = new_last_offset;
        Ok(())
    }
}
