//! Block I/O Adapter: the only layer that touches the filesystem.
//!
//! `BlockIo` is a narrow trait rather than a concrete `File` wrapper so the
//! Queue Engine can be driven by a real file in production and by a
//! fault-injecting double in tests, without a process-global flag.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;

/// Offset-addressed block storage backing a queue file.
pub trait BlockIo {
    /// Read exactly `buf.len()` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write exactly `buf.len()` bytes starting at `offset`.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Grow or shrink the backing storage to exactly `len` bytes.
    fn set_len(&mut self, len: u64) -> Result<()>;

    /// Current length of the backing storage in bytes.
    fn len(&mut self) -> Result<u64>;

    /// Guarantee that all prior successful writes are durable.
    fn sync(&mut self) -> Result<()>;
}

/// Production `BlockIo` implementation over a regular file.
pub struct FileBackend {
    file: File,
}

impl FileBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        Ok(Self { file })
    }
}

impl BlockIo for FileBackend {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        Ok(())
    }

    fn len(&mut self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// Test-only decorator that can force every subsequent write to fail.
///
/// Wraps any `BlockIo` rather than a concrete file, so tests can inject
/// faults around a real temp file without touching production code paths.
pub struct FaultInjector<B: BlockIo> {
    inner: B,
    fail_writes: bool,
}

impl<B: BlockIo> FaultInjector<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            fail_writes: false,
        }
    }

    /// While `flag` is true, `write_at` and `set_len` fail until cleared.
    pub fn force_all_writes_to_fail(&mut self, flag: bool) {
        self.fail_writes = flag;
    }

    fn injected_failure() -> crate::error::QueueError {
        crate::error::QueueError::Io(io::Error::other("injected write failure"))
    }
}

impl<B: BlockIo> BlockIo for FaultInjector<B> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(Self::injected_failure());
        }
        self.inner.write_at(offset, buf)
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        if self.fail_writes {
            return Err(Self::injected_failure());
        }
        self.inner.set_len(len)
    }

    fn len(&mut self) -> Result<u64> {
        self.inner.len()
    }

    fn sync(&mut self) -> Result<()> {
        self.inner.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn file_backend_round_trips_bytes() {
        let tmp = NamedTempFile::new().unwrap();
        let mut backend = FileBackend::open(tmp.path()).unwrap();
        backend.set_len(4096).unwrap();
        backend.write_at(10, b"hello").unwrap();
        let mut buf = [0u8; 5];
        backend.read_at(10, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(backend.len().unwrap(), 4096);
    }

    #[test]
    fn fault_injector_blocks_writes_until_cleared() {
        let tmp = NamedTempFile::new().unwrap();
        let backend = FileBackend::open(tmp.path()).unwrap();
        let mut injector = FaultInjector::new(backend);
        injector.force_all_writes_to_fail(true);
        assert!(injector.set_len(4096).is_err());
        assert!(injector.write_at(0, b"x").is_err());

        injector.force_all_writes_to_fail(false);
        injector.set_len(4096).unwrap();
        injector.write_at(0, b"x").unwrap();

        let mut buf = [0u8; 1];
        injector.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"x");
    }
}
