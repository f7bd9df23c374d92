use std::io::{Error as IoError, Read, Result as IoResult, Write};
use std::sync::{Arc, Mutex};

use crate::error::MutexPoisoned;
use crate::util_traits::{RandomAccess, RandomAccessWrite, WritableFile};


/// A file opened for sequential or random-access reading from a [`MemoryFS`](super::MemoryFS).
///
/// Holds a live reference to the file's shared buffer, locked on each read, so that writes made
/// through a different handle to the same path (e.g. the log's separate append and random-access
/// write handles) become visible to an already-open reader; this mirrors the behavior of multiple
/// open file descriptors against the same on-disk file on Unix, where one descriptor's writes are
/// visible to another's reads of the same range.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    shared: Arc<Mutex<Vec<u8>>>,
    pos:    usize,
}

impl MemoryFile {
    pub(super) fn new(shared: Arc<Mutex<Vec<u8>>>) -> Self {
        Self { shared, pos: 0 }
    }
}

impl Read for MemoryFile {
    fn read(&mut self, out: &mut [u8]) -> IoResult<usize> {
        let buf       = self.shared.lock().map_err(MutexPoisoned::from)?;
        let remaining = buf.len().saturating_sub(self.pos);
        let to_copy   = remaining.min(out.len());

        #[expect(clippy::indexing_slicing, reason = "to_copy <= remaining and out.len()")]
        out[..to_copy].copy_from_slice(&buf[self.pos..self.pos + to_copy]);

        self.pos += to_copy;
        Ok(to_copy)
    }
}

impl RandomAccess for MemoryFile {
    fn read_at(&mut self, offset: u64, out: &mut [u8]) -> IoResult<usize> {
        let offset = usize::try_from(offset)
            .map_err(IoError::other)?;

        let buf = self.shared.lock().map_err(MutexPoisoned::from)?;

        if offset >= buf.len() {
            return Ok(0);
        }

        #[expect(clippy::indexing_slicing, reason = "offset < buf.len(), checked above")]
        let available = &buf[offset..];
        let to_copy   = available.len().min(out.len());

        #[expect(clippy::indexing_slicing, reason = "to_copy <= available.len() and out.len()")]
        out[..to_copy].copy_from_slice(&available[..to_copy]);

        Ok(to_copy)
    }
}

/// A file opened for writing or appending to a [`MemoryFS`](super::MemoryFS).
///
/// Writes are buffered locally and only committed to the shared buffer on [`flush`], mirroring
/// the buffering behavior of [`BufWriter`] used by [`StandardFS`](crate::std_fs::StandardFS).
///
/// [`flush`]: Write::flush
/// [`BufWriter`]: std::io::BufWriter
#[derive(Debug)]
pub struct MemoryWriteFile {
    shared:    Arc<Mutex<Vec<u8>>>,
    pending:   Vec<u8>,
    append:    bool,
}

impl MemoryWriteFile {
    pub(super) fn new(shared: Arc<Mutex<Vec<u8>>>, append: bool) -> Self {
        Self { shared, pending: Vec::new(), append }
    }
}

impl Write for MemoryWriteFile {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut shared = self.shared.lock().map_err(MutexPoisoned::from)?;

        if self.append {
            shared.extend_from_slice(&self.pending);
        } else {
            shared.clear();
            shared.extend_from_slice(&self.pending);
            self.append = true;
        }

        self.pending.clear();
        Ok(())
    }
}

impl Drop for MemoryWriteFile {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl WritableFile for MemoryWriteFile {
    #[inline]
    fn sync_data(&mut self) -> IoResult<()> {
        self.flush()
    }
}

/// A handle opened via [`open_random_access_writable`](crate::fs_traits::WritableFilesystem::open_random_access_writable),
/// used to flip a record's marker bytes from live to deleted in place.
#[derive(Debug)]
pub struct MemoryRandomAccessFile {
    shared: Arc<Mutex<Vec<u8>>>,
}

impl MemoryRandomAccessFile {
    pub(super) fn new(shared: Arc<Mutex<Vec<u8>>>) -> Self {
        Self { shared }
    }
}

impl Write for MemoryRandomAccessFile {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        let mut shared = self.shared.lock().map_err(MutexPoisoned::from)?;
        shared.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl RandomAccessWrite for MemoryRandomAccessFile {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> IoResult<usize> {
        let offset = usize::try_from(offset).map_err(IoError::other)?;
        let mut shared = self.shared.lock().map_err(MutexPoisoned::from)?;

        let end = offset.checked_add(buf.len()).ok_or_else(|| {
            IoError::other("offset + buf.len() overflowed usize")
        })?;

        if shared.len() < end {
            shared.resize(end, 0);
        }

        #[expect(clippy::indexing_slicing, reason = "shared was just resized to at least `end`")]
        shared[offset..end].copy_from_slice(buf);

        Ok(buf.len())
    }
}
