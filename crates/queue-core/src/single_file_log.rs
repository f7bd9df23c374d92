//! The single-file record log (§4.2): one random-access file, guarded by an exclusive sibling
//! lockfile, with tail truncation on terminal deletes and corruption skip-over at open.

use std::ffi::OsString;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use queue_vfs::traits::{RandomAccess, RandomAccessWrite, WritableFile, WritableFilesystem};

use crate::error::LogError;
use crate::frame_scan::{next_frame, scan_live_summary};
use crate::record::{Handle, DELETED_MARKER, HEADER_SIZE, LIVE_MARKER};
use crate::record_log::RecordLog;


/// A [`RecordLog`] backed by a single file at a caller-provided path.
///
/// The file is locked exclusively (via a sibling `<path>.lock` file) for as long as the log is
/// open, so that at most one `SingleFileLog` instance may operate on a given path at a time.
pub struct SingleFileLog<FS: WritableFilesystem> {
    fs:            FS,
    path:          PathBuf,
    lock_path:     PathBuf,
    lockfile:      Option<FS::Lockfile>,
    read_file:     FS::RandomAccessFile,
    write_file:    FS::RandomAccessWriteFile,
    append_file:   FS::AppendFile,
    append_cursor: u64,
    read_cursor:   u64,
    unread_count:  u64,
}

impl<FS> Debug for SingleFileLog<FS>
where
    FS: WritableFilesystem + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SingleFileLog")
            .field("path", &self.path)
            .field("append_cursor", &self.append_cursor)
            .field("read_cursor", &self.read_cursor)
            .field("unread_count", &self.unread_count)
            .field("closed", &self.lockfile.is_none())
            .finish_non_exhaustive()
    }
}

impl<FS: WritableFilesystem> SingleFileLog<FS> {
    /// Opens (creating if necessary) a single-file record log at `path`.
    ///
    /// If `create_dir` is set, any missing parent directories of `path` are created.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Locked`] if another instance already holds the lock on `path`, or
    /// [`LogError::Io`] if a filesystem operation fails.
    pub fn open(fs: FS, path: impl Into<PathBuf>, create_dir: bool) -> Result<Self, LogError> {
        let path      = path.into();
        let lock_path = lock_path_for(&path);

        let lockfile = fs
            .create_and_lock(&lock_path, create_dir)
            .map_err(LogError::from_lock_error)?;

        if !fs.exists(&path).map_err(LogError::io)? {
            drop(fs.open_writable(&path, create_dir).map_err(LogError::io)?);
        }

        let size = fs.size_of(&path).map_err(LogError::io)?;

        let mut read_file = fs.open_random_access(&path).map_err(LogError::io)?;
        let write_file    = fs.open_random_access_writable(&path).map_err(LogError::io)?;
        let append_file   = fs.open_appendable(&path, false).map_err(LogError::io)?;

        let summary = scan_live_summary(&mut read_file, size);

        Ok(Self {
            fs,
            path,
            lock_path,
            lockfile:      Some(lockfile),
            read_file,
            write_file,
            append_file,
            append_cursor: size,
            read_cursor:   summary.first_live_offset.unwrap_or(size),
            unread_count:  summary.count,
        })
    }

    fn ensure_open(&self) -> Result<(), LogError> {
        if self.lockfile.is_some() {
            Ok(())
        } else {
            Err(LogError::Closed)
        }
    }

    /// Shrinks the file down to just past the last remaining live record (or to zero if none
    /// remain), reclaiming whatever trailing run of deleted records and corruption follows it.
    fn reclaim_tail(&mut self) -> Result<(), LogError> {
        let summary = scan_live_summary(&mut self.read_file, self.append_cursor);

        let new_len = match summary.last_live_end {
            None      => 0,
            Some(end) => end,
        };

        if new_len < self.append_cursor {
            self.fs.set_len(&self.path, new_len).map_err(LogError::io)?;
            self.append_cursor = new_len;
            self.read_cursor   = self.read_cursor.min(new_len);
        }

        Ok(())
    }
}

impl<FS: WritableFilesystem> RecordLog for SingleFileLog<FS> {
    fn append_record(&mut self, payload: &[u8]) -> Result<Handle, LogError> {
        self.ensure_open()?;

        let offset = self.append_cursor;
        let length = i32::try_from(payload.len())
            .map_err(|_err| LogError::BadFormat("payload length exceeds i32::MAX".to_owned()))?;

        self.append_file.write_all(&LIVE_MARKER).map_err(LogError::io)?;
        self.append_file.write_all(&length.to_le_bytes()).map_err(LogError::io)?;
        self.append_file.write_all(payload).map_err(LogError::io)?;
        self.append_file.flush().map_err(LogError::io)?;
        self.append_file.sync_data().map_err(LogError::io)?;

        self.append_cursor  = offset + HEADER_SIZE + payload.len() as u64;
        self.unread_count  += 1;

        Ok(Handle::SingleFile { offset })
    }

    fn read_next_record(&mut self) -> Result<Option<(Vec<u8>, Handle)>, LogError> {
        self.ensure_open()?;

        loop {
            let Some(frame) = next_frame(&mut self.read_file, self.read_cursor, self.append_cursor) else {
                self.read_cursor = self.append_cursor;
                return Ok(None);
            };

            self.read_cursor = frame.end();

            if !frame.live {
                continue;
            }

            let length = usize::try_from(frame.length)
                .map_err(|_err| LogError::BadFormat("record length does not fit in memory".to_owned()))?;
            let mut payload = vec![0_u8; length];

            self.read_file
                .read_exact_at(frame.offset + HEADER_SIZE, &mut payload)
                .map_err(LogError::io)?;

            self.unread_count = self.unread_count.saturating_sub(1);

            return Ok(Some((payload, Handle::SingleFile { offset: frame.offset })));
        }
    }

    fn delete_record(&mut self, handle: Handle) -> Result<(), LogError> {
        self.ensure_open()?;

        let Handle::SingleFile { offset } = handle else {
            return Err(LogError::BadFormat(
                "handle belongs to a chunked log, not a single-file log".to_owned(),
            ));
        };

        self.write_file.write_all_at(offset, &DELETED_MARKER).map_err(LogError::io)?;
        self.write_file.flush().map_err(LogError::io)?;

        self.reclaim_tail()
    }

    fn truncate(&mut self) -> Result<(), LogError> {
        self.ensure_open()?;

        self.fs.set_len(&self.path, 0).map_err(LogError::io)?;
        self.append_cursor = 0;
        self.read_cursor   = 0;
        self.unread_count  = 0;

        Ok(())
    }

    fn unread_count(&self) -> u64 {
        self.unread_count
    }

    fn close(&mut self) -> Result<(), LogError> {
        if let Some(lockfile) = self.lockfile.take() {
            self.fs.unlock_and_close(lockfile).map_err(LogError::from_lock_error)?;
        }
        Ok(())
    }
}

impl<FS: WritableFilesystem> Drop for SingleFileLog<FS> {
    fn drop(&mut self) {
        if let Some(lockfile) = self.lockfile.take() {
            let _ = self.fs.unlock_and_close(lockfile);
        }
    }
}

/// Appends a `.lock` suffix to `path`'s file name, used as the sibling lockfile path.
fn lock_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().unwrap_or_default().to_owned();
    name.push(".lock");
    path.with_file_name(name)
}


#[cfg(test)]
mod tests {
    use queue_vfs::MemoryFS;

    use super::*;

    fn open(fs: &MemoryFS, path: &str) -> SingleFileLog<MemoryFS> {
        SingleFileLog::open(fs.clone(), path, true).expect("open should succeed")
    }

    #[test]
    fn round_trips_in_order() {
        let fs = MemoryFS::new();
        let mut log = open(&fs, "queue.bin");

        let h1 = log.append_record(b"one").unwrap();
        let h2 = log.append_record(b"two").unwrap();
        assert_eq!(log.unread_count(), 2);

        let (payload, handle) = log.read_next_record().unwrap().unwrap();
        assert_eq!(payload, b"one");
        assert_eq!(handle, h1);

        let (payload, handle) = log.read_next_record().unwrap().unwrap();
        assert_eq!(payload, b"two");
        assert_eq!(handle, h2);

        assert!(log.read_next_record().unwrap().is_none());
    }

    #[test]
    fn delete_and_truncate_on_last_live_record() {
        let fs = MemoryFS::new();
        let mut log = open(&fs, "queue.bin");

        let h1 = log.append_record(b"one").unwrap();
        let h2 = log.append_record(b"two").unwrap();

        log.read_next_record().unwrap();
        log.read_next_record().unwrap();

        let full_len = fs.size_of(Path::new("queue.bin")).unwrap();

        log.delete_record(h1).unwrap();
        // `h2` is still live, so nothing is reclaimed yet.
        assert_eq!(fs.size_of(Path::new("queue.bin")).unwrap(), full_len);

        log.delete_record(h2).unwrap();
        assert_eq!(fs.size_of(Path::new("queue.bin")).unwrap(), 0);
        assert_eq!(log.unread_count(), 0);
    }

    #[test]
    fn reopen_locked_fails() {
        let fs = MemoryFS::new();
        let _log = open(&fs, "queue.bin");

        let err = SingleFileLog::open(fs.clone(), "queue.bin", true).unwrap_err();
        assert!(matches!(err, LogError::Locked));
    }

    #[test]
    fn reopen_after_close_succeeds() {
        let fs = MemoryFS::new();
        let mut log = open(&fs, "queue.bin");
        log.close().unwrap();

        let log2 = SingleFileLog::open(fs, "queue.bin", true);
        assert!(log2.is_ok());
    }

    #[test]
    fn skips_corruption_between_records() {
        let fs = MemoryFS::new();
        {
            let mut log = open(&fs, "queue.bin");
            log.append_record(&[1, 2, 3, 4]).unwrap();
            log.append_record(&[5, 6, 7, 8]).unwrap();
            log.close().unwrap();
        }

        // Splice six junk bytes between the two records.
        let path = Path::new("queue.bin");
        let mut bytes = {
            let mut file = fs.open_random_access(path).unwrap();
            let size     = fs.size_of(path).unwrap();
            let mut buf  = vec![0_u8; usize::try_from(size).unwrap()];
            file.read_exact_at(0, &mut buf).unwrap();
            buf
        };
        let split = 12; // end of the first record's frame
        bytes.splice(split..split, [0_u8, 1, 2, 3, 4, 5]);

        {
            let mut file = fs.open_writable(path, false).unwrap();
            file.write_all(&bytes).unwrap();
        }

        let mut log = SingleFileLog::open(fs, "queue.bin", false).unwrap();
        assert_eq!(log.unread_count(), 2);

        let (payload, _) = log.read_next_record().unwrap().unwrap();
        assert_eq!(payload, vec![1, 2, 3, 4]);

        let (payload, _) = log.read_next_record().unwrap().unwrap();
        assert_eq!(payload, vec![5, 6, 7, 8]);
    }
}
