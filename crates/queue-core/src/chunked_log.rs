//! The chunked multi-file record log (§4.3): a directory of `data_<N>.bin` files, rolled on a
//! soft size threshold, with head/interior reclamation and renumbering back to a single empty
//! chunk once the whole log drains.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use queue_vfs::traits::{RandomAccess, RandomAccessWrite, WritableFile, WritableFilesystem};

use crate::error::LogError;
use crate::frame_scan::{next_frame, scan_live_summary};
use crate::record::{Handle, DELETED_MARKER, HEADER_SIZE, LIVE_MARKER};
use crate::record_log::RecordLog;


const LOCK_FILE_NAME: &str = "LOCK";

struct Chunk<FS: WritableFilesystem> {
    read_file:     FS::RandomAccessFile,
    write_file:    FS::RandomAccessWriteFile,
    append_file:   FS::AppendFile,
    append_cursor: u64,
    read_cursor:   u64,
    live_count:    u64,
}

impl<FS: WritableFilesystem> Chunk<FS> {
    fn drained(&self) -> bool {
        self.read_cursor >= self.append_cursor
    }

    fn empty(&self) -> bool {
        self.live_count == 0 && self.drained()
    }
}

/// A [`RecordLog`] sharded across numbered `data_<N>.bin` files in a directory, rolling to a new
/// file once the tail chunk's size reaches a configurable threshold, and reclaiming (deleting)
/// chunk files once every record in them has been both read and deleted.
pub struct ChunkedLog<FS: WritableFilesystem> {
    fs:           FS,
    dir:          PathBuf,
    threshold:    u64,
    lockfile:     Option<FS::Lockfile>,
    chunks:       BTreeMap<u64, Chunk<FS>>,
    head_n:       u64,
    tail_n:       u64,
    /// The chunk number [`read_next_record`](RecordLog::read_next_record) is currently draining;
    /// distinct from `head_n`, which tracks the oldest chunk not yet physically reclaimed.
    read_n:       u64,
    unread_count: u64,
}

impl<FS> Debug for ChunkedLog<FS>
where
    FS: WritableFilesystem + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ChunkedLog")
            .field("dir", &self.dir)
            .field("threshold", &self.threshold)
            .field("head_n", &self.head_n)
            .field("tail_n", &self.tail_n)
            .field("read_n", &self.read_n)
            .field("unread_count", &self.unread_count)
            .field("chunk_count", &self.chunks.len())
            .field("closed", &self.lockfile.is_none())
            .finish_non_exhaustive()
    }
}

impl<FS: WritableFilesystem> ChunkedLog<FS> {
    /// Opens (creating if necessary) a chunked record log in the directory at `dir`.
    ///
    /// `threshold` is the soft per-chunk size limit in bytes: once a tail chunk's size reaches
    /// or exceeds it, appends roll to a new chunk. A single record larger than `threshold` is
    /// still accepted in full; the chunk it lands in simply rolls immediately afterward.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Locked`] if another instance already holds the directory's lock, or
    /// [`LogError::Io`] if a filesystem operation fails.
    pub fn open(
        fs:         FS,
        dir:        impl Into<PathBuf>,
        threshold:  u64,
        create_dir: bool,
    ) -> Result<Self, LogError> {
        let dir = dir.into();

        if create_dir {
            fs.create_dir_all(&dir).map_err(LogError::io)?;
        }

        let lockfile = fs
            .create_and_lock(&dir.join(LOCK_FILE_NAME), create_dir)
            .map_err(LogError::from_lock_error)?;

        let mut numbers = Vec::new();
        for child in fs.children(&dir).map_err(LogError::io)? {
            let child = child.map_err(LogError::io)?;
            if let Some(name) = child.to_str() {
                if let Some(n) = parse_chunk_number(name) {
                    numbers.push(n);
                }
            }
        }
        numbers.sort_unstable();

        let mut log = Self {
            fs,
            dir,
            threshold: threshold.max(1),
            lockfile: Some(lockfile),
            chunks: BTreeMap::new(),
            head_n: 1,
            tail_n: 1,
            read_n: 1,
            unread_count: 0,
        };

        if numbers.is_empty() {
            log.create_chunk(1)?;
        } else {
            for n in numbers {
                log.open_existing_chunk(n)?;
            }
            log.head_n = *log.chunks.keys().next().expect("just populated");
            log.tail_n = *log.chunks.keys().next_back().expect("just populated");
            log.read_n = log.head_n;
        }

        log.unread_count = log.chunks.values().map(|c| c.live_count).sum();

        Ok(log)
    }

    fn chunk_path(&self, n: u64) -> PathBuf {
        self.dir.join(format!("data_{n}.bin"))
    }

    fn ensure_open(&self) -> Result<(), LogError> {
        if self.lockfile.is_some() {
            Ok(())
        } else {
            Err(LogError::Closed)
        }
    }

    fn create_chunk(&mut self, n: u64) -> Result<(), LogError> {
        let path = self.chunk_path(n);
        drop(self.fs.open_writable(&path, false).map_err(LogError::io)?);

        let read_file   = self.fs.open_random_access(&path).map_err(LogError::io)?;
        let write_file  = self.fs.open_random_access_writable(&path).map_err(LogError::io)?;
        let append_file = self.fs.open_appendable(&path, false).map_err(LogError::io)?;

        self.chunks.insert(n, Chunk {
            read_file,
            write_file,
            append_file,
            append_cursor: 0,
            read_cursor:   0,
            live_count:    0,
        });

        Ok(())
    }

    fn open_existing_chunk(&mut self, n: u64) -> Result<(), LogError> {
        let path = self.chunk_path(n);
        let size = self.fs.size_of(&path).map_err(LogError::io)?;

        let mut read_file = self.fs.open_random_access(&path).map_err(LogError::io)?;
        let write_file    = self.fs.open_random_access_writable(&path).map_err(LogError::io)?;
        let append_file   = self.fs.open_appendable(&path, false).map_err(LogError::io)?;

        let summary = scan_live_summary(&mut read_file, size);

        self.chunks.insert(n, Chunk {
            read_file,
            write_file,
            append_file,
            append_cursor: size,
            read_cursor:   summary.first_live_offset.unwrap_or(size),
            live_count:    summary.count,
        });

        Ok(())
    }

    fn delete_chunk_file(&mut self, n: u64) -> Result<(), LogError> {
        self.fs.delete(&self.chunk_path(n)).map_err(LogError::io)
    }

    /// Rolls the tail chunk forward once it has reached the size threshold, reclaims head and
    /// interior chunks that have become fully empty, and collapses the whole log back to a
    /// single fresh `data_1.bin` once every chunk is empty.
    fn reclaim(&mut self) -> Result<(), LogError> {
        if self.chunks.values().all(Chunk::empty) {
            let numbers: Vec<u64> = self.chunks.keys().copied().collect();
            for n in numbers {
                self.delete_chunk_file(n)?;
            }
            self.chunks.clear();
            self.create_chunk(1)?;
            self.head_n = 1;
            self.tail_n = 1;
            self.read_n = 1;
            return Ok(());
        }

        while let Some(head) = self.chunks.get(&self.head_n) {
            let reclaimable = head.empty() && (head.drained() || self.head_n < self.read_n);
            if !reclaimable {
                break;
            }

            self.delete_chunk_file(self.head_n)?;
            self.chunks.remove(&self.head_n);

            let Some(&next) = self.chunks.keys().next() else { break };
            self.head_n = next;
        }

        let interior: Vec<u64> = self
            .chunks
            .iter()
            .filter(|&(&n, chunk)| n != self.head_n && n != self.tail_n && chunk.empty())
            .map(|(&n, _)| n)
            .collect();

        for n in interior {
            self.delete_chunk_file(n)?;
            self.chunks.remove(&n);
        }

        Ok(())
    }
}

impl<FS: WritableFilesystem> RecordLog for ChunkedLog<FS> {
    fn append_record(&mut self, payload: &[u8]) -> Result<Handle, LogError> {
        self.ensure_open()?;

        let length = i32::try_from(payload.len())
            .map_err(|_err| LogError::BadFormat("payload length exceeds i32::MAX".to_owned()))?;

        let tail_n = self.tail_n;
        let chunk  = self.chunks.get_mut(&tail_n).expect("tail chunk always present");
        let offset = chunk.append_cursor;

        chunk.append_file.write_all(&LIVE_MARKER).map_err(LogError::io)?;
        chunk.append_file.write_all(&length.to_le_bytes()).map_err(LogError::io)?;
        chunk.append_file.write_all(payload).map_err(LogError::io)?;
        chunk.append_file.flush().map_err(LogError::io)?;
        chunk.append_file.sync_data().map_err(LogError::io)?;

        chunk.append_cursor = offset + HEADER_SIZE + payload.len() as u64;
        chunk.live_count   += 1;
        self.unread_count  += 1;

        if chunk.append_cursor >= self.threshold {
            let new_n = tail_n + 1;
            self.create_chunk(new_n)?;
            self.tail_n = new_n;
        }

        Ok(Handle::Chunked { chunk_n: tail_n, offset })
    }

    fn read_next_record(&mut self) -> Result<Option<(Vec<u8>, Handle)>, LogError> {
        self.ensure_open()?;

        loop {
            let Some(&n) = self.chunks.range(self.read_n..).next().map(|(n, _)| n) else {
                return Ok(None);
            };
            self.read_n = n;

            let chunk = self.chunks.get_mut(&n).expect("just looked up");

            let Some(frame) = next_frame(&mut chunk.read_file, chunk.read_cursor, chunk.append_cursor) else {
                if n >= self.tail_n {
                    return Ok(None);
                }
                self.read_n = n + 1;
                continue;
            };

            chunk.read_cursor = frame.end();

            if !frame.live {
                continue;
            }

            let length = usize::try_from(frame.length)
                .map_err(|_err| LogError::BadFormat("record length does not fit in memory".to_owned()))?;
            let mut payload = vec![0_u8; length];

            chunk.read_file
                .read_exact_at(frame.offset + HEADER_SIZE, &mut payload)
                .map_err(LogError::io)?;

            self.unread_count = self.unread_count.saturating_sub(1);

            return Ok(Some((payload, Handle::Chunked { chunk_n: n, offset: frame.offset })));
        }
    }

    fn delete_record(&mut self, handle: Handle) -> Result<(), LogError> {
        self.ensure_open()?;

        let Handle::Chunked { chunk_n, offset } = handle else {
            return Err(LogError::BadFormat(
                "handle belongs to a single-file log, not a chunked log".to_owned(),
            ));
        };

        let chunk = self
            .chunks
            .get_mut(&chunk_n)
            .ok_or_else(|| LogError::BadFormat("handle refers to an already-reclaimed chunk".to_owned()))?;

        chunk.write_file.write_all_at(offset, &DELETED_MARKER).map_err(LogError::io)?;
        chunk.write_file.flush().map_err(LogError::io)?;
        chunk.live_count = chunk.live_count.saturating_sub(1);

        self.reclaim()
    }

    fn truncate(&mut self) -> Result<(), LogError> {
        self.ensure_open()?;

        let numbers: Vec<u64> = self.chunks.keys().copied().collect();
        for n in numbers {
            self.delete_chunk_file(n)?;
        }
        self.chunks.clear();
        self.create_chunk(1)?;
        self.head_n       = 1;
        self.tail_n       = 1;
        self.read_n       = 1;
        self.unread_count = 0;

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

impl<FS: WritableFilesystem> Drop for ChunkedLog<FS> {
    fn drop(&mut self) {
        if let Some(lockfile) = self.lockfile.take() {
            let _ = self.fs.unlock_and_close(lockfile);
        }
    }
}

/// Parses a chunk file name of the form `data_<N>.bin`, where `N >= 1` has no leading zeros.
fn parse_chunk_number(name: &str) -> Option<u64> {
    let digits = name.strip_prefix("data_")?.strip_suffix(".bin")?;

    if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
        return None;
    }

    digits.parse().ok()
}


#[cfg(test)]
mod tests {
    use queue_vfs::MemoryFS;

    use super::*;

    fn open(fs: &MemoryFS, dir: &str, threshold: u64) -> ChunkedLog<MemoryFS> {
        ChunkedLog::open(fs.clone(), dir, threshold, true).expect("open should succeed")
    }

    fn file_names(fs: &MemoryFS, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = fs
            .children(Path::new(dir))
            .unwrap()
            .into_iter()
            .map(Result::unwrap)
            .filter_map(|p| p.to_str().map(ToOwned::to_owned))
            .filter(|name| name != LOCK_FILE_NAME)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn rolls_on_threshold_and_reclaims_head_chunk() {
        let fs  = MemoryFS::new();
        // Frame overhead is 8 bytes; pick a threshold that lets two 1-byte records share a chunk.
        let mut log = open(&fs, "q", 16);

        let a = log.append_record(&[1]).unwrap();
        let b = log.append_record(&[2]).unwrap();
        let c = log.append_record(&[3]).unwrap();

        let Handle::Chunked { chunk_n: a_chunk, .. } = a else { unreachable!() };
        let Handle::Chunked { chunk_n: b_chunk, .. } = b else { unreachable!() };
        let Handle::Chunked { chunk_n: c_chunk, .. } = c else { unreachable!() };

        assert_eq!(a_chunk, b_chunk);
        assert_ne!(b_chunk, c_chunk);

        log.read_next_record().unwrap();
        log.read_next_record().unwrap();
        log.read_next_record().unwrap();

        log.delete_record(a).unwrap();
        log.delete_record(b).unwrap();

        let names = file_names(&fs, "q");
        assert!(!names.contains(&format!("data_{a_chunk}.bin")));
        assert!(names.contains(&format!("data_{c_chunk}.bin")));
    }

    #[test]
    fn renumbers_to_one_chunk_when_fully_drained() {
        let fs  = MemoryFS::new();
        let mut log = open(&fs, "q", 9); // each 1-byte record's frame is exactly 9 bytes

        let mut handles = Vec::new();
        for byte in 0_u8..5 {
            handles.push(log.append_record(&[byte]).unwrap());
        }

        for _ in 0..5 {
            log.read_next_record().unwrap();
        }
        for handle in handles {
            log.delete_record(handle).unwrap();
        }

        assert_eq!(file_names(&fs, "q"), vec!["data_1.bin".to_owned()]);
        assert_eq!(fs.size_of(Path::new("q/data_1.bin")).unwrap(), 0);
        assert_eq!(log.unread_count(), 0);
    }

    #[test]
    fn reopen_locked_fails() {
        let fs = MemoryFS::new();
        let _log = open(&fs, "q", 1024);

        let err = ChunkedLog::open(fs.clone(), "q", 1024, true).unwrap_err();
        assert!(matches!(err, LogError::Locked));
    }

    #[test]
    fn survives_reopen_with_existing_chunks() {
        let fs = MemoryFS::new();
        {
            let mut log = open(&fs, "q", 9);
            log.append_record(&[1]).unwrap();
            log.append_record(&[2]).unwrap();
            log.close().unwrap();
        }

        let mut log = ChunkedLog::open(fs, "q", 9, false).unwrap();
        assert_eq!(log.unread_count(), 2);
        assert_eq!(log.read_next_record().unwrap().unwrap().0, vec![1]);
        assert_eq!(log.read_next_record().unwrap().unwrap().0, vec![2]);
    }

    #[test]
    fn parses_chunk_numbers() {
        assert_eq!(parse_chunk_number("data_1.bin"), Some(1));
        assert_eq!(parse_chunk_number("data_42.bin"), Some(42));
        assert_eq!(parse_chunk_number("data_01.bin"), None);
        assert_eq!(parse_chunk_number("data_.bin"), None);
        assert_eq!(parse_chunk_number("LOCK"), None);
    }
}
