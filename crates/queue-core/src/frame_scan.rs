//! Shared, corruption-tolerant frame scanning used by both the single-file and chunked logs.

use queue_vfs::traits::RandomAccess;

use crate::record::{DELETED_MARKER, HEADER_SIZE, LIVE_MARKER};


/// A well-formed frame found while scanning a file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameAt {
    pub offset: u64,
    pub live:   bool,
    pub length: u64,
}

impl FrameAt {
    /// The offset one past the end of this frame's payload; where the next frame, if any, begins.
    pub(crate) fn end(&self) -> u64 {
        self.offset + HEADER_SIZE + self.length
    }
}

/// Scans forward from `offset` within the first `size` bytes of `file`, skipping corrupt bytes
/// one at a time (invalid marker, impossible length, or a payload that would extend past `size`),
/// and returns the first well-formed frame found (live or deleted).
///
/// Returns `None` once fewer than a full marker's worth of bytes remain before `size`, per the
/// "any byte of the marker cannot be read" stop condition; a frame whose declared length would
/// run past `size` is treated as corruption and skipped rather than returned.
pub(crate) fn next_frame<F: RandomAccess>(
    file:   &mut F,
    offset: u64,
    size:   u64,
) -> Option<FrameAt> {
    let mut offset  = offset;
    let mut marker  = [0_u8; 4];
    let mut len_buf = [0_u8; 4];

    while offset < size {
        if file.read_exact_at(offset, &mut marker).is_err() {
            return None;
        }

        let live = match marker {
            LIVE_MARKER    => true,
            DELETED_MARKER => false,
            _ => {
                offset += 1;
                continue;
            }
        };

        if file.read_exact_at(offset + 4, &mut len_buf).is_err() {
            offset += 1;
            continue;
        }

        let length         = i32::from_le_bytes(len_buf);
        let payload_start  = offset + HEADER_SIZE;
        let remaining      = size.saturating_sub(payload_start);

        let Ok(length) = u64::try_from(length) else {
            offset += 1;
            continue;
        };

        if length > remaining {
            offset += 1;
            continue;
        }

        return Some(FrameAt { offset, live, length });
    }

    None
}

/// The live-record summary produced by scanning a whole file at open (or after a delete, to
/// decide how much of the tail can be reclaimed).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LiveSummary {
    /// Number of live (not-yet-deleted) records found.
    pub count:             u64,
    /// Offset of the first live record's marker, if any were found.
    ///
    /// Used to seed a log's read cursor past a leading run of already-deleted records.
    pub first_live_offset: Option<u64>,
    /// The offset one past the end of the last live record found.
    ///
    /// Bytes from here to the file's size are either deleted records or corruption, and can be
    /// dropped by a tail truncation without touching any live data.
    pub last_live_end:     Option<u64>,
}

/// Scans all of `0..size`, tolerating corruption as [`next_frame`] does, and summarizes the live
/// records found.
pub(crate) fn scan_live_summary<F: RandomAccess>(file: &mut F, size: u64) -> LiveSummary {
    let mut offset  = 0;
    let mut summary = LiveSummary::default();

    while let Some(frame) = next_frame(file, offset, size) {
        if frame.live {
            summary.count += 1;
            summary.first_live_offset.get_or_insert(frame.offset);
            summary.last_live_end = Some(frame.end());
        }
        offset = frame.end();
    }

    summary
}
