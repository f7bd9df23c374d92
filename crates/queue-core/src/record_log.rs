//! The `RecordLog` trait shared by [`SingleFileLog`](crate::single_file_log::SingleFileLog) and
//! [`ChunkedLog`](crate::chunked_log::ChunkedLog).

use crate::error::LogError;
use crate::record::Handle;


/// An append-only, record-framed log supporting logical deletion and physical reclamation of
/// deleted space.
///
/// Records are read back in the order they were appended (minus any already deleted), starting
/// from the beginning of the log each time a fresh [`RecordLog`] is opened; the log itself does
/// not remember a read position across restarts; it is the responsibility of the layer above
/// (the transactional queue) to track which records have already been delivered.
pub trait RecordLog {
    /// Appends `payload` as a new live record and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying filesystem operation fails, or if the log has been
    /// [`close`](RecordLog::close)d.
    fn append_record(&mut self, payload: &[u8]) -> Result<Handle, LogError>;

    /// Reads the next not-yet-read live record, in append order, skipping over any records
    /// already marked deleted.
    ///
    /// Returns `Ok(None)` once every record appended so far has been read.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying filesystem operation fails, or if the log has been
    /// [`close`](RecordLog::close)d.
    fn read_next_record(&mut self) -> Result<Option<(Vec<u8>, Handle)>, LogError>;

    /// Marks the record at `handle` as deleted, and reclaims disk space where possible (truncating
    /// a trailing run of deleted records, or discarding/renumbering emptied chunk files).
    ///
    /// Deleting an already-deleted record, or a handle produced by a different log, is a logic
    /// error; implementations may panic, return a [`LogError::BadFormat`], or silently no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying filesystem operation fails, or if the log has been
    /// [`close`](RecordLog::close)d.
    fn delete_record(&mut self, handle: Handle) -> Result<(), LogError>;

    /// Discards every record (live or deleted) and resets the log to empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying filesystem operation fails, or if the log has been
    /// [`close`](RecordLog::close)d.
    fn truncate(&mut self) -> Result<(), LogError>;

    /// The number of live records not yet returned by [`read_next_record`](RecordLog::read_next_record).
    fn unread_count(&self) -> u64;

    /// Releases the log's lock and any open file handles. Further operations return
    /// [`LogError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the underlying lock fails.
    fn close(&mut self) -> Result<(), LogError>;
}
