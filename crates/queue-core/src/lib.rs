//! A durable, transactional on-disk FIFO queue with at-least-once delivery.
//!
//! Three layers compose to form the public surface:
//!
//! - A record-framed append-only log (the [`RecordLog`] trait), with two implementations:
//!   [`SingleFileLog`] (one file, tail truncation on terminal deletes) and [`ChunkedLog`] (a
//!   directory of numbered files, rolled on a size threshold, reclaimed head-first).
//! - A [`Codec`] for translating application values to and from record payloads; [`XmlCodec`] is
//!   the concrete codec in scope, but any type implementing [`Codec`] may be used.
//! - [`TransactionalQueue`], which wraps a log and a codec with receipt-based at-least-once
//!   delivery: `dequeue` hands out a [`Receipt`] that must be `commit`ted or `rollback`k before
//!   its deadline, after which it is re-offered.
//!
//! None of these layers require cross-process coordination; a [`RecordLog`] enforces single-
//! writer access to its backing storage via an exclusive lock, but multiple processes cannot
//! otherwise see each other's queues.

pub mod chunked_log;
pub mod codec;
pub mod error;
pub mod expiring_set;
pub mod queue;
pub mod record;
pub mod record_log;
pub mod single_file_log;

mod frame_scan;

pub use self::chunked_log::ChunkedLog;
pub use self::codec::{Codec, XmlCodec, XmlDocument, XmlNode};
pub use self::error::{BadPayload, LogError, QueueError};
pub use self::expiring_set::ExpiringSet;
pub use self::queue::{Receipt, TransactionalQueue};
pub use self::record::Handle;
pub use self::record_log::RecordLog;
pub use self::single_file_log::SingleFileLog;
