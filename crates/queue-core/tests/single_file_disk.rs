#![allow(unused_crate_dependencies, reason = "These are tests, not the main crate.")]

//! Exercises [`SingleFileLog`] against the real filesystem (via [`StandardFS`]) rather than the
//! in-memory mock, so that buffering, exclusive-lock, and truncate semantics are checked against
//! actual `File` behavior and not just the test double.

use std::fs;
use std::time::Duration;

use queue_vfs::StandardFS;

use queue_core::error::LogError;
use queue_core::queue::TransactionalQueue;
use queue_core::record_log::RecordLog;
use queue_core::single_file_log::SingleFileLog;
use queue_core::codec::{XmlCodec, XmlDocument, XmlNode};


fn doc(text: &str) -> XmlDocument {
    XmlDocument {
        root: XmlNode::Element {
            name:       "msg".to_owned(),
            attributes: Vec::new(),
            children:   vec![XmlNode::Text(text.to_owned())],
        },
    }
}

#[test]
fn round_trip_on_disk_then_empty_file() {
    let dir  = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("queue.bin");

    let log   = SingleFileLog::open(StandardFS, &path, true).expect("open");
    let queue = TransactionalQueue::<_, XmlCodec>::new(log, Duration::from_secs(30));

    for text in ["one", "two", "three"] {
        queue.enqueue(&doc(text)).unwrap();
    }

    for text in ["one", "two", "three"] {
        let receipt = queue.dequeue(None).unwrap().unwrap();
        assert_eq!(receipt.value, doc(text));
        assert!(queue.commit(receipt.id).unwrap());
    }

    assert_eq!(queue.count().unwrap(), 0);
    queue.close().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn second_open_on_same_path_is_locked() {
    let dir  = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("queue.bin");

    let _log = SingleFileLog::open(StandardFS, &path, true).expect("first open");

    let err = SingleFileLog::open(StandardFS, &path, true).unwrap_err();
    assert!(matches!(err, LogError::Locked));
}

#[test]
fn reopening_after_restart_resumes_unread_records() {
    let dir  = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("queue.bin");

    {
        let mut log = SingleFileLog::open(StandardFS, &path, true).unwrap();
        log.append_record(b"alpha").unwrap();
        log.append_record(b"beta").unwrap();
        log.close().unwrap();
    }

    let mut log = SingleFileLog::open(StandardFS, &path, false).unwrap();
    assert_eq!(log.unread_count(), 2);
    assert_eq!(log.read_next_record().unwrap().unwrap().0, b"alpha");
    assert_eq!(log.read_next_record().unwrap().unwrap().0, b"beta");
}
