#![allow(unused_crate_dependencies, reason = "These are tests, not the main crate.")]

//! Exercises the decode-failure path of `TransactionalQueue::dequeue` (§4.5/§7: a record whose
//! payload fails to decode is logged and silently discarded rather than returned or retried),
//! with a real `tracing` subscriber installed so the log line is actually emitted somewhere.

use std::time::Duration;

use queue_vfs::StandardFS;

use queue_core::codec::{Codec, XmlCodec, XmlDocument, XmlNode};
use queue_core::queue::TransactionalQueue;
use queue_core::record_log::RecordLog;
use queue_core::single_file_log::SingleFileLog;

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
fn undecodable_record_is_skipped_and_does_not_block_later_records() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dir  = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("queue.bin");

    let mut log = SingleFileLog::open(StandardFS, &path, true).expect("open");
    // Not valid XML: the codec will fail to decode this payload.
    log.append_record(b"<unterminated").unwrap();
    log.append_record(&XmlCodec::to_bytes(&doc("good"))).unwrap();

    let queue = TransactionalQueue::<_, XmlCodec>::new(log, Duration::from_secs(30));

    let receipt = queue.dequeue(None).unwrap().unwrap();
    assert_eq!(receipt.value, doc("good"));
    assert!(queue.commit(receipt.id).unwrap());

    assert_eq!(queue.dequeue(None).unwrap(), None);
}
