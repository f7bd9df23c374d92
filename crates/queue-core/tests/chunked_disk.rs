#![allow(unused_crate_dependencies, reason = "These are tests, not the main crate.")]

//! Exercises [`ChunkedLog`] against the real filesystem, including chunk-file creation,
//! reclamation, and renumbering back to a single empty `data_1.bin`.

use std::fs;

use queue_vfs::StandardFS;

use queue_core::error::LogError;
use queue_core::record::Handle;
use queue_core::record_log::RecordLog;
use queue_core::chunked_log::ChunkedLog;


fn chunk_file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != "LOCK")
        .collect();
    names.sort();
    names
}

#[test]
fn rolls_across_chunks_and_reclaims_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");

    // Each 1-byte record's frame is 9 bytes; threshold 9 rolls after every record.
    let mut log = ChunkedLog::open(StandardFS, dir.path(), 9, true).unwrap();

    let mut handles = Vec::new();
    for byte in 0_u8..5 {
        handles.push(log.append_record(&[byte]).unwrap());
    }

    assert_eq!(chunk_file_names(dir.path()).len(), 5);

    for _ in 0..5 {
        log.read_next_record().unwrap();
    }
    for handle in handles {
        log.delete_record(handle).unwrap();
    }

    assert_eq!(chunk_file_names(dir.path()), vec!["data_1.bin".to_owned()]);
    assert_eq!(fs::metadata(dir.path().join("data_1.bin")).unwrap().len(), 0);
    assert_eq!(log.unread_count(), 0);
}

#[test]
fn second_open_on_same_directory_is_locked() {
    let dir = tempfile::tempdir().expect("tempdir");

    let _log = ChunkedLog::open(StandardFS, dir.path(), 1024, true).unwrap();

    let err = ChunkedLog::open(StandardFS, dir.path(), 1024, true).unwrap_err();
    assert!(matches!(err, LogError::Locked));
}

#[test]
fn head_chunk_is_deleted_once_fully_read_and_deleted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut log = ChunkedLog::open(StandardFS, dir.path(), 16, true).unwrap();

    let a = log.append_record(&[1]).unwrap();
    let b = log.append_record(&[2]).unwrap();
    let _c = log.append_record(&[3]).unwrap();

    let Handle::Chunked { chunk_n: a_chunk, .. } = a else { unreachable!() };
    let Handle::Chunked { chunk_n: c_chunk, .. } = _c else { unreachable!() };
    assert_ne!(a_chunk, c_chunk);

    log.read_next_record().unwrap();
    log.read_next_record().unwrap();
    log.read_next_record().unwrap();

    log.delete_record(a).unwrap();
    log.delete_record(b).unwrap();

    let names = chunk_file_names(dir.path());
    assert!(!names.contains(&format!("data_{a_chunk}.bin")));
    assert!(names.contains(&format!("data_{c_chunk}.bin")));
}
