use std::fs;

use deed_engine::{ensure_output_dir, existing_download_size, AtomicFileWriter, StagedFile};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("CMIG");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("escrituras.csv", b"hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "escrituras.csv");
    assert_eq!(fs::read(&first).unwrap(), b"hello");

    let second = writer.write("escrituras.csv", b"world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"world");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("doc.pdf", b"data").is_err());
    assert!(!file_path.with_file_name("doc.pdf").exists());
}

#[test]
fn dropped_staged_file_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("deed.pdf");

    let mut staged = StagedFile::create(&target).unwrap();
    staged.write_chunked(&[7u8; 20_000], 8 * 1024).unwrap();
    assert_eq!(staged.written(), 20_000);
    drop(staged);

    assert!(!target.exists());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn commit_replaces_empty_leftover() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("deed.pdf");
    fs::write(&target, b"").unwrap();
    assert_eq!(existing_download_size(&target), None);

    let mut staged = StagedFile::create(&target).unwrap();
    staged.write_chunked(b"%PDF", 2).unwrap();
    assert_eq!(staged.commit().unwrap(), 4);

    assert_eq!(existing_download_size(&target), Some(4));
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn directories_are_not_downloads() {
    let temp = TempDir::new().unwrap();
    assert_eq!(existing_download_size(temp.path()), None);
    assert_eq!(existing_download_size(&temp.path().join("absent.pdf")), None);
}
