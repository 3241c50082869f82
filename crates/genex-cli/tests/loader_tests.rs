//! Integration tests for the dataset loader against real temp files, using
//! the plain-`assert!` style the teacher's own CLI test suite favors.

use std::io::Write;
use tempfile::NamedTempFile;

fn write_dataset(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("creating temp dataset file");
    file.write_all(contents.as_bytes()).expect("writing temp dataset file");
    file
}

#[test]
fn loads_rectangular_dataset_from_disk() {
    let file = write_dataset("1 2 3 4\n5 6 7 8\n9 10 11 12\n");
    let block = genex_cli::loader::load_dataset_file(file.path()).expect("loading dataset");
    assert_eq!(block.item_count(), 3);
    assert_eq!(block.item_length(), 4);
    assert_eq!(block.get(1, 0).unwrap(), 5.0);
}

#[test]
fn loads_ragged_named_dataset_from_disk() {
    let file = write_dataset("rowA, 1.0, 2.0, 3.0, 4.0\nrowB, 5.0, 6.0\n");
    let block = genex_cli::loader::load_dataset_file(file.path()).expect("loading dataset");
    assert_eq!(block.row_len(0), 4);
    assert_eq!(block.row_len(1), 2);
    assert_eq!(block.item_length(), 2);
}

#[test]
fn rejects_missing_file() {
    let result = genex_cli::loader::load_dataset_file(std::path::Path::new("/nonexistent/path/to/dataset.txt"));
    assert!(result.is_err());
}
