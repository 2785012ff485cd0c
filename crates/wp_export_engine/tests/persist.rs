use std::fs;

use serde_json::json;
use tempfile::TempDir;
use wp_export_engine::{
    ensure_output_dir, load_json_array, write_json_pretty, AtomicFileWriter, ExportError,
};

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("data").join("posts");
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn output_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("data");
    fs::write(&file_path, "x").unwrap();
    assert!(ensure_output_dir(&file_path).is_err());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("hello"));

    let first = writer.write("index.md", "hello").unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    let second = writer.write("index.md", "world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");
    assert_eq!(fs::read_dir(temp.path().join("hello")).unwrap().count(), 1);
}

#[test]
fn pretty_json_uses_two_space_indent_and_trailing_newline() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("authors").join("authors.json");
    write_json_pretty(&target, &json!([{ "id": "jdoe" }])).unwrap();
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "[\n  {\n    \"id\": \"jdoe\"\n  }\n]\n"
    );
}

#[test]
fn missing_json_array_loads_empty() {
    let temp = TempDir::new().unwrap();
    let loaded: Vec<serde_json::Value> = load_json_array(&temp.path().join("none.json")).unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn malformed_json_array_is_a_catalog_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("categories.json");
    fs::write(&path, "[1,").unwrap();
    let err = load_json_array::<serde_json::Value>(&path).unwrap_err();
    assert!(matches!(err, ExportError::CatalogParse { .. }));
}
