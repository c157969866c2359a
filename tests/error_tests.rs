//! Error handling tests

use royalbit_glossa::error::{GlossaError, GlossaResult};
use royalbit_glossa::excel::WorkbookModel;
use royalbit_glossa::types::{Dictionary, DictionaryFile};
use std::error::Error;
use tempfile::TempDir;

#[test]
fn test_in_file_keeps_source_chain() {
    let err = GlossaError::Backend("timeout".into()).in_file("a.xlsx");
    assert_eq!(err.to_string(), "a.xlsx: Translation backend error: timeout");
    let source = err.source().unwrap();
    assert_eq!(source.to_string(), "Translation backend error: timeout");
}

#[test]
fn test_io_error_converts() {
    fn read() -> GlossaResult<Vec<u8>> {
        Ok(std::fs::read("/definitely/not/here.xlsx")?)
    }
    assert!(matches!(read(), Err(GlossaError::Io(_))));
}

#[test]
fn test_corrupt_zip_is_format_error() {
    let err = WorkbookModel::load(b"PK\x03\x04 truncated").unwrap_err();
    assert!(err.is_format_error(), "{:?}", err);
}

#[test]
fn test_zip_without_workbook_is_format_error() {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        writer
            .start_file("readme.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        std::io::Write::write_all(&mut writer, b"hello").unwrap();
        writer.finish().unwrap();
    }
    let err = WorkbookModel::load(buffer.get_ref()).unwrap_err();
    assert!(err.is_format_error(), "{:?}", err);
}

#[test]
fn test_bad_dictionary_yaml_is_yaml_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dict.yaml");
    std::fs::write(&path, "entries: [: not yaml").unwrap();
    assert!(matches!(DictionaryFile::load(&path), Err(GlossaError::Yaml(_))));
}

#[test]
fn test_bad_dictionary_json_is_json_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dict.json");
    std::fs::write(&path, "{\"entries\": 5}").unwrap();
    assert!(matches!(DictionaryFile::load(&path), Err(GlossaError::Json(_))));
}

#[test]
fn test_update_unknown_id_message() {
    let mut dict = Dictionary::new();
    let err = dict.update_entry("42", Some("x".into()), None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation error: Unknown dictionary entry id '42'"
    );
}
