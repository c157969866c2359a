use super::*;
use crate::excel::fixtures::{workbook, FixtureSheet};
use crate::excel::{CellValue, WorkbookModel};
use crate::types::{Dictionary, TermEntry};
use async_trait::async_trait;
use tempfile::TempDir;

fn write_workbook(dir: &Path, name: &str, text: &str) -> PathBuf {
    let data = format!(
        r#"<row r="1"><c r="A1" t="inlineStr"><is><t>{}</t></is></c><c r="B1"><v>7</v></c></row>"#,
        text
    );
    let path = dir.join(name);
    std::fs::write(&path, workbook(&[FixtureSheet::new("Data", &data)], None)).unwrap();
    path
}

struct UppercaseBackend;

#[async_trait]
impl TranslationBackend for UppercaseBackend {
    fn name(&self) -> &'static str {
        "uppercase"
    }

    async fn translate(&self, texts: &[String], _target: &str) -> GlossaResult<Vec<String>> {
        Ok(texts.iter().map(|t| t.to_uppercase()).collect())
    }
}

struct ShortBackend;

#[async_trait]
impl TranslationBackend for ShortBackend {
    fn name(&self) -> &'static str {
        "short"
    }

    async fn translate(&self, _texts: &[String], _target: &str) -> GlossaResult<Vec<String>> {
        Ok(vec![])
    }
}

// =========================================================================
// read_sources / resolve_language Tests
// =========================================================================

#[test]
fn test_read_sources_skips_unsupported() {
    let dir = TempDir::new().unwrap();
    let book = write_workbook(dir.path(), "a.xlsx", "Hello");
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "x").unwrap();

    let files = read_sources(&[book, notes]).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "a.xlsx");
}

#[test]
fn test_read_sources_skips_unsupported_without_reading() {
    let dir = TempDir::new().unwrap();
    let book = write_workbook(dir.path(), "a.xlsx", "Hello");
    let folder = dir.path().join("attachments");
    std::fs::create_dir(&folder).unwrap();

    let files = read_sources(&[folder, book]).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "a.xlsx");
}

#[test]
fn test_read_sources_none_supported_is_validation_error() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "x").unwrap();
    assert!(matches!(read_sources(&[notes]), Err(GlossaError::Validation(_))));
}

#[test]
fn test_resolve_language_precedence() {
    assert_eq!(resolve_language(Some("fr"), Some("German")).unwrap().name, "French");
    assert_eq!(resolve_language(None, Some("German")).unwrap().name, "German");
    assert_eq!(resolve_language(None, None).unwrap().name, "Russian");
    assert!(matches!(resolve_language(Some("Klingon"), None), Err(GlossaError::Config(_))));
}

// =========================================================================
// extract / translate / apply Tests
// =========================================================================

#[test]
fn test_extract_writes_dictionary_file() {
    let dir = TempDir::new().unwrap();
    let a = write_workbook(dir.path(), "a.xlsx", "World");
    let b = write_workbook(dir.path(), "b.xlsx", "Hello");
    let out = dir.path().join("dict.yaml");

    let report = extract_dictionary(&[a, b], &out, ProcessingOptions::default()).unwrap();
    assert_eq!(report.terms, 2);
    assert_eq!(report.files, vec!["a.xlsx", "b.xlsx"]);

    let file = DictionaryFile::load(&out).unwrap();
    assert_eq!(file.entries.sources(), vec!["Hello", "World"]);
    assert_eq!(file.options, ProcessingOptions::default());
}

#[tokio::test]
async fn test_translate_dictionary_fills_and_records_language() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dict.json");
    DictionaryFile::new(
        ProcessingOptions::default(),
        Dictionary::from_entries(vec![TermEntry::new("1", "Hello")]),
    )
    .save(&path)
    .unwrap();

    let report = translate_dictionary(&path, Some("de"), &UppercaseBackend, None)
        .await
        .unwrap();
    assert_eq!(report.language, "German");
    assert_eq!(report.translated, 1);

    let file = DictionaryFile::load(&path).unwrap();
    assert_eq!(file.entries.get("1").unwrap().target, "HELLO");
    assert_eq!(file.target_language.as_deref(), Some("German"));
}

#[tokio::test]
async fn test_translate_dictionary_failure_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dict.yaml");
    let original = DictionaryFile::new(
        ProcessingOptions::default(),
        Dictionary::from_entries(vec![TermEntry::new("1", "Hello")]),
    );
    original.save(&path).unwrap();
    let out = dir.path().join("out.yaml");

    let err = translate_dictionary(&path, None, &ShortBackend, Some(&out))
        .await
        .unwrap_err();
    assert!(matches!(err, GlossaError::Backend(_)));
    assert!(!out.exists());
    assert_eq!(DictionaryFile::load(&path).unwrap(), original);
}

#[test]
fn test_apply_writes_tagged_outputs_and_reports_failures() {
    let dir = TempDir::new().unwrap();
    let good = write_workbook(dir.path(), "good.xlsx", "Hello");
    let broken = dir.path().join("broken.xlsx");
    std::fs::write(&broken, b"not a zip").unwrap();

    let dict_path = dir.path().join("dict.yaml");
    let mut file = DictionaryFile::new(
        ProcessingOptions::default(),
        Dictionary::from_entries(vec![TermEntry::new("1", "Hello").with_target("Hallo")]),
    );
    file.target_language = Some("German".into());
    file.save(&dict_path).unwrap();

    let out_dir = dir.path().join("out");
    let report = apply_dictionary_file(&dict_path, &[broken, good], &out_dir, None, true).unwrap();

    assert!(!report.all_succeeded());
    assert_eq!(report.failed[0].name, "broken.xlsx");
    assert_eq!(report.language, "German");
    assert_eq!(report.written.len(), 2);

    let output = out_dir.join("[DE] good.xlsx");
    let model = WorkbookModel::load(&std::fs::read(output).unwrap()).unwrap();
    assert_eq!(model.sheets[0].cell(1, 1).unwrap().value, CellValue::Text("Hallo".into()));
}

#[test]
fn test_edit_requires_a_change() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dict.yaml");
    let err = edit(path, "1".into(), None, None).unwrap_err();
    assert!(matches!(err, GlossaError::Validation(_)));
}

#[test]
fn test_edit_updates_entry_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dict.yaml");
    DictionaryFile::new(
        ProcessingOptions::default(),
        Dictionary::from_entries(vec![TermEntry::new("1", "Total")]),
    )
    .save(&path)
    .unwrap();

    edit(path.clone(), "1".into(), Some("Итого".into()), Some(MatchPolicy::ExactOnly)).unwrap();
    let entry = DictionaryFile::load(&path).unwrap().entries.get("1").unwrap().clone();
    assert_eq!(entry.target, "Итого");
    assert_eq!(entry.policy, MatchPolicy::ExactOnly);
}
