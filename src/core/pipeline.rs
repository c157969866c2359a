//! Batch orchestration around the extractor and rewriter

use crate::core::extractor::extract;
use crate::core::matcher::Matcher;
use crate::core::rewriter::rewrite_with;
use crate::error::{GlossaError, GlossaResult};
use crate::languages::Language;
use crate::types::{Dictionary, ProcessingOptions, SourceFile, TranslatedFile};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Extensions accepted at the upload boundary
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm"];

pub fn is_supported_workbook(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Keep paths with a supported workbook extension, warning about everything else
pub fn filter_supported(paths: &[PathBuf]) -> Vec<&Path> {
    paths
        .iter()
        .map(PathBuf::as_path)
        .filter(|path| {
            let ok = path
                .file_name()
                .is_some_and(|name| is_supported_workbook(&name.to_string_lossy()));
            if !ok {
                warn!(file = %path.display(), "skipping unsupported file type");
            }
            ok
        })
        .collect()
}

/// Extract a batch and build a fresh dictionary from the sorted terms
pub fn build_dictionary(files: &[SourceFile], options: &ProcessingOptions) -> GlossaResult<Dictionary> {
    let terms = extract(files, options)?;
    let dictionary = Dictionary::from_terms(&terms);
    info!(files = files.len(), terms = dictionary.len(), "dictionary built");
    Ok(dictionary)
}

/// Result of rewriting one file of a batch
#[derive(Debug)]
pub struct FileOutcome {
    pub name: String,
    pub result: GlossaResult<TranslatedFile>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Rewrite every file; a failing file does not stop the rest
pub fn apply_dictionary(
    files: &[SourceFile],
    dictionary: &Dictionary,
    options: &ProcessingOptions,
) -> GlossaResult<Vec<FileOutcome>> {
    let matcher = Matcher::new(dictionary)?;
    info!(
        exact = matcher.exact_len(),
        flexible = matcher.flexible_len(),
        "dictionary compiled"
    );

    let outcomes = files
        .iter()
        .map(|file| {
            let result = rewrite_with(file, &matcher, options.preserve_rich_text_formatting);
            if let Err(e) = &result {
                warn!(file = %file.name, error = %e, "rewrite failed");
            }
            FileOutcome {
                name: file.name.clone(),
                result,
            }
        })
        .collect();
    Ok(outcomes)
}

/// `"[RU] report.xlsx"`
pub fn output_name(name: &str, language: &Language) -> String {
    format!("{} {}", language.tag(), name)
}

/// `Translated_Files_<unix-millis>.zip`
pub fn bundle_name() -> String {
    format!("Translated_Files_{}.zip", chrono::Utc::now().timestamp_millis())
}

/// Zip translated files under their tagged output names
pub fn bundle(files: &[TranslatedFile], language: &Language) -> GlossaResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    for file in files {
        writer.start_file(output_name(&file.name, language), options)?;
        writer.write_all(&file.payload)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Write outputs into `dir` (created when missing); optionally also one bundle archive
pub fn save_outputs(
    dir: &Path,
    files: &[TranslatedFile],
    language: &Language,
    with_bundle: bool,
) -> GlossaResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for file in files {
        let path = dir.join(output_name(&file.name, language));
        std::fs::write(&path, &file.payload)?;
        written.push(path);
    }

    if with_bundle {
        if files.is_empty() {
            return Err(GlossaError::Validation(
                "no translated files to bundle".to_string(),
            ));
        }
        let path = dir.join(bundle_name());
        std::fs::write(&path, bundle(files, language)?)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::fixtures::{workbook, FixtureSheet};
    use crate::types::TermEntry;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn hello_workbook(name: &str) -> SourceFile {
        SourceFile::new(
            name,
            workbook(
                &[FixtureSheet::new(
                    "Data",
                    r#"<row r="1"><c r="A1" t="inlineStr"><is><t>Hello</t></is></c></row>"#,
                )],
                None,
            ),
        )
    }

    fn russian() -> Language {
        Language::find("ru").unwrap()
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_workbook("a.xlsx"));
        assert!(is_supported_workbook("B.XLSM"));
        assert!(is_supported_workbook("legacy.xls"));
        assert!(!is_supported_workbook("notes.csv"));
        assert!(!is_supported_workbook("xlsx"));
    }

    #[test]
    fn test_filter_supported() {
        let paths = vec![
            PathBuf::from("in/a.xlsx"),
            PathBuf::from("in/b.txt"),
            PathBuf::from("in/xlsx"),
        ];
        assert_eq!(filter_supported(&paths), vec![Path::new("in/a.xlsx")]);
    }

    #[test]
    fn test_output_and_bundle_names() {
        assert_eq!(output_name("report.xlsx", &russian()), "[RU] report.xlsx");
        let name = bundle_name();
        assert!(name.starts_with("Translated_Files_"));
        assert!(name.ends_with(".zip"));
    }

    #[test]
    fn test_build_dictionary_sorted() {
        let files = vec![hello_workbook("a.xlsx")];
        let dict = build_dictionary(&files, &ProcessingOptions::default()).unwrap();
        assert_eq!(dict.sources(), vec!["Hello"]);
    }

    #[test]
    fn test_apply_continues_after_failure() {
        let dict = Dictionary::from_entries(vec![TermEntry::new("1", "Hello").with_target("Привет")]);
        let files = vec![
            SourceFile::new("broken.xlsx", b"garbage".to_vec()),
            hello_workbook("good.xlsx"),
        ];
        let outcomes = apply_dictionary(&files, &dict, &ProcessingOptions::default()).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].is_ok());
        assert!(outcomes[1].is_ok());
    }

    #[test]
    fn test_bundle_contains_tagged_entries() {
        let files = vec![
            TranslatedFile {
                name: "a.xlsx".into(),
                payload: b"one".to_vec(),
            },
            TranslatedFile {
                name: "b.xlsx".into(),
                payload: b"two".to_vec(),
            },
        ];
        let bytes = bundle(&files, &russian()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("[RU] b.xlsx")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "two");
    }

    #[test]
    fn test_save_outputs_with_bundle() {
        let dir = TempDir::new().unwrap();
        let files = vec![TranslatedFile {
            name: "a.xlsx".into(),
            payload: b"one".to_vec(),
        }];
        let written = save_outputs(&dir.path().join("out"), &files, &russian(), true).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("[RU] a.xlsx"));
        assert!(written[1]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Translated_Files_"));
    }
}
