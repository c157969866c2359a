use crate::core::pipeline::{self, filter_supported};
use crate::error::{GlossaError, GlossaResult};
use crate::languages::{Language, LANGUAGES};
use crate::translation::{build_backend, fill_targets, BackendConfig, TranslationBackend, TranslationProvider};
use crate::types::{DictionaryFile, MatchPolicy, ProcessingOptions, SourceFile};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

//==============================================================================
// Reports shared with the API handlers
//==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ExtractReport {
    pub files: Vec<String>,
    pub terms: usize,
    pub dictionary_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslateReport {
    pub language: String,
    pub backend: String,
    pub terms: usize,
    pub translated: usize,
    pub dictionary_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub language: String,
    pub written: Vec<PathBuf>,
    pub failed: Vec<FileFailure>,
}

impl ApplyReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Read the workbooks among `paths`; unsupported extensions are skipped unread
pub fn read_sources(paths: &[PathBuf]) -> GlossaResult<Vec<SourceFile>> {
    let files = filter_supported(paths)
        .into_iter()
        .map(SourceFile::read)
        .collect::<GlossaResult<Vec<_>>>()?;
    if files.is_empty() {
        return Err(GlossaError::Validation(
            "No supported workbook files given (.xlsx, .xls, .xlsm)".to_string(),
        ));
    }
    Ok(files)
}

/// Language from the argument, else from the dictionary file, else the default
pub fn resolve_language(arg: Option<&str>, stored: Option<&str>) -> GlossaResult<Language> {
    match arg.or(stored) {
        Some(query) => Language::find(query),
        None => Ok(Language::default()),
    }
}

pub fn extract_dictionary(
    paths: &[PathBuf],
    output: &Path,
    options: ProcessingOptions,
) -> GlossaResult<ExtractReport> {
    let files = read_sources(paths)?;
    let dictionary = pipeline::build_dictionary(&files, &options)?;
    let terms = dictionary.len();
    DictionaryFile::new(options, dictionary).save(output)?;

    Ok(ExtractReport {
        files: files.into_iter().map(|file| file.name).collect(),
        terms,
        dictionary_path: output.to_path_buf(),
    })
}

/// Fill every target of a dictionary file through `backend`.
///
/// The result goes to `output`, or back into `path` when no output is given.
/// Nothing is written when the backend fails.
pub async fn translate_dictionary(
    path: &Path,
    language: Option<&str>,
    backend: &dyn TranslationBackend,
    output: Option<&Path>,
) -> GlossaResult<TranslateReport> {
    let mut file = DictionaryFile::load(path)?;
    let language = resolve_language(language, file.target_language.as_deref())?;

    file.entries = fill_targets(&file.entries, language.name, backend).await?;
    file.target_language = Some(language.name.to_string());

    let destination = output.unwrap_or(path);
    file.save(destination)?;

    Ok(TranslateReport {
        language: language.name.to_string(),
        backend: backend.name().to_string(),
        terms: file.entries.len(),
        translated: file.entries.translated_count(),
        dictionary_path: destination.to_path_buf(),
    })
}

/// Rewrite `paths` with a dictionary file and save the results into `output_dir`.
///
/// Per-file failures are collected in the report; only problems with the
/// dictionary itself or with writing outputs are returned as errors.
pub fn apply_dictionary_file(
    dictionary_path: &Path,
    paths: &[PathBuf],
    output_dir: &Path,
    language: Option<&str>,
    with_bundle: bool,
) -> GlossaResult<ApplyReport> {
    let file = DictionaryFile::load(dictionary_path)?;
    let language = resolve_language(language, file.target_language.as_deref())?;
    let sources = read_sources(paths)?;

    let outcomes = pipeline::apply_dictionary(&sources, &file.entries, &file.options)?;
    let mut translated = Vec::new();
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(done) => translated.push(done),
            Err(e) => failed.push(FileFailure {
                name: outcome.name,
                error: e.to_string(),
            }),
        }
    }

    let written = pipeline::save_outputs(
        output_dir,
        &translated,
        &language,
        with_bundle && !translated.is_empty(),
    )?;

    Ok(ApplyReport {
        language: language.name.to_string(),
        written,
        failed,
    })
}

//==============================================================================
// Commands
//==============================================================================

/// Execute the extract command
pub fn extract(
    files: Vec<PathBuf>,
    output: PathBuf,
    options: ProcessingOptions,
    verbose: bool,
) -> GlossaResult<()> {
    println!("{}", "📖 Glossa - Extracting terms".bold().green());
    println!("   Files:  {}", files.len());
    println!("   Output: {}\n", output.display());

    if verbose {
        println!(
            "   Formulas: {}, rich text runs: {}, shapes: {}, visible sheets only: {}\n",
            options.translate_formulas,
            options.preserve_rich_text_formatting,
            options.extract_from_shapes,
            options.process_visible_sheets_only
        );
    }

    let report = extract_dictionary(&files, &output, options)?;

    for name in &report.files {
        println!("   📄 {}", name.bright_blue());
    }
    println!(
        "\n{}",
        format!("✅ {} unique terms written", report.terms).bold().green()
    );
    println!("   Dictionary: {}\n", report.dictionary_path.display());
    Ok(())
}

/// Execute the translate command
pub fn translate(
    dictionary: PathBuf,
    language: Option<String>,
    provider: TranslationProvider,
    output: Option<PathBuf>,
) -> GlossaResult<()> {
    println!("{}", "🌐 Glossa - Translating dictionary".bold().green());
    println!("   Dictionary: {}", dictionary.display());
    println!("   Provider:   {}\n", provider.to_string().bright_yellow());

    let backend = build_backend(provider, &BackendConfig::from_env())?;
    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(translate_dictionary(
        &dictionary,
        language.as_deref(),
        backend.as_ref(),
        output.as_deref(),
    ))?;

    println!(
        "{}",
        format!(
            "✅ {} of {} terms translated into {}",
            report.translated, report.terms, report.language
        )
        .bold()
        .green()
    );
    println!("   Dictionary: {}\n", report.dictionary_path.display());
    Ok(())
}

/// Execute the edit command
pub fn edit(
    dictionary: PathBuf,
    id: String,
    target: Option<String>,
    policy: Option<MatchPolicy>,
) -> GlossaResult<()> {
    if target.is_none() && policy.is_none() {
        return Err(GlossaError::Validation(
            "Nothing to change: pass --target and/or --policy".to_string(),
        ));
    }

    let mut file = DictionaryFile::load(&dictionary)?;
    let entry = file.entries.update_entry(&id, target, policy)?.clone();
    file.save(&dictionary)?;

    println!("{}", "✏️  Entry updated".bold().green());
    println!("   {} → {} ({})", entry.source.bright_blue(), entry.target, entry.policy);
    Ok(())
}

/// Execute the show command
pub fn show(dictionary: PathBuf) -> GlossaResult<()> {
    let file = DictionaryFile::load(&dictionary)?;
    let entries = &file.entries;

    println!("{}", "📚 Glossa - Dictionary".bold().green());
    println!("   File: {}", dictionary.display());
    if let Some(language) = &file.target_language {
        println!("   Language: {}", language.bright_yellow());
    }
    println!(
        "   Translated: {}/{}\n",
        entries.translated_count(),
        entries.len()
    );

    for entry in entries.iter() {
        let target = if entry.is_translated() {
            entry.target.green()
        } else {
            "(untranslated)".dimmed()
        };
        println!(
            "   {}  {} → {}  [{}]",
            entry.id.dimmed(),
            entry.source.bright_blue(),
            target,
            entry.policy
        );
    }

    if !entries.all_targets_filled() {
        println!(
            "\n{}",
            "⚠️  Untranslated entries are skipped when applying".yellow()
        );
    }
    println!();
    Ok(())
}

/// Execute the apply command
pub fn apply(
    dictionary: PathBuf,
    files: Vec<PathBuf>,
    output_dir: PathBuf,
    language: Option<String>,
    bundle: bool,
) -> GlossaResult<()> {
    println!("{}", "🔁 Glossa - Applying dictionary".bold().green());
    println!("   Dictionary: {}", dictionary.display());
    println!("   Output:     {}\n", output_dir.display());

    let report = apply_dictionary_file(&dictionary, &files, &output_dir, language.as_deref(), bundle)?;

    for path in &report.written {
        println!("   ✅ {}", path.display());
    }
    for failure in &report.failed {
        println!(
            "   {}",
            format!("❌ {}: {}", failure.name, failure.error).red()
        );
    }
    debug!(written = report.written.len(), failed = report.failed.len(), "apply finished");

    if report.all_succeeded() {
        println!("\n{}", "✅ All files translated".bold().green());
        Ok(())
    } else {
        println!();
        Err(GlossaError::Validation(format!(
            "{} of {} files failed",
            report.failed.len(),
            files.len()
        )))
    }
}

/// Execute the languages command
pub fn languages() -> GlossaResult<()> {
    println!("{}", "🌍 Supported target languages".bold().green());
    for language in LANGUAGES {
        let marker = if *language == Language::default() { " (default)" } else { "" };
        println!(
            "   {}  {}{}",
            language.code.bright_blue(),
            language.name,
            marker.dimmed()
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
