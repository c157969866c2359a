//! Glossa - dictionary-driven spreadsheet translation
//!
//! Extracts every translatable string from a batch of workbooks into one
//! editable dictionary, fills it through a translation backend, and rewrites
//! the workbooks with it while keeping their structure intact.
//!
//! # Features
//!
//! - Cell text, rich-text runs, formula string literals and shape text
//! - Merged ranges read and written through their master cell
//! - Exact and longest-first case-insensitive substitution per entry
//! - Part-preserving rewrite: styles, charts and media are copied untouched
//! - Gemini and Bailian backends behind one async trait
//!
//! # Example
//!
//! ```no_run
//! use royalbit_glossa::core::pipeline::{apply_dictionary, build_dictionary};
//! use royalbit_glossa::types::{ProcessingOptions, SourceFile};
//! use std::path::Path;
//!
//! let options = ProcessingOptions::default();
//! let files = vec![SourceFile::read(Path::new("report.xlsx"))?];
//!
//! let mut dictionary = build_dictionary(&files, &options)?;
//! let id = dictionary.entries()[0].id.clone();
//! dictionary.update_entry(&id, Some("Итого".to_string()), None)?;
//!
//! for outcome in apply_dictionary(&files, &dictionary, &options)? {
//!     println!("{}: {}", outcome.name, outcome.is_ok());
//! }
//! # Ok::<(), royalbit_glossa::error::GlossaError>(())
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod error;
pub mod excel;
pub mod languages;
pub mod translation;
pub mod types;

// Re-export commonly used types
pub use error::{GlossaError, GlossaResult};
pub use languages::Language;
pub use types::{
    Dictionary, DictionaryFile, MatchPolicy, ProcessingOptions, SourceFile, TermEntry,
    TranslatedFile,
};
