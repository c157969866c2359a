//! CLI command handlers

pub mod commands;

pub use commands::{
    apply, apply_dictionary_file, edit, extract, extract_dictionary, languages, show, translate,
    translate_dictionary, ApplyReport, ExtractReport, FileFailure, TranslateReport,
};
