//! Extraction and rewrite engine

pub mod extractor;
pub mod formula;
pub mod matcher;
pub mod pipeline;
pub mod rewriter;

pub use extractor::{extract, extract_model};
pub use matcher::{is_purely_numeric, Matcher};
pub use rewriter::{rewrite, rewrite_model, RewriteStats};
