//! Translation backends and the dictionary fill step
//!
//! A backend turns an ordered list of source strings into an equally long list
//! of translations. [`fill_targets`] drives one backend over a whole dictionary
//! and either replaces every target or changes nothing.

pub mod bailian;
pub mod config;
pub mod gemini;
pub mod prompt;

pub use bailian::BailianBackend;
pub use config::BackendConfig;
pub use gemini::GeminiBackend;

use crate::error::{GlossaError, GlossaResult};
use crate::types::Dictionary;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Short label used in logs and error messages
    fn name(&self) -> &'static str;

    /// Translate `texts` into `target_language` (an English language name).
    ///
    /// Returns exactly one string per input, in input order.
    async fn translate(&self, texts: &[String], target_language: &str) -> GlossaResult<Vec<String>>;
}

/// Available backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    #[default]
    Gemini,
    Bailian,
}

impl fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationProvider::Gemini => write!(f, "gemini"),
            TranslationProvider::Bailian => write!(f, "bailian"),
        }
    }
}

/// Construct a backend, failing early when its credentials are missing
pub fn build_backend(
    provider: TranslationProvider,
    config: &BackendConfig,
) -> GlossaResult<Box<dyn TranslationBackend>> {
    let client = reqwest::Client::new();
    match provider {
        TranslationProvider::Gemini => {
            let key = config.require_gemini_key()?;
            Ok(Box::new(GeminiBackend::new(
                client,
                key,
                config.gemini_model.as_str(),
                config.gemini_api_url.as_str(),
            )))
        }
        TranslationProvider::Bailian => {
            let (key, app_id) = config.require_bailian()?;
            Ok(Box::new(BailianBackend::new(
                client,
                key,
                app_id,
                config.bailian_api_url.as_str(),
            )))
        }
    }
}

/// Translate every source of `dictionary` and return the filled copy.
///
/// The input is never modified. A result of the wrong length fails the whole
/// fill; an empty translation keeps the entry's previous target.
pub async fn fill_targets(
    dictionary: &Dictionary,
    target_language: &str,
    backend: &dyn TranslationBackend,
) -> GlossaResult<Dictionary> {
    let sources = dictionary.sources();
    let translations = backend.translate(&sources, target_language).await?;

    if translations.len() != sources.len() {
        return Err(GlossaError::Backend(format!(
            "{} returned {} translations for {} terms",
            backend.name(),
            translations.len(),
            sources.len()
        )));
    }

    let mut kept = 0usize;
    let targets: Vec<String> = dictionary
        .iter()
        .zip(translations)
        .map(|(entry, translated)| {
            if translated.is_empty() {
                kept += 1;
                entry.target.clone()
            } else {
                translated
            }
        })
        .collect();

    if kept > 0 {
        warn!(backend = backend.name(), kept, "empty translations kept previous targets");
    }
    info!(
        backend = backend.name(),
        language = target_language,
        terms = sources.len(),
        "dictionary filled"
    );
    Ok(dictionary.with_targets(targets))
}

/// Send a JSON request and decode a JSON response, mapping every failure
/// to a backend error that names `backend`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    backend: &str,
) -> GlossaResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| GlossaError::Backend(format!("Failed to reach {}: {}", backend, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
        return Err(GlossaError::Backend(format!(
            "{} request failed with status {}: {}",
            backend, status, body
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| GlossaError::Backend(format!("Failed to parse {} response: {}", backend, e)))
}
