//! Target language table
//!
//! Backends receive the English language name; output files are tagged with
//! the uppercased code, e.g. `[RU] report.xlsx`.

use crate::error::{GlossaError, GlossaResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

pub const LANGUAGES: &[Language] = &[
    Language { code: "ar", name: "Arabic" },
    Language { code: "zh", name: "Chinese" },
    Language { code: "cs", name: "Czech" },
    Language { code: "nl", name: "Dutch" },
    Language { code: "en", name: "English" },
    Language { code: "fr", name: "French" },
    Language { code: "de", name: "German" },
    Language { code: "el", name: "Greek" },
    Language { code: "he", name: "Hebrew" },
    Language { code: "hi", name: "Hindi" },
    Language { code: "id", name: "Indonesian" },
    Language { code: "it", name: "Italian" },
    Language { code: "ja", name: "Japanese" },
    Language { code: "kk", name: "Kazakh" },
    Language { code: "ko", name: "Korean" },
    Language { code: "pl", name: "Polish" },
    Language { code: "pt", name: "Portuguese" },
    Language { code: "ru", name: "Russian" },
    Language { code: "es", name: "Spanish" },
    Language { code: "th", name: "Thai" },
    Language { code: "tr", name: "Turkish" },
    Language { code: "uk", name: "Ukrainian" },
    Language { code: "uz", name: "Uzbek" },
    Language { code: "vi", name: "Vietnamese" },
];

pub const DEFAULT_LANGUAGE: Language = Language {
    code: "ru",
    name: "Russian",
};

impl Language {
    /// Look up by name ("Russian") or code ("ru"), ignoring case
    pub fn find(query: &str) -> GlossaResult<Language> {
        let query = query.trim();
        LANGUAGES
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(query) || lang.name.eq_ignore_ascii_case(query))
            .copied()
            .ok_or_else(|| GlossaError::Config(format!("Unknown target language: '{}'", query)))
    }

    /// Bracketed tag used in output file names
    pub fn tag(&self) -> String {
        format!("[{}]", self.code.to_uppercase())
    }
}

impl Default for Language {
    fn default() -> Self {
        DEFAULT_LANGUAGE
    }
}
