use crate::error::{GlossaError, GlossaResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

//==============================================================================
// Processing Options
//==============================================================================

/// Toggles shared by extraction and rewrite.
///
/// One value is created per run and passed by reference into every extract and
/// rewrite call, so both phases provably see the same configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    /// Extract and rewrite `"..."` literals inside formulas
    pub translate_formulas: bool,
    /// Treat each rich-text run as its own term (exact match only on rewrite)
    pub preserve_rich_text_formatting: bool,
    /// Collect text from shapes, text boxes and chart titles
    pub extract_from_shapes: bool,
    /// Skip hidden and very hidden sheets
    pub process_visible_sheets_only: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            translate_formulas: false,
            preserve_rich_text_formatting: true,
            extract_from_shapes: true,
            process_visible_sheets_only: true,
        }
    }
}

//==============================================================================
// Dictionary
//==============================================================================

/// How a dictionary entry may be applied to cell text
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchPolicy {
    /// Exact match first, then case-insensitive substring substitution
    #[default]
    Flexible,
    /// Whole (trimmed, case-folded) text must equal the source
    ExactOnly,
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::Flexible => write!(f, "flexible"),
            MatchPolicy::ExactOnly => write!(f, "exact-only"),
        }
    }
}

/// One source term and its translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub id: String,
    pub source: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub policy: MatchPolicy,
}

impl TermEntry {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: String::new(),
            policy: MatchPolicy::Flexible,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_translated(&self) -> bool {
        !self.target.trim().is_empty()
    }
}

/// Ordered term dictionary, one entry per unique extracted string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dictionary {
    entries: Vec<TermEntry>,
}

impl Dictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary from an extracted term set.
    ///
    /// The set iterates in byte order, which gives the stable display order.
    /// Ids are `<creation-millis>-<index>`.
    pub fn from_terms(terms: &BTreeSet<String>) -> Self {
        let stamp = chrono::Utc::now().timestamp_millis();
        let entries = terms
            .iter()
            .enumerate()
            .map(|(index, source)| TermEntry::new(format!("{}-{}", stamp, index), source.clone()))
            .collect();
        Self { entries }
    }

    pub fn from_entries(entries: Vec<TermEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TermEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TermEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TermEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn find_source(&self, source: &str) -> Option<&TermEntry> {
        self.entries.iter().find(|entry| entry.source == source)
    }

    /// Sources in dictionary order
    pub fn sources(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.source.clone()).collect()
    }

    /// Edit a single entry. `None` leaves the field as it is.
    pub fn update_entry(
        &mut self,
        id: &str,
        target: Option<String>,
        policy: Option<MatchPolicy>,
    ) -> GlossaResult<&TermEntry> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| GlossaError::Validation(format!("Unknown dictionary entry id '{}'", id)))?;
        if let Some(target) = target {
            entry.target = target;
        }
        if let Some(policy) = policy {
            entry.policy = policy;
        }
        Ok(entry)
    }

    /// Replace every target positionally. Used by the translation fill.
    pub(crate) fn with_targets(&self, targets: Vec<String>) -> Self {
        let entries = self
            .entries
            .iter()
            .zip(targets)
            .map(|(entry, target)| TermEntry {
                target,
                ..entry.clone()
            })
            .collect();
        Self { entries }
    }

    pub fn all_targets_filled(&self) -> bool {
        self.entries.iter().all(TermEntry::is_translated)
    }

    pub fn translated_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_translated()).count()
    }
}

//==============================================================================
// Dictionary File (persistence between CLI/API steps)
//==============================================================================

/// Dictionary persisted together with the options it was extracted with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryFile {
    #[serde(default)]
    pub options: ProcessingOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    pub entries: Dictionary,
}

impl DictionaryFile {
    pub fn new(options: ProcessingOptions, entries: Dictionary) -> Self {
        Self {
            options,
            target_language: None,
            entries,
        }
    }

    /// Load from `.json`, or from YAML for any other extension
    pub fn load(path: &Path) -> GlossaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        if is_json(path) {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }

    pub fn save(&self, path: &Path) -> GlossaResult<()> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

//==============================================================================
// Files
//==============================================================================

/// A workbook payload together with its file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn read(path: &Path) -> GlossaResult<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("workbook.xlsx")
            .to_string();
        Ok(Self { name, bytes })
    }
}

/// Output of a rewrite, named after its input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedFile {
    pub name: String,
    pub payload: Vec<u8>,
}
