//! Dictionary lookup used by the rewriter
//!
//! Two tiers: an exact index over every translated entry, keyed by the
//! trimmed lowercase source, and flexible substring rules for `Flexible`
//! entries, longest source first.

use crate::error::{GlossaError, GlossaResult};
use crate::types::{Dictionary, MatchPolicy};
use regex::{NoExpand, Regex, RegexBuilder};
use std::collections::HashMap;

/// `^-?\d+(\.\d+)?$` over the trimmed text, ASCII digits only
pub fn is_purely_numeric(text: &str) -> bool {
    let text = text.trim();
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && fraction.map_or(true, all_digits)
}

#[derive(Debug)]
struct FlexibleRule {
    pattern: Regex,
    target: String,
}

/// Compiled form of a dictionary, built once per rewrite
#[derive(Debug)]
pub struct Matcher {
    exact: HashMap<String, String>,
    flexible: Vec<FlexibleRule>,
}

impl Matcher {
    /// Entries with an empty target or a blank source are left out of both tiers
    pub fn new(dictionary: &Dictionary) -> GlossaResult<Self> {
        let usable: Vec<_> = dictionary
            .iter()
            .filter(|entry| !entry.target.is_empty() && !entry.source.trim().is_empty())
            .collect();

        let mut exact = HashMap::with_capacity(usable.len());
        for entry in &usable {
            exact.insert(entry.source.trim().to_lowercase(), entry.target.clone());
        }

        let mut flexible_entries: Vec<_> = usable
            .iter()
            .filter(|entry| entry.policy == MatchPolicy::Flexible)
            .collect();
        // Stable: equal lengths keep dictionary order
        flexible_entries.sort_by(|a, b| b.source.chars().count().cmp(&a.source.chars().count()));

        let flexible = flexible_entries
            .into_iter()
            .map(|entry| {
                let pattern = RegexBuilder::new(&regex::escape(&entry.source))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        GlossaError::Validation(format!(
                            "cannot compile pattern for '{}': {}",
                            entry.source, e
                        ))
                    })?;
                Ok(FlexibleRule {
                    pattern,
                    target: entry.target.clone(),
                })
            })
            .collect::<GlossaResult<Vec<_>>>()?;

        Ok(Self { exact, flexible })
    }

    /// Whole-text match: trimmed and case-folded
    pub fn exact(&self, text: &str) -> Option<&str> {
        self.exact
            .get(&text.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Exact match first, otherwise every flexible rule in order
    pub fn apply(&self, text: &str) -> String {
        if let Some(target) = self.exact(text) {
            return target.to_string();
        }
        let mut result = text.to_string();
        for rule in &self.flexible {
            if rule.pattern.is_match(&result) {
                result = rule
                    .pattern
                    .replace_all(&result, NoExpand(&rule.target))
                    .into_owned();
            }
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn exact_len(&self) -> usize {
        self.exact.len()
    }

    pub fn flexible_len(&self) -> usize {
        self.flexible.len()
    }
}
