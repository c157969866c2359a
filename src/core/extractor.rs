//! Term extraction: workbook text → deduplicated source set

use crate::core::formula::string_literals;
use crate::core::matcher::is_purely_numeric;
use crate::error::GlossaResult;
use crate::excel::{list_drawing_text_runs, CellValue, WorkbookModel};
use crate::types::{ProcessingOptions, SourceFile};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Extract every translatable string from a batch of workbooks.
///
/// One set covers the whole batch and iterates in byte order. The first
/// unreadable file fails the batch with its name attached.
pub fn extract<'a, I>(files: I, options: &ProcessingOptions) -> GlossaResult<BTreeSet<String>>
where
    I: IntoIterator<Item = &'a SourceFile>,
{
    let mut terms = BTreeSet::new();
    for file in files {
        let model = WorkbookModel::load(&file.bytes).map_err(|e| e.in_file(&file.name))?;
        let before = terms.len();
        extract_model(&model, options, &mut terms).map_err(|e| e.in_file(&file.name))?;
        info!(file = %file.name, new_terms = terms.len() - before, "extracted terms");
    }
    Ok(terms)
}

/// Add the terms of one loaded workbook to `terms`
pub fn extract_model(
    model: &WorkbookModel,
    options: &ProcessingOptions,
    terms: &mut BTreeSet<String>,
) -> GlossaResult<()> {
    for sheet in &model.sheets {
        if options.process_visible_sheets_only && !sheet.is_visible() {
            debug!(sheet = %sheet.name, "skipping hidden sheet");
            continue;
        }

        if options.extract_from_shapes {
            for run in list_drawing_text_runs(model, sheet)? {
                add_term(terms, &run);
            }
        }

        for cell in sheet.master_cells() {
            match &cell.value {
                CellValue::Formula(formula) => {
                    if options.translate_formulas {
                        for literal in string_literals(&formula.expression) {
                            add_term(terms, &literal.text);
                        }
                    }
                }
                CellValue::RichText(runs) if options.preserve_rich_text_formatting => {
                    for run in runs {
                        add_term(terms, &run.text);
                    }
                }
                value => {
                    if let Some(text) = value.display() {
                        add_term(terms, &text);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Trimmed, non-blank and not purely numeric
fn add_term(terms: &mut BTreeSet<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() && !is_purely_numeric(text) {
        terms.insert(text.to_string());
    }
}
