//! Dictionary application: workbook + dictionary → translated workbook

use crate::core::formula::replace_literals;
use crate::core::matcher::Matcher;
use crate::error::GlossaResult;
use crate::excel::{CellValue, FormulaCell, RichRun, WorkbookModel};
use crate::types::{Dictionary, SourceFile, TranslatedFile};
use tracing::{debug, info};

/// Counts of cells changed by one rewrite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub text_cells: usize,
    pub rich_text_cells: usize,
    pub formula_cells: usize,
}

impl RewriteStats {
    pub fn total(&self) -> usize {
        self.text_cells + self.rich_text_cells + self.formula_cells
    }
}

/// Apply `dictionary` to one workbook. The dictionary is only read.
pub fn rewrite(
    file: &SourceFile,
    dictionary: &Dictionary,
    preserve_rich_text_formatting: bool,
) -> GlossaResult<TranslatedFile> {
    let matcher = Matcher::new(dictionary)?;
    rewrite_with(file, &matcher, preserve_rich_text_formatting)
}

/// Like [`rewrite`], reusing an already compiled matcher
pub fn rewrite_with(
    file: &SourceFile,
    matcher: &Matcher,
    preserve_rich_text_formatting: bool,
) -> GlossaResult<TranslatedFile> {
    let inner = || -> GlossaResult<TranslatedFile> {
        let mut model = WorkbookModel::load(&file.bytes)?;
        let stats = rewrite_model(&mut model, matcher, preserve_rich_text_formatting)?;
        info!(
            file = %file.name,
            cells = stats.total(),
            formulas = stats.formula_cells,
            "rewrote workbook"
        );
        Ok(TranslatedFile {
            name: file.name.clone(),
            payload: model.serialize()?,
        })
    };
    inner().map_err(|e| e.in_file(&file.name))
}

/// Rewrite every master cell of every sheet in place
pub fn rewrite_model(
    model: &mut WorkbookModel,
    matcher: &Matcher,
    preserve_rich_text_formatting: bool,
) -> GlossaResult<RewriteStats> {
    let mut stats = RewriteStats::default();

    for sheet in &mut model.sheets {
        let sheet_name = sheet.name.clone();
        for cell in sheet.master_cells_mut() {
            let replacement = match &cell.value {
                CellValue::Formula(formula) => {
                    rewrite_formula(formula, matcher)?.map(|f| {
                        stats.formula_cells += 1;
                        CellValue::Formula(f)
                    })
                }
                CellValue::RichText(runs) if preserve_rich_text_formatting => {
                    rewrite_runs(runs, matcher).map(|runs| {
                        stats.rich_text_cells += 1;
                        CellValue::RichText(runs)
                    })
                }
                CellValue::RichText(runs) => {
                    let joined: String = runs.iter().map(|run| run.text.as_str()).collect();
                    let translated = matcher.apply(&joined);
                    (translated != joined).then(|| {
                        stats.rich_text_cells += 1;
                        CellValue::Text(translated)
                    })
                }
                CellValue::Text(text) => {
                    let translated = matcher.apply(text);
                    (translated != *text).then(|| {
                        stats.text_cells += 1;
                        CellValue::Text(translated)
                    })
                }
                _ => None,
            };

            if let Some(value) = replacement {
                debug!(sheet = %sheet_name, cell = %cell.reference(), "cell rewritten");
                cell.set_value(value);
            }
        }
    }

    Ok(stats)
}

/// New formula when at least one literal changed
fn rewrite_formula(formula: &FormulaCell, matcher: &Matcher) -> GlossaResult<Option<FormulaCell>> {
    let expression = replace_literals(&formula.expression, |content| {
        if content.trim().is_empty() {
            return None;
        }
        Some(matcher.apply(content))
    })?;
    Ok(expression.map(|expression| FormulaCell {
        expression,
        ..formula.clone()
    }))
}

/// Exact-only per run; formatting is kept. `None` when no run matched.
fn rewrite_runs(runs: &[RichRun], matcher: &Matcher) -> Option<Vec<RichRun>> {
    let mut changed = false;
    let rewritten = runs
        .iter()
        .map(|run| match matcher.exact(&run.text) {
            Some(target) if target != run.text => {
                changed = true;
                RichRun {
                    text: target.to_string(),
                    format: run.format.clone(),
                }
            }
            _ => run.clone(),
        })
        .collect();
    changed.then_some(rewritten)
}
