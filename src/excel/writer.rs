//! Structural model → workbook package
//!
//! Worksheets with changed cells are streamed through a reader/writer pair and
//! only the changed `<c>` elements are re-rendered. Text lands as inline
//! strings so the shared string table never needs rewriting.

use super::address::cell_ref;
use super::numfmt::format_general;
use super::reader::PositionTracker;
use super::{Cell, CellValue, RichRun, Sheet, WorkbookModel};
use crate::error::{GlossaError, GlossaResult};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// `<workbook>` children that must follow `<calcPr>`
const AFTER_CALC_PR: &[&[u8]] = &[
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

pub(crate) fn write_workbook(model: &WorkbookModel) -> GlossaResult<Vec<u8>> {
    let mut package = model.package.clone();
    let mut formulas_changed = false;

    for sheet in model.sheets.iter().filter(|sheet| sheet.is_dirty()) {
        let xml = package.part(&sheet.part_name).ok_or_else(|| {
            GlossaError::Format(format!(
                "sheet '{}' has no part '{}'",
                sheet.name, sheet.part_name
            ))
        })?;
        let patched = patch_worksheet(xml, sheet)?;
        package.set_part(&sheet.part_name, patched);

        formulas_changed |= sheet
            .master_cells()
            .any(|cell| cell.dirty && matches!(cell.value, CellValue::Formula(_)));
    }

    if formulas_changed {
        if let Some(xml) = package.part(&model.workbook_part) {
            let patched = force_full_calc_on_load(xml)?;
            package.set_part(&model.workbook_part, patched);
            debug!("formula text changed; workbook flagged for full recalculation");
        }
    }

    package.to_bytes()
}

//==============================================================================
// Worksheet patching
//==============================================================================

fn patch_worksheet(xml: &[u8], sheet: &Sheet) -> GlossaResult<Vec<u8>> {
    let dirty: HashMap<(u32, u32), &Cell> = sheet
        .rows
        .iter()
        .flat_map(|row| row.cells.iter())
        .filter(|cell| cell.dirty)
        .map(|cell| ((cell.row, cell.col), cell))
        .collect();
    let mut written = HashSet::new();

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
    let mut buf = Vec::new();
    let mut position = PositionTracker::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                position.enter_row(&e)?;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                position.enter_row(&e)?;
                writer.write_event(Event::Empty(e))?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let at = position.enter_cell(&e)?;
                match dirty.get(&at) {
                    Some(cell) => {
                        let prefix = element_prefix(&e);
                        reader.read_to_end_into(e.name(), &mut Vec::new())?;
                        write_cell(&mut writer, cell, &prefix)?;
                        written.insert(at);
                    }
                    None => writer.write_event(Event::Start(e))?,
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let at = position.enter_cell(&e)?;
                match dirty.get(&at) {
                    Some(cell) => {
                        write_cell(&mut writer, cell, &element_prefix(&e))?;
                        written.insert(at);
                    }
                    None => writer.write_event(Event::Empty(e))?,
                }
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
        buf.clear();
    }

    if let Some((row, col)) = dirty.keys().find(|at| !written.contains(*at)) {
        return Err(GlossaError::ContractViolation(format!(
            "sheet '{}': changed cell {} has no stored element",
            sheet.name,
            cell_ref(*row, *col)
        )));
    }

    Ok(writer.into_inner())
}

/// Namespace prefix of an element name including the colon (`x:c` → `x:`)
fn element_prefix(start: &BytesStart<'_>) -> String {
    let name = start.name();
    let name = String::from_utf8_lossy(name.as_ref());
    match name.rsplit_once(':') {
        Some((prefix, _)) => format!("{}:", prefix),
        None => String::new(),
    }
}

fn write_cell(writer: &mut Writer<Vec<u8>>, cell: &Cell, prefix: &str) -> GlossaResult<()> {
    let name = |local: &str| format!("{}{}", prefix, local);
    let c = name("c");
    let cell_type = match &cell.value {
        CellValue::Text(_) | CellValue::RichText(_) => Some("inlineStr"),
        CellValue::Bool(_) => Some("b"),
        CellValue::Error(_) => Some("e"),
        CellValue::Date { serial: None, .. } => Some("d"),
        _ => None,
    };

    let mut start = BytesStart::new(c.as_str());
    for (key, value) in &cell.attributes {
        let is_type = key == "t" || key.ends_with(":t");
        if is_type && !matches!(cell.value, CellValue::Formula(_)) {
            continue;
        }
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if let Some(cell_type) = cell_type {
        start.push_attribute(("t", cell_type));
    }

    match &cell.value {
        CellValue::Empty => {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        CellValue::Text(text) => {
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new(name("is").as_str())))?;
            write_text_element(writer, &name("t"), text)?;
            writer.write_event(Event::End(BytesEnd::new(name("is").as_str())))?;
        }
        CellValue::RichText(runs) => {
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new(name("is").as_str())))?;
            for run in runs {
                write_run(writer, run, prefix)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name("is").as_str())))?;
        }
        CellValue::Formula(formula) => {
            writer.write_event(Event::Start(start))?;
            let f_name = name("f");
            let mut f = BytesStart::new(f_name.as_str());
            for (key, value) in &formula.attributes {
                f.push_attribute((key.as_str(), value.as_str()));
            }
            if formula.expression.is_empty() {
                writer.write_event(Event::Empty(f))?;
            } else {
                writer.write_event(Event::Start(f))?;
                writer.write_event(Event::Text(BytesText::new(&formula.expression)))?;
                writer.write_event(Event::End(BytesEnd::new(f_name.as_str())))?;
            }
            if let Some(cached) = &formula.cached {
                write_value(writer, &name("v"), cached)?;
            }
        }
        CellValue::Number(n) => {
            writer.write_event(Event::Start(start))?;
            write_value(writer, &name("v"), &format_general(*n))?;
        }
        CellValue::Date {
            serial: Some(serial),
            ..
        } => {
            writer.write_event(Event::Start(start))?;
            write_value(writer, &name("v"), &format_general(*serial))?;
        }
        CellValue::Date {
            serial: None,
            display,
        } => {
            writer.write_event(Event::Start(start))?;
            write_value(writer, &name("v"), display)?;
        }
        CellValue::Bool(value) => {
            writer.write_event(Event::Start(start))?;
            write_value(writer, &name("v"), if *value { "1" } else { "0" })?;
        }
        CellValue::Error(code) => {
            writer.write_event(Event::Start(start))?;
            write_value(writer, &name("v"), code)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new(c.as_str())))?;
    Ok(())
}

fn write_run(writer: &mut Writer<Vec<u8>>, run: &RichRun, prefix: &str) -> GlossaResult<()> {
    let r = format!("{}r", prefix);
    writer.write_event(Event::Start(BytesStart::new(r.as_str())))?;
    if let Some(format) = &run.format {
        writer.get_mut().extend_from_slice(format.as_xml().as_bytes());
    }
    write_text_element(writer, &format!("{}t", prefix), &run.text)?;
    writer.write_event(Event::End(BytesEnd::new(r.as_str())))?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> GlossaResult<()> {
    let mut t = BytesStart::new(name);
    if needs_space_preserve(text) {
        t.push_attribute(("xml:space", "preserve"));
    }
    writer.write_event(Event::Start(t))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_value(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> GlossaResult<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || text.contains('\n')
}

//==============================================================================
// Recalculation flag
//==============================================================================

/// Set `fullCalcOnLoad="1"` on `<calcPr>`, adding the element when absent
pub(crate) fn force_full_calc_on_load(xml: &[u8]) -> GlossaResult<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 48));
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut saw_calc_pr = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) if depth == 1 && e.local_name().as_ref() == b"calcPr" => {
                saw_calc_pr = true;
                writer.write_event(Event::Empty(patched_calc_pr(&e)?))?;
            }
            Event::Start(e) if depth == 1 && e.local_name().as_ref() == b"calcPr" => {
                // calcPr has no children
                saw_calc_pr = true;
                writer.write_event(Event::Empty(patched_calc_pr(&e)?))?;
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::Start(e) => {
                if depth == 1 && !saw_calc_pr && AFTER_CALC_PR.contains(&e.local_name().as_ref()) {
                    writer.write_event(Event::Empty(new_calc_pr(&e)))?;
                    saw_calc_pr = true;
                }
                depth += 1;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) => {
                if depth == 1 && !saw_calc_pr && AFTER_CALC_PR.contains(&e.local_name().as_ref()) {
                    writer.write_event(Event::Empty(new_calc_pr(&e)))?;
                    saw_calc_pr = true;
                }
                writer.write_event(Event::Empty(e))?;
            }
            Event::End(e) => {
                if depth == 1 && !saw_calc_pr {
                    writer.write_event(Event::Empty(new_calc_pr_named(&element_prefix_end(&e))))?;
                    saw_calc_pr = true;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn patched_calc_pr(start: &BytesStart<'_>) -> GlossaResult<BytesStart<'static>> {
    let mut calc_pr = BytesStart::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"fullCalcOnLoad" {
            continue;
        }
        calc_pr.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
    }
    calc_pr.push_attribute(("fullCalcOnLoad", "1"));
    Ok(calc_pr.into_owned())
}

/// New `<calcPr>` sharing the namespace prefix of a sibling element
fn new_calc_pr(sibling: &BytesStart<'_>) -> BytesStart<'static> {
    new_calc_pr_named(&element_prefix(sibling))
}

fn new_calc_pr_named(prefix: &str) -> BytesStart<'static> {
    let mut calc_pr = BytesStart::new(format!("{}calcPr", prefix));
    calc_pr.push_attribute(("fullCalcOnLoad", "1"));
    calc_pr
}

fn element_prefix_end(end: &BytesEnd<'_>) -> String {
    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
    match name.rsplit_once(':') {
        Some((prefix, _)) => format!("{}:", prefix),
        None => String::new(),
    }
}
