//! Workbook package → structural model

use super::address::{in_grid, parse_cell_ref, CellRange};
use super::numfmt;
use super::package::{
    Package, REL_CHART, REL_DRAWING, REL_OFFICE_DOCUMENT, REL_SHARED_STRINGS, REL_STYLES,
    REL_WORKSHEET,
};
use super::{
    Cell, CellValue, FormulaCell, MergeRole, RichRun, Row, RunFormat, Sheet, SheetState,
    WorkbookModel,
};
use crate::error::{GlossaError, GlossaResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

pub(crate) fn read_workbook(bytes: &[u8]) -> GlossaResult<WorkbookModel> {
    let package = Package::from_bytes(bytes)?;

    let workbook_part = package
        .related_parts("", REL_OFFICE_DOCUMENT)?
        .into_iter()
        .find(|part| package.part(part).is_some())
        .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string());
    let workbook_xml = package.part(&workbook_part).ok_or_else(|| {
        GlossaError::Format("package has no workbook part (is this an .xlsx file?)".to_string())
    })?;
    let info = parse_workbook_xml(workbook_xml)?;

    let relationships = package.relationships(&workbook_part)?;
    let shared_strings = match package.related_parts(&workbook_part, REL_SHARED_STRINGS)?.first() {
        Some(part) => match package.part(part) {
            Some(xml) => parse_shared_strings(xml)?,
            None => Vec::new(),
        },
        None => Vec::new(),
    };
    let styles = match package.related_parts(&workbook_part, REL_STYLES)?.first() {
        Some(part) => match package.part(part) {
            Some(xml) => parse_styles(xml)?,
            None => Styles::default(),
        },
        None => Styles::default(),
    };

    let context = SheetContext {
        shared_strings: &shared_strings,
        styles: &styles,
        date1904: info.date1904,
    };

    let mut sheets = Vec::new();
    for entry in &info.sheets {
        let Some(rel) = relationships
            .iter()
            .find(|rel| rel.id == entry.rel_id && rel.rel_type.ends_with(REL_WORKSHEET))
        else {
            // Chartsheets and dialog sheets carry no cells
            debug!(sheet = %entry.name, "skipping non-worksheet sheet");
            continue;
        };
        let part_name = super::package::resolve_target(&workbook_part, &rel.target);
        let xml = package.part(&part_name).ok_or_else(|| {
            GlossaError::Format(format!(
                "sheet '{}' points to missing part '{}'",
                entry.name, part_name
            ))
        })?;

        let parsed = parse_worksheet(xml, &context)
            .map_err(|e| match e {
                GlossaError::ContractViolation(msg) => {
                    GlossaError::ContractViolation(format!("sheet '{}': {}", entry.name, msg))
                }
                other => other,
            })?;

        let mut drawing_parts = package.related_parts(&part_name, REL_DRAWING)?;
        let mut charts = Vec::new();
        for drawing in &drawing_parts {
            charts.extend(package.related_parts(drawing, REL_CHART)?);
        }
        drawing_parts.extend(charts);

        debug!(
            sheet = %entry.name,
            rows = parsed.rows.len(),
            merges = parsed.merges.len(),
            drawings = drawing_parts.len(),
            "parsed worksheet"
        );

        sheets.push(Sheet {
            name: entry.name.clone(),
            state: entry.state,
            rows: parsed.rows,
            merges: parsed.merges,
            part_name,
            drawing_parts,
        });
    }

    Ok(WorkbookModel {
        sheets,
        package,
        workbook_part,
        date1904: info.date1904,
    })
}

//==============================================================================
// workbook.xml
//==============================================================================

struct SheetEntry {
    name: String,
    state: SheetState,
    rel_id: String,
}

struct WorkbookInfo {
    sheets: Vec<SheetEntry>,
    date1904: bool,
}

fn parse_workbook_xml(xml: &[u8]) -> GlossaResult<WorkbookInfo> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut info = WorkbookInfo {
        sheets: Vec::new(),
        date1904: false,
    };

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    if let Some(value) = attribute(&e, b"date1904")? {
                        info.date1904 = value == "1" || value.eq_ignore_ascii_case("true");
                    }
                }
                b"sheet" => {
                    let mut entry = SheetEntry {
                        name: String::new(),
                        state: SheetState::Visible,
                        rel_id: String::new(),
                    };
                    for attr in e.attributes() {
                        let attr = attr?;
                        let value = attr.unescape_value()?.into_owned();
                        match attr.key.local_name().as_ref() {
                            b"name" => entry.name = value,
                            b"state" => entry.state = SheetState::from_attr(&value),
                            b"id" => entry.rel_id = value,
                            _ => {}
                        }
                    }
                    info.sheets.push(entry);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(info)
}

//==============================================================================
// Shared strings and inline strings
//==============================================================================

#[derive(Debug, Clone, PartialEq)]
enum StringItem {
    Plain(String),
    Rich(Vec<RichRun>),
}

impl StringItem {
    fn into_value(self) -> CellValue {
        match self {
            StringItem::Plain(text) => CellValue::Text(text),
            StringItem::Rich(runs) => CellValue::RichText(runs),
        }
    }
}

fn parse_shared_strings(xml: &[u8]) -> GlossaResult<Vec<StringItem>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut items = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                items.push(parse_string_item(&mut reader, b"si")?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                items.push(StringItem::Plain(String::new()));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

/// Read the body of an open `<si>` / `<is>` element up to its end tag
fn parse_string_item(reader: &mut Reader<&[u8]>, end: &[u8]) -> GlossaResult<StringItem> {
    let mut buf = Vec::new();
    let mut plain = String::new();
    let mut runs = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => plain.push_str(&read_text(reader, b"t")?),
                b"r" => runs.push(parse_run(reader)?),
                // Phonetic runs hold their own <t> elements
                _ => {
                    reader.read_to_end_into(e.name(), &mut Vec::new())?;
                }
            },
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => {
                return Err(GlossaError::Format(
                    "unexpected end of document inside string item".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    if runs.is_empty() {
        Ok(StringItem::Plain(plain))
    } else {
        if !plain.is_empty() {
            runs.insert(0, RichRun::plain(plain));
        }
        Ok(StringItem::Rich(runs))
    }
}

fn parse_run(reader: &mut Reader<&[u8]>) -> GlossaResult<RichRun> {
    let mut buf = Vec::new();
    let mut text = None;
    let mut format = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => text = Some(read_text(reader, b"t")?),
                b"rPr" => format = Some(capture_markup(reader, e.to_owned())?),
                _ => {
                    reader.read_to_end_into(e.name(), &mut Vec::new())?;
                }
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"t" => text = Some(String::new()),
                b"rPr" => {
                    let mut writer = Writer::new(Vec::new());
                    writer.write_event(Event::Empty(e.to_owned()))?;
                    format = Some(RunFormat(utf8(writer.into_inner())?));
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"r" => break,
            Event::Eof => {
                return Err(GlossaError::Format(
                    "unexpected end of document inside rich-text run".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    let text = text.ok_or_else(|| {
        GlossaError::ContractViolation("rich-text run has no text element".to_string())
    })?;
    Ok(RichRun { text, format })
}

/// Re-serialize an open element and everything inside it verbatim
fn capture_markup(reader: &mut Reader<&[u8]>, start: BytesStart<'static>) -> GlossaResult<RunFormat> {
    let name = start.name().as_ref().to_vec();
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(start))?;
    let mut buf = Vec::new();
    let mut depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let mut done = false;
        match &event {
            Event::Start(e) if e.name().as_ref() == name.as_slice() => depth += 1,
            Event::End(e) if e.name().as_ref() == name.as_slice() => {
                if depth == 0 {
                    done = true;
                } else {
                    depth -= 1;
                }
            }
            Event::Eof => {
                return Err(GlossaError::Format(
                    "unexpected end of document inside run properties".to_string(),
                ))
            }
            _ => {}
        }
        writer.write_event(event.into_owned())?;
        if done {
            break;
        }
        buf.clear();
    }

    Ok(RunFormat(utf8(writer.into_inner())?))
}

/// Unescaped text content of an open element
pub(crate) fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> GlossaResult<String> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(&utf8(e.into_inner().into_owned())?),
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => {
                return Err(GlossaError::Format(format!(
                    "unexpected end of document inside <{}>",
                    String::from_utf8_lossy(end)
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

//==============================================================================
// styles.xml
//==============================================================================

#[derive(Debug, Default)]
struct Styles {
    /// `numFmtId` per `cellXfs` index
    cell_formats: Vec<u32>,
    custom_formats: HashMap<u32, String>,
}

impl Styles {
    /// Date/time format code for a cell style, if it has one
    fn date_format(&self, style: usize) -> Option<String> {
        let id = *self.cell_formats.get(style)?;
        match self.custom_formats.get(&id) {
            Some(code) if numfmt::is_date_format_code(code) => Some(code.clone()),
            Some(_) => None,
            None => numfmt::builtin_date_format(id).map(str::to_string),
        }
    }
}

fn parse_styles(xml: &[u8]) -> GlossaResult<Styles> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut styles = Styles::default();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    let id = attribute(&e, b"numFmtId")?.and_then(|v| v.parse().ok());
                    let code = attribute(&e, b"formatCode")?;
                    if let (Some(id), Some(code)) = (id, code) {
                        styles.custom_formats.insert(id, code);
                    }
                }
                b"xf" if in_cell_xfs => {
                    let id = attribute(&e, b"numFmtId")?
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                    styles.cell_formats.push(id);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

//==============================================================================
// Worksheets
//==============================================================================

struct SheetContext<'a> {
    shared_strings: &'a [StringItem],
    styles: &'a Styles,
    date1904: bool,
}

/// Row/column of each `<row>` and `<c>`, including elements without an `r`
/// attribute (they follow the previous one).
#[derive(Debug, Default)]
pub(crate) struct PositionTracker {
    row: u32,
    col: u32,
}

impl PositionTracker {
    pub(crate) fn enter_row(&mut self, start: &BytesStart<'_>) -> GlossaResult<u32> {
        self.row = match attribute(start, b"r")? {
            Some(r) => r
                .trim()
                .parse()
                .ok()
                .filter(|row| in_grid(*row, 1))
                .ok_or_else(|| GlossaError::Format(format!("row number '{}' out of range", r)))?,
            None => self.row.saturating_add(1),
        };
        self.col = 0;
        Ok(self.row)
    }

    pub(crate) fn enter_cell(&mut self, start: &BytesStart<'_>) -> GlossaResult<(u32, u32)> {
        match attribute(start, b"r")?.and_then(|r| parse_cell_ref(&r)) {
            Some((row, col)) => {
                self.row = row;
                self.col = col;
            }
            None => self.col = self.col.saturating_add(1),
        }
        let at = (self.row.max(1), self.col);
        check_in_grid(at.0, at.1)?;
        Ok(at)
    }
}

fn check_in_grid(row: u32, col: u32) -> GlossaResult<()> {
    if in_grid(row, col) {
        return Ok(());
    }
    Err(GlossaError::Format(format!(
        "cell {} outside the sheet grid",
        super::cell_ref(row, col)
    )))
}

#[derive(Debug)]
struct ParsedSheet {
    rows: Vec<Row>,
    merges: Vec<CellRange>,
}

#[derive(Default)]
struct RawCell {
    cell_type: Option<String>,
    style: Option<usize>,
    attributes: Vec<(String, String)>,
    value: Option<String>,
    formula: Option<(String, Vec<(String, String)>)>,
    inline: Option<StringItem>,
}

fn parse_worksheet(xml: &[u8], context: &SheetContext<'_>) -> GlossaResult<ParsedSheet> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut cells: BTreeMap<(u32, u32), Cell> = BTreeMap::new();
    let mut merges = Vec::new();
    let mut position = PositionTracker::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                position.enter_row(&e)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let (row, col) = position.enter_cell(&e)?;
                let mut raw = raw_cell(&e)?;
                read_cell_body(&mut reader, &mut raw)?;
                cells.insert((row, col), build_cell(row, col, raw, context)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let (row, col) = position.enter_cell(&e)?;
                let raw = raw_cell(&e)?;
                cells.insert((row, col), build_cell(row, col, raw, context)?);
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"mergeCell" => {
                if let Some(range) = attribute(&e, b"ref")?.and_then(|r| CellRange::parse(&r)) {
                    check_in_grid(range.last_row, range.last_col)?;
                    merges.push(range);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    for (i, a) in merges.iter().enumerate() {
        if let Some(b) = merges[i + 1..].iter().find(|b| ranges_overlap(a, b)) {
            return Err(GlossaError::ContractViolation(format!(
                "merged ranges {}:{} and {}:{} overlap",
                super::cell_ref(a.first_row, a.first_col),
                super::cell_ref(a.last_row, a.last_col),
                super::cell_ref(b.first_row, b.first_col),
                super::cell_ref(b.last_row, b.last_col),
            )));
        }
    }

    // Merged cells without a stored element are logically empty
    for range in &merges {
        for (row, col) in range.cells() {
            cells
                .entry((row, col))
                .or_insert_with(|| Cell::placeholder(row, col));
        }
    }

    let mut rows = densify(cells);
    for range in &merges {
        let (master_row, master_col) = range.master();
        for (row, col) in range.cells() {
            let Some(cell) = rows
                .get_mut(row as usize - 1)
                .and_then(|r| r.cells.get_mut(col as usize - 1))
            else {
                continue;
            };
            cell.merge = if (row, col) == (master_row, master_col) {
                MergeRole::Master
            } else {
                MergeRole::Member {
                    row: master_row,
                    col: master_col,
                }
            };
        }
    }

    Ok(ParsedSheet { rows, merges })
}

fn ranges_overlap(a: &CellRange, b: &CellRange) -> bool {
    a.first_row <= b.last_row
        && b.first_row <= a.last_row
        && a.first_col <= b.last_col
        && b.first_col <= a.last_col
}

/// Fill gaps so rows start at 1 and each row's cells start at column A
fn densify(cells: BTreeMap<(u32, u32), Cell>) -> Vec<Row> {
    let last_row = cells.keys().map(|(row, _)| *row).max().unwrap_or(0);
    let mut rows: Vec<Row> = (1..=last_row)
        .map(|index| Row {
            index,
            cells: Vec::new(),
        })
        .collect();

    for ((row, col), cell) in cells {
        let cells = &mut rows[row as usize - 1].cells;
        while (cells.len() as u32) < col - 1 {
            let next = cells.len() as u32 + 1;
            cells.push(Cell::placeholder(row, next));
        }
        cells.push(cell);
    }

    rows
}

fn raw_cell(start: &BytesStart<'_>) -> GlossaResult<RawCell> {
    let mut raw = RawCell::default();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        match attr.key.local_name().as_ref() {
            b"t" => raw.cell_type = Some(value.clone()),
            b"s" => raw.style = value.trim().parse().ok(),
            _ => {}
        }
        raw.attributes.push((key, value));
    }
    Ok(raw)
}

fn read_cell_body(reader: &mut Reader<&[u8]>, raw: &mut RawCell) -> GlossaResult<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"f" => {
                    let attributes = owned_attributes(&e)?;
                    let expression = read_text(reader, b"f")?;
                    raw.formula = Some((expression, attributes));
                }
                b"v" => raw.value = Some(read_text(reader, b"v")?),
                b"is" => raw.inline = Some(parse_string_item(reader, b"is")?),
                _ => {
                    reader.read_to_end_into(e.name(), &mut Vec::new())?;
                }
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                // Shared-formula followers carry no expression of their own
                b"f" => raw.formula = Some((String::new(), owned_attributes(&e)?)),
                b"v" => raw.value = Some(String::new()),
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => {
                return Err(GlossaError::Format(
                    "unexpected end of document inside cell".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn build_cell(row: u32, col: u32, raw: RawCell, context: &SheetContext<'_>) -> GlossaResult<Cell> {
    let value = match (raw.formula, raw.cell_type.as_deref()) {
        (Some((expression, attributes)), _) => CellValue::Formula(FormulaCell {
            expression,
            cached: raw.value,
            attributes,
        }),
        (None, Some("s")) => {
            let index: usize = raw
                .value
                .as_deref()
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| {
                    GlossaError::Format(format!(
                        "cell {} has an invalid shared string index",
                        super::cell_ref(row, col)
                    ))
                })?;
            context
                .shared_strings
                .get(index)
                .cloned()
                .ok_or_else(|| {
                    GlossaError::Format(format!(
                        "cell {} refers to missing shared string {}",
                        super::cell_ref(row, col),
                        index
                    ))
                })?
                .into_value()
        }
        (None, Some("inlineStr")) => raw
            .inline
            .map(StringItem::into_value)
            .unwrap_or_default(),
        (None, Some("str")) => CellValue::Text(raw.value.unwrap_or_default()),
        (None, Some("b")) => match raw.value {
            Some(v) => CellValue::Bool(v.trim() == "1"),
            None => CellValue::Empty,
        },
        (None, Some("e")) => match raw.value {
            Some(v) => CellValue::Error(v),
            None => CellValue::Empty,
        },
        (None, Some("d")) => match raw.value {
            Some(v) => CellValue::Date {
                serial: None,
                display: v,
            },
            None => CellValue::Empty,
        },
        (None, _) => match raw.value.as_deref().map(str::trim) {
            None | Some("") => CellValue::Empty,
            Some(v) => {
                let number: f64 = v.parse().map_err(|_| {
                    GlossaError::Format(format!(
                        "cell {} has non-numeric value '{}'",
                        super::cell_ref(row, col),
                        v
                    ))
                })?;
                let date_code = raw.style.and_then(|s| context.styles.date_format(s));
                match date_code {
                    Some(code) => CellValue::Date {
                        serial: Some(number),
                        display: numfmt::format_date(number, &code, context.date1904)
                            .unwrap_or_else(|| numfmt::format_general(number)),
                    },
                    None => CellValue::Number(number),
                }
            }
        },
    };

    Ok(Cell {
        row,
        col,
        value,
        merge: MergeRole::None,
        attributes: raw.attributes,
        dirty: false,
    })
}

//==============================================================================
// Helpers
//==============================================================================

/// Unescaped value of the attribute with the given local name
pub(crate) fn attribute(start: &BytesStart<'_>, name: &[u8]) -> GlossaResult<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn owned_attributes(start: &BytesStart<'_>) -> GlossaResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        out.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            attr.unescape_value()?.into_owned(),
        ));
    }
    Ok(out)
}

fn utf8(bytes: Vec<u8>) -> GlossaResult<String> {
    String::from_utf8(bytes).map_err(|e| GlossaError::Format(format!("invalid UTF-8: {}", e)))
}
