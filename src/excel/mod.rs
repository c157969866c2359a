//! Workbook adapter
//!
//! Opens an OOXML workbook (`.xlsx` / `.xlsm`) into a structural model of
//! sheets, rows and cells, and writes a mutated model back. Only worksheets
//! holding a changed cell are re-rendered; every other part of the package is
//! copied byte-for-byte.
//!
//! - [`address`]: A1 references and merged ranges
//! - [`package`]: zip parts and relationships
//! - [`drawing`]: read-only DrawingML text (shapes, text boxes, chart titles)

pub mod address;
mod drawing;
#[cfg(test)]
pub(crate) mod fixtures;
mod numfmt;
pub mod package;
mod reader;
mod writer;

pub use address::{cell_ref, column_letter, parse_cell_ref, CellRange};
pub use drawing::{list_drawing_text_runs, DRAWINGML_PARSER_VERSION};
pub use numfmt::format_general;
pub use package::Package;

use crate::error::{GlossaError, GlossaResult};

//==============================================================================
// Cell Values
//==============================================================================

/// Sheet visibility as declared in `workbook.xml`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetState {
    fn from_attr(value: &str) -> Self {
        match value {
            "hidden" => SheetState::Hidden,
            "veryHidden" => SheetState::VeryHidden,
            _ => SheetState::Visible,
        }
    }
}

/// Verbatim `<rPr>` markup of a rich-text run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFormat(pub(crate) String);

impl RunFormat {
    pub fn as_xml(&self) -> &str {
        &self.0
    }
}

/// One formatted run of a rich-text cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichRun {
    pub text: String,
    pub format: Option<RunFormat>,
}

impl RichRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: None,
        }
    }
}

/// Formula cell: expression without the leading `=`
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaCell {
    pub expression: String,
    /// Cached result as stored in `<v>`
    pub cached: Option<String>,
    /// Raw `<f>` attributes (`t`, `ref`, `si`, ...)
    pub(crate) attributes: Vec<(String, String)>,
}

impl FormulaCell {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            cached: None,
            attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Error code such as `#N/A`
    Error(String),
    /// Number under a date/time format, with its displayed form
    Date { serial: Option<f64>, display: String },
    RichText(Vec<RichRun>),
    Formula(FormulaCell),
}

impl CellValue {
    /// Displayed text of a non-formula value; `None` for empty cells and formulas
    pub fn display(&self) -> Option<String> {
        match self {
            CellValue::Empty | CellValue::Formula(_) => None,
            CellValue::Text(text) => Some(text.clone()),
            CellValue::Number(n) => Some(format_general(*n)),
            CellValue::Bool(true) => Some("TRUE".to_string()),
            CellValue::Bool(false) => Some("FALSE".to_string()),
            CellValue::Error(code) => Some(code.clone()),
            CellValue::Date { display, .. } => Some(display.clone()),
            CellValue::RichText(runs) => Some(runs.iter().map(|run| run.text.as_str()).collect()),
        }
    }
}

//==============================================================================
// Sheet Structure
//==============================================================================

/// Position of a cell relative to merged ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeRole {
    #[default]
    None,
    /// Top-left cell of a merged range
    Master,
    /// Covered cell; its value lives in the master
    Member { row: u32, col: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    pub value: CellValue,
    pub merge: MergeRole,
    /// `<c>` attributes as stored (`r`, `s`, `t`, ...)
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) dirty: bool,
}

impl Cell {
    pub(crate) fn placeholder(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            value: CellValue::Empty,
            merge: MergeRole::None,
            attributes: Vec::new(),
            dirty: false,
        }
    }

    pub fn reference(&self) -> String {
        cell_ref(self.row, self.col)
    }

    /// Master or unmerged: the only cells that are read or written
    pub fn is_master(&self) -> bool {
        !matches!(self.merge, MergeRole::Member { .. })
    }

    /// Replace the value; the sheet is re-rendered on serialize
    pub fn set_value(&mut self, value: CellValue) {
        if self.value != value {
            self.value = value;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Dense row: cells from column A to the last cell present
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub index: u32,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub state: SheetState,
    /// Dense rows from row 1 to the last row present
    pub rows: Vec<Row>,
    pub merges: Vec<CellRange>,
    pub(crate) part_name: String,
    /// Drawing and chart parts reachable from this sheet
    pub(crate) drawing_parts: Vec<String>,
}

impl Sheet {
    pub fn is_visible(&self) -> bool {
        self.state == SheetState::Visible
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        let r = self.rows.get(row.checked_sub(1)? as usize)?;
        r.cells.get(col.checked_sub(1)? as usize)
    }

    pub fn cell_mut(&mut self, row: u32, col: u32) -> Option<&mut Cell> {
        let r = self.rows.get_mut(row.checked_sub(1)? as usize)?;
        r.cells.get_mut(col.checked_sub(1)? as usize)
    }

    /// Value shown at a position; merge members read through to their master
    pub fn value_at(&self, row: u32, col: u32) -> GlossaResult<Option<&CellValue>> {
        let Some(cell) = self.cell(row, col) else {
            return Ok(None);
        };
        match cell.merge {
            MergeRole::Member {
                row: master_row,
                col: master_col,
            } => self
                .cell(master_row, master_col)
                .map(|master| Some(&master.value))
                .ok_or_else(|| {
                    GlossaError::ContractViolation(format!(
                        "sheet '{}': merged cell {} has no master cell {}",
                        self.name,
                        cell.reference(),
                        cell_ref(master_row, master_col)
                    ))
                }),
            _ => Ok(Some(&cell.value)),
        }
    }

    /// Master and unmerged cells in row-major order
    pub fn master_cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .filter(|cell| cell.is_master())
    }

    pub fn master_cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.rows
            .iter_mut()
            .flat_map(|row| row.cells.iter_mut())
            .filter(|cell| cell.is_master())
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .any(|cell| cell.dirty)
    }
}

//==============================================================================
// Workbook
//==============================================================================

/// In-memory workbook: sheets plus the package they were read from
#[derive(Debug, Clone)]
pub struct WorkbookModel {
    pub sheets: Vec<Sheet>,
    pub(crate) package: Package,
    pub(crate) workbook_part: String,
    pub date1904: bool,
}

impl WorkbookModel {
    /// Parse a workbook payload. Corrupt or unsupported input is a format error.
    pub fn load(bytes: &[u8]) -> GlossaResult<Self> {
        reader::read_workbook(bytes)
    }

    /// Write the model back to a payload
    pub fn serialize(&self) -> GlossaResult<Vec<u8>> {
        writer::write_workbook(self)
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    pub fn package(&self) -> &Package {
        &self.package
    }
}
