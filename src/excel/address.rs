//! A1-style cell references (1-based rows and columns)

/// Last row of a worksheet (`1048576`)
pub const MAX_ROW: u32 = 1_048_576;
/// Last column of a worksheet (`XFD`)
pub const MAX_COL: u32 = 16_384;

/// Inside the sheet grid `A1:XFD1048576`
pub fn in_grid(row: u32, col: u32) -> bool {
    (1..=MAX_ROW).contains(&row) && (1..=MAX_COL).contains(&col)
}

/// Convert a 1-based column number to letters (1→A, 26→Z, 27→AA)
pub fn column_letter(col: u32) -> String {
    let mut result = String::new();
    let mut num = col.saturating_sub(1);

    loop {
        let remainder = num % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if num < 26 {
            break;
        }
        num = num / 26 - 1;
    }

    result
}

/// `(row, col)` → `"B3"`
pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", column_letter(col), row)
}

/// `"B3"` / `"$B$3"` → `(3, 2)`
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.trim();
    let mut col: u32 = 0;
    let mut letters = 0;
    let mut chars = reference.char_indices().peekable();

    if let Some((_, '$')) = chars.peek() {
        chars.next();
    }
    while let Some(&(_, c)) = chars.peek() {
        if !c.is_ascii_alphabetic() {
            break;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
        letters += 1;
        chars.next();
    }
    if let Some(&(_, '$')) = chars.peek() {
        chars.next();
    }
    let digits_start = chars.peek().map(|&(i, _)| i)?;
    let row: u32 = reference[digits_start..].parse().ok()?;

    if letters == 0 || row == 0 {
        return None;
    }
    Some((row, col))
}

/// Inclusive rectangle of cells, e.g. a merged range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl CellRange {
    /// `"A1:B2"`, or a single reference `"A1"`
    pub fn parse(reference: &str) -> Option<Self> {
        let (start, end) = match reference.split_once(':') {
            Some((start, end)) => (parse_cell_ref(start)?, parse_cell_ref(end)?),
            None => {
                let cell = parse_cell_ref(reference)?;
                (cell, cell)
            }
        };
        Some(Self {
            first_row: start.0.min(end.0),
            first_col: start.1.min(end.1),
            last_row: start.0.max(end.0),
            last_col: start.1.max(end.1),
        })
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    /// Top-left cell
    pub fn master(&self) -> (u32, u32) {
        (self.first_row, self.first_col)
    }

    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.first_row..=self.last_row)
            .flat_map(move |row| (self.first_col..=self.last_col).map(move |col| (row, col)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((1, 1)));
        assert_eq!(parse_cell_ref("b3"), Some((3, 2)));
        assert_eq!(parse_cell_ref("$AA$10"), Some((10, 27)));
        assert_eq!(parse_cell_ref("XFD1048576"), Some((1_048_576, 16_384)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("A"), None);
        assert_eq!(parse_cell_ref(""), None);
    }

    #[test]
    fn test_in_grid() {
        assert!(in_grid(1, 1));
        assert!(in_grid(MAX_ROW, MAX_COL));
        assert!(!in_grid(MAX_ROW + 1, 1));
        assert!(!in_grid(1, MAX_COL + 1));
        assert!(!in_grid(0, 1));
    }

    #[test]
    fn test_cell_ref_roundtrip() {
        for (row, col) in [(1, 1), (7, 28), (100, 703)] {
            assert_eq!(parse_cell_ref(&cell_ref(row, col)), Some((row, col)));
        }
    }

    #[test]
    fn test_range_parse_and_contains() {
        let range = CellRange::parse("B2:A3").unwrap();
        assert_eq!(range.master(), (2, 1));
        assert!(range.contains(3, 2));
        assert!(!range.contains(1, 1));
        assert_eq!(range.cells().count(), 4);

        let single = CellRange::parse("C4").unwrap();
        assert_eq!(single.cells().collect::<Vec<_>>(), vec![(4, 3)]);
    }
}
