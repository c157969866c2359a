//! End-to-end workbook tests
//!
//! Fixtures are authored with rust_xlsxwriter, run through extraction and
//! rewrite, and read back independently with calamine.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use pretty_assertions::assert_eq;
use royalbit_glossa::core::{extract, rewrite};
use royalbit_glossa::excel::{CellValue, WorkbookModel};
use royalbit_glossa::types::{Dictionary, MatchPolicy, ProcessingOptions, SourceFile, TermEntry};
use rust_xlsxwriter::{Chart, ChartType, ExcelDateTime, Format, Formula, Shape, Workbook};
use std::collections::BTreeSet;
use std::io::{Cursor, Read};

fn sample_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let plain = Format::new();
    let date = Format::new().set_num_format("yyyy-mm-dd");

    let data = workbook.add_worksheet();
    data.set_name("Data").unwrap();
    data.write_string(0, 0, "Hello").unwrap();
    data.write_formula(
        0,
        1,
        Formula::new(r#"=CONCATENATE("Hello", " ", "World")"#).set_result("Hello World"),
    )
    .unwrap();
    data.write_number(0, 2, 100.0).unwrap();
    data.write_string(0, 3, "100").unwrap();
    data.merge_range(1, 0, 1, 1, "Total", &plain).unwrap();
    data.write_rich_string(2, 0, &[(&bold, "Bold "), (&plain, "Plain")])
        .unwrap();
    data.write_string(3, 0, "New York City").unwrap();
    data.write_datetime_with_format(4, 0, &ExcelDateTime::from_ymd(2024, 1, 15).unwrap(), &date)
        .unwrap();
    data.insert_shape(6, 0, &Shape::textbox().set_text("Legend"))
        .unwrap();

    let mut chart = Chart::new(ChartType::Column);
    chart.title().set_name("Sales");
    chart.add_series().set_values("Data!$C$1:$C$1");
    data.insert_chart(6, 4, &chart).unwrap();

    let hidden = workbook.add_worksheet();
    hidden.set_name("HiddenOnly").unwrap();
    hidden.write_string(0, 0, "Secret").unwrap();
    hidden.set_hidden(true);

    workbook.save_to_buffer().unwrap()
}

fn dictionary() -> Dictionary {
    let entries = [
        ("Hello", "Bonjour", MatchPolicy::ExactOnly),
        ("World", "Monde", MatchPolicy::Flexible),
        ("New", "Новый", MatchPolicy::Flexible),
        ("New York", "Нью-Йорк", MatchPolicy::Flexible),
        ("Total", "Итого", MatchPolicy::Flexible),
        ("Bold", "Gras", MatchPolicy::Flexible),
        ("Legend", "Légende", MatchPolicy::Flexible),
    ];
    Dictionary::from_entries(
        entries
            .iter()
            .enumerate()
            .map(|(i, (source, target, policy))| {
                TermEntry::new(i.to_string(), *source)
                    .with_target(*target)
                    .with_policy(*policy)
            })
            .collect(),
    )
}

fn zip_part(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut content = Vec::new();
    part.read_to_end(&mut content).unwrap();
    content
}

// ═══════════════════════════════════════════════════════════════════════════
// EXTRACTION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_extract_from_authored_workbook() {
    let file = SourceFile::new("sample.xlsx", sample_workbook());
    let terms = extract([&file], &ProcessingOptions::default()).unwrap();

    for expected in [
        "Hello",
        "Total",
        "Bold",
        "Plain",
        "New York City",
        "2024-01-15",
        "Legend",
        "Sales",
    ] {
        assert!(terms.contains(expected), "missing term {:?} in {:?}", expected, terms);
    }
    for excluded in ["100", "Secret", "World", "Hello World"] {
        assert!(!terms.contains(excluded), "unexpected term {:?}", excluded);
    }
}

#[test]
fn test_extract_options_change_the_term_set() {
    let file = SourceFile::new("sample.xlsx", sample_workbook());
    let options = ProcessingOptions {
        translate_formulas: true,
        preserve_rich_text_formatting: false,
        extract_from_shapes: false,
        process_visible_sheets_only: false,
    };
    let terms = extract([&file], &options).unwrap();

    assert!(terms.contains("World"));
    assert!(terms.contains("Secret"));
    assert!(terms.contains("Bold Plain"));
    assert!(!terms.contains("Bold"));
    assert!(!terms.contains("Legend"));
    assert!(!terms.contains("Sales"));
}

#[test]
fn test_extract_batch_deduplicates_across_files() {
    let a = SourceFile::new("a.xlsx", sample_workbook());
    let b = SourceFile::new("b.xlsx", sample_workbook());
    let one = extract([&a], &ProcessingOptions::default()).unwrap();
    let both = extract([&a, &b], &ProcessingOptions::default()).unwrap();
    assert_eq!(one, both);

    let sorted: Vec<&String> = both.iter().collect();
    let mut resorted = sorted.clone();
    resorted.sort();
    assert_eq!(sorted, resorted);
}

// ═══════════════════════════════════════════════════════════════════════════
// REWRITE TESTS (read back with calamine)
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_rewrite_read_back_with_calamine() {
    let file = SourceFile::new("sample.xlsx", sample_workbook());
    let translated = rewrite(&file, &dictionary(), true).unwrap();
    assert_eq!(translated.name, "sample.xlsx");

    let mut book: Xlsx<_> = open_workbook_from_rs(Cursor::new(translated.payload.clone())).unwrap();
    let range = book.worksheet_range("Data").unwrap();

    assert_eq!(range.get_value((0, 0)), Some(&Data::String("Bonjour".into())));
    assert_eq!(range.get_value((0, 2)), Some(&Data::Float(100.0)));
    assert_eq!(range.get_value((0, 3)), Some(&Data::String("100".into())));
    assert_eq!(range.get_value((1, 0)), Some(&Data::String("Итого".into())));
    assert_eq!(range.get_value((2, 0)), Some(&Data::String("GrasPlain".into())));
    assert_eq!(
        range.get_value((3, 0)),
        Some(&Data::String("Нью-Йорк City".into()))
    );

    let formulas = book.worksheet_formula("Data").unwrap();
    let formula = formulas.get_value((0, 1)).unwrap();
    assert_eq!(formula, r#"CONCATENATE("Bonjour", " ", "Monde")"#);

    let hidden = book.worksheet_range("HiddenOnly").unwrap();
    assert_eq!(hidden.get_value((0, 0)), Some(&Data::String("Secret".into())));
}

#[test]
fn test_rewrite_keeps_merges_dates_and_drawings() {
    let original = sample_workbook();
    let file = SourceFile::new("sample.xlsx", original.clone());
    let translated = rewrite(&file, &dictionary(), true).unwrap();

    let before = WorkbookModel::load(&original).unwrap();
    let after = WorkbookModel::load(&translated.payload).unwrap();
    let sheet = after.sheet("Data").unwrap();

    let total = CellValue::Text("Итого".into());
    assert_eq!(sheet.value_at(2, 1).unwrap(), Some(&total));
    assert_eq!(sheet.value_at(2, 2).unwrap(), Some(&total));
    assert_eq!(sheet.merges, before.sheet("Data").unwrap().merges);

    assert_eq!(
        sheet.cell(5, 1).unwrap().value,
        before.sheet("Data").unwrap().cell(5, 1).unwrap().value
    );

    // Shapes are read-only: drawing parts are copied as they were
    for name in ["xl/drawings/drawing1.xml", "xl/styles.xml", "xl/charts/chart1.xml"] {
        assert_eq!(zip_part(&original, name), zip_part(&translated.payload, name), "{}", name);
    }
}

#[test]
fn test_rewrite_requests_recalculation() {
    let file = SourceFile::new("sample.xlsx", sample_workbook());
    let translated = rewrite(&file, &dictionary(), true).unwrap();
    let workbook_xml = String::from_utf8(zip_part(&translated.payload, "xl/workbook.xml")).unwrap();
    assert!(workbook_xml.contains(r#"fullCalcOnLoad="1""#));
}

#[test]
fn test_rewrite_flatten_mode_translates_joined_text() {
    let file = SourceFile::new("sample.xlsx", sample_workbook());
    let dict = Dictionary::from_entries(vec![
        TermEntry::new("1", "Bold Plain").with_target("Gras simple")
    ]);
    let translated = rewrite(&file, &dict, false).unwrap();

    let mut book: Xlsx<_> = open_workbook_from_rs(Cursor::new(translated.payload)).unwrap();
    let range = book.worksheet_range("Data").unwrap();
    assert_eq!(
        range.get_value((2, 0)),
        Some(&Data::String("Gras simple".into()))
    );
}

#[test]
fn test_extract_after_rewrite_sees_translations() {
    let file = SourceFile::new("sample.xlsx", sample_workbook());
    let translated = rewrite(&file, &dictionary(), true).unwrap();
    let again = SourceFile::new("sample.xlsx", translated.payload);
    let terms: BTreeSet<String> = extract([&again], &ProcessingOptions::default()).unwrap();

    assert!(terms.contains("Bonjour"));
    assert!(terms.contains("Итого"));
    assert!(!terms.contains("Total"));
    // Drawings are never rewritten
    assert!(terms.contains("Legend"));
}

// ═══════════════════════════════════════════════════════════════════════════
// FORMAT ERROR TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_legacy_xls_payload_is_format_error() {
    // OLE compound document signature
    let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    bytes.extend(std::iter::repeat(0u8).take(504));
    let file = SourceFile::new("legacy.xls", bytes);

    let err = extract([&file], &ProcessingOptions::default()).unwrap_err();
    assert!(err.is_format_error());
    assert!(err.to_string().starts_with("legacy.xls: "));

    let err = rewrite(&file, &dictionary(), true).unwrap_err();
    assert!(err.is_format_error());
}
