//! Hand-built workbook packages for unit tests

use super::package::build_zip;

pub(crate) struct FixtureSheet<'a> {
    pub name: &'a str,
    pub state: Option<&'a str>,
    pub sheet_data: &'a str,
    /// Markup placed after `</sheetData>`, e.g. `<mergeCells>`
    pub after_data: &'a str,
    pub drawing: Option<&'a str>,
    pub chart: Option<&'a str>,
}

impl<'a> FixtureSheet<'a> {
    pub fn new(name: &'a str, sheet_data: &'a str) -> Self {
        Self {
            name,
            state: None,
            sheet_data,
            after_data: "",
            drawing: None,
            chart: None,
        }
    }
}

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub(crate) fn workbook(sheets: &[FixtureSheet<'_>], shared_strings: Option<&str>) -> Vec<u8> {
    let mut parts: Vec<(String, Vec<u8>)> = Vec::new();

    parts.push((
        "_rels/.rels".into(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
            REL_NS
        )
        .into_bytes(),
    ));

    let mut sheet_entries = String::new();
    let mut workbook_rels = String::new();
    for (i, sheet) in sheets.iter().enumerate() {
        let n = i + 1;
        let state = sheet
            .state
            .map(|s| format!(r#" state="{}""#, s))
            .unwrap_or_default();
        sheet_entries.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
            sheet.name, n, state, n
        ));
        workbook_rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{}/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            n, REL_NS, n
        ));

        let drawing_ref = if sheet.drawing.is_some() {
            r#"<drawing r:id="rId1"/>"#
        } else {
            ""
        };
        parts.push((
            format!("xl/worksheets/sheet{}.xml", n),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="{}"><sheetData>{}</sheetData>{}{}</worksheet>"#,
                REL_NS, sheet.sheet_data, sheet.after_data, drawing_ref
            )
            .into_bytes(),
        ));

        if let Some(drawing) = sheet.drawing {
            parts.push((
                format!("xl/worksheets/_rels/sheet{}.xml.rels", n),
                format!(
                    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}/drawing" Target="../drawings/drawing{}.xml"/></Relationships>"#,
                    REL_NS, n
                )
                .into_bytes(),
            ));
            parts.push((format!("xl/drawings/drawing{}.xml", n), drawing.as_bytes().to_vec()));

            if let Some(chart) = sheet.chart {
                parts.push((
                    format!("xl/drawings/_rels/drawing{}.xml.rels", n),
                    format!(
                        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}/chart" Target="../charts/chart{}.xml"/></Relationships>"#,
                        REL_NS, n
                    )
                    .into_bytes(),
                ));
                parts.push((format!("xl/charts/chart{}.xml", n), chart.as_bytes().to_vec()));
            }
        }
    }

    if let Some(sst) = shared_strings {
        workbook_rels.push_str(&format!(
            r#"<Relationship Id="rIdSst" Type="{}/sharedStrings" Target="sharedStrings.xml"/>"#,
            REL_NS
        ));
        parts.push((
            "xl/sharedStrings.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{}</sst>"#,
                sst
            )
            .into_bytes(),
        ));
    }

    parts.push((
        "xl/workbook.xml".into(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="{}"><sheets>{}</sheets></workbook>"#,
            REL_NS, sheet_entries
        )
        .into_bytes(),
    ));
    parts.push((
        "xl/_rels/workbook.xml.rels".into(),
        format!(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            workbook_rels
        )
        .into_bytes(),
    ));

    let borrowed: Vec<(&str, &[u8])> = parts
        .iter()
        .map(|(name, data)| (name.as_str(), data.as_slice()))
        .collect();
    build_zip(&borrowed)
}

/// Drawing with one shape per text body; each body is a list of runs
pub(crate) fn drawing_xml(bodies: &[&[&str]]) -> String {
    let mut anchors = String::new();
    for runs in bodies {
        let runs: String = runs
            .iter()
            .map(|text| format!("<a:r><a:rPr lang=\"en-US\"/><a:t>{}</a:t></a:r>", text))
            .collect();
        anchors.push_str(&format!(
            "<xdr:twoCellAnchor><xdr:sp><xdr:nvSpPr><xdr:cNvPr id=\"2\" name=\"TextBox 1\"/></xdr:nvSpPr><xdr:txBody><a:bodyPr/><a:p>{}</a:p></xdr:txBody></xdr:sp><xdr:clientData/></xdr:twoCellAnchor>",
            runs
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">{}</xdr:wsDr>"#,
        anchors
    )
}
