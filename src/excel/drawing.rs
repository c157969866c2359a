//! DrawingML text bodies: shapes, text boxes, grouped shapes and chart titles
//!
//! Text is read from every `<a:t>` that sits inside a shape `txBody` or a
//! chart `c:rich` body. Anchors, picture names and cached series values are
//! ignored. Drawing text is never written back.

use super::reader::read_text;
use super::{Sheet, WorkbookModel};
use crate::error::GlossaResult;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

/// Bumped whenever the set of elements read from drawing parts changes
pub const DRAWINGML_PARSER_VERSION: u32 = 1;

/// Raw text runs of every drawing attached to `sheet`, in document order
pub fn list_drawing_text_runs(model: &WorkbookModel, sheet: &Sheet) -> GlossaResult<Vec<String>> {
    let mut runs = Vec::new();
    for part in &sheet.drawing_parts {
        let Some(xml) = model.package.part(part) else {
            warn!(sheet = %sheet.name, part = %part, "drawing part referenced but missing");
            continue;
        };
        let found = text_runs(xml)?;
        debug!(sheet = %sheet.name, part = %part, runs = found.len(), "read drawing text");
        runs.extend(found);
    }
    Ok(runs)
}

fn text_runs(xml: &[u8]) -> GlossaResult<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut runs = Vec::new();
    let mut text_bodies = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"txBody" | b"rich" => text_bodies += 1,
                b"t" if text_bodies > 0 => runs.push(read_text(&mut reader, b"t")?),
                _ => {}
            },
            Event::End(e) => {
                if matches!(e.local_name().as_ref(), b"txBody" | b"rich") {
                    text_bodies = text_bodies.saturating_sub(1);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::fixtures::{drawing_xml, workbook, FixtureSheet};

    #[test]
    fn test_shape_runs_in_order() {
        let xml = drawing_xml(&[&["Hello ", "World"], &["Second box"]]);
        assert_eq!(
            text_runs(xml.as_bytes()).unwrap(),
            vec!["Hello ", "World", "Second box"]
        );
    }

    #[test]
    fn test_grouped_shapes_and_fields() {
        let xml = br#"<xdr:wsDr xmlns:xdr="x" xmlns:a="a"><xdr:twoCellAnchor><xdr:grpSp>
  <xdr:sp><xdr:txBody><a:p><a:r><a:t>Inner</a:t></a:r><a:fld id="1" type="slidenum"><a:t>Field</a:t></a:fld></a:p></xdr:txBody></xdr:sp>
  <xdr:pic><xdr:nvPicPr><xdr:cNvPr id="3" name="Picture"/></xdr:nvPicPr></xdr:pic>
</xdr:grpSp></xdr:twoCellAnchor></xdr:wsDr>"#;
        assert_eq!(text_runs(xml).unwrap(), vec!["Inner", "Field"]);
    }

    #[test]
    fn test_chart_title_rich_text_only() {
        let xml = br#"<c:chartSpace xmlns:c="c" xmlns:a="a"><c:chart>
  <c:title><c:tx><c:rich><a:bodyPr/><a:p><a:r><a:t>Sales by Region</a:t></a:r></a:p></c:rich></c:tx></c:title>
  <c:plotArea><c:barChart><c:ser><c:tx><c:strRef><c:f>Sheet1!$B$1</c:f><c:strCache><c:pt idx="0"><c:v>Revenue</c:v></c:pt></c:strCache></c:strRef></c:tx></c:ser></c:barChart></c:plotArea>
</c:chart></c:chartSpace>"#;
        assert_eq!(text_runs(xml).unwrap(), vec!["Sales by Region"]);
    }

    #[test]
    fn test_list_runs_follows_sheet_drawing_and_chart_relationships() {
        let drawing = drawing_xml(&[&["Box text"]]);
        let chart = r#"<c:chartSpace xmlns:c="c" xmlns:a="a"><c:title><c:tx><c:rich><a:p><a:r><a:t>Chart title</a:t></a:r></a:p></c:rich></c:tx></c:title></c:chartSpace>"#;
        let mut sheet = FixtureSheet::new("Data", "");
        sheet.drawing = Some(&drawing);
        sheet.chart = Some(chart);
        let bytes = workbook(&[sheet, FixtureSheet::new("Plain", "")], None);

        let model = WorkbookModel::load(&bytes).unwrap();
        assert_eq!(
            list_drawing_text_runs(&model, &model.sheets[0]).unwrap(),
            vec!["Box text", "Chart title"]
        );
        assert!(list_drawing_text_runs(&model, &model.sheets[1])
            .unwrap()
            .is_empty());
    }
}
