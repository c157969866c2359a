//! OOXML package access: zip parts and relationships
//!
//! Parts are kept in archive order and written back byte-for-byte unless a
//! caller replaces them, so styles, media, charts and VBA survive a rewrite.

use crate::error::{GlossaError, GlossaResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Maximum uncompressed size of a single part inflated into memory (zip bomb guard)
pub(crate) const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

/// Compound File Binary signature used by legacy `.xls` and encrypted workbooks
const OLE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

pub(crate) const REL_OFFICE_DOCUMENT: &str = "/officeDocument";
pub(crate) const REL_WORKSHEET: &str = "/worksheet";
pub(crate) const REL_SHARED_STRINGS: &str = "/sharedStrings";
pub(crate) const REL_STYLES: &str = "/styles";
pub(crate) const REL_DRAWING: &str = "/drawing";
pub(crate) const REL_CHART: &str = "/chart";

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

/// In-memory copy of every part of a workbook package
#[derive(Debug, Clone)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> GlossaResult<Self> {
        if bytes.starts_with(&OLE_SIGNATURE) {
            return Err(GlossaError::Format(
                "legacy binary (.xls) or encrypted workbooks are not supported; save as .xlsx"
                    .to_string(),
            ));
        }

        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| GlossaError::Format(format!("not a valid workbook package: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            if file.size() > MAX_PART_BYTES {
                return Err(GlossaError::Format(format!(
                    "part '{}' exceeds {} bytes",
                    name, MAX_PART_BYTES
                )));
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.take(MAX_PART_BYTES + 1).read_to_end(&mut data)?;
            if data.len() as u64 > MAX_PART_BYTES {
                return Err(GlossaError::Format(format!(
                    "part '{}' exceeds {} bytes",
                    name, MAX_PART_BYTES
                )));
            }
            parts.push(Part { name, data });
        }

        Ok(Self { parts })
    }

    /// Part bytes by name; leading `/` and ASCII case are ignored
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        let wanted = normalize_part_name(name);
        self.parts
            .iter()
            .find(|part| part.name == wanted)
            .or_else(|| {
                self.parts
                    .iter()
                    .find(|part| normalize_part_name(&part.name).eq_ignore_ascii_case(wanted))
            })
            .map(|part| part.data.as_slice())
    }

    /// Replace a part in place, or append it when absent
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        let wanted = normalize_part_name(name);
        match self
            .parts
            .iter_mut()
            .find(|part| normalize_part_name(&part.name).eq_ignore_ascii_case(wanted))
        {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: wanted.to_string(),
                data,
            }),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|part| part.name.as_str())
    }

    pub fn to_bytes(&self) -> GlossaResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
        for part in &self.parts {
            writer.start_file(part.name.as_str(), options)?;
            writer.write_all(&part.data)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Relationships declared by `part_name` (empty when it has no `.rels` part)
    pub fn relationships(&self, part_name: &str) -> GlossaResult<Vec<Relationship>> {
        match self.part(&rels_part_name(part_name)) {
            Some(xml) => parse_relationships(xml),
            None => Ok(Vec::new()),
        }
    }

    /// Resolved internal targets of `part_name`'s relationships whose type ends with `rel_type`
    pub fn related_parts(&self, part_name: &str, rel_type: &str) -> GlossaResult<Vec<String>> {
        Ok(self
            .relationships(part_name)?
            .into_iter()
            .filter(|rel| !rel.external && rel.rel_type.ends_with(rel_type))
            .map(|rel| resolve_target(part_name, &rel.target))
            .collect())
    }
}

fn normalize_part_name(name: &str) -> &str {
    name.trim_start_matches('/')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// `xl/worksheets/sheet1.xml` → `xl/worksheets/_rels/sheet1.xml.rels`
pub fn rels_part_name(part_name: &str) -> String {
    let part_name = normalize_part_name(part_name);
    match part_name.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part_name),
    }
}

/// Resolve a relationship target against the folder of its source part
pub fn resolve_target(base_part: &str, target: &str) -> String {
    let target = target.split_once('#').map(|(base, _)| base).unwrap_or(target);
    let (target, is_absolute) = match target.strip_prefix('/') {
        Some(target) => (target, true),
        None => (target, false),
    };
    let base_dir = if is_absolute {
        ""
    } else {
        normalize_part_name(base_part)
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    };

    let mut components: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            _ => components.push(segment),
        }
    }

    components.join("/")
}

pub fn parse_relationships(xml: &[u8]) -> GlossaResult<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) | Event::Empty(start)
                if start.local_name().as_ref() == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                    external: false,
                };
                for attr in start.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        b"TargetMode" => rel.external = value.trim().eq_ignore_ascii_case("External"),
                        _ => {}
                    }
                }
                relationships.push(rel);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

#[cfg(test)]
pub(crate) fn build_zip(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in parts {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
