//! `.xlsx` workbooks.
//!
//! Sheet names and defined names are read from `xl/workbook.xml`. Saving
//! rewrites only the `<definedNames>` block of that part and copies every
//! other part of the package unchanged, so cell data, styles and charts are
//! preserved byte for byte.

use super::{DefinedName, Workbook, WorkbookSource};
use crate::core::addressing::CellRef;
use crate::error::{E2vError, E2vResult};
use calamine::{Reader, Xlsx};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader as XmlReader, Writer as XmlWriter};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const WORKBOOK_PART: &str = "xl/workbook.xml";

/// Top-level `<workbook>` children that come after `<definedNames>` (ECMA-376 order).
const AFTER_DEFINED_NAMES: &[&[u8]] = &[
    b"calcPr",
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

#[derive(Debug)]
pub struct XlsxWorkbook {
    path: PathBuf,
    package: Vec<u8>,
    sheets: Vec<String>,
    names: Vec<DefinedName>,
    dirty: bool,
}

impl XlsxWorkbook {
    /// Read the package at `path` into memory.
    pub fn open(path: &Path) -> E2vResult<Self> {
        let package = fs::read(path).map_err(|e| {
            E2vError::Workbook(format!("Failed to open Excel file {}: {}", path.display(), e))
        })?;
        let workbook_xml = read_part(&package, WORKBOOK_PART).map_err(|e| {
            E2vError::Workbook(format!("{} is not an .xlsx workbook: {}", path.display(), e))
        })?;
        let (sheets, names) = parse_workbook_xml(&workbook_xml)?;

        Ok(Self {
            path: path.to_path_buf(),
            package,
            sheets,
            names,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Formatted cell values of `sheet` between two corners, row by row.
    ///
    /// Empty cells are returned as empty strings.
    pub fn range_values(&self, sheet: &str, from: CellRef, to: CellRef) -> E2vResult<Vec<Vec<String>>> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(self.package.as_slice()))
            .map_err(|e| E2vError::Workbook(format!("Failed to read Excel file: {}", e)))?;
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| E2vError::Workbook(format!("Failed to read sheet '{}': {}", sheet, e)))?;

        Ok((from.row..=to.row)
            .map(|row| {
                (from.col..=to.col)
                    .map(|col| {
                        range
                            .get_value((row, col))
                            .map(|value| value.to_string())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect())
    }
}

impl Workbook for XlsxWorkbook {
    fn sheet_names(&self) -> &[String] {
        &self.sheets
    }

    fn defined_names(&self) -> &[DefinedName] {
        &self.names
    }

    fn defined_names_mut(&mut self) -> &mut Vec<DefinedName> {
        self.dirty = true;
        &mut self.names
    }

    fn save(&mut self) -> E2vResult<()> {
        if !self.dirty {
            return Ok(());
        }

        let original = read_part(&self.package, WORKBOOK_PART)?;
        let patched = patch_workbook_xml(&original, &self.names)?;
        let package = replace_part(&self.package, WORKBOOK_PART, &patched)?;

        fs::write(&self.path, &package)?;
        self.package = package;
        self.dirty = false;
        Ok(())
    }
}

/// Opens `.xlsx` files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxSource;

impl WorkbookSource for XlsxSource {
    fn open(&self, path: &Path) -> E2vResult<Box<dyn Workbook>> {
        Ok(Box::new(XlsxWorkbook::open(path)?))
    }
}

fn read_part(package: &[u8], part: &str) -> E2vResult<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(package))?;
    let mut file = archive.by_name(part)?;
    let mut out = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
    file.read_to_end(&mut out)?;
    Ok(out)
}

/// Copy the package, swapping the content of one part.
fn replace_part(package: &[u8], part: &str, content: &[u8]) -> E2vResult<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(package))?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::with_capacity(package.len())));

    for idx in 0..archive.len() {
        let file = archive.by_index_raw(idx)?;
        if file.name() == part {
            drop(file);
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            zip.start_file(part, options)?;
            zip.write_all(content)?;
        } else {
            zip.raw_copy_file(file)?;
        }
    }

    Ok(zip.finish()?.into_inner())
}

fn defined_name_from(start: &BytesStart<'_>) -> E2vResult<DefinedName> {
    let mut name = String::new();
    let mut local_sheet_id = None;
    let mut extra_attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"name" => name = value,
            b"localSheetId" => local_sheet_id = value.parse().ok(),
            key => extra_attributes.push((String::from_utf8_lossy(key).into_owned(), value)),
        }
    }

    Ok(DefinedName {
        name,
        local_sheet_id,
        refers_to: String::new(),
        extra_attributes,
    })
}

/// Sheet names (in `localSheetId` order) and defined names of `xl/workbook.xml`.
fn parse_workbook_xml(xml: &[u8]) -> E2vResult<(Vec<String>, Vec<DefinedName>)> {
    let mut reader = XmlReader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut sheets = Vec::new();
    let mut names = Vec::new();
    let mut current: Option<DefinedName> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    if attr.key.as_ref() == b"name" {
                        sheets.push(attr.unescape_value()?.into_owned());
                    }
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"definedName" => {
                current = Some(defined_name_from(&e)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"definedName" => {
                names.push(defined_name_from(&e)?);
            }
            Event::Text(text) => {
                if let Some(defined) = current.as_mut() {
                    defined.refers_to.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(defined) = current.as_mut() {
                    defined.refers_to.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"definedName" => {
                names.extend(current.take());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((sheets, names))
}

fn write_defined_names<W: Write>(
    writer: &mut XmlWriter<W>,
    prefix: &str,
    names: &[DefinedName],
) -> E2vResult<()> {
    if names.is_empty() {
        return Ok(());
    }

    let block = format!("{}definedNames", prefix);
    let element = format!("{}definedName", prefix);

    writer.write_event(Event::Start(BytesStart::new(block.as_str())))?;
    for defined in names {
        let mut start = BytesStart::new(element.as_str());
        start.push_attribute(("name", defined.name.as_str()));
        for (key, value) in &defined.extra_attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if let Some(id) = defined.local_sheet_id {
            start.push_attribute(("localSheetId", id.to_string().as_str()));
        }
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(&defined.refers_to)))?;
        writer.write_event(Event::End(BytesEnd::new(element.as_str())))?;
    }
    writer.write_event(Event::End(BytesEnd::new(block.as_str())))?;
    Ok(())
}

/// Replace (or insert) the `<definedNames>` block of `xl/workbook.xml`.
fn patch_workbook_xml(xml: &[u8], names: &[DefinedName]) -> E2vResult<Vec<u8>> {
    let mut reader = XmlReader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = XmlWriter::new(Vec::with_capacity(xml.len() + names.len() * 96));

    let mut prefix = String::new();
    let mut depth = 0usize;
    let mut written = false;
    let mut skipping = false;

    loop {
        let event = reader.read_event()?;

        if skipping {
            if let Event::End(e) = &event {
                if e.local_name().as_ref() == b"definedNames" {
                    skipping = false;
                }
            }
            continue;
        }

        match event {
            Event::Start(e) if depth == 0 => {
                let qualified = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if let Some((p, _)) = qualified.split_once(':') {
                    prefix = format!("{}:", p);
                }
                depth += 1;
                writer.write_event(Event::Start(e))?;
            }
            Event::Start(e) if depth == 1 && e.local_name().as_ref() == b"definedNames" => {
                if !written {
                    write_defined_names(&mut writer, &prefix, names)?;
                    written = true;
                }
                skipping = true;
            }
            Event::Empty(e) if depth == 1 && e.local_name().as_ref() == b"definedNames" => {
                if !written {
                    write_defined_names(&mut writer, &prefix, names)?;
                    written = true;
                }
            }
            Event::Start(e)
                if depth == 1 && !written && AFTER_DEFINED_NAMES.contains(&e.local_name().as_ref()) =>
            {
                write_defined_names(&mut writer, &prefix, names)?;
                written = true;
                depth += 1;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e)
                if depth == 1 && !written && AFTER_DEFINED_NAMES.contains(&e.local_name().as_ref()) =>
            {
                write_defined_names(&mut writer, &prefix, names)?;
                written = true;
                writer.write_event(Event::Empty(e))?;
            }
            Event::End(e) if depth == 1 => {
                if !written {
                    write_defined_names(&mut writer, &prefix, names)?;
                    written = true;
                }
                depth -= 1;
                writer.write_event(Event::End(e))?;
            }
            Event::Start(e) => {
                depth += 1;
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
    }

    Ok(writer.into_inner())
}
