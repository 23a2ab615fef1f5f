//! Office Open XML workbook (`.xlsx`) reader.
//!
//! Workbook structure, shared strings and cell styles are loaded at open
//! time; worksheet parts are parsed when a sheet is requested.

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use super::xml::{attribute, local_attribute, parse_attribute, push_reference, push_text, zip_xml, XmlReader};
use super::{grid_to_table, sheet_not_found, DocumentFormat, DocumentReader};
use crate::error::{ReaderError, ReaderResult};
use crate::table::{CellValue, Table};

/// `A1`-style cell reference, with optional `$` anchors
static CELL_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").expect("valid cell reference pattern"));

/// Quoted literals, bracketed sections and escaped characters in a number format
static FORMAT_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|\[[^\]]*\]|\\.|_.|\*."#).expect("valid format pattern"));

/// An opened XLSX workbook.
pub struct XlsxDocument<RS: Read + Seek = BufReader<File>> {
    zip: ZipArchive<RS>,
    /// (sheet name, worksheet part path)
    sheets: Vec<(String, String)>,
    shared_strings: Vec<String>,
    /// Per cell style index: whether the number format is a date format
    date_styles: Vec<bool>,
    is_1904: bool,
}

impl XlsxDocument {
    /// Open an XLSX file.
    pub fn open(path: &Path) -> ReaderResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<RS: Read + Seek> XlsxDocument<RS> {
    /// Open a workbook from any seekable source.
    pub fn from_reader(source: RS) -> ReaderResult<Self> {
        let mut zip = ZipArchive::new(source)?;
        let relationships = load_relationships(&mut zip)?;
        let (sheets, is_1904) = load_workbook(&mut zip, &relationships)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        let date_styles = load_date_styles(&mut zip)?;
        Ok(Self {
            zip,
            sheets,
            shared_strings,
            date_styles,
            is_1904,
        })
    }

    fn is_date_style(&self, style: Option<usize>) -> bool {
        style
            .and_then(|index| self.date_styles.get(index))
            .copied()
            .unwrap_or(false)
    }
}

impl<RS: Read + Seek> DocumentReader for XlsxDocument<RS> {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Xlsx
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> ReaderResult<Table> {
        let part = self
            .sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .map(|(_, part)| part.clone())
            .ok_or_else(|| sheet_not_found(name, &self.sheet_names()))?;

        let cells = {
            let mut reader = zip_xml(&mut self.zip, &part)?.ok_or_else(|| ReaderError::NotASpreadsheet {
                format: "XLSX",
                reason: format!("worksheet part '{}' is missing", part),
            })?;
            read_cells(&mut reader)?
        };

        let mut grid: Vec<Vec<CellValue>> = Vec::new();
        for raw in cells {
            let value = self.resolve(&raw);
            if value.is_null() {
                continue;
            }
            if grid.len() <= raw.row {
                grid.resize_with(raw.row + 1, Vec::new);
            }
            let line = &mut grid[raw.row];
            if line.len() <= raw.col {
                line.resize(raw.col + 1, CellValue::Null);
            }
            line[raw.col] = value;
        }
        grid_to_table(name, grid)
    }
}

/// A cell as found in the worksheet part, before type resolution.
#[derive(Debug)]
struct RawCell {
    row: usize,
    col: usize,
    kind: Option<String>,
    style: Option<usize>,
    text: String,
}

impl<RS: Read + Seek> XlsxDocument<RS> {
    fn resolve(&self, raw: &RawCell) -> CellValue {
        match raw.kind.as_deref() {
            Some("s") => raw
                .text
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| self.shared_strings.get(index))
                .map(|s| CellValue::text(s.clone()))
                .unwrap_or(CellValue::Null),
            Some("inlineStr" | "str") => CellValue::text(raw.text.clone()),
            Some("b") => CellValue::Bool(raw.text.trim() == "1"),
            Some("d") => CellValue::from_iso_date(&raw.text),
            // Error codes such as #N/A stay visible
            Some("e") => CellValue::text(raw.text.clone()),
            _ if raw.text.trim().is_empty() => CellValue::Null,
            _ if self.is_date_style(raw.style) => match raw.text.trim().parse::<f64>() {
                Ok(serial) => serial_to_cell(serial, self.is_1904),
                Err(_) => CellValue::text(raw.text.clone()),
            },
            _ => CellValue::from_number(&raw.text),
        }
    }
}

/// Largest serial a workbook can hold (9999-12-31).
const MAX_DATE_SERIAL: f64 = 2_958_466.0;

/// Convert a spreadsheet date serial number.
///
/// Serials outside the representable date range stay numbers.
fn serial_to_cell(serial: f64, is_1904: bool) -> CellValue {
    if !(0.0..MAX_DATE_SERIAL).contains(&serial) {
        return CellValue::from_number(&serial.to_string());
    }
    let (epoch, serial) = if is_1904 {
        (NaiveDate::from_ymd_opt(1904, 1, 1), serial)
    } else if serial < 60.0 {
        // Serials before the phantom 1900-02-29 are off by one
        (NaiveDate::from_ymd_opt(1899, 12, 31), serial)
    } else {
        (NaiveDate::from_ymd_opt(1899, 12, 30), serial)
    };
    let Some(epoch) = epoch.and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return CellValue::Float(serial);
    };

    let seconds = (serial * 86_400.0).round() as i64;
    let Some(moment) = Duration::try_seconds(seconds).and_then(|delta| epoch.checked_add_signed(delta)) else {
        return CellValue::Float(serial);
    };
    if serial.fract() == 0.0 {
        CellValue::Date(moment.date())
    } else if serial < 1.0 {
        CellValue::Time(moment.time())
    } else {
        CellValue::DateTime(moment)
    }
}

/// Zero-based (row, column) of an `A1` reference.
fn parse_reference(reference: &str) -> Option<(usize, usize)> {
    let caps = CELL_REFERENCE.captures(reference.trim())?;
    let col = caps[1]
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize);
    let row: usize = caps[2].parse().ok()?;
    if row == 0 || col == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

/// Whether a number format code displays a date or time.
fn is_date_format(code: &str) -> bool {
    let stripped = FORMAT_NOISE.replace_all(code, "");
    stripped
        .chars()
        .any(|c| matches!(c.to_ascii_lowercase(), 'd' | 'm' | 'y' | 'h' | 's'))
}

/// Built-in number format ids that display dates or times.
fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

fn read_cells<R: BufRead>(reader: &mut XmlReader<R>) -> ReaderResult<Vec<RawCell>> {
    let mut cells = Vec::new();
    let mut next_row = 0usize;
    let mut current_row = 0usize;
    let mut next_col = 0usize;

    let mut cell: Option<RawCell> = None;
    let mut in_value = false;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    while let Some(event) = reader.next()? {
        match event {
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                current_row = parse_attribute::<usize>(&e, "r")?
                    .filter(|r| *r > 0)
                    .map(|r| r - 1)
                    .unwrap_or(next_row);
                next_col = 0;
            }
            Event::End(e) if e.local_name().as_ref() == b"row" => next_row = current_row + 1,
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let (row, col) = attribute(&e, "r")?
                    .and_then(|r| parse_reference(&r))
                    .unwrap_or((current_row, next_col));
                cell = Some(RawCell {
                    row,
                    col,
                    kind: attribute(&e, "t")?.map(|t| t.into_owned()),
                    style: parse_attribute(&e, "s")?,
                    text: String::new(),
                });
            }
            Event::End(e) if e.local_name().as_ref() == b"c" => {
                if let Some(done) = cell.take() {
                    next_col = done.col + 1;
                    cells.push(done);
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"v" => in_value = true,
            Event::End(e) if e.local_name().as_ref() == b"v" => in_value = false,
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => phonetic_depth += 1,
            Event::End(e) if e.local_name().as_ref() == b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = phonetic_depth == 0,
            Event::End(e) if e.local_name().as_ref() == b"t" => in_text = false,
            Event::Text(t) if in_value || in_text => {
                if let Some(open) = cell.as_mut() {
                    push_text(&mut open.text, &t)?;
                }
            }
            Event::GeneralRef(r) if in_value || in_text => {
                if let Some(open) = cell.as_mut() {
                    push_reference(&mut open.text, &r)?;
                }
            }
            _ => (),
        }
    }

    Ok(cells)
}

/// Relationship id -> zip path of each worksheet.
fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> ReaderResult<HashMap<String, String>> {
    let mut reader = zip_xml(zip, "xl/_rels/workbook.xml.rels")?.ok_or_else(|| ReaderError::NotASpreadsheet {
        format: "XLSX",
        reason: "xl/_rels/workbook.xml.rels is missing".to_string(),
    })?;
    let mut relationships = HashMap::new();
    while let Some(event) = reader.next()? {
        if let Event::Start(e) = event {
            if e.local_name().as_ref() != b"Relationship" {
                continue;
            }
            let is_worksheet = attribute(&e, "Type")?.map(|t| t.ends_with("/worksheet")).unwrap_or(true);
            let id = attribute(&e, "Id")?.map(|v| v.into_owned());
            let target = attribute(&e, "Target")?.map(|v| v.into_owned());
            if let (true, Some(id), Some(target)) = (is_worksheet, id, target) {
                relationships.insert(id, to_zip_path(&target));
            }
        }
    }
    Ok(relationships)
}

fn to_zip_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn load_workbook<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    relationships: &HashMap<String, String>,
) -> ReaderResult<(Vec<(String, String)>, bool)> {
    let mut reader = zip_xml(zip, "xl/workbook.xml")?.ok_or_else(|| ReaderError::NotASpreadsheet {
        format: "XLSX",
        reason: "xl/workbook.xml is missing".to_string(),
    })?;
    let mut sheets = Vec::new();
    let mut is_1904 = false;
    while let Some(event) = reader.next()? {
        let Event::Start(e) = event else { continue };
        match e.local_name().as_ref() {
            b"sheet" => {
                let name = attribute(&e, "name")?.map(|v| v.into_owned());
                let id = local_attribute(&e, b"id")?;
                if let Some((name, path)) = name.zip(id.and_then(|id| relationships.get(&id).cloned())) {
                    sheets.push((name, path));
                }
            }
            b"workbookPr" => {
                is_1904 = attribute(&e, "date1904")?
                    .map(|v| v == "1" || v == "true")
                    .unwrap_or(false);
            }
            _ => (),
        }
    }
    Ok((sheets, is_1904))
}

fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> ReaderResult<Vec<String>> {
    let Some(mut reader) = zip_xml(zip, "xl/sharedStrings.xml")? else {
        return Ok(Vec::new());
    };
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    while let Some(event) = reader.next()? {
        match event {
            Event::Start(e) if e.local_name().as_ref() == b"si" => current = Some(String::new()),
            Event::End(e) if e.local_name().as_ref() == b"si" => {
                strings.push(current.take().unwrap_or_default());
            }
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => phonetic_depth += 1,
            Event::End(e) if e.local_name().as_ref() == b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = phonetic_depth == 0,
            Event::End(e) if e.local_name().as_ref() == b"t" => in_text = false,
            Event::Text(t) if in_text => {
                if let Some(s) = current.as_mut() {
                    push_text(s, &t)?;
                }
            }
            Event::GeneralRef(r) if in_text => {
                if let Some(s) = current.as_mut() {
                    push_reference(s, &r)?;
                }
            }
            _ => (),
        }
    }
    Ok(strings)
}

/// For each entry of `cellXfs`, whether its number format shows a date.
fn load_date_styles<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> ReaderResult<Vec<bool>> {
    let Some(mut reader) = zip_xml(zip, "xl/styles.xml")? else {
        return Ok(Vec::new());
    };
    let mut custom: HashMap<u32, bool> = HashMap::new();
    let mut format_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    while let Some(event) = reader.next()? {
        match event {
            Event::Start(e) if e.local_name().as_ref() == b"numFmt" => {
                let id = parse_attribute::<u32>(&e, "numFmtId")?;
                let code = attribute(&e, "formatCode")?;
                if let (Some(id), Some(code)) = (id, code) {
                    custom.insert(id, is_date_format(&code));
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Start(e) if in_cell_xfs && e.local_name().as_ref() == b"xf" => {
                format_ids.push(parse_attribute(&e, "numFmtId")?.unwrap_or(0));
            }
            _ => (),
        }
    }

    Ok(format_ids
        .into_iter()
        .map(|id| custom.get(&id).copied().unwrap_or_else(|| is_builtin_date_format(id)))
        .collect())
}
