//! OpenDocument spreadsheet (`.ods`) reader.
//!
//! The whole of `content.xml` is parsed once at open time; every sheet is
//! kept as a raw grid until it is requested.

use quick_xml::events::Event;
use quick_xml::name::QName;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use super::xml::{attribute, parse_attribute, push_reference, push_text, zip_xml, XmlReader};
use super::{grid_to_table, sheet_not_found, DocumentFormat, DocumentReader};
use crate::error::{ReaderError, ReaderResult};
use crate::table::{CellValue, Table};

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";

const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
const COVERED_CELL: QName = QName(b"table:covered-table-cell");
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
const SPACE: QName = QName(b"text:s");
const TAB: QName = QName(b"text:tab");
const LINE_BREAK: QName = QName(b"text:line-break");

/// An opened ODS document.
#[derive(Debug)]
pub struct OdsDocument {
    sheets: Vec<(String, Vec<Vec<CellValue>>)>,
}

impl OdsDocument {
    /// Open and parse an ODS file.
    pub fn open(path: &Path) -> ReaderResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), &path.display().to_string())
    }

    /// Parse an ODS document from any seekable source.
    pub fn from_reader<RS: Read + Seek>(source: RS, label: &str) -> ReaderResult<Self> {
        let mut zip = ZipArchive::new(source)?;
        check_mime(&mut zip)?;
        if is_encrypted(&mut zip)? {
            return Err(ReaderError::Encrypted(label.to_string()));
        }

        let mut reader = zip_xml(&mut zip, "content.xml")?.ok_or_else(|| ReaderError::NotASpreadsheet {
            format: "ODS",
            reason: "content.xml is missing".to_string(),
        })?;
        let sheets = parse_content(&mut reader)?;
        Ok(Self { sheets })
    }
}

impl DocumentReader for OdsDocument {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Ods
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> ReaderResult<Table> {
        let grid = self
            .sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .map(|(_, grid)| grid.clone())
            .ok_or_else(|| sheet_not_found(name, &self.sheet_names()))?;
        grid_to_table(name, grid)
    }
}

fn check_mime<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> ReaderResult<()> {
    let Ok(mut file) = zip.by_name("mimetype") else {
        // The mimetype member is optional in practice
        return Ok(());
    };
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    if String::from_utf8_lossy(&buffer).trim().as_bytes() != MIME_TYPE {
        return Err(ReaderError::NotASpreadsheet {
            format: "ODS",
            reason: format!("mimetype is '{}'", String::from_utf8_lossy(&buffer)),
        });
    }
    Ok(())
}

fn is_encrypted<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> ReaderResult<bool> {
    let Some(mut reader) = zip_xml(zip, "META-INF/manifest.xml")? else {
        return Ok(false);
    };
    while let Some(event) = reader.next()? {
        if let Event::Start(e) = event {
            if e.name() == QName(b"manifest:encryption-data") {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Typed value of the cell currently being read.
#[derive(Debug)]
struct PendingCell {
    value_type: Option<String>,
    value: Option<String>,
    covered: bool,
    text: String,
    repeat: usize,
}

impl PendingCell {
    fn finish(self) -> CellValue {
        if self.covered {
            return CellValue::Null;
        }
        match (self.value_type.as_deref(), self.value) {
            (Some("float" | "percentage" | "currency"), Some(v)) => CellValue::from_number(&v),
            (Some("date"), Some(v)) => CellValue::from_iso_date(&v),
            (Some("boolean"), Some(v)) => CellValue::Bool(v == "true" || v == "1"),
            (Some("time"), Some(v)) => CellValue::from_iso_duration(&v),
            _ => CellValue::text(self.text),
        }
    }
}

/// Build grids for every `<table:table>` in `content.xml`.
///
/// Repeated rows and cells are expanded, except that runs of empty cells
/// or empty rows are only materialised when something follows them. This
/// keeps the customary `number-columns-repeated="1024"` filler out of
/// memory.
fn parse_content<R: std::io::BufRead>(
    reader: &mut XmlReader<R>,
) -> ReaderResult<Vec<(String, Vec<Vec<CellValue>>)>> {
    let mut sheets = Vec::new();

    let mut sheet_name: Option<String> = None;
    let mut grid: Vec<Vec<CellValue>> = Vec::new();
    let mut blank_rows = 0usize;

    let mut row: Vec<CellValue> = Vec::new();
    let mut row_repeat = 1usize;
    let mut blank_cells = 0usize;

    let mut cell: Option<PendingCell> = None;
    let mut in_paragraph = false;
    let mut annotation_depth = 0usize;

    while let Some(event) = reader.next()? {
        match event {
            Event::Start(e) if e.name() == TABLE => {
                sheet_name = Some(attribute(&e, "table:name")?.map(|n| n.into_owned()).unwrap_or_default());
                grid.clear();
                blank_rows = 0;
            }
            Event::End(e) if e.name() == TABLE => {
                if let Some(name) = sheet_name.take() {
                    sheets.push((name, std::mem::take(&mut grid)));
                }
            }
            Event::Start(e) if e.name() == TABLE_ROW => {
                row_repeat = parse_attribute(&e, "table:number-rows-repeated")?.unwrap_or(1);
                row.clear();
                blank_cells = 0;
            }
            Event::End(e) if e.name() == TABLE_ROW => {
                if row.is_empty() {
                    blank_rows += row_repeat;
                } else {
                    grid.extend(std::iter::repeat_with(Vec::new).take(blank_rows));
                    blank_rows = 0;
                    grid.extend(std::iter::repeat(row.clone()).take(row_repeat));
                }
            }
            Event::Start(e) if e.name() == TABLE_CELL || e.name() == COVERED_CELL => {
                let value_type = attribute(&e, "office:value-type")?.map(|v| v.into_owned());
                let value_attr = match value_type.as_deref() {
                    Some("date") => "office:date-value",
                    Some("time") => "office:time-value",
                    Some("boolean") => "office:boolean-value",
                    _ => "office:value",
                };
                cell = Some(PendingCell {
                    value: attribute(&e, value_attr)?.map(|v| v.into_owned()),
                    value_type,
                    covered: e.name() == COVERED_CELL,
                    text: String::new(),
                    repeat: parse_attribute(&e, "table:number-columns-repeated")?.unwrap_or(1),
                });
            }
            Event::End(e) if e.name() == TABLE_CELL || e.name() == COVERED_CELL => {
                if let Some(pending) = cell.take() {
                    let repeat = pending.repeat;
                    let value = pending.finish();
                    if value.is_null() {
                        blank_cells += repeat;
                    } else {
                        row.extend(std::iter::repeat(CellValue::Null).take(blank_cells));
                        blank_cells = 0;
                        row.extend(std::iter::repeat(value).take(repeat));
                    }
                }
                in_paragraph = false;
            }
            Event::Start(e) if e.name() == ANNOTATION => annotation_depth += 1,
            Event::End(e) if e.name() == ANNOTATION => annotation_depth = annotation_depth.saturating_sub(1),
            Event::Start(e) if annotation_depth == 0 && e.name() == PARAGRAPH => {
                if let Some(pending) = cell.as_mut() {
                    if !pending.text.is_empty() {
                        pending.text.push('\n');
                    }
                    in_paragraph = true;
                }
            }
            Event::End(e) if e.name() == PARAGRAPH => in_paragraph = false,
            Event::Start(e) if in_paragraph && annotation_depth == 0 && e.name() == SPACE => {
                let count: usize = parse_attribute(&e, "text:c")?.unwrap_or(1);
                if let Some(pending) = cell.as_mut() {
                    pending.text.extend(std::iter::repeat(' ').take(count));
                }
            }
            Event::Start(e) if in_paragraph && annotation_depth == 0 && e.name() == TAB => {
                if let Some(pending) = cell.as_mut() {
                    pending.text.push('\t');
                }
            }
            Event::Start(e) if in_paragraph && annotation_depth == 0 && e.name() == LINE_BREAK => {
                if let Some(pending) = cell.as_mut() {
                    pending.text.push('\n');
                }
            }
            Event::Text(t) if in_paragraph && annotation_depth == 0 => {
                if let Some(pending) = cell.as_mut() {
                    push_text(&mut pending.text, &t)?;
                }
            }
            Event::GeneralRef(r) if in_paragraph && annotation_depth == 0 => {
                if let Some(pending) = cell.as_mut() {
                    push_reference(&mut pending.text, &r)?;
                }
            }
            _ => (),
        }
    }

    Ok(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn ods_bytes(tables: &str) -> Vec<u8> {
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0"><office:body><office:spreadsheet>{}</office:spreadsheet></office:body></office:document-content>"#,
            tables
        );
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file("mimetype", options).unwrap();
        zip.write_all(MIME_TYPE).unwrap();
        zip.start_file("content.xml", options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn open(tables: &str) -> OdsDocument {
        OdsDocument::from_reader(Cursor::new(ods_bytes(tables)), "test.ods").unwrap()
    }

    #[test]
    fn test_sheet_names_in_order() {
        let doc = open(r#"<table:table table:name="Species"/><table:table table:name="Common names"/>"#);
        assert_eq!(doc.sheet_names(), vec!["Species", "Common names"]);
    }

    #[test]
    fn test_typed_cells() {
        let mut doc = open(
            r#"<table:table table:name="Sightings">
<table:table-row>
  <table:table-cell office:value-type="string"><text:p>Scientific name</text:p></table:table-cell>
  <table:table-cell office:value-type="string"><text:p>latitude</text:p></table:table-cell>
  <table:table-cell office:value-type="string"><text:p>count</text:p></table:table-cell>
  <table:table-cell office:value-type="string"><text:p>date</text:p></table:table-cell>
  <table:table-cell office:value-type="string"><text:p>confirmed</text:p></table:table-cell>
</table:table-row>
<table:table-row>
  <table:table-cell office:value-type="string"><text:p>Turdus<text:s/>merula</text:p></table:table-cell>
  <table:table-cell office:value-type="float" office:value="56.34"><text:p>56.34</text:p></table:table-cell>
  <table:table-cell office:value-type="float" office:value="3"><text:p>3</text:p></table:table-cell>
  <table:table-cell office:value-type="date" office:date-value="2021-05-01"><text:p>01/05/21</text:p></table:table-cell>
  <table:table-cell office:value-type="boolean" office:boolean-value="true"><text:p>TRUE</text:p></table:table-cell>
</table:table-row>
</table:table>"#,
        );
        let table = doc.read_sheet("Sightings").unwrap();
        assert_eq!(table.row_count(), 1);
        let row = &table.rows()[0];
        assert_eq!(row[0], CellValue::text("Turdus merula"));
        assert_eq!(row[1], CellValue::Float(56.34));
        assert_eq!(row[2], CellValue::Int(3));
        assert_eq!(row[3].render().unwrap(), "2021-05-01");
        assert_eq!(row[4], CellValue::Bool(true));
    }

    #[test]
    fn test_time_cells_render_as_clock_time() {
        let mut doc = open(
            r#"<table:table table:name="Sightings">
<table:table-row>
  <table:table-cell office:value-type="string"><text:p>seen at</text:p></table:table-cell>
</table:table-row>
<table:table-row>
  <table:table-cell office:value-type="time" office:time-value="PT07H15M00S"><text:p>07:15</text:p></table:table-cell>
</table:table-row>
</table:table>"#,
        );
        let table = doc.read_sheet("Sightings").unwrap();
        assert_eq!(table.rows()[0][0].render().unwrap(), "07:15:00");
        assert_eq!(table.schema().column(0).unwrap().kind, crate::table::ColumnType::Time);
    }

    #[test]
    fn test_repeats_and_trailing_filler() {
        let mut doc = open(
            r#"<table:table table:name="Families">
<table:table-row>
  <table:table-cell office:value-type="string"><text:p>family</text:p></table:table-cell>
  <table:table-cell table:number-columns-repeated="2"/>
  <table:table-cell office:value-type="string"><text:p>order</text:p></table:table-cell>
  <table:table-cell table:number-columns-repeated="1020"/>
</table:table-row>
<table:table-row table:number-rows-repeated="2">
  <table:table-cell office:value-type="string"><text:p>Corvidae</text:p></table:table-cell>
  <table:table-cell table:number-columns-repeated="1023"/>
</table:table-row>
<table:table-row table:number-rows-repeated="3"><table:table-cell table:number-columns-repeated="1024"/></table:table-row>
<table:table-row>
  <table:table-cell office:value-type="float" office:value="1" table:number-columns-repeated="2"/>
</table:table-row>
<table:table-row table:number-rows-repeated="1048570"><table:table-cell table:number-columns-repeated="1024"/></table:table-row>
</table:table>"#,
        );
        let table = doc.read_sheet("Families").unwrap();
        assert_eq!(table.schema().names(), vec!["family", "Unnamed: 1", "Unnamed: 2", "order"]);
        // 2 repeated rows, 3 interior blank rows, 1 final row
        assert_eq!(table.row_count(), 6);
        assert_eq!(table.rows()[1][0], CellValue::text("Corvidae"));
        assert!(table.rows()[2].iter().all(CellValue::is_null));
        assert_eq!(table.rows()[5][..2], [CellValue::Int(1), CellValue::Int(1)]);
    }

    #[test]
    fn test_paragraphs_and_annotations() {
        let mut doc = open(
            r#"<table:table table:name="Notes">
<table:table-row><table:table-cell office:value-type="string"><text:p>note</text:p></table:table-cell></table:table-row>
<table:table-row><table:table-cell office:value-type="string"><office:annotation><text:p>ignore me</text:p></office:annotation><text:p>seen &amp; noted</text:p><text:p>twice</text:p></table:table-cell></table:table-row>
</table:table>"#,
        );
        let table = doc.read_sheet("Notes").unwrap();
        assert_eq!(table.rows()[0][0], CellValue::text("seen & noted\ntwice"));
    }

    #[test]
    fn test_missing_sheet() {
        let mut doc = open(r#"<table:table table:name="Species"/>"#);
        match doc.read_sheet("Users") {
            Err(ReaderError::SheetNotFound { name, available }) => {
                assert_eq!(name, "Users");
                assert_eq!(available, "Species");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_mimetype_rejected() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("mimetype", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"application/vnd.oasis.opendocument.text").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let result = OdsDocument::from_reader(Cursor::new(bytes), "letter.odt");
        assert!(matches!(result, Err(ReaderError::NotASpreadsheet { .. })));
    }
}
