//! Spreadsheet document readers.
//!
//! A document is opened through [`open_document`], which picks a
//! [`DocumentReader`] implementation from an explicit [`DocumentFormat`]
//! (or from the file extension when none is configured). Each sheet loads
//! into a [`Table`] whose first row supplies the column names.

pub mod ods;
pub mod xlsx;
pub(crate) mod xml;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, ReaderError, ReaderResult};
use crate::table::{CellValue, Schema, Table};

pub use ods::OdsDocument;
pub use xlsx::XlsxDocument;

/// Supported document container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// OpenDocument spreadsheet (`.ods`)
    Ods,
    /// Office Open XML workbook (`.xlsx`)
    Xlsx,
}

impl DocumentFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ods" => Some(DocumentFormat::Ods),
            "xlsx" | "xlsm" => Some(DocumentFormat::Xlsx),
            _ => None,
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ods" | "odf" => Ok(DocumentFormat::Ods),
            "xlsx" | "openpyxl" => Ok(DocumentFormat::Xlsx),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Ods => f.write_str("ods"),
            DocumentFormat::Xlsx => f.write_str("xlsx"),
        }
    }
}

/// A multi-sheet document that can load sheets as tables.
pub trait DocumentReader {
    /// Container format of this document.
    fn format(&self) -> DocumentFormat;

    /// Sheet names in document order.
    fn sheet_names(&self) -> Vec<String>;

    /// Load one sheet. The first row is the header.
    fn read_sheet(&mut self, name: &str) -> ReaderResult<Table>;
}

/// Open a document with the reader for `format`, or the one matching the
/// file extension when `format` is `None`.
pub fn open_document(path: &Path, format: Option<DocumentFormat>) -> ReaderResult<Box<dyn DocumentReader>> {
    let format = match format {
        Some(f) => f,
        None => DocumentFormat::from_path(path)
            .ok_or_else(|| ReaderError::UnknownFormat(path.display().to_string()))?,
    };

    let reader: Box<dyn DocumentReader> = match format {
        DocumentFormat::Ods => Box::new(OdsDocument::open(path)?),
        DocumentFormat::Xlsx => Box::new(XlsxDocument::open(path)?),
    };
    Ok(reader)
}

/// Error for a sheet name that is not in `available`.
pub(crate) fn sheet_not_found(name: &str, available: &[String]) -> ReaderError {
    ReaderError::SheetNotFound {
        name: name.to_string(),
        available: available.join(", "),
    }
}

/// Turn a raw grid into a table: row 0 names the columns, the remaining
/// rows are data, padded with nulls to the widest row. Data cells holding
/// a missing-value marker such as `NA` or `NULL` load as null.
pub(crate) fn grid_to_table(sheet: &str, mut grid: Vec<Vec<CellValue>>) -> ReaderResult<Table> {
    while grid.last().is_some_and(|row| row.iter().all(CellValue::is_null)) {
        grid.pop();
    }
    if grid.is_empty() {
        return Ok(Table::new(sheet, Schema::default()));
    }

    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    let mut rows = grid.into_iter();
    let header = rows.next().unwrap_or_default();
    let schema = Schema::from_header(&header, width);

    let data = rows
        .map(|row| {
            let mut row: Vec<CellValue> = row.into_iter().map(CellValue::null_if_na).collect();
            row.resize(width, CellValue::Null);
            row
        })
        .collect();

    Table::from_rows(sheet, schema, data)
        .map(Table::with_inferred_types)
        .map_err(|source| ReaderError::Table {
            sheet: sheet.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("all_data.ods")), Some(DocumentFormat::Ods));
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("Data.XLSX")), Some(DocumentFormat::Xlsx));
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("data.csv")), None);
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("noext")), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("ODS".parse::<DocumentFormat>().unwrap(), DocumentFormat::Ods);
        assert_eq!("odf".parse::<DocumentFormat>().unwrap(), DocumentFormat::Ods);
        assert_eq!("xlsx".parse::<DocumentFormat>().unwrap(), DocumentFormat::Xlsx);
        assert!(matches!("xls".parse::<DocumentFormat>(), Err(ConfigError::UnknownFormat(_))));
    }

    #[test]
    fn test_unknown_extension_needs_explicit_format() {
        let result = open_document(Path::new("sheet.numbers"), None);
        assert!(matches!(result, Err(ReaderError::UnknownFormat(_))));
    }

    #[test]
    fn test_grid_to_table_pads_rows() {
        let grid = vec![
            vec![CellValue::text("email"), CellValue::text("name")],
            vec![CellValue::text("a@b.c")],
            vec![CellValue::text("d@e.f"), CellValue::text("Dee"), CellValue::Int(3)],
            vec![],
        ];
        let table = grid_to_table("Users", grid).unwrap();
        assert_eq!(table.schema().names(), vec!["email", "name", "Unnamed: 2"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0], vec![CellValue::text("a@b.c"), CellValue::Null, CellValue::Null]);
    }

    #[test]
    fn test_grid_to_table_missing_value_markers() {
        let grid = vec![
            vec![CellValue::text("NA"), CellValue::text("notes")],
            vec![CellValue::text("Pica pica"), CellValue::text("NULL")],
            vec![CellValue::text("nan"), CellValue::text("n/a")],
        ];
        let table = grid_to_table("Sightings", grid).unwrap();
        // Header names are taken literally
        assert_eq!(table.schema().names(), vec!["NA", "notes"]);
        assert_eq!(table.rows()[0], vec![CellValue::text("Pica pica"), CellValue::Null]);
        assert!(table.rows()[1].iter().all(CellValue::is_null));
    }

    #[test]
    fn test_grid_to_table_empty_sheet() {
        let table = grid_to_table("Empty", vec![vec![], vec![CellValue::Null]]).unwrap();
        assert_eq!(table.width(), 0);
        assert_eq!(table.row_count(), 0);
    }
}
