//! Delimited table output.
//!
//! Tables are written without a header row, comma separated, quoting only
//! fields that need it, with absent values written as a null marker
//! (`NULL` by default). [`read_table`] reverses the encoding for a known
//! schema.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{WriterError, WriterResult};
use crate::table::{CellValue, Schema, Table};

fn io_error(path: &Path, source: std::io::Error) -> WriterError {
    WriterError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Write `table` to `path`, replacing any existing file.
///
/// Parent directories are created as needed. Returns the number of rows
/// written.
pub fn write_table(table: &Table, path: &Path, null_marker: &str) -> WriterResult<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    write_table_to(table, file, null_marker)?;
    Ok(table.row_count())
}

/// Write `table` to any writer.
pub fn write_table_to<W: Write>(table: &Table, writer: W, null_marker: &str) -> WriterResult<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(b',')
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    for row in table.rendered_rows() {
        csv.write_record(row.iter().map(|field| field.as_deref().unwrap_or(null_marker)))?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Read a file written by [`write_table`] back into a table of text cells.
///
/// Fields equal to `null_marker` load as null; every record must have one
/// field per schema column.
pub fn read_table(path: &Path, name: &str, schema: &Schema, null_marker: &str) -> WriterResult<Table> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    read_table_from(file, &path.display().to_string(), name, schema, null_marker)
}

/// Read delimited records from any reader.
pub fn read_table_from<R: Read>(
    reader: R,
    label: &str,
    name: &str,
    schema: &Schema,
    null_marker: &str,
) -> WriterResult<Table> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut table = Table::new(name, schema.clone());
    for (index, record) in csv.records().enumerate() {
        let record = record?;
        if record.len() != schema.len() {
            return Err(WriterError::ColumnCountMismatch {
                path: label.to_string(),
                record: index + 1,
                found: record.len(),
                expected: schema.len(),
            });
        }
        let row = record
            .iter()
            .map(|field| {
                if field == null_marker {
                    CellValue::Null
                } else {
                    CellValue::Text(field.to_string())
                }
            })
            .collect();
        // Width was checked above
        table.push_row(row).map_err(|_| WriterError::ColumnCountMismatch {
            path: label.to_string(),
            record: index + 1,
            found: record.len(),
            expected: schema.len(),
        })?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            "Sightings",
            Schema::from_names(["id", "notes", "latitude", "seen", "genus_name"]),
            vec![
                vec![
                    CellValue::Null,
                    CellValue::text("flock, near \"the\" pond"),
                    CellValue::Float(56.34),
                    CellValue::Bool(true),
                    CellValue::text("Turdus"),
                ],
                vec![
                    CellValue::Null,
                    CellValue::Null,
                    CellValue::Int(56),
                    CellValue::Bool(false),
                    CellValue::text("Pica"),
                ],
            ],
        )
        .unwrap()
    }

    fn to_string(table: &Table) -> String {
        let mut out = Vec::new();
        write_table_to(table, &mut out, "NULL").unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_no_header_null_marker_minimal_quoting() {
        let text = to_string(&sample());
        assert_eq!(
            text,
            "NULL,\"flock, near \"\"the\"\" pond\",56.34,True,Turdus\nNULL,NULL,56,False,Pica\n"
        );
    }

    #[test]
    fn test_custom_null_marker() {
        let mut out = Vec::new();
        write_table_to(&sample(), &mut out, "\\N").unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("\\N,"));
    }

    #[test]
    fn test_round_trip_reconstructs_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sightings.csv");
        let table = sample();

        let written = write_table(&table, &path, "NULL").unwrap();
        assert_eq!(written, 2);

        let back = read_table(&path, "Sightings", table.schema(), "NULL").unwrap();
        assert_eq!(back.row_count(), table.row_count());
        assert_eq!(back.rendered_rows(), table.rendered_rows());
        assert!(back.rows()[1][1].is_null());
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("families.csv");
        fs::write(&path, "stale,content\nmore,stale\nlines,here\n").unwrap();

        let table = Table::from_rows("Families", Schema::from_names(["f"]), vec![vec![CellValue::text("Corvidae")]]).unwrap();
        write_table(&table, &path, "NULL").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Corvidae\n");
    }

    #[test]
    fn test_read_rejects_wrong_width() {
        let schema = Schema::from_names(["a", "b"]);
        let err = read_table_from("1,2\n3\n".as_bytes(), "mem", "t", &schema, "NULL").unwrap_err();
        assert!(matches!(err, WriterError::ColumnCountMismatch { record: 2, found: 1, .. }));
    }

    #[test]
    fn test_write_to_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = write_table(&sample(), &blocker.join("out.csv"), "NULL").unwrap_err();
        assert!(matches!(err, WriterError::Io { .. }));
    }
}
