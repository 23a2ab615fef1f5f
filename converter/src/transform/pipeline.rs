//! End-to-end conversion: document in, five delimited files out.
//!
//! # Example
//!
//! ```rust,ignore
//! use birdsheet::{run, PipelineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default().with_env();
//!     let report = run(&config)?;
//!     println!("Wrote {} tables", report.tables.len());
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use super::entities::{transform_workbook, Entity, Workbook};
use crate::config::{PipelineConfig, SheetNames};
use crate::error::{PipelineResult, ReaderResult, WriterError};
use crate::logs::{log_info, log_info_indent, log_success, log_success_indent};
use crate::reader::{open_document, DocumentFormat, DocumentReader};
use crate::table::Table;
use crate::writer::write_table;

/// Summary of one output table.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub entity: Entity,
    /// Source sheet
    pub sheet: String,
    /// Output file
    pub output: PathBuf,
    /// Data rows read from the sheet
    pub input_rows: usize,
    /// Data rows written
    pub output_rows: usize,
    /// Output column names, in order
    pub columns: Vec<String>,
}

/// Summary of a conversion run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub format: DocumentFormat,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tables: Vec<TableReport>,
    /// Warnings raised by this run
    pub warnings: Vec<String>,
}

/// Load the five source sheets.
pub fn load_workbook(reader: &mut dyn DocumentReader, sheets: &SheetNames) -> ReaderResult<Workbook> {
    Ok(Workbook {
        species: load_sheet(reader, &sheets.species)?,
        families: load_sheet(reader, &sheets.families)?,
        common_names: load_sheet(reader, &sheets.common_names)?,
        users: load_sheet(reader, &sheets.users)?,
        sightings: load_sheet(reader, &sheets.sightings)?,
    })
}

fn load_sheet(reader: &mut dyn DocumentReader, name: &str) -> ReaderResult<Table> {
    let table = reader.read_sheet(name)?;
    log_success_indent(
        format!("{}: {} rows, {} columns", name, table.row_count(), table.width()),
        1,
    );
    Ok(table)
}

/// Convert the configured document.
///
/// Everything is loaded and transformed before the first file is written,
/// so a missing sheet or a bad value leaves the output directory untouched.
pub fn run(config: &PipelineConfig) -> PipelineResult<RunReport> {
    let started_at = Utc::now();

    log_info(format!("📖 Reading {}...", config.input.display()));
    let mut reader = open_document(&config.input, config.format)?;
    let format = reader.format();
    log_info_indent(format!("Format: {}", format), 1);
    log_info_indent(format!("Sheets: {}", reader.sheet_names().join(", ")), 1);

    let workbook = load_workbook(reader.as_mut(), &config.sheets)?;
    let input_rows: Vec<usize> = Entity::ALL
        .iter()
        .map(|&entity| workbook.get(entity).row_count())
        .collect();

    log_info("⚙️  Transforming tables...");
    let (workbook, warnings) = transform_workbook(workbook, config)?;

    log_info(format!("💾 Writing to {}...", config.output_dir.display()));
    fs::create_dir_all(&config.output_dir).map_err(|source| WriterError::Io {
        path: config.output_dir.display().to_string(),
        source,
    })?;

    let mut tables = Vec::with_capacity(Entity::ALL.len());
    for ((entity, table), input_rows) in workbook.iter().zip(input_rows) {
        let output = config.output_path(entity.file_name());
        let output_rows = write_table(table, &output, &config.null_marker)?;
        log_success_indent(format!("{} ({} rows)", output.display(), output_rows), 1);

        tables.push(TableReport {
            entity,
            sheet: entity.sheet_name(&config.sheets).to_string(),
            output,
            input_rows,
            output_rows,
            columns: table.schema().names().into_iter().map(String::from).collect(),
        });
    }

    let report = RunReport {
        input: config.input.clone(),
        format,
        started_at,
        finished_at: Utc::now(),
        tables,
        warnings,
    };

    if let Some(path) = &config.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).map_err(|source| WriterError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log_info_indent(format!("Report saved to {}", path.display()), 1);
    }

    log_success("✨ Done!");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReaderError;
    use crate::reader::OdsDocument;
    use crate::table::{CellValue, Schema};
    use std::collections::HashMap;

    /// In-memory document for exercising the loader.
    struct MemoryDocument {
        sheets: HashMap<String, Table>,
    }

    impl DocumentReader for MemoryDocument {
        fn format(&self) -> DocumentFormat {
            DocumentFormat::Ods
        }

        fn sheet_names(&self) -> Vec<String> {
            self.sheets.keys().cloned().collect()
        }

        fn read_sheet(&mut self, name: &str) -> ReaderResult<Table> {
            self.sheets.get(name).cloned().ok_or_else(|| ReaderError::SheetNotFound {
                name: name.to_string(),
                available: String::new(),
            })
        }
    }

    fn one_row(name: &str, column: &str) -> Table {
        Table::from_rows(name, Schema::from_names([column]), vec![vec![CellValue::text("x")]]).unwrap()
    }

    #[test]
    fn test_load_workbook_uses_configured_names() {
        let mut sheets = SheetNames::default();
        sheets.users = "Members".into();

        let mut doc = MemoryDocument {
            sheets: ["Species", "Families", "Common names", "Members", "Sightings"]
                .into_iter()
                .map(|name| (name.to_string(), one_row(name, "c")))
                .collect(),
        };

        let workbook = load_workbook(&mut doc, &sheets).unwrap();
        assert_eq!(workbook.users.name(), "Members");
        assert_eq!(workbook.get(Entity::Families).name(), "Families");
    }

    #[test]
    fn test_load_workbook_missing_sheet() {
        let mut doc = MemoryDocument {
            sheets: HashMap::from([("Species".to_string(), one_row("Species", "c"))]),
        };
        let err = load_workbook(&mut doc, &SheetNames::default()).unwrap_err();
        assert!(matches!(err, ReaderError::SheetNotFound { ref name, .. } if name == "Families"));
    }

    #[test]
    fn test_run_fails_on_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("all_data.ods");
        fs::write(&input, b"not a zip").unwrap();

        let config = PipelineConfig {
            input: input.clone(),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        assert!(run(&config).is_err());
        assert!(OdsDocument::open(&input).is_err());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_run_rejects_unknown_extension() {
        let config = PipelineConfig {
            input: PathBuf::from("birds.numbers"),
            ..Default::default()
        };
        assert!(matches!(
            run(&config),
            Err(crate::error::PipelineError::Reader(ReaderError::UnknownFormat(_)))
        ));
    }
}
