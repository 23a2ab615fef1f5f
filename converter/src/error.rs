//! Error types for the birdsheet conversion pipeline.
//!
//! One error type per layer:
//!
//! - [`ReaderError`] - opening and parsing spreadsheet documents
//! - [`TableError`] - schema and column access
//! - [`TransformError`] - per-entity column derivations
//! - [`WriterError`] - writing and re-reading delimited tables
//! - [`ConfigError`] - configuration files and option values
//! - [`PipelineError`] - top-level orchestration
//!
//! Conversion is automatic via `From` implementations,
//! so `?` works across layer boundaries.

use thiserror::Error;

// =============================================================================
// Document Reader Errors
// =============================================================================

/// Errors while opening or parsing a spreadsheet document.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Failed to read the document.
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    /// The container is not a valid zip archive.
    #[error("Invalid document container: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Malformed XML inside the container.
    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed XML attribute.
    #[error("Malformed XML attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// XML text could not be decoded.
    #[error("Invalid XML text encoding: {0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    /// Unknown XML entity reference.
    #[error("Unknown XML entity: &{0};")]
    UnknownEntity(String),

    /// The archive does not contain a spreadsheet of the expected kind.
    #[error("Not a {format} document: {reason}")]
    NotASpreadsheet { format: &'static str, reason: String },

    /// The document is password protected.
    #[error("Document is encrypted: {0}")]
    Encrypted(String),

    /// A required sheet is missing.
    #[error("Sheet not found: '{name}' (available: {available})")]
    SheetNotFound { name: String, available: String },

    /// The format could not be determined from the file name.
    #[error("Cannot determine document format of '{0}' (use --format)")]
    UnknownFormat(String),

    /// Table construction failed while loading a sheet.
    #[error("Sheet '{sheet}': {source}")]
    Table {
        sheet: String,
        #[source]
        source: TableError,
    },
}

// =============================================================================
// Table Errors
// =============================================================================

/// Errors from schema lookups and column operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    /// Named column does not exist.
    #[error("Column not found in '{table}': '{column}'")]
    ColumnNotFound { table: String, column: String },

    /// Positional column does not exist.
    #[error("Column index {index} out of range in '{table}' ({width} columns)")]
    ColumnIndexOutOfRange {
        table: String,
        index: usize,
        width: usize,
    },

    /// A column with this name already exists.
    #[error("Duplicate column in '{table}': '{column}'")]
    DuplicateColumn { table: String, column: String },

    /// A row does not match the schema width.
    #[error("Row {row} of '{table}' has {found} fields, expected {expected}")]
    RowWidthMismatch {
        table: String,
        row: usize,
        found: usize,
        expected: usize,
    },
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors during per-entity column derivations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    /// Scientific name has fewer than two tokens.
    #[error("Malformed scientific name in '{table}' row {row}: '{value}'")]
    MalformedScientificName {
        table: String,
        row: usize,
        value: String,
    },

    /// Scientific name has more than two tokens and the policy is strict.
    #[error("Scientific name in '{table}' row {row} has more than two parts: '{value}'")]
    TrinomialName {
        table: String,
        row: usize,
        value: String,
    },

    /// A required value is null.
    #[error("Missing value in '{table}' column '{column}' row {row}")]
    MissingValue {
        table: String,
        column: String,
        row: usize,
    },

    /// Schema error.
    #[error(transparent)]
    Table(#[from] TableError),
}

// =============================================================================
// Writer Errors
// =============================================================================

/// Errors writing or re-reading delimited output.
#[derive(Debug, Error)]
pub enum WriterError {
    /// File system error.
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Delimited encoding error.
    #[error("Delimited file error: {0}")]
    Csv(#[from] csv::Error),

    /// Re-read record does not fit the expected schema.
    #[error("Record {record} of '{path}' has {found} fields, expected {expected}")]
    ColumnCountMismatch {
        path: String,
        record: usize,
        found: usize,
        expected: usize,
    },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Cannot read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the config schema.
    #[error("Invalid config file '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Unknown document format name.
    #[error("Unknown document format: '{0}' (expected ods or xlsx)")]
    UnknownFormat(String),

    /// Unknown trim policy name.
    #[error("Unknown users trim policy: '{0}' (expected fixed or structural)")]
    UnknownTrimPolicy(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline error.
///
/// This is the error type returned by [`crate::transform::pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Document reading error.
    #[error("Read error: {0}")]
    Reader(#[from] ReaderError),

    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Output error.
    #[error("Write error: {0}")]
    Writer(#[from] WriterError),

    /// Report serialization error.
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
}

impl From<TableError> for PipelineError {
    fn from(err: TableError) -> Self {
        PipelineError::Transform(TransformError::Table(err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for document reading.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for transformations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for writing.
pub type WriterResult<T> = Result<T, WriterError>;

/// Result type for the pipeline.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // TableError -> TransformError -> PipelineError
        let table_err = TableError::ColumnNotFound {
            table: "Users".into(),
            column: "Unnamed: 5".into(),
        };
        let pipeline_err: PipelineError = table_err.clone().into();
        assert!(pipeline_err.to_string().contains("Unnamed: 5"));

        let transform_err: TransformError = table_err.into();
        let pipeline_err: PipelineError = transform_err.into();
        assert!(pipeline_err.to_string().starts_with("Transform error"));
    }

    #[test]
    fn test_sheet_not_found_lists_available() {
        let err = ReaderError::SheetNotFound {
            name: "Sightings".into(),
            available: "Species, Families".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'Sightings'"));
        assert!(msg.contains("Species, Families"));
    }

    #[test]
    fn test_malformed_name_format() {
        let err = TransformError::MalformedScientificName {
            table: "Species".into(),
            row: 4,
            value: "Turdus".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("row 4"));
        assert!(msg.contains("'Turdus'"));
    }
}
