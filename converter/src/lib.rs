//! # Birdsheet - bird survey spreadsheet to database load files
//!
//! Birdsheet reads a multi-sheet spreadsheet (species, families, common
//! names, users, sightings) and writes one headerless CSV file per table,
//! ready for bulk loading into a relational database.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Document   │────▶│   Reader    │────▶│  Transform  │────▶│  CSV files  │
//! │ (ODS/XLSX)  │     │  (sheets)   │     │  (entities) │     │ (NULL=null) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use birdsheet::{run, PipelineConfig};
//!
//! fn main() {
//!     let report = run(&PipelineConfig::default()).unwrap();
//!     println!("Wrote {} tables", report.tables.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Leveled console logging
//! - [`config`] - Layered pipeline configuration
//! - [`table`] - In-memory tables and cell values
//! - [`reader`] - ODS and XLSX document readers
//! - [`transform`] - Name splitting, password hashing, entity derivations, pipeline
//! - [`writer`] - Delimited output

// Core modules
pub mod error;
pub mod logs;
pub mod config;
pub mod table;

// Input
pub mod reader;

// Transformation
pub mod transform;

// Output
pub mod writer;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    PipelineError,
    PipelineResult,
    ReaderError,
    TableError,
    TransformError,
    WriterError,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    ColumnNames,
    NamePolicy,
    PipelineConfig,
    SheetNames,
    TrimPolicy,
};

// =============================================================================
// Re-exports - Tables
// =============================================================================

pub use table::{CellValue, Column, ColumnType, Schema, Table};

// =============================================================================
// Re-exports - Readers
// =============================================================================

pub use reader::{
    open_document,
    DocumentFormat,
    DocumentReader,
    OdsDocument,
    XlsxDocument,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    hash_password,
    split_scientific_name,
    transform_workbook,
    Entity,
    Workbook,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{load_workbook, run, RunReport, TableReport};

// =============================================================================
// Re-exports - Writer
// =============================================================================

pub use writer::{read_table, write_table};
