//! Transformation module.
//!
//! This module turns the five source sheets into output tables:
//! - Names: scientific name splitting
//! - Password: salted password digests
//! - Entities: per-table derivations
//! - Pipeline: read, transform and write in one run

pub mod entities;
pub mod names;
pub mod password;
pub mod pipeline;

pub use entities::*;
pub use names::{split_name_column, split_scientific_name, SplitName};
pub use password::hash_password;
pub use pipeline::{load_workbook, run, RunReport, TableReport};
