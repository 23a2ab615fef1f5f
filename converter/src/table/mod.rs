//! In-memory tables with an explicit schema.
//!
//! A [`Table`] is an ordered [`Schema`] of typed [`Column`] descriptors plus
//! rows of [`CellValue`]s. Fields are addressed through [`ColumnRef`]
//! (position or name), resolved against the schema.

pub mod cell;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{TableError, TableResult};

pub use cell::{CellValue, ColumnType, NA_STRINGS};

// =============================================================================
// Schema
// =============================================================================

/// A named, typed column descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self { name: name.into(), kind }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }
}

/// Ordered list of columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Schema of untyped columns with the given names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|n| Column::new(n, ColumnType::Empty)).collect())
    }

    /// Derive column names from a header row.
    ///
    /// Empty header cells become `Unnamed: <index>`; repeated names get a
    /// `.1`, `.2`, ... suffix. The schema is `width` columns wide even if
    /// the header row is shorter.
    pub fn from_header(header: &[CellValue], width: usize) -> Self {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut names = Vec::with_capacity(width);

        for index in 0..width.max(header.len()) {
            let base = header
                .get(index)
                .and_then(CellValue::render)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("Unnamed: {}", index));

            let mut name = base.clone();
            while let Some(count) = seen.get_mut(&name) {
                *count += 1;
                name = format!("{}.{}", base, count);
            }
            seen.insert(name.clone(), 0);
            names.push(name);
        }

        Self::from_names(names)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Reference to a column, by position or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for ColumnRef<'_> {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(name: &'a str) -> Self {
        ColumnRef::Name(name)
    }
}

impl<'a> From<&'a String> for ColumnRef<'a> {
    fn from(name: &'a String) -> Self {
        ColumnRef::Name(name.as_str())
    }
}

// =============================================================================
// Table
// =============================================================================

/// A named table of rows conforming to a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    schema: Schema,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// An empty table.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
        }
    }

    /// Build a table, checking every row against the schema width.
    pub fn from_rows(
        name: impl Into<String>,
        schema: Schema,
        rows: Vec<Vec<CellValue>>,
    ) -> TableResult<Self> {
        let mut table = Self::new(name, schema);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Re-derive every column type from the values it holds.
    pub fn with_inferred_types(mut self) -> Self {
        for (index, column) in self.schema.columns.iter_mut().enumerate() {
            column.kind = self
                .rows
                .iter()
                .map(|row| row[index].column_type())
                .fold(ColumnType::Empty, ColumnType::merge);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.schema.len()
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> TableResult<()> {
        if row.len() != self.width() {
            return Err(TableError::RowWidthMismatch {
                table: self.name.clone(),
                row: self.rows.len(),
                found: row.len(),
                expected: self.width(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Resolve a column reference to a position.
    pub fn resolve<'a>(&self, column: impl Into<ColumnRef<'a>>) -> TableResult<usize> {
        match column.into() {
            ColumnRef::Index(index) if index < self.width() => Ok(index),
            ColumnRef::Index(index) => Err(TableError::ColumnIndexOutOfRange {
                table: self.name.clone(),
                index,
                width: self.width(),
            }),
            ColumnRef::Name(name) => {
                self.schema
                    .index_of(name)
                    .ok_or_else(|| TableError::ColumnNotFound {
                        table: self.name.clone(),
                        column: name.to_string(),
                    })
            }
        }
    }

    /// All values of a column, top to bottom.
    pub fn column_values<'a>(&self, column: impl Into<ColumnRef<'a>>) -> TableResult<Vec<&CellValue>> {
        let index = self.resolve(column)?;
        Ok(self.rows.iter().map(|r| &r[index]).collect())
    }

    /// Remove a column and return its descriptor.
    pub fn drop_column<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> TableResult<Column> {
        let index = self.resolve(column)?;
        for row in &mut self.rows {
            row.remove(index);
        }
        Ok(self.schema.columns.remove(index))
    }

    /// Append a column; `values` must have one entry per row.
    pub fn push_column(&mut self, column: Column, values: Vec<CellValue>) -> TableResult<()> {
        if self.schema.index_of(&column.name).is_some() {
            return Err(TableError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name,
            });
        }
        if values.len() != self.rows.len() {
            return Err(TableError::RowWidthMismatch {
                table: self.name.clone(),
                row: values.len().min(self.rows.len()),
                found: values.len(),
                expected: self.rows.len(),
            });
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        self.schema.columns.push(column);
        Ok(())
    }

    /// Move a column to the front, keeping the relative order of the rest.
    pub fn move_column_first<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> TableResult<()> {
        let index = self.resolve(column)?;
        if index == 0 {
            return Ok(());
        }
        let descriptor = self.schema.columns.remove(index);
        self.schema.columns.insert(0, descriptor);
        for row in &mut self.rows {
            let value = row.remove(index);
            row.insert(0, value);
        }
        Ok(())
    }

    /// Replace every value of a column with `f(row_index, old_value)`.
    pub fn map_column<'a, F, E>(&mut self, column: impl Into<ColumnRef<'a>>, mut f: F) -> Result<(), E>
    where
        F: FnMut(usize, &CellValue) -> Result<CellValue, E>,
        E: From<TableError>,
    {
        let index = self.resolve(column)?;
        for (row_index, row) in self.rows.iter_mut().enumerate() {
            row[index] = f(row_index, &row[index])?;
        }
        Ok(())
    }

    /// Set the declared type of a column.
    pub fn set_column_type<'a>(&mut self, column: impl Into<ColumnRef<'a>>, kind: ColumnType) -> TableResult<()> {
        let index = self.resolve(column)?;
        self.schema.columns[index].kind = kind;
        Ok(())
    }

    /// Drop `head` rows from the start and `tail` rows from the end.
    ///
    /// A table shorter than `head + tail` ends up empty.
    pub fn trim_rows(&mut self, head: usize, tail: usize) {
        let keep_end = self.rows.len().saturating_sub(tail);
        if head >= keep_end {
            self.rows.clear();
            return;
        }
        self.rows.truncate(keep_end);
        self.rows.drain(..head);
    }

    /// Rows rendered as output fields (`None` for null).
    pub fn rendered_rows(&self) -> Vec<Vec<Option<String>>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(CellValue::render).collect())
            .collect()
    }
}
