//! Per-entity table derivations.
//!
//! | Entity       | Derivation                                                   |
//! |--------------|--------------------------------------------------------------|
//! | Species      | split `Species name` into genus / epithet                    |
//! | Families     | none                                                         |
//! | Common names | split `Scientific name` into genus / epithet                 |
//! | Users        | trim artifact rows, drop placeholder, hash passwords         |
//! | Sightings    | split `Scientific name`, prepend a null `id` column          |

use serde::Serialize;
use std::fmt;

use super::names::split_name_column;
use super::password::hash_password;
use crate::config::{PipelineConfig, SheetNames, TrimPolicy};
use crate::error::{TransformError, TransformResult};
use crate::logs::{log_info_indent, log_success};
use crate::table::{CellValue, Column, ColumnType, Table};

/// The five tables produced by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Species,
    Families,
    CommonNames,
    Users,
    Sightings,
}

impl Entity {
    /// All entities, in output order.
    pub const ALL: [Entity; 5] = [
        Entity::Species,
        Entity::Families,
        Entity::CommonNames,
        Entity::Users,
        Entity::Sightings,
    ];

    /// Output file name.
    pub fn file_name(self) -> &'static str {
        match self {
            Entity::Species => "species.csv",
            Entity::Families => "families.csv",
            Entity::CommonNames => "common_names.csv",
            Entity::Users => "users.csv",
            Entity::Sightings => "sightings.csv",
        }
    }

    /// Configured source sheet.
    pub fn sheet_name(self, sheets: &SheetNames) -> &str {
        match self {
            Entity::Species => &sheets.species,
            Entity::Families => &sheets.families,
            Entity::CommonNames => &sheets.common_names,
            Entity::Users => &sheets.users,
            Entity::Sightings => &sheets.sightings,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Entity::Species => "species",
            Entity::Families => "families",
            Entity::CommonNames => "common names",
            Entity::Users => "users",
            Entity::Sightings => "sightings",
        };
        f.write_str(label)
    }
}

/// One table per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    pub species: Table,
    pub families: Table,
    pub common_names: Table,
    pub users: Table,
    pub sightings: Table,
}

impl Workbook {
    pub fn get(&self, entity: Entity) -> &Table {
        match entity {
            Entity::Species => &self.species,
            Entity::Families => &self.families,
            Entity::CommonNames => &self.common_names,
            Entity::Users => &self.users,
            Entity::Sightings => &self.sightings,
        }
    }

    /// Tables in output order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &Table)> {
        Entity::ALL.into_iter().map(move |entity| (entity, self.get(entity)))
    }
}

// Each derivation appends any warnings it raises to `warnings`.

pub fn transform_species(mut table: Table, config: &PipelineConfig, warnings: &mut Vec<String>) -> TransformResult<Table> {
    let columns = &config.columns;
    warnings.extend(split_name_column(
        &mut table,
        &columns.species_name,
        &columns.genus,
        &columns.epithet,
        config.name_policy,
    )?);
    Ok(table)
}

pub fn transform_families(table: Table, _config: &PipelineConfig, _warnings: &mut Vec<String>) -> TransformResult<Table> {
    Ok(table)
}

pub fn transform_common_names(
    mut table: Table,
    config: &PipelineConfig,
    warnings: &mut Vec<String>,
) -> TransformResult<Table> {
    let columns = &config.columns;
    warnings.extend(split_name_column(
        &mut table,
        &columns.scientific_name,
        &columns.genus,
        &columns.epithet,
        config.name_policy,
    )?);
    Ok(table)
}

pub fn transform_users(mut table: Table, config: &PipelineConfig, _warnings: &mut Vec<String>) -> TransformResult<Table> {
    let columns = &config.columns;
    let password = table.resolve(&columns.users_password)?;
    table.resolve(&columns.users_placeholder)?;

    let before = table.row_count();
    match config.users_trim {
        TrimPolicy::Fixed { head, tail } => table.trim_rows(head, tail),
        TrimPolicy::Structural => {
            let (head, tail) = artifact_bounds(&table, &[0, password]);
            table.trim_rows(head, tail);
        }
    }
    log_info_indent(format!("Dropped {} artifact rows", before - table.row_count()), 1);

    table.drop_column(&columns.users_placeholder)?;

    let salt = config.salt.as_str();
    let column_name = columns.users_password.as_str();
    let table_name = table.name().to_string();
    table.map_column(column_name, |row, value| match value.render() {
        Some(plaintext) => Ok(CellValue::Text(hash_password(&plaintext, salt))),
        None => Err(TransformError::MissingValue {
            table: table_name.clone(),
            column: column_name.to_string(),
            row: row + 1,
        }),
    })?;
    table.set_column_type(column_name, ColumnType::Text)?;
    Ok(table)
}

/// Number of leading and trailing rows lacking a value in any of
/// `required`.
fn artifact_bounds(table: &Table, required: &[usize]) -> (usize, usize) {
    let complete = |row: &Vec<CellValue>| required.iter().all(|&col| !row[col].is_null());
    let rows = table.rows();
    match rows.iter().position(complete) {
        Some(first) => {
            let last = rows.iter().rposition(complete).unwrap_or(first);
            (first, rows.len() - last - 1)
        }
        None => (rows.len(), 0),
    }
}

pub fn transform_sightings(mut table: Table, config: &PipelineConfig, warnings: &mut Vec<String>) -> TransformResult<Table> {
    let columns = &config.columns;
    warnings.extend(split_name_column(
        &mut table,
        &columns.scientific_name,
        &columns.genus,
        &columns.epithet,
        config.name_policy,
    )?);

    let ids = vec![CellValue::Null; table.row_count()];
    table.push_column(Column::new(columns.sighting_id.clone(), ColumnType::Integer), ids)?;
    table.move_column_first(&columns.sighting_id)?;
    Ok(table)
}

/// Apply every entity derivation.
///
/// Returns the transformed tables and the warnings raised along the way.
pub fn transform_workbook(workbook: Workbook, config: &PipelineConfig) -> TransformResult<(Workbook, Vec<String>)> {
    let Workbook {
        species,
        families,
        common_names,
        users,
        sightings,
    } = workbook;

    let mut warnings = Vec::new();
    let transformed = Workbook {
        species: transform_species(species, config, &mut warnings)?,
        families: transform_families(families, config, &mut warnings)?,
        common_names: transform_common_names(common_names, config, &mut warnings)?,
        users: transform_users(users, config, &mut warnings)?,
        sightings: transform_sightings(sightings, config, &mut warnings)?,
    };

    for (entity, table) in transformed.iter() {
        log_success(format!("{}: {} rows × {} columns", entity, table.row_count(), table.width()));
    }
    Ok((transformed, warnings))
}
