//! Scientific name splitting.
//!
//! A scientific name is `<genus> <epithet>`; tables store it as two
//! columns so it can act as a composite key across species, common names
//! and sightings.

use crate::config::NamePolicy;
use crate::error::{TransformError, TransformResult};
use crate::logs::log_warning;
use crate::table::{CellValue, Column, Table};

/// A scientific name split at whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitName<'a> {
    pub genus: &'a str,
    pub epithet: &'a str,
    /// Anything after the epithet (subspecies, authority, ...)
    pub remainder: Option<&'a str>,
}

/// Split a name into genus and epithet.
///
/// Returns `None` if the name has fewer than two whitespace-separated
/// tokens.
pub fn split_scientific_name(name: &str) -> Option<SplitName<'_>> {
    let (genus, rest) = name.trim().split_once(char::is_whitespace)?;
    let rest = rest.trim_start();

    let (epithet, remainder) = match rest.split_once(char::is_whitespace) {
        Some((epithet, tail)) => (epithet, Some(tail.trim_start())),
        None => (rest, None),
    };
    if epithet.is_empty() {
        return None;
    }

    Some(SplitName {
        genus,
        epithet,
        remainder,
    })
}

/// Replace `source` with two text columns, `genus` and `epithet`, appended
/// at the end of the schema.
///
/// Returns one warning per name that had more than two parts.
pub fn split_name_column(
    table: &mut Table,
    source: &str,
    genus: &str,
    epithet: &str,
    policy: NamePolicy,
) -> TransformResult<Vec<String>> {
    let mut genera = Vec::with_capacity(table.row_count());
    let mut epithets = Vec::with_capacity(table.row_count());
    let mut warnings = Vec::new();

    for (index, value) in table.column_values(source)?.into_iter().enumerate() {
        let row = index + 1;
        let text = value.render().unwrap_or_default();
        let split = split_scientific_name(&text).ok_or_else(|| TransformError::MalformedScientificName {
            table: table.name().to_string(),
            row,
            value: text.clone(),
        })?;

        if let Some(remainder) = split.remainder {
            if policy == NamePolicy::Strict {
                return Err(TransformError::TrinomialName {
                    table: table.name().to_string(),
                    row,
                    value: text,
                });
            }
            let warning = format!(
                "{} row {}: '{}' has extra parts, dropping '{}'",
                table.name(),
                row,
                text.trim(),
                remainder
            );
            log_warning(warning.as_str());
            warnings.push(warning);
        }

        genera.push(CellValue::text(split.genus));
        epithets.push(CellValue::text(split.epithet));
    }

    table.drop_column(source)?;
    table.push_column(Column::text(genus), genera)?;
    table.push_column(Column::text(epithet), epithets)?;
    Ok(warnings)
}
