//! Pipeline configuration.
//!
//! Every value the converter uses has a built-in default, so running with
//! no configuration converts `all_data.ods` in the current directory.
//! Defaults can be overridden, in increasing order of precedence, by a JSON
//! config file, the environment (including a `.env` file) and CLI flags.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::reader::DocumentFormat;

/// Default input document.
pub const DEFAULT_INPUT: &str = "all_data.ods";

/// Default suffix appended to passwords before hashing.
pub const DEFAULT_SALT: &str = "BIRDS";

/// Default token for absent values in output files.
pub const DEFAULT_NULL_MARKER: &str = "NULL";

/// Environment variable overriding the password salt.
pub const SALT_ENV: &str = "BIRDSHEET_SALT";

/// How to treat scientific names with more than two parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePolicy {
    /// Keep the first two tokens, log a warning for each such name.
    #[default]
    FirstTwo,
    /// Refuse the name.
    Strict,
}

/// How to remove artifact rows from the Users sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TrimPolicy {
    /// Drop a fixed number of rows from each end.
    Fixed { head: usize, tail: usize },
    /// Drop leading and trailing rows missing a required value.
    Structural,
}

impl Default for TrimPolicy {
    fn default() -> Self {
        TrimPolicy::Fixed { head: 1, tail: 2 }
    }
}

impl FromStr for TrimPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(TrimPolicy::default()),
            "structural" => Ok(TrimPolicy::Structural),
            other => Err(ConfigError::UnknownTrimPolicy(other.to_string())),
        }
    }
}

/// Names of the five source sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub species: String,
    pub families: String,
    pub common_names: String,
    pub users: String,
    pub sightings: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            species: "Species".to_string(),
            families: "Families".to_string(),
            common_names: "Common names".to_string(),
            users: "Users".to_string(),
            sightings: "Sightings".to_string(),
        }
    }
}

/// Source and derived column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Scientific name column of the Species sheet
    pub species_name: String,
    /// Scientific name column of the Common names and Sightings sheets
    pub scientific_name: String,
    /// Unused column of the Users sheet
    pub users_placeholder: String,
    /// Plaintext password column of the Users sheet
    pub users_password: String,
    pub genus: String,
    pub epithet: String,
    /// Leading identity column added to sightings
    pub sighting_id: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            species_name: "Species name".to_string(),
            scientific_name: "Scientific name".to_string(),
            users_placeholder: "Unnamed: 4".to_string(),
            users_password: "Unnamed: 5".to_string(),
            genus: "genus_name".to_string(),
            epithet: "species_epithet".to_string(),
            sighting_id: "id".to_string(),
        }
    }
}

/// Full configuration of a conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Spreadsheet document to read
    pub input: PathBuf,
    /// Reader to use; detected from the extension when unset
    pub format: Option<DocumentFormat>,
    /// Directory receiving the five output files
    pub output_dir: PathBuf,
    /// Token written for absent values
    pub null_marker: String,
    /// Suffix appended to passwords before hashing
    pub salt: String,
    pub name_policy: NamePolicy,
    pub users_trim: TrimPolicy,
    pub sheets: SheetNames,
    pub columns: ColumnNames,
    /// Where to write the JSON run report, if anywhere
    pub report: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            format: None,
            output_dir: PathBuf::from("."),
            null_marker: DEFAULT_NULL_MARKER.to_string(),
            salt: DEFAULT_SALT.to_string(),
            name_policy: NamePolicy::default(),
            users_trim: TrimPolicy::default(),
            sheets: SheetNames::default(),
            columns: ColumnNames::default(),
            report: None,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Apply environment overrides, reading `.env` first if present.
    pub fn with_env(mut self) -> Self {
        let _ = dotenvy::dotenv();

        if let Ok(salt) = env::var(SALT_ENV) {
            self.salt = salt;
        }
        self
    }

    /// Path of an output file inside the output directory.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_legacy_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.input, PathBuf::from("all_data.ods"));
        assert_eq!(config.salt, "BIRDS");
        assert_eq!(config.null_marker, "NULL");
        assert_eq!(config.users_trim, TrimPolicy::Fixed { head: 1, tail: 2 });
        assert_eq!(config.name_policy, NamePolicy::FirstTwo);
        assert_eq!(config.sheets.common_names, "Common names");
        assert_eq!(config.columns.users_password, "Unnamed: 5");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{
                "input": "birds.xlsx",
                "format": "xlsx",
                "name_policy": "strict",
                "users_trim": { "mode": "structural" },
                "sheets": { "users": "Members" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.input, PathBuf::from("birds.xlsx"));
        assert_eq!(config.format, Some(DocumentFormat::Xlsx));
        assert_eq!(config.name_policy, NamePolicy::Strict);
        assert_eq!(config.users_trim, TrimPolicy::Structural);
        assert_eq!(config.sheets.users, "Members");
        assert_eq!(config.sheets.species, "Species");
        assert_eq!(config.salt, "BIRDS");
    }

    #[test]
    fn test_fixed_trim_from_json() {
        let config = PipelineConfig::from_json(r#"{"users_trim": {"mode": "fixed", "head": 2, "tail": 0}}"#).unwrap();
        assert_eq!(config.users_trim, TrimPolicy::Fixed { head: 2, tail: 0 });
    }

    #[test]
    fn test_trim_policy_from_str() {
        assert_eq!("fixed".parse::<TrimPolicy>().unwrap(), TrimPolicy::Fixed { head: 1, tail: 2 });
        assert_eq!("Structural".parse::<TrimPolicy>().unwrap(), TrimPolicy::Structural);
        assert!("smart".parse::<TrimPolicy>().is_err());
    }

    #[test]
    fn test_config_file_errors_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("birdsheet.json");

        let missing = PipelineConfig::from_file(&path).unwrap_err();
        assert!(missing.to_string().contains("birdsheet.json"));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineConfig::from_file(&path),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn test_output_path() {
        let config = PipelineConfig {
            output_dir: PathBuf::from("out"),
            ..Default::default()
        };
        assert_eq!(config.output_path("users.csv"), PathBuf::from("out/users.csv"));
    }
}
