//! Cell values and column types.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use iso8601_duration::Duration as IsoDuration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text values that load as null, as spreadsheet exports and pandas-based
/// tooling treat them.
pub const NA_STRINGS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "N/A",
    "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single loaded cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Absent value (empty cell, or a column that is null by construction).
    #[default]
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Time of day.
    Time(NaiveTime),
}

impl CellValue {
    /// Build a cell from a number as stored in a document.
    ///
    /// Integral values load as [`CellValue::Int`], everything else as
    /// [`CellValue::Float`]. Unparseable input is kept as text.
    pub fn from_number(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(i) = raw.parse::<i64>() {
            return CellValue::Int(i);
        }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => CellValue::Int(f as i64),
            Ok(f) => CellValue::Float(f),
            Err(_) => CellValue::Text(raw.to_string()),
        }
    }

    /// Build a cell from an ISO 8601 date or date-time string.
    ///
    /// A time of exactly midnight stays a date-time if the source carried a
    /// time part; unparseable input is kept as text.
    pub fn from_iso_date(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return CellValue::Date(date);
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
                return CellValue::DateTime(dt);
            }
        }
        CellValue::Text(raw.to_string())
    }

    /// Build a time-of-day cell from an ISO 8601 duration such as
    /// `PT07H15M00S`.
    ///
    /// Durations of a day or more, and unparseable input, are kept as text.
    pub fn from_iso_duration(raw: &str) -> Self {
        let raw = raw.trim();
        let Ok(duration) = raw.parse::<IsoDuration>() else {
            return CellValue::Text(raw.to_string());
        };
        if duration.year != 0.0 || duration.month != 0.0 || duration.day != 0.0 {
            return CellValue::Text(raw.to_string());
        }

        let total = f64::from(duration.hour) * 3600.0 + f64::from(duration.minute) * 60.0 + f64::from(duration.second);
        let seconds = total.trunc();
        let nanos = ((total - seconds) * 1e9).round() as u32;
        if !(0.0..86_400.0).contains(&seconds) {
            return CellValue::Text(raw.to_string());
        }
        match NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, nanos.min(999_999_999)) {
            Some(time) => CellValue::Time(time),
            None => CellValue::Text(raw.to_string()),
        }
    }

    /// Build a cell from text; empty text is null.
    pub fn text(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.is_empty() {
            CellValue::Null
        } else {
            CellValue::Text(raw)
        }
    }

    /// Null for text cells holding one of [`NA_STRINGS`], otherwise unchanged.
    pub fn null_if_na(self) -> Self {
        match self {
            CellValue::Text(ref s) if NA_STRINGS.contains(&s.as_str()) => CellValue::Null,
            other => other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Field text for delimited output; `None` for null.
    pub fn render(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// The column type this single value implies.
    pub fn column_type(&self) -> ColumnType {
        match self {
            CellValue::Null => ColumnType::Empty,
            CellValue::Text(_) => ColumnType::Text,
            CellValue::Int(_) => ColumnType::Integer,
            CellValue::Float(_) => ColumnType::Float,
            CellValue::Bool(_) => ColumnType::Boolean,
            CellValue::Date(_) => ColumnType::Date,
            CellValue::DateTime(_) => ColumnType::DateTime,
            CellValue::Time(_) => ColumnType::Time,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(i) => write!(f, "{}", i),
            // Integral floats keep a trailing ".0"
            CellValue::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{:.1}", x)
            }
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Time(t) if t.nanosecond() == 0 => write!(f, "{}", t.format("%H:%M:%S")),
            CellValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.6f")),
        }
    }
}

/// Declared or inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// No non-null values seen.
    Empty,
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Time,
    /// Values of incompatible types.
    Mixed,
}

impl ColumnType {
    /// Combine two observations of the same column.
    pub fn merge(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (Empty, t) | (t, Empty) => t,
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            (Date, DateTime) | (DateTime, Date) => DateTime,
            _ => Mixed,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Empty => "empty",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Time => "time",
            ColumnType::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_numbers_load_as_int() {
        assert_eq!(CellValue::from_number("42"), CellValue::Int(42));
        assert_eq!(CellValue::from_number("42.0"), CellValue::Int(42));
        assert_eq!(CellValue::from_number("-3.25"), CellValue::Float(-3.25));
        assert_eq!(CellValue::from_number("n/a"), CellValue::Text("n/a".into()));
    }

    #[test]
    fn test_render() {
        assert_eq!(CellValue::Null.render(), None);
        assert_eq!(CellValue::Int(7).render().unwrap(), "7");
        assert_eq!(CellValue::Float(56.5).render().unwrap(), "56.5");
        assert_eq!(CellValue::Float(2.0).render().unwrap(), "2.0");
        assert_eq!(CellValue::Bool(true).render().unwrap(), "True");
        assert_eq!(CellValue::Text("Turdus".into()).render().unwrap(), "Turdus");
    }

    #[test]
    fn test_iso_dates() {
        assert_eq!(
            CellValue::from_iso_date("2021-04-03").render().unwrap(),
            "2021-04-03"
        );
        assert_eq!(
            CellValue::from_iso_date("2021-04-03T07:15:00").render().unwrap(),
            "2021-04-03 07:15:00"
        );
        assert!(matches!(CellValue::from_iso_date("spring"), CellValue::Text(_)));
    }

    #[test]
    fn test_iso_durations_load_as_time_of_day() {
        let cell = CellValue::from_iso_duration("PT07H15M00S");
        assert_eq!(cell, CellValue::Time(NaiveTime::from_hms_opt(7, 15, 0).unwrap()));
        assert_eq!(cell.render().unwrap(), "07:15:00");
        assert_eq!(cell.column_type(), ColumnType::Time);

        assert_eq!(
            CellValue::Time(NaiveTime::from_hms_milli_opt(0, 0, 1, 500).unwrap()).render().unwrap(),
            "00:00:01.500000"
        );
        assert_eq!(CellValue::from_iso_duration("PT36H00M00S"), CellValue::Text("PT36H00M00S".into()));
        assert_eq!(CellValue::from_iso_duration("noon"), CellValue::Text("noon".into()));
    }

    #[test]
    fn test_na_strings_become_null() {
        assert!(CellValue::text("NULL").null_if_na().is_null());
        assert!(CellValue::text("N/A").null_if_na().is_null());
        assert!(CellValue::text("#N/A").null_if_na().is_null());
        assert_eq!(CellValue::text("NAN mix").null_if_na(), CellValue::text("NAN mix"));
        assert_eq!(CellValue::text("Nala").null_if_na(), CellValue::text("Nala"));
        assert_eq!(CellValue::Int(0).null_if_na(), CellValue::Int(0));
    }

    #[test]
    fn test_empty_text_is_null() {
        assert!(CellValue::text("").is_null());
        assert_eq!(CellValue::text("x"), CellValue::Text("x".into()));
    }

    #[test]
    fn test_type_merge() {
        use ColumnType::*;
        assert_eq!(Empty.merge(Integer), Integer);
        assert_eq!(Integer.merge(Float), Float);
        assert_eq!(Date.merge(DateTime), DateTime);
        assert_eq!(Text.merge(Integer), Mixed);
        assert_eq!(Text.merge(Text), Text);
    }
}
