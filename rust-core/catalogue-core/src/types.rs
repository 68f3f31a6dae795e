//! # Column Types and Projected Values
//!
//! The semantic type tags a column schema can declare, and the typed values
//! the projector produces for them.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::fmt;

/// Largest magnitude at which every integer is exactly representable in f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Semantic type a column is declared as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Numeric value, stored as f64
    Number,
    /// Text
    String,
    /// Truthiness
    Boolean,
    /// Calendar date and time
    Date,
}

impl ColumnType {
    /// Parse a schema type tag (e.g. `"number"`)
    ///
    /// Returns `None` for anything that is not one of the four known tags.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            _ => None,
        }
    }

    /// The tag this type is declared with
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A value after coercion to its declared column type
///
/// `Number(f64::NAN)` and `InvalidDate` are the sentinels for values that
/// could not be coerced. They are data, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectedValue {
    /// Source value was null, or the column was missing
    Null,
    /// Number (may be NaN)
    Number(f64),
    /// Text
    Text(String),
    /// Boolean
    Boolean(bool),
    /// Valid date
    Date(NaiveDateTime),
    /// Date that could not be parsed
    InvalidDate,
}

impl ProjectedValue {
    /// Check for null
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check for the invalid-number sentinel
    #[must_use]
    pub fn is_invalid_number(&self) -> bool {
        matches!(self, Self::Number(n) if n.is_nan())
    }

    /// Check for the invalid-date sentinel
    #[must_use]
    pub const fn is_invalid_date(&self) -> bool {
        matches!(self, Self::InvalidDate)
    }

    /// Get as f64 if Number variant
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as &str if Text variant
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as bool if Boolean variant
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the date if Date variant
    #[must_use]
    pub const fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl Serialize for ProjectedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Number(n) if !n.is_finite() => serializer.serialize_str(&format_number(*n)),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(n) if is_safe_integer(*n) => serializer.serialize_i64(*n as i64),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Date(d) => serializer.serialize_str(&format_date(d)),
            Self::InvalidDate => serializer.serialize_str("Invalid Date"),
        }
    }
}

fn is_safe_integer(n: f64) -> bool {
    n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER
}

/// Natural text form of a number: integral values without a fraction,
/// `NaN`/`Infinity` spelled out
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if is_safe_integer(n) {
        #[allow(clippy::cast_possible_truncation)]
        let whole = n as i64;
        whole.to_string()
    } else {
        n.to_string()
    }
}

/// ISO-8601 form used for dates in rendered output, millisecond precision
#[must_use]
pub fn format_date(d: &NaiveDateTime) -> String {
    d.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_column_type_from_tag() {
        assert_eq!(ColumnType::from_tag("number"), Some(ColumnType::Number));
        assert_eq!(ColumnType::from_tag("string"), Some(ColumnType::String));
        assert_eq!(ColumnType::from_tag("boolean"), Some(ColumnType::Boolean));
        assert_eq!(ColumnType::from_tag("date"), Some(ColumnType::Date));
        assert_eq!(ColumnType::from_tag("currency"), None);
        assert_eq!(ColumnType::from_tag("int"), None);
    }

    #[test]
    fn test_column_type_display_round_trips_tag() {
        for ty in [
            ColumnType::Number,
            ColumnType::String,
            ColumnType::Boolean,
            ColumnType::Date,
        ] {
            assert_eq!(ColumnType::from_tag(&ty.to_string()), Some(ty));
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2006.0), "2006");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.99), "0.99");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_serialize_numbers() {
        let json = serde_json::to_value(ProjectedValue::Number(1.0)).unwrap();
        assert_eq!(json, serde_json::json!(1));

        let json = serde_json::to_value(ProjectedValue::Number(4.99)).unwrap();
        assert_eq!(json, serde_json::json!(4.99));

        let json = serde_json::to_value(ProjectedValue::Number(f64::NAN)).unwrap();
        assert_eq!(json, serde_json::json!("NaN"));
    }

    #[test]
    fn test_serialize_dates_and_null() {
        let d = NaiveDate::from_ymd_opt(2005, 5, 24)
            .unwrap()
            .and_hms_opt(22, 53, 30)
            .unwrap();
        let json = serde_json::to_value(ProjectedValue::Date(d)).unwrap();
        assert_eq!(json, serde_json::json!("2005-05-24T22:53:30.000Z"));

        let json = serde_json::to_value(ProjectedValue::InvalidDate).unwrap();
        assert_eq!(json, serde_json::json!("Invalid Date"));

        let json = serde_json::to_value(ProjectedValue::Null).unwrap();
        assert!(json.is_null());
    }

    #[test]
    fn test_sentinel_checks() {
        assert!(ProjectedValue::Number(f64::NAN).is_invalid_number());
        assert!(!ProjectedValue::Number(1.0).is_invalid_number());
        assert!(ProjectedValue::InvalidDate.is_invalid_date());
        assert_eq!(ProjectedValue::Text("x".into()).as_str(), Some("x"));
        assert_eq!(ProjectedValue::Boolean(true).as_bool(), Some(true));
    }
}
