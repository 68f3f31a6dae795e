//! # Row Projection
//!
//! Shapes raw query rows into typed, ordered records according to a
//! declared column schema.
//!
//! Projection is lenient: a value that cannot be coerced becomes a sentinel
//! (`NaN` or an invalid date) instead of failing the batch, and a declared
//! column missing from a row becomes null. The only hard error is a schema
//! naming an unknown type tag, which is caught when the schema is built.
//! [`project_strict`] and [`audit`] report the soft failures for callers that
//! want them.

use crate::database::{DbValue, RawRow};
use crate::error::{Error, Result};
use crate::types::{format_date, format_number, ColumnType, ProjectedValue};
use crate::validation::{FieldError, ValidationErrors, ValidationResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered mapping from column name to declared type
///
/// Treat a built schema as read-only configuration; it is shared freely
/// between concurrent projections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<(String, ColumnType)>,
}

impl ColumnSchema {
    /// Create an empty schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column (builder style)
    ///
    /// Redeclaring a column changes its type but keeps its position.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.insert(name.into(), column_type);
        self
    }

    /// Build a schema from `(column, tag)` pairs
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownColumnType` for the first tag that is not
    /// `number`, `string`, `boolean` or `date`.
    pub fn from_tags<I, K, V>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut schema = Self::new();
        for (column, tag) in tags {
            let (column, tag) = (column.as_ref(), tag.as_ref());
            let column_type =
                ColumnType::from_tag(tag).ok_or_else(|| Error::UnknownColumnType {
                    column: column.to_string(),
                    tag: tag.to_string(),
                })?;
            schema.insert(column.to_string(), column_type);
        }
        Ok(schema)
    }

    fn insert(&mut self, name: String, column_type: ColumnType) {
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = column_type,
            None => self.columns.push((name, column_type)),
        }
    }

    /// Declared type of a column
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, column_type)| *column_type)
    }

    /// Columns in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns
            .iter()
            .map(|(name, column_type)| (name.as_str(), *column_type))
    }

    /// Number of declared columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if no columns are declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One row after projection, fields in schema order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedRecord {
    fields: Vec<(String, ProjectedValue)>,
}

impl ProjectedRecord {
    /// Value of a field
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProjectedValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Field names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProjectedValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ProjectedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Project every row, preserving row order
pub fn project(rows: &[RawRow], schema: &ColumnSchema) -> Vec<ProjectedRecord> {
    rows.iter().map(|row| project_row(row, schema)).collect()
}

/// Project a single row
///
/// Columns outside the schema are dropped; missing columns become null.
pub fn project_row(row: &RawRow, schema: &ColumnSchema) -> ProjectedRecord {
    let fields = schema
        .iter()
        .map(|(name, column_type)| {
            let value = row
                .get(name)
                .map_or(ProjectedValue::Null, |raw| coerce(raw, column_type));
            (name.to_string(), value)
        })
        .collect();
    ProjectedRecord { fields }
}

/// Parse `(column, tag)` pairs and project in one call
///
/// # Errors
///
/// Returns `Error::UnknownColumnType` before looking at any row if a tag is
/// not recognised.
pub fn project_tagged<I, K, V>(rows: &[RawRow], tags: I) -> Result<Vec<ProjectedRecord>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let schema = ColumnSchema::from_tags(tags)?;
    Ok(project(rows, &schema))
}

/// List every cell the lenient projection would degrade
pub fn audit(rows: &[RawRow], schema: &ColumnSchema) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for (index, row) in rows.iter().enumerate() {
        for (name, column_type) in schema.iter() {
            let Some(raw) = row.get(name) else {
                errors.add(FieldError::missing_column(index, name));
                continue;
            };
            match coerce(raw, column_type) {
                value if value.is_invalid_number() => {
                    errors.add(FieldError::invalid_number(index, name));
                }
                ProjectedValue::InvalidDate => {
                    errors.add(FieldError::invalid_date(index, name));
                }
                _ => {}
            }
        }
    }
    errors
}

/// Project, failing the whole batch if any cell would degrade
///
/// # Errors
///
/// Returns every soft failure found by [`audit`].
pub fn project_strict(
    rows: &[RawRow],
    schema: &ColumnSchema,
) -> ValidationResult<Vec<ProjectedRecord>> {
    let errors = audit(rows, schema);
    if errors.is_empty() {
        Ok(project(rows, schema))
    } else {
        Err(errors)
    }
}

/// Coerce one raw value to a declared type
///
/// Null stays null for every type.
pub fn coerce(value: &DbValue, column_type: ColumnType) -> ProjectedValue {
    if value.is_null() {
        return ProjectedValue::Null;
    }
    match column_type {
        ColumnType::Number => ProjectedValue::Number(to_number(value)),
        ColumnType::String => ProjectedValue::Text(to_text(value)),
        ColumnType::Boolean => ProjectedValue::Boolean(to_boolean(value)),
        ColumnType::Date => to_date(value),
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_number(value: &DbValue) -> f64 {
    match value {
        DbValue::Null => f64::NAN,
        DbValue::Int(i) => *i as f64,
        DbValue::Float(f) => *f,
        DbValue::Bool(b) => f64::from(u8::from(*b)),
        DbValue::String(s) => parse_number(s),
        DbValue::Bytes(b) => parse_number(&String::from_utf8_lossy(b)),
        DbValue::Date(d) => epoch_millis(&midnight(*d)) as f64,
        DbValue::DateTime(dt) => epoch_millis(dt) as f64,
    }
}

fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    match text {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => text
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(f64::NAN),
    }
}

fn to_text(value: &DbValue) -> String {
    match value {
        DbValue::Null => String::new(),
        DbValue::Int(i) => i.to_string(),
        DbValue::Float(f) => format_number(*f),
        DbValue::Bool(b) => b.to_string(),
        DbValue::String(s) => s.clone(),
        DbValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        DbValue::Date(d) => format_date(&midnight(*d)),
        DbValue::DateTime(dt) => format_date(dt),
    }
}

fn to_boolean(value: &DbValue) -> bool {
    match value {
        DbValue::Null => false,
        DbValue::Int(i) => *i != 0,
        DbValue::Float(f) => *f != 0.0 && !f.is_nan(),
        DbValue::Bool(b) => *b,
        DbValue::String(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        DbValue::Bytes(b) => !b.is_empty(),
        DbValue::Date(_) | DbValue::DateTime(_) => true,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_date(value: &DbValue) -> ProjectedValue {
    let parsed = match value {
        DbValue::Date(d) => Some(midnight(*d)),
        DbValue::DateTime(dt) => Some(*dt),
        DbValue::String(s) => parse_date(s),
        DbValue::Bytes(b) => parse_date(&String::from_utf8_lossy(b)),
        DbValue::Int(ms) => from_epoch_millis(*ms),
        DbValue::Float(ms) if ms.is_finite() => from_epoch_millis(ms.trunc() as i64),
        DbValue::Float(_) | DbValue::Bool(_) | DbValue::Null => None,
    };
    parsed.map_or(ProjectedValue::InvalidDate, ProjectedValue::Date)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .map(midnight)
        })
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn epoch_millis(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

fn from_epoch_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}
