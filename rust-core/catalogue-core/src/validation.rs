//! # Validation Module
//!
//! Structured reports of values the projector could only coerce to a
//! sentinel. Used by the strict projection mode and for diagnostics.

use serde::Serialize;
use std::collections::BTreeMap;

/// Error code for categorizing soft failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Declared column is absent from the row
    MissingColumn,
    /// Value could not be parsed as a number
    InvalidNumber,
    /// Value could not be parsed as a date
    InvalidDate,
}

/// A single soft failure for one cell
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Zero-based index of the row in the input sequence
    pub row: usize,
    /// Column name
    pub column: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl FieldError {
    /// Create a new field error
    pub fn new(
        row: usize,
        column: impl Into<String>,
        message: impl Into<String>,
        code: ValidationCode,
    ) -> Self {
        Self {
            row,
            column: column.into(),
            message: message.into(),
            code,
        }
    }

    /// Create a "missing column" error
    pub fn missing_column(row: usize, column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            message: format!("row {row}: column {column} is missing"),
            column,
            row,
            code: ValidationCode::MissingColumn,
        }
    }

    /// Create an "invalid number" error
    pub fn invalid_number(row: usize, column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            message: format!("row {row}: {column} is not a number"),
            column,
            row,
            code: ValidationCode::InvalidNumber,
        }
    }

    /// Create an "invalid date" error
    pub fn invalid_date(row: usize, column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            message: format!("row {row}: {column} is not a valid date"),
            column,
            row,
            code: ValidationCode::InvalidDate,
        }
    }
}

/// Collection of soft failures over a batch of rows
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    /// List of cell-level errors, in row then schema order
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field error
    pub fn add(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The first error, if any
    #[must_use]
    pub fn first(&self) -> Option<&FieldError> {
        self.errors.first()
    }

    /// Convert to a JSON document
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"errors":[]}"#.to_string())
    }

    /// Group errors by column
    #[must_use]
    pub fn by_column(&self) -> BTreeMap<&str, Vec<&FieldError>> {
        let mut map: BTreeMap<&str, Vec<&FieldError>> = BTreeMap::new();
        for error in &self.errors {
            map.entry(error.column.as_str()).or_default().push(error);
        }
        map
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "no projection errors"),
            [only] => f.write_str(&only.message),
            [first, rest @ ..] => write!(f, "{} (and {} more)", first.message, rest.len()),
        }
    }
}

impl std::error::Error for ValidationErrors {}

/// Result type for strict projection
pub type ValidationResult<T> = std::result::Result<T, ValidationErrors>;
