/// Error type shared by every table operation.
///
/// Validation errors (unknown columns, empty tables, shape mismatches) are
/// raised before any mutation starts, so a returned error never leaves a
/// table with columns of different lengths.

use crate::value::ColumnType;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("column index {0} out of range")]
    ColumnIndexOutOfRange(usize),

    #[error("row {index} out of range [0, {len})")]
    RowOutOfRange { index: usize, len: usize },

    #[error("table '{0}' has no columns")]
    EmptyTable(String),

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("column '{column}' has {actual} values, table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: ColumnType,
        actual: ColumnType,
    },

    #[error("cannot convert '{value}' to {target}")]
    ValueConversion { value: String, target: ColumnType },

    #[error("replacement lists differ in length: {old} old values, {new} new values")]
    ReplacementMismatch { old: usize, new: usize },

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("integer sum of column '{0}' overflows")]
    IntegerOverflow(String),

    #[error("invalid bin size {0}")]
    InvalidBinSize(f64),

    #[error("record {record} has {actual} fields, header has {expected}")]
    RecordLength {
        record: usize,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = TableError> = std::result::Result<T, E>;
