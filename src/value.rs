/// TableKit scalar values and column types.
///
/// `ColumnValue` is the currency of every row and column operation. It is
/// hashable (doubles hash by bit pattern through `OrderedFloat`) so it can key
/// groups and join indexes, and totally ordered so it can drive sorting.

use crate::config::DEFAULT_DATE_FORMAT;
use crate::error::{Result, TableError};
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Integer,
    Double,
    Boolean,
    Date,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Double)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::String => "STRING",
            ColumnType::Integer => "INTEGER",
            ColumnType::Double => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
        }
    }

    /// The type a present value naturally belongs to. `None` for missing values.
    pub fn of(value: &ColumnValue) -> Option<ColumnType> {
        match value {
            ColumnValue::String(_) => Some(ColumnType::String),
            ColumnValue::Integer(_) => Some(ColumnType::Integer),
            ColumnValue::Double(_) => Some(ColumnType::Double),
            ColumnValue::Boolean(_) => Some(ColumnType::Boolean),
            ColumnValue::Date(_) => Some(ColumnType::Date),
            ColumnValue::Null => None,
        }
    }

    /// Parse raw text into a value of this type.
    ///
    /// Surrounding whitespace is ignored for every type except String.
    /// Doubles must be finite.
    pub fn parse(&self, raw: &str, date_format: &str) -> Result<ColumnValue> {
        let trimmed = raw.trim();
        let parsed = match self {
            ColumnType::String => Some(ColumnValue::String(raw.to_string())),
            ColumnType::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Some(ColumnValue::Boolean(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Some(ColumnValue::Boolean(false))
                } else {
                    None
                }
            }
            ColumnType::Integer => trimmed.parse::<i64>().ok().map(ColumnValue::Integer),
            ColumnType::Double => trimmed
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite())
                .map(ColumnValue::Double),
            ColumnType::Date => NaiveDate::parse_from_str(trimmed, date_format)
                .ok()
                .map(ColumnValue::Date),
        };

        parsed.ok_or_else(|| TableError::ValueConversion {
            value: raw.to_string(),
            target: *self,
        })
    }

    /// Convert a value so it can be stored in a column of this type.
    ///
    /// Missing values pass through, integers widen to doubles, integral doubles
    /// narrow to integers, anything formats to a string and strings are parsed.
    pub fn coerce(&self, value: ColumnValue, date_format: &str) -> Result<ColumnValue> {
        match (self, value) {
            (_, ColumnValue::Null) => Ok(ColumnValue::Null),
            (ColumnType::String, ColumnValue::String(s)) => Ok(ColumnValue::String(s)),
            (ColumnType::String, other) => Ok(ColumnValue::String(other.to_text(date_format)?)),
            (ColumnType::Integer, v @ ColumnValue::Integer(_)) => Ok(v),
            (ColumnType::Integer, ColumnValue::Double(d))
                if d.fract() == 0.0 && d >= i64::MIN as f64 && d < i64::MAX as f64 =>
            {
                Ok(ColumnValue::Integer(d as i64))
            }
            (ColumnType::Double, v @ ColumnValue::Double(_)) => Ok(v),
            (ColumnType::Double, ColumnValue::Integer(i)) => Ok(ColumnValue::Double(i as f64)),
            (ColumnType::Boolean, v @ ColumnValue::Boolean(_)) => Ok(v),
            (ColumnType::Date, v @ ColumnValue::Date(_)) => Ok(v),
            (target, ColumnValue::String(s)) => target.parse(&s, date_format),
            (target, other) => Err(TableError::ValueConversion {
                value: other.to_string(),
                target: *target,
            }),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column value enum to support multiple types
#[derive(Debug, Clone)]
pub enum ColumnValue {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ColumnValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            ColumnValue::Integer(v) => Some(*v as f64),
            ColumnValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ColumnValue::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Text form used by writers. Missing values become the empty string.
    ///
    /// Fails only when `date_format` cannot render a Date.
    pub fn to_text(&self, date_format: &str) -> Result<String> {
        match self {
            ColumnValue::Date(d) => {
                let mut out = String::new();
                write!(out, "{}", d.format(date_format)).map_err(|_| {
                    TableError::ValueConversion {
                        value: d.to_string(),
                        target: ColumnType::String,
                    }
                })?;
                Ok(out)
            }
            other => Ok(other.to_string()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            ColumnValue::Null => 0,
            ColumnValue::Boolean(_) => 1,
            ColumnValue::Integer(_) | ColumnValue::Double(_) => 2,
            ColumnValue::Date(_) => 3,
            ColumnValue::String(_) => 4,
        }
    }
}

impl PartialEq for ColumnValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ColumnValue::String(a), ColumnValue::String(b)) => a == b,
            (ColumnValue::Integer(a), ColumnValue::Integer(b)) => a == b,
            (ColumnValue::Double(a), ColumnValue::Double(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (ColumnValue::Boolean(a), ColumnValue::Boolean(b)) => a == b,
            (ColumnValue::Date(a), ColumnValue::Date(b)) => a == b,
            (ColumnValue::Null, ColumnValue::Null) => true,
            _ => false,
        }
    }
}

impl Eq for ColumnValue {}

impl Hash for ColumnValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ColumnValue::String(v) => v.hash(state),
            ColumnValue::Integer(v) => v.hash(state),
            ColumnValue::Double(v) => OrderedFloat(*v).hash(state),
            ColumnValue::Boolean(v) => v.hash(state),
            ColumnValue::Date(v) => v.hash(state),
            ColumnValue::Null => {}
        }
    }
}

/// Missing values sort before everything. Integers and doubles compare
/// numerically (an integer precedes an equal double); other mixed types order
/// by kind.
impl Ord for ColumnValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ColumnValue::String(a), ColumnValue::String(b)) => a.cmp(b),
            (ColumnValue::Integer(a), ColumnValue::Integer(b)) => a.cmp(b),
            (ColumnValue::Double(a), ColumnValue::Double(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            (ColumnValue::Integer(a), ColumnValue::Double(b)) => OrderedFloat(*a as f64)
                .cmp(&OrderedFloat(*b))
                .then(Ordering::Less),
            (ColumnValue::Double(a), ColumnValue::Integer(b)) => OrderedFloat(*a)
                .cmp(&OrderedFloat(*b as f64))
                .then(Ordering::Greater),
            (ColumnValue::Boolean(a), ColumnValue::Boolean(b)) => a.cmp(b),
            (ColumnValue::Date(a), ColumnValue::Date(b)) => a.cmp(b),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl PartialOrd for ColumnValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::String(v) => f.write_str(v),
            ColumnValue::Integer(v) => write!(f, "{}", v),
            // Debug keeps the decimal point (`5.0`) so the text re-parses as a double
            ColumnValue::Double(v) => write!(f, "{:?}", v),
            ColumnValue::Boolean(v) => write!(f, "{}", v),
            ColumnValue::Date(v) => write!(f, "{}", v.format(DEFAULT_DATE_FORMAT)),
            ColumnValue::Null => Ok(()),
        }
    }
}

impl Serialize for ColumnValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ColumnValue::String(v) => serializer.serialize_str(v),
            ColumnValue::Integer(v) => serializer.serialize_i64(*v),
            ColumnValue::Double(v) => serializer.serialize_f64(*v),
            ColumnValue::Boolean(v) => serializer.serialize_bool(*v),
            ColumnValue::Date(v) => serializer.collect_str(&v.format(DEFAULT_DATE_FORMAT)),
            ColumnValue::Null => serializer.serialize_none(),
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::String(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::String(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Integer(value)
    }
}

impl From<i32> for ColumnValue {
    fn from(value: i32) -> Self {
        ColumnValue::Integer(value as i64)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        ColumnValue::Double(value)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Boolean(value)
    }
}

impl From<NaiveDate> for ColumnValue {
    fn from(value: NaiveDate) -> Self {
        ColumnValue::Date(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ColumnValue::Null, Into::into)
    }
}
