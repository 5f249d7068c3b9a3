/// Column type detection.
///
/// Every present value is examined through its text form and the first type
/// in [`DETECTION_ORDER`] that parses all of them wins. String always parses,
/// so it is the fallback. Numbers written with a `+` sign or redundant
/// leading zeros (`007`) would not format back to the same text, so they
/// keep the column a string. Because typed values format to text their own type
/// parses back (`5.0` stays a double), running detection on an already typed
/// column leaves it unchanged.

use crate::column::Column;
use crate::value::ColumnType;

/// Candidate types, most restrictive first.
pub const DETECTION_ORDER: [ColumnType; 5] = [
    ColumnType::Boolean,
    ColumnType::Integer,
    ColumnType::Double,
    ColumnType::Date,
    ColumnType::String,
];

/// Narrowest type every present value of `column` parses to.
///
/// A column without any present value keeps its declared type.
pub fn guess_type(column: &Column, date_format: &str) -> ColumnType {
    let texts: Vec<String> = column
        .iter()
        .filter(|v| !v.is_null())
        .filter_map(|v| v.to_text(date_format).ok())
        .collect();

    if texts.is_empty() {
        return column.column_type();
    }

    guess_type_of(texts.iter().map(String::as_str), date_format)
}

/// Narrowest type every raw value parses to.
pub fn guess_type_of<'a, I>(values: I, date_format: &str) -> ColumnType
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    DETECTION_ORDER
        .iter()
        .copied()
        .find(|candidate| {
            values
                .clone()
                .into_iter()
                .all(|raw| keeps_text(*candidate, raw) && candidate.parse(raw, date_format).is_ok())
        })
        .unwrap_or(ColumnType::String)
}

/// Whether `raw` read as `candidate` formats back to the same digits.
fn keeps_text(candidate: ColumnType, raw: &str) -> bool {
    if !candidate.is_numeric() {
        return true;
    }
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let padded = digits.len() > 1
        && digits.starts_with('0')
        && digits[1..].starts_with(|c: char| c.is_ascii_digit());
    !trimmed.starts_with('+') && !padded
}
