/// Row access for TableKit.
///
/// A row is either *attached*, a transient view of one index inside a
/// [`Table`] (`Row` for reading, `RowMut` for writing), or *detached*, an
/// owned bag of named values used to stage a new row before it is appended.
/// All three share the [`RowAccess`] read contract, so filters, mappers and
/// value builders can be written once against it.

use crate::config::DEFAULT_DATE_FORMAT;
use crate::error::{Result, TableError};
use crate::table::Table;
use crate::value::{ColumnType, ColumnValue};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Typed read access to the fields of a row.
pub trait RowAccess {
    /// Raw value of a field. Unknown columns are an error.
    fn value(&self, column: &str) -> Result<&ColumnValue>;

    fn is_missing(&self, column: &str) -> Result<bool> {
        Ok(self.value(column)?.is_null())
    }

    /// Format used to read dates as text.
    fn date_format(&self) -> &str {
        DEFAULT_DATE_FORMAT
    }

    /// Text form of a field; missing values read as the empty string.
    fn get_string(&self, column: &str) -> Result<String> {
        self.value(column)?.to_text(self.date_format())
    }

    fn get_integer(&self, column: &str) -> Result<Option<i64>> {
        typed(self.value(column)?, ColumnType::Integer, ColumnValue::as_integer)
    }

    /// Integers widen to doubles.
    fn get_double(&self, column: &str) -> Result<Option<f64>> {
        typed(self.value(column)?, ColumnType::Double, ColumnValue::as_double)
    }

    fn get_bool(&self, column: &str) -> Result<Option<bool>> {
        typed(self.value(column)?, ColumnType::Boolean, ColumnValue::as_bool)
    }

    fn get_date(&self, column: &str) -> Result<Option<NaiveDate>> {
        typed(self.value(column)?, ColumnType::Date, ColumnValue::as_date)
    }
}

fn typed<T>(
    value: &ColumnValue,
    target: ColumnType,
    extract: impl Fn(&ColumnValue) -> Option<T>,
) -> Result<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    extract(value)
        .map(Some)
        .ok_or_else(|| TableError::ValueConversion {
            value: value.to_string(),
            target,
        })
}

/// Read-only view of one row of a table.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    pub(crate) fn new(table: &'a Table, index: usize) -> Self {
        Row { table, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn get(&self, column: &str) -> Result<&'a ColumnValue> {
        self.table.get(self.index, column)
    }

    pub fn get_at(&self, column: usize) -> Result<&'a ColumnValue> {
        self.table.get_at(self.index, column)
    }

    /// Ordered values of every column.
    pub fn values(&self) -> Vec<&'a ColumnValue> {
        self.table
            .iter_columns()
            .map(|column| &column.values()[self.index])
            .collect()
    }

    /// Copy the row out of the table.
    pub fn to_detached(&self) -> DetachedRow {
        let mut row = DetachedRow::new();
        for column in self.table.iter_columns() {
            row.set(column.name(), column.values()[self.index].clone());
        }
        row
    }
}

impl RowAccess for Row<'_> {
    fn value(&self, column: &str) -> Result<&ColumnValue> {
        self.get(column)
    }

    fn date_format(&self) -> &str {
        &self.table.options().date_format
    }
}

/// Writable view of one row of a table.
///
/// Writes go straight to the columns and are coerced to each column's type.
#[derive(Debug)]
pub struct RowMut<'a> {
    table: &'a mut Table,
    index: usize,
}

impl<'a> RowMut<'a> {
    pub(crate) fn new(table: &'a mut Table, index: usize) -> Self {
        RowMut { table, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set(&mut self, column: &str, value: impl Into<ColumnValue>) -> Result<()> {
        self.table.set_value(self.index, column, value)
    }

    /// Copy every field of `source` whose column exists in this row's table.
    pub fn fill(&mut self, source: &impl RowAccess) -> Result<()> {
        let names: Vec<String> = self
            .table
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        for name in names {
            match source.value(&name) {
                Ok(value) => self.set(&name, value.clone())?,
                Err(TableError::ColumnNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn as_row(&self) -> Row<'_> {
        Row::new(self.table, self.index)
    }
}

impl RowAccess for RowMut<'_> {
    fn value(&self, column: &str) -> Result<&ColumnValue> {
        self.table.get(self.index, column)
    }

    fn date_format(&self) -> &str {
        &self.table.options().date_format
    }
}

/// A free-standing row staged for insertion.
///
/// ```
/// use tablekit::{DetachedRow, RowAccess};
///
/// let mut row = DetachedRow::new();
/// row.set("id", 5).set("name", "five");
/// assert_eq!(row.get_integer("id").unwrap(), Some(5));
/// assert!(row.value("other").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetachedRow {
    values: HashMap<String, ColumnValue>,
}

impl DetachedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> &mut Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Builder form of [`DetachedRow::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.values.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl RowAccess for DetachedRow {
    fn value(&self, column: &str) -> Result<&ColumnValue> {
        self.values
            .get(column)
            .ok_or_else(|| TableError::ColumnNotFound(column.to_string()))
    }
}

impl From<HashMap<String, ColumnValue>> for DetachedRow {
    fn from(values: HashMap<String, ColumnValue>) -> Self {
        DetachedRow { values }
    }
}
