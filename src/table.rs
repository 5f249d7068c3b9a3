/// TableKit Table Implementation
///
/// A Table is a named, ordered collection of uniquely named columns that all
/// have the same length. Row-level and column-level edits go through the
/// [`RowOperations`] and [`ColumnOperations`] facades; whole-table operations
/// (missing values, type detection, summaries) live here.
///
/// # Examples
///
/// ```
/// use tablekit::{Column, ColumnType, DetachedRow, Table};
///
/// let mut table = Table::new("users");
/// table.columns().append(Column::new("id", ColumnType::Integer)).unwrap();
/// table.columns().append(Column::new("name", ColumnType::String)).unwrap();
///
/// table.rows().append(DetachedRow::new().with("id", 1).with("name", "Alice")).unwrap();
/// table.rows().append(DetachedRow::new().with("id", 2)).unwrap();
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.get(0, "name").unwrap().as_str(), Some("Alice"));
/// assert_eq!(table.missing_count(), 1);
/// ```

use crate::column::Column;
use crate::column_ops::ColumnOperations;
use crate::config::TableOptions;
use crate::detect::guess_type;
use crate::error::{Result, TableError};
use crate::row::{Row, RowAccess, RowMut};
use crate::row_ops::RowOperations;
use crate::value::{ColumnType, ColumnValue};
use regex::Regex;
use std::fmt::Display;

#[derive(Clone)]
pub struct Table {
    pub(crate) name: String,
    pub(crate) columns: Vec<Column>,
    pub(crate) options: TableOptions,
}

impl Table {
    /// Create an empty table with default options.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, TableOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: TableOptions) -> Self {
        Table {
            name: name.into(),
            columns: Vec::new(),
            options,
        }
    }

    /// Build a table from ready-made columns.
    ///
    /// Names must be unique and every column must have the same length.
    pub fn from_columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let mut table = Table::new(name);
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: TableOptions) {
        self.options = options;
    }

    /// Number of rows, shared by every column.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    pub fn column_at(&self, index: usize) -> Result<&Column> {
        self.columns
            .get(index)
            .ok_or(TableError::ColumnIndexOutOfRange(index))
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    pub fn iter_columns(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    pub fn get(&self, row: usize, column: &str) -> Result<&ColumnValue> {
        self.column(column)?.get(row)
    }

    /// Value lookup by column position.
    pub fn get_at(&self, row: usize, column: usize) -> Result<&ColumnValue> {
        self.column_at(column)?.get(row)
    }

    pub fn set_value(&mut self, row: usize, column: &str, value: impl Into<ColumnValue>) -> Result<()> {
        let date_format = self.options.date_format.clone();
        self.column_mut(column)?
            .set_with_format(row, value.into(), &date_format)
    }

    pub fn row(&self, index: usize) -> Result<Row<'_>> {
        self.check_row(index)?;
        Ok(Row::new(self, index))
    }

    pub fn row_mut(&mut self, index: usize) -> Result<RowMut<'_>> {
        self.check_row(index)?;
        Ok(RowMut::new(self, index))
    }

    fn check_row(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(TableError::RowOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(())
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.len()).map(move |i| Row::new(self, i))
    }

    /// Row operation facade.
    pub fn rows(&mut self) -> RowOperations<'_> {
        RowOperations::new(self)
    }

    /// Column operation facade.
    pub fn columns(&mut self) -> ColumnOperations<'_> {
        ColumnOperations::new(self)
    }

    /// Visit every row in order.
    ///
    /// The row count is captured before the first call.
    pub fn for_each_row<'a, F>(&'a self, mut processor: F) -> Result<()>
    where
        F: FnMut(&Row<'a>) -> Result<()>,
    {
        self.assert_not_empty()?;
        for i in 0..self.len() {
            processor(&Row::new(self, i))?;
        }
        Ok(())
    }

    /// Visit every row in order with write access to its fields.
    ///
    /// The processor may change field values but not the row count.
    pub fn for_each_row_mut<F>(&mut self, mut processor: F) -> Result<()>
    where
        F: FnMut(&mut RowMut<'_>) -> Result<()>,
    {
        self.assert_not_empty()?;
        let size = self.len();
        for i in 0..size {
            processor(&mut RowMut::new(self, i))?;
        }
        Ok(())
    }

    /// Rows accepted by `filter`, leaving the table untouched.
    pub fn filter_rows<'a, F>(&'a self, mut filter: F) -> Result<Vec<Row<'a>>>
    where
        F: FnMut(&Row<'a>) -> Result<bool>,
    {
        let mut accepted = Vec::new();
        self.for_each_row(|row| {
            if filter(row)? {
                accepted.push(*row);
            }
            Ok(())
        })?;
        Ok(accepted)
    }

    /// Rows whose `column` text matches `pattern` as a whole.
    pub fn filter_rows_by_regex(&self, column: &str, pattern: &str) -> Result<Vec<Row<'_>>> {
        let regex = whole_match(pattern)?;
        self.column(column)?;
        self.filter_rows(|row| Ok(regex.is_match(&row.get_string(column)?)))
    }

    /// Append every row of `other`, matching columns by name.
    ///
    /// Columns `other` lacks are filled with missing values and columns only
    /// `other` has are ignored. A table without columns first adopts the
    /// structure of `other`.
    pub fn append_table(&mut self, other: &Table) -> Result<()> {
        if self.columns.is_empty() {
            self.columns = other.columns.iter().map(Column::clone_structure).collect();
        }

        let date_format = self.options.date_format.clone();
        let mut staged = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let values = match other.column(column.name()) {
                Ok(source) => source
                    .iter()
                    .map(|v| column.column_type().coerce(v.clone(), &date_format))
                    .collect::<Result<Vec<_>>>()?,
                Err(_) => vec![ColumnValue::Null; other.len()],
            };
            staged.push(values);
        }

        for (column, values) in self.columns.iter_mut().zip(staged) {
            for value in values {
                column.push(value);
            }
        }
        Ok(())
    }

    /// Total number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Sum over columns of each column's distinct present values.
    pub fn unique_values(&self) -> usize {
        self.columns.iter().map(Column::unique_count).sum()
    }

    /// Fill missing cells of every column with `value`.
    ///
    /// Nothing changes unless every column can hold `value`.
    pub fn fill_missings(&mut self, value: impl Into<ColumnValue>) -> Result<()> {
        let value = value.into();
        let date_format = self.options.date_format.clone();
        let staged = self
            .columns
            .iter()
            .map(|c| c.column_type().coerce(value.clone(), &date_format))
            .collect::<Result<Vec<_>>>()?;
        for (column, value) in self.columns.iter_mut().zip(staged) {
            column.fill_missing_with_format(value, &date_format)?;
        }
        Ok(())
    }

    pub fn replace_value(
        &mut self,
        old: impl Into<ColumnValue>,
        new: impl Into<ColumnValue>,
    ) -> Result<()> {
        self.replace_values(&[old.into()], &[new.into()])
    }

    /// Element-wise replacement applied to every column.
    pub fn replace_values(&mut self, old: &[ColumnValue], new: &[ColumnValue]) -> Result<()> {
        if old.len() != new.len() {
            return Err(TableError::ReplacementMismatch {
                old: old.len(),
                new: new.len(),
            });
        }
        let date_format = self.options.date_format.clone();
        for column in &self.columns {
            for value in new {
                column.column_type().coerce(value.clone(), &date_format)?;
            }
        }
        for column in &mut self.columns {
            column.replace_values_with_format(old, new, &date_format)?;
        }
        Ok(())
    }

    /// Empty table with the same columns, named `<name>:<suffix>`.
    pub fn clone_structure(&self, suffix: &str) -> Table {
        Table {
            name: format!("{}:{}", self.name, suffix),
            columns: self.columns.iter().map(Column::clone_structure).collect(),
            options: self.options.clone(),
        }
    }

    /// Re-run type detection on every column and convert columns whose
    /// detected type differs from the declared one.
    pub fn detect_types(&mut self) -> Result<()> {
        self.log("Detecting table types...");
        let date_format = self.options.date_format.clone();
        for i in 0..self.columns.len() {
            let detected = guess_type(&self.columns[i], &date_format);
            if detected != self.columns[i].column_type() {
                self.log(format_args!(
                    "  Update type of {} to {}...",
                    self.columns[i].name(),
                    detected
                ));
                self.columns[i] = self.columns[i].convert(detected, &date_format)?;
            }
        }
        self.log("Types updated.");
        Ok(())
    }

    /// One row per column: name, type, min, mean, max, missing and present counts.
    pub fn summary(&self) -> Result<Table> {
        let mut summary = Table::with_options(format!("{}:summary", self.name), self.options.clone());
        for name in ["column", "type", "min", "mean", "max"] {
            summary.push_column(Column::new(name, ColumnType::String))?;
        }
        for name in ["missings", "n"] {
            summary.push_column(Column::new(name, ColumnType::Integer))?;
        }

        let stat = |v: Option<f64>| v.map_or(ColumnValue::Null, |n| ColumnValue::Double(n).to_string().into());
        for column in &self.columns {
            let values = [
                ColumnValue::from(column.name()),
                ColumnValue::from(column.column_type().name()),
                stat(column.min()),
                stat(column.mean()),
                stat(column.max()),
                ColumnValue::Integer(column.missing_count() as i64),
                ColumnValue::Integer((column.len() - column.missing_count()) as i64),
            ];
            for (target, value) in summary.columns.iter_mut().zip(values) {
                target.push(value);
            }
        }
        Ok(summary)
    }

    /// Remove every column and row.
    pub fn clear(&mut self) {
        self.columns.clear();
    }

    pub(crate) fn assert_not_empty(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(TableError::EmptyTable(self.name.clone()));
        }
        Ok(())
    }

    /// Add a column, padding an empty column to the current row count.
    pub(crate) fn push_column(&mut self, mut column: Column) -> Result<()> {
        if self.column_index(column.name()).is_some() {
            return Err(TableError::DuplicateColumn(column.name().to_string()));
        }
        if !self.columns.is_empty() && column.len() != self.len() {
            if !column.is_empty() {
                return Err(TableError::LengthMismatch {
                    column: column.name().to_string(),
                    expected: self.len(),
                    actual: column.len(),
                });
            }
            for _ in 0..self.len() {
                column.append_missing();
            }
        }
        self.columns.push(column);
        Ok(())
    }

    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            column.retain_rows(keep);
        }
    }

    pub(crate) fn reorder_rows(&mut self, order: &[usize]) {
        for column in &mut self.columns {
            column.reorder(order);
        }
    }

    /// Diagnostic message, emitted only when tracing is enabled for this table.
    pub(crate) fn log(&self, message: impl Display) {
        if self.options.trace {
            log::info!("{}: {}", self.name, message);
        }
    }
}

/// Compile `pattern` so that it must match the whole input.
pub(crate) fn whole_match(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{})$", pattern))?)
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Table {{ name: '{}', columns: {}, rows: {} }}",
            self.name,
            self.columns.len(),
            self.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::DetachedRow;

    fn dummy() -> Table {
        Table::from_columns(
            "dummy",
            vec![
                Column::from_values("id", ColumnType::Integer, vec![0, 1, 2]).unwrap(),
                Column::from_values("a", ColumnType::String, vec!["x", "y", "z"]).unwrap(),
                Column::from_values("b", ColumnType::String, vec![Some("p"), None, Some("r")])
                    .unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_table_basic() {
        let table = dummy();
        assert_eq!(table.len(), 3);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.column_names(), vec!["id", "a", "b"]);
        assert_eq!(table.get(1, "id").unwrap().as_integer(), Some(1));
        assert_eq!(table.get_at(2, 1).unwrap().as_str(), Some("z"));
        assert!(matches!(table.get(0, "nope"), Err(TableError::ColumnNotFound(_))));
        assert!(matches!(
            table.get_at(0, 7),
            Err(TableError::ColumnIndexOutOfRange(7))
        ));
        assert!(matches!(
            table.row(3),
            Err(TableError::RowOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_from_columns_validates_shape() {
        let result = Table::from_columns(
            "bad",
            vec![
                Column::from_values("x", ColumnType::Integer, vec![1, 2]).unwrap(),
                Column::from_values("y", ColumnType::Integer, vec![1]).unwrap(),
            ],
        );
        assert!(matches!(result, Err(TableError::LengthMismatch { .. })));

        let result = Table::from_columns(
            "dup",
            vec![Column::new("x", ColumnType::Integer), Column::new("x", ColumnType::Integer)],
        );
        assert!(matches!(result, Err(TableError::DuplicateColumn(_))));
    }

    #[test]
    fn test_for_each_row_requires_columns() {
        let table = Table::new("empty");
        let result = table.for_each_row(|_| Ok(()));
        assert!(matches!(result, Err(TableError::EmptyTable(_))));
    }

    #[test]
    fn test_for_each_row_mut() {
        let mut table = dummy();
        table
            .for_each_row_mut(|row| {
                let id = row.get_integer("id")?.unwrap_or(0);
                row.set("id", id * 10)
            })
            .unwrap();
        let ids: Vec<i64> = table
            .column("id")
            .unwrap()
            .iter()
            .filter_map(ColumnValue::as_integer)
            .collect();
        assert_eq!(ids, vec![0, 10, 20]);
    }

    #[test]
    fn test_filter_rows_leaves_table() {
        let table = dummy();
        let rows = table
            .filter_rows(|row| Ok(row.get_string("a")? == "z"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index(), 2);
        assert_eq!(table.len(), 3);

        let rows = table.filter_rows_by_regex("a", "y|z").unwrap();
        assert_eq!(rows.len(), 2);
        // whole-string semantics
        assert!(table.filter_rows_by_regex("a", "").unwrap().is_empty());
        assert!(matches!(
            table.filter_rows_by_regex("a", "("),
            Err(TableError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_missing_and_unique_counts() {
        let mut table = dummy();
        assert_eq!(table.missing_count(), 1);
        assert_eq!(table.unique_values(), 3 + 3 + 2);

        // "q" does not fit the integer id column
        assert!(table.fill_missings("q").is_err());
        assert_eq!(table.missing_count(), 1);

        table.columns().drop("id").unwrap();
        table.fill_missings("q").unwrap();
        assert_eq!(table.missing_count(), 0);
        table.replace_value("q", ColumnValue::Null).unwrap();
        assert_eq!(table.missing_count(), 1);
    }

    #[test]
    fn test_fill_missings_is_atomic() {
        let mut table = dummy();
        table
            .columns()
            .append(Column::from_values("d", ColumnType::Date, vec![ColumnValue::Null, ColumnValue::Null, ColumnValue::Null]).unwrap())
            .unwrap();
        assert!(table.fill_missings("n/a").is_err());
        assert_eq!(table.missing_count(), 4);
    }

    #[test]
    fn test_append_table() {
        let mut table = dummy();
        let mut other = Table::new("other");
        other
            .columns()
            .append(Column::from_values("id", ColumnType::String, vec!["7"]).unwrap())
            .unwrap();
        table.append_table(&other).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(3, "id").unwrap().as_integer(), Some(7));
        assert!(table.get(3, "a").unwrap().is_null());

        let mut empty = Table::new("fresh");
        empty.append_table(&table).unwrap();
        assert_eq!(empty.column_count(), 3);
        assert_eq!(empty.len(), 4);
    }

    #[test]
    fn test_clone_structure_and_clone() {
        let table = dummy();
        let structure = table.clone_structure("copy");
        assert_eq!(structure.name(), "dummy:copy");
        assert_eq!(structure.column_count(), 3);
        assert_eq!(structure.len(), 0);

        let mut copy = table.clone();
        copy.set_value(0, "a", "changed").unwrap();
        assert_eq!(table.get(0, "a").unwrap().as_str(), Some("x"));
    }

    #[test]
    fn test_detect_types() {
        let mut table = Table::from_columns(
            "raw",
            vec![
                Column::from_values("n", ColumnType::String, vec!["1", "2"]).unwrap(),
                Column::from_values("d", ColumnType::String, vec![Some("0.5"), None]).unwrap(),
                Column::from_values("s", ColumnType::String, vec!["a", "1"]).unwrap(),
            ],
        )
        .unwrap();
        table.detect_types().unwrap();
        assert_eq!(table.column("n").unwrap().column_type(), ColumnType::Integer);
        assert_eq!(table.column("d").unwrap().column_type(), ColumnType::Double);
        assert_eq!(table.column("s").unwrap().column_type(), ColumnType::String);
        assert_eq!(table.column("d").unwrap().missing_count(), 1);
    }

    #[test]
    fn test_summary() {
        let table = dummy();
        let summary = table.summary().unwrap();
        assert_eq!(summary.len(), 3);
        assert_eq!(summary.column_count(), 7);
        assert_eq!(summary.get(0, "type").unwrap().as_str(), Some("INTEGER"));
        assert_eq!(summary.get(0, "max").unwrap().as_str(), Some("2.0"));
        assert!(summary.get(1, "min").unwrap().is_null());
        assert_eq!(summary.get(2, "n").unwrap().as_integer(), Some(2));
        assert_eq!(summary.get(2, "missings").unwrap().as_integer(), Some(1));
    }

    #[test]
    fn test_set_value_uses_table_date_format() {
        let options = TableOptions::default().with_date_format("%d.%m.%Y");
        let mut table = Table::with_options("dates", options);
        table
            .columns()
            .append(Column::new("when", ColumnType::Date))
            .unwrap();
        table.rows().append(DetachedRow::new()).unwrap();
        table.set_value(0, "when", "24.12.2020").unwrap();
        assert_eq!(
            table.row(0).unwrap().get_date("when").unwrap(),
            chrono::NaiveDate::from_ymd_opt(2020, 12, 24)
        );
    }
}
