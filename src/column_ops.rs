/// Column operations on a table: add, drop, select, rename and retype.
///
/// Column operations never change the row count.

use crate::column::Column;
use crate::error::{Result, TableError};
use crate::row::Row;
use crate::table::{whole_match, Table};
use crate::value::{ColumnType, ColumnValue};

pub struct ColumnOperations<'a> {
    table: &'a mut Table,
}

impl<'a> ColumnOperations<'a> {
    pub(crate) fn new(table: &'a mut Table) -> Self {
        ColumnOperations { table }
    }

    pub fn len(&self) -> usize {
        self.table.column_count()
    }

    pub fn is_empty(&self) -> bool {
        self.table.column_count() == 0
    }

    pub fn names(&self) -> Vec<&str> {
        self.table.column_names()
    }

    pub fn get(&self, name: &str) -> Result<&Column> {
        self.table.column(name)
    }

    pub fn get_at(&self, index: usize) -> Result<&Column> {
        self.table.column_at(index)
    }

    /// Add `column` at the end.
    ///
    /// An empty column added to a populated table is padded with missing values.
    pub fn append(&mut self, column: Column) -> Result<()> {
        self.table.push_column(column)
    }

    /// Add `column`, computing each row's value from the existing row.
    ///
    /// Any values already in `column` are discarded. The builder runs for every
    /// row before the column is attached, so it only sees the old columns.
    pub fn append_with<F>(&mut self, mut column: Column, mut builder: F) -> Result<()>
    where
        F: FnMut(&Row<'_>) -> Result<ColumnValue>,
    {
        if self.table.column_index(column.name()).is_some() {
            return Err(TableError::DuplicateColumn(column.name().to_string()));
        }
        column.clear();

        let date_format = self.table.options.date_format.clone();
        for row in self.table.iter_rows() {
            column.append_with_format(builder(&row)?, &date_format)?;
        }
        self.table.push_column(column)
    }

    /// Remove a column and hand it back.
    pub fn drop(&mut self, name: &str) -> Result<Column> {
        let index = self
            .table
            .column_index(name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))?;
        Ok(self.table.columns.remove(index))
    }

    /// Remove several columns. Every name must exist.
    pub fn drop_many(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            self.table.column(name)?;
        }
        self.table.columns.retain(|c| !names.contains(&c.name()));
        Ok(())
    }

    /// Remove every column whose name matches `pattern` as a whole.
    pub fn drop_by_regex(&mut self, pattern: &str) -> Result<usize> {
        let regex = whole_match(pattern)?;
        let before = self.table.columns.len();
        self.table.columns.retain(|c| !regex.is_match(c.name()));
        Ok(before - self.table.columns.len())
    }

    /// Restrict the table to `names`, in their current order.
    pub fn select(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            self.table.column(name)?;
        }
        self.table.columns.retain(|c| names.contains(&c.name()));
        Ok(())
    }

    /// Keep only the columns whose name matches `pattern` as a whole.
    pub fn select_by_regex(&mut self, pattern: &str) -> Result<usize> {
        let regex = whole_match(pattern)?;
        let before = self.table.columns.len();
        self.table.columns.retain(|c| regex.is_match(c.name()));
        Ok(before - self.table.columns.len())
    }

    /// Convert a column to `column_type`. Fails without change if any value
    /// cannot be converted.
    pub fn set_type(&mut self, name: &str, column_type: ColumnType) -> Result<()> {
        let date_format = self.table.options.date_format.clone();
        let column = self.table.column_mut(name)?;
        if column.column_type() != column_type {
            *column = column.convert(column_type, &date_format)?;
        }
        Ok(())
    }

    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<()> {
        if name != new_name && self.table.column_index(new_name).is_some() {
            return Err(TableError::DuplicateColumn(new_name.to_string()));
        }
        self.table.column_mut(name)?.set_name(new_name);
        Ok(())
    }

    pub fn fill_missing(&mut self, name: &str, value: impl Into<ColumnValue>) -> Result<()> {
        let date_format = self.table.options.date_format.clone();
        self.table
            .column_mut(name)?
            .fill_missing_with_format(value.into(), &date_format)
    }

    pub fn replace_values(&mut self, name: &str, old: &[ColumnValue], new: &[ColumnValue]) -> Result<()> {
        let date_format = self.table.options.date_format.clone();
        self.table
            .column_mut(name)?
            .replace_values_with_format(old, new, &date_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowAccess;

    fn dummy() -> Table {
        Table::from_columns(
            "dummy",
            vec![
                Column::from_values("id", ColumnType::Integer, vec![0, 1, 2]).unwrap(),
                Column::from_values("a", ColumnType::String, vec!["x", "y", "z"]).unwrap(),
                Column::from_values("b", ColumnType::String, vec!["1.5", "2", "3"]).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_append_pads_empty_column() {
        let mut table = dummy();
        table
            .columns()
            .append(Column::new("c", ColumnType::Double))
            .unwrap();
        assert_eq!(table.column("c").unwrap().len(), 3);
        assert_eq!(table.column("c").unwrap().missing_count(), 3);

        let short = Column::from_values("d", ColumnType::Integer, vec![1]).unwrap();
        assert!(matches!(
            table.columns().append(short),
            Err(TableError::LengthMismatch { expected: 3, actual: 1, .. })
        ));
        assert!(matches!(
            table.columns().append(Column::new("a", ColumnType::String)),
            Err(TableError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_append_with_builder() {
        let mut table = dummy();
        table
            .columns()
            .append_with(Column::new("label", ColumnType::String), |row| {
                let id = row.get_integer("id")?.unwrap_or(0);
                Ok(format!("{}-{}", row.get_string("a")?, id).into())
            })
            .unwrap();
        assert_eq!(table.get(2, "label").unwrap().as_str(), Some("z-2"));

        let result = table
            .columns()
            .append_with(Column::new("bad", ColumnType::Integer), |_| Ok("x".into()));
        assert!(result.is_err());
        assert_eq!(table.column_count(), 4);
    }

    #[test]
    fn test_drop_and_select() {
        let mut table = dummy();
        let dropped = table.columns().drop("a").unwrap();
        assert_eq!(dropped.name(), "a");
        assert_eq!(table.column_names(), vec!["id", "b"]);
        assert_eq!(table.len(), 3);
        assert!(table.columns().drop("a").is_err());

        let mut table = dummy();
        table.columns().select(&["b", "id"]).unwrap();
        assert_eq!(table.column_names(), vec!["id", "b"]);
        assert!(table.columns().select(&["zz"]).is_err());

        let mut table = dummy();
        table.columns().drop_many(&["a", "b"]).unwrap();
        assert_eq!(table.column_names(), vec!["id"]);
    }

    #[test]
    fn test_regex_columns() {
        let mut table = dummy();
        assert_eq!(table.columns().drop_by_regex("[ab]").unwrap(), 2);
        assert_eq!(table.column_names(), vec!["id"]);

        let mut table = dummy();
        assert_eq!(table.columns().select_by_regex("i.").unwrap(), 2);
        assert_eq!(table.column_names(), vec!["id"]);
    }

    #[test]
    fn test_set_type() {
        let mut table = dummy();
        table.columns().set_type("b", ColumnType::Double).unwrap();
        let b = table.column("b").unwrap();
        assert_eq!(b.column_type(), ColumnType::Double);
        assert_eq!(b.get(1).unwrap().as_double(), Some(2.0));

        // conversion is all or nothing
        let mut table = dummy();
        table.column_mut("b").unwrap().set(2, "oops").unwrap();
        assert!(table.columns().set_type("b", ColumnType::Double).is_err());
        assert_eq!(table.column("b").unwrap().column_type(), ColumnType::String);
    }

    #[test]
    fn test_rename() {
        let mut table = dummy();
        table.columns().rename("a", "letter").unwrap();
        assert_eq!(table.get(0, "letter").unwrap().as_str(), Some("x"));
        assert!(matches!(
            table.columns().rename("id", "b"),
            Err(TableError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_fill_and_replace_single_column() {
        let mut table = dummy();
        table
            .columns()
            .replace_values("a", &["y".into()], &[ColumnValue::Null])
            .unwrap();
        assert_eq!(table.missing_count(), 1);
        table.columns().fill_missing("a", "w").unwrap();
        assert_eq!(table.get(1, "a").unwrap().as_str(), Some("w"));
    }
}
