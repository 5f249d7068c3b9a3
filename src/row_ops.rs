/// Row operations on a table: insertion, removal, filtering, missing-value
/// handling, de-duplication and sorting.
///
/// Every removal preserves the relative order of the remaining rows and
/// leaves the column set untouched.
///
/// # Examples
///
/// ```
/// use tablekit::{Column, ColumnType, RowAccess, Table};
///
/// let mut table = Table::from_columns(
///     "scores",
///     vec![Column::from_values("score", ColumnType::Integer, vec![Some(3), None, Some(1)]).unwrap()],
/// )
/// .unwrap();
///
/// table.rows().drop_missings().unwrap();
/// table.rows().sort_asc_by("score").unwrap();
/// assert_eq!(table.row(0).unwrap().get_integer("score").unwrap(), Some(1));
/// ```

use crate::error::{Result, TableError};
use crate::row::{DetachedRow, Row, RowAccess, RowMut};
use crate::table::{whole_match, Table};
use crate::value::ColumnValue;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Sort order for a sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A single sort key (column + order)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
}

impl SortKey {
    /// Ascending key; missing values sort first.
    pub fn ascending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Ascending,
        }
    }

    /// Descending key; missing values sort last.
    pub fn descending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Descending,
        }
    }
}

pub struct RowOperations<'a> {
    table: &'a mut Table,
}

impl<'a> RowOperations<'a> {
    pub(crate) fn new(table: &'a mut Table) -> Self {
        RowOperations { table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Row<'_>> {
        self.table.row(index)
    }

    /// Append a staged row and return its index.
    ///
    /// Columns the row does not mention receive a missing value. Naming a
    /// column the table lacks, or a value a column cannot hold, fails without
    /// changing the table.
    pub fn append(&mut self, row: DetachedRow) -> Result<usize> {
        self.table.assert_not_empty()?;
        if let Some(unknown) = row.columns().find(|c| self.table.column_index(c).is_none()) {
            return Err(TableError::ColumnNotFound(unknown.to_string()));
        }

        let date_format = &self.table.options.date_format;
        let staged = self
            .table
            .columns
            .iter()
            .map(|column| match row.get(column.name()) {
                Some(value) => column.column_type().coerce(value.clone(), date_format),
                None => Ok(ColumnValue::Null),
            })
            .collect::<Result<Vec<_>>>()?;

        for (column, value) in self.table.columns.iter_mut().zip(staged) {
            column.push(value);
        }
        Ok(self.table.len() - 1)
    }

    /// Append a row of missing values and return a writable view of it.
    pub fn append_empty(&mut self) -> Result<RowMut<'_>> {
        self.table.assert_not_empty()?;
        for column in &mut self.table.columns {
            column.append_missing();
        }
        let index = self.table.len() - 1;
        self.table.row_mut(index)
    }

    /// Remove the row at `index` and hand back its values.
    pub fn remove(&mut self, index: usize) -> Result<DetachedRow> {
        let removed = self.table.row(index)?.to_detached();
        for column in &mut self.table.columns {
            column.remove(index)?;
        }
        Ok(removed)
    }

    /// Keep only the rows accepted by `filter`. Returns the number removed.
    pub fn select<F>(&mut self, mut filter: F) -> Result<usize>
    where
        F: FnMut(&Row<'_>) -> Result<bool>,
    {
        let keep = self.flags(|row| filter(row))?;
        Ok(self.retain(&keep))
    }

    /// Remove the rows accepted by `filter`. Returns the number removed.
    pub fn drop<F>(&mut self, mut filter: F) -> Result<usize>
    where
        F: FnMut(&Row<'_>) -> Result<bool>,
    {
        let keep = self.flags(|row| Ok(!filter(row)?))?;
        Ok(self.retain(&keep))
    }

    /// Keep rows whose `column` text matches `pattern` as a whole.
    pub fn select_by_regex(&mut self, column: &str, pattern: &str) -> Result<usize> {
        let regex = whole_match(pattern)?;
        self.table.column(column)?;
        self.select(|row| Ok(regex.is_match(&row.get_string(column)?)))
    }

    /// Remove rows whose `column` text matches `pattern` as a whole.
    pub fn drop_by_regex(&mut self, column: &str, pattern: &str) -> Result<usize> {
        let regex = whole_match(pattern)?;
        self.table.column(column)?;
        self.drop(|row| Ok(regex.is_match(&row.get_string(column)?)))
    }

    /// Remove every row holding a missing value in any column.
    pub fn drop_missings(&mut self) -> Result<usize> {
        self.drop(|row| Ok(row.values().iter().any(|v| v.is_null())))
    }

    /// Remove every row whose `column` value is missing.
    pub fn drop_missings_in(&mut self, column: &str) -> Result<usize> {
        self.table.column(column)?;
        self.drop(|row| Ok(row.get(column)?.is_null()))
    }

    /// Keep the first occurrence of every distinct full row.
    pub fn drop_duplicates(&mut self) -> Result<usize> {
        let keep = {
            let mut seen = HashSet::new();
            self.flags(|row| Ok(seen.insert(row.values())))?
        };
        Ok(self.retain(&keep))
    }

    pub fn sort_asc_by(&mut self, column: &str) -> Result<()> {
        self.sort_by(&[SortKey::ascending(column)])
    }

    pub fn sort_desc_by(&mut self, column: &str) -> Result<()> {
        self.sort_by(&[SortKey::descending(column)])
    }

    /// Stable sort by several keys, earlier keys taking precedence.
    pub fn sort_by(&mut self, keys: &[SortKey]) -> Result<()> {
        let columns = keys
            .iter()
            .map(|key| -> Result<_> { Ok((self.table.column(&key.column)?.values(), key.order)) })
            .collect::<Result<Vec<_>>>()?;

        let mut order: Vec<usize> = (0..self.table.len()).collect();
        order.sort_by(|&a, &b| {
            for (values, direction) in &columns {
                let cmp = values[a].cmp(&values[b]);
                let cmp = match direction {
                    SortOrder::Ascending => cmp,
                    SortOrder::Descending => cmp.reverse(),
                };
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });

        self.table.reorder_rows(&order);
        Ok(())
    }

    /// Remove every row, keeping the columns.
    pub fn clear(&mut self) {
        for column in &mut self.table.columns {
            column.clear();
        }
    }

    fn flags<'t, F>(&'t self, mut accept: F) -> Result<Vec<bool>>
    where
        F: FnMut(&Row<'t>) -> Result<bool>,
    {
        let mut flags = Vec::with_capacity(self.table.len());
        self.table.for_each_row(|row| {
            flags.push(accept(row)?);
            Ok(())
        })?;
        Ok(flags)
    }

    fn retain(&mut self, keep: &[bool]) -> usize {
        let removed = keep.iter().filter(|k| !**k).count();
        if removed > 0 {
            self.table.retain_rows(keep);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::config::TableOptions;
    use crate::value::ColumnType;
    use chrono::NaiveDate;

    fn dummy() -> Table {
        Table::from_columns(
            "dummy",
            vec![
                Column::from_values("id", ColumnType::Integer, vec![0, 1, 2]).unwrap(),
                Column::from_values("a", ColumnType::String, vec!["y", "z", "x"]).unwrap(),
                Column::from_values("b", ColumnType::String, vec!["p", "q", "r"]).unwrap(),
            ],
        )
        .unwrap()
    }

    fn ids(table: &Table) -> Vec<Option<i64>> {
        table
            .column("id")
            .unwrap()
            .iter()
            .map(ColumnValue::as_integer)
            .collect()
    }

    #[test]
    fn test_append_detached() {
        let mut table = dummy();
        let index = table
            .rows()
            .append(DetachedRow::new().with("id", "3").with("a", "w"))
            .unwrap();
        assert_eq!(index, 3);
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(3, "id").unwrap().as_integer(), Some(3));
        assert!(table.get(3, "b").unwrap().is_null());
    }

    #[test]
    fn test_append_rejects_without_change() {
        let mut table = dummy();
        let result = table.rows().append(DetachedRow::new().with("nope", 1));
        assert!(matches!(result, Err(TableError::ColumnNotFound(_))));

        let result = table
            .rows()
            .append(DetachedRow::new().with("a", "ok").with("id", "not a number"));
        assert!(matches!(result, Err(TableError::ValueConversion { .. })));
        assert_eq!(table.len(), 3);
        assert_eq!(table.column("a").unwrap().len(), 3);

        let mut empty = Table::new("empty");
        assert!(matches!(
            empty.rows().append(DetachedRow::new()),
            Err(TableError::EmptyTable(_))
        ));
    }

    #[test]
    fn test_append_empty_row() {
        let mut table = dummy();
        {
            let mut rows = table.rows();
            let mut row = rows.append_empty().unwrap();
            row.set("id", 9).unwrap();
            assert_eq!(row.index(), 3);
        }
        assert_eq!(ids(&table), vec![Some(0), Some(1), Some(2), Some(9)]);
        assert_eq!(table.missing_count(), 2);
    }

    #[test]
    fn test_remove() {
        let mut table = dummy();
        let removed = table.rows().remove(1).unwrap();
        assert_eq!(removed.get("a"), Some(&ColumnValue::from("z")));
        assert_eq!(ids(&table), vec![Some(0), Some(2)]);
        assert!(table.rows().remove(5).is_err());
    }

    #[test]
    fn test_select_and_drop() {
        let mut table = dummy();
        let removed = table
            .rows()
            .select(|row| Ok(row.get_string("b")? == "r"))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.column_count(), 3);

        let mut selected = dummy();
        selected
            .rows()
            .select(|row| Ok(row.get_integer("id")? != Some(1)))
            .unwrap();
        let mut dropped = dummy();
        dropped
            .rows()
            .drop(|row| Ok(row.get_integer("id")? == Some(1)))
            .unwrap();
        assert_eq!(ids(&selected), ids(&dropped));
    }

    #[test]
    fn test_regex_filters() {
        let mut table = dummy();
        assert_eq!(table.rows().drop_by_regex("a", "[xy]").unwrap(), 2);
        assert_eq!(ids(&table), vec![Some(1)]);

        let mut table = dummy();
        // partial matches do not count
        assert_eq!(table.rows().select_by_regex("b", "p|q.").unwrap(), 2);
        assert_eq!(ids(&table), vec![Some(0)]);
        assert!(matches!(
            table.rows().select_by_regex("zz", "p"),
            Err(TableError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_regex_uses_table_date_format() {
        let options = TableOptions::new().with_date_format("%d.%m.%Y");
        let mut table = Table::with_options("dates", options);
        let days = [2, 15].map(|d| NaiveDate::from_ymd_opt(2020, 1, d).unwrap());
        table
            .columns()
            .append(Column::from_values("when", ColumnType::Date, days).unwrap())
            .unwrap();

        assert_eq!(table.row(0).unwrap().get_string("when").unwrap(), "02.01.2020");
        assert_eq!(table.filter_rows_by_regex("when", r"1\d\.01\.2020").unwrap().len(), 1);
        assert_eq!(table.rows().select_by_regex("when", r"\d+\.01\.2020").unwrap(), 0);
        assert_eq!(table.rows().drop_by_regex("when", "2020-.*").unwrap(), 0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_drop_missings() {
        let mut table = Table::from_columns(
            "m",
            vec![
                Column::from_values("x", ColumnType::Integer, vec![Some(1), None, Some(3), Some(4)])
                    .unwrap(),
                Column::from_values("y", ColumnType::String, vec![Some("a"), Some("b"), None, Some("d")])
                    .unwrap(),
            ],
        )
        .unwrap();
        let mut only_x = table.clone();

        assert_eq!(table.rows().drop_missings().unwrap(), 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.missing_count(), 0);

        assert_eq!(only_x.rows().drop_missings_in("x").unwrap(), 1);
        assert_eq!(only_x.len(), 3);
        assert_eq!(only_x.missing_count(), 1);
    }

    #[test]
    fn test_drop_duplicates_idempotent() {
        let mut table = Table::from_columns(
            "dups",
            vec![
                Column::from_values("k", ColumnType::String, vec!["a", "b", "a", "a", "c"]).unwrap(),
                Column::from_values("v", ColumnType::Integer, vec![Some(1), Some(2), Some(1), None, Some(3)])
                    .unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(table.rows().drop_duplicates().unwrap(), 1);
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows().drop_duplicates().unwrap(), 0);
        assert_eq!(table.len(), 4);
        assert!(table.get(2, "v").unwrap().is_null());
    }

    #[test]
    fn test_sort() {
        let mut table = dummy();
        table.rows().sort_asc_by("a").unwrap();
        assert_eq!(table.get(0, "a").unwrap().as_str(), Some("x"));
        assert_eq!(ids(&table), vec![Some(2), Some(0), Some(1)]);

        table.rows().sort_desc_by("id").unwrap();
        assert_eq!(ids(&table), vec![Some(2), Some(1), Some(0)]);
        assert!(table.rows().sort_asc_by("nope").is_err());
    }

    #[test]
    fn test_sort_missing_and_stability() {
        let mut table = Table::from_columns(
            "s",
            vec![
                Column::from_values("g", ColumnType::Integer, vec![Some(2), None, Some(1), Some(2), Some(1)])
                    .unwrap(),
                Column::from_values("pos", ColumnType::Integer, vec![0, 1, 2, 3, 4]).unwrap(),
            ],
        )
        .unwrap();
        table.rows().sort_asc_by("g").unwrap();
        let pos: Vec<i64> = table
            .column("pos")
            .unwrap()
            .iter()
            .filter_map(ColumnValue::as_integer)
            .collect();
        assert_eq!(pos, vec![1, 2, 4, 0, 3]);

        table
            .rows()
            .sort_by(&[SortKey::descending("g"), SortKey::ascending("pos")])
            .unwrap();
        let pos: Vec<i64> = table
            .column("pos")
            .unwrap()
            .iter()
            .filter_map(ColumnValue::as_integer)
            .collect();
        assert_eq!(pos, vec![0, 3, 2, 4, 1]);
    }

    #[test]
    fn test_clear_keeps_columns() {
        let mut table = dummy();
        table.rows().clear();
        assert_eq!(table.len(), 0);
        assert_eq!(table.column_count(), 3);
    }
}
