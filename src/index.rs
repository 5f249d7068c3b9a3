/// Hash index over one column and the left-join merge built on it.
///
/// A [`TableIndex`] borrows the table it indexes, so it cannot outlive or
/// observe later changes to that table. Missing values are never indexed.

use crate::error::{Result, TableError};
use crate::row::Row;
use crate::table::Table;
use crate::value::ColumnValue;
use std::collections::HashMap;

/// Which row an index keeps when a key value repeats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyPolicy {
    /// The last row scanned wins.
    #[default]
    KeepLast,
    /// The first row scanned wins.
    KeepFirst,
}

/// Maps each present value of a column to a row of the indexed table.
#[derive(Debug)]
pub struct TableIndex<'a> {
    table: &'a Table,
    column: String,
    positions: HashMap<&'a ColumnValue, usize>,
}

impl<'a> TableIndex<'a> {
    fn build(table: &'a Table, column: &str, policy: KeyPolicy) -> Result<Self> {
        let values = table.column(column)?.values();
        let mut positions = HashMap::with_capacity(values.len());
        for (row, value) in values.iter().enumerate() {
            if value.is_null() {
                continue;
            }
            match policy {
                KeyPolicy::KeepLast => {
                    positions.insert(value, row);
                }
                KeyPolicy::KeepFirst => {
                    positions.entry(value).or_insert(row);
                }
            }
        }
        Ok(TableIndex {
            table,
            column: column.to_string(),
            positions,
        })
    }

    /// Row index holding `key`, if any. A missing key never matches.
    pub fn position(&self, key: &ColumnValue) -> Option<usize> {
        if key.is_null() {
            return None;
        }
        self.positions.get(key).copied()
    }

    pub fn row(&self, key: &ColumnValue) -> Option<Row<'a>> {
        self.position(key).map(|index| Row::new(self.table, index))
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Number of distinct indexed keys.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Table {
    /// Index `column` with the last-wins policy.
    pub fn create_index(&self, column: &str) -> Result<TableIndex<'_>> {
        self.create_index_with(column, KeyPolicy::default())
    }

    pub fn create_index_with(&self, column: &str, policy: KeyPolicy) -> Result<TableIndex<'_>> {
        self.log(format_args!("Creating index on column '{}'...", column));
        let index = TableIndex::build(self, column, policy)?;
        self.log(format_args!("Index created ({} keys).", index.len()));
        Ok(index)
    }

    /// Left join with `other` where both tables name the key `column`.
    pub fn merge_on(&mut self, other: &Table, column: &str) -> Result<()> {
        self.merge(other, column, column)
    }

    /// Left join: add every column of `other` except `key_right` and fill it
    /// from the row of `other` whose `key_right` equals this row's `key_left`.
    ///
    /// Rows without a match get missing values. Row count and order of this
    /// table do not change. Duplicate keys in `other` resolve last-wins.
    pub fn merge(&mut self, other: &Table, key_left: &str, key_right: &str) -> Result<()> {
        self.merge_with(other, key_left, key_right, KeyPolicy::default())
    }

    pub fn merge_with(
        &mut self,
        other: &Table,
        key_left: &str,
        key_right: &str,
        policy: KeyPolicy,
    ) -> Result<()> {
        self.log(format_args!("Merging with table '{}'...", other.name()));
        self.column(key_left)?;
        other.column(key_right)?;

        let added: Vec<_> = other
            .iter_columns()
            .filter(|c| c.name() != key_right)
            .collect();
        if let Some(clash) = added.iter().find(|c| self.column_index(c.name()).is_some()) {
            return Err(TableError::DuplicateColumn(clash.name().to_string()));
        }

        let index = other.create_index_with(key_right, policy)?;
        let matches: Vec<Option<usize>> = self
            .column(key_left)?
            .iter()
            .map(|key| index.position(key))
            .collect();

        for source in added {
            let mut target = source.clone_structure();
            for matched in &matches {
                match matched {
                    Some(row) => target.push(source.values()[*row].clone()),
                    None => target.append_missing(),
                }
            }
            self.push_column(target)?;
        }
        let hits = matches.iter().filter(|m| m.is_some()).count();

        self.log(format_args!(
            "Merged {} of {} rows with table '{}'.",
            hits,
            matches.len(),
            other.name()
        ));
        Ok(())
    }
}
