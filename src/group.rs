/// Grouping and aggregation.
///
/// A [`RowMapper`] derives a key for every row in one pass. Keys keep the
/// order in which they first appear and each collects its row indices in
/// table order. Each group is then copied into its own table (named
/// `<table>:<key>`), and either returned as is ([`Table::split_by`]) or
/// reduced by an [`Aggregator`] with the per-key results concatenated
/// ([`Table::group_by`]).
///
/// # Examples
///
/// ```
/// use tablekit::{Aggregation, Column, ColumnType, Table};
///
/// let table = Table::from_columns(
///     "visits",
///     vec![Column::from_values("page", ColumnType::String, vec!["a", "b", "a"]).unwrap()],
/// )
/// .unwrap();
///
/// let counts = table.group_by_column("page", Aggregation::Count).unwrap();
/// assert_eq!(counts.get(0, "key").unwrap().as_str(), Some("a"));
/// assert_eq!(counts.get(0, "count").unwrap().as_integer(), Some(2));
/// ```

use crate::column::Column;
use crate::error::{Result, TableError};
use crate::row::{Row, RowAccess};
use crate::table::Table;
use crate::value::{ColumnType, ColumnValue};
use std::collections::HashMap;

/// Name of the key column in tables built by [`Aggregation`].
pub const KEY_COLUMN: &str = "key";
/// Name of the row count column produced by [`Aggregation::Count`].
pub const COUNT_COLUMN: &str = "count";

/// Derives the grouping key of a row.
pub trait RowMapper {
    fn key(&self, row: &Row<'_>) -> Result<ColumnValue>;

    /// Type of the keys this mapper produces over `table`, when known up front.
    ///
    /// Used to type the key column of groups whose key is missing.
    fn key_type(&self, _table: &Table) -> Option<ColumnType> {
        None
    }
}

impl<F> RowMapper for F
where
    F: Fn(&Row<'_>) -> Result<ColumnValue>,
{
    fn key(&self, row: &Row<'_>) -> Result<ColumnValue> {
        self(row)
    }
}

/// Groups by the raw value of one column.
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    column: String,
}

impl ColumnMapper {
    pub fn new(column: impl Into<String>) -> Self {
        ColumnMapper {
            column: column.into(),
        }
    }
}

impl RowMapper for ColumnMapper {
    fn key(&self, row: &Row<'_>) -> Result<ColumnValue> {
        Ok(row.get(&self.column)?.clone())
    }

    fn key_type(&self, table: &Table) -> Option<ColumnType> {
        table.column(&self.column).ok().map(Column::column_type)
    }
}

/// Groups numeric values into bins of equal width: `floor(v / size) * size`.
///
/// Missing values share a single missing key.
#[derive(Debug, Clone)]
pub struct BinMapper {
    column: String,
    bin_size: f64,
}

impl BinMapper {
    pub fn new(column: impl Into<String>, bin_size: f64) -> Result<Self> {
        if !bin_size.is_finite() || bin_size <= 0.0 {
            return Err(TableError::InvalidBinSize(bin_size));
        }
        Ok(BinMapper {
            column: column.into(),
            bin_size,
        })
    }
}

impl RowMapper for BinMapper {
    fn key(&self, row: &Row<'_>) -> Result<ColumnValue> {
        Ok(match row.get_double(&self.column)? {
            Some(value) => ColumnValue::Double((value / self.bin_size).floor() * self.bin_size),
            None => ColumnValue::Null,
        })
    }

    fn key_type(&self, _table: &Table) -> Option<ColumnType> {
        Some(ColumnType::Double)
    }
}

/// Reduces the table of one group to a result table.
pub trait Aggregator {
    fn aggregate(&self, key: &ColumnValue, group: Table) -> Result<Table>;
}

impl<F> Aggregator for F
where
    F: Fn(&ColumnValue, Table) -> Result<Table>,
{
    fn aggregate(&self, key: &ColumnValue, group: Table) -> Result<Table> {
        self(key, group)
    }
}

/// Built-in aggregations.
///
/// Every result has one row whose first column, `key`, holds the group key.
/// `Count` adds the row count. The numeric reductions add one column per
/// numeric column of the group, under the same name; missing values are
/// skipped and a group without values reduces to missing (`Sum` to zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Count,
    Sum,
    Mean,
    Min,
    Max,
}

impl Aggregation {
    fn reduce(&self, column: &Column) -> Result<(ColumnType, ColumnValue)> {
        let present = column.iter().filter(|v| !v.is_null());
        Ok(match self {
            Aggregation::Count => (
                ColumnType::Integer,
                ColumnValue::Integer(present.count() as i64),
            ),
            Aggregation::Sum if column.column_type() == ColumnType::Integer => {
                let total = present
                    .filter_map(ColumnValue::as_integer)
                    .try_fold(0i64, i64::checked_add)
                    .ok_or_else(|| TableError::IntegerOverflow(column.name().to_string()))?;
                (ColumnType::Integer, ColumnValue::Integer(total))
            }
            Aggregation::Sum => (
                ColumnType::Double,
                ColumnValue::Double(present.filter_map(ColumnValue::as_double).sum()),
            ),
            Aggregation::Mean => (ColumnType::Double, column.mean().into()),
            Aggregation::Min => (column.column_type(), present.min().cloned().into()),
            Aggregation::Max => (column.column_type(), present.max().cloned().into()),
        })
    }
}

impl Aggregator for Aggregation {
    fn aggregate(&self, key: &ColumnValue, group: Table) -> Result<Table> {
        let key_type = ColumnType::of(key).unwrap_or(ColumnType::String);
        let mut result = Table::with_options(group.name.clone(), group.options.clone());
        result.push_column(Column::from_values(KEY_COLUMN, key_type, [key.clone()])?)?;

        if *self == Aggregation::Count {
            let count = ColumnValue::Integer(group.len() as i64);
            result.push_column(Column::from_values(COUNT_COLUMN, ColumnType::Integer, [count])?)?;
            return Ok(result);
        }

        for column in group.iter_columns() {
            if !column.column_type().is_numeric() || column.name() == KEY_COLUMN {
                continue;
            }
            let (column_type, value) = self.reduce(column)?;
            result.push_column(Column::from_values(column.name(), column_type, [value])?)?;
        }
        Ok(result)
    }
}

/// A missing key cannot tell its type, so its key column takes the type of
/// the other keys.
fn retype_missing_key(reduced: &mut Table, key_type: ColumnType) -> Result<()> {
    let date_format = reduced.options.date_format.clone();
    if let Ok(column) = reduced.column_mut(KEY_COLUMN) {
        if column.column_type() != key_type && column.missing_count() == column.len() {
            *column = column.convert(key_type, &date_format)?;
        }
    }
    Ok(())
}

/// Row indices per key, in first-appearance order.
struct Groups {
    keys: Vec<ColumnValue>,
    rows: Vec<Vec<usize>>,
}

fn partition(table: &Table, mapper: &dyn RowMapper) -> Result<Groups> {
    let mut positions: HashMap<ColumnValue, usize> = HashMap::new();
    let mut groups = Groups {
        keys: Vec::new(),
        rows: Vec::new(),
    };
    table.for_each_row(|row| {
        let key = mapper.key(row)?;
        let slot = match positions.get(&key) {
            Some(&slot) => slot,
            None => {
                positions.insert(key.clone(), groups.keys.len());
                groups.keys.push(key);
                groups.rows.push(Vec::new());
                groups.keys.len() - 1
            }
        };
        groups.rows[slot].push(row.index());
        Ok(())
    })?;
    Ok(groups)
}

impl Table {
    /// Copy of the rows at `indices` in a table shaped like this one.
    fn materialize(&self, key: &ColumnValue, indices: &[usize]) -> Table {
        let mut group = self.clone_structure(&key.to_string());
        for (target, source) in group.columns.iter_mut().zip(&self.columns) {
            for &index in indices {
                target.push(source.values()[index].clone());
            }
        }
        group
    }

    fn group_dyn(&self, mapper: &dyn RowMapper, aggregator: &dyn Aggregator) -> Result<Table> {
        let groups = partition(self, mapper)?;
        self.log(format_args!("Grouped {} rows into {} groups", self.len(), groups.keys.len()));

        let key_type = groups
            .keys
            .iter()
            .find_map(ColumnType::of)
            .or_else(|| mapper.key_type(self));

        let mut result: Option<Table> = None;
        for (key, indices) in groups.keys.iter().zip(&groups.rows) {
            let mut reduced = aggregator.aggregate(key, self.materialize(key, indices))?;
            if let Some(key_type) = key_type.filter(|_| key.is_null()) {
                retype_missing_key(&mut reduced, key_type)?;
            }
            match result.as_mut() {
                Some(result) => result.append_table(&reduced)?,
                None => result = Some(reduced),
            }
        }

        let mut result =
            result.unwrap_or_else(|| Table::with_options(self.name.clone(), self.options.clone()));
        result.set_name(self.name.clone());
        Ok(result)
    }

    fn split_dyn(&self, mapper: &dyn RowMapper) -> Result<Vec<Table>> {
        let groups = partition(self, mapper)?;
        Ok(groups
            .keys
            .iter()
            .zip(&groups.rows)
            .map(|(key, indices)| self.materialize(key, indices))
            .collect())
    }

    /// Partition rows by `mapper` and reduce every group with `aggregator`.
    ///
    /// The results are concatenated in key first-appearance order. A table
    /// without rows yields an empty table without columns.
    pub fn group_by<M, A>(&self, mapper: M, aggregator: A) -> Result<Table>
    where
        M: RowMapper,
        A: Aggregator,
    {
        self.group_dyn(&mapper, &aggregator)
    }

    pub fn group_by_column<A: Aggregator>(&self, column: &str, aggregator: A) -> Result<Table> {
        self.column(column)?;
        self.group_dyn(&ColumnMapper::new(column), &aggregator)
    }

    /// Group by numeric bins of `bin_size` over `column`.
    pub fn bin_by<A: Aggregator>(&self, column: &str, bin_size: f64, aggregator: A) -> Result<Table> {
        self.column(column)?;
        self.group_dyn(&BinMapper::new(column, bin_size)?, &aggregator)
    }

    /// Partition rows by `mapper` without reducing them.
    pub fn split_by<M: RowMapper>(&self, mapper: M) -> Result<Vec<Table>> {
        self.split_dyn(&mapper)
    }

    /// Builder for the common aggregations over one column's values.
    pub fn groups(&self, column: &str) -> Result<GroupBy<'_, ColumnMapper>> {
        self.column(column)?;
        Ok(GroupBy {
            table: self,
            mapper: ColumnMapper::new(column),
        })
    }

    pub fn groups_with<M: RowMapper>(&self, mapper: M) -> GroupBy<'_, M> {
        GroupBy {
            table: self,
            mapper,
        }
    }
}

/// A table paired with a key mapper, ready to aggregate.
///
/// ```
/// use tablekit::{Column, ColumnType, Table};
///
/// let table = Table::from_columns(
///     "t",
///     vec![
///         Column::from_values("g", ColumnType::String, vec!["x", "y", "x"]).unwrap(),
///         Column::from_values("v", ColumnType::Integer, vec![1, 2, 3]).unwrap(),
///     ],
/// )
/// .unwrap();
///
/// let sums = table.groups("g").unwrap().sum().unwrap();
/// assert_eq!(sums.get(0, "v").unwrap().as_integer(), Some(4));
/// ```
pub struct GroupBy<'a, M> {
    table: &'a Table,
    mapper: M,
}

impl<M: RowMapper> GroupBy<'_, M> {
    pub fn count(&self) -> Result<Table> {
        self.aggregate(Aggregation::Count)
    }

    pub fn sum(&self) -> Result<Table> {
        self.aggregate(Aggregation::Sum)
    }

    pub fn mean(&self) -> Result<Table> {
        self.aggregate(Aggregation::Mean)
    }

    pub fn min(&self) -> Result<Table> {
        self.aggregate(Aggregation::Min)
    }

    pub fn max(&self) -> Result<Table> {
        self.aggregate(Aggregation::Max)
    }

    pub fn aggregate<A: Aggregator>(&self, aggregator: A) -> Result<Table> {
        self.table.group_dyn(&self.mapper, &aggregator)
    }

    pub fn split(&self) -> Result<Vec<Table>> {
        self.table.split_dyn(&self.mapper)
    }
}
