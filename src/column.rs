/// TableKit Column Implementation
///
/// A Column is an array-like random-access data container indexed by integer.
/// Each Column has a declared type and every stored value is either missing
/// or a value of that type. Writes are coerced to the declared type and
/// rejected when the conversion would lose information.
///
/// # Examples
///
/// ```
/// use tablekit::{Column, ColumnType, ColumnValue};
///
/// let mut col = Column::new("score", ColumnType::Double);
/// col.append(1.5).unwrap();
/// col.append(ColumnValue::Null).unwrap();
/// col.append(4).unwrap(); // integers widen to doubles
///
/// assert_eq!(col.len(), 3);
/// assert_eq!(col.missing_count(), 1);
/// assert_eq!(col.max(), Some(4.0));
/// ```

use crate::config::DEFAULT_DATE_FORMAT;
use crate::error::{Result, TableError};
use crate::value::{ColumnType, ColumnValue};
use std::collections::HashSet;
use std::fmt::Debug;

#[derive(Clone)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    values: Vec<ColumnValue>,
    /// Running count of missing slots in `values`
    missing: usize,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Column {
            name: name.into(),
            column_type,
            values: Vec::new(),
            missing: 0,
        }
    }

    /// Build a column from values, coercing each to `column_type`.
    pub fn from_values<I, V>(name: impl Into<String>, column_type: ColumnType, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<ColumnValue>,
    {
        let mut column = Column::new(name, column_type);
        for value in values {
            column.append(value)?;
        }
        Ok(column)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[ColumnValue] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnValue> {
        self.values.iter()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.values.len() {
            return Err(TableError::RowOutOfRange {
                index,
                len: self.values.len(),
            });
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&ColumnValue> {
        self.values.get(index).ok_or(TableError::RowOutOfRange {
            index,
            len: self.values.len(),
        })
    }

    /// Numeric access without cloning. `None` for missing, non-numeric or out of range.
    #[inline]
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(ColumnValue::as_double)
    }

    #[inline]
    pub fn is_null_at(&self, index: usize) -> bool {
        self.values.get(index).is_some_and(ColumnValue::is_null)
    }

    pub fn set(&mut self, index: usize, value: impl Into<ColumnValue>) -> Result<()> {
        self.set_with_format(index, value.into(), DEFAULT_DATE_FORMAT)
    }

    /// Like [`Column::set`] but parses textual dates with `date_format`.
    pub fn set_with_format(&mut self, index: usize, value: ColumnValue, date_format: &str) -> Result<()> {
        self.check_index(index)?;
        let value = self.column_type.coerce(value, date_format)?;
        self.store(index, value);
        Ok(())
    }

    /// Write an already coerced value and keep the missing count in step.
    fn store(&mut self, index: usize, value: ColumnValue) {
        let was_null = self.values[index].is_null();
        let is_null = value.is_null();
        self.values[index] = value;
        match (was_null, is_null) {
            (true, false) => self.missing -= 1,
            (false, true) => self.missing += 1,
            _ => {}
        }
    }

    pub fn append(&mut self, value: impl Into<ColumnValue>) -> Result<()> {
        self.append_with_format(value.into(), DEFAULT_DATE_FORMAT)
    }

    pub fn append_with_format(&mut self, value: ColumnValue, date_format: &str) -> Result<()> {
        let value = self.column_type.coerce(value, date_format)?;
        self.push(value);
        Ok(())
    }

    pub(crate) fn append_missing(&mut self) {
        self.push(ColumnValue::Null);
    }

    /// Append a value already known to fit the column type.
    pub(crate) fn push(&mut self, value: ColumnValue) {
        if value.is_null() {
            self.missing += 1;
        }
        self.values.push(value);
    }

    pub fn remove(&mut self, index: usize) -> Result<ColumnValue> {
        self.check_index(index)?;
        let value = self.values.remove(index);
        if value.is_null() {
            self.missing -= 1;
        }
        Ok(value)
    }

    /// Keep only the rows whose flag is set. `keep` must cover every row.
    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.values.len());
        let mut flags = keep.iter();
        self.values.retain(|_| flags.next().copied().unwrap_or(false));
        self.recount_missing();
    }

    /// Rearrange rows so that new row `i` is old row `order[i]`.
    pub(crate) fn reorder(&mut self, order: &[usize]) {
        debug_assert_eq!(order.len(), self.values.len());
        let mut old = std::mem::take(&mut self.values);
        self.values = order
            .iter()
            .map(|&i| std::mem::replace(&mut old[i], ColumnValue::Null))
            .collect();
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
        self.missing = 0;
    }

    fn recount_missing(&mut self) {
        self.missing = self.values.iter().filter(|v| v.is_null()).count();
    }

    pub fn missing_count(&self) -> usize {
        self.missing
    }

    /// Number of distinct present values.
    pub fn unique_count(&self) -> usize {
        self.values
            .iter()
            .filter(|v| !v.is_null())
            .collect::<HashSet<_>>()
            .len()
    }

    fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        let numeric = self.column_type.is_numeric();
        self.values
            .iter()
            .filter(move |_| numeric)
            .filter_map(ColumnValue::as_double)
    }

    /// Smallest present value of a numeric column.
    pub fn min(&self) -> Option<f64> {
        self.numbers().reduce(f64::min)
    }

    /// Largest present value of a numeric column.
    pub fn max(&self) -> Option<f64> {
        self.numbers().reduce(f64::max)
    }

    /// Mean of the present values of a numeric column.
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .numbers()
            .fold((0.0, 0usize), |(sum, count), n| (sum + n, count + 1));
        if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        }
    }

    /// Replace every missing slot with `value`.
    pub fn fill_missing(&mut self, value: impl Into<ColumnValue>) -> Result<()> {
        self.fill_missing_with_format(value.into(), DEFAULT_DATE_FORMAT)
    }

    pub fn fill_missing_with_format(&mut self, value: ColumnValue, date_format: &str) -> Result<()> {
        let value = self.column_type.coerce(value, date_format)?;
        if value.is_null() || self.missing == 0 {
            return Ok(());
        }
        for slot in self.values.iter_mut().filter(|v| v.is_null()) {
            *slot = value.clone();
        }
        self.missing = 0;
        Ok(())
    }

    pub fn replace_value(
        &mut self,
        old: impl Into<ColumnValue>,
        new: impl Into<ColumnValue>,
    ) -> Result<()> {
        self.replace_values(&[old.into()], &[new.into()])
    }

    /// Rewrite each value equal to `old[k]` to `new[k]`.
    ///
    /// Missing is a valid member of either list. Old values that cannot be
    /// represented in this column never match; new values that cannot be
    /// stored are an error, raised before anything is rewritten.
    pub fn replace_values(&mut self, old: &[ColumnValue], new: &[ColumnValue]) -> Result<()> {
        self.replace_values_with_format(old, new, DEFAULT_DATE_FORMAT)
    }

    pub fn replace_values_with_format(
        &mut self,
        old: &[ColumnValue],
        new: &[ColumnValue],
        date_format: &str,
    ) -> Result<()> {
        if old.len() != new.len() {
            return Err(TableError::ReplacementMismatch {
                old: old.len(),
                new: new.len(),
            });
        }

        let old: Vec<Option<ColumnValue>> = old
            .iter()
            .map(|v| self.column_type.coerce(v.clone(), date_format).ok())
            .collect();
        let new = new
            .iter()
            .map(|v| self.column_type.coerce(v.clone(), date_format))
            .collect::<Result<Vec<_>>>()?;

        for slot in self.values.iter_mut() {
            let hit = old.iter().position(|o| o.as_ref() == Some(&*slot));
            if let Some(k) = hit {
                *slot = new[k].clone();
            }
        }
        self.recount_missing();
        Ok(())
    }

    /// Empty column with the same name and type.
    pub fn clone_structure(&self) -> Column {
        Column::new(self.name.clone(), self.column_type)
    }

    /// Replace this column's values with a copy of `other`'s.
    pub fn copy_data_from(&mut self, other: &Column) -> Result<()> {
        if other.column_type != self.column_type {
            return Err(TableError::TypeMismatch {
                expected: self.column_type,
                actual: other.column_type,
            });
        }
        self.values = other.values.clone();
        self.missing = other.missing;
        Ok(())
    }

    /// A new column of type `target` holding every value converted.
    pub fn convert(&self, target: ColumnType, date_format: &str) -> Result<Column> {
        let mut converted = Column::new(self.name.clone(), target);
        converted.values.reserve(self.values.len());
        for value in &self.values {
            converted.append_with_format(value.clone(), date_format)?;
        }
        Ok(converted)
    }

    /// Text form of the value at `index`; missing values are empty.
    pub fn format(&self, index: usize, date_format: &str) -> Result<String> {
        self.get(index)?.to_text(date_format)
    }
}

impl Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Column {{ name: '{}', type: {:?}, len: {}, missing: {} }}",
            self.name,
            self.column_type,
            self.len(),
            self.missing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_column(values: &[Option<i64>]) -> Column {
        Column::from_values("a", ColumnType::Integer, values.iter().copied()).unwrap()
    }

    #[test]
    fn test_column_basic() {
        let mut col = Column::new("test", ColumnType::Integer);
        col.append(10).unwrap();
        col.append(20).unwrap();
        col.append(30).unwrap();

        assert_eq!(col.len(), 3);
        assert_eq!(col.get(0).unwrap().as_integer(), Some(10));
        assert_eq!(col.get(1).unwrap().as_integer(), Some(20));
        assert_eq!(col.get(2).unwrap().as_integer(), Some(30));
        assert!(col.get(3).is_err());
    }

    #[test]
    fn test_column_missing_count() {
        let mut col = int_column(&[Some(10), None, Some(30)]);
        assert_eq!(col.missing_count(), 1);
        assert!(col.is_null_at(1));
        assert!(!col.is_null_at(0));
        assert!(!col.is_null_at(9));

        col.set(1, 5).unwrap();
        assert_eq!(col.missing_count(), 0);
        col.set(0, ColumnValue::Null).unwrap();
        assert_eq!(col.missing_count(), 1);
        col.remove(0).unwrap();
        assert_eq!(col.missing_count(), 0);
    }

    #[test]
    fn test_column_set_rejects_bad_value() {
        let mut col = int_column(&[Some(1)]);
        assert!(matches!(
            col.set(0, "abc"),
            Err(TableError::ValueConversion { .. })
        ));
        assert_eq!(col.get(0).unwrap().as_integer(), Some(1));
        col.set(0, "12").unwrap();
        assert_eq!(col.get(0).unwrap().as_integer(), Some(12));
    }

    #[test]
    fn test_column_statistics() {
        let col = Column::from_values(
            "sepal.length",
            ColumnType::Double,
            vec![4.3, 5.1, 7.9],
        )
        .unwrap();
        assert_eq!(col.min(), Some(4.3));
        assert_eq!(col.max(), Some(7.9));
        assert!((col.mean().unwrap() - 5.766666).abs() < 1e-4);

        let text = Column::from_values("s", ColumnType::String, vec!["1", "2"]).unwrap();
        assert_eq!(text.min(), None);
        assert_eq!(text.mean(), None);
    }

    #[test]
    fn test_unique_count() {
        let col = int_column(&[Some(1), Some(2), Some(1), None, None]);
        assert_eq!(col.unique_count(), 2);
    }

    #[test]
    fn test_fill_and_replace() {
        let mut col = int_column(&[Some(0), None, Some(1), None]);
        col.fill_missing(-1).unwrap();
        assert_eq!(col.missing_count(), 0);

        col.replace_value(-1, ColumnValue::Null).unwrap();
        assert_eq!(col.missing_count(), 2);

        col.replace_value(ColumnValue::Null, 9).unwrap();
        assert_eq!(col.missing_count(), 0);

        col.replace_values(&[0.into(), 1.into()], &[11.into(), 12.into()])
            .unwrap();
        let values: Vec<i64> = col.iter().filter_map(ColumnValue::as_integer).collect();
        assert_eq!(values, vec![11, 9, 12, 9]);

        assert!(matches!(
            col.replace_values(&[1.into()], &[]),
            Err(TableError::ReplacementMismatch { old: 1, new: 0 })
        ));
    }

    #[test]
    fn test_replace_is_simultaneous() {
        let mut col = int_column(&[Some(1), Some(2)]);
        col.replace_values(&[1.into(), 2.into()], &[2.into(), 1.into()])
            .unwrap();
        assert_eq!(col.get(0).unwrap().as_integer(), Some(2));
        assert_eq!(col.get(1).unwrap().as_integer(), Some(1));
    }

    #[test]
    fn test_clone_structure_and_copy() {
        let col = int_column(&[Some(1), None]);
        let mut copy = col.clone_structure();
        assert_eq!(copy.name(), "a");
        assert_eq!(copy.column_type(), ColumnType::Integer);
        assert!(copy.is_empty());

        copy.copy_data_from(&col).unwrap();
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.missing_count(), 1);

        let mut text = Column::new("t", ColumnType::String);
        assert!(matches!(
            text.copy_data_from(&col),
            Err(TableError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_convert() {
        let col = Column::from_values("k", ColumnType::String, vec!["3", "1", "2"]).unwrap();
        let ints = col.convert(ColumnType::Integer, DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(ints.column_type(), ColumnType::Integer);
        assert_eq!(ints.get(1).unwrap().as_integer(), Some(1));

        let bad = Column::from_values("k", ColumnType::String, vec!["x"]).unwrap();
        assert!(bad.convert(ColumnType::Double, DEFAULT_DATE_FORMAT).is_err());
    }

    #[test]
    fn test_reorder_and_retain() {
        let mut col = int_column(&[Some(1), None, Some(3)]);
        col.reorder(&[2, 0, 1]);
        assert_eq!(col.get(0).unwrap().as_integer(), Some(3));
        assert!(col.get(2).unwrap().is_null());

        col.retain_rows(&[true, false, false]);
        assert_eq!(col.len(), 1);
        assert_eq!(col.missing_count(), 0);
    }
}
