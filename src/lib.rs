/// TableKit - In-Memory Tabular Data Engine
///
/// Typed, nullable columns grouped into tables, with row and column operation
/// facades, type detection, grouping/aggregation and hash-index merges.
/// Everything runs synchronously on the calling thread; a table is owned and
/// mutated by one caller at a time.

pub mod error;
pub mod config;
pub mod value;
pub mod column;
pub mod detect;
pub mod row;
pub mod table;
pub mod row_ops;
pub mod column_ops;
pub mod group;
pub mod index;
pub mod io;
pub mod print;

pub use error::{Result, TableError};
pub use config::{TableOptions, DEFAULT_DATE_FORMAT};
pub use value::{ColumnType, ColumnValue};
pub use column::Column;
pub use detect::{guess_type, guess_type_of, DETECTION_ORDER};
pub use row::{DetachedRow, Row, RowAccess, RowMut};
pub use table::Table;
pub use row_ops::{RowOperations, SortKey, SortOrder};
pub use column_ops::ColumnOperations;
pub use group::{Aggregation, Aggregator, BinMapper, ColumnMapper, GroupBy, RowMapper, COUNT_COLUMN, KEY_COLUMN};
pub use index::{KeyPolicy, TableIndex};
pub use io::{write_table, CsvWriter, FieldFailure, TableWriter, WriteReport};
pub use print::TablePreview;
