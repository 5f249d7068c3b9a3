/// Reader and writer boundaries.
///
/// Readers hand the table a header and records of raw strings; columns start
/// out as strings and are re-typed by detection once every record is in.
/// Writers receive the column names and then, row by row, each field's text.
/// A field that cannot be formatted is written empty and reported in the
/// [`WriteReport`] instead of aborting the write.

use crate::column::Column;
use crate::config::TableOptions;
use crate::error::{Result, TableError};
use crate::table::Table;
use crate::value::{ColumnType, ColumnValue};
use serde::Serialize;
use std::io::{self, Write};

/// Destination driven one row at a time.
pub trait TableWriter {
    fn set_columns(&mut self, columns: &[&str]) -> io::Result<()>;

    fn set_string(&mut self, column: &str, value: &str) -> io::Result<()>;

    /// Finish the current row.
    fn next_row(&mut self) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

/// Delimited text writer with a header line.
pub struct CsvWriter<W: Write> {
    out: W,
    separator: char,
    columns: Vec<String>,
    current: Vec<String>,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W) -> Self {
        Self::with_separator(out, ',')
    }

    pub fn with_separator(out: W, separator: char) -> Self {
        CsvWriter {
            out,
            separator,
            columns: Vec::new(),
            current: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, fields: &[String]) -> io::Result<()> {
        let separator = self.separator.to_string();
        let line: Vec<String> = fields.iter().map(|f| self.escape(f)).collect();
        writeln!(self.out, "{}", line.join(&separator))
    }

    // Quote fields containing the separator, quotes or line breaks
    fn escape(&self, field: &str) -> String {
        if field.contains(self.separator)
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r')
        {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}

impl<W: Write> TableWriter for CsvWriter<W> {
    fn set_columns(&mut self, columns: &[&str]) -> io::Result<()> {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.current = vec![String::new(); columns.len()];
        let header = self.columns.clone();
        self.write_line(&header)
    }

    fn set_string(&mut self, column: &str, value: &str) -> io::Result<()> {
        let position = self.columns.iter().position(|c| c == column).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("unknown column '{}'", column))
        })?;
        self.current[position] = value.to_string();
        Ok(())
    }

    fn next_row(&mut self) -> io::Result<()> {
        let fields = std::mem::replace(&mut self.current, vec![String::new(); self.columns.len()]);
        self.write_line(&fields)
    }

    fn close(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// A field that could not be formatted and was written empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFailure {
    pub row: usize,
    pub column: String,
    pub message: String,
}

/// Outcome of [`write_table`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteReport {
    pub rows: usize,
    pub columns: usize,
    pub failures: Vec<FieldFailure>,
}

/// Drive `writer` with every row of `table`, then close it.
pub fn write_table(table: &Table, writer: &mut impl TableWriter) -> Result<WriteReport> {
    table.assert_not_empty()?;
    writer.set_columns(&table.column_names())?;

    let date_format = &table.options().date_format;
    let mut report = WriteReport {
        rows: table.len(),
        columns: table.column_count(),
        failures: Vec::new(),
    };

    for row in 0..table.len() {
        for column in table.iter_columns() {
            match column.format(row, date_format) {
                Ok(text) => writer.set_string(column.name(), &text)?,
                Err(e) => {
                    log::warn!(
                        "{}: cannot write '{}' at row {}: {}",
                        table.name(),
                        column.name(),
                        row,
                        e
                    );
                    report.failures.push(FieldFailure {
                        row,
                        column: column.name().to_string(),
                        message: e.to_string(),
                    });
                    writer.set_string(column.name(), "")?;
                }
            }
        }
        writer.next_row()?;
    }
    writer.close()?;

    table.log(format_args!(
        "Wrote {} rows and {} columns.",
        report.rows, report.columns
    ));
    Ok(report)
}

impl Table {
    /// Build a table from a header and records of raw values, then detect
    /// column types. `None` marks a missing value.
    pub fn from_records<I>(name: impl Into<String>, header: Vec<String>, records: I) -> Result<Table>
    where
        I: IntoIterator<Item = Vec<Option<String>>>,
    {
        Self::from_records_with(name, header, records, TableOptions::default())
    }

    pub fn from_records_with<I>(
        name: impl Into<String>,
        header: Vec<String>,
        records: I,
        options: TableOptions,
    ) -> Result<Table>
    where
        I: IntoIterator<Item = Vec<Option<String>>>,
    {
        let mut table = Table::with_options(name, options);
        for column in &header {
            table.push_column(Column::new(column.as_str(), ColumnType::String))?;
        }

        for (record, values) in records.into_iter().enumerate() {
            if values.len() != header.len() {
                return Err(TableError::RecordLength {
                    record,
                    expected: header.len(),
                    actual: values.len(),
                });
            }
            for (column, value) in table.columns.iter_mut().zip(values) {
                column.push(value.map_or(ColumnValue::Null, ColumnValue::String));
            }
        }

        table.log(format_args!(
            "Loaded {} rows and {} columns.",
            table.len(),
            table.column_count()
        ));
        table.detect_types()?;
        Ok(table)
    }

    /// Parse delimited text whose first line is the header.
    ///
    /// Empty fields are missing values and blank lines are skipped. Text
    /// without any line yields a table without columns.
    pub fn from_csv(name: impl Into<String>, text: &str, separator: char) -> Result<Table> {
        let mut rows = parse_csv_rows(text, separator)
            .into_iter()
            .filter(|row| !row.iter().all(String::is_empty));
        let header = match rows.next() {
            Some(header) => header,
            None => return Ok(Table::new(name)),
        };

        let records = rows.map(|row| {
            row.into_iter()
                .map(|field| if field.is_empty() { None } else { Some(field) })
                .collect::<Vec<_>>()
        });
        Self::from_records(name, header, records)
    }

    /// Write every row as delimited text to `out`.
    pub fn write_csv<W: Write>(&self, out: W, separator: char) -> Result<WriteReport> {
        write_table(self, &mut CsvWriter::with_separator(out, separator))
    }

    /// Comma separated text with a header line.
    ///
    /// ```
    /// use tablekit::Table;
    ///
    /// let table = Table::from_csv("students", "id,name\n1,Alice\n2,\"Bob, Jr\"\n", ',').unwrap();
    /// let csv = table.to_csv().unwrap();
    /// assert_eq!(csv, "id,name\n1,Alice\n2,\"Bob, Jr\"\n");
    /// ```
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = CsvWriter::new(Vec::new());
        write_table(self, &mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    /// Pretty-printed JSON array with one object per row.
    pub fn to_json(&self) -> Result<String> {
        let date_format = &self.options.date_format;
        let mut rows = Vec::with_capacity(self.len());
        for row in 0..self.len() {
            let mut object = serde_json::Map::new();
            for column in &self.columns {
                let value = match column.get(row)? {
                    ColumnValue::Integer(n) => serde_json::Value::from(*n),
                    ColumnValue::Double(d) => serde_json::Number::from_f64(*d)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null),
                    ColumnValue::Boolean(b) => serde_json::Value::Bool(*b),
                    ColumnValue::String(s) => serde_json::Value::String(s.clone()),
                    date @ ColumnValue::Date(_) => serde_json::Value::String(date.to_text(date_format)?),
                    ColumnValue::Null => serde_json::Value::Null,
                };
                object.insert(column.name().to_string(), value);
            }
            rows.push(serde_json::Value::Object(object));
        }
        Ok(serde_json::to_string_pretty(&rows)?)
    }
}

/// Split delimited text into rows, honouring quoted fields with embedded
/// separators, doubled quotes and line breaks.
fn parse_csv_rows(text: &str, separator: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut current_row = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current_field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            c if c == separator && !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
            }
            '\n' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
                rows.push(std::mem::take(&mut current_row));
            }
            '\r' if !in_quotes => {}
            _ => current_field.push(c),
        }
    }

    if !current_field.is_empty() || !current_row.is_empty() {
        current_row.push(current_field);
        rows.push(current_row);
    }
    rows
}
