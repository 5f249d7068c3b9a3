/// Printer boundary: a bounded window of rows as formatted text.

use crate::table::Table;
use serde::Serialize;
use std::fmt;

/// Rows shown by `Display for Table`.
const DISPLAY_ROWS: usize = 25;

/// Header plus a grid of formatted cells for rows `start..end`.
///
/// The first cell of every data row is the row index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePreview {
    pub name: String,
    pub header: Vec<String>,
    pub data: Vec<Vec<String>>,
    pub start: usize,
    pub end: usize,
    pub total_rows: usize,
    pub total_columns: usize,
}

impl Table {
    /// Preview rows `start..end`, clamped to the table.
    ///
    /// ```
    /// use tablekit::Table;
    ///
    /// let table = Table::from_csv("t", "a,b\n1,x\n2,y\n3,z\n", ',').unwrap();
    /// let preview = table.preview(1, 10);
    /// assert_eq!(preview.data, vec![vec!["1", "2", "y"], vec!["2", "3", "z"]]);
    /// assert_eq!(preview.total_rows, 3);
    /// ```
    pub fn preview(&self, start: usize, end: usize) -> TablePreview {
        let end = end.min(self.len());
        let start = start.min(end);

        let mut header = vec![String::new()];
        header.extend(self.column_names().into_iter().map(str::to_string));

        let data = (start..end)
            .map(|row| {
                let mut cells = vec![row.to_string()];
                cells.extend(
                    self.iter_columns()
                        .map(|c| c.format(row, &self.options.date_format).unwrap_or_default()),
                );
                cells
            })
            .collect();

        TablePreview {
            name: self.name.clone(),
            header,
            data,
            start,
            end,
            total_rows: self.len(),
            total_columns: self.column_count(),
        }
    }

    pub fn head(&self, rows: usize) -> TablePreview {
        self.preview(0, rows)
    }

    pub fn tail(&self, rows: usize) -> TablePreview {
        self.preview(self.len().saturating_sub(rows), self.len())
    }
}

impl fmt::Display for TablePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();
        for row in &self.data {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let rule: String = widths
            .iter()
            .map(|w| format!("+{}", "-".repeat(w + 2)))
            .collect::<String>()
            + "+";
        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("| {:<width$} ", cell, width = *w))
                .collect::<String>()
                + "|"
        };

        writeln!(f, "{}", rule)?;
        writeln!(f, "{}", line(&self.header[..]))?;
        writeln!(f, "{}", rule)?;
        for row in &self.data {
            writeln!(f, "{}", line(&row[..]))?;
        }
        writeln!(f, "{}", rule)?;

        let first = if self.data.is_empty() { 0 } else { self.start + 1 };
        write!(
            f,
            "Showing {} to {} of {} entries, {} total columns",
            first, self.end, self.total_rows, self.total_columns
        )
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        write!(f, "{}", self.head(DISPLAY_ROWS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::value::ColumnType;

    fn numbers(n: i64) -> Table {
        Table::from_columns(
            "numbers",
            vec![
                Column::from_values("n", ColumnType::Integer, 0..n).unwrap(),
                Column::from_values("half", ColumnType::Double, (0..n).map(|i| i as f64 / 2.0))
                    .unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_preview_window() {
        let table = numbers(5);
        let preview = table.preview(1, 3);
        assert_eq!(preview.header, vec!["", "n", "half"]);
        assert_eq!(preview.data, vec![vec!["1", "1", "0.5"], vec!["2", "2", "1.0"]]);
        assert_eq!((preview.start, preview.end), (1, 3));
        assert_eq!(preview.total_columns, 2);

        let clamped = table.preview(4, 100);
        assert_eq!(clamped.data.len(), 1);
        assert!(table.preview(9, 12).data.is_empty());
    }

    #[test]
    fn test_head_and_tail() {
        let table = numbers(40);
        assert_eq!(table.head(10).data.len(), 10);
        let tail = table.tail(3);
        assert_eq!(tail.start, 37);
        assert_eq!(tail.data[0][0], "37");
    }

    #[test]
    fn test_display_grid() {
        let table = numbers(2);
        let text = table.preview(0, 2).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "+---+---+------+");
        assert_eq!(lines[1], "|   | n | half |");
        assert_eq!(lines[3], "| 0 | 0 | 0.0  |");
        assert_eq!(
            lines.last().copied(),
            Some("Showing 1 to 2 of 2 entries, 2 total columns")
        );

        let full = numbers(30).to_string();
        assert!(full.starts_with("numbers\n"));
        assert!(full.ends_with("Showing 1 to 25 of 30 entries, 2 total columns"));
    }
}
