//! Fixed-width text tables

use std::collections::BTreeMap;
use std::fmt::Write;

/// One table cell. Numbers are right aligned, text left aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Number(i64),
}

impl Cell {
    fn text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n)
    }
}

/// A table row: named cells plus the key it sorts by
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: BTreeMap<&'static str, Cell>,
    order: String,
}

impl Row {
    pub fn new(order: impl Into<String>) -> Self {
        Self {
            cells: BTreeMap::new(),
            order: order.into(),
        }
    }

    pub fn set(mut self, column: &'static str, value: impl Into<Cell>) -> Self {
        self.cells.insert(column, value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn has(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }
}

/// Columns of `preferred` that at least one row fills, in `preferred` order
pub fn present_columns(preferred: &[&'static str], rows: &[Row]) -> Vec<&'static str> {
    preferred
        .iter()
        .copied()
        .filter(|column| rows.iter().any(|row| row.has(column)))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<&'static str>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<&'static str>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Table over the columns the rows actually use; `fallback` when there
    /// are no rows at all
    pub fn from_present(
        preferred: &[&'static str],
        fallback: &[&'static str],
        rows: Vec<Row>,
    ) -> Self {
        let columns = if rows.is_empty() {
            fallback.to_vec()
        } else {
            present_columns(preferred, &rows)
        };
        Self { columns, rows }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .map(|column| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(column))
                    .map(|cell| cell.text().chars().count())
                    .fold(column.chars().count(), usize::max)
                    .max(1)
            })
            .collect()
    }

    /// Header line then one line per row, rows in ascending sort key order.
    /// Rows with equal keys keep their insertion order.
    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut out = String::new();

        for (column, width) in self.columns.iter().zip(&widths) {
            let _ = write!(out, "{:<w$.w$} ", column, w = width);
        }
        out.push('\n');

        let mut rows: Vec<&Row> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.order.cmp(&b.order));

        for row in rows {
            for (column, width) in self.columns.iter().zip(&widths) {
                let _ = match row.get(column) {
                    Some(Cell::Number(n)) => write!(out, "{:>w$} ", n, w = width),
                    Some(Cell::Text(s)) => write!(out, "{:<w$} ", s, w = width),
                    None => write!(out, "{:<w$} ", "", w = width),
                };
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths_cover_header_and_cells() {
        let mut table = Table::new(vec!["RuleNumber", "SrcAddr"]);
        table.push(Row::new("b").set("RuleNumber", 100).set("SrcAddr", "10.0.0.0/8"));
        table.push(Row::new("a").set("RuleNumber", 32767).set("SrcAddr", "*"));

        assert_eq!(
            table.render(),
            "RuleNumber SrcAddr    \n     32767 *          \n       100 10.0.0.0/8 \n"
        );
    }

    #[test]
    fn test_empty_table_keeps_header_width() {
        let table = Table::from_present(&["A", "Bb"], &["A", "Bb"], vec![]);
        assert_eq!(table.render(), "A Bb \n");
        assert!(table.is_empty());
    }

    #[test]
    fn test_present_columns_keep_preferred_order() {
        let rows = vec![
            Row::new("1").set("DstPort", "80"),
            Row::new("2").set("SrcAddr", "*"),
        ];
        assert_eq!(
            present_columns(&["RuleNumber", "SrcAddr", "DstPort"], &rows),
            vec!["SrcAddr", "DstPort"]
        );
    }
}
