//! Bounded text previews of tables for logging

use super::Table;

/// Formatting limits for [`Table::preview`]
///
/// Passed per call; there is no process-wide display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub max_rows: usize,
    pub max_columns: usize,
    pub width: usize,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            max_rows: 20,
            max_columns: 20,
            width: 1000,
        }
    }
}

impl Table {
    /// Render the head and tail of the table as aligned text
    ///
    /// Rows beyond `max_rows` and columns beyond `max_columns` are elided
    /// with `...`; every line is truncated to `width` characters.
    pub fn preview(&self, options: &DisplayOptions) -> String {
        let shown_cols = self.columns().len().min(options.max_columns);
        let elide_cols = self.columns().len() > shown_cols;

        let row_indices: Vec<Option<usize>> = if self.len() > options.max_rows {
            let head = options.max_rows.div_ceil(2);
            let tail = options.max_rows / 2;
            (0..head)
                .map(Some)
                .chain(std::iter::once(None))
                .chain((self.len() - tail..self.len()).map(Some))
                .collect()
        } else {
            (0..self.len()).map(Some).collect()
        };

        let mut grid: Vec<Vec<String>> = Vec::with_capacity(row_indices.len() + 1);
        let mut header: Vec<String> = self.columns()[..shown_cols].to_vec();
        if elide_cols {
            header.push("...".to_string());
        }
        grid.push(header);

        for index in &row_indices {
            let mut line = match index {
                Some(i) => self.rows()[*i][..shown_cols]
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                None => vec!["...".to_string(); shown_cols],
            };
            if elide_cols {
                line.push("...".to_string());
            }
            grid.push(line);
        }

        let widths: Vec<usize> = (0..grid[0].len())
            .map(|c| grid.iter().map(|r| r[c].chars().count()).max().unwrap_or(0))
            .collect();

        let mut out = String::new();
        for row in grid {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
                .collect::<Vec<_>>()
                .join("  ");
            out.extend(line.trim_end().chars().take(options.width));
            out.push('\n');
        }
        out.push_str(&format!(
            "[{} rows x {} columns]",
            self.len(),
            self.columns().len()
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn numbers(rows: i64, cols: usize) -> Table {
        let columns = (0..cols).map(|c| format!("c{}", c)).collect();
        let mut table = Table::new(columns);
        for r in 0..rows {
            table.push_row(vec![Value::Int(r); cols]).unwrap();
        }
        table
    }

    #[test]
    fn test_small_table_shown_in_full() {
        let preview = numbers(3, 2).preview(&DisplayOptions::default());
        let lines: Vec<&str> = preview.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "c0  c1");
        assert_eq!(lines[4], "[3 rows x 2 columns]");
    }

    #[test]
    fn test_rows_and_columns_elided() {
        let options = DisplayOptions {
            max_rows: 4,
            max_columns: 2,
            width: 1000,
        };
        let preview = numbers(10, 5).preview(&options);
        let lines: Vec<&str> = preview.lines().collect();

        // header + 2 head + ellipsis + 2 tail + footer
        assert_eq!(lines.len(), 7);
        assert!(lines[0].ends_with("..."));
        assert!(lines[3].starts_with("..."));
        assert!(lines[5].starts_with('9'));
    }

    #[test]
    fn test_width_truncation() {
        let options = DisplayOptions {
            max_rows: 20,
            max_columns: 20,
            width: 5,
        };
        let preview = numbers(1, 10).preview(&options);
        assert!(preview.lines().take(2).all(|l| l.chars().count() <= 5));
    }
}
