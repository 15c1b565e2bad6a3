use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One resolved element of a series.
///
/// `Missing` is the sentinel for values that were never present (`null`),
/// were not a number (`NaN`), or were removed by a cutoff.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl Cell {
    /// Builds a numeric cell, mapping `NaN` to `Missing`.
    #[must_use]
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            Self::Missing
        } else {
            Self::Number(value)
        }
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Converts one JSON element into a cell.
    ///
    /// Booleans count as numbers (`1`/`0`). Nested arrays and objects are kept
    /// as their compact JSON text so they stay visible but non-numeric.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Missing,
            Value::Bool(flag) => Self::Number(if *flag { 1.0 } else { 0.0 }),
            Value::Number(number) => number.as_f64().map_or(Self::Missing, Self::number),
            Value::String(text) => Self::Text(text.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) | Self::Missing => None,
        }
    }

    /// Numeric view used by renderers: missing and text cells become `NaN`.
    #[must_use]
    pub fn to_f64_lossy(&self) -> f64 {
        self.as_f64().unwrap_or(f64::NAN)
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Fixed-width table of cells.
///
/// Rows shorter than the widest row are right-padded with `Cell::Missing` on
/// construction, so every row always has exactly `width` cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SeriesGrid {
    rows: usize,
    width: usize,
    cells: Vec<Cell>,
}

impl SeriesGrid {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a grid from possibly ragged rows.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let row_count = rows.len();
        let mut cells = Vec::with_capacity(row_count * width);
        for mut row in rows {
            row.resize(width, Cell::Missing);
            cells.extend(row);
        }
        Self {
            rows: row_count,
            width,
            cells,
        }
    }

    /// One single-cell row per value.
    #[must_use]
    pub fn column(values: Vec<Cell>) -> Self {
        Self {
            rows: values.len(),
            width: 1,
            cells: values,
        }
    }

    /// Grid of `rows` x `width` copies of `cell`.
    #[must_use]
    pub fn filled(rows: usize, width: usize, cell: Cell) -> Self {
        Self {
            rows,
            width,
            cells: vec![cell; rows * width],
        }
    }

    /// Single column holding `0..rows`.
    #[must_use]
    pub fn index_column(rows: usize) -> Self {
        Self::column((0..rows).map(|index| Cell::Number(index as f64)).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.width;
        Some(&self.cells[start..start + self.width])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        (0..self.rows).filter_map(|index| self.row(index))
    }

    /// First cell of a row, `Missing` for zero-width grids.
    #[must_use]
    pub fn first_in_row(&self, index: usize) -> Cell {
        self.row(index)
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or(Cell::Missing)
    }

    /// Divides every numeric cell by `divisor`.
    pub fn divide_numbers(&mut self, divisor: f64) {
        for cell in &mut self.cells {
            if let Cell::Number(value) = cell {
                *cell = Cell::number(*value / divisor);
            }
        }
    }

    /// Widens every row to `width`, padding with `Missing`.
    pub fn pad_to_width(&mut self, width: usize) {
        if width <= self.width {
            return;
        }
        let rows: Vec<Vec<Cell>> = self.iter_rows().map(<[Cell]>::to_vec).collect();
        let mut cells = Vec::with_capacity(self.rows * width);
        for mut row in rows {
            row.resize(width, Cell::Missing);
            cells.extend(row);
        }
        self.cells = cells;
        self.width = width;
    }

    /// Repeats the first row `rows` times.
    #[must_use]
    pub fn broadcast_first_row(&self, rows: usize) -> Self {
        let template = self.row(0).map(<[Cell]>::to_vec).unwrap_or_default();
        let mut cells = Vec::with_capacity(rows * template.len());
        for _ in 0..rows {
            cells.extend(template.iter().cloned());
        }
        Self {
            rows,
            width: template.len(),
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, SeriesGrid};
    use serde_json::json;

    #[test]
    fn ragged_rows_are_right_padded_with_missing() {
        let grid = SeriesGrid::from_rows(vec![
            vec![Cell::Number(1.0)],
            vec![Cell::Number(2.0), Cell::Number(3.0), Cell::Number(4.0)],
        ]);

        assert_eq!(grid.len(), 2);
        assert_eq!(grid.width(), 3);
        assert_eq!(
            grid.row(0).expect("row 0"),
            &[Cell::Number(1.0), Cell::Missing, Cell::Missing]
        );
    }

    #[test]
    fn json_conversion_maps_null_and_bool() {
        assert_eq!(Cell::from_json(&json!(null)), Cell::Missing);
        assert_eq!(Cell::from_json(&json!(true)), Cell::Number(1.0));
        assert_eq!(Cell::from_json(&json!("a")), Cell::text("a"));
        assert_eq!(Cell::from_json(&json!([1, 2])), Cell::text("[1,2]"));
    }

    #[test]
    fn division_skips_text_and_missing_cells() {
        let mut grid = SeriesGrid::column(vec![Cell::Number(4.0), Cell::Missing, Cell::text("x")]);
        grid.divide_numbers(2.0);
        assert_eq!(
            grid.cells(),
            &[Cell::Number(2.0), Cell::Missing, Cell::text("x")]
        );
    }

    #[test]
    fn first_in_row_of_zero_width_grid_is_missing() {
        let grid = SeriesGrid::from_rows(vec![Vec::new(), Vec::new()]);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.first_in_row(1), Cell::Missing);
    }
}
