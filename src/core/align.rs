use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::debug;

use crate::core::series::Series;
use crate::core::types::{Cell, SeriesGrid};
use crate::core::value_spec::AxisPosition;
use crate::error::{PipelineError, PipelineResult};

/// One axis of an aligned pair, one entry per row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisData {
    pub values: Vec<Cell>,
    pub errors: Vec<f64>,
}

impl AxisData {
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// X/Y correspondence after broadcasting, sorting and unwrapping.
///
/// When `y` is present, `x`, `y` and `labels` all have the same length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisPairing {
    pub x: AxisData,
    pub y: Option<AxisData>,
    pub labels: Option<Vec<Cell>>,
}

/// Renderer-facing series: aligned data plus presentation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSeries {
    pub x: AxisData,
    pub y: Option<AxisData>,
    pub legend: String,
    pub position: AxisPosition,
    pub visible: bool,
    pub labels: Option<Vec<Cell>>,
    pub color: Option<String>,
    pub marker: Option<String>,
}

impl AlignedSeries {
    #[must_use]
    pub fn from_pairing(pairing: AxisPairing, source: &Series) -> Self {
        Self {
            x: pairing.x,
            y: pairing.y,
            legend: source.legend.clone(),
            position: source.position,
            visible: source.visible,
            labels: pairing.labels,
            color: source.color.clone(),
            marker: source.marker.clone(),
        }
    }

    /// Checks the length invariants renderers rely on.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.x.values.len() != self.x.errors.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "series `{}`: {} x values but {} x errors",
                self.legend,
                self.x.values.len(),
                self.x.errors.len()
            )));
        }
        if let Some(y) = &self.y {
            if y.values.len() != self.x.len() || y.errors.len() != self.x.len() {
                return Err(PipelineError::ShapeMismatch(format!(
                    "series `{}`: {} x rows but {} y values and {} y errors",
                    self.legend,
                    self.x.len(),
                    y.values.len(),
                    y.errors.len()
                )));
            }
        }
        if let Some(labels) = &self.labels {
            if labels.len() != self.x.len() {
                return Err(PipelineError::ShapeMismatch(format!(
                    "series `{}`: {} labels for {} rows",
                    self.legend,
                    labels.len(),
                    self.x.len()
                )));
            }
        }
        Ok(())
    }
}

/// Pairs `y` with `x`, or with a synthesized `0..len(y)` index when `x` is absent.
///
/// A single-row side is broadcast across the other side's rows. Any other
/// row-count disagreement is a `ShapeMismatch`. Rows are stable-sorted by
/// their first X cell unless some X key is text, then every row is reduced to
/// its first cell.
pub fn align(x: Option<&Series>, y: &Series) -> PipelineResult<AxisPairing> {
    let y_rows = y.values.len();
    let (mut x_values, mut x_errors) = match x {
        Some(series) => (series.values.clone(), series.errors.clone()),
        None => (
            SeriesGrid::index_column(y_rows),
            SeriesGrid::filled(y_rows, 1, Cell::Number(0.0)),
        ),
    };
    let mut y_values = y.values.clone();
    let mut y_errors = y.errors.clone();
    let mut labels = y.labels.clone();

    if x_values.len() != x_errors.len() {
        return Err(PipelineError::ShapeMismatch(format!(
            "{} x values but {} x errors",
            x_values.len(),
            x_errors.len()
        )));
    }
    if y_values.len() != y_errors.len() {
        return Err(PipelineError::ShapeMismatch(format!(
            "{} y values but {} y errors",
            y_values.len(),
            y_errors.len()
        )));
    }

    let x_rows = x_values.len();
    if x_rows != y_rows {
        if x_rows == 1 && y_rows > 1 {
            debug!(rows = y_rows, "broadcasting single x row");
            x_values = x_values.broadcast_first_row(y_rows);
            x_errors = x_errors.broadcast_first_row(y_rows);
        } else if y_rows == 1 && x_rows > 1 {
            debug!(rows = x_rows, "broadcasting single y row");
            y_values = y_values.broadcast_first_row(x_rows);
            y_errors = y_errors.broadcast_first_row(x_rows);
            labels = labels.map(|grid| grid.broadcast_first_row(x_rows));
        } else {
            return Err(PipelineError::ShapeMismatch(format!(
                "{x_rows} x rows cannot be paired with {y_rows} y rows"
            )));
        }
    }

    let order = sorted_row_order(&x_values);
    Ok(AxisPairing {
        x: unwrap_rows(&x_values, &x_errors, &order),
        y: Some(unwrap_rows(&y_values, &y_errors, &order)),
        labels: labels.and_then(|grid| unwrap_labels(&grid, &order)),
    })
}

/// Unwraps a series that has no counterpart on the other axis.
///
/// Row order is kept as built; there is nothing to pair it with.
#[must_use]
pub fn align_single(series: &Series) -> AxisPairing {
    let order: Vec<usize> = (0..series.values.len()).collect();
    AxisPairing {
        x: unwrap_rows(&series.values, &series.errors, &order),
        y: None,
        labels: series
            .labels
            .as_ref()
            .and_then(|grid| unwrap_labels(grid, &order)),
    }
}

/// Row permutation sorting by the first X cell.
///
/// Missing keys sort after every number; ties keep their original order. If
/// any key is text the identity order is returned.
fn sorted_row_order(x_values: &SeriesGrid) -> Vec<usize> {
    let keys: Vec<Cell> = (0..x_values.len())
        .map(|row| x_values.first_in_row(row))
        .collect();
    let mut order: Vec<usize> = (0..keys.len()).collect();
    if keys.iter().any(Cell::is_text) {
        debug!("x values are not numeric, keeping original row order");
        return order;
    }

    order.sort_by_key(|&row| OrderedFloat(keys[row].to_f64_lossy()));
    order
}

fn unwrap_rows(values: &SeriesGrid, errors: &SeriesGrid, order: &[usize]) -> AxisData {
    AxisData {
        values: order.iter().map(|&row| values.first_in_row(row)).collect(),
        errors: order
            .iter()
            .map(|&row| errors.first_in_row(row).to_f64_lossy())
            .collect(),
    }
}

fn unwrap_labels(labels: &SeriesGrid, order: &[usize]) -> Option<Vec<Cell>> {
    let unwrapped: Vec<Cell> = order.iter().map(|&row| labels.first_in_row(row)).collect();
    if unwrapped.iter().all(Cell::is_missing) {
        return None;
    }
    Some(unwrapped)
}

#[cfg(test)]
mod tests {
    use super::{align, align_single};
    use crate::core::series::Series;
    use crate::core::types::{Cell, SeriesGrid};
    use crate::core::value_spec::AxisPosition;

    fn series(values: Vec<Cell>) -> Series {
        let rows = values.len();
        Series {
            values: SeriesGrid::column(values),
            errors: SeriesGrid::filled(rows, 1, Cell::Number(0.0)),
            legend: String::new(),
            position: AxisPosition::Default,
            visible: true,
            labels: None,
            color: None,
            marker: None,
        }
    }

    fn numbers(values: &[f64]) -> Vec<Cell> {
        values.iter().copied().map(Cell::number).collect()
    }

    #[test]
    fn text_x_keys_disable_sorting() {
        let x = series(vec![Cell::text("b"), Cell::text("a")]);
        let y = series(numbers(&[2.0, 1.0]));
        let pairing = align(Some(&x), &y).expect("aligned");
        assert_eq!(pairing.x.values, vec![Cell::text("b"), Cell::text("a")]);
        assert_eq!(pairing.y.expect("y").values, numbers(&[2.0, 1.0]));
    }

    #[test]
    fn missing_x_keys_sort_last_and_ties_keep_order() {
        let x = series(vec![Cell::Missing, Cell::Number(1.0), Cell::Number(1.0)]);
        let y = series(numbers(&[30.0, 10.0, 20.0]));
        let pairing = align(Some(&x), &y).expect("aligned");
        assert_eq!(pairing.y.expect("y").values, numbers(&[10.0, 20.0, 30.0]));
    }

    #[test]
    fn broadcast_rows_unwrap_to_first_cell() {
        let x = Series {
            values: SeriesGrid::from_rows(vec![vec![Cell::Number(5.0), Cell::Number(6.0)]]),
            errors: SeriesGrid::filled(1, 2, Cell::Number(0.5)),
            ..series(Vec::new())
        };
        let y = series(numbers(&[1.0, 2.0]));
        let pairing = align(Some(&x), &y).expect("aligned");
        assert_eq!(pairing.x.values, numbers(&[5.0, 5.0]));
        assert_eq!(pairing.x.errors, vec![0.5, 0.5]);
    }

    #[test]
    fn all_missing_labels_become_absent() {
        let mut y = series(numbers(&[1.0, 2.0]));
        y.labels = Some(SeriesGrid::column(vec![Cell::Missing, Cell::Missing]));
        let pairing = align(None, &y).expect("aligned");
        assert_eq!(pairing.labels, None);
    }

    #[test]
    fn labels_follow_sorted_rows() {
        let x = series(numbers(&[2.0, 1.0]));
        let mut y = series(numbers(&[20.0, 10.0]));
        y.labels = Some(SeriesGrid::column(vec![Cell::text("two"), Cell::text("one")]));
        let pairing = align(Some(&x), &y).expect("aligned");
        assert_eq!(
            pairing.labels,
            Some(vec![Cell::text("one"), Cell::text("two")])
        );
    }

    #[test]
    fn single_axis_keeps_build_order() {
        let x = series(numbers(&[3.0, 1.0, 2.0]));
        let pairing = align_single(&x);
        assert_eq!(pairing.x.values, numbers(&[3.0, 1.0, 2.0]));
        assert!(pairing.y.is_none());
    }
}
