use serde::{Deserialize, Serialize};

use crate::core::types::{Cell, SeriesGrid};

/// Divisor applied to a series, either literal or derived from the data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScaleBy {
    Factor(f64),
    /// Smallest value, ignoring missing cells.
    Min,
    /// Largest value, ignoring missing cells.
    Max,
    /// Number of rows in the series.
    Count,
    /// Sum of all values, ignoring missing cells.
    Total,
}

impl Default for ScaleBy {
    fn default() -> Self {
        Self::Factor(1.0)
    }
}

impl ScaleBy {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "count" => Some(Self::Count),
            "total" => Some(Self::Total),
            _ => None,
        }
    }
}

/// Scale after the zero/non-finite guard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardedScale {
    pub value: f64,
    /// The raw scale was zero or non-finite and was replaced by `1`.
    pub degenerate: bool,
    pub raw: f64,
}

/// Resolves `mode` against `series` without guarding.
///
/// Reductions over a series without numeric cells return `NaN`.
#[must_use]
pub fn resolve_scale(series: &SeriesGrid, mode: ScaleBy) -> f64 {
    let numbers = || series.cells().iter().filter_map(Cell::as_f64);
    match mode {
        ScaleBy::Factor(value) => value,
        ScaleBy::Min => numbers().reduce(f64::min).unwrap_or(f64::NAN),
        ScaleBy::Max => numbers().reduce(f64::max).unwrap_or(f64::NAN),
        ScaleBy::Count => series.len() as f64,
        ScaleBy::Total => numbers().sum(),
    }
}

/// Replaces a zero or non-finite scale by `1`.
#[must_use]
pub fn guard_scale(raw: f64) -> GuardedScale {
    if raw == 0.0 || !raw.is_finite() {
        GuardedScale {
            value: 1.0,
            degenerate: true,
            raw,
        }
    } else {
        GuardedScale {
            value: raw,
            degenerate: false,
            raw,
        }
    }
}

pub fn apply_scale(series: &mut SeriesGrid, scale: f64) {
    if scale != 1.0 {
        series.divide_numbers(scale);
    }
}

#[cfg(test)]
mod tests {
    use super::{ScaleBy, apply_scale, guard_scale, resolve_scale};
    use crate::core::types::{Cell, SeriesGrid};

    fn series(values: &[f64]) -> SeriesGrid {
        SeriesGrid::column(values.iter().copied().map(Cell::number).collect())
    }

    #[test]
    fn named_reductions_ignore_missing_cells() {
        let grid = series(&[2.0, f64::NAN, 8.0, 4.0]);
        assert_eq!(resolve_scale(&grid, ScaleBy::Min), 2.0);
        assert_eq!(resolve_scale(&grid, ScaleBy::Max), 8.0);
        assert_eq!(resolve_scale(&grid, ScaleBy::Total), 14.0);
        assert_eq!(resolve_scale(&grid, ScaleBy::Count), 4.0);
        assert_eq!(resolve_scale(&grid, ScaleBy::Factor(3.0)), 3.0);
    }

    #[test]
    fn max_scale_normalizes_to_unit_peak() {
        let mut grid = series(&[2.0, 4.0, 8.0]);
        let scale = guard_scale(resolve_scale(&grid, ScaleBy::Max));
        assert_eq!(scale.value, 8.0);
        apply_scale(&mut grid, scale.value);
        assert_eq!(grid, series(&[0.25, 0.5, 1.0]));
    }

    #[test]
    fn zero_and_non_finite_scales_fall_back_to_one() {
        assert!(guard_scale(0.0).degenerate);
        assert_eq!(guard_scale(0.0).value, 1.0);
        assert!(guard_scale(f64::NAN).degenerate);
        assert!(!guard_scale(-2.0).degenerate);
    }

    #[test]
    fn min_of_series_without_numbers_is_degenerate() {
        let grid = SeriesGrid::column(vec![Cell::Missing]);
        assert!(guard_scale(resolve_scale(&grid, ScaleBy::Min)).degenerate);
    }
}
