use serde::{Deserialize, Serialize};

use crate::core::types::Cell;

/// Bound outside which numeric values are marked missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Cutoff {
    #[default]
    None,
    /// Fixed bound in the series' own units.
    Absolute(f64),
    /// Bound taken as the given percentile (0..=100) of the series.
    Percentile(f64),
}

impl Cutoff {
    /// Parses the `p<number>` marker form, e.g. `"p95"`.
    ///
    /// Returns `None` for any other leading character, an unparsable number,
    /// or a percentile outside `[0, 100]`.
    #[must_use]
    pub fn parse_marker(marker: &str) -> Option<Self> {
        let rest = marker.strip_prefix('p')?;
        let percentile = rest.trim().parse::<f64>().ok()?;
        if !percentile.is_finite() || !(0.0..=100.0).contains(&percentile) {
            return None;
        }
        Some(Self::Percentile(percentile))
    }

    #[must_use]
    pub fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    fn threshold(self, sorted_numbers: &[f64]) -> Option<f64> {
        match self {
            Self::None => None,
            Self::Absolute(value) => Some(value),
            Self::Percentile(percentile) => percentile_of_sorted(sorted_numbers, percentile),
        }
    }
}

/// Concrete thresholds for one series, resolved once before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CutoffBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Result of filtering one slice of cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CutoffOutcome {
    pub values: Vec<Cell>,
    pub marked: usize,
}

impl CutoffOutcome {
    #[must_use]
    pub fn removed_fraction(&self) -> f64 {
        removed_fraction(self.marked, self.values.len())
    }
}

impl CutoffBounds {
    /// Resolves both cutoffs against `values`.
    ///
    /// Percentiles are computed here, over every numeric cell, so callers that
    /// filter a series piecewise still use series-wide thresholds.
    #[must_use]
    pub fn resolve<'a>(
        min_cutoff: Cutoff,
        max_cutoff: Cutoff,
        values: impl IntoIterator<Item = &'a Cell>,
    ) -> Self {
        if min_cutoff.is_none() && max_cutoff.is_none() {
            return Self::default();
        }

        let needs_percentile = matches!(min_cutoff, Cutoff::Percentile(_))
            || matches!(max_cutoff, Cutoff::Percentile(_));
        let sorted = if needs_percentile {
            let mut numbers: Vec<f64> = values.into_iter().filter_map(Cell::as_f64).collect();
            numbers.sort_by(f64::total_cmp);
            numbers
        } else {
            Vec::new()
        };

        Self {
            min: min_cutoff.threshold(&sorted),
            max: max_cutoff.threshold(&sorted),
        }
    }

    #[must_use]
    pub fn is_unbounded(self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Marks out-of-range numbers as missing and drops non-numeric cells.
    ///
    /// Unbounded filters return the input untouched, text cells included.
    #[must_use]
    pub fn apply(self, values: &[Cell]) -> CutoffOutcome {
        if self.is_unbounded() {
            return CutoffOutcome {
                values: values.to_vec(),
                marked: 0,
            };
        }

        let mut marked = 0;
        let mut filtered = Vec::with_capacity(values.len());
        for cell in values {
            match cell {
                Cell::Number(value) => {
                    let below = self.min.is_some_and(|min| *value < min);
                    let above = self.max.is_some_and(|max| *value > max);
                    if below || above {
                        marked += 1;
                        filtered.push(Cell::Missing);
                    } else {
                        filtered.push(cell.clone());
                    }
                }
                Cell::Missing => filtered.push(Cell::Missing),
                Cell::Text(_) => {}
            }
        }

        CutoffOutcome {
            values: filtered,
            marked,
        }
    }
}

/// Filters `values` with the given cutoffs and reports the removed fraction.
#[must_use]
pub fn apply_cutoff(values: &[Cell], min_cutoff: Cutoff, max_cutoff: Cutoff) -> (Vec<Cell>, f64) {
    let outcome = CutoffBounds::resolve(min_cutoff, max_cutoff, values).apply(values);
    let fraction = outcome.removed_fraction();
    (outcome.values, fraction)
}

#[must_use]
pub(crate) fn removed_fraction(marked: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        marked as f64 / total as f64
    }
}

/// Percentile with linear interpolation between closest ranks.
#[must_use]
pub fn percentile(values: &[f64], percentile: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    percentile_of_sorted(&sorted, percentile)
}

fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> Option<f64> {
    if sorted.is_empty() || !percentile.is_finite() {
        return None;
    }
    let rank = percentile.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
