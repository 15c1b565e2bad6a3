use serde::{Deserialize, Serialize};

use crate::core::align::AlignedSeries;
use crate::core::value_spec::AxisPosition;
use crate::error::{PipelineError, PipelineResult};

/// Tuning controls for axis extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtentTuning {
    /// Share of each bound's magnitude added outside it.
    pub padding_ratio: f64,
    /// Extent used when an axis has no finite data.
    pub fallback: AxisExtent,
}

impl Default for ExtentTuning {
    fn default() -> Self {
        Self {
            padding_ratio: 0.10,
            fallback: AxisExtent { min: 0.0, max: 10.0 },
        }
    }
}

impl ExtentTuning {
    pub fn validate(self) -> PipelineResult<Self> {
        if !self.padding_ratio.is_finite() || self.padding_ratio < 0.0 {
            return Err(PipelineError::InvalidConfig(
                "extent padding ratio must be finite and >= 0".to_owned(),
            ));
        }
        if !self.fallback.min.is_finite()
            || !self.fallback.max.is_finite()
            || self.fallback.min > self.fallback.max
        {
            return Err(PipelineError::InvalidConfig(
                "extent fallback must be a finite, ordered range".to_owned(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisExtent {
    pub min: f64,
    pub max: f64,
}

/// Padded ranges for the X axis and both Y axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotExtents {
    pub x: AxisExtent,
    pub y_default: AxisExtent,
    /// Present only when some series is drawn against the right axis.
    pub y_right: Option<AxisExtent>,
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn include(&mut self, value: f64, error: f64) {
        let error = if error.is_finite() { error.abs() } else { 0.0 };
        self.min = self.min.min(value - error);
        self.max = self.max.max(value + error);
    }

    fn finish(self, tuning: ExtentTuning) -> AxisExtent {
        if !self.min.is_finite() || !self.max.is_finite() {
            return tuning.fallback;
        }
        AxisExtent {
            min: self.min - self.min.abs() * tuning.padding_ratio,
            max: self.max + self.max.abs() * tuning.padding_ratio,
        }
    }
}

/// Computes padded extents over every visible `(x, y)` pair where both sides
/// are numbers.
///
/// Each bound is widened by its own magnitude times the padding ratio, so a
/// bound of zero stays at zero. Axes with no finite pair use the fallback.
#[must_use]
pub fn compute_extents(series: &[AlignedSeries], tuning: ExtentTuning) -> PlotExtents {
    let mut x = Accumulator::new();
    let mut y_default = Accumulator::new();
    let mut y_right = Accumulator::new();
    let mut has_right = false;

    for entry in series.iter().filter(|entry| entry.visible) {
        let Some(y_data) = &entry.y else {
            continue;
        };
        let target = match entry.position {
            AxisPosition::Default => &mut y_default,
            AxisPosition::Right => {
                has_right = true;
                &mut y_right
            }
        };
        for row in 0..entry.x.len() {
            let (Some(x_value), Some(y_value)) =
                (entry.x.values[row].as_f64(), y_data.values[row].as_f64())
            else {
                continue;
            };
            if !x_value.is_finite() || !y_value.is_finite() {
                continue;
            }
            x.include(x_value, entry.x.errors[row]);
            target.include(y_value, y_data.errors[row]);
        }
    }

    PlotExtents {
        x: x.finish(tuning),
        y_default: y_default.finish(tuning),
        y_right: has_right.then(|| y_right.finish(tuning)),
    }
}

#[cfg(test)]
mod tests {
    use super::{AxisExtent, ExtentTuning, compute_extents};
    use crate::core::align::{AlignedSeries, AxisData};
    use crate::core::types::Cell;
    use crate::core::value_spec::AxisPosition;
    use approx::assert_relative_eq;

    fn aligned(x: &[f64], y: &[Cell], position: AxisPosition) -> AlignedSeries {
        AlignedSeries {
            x: AxisData {
                values: x.iter().copied().map(Cell::number).collect(),
                errors: vec![0.0; x.len()],
            },
            y: Some(AxisData {
                values: y.to_vec(),
                errors: vec![0.0; y.len()],
            }),
            legend: String::new(),
            position,
            visible: true,
            labels: None,
            color: None,
            marker: None,
        }
    }

    #[test]
    fn bounds_are_padded_by_their_own_magnitude() {
        let series = vec![aligned(
            &[-10.0, 20.0],
            &[Cell::Number(5.0), Cell::Number(50.0)],
            AxisPosition::Default,
        )];
        let extents = compute_extents(&series, ExtentTuning::default());

        assert_relative_eq!(extents.x.min, -11.0);
        assert_relative_eq!(extents.x.max, 22.0);
        assert_relative_eq!(extents.y_default.min, 4.5);
        assert_relative_eq!(extents.y_default.max, 55.0);
        assert_eq!(extents.y_right, None);
    }

    #[test]
    fn pairs_with_missing_side_are_skipped() {
        let series = vec![aligned(
            &[1.0, 100.0],
            &[Cell::Number(1.0), Cell::Missing],
            AxisPosition::Default,
        )];
        let extents = compute_extents(&series, ExtentTuning::default());

        assert_relative_eq!(extents.x.max, 1.1);
    }

    #[test]
    fn right_axis_series_get_their_own_extent() {
        let series = vec![
            aligned(&[0.0], &[Cell::Number(1.0)], AxisPosition::Default),
            aligned(&[0.0], &[Cell::Number(1_000.0)], AxisPosition::Right),
        ];
        let extents = compute_extents(&series, ExtentTuning::default());

        let right = extents.y_right.expect("right extent");
        assert_relative_eq!(right.max, 1_100.0);
        assert_relative_eq!(extents.y_default.max, 1.1);
    }

    #[test]
    fn no_finite_pairs_fall_back() {
        let series = vec![aligned(&[1.0], &[Cell::text("n/a")], AxisPosition::Default)];
        let extents = compute_extents(&series, ExtentTuning::default());

        assert_eq!(extents.x, AxisExtent { min: 0.0, max: 10.0 });
        assert_eq!(extents.y_default, AxisExtent { min: 0.0, max: 10.0 });
    }
}
