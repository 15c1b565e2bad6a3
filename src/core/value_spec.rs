use serde::Serialize;

use crate::core::cutoff::Cutoff;
use crate::core::path::PathExpression;
use crate::core::scale::ScaleBy;
use crate::core::types::Cell;

/// Which vertical axis a series is drawn against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AxisPosition {
    #[default]
    Default,
    Right,
}

/// Where per-row labels come from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LabelSource {
    /// Resolved against every document like the value path.
    Path(PathExpression),
    /// Given inline in the configuration, one label per row.
    Literal(Vec<Cell>),
}

/// One requested series, fully defaulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueSpec {
    pub param: PathExpression,
    pub error: Option<PathExpression>,
    pub legend: String,
    pub scale_by: ScaleBy,
    pub min_cutoff: Cutoff,
    pub max_cutoff: Cutoff,
    pub labels: Option<LabelSource>,
    pub position: AxisPosition,
    pub visible: bool,
    pub color: Option<String>,
    pub marker: Option<String>,
}

impl ValueSpec {
    #[must_use]
    pub fn new(param: PathExpression) -> Self {
        Self {
            param,
            error: None,
            legend: String::new(),
            scale_by: ScaleBy::default(),
            min_cutoff: Cutoff::None,
            max_cutoff: Cutoff::None,
            labels: None,
            position: AxisPosition::Default,
            visible: true,
            color: None,
            marker: None,
        }
    }

    #[must_use]
    pub fn with_error(mut self, error: PathExpression) -> Self {
        self.error = Some(error);
        self
    }

    #[must_use]
    pub fn with_legend(mut self, legend: impl Into<String>) -> Self {
        self.legend = legend.into();
        self
    }

    #[must_use]
    pub fn with_scale_by(mut self, scale_by: ScaleBy) -> Self {
        self.scale_by = scale_by;
        self
    }

    #[must_use]
    pub fn with_cutoffs(mut self, min_cutoff: Cutoff, max_cutoff: Cutoff) -> Self {
        self.min_cutoff = min_cutoff;
        self.max_cutoff = max_cutoff;
        self
    }

    #[must_use]
    pub fn with_labels(mut self, labels: LabelSource) -> Self {
        self.labels = Some(labels);
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: AxisPosition) -> Self {
        self.position = position;
        self
    }
}

/// A value-spec together with the numeric scale its series was divided by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedValueSpec {
    pub spec: ValueSpec,
    pub scale: f64,
}
