pub mod align;
pub mod cutoff;
pub mod diagnostics;
pub mod extent;
pub mod path;
pub mod scale;
pub mod series;
pub mod types;
pub mod value_spec;

pub use align::{AlignedSeries, AxisData, AxisPairing, align, align_single};
pub use cutoff::{Cutoff, CutoffBounds, CutoffOutcome, apply_cutoff, percentile};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use extent::{AxisExtent, ExtentTuning, PlotExtents, compute_extents};
pub use path::{PathExpression, PathMiss, PathSegment};
pub use scale::{GuardedScale, ScaleBy, apply_scale, guard_scale, resolve_scale};
pub use series::{BuiltSeries, Series, build_series};
pub use types::{Cell, SeriesGrid};
pub use value_spec::{AxisPosition, LabelSource, ResolvedValueSpec, ValueSpec};
