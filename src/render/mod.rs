mod null_renderer;

pub use null_renderer::NullRenderer;

use crate::api::PlotData;
use crate::error::PipelineResult;

/// Contract implemented by any chart backend.
///
/// Backends receive fully prepared `PlotData`: series are aligned, sorted and
/// unwrapped, so drawing code never touches result documents or path logic.
pub trait SeriesRenderer {
    fn render(&mut self, plot: &PlotData) -> PipelineResult<()>;
}
