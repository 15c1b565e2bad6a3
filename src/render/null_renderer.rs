use crate::api::PlotData;
use crate::error::PipelineResult;
use crate::render::SeriesRenderer;

/// No-op renderer used by tests and headless pipelines.
///
/// It still validates plot data so tests can catch inconsistent series before
/// a real backend sees them.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub last_series_count: usize,
    pub last_point_count: usize,
    /// Output file names of every plot accepted so far.
    pub rendered_files: Vec<String>,
}

impl SeriesRenderer for NullRenderer {
    fn render(&mut self, plot: &PlotData) -> PipelineResult<()> {
        plot.validate()?;
        self.last_series_count = plot.series.len();
        self.last_point_count = plot.series.iter().map(|series| series.x.len()).sum();
        self.rendered_files.push(plot.config.output_file.clone());
        Ok(())
    }
}
