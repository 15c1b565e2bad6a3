use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use crate::api::config::{NormalizedPlot, PlotKind};
use crate::api::source::DocumentSource;
use crate::core::{
    AlignedSeries, BuiltSeries, Diagnostic, DiagnosticKind, Diagnostics, ExtentTuning,
    PlotExtents, ResolvedValueSpec, ValueSpec, align, align_single, build_series,
    compute_extents,
};
use crate::error::{PipelineError, PipelineResult};
use crate::render::SeriesRenderer;

/// Everything a renderer needs for one plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotData {
    pub config: NormalizedPlot,
    /// One entry per plotted pair, in Y-axis value order.
    pub series: Vec<AlignedSeries>,
    /// Scales the value-specs resolved to, X before Y for each pair.
    pub resolved: Vec<ResolvedValueSpec>,
    /// Absent for histograms.
    pub extents: Option<PlotExtents>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PlotData {
    #[must_use]
    pub fn has_right_axis(&self) -> bool {
        self.series
            .iter()
            .any(|series| series.position == crate::core::AxisPosition::Right)
    }

    /// Checks the invariants renderers rely on.
    pub fn validate(&self) -> PipelineResult<()> {
        let histogram = self.config.plot.kind == PlotKind::Histogram;
        for series in &self.series {
            series.validate()?;
            if !histogram && series.y.is_none() {
                return Err(PipelineError::ShapeMismatch(format!(
                    "{} series `{}` has no y values",
                    self.config.plot.kind.as_str(),
                    series.legend
                )));
            }
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs one normalized plot against its documents.
pub fn prepare_plot(plot: &NormalizedPlot, documents: &[Value]) -> PipelineResult<PlotData> {
    prepare_plot_tuned(plot, documents, ExtentTuning::default())
}

/// Runs one normalized plot with explicit extent tuning.
///
/// Pairs that cannot be built (nothing resolved, mismatched shapes) are
/// skipped with a diagnostic; only invalid tuning is a hard error.
pub fn prepare_plot_tuned(
    plot: &NormalizedPlot,
    documents: &[Value],
    tuning: ExtentTuning,
) -> PipelineResult<PlotData> {
    let tuning = tuning.validate()?;
    let span = info_span!(
        "prepare_plot",
        results_file = %plot.results_file,
        title = %plot.plot.title
    );
    let _entered = span.enter();

    let mut diagnostics =
        Diagnostics::from(plot.diagnostics.clone()).with_results_file(plot.results_file.clone());
    let mut series = Vec::new();
    let mut resolved = Vec::new();
    for (x_spec, y_spec) in plot.value_pairs() {
        let subject = y_spec.or(x_spec).map_or("", |spec| spec.param.as_str());
        match prepare_pair(x_spec, y_spec, documents, &mut diagnostics) {
            Ok(Some(prepared)) => {
                resolved.extend(prepared.resolved);
                series.push(prepared.series);
            }
            Ok(None) => debug!(path = subject, "skipped pair without data"),
            Err(PipelineError::ShapeMismatch(message)) => {
                diagnostics.push(
                    DiagnosticKind::ShapeMismatch,
                    subject,
                    format!("{message}, pair skipped"),
                );
            }
            Err(err) => return Err(err),
        }
    }

    let extents = match plot.plot.kind {
        PlotKind::Histogram => None,
        PlotKind::Line | PlotKind::Scatter => Some(compute_extents(&series, tuning)),
    };

    info!(
        series = series.len(),
        documents = documents.len(),
        diagnostics = diagnostics.entries().len(),
        "prepared plot"
    );

    Ok(PlotData {
        config: plot.clone(),
        series,
        resolved,
        extents,
        diagnostics: diagnostics.into_vec(),
    })
}

struct PreparedPair {
    series: AlignedSeries,
    resolved: Vec<ResolvedValueSpec>,
}

fn build_optional(
    spec: Option<&ValueSpec>,
    documents: &[Value],
    diagnostics: &mut Diagnostics,
) -> PipelineResult<Option<BuiltSeries>> {
    spec.map(|spec| build_series(spec, documents, diagnostics))
        .transpose()
}

fn prepare_pair(
    x_spec: Option<&ValueSpec>,
    y_spec: Option<&ValueSpec>,
    documents: &[Value],
    diagnostics: &mut Diagnostics,
) -> PipelineResult<Option<PreparedPair>> {
    let x = build_optional(x_spec, documents, diagnostics)?;
    let y = build_optional(y_spec, documents, diagnostics)?;
    if x.as_ref().is_some_and(|built| built.series.is_empty())
        || y.as_ref().is_some_and(|built| built.series.is_empty())
    {
        return Ok(None);
    }

    let series = match (&x, &y) {
        (x, Some(y)) => {
            let pairing = align(x.as_ref().map(|built| &built.series), &y.series)?;
            AlignedSeries::from_pairing(pairing, &y.series)
        }
        (Some(x), None) => AlignedSeries::from_pairing(align_single(&x.series), &x.series),
        (None, None) => return Ok(None),
    };
    let resolved = x
        .into_iter()
        .chain(y)
        .map(|built| built.resolved)
        .collect();
    Ok(Some(PreparedPair { series, resolved }))
}

/// A configuration that could not be plotted.
#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the configuration in the batch.
    pub index: usize,
    pub results_file: Option<String>,
    pub error: PipelineError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub rendered: usize,
    /// Valid configurations that produced no series.
    pub skipped: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }
}

/// Normalizes, prepares and renders every configuration in order.
///
/// A failing configuration is recorded and never stops the batch.
pub fn run_batch<S, R>(configs: &[Value], source: &mut S, renderer: &mut R) -> BatchReport
where
    S: DocumentSource + ?Sized,
    R: SeriesRenderer + ?Sized,
{
    let mut report = BatchReport::default();
    for (index, config) in configs.iter().enumerate() {
        match run_one(config, source, renderer) {
            Ok(true) => report.rendered += 1,
            Ok(false) => report.skipped += 1,
            Err(error) => {
                let results_file = config
                    .get("results_file")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                warn!(
                    index,
                    results_file = results_file.as_deref().unwrap_or(""),
                    error = %error,
                    "plot configuration failed"
                );
                report.failures.push(BatchFailure {
                    index,
                    results_file,
                    error,
                });
            }
        }
    }
    info!(
        configs = configs.len(),
        rendered = report.rendered,
        skipped = report.skipped,
        failed = report.failures.len(),
        "batch finished"
    );
    report
}

fn run_one<S, R>(config: &Value, source: &mut S, renderer: &mut R) -> PipelineResult<bool>
where
    S: DocumentSource + ?Sized,
    R: SeriesRenderer + ?Sized,
{
    let plot = NormalizedPlot::from_value(config)?;
    let documents = source.load(&plot.results_file)?;
    let data = prepare_plot(&plot, &documents)?;
    if data.series.is_empty() {
        warn!(
            results_file = %plot.results_file,
            title = %plot.plot.title,
            "no series to plot, skipping"
        );
        return Ok(false);
    }
    renderer.render(&data)?;
    Ok(true)
}
