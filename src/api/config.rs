//! Plot configuration parsing and normalization.
//!
//! Configurations are deserialized leniently into raw records, then a single
//! normalization pass fills defaults, drops unusable entries with a
//! diagnostic, and rejects configurations that cannot be plotted at all.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info_span};

use crate::core::{
    AxisPosition, Cell, Cutoff, Diagnostic, DiagnosticKind, Diagnostics, LabelSource,
    PathExpression, ScaleBy, ValueSpec,
};
use crate::error::{PipelineError, PipelineResult};

const DEFAULT_RENDERER: &str = "bokeh";
const SUPPORTED_RENDERERS: [&str; 2] = ["bokeh", "matplotlib"];
const DEFAULT_X_LABEL: &str = "index";

/// A field that is kept only when it has the expected JSON type.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Valid(T),
    Other(IgnoredAny),
}

impl<T> Loose<T> {
    fn valid(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrName {
    Number(f64),
    Name(String),
    Other(IgnoredAny),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawIndex {
    One(usize),
    Many(Vec<usize>),
    Other(IgnoredAny),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawLabels {
    Path(String),
    List(Vec<Value>),
    Other(IgnoredAny),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawPlotConfig {
    results_file: Option<Loose<String>>,
    output_path: Option<Loose<String>>,
    output_file: Option<Loose<String>>,
    plot: Option<Loose<RawPlotSection>>,
    x_axis: Option<Loose<RawAxis>>,
    y_axis: Option<Loose<RawAxis>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawPlotSection {
    #[serde(rename = "type")]
    kind: Option<Loose<String>>,
    renderer: Option<Loose<String>>,
    title: Option<Loose<String>>,
    group: Option<Value>,
    dimensions: Option<Value>,
    histogram: Option<Loose<RawHistogram>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawHistogram {
    bin_width: Option<Loose<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawAxis {
    values: Option<Loose<Vec<Loose<RawValueSpec>>>>,
    label: Option<Loose<String>>,
    label_right: Option<Loose<String>>,
    plot_scale: Option<Loose<String>>,
    ticks: Option<Loose<Vec<f64>>>,
    tick_labels: Option<Loose<Vec<Value>>>,
    ticks_right: Option<Loose<Vec<f64>>>,
    tick_labels_right: Option<Loose<Vec<Value>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawValueSpec {
    param: Option<Loose<String>>,
    index: Option<RawIndex>,
    error: Option<Loose<String>>,
    legend: Option<Loose<String>>,
    position: Option<Loose<String>>,
    scale_by: Option<NumberOrName>,
    min_cutoff: Option<NumberOrName>,
    max_cutoff: Option<NumberOrName>,
    labels: Option<RawLabels>,
    visible: Option<Loose<bool>>,
    color: Option<Loose<String>>,
    marker: Option<Loose<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlotKind {
    Line,
    Scatter,
    Histogram,
}

impl PlotKind {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "line" => Some(Self::Line),
            "scatter" => Some(Self::Scatter),
            "histogram" => Some(Self::Histogram),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Histogram => "histogram",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
}

/// Explicit tick positions with optional labels of the same length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticks {
    pub positions: Vec<f64>,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSection {
    pub kind: PlotKind,
    /// Renderer name, passed through untouched.
    pub renderer: String,
    pub title: String,
    pub group: Option<Value>,
    pub dimensions: Option<Value>,
    /// Histogram bin width, `0` for automatic binning.
    pub bin_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSpec {
    pub label: String,
    pub scale: AxisScale,
    pub ticks: Option<Ticks>,
    pub values: Vec<ValueSpec>,
}

/// Secondary Y axis used by series positioned `right`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RightAxis {
    pub label: String,
    pub ticks: Option<Ticks>,
}

/// One plot configuration after defaulting and validation.
///
/// For line and scatter plots `x_axis.values` is either empty or exactly as
/// long as `y_axis.values`. For histograms exactly one axis holds a single
/// value and the other is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPlot {
    pub results_file: String,
    pub output_path: String,
    pub output_file: String,
    pub plot: PlotSection,
    pub x_axis: AxisSpec,
    pub y_axis: AxisSpec,
    pub y_right: RightAxis,
    /// Adjustments made while normalizing.
    pub diagnostics: Vec<Diagnostic>,
}

impl NormalizedPlot {
    /// Normalizes one configuration object.
    pub fn from_value(value: &Value) -> PipelineResult<Self> {
        if !value.is_object() {
            return Err(PipelineError::InvalidConfig(
                "plot configuration must be an object".to_owned(),
            ));
        }
        let results_file = value
            .get("results_file")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let span = info_span!("normalize_plot", results_file);
        let _entered = span.enter();

        let raw = RawPlotConfig::deserialize(value)?;
        let mut diagnostics = Diagnostics::new().with_results_file(results_file);
        let normalized = normalize(raw, &mut diagnostics)?;
        Ok(Self {
            diagnostics: diagnostics.into_vec(),
            ..normalized
        })
    }

    /// `(x, y)` value-spec pairs in plotting order.
    ///
    /// Pairs follow the Y axis order; a histogram on the X axis yields a single
    /// pair without Y.
    #[must_use]
    pub fn value_pairs(&self) -> Vec<(Option<&ValueSpec>, Option<&ValueSpec>)> {
        if self.y_axis.values.is_empty() {
            return self
                .x_axis
                .values
                .iter()
                .map(|x| (Some(x), None))
                .collect();
        }
        self.y_axis
            .values
            .iter()
            .enumerate()
            .map(|(index, y)| (self.x_axis.values.get(index), Some(y)))
            .collect()
    }
}

/// Splits a configuration payload into individual configuration objects.
///
/// Accepts either a JSON array of configurations or a single configuration
/// object. Entries are not validated here so one bad entry cannot hide the
/// others.
pub fn parse_plot_configs(input: &str) -> PipelineResult<Vec<Value>> {
    match serde_json::from_str::<Value>(input)? {
        Value::Array(configs) => Ok(configs),
        single @ Value::Object(_) => Ok(vec![single]),
        other => Err(PipelineError::InvalidConfig(format!(
            "expected a configuration object or array, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn non_empty(field: Option<Loose<String>>) -> Option<String> {
    field
        .and_then(Loose::valid)
        .filter(|value| !value.is_empty())
}

fn normalize(raw: RawPlotConfig, diagnostics: &mut Diagnostics) -> PipelineResult<NormalizedPlot> {
    let results_file = non_empty(raw.results_file).ok_or_else(|| {
        PipelineError::InvalidConfig("missing required parameter: results_file".to_owned())
    })?;
    let output_path = raw
        .output_path
        .and_then(Loose::valid)
        .unwrap_or_default();
    let section = raw
        .plot
        .and_then(Loose::valid)
        .ok_or_else(|| PipelineError::InvalidConfig("missing required parameter: plot".to_owned()))?;
    let (Some(raw_x), Some(raw_y)) = (
        raw.x_axis.and_then(Loose::valid),
        raw.y_axis.and_then(Loose::valid),
    ) else {
        return Err(PipelineError::InvalidConfig(
            "missing required parameter: x_axis or y_axis".to_owned(),
        ));
    };

    let kind_name = non_empty(section.kind).ok_or_else(|| {
        PipelineError::InvalidConfig("missing required parameter: plot.type".to_owned())
    })?;
    let kind = PlotKind::from_name(&kind_name).ok_or_else(|| {
        PipelineError::InvalidConfig(format!(
            "invalid plot type `{kind_name}`: must be one of line, scatter, histogram"
        ))
    })?;
    let renderer = non_empty(section.renderer).unwrap_or_else(|| DEFAULT_RENDERER.to_owned());
    if !SUPPORTED_RENDERERS.contains(&renderer.as_str()) {
        return Err(PipelineError::InvalidConfig(format!(
            "unsupported renderer `{renderer}`: must be one of {}",
            SUPPORTED_RENDERERS.join(", ")
        )));
    }
    let bin_width = normalize_bin_width(section.histogram, diagnostics);

    let mut x_values = normalize_values(raw_x.values, "x_axis", false, diagnostics)?;
    let mut y_values = normalize_values(raw_y.values, "y_axis", true, diagnostics)?;
    if x_values.is_empty() && y_values.is_empty() {
        return Err(PipelineError::InvalidConfig(
            "no valid values to plot".to_owned(),
        ));
    }
    match kind {
        PlotKind::Line | PlotKind::Scatter => {
            reconcile_paired_values(&mut x_values, &y_values, diagnostics)?;
        }
        PlotKind::Histogram => {
            select_histogram_axis(&mut x_values, &mut y_values, diagnostics)?;
        }
    }

    let y_label = raw_y
        .label
        .and_then(Loose::valid)
        .unwrap_or_default();
    let y_right = RightAxis {
        label: non_empty(raw_y.label_right).unwrap_or_else(|| y_label.clone()),
        ticks: normalize_ticks(
            raw_y.ticks_right,
            raw_y.tick_labels_right,
            "y_axis.ticks_right",
            diagnostics,
        )?,
    };
    let y_axis = AxisSpec {
        scale: normalize_axis_scale(raw_y.plot_scale, "y_axis")?,
        ticks: normalize_ticks(raw_y.ticks, raw_y.tick_labels, "y_axis.ticks", diagnostics)?,
        label: y_label,
        values: y_values,
    };
    let x_axis = AxisSpec {
        label: non_empty(raw_x.label).unwrap_or_else(|| DEFAULT_X_LABEL.to_owned()),
        scale: normalize_axis_scale(raw_x.plot_scale, "x_axis")?,
        ticks: normalize_ticks(raw_x.ticks, raw_x.tick_labels, "x_axis.ticks", diagnostics)?,
        values: x_values,
    };

    let title = non_empty(section.title)
        .unwrap_or_else(|| format!("{} vs {}", x_axis.label, y_axis.label));
    let output_file = non_empty(raw.output_file).unwrap_or_else(|| title.replace(' ', "_"));

    debug!(
        results_file = %results_file,
        kind = kind.as_str(),
        x_values = x_axis.values.len(),
        y_values = y_axis.values.len(),
        adjustments = diagnostics.entries().len(),
        "normalized plot configuration"
    );

    Ok(NormalizedPlot {
        results_file,
        output_path,
        output_file,
        plot: PlotSection {
            kind,
            renderer,
            title,
            group: section.group,
            dimensions: section.dimensions,
            bin_width,
        },
        x_axis,
        y_axis,
        y_right,
        diagnostics: Vec::new(),
    })
}

fn normalize_bin_width(histogram: Option<Loose<RawHistogram>>, diagnostics: &mut Diagnostics) -> f64 {
    let Some(bin_width) = histogram
        .and_then(Loose::valid)
        .and_then(|histogram| histogram.bin_width)
        .and_then(Loose::valid)
    else {
        return 0.0;
    };
    if !bin_width.is_finite() || bin_width < 0.0 {
        diagnostics.push(
            DiagnosticKind::ConfigAdjusted,
            "plot.histogram.bin_width",
            format!("bin width {bin_width} replaced by automatic binning"),
        );
        return 0.0;
    }
    bin_width
}

/// X must carry zero values, one value shared by every Y, or one per Y.
fn reconcile_paired_values(
    x_values: &mut Vec<ValueSpec>,
    y_values: &[ValueSpec],
    diagnostics: &mut Diagnostics,
) -> PipelineResult<()> {
    if y_values.is_empty() {
        return Err(PipelineError::InvalidConfig(
            "missing required parameter in y_axis: values".to_owned(),
        ));
    }
    if x_values.is_empty() || x_values.len() == y_values.len() {
        return Ok(());
    }
    if x_values.len() == 1 {
        diagnostics.push(
            DiagnosticKind::ConfigAdjusted,
            x_values[0].param.as_str(),
            format!("single x value duplicated for {} y values", y_values.len()),
        );
        let shared = x_values[0].clone();
        x_values.resize(y_values.len(), shared);
        return Ok(());
    }
    Err(PipelineError::InvalidConfig(format!(
        "x_axis has {} values but y_axis has {}: x needs 0, 1 or the same number",
        x_values.len(),
        y_values.len()
    )))
}

/// Keeps the one histogram axis. When both axes hold one value, X wins.
fn select_histogram_axis(
    x_values: &mut Vec<ValueSpec>,
    y_values: &mut Vec<ValueSpec>,
    diagnostics: &mut Diagnostics,
) -> PipelineResult<()> {
    let (cleared, axis) = if x_values.len() == 1 {
        (y_values, "y_axis")
    } else if y_values.len() == 1 {
        (x_values, "x_axis")
    } else {
        return Err(PipelineError::InvalidConfig(
            "histogram needs exactly one value on either axis".to_owned(),
        ));
    };
    if !cleared.is_empty() {
        diagnostics.push(
            DiagnosticKind::ConfigAdjusted,
            axis,
            format!("{} values ignored for histogram", cleared.len()),
        );
        cleared.clear();
    }
    Ok(())
}

fn normalize_axis_scale(raw: Option<Loose<String>>, axis: &str) -> PipelineResult<AxisScale> {
    match non_empty(raw).as_deref() {
        None | Some("linear") => Ok(AxisScale::Linear),
        Some("log") => Ok(AxisScale::Log),
        Some(other) => Err(PipelineError::InvalidConfig(format!(
            "{axis}.plot_scale `{other}` must be linear or log"
        ))),
    }
}

fn normalize_ticks(
    ticks: Option<Loose<Vec<f64>>>,
    labels: Option<Loose<Vec<Value>>>,
    subject: &str,
    diagnostics: &mut Diagnostics,
) -> PipelineResult<Option<Ticks>> {
    let positions = match ticks {
        Some(Loose::Valid(positions)) if !positions.is_empty() => Some(positions),
        Some(Loose::Other(_)) => {
            diagnostics.push(
                DiagnosticKind::ConfigAdjusted,
                subject,
                "ticks must be a list of numbers, ignored",
            );
            None
        }
        _ => None,
    };
    let labels: Option<Vec<String>> = labels
        .and_then(Loose::valid)
        .filter(|labels| !labels.is_empty())
        .map(|labels| labels.iter().map(tick_label).collect());

    match (positions, labels) {
        (None, None) => Ok(None),
        (None, Some(_)) => {
            diagnostics.push(
                DiagnosticKind::ConfigAdjusted,
                subject,
                "tick labels without ticks ignored",
            );
            Ok(None)
        }
        (Some(positions), Some(labels)) if positions.len() != labels.len() => {
            Err(PipelineError::InvalidConfig(format!(
                "{subject}: {} ticks but {} tick labels",
                positions.len(),
                labels.len()
            )))
        }
        (Some(positions), labels) => Ok(Some(Ticks { positions, labels })),
    }
}

fn tick_label(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn normalize_values(
    raw: Option<Loose<Vec<Loose<RawValueSpec>>>>,
    axis: &str,
    allow_position: bool,
    diagnostics: &mut Diagnostics,
) -> PipelineResult<Vec<ValueSpec>> {
    let Some(entries) = raw.and_then(Loose::valid) else {
        return Ok(Vec::new());
    };

    let mut specs = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let subject = format!("{axis}.values[{index}]");
        let Some(entry) = entry.valid() else {
            diagnostics.push(
                DiagnosticKind::ConfigAdjusted,
                subject,
                "value entry is not an object, dropped",
            );
            continue;
        };
        let Some(param) = non_empty(entry.param.clone()) else {
            diagnostics.push(
                DiagnosticKind::ConfigAdjusted,
                subject,
                "missing or empty param, dropped",
            );
            continue;
        };
        specs.push(normalize_value_spec(
            entry,
            &param,
            &subject,
            allow_position,
            diagnostics,
        )?);
    }
    Ok(specs)
}

fn normalize_value_spec(
    raw: RawValueSpec,
    param: &str,
    subject: &str,
    allow_position: bool,
    diagnostics: &mut Diagnostics,
) -> PipelineResult<ValueSpec> {
    let indices = match raw.index {
        None => Vec::new(),
        Some(RawIndex::One(index)) => vec![index],
        Some(RawIndex::Many(indices)) => indices,
        Some(RawIndex::Other(_)) => {
            diagnostics.push(
                DiagnosticKind::ConfigAdjusted,
                subject,
                "index must be a non-negative integer or a list of them, ignored",
            );
            Vec::new()
        }
    };

    let param = PathExpression::parse(param)?.with_trailing_indices(&indices);
    let mut spec = ValueSpec::new(param);
    if let Some(error) = non_empty(raw.error) {
        spec.error = Some(PathExpression::parse(&error)?.with_trailing_indices(&indices));
    }
    spec.legend = raw.legend.and_then(Loose::valid).unwrap_or_default();
    spec.scale_by = normalize_scale_by(raw.scale_by, subject, diagnostics);
    spec.min_cutoff = normalize_cutoff(raw.min_cutoff, subject, "min_cutoff", diagnostics);
    spec.max_cutoff = normalize_cutoff(raw.max_cutoff, subject, "max_cutoff", diagnostics);
    spec.labels = normalize_labels(raw.labels)?;
    if allow_position {
        spec.position = normalize_position(raw.position, subject)?;
    }
    spec.visible = raw.visible.and_then(Loose::valid).unwrap_or(true);
    spec.color = non_empty(raw.color);
    spec.marker = non_empty(raw.marker);
    Ok(spec)
}

fn normalize_scale_by(
    raw: Option<NumberOrName>,
    subject: &str,
    diagnostics: &mut Diagnostics,
) -> ScaleBy {
    match raw {
        None => ScaleBy::default(),
        Some(NumberOrName::Number(factor)) => ScaleBy::Factor(factor),
        Some(NumberOrName::Name(name)) => ScaleBy::from_name(&name).unwrap_or_else(|| {
            diagnostics.push(
                DiagnosticKind::ConfigAdjusted,
                subject,
                format!("unknown scale_by `{name}` replaced by 1"),
            );
            ScaleBy::default()
        }),
        Some(NumberOrName::Other(_)) => {
            diagnostics.push(
                DiagnosticKind::ConfigAdjusted,
                subject,
                "scale_by must be a number or one of min, max, count, total; replaced by 1",
            );
            ScaleBy::default()
        }
    }
}

fn normalize_cutoff(
    raw: Option<NumberOrName>,
    subject: &str,
    field: &str,
    diagnostics: &mut Diagnostics,
) -> Cutoff {
    match raw {
        None => Cutoff::None,
        Some(NumberOrName::Number(bound)) => Cutoff::Absolute(bound),
        Some(NumberOrName::Name(marker)) => Cutoff::parse_marker(&marker).unwrap_or_else(|| {
            diagnostics.push(
                DiagnosticKind::ConfigAdjusted,
                subject,
                format!("{field} `{marker}` is not a percentile in p0..p100, ignored"),
            );
            Cutoff::None
        }),
        Some(NumberOrName::Other(_)) => {
            diagnostics.push(
                DiagnosticKind::ConfigAdjusted,
                subject,
                format!("{field} must be a number or a percentile marker, ignored"),
            );
            Cutoff::None
        }
    }
}

fn normalize_labels(raw: Option<RawLabels>) -> PipelineResult<Option<LabelSource>> {
    match raw {
        Some(RawLabels::Path(path)) if !path.is_empty() => {
            Ok(Some(LabelSource::Path(PathExpression::parse(&path)?)))
        }
        Some(RawLabels::List(items)) => Ok(Some(LabelSource::Literal(
            items.iter().map(Cell::from_json).collect(),
        ))),
        _ => Ok(None),
    }
}

fn normalize_position(raw: Option<Loose<String>>, subject: &str) -> PipelineResult<AxisPosition> {
    match raw.and_then(Loose::valid).as_deref() {
        None | Some("" | "left" | "default") => Ok(AxisPosition::Default),
        Some("right") => Ok(AxisPosition::Right),
        Some(other) => Err(PipelineError::InvalidConfig(format!(
            "{subject}: position `{other}` must be left or right"
        ))),
    }
}
