use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::core::cutoff::{CutoffBounds, removed_fraction};
use crate::core::diagnostics::{DiagnosticKind, Diagnostics};
use crate::core::path::PathExpression;
use crate::core::scale::{apply_scale, guard_scale, resolve_scale};
use crate::core::types::{Cell, SeriesGrid};
use crate::core::value_spec::{AxisPosition, LabelSource, ResolvedValueSpec, ValueSpec};
use crate::error::{PipelineError, PipelineResult};

/// Resolved data for one value-spec, before pairing with the other axis.
///
/// `values` and `errors` always have the same number of rows and the same
/// width; `labels`, when present, has as many rows as `values`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub values: SeriesGrid,
    pub errors: SeriesGrid,
    pub legend: String,
    pub position: AxisPosition,
    pub visible: bool,
    pub labels: Option<SeriesGrid>,
    pub color: Option<String>,
    pub marker: Option<String>,
}

impl Series {
    fn from_spec(
        spec: &ValueSpec,
        values: SeriesGrid,
        errors: SeriesGrid,
        labels: Option<SeriesGrid>,
    ) -> Self {
        Self {
            values,
            errors,
            legend: spec.legend.clone(),
            position: spec.position,
            visible: spec.visible,
            labels,
            color: spec.color.clone(),
            marker: spec.marker.clone(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltSeries {
    pub series: Series,
    pub resolved: ResolvedValueSpec,
    /// Share of values marked missing by cutoffs, `0` without cutoffs.
    pub removed_fraction: f64,
}

/// What one document contributed for a path.
#[derive(Debug, Clone, PartialEq)]
enum Sample {
    Scalar(Cell),
    List(Vec<Cell>),
}

impl Sample {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items.iter().map(Cell::from_json).collect()),
            other => Self::Scalar(Cell::from_json(other)),
        }
    }

    fn cells(&self) -> &[Cell] {
        match self {
            Self::Scalar(cell) => std::slice::from_ref(cell),
            Self::List(cells) => cells,
        }
    }

    fn into_cells(self) -> Vec<Cell> {
        match self {
            Self::Scalar(cell) => vec![cell],
            Self::List(cells) => cells,
        }
    }

    fn list_len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::List(cells) => Some(cells.len()),
        }
    }
}

/// Builds the series described by `spec` from `documents`.
///
/// Documents the value path does not resolve in are skipped. A spec that
/// resolves in no document yields an empty series and a `ResolutionMiss`
/// diagnostic. Error and label paths are read only from the documents that
/// contributed values; where they miss, the row is filled with missing cells.
/// An error path whose row count still differs from the values is a
/// `ShapeMismatch` error; a label source that disagrees is dropped with a
/// diagnostic instead.
pub fn build_series(
    spec: &ValueSpec,
    documents: &[Value],
    diagnostics: &mut Diagnostics,
) -> PipelineResult<BuiltSeries> {
    let samples = resolve_samples(&spec.param, documents);
    if samples.is_empty() {
        diagnostics.push(
            DiagnosticKind::ResolutionMiss,
            spec.param.as_str(),
            format!(
                "path did not resolve in any of {} documents",
                documents.len()
            ),
        );
        return Ok(BuiltSeries {
            series: Series::from_spec(spec, SeriesGrid::empty(), SeriesGrid::empty(), None),
            resolved: ResolvedValueSpec {
                spec: spec.clone(),
                scale: 1.0,
            },
            removed_fraction: 0.0,
        });
    }
    let resolved_documents = samples.len();

    let (samples, removed_fraction) = filter_samples(spec, samples);
    let rows: Vec<SourceRow> = samples
        .iter()
        .map(|(document, sample)| SourceRow {
            document: *document,
            list_len: sample.list_len(),
        })
        .collect();
    let mut values = shape_samples(samples.into_iter().map(|(_, sample)| sample));

    let scale = guard_scale(resolve_scale(&values, spec.scale_by));
    if scale.degenerate {
        diagnostics.push(
            DiagnosticKind::ScaleDegenerate,
            spec.param.as_str(),
            format!("resolved scale {} replaced by 1", scale.raw),
        );
    }
    apply_scale(&mut values, scale.value);

    let errors = match &spec.error {
        Some(error_path) => {
            let samples = resolve_alongside(error_path, spec, documents, &rows, diagnostics);
            let mut errors = shape_samples(samples.into_iter());
            if errors.len() != values.len() {
                return Err(PipelineError::ShapeMismatch(format!(
                    "error path `{error_path}` yields {} rows but `{}` yields {}",
                    errors.len(),
                    spec.param,
                    values.len()
                )));
            }
            apply_scale(&mut errors, scale.value);
            let width = values.width().max(errors.width());
            values.pad_to_width(width);
            errors.pad_to_width(width);
            errors
        }
        None => SeriesGrid::filled(values.len(), values.width(), Cell::Number(0.0)),
    };

    let labels = resolve_labels(spec, documents, &rows, values.len(), diagnostics);

    debug!(
        path = %spec.param,
        documents = documents.len(),
        resolved_documents,
        rows = values.len(),
        width = values.width(),
        scale = scale.value,
        "built series"
    );

    Ok(BuiltSeries {
        series: Series::from_spec(spec, values, errors, labels),
        resolved: ResolvedValueSpec {
            spec: spec.clone(),
            scale: scale.value,
        },
        removed_fraction,
    })
}

/// A document that contributed values, with the shape it contributed.
#[derive(Debug, Clone, Copy)]
struct SourceRow {
    document: usize,
    list_len: Option<usize>,
}

fn resolve_samples(path: &PathExpression, documents: &[Value]) -> Vec<(usize, Sample)> {
    let mut samples = Vec::with_capacity(documents.len());
    for (document, value) in documents.iter().enumerate() {
        match path.resolve(value) {
            Ok(resolved) => samples.push((document, Sample::from_json(resolved))),
            Err(miss) => debug!(path = %path, document, reason = %miss, "path not found in document"),
        }
    }
    samples
}

/// Resolves a companion path (errors, labels) over the documents in `rows`.
///
/// A miss is filled with missing cells shaped like the value sample of that
/// document, so rows never shift.
fn resolve_alongside(
    path: &PathExpression,
    spec: &ValueSpec,
    documents: &[Value],
    rows: &[SourceRow],
    diagnostics: &mut Diagnostics,
) -> Vec<Sample> {
    let mut misses = 0;
    let samples: Vec<Sample> = rows
        .iter()
        .filter_map(|row| {
            let value = documents.get(row.document)?;
            Some(match path.resolve(value) {
                Ok(resolved) => Sample::from_json(resolved),
                Err(miss) => {
                    debug!(path = %path, document = row.document, reason = %miss, "path not found in document");
                    misses += 1;
                    match row.list_len {
                        Some(len) => Sample::List(vec![Cell::Missing; len]),
                        None => Sample::Scalar(Cell::Missing),
                    }
                }
            })
        })
        .collect();

    if misses > 0 {
        diagnostics.push(
            DiagnosticKind::ResolutionMiss,
            path.as_str(),
            format!(
                "path missing in {misses} of {} documents resolving `{}`, filled with missing",
                rows.len(),
                spec.param
            ),
        );
    }
    samples
}

/// Applies the spec's cutoffs to every sample with series-wide thresholds.
fn filter_samples(
    spec: &ValueSpec,
    samples: Vec<(usize, Sample)>,
) -> (Vec<(usize, Sample)>, f64) {
    let bounds = CutoffBounds::resolve(
        spec.min_cutoff,
        spec.max_cutoff,
        samples.iter().flat_map(|(_, sample)| sample.cells()),
    );
    if bounds.is_unbounded() {
        return (samples, 0.0);
    }

    let mut marked = 0;
    let mut total = 0;
    let mut filtered = Vec::with_capacity(samples.len());
    for (document, sample) in samples {
        let outcome = bounds.apply(sample.cells());
        marked += outcome.marked;
        total += outcome.values.len();
        match sample {
            // A scalar that was not a number is dropped with its document.
            Sample::Scalar(_) => {
                if let Some(cell) = outcome.values.into_iter().next() {
                    filtered.push((document, Sample::Scalar(cell)));
                }
            }
            Sample::List(_) => filtered.push((document, Sample::List(outcome.values))),
        }
    }

    let fraction = removed_fraction(marked, total);
    info!(
        path = %spec.param,
        min = ?bounds.min,
        max = ?bounds.max,
        removed_fraction = fraction,
        "applied cutoffs"
    );
    (filtered, fraction)
}

/// Arranges per-document samples into rows.
///
/// - all scalars: one row per document
/// - lists of one common length: one row per element position, one column
///   per document
/// - anything else: one row per document, padded to the longest list
fn shape_samples(samples: impl Iterator<Item = Sample>) -> SeriesGrid {
    let samples: Vec<Sample> = samples.collect();
    let common_len = common_list_len(&samples);
    let rows: Vec<Vec<Cell>> = samples.into_iter().map(Sample::into_cells).collect();
    match common_len {
        Some(len) => SeriesGrid::from_rows(transpose(&rows, len)),
        None => SeriesGrid::from_rows(rows),
    }
}

fn common_list_len(samples: &[Sample]) -> Option<usize> {
    let first = samples.first()?.list_len()?;
    samples
        .iter()
        .all(|sample| sample.list_len() == Some(first))
        .then_some(first)
}

fn transpose(rows: &[Vec<Cell>], len: usize) -> Vec<Vec<Cell>> {
    (0..len)
        .map(|position| rows.iter().map(|row| row[position].clone()).collect())
        .collect()
}

fn resolve_labels(
    spec: &ValueSpec,
    documents: &[Value],
    rows: &[SourceRow],
    value_rows: usize,
    diagnostics: &mut Diagnostics,
) -> Option<SeriesGrid> {
    let labels = match spec.labels.as_ref()? {
        LabelSource::Path(path) => shape_samples(
            resolve_alongside(path, spec, documents, rows, diagnostics).into_iter(),
        ),
        LabelSource::Literal(items) => SeriesGrid::column(items.clone()),
    };
    if labels.len() != value_rows {
        diagnostics.push(
            DiagnosticKind::ShapeMismatch,
            spec.param.as_str(),
            format!(
                "{} labels for {value_rows} value rows, labels discarded",
                labels.len()
            ),
        );
        return None;
    }
    Some(labels)
}

#[cfg(test)]
mod tests {
    use super::build_series;
    use crate::core::diagnostics::{DiagnosticKind, Diagnostics};
    use crate::core::path::PathExpression;
    use crate::core::types::Cell;
    use crate::core::value_spec::ValueSpec;
    use serde_json::json;

    fn spec(param: &str) -> ValueSpec {
        ValueSpec::new(PathExpression::parse(param).expect("valid path"))
    }

    #[test]
    fn list_per_document_is_transposed_to_rows_per_element() {
        let documents = vec![json!({"v": [1, 2, 3]}), json!({"v": [4, 5, 6]})];
        let mut diagnostics = Diagnostics::new();
        let built = build_series(&spec("v"), &documents, &mut diagnostics).expect("series");

        let values = &built.series.values;
        assert_eq!(values.len(), 3);
        assert_eq!(values.width(), 2);
        assert_eq!(
            values.row(1).expect("row"),
            &[Cell::Number(2.0), Cell::Number(5.0)]
        );
        assert_eq!(built.series.errors.len(), 3);
        assert_eq!(built.series.errors.width(), 2);
    }

    #[test]
    fn ragged_lists_keep_one_row_per_document() {
        let documents = vec![json!({"v": [1]}), json!({"v": [2, 3]})];
        let mut diagnostics = Diagnostics::new();
        let built = build_series(&spec("v"), &documents, &mut diagnostics).expect("series");

        let values = &built.series.values;
        assert_eq!(values.len(), 2);
        assert_eq!(values.row(0).expect("row"), &[Cell::Number(1.0), Cell::Missing]);
    }

    #[test]
    fn unresolved_documents_are_skipped_in_order() {
        let documents = vec![json!({"v": 1}), json!({"w": 2}), json!({"v": 3})];
        let mut diagnostics = Diagnostics::new();
        let built = build_series(&spec("v"), &documents, &mut diagnostics).expect("series");

        assert_eq!(
            built.series.values.cells(),
            &[Cell::Number(1.0), Cell::Number(3.0)]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn no_resolving_document_yields_empty_series_and_diagnostic() {
        let documents = vec![json!({"w": 2})];
        let mut diagnostics = Diagnostics::new();
        let built = build_series(&spec("v"), &documents, &mut diagnostics).expect("series");

        assert!(built.series.is_empty());
        assert_eq!(diagnostics.count(DiagnosticKind::ResolutionMiss), 1);
    }

    #[test]
    fn error_rows_must_match_value_rows() {
        let documents = vec![json!({"v": [1, 2, 3], "e": [0.1, 0.2]})];
        let mut diagnostics = Diagnostics::new();
        let spec = spec("v").with_error(PathExpression::parse("e").expect("valid path"));

        assert!(build_series(&spec, &documents, &mut diagnostics).is_err());
    }

    #[test]
    fn errors_are_divided_by_the_value_scale() {
        let documents = vec![json!({"v": [2, 4], "e": [1, 2]})];
        let mut diagnostics = Diagnostics::new();
        let spec = spec("v")
            .with_error(PathExpression::parse("e").expect("valid path"))
            .with_scale_by(crate::core::scale::ScaleBy::Factor(2.0));
        let built = build_series(&spec, &documents, &mut diagnostics).expect("series");

        assert_eq!(
            built.series.errors.cells(),
            &[Cell::Number(0.5), Cell::Number(1.0)]
        );
        assert_eq!(built.resolved.scale, 2.0);
    }

    #[test]
    fn companion_paths_stay_on_the_rows_of_their_document() {
        let documents = vec![
            json!({"y": 1, "e": 0.1, "l": "a"}),
            json!({"e": 0.2, "l": "b"}),
            json!({"y": 3}),
        ];
        let mut diagnostics = Diagnostics::new();
        let spec = spec("y")
            .with_error(PathExpression::parse("e").expect("valid path"))
            .with_labels(crate::core::value_spec::LabelSource::Path(
                PathExpression::parse("l").expect("valid path"),
            ));
        let built = build_series(&spec, &documents, &mut diagnostics).expect("series");

        assert_eq!(
            built.series.values.cells(),
            &[Cell::Number(1.0), Cell::Number(3.0)]
        );
        assert_eq!(
            built.series.errors.cells(),
            &[Cell::Number(0.1), Cell::Missing]
        );
        assert_eq!(
            built.series.labels.expect("labels").cells(),
            &[Cell::text("a"), Cell::Missing]
        );
        assert_eq!(diagnostics.count(DiagnosticKind::ResolutionMiss), 2);
    }

    #[test]
    fn cutoff_dropping_a_text_scalar_drops_its_error_row_too() {
        let documents = vec![
            json!({"y": 1, "e": 0.1}),
            json!({"y": "na", "e": 0.2}),
            json!({"y": 3, "e": 0.3}),
        ];
        let mut diagnostics = Diagnostics::new();
        let spec = spec("y")
            .with_error(PathExpression::parse("e").expect("valid path"))
            .with_cutoffs(
                crate::core::cutoff::Cutoff::None,
                crate::core::cutoff::Cutoff::Absolute(10.0),
            );
        let built = build_series(&spec, &documents, &mut diagnostics).expect("series");

        assert_eq!(
            built.series.values.cells(),
            &[Cell::Number(1.0), Cell::Number(3.0)]
        );
        assert_eq!(
            built.series.errors.cells(),
            &[Cell::Number(0.1), Cell::Number(0.3)]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn missing_error_list_is_filled_to_the_value_list_length() {
        let documents = vec![json!({"v": [1, 2], "e": [0.1, 0.2]}), json!({"v": [3, 4]})];
        let mut diagnostics = Diagnostics::new();
        let spec = spec("v").with_error(PathExpression::parse("e").expect("valid path"));
        let built = build_series(&spec, &documents, &mut diagnostics).expect("series");

        assert_eq!(built.series.errors.len(), 2);
        assert_eq!(
            built.series.errors.row(0).expect("row"),
            &[Cell::Number(0.1), Cell::Missing]
        );
    }
}
