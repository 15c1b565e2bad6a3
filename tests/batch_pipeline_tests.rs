use serde_json::{Value, json};
use series_prep::api::{InMemorySource, PlotData, run_batch};
use series_prep::error::{PipelineError, PipelineResult};
use series_prep::render::{NullRenderer, SeriesRenderer};

fn config(results_file: &str, title: &str) -> Value {
    json!({
        "results_file": results_file,
        "plot": {"type": "line", "title": title},
        "x_axis": {"values": [{"param": "threads"}]},
        "y_axis": {"values": [{"param": "ops"}, {"param": "latency", "position": "right"}]}
    })
}

fn source() -> InMemorySource {
    let mut source = InMemorySource::new();
    source
        .insert_json(
            "scaling.json",
            r#"[
                {"threads": 4, "ops": 400, "latency": 2.5},
                {"threads": 1, "ops": 100, "latency": 1.0},
                {"threads": 2, "ops": 210, "latency": 1.5}
            ]"#,
        )
        .expect("valid payload");
    source
}

#[test]
fn invalid_configuration_fails_alone() {
    let configs = vec![
        config("scaling.json", "first plot"),
        json!({"plot": {"type": "line"}}),
        config("scaling.json", "third plot"),
    ];
    let mut source = source();
    let mut renderer = NullRenderer::default();

    let report = run_batch(&configs, &mut source, &mut renderer);

    assert_eq!(report.rendered, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert!(matches!(
        report.failures[0].error,
        PipelineError::InvalidConfig(_)
    ));
    assert_eq!(renderer.rendered_files, vec!["first_plot", "third_plot"]);
}

#[test]
fn unknown_results_file_is_reported_as_source_failure() {
    let configs = vec![config("missing.json", "lost")];
    let mut source = source();
    let mut renderer = NullRenderer::default();

    let report = run_batch(&configs, &mut source, &mut renderer);

    assert_eq!(report.rendered, 0);
    assert_eq!(report.failures[0].results_file.as_deref(), Some("missing.json"));
    assert!(matches!(
        report.failures[0].error,
        PipelineError::Source { .. }
    ));
}

#[test]
fn configuration_without_resolvable_series_is_skipped() {
    let mut configs = vec![config("scaling.json", "nothing")];
    configs[0]["y_axis"]["values"] = json!([{"param": "absent"}]);
    let mut source = source();
    let mut renderer = NullRenderer::default();

    let report = run_batch(&configs, &mut source, &mut renderer);

    assert_eq!(report.skipped, 1);
    assert_eq!(report.rendered, 0);
    assert!(!report.is_clean());
    assert!(renderer.rendered_files.is_empty());
}

#[test]
fn renderer_receives_sorted_series_for_both_axes() {
    #[derive(Default)]
    struct Capture {
        plots: Vec<PlotData>,
    }

    impl SeriesRenderer for Capture {
        fn render(&mut self, plot: &PlotData) -> PipelineResult<()> {
            self.plots.push(plot.clone());
            Ok(())
        }
    }

    let configs = vec![config("scaling.json", "scaling")];
    let mut source = source();
    let mut renderer = Capture::default();

    let report = run_batch(&configs, &mut source, &mut renderer);
    assert!(report.is_clean());

    let plot = &renderer.plots[0];
    assert!(plot.has_right_axis());
    assert_eq!(plot.series.len(), 2);
    let xs: Vec<f64> = plot.series[0]
        .x
        .values
        .iter()
        .map(|cell| cell.to_f64_lossy())
        .collect();
    assert_eq!(xs, vec![1.0, 2.0, 4.0]);
    assert!(plot.extents.expect("extents").y_right.is_some());
    assert!(plot.to_json_pretty().expect("serializable").contains("\"legend\""));
}

#[test]
fn closure_sources_plug_into_the_batch() {
    let configs = vec![config("generated", "generated")];
    let mut source = |_: &str| -> PipelineResult<Vec<Value>> {
        Ok(vec![json!({"threads": 1, "ops": 1, "latency": 1})])
    };
    let mut renderer = NullRenderer::default();

    let report = run_batch(&configs, &mut source, &mut renderer);

    assert_eq!(report.rendered, 1);
    assert_eq!(renderer.last_series_count, 2);
    assert_eq!(renderer.last_point_count, 2);
}
