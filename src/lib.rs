//! series-prep: extraction and alignment of chart series from experiment
//! result documents.
//!
//! Plot configurations name values inside nested JSON results by path. The
//! crate resolves those paths across every result document, applies cutoffs
//! and scaling, pairs X with Y, and hands renderers sorted, shape-consistent
//! series. Drawing is left to a [`render::SeriesRenderer`].

pub mod api;
pub mod core;
pub mod error;
pub mod render;
pub mod telemetry;

pub use api::{NormalizedPlot, PlotData, prepare_plot, run_batch};
pub use error::{PipelineError, PipelineResult};
