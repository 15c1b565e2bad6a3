pub mod config;
pub mod pipeline;
pub mod source;

pub use config::{
    AxisScale, AxisSpec, NormalizedPlot, PlotKind, PlotSection, RightAxis, Ticks,
    parse_plot_configs,
};
pub use pipeline::{
    BatchFailure, BatchReport, PlotData, prepare_plot, prepare_plot_tuned, run_batch,
};
pub use source::{DocumentSource, InMemorySource, documents_from_value, parse_documents};
