use std::path::Path;

use polars::prelude::DataFrame;
use tracing::info;

pub mod aggregation;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
#[cfg(feature = "python")]
mod python;
pub mod report;
pub mod schema;

pub use aggregation::{AggOp, AggregationSpec, MetricAgg};
pub use config::{CountPolicy, ReportConfig};
pub use error::RbrError;

/// Build the RBR returns report.
///
/// Loads the tab-separated company metrics and the taxonomy workbook,
/// aggregates per company, joins the taxonomy, aggregates within every
/// category of every `<rbr name> Level <n>` column, writes the result to
/// `config.output_path` and returns it.
pub fn output_rbr_returns<S: AsRef<str>>(
    metrics_path: impl AsRef<Path>,
    taxonomy_path: impl AsRef<Path>,
    rbr_names: &[S],
    config: &ReportConfig,
) -> Result<DataFrame, RbrError> {
    let key = config.company_key.as_str();
    let spec = &config.metrics;

    let (metrics, taxonomy) =
        loader::load(metrics_path.as_ref(), taxonomy_path.as_ref(), config)?;
    let aggregated = pipeline::aggregate_per_company(&metrics, key, spec)?;
    let joined = pipeline::join_and_filter(&aggregated, &taxonomy, &metrics, key)?;
    let blocks =
        pipeline::aggregate_per_category(&joined, rbr_names, key, spec, config.count_policy)?;

    let report = report::build_report(blocks, key, config)?;
    report::persist(&report, &config.output_path)?;

    info!(
        rows = report.height(),
        output = %config.output_path.display(),
        "rbr returns complete"
    );
    Ok(report)
}
