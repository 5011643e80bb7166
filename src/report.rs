use std::fs::{self, File};
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::config::ReportConfig;
use crate::error::RbrError;
use crate::pipeline::require_columns;
use crate::schema::report;

/// Stack the per-level blocks into the long-format report.
///
/// The trailing `RBR Name` / `RBR Level` columns move to the front and the
/// company key column becomes `config.count_column`.
pub fn build_report(
    blocks: Vec<DataFrame>,
    key: &str,
    config: &ReportConfig,
) -> Result<DataFrame, RbrError> {
    if blocks.is_empty() {
        return empty_report(config);
    }

    let lazy: Vec<LazyFrame> = blocks.into_iter().map(|df| df.lazy()).collect();
    let stacked = concat(lazy, UnionArgs::default())?.collect()?;

    let names: Vec<String> = stacked
        .get_column_names_str()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let split = names.len().saturating_sub(2);
    let ordered: Vec<String> = names[split..]
        .iter()
        .chain(names[..split].iter())
        .cloned()
        .collect();

    let df = stacked
        .select(ordered)?
        .lazy()
        .rename([key], [config.count_column.as_str()], true)
        .collect()?;
    Ok(df)
}

/// Report with the full column layout and no rows.
fn empty_report(config: &ReportConfig) -> Result<DataFrame, RbrError> {
    let mut columns: Vec<Column> = [report::RBR_NAME, report::RBR_LEVEL, report::RBR_CATEGORY]
        .iter()
        .map(|name| Series::new_empty((*name).into(), &DataType::String).into())
        .collect();
    columns.push(Series::new_empty(config.count_column.as_str().into(), &DataType::Int64).into());
    for name in config.metrics.names() {
        columns.push(Series::new_empty(name.into(), &DataType::Float64).into());
    }
    Ok(DataFrame::new(columns)?)
}

/// Row index written in front of the report: numbering restarts with every
/// (RBR Name, RBR Level) block.
fn block_index(df: &DataFrame) -> Result<Vec<i64>, RbrError> {
    require_columns(df, [report::RBR_NAME, report::RBR_LEVEL])?;
    let names = df.column(report::RBR_NAME)?.as_materialized_series().str()?;
    let levels = df.column(report::RBR_LEVEL)?.as_materialized_series().str()?;

    let mut index = Vec::with_capacity(df.height());
    let mut previous = None;
    let mut next = 0i64;
    for current in names.into_iter().zip(levels.into_iter()) {
        if previous != Some(current) {
            next = 0;
        }
        index.push(next);
        next += 1;
        previous = Some(current);
    }
    Ok(index)
}

/// Write the report as CSV with a leading, unnamed row-index column.
pub fn persist(df: &DataFrame, path: &Path) -> Result<(), RbrError> {
    let mut out = df.clone();
    let index = block_index(df)?;
    out.insert_column(0, Column::new("".into(), index))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut out)?;

    info!(path = %path.display(), rows = df.height(), "wrote report");
    Ok(())
}
