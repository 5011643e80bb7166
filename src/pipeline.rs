use polars::prelude::*;
use regex::Regex;
use tracing::{debug, info};

use crate::aggregation::AggregationSpec;
use crate::config::CountPolicy;
use crate::error::RbrError;
use crate::schema::{report, taxonomy};

/// A taxonomy column holding one hierarchy level of an RBR, e.g.
/// `Activity Level 2` for the RBR `Activity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelColumn {
    pub rbr_name: String,
    pub column: String,
}

pub(crate) fn require_columns<'a>(
    df: &DataFrame,
    required: impl IntoIterator<Item = &'a str>,
) -> Result<(), RbrError> {
    for col_name in required {
        if df.column(col_name).is_err() {
            return Err(RbrError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

// ── Per-company aggregation ─────────────────────────────────────────────────

/// Collapse the sub-entity rows of each company into one row per `key`.
///
/// Metrics outside `spec` are dropped; rows are ordered by key.
pub fn aggregate_per_company(
    metrics: &DataFrame,
    key: &str,
    spec: &AggregationSpec,
) -> Result<DataFrame, RbrError> {
    if spec.is_empty() {
        return Err(RbrError::InvalidData(
            "aggregation spec names no metrics".to_string(),
        ));
    }
    require_columns(metrics, std::iter::once(key).chain(spec.names()))?;

    let df = metrics
        .clone()
        .lazy()
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg(spec.exprs())
        .sort([key], SortMultipleOptions::default())
        .collect()?;

    debug!(
        input_rows = metrics.height(),
        companies = df.height(),
        "aggregated per company"
    );
    Ok(df)
}

// ── Join / filter ───────────────────────────────────────────────────────────

/// Outer-join company aggregates with the taxonomy, then keep only the
/// companies present in `original` (the metrics as loaded, before aggregation).
///
/// Companies missing from the taxonomy keep null level columns.
pub fn join_and_filter(
    aggregated: &DataFrame,
    taxonomy: &DataFrame,
    original: &DataFrame,
    key: &str,
) -> Result<DataFrame, RbrError> {
    require_columns(aggregated, [key])?;
    require_columns(taxonomy, [key])?;
    require_columns(original, [key])?;

    let known = original
        .column(key)?
        .as_materialized_series()
        .clone();

    let df = aggregated
        .clone()
        .lazy()
        .join(
            taxonomy.clone().lazy(),
            [col(key)],
            [col(key)],
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        )
        .filter(col(key).is_in(lit(known), false))
        .collect()?;

    debug!(
        companies = aggregated.height(),
        taxonomy_rows = taxonomy.height(),
        joined_rows = df.height(),
        "joined taxonomy"
    );
    Ok(df)
}

// ── Level detection ─────────────────────────────────────────────────────────

/// Anchored pattern `^<rbr_name> Level .$`: exactly one trailing character.
fn level_pattern(rbr_name: &str) -> Result<Regex, RbrError> {
    let pattern = format!(
        "^{}{}.$",
        regex::escape(rbr_name),
        regex::escape(taxonomy::LEVEL_INFIX)
    );
    Ok(Regex::new(&pattern)?)
}

/// Find the level columns of each RBR name.
///
/// Matches are returned in column order; for a single column the RBR names are
/// tried in the order given.
pub fn level_columns<C, N>(columns: &[C], rbr_names: &[N]) -> Result<Vec<LevelColumn>, RbrError>
where
    C: AsRef<str>,
    N: AsRef<str>,
{
    let patterns = rbr_names
        .iter()
        .map(|name| Ok((name.as_ref(), level_pattern(name.as_ref())?)))
        .collect::<Result<Vec<_>, RbrError>>()?;

    let mut found = Vec::new();
    for column in columns {
        for (rbr_name, pattern) in &patterns {
            if pattern.is_match(column.as_ref()) {
                found.push(LevelColumn {
                    rbr_name: rbr_name.to_string(),
                    column: column.as_ref().to_string(),
                });
            }
        }
    }
    Ok(found)
}

/// First occurrence of each name, in order.
fn distinct_names<S: AsRef<str>>(rbr_names: &[S]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::with_capacity(rbr_names.len());
    for name in rbr_names {
        if !names.contains(&name.as_ref()) {
            names.push(name.as_ref());
        }
    }
    names
}

// ── Per-category aggregation ────────────────────────────────────────────────

/// Aggregate the joined table within every category of every level column.
///
/// Returns one block per level column, each with the columns
/// `[RBR category, <key>, <metrics...>, RBR Name, RBR Level]`.
/// RBR names without level columns produce no block.
pub fn aggregate_per_category<S: AsRef<str>>(
    joined: &DataFrame,
    rbr_names: &[S],
    key: &str,
    spec: &AggregationSpec,
    policy: CountPolicy,
) -> Result<Vec<DataFrame>, RbrError> {
    require_columns(joined, std::iter::once(key).chain(spec.names()))?;

    let names = distinct_names(rbr_names);
    let levels = level_columns(&joined.get_column_names_str(), &names)?;

    for name in &names {
        if !levels.iter().any(|l| l.rbr_name == *name) {
            debug!(rbr_name = %name, "no level columns for RBR name");
        }
    }

    let blocks = levels
        .iter()
        .map(|level| aggregate_level(joined, level, key, spec, policy))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        levels = blocks.len(),
        rows = blocks.iter().map(DataFrame::height).sum::<usize>(),
        "aggregated per category"
    );
    Ok(blocks)
}

fn company_count_expr(key: &str, policy: CountPolicy) -> Expr {
    match policy {
        CountPolicy::SumOfIdentifiers => col(key).sum(),
        CountPolicy::Distinct => col(key).n_unique().cast(DataType::Int64),
    }
}

fn aggregate_level(
    joined: &DataFrame,
    level: &LevelColumn,
    key: &str,
    spec: &AggregationSpec,
    policy: CountPolicy,
) -> Result<DataFrame, RbrError> {
    let category = level.column.as_str();

    let mut projection = vec![col(category), col(key)];
    projection.extend(spec.names().map(col));

    let mut aggs = vec![company_count_expr(key, policy)];
    aggs.extend(spec.exprs());

    // Duplicates come from taxonomy fan-out and must go before the group sums.
    let block = joined
        .clone()
        .lazy()
        .select(projection)
        .unique_stable(None, UniqueKeepStrategy::First)
        .filter(col(category).is_not_null())
        .group_by([col(category)])
        .agg(aggs)
        .sort([category], SortMultipleOptions::default())
        .with_columns([
            col(category).cast(DataType::String),
            lit(level.rbr_name.as_str()).alias(report::RBR_NAME),
            lit(category).alias(report::RBR_LEVEL),
        ])
        .rename([category], [report::RBR_CATEGORY], true)
        .collect()?;

    debug!(
        rbr_name = %level.rbr_name,
        level = %category,
        categories = block.height(),
        "aggregated level"
    );
    Ok(block)
}
