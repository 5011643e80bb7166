use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::RbrError;
use crate::schema::company;

/// Aggregation applied to a metric column within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggOp {
    Sum,
    Mean,
    Min,
    Max,
}

impl AggOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Build the grouped expression for `column`, keeping the column name.
    pub fn expr(&self, column: &str) -> Expr {
        let c = col(column);
        match self {
            Self::Sum => c.sum(),
            Self::Mean => c.mean(),
            Self::Min => c.min(),
            Self::Max => c.max(),
        }
    }
}

impl FromStr for AggOp {
    type Err = RbrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(RbrError::UnsupportedAggregation(other.to_string())),
        }
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One metric column and the operation used to aggregate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAgg {
    pub name: String,
    pub op: AggOp,
}

/// Ordered metric → operation mapping.
///
/// The same spec drives the per-company and the per-category stage. Entry order
/// is the metric column order of every table the pipeline produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregationSpec {
    metrics: Vec<MetricAgg>,
}

impl AggregationSpec {
    pub fn new() -> Self {
        Self {
            metrics: Vec::new(),
        }
    }

    /// Add (or replace) the operation for `name`. A replaced metric keeps its position.
    pub fn with(mut self, name: impl Into<String>, op: AggOp) -> Self {
        let name = name.into();
        match self.metrics.iter_mut().find(|m| m.name == name) {
            Some(existing) => existing.op = op,
            None => self.metrics.push(MetricAgg { name, op }),
        }
        self
    }

    /// Build a spec from (metric, operation string) pairs, e.g. a Python dict.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, RbrError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .try_fold(Self::new(), |spec, (name, op)| {
                Ok(spec.with(name, op.as_ref().parse()?))
            })
    }

    pub fn metrics(&self) -> &[MetricAgg] {
        &self.metrics
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|m| m.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Grouped expressions, one per metric, in spec order.
    pub fn exprs(&self) -> Vec<Expr> {
        self.metrics.iter().map(|m| m.op.expr(&m.name)).collect()
    }
}

impl Default for AggregationSpec {
    /// Sum of the four portfolio metrics. Built fresh on every call.
    fn default() -> Self {
        company::DEFAULT_METRICS
            .iter()
            .fold(Self::new(), |spec, name| spec.with(*name, AggOp::Sum))
    }
}
