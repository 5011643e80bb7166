//! Report configuration.
//!
//! Every field has a default, so `ReportConfig::default()` produces the standard
//! returns report and a TOML file only needs to name what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationSpec;
use crate::error::RbrError;
use crate::schema::{company, report, taxonomy};

/// What the "Number of Gvkeys" column holds for each category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountPolicy {
    /// Sum of the Gvkey values in the category (the historical report column).
    #[default]
    SumOfIdentifiers,
    /// Number of distinct Gvkeys in the category.
    Distinct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Company identifier column of the metrics file, also the join key.
    #[serde(default = "default_company_key")]
    pub company_key: String,

    /// Identifier column of the taxonomy workbook, renamed to `company_key`.
    #[serde(default = "default_taxonomy_key")]
    pub taxonomy_key: String,

    /// Worksheet holding the taxonomy. First sheet when unset.
    #[serde(default)]
    pub taxonomy_sheet: Option<String>,

    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default = "default_count_column")]
    pub count_column: String,

    #[serde(default)]
    pub count_policy: CountPolicy,

    /// RBR names for callers that drive the report from a config file.
    #[serde(default)]
    pub rbr_names: Vec<String>,

    #[serde(default)]
    pub metrics: AggregationSpec,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            company_key: default_company_key(),
            taxonomy_key: default_taxonomy_key(),
            taxonomy_sheet: None,
            output_path: default_output_path(),
            count_column: default_count_column(),
            count_policy: CountPolicy::default(),
            rbr_names: Vec::new(),
            metrics: AggregationSpec::default(),
        }
    }
}

fn default_company_key() -> String {
    company::GVKEY.to_string()
}

fn default_taxonomy_key() -> String {
    taxonomy::GVKEY.to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from(report::DEFAULT_OUTPUT)
}

fn default_count_column() -> String {
    report::NUMBER_OF_GVKEYS.to_string()
}

impl ReportConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, RbrError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, RbrError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_metrics(mut self, metrics: AggregationSpec) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_count_policy(mut self, policy: CountPolicy) -> Self {
        self.count_policy = policy;
        self
    }
}
