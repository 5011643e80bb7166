use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};
use pyo3_polars::PyDataFrame;

use crate::aggregation::AggregationSpec;
use crate::config::ReportConfig;
use crate::schema;

/// Build the RBR returns report and write it to `output_path`.
///
/// Args:
///     company_data_filepath: tab-separated file with Gvkey, ISIN and metric columns
///     company_rbr_filepath: workbook with GVKey and `<rbr> Level <n>` columns
///     rbr_names: RBR names, e.g. ["Activity", "Thematic", "Resource"] (exact match)
///     metrics_dict: metric -> operation ('sum', 'mean', 'min', 'max');
///                   defaults to summing the four portfolio metrics
///     output_path: CSV destination (default: "returns.csv")
#[pyfunction]
#[pyo3(signature = (company_data_filepath, company_rbr_filepath, rbr_names, metrics_dict=None, output_path=None))]
fn output_rbr_returns(
    py: Python<'_>,
    company_data_filepath: &str,
    company_rbr_filepath: &str,
    rbr_names: Vec<String>,
    metrics_dict: Option<&Bound<'_, PyDict>>,
    output_path: Option<String>,
) -> PyResult<PyDataFrame> {
    let mut config = ReportConfig::default();
    if let Some(dict) = metrics_dict {
        let pairs = dict
            .iter()
            .map(|(k, v)| Ok((k.extract::<String>()?, v.extract::<String>()?)))
            .collect::<PyResult<Vec<(String, String)>>>()?;
        config = config.with_metrics(AggregationSpec::from_pairs(pairs)?);
    }
    if let Some(path) = output_path {
        config = config.with_output_path(path);
    }

    let df = py.allow_threads(|| {
        crate::output_rbr_returns(
            company_data_filepath,
            company_rbr_filepath,
            &rbr_names,
            &config,
        )
    })?;
    Ok(PyDataFrame(df))
}

/// Export schema constants as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Company metrics
    let company = PyModule::new(m.py(), "company")?;
    company.add("GVKEY", schema::company::GVKEY)?;
    company.add("TOTAL_RETURN", schema::company::TOTAL_RETURN)?;
    company.add(
        "CONTRIBUTION_TO_RETURN",
        schema::company::CONTRIBUTION_TO_RETURN,
    )?;
    company.add("BEGINNING_WEIGHT", schema::company::BEGINNING_WEIGHT)?;
    company.add("ENDING_WEIGHT", schema::company::ENDING_WEIGHT)?;
    m.add_submodule(&company)?;

    // Taxonomy
    let taxonomy = PyModule::new(m.py(), "taxonomy")?;
    taxonomy.add("GVKEY", schema::taxonomy::GVKEY)?;
    m.add_submodule(&taxonomy)?;

    // Report
    let report = PyModule::new(m.py(), "report")?;
    report.add("RBR_NAME", schema::report::RBR_NAME)?;
    report.add("RBR_LEVEL", schema::report::RBR_LEVEL)?;
    report.add("RBR_CATEGORY", schema::report::RBR_CATEGORY)?;
    report.add("NUMBER_OF_GVKEYS", schema::report::NUMBER_OF_GVKEYS)?;
    m.add_submodule(&report)?;

    Ok(())
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(output_rbr_returns, m)?)?;
    add_schema_exports(m)?;
    Ok(())
}
