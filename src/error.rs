#[cfg(feature = "python")]
use pyo3::exceptions::{PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RbrError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Unsupported aggregation: '{0}'. Must be 'sum', 'mean', 'min' or 'max'")]
    UnsupportedAggregation(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Invalid level pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Workbook has no usable sheet: {0}")]
    EmptyWorkbook(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),
}

#[cfg(feature = "python")]
impl From<RbrError> for PyErr {
    fn from(err: RbrError) -> PyErr {
        match err {
            RbrError::UnsupportedAggregation(_) => PyValueError::new_err(err.to_string()),
            other => PyRuntimeError::new_err(other.to_string()),
        }
    }
}
