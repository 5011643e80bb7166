use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use polars::prelude::*;
use tracing::{debug, info};

use crate::config::ReportConfig;
use crate::error::RbrError;
use crate::pipeline::require_columns;
use crate::schema::taxonomy;

/// Load both inputs of the report.
pub fn load(
    metrics_path: &Path,
    taxonomy_path: &Path,
    config: &ReportConfig,
) -> Result<(DataFrame, DataFrame), RbrError> {
    let metrics = load_company_metrics(metrics_path, config)?;
    let taxonomy = load_taxonomy(taxonomy_path, config)?;
    Ok((metrics, taxonomy))
}

/// Read the tab-separated company metrics file.
///
/// The company key is cast to Int64 and every metric of the spec to Float64.
/// Other columns (ISIN, names, ...) are kept as inferred.
pub fn load_company_metrics(path: &Path, config: &ReportConfig) -> Result<DataFrame, RbrError> {
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| opts.with_separator(b'\t'))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let key = config.company_key.as_str();
    require_columns(&raw, std::iter::once(key).chain(config.metrics.names()))?;

    let mut casts = vec![col(key).strict_cast(DataType::Int64)];
    casts.extend(
        config
            .metrics
            .names()
            .map(|name| col(name).strict_cast(DataType::Float64)),
    );
    let df = raw.lazy().with_columns(casts).collect()?;

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded company metrics"
    );
    Ok(df)
}

/// Read the RBR taxonomy workbook.
///
/// The taxonomy key column is renamed to the company key and cast to Int64;
/// columns exported without a header ("Unnamed: n") are dropped.
pub fn load_taxonomy(path: &Path, config: &ReportConfig) -> Result<DataFrame, RbrError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = match &config.taxonomy_sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| RbrError::EmptyWorkbook(path.display().to_string()))?,
    };
    let range = workbook.worksheet_range(&sheet)?;
    let raw = range_to_frame(&range, &format!("{} [{sheet}]", path.display()))?;

    require_columns(&raw, [config.taxonomy_key.as_str()])?;

    let kept: Vec<String> = raw
        .get_column_names_str()
        .iter()
        .filter(|name| {
            let unnamed = name.contains(taxonomy::UNNAMED_MARKER);
            if unnamed {
                debug!(column = %name, "dropping unnamed taxonomy column");
            }
            !unnamed
        })
        .map(|name| name.to_string())
        .collect();

    let key = config.company_key.as_str();
    let df = raw
        .select(kept)?
        .lazy()
        .rename([config.taxonomy_key.as_str()], [key], true)
        .with_columns([col(key).strict_cast(DataType::Int64)])
        .collect()?;

    info!(
        path = %path.display(),
        sheet = %sheet,
        rows = df.height(),
        columns = df.width(),
        "loaded taxonomy"
    );
    Ok(df)
}

// ── Worksheet conversion ────────────────────────────────────────────────────

enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Null,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Number(n) => Some(number_text(n)),
            Cell::Text(s) => Some(s),
        }
    }
}

/// Render integral numbers without a fractional part ("1234", not "1234.0").
fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Header names as a spreadsheet export sees them: empty headers become
/// `Unnamed: <col>` and repeated names get `.1`, `.2`, ... appended.
fn header_names(header: &[Data], col_offset: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let base = match Cell::from_data(cell).into_text() {
                Some(name) if !name.is_empty() => name,
                _ => format!("{}: {}", taxonomy::UNNAMED_MARKER, col_offset + i),
            };
            let mut name = base.clone();
            let mut n = 0;
            while !seen.insert(name.clone()) {
                n += 1;
                name = format!("{base}.{n}");
            }
            name
        })
        .collect()
}

/// A column is numeric only when every non-empty cell is a number.
fn cells_to_column<'a>(name: &str, cells: impl Iterator<Item = &'a Data>) -> Column {
    let cells: Vec<Cell> = cells.map(Cell::from_data).collect();
    let numeric = cells.iter().all(|c| !matches!(c, Cell::Text(_)));
    let has_values = cells.iter().any(|c| !matches!(c, Cell::Null));

    if numeric && has_values {
        let values: Vec<Option<f64>> = cells
            .into_iter()
            .map(|c| match c {
                Cell::Number(n) => Some(n),
                _ => None,
            })
            .collect();
        Column::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = cells.into_iter().map(Cell::into_text).collect();
        Column::new(name.into(), values)
    }
}

static EMPTY_CELL: Data = Data::Empty;

fn range_to_frame(range: &Range<Data>, source: &str) -> Result<DataFrame, RbrError> {
    let col_offset = range.start().map(|(_, c)| c as usize).unwrap_or(0);
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| RbrError::EmptyWorkbook(source.to_string()))?;
    let names = header_names(header, col_offset);
    let body: Vec<&[Data]> = rows.collect();

    let columns: Vec<Column> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells_to_column(
                name,
                body.iter().map(|row| row.get(i).unwrap_or(&EMPTY_CELL)),
            )
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}
