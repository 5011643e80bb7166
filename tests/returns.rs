use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use rbr_returns::{
    output_rbr_returns, AggOp, AggregationSpec, CountPolicy, RbrError, ReportConfig,
};
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

const RETURN: &str = "Port. Total Return";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Two sub-entities per company; company 4 has no taxonomy row.
fn write_metrics(dir: &Path) -> PathBuf {
    let path = dir.join("company_data.txt");
    fs::write(
        &path,
        "Gvkey\tISIN\tPort. Total Return\n\
         1\tUS0000000001\t10\n\
         1\tUS0000000002\t20\n\
         2\tUS0000000003\t5\n\
         2\tUS0000000004\t5\n\
         4\tUS0000000005\t7\n",
    )
    .unwrap();
    path
}

/// Column 5 has no header and must never reach the report.
/// Company 3 only exists in the taxonomy.
fn write_taxonomy(dir: &Path) -> PathBuf {
    let path = dir.join("company_rbr.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let header = [
        "GVKey",
        "Company Name",
        "Activity Level 1",
        "Activity Level 2",
        "Thematic Level 1",
    ];
    for (c, name) in header.iter().enumerate() {
        sheet.write_string(0, c as u16, *name).unwrap();
    }

    let rows = [
        (1.0, "Alpha", "A", "A1", "T", "x"),
        (2.0, "Beta", "A", "A2", "T", "y"),
        (3.0, "Gamma", "B", "B1", "U", "z"),
    ];
    for (i, (gvkey, name, l1, l2, t1, junk)) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_number(r, 0, *gvkey).unwrap();
        sheet.write_string(r, 1, *name).unwrap();
        sheet.write_string(r, 2, *l1).unwrap();
        sheet.write_string(r, 3, *l2).unwrap();
        sheet.write_string(r, 4, *t1).unwrap();
        sheet.write_string(r, 5, *junk).unwrap();
    }

    workbook.save(&path).unwrap();
    path
}

struct Fixture {
    dir: TempDir,
    metrics: PathBuf,
    taxonomy: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let metrics = write_metrics(dir.path());
        let taxonomy = write_taxonomy(dir.path());
        Self {
            dir,
            metrics,
            taxonomy,
        }
    }

    fn config(&self) -> ReportConfig {
        ReportConfig::default()
            .with_metrics(AggregationSpec::new().with(RETURN, AggOp::Sum))
            .with_output_path(self.dir.path().join("returns.csv"))
    }
}

fn strs(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect()
}

fn f64s(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}

fn i64s(df: &DataFrame, name: &str) -> Vec<i64> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or(-1))
        .collect()
}

#[test]
fn aggregates_companies_within_each_level() {
    let fx = Fixture::new();
    let config = fx.config();

    let df = output_rbr_returns(
        &fx.metrics,
        &fx.taxonomy,
        &["Activity", "Thematic", "Resource"],
        &config,
    )
    .unwrap();

    assert_eq!(
        df.get_column_names_str(),
        vec![
            "RBR Name",
            "RBR Level",
            "RBR category",
            "Number of Gvkeys",
            RETURN
        ]
    );
    assert_eq!(
        strs(&df, "RBR Level"),
        vec![
            "Activity Level 1",
            "Activity Level 2",
            "Activity Level 2",
            "Thematic Level 1"
        ]
    );
    assert_eq!(
        strs(&df, "RBR Name"),
        vec!["Activity", "Activity", "Activity", "Thematic"]
    );
    assert_eq!(strs(&df, "RBR category"), vec!["A", "A1", "A2", "T"]);
    assert_eq!(f64s(&df, RETURN), vec![40.0, 30.0, 10.0, 40.0]);
    assert_eq!(i64s(&df, "Number of Gvkeys"), vec![3, 1, 2, 3]);
}

#[test]
fn writes_indexed_csv() {
    let fx = Fixture::new();
    let config = fx.config();

    output_rbr_returns(&fx.metrics, &fx.taxonomy, &["Activity"], &config).unwrap();

    let written = fs::read_to_string(&config.output_path).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0]
        .ends_with("RBR Name,RBR Level,RBR category,Number of Gvkeys,Port. Total Return"));
    assert!(lines[1].starts_with("0,Activity,Activity Level 1,A,3,"));
    assert!(lines[2].starts_with("0,Activity,Activity Level 2,A1,1,"));
    assert!(lines[3].starts_with("1,Activity,Activity Level 2,A2,2,"));
}

#[test]
fn unnamed_columns_and_unknown_names_leave_no_trace() {
    let fx = Fixture::new();
    let config = fx.config();

    let df = output_rbr_returns(&fx.metrics, &fx.taxonomy, &["Resource", "Unnamed"], &config)
        .unwrap();

    assert_eq!(df.height(), 0);
    assert!(df
        .get_column_names_str()
        .iter()
        .all(|c| !c.contains("Unnamed")));
    assert!(!fs::read_to_string(&config.output_path)
        .unwrap()
        .contains("Unnamed"));
}

#[test]
fn taxonomy_only_and_unclassified_companies_are_excluded() {
    let fx = Fixture::new();
    let config = fx.config();

    let df = output_rbr_returns(&fx.metrics, &fx.taxonomy, &["Activity"], &config).unwrap();

    // company 3 (taxonomy only) would add category B; company 4 (no taxonomy) adds nothing
    assert!(!strs(&df, "RBR category").contains(&"B".to_string()));
    let level_1_total: f64 = f64s(&df, RETURN)[..1].iter().sum();
    assert_eq!(level_1_total, 40.0);
}

#[test]
fn distinct_policy_reports_company_counts() {
    let fx = Fixture::new();
    let config = fx.config().with_count_policy(CountPolicy::Distinct);

    let df = output_rbr_returns(&fx.metrics, &fx.taxonomy, &["Activity"], &config).unwrap();

    assert_eq!(i64s(&df, "Number of Gvkeys"), vec![2, 1, 1]);
}

#[test]
fn config_file_drives_the_report() {
    let fx = Fixture::new();
    let output = fx.dir.path().join("out").join("activity.csv");
    let config_path = fx.dir.path().join("report.toml");
    fs::write(
        &config_path,
        format!(
            r#"
            output_path = "{}"
            rbr_names = ["Thematic"]

            [[metrics]]
            name = "Port. Total Return"
            op = "mean"
            "#,
            output.display()
        ),
    )
    .unwrap();

    let config = ReportConfig::from_file(&config_path).unwrap();
    let df = output_rbr_returns(&fx.metrics, &fx.taxonomy, &config.rbr_names, &config).unwrap();

    assert_eq!(strs(&df, "RBR category"), vec!["T"]);
    // per company: (10 + 20) / 2 = 15 and (5 + 5) / 2 = 5
    assert_eq!(f64s(&df, RETURN), vec![10.0]);
    assert!(output.exists());
}

#[test]
fn missing_metric_column_is_fatal() {
    let fx = Fixture::new();
    let config = fx.config().with_metrics(AggregationSpec::default());

    let err = output_rbr_returns(&fx.metrics, &fx.taxonomy, &["Activity"], &config).unwrap_err();

    assert!(matches!(err, RbrError::MissingColumn(ref c) if c == "Port. Contribution To Return"));
}

#[test]
fn missing_files_are_fatal() {
    let fx = Fixture::new();
    let config = fx.config();
    let absent = fx.dir.path().join("absent.xlsx");

    assert!(output_rbr_returns(&fx.metrics, &absent, &["Activity"], &config).is_err());
    assert!(!config.output_path.exists());
}
