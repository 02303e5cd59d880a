use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::PathBuf;
use survey_insights::data::LoaderError;
use survey_insights::report::{to_json_string, ComparisonSection, GapSection, Report};
use survey_insights::stats::{
    sort_by_abs_gap, sort_by_latest, AdoptionQuadrant, FamilyMean, PriorityQuadrant,
};
use survey_insights::{
    compare_periods, Config, GapDirection, MetricFamily, PairSpec, PairedMetricAggregator,
    SurveyLoader, SurveyTable,
};
use tempfile::TempDir;

fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn load(dir: &TempDir, name: &str, content: &str) -> SurveyTable {
    let path = write_csv(dir, name, content);
    SurveyLoader::new().load_csv(&path).unwrap()
}

const CURRENT: &str = "\
IMP_CMS,DS_CMS,IMP_VPN,DS_VPN,IMP_ONLY,SKL_ERP,LRN_ERP,ADIV,USE_CMS,USE_SWC,USE_GAIT
4,2,5,,3,2,4,Arts,5,4,1
2,4,3,,1,1,5,Arts,4,5,2
5,5,4,,2,3,3,Science,5,3,
";

const BASELINE: &str = "\
USE_CMS,USE_SWC,USE_OLD,USE_GAIT
4,1,3,0
4,2,2,0
";

fn imp_ds() -> PairSpec {
    PairSpec::new(
        "imp-ds",
        MetricFamily::new("IMP_", "Importance"),
        MetricFamily::new("DS_", "Satisfaction"),
    )
}

#[test]
fn test_csv_to_paired_rows() {
    let dir = TempDir::new().unwrap();
    let table = load(&dir, "c24.csv", CURRENT);
    assert_eq!(table.row_count(), 3);

    let rows = PairedMetricAggregator::aggregate(&table, &imp_ds()).unwrap();
    let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["CMS", "VPN"]);

    let cms = &rows[0];
    assert!((cms.left_mean - 11.0 / 3.0).abs() < 1e-9);
    assert!((cms.right_mean - 11.0 / 3.0).abs() < 1e-9);
    assert!(cms.gap.abs() < 1e-9);

    // Column present but never answered
    let vpn = &rows[1];
    assert_eq!(vpn.left_mean, 4.0);
    assert!(vpn.right_mean.is_nan());
    assert!(vpn.gap.is_nan());
    assert_eq!(vpn.right_count, 0);
}

#[test]
fn test_right_minus_left_pair() {
    let dir = TempDir::new().unwrap();
    let table = load(&dir, "c24.csv", CURRENT);
    let pair = PairSpec::new(
        "skl-lrn",
        MetricFamily::new("SKL_", "Skill"),
        MetricFamily::new("LRN_", "Interest"),
    )
    .with_gap(GapDirection::RightMinusLeft);

    let rows = PairedMetricAggregator::aggregate(&table, &pair).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].left_mean, 2.0);
    assert_eq!(rows[0].right_mean, 4.0);
    assert_eq!(rows[0].gap, 2.0);
}

#[test]
fn test_grouped_rows_follow_first_appearance() {
    let dir = TempDir::new().unwrap();
    let table = load(&dir, "c24.csv", CURRENT);

    let grouped = PairedMetricAggregator::aggregate_grouped(&table, &imp_ds(), "ADIV").unwrap();
    let labels: Vec<&str> = grouped.iter().map(|g| g.group.as_str()).collect();
    assert_eq!(labels, vec!["Arts", "Science"]);

    assert_eq!(grouped[0].respondents, 2);
    assert_eq!(grouped[0].rows[0].left_mean, 3.0);
    assert_eq!(grouped[0].rows[0].right_mean, 3.0);
    assert_eq!(grouped[1].rows[0].left_mean, 5.0);
}

#[test]
fn test_missing_group_column_is_reported() {
    let dir = TempDir::new().unwrap();
    let table = load(&dir, "c24.csv", CURRENT);

    let err = PairedMetricAggregator::aggregate_grouped(&table, &imp_ds(), "TENURE").unwrap_err();
    assert_eq!(err.to_string(), "Column not found: TENURE");
}

#[test]
fn test_family_means_by_group() {
    let dir = TempDir::new().unwrap();
    let table = load(&dir, "div.csv", "USE_X,DIV\n2,S\n4,S\n1,T\n");

    let means = PairedMetricAggregator::family_means(
        &table,
        &MetricFamily::new("USE_", "usage"),
        Some("DIV"),
    )
    .unwrap();

    assert_eq!(
        means,
        vec![
            FamilyMean {
                group: Some("S".into()),
                code: "X".into(),
                mean: 3.0,
                count: 2,
            },
            FamilyMean {
                group: Some("T".into()),
                code: "X".into(),
                mean: 1.0,
                count: 1,
            },
        ]
    );
}

#[test]
fn test_period_comparison_across_files() {
    let dir = TempDir::new().unwrap();
    let current = load(&dir, "c24.csv", CURRENT);
    let baseline = load(&dir, "c18.csv", BASELINE);
    let usage = MetricFamily::new("USE_", "Usage");

    let mut changes = compare_periods(&baseline, &current, &usage).unwrap();
    let codes: Vec<&str> = changes.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["CMS", "SWC", "GAIT"]);

    let swc = &changes[1];
    assert_eq!(swc.before, 1.5);
    assert_eq!(swc.after, 4.0);
    assert_eq!(swc.change, 2.5);
    assert!((swc.pct_change.unwrap() - 166.666_666_7).abs() < 1e-6);

    // Zero baseline has no relative change
    assert_eq!(changes[2].before, 0.0);
    assert_eq!(changes[2].pct_change, None);

    sort_by_latest(&mut changes);
    assert_eq!(changes[0].code, "CMS");

    let section = ComparisonSection::new(
        "Usage",
        "2018",
        "2024",
        &changes,
        &Default::default(),
        5.0,
        0.5,
    );
    let swc = section.entries.iter().find(|e| e.code == "SWC").unwrap();
    assert_eq!(swc.quadrant, Some(AdoptionQuadrant::Emerging));
}

#[test]
fn test_unmatched_pair_against_other_table_is_empty() {
    let dir = TempDir::new().unwrap();
    let table = load(&dir, "only_imp.csv", "IMP_A,DS_B\n5,1\n");

    let rows = PairedMetricAggregator::aggregate(&table, &imp_ds()).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_report_json_uses_names_and_nulls() {
    let dir = TempDir::new().unwrap();
    let table = load(&dir, "c24.csv", CURRENT);
    let config = Config::default();
    let pair = config.pair("imp-ds").unwrap();

    let mut rows = PairedMetricAggregator::aggregate(&table, pair).unwrap();
    sort_by_abs_gap(&mut rows);
    let section = GapSection::new(pair, &rows, &config.names);
    assert_eq!(section.entries[0].name, "Content Management System");
    assert_eq!(
        section.entries[0].quadrant,
        Some(PriorityQuadrant::KeepUpTheGoodWork)
    );

    let mut report = Report::new("c24.csv", table.row_count());
    report.gaps.push(section);
    let json: serde_json::Value = serde_json::from_str(&to_json_string(&report).unwrap()).unwrap();

    let entries = &json["gaps"][0]["entries"];
    assert_eq!(entries[1]["name"], "Virtual Private Network");
    assert!(entries[1]["right_mean"].is_null());
    assert!(entries[1]["gap"].is_null());
    assert!(json.get("usage").is_none());
}

#[test]
fn test_missing_file_is_loader_error() {
    let dir = TempDir::new().unwrap();
    let err = SurveyLoader::new()
        .load_csv(&dir.path().join("nope.csv"))
        .unwrap_err();
    assert!(matches!(err, LoaderError::NotFound(_)));
}
