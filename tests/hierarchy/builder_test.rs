//! Integration tests for building the request hierarchy from bundles.

use calcscope::catalog::{NoDocLinks, StaticDocLinks};
use calcscope::config::AnalysisSettings;
use calcscope::hierarchy::{build_hierarchy, HierarchyBuilder, NodeLevel, Tag, ROOT_KEY};
use calcscope::model::{DisplayNames, RawExpression, RequestBundle};
use calcscope::visitor::{DependencyKind, DependencyMode};

fn bundle(request_id: &str, dashboard: &str, sheet: &str, visual: &str) -> RequestBundle {
    RequestBundle {
        request_id: request_id.into(),
        dashboard_id: Some(dashboard.into()),
        sheet_id: Some(sheet.into()),
        dataset_id: "ds".into(),
        visual_id: Some(visual.into()),
        start_time: 0,
        end_time: Some(1_000),
        ..Default::default()
    }
}

fn with_metric(mut bundle: RequestBundle, alias: &str, aggregation: &str) -> RequestBundle {
    bundle.metrics.push(RawExpression {
        alias: alias.into(),
        expression: None,
        aggregation: Some(aggregation.into()),
    });
    bundle
}

#[test]
fn test_request_lands_under_its_path() {
    let hierarchy = build_hierarchy(
        &[bundle("r-1", "d-1", "s-1", "v-1")],
        &AnalysisSettings::default(),
        &NoDocLinks,
    );

    assert_eq!(hierarchy.root.key, ROOT_KEY);
    assert_eq!(
        hierarchy.path_to_request("r-1"),
        Some(vec![
            "Dashboards".to_string(),
            "d-1".to_string(),
            "s-1".to_string(),
            "s-1_ds".to_string(),
            "v-1".to_string(),
            "r-1".to_string(),
        ])
    );

    let leaf = hierarchy.find_request("r-1").unwrap();
    assert_eq!(leaf.level, NodeLevel::Request);
    assert_eq!(leaf.metrics.duration, 1.0);
    assert_eq!(leaf.metrics.request_count, 1);
    assert_eq!(
        leaf.request.as_ref().map(|r| r.request_id.as_str()),
        Some("r-1")
    );
}

#[test]
fn test_analyses_get_their_own_branch() {
    let mut analysis = bundle("r-2", "", "s-1", "v-1");
    analysis.analysis_id = Some("a-1".into());

    let hierarchy = build_hierarchy(
        &[bundle("r-1", "d-1", "s-1", "v-1"), analysis],
        &AnalysisSettings::default(),
        &NoDocLinks,
    );

    let keys: Vec<&str> = hierarchy.root.children.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["Dashboards", "Analyses"]);
    assert!(hierarchy.root.find(&["Analyses", "a-1", "s-1", "s-1_ds", "v-1", "r-2"]).is_some());
    assert_eq!(hierarchy.counts.dashboards, 1);
    assert_eq!(hierarchy.counts.analyses, 1);
    assert_eq!(hierarchy.counts.sheets, 1);
    assert_eq!(hierarchy.counts.visuals, 1);
    assert_eq!(hierarchy.counts.requests, 2);
}

#[test]
fn test_incomplete_requests_are_skipped() {
    let settings = AnalysisSettings::default();
    let mut builder = HierarchyBuilder::new(&settings);

    let mut no_visual = bundle("r-1", "d-1", "s-1", "v-1");
    no_visual.visual_id = None;
    assert!(!builder.add_request(&no_visual));

    let mut no_exploration = bundle("r-2", "d-1", "s-1", "v-1");
    no_exploration.dashboard_id = None;
    assert!(!builder.add_request(&no_exploration));

    assert!(builder.add_request(&bundle("r-3", "d-1", "s-1", "v-1")));

    let hierarchy = builder.finish();
    assert_eq!(hierarchy.counts.requests, 1);
    assert_eq!(hierarchy.root.metrics.request_count, 1);
}

#[test]
fn test_duplicate_request_keeps_first() {
    let settings = AnalysisSettings::default();
    let mut builder = HierarchyBuilder::new(&settings);

    let mut first = bundle("r-1", "d-1", "s-1", "v-1");
    first.visual_type = Some("BAR".into());
    let mut second = bundle("r-1", "d-1", "s-1", "v-1");
    second.visual_type = Some("PIE".into());

    assert!(builder.add_request(&first));
    assert!(!builder.add_request(&second));

    let hierarchy = builder.finish();
    let leaf = hierarchy.find_request("r-1").unwrap();
    assert_eq!(
        leaf.request.as_ref().and_then(|r| r.visual_type.as_deref()),
        Some("BAR")
    );
    assert_eq!(hierarchy.root.metrics.request_count, 1);
}

#[test]
fn test_high_cost_tag() {
    let settings = AnalysisSettings {
        high_cost_threshold: 4,
        ..Default::default()
    };
    let hierarchy = build_hierarchy(
        &[
            with_metric(bundle("r-1", "d-1", "s-1", "v-1"), "sales", "SUM"),
            with_metric(bundle("r-2", "d-1", "s-1", "v-2"), "orders", "COUNT"),
        ],
        &settings,
        &NoDocLinks,
    );

    let expensive = hierarchy.find_request("r-1").unwrap();
    assert_eq!(expensive.metrics.cost, 5);
    assert!(expensive.metrics.tags.contains(&Tag::HighCost));
    assert_eq!(expensive.metrics.high_cost_request_count, 1);

    let cheap = hierarchy.find_request("r-2").unwrap();
    assert_eq!(cheap.metrics.cost, 3);
    assert!(cheap.metrics.tags.is_empty());

    assert_eq!(hierarchy.root.metrics.cost, 8);
    assert_eq!(hierarchy.root.metrics.high_cost_request_count, 1);
    assert!(hierarchy.root.metrics.tags.contains(&Tag::HighCost));
}

#[test]
fn test_cheap_requests_are_not_high_cost() {
    let settings = AnalysisSettings {
        high_cost_threshold: 1_000,
        high_cost_request_limit: 0,
        ..Default::default()
    };
    let hierarchy = build_hierarchy(
        &[with_metric(bundle("r-1", "d-1", "s-1", "v-1"), "sales", "SUM")],
        &settings,
        &NoDocLinks,
    );
    assert!(hierarchy.root.metrics.tags.is_empty());
    assert_eq!(hierarchy.root.metrics.high_cost_request_count, 0);
}

#[test]
fn test_parsing_error_is_tagged_and_isolated() {
    let mut broken = bundle("r-1", "d-1", "s-1", "v-1");
    broken.calculated_fields.push(RawExpression {
        alias: "bad".into(),
        expression: Some("sum({a}".into()),
        aggregation: None,
    });
    broken = with_metric(broken, "sales", "SUM");

    let hierarchy = build_hierarchy(&[broken], &AnalysisSettings::default(), &NoDocLinks);
    let leaf = hierarchy.find_request("r-1").unwrap();

    assert!(leaf.metrics.tags.contains(&Tag::ParsingError));
    assert_eq!(leaf.metrics.cost, 5);
    assert_eq!(leaf.metrics.parsed_expression_count, 1);
    assert!(hierarchy.root.metrics.tags.contains(&Tag::ParsingError));
    // A parse failure is not a request error.
    assert!(!hierarchy.root.metrics.has_error);
}

#[test]
fn test_error_and_duration_roll_up() {
    let mut failed = bundle("r-2", "d-1", "s-1", "v-2");
    failed.error_code = Some("QUERY_TIMEOUT".into());
    failed.end_time = Some(2_500);

    let mut other_dashboard = bundle("r-3", "d-2", "s-9", "v-9");
    other_dashboard.start_time = 500;
    other_dashboard.end_time = Some(4_500);

    let hierarchy = build_hierarchy(
        &[bundle("r-1", "d-1", "s-1", "v-1"), failed, other_dashboard],
        &AnalysisSettings::default(),
        &NoDocLinks,
    );

    let d1 = hierarchy.root.find(&["Dashboards", "d-1"]).unwrap();
    assert_eq!(d1.metrics.duration, 3.5);
    assert_eq!(d1.metrics.request_count, 2);
    assert!(d1.metrics.has_error);

    let d2 = hierarchy.root.find(&["Dashboards", "d-2"]).unwrap();
    assert_eq!(d2.metrics.duration, 4.0);
    assert!(!d2.metrics.has_error);

    let root = &hierarchy.root.metrics;
    assert_eq!(root.duration, 7.5);
    assert_eq!(root.request_count, 3);
    assert!(root.has_error);
    assert_eq!(root.start_time, Some(0));
    assert_eq!(root.end_time, Some(4_500));
}

#[test]
fn test_long_duration_outlier() {
    let mut bundles: Vec<RequestBundle> = (0..20)
        .map(|i| bundle(&format!("r-{i}"), "d-1", "s-1", "v-1"))
        .collect();
    let mut slow = bundle("slow", "d-1", "s-1", "v-1");
    slow.end_time = Some(100_000);
    bundles.push(slow);

    let hierarchy = build_hierarchy(&bundles, &AnalysisSettings::default(), &NoDocLinks);

    let tagged: Vec<&str> = hierarchy
        .root
        .requests()
        .into_iter()
        .filter(|n| n.metrics.tags.contains(&Tag::LongDuration))
        .map(|n| n.key.as_str())
        .collect();
    assert_eq!(tagged, vec!["slow"]);
    assert!(hierarchy.root.metrics.tags.contains(&Tag::LongDuration));
}

#[test]
fn test_unfinished_request_is_left_out_of_statistics() {
    let mut pending = bundle("pending", "d-1", "s-1", "v-1");
    pending.end_time = None;

    let hierarchy = build_hierarchy(
        &[bundle("r-1", "d-1", "s-1", "v-1"), pending],
        &AnalysisSettings::default(),
        &NoDocLinks,
    );

    let leaf = hierarchy.find_request("pending").unwrap();
    assert_eq!(leaf.metrics.duration, 0.0);
    assert_eq!(leaf.request.as_ref().and_then(|r| r.duration), None);
    assert!(leaf.metrics.tags.is_empty());
}

#[test]
fn test_display_names_are_attached() {
    let mut named = bundle("r-1", "d-1", "s-1", "v-1");
    named.names = DisplayNames {
        dashboard: Some("Sales".into()),
        sheet: Some("Overview".into()),
        visual: Some("Revenue by region".into()),
        dataset: Some("orders".into()),
        ..Default::default()
    };
    named.origin = Some("https://bi.example.com".into());

    let hierarchy = build_hierarchy(&[named], &AnalysisSettings::default(), &NoDocLinks);

    let name_at = |path: &[&str]| hierarchy.root.find(path).and_then(|n| n.name.clone());
    assert_eq!(name_at(&["Dashboards", "d-1"]).as_deref(), Some("Sales"));
    assert_eq!(name_at(&["Dashboards", "d-1", "s-1"]).as_deref(), Some("Overview"));
    assert_eq!(
        name_at(&["Dashboards", "d-1", "s-1", "s-1_ds"]).as_deref(),
        Some("orders")
    );
    assert_eq!(
        name_at(&["Dashboards", "d-1", "s-1", "s-1_ds", "v-1"]).as_deref(),
        Some("Revenue by region")
    );
    assert_eq!(
        hierarchy.root.metrics.origin.as_deref(),
        Some("https://bi.example.com")
    );
}

#[test]
fn test_dependency_chain_lookup() {
    let mut request = bundle("r-1", "d-1", "s-1", "v-1");
    request.calculated_fields.push(RawExpression {
        alias: "regional".into(),
        expression: Some("sumOver(sum({sales}), [{region}], PRE_AGG)".into()),
        aggregation: None,
    });

    let docs = StaticDocLinks::default();
    let hierarchy = build_hierarchy(&[request], &AnalysisSettings::default(), &docs);

    let chain = hierarchy
        .dependency_chain("r-1", "regional", &docs, DependencyMode::Exhaustive)
        .unwrap();
    assert_eq!(chain[0].alias, "regional");
    assert_eq!(chain[0].kind, DependencyKind::CalculatedField);
    assert_eq!(chain[1].alias, "SUM_OVER");
    assert!(chain[1].doc_link.is_some());

    assert!(hierarchy
        .dependency_chain("r-1", "missing", &docs, DependencyMode::Exhaustive)
        .is_none());
    assert!(hierarchy
        .dependency_chain("nope", "regional", &docs, DependencyMode::Exhaustive)
        .is_none());
    assert_eq!(hierarchy.expressions().count(), 1);
}
