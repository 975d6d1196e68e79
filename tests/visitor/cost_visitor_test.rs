//! Integration tests for the cost/dependency visitor.

use std::collections::BTreeMap;

use calcscope::catalog::{lookup, StaticDocLinks};
use calcscope::model::Expression;
use calcscope::sql::{parse_expression, NodeIds, SqlNode};
use calcscope::visitor::{CostReport, CostVisitor, DependencyKind, DependencyMode, SqlVisitor};

fn parsed(mut expression: Expression, ids: &mut NodeIds) -> Expression {
    assert!(expression.parse_with(ids), "{:?}", expression.parsing_error);
    expression
}

fn analyze(expression: &Expression, scope: &[Expression], mode: DependencyMode) -> CostReport {
    let parameters = BTreeMap::new();
    CostVisitor::new(scope, &parameters)
        .with_mode(mode)
        .analyze(Some(&expression.alias), expression.parsed.as_ref().unwrap())
}

/// Sum of catalog costs over every call node, counted independently of the visitor.
#[derive(Default)]
struct CatalogSum(u32);

impl SqlVisitor for CatalogSum {
    fn visit(&mut self, node: &SqlNode) {
        if let Some(call) = node.as_call() {
            self.0 += lookup(&call.name).cost;
        }
        calcscope::visitor::walk_node(self, node);
    }
}

#[test]
fn test_cost_additivity() {
    for dsl in [
        "round(sum({a}) / count({b}), 2)",
        "maxOver(sum({f1}), [{p}], PRE_FILTER)",
        "ifelse({a} > 1, toUpper({b}), toLower({c}))",
        "rank([sum({r}) DESC], [{region}], PRE_FILTER)",
        "((sum({a})^1)/nullIf(sum({b}), 0))-1",
    ] {
        let ast = parse_expression(dsl).unwrap();
        let parameters = BTreeMap::new();
        let report = CostVisitor::new(&[], &parameters).analyze(None, &ast);

        let mut expected = CatalogSum::default();
        expected.visit(&ast);
        assert_eq!(report.total_cost, expected.0, "{dsl}");
    }
}

#[test]
fn test_calculated_field_chain_unrolls() {
    let mut ids = NodeIds::new();
    let mut profit = parsed(
        Expression::calculated_field("profit", "sum({revenue}) - sum({cost})"),
        &mut ids,
    );
    let margin = parsed(
        Expression::calculated_field("margin", "{profit} / sum({revenue})"),
        &mut ids,
    );

    let profit_report = analyze(&profit, &[], DependencyMode::Exhaustive);
    profit.apply_report(&profit_report);
    assert_eq!(profit_report.total_cost, 10);
    assert_eq!(profit_report.max_depth, 1);

    let scope = vec![profit.clone(), margin.clone()];
    let report = analyze(&margin, &scope, DependencyMode::Exhaustive);

    assert_eq!(report.total_cost, 15);
    assert!(report.max_depth >= profit_report.max_depth + 1);
    assert!(report.is_aggregation);

    let aliases: Vec<&str> = report.dependencies.iter().map(|d| d.alias.as_str()).collect();
    assert_eq!(
        aliases,
        vec!["profit", "SUM", "revenue", "SUM", "cost", "SUM", "revenue"]
    );
    let levels: Vec<u32> = report.dependencies.iter().map(|d| d.level).collect();
    assert_eq!(levels, vec![0, 1, 2, 1, 2, 0, 1]);

    let profit_dep = &report.dependencies[0];
    assert_eq!(profit_dep.kind, DependencyKind::CalculatedField);
    assert_eq!(profit_dep.cost, 10);
    assert_eq!(profit_dep.expression, "sum({revenue}) - sum({cost})");
    assert_eq!(report.dependencies[1].kind, DependencyKind::AggrFunc);
}

#[test]
fn test_deduplicated_mode_records_each_alias_once() {
    let mut ids = NodeIds::new();
    let profit = parsed(
        Expression::calculated_field("profit", "sum({revenue}) - sum({cost})"),
        &mut ids,
    );
    let margin = parsed(
        Expression::calculated_field("margin", "{profit} / sum({revenue})"),
        &mut ids,
    );
    let scope = vec![profit, margin.clone()];

    let report = analyze(&margin, &scope, DependencyMode::Deduplicated);
    let aliases: Vec<&str> = report.dependencies.iter().map(|d| d.alias.as_str()).collect();
    assert_eq!(aliases, vec!["profit", "SUM", "revenue", "SUM", "cost", "SUM"]);
    assert_eq!(report.total_cost, 15);
}

#[test]
fn test_parameter_resolution() {
    let ast = parse_expression("{amount} * ${rate}").unwrap();
    let parameters = BTreeMap::from([("rate".to_string(), "0.2".to_string())]);
    let report = CostVisitor::new(&[], &parameters).analyze(None, &ast);

    assert_eq!(report.total_cost, 0);
    assert_eq!(report.dependencies.len(), 2);
    assert_eq!(report.dependencies[0].kind, DependencyKind::Field);
    assert_eq!(report.dependencies[1].kind, DependencyKind::Parameter);
    assert_eq!(report.dependencies[1].expression, "0.2");
    assert_eq!(report.dependencies[1].cost, 0);
}

#[test]
fn test_parameter_wins_over_calculated_field() {
    let mut ids = NodeIds::new();
    let shadow = parsed(Expression::calculated_field("rate", "sum({x})"), &mut ids);
    let ast = parse_expression("{rate}").unwrap();
    let parameters = BTreeMap::from([("rate".to_string(), "3".to_string())]);
    let report = CostVisitor::new(std::slice::from_ref(&shadow), &parameters).analyze(None, &ast);

    assert_eq!(report.dependencies.len(), 1);
    assert_eq!(report.dependencies[0].kind, DependencyKind::Parameter);
    assert_eq!(report.total_cost, 0);
}

#[test]
fn test_known_field_resolution() {
    let mut field = Expression::field("region");
    field.cost = Some(0);
    let ast = parse_expression("toUpper({region})").unwrap();
    let parameters = BTreeMap::new();
    let report = CostVisitor::new(std::slice::from_ref(&field), &parameters).analyze(None, &ast);

    assert!(report.is_string_function);
    assert_eq!(report.dependencies[1].kind, DependencyKind::Field);
    assert_eq!(report.dependencies[1].expression, "{region}");
}

#[test]
fn test_self_reference_does_not_recurse() {
    let mut ids = NodeIds::new();
    let looping = parsed(Expression::calculated_field("loop", "sum({loop})"), &mut ids);
    let scope = vec![looping.clone()];
    let report = analyze(&looping, &scope, DependencyMode::Exhaustive);

    assert_eq!(report.total_cost, 5);
    assert_eq!(report.dependencies.len(), 2);
    assert_eq!(report.dependencies[1].kind, DependencyKind::CalculatedField);
}

#[test]
fn test_mutual_reference_terminates() {
    let mut ids = NodeIds::new();
    let a = parsed(Expression::calculated_field("a", "abs({b})"), &mut ids);
    let b = parsed(Expression::calculated_field("b", "abs({a})"), &mut ids);
    let scope = vec![a.clone(), b];
    let report = analyze(&a, &scope, DependencyMode::Exhaustive);

    // a: ABS, b (descend): ABS, a (stop)
    assert_eq!(report.total_cost, 4);
    let aliases: Vec<&str> = report.dependencies.iter().map(|d| d.alias.as_str()).collect();
    assert_eq!(aliases, vec!["ABS", "b", "ABS", "a"]);
}

#[test]
fn test_window_entries_are_recorded_twice_when_exhaustive() {
    let ast = parse_expression("maxOver({m}, [{p}], PRE_FILTER)").unwrap();
    let parameters = BTreeMap::new();

    let exhaustive = CostVisitor::new(&[], &parameters).analyze(None, &ast);
    let partition_hits = exhaustive
        .dependencies
        .iter()
        .filter(|d| d.alias == "p")
        .count();
    assert_eq!(partition_hits, 2);

    let deduplicated = CostVisitor::new(&[], &parameters)
        .with_mode(DependencyMode::Deduplicated)
        .analyze(None, &ast);
    let partition_hits = deduplicated
        .dependencies
        .iter()
        .filter(|d| d.alias == "p")
        .count();
    assert_eq!(partition_hits, 1);
}

#[test]
fn test_doc_links_on_function_dependencies() {
    let ast = parse_expression("sumOver({m}, [{p}])").unwrap();
    let parameters = BTreeMap::new();
    let docs = StaticDocLinks::default();
    let report = CostVisitor::new(&[], &parameters)
        .with_doc_links(&docs)
        .analyze(None, &ast);

    let function = &report.dependencies[0];
    assert_eq!(function.alias, "SUM_OVER");
    assert_eq!(
        function.doc_link.as_deref(),
        Some("https://docs.aws.amazon.com/quicksight/latest/user/sumOver-function.html")
    );
    assert!(report.dependencies[1..].iter().all(|d| d.doc_link.is_none()));
}
