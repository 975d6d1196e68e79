//! Integration tests for the parser adapter, fed through the preprocessor.

use calcscope::sql::{parse_expression, NodeKind, ParseError, SortDirection};

#[test]
fn test_canonical_equality_is_binary_expr() {
    let node = parse_expression("({a} = ${b})").unwrap();
    assert_eq!(node.type_name(), "binary_expr");

    let NodeKind::BinaryExpr(bin) = &node.kind else {
        panic!("expected binary_expr");
    };
    assert_eq!(bin.operator, "=");
    assert_eq!(bin.left.as_column_ref().map(|c| c.alias()).as_deref(), Some("a"));
    assert_eq!(bin.right.as_column_ref().map(|c| c.alias()).as_deref(), Some("b"));
}

#[test]
fn test_dotted_backtick_name_is_one_column() {
    let node = parse_expression("{s3LogicalTableMap.team}").unwrap();
    let column = node.as_column_ref().expect("column_ref");
    assert_eq!(column.table, None);
    assert_eq!(column.alias(), "s3LogicalTableMap.team");
}

#[test]
fn test_rank_is_function() {
    let node = parse_expression("rank([sum({r}) DESC], [], PRE_FILTER)").unwrap();
    assert_eq!(node.type_name(), "function");
    assert_eq!(node.function_name(), Some("RANK"));

    let window = node.as_call().and_then(|c| c.over.as_ref()).expect("window");
    assert!(window.partition_by.is_empty());
    assert_eq!(window.order_by.len(), 1);
    assert_eq!(window.order_by[0].direction, SortDirection::Desc);
    assert_eq!(window.order_by[0].expr.type_name(), "aggr_func");
}

#[test]
fn test_max_over_with_partition() {
    let node = parse_expression("maxOver({f1}, [p], PRE_FILTER)").unwrap();
    assert_eq!(node.function_name(), Some("MAX_OVER"));

    let call = node.as_call().unwrap();
    assert_eq!(call.args.len(), 1);
    let window = call.over.as_ref().expect("window");
    assert_eq!(window.partition_by.len(), 1);
    assert_eq!(
        window.partition_by[0].as_column_ref().map(|c| c.alias()).as_deref(),
        Some("p")
    );
}

#[test]
fn test_max_over_with_empty_partition() {
    let node = parse_expression("maxOver(sum({f1}), [])").unwrap();
    assert_eq!(node.function_name(), Some("MAX_OVER"));

    let call = node.as_call().unwrap();
    assert_eq!(call.args[0].type_name(), "aggr_func");
    let window = call.over.as_ref().expect("window");
    assert!(window.partition_by.is_empty());
    assert!(window.order_by.is_empty());
}

#[test]
fn test_stdev_over() {
    let node = parse_expression("stdevOver({x}, [{region}], PRE_AGG)").unwrap();
    assert_eq!(node.function_name(), Some("STDEV_OVER"));
}

#[test]
fn test_unknown_vendor_function_passes_through() {
    let node = parse_expression("periodOverPeriodDifference(sum({sales}), {date})").unwrap();
    assert_eq!(node.type_name(), "function");
    assert_eq!(node.function_name(), Some("periodOverPeriodDifference"));
}

#[test]
fn test_arithmetic_over_aggregates() {
    let node = parse_expression("((sum({a})^1)/nullIf(sum({b}), 0))-1").unwrap();
    assert_eq!(node.type_name(), "binary_expr");
    let NodeKind::BinaryExpr(bin) = &node.kind else {
        panic!("expected binary_expr");
    };
    assert_eq!(bin.operator, "-");
    assert_eq!(bin.left.type_name(), "binary_expr");
}

#[test]
fn test_parse_is_deterministic() {
    let dsl = "sumOver(sum({sales}), [{region}], PRE_AGG) / ${target}";
    assert_eq!(parse_expression(dsl).unwrap(), parse_expression(dsl).unwrap());
}

#[test]
fn test_invalid_sql_is_reported() {
    let err = parse_expression("INVALID SQL").unwrap_err();
    assert!(err.to_string().contains("Error parsing SQL"));
    assert!(matches!(err, ParseError::SqlSyntax { .. } | ParseError::UnexpectedStructure { .. }));
}

#[test]
fn test_unbalanced_input_is_reported() {
    let err = parse_expression("sum({a}").unwrap_err();
    assert!(err.to_string().starts_with("Error parsing SQL"));
}

#[test]
fn test_ast_serializes_with_type_tags() {
    let node = parse_expression("{a} + 1").unwrap();
    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(json["type"], "binary_expr");
    assert_eq!(json["left"]["type"], "column_ref");
    assert_eq!(json["right"]["type"], "number");
}
