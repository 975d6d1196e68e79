//! Integration tests for the DSL preprocessor.

use calcscope::dsl::{preprocess, rewrite_call, substitute_references};

#[test]
fn test_equality_with_parameter() {
    insta::assert_snapshot!(
        preprocess("({s3LogicalTableMap.team} = ${132111ea-6138-4c57-a623-9ea336d76cb1})"),
        @"SELECT ((`s3LogicalTableMap.team` = `132111ea-6138-4c57-a623-9ea336d76cb1`)) AS expr FROM DUAL"
    );
}

#[test]
fn test_plain_expression_is_pure_substitution() {
    insta::assert_snapshot!(
        preprocess("{a} + ${b} * 2"),
        @"SELECT (`a` + `b` * 2) AS expr FROM DUAL"
    );
}

#[test]
fn test_newlines_are_removed() {
    assert_eq!(substitute_references("{a}\r\n/ {b}"), "`a`/ `b`");
}

#[test]
fn test_rank_rewrite() {
    insta::assert_snapshot!(
        preprocess("rank([sum({r}) DESC], [], PRE_FILTER)"),
        @"SELECT (RANK() OVER (ORDER BY SUM(`r`) DESC)) AS expr FROM DUAL"
    );
}

#[test]
fn test_dense_rank_with_partition() {
    insta::assert_snapshot!(
        preprocess("denseRank([{s} ASC], [region])"),
        @"SELECT (DENSERANK() OVER (PARTITION BY `region` ORDER BY `s` ASC)) AS expr FROM DUAL"
    );
}

#[test]
fn test_over_rewrite_drops_level() {
    insta::assert_snapshot!(
        preprocess("maxOver({f1}, [p], PRE_FILTER)"),
        @"SELECT (MAX_OVER(`f1`) OVER (PARTITION BY `p`)) AS expr FROM DUAL"
    );
}

#[test]
fn test_over_rewrite_with_empty_partitions() {
    insta::assert_snapshot!(
        preprocess("maxOver(sum({f1}), [])"),
        @"SELECT (MAX_OVER(SUM(`f1`)) OVER ()) AS expr FROM DUAL"
    );
}

#[test]
fn test_over_rewrite_with_quoted_partitions() {
    insta::assert_snapshot!(
        preprocess("sumOver(sum({sales}), [{region}, {year}], PRE_AGG)"),
        @"SELECT (SUM_OVER(SUM(`sales`)) OVER (PARTITION BY `region`, `year`)) AS expr FROM DUAL"
    );
}

#[test]
fn test_ifelse_chain_folds() {
    insta::assert_snapshot!(
        preprocess("ifelse({a} > 1, 'x', {a} > 0, 'y', 'z')"),
        @"SELECT (ifelse(`a` > 1, 'x', ifelse(`a` > 0, 'y', 'z'))) AS expr FROM DUAL"
    );
}

#[test]
fn test_ifelse_without_else_ends_in_null() {
    assert_eq!(
        rewrite_call("ifelse", "c1, t1, c2, t2"),
        "ifelse(c1, t1, ifelse(c2, t2, NULL))"
    );
}

#[test]
fn test_membership_keeps_column_only() {
    assert_eq!(rewrite_call("in", "`a`, [\"x\", \"y\"], true"), "IN(`a`)");
}

#[test]
fn test_pass_through_uses_canonical_name() {
    insta::assert_snapshot!(
        preprocess("toUpper({name})"),
        @"SELECT (TOUPPER(`name`)) AS expr FROM DUAL"
    );
}

#[test]
fn test_preprocess_is_deterministic() {
    let dsl = "sumOver(sum({sales}), [{region}], PRE_AGG) / ${target}";
    assert_eq!(preprocess(dsl), preprocess(dsl));
}
