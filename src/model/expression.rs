//! Expressions evaluated by a request.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sql::{self, NodeIds, SqlNode};
use crate::visitor::CostReport;

/// Role an expression plays in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpressionKind {
    Field,
    CalculatedField,
    Metric,
    ConditionalFormattingMetric,
    FilterExpression,
}

impl ExpressionKind {
    /// Kinds issued to the query engine when present in a request.
    pub fn is_query_input(self) -> bool {
        !matches!(self, ExpressionKind::CalculatedField)
    }

    pub fn is_metric(self) -> bool {
        matches!(
            self,
            ExpressionKind::Metric | ExpressionKind::ConditionalFormattingMetric
        )
    }
}

impl fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpressionKind::Field => "field",
            ExpressionKind::CalculatedField => "calculatedField",
            ExpressionKind::Metric => "metric",
            ExpressionKind::ConditionalFormattingMetric => "conditionalFormattingMetric",
            ExpressionKind::FilterExpression => "filterExpression",
        };
        f.write_str(name)
    }
}

/// Aggregation value marking a metric that is really a calculated field.
pub const CUSTOM_AGGREGATION: &str = "CUSTOM";

/// One expression with its analysis state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expression {
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_alias: Option<String>,
    pub kind: ExpressionKind,
    /// Raw DSL text.
    pub expression: String,
    /// Metric aggregation (`SUM`, `CUSTOM`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<SqlNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsing_error: Option<String>,
    #[serde(default)]
    pub is_parsed: bool,
    #[serde(default)]
    pub has_error: bool,

    #[serde(default)]
    pub cost: Option<u32>,
    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(default)]
    pub is_aggregation: bool,
    #[serde(default)]
    pub is_string_function: bool,

    #[serde(default)]
    pub used_in_query_gen: bool,
    /// Materialized dataset column; never parsed.
    #[serde(default)]
    pub pre_processed: bool,
    #[serde(default)]
    pub dataset_calculation: bool,
}

impl Expression {
    pub fn new(kind: ExpressionKind, alias: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            user_alias: None,
            kind,
            expression: expression.into(),
            aggregation: None,
            parsed: None,
            parsing_error: None,
            is_parsed: false,
            has_error: false,
            cost: None,
            max_depth: None,
            is_aggregation: false,
            is_string_function: false,
            used_in_query_gen: false,
            pre_processed: false,
            dataset_calculation: false,
        }
    }

    /// A field; its expression is the bare reference `{alias}`.
    pub fn field(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let expression = format!("{{{alias}}}");
        Self::new(ExpressionKind::Field, alias, expression)
    }

    pub fn calculated_field(alias: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(ExpressionKind::CalculatedField, alias, expression)
    }

    /// A metric. Without explicit text the expression is `AGG({alias})`.
    pub fn metric(
        kind: ExpressionKind,
        alias: impl Into<String>,
        aggregation: Option<String>,
        expression: Option<String>,
    ) -> Self {
        let alias = alias.into();
        let expression = expression.unwrap_or_else(|| match &aggregation {
            Some(agg) if !agg.eq_ignore_ascii_case(CUSTOM_AGGREGATION) => {
                format!("{agg}({{{alias}}})")
            }
            _ => format!("{{{alias}}}"),
        });
        let mut metric = Self::new(kind, alias, expression);
        metric.aggregation = aggregation;
        metric
    }

    pub fn filter(alias: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(ExpressionKind::FilterExpression, alias, expression)
    }

    /// Metric whose computation lives in the calculated field of the same alias.
    pub fn is_custom_metric(&self) -> bool {
        self.kind.is_metric()
            && self
                .aggregation
                .as_deref()
                .is_some_and(|agg| agg.eq_ignore_ascii_case(CUSTOM_AGGREGATION))
    }

    /// Display name, falling back to the alias.
    pub fn display_name(&self) -> &str {
        self.user_alias.as_deref().unwrap_or(&self.alias)
    }

    /// Preprocess and parse the DSL text, recording the outcome on `self`.
    ///
    /// A failure is logged and kept on the expression; it never propagates.
    pub fn parse_with(&mut self, ids: &mut NodeIds) -> bool {
        match sql::parse_expression_with(&self.expression, ids) {
            Ok(node) => {
                self.parsed = Some(node);
                self.is_parsed = true;
                self.has_error = false;
                self.parsing_error = None;
                true
            }
            Err(e) => {
                warn!(alias = %self.alias, kind = %self.kind, error = %e, "failed to parse expression");
                self.parsed = None;
                self.is_parsed = false;
                self.has_error = true;
                self.parsing_error = Some(e.to_string());
                false
            }
        }
    }

    /// Copy a visitor report onto the expression.
    pub fn apply_report(&mut self, report: &CostReport) {
        self.cost = Some(report.total_cost);
        self.max_depth = Some(report.max_depth);
        self.is_aggregation = report.is_aggregation;
        self.is_string_function = report.is_string_function;
    }
}
