//! Per-request input records.
//!
//! A [`RequestBundle`] is what the capture decoder hands over for one visual
//! request: identifiers, timing, error state and the raw DSL expressions
//! grouped by kind. Bundles deserialize from camelCase JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::expression::{Expression, ExpressionKind};

/// Whether a request belongs to a published dashboard or an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExplorationType {
    Dashboards,
    Analyses,
}

impl ExplorationType {
    /// Key of the hierarchy node grouping explorations of this type.
    pub fn key(self) -> &'static str {
        match self {
            ExplorationType::Dashboards => "Dashboards",
            ExplorationType::Analyses => "Analyses",
        }
    }
}

/// A named expression as captured, before analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawExpression {
    pub alias: String,
    pub expression: Option<String>,
    /// Metric aggregation (`SUM`, `CUSTOM`, ...).
    pub aggregation: Option<String>,
}

/// Calculated column defined on the dataset rather than the analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetCalculatedColumn {
    pub name: String,
    pub expression: String,
    pub aggregate: bool,
    pub analysis_only: bool,
}

impl DatasetCalculatedColumn {
    /// Row-level columns are materialized with the dataset.
    pub fn is_materialized(&self) -> bool {
        !self.aggregate && !self.analysis_only
    }
}

/// Request rendering options shown as badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Badges {
    pub totals: bool,
    pub computations_only: bool,
    pub hide_other_category: bool,
}

/// Human-readable names for the identifiers, when the capture had them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayNames {
    pub dashboard: Option<String>,
    pub analysis: Option<String>,
    pub sheet: Option<String>,
    pub visual: Option<String>,
    pub dataset: Option<String>,
    pub dataset_type: Option<String>,
}

/// Everything captured for one visual request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestBundle {
    pub request_id: String,
    pub dashboard_id: Option<String>,
    pub analysis_id: Option<String>,
    pub sheet_id: Option<String>,
    pub dataset_id: String,
    pub visual_id: Option<String>,
    pub visual_type: Option<String>,

    /// Epoch milliseconds.
    pub start_time: i64,
    /// Epoch milliseconds; absent when the request never completed.
    pub end_time: Option<i64>,

    pub error_code: Option<String>,
    pub error_message: Option<String>,

    pub fields: Vec<RawExpression>,
    pub calculated_fields: Vec<RawExpression>,
    pub metrics: Vec<RawExpression>,
    pub conditional_formatting_metrics: Vec<RawExpression>,
    pub filter_expressions: Vec<String>,
    pub dataset_calculated_columns: Vec<DatasetCalculatedColumn>,

    /// Parameter id → current value.
    pub parameters: BTreeMap<String, String>,
    /// Resolved filter definitions, passed through untouched.
    pub filters: Vec<serde_json::Value>,
    /// Alias → user-facing name overrides.
    pub user_aliases: BTreeMap<String, String>,

    pub badges: Badges,
    pub names: DisplayNames,
    pub origin: Option<String>,
    pub user_agent: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl RequestBundle {
    /// Exploration type and id. Dashboards win when both ids are present.
    pub fn exploration(&self) -> Option<(ExplorationType, &str)> {
        if let Some(id) = non_empty(&self.dashboard_id) {
            Some((ExplorationType::Dashboards, id))
        } else {
            non_empty(&self.analysis_id).map(|id| (ExplorationType::Analyses, id))
        }
    }

    pub fn sheet(&self) -> Option<&str> {
        non_empty(&self.sheet_id)
    }

    pub fn visual(&self) -> Option<&str> {
        non_empty(&self.visual_id)
    }

    /// Duration in seconds, `None` when the request has no end time.
    pub fn duration_secs(&self) -> Option<f64> {
        self.end_time
            .map(|end| end.saturating_sub(self.start_time).max(0) as f64 / 1000.0)
    }

    /// All expressions of the request, in analysis order: calculated fields,
    /// filters, dataset calculated columns, conditional-formatting metrics,
    /// fields, metrics.
    pub fn expressions(&self) -> Vec<Expression> {
        let mut expressions = Vec::new();

        for raw in &self.calculated_fields {
            let text = raw.expression.clone().unwrap_or_default();
            expressions.push(Expression::calculated_field(&raw.alias, text));
        }

        for (i, text) in self.filter_expressions.iter().enumerate() {
            expressions.push(Expression::filter(format!("Filter {}", i + 1), text));
        }

        for column in &self.dataset_calculated_columns {
            let mut expr = Expression::calculated_field(&column.name, &column.expression);
            expr.dataset_calculation = true;
            expr.pre_processed = column.is_materialized();
            expressions.push(expr);
        }

        for raw in &self.conditional_formatting_metrics {
            expressions.push(Expression::metric(
                ExpressionKind::ConditionalFormattingMetric,
                &raw.alias,
                raw.aggregation.clone(),
                raw.expression.clone(),
            ));
        }

        for raw in &self.fields {
            let expr = match &raw.expression {
                Some(text) => Expression::new(ExpressionKind::Field, &raw.alias, text),
                None => Expression::field(&raw.alias),
            };
            expressions.push(expr);
        }

        for raw in &self.metrics {
            expressions.push(Expression::metric(
                ExpressionKind::Metric,
                &raw.alias,
                raw.aggregation.clone(),
                raw.expression.clone(),
            ));
        }

        for expr in &mut expressions {
            expr.user_alias = self.user_aliases.get(&expr.alias).cloned();
        }

        expressions
    }
}
