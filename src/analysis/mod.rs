//! Per-expression analysis.
//!
//! [`AnalysisContext`] bundles what the cost visitor resolves references
//! against (the request's expressions and parameters) with the output options
//! (documentation links, dependency mode).

mod chain;
mod graph;

pub use chain::dependency_chain;
pub use graph::ReferenceGraph;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{DocLinkResolver, NoDocLinks};
use crate::dsl;
use crate::model::{Expression, ExpressionKind};
use crate::sql::{self, NodeIds, ParseResult, SqlNode};
use crate::visitor::{CostReport, CostVisitor, DependencyMode};

static NO_DOC_LINKS: NoDocLinks = NoDocLinks;

/// Reference scope and options for analyzing expressions of one request.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub expressions: &'a [Expression],
    pub parameters: &'a BTreeMap<String, String>,
    pub doc_links: &'a dyn DocLinkResolver,
    pub mode: DependencyMode,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(expressions: &'a [Expression], parameters: &'a BTreeMap<String, String>) -> Self {
        Self {
            expressions,
            parameters,
            doc_links: &NO_DOC_LINKS,
            mode: DependencyMode::default(),
        }
    }

    pub fn with_doc_links(mut self, doc_links: &'a dyn DocLinkResolver) -> Self {
        self.doc_links = doc_links;
        self
    }

    pub fn with_mode(mut self, mode: DependencyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn visitor(&self) -> CostVisitor<'a> {
        CostVisitor::new(self.expressions, self.parameters)
            .with_doc_links(self.doc_links)
            .with_mode(self.mode)
    }

    /// Visit a parsed expression. `None` when it has no AST.
    ///
    /// Only a calculated field guards its own alias; a metric or filter
    /// named after a calculated field descends into it.
    pub fn analyze(&self, expression: &Expression) -> Option<CostReport> {
        let parsed = expression.parsed.as_ref()?;
        let own_alias = (expression.kind == ExpressionKind::CalculatedField)
            .then_some(expression.alias.as_str());
        Some(self.visitor().analyze(own_alias, parsed))
    }
}

/// A standalone DSL expression taken through the whole pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionAnalysis {
    pub sql: String,
    pub ast: SqlNode,
    #[serde(flatten)]
    pub report: CostReport,
}

/// Preprocess, parse and cost one expression with no surrounding request.
/// Every column reference resolves as an unknown field.
pub fn analyze_expression(
    dsl_text: &str,
    doc_links: &dyn DocLinkResolver,
) -> ParseResult<ExpressionAnalysis> {
    let sql_text = dsl::preprocess(dsl_text);
    let ast = sql::parse_with(&sql_text, &mut NodeIds::new())?;
    let parameters = BTreeMap::new();
    let report = AnalysisContext::new(&[], &parameters)
        .with_doc_links(doc_links)
        .visitor()
        .analyze(None, &ast);
    Ok(ExpressionAnalysis {
        sql: sql_text,
        ast,
        report,
    })
}
