//! Cost, depth and dependency visitor.
//!
//! Walks one expression's AST and accumulates:
//! - the summed catalog cost of every function and aggregate call,
//! - the maximum nesting level reached (functions, aggregates and `ORDER BY`
//!   entries each open a level, calculated-field references open one too),
//! - aggregation / string-function classification,
//! - the ordered list of resolved dependencies.
//!
//! Column references are resolved against the request's parameter map and
//! expression set. A reference to a calculated field descends into that
//! field's AST, so chains of calculated fields unroll into one dependency list.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{walk_function_call, SqlVisitor};
use crate::catalog::{self, DocLinkResolver, FunctionCategory, NoDocLinks};
use crate::model::{Expression, ExpressionKind};
use crate::sql::{ColumnRef, FunctionCall, NodeId, NodeKind, OrderByItem, SqlNode, WindowSpec};

static NO_DOC_LINKS: NoDocLinks = NoDocLinks;

// =============================================================================
// Output types
// =============================================================================

/// What a dependency record resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
    Function,
    #[serde(rename = "aggr_func")]
    AggrFunc,
    Parameter,
    Field,
    CalculatedField,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DependencyKind::Function => "function",
            DependencyKind::AggrFunc => "aggr_func",
            DependencyKind::Parameter => "parameter",
            DependencyKind::Field => "field",
            DependencyKind::CalculatedField => "calculatedField",
        };
        f.write_str(name)
    }
}

/// A resolved reference found while visiting an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub alias: String,
    pub kind: DependencyKind,
    /// Parameter value or referenced expression text; empty for functions.
    pub expression: String,
    pub cost: u32,
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_link: Option<String>,
}

/// Whether repeated references are recorded on every occurrence or once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyMode {
    /// Every occurrence produces a record.
    #[default]
    Exhaustive,
    /// Function nodes are recorded once per node id, column references once
    /// per alias.
    Deduplicated,
}

/// Result of visiting one expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostReport {
    pub total_cost: u32,
    pub max_depth: u32,
    pub is_aggregation: bool,
    pub is_string_function: bool,
    pub dependencies: Vec<Dependency>,
}

// =============================================================================
// Visitor
// =============================================================================

pub struct CostVisitor<'a> {
    expressions: &'a [Expression],
    parameters: &'a BTreeMap<String, String>,
    doc_links: &'a dyn DocLinkResolver,
    mode: DependencyMode,

    total_cost: u32,
    current_level: u32,
    max_depth: u32,
    is_aggregation: bool,
    is_string_function: bool,
    dependencies: Vec<Dependency>,

    seen_nodes: HashSet<NodeId>,
    seen_aliases: HashSet<String>,
    /// Calculated fields currently being descended into.
    resolving: Vec<String>,
}

impl<'a> CostVisitor<'a> {
    pub fn new(expressions: &'a [Expression], parameters: &'a BTreeMap<String, String>) -> Self {
        Self {
            expressions,
            parameters,
            doc_links: &NO_DOC_LINKS,
            mode: DependencyMode::default(),
            total_cost: 0,
            current_level: 0,
            max_depth: 0,
            is_aggregation: false,
            is_string_function: false,
            dependencies: Vec::new(),
            seen_nodes: HashSet::new(),
            seen_aliases: HashSet::new(),
            resolving: Vec::new(),
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

    /// Visit `root` as the expression named `alias`. The alias is put on the
    /// resolution stack so a self-reference is not descended into.
    pub fn analyze(mut self, alias: Option<&str>, root: &SqlNode) -> CostReport {
        if let Some(alias) = alias {
            self.resolving.push(alias.to_string());
        }
        self.visit(root);
        self.finish()
    }

    pub fn finish(self) -> CostReport {
        CostReport {
            total_cost: self.total_cost,
            max_depth: self.max_depth,
            is_aggregation: self.is_aggregation,
            is_string_function: self.is_string_function,
            dependencies: self.dependencies,
        }
    }

    fn enter(&mut self) {
        self.current_level += 1;
        self.max_depth = self.max_depth.max(self.current_level);
    }

    fn leave(&mut self) {
        self.current_level = self.current_level.saturating_sub(1);
    }

    fn visit_call(&mut self, id: NodeId, call: &FunctionCall, kind: DependencyKind) {
        let info = catalog::lookup(&call.name);
        self.total_cost += info.cost;

        if info.category == Some(FunctionCategory::String) {
            self.is_string_function = true;
        }
        if kind == DependencyKind::AggrFunc || is_windowed_aggregate(&call.name, info.category) {
            self.is_aggregation = true;
        }

        debug!(
            function = %call.name,
            cost = info.cost,
            level = self.current_level,
            "visited function"
        );
        self.record_function(id, &call.name, kind, info.cost);

        self.enter();
        walk_function_call(self, call);
        self.leave();
    }

    fn record_function(&mut self, id: NodeId, name: &str, kind: DependencyKind, cost: u32) {
        if self.mode == DependencyMode::Deduplicated && !self.seen_nodes.insert(id) {
            return;
        }
        self.dependencies.push(Dependency {
            alias: name.to_string(),
            kind,
            expression: String::new(),
            cost,
            level: self.current_level,
            doc_link: self.doc_links.doc_link(name),
        });
    }

    /// Resolve a column reference: parameter, then calculated field, then
    /// field, then unknown. With `descend`, calculated fields are visited.
    fn resolve_reference(&mut self, alias: &str, descend: bool) {
        if self.mode == DependencyMode::Deduplicated && !self.seen_aliases.insert(alias.to_string())
        {
            return;
        }

        let parameters = self.parameters;
        if let Some(value) = parameters.get(alias) {
            debug!(alias, level = self.current_level, "resolved parameter");
            self.push_reference(alias, DependencyKind::Parameter, value.clone(), 0);
            return;
        }

        let expressions = self.expressions;

        if let Some(calculated) = find_expression(expressions, alias, ExpressionKind::CalculatedField)
        {
            debug!(alias, level = self.current_level, "resolved calculated field");
            self.push_reference(
                alias,
                DependencyKind::CalculatedField,
                calculated.expression.clone(),
                calculated.cost.unwrap_or(0),
            );

            let Some(parsed) = calculated.parsed.as_ref().filter(|_| descend) else {
                return;
            };
            if self.resolving.iter().any(|a| a == alias) {
                warn!(alias, "calculated field references itself; not descending");
                return;
            }
            self.resolving.push(alias.to_string());
            self.enter();
            self.visit(parsed);
            self.leave();
            self.resolving.pop();
            return;
        }

        if let Some(field) = find_expression(expressions, alias, ExpressionKind::Field) {
            debug!(alias, level = self.current_level, "resolved field");
            self.push_reference(
                alias,
                DependencyKind::Field,
                field.expression.clone(),
                field.cost.unwrap_or(0),
            );
            return;
        }

        debug!(alias, "unknown reference");
        self.push_reference(alias, DependencyKind::Field, String::new(), 0);
    }

    fn push_reference(&mut self, alias: &str, kind: DependencyKind, expression: String, cost: u32) {
        self.dependencies.push(Dependency {
            alias: alias.to_string(),
            kind,
            expression,
            cost,
            level: self.current_level,
            doc_link: None,
        });
    }

    /// Extra extraction for a window entry: record what it is without
    /// descending again.
    fn record_window_entry(&mut self, node: &SqlNode) {
        match &node.kind {
            NodeKind::Function(call) => {
                let cost = catalog::lookup(&call.name).cost;
                self.record_function(node.id, &call.name, DependencyKind::Function, cost);
            }
            NodeKind::AggrFunc(call) => {
                let cost = catalog::lookup(&call.name).cost;
                self.record_function(node.id, &call.name, DependencyKind::AggrFunc, cost);
            }
            NodeKind::ColumnRef(column) => self.resolve_reference(&column.alias(), false),
            _ => {}
        }
    }
}

/// Windowed aggregate: an aggregate or table calculation whose name ends in
/// `over` or starts with `window`/`running`.
fn is_windowed_aggregate(name: &str, category: Option<FunctionCategory>) -> bool {
    let windowed_category = matches!(
        category,
        Some(FunctionCategory::Aggregate | FunctionCategory::TableCalculation)
    );
    let lower = name.to_ascii_lowercase();
    windowed_category
        && (lower.ends_with("over") || lower.starts_with("window") || lower.starts_with("running"))
}

fn find_expression<'e>(
    expressions: &'e [Expression],
    alias: &str,
    kind: ExpressionKind,
) -> Option<&'e Expression> {
    expressions
        .iter()
        .find(|e| e.kind == kind && e.alias == alias)
}

impl SqlVisitor for CostVisitor<'_> {
    fn visit_function(&mut self, id: NodeId, call: &FunctionCall) {
        self.visit_call(id, call, DependencyKind::Function);
    }

    fn visit_aggr_func(&mut self, id: NodeId, call: &FunctionCall) {
        self.visit_call(id, call, DependencyKind::AggrFunc);
    }

    fn visit_column_ref(&mut self, _id: NodeId, column: &ColumnRef) {
        self.resolve_reference(&column.alias(), true);
    }

    fn visit_order_by(&mut self, item: &OrderByItem) {
        self.enter();
        self.visit(&item.expr);
        self.leave();
    }

    fn visit_window(&mut self, window: &WindowSpec) {
        for item in &window.order_by {
            self.visit_order_by(item);
            self.record_window_entry(&item.expr);
        }
        for partition in &window.partition_by {
            self.visit(partition);
            self.record_window_entry(partition);
        }
        if let Some(frame) = &window.frame {
            self.visit_window_frame(frame);
        }
    }
}
