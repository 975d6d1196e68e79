//! AST visitor framework.
//!
//! [`SqlVisitor`] has one method per node kind. The defaults recurse through
//! the matching `walk_*` function, so an implementation overrides only the
//! kinds it cares about and calls the walker to keep descending:
//!
//! ```ignore
//! impl SqlVisitor for Counter {
//!     fn visit_function(&mut self, id: NodeId, call: &FunctionCall) {
//!         self.calls += 1;
//!         walk_function_call(self, call);
//!     }
//! }
//! ```
//!
//! Leaf kinds are no-ops by default. The AST enum is exhaustive, so there is
//! no "unknown kind" case at this level; unsupported parser output is
//! rejected when the AST is built.

mod cost;

pub use cost::{CostReport, CostVisitor, Dependency, DependencyKind, DependencyMode};

use crate::sql::{
    BinaryExpr, CaseExpr, ColumnRef, FunctionCall, NodeId, NodeKind, OrderByItem,
    SqlNode, UnaryExpr, WindowFrame, WindowSpec,
};

pub trait SqlVisitor {
    /// Entry point: dispatch on the node kind.
    fn visit(&mut self, node: &SqlNode) {
        walk_node(self, node);
    }

    fn visit_binary_expr(&mut self, _id: NodeId, expr: &BinaryExpr) {
        walk_binary_expr(self, expr);
    }

    fn visit_unary_expr(&mut self, _id: NodeId, expr: &UnaryExpr) {
        self.visit(&expr.expr);
    }

    fn visit_aggr_func(&mut self, _id: NodeId, call: &FunctionCall) {
        walk_function_call(self, call);
    }

    fn visit_function(&mut self, _id: NodeId, call: &FunctionCall) {
        walk_function_call(self, call);
    }

    fn visit_case(&mut self, _id: NodeId, case: &CaseExpr) {
        walk_case(self, case);
    }

    fn visit_expr_list(&mut self, _id: NodeId, items: &[SqlNode]) {
        for item in items {
            self.visit(item);
        }
    }

    fn visit_window(&mut self, window: &WindowSpec) {
        walk_window(self, window);
    }

    fn visit_order_by(&mut self, item: &OrderByItem) {
        self.visit(&item.expr);
    }

    fn visit_window_frame(&mut self, frame: &WindowFrame) {
        walk_window_frame(self, frame);
    }

    fn visit_column_ref(&mut self, _id: NodeId, _column: &ColumnRef) {}

    fn visit_number(&mut self, _id: NodeId, _value: &str) {}

    fn visit_string(&mut self, _id: NodeId, _value: &str) {}

    fn visit_bool(&mut self, _id: NodeId, _value: bool) {}

    fn visit_null(&mut self, _id: NodeId) {}

    fn visit_star(&mut self, _id: NodeId) {}
}

/// Route a node to the visitor method for its kind.
pub fn walk_node<V: SqlVisitor + ?Sized>(visitor: &mut V, node: &SqlNode) {
    let id = node.id;
    match &node.kind {
        NodeKind::BinaryExpr(expr) => visitor.visit_binary_expr(id, expr),
        NodeKind::UnaryExpr(expr) => visitor.visit_unary_expr(id, expr),
        NodeKind::AggrFunc(call) => visitor.visit_aggr_func(id, call),
        NodeKind::Function(call) => visitor.visit_function(id, call),
        NodeKind::Case(case) => visitor.visit_case(id, case),
        NodeKind::ExprList { items } => visitor.visit_expr_list(id, items),
        NodeKind::ColumnRef(column) => visitor.visit_column_ref(id, column),
        NodeKind::Number { value } => visitor.visit_number(id, value),
        NodeKind::Str { value } => visitor.visit_string(id, value),
        NodeKind::Bool { value } => visitor.visit_bool(id, *value),
        NodeKind::Null => visitor.visit_null(id),
        NodeKind::Star => visitor.visit_star(id),
    }
}

pub fn walk_binary_expr<V: SqlVisitor + ?Sized>(visitor: &mut V, expr: &BinaryExpr) {
    visitor.visit(&expr.left);
    visitor.visit(&expr.right);
}

/// Arguments first, then the window clause.
pub fn walk_function_call<V: SqlVisitor + ?Sized>(visitor: &mut V, call: &FunctionCall) {
    for arg in &call.args {
        visitor.visit(arg);
    }
    if let Some(window) = &call.over {
        visitor.visit_window(window);
    }
}

pub fn walk_case<V: SqlVisitor + ?Sized>(visitor: &mut V, case: &CaseExpr) {
    if let Some(operand) = &case.operand {
        visitor.visit(operand);
    }
    for clause in &case.when_clauses {
        visitor.visit(&clause.condition);
        visitor.visit(&clause.result);
    }
    if let Some(else_result) = &case.else_result {
        visitor.visit(else_result);
    }
}

/// `ORDER BY` entries, then `PARTITION BY` entries, then the frame.
pub fn walk_window<V: SqlVisitor + ?Sized>(visitor: &mut V, window: &WindowSpec) {
    for item in &window.order_by {
        visitor.visit_order_by(item);
    }
    for partition in &window.partition_by {
        visitor.visit(partition);
    }
    if let Some(frame) = &window.frame {
        visitor.visit_window_frame(frame);
    }
}

pub fn walk_window_frame<V: SqlVisitor + ?Sized>(visitor: &mut V, frame: &WindowFrame) {
    for bound in std::iter::once(&frame.start).chain(frame.end.as_ref()) {
        if let Some(offset) = bound.offset() {
            visitor.visit(offset);
        }
    }
}

/// Collects every column reference in an expression, in visit order.
#[derive(Debug, Default)]
pub struct ColumnCollector {
    pub columns: Vec<String>,
}

impl ColumnCollector {
    pub fn collect(node: &SqlNode) -> Vec<String> {
        let mut collector = Self::default();
        collector.visit(node);
        collector.columns
    }
}

impl SqlVisitor for ColumnCollector {
    fn visit_column_ref(&mut self, _id: NodeId, column: &ColumnRef) {
        self.columns.push(column.alias());
    }
}
