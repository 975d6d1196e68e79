//! Expression AST produced by the parser adapter.
//!
//! Only the subset of SQL the preprocessor emits is represented. Every node
//! carries a [`NodeId`] handed out by a [`NodeIds`] allocator in pre-order.

use serde::{Deserialize, Serialize};

// =============================================================================
// Node identity
// =============================================================================

/// Opaque node identifier, unique within one allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Monotonic allocator for [`NodeId`]s.
///
/// Share one allocator across parses when ids must be unique across
/// expressions (the hierarchy builder does this per build).
#[derive(Debug, Default)]
pub struct NodeIds {
    next: u32,
}

impl NodeIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next
    }
}

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    BinaryExpr(BinaryExpr),
    UnaryExpr(UnaryExpr),
    /// Plain SQL aggregate (`SUM`, `COUNT`, ...).
    AggrFunc(FunctionCall),
    Function(FunctionCall),
    ColumnRef(ColumnRef),
    Number { value: String },
    #[serde(rename = "string")]
    Str { value: String },
    Bool { value: bool },
    Null,
    /// `*` in `COUNT(*)`.
    Star,
    ExprList { items: Vec<SqlNode> },
    Case(CaseExpr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub operator: String,
    pub left: Box<SqlNode>,
    pub right: Box<SqlNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub operator: String,
    pub expr: Box<SqlNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Plain function name as written, qualifiers already stripped.
    pub name: String,
    pub args: Vec<SqlNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over: Option<WindowSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    /// Alias used to resolve the reference against the expression set.
    ///
    /// Backtick-quoted DSL references such as `` `dataset.col` `` arrive as a
    /// single identifier; unquoted dotted names are joined back together.
    pub fn alias(&self) -> String {
        match &self.table {
            Some(table) => format!("{}.{}", table, self.column),
            None => self.column.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseExpr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<Box<SqlNode>>,
    pub when_clauses: Vec<WhenClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_result: Option<Box<SqlNode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenClause {
    pub condition: SqlNode,
    pub result: SqlNode,
}

// =============================================================================
// Window clause
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub order_by: Vec<OrderByItem>,
    pub partition_by: Vec<SqlNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<WindowFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub id: NodeId,
    pub expr: SqlNode,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFrame {
    /// `ROWS`, `RANGE` or `GROUPS`.
    pub units: String,
    pub start: FrameBound,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<FrameBound>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "bound", content = "offset", rename_all = "snake_case")]
pub enum FrameBound {
    CurrentRow,
    /// `None` is `UNBOUNDED PRECEDING`.
    Preceding(Option<Box<SqlNode>>),
    /// `None` is `UNBOUNDED FOLLOWING`.
    Following(Option<Box<SqlNode>>),
}

impl FrameBound {
    pub fn offset(&self) -> Option<&SqlNode> {
        match self {
            FrameBound::CurrentRow => None,
            FrameBound::Preceding(offset) | FrameBound::Following(offset) => offset.as_deref(),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

impl SqlNode {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self { id, kind }
    }

    /// Node kind as a snake_case tag (`binary_expr`, `function`, ...).
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::BinaryExpr(_) => "binary_expr",
            NodeKind::UnaryExpr(_) => "unary_expr",
            NodeKind::AggrFunc(_) => "aggr_func",
            NodeKind::Function(_) => "function",
            NodeKind::ColumnRef(_) => "column_ref",
            NodeKind::Number { .. } => "number",
            NodeKind::Str { .. } => "string",
            NodeKind::Bool { .. } => "bool",
            NodeKind::Null => "null",
            NodeKind::Star => "star",
            NodeKind::ExprList { .. } => "expr_list",
            NodeKind::Case(_) => "case",
        }
    }

    /// The call, for `function` and `aggr_func` nodes.
    pub fn as_call(&self) -> Option<&FunctionCall> {
        match &self.kind {
            NodeKind::AggrFunc(call) | NodeKind::Function(call) => Some(call),
            _ => None,
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        self.as_call().map(|call| call.name.as_str())
    }

    pub fn as_column_ref(&self) -> Option<&ColumnRef> {
        match &self.kind {
            NodeKind::ColumnRef(column) => Some(column),
            _ => None,
        }
    }
}
