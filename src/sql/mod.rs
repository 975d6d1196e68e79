//! Parser adapter.
//!
//! Hosts preprocessed DSL in a standard SQL parser and converts the result
//! into the analyzer's own expression AST.

pub mod ast;
mod error;
mod parser;

pub use ast::{
    BinaryExpr, CaseExpr, ColumnRef, FrameBound, FunctionCall, NodeId, NodeIds, NodeKind,
    OrderByItem, SortDirection, SqlNode, UnaryExpr, WhenClause, WindowFrame, WindowSpec,
};
pub use error::{ParseError, ParseResult};
pub use parser::{parse, parse_with};

use crate::dsl;

/// Preprocess a DSL expression and parse it with a fresh id allocator.
pub fn parse_expression(dsl_text: &str) -> ParseResult<SqlNode> {
    parse_expression_with(dsl_text, &mut NodeIds::new())
}

/// Preprocess a DSL expression and parse it, drawing node ids from `ids`.
pub fn parse_expression_with(dsl_text: &str, ids: &mut NodeIds) -> ParseResult<SqlNode> {
    parse_with(&dsl::preprocess(dsl_text), ids)
}
