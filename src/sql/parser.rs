//! Adapter from `sqlparser` to the expression AST.
//!
//! Parses `SELECT (<expr>) AS expr FROM DUAL` with the MySQL dialect (backtick
//! identifiers, double-quoted strings, `^`) and converts column 0 into a
//! [`SqlNode`] tree. Function names are canonicalized during conversion: a
//! qualified name keeps only its first identifier, so downstream code only
//! ever sees plain strings.

use sqlparser::ast::{
    self as sql, Expr as SqlExpr, FunctionArg, FunctionArgExpr, FunctionArguments,
    Value as SqlValue, WindowFrameBound, WindowType,
};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use super::ast::{
    BinaryExpr, CaseExpr, ColumnRef, FrameBound, FunctionCall, NodeIds, NodeKind, OrderByItem,
    SortDirection, SqlNode, UnaryExpr, WhenClause, WindowFrame, WindowSpec,
};
use super::error::{ParseError, ParseResult};

/// Functions the SQL grammar treats as aggregates. Everything else, including
/// every vendor function, is a plain `function` node.
const SQL_AGGREGATES: &[&str] = &[
    "AVG",
    "COUNT",
    "GROUP_CONCAT",
    "MAX",
    "MIN",
    "STD",
    "STDDEV",
    "SUM",
    "VARIANCE",
];

/// Parse generic SQL with a fresh id allocator.
pub fn parse(sql: &str) -> ParseResult<SqlNode> {
    parse_with(sql, &mut NodeIds::new())
}

/// Parse generic SQL, drawing node ids from `ids`.
pub fn parse_with(sql: &str, ids: &mut NodeIds) -> ParseResult<SqlNode> {
    let statements =
        Parser::parse_sql(&MySqlDialect {}, sql).map_err(|e| ParseError::SqlSyntax {
            sql: sql.to_string(),
            message: e.to_string(),
        })?;

    let structure = |reason: &str| ParseError::UnexpectedStructure {
        sql: sql.to_string(),
        reason: reason.to_string(),
    };

    let [statement] = statements.as_slice() else {
        return Err(structure("expected exactly one statement"));
    };

    let sql::Statement::Query(query) = statement else {
        return Err(structure("expected a SELECT statement"));
    };

    let sql::SetExpr::Select(select) = query.body.as_ref() else {
        return Err(structure("expected a plain SELECT"));
    };

    if !selects_from_dual(select) {
        return Err(structure("expected FROM DUAL"));
    }

    let expr = match select.projection.as_slice() {
        [sql::SelectItem::UnnamedExpr(expr)] | [sql::SelectItem::ExprWithAlias { expr, .. }] => {
            expr
        }
        [_] => return Err(structure("column 0 is not an expression")),
        _ => return Err(structure("expected a single column")),
    };

    let node = Converter { sql, ids }.convert(expr)?;
    debug!(sql, root = node.type_name(), "parsed expression");
    Ok(node)
}

fn selects_from_dual(select: &sql::Select) -> bool {
    match select.from.as_slice() {
        [from] if from.joins.is_empty() => match &from.relation {
            sql::TableFactor::Table { name, .. } => name
                .0
                .last()
                .is_some_and(|ident| ident.value.eq_ignore_ascii_case("DUAL")),
            _ => false,
        },
        _ => false,
    }
}

/// First identifier of a possibly qualified function name.
fn canonical_function_name(name: &sql::ObjectName) -> String {
    name.0
        .first()
        .map(|ident| ident.value.clone())
        .unwrap_or_else(|| name.to_string())
}

/// Leading variant name of a sqlparser expression, for error reporting.
fn expr_kind(expr: &SqlExpr) -> String {
    let debug = format!("{expr:?}");
    debug
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default()
        .to_string()
}

struct Converter<'a> {
    sql: &'a str,
    ids: &'a mut NodeIds,
}

impl Converter<'_> {
    fn node(&mut self, kind: NodeKind) -> SqlNode {
        SqlNode::new(self.ids.next_id(), kind)
    }

    fn unknown(&self, kind: impl Into<String>) -> ParseError {
        ParseError::UnknownAstNode {
            kind: kind.into(),
            sql: self.sql.to_string(),
        }
    }

    fn boxed(&mut self, expr: &SqlExpr) -> ParseResult<Box<SqlNode>> {
        self.convert(expr).map(Box::new)
    }

    fn convert(&mut self, expr: &SqlExpr) -> ParseResult<SqlNode> {
        match expr {
            SqlExpr::Nested(inner) => self.convert(inner),

            SqlExpr::Identifier(ident) => Ok(self.node(NodeKind::ColumnRef(ColumnRef {
                table: None,
                column: ident.value.clone(),
            }))),

            SqlExpr::CompoundIdentifier(idents) => {
                let (column, qualifiers) = match idents.split_last() {
                    Some(parts) => parts,
                    None => return Err(self.unknown("CompoundIdentifier")),
                };
                let table = if qualifiers.is_empty() {
                    None
                } else {
                    Some(
                        qualifiers
                            .iter()
                            .map(|ident| ident.value.as_str())
                            .collect::<Vec<_>>()
                            .join("."),
                    )
                };
                Ok(self.node(NodeKind::ColumnRef(ColumnRef {
                    table,
                    column: column.value.clone(),
                })))
            }

            SqlExpr::Value(value) => self.convert_value(value),

            SqlExpr::BinaryOp { left, op, right } => {
                let id = self.ids.next_id();
                let left = self.boxed(left)?;
                let right = self.boxed(right)?;
                Ok(SqlNode::new(
                    id,
                    NodeKind::BinaryExpr(BinaryExpr {
                        operator: op.to_string(),
                        left,
                        right,
                    }),
                ))
            }

            SqlExpr::UnaryOp { op, expr } => self.unary(op.to_string(), expr),
            SqlExpr::IsNull(expr) => self.unary("IS NULL".to_string(), expr),
            SqlExpr::IsNotNull(expr) => self.unary("IS NOT NULL".to_string(), expr),

            SqlExpr::Like {
                negated,
                expr,
                pattern,
                ..
            } => {
                let operator = if *negated { "NOT LIKE" } else { "LIKE" };
                self.binary(operator, expr, pattern)
            }

            SqlExpr::InList {
                expr,
                list,
                negated,
            } => {
                let id = self.ids.next_id();
                let left = self.boxed(expr)?;
                let right = Box::new(self.expr_list(list)?);
                let operator = if *negated { "NOT IN" } else { "IN" };
                Ok(SqlNode::new(
                    id,
                    NodeKind::BinaryExpr(BinaryExpr {
                        operator: operator.to_string(),
                        left,
                        right,
                    }),
                ))
            }

            SqlExpr::Between {
                expr,
                negated,
                low,
                high,
            } => {
                let id = self.ids.next_id();
                let left = self.boxed(expr)?;
                let bounds = [low.as_ref().clone(), high.as_ref().clone()];
                let right = Box::new(self.expr_list(&bounds)?);
                let operator = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                Ok(SqlNode::new(
                    id,
                    NodeKind::BinaryExpr(BinaryExpr {
                        operator: operator.to_string(),
                        left,
                        right,
                    }),
                ))
            }

            SqlExpr::Tuple(items) => self.expr_list(items),

            SqlExpr::Function(func) => self.convert_function(func),

            // Keyword-syntax builtins become ordinary calls.
            SqlExpr::Trim { expr, .. } => self.builtin("TRIM", &[expr.as_ref()]),
            SqlExpr::Ceil { expr, .. } => self.builtin("CEIL", &[expr.as_ref()]),
            SqlExpr::Floor { expr, .. } => self.builtin("FLOOR", &[expr.as_ref()]),
            SqlExpr::Substring {
                expr,
                substring_from,
                substring_for,
                ..
            } => {
                let mut args = vec![expr.as_ref()];
                args.extend(substring_from.as_deref());
                args.extend(substring_for.as_deref());
                self.builtin("SUBSTRING", &args)
            }

            SqlExpr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                let id = self.ids.next_id();
                let operand = operand.as_deref().map(|e| self.boxed(e)).transpose()?;
                let when_clauses = conditions
                    .iter()
                    .zip(results)
                    .map(|(condition, result)| {
                        Ok(WhenClause {
                            condition: self.convert(condition)?,
                            result: self.convert(result)?,
                        })
                    })
                    .collect::<ParseResult<Vec<_>>>()?;
                let else_result = else_result.as_deref().map(|e| self.boxed(e)).transpose()?;
                Ok(SqlNode::new(
                    id,
                    NodeKind::Case(CaseExpr {
                        operand,
                        when_clauses,
                        else_result,
                    }),
                ))
            }

            other => Err(self.unknown(expr_kind(other))),
        }
    }

    fn convert_value(&mut self, value: &SqlValue) -> ParseResult<SqlNode> {
        let kind = match value {
            SqlValue::Number(n, _) => NodeKind::Number { value: n.to_string() },
            SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
                NodeKind::Str { value: s.clone() }
            }
            SqlValue::Boolean(b) => NodeKind::Bool { value: *b },
            SqlValue::Null => NodeKind::Null,
            other => return Err(self.unknown(format!("Value::{other}"))),
        };
        Ok(self.node(kind))
    }

    fn unary(&mut self, operator: String, expr: &SqlExpr) -> ParseResult<SqlNode> {
        let id = self.ids.next_id();
        let expr = self.boxed(expr)?;
        Ok(SqlNode::new(
            id,
            NodeKind::UnaryExpr(UnaryExpr { operator, expr }),
        ))
    }

    fn binary(&mut self, operator: &str, left: &SqlExpr, right: &SqlExpr) -> ParseResult<SqlNode> {
        let id = self.ids.next_id();
        let left = self.boxed(left)?;
        let right = self.boxed(right)?;
        Ok(SqlNode::new(
            id,
            NodeKind::BinaryExpr(BinaryExpr {
                operator: operator.to_string(),
                left,
                right,
            }),
        ))
    }

    fn expr_list(&mut self, exprs: &[SqlExpr]) -> ParseResult<SqlNode> {
        let id = self.ids.next_id();
        let items = exprs
            .iter()
            .map(|e| self.convert(e))
            .collect::<ParseResult<Vec<_>>>()?;
        Ok(SqlNode::new(id, NodeKind::ExprList { items }))
    }

    fn builtin(&mut self, name: &str, args: &[&SqlExpr]) -> ParseResult<SqlNode> {
        let id = self.ids.next_id();
        let args = args
            .iter()
            .map(|e| self.convert(e))
            .collect::<ParseResult<Vec<_>>>()?;
        Ok(SqlNode::new(
            id,
            NodeKind::Function(FunctionCall {
                name: name.to_string(),
                args,
                over: None,
            }),
        ))
    }

    fn convert_function(&mut self, func: &sql::Function) -> ParseResult<SqlNode> {
        let id = self.ids.next_id();
        let name = canonical_function_name(&func.name);

        let args = match &func.args {
            FunctionArguments::None => Vec::new(),
            FunctionArguments::List(list) => list
                .args
                .iter()
                .map(|arg| self.convert_function_arg(arg))
                .collect::<ParseResult<Vec<_>>>()?,
            FunctionArguments::Subquery(_) => return Err(self.unknown("Subquery")),
        };

        let over = match &func.over {
            None => None,
            Some(WindowType::WindowSpec(spec)) => Some(self.convert_window(spec)?),
            Some(WindowType::NamedWindow(_)) => return Err(self.unknown("NamedWindow")),
        };

        let call = FunctionCall { name, args, over };
        let kind = if SQL_AGGREGATES
            .iter()
            .any(|agg| agg.eq_ignore_ascii_case(&call.name))
        {
            NodeKind::AggrFunc(call)
        } else {
            NodeKind::Function(call)
        };
        Ok(SqlNode::new(id, kind))
    }

    fn convert_function_arg(&mut self, arg: &FunctionArg) -> ParseResult<SqlNode> {
        let arg_expr = match arg {
            FunctionArg::Unnamed(arg_expr) => arg_expr,
            FunctionArg::Named { arg, .. } => arg,
            _ => return Err(self.unknown("FunctionArg")),
        };
        match arg_expr {
            FunctionArgExpr::Expr(e) => self.convert(e),
            FunctionArgExpr::Wildcard => Ok(self.node(NodeKind::Star)),
            FunctionArgExpr::QualifiedWildcard(_) => Err(self.unknown("QualifiedWildcard")),
        }
    }

    fn convert_window(&mut self, spec: &sql::WindowSpec) -> ParseResult<WindowSpec> {
        let order_by = spec
            .order_by
            .iter()
            .map(|item| {
                let id = self.ids.next_id();
                Ok(OrderByItem {
                    id,
                    expr: self.convert(&item.expr)?,
                    direction: match item.asc {
                        Some(false) => SortDirection::Desc,
                        _ => SortDirection::Asc,
                    },
                })
            })
            .collect::<ParseResult<Vec<_>>>()?;

        let partition_by = spec
            .partition_by
            .iter()
            .map(|e| self.convert(e))
            .collect::<ParseResult<Vec<_>>>()?;

        let frame = match &spec.window_frame {
            None => None,
            Some(frame) => Some(WindowFrame {
                units: frame.units.to_string(),
                start: self.convert_bound(&frame.start_bound)?,
                end: frame
                    .end_bound
                    .as_ref()
                    .map(|bound| self.convert_bound(bound))
                    .transpose()?,
            }),
        };

        Ok(WindowSpec {
            order_by,
            partition_by,
            frame,
        })
    }

    fn convert_bound(&mut self, bound: &WindowFrameBound) -> ParseResult<FrameBound> {
        Ok(match bound {
            WindowFrameBound::CurrentRow => FrameBound::CurrentRow,
            WindowFrameBound::Preceding(offset) => FrameBound::Preceding(
                offset.as_deref().map(|e| self.boxed(e)).transpose()?,
            ),
            WindowFrameBound::Following(offset) => FrameBound::Following(
                offset.as_deref().map(|e| self.boxed(e)).transpose()?,
            ),
        })
    }
}
