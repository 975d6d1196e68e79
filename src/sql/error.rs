//! Parser adapter errors.

use thiserror::Error;

/// Failure to turn generic SQL text into an expression AST.
///
/// Every message starts with `Error parsing SQL` so the failure is
/// recognizable from the text alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text is not valid SQL.
    #[error("Error parsing SQL ({sql}): {message}")]
    SqlSyntax { sql: String, message: String },

    /// Valid SQL, but not a single-expression `SELECT ... FROM DUAL`.
    #[error("Error parsing SQL ({sql}): unexpected statement shape: {reason}")]
    UnexpectedStructure { sql: String, reason: String },

    /// The parser produced a node kind the analyzer has no representation for.
    #[error("Error parsing SQL ({sql}): unsupported expression kind `{kind}`")]
    UnknownAstNode { kind: String, sql: String },
}

pub type ParseResult<T> = Result<T, ParseError>;

impl ParseError {
    /// The SQL text that failed.
    pub fn sql(&self) -> &str {
        match self {
            ParseError::SqlSyntax { sql, .. }
            | ParseError::UnexpectedStructure { sql, .. }
            | ParseError::UnknownAstNode { sql, .. } => sql,
        }
    }
}
