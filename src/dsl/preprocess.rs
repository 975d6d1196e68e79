//! Text transforms that turn a DSL expression into generic SQL.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

use super::rewrite::rewrite_call;

/// `${name}` parameter reference.
static PARAMETER_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("valid regex"));

/// `{name}` field reference.
static FIELD_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]*)\}").expect("valid regex"));

/// `name(args)` where `args` may hold one level of balanced parentheses.
static FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\(([^()]*(?:\([^()]*\)[^()]*)*)\)").expect("valid regex")
});

/// Full pipeline: substitute references, rewrite vendor calls, wrap in a SELECT.
///
/// Never fails. Malformed input produces SQL that the parser rejects.
pub fn preprocess(dsl: &str) -> String {
    let substituted = substitute_references(dsl);
    let rewritten = rewrite_functions(&substituted);
    let sql = wrap_select(&rewritten);
    trace!(dsl, sql = %sql, "preprocessed expression");
    sql
}

/// Replace `${X}` and then `{X}` with `` `X` ``, and strip newlines.
///
/// Parameters go first: `${X}` also matches the field pattern.
pub fn substitute_references(dsl: &str) -> String {
    let with_parameters = PARAMETER_REF.replace_all(dsl, |caps: &Captures| quote(&caps[1]));
    let with_fields = FIELD_REF.replace_all(&with_parameters, |caps: &Captures| quote(&caps[1]));
    strip_newlines(&with_fields)
}

/// Rewrite every vendor function call in a single pass.
pub fn rewrite_functions(sql: &str) -> String {
    FUNCTION_CALL
        .replace_all(sql, |caps: &Captures| rewrite_call(&caps[1], &caps[2]))
        .into_owned()
}

/// Host a bare expression in a statement a SELECT parser accepts.
pub fn wrap_select(expr: &str) -> String {
    format!("SELECT ({expr}) AS expr FROM DUAL")
}

fn quote(identifier: &str) -> String {
    format!("`{}`", identifier.trim())
}

fn strip_newlines(text: &str) -> String {
    text.replace("\\n", "").replace(['\r', '\n'], "")
}
