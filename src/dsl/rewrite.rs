//! Rewrite strategies for vendor function calls.
//!
//! Each matched `name(args)` is classified by its catalog key and rendered
//! as standard SQL function or window syntax:
//!
//! | Strategy | DSL | SQL |
//! |---|---|---|
//! | Rank | `rank([s DESC], [p], LEVEL)` | `RANK() OVER (PARTITION BY p ORDER BY s DESC)` |
//! | LAC | `sum(m, [p])` | `SUM(m) OVER (PARTITION BY p)` |
//! | Over | `sumOver(m, [p], LEVEL)` | `SUM_OVER(m) OVER (PARTITION BY p)` |
//! | Membership | `in(c, [v1, v2], true)` | `IN(c)` |
//! | IfElse | `ifelse(c1, t1, c2, t2, e)` | `ifelse(c1, t1, ifelse(c2, t2, e))` |
//! | PassThrough | `toUpper(x)` | `TOUPPER(x)` |

use tracing::trace;

use super::preprocess::rewrite_functions;
use crate::catalog;

/// How a function call is rendered into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStrategy {
    Rank,
    LeastAggregated,
    Over,
    Membership,
    IfElse,
    PassThrough,
}

impl RewriteStrategy {
    /// Pick the strategy for a catalog key. The checks run in priority order.
    pub fn classify(key: &str) -> Self {
        let upper = key.to_ascii_uppercase();
        if upper.contains("RANK") {
            RewriteStrategy::Rank
        } else if catalog::is_least_aggregated_computation(key) {
            RewriteStrategy::LeastAggregated
        } else if upper.ends_with("OVER") {
            RewriteStrategy::Over
        } else if upper == "IN" || upper == "NOTIN" {
            RewriteStrategy::Membership
        } else if upper == "IFELSE" {
            RewriteStrategy::IfElse
        } else {
            RewriteStrategy::PassThrough
        }
    }
}

/// Rewrite one matched call. `args` is the raw text between the parentheses.
pub fn rewrite_call(name: &str, args: &str) -> String {
    // Calls nested one level deep inside the arguments are rewritten first.
    let args = rewrite_functions(args);
    let args = split_top_level(&args);

    let rewritten = match catalog::category_key_for(name) {
        Some(key) => match RewriteStrategy::classify(key) {
            RewriteStrategy::Rank => rewrite_rank(key, &args),
            RewriteStrategy::LeastAggregated => rewrite_windowed(key, &args, false),
            RewriteStrategy::Over => rewrite_windowed(key, &args, true),
            RewriteStrategy::Membership => rewrite_membership(key, &args),
            RewriteStrategy::IfElse => fold_ifelse(&args),
            RewriteStrategy::PassThrough => render_call(key, &args),
        },
        None => render_call(name, &args),
    };

    trace!(function = name, sql = %rewritten, "rewrote function call");
    rewritten
}

/// Split on commas that are not nested inside `()`, `[]` or a quoted literal.
/// Pieces are trimmed; blank input yields no pieces.
pub fn split_top_level(args: &str) -> Vec<String> {
    if args.trim().is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;

    for ch in args.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }

        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' | '[' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                pieces.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    pieces.push(current.trim().to_string());
    pieces
}

fn is_bracketed(arg: &str) -> bool {
    arg.starts_with('[') && arg.ends_with(']')
}

/// Items of a `[a, b]` list. A bare argument is a one-item list.
fn list_items(arg: &str) -> Vec<String> {
    let inner = if is_bracketed(arg) {
        &arg[1..arg.len() - 1]
    } else {
        arg
    };
    split_top_level(inner)
        .into_iter()
        .filter(|item| !item.is_empty())
        .collect()
}

/// Partition entries are usually bare column names; quote them so the SQL
/// parser treats dotted names as one identifier.
fn quote_partition(item: String) -> String {
    let simple = item
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    let starts_with_digit = item.chars().next().is_some_and(|c| c.is_ascii_digit());
    if simple && !starts_with_digit {
        format!("`{item}`")
    } else {
        item
    }
}

fn window_clause(partitions: &[String], order: &[String]) -> String {
    let mut clauses = Vec::new();
    if !partitions.is_empty() {
        clauses.push(format!("PARTITION BY {}", partitions.join(", ")));
    }
    if !order.is_empty() {
        clauses.push(format!("ORDER BY {}", order.join(", ")));
    }
    format!("OVER ({})", clauses.join(" "))
}

fn render_call(name: &str, args: &[String]) -> String {
    format!("{}({})", name, args.join(", "))
}

/// `rank([sort], [partitions], level)` → `RANK() OVER (...)`.
fn rewrite_rank(key: &str, args: &[String]) -> String {
    let order = args.first().map(|a| list_items(a)).unwrap_or_default();
    let partitions: Vec<String> = args
        .get(1)
        .map(|a| list_items(a))
        .unwrap_or_default()
        .into_iter()
        .map(quote_partition)
        .collect();
    if let Some(level) = args.get(2) {
        trace!(function = key, level = %level, "dropping aggregation level");
    }
    format!("{key}() {}", window_clause(&partitions, &order))
}

/// LAC and Over families: `f(measure, ..., [partitions], level)`.
///
/// Arguments before the first bracketed list stay function arguments, the
/// list becomes `PARTITION BY`, anything after it is the level and is dropped.
/// LAC calls without partitions stay plain aggregates, Over calls always get
/// a window.
fn rewrite_windowed(key: &str, args: &[String], always_windowed: bool) -> String {
    let split_at = args.iter().position(|a| is_bracketed(a));
    let (call_args, partitions) = match split_at {
        Some(pos) => {
            if let Some(level) = args.get(pos + 1) {
                trace!(function = key, level = %level, "dropping aggregation level");
            }
            let partitions: Vec<String> = list_items(&args[pos])
                .into_iter()
                .map(quote_partition)
                .collect();
            (&args[..pos], partitions)
        }
        None if always_windowed => (&args[..args.len().min(1)], Vec::new()),
        None => (args, Vec::new()),
    };

    let call = render_call(key, call_args);
    if partitions.is_empty() && !always_windowed {
        call
    } else {
        format!("{call} {}", window_clause(&partitions, &[]))
    }
}

/// `in(column, [values], inclusive)` → `IN(column)`.
fn rewrite_membership(key: &str, args: &[String]) -> String {
    render_call(key, &args[..args.len().min(1)])
}

/// Fold `c1, t1, c2, t2, ..., else` into nested two-branch `ifelse` calls.
fn fold_ifelse(args: &[String]) -> String {
    match args {
        [] => "NULL".to_string(),
        [otherwise] => otherwise.clone(),
        [condition, then, rest @ ..] => {
            format!("ifelse({condition}, {then}, {})", fold_ifelse(rest))
        }
    }
}
