//! Dependency chain drill-down.

use super::AnalysisContext;
use crate::model::{Expression, ExpressionKind};
use crate::visitor::{Dependency, DependencyKind};

/// Ordered chain of everything `expression` touches.
///
/// Visitor levels are shifted one deeper. A calculated field is listed
/// first, at level 0, as the root of its own chain. Unparsed expressions
/// contribute only that root entry.
pub fn dependency_chain(ctx: &AnalysisContext<'_>, expression: &Expression) -> Vec<Dependency> {
    let mut chain = Vec::new();

    if expression.kind == ExpressionKind::CalculatedField {
        chain.push(Dependency {
            alias: expression.alias.clone(),
            kind: DependencyKind::CalculatedField,
            expression: expression.expression.clone(),
            cost: expression.cost.unwrap_or(0),
            level: 0,
            doc_link: None,
        });
    }

    if let Some(report) = ctx.analyze(expression) {
        chain.extend(report.dependencies.into_iter().map(|mut dep| {
            dep.level += 1;
            dep
        }));
    }

    chain
}
