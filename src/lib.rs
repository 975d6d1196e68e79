//! # calcscope
//!
//! Cost, depth and dependency analysis for BI dashboard calculation
//! expressions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Request bundles (captured dashboard calls)      │
//! │   (fields, calculated fields, metrics, filters, params)  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [dsl::preprocess]
//! ┌─────────────────────────────────────────────────────────┐
//! │        SELECT (<rewritten expression>) AS expr FROM DUAL │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql::parse]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 SqlNode tree (stable ids)                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [visitor::CostVisitor]
//! ┌─────────────────────────────────────────────────────────┐
//! │        cost, depth, flags, dependency records            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [hierarchy::HierarchyBuilder]
//! ┌─────────────────────────────────────────────────────────┐
//! │  Explorations > type > exploration > sheet > dataset >   │
//! │  visual > request, aggregated and tagged                 │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The function [`catalog`] supplies costs, categories and documentation
//! links to every stage.

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod dsl;
pub mod hierarchy;
pub mod model;
pub mod sql;
pub mod visitor;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::analysis::{analyze_expression, dependency_chain, AnalysisContext};
    pub use crate::catalog::{DocLinkResolver, NoDocLinks, StaticDocLinks};
    pub use crate::config::{AnalysisSettings, Settings};
    pub use crate::dsl::preprocess;
    pub use crate::hierarchy::{build_hierarchy, Hierarchy, HierarchyBuilder, Tag};
    pub use crate::model::{Expression, ExpressionKind, RequestBundle};
    pub use crate::sql::{parse, parse_expression, SqlNode};
    pub use crate::visitor::{CostReport, CostVisitor, Dependency, DependencyMode};
}
