//! Request hierarchy: grouping analyzed requests by where they came from.
//!
//! Requests are placed under exploration type, exploration, sheet, dataset
//! and visual. Every inner node carries the aggregate of its subtree, and
//! anomaly [`Tag`]s bubble up from the leaves.

mod aggregate;
mod builder;
mod tags;
mod tree;

pub use aggregate::{aggregate, tag_long_durations, DurationStats};
pub use builder::{
    analyze_request, build_hierarchy, Hierarchy, HierarchyBuilder, HierarchyCounts,
    RequestAnalysis,
};
pub use tags::{Tag, TagSet};
pub use tree::{HierarchyNode, NodeLevel, NodeMetrics, RequestDetails, ROOT_KEY};
