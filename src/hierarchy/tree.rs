//! Hierarchy tree.
//!
//! ```text
//! Explorations
//! └── Dashboards | Analyses
//!     └── <exploration id>
//!         └── <sheet id>
//!             └── <sheet id>_<dataset id>
//!                 └── <visual id>
//!                     └── <request id>      (leaf, carries RequestDetails)
//! ```
//!
//! Each node owns its children; siblings keep insertion order.

use std::collections::BTreeMap;

use serde::Serialize;

use super::tags::TagSet;
use crate::model::{Badges, Expression};

/// Key of the synthetic root node.
pub const ROOT_KEY: &str = "Explorations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeLevel {
    Root,
    ExplorationType,
    Exploration,
    Sheet,
    Dataset,
    Visual,
    Request,
}

/// Aggregated state of a node. Leaves hold their own request's values;
/// inner nodes are filled by the aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    /// Seconds.
    pub duration: f64,
    pub request_count: u32,
    /// Epoch milliseconds.
    pub start_time: Option<i64>,
    /// Epoch milliseconds.
    pub end_time: Option<i64>,
    pub has_error: bool,
    pub cost: u64,
    pub parsed_expression_count: u32,
    pub high_cost_request_count: u32,
    pub tags: TagSet,
    pub origin: Option<String>,
    pub user_agent: Option<String>,
}

/// Everything known about one request, attached to its leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    pub request_id: String,
    pub visual_type: Option<String>,
    /// `None` when the request never completed.
    pub duration: Option<f64>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub badges: Badges,
    pub expressions: Vec<Expression>,
    pub parameters: BTreeMap<String, String>,
    pub filters: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub key: String,
    pub level: NodeLevel,
    /// Display name, when the capture provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub metrics: NodeMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Box<RequestDetails>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn new(key: impl Into<String>, level: NodeLevel) -> Self {
        Self {
            key: key.into(),
            level,
            name: None,
            metrics: NodeMetrics::default(),
            request: None,
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(ROOT_KEY, NodeLevel::Root)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, key: &str) -> Option<&HierarchyNode> {
        self.children.iter().find(|c| c.key == key)
    }

    /// Existing child with `key`, or a new one appended at the end.
    pub fn child_or_insert(&mut self, key: &str, level: NodeLevel) -> &mut HierarchyNode {
        let pos = match self.children.iter().position(|c| c.key == key) {
            Some(pos) => pos,
            None => {
                self.children.push(HierarchyNode::new(key, level));
                self.children.len() - 1
            }
        };
        &mut self.children[pos]
    }

    /// Follow a path of child keys, not including this node's key.
    pub fn find(&self, path: &[&str]) -> Option<&HierarchyNode> {
        path.iter().try_fold(self, |node, key| node.child(key))
    }

    /// Path of keys from this node (exclusive) to the first node with `key`.
    pub fn path_to(&self, key: &str) -> Option<Vec<String>> {
        self.path_where(&|node| node.key == key)
    }

    /// Depth-first path to the first descendant matching `pred`.
    pub fn path_where(&self, pred: &impl Fn(&HierarchyNode) -> bool) -> Option<Vec<String>> {
        for child in &self.children {
            if pred(child) {
                return Some(vec![child.key.clone()]);
            }
            if let Some(mut rest) = child.path_where(pred) {
                rest.insert(0, child.key.clone());
                return Some(rest);
            }
        }
        None
    }

    /// Request leaves under this node, depth-first.
    pub fn requests(&self) -> Vec<&HierarchyNode> {
        let mut out = Vec::new();
        self.collect_requests(&mut out);
        out
    }

    fn collect_requests<'a>(&'a self, out: &mut Vec<&'a HierarchyNode>) {
        if self.request.is_some() {
            out.push(self);
        }
        for child in &self.children {
            child.collect_requests(out);
        }
    }

    /// Apply `f` to every request leaf under this node.
    pub fn for_each_request_mut(&mut self, f: &mut impl FnMut(&mut HierarchyNode)) {
        if self.request.is_some() {
            f(self);
        }
        for child in &mut self.children {
            child.for_each_request_mut(f);
        }
    }
}
