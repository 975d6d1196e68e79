//! Calculated-field reference graph.
//!
//! Nodes are calculated fields, an edge `a → b` means `b` references `a`.
//! Used to order cost computation (referenced fields first) and to report
//! reference cycles.

use std::collections::HashMap;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::model::{Expression, ExpressionKind};
use crate::visitor::ColumnCollector;

pub struct ReferenceGraph {
    graph: DiGraph<String, ()>,
    node_index: HashMap<String, NodeIndex>,
}

impl ReferenceGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
        }
    }

    /// Build the graph from the parsed calculated fields of an expression set.
    pub fn from_expressions(expressions: &[Expression]) -> Self {
        let mut graph = Self::new();

        let calculated = expressions
            .iter()
            .filter(|e| e.kind == ExpressionKind::CalculatedField);

        for expr in calculated.clone() {
            graph.get_or_create_node(&expr.alias);
        }

        for expr in calculated {
            let Some(parsed) = &expr.parsed else {
                continue;
            };
            for referenced in ColumnCollector::collect(parsed) {
                if graph.node_index.contains_key(&referenced) {
                    graph.add_reference(&expr.alias, &referenced);
                }
            }
        }

        graph
    }

    fn get_or_create_node(&mut self, alias: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(alias) {
            idx
        } else {
            let idx = self.graph.add_node(alias.to_string());
            self.node_index.insert(alias.to_string(), idx);
            idx
        }
    }

    /// Record that `from` references `to`. Duplicate references collapse.
    pub fn add_reference(&mut self, from: &str, to: &str) {
        let referencing = self.get_or_create_node(from);
        let referenced = self.get_or_create_node(to);
        self.graph.update_edge(referenced, referencing, ());
    }

    fn neighbors(&self, alias: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.node_index.get(alias) else {
            return vec![];
        };
        let mut names: Vec<&str> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.graph.node_weight(n).map(String::as_str))
            .collect();
        names.sort_unstable();
        names
    }

    /// Calculated fields `alias` references directly.
    pub fn references(&self, alias: &str) -> Vec<&str> {
        self.neighbors(alias, Direction::Incoming)
    }

    /// Calculated fields that reference `alias` directly.
    pub fn referenced_by(&self, alias: &str) -> Vec<&str> {
        self.neighbors(alias, Direction::Outgoing)
    }

    /// Aliases ordered so every field comes after the fields it references.
    /// `None` when the graph has a cycle.
    pub fn evaluation_order(&self) -> Option<Vec<String>> {
        let order = toposort(&self.graph, None).ok()?;
        Some(
            order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).cloned())
                .collect(),
        )
    }

    /// Groups of calculated fields that reference each other, including
    /// fields that reference themselves.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.edges_connecting(scc[0], scc[0]).next().is_some()
            })
            .map(|scc| {
                let mut names: Vec<String> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect();
                names.sort();
                names
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for ReferenceGraph {
    fn default() -> Self {
        Self::new()
    }
}
