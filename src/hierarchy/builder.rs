//! Folding request bundles into the hierarchy.
//!
//! Per request:
//! 1. expand the bundle into its expressions,
//! 2. parse every expression that needs it (materialized dataset columns,
//!    shadowed fields and `CUSTOM` metrics are skipped),
//! 3. cost each parsed expression, referenced calculated fields first,
//! 4. copy costs onto `CUSTOM` metrics from their calculated field,
//! 5. insert the request leaf under its dashboard/sheet/dataset/visual path.
//!
//! [`HierarchyBuilder::finish`] then runs the outlier pass and the
//! bottom-up aggregation.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::aggregate::{aggregate, tag_long_durations};
use super::tags::{Tag, TagSet};
use super::tree::{HierarchyNode, NodeLevel, NodeMetrics, RequestDetails};
use crate::analysis::{dependency_chain, AnalysisContext, ReferenceGraph};
use crate::catalog::{DocLinkResolver, NoDocLinks};
use crate::config::AnalysisSettings;
use crate::model::{ExplorationType, Expression, ExpressionKind, RequestBundle};
use crate::sql::NodeIds;
use crate::visitor::{Dependency, DependencyMode};

static NO_DOC_LINKS: NoDocLinks = NoDocLinks;

// =============================================================================
// Request analysis
// =============================================================================

/// Analysis outcome for one request.
#[derive(Debug, Clone)]
pub struct RequestAnalysis {
    pub expressions: Vec<Expression>,
    pub total_cost: u64,
    pub parsing_error: bool,
    pub parsed_expression_count: u32,
}

/// Parse and cost every expression of a request.
///
/// Parse failures are recorded on the failing expression and never abort
/// the rest of the request.
pub fn analyze_request(
    bundle: &RequestBundle,
    ids: &mut NodeIds,
    doc_links: &dyn DocLinkResolver,
    mode: DependencyMode,
) -> RequestAnalysis {
    let mut expressions = bundle.expressions();

    let calculated_aliases: HashSet<String> = expressions
        .iter()
        .filter(|e| e.kind == ExpressionKind::CalculatedField)
        .map(|e| e.alias.clone())
        .collect();

    for expr in &mut expressions {
        let shadowed =
            expr.kind == ExpressionKind::Field && calculated_aliases.contains(&expr.alias);
        if shadowed || expr.is_custom_metric() {
            expr.is_parsed = false;
            expr.used_in_query_gen = true;
            continue;
        }
        if !expr.pre_processed {
            expr.parse_with(ids);
        }
        if expr.kind.is_query_input() {
            expr.used_in_query_gen = true;
        }
    }

    let graph = ReferenceGraph::from_expressions(&expressions);
    for cycle in graph.detect_cycles() {
        warn!(
            request_id = %bundle.request_id,
            fields = ?cycle,
            "calculated fields reference each other"
        );
    }

    for idx in cost_order(&expressions, &graph) {
        let report = AnalysisContext::new(&expressions, &bundle.parameters)
            .with_doc_links(doc_links)
            .with_mode(mode)
            .analyze(&expressions[idx]);
        if let Some(report) = report {
            expressions[idx].apply_report(&report);
        }
    }

    for idx in 0..expressions.len() {
        if !expressions[idx].is_custom_metric() {
            continue;
        }
        let source = expressions
            .iter()
            .find(|e| {
                e.kind == ExpressionKind::CalculatedField
                    && e.is_parsed
                    && e.alias == expressions[idx].alias
            })
            .map(|e| (e.cost, e.max_depth));
        if let Some((cost, max_depth)) = source {
            expressions[idx].cost = cost;
            expressions[idx].max_depth = max_depth;
        }
    }

    let total_cost = expressions
        .iter()
        .map(|e| u64::from(e.cost.unwrap_or(0)))
        .sum();
    let parsing_error = expressions.iter().any(|e| e.has_error);
    let parsed_expression_count = expressions
        .iter()
        .filter(|e| e.is_parsed && e.used_in_query_gen)
        .count() as u32;

    RequestAnalysis {
        expressions,
        total_cost,
        parsing_error,
        parsed_expression_count,
    }
}

/// Indices in costing order: calculated fields in reference order when the
/// graph is acyclic, then everything else in bundle order.
fn cost_order(expressions: &[Expression], graph: &ReferenceGraph) -> Vec<usize> {
    let mut order = Vec::with_capacity(expressions.len());
    let mut placed = vec![false; expressions.len()];
    if let Some(aliases) = graph.evaluation_order() {
        let mut calculated: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, expression) in expressions.iter().enumerate() {
            if expression.kind == ExpressionKind::CalculatedField {
                calculated.entry(expression.alias.as_str()).or_default().push(idx);
            }
        }
        for alias in &aliases {
            for &idx in calculated.get(alias.as_str()).into_iter().flatten() {
                placed[idx] = true;
                order.push(idx);
            }
        }
    }
    order.extend((0..expressions.len()).filter(|&idx| !placed[idx]));
    order
}

// =============================================================================
// Hierarchy
// =============================================================================

/// Distinct identifiers seen in a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyCounts {
    pub dashboards: usize,
    pub analyses: usize,
    pub sheets: usize,
    pub visuals: usize,
    pub requests: usize,
}

/// A finished, aggregated hierarchy.
#[derive(Debug, Clone, Serialize)]
pub struct Hierarchy {
    pub root: HierarchyNode,
    pub counts: HierarchyCounts,
}

impl Hierarchy {
    /// Request leaf with this id.
    pub fn find_request(&self, request_id: &str) -> Option<&HierarchyNode> {
        self.root
            .requests()
            .into_iter()
            .find(|node| node.key == request_id)
    }

    /// Keys from the root (exclusive) down to the request leaf.
    pub fn path_to_request(&self, request_id: &str) -> Option<Vec<String>> {
        self.root
            .path_where(&|node| node.level == NodeLevel::Request && node.key == request_id)
    }

    /// Every expression of every request.
    pub fn expressions(&self) -> impl Iterator<Item = &Expression> + '_ {
        self.root
            .requests()
            .into_iter()
            .filter_map(|node| node.request.as_deref())
            .flat_map(|request| request.expressions.iter())
    }

    /// Dependency chain of the expression `alias` within request `request_id`.
    /// Calculated fields win over other kinds sharing the alias.
    pub fn dependency_chain(
        &self,
        request_id: &str,
        alias: &str,
        doc_links: &dyn DocLinkResolver,
        mode: DependencyMode,
    ) -> Option<Vec<Dependency>> {
        let request = self.find_request(request_id)?.request.as_deref()?;
        let expression = request
            .expressions
            .iter()
            .filter(|e| e.alias == alias)
            .min_by_key(|e| e.kind != ExpressionKind::CalculatedField)?;

        let ctx = AnalysisContext::new(&request.expressions, &request.parameters)
            .with_doc_links(doc_links)
            .with_mode(mode);
        Some(dependency_chain(&ctx, expression))
    }
}

/// Builds a [`Hierarchy`] one request bundle at a time.
pub struct HierarchyBuilder<'a> {
    settings: AnalysisSettings,
    doc_links: &'a dyn DocLinkResolver,
    root: HierarchyNode,
    ids: NodeIds,

    dashboards: HashSet<String>,
    analyses: HashSet<String>,
    sheets: HashSet<String>,
    visuals: HashSet<String>,
    requests: HashSet<String>,
    skipped: usize,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(settings: &AnalysisSettings) -> Self {
        Self {
            settings: settings.clone(),
            doc_links: &NO_DOC_LINKS,
            root: HierarchyNode::root(),
            ids: NodeIds::new(),
            dashboards: HashSet::new(),
            analyses: HashSet::new(),
            sheets: HashSet::new(),
            visuals: HashSet::new(),
            requests: HashSet::new(),
            skipped: 0,
        }
    }

    pub fn with_doc_links(mut self, doc_links: &'a dyn DocLinkResolver) -> Self {
        self.doc_links = doc_links;
        self
    }

    /// Analyze a request and insert it. Returns `false` when the request was
    /// skipped: no exploration, sheet or visual id, or a duplicate request id
    /// under the same visual.
    pub fn add_request(&mut self, bundle: &RequestBundle) -> bool {
        let Some((exploration_type, exploration_id)) = bundle.exploration() else {
            debug!(request_id = %bundle.request_id, "no dashboard or analysis id; skipping");
            self.skipped += 1;
            return false;
        };
        let (Some(sheet_id), Some(visual_id)) = (bundle.sheet(), bundle.visual()) else {
            debug!(request_id = %bundle.request_id, "no sheet or visual id; skipping");
            self.skipped += 1;
            return false;
        };

        let dataset_key = format!("{}_{}", sheet_id, bundle.dataset_id);
        let names = &bundle.names;
        let exploration_name = match exploration_type {
            ExplorationType::Dashboards => &names.dashboard,
            ExplorationType::Analyses => &names.analysis,
        };

        let visual = {
            let type_node = self
                .root
                .child_or_insert(exploration_type.key(), NodeLevel::ExplorationType);
            let exploration = type_node.child_or_insert(exploration_id, NodeLevel::Exploration);
            set_name(exploration, exploration_name);
            let sheet = exploration.child_or_insert(sheet_id, NodeLevel::Sheet);
            set_name(sheet, &names.sheet);
            let dataset = sheet.child_or_insert(&dataset_key, NodeLevel::Dataset);
            set_name(dataset, &names.dataset);
            let visual = dataset.child_or_insert(visual_id, NodeLevel::Visual);
            set_name(visual, &names.visual);
            visual
        };

        if visual.child(&bundle.request_id).is_some() {
            warn!(request_id = %bundle.request_id, visual_id, "duplicate request id; keeping the first");
            self.skipped += 1;
            return false;
        }

        let analysis = analyze_request(
            bundle,
            &mut self.ids,
            self.doc_links,
            self.settings.dependency_mode,
        );

        let high_cost = analysis.total_cost > self.settings.high_cost_threshold;
        let mut tags = TagSet::new();
        if high_cost {
            tags.insert(Tag::HighCost);
        }
        if analysis.parsing_error {
            tags.insert(Tag::ParsingError);
        }

        let duration = bundle.duration_secs();
        debug!(
            request_id = %bundle.request_id,
            cost = analysis.total_cost,
            ?duration,
            ?tags,
            "analyzed request"
        );

        let leaf = visual.child_or_insert(&bundle.request_id, NodeLevel::Request);
        leaf.metrics = NodeMetrics {
            duration: duration.unwrap_or(0.0),
            request_count: 1,
            start_time: Some(bundle.start_time),
            end_time: bundle.end_time,
            has_error: bundle.error_code.is_some(),
            cost: analysis.total_cost,
            parsed_expression_count: analysis.parsed_expression_count,
            high_cost_request_count: u32::from(high_cost),
            tags,
            origin: bundle.origin.clone(),
            user_agent: bundle.user_agent.clone(),
        };
        leaf.request = Some(Box::new(RequestDetails {
            request_id: bundle.request_id.clone(),
            visual_type: bundle.visual_type.clone(),
            duration,
            error_code: bundle.error_code.clone(),
            error_message: bundle.error_message.clone(),
            badges: bundle.badges,
            expressions: analysis.expressions,
            parameters: bundle.parameters.clone(),
            filters: bundle.filters.clone(),
        }));

        let explorations = match exploration_type {
            ExplorationType::Dashboards => &mut self.dashboards,
            ExplorationType::Analyses => &mut self.analyses,
        };
        explorations.insert(exploration_id.to_string());
        self.sheets.insert(sheet_id.to_string());
        self.visuals.insert(visual_id.to_string());
        self.requests.insert(bundle.request_id.clone());
        true
    }

    /// Run the outlier pass and the bottom-up aggregation.
    pub fn finish(mut self) -> Hierarchy {
        let long_running = tag_long_durations(&mut self.root, self.settings.long_duration_sigma);
        aggregate(&mut self.root, &self.settings);

        let counts = HierarchyCounts {
            dashboards: self.dashboards.len(),
            analyses: self.analyses.len(),
            sheets: self.sheets.len(),
            visuals: self.visuals.len(),
            requests: self.requests.len(),
        };
        info!(
            dashboards = counts.dashboards,
            analyses = counts.analyses,
            sheets = counts.sheets,
            visuals = counts.visuals,
            requests = counts.requests,
            skipped = self.skipped,
            long_running,
            "built hierarchy"
        );

        Hierarchy {
            root: self.root,
            counts,
        }
    }
}

fn set_name(node: &mut HierarchyNode, name: &Option<String>) {
    if node.name.is_none() {
        node.name = name.clone();
    }
}

/// Build a hierarchy from a batch of bundles.
pub fn build_hierarchy(
    bundles: &[RequestBundle],
    settings: &AnalysisSettings,
    doc_links: &dyn DocLinkResolver,
) -> Hierarchy {
    let mut builder = HierarchyBuilder::new(settings).with_doc_links(doc_links);
    for bundle in bundles {
        builder.add_request(bundle);
    }
    builder.finish()
}
