//! Bottom-up aggregation and the long-duration outlier pass.

use tracing::debug;

use super::tags::Tag;
use super::tree::HierarchyNode;
use crate::config::AnalysisSettings;

/// Mean and population standard deviation of request durations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl DurationStats {
    /// `None` for an empty sample.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    /// Durations strictly above this are outliers.
    pub fn threshold(&self, sigma: f64) -> f64 {
        self.mean + sigma * self.std_dev
    }
}

/// Tag every request whose duration exceeds `mean + sigma * stddev` with
/// [`Tag::LongDuration`]. Requests without a duration are left out of the
/// statistics. Returns the number of tagged requests.
pub fn tag_long_durations(root: &mut HierarchyNode, sigma: f64) -> usize {
    let samples: Vec<f64> = root
        .requests()
        .iter()
        .filter_map(|node| node.request.as_ref().and_then(|r| r.duration))
        .collect();

    let Some(stats) = DurationStats::from_samples(&samples) else {
        return 0;
    };
    let threshold = stats.threshold(sigma);
    debug!(
        mean = stats.mean,
        std_dev = stats.std_dev,
        threshold,
        "duration statistics"
    );

    let mut tagged = 0;
    root.for_each_request_mut(&mut |node| {
        let duration = node.request.as_ref().and_then(|r| r.duration);
        if duration.is_some_and(|d| d > threshold) {
            node.metrics.tags.insert(Tag::LongDuration);
            tagged += 1;
        }
    });
    tagged
}

/// Fold children into every inner node, deepest first.
///
/// Sums duration, request count, cost, parsed-expression count and
/// high-cost request count; ORs the error flag; unions tags; takes the
/// min start and max end time. Origin and user agent come from the last
/// child that has them. A subtree holding more than
/// `high_cost_request_limit` high-cost requests is itself tagged high cost.
pub fn aggregate(node: &mut HierarchyNode, settings: &AnalysisSettings) {
    if node.children.is_empty() {
        return;
    }

    for child in &mut node.children {
        aggregate(child, settings);
    }

    let mut metrics = node.metrics.clone();
    metrics.duration = 0.0;
    metrics.request_count = 0;
    let mut start_time: Option<i64> = None;
    let mut end_time: Option<i64> = None;

    for child in &node.children {
        let child_metrics = &child.metrics;
        metrics.duration += child_metrics.duration;
        metrics.request_count += child_metrics.request_count;
        metrics.cost += child_metrics.cost;
        metrics.parsed_expression_count += child_metrics.parsed_expression_count;
        metrics.high_cost_request_count += child_metrics.high_cost_request_count;

        let child_error_code = child
            .request
            .as_ref()
            .is_some_and(|r| r.error_code.is_some());
        if child_metrics.has_error || child_error_code {
            metrics.has_error = true;
        }

        metrics.tags.extend(child_metrics.tags.iter().copied());

        if let Some(start) = child_metrics.start_time {
            start_time = Some(start_time.map_or(start, |s| s.min(start)));
        }
        if let Some(end) = child_metrics.end_time {
            end_time = Some(end_time.map_or(end, |e| e.max(end)));
        }
        if child_metrics.origin.is_some() {
            metrics.origin = child_metrics.origin.clone();
        }
        if child_metrics.user_agent.is_some() {
            metrics.user_agent = child_metrics.user_agent.clone();
        }
    }

    if metrics.high_cost_request_count > settings.high_cost_request_limit {
        metrics.tags.insert(Tag::HighCost);
    }
    if start_time.is_some() {
        metrics.start_time = start_time;
    }
    if end_time.is_some() {
        metrics.end_time = end_time;
    }

    node.metrics = metrics;
}
