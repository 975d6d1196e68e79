//! Function documentation links.

use super::functions;

/// Default location of the vendor function reference.
pub const DEFAULT_DOCS_BASE_URL: &str = "https://docs.aws.amazon.com/quicksight/latest/user/";

/// Maps a function name to a documentation URL. A missing link is not an error.
pub trait DocLinkResolver {
    fn doc_link(&self, function_name: &str) -> Option<String>;
}

/// Resolver that never produces a link.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDocLinks;

impl DocLinkResolver for NoDocLinks {
    fn doc_link(&self, _function_name: &str) -> Option<String> {
        None
    }
}

/// DSL functions that have a page in the vendor reference.
const DOCUMENTED_FUNCTIONS: &[&str] = &[
    "sum",
    "sumIf",
    "minOver",
    "maxOver",
    "avgOver",
    "countOver",
    "distinctCountOver",
    "sumOver",
    "addDateTime",
    "addWorkDays",
    "dateDiff",
    "ceil",
    "floor",
    "round",
    "contains",
    "locate",
    "windowSum",
    "difference",
    "lag",
    "lead",
    "percentDifference",
    "percentileOver",
    "percentileContOver",
    "percentileDiscOver",
    "percentOfTotal",
    "periodOverPeriodDifference",
    "periodOverPeriodLastValue",
    "periodOverPeriodPercentDifference",
    "periodToDateAvgOverTime",
    "periodToDateCountOverTime",
    "periodToDateMaxOverTime",
    "periodToDateMinOverTime",
    "periodToDateSumOverTime",
    "stdevOver",
    "stdevpOver",
    "varOver",
    "varpOver",
    "denseRank",
    "rank",
    "percentileRank",
    "runningAvg",
    "runningCount",
    "runningMax",
    "runningMin",
    "runningSum",
    "firstValue",
    "lastValue",
    "windowAvg",
    "windowCount",
    "windowMax",
    "windowMin",
    "concat",
    "toString",
];

/// Resolver backed by the built-in table of documented functions.
///
/// Names go through the catalog first, so both `MAX_OVER` and `maxOver`
/// resolve to the `maxOver` page.
#[derive(Debug, Clone)]
pub struct StaticDocLinks {
    base_url: String,
}

impl StaticDocLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for StaticDocLinks {
    fn default() -> Self {
        Self::new(DEFAULT_DOCS_BASE_URL)
    }
}

impl DocLinkResolver for StaticDocLinks {
    fn doc_link(&self, function_name: &str) -> Option<String> {
        let dsl_name = functions::find(function_name)
            .map(|entry| entry.dsl_name)
            .unwrap_or(function_name);

        DOCUMENTED_FUNCTIONS
            .iter()
            .find(|page| page.eq_ignore_ascii_case(dsl_name))
            .map(|page| format!("{}{}-function.html", self.base_url, page))
    }
}
