//! Static table of DSL functions with their canonical names, categories and costs.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// Category a DSL function belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FunctionCategory {
    Aggregate,
    Conditional,
    Date,
    Numeric,
    Mathematical,
    String,
    TableCalculation,
}

impl FunctionCategory {
    /// Human-readable label, as shown in the vendor documentation.
    pub fn label(&self) -> &'static str {
        match self {
            FunctionCategory::Aggregate => "Aggregate Functions",
            FunctionCategory::Conditional => "Conditional Functions",
            FunctionCategory::Date => "Date Functions",
            FunctionCategory::Numeric => "Numeric Functions",
            FunctionCategory::Mathematical => "Mathematical Functions",
            FunctionCategory::String => "String Functions",
            FunctionCategory::TableCalculation => "Table Calculation Functions",
        }
    }
}

impl fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionEntry {
    /// SQL-safe canonical name (`MAX_OVER`), used for cost lookup and AST matching.
    pub canonical_name: &'static str,
    /// Name as written in the DSL (`maxOver`).
    pub dsl_name: &'static str,
    pub category: FunctionCategory,
    pub cost: u32,
    /// Least-aggregated-computation family.
    pub is_lac: bool,
}

/// Result of a catalog lookup. Unknown functions get a default entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub canonical_name: String,
    pub category: Option<FunctionCategory>,
    pub cost: u32,
    pub is_lac: bool,
}

/// Cost charged for functions the catalog does not know.
pub const DEFAULT_FUNCTION_COST: u32 = 1;

// =============================================================================
// Table
// =============================================================================

const fn f(
    canonical_name: &'static str,
    dsl_name: &'static str,
    category: FunctionCategory,
    cost: u32,
) -> FunctionEntry {
    FunctionEntry {
        canonical_name,
        dsl_name,
        category,
        cost,
        is_lac: false,
    }
}

const fn lac(canonical_name: &'static str, dsl_name: &'static str, cost: u32) -> FunctionEntry {
    FunctionEntry {
        canonical_name,
        dsl_name,
        category: FunctionCategory::Aggregate,
        cost,
        is_lac: true,
    }
}

use FunctionCategory::{
    Conditional, Date, Mathematical, Numeric, String as Str, TableCalculation as TableCalc,
};

/// Every function the DSL preprocessor and the cost visitor understand.
pub static FUNCTIONS: &[FunctionEntry] = &[
    // Aggregates
    lac("AVG", "avg", 5),
    lac("COUNT", "count", 3),
    lac("COUNT_DISTINCT", "countDistinct", 7),
    lac("MAX", "max", 4),
    lac("MEDIAN", "median", 6),
    lac("MIN", "min", 4),
    lac("PERCENTILE_DISC", "percentileDisc", 8),
    lac("PERCENTILE_CONT", "percentileCont", 8),
    lac("SUM", "sum", 5),
    lac("STDEV", "stdev", 6),
    lac("STDEVP", "stdevp", 6),
    lac("VAR", "var", 6),
    lac("VARP", "varp", 6),
    // Aggregates with the _LACA suffix share their DSL name with the plain aggregate.
    lac("AVG_LACA", "avg", 7),
    lac("COUNT_LACA", "count", 7),
    lac("COUNT_DISTINCT_LACA", "countDistinct", 7),
    lac("MAX_LACA", "max", 7),
    lac("MEDIAN_LACA", "median", 7),
    lac("MIN_LACA", "min", 7),
    lac("PERCENTILE_DISC_LACA", "percentileDisc", 7),
    lac("PERCENTILE_CONT_LACA", "percentileCont", 7),
    lac("SUM_LACA", "sum", 7),
    lac("STDEV_LACA", "stdev", 7),
    lac("STDEVP_LACA", "stdevp", 7),
    lac("VAR_LACA", "var", 7),
    lac("VARP_LACA", "varp", 7),
    // Conditional
    f("COALESCE", "coalesce", Conditional, 2),
    f("IFELSE", "ifelse", Conditional, 2),
    f("IN", "in", Conditional, 3),
    f("ISNOTNULL", "isNotNull", Conditional, 1),
    f("ISNULL", "isNull", Conditional, 1),
    f("NOTIN", "notIn", Conditional, 3),
    f("NULLIF", "nullIf", Conditional, 2),
    f("SWITCH", "switch", Conditional, 3),
    // Date
    f("ADDDATETIME", "addDateTime", Date, 4),
    f("ADDWORKDAYS", "addWorkDays", Date, 4),
    f("DATEDIFF", "dateDiff", Date, 4),
    f("EPOCHDATE", "epochDate", Date, 3),
    f("EXTRACT", "extract", Date, 3),
    f("FORMATDATE", "formatDate", Date, 3),
    f("ISWORKDAY", "isWorkDay", Date, 3),
    f("NETWORKDAYS", "netWorkDays", Date, 4),
    f("NOW", "now", Date, 2),
    f("TRUNCDATE", "truncDate", Date, 3),
    // Numeric
    f("CEIL", "ceil", Numeric, 2),
    f("DECIMALTOINT", "decimalToInt", Numeric, 2),
    f("FLOOR", "floor", Numeric, 2),
    f("INTTODECIMAL", "intToDecimal", Numeric, 2),
    f("ROUND", "round", Numeric, 2),
    // Mathematical
    f("ABS", "abs", Mathematical, 2),
    f("EXP", "exp", Mathematical, 3),
    f("LN", "ln", Mathematical, 3),
    f("LOG", "log", Mathematical, 3),
    f("MOD", "mod", Mathematical, 2),
    f("SQRT", "sqrt", Mathematical, 3),
    // String
    f("CONCAT", "concat", Str, 2),
    f("CONTAINS", "contains", Str, 3),
    f("ENDSWITH", "endsWith", Str, 2),
    f("LEFT", "left", Str, 2),
    f("LOCATE", "locate", Str, 2),
    f("LTRIM", "ltrim", Str, 2),
    f("PARSEDATE", "parseDate", Str, 3),
    f("PARSEDECIMAL", "parseDecimal", Str, 3),
    f("PARSEINT", "parseInt", Str, 3),
    f("PARSEJSON", "parseJson", Str, 4),
    f("REPLACE", "replace", Str, 2),
    f("RIGHT", "right", Str, 2),
    f("RTRIM", "rtrim", Str, 2),
    f("SPLIT", "split", Str, 2),
    f("STARTSWITH", "startsWith", Str, 2),
    f("STRLEN", "strlen", Str, 2),
    f("SUBSTRING", "substring", Str, 2),
    f("TOLOWER", "toLower", Str, 1),
    f("TOSTRING", "toString", Str, 1),
    f("TOUPPER", "toUpper", Str, 1),
    f("TRIM", "trim", Str, 2),
    // Table calculations
    f("DIFFERENCE", "difference", TableCalc, 5),
    f("LAG", "lag", TableCalc, 5),
    f("LEAD", "lead", TableCalc, 5),
    f("PERCENT_DIFFERENCE", "percentDifference", TableCalc, 5),
    f("AVG_OVER", "avgOver", TableCalc, 7),
    f("COUNT_OVER", "countOver", TableCalc, 7),
    f("DISTINCT_COUNT_OVER", "distinctCountOver", TableCalc, 7),
    f("MAX_OVER", "maxOver", TableCalc, 7),
    f("MIN_OVER", "minOver", TableCalc, 7),
    f("PERCENTILE_OVER", "percentileOver", TableCalc, 8),
    f("PERCENTILE_CONT_OVER", "percentileContOver", TableCalc, 8),
    f("PERCENTILE_DISC_OVER", "percentileDiscOver", TableCalc, 8),
    f("SUM_OVER", "sumOver", TableCalc, 7),
    f("STDEV_OVER", "stdevOver", TableCalc, 8),
    f("STDEVP_OVER", "stdevpOver", TableCalc, 8),
    f("VAR_OVER", "varOver", TableCalc, 8),
    f("VARP_OVER", "varpOver", TableCalc, 8),
    f("DENSERANK", "denseRank", TableCalc, 6),
    f("RANK", "rank", TableCalc, 6),
    f("PERCENTILERANK", "percentileRank", TableCalc, 6),
    f("RUNNINGAVG", "runningAvg", TableCalc, 7),
    f("RUNNINGCOUNT", "runningCount", TableCalc, 7),
    f("RUNNINGMAX", "runningMax", TableCalc, 7),
    f("RUNNINGMIN", "runningMin", TableCalc, 7),
    f("RUNNINGSUM", "runningSum", TableCalc, 7),
    f("FIRSTVALUE", "firstValue", TableCalc, 6),
    f("LASTVALUE", "lastValue", TableCalc, 6),
    f("WINDOWAVG", "windowAvg", TableCalc, 8),
    f("WINDOWCOUNT", "windowCount", TableCalc, 8),
    f("WINDOWMAX", "windowMax", TableCalc, 8),
    f("WINDOWMIN", "windowMin", TableCalc, 8),
    f("WINDOWSUM", "windowSum", TableCalc, 8),
];

/// Upper-cased canonical name → entry.
static BY_CANONICAL: LazyLock<HashMap<String, &'static FunctionEntry>> = LazyLock::new(|| {
    FUNCTIONS
        .iter()
        .map(|entry| (entry.canonical_name.to_ascii_uppercase(), entry))
        .collect()
});

/// Lower-cased DSL name → first entry declaring it.
static BY_DSL_NAME: LazyLock<HashMap<String, &'static FunctionEntry>> = LazyLock::new(|| {
    let mut index = HashMap::new();
    for entry in FUNCTIONS {
        index
            .entry(entry.dsl_name.to_ascii_lowercase())
            .or_insert(entry);
    }
    index
});

// =============================================================================
// Lookups
// =============================================================================

/// Find the catalog entry for a canonical or DSL function name (case-insensitive).
///
/// Canonical names win over DSL names, so `avg` resolves to `AVG` rather than
/// `AVG_LACA`.
pub fn find(name: &str) -> Option<&'static FunctionEntry> {
    BY_CANONICAL
        .get(&name.to_ascii_uppercase())
        .or_else(|| BY_DSL_NAME.get(&name.to_ascii_lowercase()))
        .copied()
}

/// Look up cost and category for a function. Never fails: unknown names get
/// cost [`DEFAULT_FUNCTION_COST`], no category, and keep their spelling.
pub fn lookup(name: &str) -> FunctionInfo {
    match find(name) {
        Some(entry) => FunctionInfo {
            canonical_name: entry.canonical_name.to_string(),
            category: Some(entry.category),
            cost: entry.cost,
            is_lac: entry.is_lac,
        },
        None => FunctionInfo {
            canonical_name: name.to_string(),
            category: None,
            cost: DEFAULT_FUNCTION_COST,
            is_lac: false,
        },
    }
}

/// Whether the function belongs to the least-aggregated-computation family.
pub fn is_least_aggregated_computation(name: &str) -> bool {
    find(name).is_some_and(|entry| entry.is_lac)
}

/// Resolve the catalog key the preprocessor rewrites a DSL call to.
///
/// DSL spellings are matched first (`maxOver` → `MAX_OVER`), then canonical
/// names, so already-canonical input passes through unchanged.
pub fn category_key_for(name: &str) -> Option<&'static str> {
    BY_DSL_NAME
        .get(&name.to_ascii_lowercase())
        .or_else(|| BY_CANONICAL.get(&name.to_ascii_uppercase()))
        .map(|entry| entry.canonical_name)
}
