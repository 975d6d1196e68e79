//! Function catalog for the calculation DSL.
//!
//! A fixed table shared by the preprocessor (to pick a rewrite strategy) and
//! the cost visitor (to price each function call). Lookups never fail: unknown
//! functions cost [`DEFAULT_FUNCTION_COST`].

mod docs;
mod functions;

pub use docs::{DocLinkResolver, NoDocLinks, StaticDocLinks, DEFAULT_DOCS_BASE_URL};
pub use functions::{
    category_key_for, find, is_least_aggregated_computation, lookup, FunctionCategory,
    FunctionEntry, FunctionInfo, DEFAULT_FUNCTION_COST, FUNCTIONS,
};
