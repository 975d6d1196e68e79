//! DSL preprocessor.
//!
//! Turns a raw calculation expression into generic SQL that a standard parser
//! accepts:
//!
//! ```text
//! maxOver({sales}, [{region}], PRE_FILTER)
//!     │ substitute references
//!     ▼
//! maxOver(`sales`, [`region`], PRE_FILTER)
//!     │ rewrite vendor calls
//!     ▼
//! MAX_OVER(`sales`) OVER (PARTITION BY `region`)
//!     │ wrap
//!     ▼
//! SELECT (MAX_OVER(`sales`) OVER (PARTITION BY `region`)) AS expr FROM DUAL
//! ```

mod preprocess;
mod rewrite;

pub use preprocess::{preprocess, rewrite_functions, substitute_references, wrap_select};
pub use rewrite::{rewrite_call, split_top_level, RewriteStrategy};
