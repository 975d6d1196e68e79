//! Data model: expressions and the request bundles they arrive in.

mod expression;
mod request;

pub use expression::{Expression, ExpressionKind, CUSTOM_AGGREGATION};
pub use request::{
    Badges, DatasetCalculatedColumn, DisplayNames, ExplorationType, RawExpression, RequestBundle,
};
