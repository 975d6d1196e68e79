//! Anomaly tags.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag attached to a node. Variants are declared in display priority order,
/// so a [`TagSet`] iterates from most to least prominent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tag {
    LongDuration,
    HighCost,
    ParsingError,
}

impl Tag {
    /// Display priority, lower first.
    pub fn priority(self) -> u8 {
        match self {
            Tag::LongDuration => 1,
            Tag::HighCost => 2,
            Tag::ParsingError => 3,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::LongDuration => "longDuration",
            Tag::HighCost => "highCost",
            Tag::ParsingError => "parsingError",
        };
        f.write_str(name)
    }
}

pub type TagSet = BTreeSet<Tag>;
