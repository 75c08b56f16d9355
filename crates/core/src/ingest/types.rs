use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const CLASSICAL: &str = "classical";

/// Upstream user document, reduced to the fields we read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub perfs: BTreeMap<String, Perf>,
}

/// Per-variant stats. Puzzle-style entries (`storm`, `racer`) carry no rating.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Perf {
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub games: Option<u32>,
    #[serde(default)]
    pub rd: Option<i32>,
    #[serde(default)]
    pub prog: Option<i32>,
    #[serde(default)]
    pub prov: Option<bool>,
}

impl Profile {
    pub fn rating_for(&self, variant: &str) -> Option<i32> {
        self.perfs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(variant))
            .and_then(|(_, perf)| perf.rating)
    }

    pub fn classical_rating(&self) -> Option<i32> {
        self.rating_for(CLASSICAL)
    }
}

/// One variant's rating-change events as `[year, month, day, rating]` tuples.
///
/// Components stay untyped so one bad tuple cannot fail the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantHistory {
    pub name: String,
    #[serde(default)]
    pub points: Vec<Vec<Value>>,
}

impl VariantHistory {
    pub fn is_classical(&self) -> bool {
        self.name.eq_ignore_ascii_case(CLASSICAL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopPlayersResponse {
    #[serde(default)]
    pub users: Vec<TopPlayer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopPlayer {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub title: Option<String>,
}
