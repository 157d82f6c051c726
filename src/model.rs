use chrono::NaiveDateTime;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A persisted event as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub space_id: Option<i64>,
    pub description: String,
    pub functional_area_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Space {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionalArea {
    pub id: i64,
    pub name: String,
}

/// Names a candidate for substring matching.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for Space {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for FunctionalArea {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Correlation token stamped on every row inserted by one import run, so the
/// rows can be re-selected before their ids are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportBatch(i64);

impl ImportBatch {
    pub fn generate() -> Self {
        Self(rand::thread_rng().gen_range(1..i64::MAX))
    }

    pub fn from_raw(id: i64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> i64 {
        self.0
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    pub created: Vec<Event>,
    pub skipped: usize,
}
