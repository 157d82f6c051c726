//! Row models used by repositories.
//!
//! Keep these structs focused on the data written or returned by queries.
//! Business logic should live in higher layers.

use chrono::NaiveDateTime;

use crate::model::ImportBatch;

/// Event row staged for the bulk insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEvent {
    pub title: String,
    pub slug: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub space_id: Option<i64>,
    pub description: String,
    pub batch: ImportBatch,
}

/// Event-to-functional-area association row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaLink {
    pub event_id: i64,
    pub functional_area_id: i64,
}

/// Existing event returned by the duplicate lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCandidate {
    pub id: i64,
    pub title: String,
    pub start: NaiveDateTime,
}
