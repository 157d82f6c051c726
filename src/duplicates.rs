//! Duplicate detection against events already in the store.
//!
//! The lookup is deliberately broad: an existing event is a candidate when its
//! title matches any incoming title OR its start matches any incoming start.
//! The skip decision then compares titles only.
use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::{Sqlite, Transaction};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, instrument};

use crate::db::{self, DuplicateCandidate};
use crate::importer::IncomingEvent;

/// Existing events that may duplicate something in `incoming`.
#[instrument(skip_all, fields(incoming = incoming.len()))]
pub async fn find_duplicates(
    tx: &mut Transaction<'_, Sqlite>,
    incoming: &[IncomingEvent],
) -> Result<Vec<DuplicateCandidate>> {
    if incoming.is_empty() {
        return Ok(Vec::new());
    }
    let titles: Vec<String> = incoming
        .iter()
        .map(|e| e.title.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let starts: Vec<NaiveDateTime> = incoming
        .iter()
        .map(|e| e.start)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let candidates = db::find_duplicate_candidates(tx, &titles, &starts).await?;
    debug!(candidates = candidates.len(), "duplicate candidates loaded");
    Ok(candidates)
}

/// Title-equality filter built from the duplicate candidates.
#[derive(Debug, Clone, Default)]
pub struct DuplicateFilter {
    titles: HashSet<String>,
}

impl DuplicateFilter {
    pub fn new(existing: &[DuplicateCandidate]) -> Self {
        Self {
            titles: existing.iter().map(|c| c.title.clone()).collect(),
        }
    }

    pub fn is_duplicate(&self, event: &IncomingEvent) -> bool {
        self.titles.contains(&event.title)
    }
}
