//! Database module: row models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: rows written by the importer and slices read back for it.
//! - `repo`: SQL-only functions over the importer's open transaction.
//!
//! External modules should import from `ical_ingest::db`; the repository API
//! is re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{AreaLink, DuplicateCandidate, StagedEvent};
