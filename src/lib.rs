//! Calendar feed importer: turns the VEVENTs of an iCalendar document into
//! stored events, skipping duplicates and tagging each event with a space and
//! its functional areas.

pub mod calendar;
pub mod config;
pub mod db;
pub mod duplicates;
pub mod error;
pub mod fetch;
pub mod importer;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod text;

pub use error::{Error, FetchError, ImportError, ParseError};
pub use model::{Event, ImportOutcome};
pub use pipeline::{import_from_text, import_from_url};
