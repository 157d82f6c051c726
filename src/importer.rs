//! Bulk creation of events from a parsed calendar.
//!
//! Everything from duplicate detection to clearing the correlation token runs
//! inside one transaction. The run either commits every surviving event with
//! its functional-area links or rolls back and leaves the store untouched.
use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;
use sqlx::{Sqlite, Transaction};
use tracing::{info, instrument, warn};

use crate::calendar::{Calendar, CalendarEvent};
use crate::config::ImportSettings;
use crate::db::{self, AreaLink, Pool, StagedEvent};
use crate::duplicates::{self, DuplicateFilter};
use crate::error::ImportError;
use crate::matcher::{guess_functional_areas, guess_space};
use crate::model::{ImportBatch, ImportOutcome, Space};
use crate::normalize::normalize;
use crate::text::{slugify, truncate_title, unescape_html, SlugSet};

/// A calendar event with its text cleaned and its times in the store's zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    /// Title exactly as it will be stored: unescaped, then truncated.
    pub title: String,
    pub start: NaiveDateTime,
    pub location: String,
    pub description: String,
}

impl IncomingEvent {
    pub fn prepare(event: &CalendarEvent, settings: &ImportSettings) -> Self {
        let title = truncate_title(&unescape_html(&event.title), settings.max_title_length);
        Self {
            title,
            start: normalize(event.start, settings.time_zone),
            location: event.location.clone().unwrap_or_default(),
            description: event
                .description
                .as_deref()
                .map(unescape_html)
                .unwrap_or_default(),
        }
    }

    fn stage(
        self,
        end: NaiveDateTime,
        spaces: &[Space],
        slugs: &mut SlugSet,
        batch: ImportBatch,
    ) -> StagedEvent {
        let space_id = guess_space(&self.location, spaces).map(|s| s.id);
        StagedEvent {
            slug: slugs.claim(slugify(&self.title, self.start)),
            title: self.title,
            start: self.start,
            end,
            space_id,
            description: self.description,
            batch,
        }
    }
}

trait DuringOperation<T> {
    fn during(self, operation: &'static str) -> Result<T, ImportError>;
}

impl<T, E: Into<anyhow::Error>> DuringOperation<T> for Result<T, E> {
    fn during(self, operation: &'static str) -> Result<T, ImportError> {
        self.map_err(|e| ImportError::new(operation, e.into()))
    }
}

/// Create every non-duplicate event of `calendar` in a single transaction.
#[instrument(skip_all, fields(events = calendar.len()))]
pub async fn import_calendar(
    pool: &Pool,
    calendar: &Calendar,
    settings: &ImportSettings,
) -> Result<ImportOutcome, ImportError> {
    let mut tx = pool
        .begin()
        .await
        .during("opening the import transaction")?;

    match bulk_create_events(&mut tx, calendar, settings).await {
        Ok(outcome) => {
            tx.commit().await.during("committing imported events")?;
            info!(
                created = outcome.created.len(),
                skipped = outcome.skipped,
                "calendar import committed"
            );
            Ok(outcome)
        }
        Err(err) => {
            match tx.rollback().await {
                Ok(()) => warn!(error = %err, "calendar import rolled back"),
                Err(rb) => warn!(error = %err, rollback_error = %rb, "calendar import rollback failed"),
            }
            Err(err)
        }
    }
}

async fn bulk_create_events(
    tx: &mut Transaction<'_, Sqlite>,
    calendar: &Calendar,
    settings: &ImportSettings,
) -> Result<ImportOutcome, ImportError> {
    let raw_events: Vec<_> = calendar.walk_events().collect();
    let incoming = raw_events
        .iter()
        .map(|raw| CalendarEvent::from_vevent(raw).map(|e| IncomingEvent::prepare(&e, settings)))
        .collect::<anyhow::Result<Vec<_>>>()
        .during("reading calendar events")?;

    let existing = duplicates::find_duplicates(tx, &incoming)
        .await
        .during("looking up duplicate events")?;
    let filter = DuplicateFilter::new(&existing);
    let spaces = db::list_spaces(tx).await.during("loading spaces")?;

    let batch = ImportBatch::generate();
    let mut skipped = 0;
    let mut slugs = SlugSet::default();
    let mut staged = Vec::with_capacity(incoming.len());
    for (event, raw) in incoming.into_iter().zip(raw_events) {
        if filter.is_duplicate(&event) {
            skipped += 1;
            continue;
        }
        let end = raw
            .end()
            .with_context(|| format!("event '{}'", event.title))
            .during("reading calendar events")?;
        let end = normalize(end, settings.time_zone);
        staged.push(event.stage(end, &spaces, &mut slugs, batch));
    }

    if staged.is_empty() {
        return Ok(ImportOutcome {
            created: Vec::new(),
            skipped,
        });
    }

    db::insert_events(tx, &staged)
        .await
        .during("bulk inserting events")?;
    let mut created = db::events_by_batch(tx, batch)
        .await
        .during("reading back inserted events")?;
    if created.len() != staged.len() {
        return Err(ImportError::new(
            "reading back inserted events",
            anyhow!(
                "batch {} matched {} rows, expected {}",
                batch.id(),
                created.len(),
                staged.len()
            ),
        ));
    }

    let areas = db::list_functional_areas(tx)
        .await
        .during("loading functional areas")?;
    let mut links = Vec::new();
    for event in &mut created {
        for area in guess_functional_areas(&event.description, &areas) {
            links.push(AreaLink {
                event_id: event.id,
                functional_area_id: area.id,
            });
            event.functional_area_ids.push(area.id);
        }
    }
    if !links.is_empty() {
        db::insert_area_links(tx, &links)
            .await
            .during("bulk tagging functional areas")?;
    }

    db::clear_batch(tx, batch)
        .await
        .during("clearing the import batch token")?;

    Ok(ImportOutcome { created, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::RawDate;
    use chrono_tz::Tz;

    fn settings(max: usize) -> ImportSettings {
        ImportSettings::new(Tz::UTC, max)
    }

    fn event(title: &str, description: Option<&str>) -> CalendarEvent {
        CalendarEvent {
            title: title.to_string(),
            start: RawDate::parse("20240301", None, true).unwrap(),
            location: Some("Room A Annex, building 2".into()),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn prepare_unescapes_then_truncates() {
        let prepared = IncomingEvent::prepare(&event("R&amp;D all-hands", None), &settings(5));
        assert_eq!(prepared.title, "R&D a");
        assert_eq!(prepared.description, "");
        assert_eq!(prepared.start.to_string(), "2024-03-01 00:00:00");
    }

    #[test]
    fn stage_guesses_space_and_builds_slug() {
        let spaces = vec![
            Space {
                id: 10,
                name: "Room A".into(),
            },
            Space {
                id: 11,
                name: "Room A Annex".into(),
            },
        ];
        let batch = ImportBatch::from_raw(5);
        let end = NaiveDateTime::parse_from_str("2024-03-02 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let mut slugs = SlugSet::default();
        let prepared =
            IncomingEvent::prepare(&event("Launch party", Some("cake &amp; music")), &settings(120));
        let staged = prepared.clone().stage(end, &spaces, &mut slugs, batch);
        assert_eq!(staged.space_id, Some(10));
        assert_eq!(staged.slug, "launch-party-2024-03-01");
        assert_eq!(staged.description, "cake & music");
        assert_eq!(staged.end, end);
        assert_eq!(staged.batch, batch);

        let again = prepared.stage(end, &spaces, &mut slugs, batch);
        assert_eq!(again.slug, "launch-party-2024-03-01-2");
    }
}
