use super::model::{AreaLink, DuplicateCandidate, StagedEvent};
use crate::model::{Event, FunctionalArea, ImportBatch, Space};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, Transaction};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

pub type Pool = SqlitePool;

// SQLite caps bound parameters per statement; keep every chunk well under it.
const INSERT_CHUNK: usize = 500;
const LOOKUP_CHUNK: usize = 400;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open database {normalized}"))?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory and non-sqlite URLs untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    // Always create the file; an import against a missing database should not fail.
    let mut rebuilt = format!("sqlite://{expanded_path}");
    match query_part {
        Some(q) if q.contains("mode=") => {
            rebuilt.push('?');
            rebuilt.push_str(q);
        }
        Some(q) => {
            rebuilt.push('?');
            rebuilt.push_str(q);
            rebuilt.push_str("&mode=rwc");
        }
        None => rebuilt.push_str("?mode=rwc"),
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn count_events(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Existing events whose title is in `titles` OR whose start is in `starts`.
#[instrument(skip_all, fields(titles = titles.len(), starts = starts.len()))]
pub async fn find_duplicate_candidates(
    tx: &mut Transaction<'_, Sqlite>,
    titles: &[String],
    starts: &[NaiveDateTime],
) -> Result<Vec<DuplicateCandidate>> {
    let rounds = titles.len().max(starts.len()).div_ceil(LOOKUP_CHUNK);
    let mut found = BTreeMap::new();

    for round in 0..rounds {
        let title_chunk = chunk_at(titles, round);
        let start_chunk = chunk_at(starts, round);

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, title, start_at FROM events WHERE ");
        if !title_chunk.is_empty() {
            qb.push("title IN (");
            {
                let mut sep = qb.separated(", ");
                for title in title_chunk {
                    sep.push_bind(title.clone());
                }
            }
            qb.push(")");
        }
        if !start_chunk.is_empty() {
            if !title_chunk.is_empty() {
                qb.push(" OR ");
            }
            qb.push("start_at IN (");
            {
                let mut sep = qb.separated(", ");
                for start in start_chunk {
                    sep.push_bind(*start);
                }
            }
            qb.push(")");
        }

        let rows = qb.build().fetch_all(&mut **tx).await?;
        for row in rows {
            let id: i64 = row.get("id");
            found.entry(id).or_insert_with(|| DuplicateCandidate {
                id,
                title: row.get("title"),
                start: row.get("start_at"),
            });
        }
    }

    Ok(found.into_values().collect())
}

fn chunk_at<T>(items: &[T], round: usize) -> &[T] {
    let from = (round * LOOKUP_CHUNK).min(items.len());
    let to = (from + LOOKUP_CHUNK).min(items.len());
    &items[from..to]
}

/// All spaces, ordered by id.
#[instrument(skip_all)]
pub async fn list_spaces(tx: &mut Transaction<'_, Sqlite>) -> Result<Vec<Space>> {
    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM spaces ORDER BY id")
        .fetch_all(&mut **tx)
        .await
        .context("failed to load spaces")?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| Space { id, name })
        .collect())
}

/// All functional areas, ordered by id.
#[instrument(skip_all)]
pub async fn list_functional_areas(
    tx: &mut Transaction<'_, Sqlite>,
) -> Result<Vec<FunctionalArea>> {
    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM functional_areas ORDER BY id")
            .fetch_all(&mut **tx)
            .await
            .context("failed to load functional areas")?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| FunctionalArea { id, name })
        .collect())
}

#[instrument(skip_all, fields(rows = events.len()))]
pub async fn insert_events(
    tx: &mut Transaction<'_, Sqlite>,
    events: &[StagedEvent],
) -> Result<u64> {
    let mut inserted = 0;
    for chunk in events.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO events (title, slug, start_at, end_at, space_id, description, bulk_id) ",
        );
        qb.push_values(chunk, |mut b, event| {
            b.push_bind(event.title.clone())
                .push_bind(event.slug.clone())
                .push_bind(event.start)
                .push_bind(event.end)
                .push_bind(event.space_id)
                .push_bind(event.description.clone())
                .push_bind(event.batch.id());
        });
        inserted += qb.build().execute(&mut **tx).await?.rows_affected();
    }
    debug!(inserted, "bulk inserted events");
    Ok(inserted)
}

/// Rows still tagged with `batch`, ordered by id. `functional_area_ids` is empty.
#[instrument(skip_all, fields(batch = batch.id()))]
pub async fn events_by_batch(
    tx: &mut Transaction<'_, Sqlite>,
    batch: ImportBatch,
) -> Result<Vec<Event>> {
    let rows = sqlx::query(
        "SELECT id, title, slug, start_at, end_at, space_id, description \
         FROM events WHERE bulk_id = ? ORDER BY id",
    )
    .bind(batch.id())
    .fetch_all(&mut **tx)
    .await?;

    rows.into_iter()
        .map(|row| -> Result<Event> {
            Ok(Event {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                slug: row.try_get("slug")?,
                start: row.try_get("start_at")?,
                end: row.try_get("end_at")?,
                space_id: row.try_get("space_id")?,
                description: row.try_get("description")?,
                functional_area_ids: Vec::new(),
            })
        })
        .collect()
}

#[instrument(skip_all, fields(rows = links.len()))]
pub async fn insert_area_links(
    tx: &mut Transaction<'_, Sqlite>,
    links: &[AreaLink],
) -> Result<u64> {
    let mut inserted = 0;
    for chunk in links.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO event_functional_areas (event_id, functional_area_id) ",
        );
        qb.push_values(chunk, |mut b, link| {
            b.push_bind(link.event_id).push_bind(link.functional_area_id);
        });
        inserted += qb.build().execute(&mut **tx).await?.rows_affected();
    }
    Ok(inserted)
}

/// Remove the correlation token from every row carrying it.
#[instrument(skip_all, fields(batch = batch.id()))]
pub async fn clear_batch(tx: &mut Transaction<'_, Sqlite>, batch: ImportBatch) -> Result<u64> {
    let res = sqlx::query("UPDATE events SET bulk_id = NULL WHERE bulk_id = ?")
        .bind(batch.id())
        .execute(&mut **tx)
        .await?;
    Ok(res.rows_affected())
}
