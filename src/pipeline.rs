//! Entry points sequencing fetch, parse, and bulk import.
use tracing::{info, instrument};

use crate::calendar;
use crate::config::ImportSettings;
use crate::db::Pool;
use crate::error::Result;
use crate::fetch::CalendarSource;
use crate::importer::import_calendar;
use crate::model::ImportOutcome;

/// Import raw iCalendar text.
#[instrument(skip_all)]
pub async fn import_from_text(
    pool: &Pool,
    data: &str,
    settings: &ImportSettings,
) -> Result<ImportOutcome> {
    let calendar = calendar::parse(&calendar::sanitize(data))?;
    Ok(import_calendar(pool, &calendar, settings).await?)
}

/// Fetch `url` through `source` and import the result.
#[instrument(skip(pool, source, settings))]
pub async fn import_from_url(
    pool: &Pool,
    source: &dyn CalendarSource,
    url: &str,
    settings: &ImportSettings,
) -> Result<ImportOutcome> {
    let data = source.fetch(url).await?;
    info!(bytes = data.len(), "calendar fetched");
    import_from_text(pool, &data, settings).await
}
