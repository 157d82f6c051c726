//! Conversion of iCalendar date values into the store's naive local timestamps.
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

const DATE_FORMAT: &str = "%Y%m%d";
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A DTSTART/DTEND value as written in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawDate {
    /// All-day value with no time component.
    Date(NaiveDate),
    /// Time anchored to a zone, either UTC (`Z` suffix) or a `TZID`.
    Zoned(DateTime<Tz>),
    /// Time with neither suffix nor `TZID`.
    Floating(NaiveDateTime),
}

impl RawDate {
    /// Parse a property value. `tzid` is the `TZID` parameter, `date_only` is
    /// set when the property carries `VALUE=DATE`.
    pub fn parse(value: &str, tzid: Option<&str>, date_only: bool) -> Result<Self> {
        let value = value.trim();
        if date_only || (value.len() == 8 && !value.contains('T')) {
            let date = NaiveDate::parse_from_str(value, DATE_FORMAT)
                .with_context(|| format!("invalid date value '{value}'"))?;
            return Ok(RawDate::Date(date));
        }

        if let Some(utc) = value.strip_suffix('Z') {
            let naive = NaiveDateTime::parse_from_str(utc, DATE_TIME_FORMAT)
                .with_context(|| format!("invalid UTC date-time value '{value}'"))?;
            return Ok(RawDate::Zoned(Tz::UTC.from_utc_datetime(&naive)));
        }

        let naive = NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
            .with_context(|| format!("invalid date-time value '{value}'"))?;
        match tzid {
            Some(name) => {
                let tz = resolve_tzid(name)?;
                let zoned = tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
                    anyhow!("local time {naive} does not exist in time zone {name}")
                })?;
                Ok(RawDate::Zoned(zoned))
            }
            None => Ok(RawDate::Floating(naive)),
        }
    }
}

fn resolve_tzid(name: &str) -> Result<Tz> {
    let cleaned = name.trim().trim_matches('"');
    if cleaned.is_empty() {
        bail!("empty TZID parameter");
    }
    cleaned
        .parse::<Tz>()
        .map_err(|_| anyhow!("unknown time zone '{cleaned}'"))
}

/// Convert `raw` into a naive timestamp expressed in `zone`.
///
/// All-day values are taken as UTC midnight before conversion. Floating times
/// are assumed to already be local to `zone` and pass through untouched, which
/// keeps the function idempotent on stored values.
pub fn normalize(raw: RawDate, zone: Tz) -> NaiveDateTime {
    match raw {
        RawDate::Date(date) => {
            let midnight = date.and_time(NaiveTime::MIN);
            Tz::UTC
                .from_utc_datetime(&midnight)
                .with_timezone(&zone)
                .naive_local()
        }
        RawDate::Zoned(dt) => dt.with_timezone(&zone).naive_local(),
        RawDate::Floating(naive) => naive,
    }
}
