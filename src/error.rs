//! Error taxonomy surfaced by the import pipeline.
use reqwest::StatusCode;
use thiserror::Error;

/// Retrieving the calendar text failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("URL error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP error fetching {url}: {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("response body from {url} is not valid UTF-8")]
    Decode { url: String },
}

/// The calendar text could not be parsed.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("error parsing icalendar data, the file may contain invalid characters: {0}")]
    Malformed(String),
    #[error("no VCALENDAR component found in icalendar data")]
    NoCalendar,
}

/// Any failure while detecting duplicates, matching, or persisting a batch.
#[derive(Debug, Error)]
#[error("an error occurred while {operation}: {source}")]
pub struct ImportError {
    pub operation: &'static str,
    #[source]
    pub source: anyhow::Error,
}

impl ImportError {
    pub fn new(operation: &'static str, source: anyhow::Error) -> Self {
        Self { operation, source }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Import(#[from] ImportError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn import_error_names_operation_and_cause() {
        let err = ImportError::new("bulk inserting events", anyhow!("disk full"));
        let msg = err.to_string();
        assert!(msg.contains("bulk inserting events"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn status_error_carries_code() {
        let err = FetchError::Status {
            url: "https://example.org/feed.ics".into(),
            status: StatusCode::NOT_FOUND,
        };
        assert!(err.to_string().contains("404"));
        let top: Error = err.into();
        assert!(matches!(top, Error::Fetch(FetchError::Status { .. })));
    }
}
