//! Sanitizing and parsing of iCalendar text into VEVENT records.
use anyhow::{anyhow, Context, Result};
use ical::IcalParser;
use std::io::BufReader;
use tracing::{debug, instrument};

use crate::error::ParseError;
use crate::normalize::RawDate;

/// Control character emitted by one upstream feed producer that breaks parsing.
const FILE_SEPARATOR: char = '\u{1c}';

/// One property line of a VEVENT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub params: Vec<(String, Vec<String>)>,
    pub value: String,
}

impl Property {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// Raw VEVENT: its properties in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VEvent {
    properties: Vec<Property>,
}

impl VEvent {
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    /// First property called `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(|p| unescape_text(&p.value))
    }

    /// DTEND of the event. Read separately so duplicates are skipped before
    /// their end time is ever looked at.
    pub fn end(&self) -> Result<RawDate> {
        self.date("DTEND")
    }

    fn date(&self, name: &str) -> Result<RawDate> {
        let prop = self
            .get(name)
            .ok_or_else(|| anyhow!("event is missing {name}"))?;
        let date_only = prop
            .param("VALUE")
            .is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
        RawDate::parse(&prop.value, prop.param("TZID"), date_only)
            .with_context(|| format!("invalid {name}"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Calendar {
    events: Vec<VEvent>,
}

impl Calendar {
    /// Every VEVENT across all VCALENDAR components, in document order.
    pub fn walk_events(&self) -> impl Iterator<Item = &VEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Typed view of a VEVENT carrying the fields the importer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub title: String,
    pub start: RawDate,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl CalendarEvent {
    pub fn from_vevent(event: &VEvent) -> Result<Self> {
        let title = event
            .text("SUMMARY")
            .ok_or_else(|| anyhow!("event is missing SUMMARY"))?;
        let start = event
            .date("DTSTART")
            .with_context(|| format!("event '{title}'"))?;
        Ok(Self {
            title,
            start,
            location: event.text("LOCATION"),
            description: event.text("DESCRIPTION"),
        })
    }
}

/// Strip byte sequences known to break the parser.
pub fn sanitize(data: &str) -> String {
    data.replace(FILE_SEPARATOR, "")
}

/// Parse iCalendar text. Call [`sanitize`] first for untrusted feeds.
#[instrument(skip_all)]
pub fn parse(data: &str) -> Result<Calendar, ParseError> {
    let reader = IcalParser::new(BufReader::new(data.as_bytes()));
    let mut calendars = 0usize;
    let mut events = Vec::new();
    for calendar in reader {
        let calendar = calendar.map_err(|e| ParseError::Malformed(e.to_string()))?;
        calendars += 1;
        events.extend(calendar.events.into_iter().map(|event| {
            VEvent::new(
                event
                    .properties
                    .into_iter()
                    .map(|p| Property {
                        name: p.name,
                        params: p.params.unwrap_or_default(),
                        value: p
                            .value
                            .unwrap_or_default()
                            .trim_end_matches('\r')
                            .to_string(),
                    })
                    .collect(),
            )
        }));
    }
    if calendars == 0 {
        return Err(ParseError::NoCalendar);
    }
    debug!(calendars, events = events.len(), "parsed calendar data");
    Ok(Calendar { events })
}

/// Undo RFC 5545 TEXT escaping.
fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Example//Feed//EN\r\n\
BEGIN:VEVENT\r\n\
UID:1@example.org\r\n\
SUMMARY:Design review\\, round 2\r\n\
DTSTART;TZID=Europe/Paris:20240115T090000\r\n\
DTEND;TZID=Europe/Paris:20240115T100000\r\n\
LOCATION:Room A Annex\r\n\
DESCRIPTION:Line one\\nLine two\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:2@example.org\r\n\
SUMMARY:Offsite\r\n\
DTSTART;VALUE=DATE:20240301\r\n\
DTEND;VALUE=DATE:20240302\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn sanitize_strips_file_separator() {
        assert_eq!(sanitize("SUMMARY:a\u{1c}b"), "SUMMARY:ab");
        assert_eq!(sanitize("clean"), "clean");
    }

    #[test]
    fn walks_all_vevents() {
        let cal = parse(FEED).unwrap();
        assert_eq!(cal.len(), 2);
        let first = cal.walk_events().next().unwrap();
        assert!(first.get("summary").unwrap().value.starts_with("Design review"));
        assert_eq!(first.get("DTSTART").unwrap().param("tzid"), Some("Europe/Paris"));
    }

    #[test]
    fn typed_event_unescapes_text_and_reads_dates() {
        let cal = parse(FEED).unwrap();
        let events: Vec<CalendarEvent> = cal
            .walk_events()
            .map(|e| CalendarEvent::from_vevent(e).unwrap())
            .collect();
        assert_eq!(events[0].title, "Design review, round 2");
        assert_eq!(events[0].description.as_deref(), Some("Line one\nLine two"));
        assert_eq!(events[0].location.as_deref(), Some("Room A Annex"));
        assert!(matches!(events[0].start, RawDate::Zoned(_)));
        assert!(matches!(events[1].start, RawDate::Date(_)));
        assert!(events[1].location.is_none());
    }

    #[test]
    fn missing_summary_is_reported() {
        let event = VEvent::new(vec![Property {
            name: "DTSTART".into(),
            params: vec![],
            value: "20240301T100000Z".into(),
        }]);
        let err = CalendarEvent::from_vevent(&event).unwrap_err();
        assert!(err.to_string().contains("SUMMARY"));
    }

    #[test]
    fn end_is_read_on_demand() {
        let event = VEvent::new(vec![
            Property {
                name: "SUMMARY".into(),
                params: vec![],
                value: "No end".into(),
            },
            Property {
                name: "DTSTART".into(),
                params: vec![],
                value: "20240301T100000Z".into(),
            },
        ]);
        assert!(CalendarEvent::from_vevent(&event).is_ok());
        let err = event.end().unwrap_err();
        assert!(err.to_string().contains("DTEND"));
    }

    #[test]
    fn text_without_calendar_is_rejected() {
        assert!(matches!(parse(""), Err(ParseError::NoCalendar)));
    }

    #[test]
    fn unescapes_backslash_sequences() {
        assert_eq!(unescape_text(r"a\;b\,c\\d\Ne"), "a;b,c\\d\ne");
        assert_eq!(unescape_text("trailing\\"), "trailing\\");
    }
}
