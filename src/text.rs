//! Small text transformations applied while staging events.
use chrono::NaiveDateTime;
use quick_xml::escape::unescape;
use std::collections::HashMap;

/// Decode HTML entities (`&amp;`, `&eacute;`, `&#39;`, ...) one at a time.
/// An `&` that does not start a known `;`-terminated entity is kept as is.
pub fn unescape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail[1..]
            .find(|c: char| c == ';' || c == '&' || c.is_whitespace())
            .filter(|&end| tail.as_bytes()[end + 1] == b';')
            .and_then(|end| {
                let entity = &tail[..end + 2];
                unescape(entity)
                    .ok()
                    .map(|text| (text.into_owned(), entity.len()))
            });
        match decoded {
            Some((text, used)) => {
                out.push_str(&text);
                rest = &tail[used..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Keep at most `max` characters of `title`.
pub fn truncate_title(title: &str, max: usize) -> String {
    match title.char_indices().nth(max) {
        Some((idx, _)) => title[..idx].to_string(),
        None => title.to_string(),
    }
}

/// URL-safe identifier derived from the title and the local start date.
pub fn slugify(title: &str, start: NaiveDateTime) -> String {
    let mut out = String::with_capacity(title.len() + 11);
    let mut last_dash = false;
    for ch in title.chars() {
        let c = ch.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    let trimmed = out.trim_end_matches('-');
    let base = if trimmed.is_empty() { "event" } else { trimmed };
    format!("{}-{}", base, start.format("%Y-%m-%d"))
}

/// Slugs handed out during one import. A repeat gets `-2`, `-3`, ... appended.
#[derive(Debug, Default)]
pub struct SlugSet {
    seen: HashMap<String, u32>,
}

impl SlugSet {
    pub fn claim(&mut self, slug: String) -> String {
        let count = self.seen.entry(slug.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            slug
        } else {
            format!("{slug}-{count}")
        }
    }
}
