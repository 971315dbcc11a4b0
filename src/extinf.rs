//! EXTINF metadata extraction: title, logo and a best-effort country guess

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::countries::{self, Country};
use crate::error::ParseEntryError;
use crate::models::{ChannelRecord, DEFAULT_TITLE};

/// Case-sensitive leading token of a metadata line
pub const EXTINF_MARKER: &str = "#EXTINF:";

/// Titles longer than this (in characters) are cut
pub const MAX_TITLE_CHARS: usize = 200;

struct Patterns {
    tvg_country_quoted: Regex,
    tvg_country_bare: Regex,
    group_title: Regex,
    tvg_logo: Regex,
    title_bracket: Regex,
    title_paren: Regex,
    title_paren_strip: Regex,
    title_colon: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    tvg_country_quoted: Regex::new(r#"(?i)tvg-country="([^"]*)""#).unwrap(),
    tvg_country_bare: Regex::new(r"(?i)tvg-country=([A-Z]{2})").unwrap(),
    group_title: Regex::new(r#"(?i)group-title="([^"]*)""#).unwrap(),
    tvg_logo: Regex::new(r#"(?i)tvg-logo="([^"]*)""#).unwrap(),
    title_bracket: Regex::new(r"^\[([A-Z]{2})\]\s*(.*)$").unwrap(),
    title_paren: Regex::new(r"\(([A-Z]{2})\)").unwrap(),
    title_paren_strip: Regex::new(r"\s*\([A-Z]{2}\)").unwrap(),
    title_colon: Regex::new(r"^([A-Z]{2}):\s*(.*)$").unwrap(),
});

/// What one metadata line tells us about its channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtinfInfo {
    pub title: String,
    pub country: Option<Country>,
    pub logo: String,
}

impl Default for ExtinfInfo {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            country: None,
            logo: String::new(),
        }
    }
}

impl ExtinfInfo {
    pub fn into_record(self, url: String) -> ChannelRecord {
        ChannelRecord::new(self.title, url, self.country, self.logo)
    }
}

/// Parse one `#EXTINF:` line. Never fails: a malformed line is logged and whatever was
/// extracted before the problem is returned, with defaults for the rest.
pub fn parse_extinf(line: &str) -> ExtinfInfo {
    let mut info = ExtinfInfo::default();
    if let Err(e) = fill_info(line, &mut info) {
        warn!(error = %e, line = %line, "Malformed EXTINF entry, using partial metadata");
    }
    info
}

fn fill_info(line: &str, info: &mut ExtinfInfo) -> Result<(), ParseEntryError> {
    if !line.starts_with(EXTINF_MARKER) {
        return Err(ParseEntryError::MissingMarker);
    }

    if let Some(title) = title_from_line(line) {
        info.title = title;
    }

    let logo = quoted_attribute(&PATTERNS.tvg_logo, line, "tvg-logo");
    if let Ok(Some(logo)) = &logo {
        info.logo = logo.to_string();
    }

    info.country = infer_country(line, &mut info.title);
    logo.map(|_| ())
}

/// Display title: text after the first comma, unquoted and capped
fn title_from_line(line: &str) -> Option<String> {
    let (_, raw) = line.split_once(',')?;
    let cleaned = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.chars().take(MAX_TITLE_CHARS).collect())
}

/// Value of a `key="value"` attribute. A key whose opening quote is never closed is an error.
fn quoted_attribute<'a>(
    pattern: &Regex,
    line: &'a str,
    key: &'static str,
) -> Result<Option<&'a str>, ParseEntryError> {
    if let Some(value) = pattern.captures(line).and_then(|c| c.get(1)) {
        return Ok(Some(value.as_str()));
    }
    if line.to_ascii_lowercase().contains(&format!("{}=\"", key)) {
        return Err(ParseEntryError::UnterminatedAttribute(key));
    }
    Ok(None)
}

/// Country fallback chain; the first signal that resolves wins.
/// May rewrite `title` when the country came from a title prefix or suffix.
fn infer_country(line: &str, title: &mut String) -> Option<Country> {
    if let Some(country) = country_attribute(line) {
        return Some(country);
    }

    let group = lenient_attribute(&PATTERNS.group_title, line, "group-title");
    if let Some(country) = group.and_then(countries::detect_from_text) {
        return Some(country);
    }

    if let Some(country) = country_from_title(title) {
        return Some(country);
    }

    countries::detect_from_text(title)
}

/// An unterminated attribute carries no value; it is logged and the chain moves on
fn lenient_attribute<'a>(pattern: &Regex, line: &'a str, key: &'static str) -> Option<&'a str> {
    match quoted_attribute(pattern, line, key) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, line = %line, "Ignoring malformed attribute");
            None
        }
    }
}

/// `tvg-country="US;CA"` (first usable code) or bare `tvg-country=US`
fn country_attribute(line: &str) -> Option<Country> {
    let value = lenient_attribute(&PATTERNS.tvg_country_quoted, line, "tvg-country").or_else(|| {
        PATTERNS
            .tvg_country_bare
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    });
    value.and_then(|v| v.split(';').find_map(countries::resolve))
}

/// `[XX] Name`, then `Name (XX)`, then `XX: Name`. Only the first shape present is tried.
fn country_from_title(title: &mut String) -> Option<Country> {
    let patterns = &*PATTERNS;

    if let Some((code, rest)) = prefix_parts(&patterns.title_bracket, title) {
        let country = countries::resolve(&code)?;
        *title = title_or_default(rest);
        return Some(country);
    }

    if title.contains('(') && title.contains(')') {
        let code = patterns.title_paren.captures(title)?.get(1)?.as_str().to_string();
        let country = countries::resolve(&code)?;
        let stripped = patterns.title_paren_strip.replace_all(title, "").trim().to_string();
        *title = title_or_default(stripped);
        return Some(country);
    }

    if title.contains(':') {
        let (code, rest) = prefix_parts(&patterns.title_colon, title)?;
        let country = countries::resolve(&code)?;
        *title = title_or_default(rest);
        return Some(country);
    }

    None
}

/// Code and trimmed remainder of a `code + rest` title pattern
fn prefix_parts(pattern: &Regex, title: &str) -> Option<(String, String)> {
    let caps = pattern.captures(title)?;
    Some((caps[1].to_string(), caps[2].trim().to_string()))
}

fn title_or_default(title: String) -> String {
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

#[cfg(test)]
#[path = "extinf_tests.rs"]
mod tests;
