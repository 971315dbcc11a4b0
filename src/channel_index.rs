//! Country index and filtering over a loaded channel list

use std::collections::BTreeSet;

use crate::countries::UNKNOWN;
use crate::models::{ChannelRecord, CountrySelector};

/// Sorted, duplicate-free known country codes (sentinel and blanks excluded)
pub fn distinct_countries(records: &[ChannelRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.country_code().trim())
        .filter(|code| !code.is_empty() && !code.eq_ignore_ascii_case(UNKNOWN))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Does `record` pass the country selector?
pub fn matches_country(record: &ChannelRecord, selector: &CountrySelector) -> bool {
    match selector {
        CountrySelector::All => true,
        CountrySelector::Unknown => record.has_unknown_country(),
        CountrySelector::Code(code) => {
            !record.has_unknown_country()
                && record.country_code().trim().eq_ignore_ascii_case(code.trim())
        }
    }
}

/// Records matching the selector and, when `query` is non-blank, containing it in their
/// title (case-insensitive). Original order is kept.
pub fn filter<'a>(
    records: &'a [ChannelRecord],
    query: &str,
    selector: &CountrySelector,
) -> Vec<&'a ChannelRecord> {
    let query = query.trim().to_lowercase();
    records
        .iter()
        .filter(|r| matches_country(r, selector))
        .filter(|r| query.is_empty() || r.title().to_lowercase().contains(&query))
        .collect()
}

/// Previous (`step < 0`) or next visible record relative to `current_url`, without wrapping.
/// With nothing current, the first visible record is returned.
pub fn adjacent<'a>(
    visible: &[&'a ChannelRecord],
    current_url: Option<&str>,
    step: isize,
) -> Option<&'a ChannelRecord> {
    let Some(current) = current_url.and_then(|url| visible.iter().position(|r| r.url() == url))
    else {
        return visible.first().copied();
    };
    let target = current.checked_add_signed(step)?;
    visible.get(target).copied()
}

/// Search text plus country choice, as entered in the browser
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelFilter {
    pub query: String,
    pub country: CountrySelector,
}

impl ChannelFilter {
    /// False when the filter would return the whole list unchanged
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty() || self.country != CountrySelector::All
    }
}

/// One loaded playlist, built in full before it replaces the previous one
#[derive(Debug, Clone, Default)]
pub struct ChannelIndex {
    channels: Vec<ChannelRecord>,
    countries: Vec<String>,
    has_unknown: bool,
}

impl ChannelIndex {
    pub fn new(channels: Vec<ChannelRecord>) -> Self {
        let countries = distinct_countries(&channels);
        let has_unknown = channels.iter().any(ChannelRecord::has_unknown_country);
        Self {
            channels,
            countries,
            has_unknown,
        }
    }

    pub fn channels(&self) -> &[ChannelRecord] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    /// Picker entries: All, then Unknown if any record lacks a country, then each code
    pub fn country_options(&self) -> Vec<CountrySelector> {
        let mut options = vec![CountrySelector::All];
        if self.has_unknown {
            options.push(CountrySelector::Unknown);
        }
        options.extend(self.countries.iter().cloned().map(CountrySelector::Code));
        options
    }

    pub fn filter(&self, f: &ChannelFilter) -> Vec<&ChannelRecord> {
        filter(&self.channels, &f.query, &f.country)
    }

    pub fn find_by_url(&self, url: &str) -> Option<&ChannelRecord> {
        self.channels.iter().find(|r| r.url() == url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countries::resolve;

    fn record(title: &str, url: &str, code: Option<&str>) -> ChannelRecord {
        ChannelRecord::new(
            title.to_string(),
            url.to_string(),
            code.and_then(resolve),
            String::new(),
        )
    }

    fn sample() -> Vec<ChannelRecord> {
        vec![
            record("CNN", "http://x/cnn", Some("US")),
            record("Das Erste", "http://x/de1", Some("DE")),
            record("Mystery", "http://x/m", None),
            record("Fox News", "http://x/fox", Some("US")),
            record("France 24", "http://x/f24", Some("FR")),
        ]
    }

    #[test]
    fn test_distinct_countries_sorted_unique() {
        let countries = distinct_countries(&sample());
        assert_eq!(countries, vec!["DE", "FR", "US"]);
        assert!(distinct_countries(&[]).is_empty());
    }

    #[test]
    fn test_unfiltered_returns_everything_in_order() {
        let records = sample();
        let all = filter(&records, "", &CountrySelector::All);
        assert_eq!(all.len(), records.len());
        assert!(all.iter().zip(records.iter()).all(|(a, b)| *a == b));
    }

    #[test]
    fn test_filter_by_country_and_query() {
        let records = sample();

        let us = filter(&records, "", &CountrySelector::Code("us".to_string()));
        assert_eq!(us.iter().map(|r| r.title()).collect::<Vec<_>>(), vec!["CNN", "Fox News"]);

        let unknown = filter(&records, "", &CountrySelector::Unknown);
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].title(), "Mystery");

        let news = filter(&records, "  NEWS ", &CountrySelector::All);
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].title(), "Fox News");

        let none = filter(&records, "news", &CountrySelector::Code("DE".to_string()));
        assert!(none.is_empty());
    }

    #[test]
    fn test_code_selector_never_matches_unknown_records() {
        let records = sample();
        let result = filter(&records, "", &CountrySelector::Code("Unknown".to_string()));
        assert!(result.is_empty());
    }

    #[test]
    fn test_country_options() {
        let index = ChannelIndex::new(sample());
        assert_eq!(
            index.country_options(),
            vec![
                CountrySelector::All,
                CountrySelector::Unknown,
                CountrySelector::Code("DE".to_string()),
                CountrySelector::Code("FR".to_string()),
                CountrySelector::Code("US".to_string()),
            ]
        );

        let known_only = ChannelIndex::new(vec![record("CNN", "http://x/cnn", Some("US"))]);
        assert_eq!(known_only.country_options().len(), 2);
    }

    #[test]
    fn test_filter_activity() {
        assert!(!ChannelFilter::default().is_active());
        let f = ChannelFilter { query: "  ".to_string(), country: CountrySelector::All };
        assert!(!f.is_active());
        let f = ChannelFilter { query: String::new(), country: CountrySelector::Unknown };
        assert!(f.is_active());
    }

    #[test]
    fn test_adjacent_navigation() {
        let records = sample();
        let visible = filter(&records, "", &CountrySelector::All);

        assert_eq!(adjacent(&visible, None, 1).unwrap().title(), "CNN");
        assert_eq!(adjacent(&visible, Some("http://x/cnn"), 1).unwrap().title(), "Das Erste");
        assert_eq!(adjacent(&visible, Some("http://x/de1"), -1).unwrap().title(), "CNN");
        assert!(adjacent(&visible, Some("http://x/cnn"), -1).is_none());
        assert!(adjacent(&visible, Some("http://x/f24"), 1).is_none());
        assert!(adjacent(&[], None, 1).is_none());
    }

    #[test]
    fn test_index_lookup() {
        let index = ChannelIndex::new(sample());
        assert_eq!(index.len(), 5);
        assert_eq!(index.countries(), &["DE", "FR", "US"]);
        assert_eq!(index.find_by_url("http://x/fox").unwrap().title(), "Fox News");
        assert!(index.find_by_url("http://nope").is_none());
    }
}
