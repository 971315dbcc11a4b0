//! Data models for Enhanced TV

use crate::countries::{Country, UNKNOWN};

/// Title used when a metadata line carries no usable display name
pub const DEFAULT_TITLE: &str = "Unknown Channel";

/// One playable playlist entry. Immutable once built; a reload produces fresh records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    title: String,
    url: String,
    country_code: String,
    country_name: String,
    logo_url: String,
}

impl ChannelRecord {
    /// Both country fields come from the same `Option`, so either both are the
    /// `"Unknown"` sentinel or neither is.
    pub fn new(title: String, url: String, country: Option<Country>, logo_url: String) -> Self {
        let (country_code, country_name) = match country {
            Some(c) => (c.code, c.name),
            None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
        };
        Self {
            title,
            url,
            country_code,
            country_name,
            logo_url,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn country_name(&self) -> &str {
        &self.country_name
    }

    pub fn logo_url(&self) -> &str {
        &self.logo_url
    }

    /// True when no country signal resolved (blank codes count as unknown too)
    pub fn has_unknown_country(&self) -> bool {
        let code = self.country_code.trim();
        code.is_empty() || code.eq_ignore_ascii_case(UNKNOWN)
    }
}

/// Country filter choice offered by the channel browser
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CountrySelector {
    #[default]
    All,
    Unknown,
    Code(String),
}

impl CountrySelector {
    /// Label shown in the country picker
    pub fn label(&self) -> String {
        match self {
            CountrySelector::All => "All Countries".to_string(),
            CountrySelector::Unknown => UNKNOWN.to_string(),
            CountrySelector::Code(code) => match crate::countries::country_name(code) {
                Some(name) => format!("{} - {}", code, name),
                None => code.clone(),
            },
        }
    }

    /// Inverse of the persisted form: "All Countries"/"" -> All, "Unknown" -> Unknown,
    /// a code or a full country name -> Code
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("All Countries") {
            CountrySelector::All
        } else if value.eq_ignore_ascii_case(UNKNOWN) {
            CountrySelector::Unknown
        } else if let Some(code) = crate::countries::country_code(value) {
            CountrySelector::Code(code.to_string())
        } else {
            CountrySelector::Code(value.to_uppercase())
        }
    }

    /// Persisted form, read back by [`CountrySelector::parse`]
    pub fn as_setting(&self) -> String {
        match self {
            CountrySelector::All => String::new(),
            CountrySelector::Unknown => UNKNOWN.to_string(),
            CountrySelector::Code(code) => code.clone(),
        }
    }
}
