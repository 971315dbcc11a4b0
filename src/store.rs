//! Persistent favorites and remembered settings.
//!
//! Both stores own their in-memory copy exclusively. Mutators only touch memory; callers
//! invoke `persist()` afterwards, which sanitizes and writes the file. Unreadable or
//! malformed files load as defaults and are rewritten cleanly on the next save.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::config_file;
use crate::error::StoreError;

pub const DEFAULT_VOLUME: u8 = 100;
pub const MAX_VOLUME: i64 = 100;

/// Read a JSON file; a missing file is `Ok(None)`
fn read_json(path: &Path) -> Result<Option<Value>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

/// Load a store file, downgrading any failure to "no data"
fn load_or_default(path: &Path, what: &str) -> Value {
    match read_json(path) {
        Ok(Some(value)) => value,
        Ok(None) => Value::Null,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt {} file, starting fresh", what);
            Value::Null
        }
    }
}

fn is_valid_url(url: &str) -> bool {
    !url.trim().is_empty()
}

/// Favorited stream URLs, stored as a JSON array of strings
#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    favorites: BTreeSet<String>,
}

impl FavoritesStore {
    pub fn open_default() -> Self {
        Self::open(config_file("favorites.json"))
    }

    pub fn open(path: PathBuf) -> Self {
        let value = load_or_default(&path, "favorites");
        let favorites = favorites_from_json(&value);
        debug!(path = %path.display(), count = favorites.len(), "Favorites loaded");
        Self { path, favorites }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.favorites.contains(url)
    }

    /// Blank URLs are rejected. Returns whether the set changed.
    pub fn insert(&mut self, url: &str) -> bool {
        is_valid_url(url) && self.favorites.insert(url.to_string())
    }

    pub fn remove(&mut self, url: &str) -> bool {
        self.favorites.remove(url)
    }

    /// Flip membership; returns the new state
    pub fn toggle(&mut self, url: &str) -> bool {
        if self.remove(url) {
            false
        } else {
            self.insert(url)
        }
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.favorites.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.favorites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty()
    }

    pub fn sanitize(&mut self) {
        self.favorites.retain(|url| is_valid_url(url));
    }

    pub fn persist(&mut self) -> Result<(), StoreError> {
        self.sanitize();
        write_json(&self.path, &self.favorites)
    }
}

/// Only non-blank strings from a JSON array survive; any other shape is an empty set
fn favorites_from_json(value: &Value) -> BTreeSet<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|url| is_valid_url(url))
            .map(str::to_string)
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Last played channel and volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub last_channel: Option<String>,
    pub volume: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_channel: None,
            volume: DEFAULT_VOLUME as i64,
        }
    }
}

impl Settings {
    /// Lenient read: non-string channels become null, volume accepts integers, floats,
    /// numeric strings and booleans, anything else falls back to 100
    pub fn from_json(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };

        let last_channel = map
            .get("last_channel")
            .and_then(Value::as_str)
            .map(str::to_string);

        let volume = map
            .get("volume")
            .and_then(volume_from_json)
            .unwrap_or(DEFAULT_VOLUME as i64);

        let mut settings = Self { last_channel, volume };
        settings.sanitize();
        settings
    }

    pub fn sanitize(&mut self) {
        self.volume = self.volume.clamp(0, MAX_VOLUME);
    }
}

fn volume_from_json(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// File-backed [`Settings`]
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    pub fn open_default() -> Self {
        Self::open(config_file("user_settings.json"))
    }

    pub fn open(path: PathBuf) -> Self {
        let value = load_or_default(&path, "settings");
        let settings = Settings::from_json(&value);
        Self { path, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn last_channel(&self) -> Option<&str> {
        self.settings.last_channel.as_deref()
    }

    pub fn set_last_channel(&mut self, url: Option<&str>) {
        self.settings.last_channel = url.map(str::to_string);
    }

    pub fn volume(&self) -> u8 {
        self.settings.volume.clamp(0, MAX_VOLUME) as u8
    }

    pub fn set_volume(&mut self, volume: i64) {
        self.settings.volume = volume;
        self.sanitize();
    }

    /// Nudge the volume by `delta`, saturating at the bounds; returns the new level
    pub fn step_volume(&mut self, delta: i64) -> u8 {
        self.set_volume(self.settings.volume.saturating_add(delta));
        self.volume()
    }

    pub fn sanitize(&mut self) {
        self.settings.sanitize();
    }

    pub fn persist(&mut self) -> Result<(), StoreError> {
        self.sanitize();
        write_json(&self.path, &self.settings)
    }
}
