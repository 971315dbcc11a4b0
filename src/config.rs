//! Configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::loader::FetchConfig;

pub const DEFAULT_PLAYLIST_URL: &str = "https://iptv-org.github.io/iptv/index.m3u";
pub const DEFAULT_PLAYER: &str = "mpv";

const APP_DIR: &str = "enhanced_tv";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_playlist_url")]
    pub playlist_url: String,
    #[serde(default)]
    pub external_player: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_true")]
    pub pass_user_agent_to_player: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    // Last country picker selection ("" = all)
    #[serde(default)]
    pub country_filter: String,
}

fn default_playlist_url() -> String { DEFAULT_PLAYLIST_URL.to_string() }
fn default_user_agent() -> String { FetchConfig::default().user_agent }
fn default_true() -> bool { true }
fn default_connect_timeout() -> u64 { 30 }
fn default_read_timeout() -> u64 { 120 }
fn default_retries() -> u32 { 3 }
fn default_retry_delay() -> u64 { 2000 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            playlist_url: default_playlist_url(),
            external_player: String::new(),
            user_agent: default_user_agent(),
            pass_user_agent_to_player: true,
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            dark_mode: true,
            country_filter: String::new(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Self {
        Self::load_from(&config_file("config.json"))
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => warn!(path = %path.display(), error = %e, "Invalid config, using defaults"),
                },
                Err(e) => warn!(path = %path.display(), error = %e, "Unreadable config, using defaults"),
            }
        }

        Self::default()
    }

    pub fn save(&self) {
        self.save_to(&config_file("config.json"));
    }

    pub fn save_to(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(content) => {
                if let Err(e) = fs::write(path, content) {
                    warn!(path = %path.display(), error = %e, "Failed to save config");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize config"),
        }
    }

    /// Player command, falling back to mpv when unset
    pub fn player(&self) -> &str {
        let player = self.external_player.trim();
        if player.is_empty() { DEFAULT_PLAYER } else { player }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms,
            connect_timeout_secs: self.connect_timeout_secs,
            read_timeout_secs: self.read_timeout_secs,
            user_agent: self.user_agent.clone(),
            ..FetchConfig::default()
        }
    }
}

/// Path of a file in the per-user application directory (created on demand)
pub fn config_file(name: &str) -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    fs::create_dir_all(&path).ok();
    path.push(name);
    path
}
