// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Application configuration.
//!
//! This module manages the configuration file, stored with `confy` in the
//! platform configuration directory.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::playlist::RepeatMode;

const CONFIG_NAME: &str = "tomahawk";

const DEFAULT_RETRY_INTERVAL_MS: u64 = 30_000;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub database_path: String,
    pub media_dirs: Vec<String>,
    pub show_offline_sources: bool,
    pub repeat_mode: RepeatMode,
    pub shuffled: bool,
    pub retry_interval_ms: u64,
    pub spotify_sync_by_default: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            database_path: "tomahawk.db".to_string(),
            media_dirs: vec![],
            show_offline_sources: true,
            repeat_mode: RepeatMode::NoRepeat,
            shuffled: false,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            spotify_sync_by_default: true,
        }
    }
}

impl AppConfig {
    /// How long playlist interfaces wait before retrying an unplayable track.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Loads the configuration, falling back to defaults when the file is missing
/// or unreadable.
pub fn load_config() -> AppConfig {
    confy::load(CONFIG_NAME, None).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load configuration, using defaults");
        AppConfig::default()
    })
}

pub fn save_config(cfg: &AppConfig) -> Result<(), confy::ConfyError> {
    confy::store(CONFIG_NAME, None, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_their_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{ "media_dirs": ["/music"], "shuffled": true }"#).unwrap();

        assert_eq!(cfg.media_dirs, vec!["/music".to_string()]);
        assert!(cfg.shuffled);
        assert_eq!(cfg.repeat_mode, RepeatMode::NoRepeat);
        assert_eq!(cfg.retry_interval_ms, DEFAULT_RETRY_INTERVAL_MS);
        assert!(cfg.show_offline_sources);
    }

    #[test]
    fn retry_interval_is_read_in_milliseconds() {
        let cfg = AppConfig {
            retry_interval_ms: 1_500,
            ..AppConfig::default()
        };

        assert_eq!(cfg.retry_interval(), Duration::from_millis(1_500));
    }
}
