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

//! Spotify playlist synchronisation.
//!
//! The Spotify account talks to an external resolver process. This crate only
//! sees that process as a [`ResolverChannel`] that accepts JSON messages;
//! replies come back as JSON objects carrying the `qid` of the request they
//! answer and are handed to
//! [`SpotifyPlaylistUpdater::handle_resolver_message`].

mod error;
mod updater;
mod variant;

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use serde_json::Value;
use tracing::debug;

use crate::{config::AppConfig, model::Playlist};

pub use error::UpdaterError;
pub use updater::{SpotifyPlaylistUpdater, nearest_spotify_track};
pub use variant::{SpotifyTrack, plentry_to_variant, queries_to_variant, query_to_variant, variant_to_queries};

const TYPE_NAME: &str = "spotify";

/// Outgoing message channel of a Spotify account.
pub trait ResolverChannel: Send + Sync {
    fn send_message(&self, msg: Value);
}

/// Recreates updaters from their saved settings.
pub struct SpotifyUpdaterFactory {
    account: Weak<dyn ResolverChannel>,
    sync_by_default: bool,
}

impl SpotifyUpdaterFactory {
    /// `sync_by_default` applies to settings saved without a `sync` value.
    pub fn new(account: &Arc<dyn ResolverChannel>, sync_by_default: bool) -> Self {
        Self {
            account: Arc::downgrade(account),
            sync_by_default,
        }
    }

    /// Uses the configured `spotify_sync_by_default`.
    pub fn from_config(account: &Arc<dyn ResolverChannel>, config: &AppConfig) -> Self {
        Self::new(account, config.spotify_sync_by_default)
    }

    pub fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    /// Builds the updater described by `settings` for `playlist`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::NoAccount`] if the account is gone, or
    /// [`UpdaterError::MissingField`] if `settings` has no `spotifyId`.
    pub fn create(
        &self,
        playlist: Arc<Playlist>,
        settings: &HashMap<String, String>,
    ) -> Result<Arc<SpotifyPlaylistUpdater>, UpdaterError> {
        if self.account.strong_count() == 0 {
            return Err(UpdaterError::NoAccount);
        }

        let spotify_id = settings
            .get("spotifyId")
            .filter(|id| !id.is_empty())
            .ok_or(UpdaterError::MissingField("spotifyId"))?;
        let latest_rev = settings.get("latestrev").map(String::as_str).unwrap_or_default();
        let sync = settings
            .get("sync")
            .map_or(self.sync_by_default, |s| s == "true");

        debug!(%spotify_id, latest_rev, sync, "Restoring Spotify playlist updater");

        let updater = SpotifyPlaylistUpdater::new(self.account.clone(), latest_rev, spotify_id, playlist);
        updater.set_sync(sync);
        Ok(updater)
    }
}
