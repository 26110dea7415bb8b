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

//! # Tomahawk core.
//!
//! Headless building blocks of a music player that finds tracks across many
//! sources: the local library, remote peers and streaming services.
//!
//! * [`playlist`]: the playback sequencing contract and its implementations.
//! * [`model`]: sources, track queries, shared albums and artists, playlists.
//! * [`spotify`]: two-way sync of local playlists with Spotify.
//! * [`sourcetree`]: the sources sidebar and its filtered, sorted view.
//! * [`db`]: the SQLite catalog of the local collection.
//! * [`infosystem`]: asynchronous metadata lookups.
//!
//! Nothing here is a global singleton except the album and artist caches.
//! The catalog, the info system and the list of known sources are handed
//! around as a [`Services`] value, and change notifications are delivered over `std::sync::mpsc`
//! channels that the owner drains in its own loop.

pub mod config;
pub mod db;
pub mod infosystem;
pub mod logging;
pub mod model;
pub mod playlist;
pub mod sourcetree;
pub mod spotify;
pub(crate) mod util;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    db::Catalog,
    infosystem::{CatalogTracksPlugin, InfoSystem, LocalCoverPlugin},
    model::{LOCAL_SOURCE_ID, Source, SourceList},
};

/// Shared handles to the catalog, the info system and the known sources.
///
/// The catalog and the info system may be missing, in which case lookups
/// that need them come back empty.
#[derive(Clone, Default)]
pub struct Services {
    pub catalog: Option<Catalog>,
    pub info_system: Option<InfoSystem>,
    pub sources: SourceList,
}

impl Services {
    /// Opens the catalog named in `config`, registers the local source and
    /// scans the configured media directories into it, and starts an info
    /// system backed by the catalog.
    ///
    /// A media directory that cannot be scanned is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be opened.
    pub fn open(config: &AppConfig) -> Result<Self> {
        let catalog = Catalog::open(&config.database_path)
            .with_context(|| format!("Failed to open catalog at {}", config.database_path))?;

        let sources = SourceList::default();
        sources.add(Source::new(LOCAL_SOURCE_ID, "My Collection", true));

        for dir in &config.media_dirs {
            match catalog.scan_collection(Path::new(dir), LOCAL_SOURCE_ID) {
                Ok(count) => info!(%dir, count, "Media directory scanned"),
                Err(e) => warn!(%dir, error = %format!("{e:#}"), "Failed to scan media directory"),
            }
        }

        let info_system = InfoSystem::new(vec![
            Box::new(LocalCoverPlugin::new(catalog.clone())),
            Box::new(CatalogTracksPlugin::new(catalog.clone())),
        ]);

        Ok(Self {
            catalog: Some(catalog),
            info_system: Some(info_system),
            sources,
        })
    }
}
