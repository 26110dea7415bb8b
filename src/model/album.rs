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

//! Albums.
//!
//! Albums are shared: [`Album::get`] hands out the one live instance for a
//! catalog id so that cover art and track listings are fetched once, no matter
//! how many views show the album. The instance is kept for the lifetime of the
//! process.
//!
//! Cover art is fetched lazily through the info system and decoded on first
//! use. Scaled copies are cached per requested width.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, Weak, mpsc::Receiver},
};

use image::{DynamicImage, imageops::FilterType};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    Services,
    db::Catalog,
    infosystem::{InfoEvent, InfoOutput, InfoRequestData, InfoSystem, InfoType},
    model::{Artist, Collection, Query},
    playlist::{AlbumPlaylistInterface, ModelMode, PlaylistInterface},
    util::{notify::Notifier, sortname},
};

static ALBUMS: LazyLock<Mutex<HashMap<u32, Arc<Album>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

type InterfaceKey = (ModelMode, Option<u32>);

#[derive(Debug, Clone)]
pub enum AlbumEvent {
    CoverChanged,
    Updated,
    TracksAdded {
        tracks: Vec<Arc<Query>>,
        mode: ModelMode,
        collection: Option<Arc<Collection>>,
    },
}

#[derive(Default)]
struct CoverState {
    loaded: bool,
    loading: bool,
    buffer: Option<Arc<Vec<u8>>>,
    image: Option<DynamicImage>,
    scaled: HashMap<u32, DynamicImage>,
}

pub struct Album {
    id: u32,
    name: String,
    sortname: String,
    artist: Arc<Artist>,
    info_id: String,
    weak_self: Weak<Album>,
    cover: Mutex<CoverState>,
    interfaces: Mutex<HashMap<InterfaceKey, Arc<AlbumPlaylistInterface>>>,
    notifier: Notifier<AlbumEvent>,
}

impl Album {
    /// Returns the shared album for `id`, creating it on first use.
    ///
    /// Id `0` means "not in the catalog"; such albums are never cached.
    pub fn get(id: u32, name: &str, artist: &Arc<Artist>) -> Arc<Album> {
        let mut albums = ALBUMS.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(album) = albums.get(&id) {
            return Arc::clone(album);
        }

        let album = Arc::new_cyclic(|weak_self| Album {
            id,
            name: name.to_string(),
            sortname: sortname(name, false),
            artist: Arc::clone(artist),
            info_id: Uuid::new_v4().to_string(),
            weak_self: weak_self.clone(),
            cover: Mutex::new(CoverState::default()),
            interfaces: Mutex::new(HashMap::new()),
            notifier: Notifier::new(),
        });

        if id > 0 {
            albums.insert(id, Arc::clone(&album));
        }

        album
    }

    /// Resolves an album of `artist` by name through the catalog.
    ///
    /// Returns `None` when there is no catalog, when the lookup fails, or when
    /// `auto_create` is set but no id could be produced.
    pub fn get_by_name(
        catalog: Option<&Catalog>,
        artist: &Arc<Artist>,
        name: &str,
        auto_create: bool,
    ) -> Option<Arc<Album>> {
        let catalog = catalog?;

        let id = if artist.id() == 0 {
            0
        } else {
            match catalog.album_id(artist.id(), name, auto_create) {
                Ok(id) => id,
                Err(e) => {
                    warn!(artist = artist.name(), album = name, error = %format!("{e:#}"), "Album lookup failed");
                    return None;
                }
            }
        };

        if id < 1 && auto_create {
            return None;
        }

        Some(Album::get(id, name, artist))
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sortname(&self) -> &str {
        &self.sortname
    }

    pub fn artist(&self) -> &Arc<Artist> {
        &self.artist
    }

    /// The caller id this album uses for its info system requests.
    pub fn info_id(&self) -> &str {
        &self.info_id
    }

    pub(crate) fn weak_ref(&self) -> Weak<Album> {
        self.weak_self.clone()
    }

    pub fn subscribe(&self) -> Receiver<AlbumEvent> {
        self.notifier.subscribe()
    }

    fn cover_state(&self) -> MutexGuard<'_, CoverState> {
        self.cover.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cover art, scaled to fit within `size` if one is given.
    ///
    /// When no cover has been loaded yet and `force_load` is set, a cover art
    /// request is sent to `info_system`; the image becomes available once the
    /// answer has been handed to [`handle_info_event`](Self::handle_info_event)
    /// and [`AlbumEvent::CoverChanged`] has been raised.
    ///
    /// # Arguments
    ///
    /// * `info_system` - where to request the cover, if it must be fetched.
    /// * `size` - bounding box for the returned image; the aspect ratio is kept.
    /// * `force_load` - whether a missing cover should be requested.
    pub fn cover(
        &self,
        info_system: Option<&InfoSystem>,
        size: Option<(u32, u32)>,
        force_load: bool,
    ) -> Option<DynamicImage> {
        let mut cover = self.cover_state();

        if force_load
            && !cover.loaded
            && !cover.loading
            && let Some(info_system) = info_system
        {
            info_system.get_info(InfoRequestData::for_album(
                &self.info_id,
                InfoType::AlbumCoverArt,
                self.artist.name(),
                &self.name,
            ));
            cover.loading = true;
        }

        if cover.image.is_none() {
            let buffer = cover.buffer.clone()?;
            match image::load_from_memory(&buffer) {
                Ok(image) => cover.image = Some(image),
                Err(e) => {
                    debug!(album = %self.name, error = %e, "Cannot decode cover art");
                    return None;
                }
            }
        }

        let Some((width, height)) = size.filter(|(w, h)| *w > 0 && *h > 0) else {
            return cover.image.clone();
        };

        if let Some(scaled) = cover.scaled.get(&width) {
            return Some(scaled.clone());
        }

        let scaled = cover.image.as_ref()?.resize(width, height, FilterType::Triangle);
        cover.scaled.insert(width, scaled.clone());
        Some(scaled)
    }

    /// The raw cover bytes as received, if any.
    pub fn cover_bytes(&self) -> Option<Arc<Vec<u8>>> {
        self.cover_state().buffer.clone()
    }

    pub fn info_system_info(&self, request: &InfoRequestData, output: &InfoOutput) {
        if request.caller != self.info_id || request.kind != InfoType::AlbumCoverArt {
            return;
        }

        let changed = {
            let mut cover = self.cover_state();
            cover.loaded = true;

            match output {
                InfoOutput::CoverArt(bytes) if !bytes.is_empty() => {
                    cover.buffer = Some(Arc::clone(bytes));
                    cover.image = None;
                    cover.scaled.clear();
                    true
                }
                _ => false,
            }
        };

        if changed {
            self.notifier.notify(AlbumEvent::CoverChanged);
        }
    }

    pub fn info_system_finished(&self, target: &str) {
        if target != self.info_id {
            return;
        }

        self.cover_state().loading = false;
        self.notifier.notify(AlbumEvent::Updated);
    }

    /// Routes an info system event to the album and to its playlist
    /// interfaces.
    pub fn handle_info_event(&self, event: &InfoEvent) {
        match event {
            InfoEvent::Info(request, output) => self.info_system_info(request, output),
            InfoEvent::Finished(target) => self.info_system_finished(target),
        }

        let interfaces: Vec<_> = self
            .interfaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for interface in interfaces {
            interface.handle_info_event(event);
        }
    }

    /// Returns the album's playlist interface for `mode` and `collection`,
    /// creating it on first use.
    pub fn playlist_interface(
        &self,
        services: &Services,
        mode: ModelMode,
        collection: Option<Arc<Collection>>,
    ) -> Arc<AlbumPlaylistInterface> {
        let key = (mode, collection.as_ref().map(|c| c.source_id()));
        let mut interfaces = self.interfaces.lock().unwrap_or_else(PoisonError::into_inner);

        let interface = interfaces
            .entry(key)
            .or_insert_with(|| AlbumPlaylistInterface::new(self, mode, collection, services.clone()));

        Arc::clone(interface)
    }

    pub fn tracks(
        &self,
        services: &Services,
        mode: ModelMode,
        collection: Option<Arc<Collection>>,
    ) -> Vec<Arc<Query>> {
        self.playlist_interface(services, mode, collection).tracks()
    }

    pub(crate) fn on_tracks_loaded(
        &self,
        mode: ModelMode,
        collection: Option<Arc<Collection>>,
        tracks: Vec<Arc<Query>>,
    ) {
        self.notifier.notify(AlbumEvent::TracksAdded {
            tracks,
            mode,
            collection,
        });
    }
}

impl std::fmt::Debug for Album {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Album")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("artist", &self.artist.name())
            .finish_non_exhaustive()
    }
}
