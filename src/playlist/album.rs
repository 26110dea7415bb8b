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

//! Playlist interface over the tracks of one album.
//!
//! The listing is loaded lazily, on the first call to `tracks`, from the
//! catalog or from the info system depending on the [`ModelMode`]. Info
//! system answers arrive later as [`InfoEvent`]s that the owner routes back
//! through [`AlbumPlaylistInterface::handle_info_event`]; answers addressed to
//! another caller are ignored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, warn};

use crate::{
    Services,
    infosystem::{InfoEvent, InfoOutput, InfoRequestData, InfoType},
    model::{Album, Collection, LOCAL_SOURCE_ID, Query, TrackResult},
    playlist::{
        ModelMode, PlaylistCore, PlaylistEvent, PlaylistInterface, RepeatMode, ViewMode,
        sequence::TrackSequence,
    },
};

pub struct AlbumPlaylistInterface {
    core: PlaylistCore,
    album: Weak<Album>,
    album_id: u32,
    album_name: String,
    artist_name: String,
    mode: ModelMode,
    collection: Option<Arc<Collection>>,
    services: Services,
    sequence: Mutex<TrackSequence>,
    load_started: Mutex<bool>,
}

impl AlbumPlaylistInterface {
    pub(crate) fn new(
        album: &Album,
        mode: ModelMode,
        collection: Option<Arc<Collection>>,
        services: Services,
    ) -> Arc<Self> {
        Arc::new(Self {
            core: PlaylistCore::new(false),
            album: album.weak_ref(),
            album_id: album.id(),
            album_name: album.name().to_string(),
            artist_name: album.artist().name().to_string(),
            mode,
            collection,
            services,
            sequence: Mutex::new(TrackSequence::default()),
            load_started: Mutex::new(false),
        })
    }

    pub fn mode(&self) -> ModelMode {
        self.mode
    }

    pub fn collection(&self) -> Option<&Arc<Collection>> {
        self.collection.as_ref()
    }

    fn sequence(&self) -> MutexGuard<'_, TrackSequence> {
        self.sequence.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_loading(&self) {
        {
            let mut started = self.load_started.lock().unwrap_or_else(PoisonError::into_inner);
            if *started {
                return;
            }
            *started = true;
        }

        let finished = match self.mode {
            ModelMode::Database => {
                self.load_from_catalog();
                true
            }
            ModelMode::Mixed => self.load_from_catalog() > 0 || !self.request_from_info_system(),
            ModelMode::InfoSystem => !self.request_from_info_system(),
        };

        if finished {
            self.finish_loading();
        }
    }

    /// Appends the album's catalogued tracks and returns how many there were.
    fn load_from_catalog(&self) -> usize {
        let Some(catalog) = &self.services.catalog else {
            debug!(album = %self.album_name, "No catalog, album tracks unavailable");
            return 0;
        };

        if self.album_id == 0 {
            return 0;
        }

        let source_id = self.collection.as_ref().map(|c| c.source_id());
        let rows = match catalog.album_tracks(self.album_id, source_id) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(album = %self.album_name, error = %format!("{e:#}"), "Failed to load album tracks");
                return 0;
            }
        };

        let queries: Vec<Arc<Query>> = rows
            .into_iter()
            .filter_map(|row| {
                let source = self
                    .collection
                    .as_ref()
                    .filter(|c| c.source_id() == row.source_id)
                    .map(|c| Arc::clone(&c.source))
                    .or_else(|| self.services.sources.get(row.source_id));

                // Tracks of a peer we know nothing about cannot be played.
                if source.is_none() && row.source_id != LOCAL_SOURCE_ID {
                    debug!(
                        album = %self.album_name,
                        source = row.source_id,
                        title = %row.title,
                        "Skipping track of an unknown source"
                    );
                    return None;
                }

                let query = Query::new(&row.artist_name, &row.title, &row.album_name);
                query.add_results([TrackResult {
                    url: row.filename,
                    source,
                    score: 1.0,
                    duration: row.duration,
                }]);
                Some(query)
            })
            .collect();

        let count = queries.len();
        self.append(queries);
        count
    }

    /// Asks the info system for the listing. Returns `false` if there is no
    /// info system to ask.
    fn request_from_info_system(&self) -> bool {
        let Some(info_system) = &self.services.info_system else {
            return false;
        };

        info_system.get_info(InfoRequestData::for_album(
            self.id(),
            InfoType::AlbumTracks,
            &self.artist_name,
            &self.album_name,
        ));

        true
    }

    fn append(&self, queries: Vec<Arc<Query>>) {
        if queries.is_empty() {
            return;
        }

        let (count, unfiltered, next_ready) = {
            let mut sequence = self.sequence();
            let had_next = sequence.sibling(1, true).is_some();
            sequence.append(queries);
            let next_ready = !had_next && sequence.sibling(1, true).is_some();
            (sequence.len(), sequence.unfiltered_len(), next_ready)
        };

        self.core.notify(PlaylistEvent::SourceTrackCountChanged(unfiltered));
        self.core.notify(PlaylistEvent::TrackCountChanged(count));
        if next_ready {
            self.core.notify(PlaylistEvent::NextTrackReady);
        }
    }

    fn finish_loading(&self) {
        self.core.set_finished(true);
        self.core.notify(PlaylistEvent::TracksLoaded);

        if let Some(album) = self.album.upgrade() {
            let tracks = self.sequence().tracks().to_vec();
            album.on_tracks_loaded(self.mode, self.collection.clone(), tracks);
        }
    }

    pub fn info_system_info(&self, request: &InfoRequestData, output: &InfoOutput) {
        if request.caller != self.id() || request.kind != InfoType::AlbumTracks {
            return;
        }

        if let InfoOutput::AlbumTracks(titles) = output {
            let queries = titles
                .iter()
                .map(|title| Query::new(&self.artist_name, title, &self.album_name))
                .collect();
            self.append(queries);
        }
    }

    pub fn info_system_finished(&self, target: &str) {
        if target != self.id() || self.core.is_finished() {
            return;
        }

        self.finish_loading();
    }

    pub fn handle_info_event(&self, event: &InfoEvent) {
        match event {
            InfoEvent::Info(request, output) => self.info_system_info(request, output),
            InfoEvent::Finished(target) => self.info_system_finished(target),
        }
    }
}

impl PlaylistInterface for AlbumPlaylistInterface {
    fn core(&self) -> &PlaylistCore {
        &self.core
    }

    fn tracks(&self) -> Vec<Arc<Query>> {
        self.start_loading();
        self.sequence().tracks().to_vec()
    }

    fn unfiltered_track_count(&self) -> usize {
        self.sequence().unfiltered_len()
    }

    fn track_count(&self) -> usize {
        self.sequence().len()
    }

    fn current_item(&self) -> Option<TrackResult> {
        self.sequence().current()
    }

    fn has_next_item(&self) -> bool {
        self.sequence().sibling(1, true).is_some()
    }

    fn sibling_item(&self, items_away: i32) -> Option<TrackResult> {
        self.start_loading();
        self.sequence().sibling(items_away, false)
    }

    fn repeat_mode(&self) -> RepeatMode {
        self.sequence().repeat_mode()
    }

    fn set_repeat_mode(&self, mode: RepeatMode) {
        if self.sequence().set_repeat_mode(mode) {
            self.core.notify(PlaylistEvent::RepeatModeChanged(mode));
        }
    }

    fn shuffled(&self) -> bool {
        self.sequence().shuffled()
    }

    fn set_shuffled(&self, enabled: bool) {
        if self.sequence().set_shuffled(enabled) {
            self.core.notify(PlaylistEvent::ShuffleModeChanged(enabled));
        }
    }

    fn view_mode(&self) -> ViewMode {
        ViewMode::Album
    }

    fn set_filter(&self, pattern: &str) {
        self.core.set_filter(pattern);
        let count = {
            let mut sequence = self.sequence();
            sequence.set_filter(pattern);
            sequence.len()
        };
        self.core.notify(PlaylistEvent::TrackCountChanged(count));
    }

    fn reset(&self) {
        self.sequence().reset();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        db::{Catalog, tests::{catalog_starting_at, track}},
        infosystem::{CatalogTracksPlugin, InfoSystem},
        model::{AlbumEvent, Artist, Source},
        playlist::{playback_order, tests::url_title},
    };

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn catalog_with_album(base: u32) -> (Catalog, Arc<Album>) {
        let catalog = catalog_starting_at(base);
        catalog.add_track("Stereolab", "Dots and Loops", &track(0, 2, "Miss Modular")).unwrap();
        catalog.add_track("Stereolab", "Dots and Loops", &track(0, 1, "Brakhage")).unwrap();
        catalog.add_track("Stereolab", "Dots and Loops", &track(5, 3, "The Flower Called Nowhere")).unwrap();

        let artist = Artist::get_by_name(Some(&catalog), "Stereolab", false).unwrap();
        let album = Album::get_by_name(Some(&catalog), &artist, "Dots and Loops", false).unwrap();
        (catalog, album)
    }

    /// Routes info events to `album` until its interface for `mode` finishes.
    fn pump(events: &std::sync::mpsc::Receiver<InfoEvent>, album: &Album, pli: &AlbumPlaylistInterface) {
        while !pli.is_finished() {
            let event = events.recv_timeout(TIMEOUT).unwrap();
            album.handle_info_event(&event);
        }
    }

    #[test]
    fn database_mode_lists_catalogued_tracks() {
        let (catalog, album) = catalog_with_album(300_000);
        let services = Services {
            catalog: Some(catalog),
            ..Services::default()
        };
        services.sources.add(Source::new(5, "peer", true));
        let album_events = album.subscribe();

        let pli = album.playlist_interface(&services, ModelMode::Database, None);
        let titles: Vec<_> = pli.tracks().iter().map(|q| q.title().to_string()).collect();

        assert_eq!(titles, vec!["Brakhage", "Miss Modular", "The Flower Called Nowhere"]);
        assert!(pli.is_finished());
        assert_eq!(pli.view_mode(), ViewMode::Album);
        assert!(url_title(pli.next_item()).unwrap().contains("Brakhage"));
        assert!(matches!(
            album_events.try_recv().unwrap(),
            AlbumEvent::TracksAdded { tracks, mode: ModelMode::Database, .. } if tracks.len() == 3
        ));
    }

    #[test]
    fn collection_restricts_tracks_to_its_source() {
        let (catalog, album) = catalog_with_album(310_000);
        let services = Services {
            catalog: Some(catalog),
            ..Services::default()
        };
        let peer = Source::new(5, "peer", true);
        let collection = Collection::new(Arc::clone(&peer), "peer collection");

        let pli = album.playlist_interface(&services, ModelMode::Database, Some(collection));
        assert_eq!(pli.tracks().len(), 1);

        peer.set_online(false);
        assert_eq!(pli.next_item(), None);
    }

    #[test]
    fn peer_tracks_follow_their_source() {
        let (catalog, album) = catalog_with_album(340_000);
        let services = Services {
            catalog: Some(catalog),
            ..Services::default()
        };

        // Nobody knows source 5 yet.
        let unknown = album.playlist_interface(&services, ModelMode::Database, None);
        let titles: Vec<_> = unknown.tracks().iter().map(|q| q.title().to_string()).collect();
        assert_eq!(titles, vec!["Brakhage", "Miss Modular"]);

        let peer = Source::new(5, "peer", true);
        services.sources.add(Arc::clone(&peer));
        let known = album.playlist_interface(&services, ModelMode::Mixed, None);
        assert_eq!(known.tracks().len(), 3);

        let flower = known
            .tracks()
            .into_iter()
            .find(|q| q.title() == "The Flower Called Nowhere")
            .unwrap();
        assert!(flower.playable());
        peer.set_online(false);
        assert!(!flower.playable());
    }

    #[test]
    fn repeating_playback_order_loads_the_album_first() {
        let (catalog, album) = catalog_with_album(350_000);
        let services = Services {
            catalog: Some(catalog),
            ..Services::default()
        };

        let pli = album.playlist_interface(&services, ModelMode::Database, None);
        pli.set_repeat_mode(RepeatMode::RepeatAll);

        let order = playback_order(pli.as_ref());
        assert_eq!(order.len(), 2);
        assert!(order[0].url.contains("Brakhage"));
        assert!(order[1].url.contains("Miss Modular"));
    }

    #[test]
    fn info_system_mode_fills_in_when_the_answer_arrives() {
        let (catalog, album) = catalog_with_album(320_000);
        let info_system = InfoSystem::new(vec![Box::new(CatalogTracksPlugin::new(catalog))]);
        let events = info_system.subscribe();
        let services = Services {
            info_system: Some(info_system),
            ..Services::default()
        };

        let pli = album.playlist_interface(&services, ModelMode::InfoSystem, None);
        assert!(pli.tracks().is_empty());
        assert!(!pli.is_finished());

        pump(&events, &album, &pli);

        assert_eq!(pli.tracks().len(), 3);
        // Titles alone are not playable until something resolves them.
        assert_eq!(pli.next_item(), None);
    }

    #[test]
    fn mixed_mode_falls_back_to_the_info_system() {
        let (catalog, _) = catalog_with_album(330_000);
        let info_system = InfoSystem::new(vec![Box::new(CatalogTracksPlugin::new(catalog))]);
        let events = info_system.subscribe();
        let services = Services {
            catalog: Some(Catalog::open_in_memory().unwrap()),
            info_system: Some(info_system),
            ..Services::default()
        };
        let artist = Artist::get(0, "Stereolab");
        let album = Album::get(0, "Dots and Loops", &artist);

        let pli = album.playlist_interface(&services, ModelMode::Mixed, None);
        assert!(pli.tracks().is_empty());

        pump(&events, &album, &pli);
        assert_eq!(pli.tracks().len(), 3);
    }

    #[test]
    fn answers_for_other_callers_are_ignored() {
        let artist = Artist::get(0, "Stereolab");
        let album = Album::get(0, "Dots and Loops", &artist);
        let pli = album.playlist_interface(&Services::default(), ModelMode::Database, None);
        pli.tracks();

        let stale = InfoRequestData::for_album("someone-else", InfoType::AlbumTracks, "Stereolab", "Dots and Loops");
        pli.info_system_info(&stale, &InfoOutput::AlbumTracks(vec!["Refractions".to_string()]));

        assert!(pli.tracks().is_empty());
        assert!(pli.is_finished());
    }

    #[test]
    fn interfaces_are_cached_per_mode_and_collection() {
        let artist = Artist::get(0, "Stereolab");
        let album = Album::get(0, "Dots and Loops", &artist);
        let services = Services::default();
        let peer = Collection::new(Source::new(5, "peer", true), "peer");

        let a = album.playlist_interface(&services, ModelMode::Database, None);
        let b = album.playlist_interface(&services, ModelMode::Database, None);
        let c = album.playlist_interface(&services, ModelMode::InfoSystem, None);
        let d = album.playlist_interface(&services, ModelMode::Database, Some(peer));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(!Arc::ptr_eq(&a, &d));
    }
}
