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

//! Domain models and core data structures.
//!
//! This module defines the central entities of the player: the sources tracks
//! come from, the track queries that describe a song, and the concrete results
//! those queries resolve to. Albums, artists and playlists live in their own
//! sub-modules.

pub mod album;
pub mod artist;
pub mod playlist;

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use xxhash_rust::xxh3::xxh3_64;

use crate::util::sortname;

pub use album::{Album, AlbumEvent};
pub use artist::Artist;
pub use playlist::{Playlist, PlaylistChange, PlaylistEntry};

/// Id of the source representing the local library.
pub const LOCAL_SOURCE_ID: u32 = 0;

/// An origin of tracks: the local library, a remote peer, or a streaming
/// account.
#[derive(Debug)]
pub struct Source {
    id: u32,
    friendly_name: String,
    online: AtomicBool,
}

impl Source {
    pub fn new(id: u32, friendly_name: &str, online: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            friendly_name: friendly_name.to_string(),
            online: AtomicBool::new(online),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn is_local(&self) -> bool {
        self.id == LOCAL_SOURCE_ID
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

/// The sources currently known, by id. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct SourceList {
    sources: Arc<Mutex<HashMap<u32, Arc<Source>>>>,
}

impl SourceList {
    /// Registers `source`, replacing any source with the same id.
    pub fn add(&self, source: Arc<Source>) {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.id(), source);
    }

    pub fn remove(&self, id: u32) -> Option<Arc<Source>> {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<Arc<Source>> {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

/// The tracks one source offers.
#[derive(Debug, Clone)]
pub struct Collection {
    pub source: Arc<Source>,
    pub name: String,
}

impl Collection {
    pub fn new(source: Arc<Source>, name: &str) -> Arc<Self> {
        Arc::new(Self {
            source,
            name: name.to_string(),
        })
    }

    pub fn source_id(&self) -> u32 {
        self.source.id()
    }
}

/// A concrete, playable resolution of a [`Query`].
#[derive(Debug, Clone)]
pub struct TrackResult {
    pub url: String,
    /// `None` for results that are not bound to a source, which are always
    /// available.
    pub source: Option<Arc<Source>>,
    pub score: f32,
    pub duration: u32,
}

impl TrackResult {
    pub fn is_online(&self) -> bool {
        self.source.as_ref().is_none_or(|s| s.is_online())
    }

    pub fn source_id(&self) -> Option<u32> {
        self.source.as_ref().map(|s| s.id())
    }
}

impl PartialEq for TrackResult {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.source_id() == other.source_id()
            && self.score == other.score
            && self.duration == other.duration
    }
}

/// A request for a song that may resolve to any number of results.
///
/// Two queries for the same artist, album and title share a [`Query::key`].
#[derive(Debug)]
pub struct Query {
    artist: String,
    album: String,
    title: String,
    key: u64,
    results: Mutex<Vec<TrackResult>>,
}

impl Query {
    pub fn new(artist: &str, title: &str, album: &str) -> Arc<Self> {
        Arc::new(Self {
            artist: artist.to_string(),
            album: album.to_string(),
            title: title.to_string(),
            key: Self::content_key(artist, title, album),
            results: Mutex::new(Vec::new()),
        })
    }

    /// Hashes the normalised artist, album and title.
    pub fn content_key(artist: &str, title: &str, album: &str) -> u64 {
        let content = format!(
            "{}\u{1f}{}\u{1f}{}",
            sortname(artist, false),
            sortname(album, false),
            sortname(title, false)
        );
        xxh3_64(content.as_bytes())
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn album(&self) -> &str {
        &self.album
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    /// Attaches newly resolved results, keeping the best scored first.
    fn lock_results(&self) -> MutexGuard<'_, Vec<TrackResult>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_results(&self, results: impl IntoIterator<Item = TrackResult>) {
        let mut existing = self.lock_results();
        existing.extend(results);
        existing.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    pub fn results(&self) -> Vec<TrackResult> {
        self.lock_results().clone()
    }

    pub fn is_resolved(&self) -> bool {
        !self.lock_results().is_empty()
    }

    /// The best result whose source is currently online.
    pub fn best_result(&self) -> Option<TrackResult> {
        self.lock_results().iter().find(|r| r.is_online()).cloned()
    }

    pub fn playable(&self) -> bool {
        self.best_result().is_some()
    }

    /// Case-insensitive match of `word` against artist, album and title.
    pub(crate) fn matches(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.artist.to_lowercase().contains(&word)
            || self.album.to_lowercase().contains(&word)
            || self.title.to_lowercase().contains(&word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(source: Option<Arc<Source>>, score: f32) -> TrackResult {
        TrackResult {
            url: format!("file:///{score}.mp3"),
            source,
            score,
            duration: 180,
        }
    }

    #[test]
    fn content_key_ignores_case_and_spacing() {
        let a = Query::new("Miles Davis", "So What", "Kind of Blue");
        let b = Query::new(" miles  davis", "SO WHAT", "kind of blue ");
        let c = Query::new("Miles Davis", "Blue in Green", "Kind of Blue");

        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn best_result_skips_offline_sources() {
        let peer = Source::new(3, "peer", false);
        let query = Query::new("a", "t", "b");
        query.add_results([result(Some(peer.clone()), 0.9), result(None, 0.5)]);

        assert_eq!(query.best_result().unwrap().score, 0.5);

        peer.set_online(true);
        assert_eq!(query.best_result().unwrap().score, 0.9);
    }

    #[test]
    fn source_list_shares_registrations_between_clones() {
        let sources = SourceList::default();
        let shared = sources.clone();

        sources.add(Source::new(4, "peer", true));
        assert_eq!(shared.get(4).unwrap().friendly_name(), "peer");

        sources.add(Source::new(4, "renamed peer", false));
        assert!(!shared.get(4).unwrap().is_online());

        assert!(shared.remove(4).is_some());
        assert!(sources.get(4).is_none());
    }

    #[test]
    fn results_survive_a_poisoned_lock() {
        let query = Query::new("a", "t", "b");
        let poisoned = Arc::clone(&query);
        let _ = std::thread::spawn(move || {
            let _guard = poisoned.results.lock().unwrap();
            panic!("poison the results lock");
        })
        .join();

        query.add_results([result(None, 0.7)]);
        assert_eq!(query.results().len(), 1);
        assert!(query.playable());
    }

    #[test]
    fn unresolved_query_is_not_playable() {
        let query = Query::new("a", "t", "b");
        assert!(!query.is_resolved());
        assert!(!query.playable());
    }
}
