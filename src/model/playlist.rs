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

//! Saved playlists.
//!
//! A [`Playlist`] is a titled list of entries with a revision id that changes
//! whenever the list does. Every change is broadcast as a [`PlaylistChange`],
//! which is what playlist updaters listen to in order to mirror local edits to
//! a remote service.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc::Receiver};

use uuid::Uuid;

use crate::{model::Query, util::notify::Notifier};

#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    pub guid: String,
    pub query: Arc<Query>,
    /// Free-form data owned by whoever manages the playlist. Spotify playlists
    /// store the Spotify track id here.
    pub annotation: String,
}

impl PlaylistEntry {
    pub fn new(query: Arc<Query>) -> Self {
        Self::with_annotation(query, "")
    }

    pub fn with_annotation(query: Arc<Query>, annotation: &str) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            query,
            annotation: annotation.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PlaylistChange {
    TracksInserted {
        entries: Vec<PlaylistEntry>,
        position: usize,
    },
    TracksRemoved(Vec<Arc<Query>>),
    TracksMoved {
        entries: Vec<PlaylistEntry>,
        position: usize,
    },
    Renamed {
        new_title: String,
        old_title: String,
    },
    RevisionLoaded(String),
}

struct PlaylistState {
    title: String,
    revision: String,
    entries: Vec<PlaylistEntry>,
    loaded: bool,
}

pub struct Playlist {
    guid: String,
    state: Mutex<PlaylistState>,
    notifier: Notifier<PlaylistChange>,
}

impl Playlist {
    /// Creates a playlist whose current revision is already available.
    pub fn new(title: &str, entries: Vec<PlaylistEntry>) -> Arc<Self> {
        Self::build(title, entries, true)
    }

    /// Creates a playlist whose revision still has to be loaded with
    /// [`load_revision`](Self::load_revision).
    pub fn unloaded(title: &str) -> Arc<Self> {
        Self::build(title, Vec::new(), false)
    }

    fn build(title: &str, entries: Vec<PlaylistEntry>, loaded: bool) -> Arc<Self> {
        Arc::new(Self {
            guid: Uuid::new_v4().to_string(),
            state: Mutex::new(PlaylistState {
                title: title.to_string(),
                revision: Uuid::new_v4().to_string(),
                entries,
                loaded,
            }),
            notifier: Notifier::new(),
        })
    }

    fn state(&self) -> MutexGuard<'_, PlaylistState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn title(&self) -> String {
        self.state().title.clone()
    }

    pub fn revision(&self) -> String {
        self.state().revision.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    pub fn entries(&self) -> Vec<PlaylistEntry> {
        self.state().entries.clone()
    }

    pub fn queries(&self) -> Vec<Arc<Query>> {
        self.state().entries.iter().map(|e| Arc::clone(&e.query)).collect()
    }

    pub fn subscribe(&self) -> Receiver<PlaylistChange> {
        self.notifier.subscribe()
    }

    pub fn load_revision(&self, revision: &str, entries: Vec<PlaylistEntry>) {
        {
            let mut state = self.state();
            state.revision = revision.to_string();
            state.entries = entries;
            state.loaded = true;
        }
        self.notifier
            .notify(PlaylistChange::RevisionLoaded(revision.to_string()));
    }

    /// Inserts `entries` before `position`, clamped to the end of the list.
    pub fn insert_entries(&self, position: usize, entries: Vec<PlaylistEntry>) {
        if entries.is_empty() {
            return;
        }

        let position = {
            let mut state = self.state();
            let position = position.min(state.entries.len());
            state.entries.splice(position..position, entries.iter().cloned());
            state.revision = Uuid::new_v4().to_string();
            position
        };

        self.notifier
            .notify(PlaylistChange::TracksInserted { entries, position });
    }

    /// Removes the entries with the given guids and returns them.
    pub fn remove_entries(&self, guids: &[String]) -> Vec<PlaylistEntry> {
        let removed = {
            let mut state = self.state();
            let (removed, kept) = state
                .entries
                .drain(..)
                .partition::<Vec<_>, _>(|e| guids.contains(&e.guid));
            state.entries = kept;
            if !removed.is_empty() {
                state.revision = Uuid::new_v4().to_string();
            }
            removed
        };

        if !removed.is_empty() {
            self.notifier.notify(PlaylistChange::TracksRemoved(
                removed.iter().map(|e| Arc::clone(&e.query)).collect(),
            ));
        }

        removed
    }

    /// Moves the entries with the given guids, in playlist order, so that they
    /// start at `position` of the list that remains once they are taken out.
    pub fn move_entries(&self, guids: &[String], position: usize) {
        let (moved, position) = {
            let mut state = self.state();
            let (moved, mut kept) = state
                .entries
                .drain(..)
                .partition::<Vec<_>, _>(|e| guids.contains(&e.guid));
            let position = position.min(kept.len());
            kept.splice(position..position, moved.iter().cloned());
            state.entries = kept;
            if !moved.is_empty() {
                state.revision = Uuid::new_v4().to_string();
            }
            (moved, position)
        };

        if !moved.is_empty() {
            self.notifier.notify(PlaylistChange::TracksMoved {
                entries: moved,
                position,
            });
        }
    }

    pub fn rename(&self, title: &str) {
        let old_title = {
            let mut state = self.state();
            std::mem::replace(&mut state.title, title.to_string())
        };

        if old_title != title {
            self.notifier.notify(PlaylistChange::Renamed {
                new_title: title.to_string(),
                old_title,
            });
        }
    }

    pub fn set_annotation(&self, guid: &str, annotation: &str) {
        let mut state = self.state();
        if let Some(entry) = state.entries.iter_mut().find(|e| e.guid == guid) {
            entry.annotation = annotation.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(titles: &[&str]) -> Vec<PlaylistEntry> {
        titles
            .iter()
            .map(|t| PlaylistEntry::new(Query::new("Artist", t, "Album")))
            .collect()
    }

    fn titles(playlist: &Playlist) -> Vec<String> {
        playlist
            .entries()
            .iter()
            .map(|e| e.query.title().to_string())
            .collect()
    }

    #[test]
    fn insert_clamps_position_and_notifies() {
        let playlist = Playlist::new("p", entries(&["a", "b"]));
        let changes = playlist.subscribe();
        let revision = playlist.revision();

        playlist.insert_entries(10, entries(&["c"]));

        assert_eq!(titles(&playlist), vec!["a", "b", "c"]);
        assert_ne!(playlist.revision(), revision);
        assert!(matches!(
            changes.try_recv().unwrap(),
            PlaylistChange::TracksInserted { position: 2, .. }
        ));
    }

    #[test]
    fn move_places_entries_relative_to_the_remaining_list() {
        let playlist = Playlist::new("p", entries(&["a", "b", "c", "d"]));
        let all = playlist.entries();

        playlist.move_entries(&[all[0].guid.clone(), all[1].guid.clone()], 1);

        assert_eq!(titles(&playlist), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn remove_returns_removed_entries() {
        let playlist = Playlist::new("p", entries(&["a", "b"]));
        let changes = playlist.subscribe();
        let guid = playlist.entries()[1].guid.clone();

        let removed = playlist.remove_entries(&[guid]);

        assert_eq!(removed.len(), 1);
        assert_eq!(titles(&playlist), vec!["a"]);
        assert!(matches!(changes.try_recv().unwrap(), PlaylistChange::TracksRemoved(q) if q.len() == 1));
        assert!(playlist.remove_entries(&["missing".to_string()]).is_empty());
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn rename_to_same_title_is_silent() {
        let playlist = Playlist::new("p", vec![]);
        let changes = playlist.subscribe();

        playlist.rename("p");
        playlist.rename("q");

        assert!(matches!(
            changes.try_recv().unwrap(),
            PlaylistChange::Renamed { new_title, old_title } if new_title == "q" && old_title == "p"
        ));
        assert!(changes.try_recv().is_err());
    }
}
