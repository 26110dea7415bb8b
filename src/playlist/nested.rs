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

//! Playlist interface composed of other interfaces.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    model::{Query, TrackResult},
    playlist::{
        PlaylistCore, PlaylistEvent, PlaylistInterface, RepeatMode, SkipRestrictions,
        sequence::TrackSequence,
    },
};

/// Plays the tracks of several interfaces back to back, for example every
/// album of an artist.
///
/// The children own their tracks; this interface keeps its own cursor and
/// modes over the concatenation and re-reads the children whenever its
/// tracks are asked for, so children that are still loading show up as they
/// grow.
pub struct NestedPlaylistInterface {
    core: PlaylistCore,
    children: Vec<Arc<dyn PlaylistInterface>>,
    sequence: Mutex<TrackSequence>,
}

impl NestedPlaylistInterface {
    pub fn new(children: Vec<Arc<dyn PlaylistInterface>>) -> Arc<Self> {
        let nested = Arc::new(Self {
            core: PlaylistCore::new(false),
            children,
            sequence: Mutex::new(TrackSequence::default()),
        });
        nested.sync_children();
        nested
    }

    pub fn children(&self) -> &[Arc<dyn PlaylistInterface>] {
        &self.children
    }

    fn sequence(&self) -> MutexGuard<'_, TrackSequence> {
        self.sequence.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pulls the children's current tracks into the sequence.
    fn sync_children(&self) {
        let tracks: Vec<Arc<Query>> = self.children.iter().flat_map(|c| c.tracks()).collect();

        let grown = {
            let mut sequence = self.sequence();
            let before = sequence.unfiltered_len();
            sequence.replace(tracks);
            (sequence.unfiltered_len() != before).then(|| (sequence.len(), sequence.unfiltered_len()))
        };

        self.core
            .set_finished(self.children.iter().all(|c| c.is_finished()));

        if let Some((count, unfiltered)) = grown {
            self.core.notify(PlaylistEvent::SourceTrackCountChanged(unfiltered));
            self.core.notify(PlaylistEvent::TrackCountChanged(count));
        }
    }
}

impl PlaylistInterface for NestedPlaylistInterface {
    fn core(&self) -> &PlaylistCore {
        &self.core
    }

    fn tracks(&self) -> Vec<Arc<Query>> {
        self.sync_children();
        self.sequence().tracks().to_vec()
    }

    fn is_finished(&self) -> bool {
        self.children.iter().all(|c| c.is_finished())
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
        self.sync_children();
        self.sequence().sibling(1, true).is_some()
    }

    fn sibling_item(&self, items_away: i32) -> Option<TrackResult> {
        self.sync_children();
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

    /// The first restriction any child imposes.
    fn skip_restrictions(&self) -> SkipRestrictions {
        self.children
            .iter()
            .map(|c| c.skip_restrictions())
            .find(|r| *r != SkipRestrictions::NoSkipRestrictions)
            .unwrap_or_default()
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

    fn has_child_interface(&self, other: &dyn PlaylistInterface) -> bool {
        self.children
            .iter()
            .any(|c| c.id() == other.id() || c.has_child_interface(other))
    }
}
