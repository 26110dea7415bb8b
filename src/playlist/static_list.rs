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

//! Playlist interface over a fixed list of queries.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    model::{Query, TrackResult},
    playlist::{PlaylistCore, PlaylistEvent, PlaylistInterface, RepeatMode, sequence::TrackSequence},
};

/// A saved playlist or a result set: every query is known up front, although
/// more can be appended later.
pub struct StaticPlaylistInterface {
    core: PlaylistCore,
    sequence: Mutex<TrackSequence>,
}

impl StaticPlaylistInterface {
    pub fn new(tracks: Vec<Arc<Query>>) -> Arc<Self> {
        Arc::new(Self {
            core: PlaylistCore::new(true),
            sequence: Mutex::new(TrackSequence::new(tracks)),
        })
    }

    fn sequence(&self) -> MutexGuard<'_, TrackSequence> {
        self.sequence.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Extends the list, for result sets that keep growing.
    pub fn append_tracks(&self, tracks: Vec<Arc<Query>>) {
        if tracks.is_empty() {
            return;
        }

        let (count, unfiltered, next_ready) = {
            let mut sequence = self.sequence();
            let had_next = sequence.sibling(1, true).is_some();
            sequence.append(tracks);
            let next_ready = !had_next && sequence.sibling(1, true).is_some();
            (sequence.len(), sequence.unfiltered_len(), next_ready)
        };

        self.core.notify(PlaylistEvent::SourceTrackCountChanged(unfiltered));
        self.core.notify(PlaylistEvent::TrackCountChanged(count));
        if next_ready {
            self.core.notify(PlaylistEvent::NextTrackReady);
        }
    }

    /// The query under the cursor.
    pub fn current_query(&self) -> Option<Arc<Query>> {
        self.sequence().current_query().cloned()
    }
}

impl PlaylistInterface for StaticPlaylistInterface {
    fn core(&self) -> &PlaylistCore {
        &self.core
    }

    fn tracks(&self) -> Vec<Arc<Query>> {
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
    use super::*;
    use crate::playlist::{
        LatchMode, RetryMode, SeekRestrictions, SkipRestrictions, ViewMode,
        tests::{playable, url_title},
    };

    fn interface(titles: &[&str]) -> Arc<StaticPlaylistInterface> {
        StaticPlaylistInterface::new(titles.iter().map(|t| playable(t)).collect())
    }

    #[test]
    fn navigates_through_the_trait_object() {
        let pli: Arc<dyn PlaylistInterface> = interface(&["a", "b", "c"]);

        assert_eq!(pli.current_item(), None);
        assert_eq!(url_title(pli.next_item()).as_deref(), Some("a"));
        assert_eq!(url_title(pli.next_item()).as_deref(), Some("b"));
        assert_eq!(url_title(pli.previous_item()).as_deref(), Some("a"));
        assert_eq!(url_title(pli.current_item()).as_deref(), Some("a"));
        assert!(pli.has_next_item());

        pli.next_item();
        pli.next_item();
        assert!(!pli.has_next_item());
        assert_eq!(pli.next_item(), None);

        pli.reset();
        assert_eq!(pli.current_item(), None);
    }

    #[test]
    fn defaults_apply_to_static_lists() {
        let pli = interface(&[]);

        assert!(pli.is_finished());
        assert_eq!(pli.view_mode(), ViewMode::Unknown);
        assert_eq!(pli.seek_restrictions(), SeekRestrictions::NoSeekRestrictions);
        assert_eq!(pli.skip_restrictions(), SkipRestrictions::NoSkipRestrictions);
        assert_eq!(pli.retry_mode(), RetryMode::NoRetry);
        assert_eq!(pli.retry_interval().as_millis(), 30_000);
        assert_eq!(pli.latch_mode(), LatchMode::StayOnSong);
        assert_eq!(pli.next_item(), None);
        assert!(!pli.has_child_interface(pli.as_ref()));
    }

    #[test]
    fn mode_changes_are_notified() {
        let pli = interface(&["a"]);
        let events = pli.subscribe();

        pli.set_repeat_mode(RepeatMode::RepeatAll);
        pli.set_repeat_mode(RepeatMode::RepeatAll);
        pli.set_shuffled(true);
        pli.set_latch_mode(LatchMode::RealTime);

        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![
                PlaylistEvent::RepeatModeChanged(RepeatMode::RepeatAll),
                PlaylistEvent::ShuffleModeChanged(true),
                PlaylistEvent::LatchModeChanged(LatchMode::RealTime),
            ]
        );
        assert_eq!(pli.repeat_mode(), RepeatMode::RepeatAll);
        assert!(pli.shuffled());
    }

    #[test]
    fn filter_narrows_the_count_but_not_the_tracks() {
        let pli = StaticPlaylistInterface::new(vec![
            Query::new("Slowdive", "Alison", "Souvlaki"),
            Query::new("Ride", "Vapour Trail", "Nowhere"),
        ]);

        pli.set_filter("souvlaki");

        assert_eq!(pli.filter(), "souvlaki");
        assert_eq!(pli.track_count(), 1);
        assert_eq!(pli.unfiltered_track_count(), 2);
        assert_eq!(pli.tracks().len(), 2);
    }

    #[test]
    fn appending_extends_the_view() {
        let pli = interface(&["a"]);
        let events = pli.subscribe();

        pli.append_tracks(vec![playable("b")]);

        assert_eq!(pli.track_count(), 2);
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![
                PlaylistEvent::SourceTrackCountChanged(2),
                PlaylistEvent::TrackCountChanged(2)
            ]
        );
        pli.next_item();
        assert_eq!(url_title(pli.next_item()).as_deref(), Some("b"));
        assert_eq!(pli.current_query().unwrap().title(), "b");
    }

    #[test]
    fn appending_after_the_end_readies_a_next_track() {
        let pli = interface(&["a"]);
        pli.next_item();
        assert!(!pli.has_next_item());
        let events = pli.subscribe();

        pli.append_tracks(vec![playable("b")]);

        assert_eq!(events.try_iter().last(), Some(PlaylistEvent::NextTrackReady));
        assert_eq!(url_title(pli.next_item()).as_deref(), Some("b"));
    }
}
