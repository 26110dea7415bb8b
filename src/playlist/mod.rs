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

//! Playback sequencing.
//!
//! A [`PlaylistInterface`] is the stateful, ordered view of track queries the
//! player walks through: a saved playlist, search results, an album, or a
//! composition of other interfaces. Callers navigate with
//! [`next_item`](PlaylistInterface::next_item) and friends without knowing
//! which kind of interface they hold.
//!
//! Running out of items is not an error: navigation returns `None` when there
//! is nothing to move to. Mode changes are broadcast as [`PlaylistEvent`]s to
//! subscribers so views can refresh without polling.
//!
//! # Implementations
//!
//! * [`StaticPlaylistInterface`]: a fixed, appendable list of queries.
//! * [`AlbumPlaylistInterface`]: the tracks of one album, loaded lazily from
//!   the catalog or the info system.
//! * [`NestedPlaylistInterface`]: the concatenation of child interfaces.

mod album;
mod modes;
mod nested;
mod sequence;
mod static_list;

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc::Receiver},
    time::Duration,
};

use uuid::Uuid;

use crate::{
    model::{Query, TrackResult},
    util::notify::Notifier,
};

pub use album::AlbumPlaylistInterface;
pub use modes::{LatchMode, ModelMode, RepeatMode, RetryMode, SeekRestrictions, SkipRestrictions, ViewMode};
pub use nested::NestedPlaylistInterface;
pub use static_list::StaticPlaylistInterface;

const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistEvent {
    RepeatModeChanged(RepeatMode),
    ShuffleModeChanged(bool),
    TrackCountChanged(usize),
    SourceTrackCountChanged(usize),
    LatchModeChanged(LatchMode),
    NextTrackReady,
    TracksLoaded,
}

/// State every interface carries regardless of how it stores its tracks.
pub struct PlaylistCore {
    id: String,
    state: Mutex<CoreState>,
    notifier: Notifier<PlaylistEvent>,
}

struct CoreState {
    filter: String,
    latch_mode: LatchMode,
    retry_interval: Duration,
    finished: bool,
}

impl PlaylistCore {
    pub fn new(finished: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: Mutex::new(CoreState {
                filter: String::new(),
                latch_mode: LatchMode::default(),
                retry_interval: DEFAULT_RETRY_INTERVAL,
                finished,
            }),
            notifier: Notifier::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.state().finished
    }

    pub fn set_finished(&self, finished: bool) {
        self.state().finished = finished;
    }

    pub fn filter(&self) -> String {
        self.state().filter.clone()
    }

    pub fn set_filter(&self, pattern: &str) {
        self.state().filter = pattern.to_string();
    }

    pub fn latch_mode(&self) -> LatchMode {
        self.state().latch_mode
    }

    pub fn retry_interval(&self) -> Duration {
        self.state().retry_interval
    }

    pub fn set_retry_interval(&self, interval: Duration) {
        self.state().retry_interval = interval;
    }

    pub fn set_latch_mode(&self, mode: LatchMode) {
        let changed = {
            let mut state = self.state();
            std::mem::replace(&mut state.latch_mode, mode) != mode
        };
        if changed {
            self.notify(PlaylistEvent::LatchModeChanged(mode));
        }
    }

    pub fn subscribe(&self) -> Receiver<PlaylistEvent> {
        self.notifier.subscribe()
    }

    pub fn notify(&self, event: PlaylistEvent) {
        self.notifier.notify(event);
    }
}

/// The playback sequencing contract.
///
/// Methods with default bodies describe the common case and are overridden
/// by interfaces that behave differently.
pub trait PlaylistInterface: Send + Sync {
    fn core(&self) -> &PlaylistCore;

    fn id(&self) -> &str {
        self.core().id()
    }

    /// The queries known so far, unfiltered and in natural order.
    ///
    /// Lazily populated interfaces start loading on the first call; later
    /// calls return the same list, extended as loading progresses.
    fn tracks(&self) -> Vec<Arc<Query>>;

    fn is_finished(&self) -> bool {
        self.core().is_finished()
    }

    fn unfiltered_track_count(&self) -> usize;
    fn track_count(&self) -> usize;

    fn current_item(&self) -> Option<TrackResult>;

    fn previous_item(&self) -> Option<TrackResult> {
        self.sibling_item(-1)
    }

    fn has_next_item(&self) -> bool {
        true
    }

    fn next_item(&self) -> Option<TrackResult> {
        self.sibling_item(1)
    }

    /// Moves the cursor `items_away` playable items from the current one and
    /// returns the result found there, or `None` if the sequence has no such
    /// item under the active repeat mode.
    fn sibling_item(&self, items_away: i32) -> Option<TrackResult>;

    fn repeat_mode(&self) -> RepeatMode;
    fn set_repeat_mode(&self, mode: RepeatMode);

    fn shuffled(&self) -> bool;
    fn set_shuffled(&self, enabled: bool);

    fn view_mode(&self) -> ViewMode {
        ViewMode::Unknown
    }

    fn seek_restrictions(&self) -> SeekRestrictions {
        SeekRestrictions::NoSeekRestrictions
    }

    fn skip_restrictions(&self) -> SkipRestrictions {
        SkipRestrictions::NoSkipRestrictions
    }

    fn retry_mode(&self) -> RetryMode {
        RetryMode::NoRetry
    }

    fn retry_interval(&self) -> Duration {
        self.core().retry_interval()
    }

    fn set_retry_interval(&self, interval: Duration) {
        self.core().set_retry_interval(interval);
    }

    fn latch_mode(&self) -> LatchMode {
        self.core().latch_mode()
    }

    fn set_latch_mode(&self, mode: LatchMode) {
        self.core().set_latch_mode(mode);
    }

    fn filter(&self) -> String {
        self.core().filter()
    }

    fn set_filter(&self, pattern: &str) {
        self.core().set_filter(pattern);
    }

    fn reset(&self) {}

    /// Whether `other` is wrapped by this interface, directly or through a
    /// nested interface.
    fn has_child_interface(&self, _other: &dyn PlaylistInterface) -> bool {
        false
    }

    fn subscribe(&self) -> Receiver<PlaylistEvent> {
        self.core().subscribe()
    }
}

/// One pass over `pli` from its cursor, in playback order.
///
/// Under `NoRepeat` the walk ends where the sequence does. The repeating
/// modes never run out, so they stop after as many items as `pli` holds.
/// Lazily populated interfaces are loaded first.
pub fn playback_order(pli: &dyn PlaylistInterface) -> Vec<TrackResult> {
    let loaded = pli.tracks().len();
    let limit = match pli.repeat_mode() {
        RepeatMode::NoRepeat => usize::MAX,
        RepeatMode::RepeatOne | RepeatMode::RepeatAll => loaded,
    };

    std::iter::from_fn(|| pli.next_item()).take(limit).collect()
}

/// Keeps the queries matching every whitespace separated word of `pattern`
/// in their artist, album or title.
///
/// An empty pattern keeps everything.
pub fn filter_tracks(queries: &[Arc<Query>], pattern: &str) -> Vec<Arc<Query>> {
    let words: Vec<&str> = pattern.split_whitespace().collect();

    queries
        .iter()
        .filter(|q| words.iter().all(|w| q.matches(w)))
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::Source;

    /// A query resolved by an always-online local result.
    pub(crate) fn playable(title: &str) -> Arc<Query> {
        let query = Query::new("Boards of Canada", title, "Geogaddi");
        query.add_results([TrackResult {
            url: format!("file:///music/{title}.flac"),
            source: None,
            score: 1.0,
            duration: 240,
        }]);
        query
    }

    pub(crate) fn offline(title: &str) -> Arc<Query> {
        let query = Query::new("Boards of Canada", title, "Geogaddi");
        query.add_results([TrackResult {
            url: format!("peer:///{title}"),
            source: Some(Source::new(9, "peer", false)),
            score: 1.0,
            duration: 240,
        }]);
        query
    }

    pub(crate) fn url_title(result: Option<TrackResult>) -> Option<String> {
        result.map(|r| {
            r.url
                .trim_start_matches("file:///music/")
                .trim_end_matches(".flac")
                .to_string()
        })
    }

    #[test]
    fn filter_requires_every_word() {
        let queries = vec![
            Query::new("Aphex Twin", "Xtal", "Selected Ambient Works"),
            Query::new("Aphex Twin", "Avril 14th", "Drukqs"),
            Query::new("Autechre", "Rae", "Tri Repetae"),
        ];

        assert_eq!(filter_tracks(&queries, "").len(), 3);
        assert_eq!(filter_tracks(&queries, "aphex").len(), 2);

        let narrowed = filter_tracks(&queries, "APHEX drukqs");
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].title(), "Avril 14th");
    }

    #[test]
    fn latch_mode_changes_are_notified_once() {
        let core = PlaylistCore::new(true);
        let events = core.subscribe();

        core.set_latch_mode(LatchMode::RealTime);
        core.set_latch_mode(LatchMode::RealTime);

        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![PlaylistEvent::LatchModeChanged(LatchMode::RealTime)]
        );
    }

    #[test]
    fn retry_interval_can_be_configured() {
        let pli = StaticPlaylistInterface::new(Vec::new());
        assert_eq!(pli.retry_interval(), DEFAULT_RETRY_INTERVAL);

        pli.set_retry_interval(Duration::from_secs(5));
        assert_eq!(pli.retry_interval(), Duration::from_secs(5));
    }

    #[test]
    fn playback_order_makes_one_pass_when_repeating() {
        let pli = StaticPlaylistInterface::new(vec![playable("a"), playable("b"), playable("c")]);

        pli.set_repeat_mode(RepeatMode::RepeatAll);
        let titles: Vec<_> = playback_order(pli.as_ref()).into_iter().filter_map(|r| url_title(Some(r))).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);

        pli.reset();
        pli.set_repeat_mode(RepeatMode::RepeatOne);
        let titles: Vec<_> = playback_order(pli.as_ref()).into_iter().filter_map(|r| url_title(Some(r))).collect();
        assert_eq!(titles, vec!["a", "a", "a"]);

        pli.reset();
        pli.set_repeat_mode(RepeatMode::NoRepeat);
        assert_eq!(playback_order(pli.as_ref()).len(), 3);
    }
}
