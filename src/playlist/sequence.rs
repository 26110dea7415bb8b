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

//! Cursor navigation over a filtered, optionally shuffled list of queries.
//!
//! [`TrackSequence`] is the engine the concrete playlist interfaces wrap. It
//! keeps the full list of queries, a *view* of indices into that list (the
//! queries passing the filter, in playback order), and a cursor into the view.
//! The cursor is either `None` or a valid view position.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use rand::{rng, seq::SliceRandom};

use crate::{
    model::{Query, TrackResult},
    playlist::RepeatMode,
};

#[derive(Debug, Default)]
pub(crate) struct TrackSequence {
    tracks: Vec<Arc<Query>>,
    view: Vec<usize>,
    cursor: Option<usize>,
    filter: String,
    repeat_mode: RepeatMode,
    shuffled: bool,
}

impl TrackSequence {
    pub(crate) fn new(tracks: Vec<Arc<Query>>) -> Self {
        let mut sequence = Self {
            tracks,
            ..Self::default()
        };
        sequence.rebuild_view(None);
        sequence
    }

    pub(crate) fn tracks(&self) -> &[Arc<Query>] {
        &self.tracks
    }

    pub(crate) fn unfiltered_len(&self) -> usize {
        self.tracks.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.view.len()
    }

    fn current_index(&self) -> Option<usize> {
        self.cursor.and_then(|c| self.view.get(c)).copied()
    }

    pub(crate) fn current_query(&self) -> Option<&Arc<Query>> {
        self.current_index().map(|i| &self.tracks[i])
    }

    pub(crate) fn current(&self) -> Option<TrackResult> {
        self.current_query()?.best_result()
    }

    pub(crate) fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    /// Returns whether the mode changed.
    pub(crate) fn set_repeat_mode(&mut self, mode: RepeatMode) -> bool {
        std::mem::replace(&mut self.repeat_mode, mode) != mode
    }

    pub(crate) fn shuffled(&self) -> bool {
        self.shuffled
    }

    /// Returns whether the flag changed.
    ///
    /// Enabling shuffle keeps the current item and shuffles everything else
    /// after it; disabling restores natural order around the current item.
    pub(crate) fn set_shuffled(&mut self, enabled: bool) -> bool {
        if self.shuffled == enabled {
            return false;
        }

        self.shuffled = enabled;
        let current = self.current_index();
        self.rebuild_view(current);

        true
    }

    pub(crate) fn set_filter(&mut self, pattern: &str) {
        self.filter = pattern.to_string();
        let current = self.current_index();
        self.rebuild_view(current);
    }

    /// Puts the cursor back before the first item.
    pub(crate) fn reset(&mut self) {
        self.cursor = None;
    }

    /// Adds queries at the end of the list.
    ///
    /// When shuffled, the new items are spread at random over the part of the
    /// view after the cursor; nothing before the cursor moves.
    pub(crate) fn append(&mut self, tracks: Vec<Arc<Query>>) {
        let start = self.tracks.len();
        self.tracks.extend(tracks);

        let words: Vec<String> = self.filter.split_whitespace().map(str::to_string).collect();
        let added = (start..self.tracks.len())
            .filter(|&i| words.iter().all(|w| self.tracks[i].matches(w)))
            .collect::<Vec<_>>();
        self.view.extend(added);

        if self.shuffled {
            let from = self.cursor.map_or(0, |c| c + 1);
            self.view[from..].shuffle(&mut rng());
        }
    }

    /// Replaces the list, keeping the cursor on the same query if it is still
    /// present. A query listed more than once is matched copy by copy, so the
    /// cursor on its second copy stays on the second copy.
    ///
    /// A list that merely extends the current one is appended instead. When
    /// shuffled, the order up to the cursor survives and new queries are
    /// spread over the part after it.
    pub(crate) fn replace(&mut self, tracks: Vec<Arc<Query>>) {
        let extends = tracks.len() >= self.tracks.len()
            && self
                .tracks
                .iter()
                .zip(&tracks)
                .all(|(old, new)| Arc::ptr_eq(old, new));

        if extends {
            let added = tracks[self.tracks.len()..].to_vec();
            if !added.is_empty() {
                self.append(added);
            }
            return;
        }

        let moved = relocate(&self.tracks, &tracks);
        let current = self.current_index().and_then(|i| {
            let query = &self.tracks[i];
            moved[i]
                .or_else(|| tracks.iter().rposition(|q| Arc::ptr_eq(q, query)))
                .or_else(|| tracks.iter().position(|q| q.key() == query.key()))
        });

        let old_view = std::mem::take(&mut self.view);
        self.tracks = tracks;

        if !self.shuffled {
            self.rebuild_view(current);
            return;
        }

        let mut view: Vec<usize> = old_view.iter().filter_map(|&i| moved[i]).collect();
        let mut listed = vec![false; self.tracks.len()];
        for &i in &view {
            listed[i] = true;
        }

        let words: Vec<&str> = self.filter.split_whitespace().collect();
        let added: Vec<usize> = (0..self.tracks.len())
            .filter(|&i| !listed[i] && words.iter().all(|w| self.tracks[i].matches(w)))
            .collect();

        self.cursor = current.and_then(|t| view.iter().position(|&i| i == t));
        view.extend(added);
        self.view = view;

        let from = self.cursor.map_or(0, |c| c + 1);
        self.view[from..].shuffle(&mut rng());
    }

    /// Recomputes the view and puts the cursor back on the track at index
    /// `current` of the full list, if that track is still visible.
    fn rebuild_view(&mut self, current: Option<usize>) {
        let words: Vec<&str> = self.filter.split_whitespace().collect();
        self.view = (0..self.tracks.len())
            .filter(|&i| words.iter().all(|w| self.tracks[i].matches(w)))
            .collect();

        if self.shuffled {
            match current.and_then(|t| self.view.iter().position(|&i| i == t)) {
                Some(pos) => {
                    self.view.swap(0, pos);
                    self.view[1..].shuffle(&mut rng());
                }
                None => self.view.shuffle(&mut rng()),
            }
        }

        self.cursor = current.and_then(|t| self.view.iter().position(|&i| i == t));
    }

    /// Finds the playable item `items_away` steps from the cursor.
    ///
    /// Unplayable queries are skipped and do not count as a step. Under
    /// `RepeatOne` the current item is its own sibling; under `RepeatAll` the
    /// walk wraps at either end; under `NoRepeat` running off an end yields
    /// `None`. Unless `read_only` is set the cursor moves to the item found.
    pub(crate) fn sibling(&mut self, items_away: i32, read_only: bool) -> Option<TrackResult> {
        if self.view.is_empty() {
            return None;
        }

        if items_away == 0 {
            return self.current();
        }

        if self.repeat_mode == RepeatMode::RepeatOne {
            if let Some(result) = self.current() {
                return Some(result);
            }
        }

        let len = self.view.len() as i64;
        let step = i64::from(items_away.signum());
        let mut pos = match self.cursor {
            Some(c) => c as i64,
            None if step > 0 => -1,
            None => return None,
        };

        let mut remaining = items_away.unsigned_abs();
        let mut misses = 0;

        loop {
            pos += step;
            if !(0..len).contains(&pos) {
                if self.repeat_mode != RepeatMode::RepeatAll {
                    return None;
                }
                pos = pos.rem_euclid(len);
            }

            match self.tracks[self.view[pos as usize]].best_result() {
                Some(result) => {
                    misses = 0;
                    remaining -= 1;
                    if remaining == 0 {
                        if !read_only {
                            self.cursor = Some(pos as usize);
                        }
                        return Some(result);
                    }
                }
                None => {
                    misses += 1;
                    if misses >= len {
                        return None;
                    }
                }
            }
        }
    }
}

/// Maps every index of `old` to the index of the same query in `new`. The
/// n-th copy of a query maps to its n-th copy.
fn relocate(old: &[Arc<Query>], new: &[Arc<Query>]) -> Vec<Option<usize>> {
    let mut copies: HashMap<*const Query, VecDeque<usize>> = HashMap::new();
    for (i, query) in new.iter().enumerate() {
        copies.entry(Arc::as_ptr(query)).or_default().push_back(i);
    }

    old.iter()
        .map(|q| copies.get_mut(&Arc::as_ptr(q)).and_then(VecDeque::pop_front))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::playlist::tests::{offline, playable, url_title};

    fn sequence(titles: &[&str]) -> TrackSequence {
        TrackSequence::new(titles.iter().map(|t| playable(t)).collect())
    }

    fn current_title(sequence: &TrackSequence) -> Option<String> {
        url_title(sequence.current())
    }

    #[test]
    fn next_then_previous_returns_to_prior_item() {
        let mut seq = sequence(&["a", "b", "c"]);
        seq.sibling(1, false);
        seq.sibling(1, false);
        assert_eq!(current_title(&seq).as_deref(), Some("b"));

        assert_eq!(url_title(seq.sibling(1, false)).as_deref(), Some("c"));
        assert_eq!(url_title(seq.sibling(-1, false)).as_deref(), Some("b"));
        assert_eq!(current_title(&seq).as_deref(), Some("b"));
    }

    #[test]
    fn repeat_all_wraps_both_ways() {
        let mut seq = sequence(&["a", "b", "c"]);
        seq.set_repeat_mode(RepeatMode::RepeatAll);

        for _ in 0..3 {
            seq.sibling(1, false);
        }
        assert_eq!(url_title(seq.sibling(1, false)).as_deref(), Some("a"));
        assert_eq!(url_title(seq.sibling(-1, false)).as_deref(), Some("c"));
    }

    #[test]
    fn no_repeat_stops_at_the_ends() {
        let mut seq = sequence(&["a", "b"]);
        assert_eq!(seq.sibling(-1, false), None);

        seq.sibling(1, false);
        seq.sibling(1, false);
        assert_eq!(seq.sibling(1, false), None);
        assert_eq!(current_title(&seq).as_deref(), Some("b"));

        seq.reset();
        assert_eq!(seq.current(), None);
    }

    #[test]
    fn repeat_one_stays_on_the_current_item() {
        let mut seq = sequence(&["a", "b"]);
        seq.set_repeat_mode(RepeatMode::RepeatOne);

        // With no current item the first step still starts playback.
        assert_eq!(url_title(seq.sibling(1, false)).as_deref(), Some("a"));
        assert_eq!(url_title(seq.sibling(1, false)).as_deref(), Some("a"));
        assert_eq!(url_title(seq.sibling(-1, false)).as_deref(), Some("a"));
    }

    #[test]
    fn unplayable_items_are_skipped() {
        let mut seq = TrackSequence::new(vec![playable("a"), offline("x"), playable("b")]);

        seq.sibling(1, false);
        assert_eq!(url_title(seq.sibling(1, false)).as_deref(), Some("b"));
        assert_eq!(url_title(seq.sibling(-1, false)).as_deref(), Some("a"));
        assert_eq!(url_title(seq.sibling(2, true)), None);
    }

    #[test]
    fn nothing_playable_ends_the_walk_under_repeat_all() {
        let mut seq = TrackSequence::new(vec![offline("x"), offline("y")]);
        seq.set_repeat_mode(RepeatMode::RepeatAll);

        assert_eq!(seq.sibling(1, false), None);
    }

    #[test]
    fn read_only_lookups_leave_the_cursor() {
        let mut seq = sequence(&["a", "b"]);
        seq.sibling(1, false);

        assert_eq!(url_title(seq.sibling(1, true)).as_deref(), Some("b"));
        assert_eq!(current_title(&seq).as_deref(), Some("a"));
    }

    #[test]
    fn multi_step_siblings() {
        let mut seq = sequence(&["a", "b", "c", "d"]);
        seq.set_repeat_mode(RepeatMode::RepeatAll);
        seq.sibling(1, false);

        assert_eq!(url_title(seq.sibling(2, false)).as_deref(), Some("c"));
        assert_eq!(url_title(seq.sibling(3, false)).as_deref(), Some("b"));
        assert_eq!(url_title(seq.sibling(-2, false)).as_deref(), Some("d"));
    }

    #[test]
    fn shuffle_keeps_current_item_and_the_same_set() {
        let titles: Vec<String> = (0..20).map(|i| format!("t{i}")).collect();
        let mut seq = TrackSequence::new(titles.iter().map(|t| playable(t)).collect());
        seq.sibling(5, false);
        assert_eq!(current_title(&seq).as_deref(), Some("t4"));

        assert!(seq.set_shuffled(true));
        assert!(!seq.set_shuffled(true));
        assert_eq!(current_title(&seq).as_deref(), Some("t4"));

        let mut seen = HashSet::new();
        seen.insert(current_title(&seq).unwrap());
        while let Some(result) = seq.sibling(1, false) {
            seen.insert(url_title(Some(result)).unwrap());
        }
        assert_eq!(seen.len(), 20);

        assert!(seq.set_shuffled(false));
        let current = current_title(&seq).unwrap();
        let next = url_title(seq.sibling(1, true));
        let index: usize = current.trim_start_matches('t').parse().unwrap();
        if index < 19 {
            assert_eq!(next, Some(format!("t{}", index + 1)));
        }
    }

    #[test]
    fn filter_keeps_or_clears_the_cursor() {
        let mut seq = TrackSequence::new(vec![
            Query::new("Low", "Sunflower", "Things We Lost in the Fire"),
            Query::new("Low", "Dinosaur Act", "Things We Lost in the Fire"),
            Query::new("Low", "Monkey", "The Great Destroyer"),
        ]);
        for query in seq.tracks().to_vec() {
            query.add_results([TrackResult {
                url: query.title().to_string(),
                source: None,
                score: 1.0,
                duration: 1,
            }]);
        }

        seq.sibling(1, false);
        seq.set_filter("fire");
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.unfiltered_len(), 3);
        assert_eq!(seq.current().unwrap().url, "Sunflower");

        seq.set_filter("destroyer");
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.current(), None);
        assert_eq!(seq.sibling(1, false).unwrap().url, "Monkey");

        seq.set_filter("");
        assert_eq!(seq.current().unwrap().url, "Monkey");
    }

    #[test]
    fn append_while_shuffled_keeps_history() {
        let mut seq = sequence(&["a", "b", "c"]);
        seq.set_shuffled(true);
        let first = url_title(seq.sibling(1, false));
        let second = url_title(seq.sibling(1, false));

        seq.append(vec![playable("d"), playable("e")]);

        assert_eq!(seq.len(), 5);
        assert_eq!(url_title(seq.current()), second);
        assert_eq!(url_title(seq.sibling(-1, true)), first);

        let mut rest = HashSet::new();
        while let Some(result) = seq.sibling(1, false) {
            rest.insert(url_title(Some(result)).unwrap());
        }
        assert_eq!(rest.len(), 3);
        assert!(rest.contains("d") && rest.contains("e"));
    }

    #[test]
    fn replace_keeps_cursor_on_the_same_query() {
        let a = playable("a");
        let b = playable("b");
        let mut seq = TrackSequence::new(vec![Arc::clone(&a), Arc::clone(&b)]);
        seq.sibling(2, false);

        seq.replace(vec![playable("z"), Arc::clone(&a), Arc::clone(&b)]);
        assert_eq!(current_title(&seq).as_deref(), Some("b"));
        assert_eq!(url_title(seq.sibling(-1, true)).as_deref(), Some("a"));

        seq.replace(vec![playable("z"), a, b, playable("c")]);
        assert_eq!(seq.len(), 4);
        assert_eq!(url_title(seq.sibling(1, false)).as_deref(), Some("c"));
    }

    #[test]
    fn replace_keeps_the_copy_the_cursor_is_on() {
        let dup = playable("dup");
        let mut seq = TrackSequence::new(vec![playable("x"), Arc::clone(&dup), playable("y"), Arc::clone(&dup)]);
        seq.sibling(4, false);

        let mut tracks = seq.tracks().to_vec();
        tracks.insert(1, playable("z"));
        seq.replace(tracks);

        assert_eq!(seq.sibling(1, true), None);
        assert_eq!(url_title(seq.sibling(-1, true)).as_deref(), Some("y"));
    }

    #[test]
    fn replace_falls_back_to_the_same_song() {
        let mut seq = sequence(&["a", "b"]);
        seq.sibling(2, false);

        seq.replace(vec![playable("z"), playable("a"), playable("b")]);

        assert_eq!(current_title(&seq).as_deref(), Some("b"));
    }

    #[test]
    fn replace_while_shuffled_keeps_history() {
        let tracks: Vec<_> = (0..10).map(|i| playable(&format!("t{i}"))).collect();
        let mut seq = TrackSequence::new(tracks.clone());
        seq.set_shuffled(true);
        let played: Vec<String> = (0..4).map(|_| url_title(seq.sibling(1, false)).unwrap()).collect();

        let mut grown = vec![playable("new")];
        grown.extend(tracks);
        seq.replace(grown);

        assert_eq!(seq.len(), 11);
        assert_eq!(current_title(&seq).as_ref(), played.last());
        let history: Vec<String> = (1..4).map(|n| url_title(seq.sibling(-n, true)).unwrap()).collect();
        assert_eq!(history, vec![played[2].clone(), played[1].clone(), played[0].clone()]);

        let mut rest = HashSet::new();
        while let Some(result) = seq.sibling(1, false) {
            rest.insert(url_title(Some(result)).unwrap());
        }
        assert_eq!(rest.len(), 7);
        assert!(rest.contains("new"));
        assert!(played.iter().all(|p| !rest.contains(p)));
    }
}
