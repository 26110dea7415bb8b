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

//! Filtered, sorted view of the sources tree.

use std::{
    cmp::Ordering,
    collections::HashSet,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        mpsc::Receiver,
    },
};

use tracing::debug;

use crate::{
    config::AppConfig,
    sourcetree::{ProxyIndex, SourceIndex, SourceTreeItem, SourcesModel, SourcesModelEvent, item_at},
    util::notify::Notifier,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcesEvent {
    ExpandRequest(ProxyIndex),
    SelectRequest(ProxyIndex),
    /// The set of visible rows may have changed.
    FilterChanged,
}

/// One visible row and its visible children.
#[derive(Debug, Clone)]
pub struct ProxyRow {
    pub text: String,
    pub id: i32,
    pub source_index: SourceIndex,
    pub children: Vec<ProxyRow>,
}

pub struct SourcesProxyModel {
    model: Arc<SourcesModel>,
    filtered: AtomicBool,
    model_events: Mutex<Receiver<SourcesModelEvent>>,
    notifier: Notifier<SourcesEvent>,
}

impl SourcesProxyModel {
    /// Creates a proxy over `model` that initially shows every source.
    pub fn new(model: Arc<SourcesModel>) -> Self {
        let model_events = Mutex::new(model.subscribe());

        Self {
            model,
            filtered: AtomicBool::new(false),
            model_events,
            notifier: Notifier::new(),
        }
    }

    /// Creates a proxy over `model` honouring the configured
    /// `show_offline_sources`.
    pub fn from_config(model: Arc<SourcesModel>, config: &AppConfig) -> Self {
        let proxy = Self::new(model);
        proxy
            .filtered
            .store(!config.show_offline_sources, AtomicOrdering::Relaxed);
        proxy
    }

    pub fn model(&self) -> &Arc<SourcesModel> {
        &self.model
    }

    pub fn show_offline_sources(&self, shown: bool) {
        let was_filtered = self.filtered.swap(!shown, AtomicOrdering::Relaxed);
        if was_filtered == shown {
            self.notifier.notify(SourcesEvent::FilterChanged);
        }
    }

    fn is_filtered(&self) -> bool {
        self.filtered.load(AtomicOrdering::Relaxed)
    }

    /// Whether row `source_row` under `source_parent` is shown.
    ///
    /// Collection rows of offline sources are hidden while offline sources
    /// are filtered out, unless a view page for the source is open. Every
    /// other row is shown.
    pub fn filter_accepts_row(&self, source_row: usize, source_parent: &[usize]) -> bool {
        let filtered = self.is_filtered();
        self.model.read(|roots, view_pages| {
            let siblings = match source_parent {
                [] => Some(roots),
                _ => item_at(roots, source_parent).map(|p| p.children.as_slice()),
            };
            siblings
                .and_then(|s| s.get(source_row))
                .is_some_and(|item| accepts(item, filtered, view_pages))
        })
    }

    /// Whether the item at `left` sorts before the item at `right`.
    pub fn less_than(&self, left: &[usize], right: &[usize]) -> bool {
        self.model.read(|roots, _| match (item_at(roots, left), item_at(roots, right)) {
            (Some(l), Some(r)) => compare(l, r) == Ordering::Less,
            _ => false,
        })
    }

    /// The visible tree, filtered and sorted at every level.
    pub fn rows(&self) -> Vec<ProxyRow> {
        let filtered = self.is_filtered();
        self.model
            .read(|roots, view_pages| build_rows(roots, &[], filtered, view_pages))
    }

    /// Maps a source model index to where it is shown, or `None` if it or one
    /// of its ancestors is hidden.
    pub fn map_from_source(&self, index: &[usize]) -> Option<ProxyIndex> {
        if index.is_empty() {
            return None;
        }

        let filtered = self.is_filtered();
        self.model.read(|roots, view_pages| {
            let mut siblings = roots;
            let mut mapped = Vec::with_capacity(index.len());

            for &row in index {
                let order = visible_order(siblings, filtered, view_pages);
                mapped.push(order.iter().position(|r| *r == row)?);
                siblings = &siblings[row].children;
            }

            Some(mapped)
        })
    }

    pub fn subscribe(&self) -> Receiver<SourcesEvent> {
        self.notifier.subscribe()
    }

    /// Forwards the model's expand and select requests as proxy indices.
    ///
    /// Requests for rows that are currently hidden are dropped.
    pub fn process_model_events(&self) {
        let events: Vec<_> = {
            let receiver = self.model_events.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.try_iter().collect()
        };

        for event in events {
            match event {
                SourcesModelEvent::ExpandRequest(index) => self.expand_requested(&index),
                SourcesModelEvent::SelectRequest(index) => self.select_requested(&index),
            }
        }
    }

    pub fn expand_requested(&self, index: &[usize]) {
        match self.map_from_source(index) {
            Some(mapped) => {
                debug!(?index, ?mapped, "Emitting expand request");
                self.notifier.notify(SourcesEvent::ExpandRequest(mapped));
            }
            None => debug!(?index, "Expand request for a hidden row dropped"),
        }
    }

    pub fn select_requested(&self, index: &[usize]) {
        match self.map_from_source(index) {
            Some(mapped) => {
                debug!(?index, ?mapped, "Emitting select request");
                self.notifier.notify(SourcesEvent::SelectRequest(mapped));
            }
            None => debug!(?index, "Select request for a hidden row dropped"),
        }
    }
}

fn accepts(item: &SourceTreeItem, filtered: bool, view_pages: &HashSet<u32>) -> bool {
    if !filtered || !item.is_collection() {
        return true;
    }

    item.source()
        .is_none_or(|source| source.is_online() || view_pages.contains(&source.id()))
}

/// Sort role first, then case-insensitive text, then id.
fn compare(left: &SourceTreeItem, right: &SourceTreeItem) -> Ordering {
    left.sort_value
        .cmp(&right.sort_value)
        .then_with(|| left.text.to_lowercase().cmp(&right.text.to_lowercase()))
        .then_with(|| left.id.cmp(&right.id))
}

/// Source rows of the visible `siblings`, in display order.
fn visible_order(siblings: &[SourceTreeItem], filtered: bool, view_pages: &HashSet<u32>) -> Vec<usize> {
    let mut rows: Vec<usize> = (0..siblings.len())
        .filter(|&row| accepts(&siblings[row], filtered, view_pages))
        .collect();
    rows.sort_by(|&a, &b| compare(&siblings[a], &siblings[b]));
    rows
}

fn build_rows(
    siblings: &[SourceTreeItem],
    parent: &[usize],
    filtered: bool,
    view_pages: &HashSet<u32>,
) -> Vec<ProxyRow> {
    visible_order(siblings, filtered, view_pages)
        .into_iter()
        .map(|row| {
            let item = &siblings[row];
            let mut source_index = parent.to_vec();
            source_index.push(row);

            ProxyRow {
                text: item.text.clone(),
                id: item.id,
                children: build_rows(&item.children, &source_index, filtered, view_pages),
                source_index,
            }
        })
        .collect()
}
