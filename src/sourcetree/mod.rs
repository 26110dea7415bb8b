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

//! The sources sidebar.
//!
//! [`SourcesModel`] is the tree the sidebar shows: one collection item per
//! source plus categories, playlists and groups. [`SourcesProxyModel`] is the
//! view of it that is actually displayed, with offline sources optionally
//! hidden and every level sorted.
//!
//! Items are addressed by their row path from the root, so `[1, 0]` is the
//! first child of the second top-level item.

mod proxy;

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc::Receiver},
};

use tracing::debug;

use crate::{model::Source, util::notify::Notifier};

pub use proxy::{ProxyRow, SourcesEvent, SourcesProxyModel};

/// Row path of an item in the [`SourcesModel`].
pub type SourceIndex = Vec<usize>;

/// Row path of an item as shown by the [`SourcesProxyModel`].
pub type ProxyIndex = Vec<usize>;

#[derive(Debug, Clone)]
pub enum ItemKind {
    /// The collection of one source, or of all sources combined when
    /// `None`.
    Collection(Option<Arc<Source>>),
    Category,
    Playlist,
    Group,
}

#[derive(Debug, Clone)]
pub struct SourceTreeItem {
    pub text: String,
    pub sort_value: i32,
    pub id: i32,
    pub kind: ItemKind,
    pub children: Vec<SourceTreeItem>,
}

impl SourceTreeItem {
    pub fn new(kind: ItemKind, text: &str, sort_value: i32, id: i32) -> Self {
        Self {
            text: text.to_string(),
            sort_value,
            id,
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<SourceTreeItem>) -> Self {
        self.children = children;
        self
    }

    /// The source behind a collection item.
    pub fn source(&self) -> Option<&Arc<Source>> {
        match &self.kind {
            ItemKind::Collection(source) => source.as_ref(),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, ItemKind::Collection(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcesModelEvent {
    ExpandRequest(SourceIndex),
    SelectRequest(SourceIndex),
}

struct ModelState {
    roots: Vec<SourceTreeItem>,
    view_pages: HashSet<u32>,
}

pub struct SourcesModel {
    state: Mutex<ModelState>,
    notifier: Notifier<SourcesModelEvent>,
}

impl SourcesModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ModelState {
                roots: Vec::new(),
                view_pages: HashSet::new(),
            }),
            notifier: Notifier::new(),
        })
    }

    fn state(&self) -> MutexGuard<'_, ModelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` over the top-level items and the ids of sources with an open
    /// view page.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&[SourceTreeItem], &HashSet<u32>) -> R) -> R {
        let state = self.state();
        f(&state.roots, &state.view_pages)
    }

    /// Appends `item` under `parent` (the root when empty) and returns its
    /// index, or `None` if `parent` does not exist.
    pub fn append_item(&self, parent: &[usize], item: SourceTreeItem) -> Option<SourceIndex> {
        let mut state = self.state();
        let siblings = match parent {
            [] => &mut state.roots,
            _ => &mut item_at_mut(&mut state.roots, parent)?.children,
        };
        siblings.push(item);

        let mut index = parent.to_vec();
        index.push(siblings.len() - 1);
        Some(index)
    }

    pub fn remove_item(&self, index: &[usize]) -> Option<SourceTreeItem> {
        let (row, parent) = index.split_last()?;
        let mut state = self.state();
        let siblings = match parent {
            [] => &mut state.roots,
            _ => &mut item_at_mut(&mut state.roots, parent)?.children,
        };

        (*row < siblings.len()).then(|| siblings.remove(*row))
    }

    pub fn item(&self, index: &[usize]) -> Option<SourceTreeItem> {
        self.read(|roots, _| item_at(roots, index).cloned())
    }

    pub fn row_count(&self, parent: &[usize]) -> usize {
        self.read(|roots, _| match parent {
            [] => roots.len(),
            _ => item_at(roots, parent).map_or(0, |item| item.children.len()),
        })
    }

    /// Records whether a view page for `source_id` is currently open.
    pub fn set_view_page(&self, source_id: u32, open: bool) {
        let mut state = self.state();
        if open {
            state.view_pages.insert(source_id);
        } else {
            state.view_pages.remove(&source_id);
        }
    }

    pub fn sources_with_view_page(&self) -> HashSet<u32> {
        self.state().view_pages.clone()
    }

    pub fn request_expand(&self, index: &[usize]) {
        debug!(?index, "Expand requested");
        self.notifier
            .notify(SourcesModelEvent::ExpandRequest(index.to_vec()));
    }

    pub fn request_select(&self, index: &[usize]) {
        debug!(?index, "Select requested");
        self.notifier
            .notify(SourcesModelEvent::SelectRequest(index.to_vec()));
    }

    pub fn subscribe(&self) -> Receiver<SourcesModelEvent> {
        self.notifier.subscribe()
    }
}

pub(crate) fn item_at<'a>(roots: &'a [SourceTreeItem], index: &[usize]) -> Option<&'a SourceTreeItem> {
    let (first, rest) = index.split_first()?;
    rest.iter()
        .try_fold(roots.get(*first)?, |item, row| item.children.get(*row))
}

fn item_at_mut<'a>(roots: &'a mut [SourceTreeItem], index: &[usize]) -> Option<&'a mut SourceTreeItem> {
    let (first, rest) = index.split_first()?;
    let mut item = roots.get_mut(*first)?;
    for row in rest {
        item = item.children.get_mut(*row)?;
    }
    Some(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_are_addressed_by_row_path() {
        let model = SourcesModel::new();
        let local = model
            .append_item(&[], SourceTreeItem::new(ItemKind::Collection(None), "SuperCollection", 0, 1))
            .unwrap();
        let category = model
            .append_item(&[], SourceTreeItem::new(ItemKind::Category, "Playlists", 1, 2))
            .unwrap();
        let playlist = model
            .append_item(&category, SourceTreeItem::new(ItemKind::Playlist, "Road Trip", 0, 3))
            .unwrap();

        assert_eq!(local, vec![0]);
        assert_eq!(playlist, vec![1, 0]);
        assert_eq!(model.item(&playlist).unwrap().text, "Road Trip");
        assert_eq!(model.row_count(&[]), 2);
        assert_eq!(model.row_count(&category), 1);
        assert!(model.append_item(&[5, 0], SourceTreeItem::new(ItemKind::Group, "x", 0, 4)).is_none());

        assert_eq!(model.remove_item(&playlist).unwrap().id, 3);
        assert!(model.remove_item(&playlist).is_none());
        assert_eq!(model.row_count(&category), 0);
    }

    #[test]
    fn view_pages_and_requests() {
        let model = SourcesModel::new();
        let events = model.subscribe();

        model.set_view_page(4, true);
        model.set_view_page(5, true);
        model.set_view_page(5, false);
        assert_eq!(model.sources_with_view_page(), HashSet::from([4]));

        model.request_expand(&[0, 1]);
        model.request_select(&[2]);
        assert_eq!(events.try_recv().unwrap(), SourcesModelEvent::ExpandRequest(vec![0, 1]));
        assert_eq!(events.try_recv().unwrap(), SourcesModelEvent::SelectRequest(vec![2]));
    }
}
