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

//! Artists.
//!
//! Like albums, artists are shared: [`Artist::get`] hands out the one live
//! instance for a catalog id.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, Mutex, PoisonError},
};

use tracing::warn;

use crate::{db::Catalog, util::sortname};

static ARTISTS: LazyLock<Mutex<HashMap<u32, Arc<Artist>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Debug)]
pub struct Artist {
    id: u32,
    name: String,
    sortname: String,
}

impl Artist {
    /// Returns the shared artist for `id`, creating it on first use.
    ///
    /// Id `0` means "not in the catalog"; such artists are never cached.
    pub fn get(id: u32, name: &str) -> Arc<Artist> {
        let mut artists = ARTISTS.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(artist) = artists.get(&id) {
            return Arc::clone(artist);
        }

        let artist = Arc::new(Artist {
            id,
            name: name.to_string(),
            sortname: sortname(name, true),
        });

        if id > 0 {
            artists.insert(id, Arc::clone(&artist));
        }

        artist
    }

    /// Resolves an artist by name through the catalog.
    ///
    /// Returns `None` when there is no catalog, when the lookup fails, or when
    /// `auto_create` is set but no id could be produced.
    pub fn get_by_name(catalog: Option<&Catalog>, name: &str, auto_create: bool) -> Option<Arc<Artist>> {
        let catalog = catalog?;

        let id = match catalog.artist_id(name, auto_create) {
            Ok(id) => id,
            Err(e) => {
                warn!(artist = name, error = %format!("{e:#}"), "Artist lookup failed");
                return None;
            }
        };

        if id < 1 && auto_create {
            return None;
        }

        Some(Artist::get(id, name))
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
}
