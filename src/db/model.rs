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

//! Database row mapping for catalog tracks.

use rusqlite::Row;

/// A track as stored in the catalog, joined with its album and artist names.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTrack {
    pub artist_name: String,
    pub album_name: String,
    pub track_id: u32,
    pub source_id: u32,
    pub track_number: Option<u32>,
    pub title: String,
    pub duration: u32,
    pub filename: String,
}

impl CatalogTrack {
    /// Maps an SQLite row to a [`CatalogTrack`] instance.
    ///
    /// This is a helper function designed to be used with [`rusqlite::Statement::query_map`].
    ///
    /// # Errors
    ///
    /// Returns a [`rusqlite::Error`] if:
    /// * The row does not contain enough columns.
    /// * The data in a column cannot be converted to the required Rust type.
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            artist_name: row.get(0)?,
            album_name: row.get(1)?,
            track_id: row.get(2)?,
            source_id: row.get(3)?,
            track_number: row.get(4)?,
            title: row.get(5)?,
            duration: row.get(6)?,
            filename: row.get(7)?,
        })
    }
}
