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

//! Catalog store.
//!
//! This module handles all interactions with the SQLite catalog: schema
//! creation, artist and album id resolution, and album track listings. It uses
//! cached statements to optimise frequently executed queries.
//!
//! # Tables
//!
//! * `artists` - Unique artist names and their sort names.
//! * `albums` - Groups tracks under names, linked to artists.
//! * `tracks` - Individual tracks with the source that provides them.
//!
//! [`Catalog`] is the shared, cloneable handle the rest of the crate holds.
//! The free functions take a bare [`Connection`] so they can run inside the
//! scanner's transaction as well.

mod model;
pub mod scan;

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};

use crate::util::sortname;

pub use model::CatalogTrack;

/// Opens a connection to the SQLite database and configures it.
///
/// This function performs the following setup:
/// * **WAL Mode**: Enables Write-Ahead Logging for better concurrency.
/// * **Constraints**: Enforces foreign key integrity.
/// * **Schema**: Executes [`create_schema`] to ensure all tables and indices exist.
///
/// # Errors
///
/// Returns an error if the database file cannot be opened, the PRAGMA
/// configuration fails, or the schema initialisation fails.
pub(crate) fn init_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open catalog at {}", path.display()))?;

    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;
    if journal_mode != "wal" {
        anyhow::bail!(
            "Failed to switch to WAL mode. Current mode: {}",
            journal_mode
        );
    }

    configure(&conn)?;

    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;

    conn.set_prepared_statement_cache_capacity(100);

    create_schema(conn)
}

/// Create the database schema.
///
/// The whole schema is created in a single transaction. Deleting an artist
/// removes its albums, and deleting an album removes its tracks.
fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS artists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            sortname TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS albums (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            artist_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            sortname TEXT NOT NULL,
            UNIQUE (artist_id, sortname),
            FOREIGN KEY (artist_id) REFERENCES artists (id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_albums_artist_id ON albums (artist_id);

        CREATE TABLE IF NOT EXISTS tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            album_id INTEGER NOT NULL,
            source_id INTEGER NOT NULL DEFAULT 0,
            track_number INTEGER,
            title TEXT NOT NULL,
            duration INTEGER NOT NULL DEFAULT 0,
            filename TEXT NOT NULL,
            UNIQUE (source_id, filename),
            FOREIGN KEY (album_id) REFERENCES albums (id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_tracks_album_id ON tracks (album_id);

        COMMIT;",
    )
    .context("Failed to create schema")
}

/// Looks up the id of an artist by name, optionally creating the artist.
///
/// Names are compared by their sort name. Returns `0` when the artist does not
/// exist and `auto_create` is not set.
pub(crate) fn artist_id(conn: &Connection, name: &str, auto_create: bool) -> Result<u32> {
    let key = sortname(name, false);

    let mut stmt = conn.prepare_cached("SELECT id FROM artists WHERE sortname = ?")?;
    if let Some(id) = stmt.query_row([&key], |r| r.get(0)).optional()? {
        return Ok(id);
    }

    if !auto_create {
        return Ok(0);
    }

    let mut insert = conn.prepare_cached("INSERT INTO artists (name, sortname) VALUES (?, ?)")?;
    insert.execute(params![name, key])?;

    Ok(u32::try_from(conn.last_insert_rowid())?)
}

/// Looks up the id of an album of `artist_id` by name, optionally creating
/// the album.
///
/// Returns `0` when the album does not exist and `auto_create` is not set.
pub(crate) fn album_id(
    conn: &Connection,
    artist_id: u32,
    name: &str,
    auto_create: bool,
) -> Result<u32> {
    let key = sortname(name, false);

    let mut stmt =
        conn.prepare_cached("SELECT id FROM albums WHERE artist_id = ? AND sortname = ?")?;
    if let Some(id) = stmt.query_row(params![artist_id, key], |r| r.get(0)).optional()? {
        return Ok(id);
    }

    if !auto_create || artist_id == 0 {
        return Ok(0);
    }

    let mut insert =
        conn.prepare_cached("INSERT INTO albums (artist_id, name, sortname) VALUES (?, ?, ?)")?;
    insert.execute(params![artist_id, name, key])?;

    Ok(u32::try_from(conn.last_insert_rowid())?)
}

/// Fetches the tracks of an album, ordered by track number and title.
///
/// When `source_id` is given only the tracks offered by that source are
/// returned.
pub(crate) fn fetch_album_tracks(
    conn: &Connection,
    album_id: u32,
    source_id: Option<u32>,
) -> Result<Vec<CatalogTrack>> {
    let sql = "
        SELECT ar.name, al.name, tr.id, tr.source_id, tr.track_number, tr.title, tr.duration, tr.filename
        FROM tracks tr
        JOIN albums al ON tr.album_id = al.id
        JOIN artists ar ON al.artist_id = ar.id
        WHERE al.id = ?1 AND (?2 IS NULL OR tr.source_id = ?2)
        ORDER BY tr.track_number, tr.title
    ";

    let mut stmt = conn.prepare_cached(sql)?;
    let results = stmt
        .query_map(params![album_id, source_id], CatalogTrack::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

/// Fetches the file names of every track of an album.
pub(crate) fn fetch_album_files(conn: &Connection, album_id: u32) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT filename FROM tracks WHERE album_id = ? ORDER BY track_number, title",
    )?;
    let results = stmt
        .query_map([album_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

/// Inserts one track, creating its artist and album as needed.
pub(crate) fn insert_track(
    conn: &Connection,
    artist: &str,
    album: &str,
    track: &NewTrack,
) -> Result<u32> {
    let artist_id = artist_id(conn, artist, true)?;
    let album_id = album_id(conn, artist_id, album, true)?;

    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO tracks (album_id, source_id, track_number, title, duration, filename)
         VALUES (?, ?, ?, ?, ?, ?)",
    )?;
    stmt.execute(params![
        album_id,
        track.source_id,
        track.track_number,
        track.title,
        track.duration,
        track.filename
    ])?;

    Ok(album_id)
}

/// The fields of a track that is about to be catalogued.
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub source_id: u32,
    pub track_number: Option<u32>,
    pub title: String,
    pub duration: u32,
    pub filename: String,
}

/// Shared handle to the catalog store.
///
/// Cloning is cheap; all clones talk to the same connection.
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    /// Opens (or creates) the catalog database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = init_db(path.as_ref())?;
        Ok(Self::from_connection(conn))
    }

    /// Creates a catalog that lives only as long as the process.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Catalog connection poisoned"))
    }

    pub fn artist_id(&self, name: &str, auto_create: bool) -> Result<u32> {
        artist_id(&*self.lock()?, name, auto_create)
    }

    pub fn album_id(&self, artist_id: u32, name: &str, auto_create: bool) -> Result<u32> {
        album_id(&*self.lock()?, artist_id, name, auto_create)
    }

    pub fn album_tracks(&self, album_id: u32, source_id: Option<u32>) -> Result<Vec<CatalogTrack>> {
        fetch_album_tracks(&*self.lock()?, album_id, source_id)
    }

    pub fn album_files(&self, album_id: u32) -> Result<Vec<String>> {
        fetch_album_files(&*self.lock()?, album_id)
    }

    /// Resolves an album by artist and album name without creating anything.
    ///
    /// Returns `0` when either is unknown.
    pub fn find_album(&self, artist: &str, album: &str) -> Result<u32> {
        let conn = self.lock()?;
        let artist_id = artist_id(&conn, artist, false)?;
        if artist_id == 0 {
            return Ok(0);
        }
        album_id(&conn, artist_id, album, false)
    }

    pub fn add_track(&self, artist: &str, album: &str, track: &NewTrack) -> Result<u32> {
        insert_track(&*self.lock()?, artist, album, track)
    }

    /// Re-indexes `root` as the collection of `source_id`.
    ///
    /// See [`scan::process_collection`].
    pub fn scan_collection(&self, root: &Path, source_id: u32) -> Result<u32> {
        let mut conn = self.lock()?;
        scan::process_collection(&mut conn, root, source_id)
    }
}
