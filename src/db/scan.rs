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

//! Local collection indexing.
//!
//! This module discovers audio files on the local filesystem and records them
//! in the catalog under the source that offers them.
//!
//! It uses `WalkDir` for directory traversal and `Lofty` for metadata
//! extraction. A scan replaces every track previously catalogued for the
//! source, inside one SQLite transaction.

use std::path::Path;

use anyhow::{Context, Result};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;
use rusqlite::{Connection, params};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::db::{NewTrack, insert_track};

const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "flac", "ogg", "m4a", "opus"];

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Recursively scans `root` for audio files and catalogues them as the
/// collection of `source_id`.
///
/// Files whose path is not valid UTF-8, that cannot be probed, or that carry
/// no tags are skipped. Album
/// artist tags take precedence over track artist tags so compilations stay in
/// one album.
///
/// # Returns
///
/// The number of tracks catalogued for the source.
///
/// # Errors
///
/// Returns an error if the transaction fails or if database constraints are
/// violated during insertion.
pub(crate) fn process_collection(conn: &mut Connection, root: &Path, source_id: u32) -> Result<u32> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM tracks WHERE source_id = ?", params![source_id])?;

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| is_audio_file(e.path()))
    {
        let path = entry.path();

        let Some(filename) = path.to_str().map(str::to_string) else {
            debug!(path = %path.display(), "Skipping file with a non UTF-8 path");
            continue;
        };

        let tagged_file = match Probe::open(path).and_then(|p| p.read()) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                continue;
            }
        };

        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            debug!(path = %path.display(), "Skipping file without tags");
            continue;
        };

        let artist_name = tag
            .get(ItemKey::AlbumArtist)
            .and_then(|item| item.value().text())
            .map(|s| s.to_string())
            .or_else(|| tag.artist().map(|a| a.to_string()))
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let album_name = tag
            .album()
            .map(|a| a.to_string())
            .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

        let title = tag.title().map(|t| t.to_string()).unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| filename.clone())
        });

        let track = NewTrack {
            source_id,
            track_number: tag.track(),
            title,
            duration: u32::try_from(tagged_file.properties().duration().as_secs()).unwrap_or(0),
            filename,
        };

        insert_track(&tx, &artist_name, &album_name, &track)?;
    }

    tx.commit().context("Failed to commit transaction")?;

    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM tracks WHERE source_id = ?",
        params![source_id],
        |row| row.get(0),
    )?;

    info!(root = %root.display(), source_id, count, "Collection scan finished");

    Ok(count)
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}
