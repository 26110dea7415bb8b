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

//! Conversions between playlist data and the resolver's JSON track format.
//!
//! A track travels as `{"artist", "track", "album", "id"}`, where `id` is the
//! Spotify track id and is left out when unknown.

use std::{collections::HashMap, sync::Arc};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    model::{PlaylistEntry, Query},
    spotify::UpdaterError,
};

#[derive(Debug, Deserialize)]
struct TrackVariant {
    #[serde(default)]
    artist: String,
    #[serde(default)]
    track: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    id: String,
}

/// A track announced by Spotify, with its Spotify id (possibly empty).
#[derive(Debug, Clone)]
pub struct SpotifyTrack {
    pub query: Arc<Query>,
    pub id: String,
}

pub fn query_to_variant(query: &Query, spotify_id: Option<&str>) -> Value {
    let mut track = json!({
        "artist": query.artist(),
        "track": query.title(),
        "album": query.album(),
    });

    if let Some(id) = spotify_id.filter(|id| !id.is_empty()) {
        track["id"] = Value::from(id);
    }

    track
}

/// Converts `queries`, attaching the Spotify ids known for them.
pub fn queries_to_variant(queries: &[Arc<Query>], spotify_ids: &HashMap<u64, String>) -> Value {
    queries
        .iter()
        .map(|q| query_to_variant(q, spotify_ids.get(&q.key()).map(String::as_str)))
        .collect()
}

/// Converts playlist entries, using each annotation as the Spotify id.
pub fn plentry_to_variant(entries: &[PlaylistEntry]) -> Value {
    entries
        .iter()
        .map(|e| query_to_variant(&e.query, Some(&e.annotation)))
        .collect()
}

/// Parses a resolver track list. Tracks without an artist or title are
/// skipped.
pub fn variant_to_queries(list: &Value) -> Vec<SpotifyTrack> {
    let Some(items) = list.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match track_from_variant(item) {
            Ok(track) => Some(track),
            Err(e) => {
                debug!(error = %e, "Skipping Spotify track");
                None
            }
        })
        .collect()
}

fn track_from_variant(item: &Value) -> Result<SpotifyTrack, UpdaterError> {
    let track = TrackVariant::deserialize(item)?;

    if track.artist.is_empty() {
        return Err(UpdaterError::MissingField("artist"));
    }
    if track.track.is_empty() {
        return Err(UpdaterError::MissingField("track"));
    }

    Ok(SpotifyTrack {
        query: Query::new(&track.artist, &track.track, &track.album),
        id: track.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_are_left_out() {
        let query = Query::new("Björk", "Hyperballad", "Post");

        assert_eq!(
            query_to_variant(&query, None),
            json!({"artist": "Björk", "track": "Hyperballad", "album": "Post"})
        );
        assert_eq!(query_to_variant(&query, Some(""))["id"], Value::Null);
        assert_eq!(query_to_variant(&query, Some("spotify:track:1"))["id"], "spotify:track:1");
    }

    #[test]
    fn queries_pick_up_known_ids() {
        let known = Query::new("Björk", "Army of Me", "Post");
        let unknown = Query::new("Björk", "Isobel", "Post");
        let ids = HashMap::from([(known.key(), "spotify:track:2".to_string())]);

        let value = queries_to_variant(&[known, unknown], &ids);

        assert_eq!(value[0]["id"], "spotify:track:2");
        assert!(value[1].get("id").is_none());
    }

    #[test]
    fn entries_carry_their_annotation() {
        let entry = PlaylistEntry::with_annotation(Query::new("a", "t", "b"), "spotify:track:3");
        assert_eq!(plentry_to_variant(&[entry])[0]["id"], "spotify:track:3");
    }

    #[test]
    fn incomplete_tracks_are_skipped() {
        let list = json!([
            {"artist": "Björk", "track": "Possibly Maybe", "album": "Post", "id": "spotify:track:4"},
            {"artist": "Björk", "album": "Post"},
            {"track": "Enjoy"},
            {"artist": 5, "track": "Headphones"},
            {"artist": "Björk", "track": "I Miss You"},
        ]);

        let tracks = variant_to_queries(&list);

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].query.title(), "Possibly Maybe");
        assert_eq!(tracks[0].id, "spotify:track:4");
        assert_eq!(tracks[1].query.album(), "");
        assert_eq!(tracks[1].id, "");
        assert!(variant_to_queries(&json!({"not": "a list"})).is_empty());
    }
}
