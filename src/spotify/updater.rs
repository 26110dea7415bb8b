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

//! Two-way synchronisation of a local playlist with a Spotify playlist.
//!
//! Changes flow in both directions:
//!
//! * Spotify reports edits through the `spotify_*` callbacks. They are applied
//!   to the local playlist only if they were made against the revision we last
//!   saw; anything else is stale and dropped.
//! * Local edits arrive as [`PlaylistChange`]s (see
//!   [`process_playlist_changes`](SpotifyPlaylistUpdater::process_playlist_changes))
//!   and are forwarded to the resolver as JSON messages tagged with a `qid`.
//!   Replies are matched back by that `qid`.
//!
//! Applying a Spotify edit locally produces a local change of its own. That
//! echo is recognised by the entries or title it touches and swallowed, so it
//! is not sent straight back to Spotify.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak, mpsc::Receiver},
};

use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    model::{Playlist, PlaylistChange, PlaylistEntry, Query},
    spotify::{
        ResolverChannel, TYPE_NAME, UpdaterError,
        variant::{plentry_to_variant, queries_to_variant, variant_to_queries},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Insert,
    Remove,
    Move,
}

impl PendingKind {
    fn name(self) -> &'static str {
        match self {
            PendingKind::Insert => "insert",
            PendingKind::Remove => "remove",
            PendingKind::Move => "move",
        }
    }
}

/// A request sent to the resolver that still waits for its reply.
#[derive(Debug)]
struct PendingRequest {
    kind: PendingKind,
    /// Entries of an insert, in the order they were sent. The reply refers to
    /// them by position.
    waiting_for_ids: Vec<PlaylistEntry>,
}

impl PendingRequest {
    fn new(kind: PendingKind) -> Self {
        Self {
            kind,
            waiting_for_ids: Vec::new(),
        }
    }
}

/// The local change a Spotify edit is going to produce once applied.
#[derive(Debug)]
enum Echo {
    Inserted(Vec<String>),
    Removed(Vec<Arc<Query>>),
    Moved(Vec<String>),
    Renamed(String),
}

impl Echo {
    fn is_insert_of(&self, entries: &[PlaylistEntry]) -> bool {
        matches!(self, Echo::Inserted(guids) if same_entries(guids, entries))
    }

    fn is_removal_of(&self, queries: &[Arc<Query>]) -> bool {
        matches!(self, Echo::Removed(expected)
            if expected.len() == queries.len()
                && queries.iter().all(|q| expected.iter().any(|e| Arc::ptr_eq(e, q))))
    }

    fn is_move_of(&self, entries: &[PlaylistEntry]) -> bool {
        matches!(self, Echo::Moved(guids) if same_entries(guids, entries))
    }

    fn is_rename_to(&self, new_title: &str) -> bool {
        matches!(self, Echo::Renamed(title) if title == new_title)
    }
}

fn same_entries(guids: &[String], entries: &[PlaylistEntry]) -> bool {
    guids.len() == entries.len() && entries.iter().all(|e| guids.contains(&e.guid))
}

/// A Spotify edit that arrived before the local playlist was loaded.
#[derive(Debug)]
enum QueuedOp {
    TracksAdded {
        tracks: Value,
        start_pos_id: String,
        new_rev: String,
        old_rev: String,
    },
    TracksRemoved {
        track_ids: Vec<String>,
        new_rev: String,
        old_rev: String,
    },
    TracksMoved {
        track_ids: Vec<String>,
        new_start_pos: String,
        new_rev: String,
        old_rev: String,
    },
    Renamed {
        title: String,
        new_rev: String,
        old_rev: String,
    },
}

struct UpdaterState {
    latest_rev: String,
    sync: bool,
    /// Local changes still expected as echoes of applied Spotify edits.
    echoes: Vec<Echo>,
    pending: HashMap<String, PendingRequest>,
    queued: VecDeque<QueuedOp>,
    /// Spotify track ids by query key, for tracks that are no longer in the
    /// playlist by the time their removal is reported.
    spotify_ids: HashMap<u64, String>,
}

pub struct SpotifyPlaylistUpdater {
    account: Weak<dyn ResolverChannel>,
    spotify_id: String,
    playlist: Arc<Playlist>,
    changes: Mutex<Receiver<PlaylistChange>>,
    state: Mutex<UpdaterState>,
}

impl SpotifyPlaylistUpdater {
    /// Creates an updater linking `playlist` to the Spotify playlist
    /// `spotify_id`, last seen at revision `latest_rev`.
    ///
    /// Syncing starts switched off.
    pub fn new(
        account: Weak<dyn ResolverChannel>,
        latest_rev: &str,
        spotify_id: &str,
        playlist: Arc<Playlist>,
    ) -> Arc<Self> {
        let changes = playlist.subscribe();
        let spotify_ids = known_ids(&playlist.entries());

        Arc::new(Self {
            account,
            spotify_id: spotify_id.to_string(),
            playlist,
            changes: Mutex::new(changes),
            state: Mutex::new(UpdaterState {
                latest_rev: latest_rev.to_string(),
                sync: false,
                echoes: Vec::new(),
                pending: HashMap::new(),
                queued: VecDeque::new(),
                spotify_ids,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, UpdaterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    pub fn sync(&self) -> bool {
        self.state().sync
    }

    pub fn set_sync(&self, sync: bool) {
        self.state().sync = sync;
    }

    pub fn spotify_id(&self) -> &str {
        &self.spotify_id
    }

    pub fn latest_rev(&self) -> String {
        self.state().latest_rev.clone()
    }

    pub fn playlist(&self) -> &Arc<Playlist> {
        &self.playlist
    }

    /// The settings needed to recreate this updater with
    /// [`SpotifyUpdaterFactory::create`](crate::spotify::SpotifyUpdaterFactory::create).
    pub fn save_to_settings(&self) -> HashMap<String, String> {
        let state = self.state();
        HashMap::from([
            ("spotifyId".to_string(), self.spotify_id.clone()),
            ("latestrev".to_string(), state.latest_rev.clone()),
            ("sync".to_string(), state.sync.to_string()),
        ])
    }

    /// Stops syncing and asks the resolver to forget this playlist.
    ///
    /// With `delete_remote` the Spotify playlist itself is deleted too.
    pub fn remove(&self, delete_remote: bool) {
        let was_syncing = std::mem::replace(&mut self.state().sync, false);

        if delete_remote && was_syncing {
            self.send(json!({"_msgtype": "deletePlaylist", "playlistid": self.spotify_id}), None);
        }
        self.send(json!({"_msgtype": "removeFromSyncList", "playlistid": self.spotify_id}), None);
    }

    /// Called when the local playlist is being deleted.
    pub fn about_to_delete(&self, delete_remote: bool) {
        if self.sync() {
            self.remove(delete_remote);
        }
    }

    /// Compares an incoming edit against the latest revision and, when it is
    /// current, moves the latest revision forward.
    fn accept_revision(&self, new_rev: &str, old_rev: &str) -> bool {
        let mut state = self.state();
        if state.latest_rev != old_rev {
            debug!(
                playlist = %self.spotify_id,
                latest = %state.latest_rev,
                old_rev,
                "Discarding Spotify update made against a stale revision"
            );
            return false;
        }

        state.latest_rev = new_rev.to_string();
        true
    }

    fn queue(&self, op: QueuedOp) {
        debug!(playlist = %self.spotify_id, ?op, "Playlist not loaded, queueing Spotify update");
        self.state().queued.push_back(op);
    }

    fn expect_echo(&self, echo: Echo) {
        self.state().echoes.push(echo);
    }

    /// Returns `true` if a local change is the echo of a Spotify edit,
    /// forgetting that echo.
    fn consume_echo(&self, is_echo: impl Fn(&Echo) -> bool) -> bool {
        let mut state = self.state();
        match state.echoes.iter().position(is_echo) {
            Some(index) => {
                state.echoes.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn spotify_tracks_added(&self, tracks: &Value, start_pos_id: &str, new_rev: &str, old_rev: &str) {
        if !self.playlist.is_loaded() {
            self.queue(QueuedOp::TracksAdded {
                tracks: tracks.clone(),
                start_pos_id: start_pos_id.to_string(),
                new_rev: new_rev.to_string(),
                old_rev: old_rev.to_string(),
            });
            return;
        }

        if !self.accept_revision(new_rev, old_rev) {
            return;
        }

        let entries: Vec<PlaylistEntry> = variant_to_queries(tracks)
            .into_iter()
            .map(|t| PlaylistEntry::with_annotation(t.query, &t.id))
            .collect();
        if entries.is_empty() {
            return;
        }

        // Insert after the track Spotify placed them behind.
        let position = self
            .playlist
            .entries()
            .iter()
            .position(|e| !start_pos_id.is_empty() && e.annotation == start_pos_id)
            .map_or(0, |i| i + 1);

        {
            let mut state = self.state();
            state.spotify_ids.extend(known_ids(&entries));
            state
                .echoes
                .push(Echo::Inserted(entries.iter().map(|e| e.guid.clone()).collect()));
        }

        self.playlist.insert_entries(position, entries);
    }

    pub fn spotify_tracks_removed(&self, track_ids: &[String], new_rev: &str, old_rev: &str) {
        if !self.playlist.is_loaded() {
            self.queue(QueuedOp::TracksRemoved {
                track_ids: track_ids.to_vec(),
                new_rev: new_rev.to_string(),
                old_rev: old_rev.to_string(),
            });
            return;
        }

        if !self.accept_revision(new_rev, old_rev) {
            return;
        }

        let entries = self.playlist.entries();
        let guids = guids_with_ids(&entries, track_ids);
        if guids.is_empty() {
            return;
        }

        let queries = entries
            .iter()
            .filter(|e| guids.contains(&e.guid))
            .map(|e| Arc::clone(&e.query))
            .collect();
        self.expect_echo(Echo::Removed(queries));
        self.playlist.remove_entries(&guids);
    }

    pub fn spotify_tracks_moved(&self, track_ids: &[String], new_start_pos: &str, new_rev: &str, old_rev: &str) {
        if !self.playlist.is_loaded() {
            self.queue(QueuedOp::TracksMoved {
                track_ids: track_ids.to_vec(),
                new_start_pos: new_start_pos.to_string(),
                new_rev: new_rev.to_string(),
                old_rev: old_rev.to_string(),
            });
            return;
        }

        if !self.accept_revision(new_rev, old_rev) {
            return;
        }

        let entries = self.playlist.entries();
        let guids = guids_with_ids(&entries, track_ids);
        if guids.is_empty() {
            return;
        }

        let position = entries
            .iter()
            .filter(|e| !guids.contains(&e.guid))
            .position(|e| !new_start_pos.is_empty() && e.annotation == new_start_pos)
            .map_or(0, |i| i + 1);

        self.expect_echo(Echo::Moved(guids.clone()));
        self.playlist.move_entries(&guids, position);
    }

    pub fn spotify_playlist_renamed(&self, title: &str, new_rev: &str, old_rev: &str) {
        if !self.playlist.is_loaded() {
            self.queue(QueuedOp::Renamed {
                title: title.to_string(),
                new_rev: new_rev.to_string(),
                old_rev: old_rev.to_string(),
            });
            return;
        }

        if !self.accept_revision(new_rev, old_rev) || self.playlist.title() == title {
            return;
        }

        self.expect_echo(Echo::Renamed(title.to_string()));
        self.playlist.rename(title);
    }

    /// Replays the Spotify edits that arrived while the playlist was loading.
    pub fn playlist_revision_loaded(&self) {
        let queued = {
            let mut state = self.state();
            state.spotify_ids.extend(known_ids(&self.playlist.entries()));
            std::mem::take(&mut state.queued)
        };

        for op in queued {
            match op {
                QueuedOp::TracksAdded {
                    tracks,
                    start_pos_id,
                    new_rev,
                    old_rev,
                } => self.spotify_tracks_added(&tracks, &start_pos_id, &new_rev, &old_rev),
                QueuedOp::TracksRemoved {
                    track_ids,
                    new_rev,
                    old_rev,
                } => self.spotify_tracks_removed(&track_ids, &new_rev, &old_rev),
                QueuedOp::TracksMoved {
                    track_ids,
                    new_start_pos,
                    new_rev,
                    old_rev,
                } => self.spotify_tracks_moved(&track_ids, &new_start_pos, &new_rev, &old_rev),
                QueuedOp::Renamed {
                    title,
                    new_rev,
                    old_rev,
                } => self.spotify_playlist_renamed(&title, &new_rev, &old_rev),
            }
        }
    }

    /// Handles every local playlist change received since the last call.
    pub fn process_playlist_changes(&self) {
        let changes: Vec<_> = {
            let receiver = self.changes.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.try_iter().collect()
        };

        for change in &changes {
            self.handle_playlist_change(change);
        }
    }

    pub fn handle_playlist_change(&self, change: &PlaylistChange) {
        match change {
            PlaylistChange::TracksInserted { entries, position } => {
                self.tomahawk_tracks_inserted(entries, *position)
            }
            PlaylistChange::TracksRemoved(queries) => self.tomahawk_tracks_removed(queries),
            PlaylistChange::TracksMoved { entries, position } => {
                self.tomahawk_tracks_moved(entries, *position)
            }
            PlaylistChange::Renamed {
                new_title,
                old_title,
            } => self.tomahawk_playlist_renamed(new_title, old_title),
            PlaylistChange::RevisionLoaded(_) => self.playlist_revision_loaded(),
        }
    }

    /// Returns `true` if a local change should be sent to Spotify.
    fn should_forward(&self, is_echo: impl Fn(&Echo) -> bool) -> bool {
        if self.consume_echo(is_echo) {
            debug!(playlist = %self.spotify_id, "Not sending the echo of a Spotify update back");
            return false;
        }
        self.sync()
    }

    pub fn tomahawk_tracks_inserted(&self, entries: &[PlaylistEntry], position: usize) {
        if !self.should_forward(|e| e.is_insert_of(entries)) {
            return;
        }

        let start_position = nearest_spotify_track(&self.playlist.entries(), position);

        self.send(
            json!({
                "_msgtype": "addTracksToPlaylist",
                "oldrev": self.latest_rev(),
                "startPosition": start_position,
                "playlistid": self.spotify_id,
                "tracks": plentry_to_variant(entries),
            }),
            Some(PendingRequest {
                kind: PendingKind::Insert,
                waiting_for_ids: entries.to_vec(),
            }),
        );
    }

    pub fn tomahawk_tracks_removed(&self, queries: &[Arc<Query>]) {
        if !self.should_forward(|e| e.is_removal_of(queries)) {
            return;
        }

        let (old_rev, tracks) = {
            let state = self.state();
            (state.latest_rev.clone(), queries_to_variant(queries, &state.spotify_ids))
        };

        self.send(
            json!({
                "_msgtype": "removeTracksFromPlaylist",
                "oldrev": old_rev,
                "playlistid": self.spotify_id,
                "tracks": tracks,
            }),
            Some(PendingRequest::new(PendingKind::Remove)),
        );
    }

    pub fn tomahawk_tracks_moved(&self, entries: &[PlaylistEntry], position: usize) {
        if !self.should_forward(|e| e.is_move_of(entries)) {
            return;
        }

        let start_position = nearest_spotify_track(&self.playlist.entries(), position);

        self.send(
            json!({
                "_msgtype": "moveTracksInPlaylist",
                "oldrev": self.latest_rev(),
                "startPosition": start_position,
                "playlistid": self.spotify_id,
                "tracks": plentry_to_variant(entries),
            }),
            Some(PendingRequest::new(PendingKind::Move)),
        );
    }

    pub fn tomahawk_playlist_renamed(&self, new_title: &str, old_title: &str) {
        if !self.should_forward(|e| e.is_rename_to(new_title)) {
            return;
        }

        self.send(
            json!({
                "_msgtype": "playlistRenamed",
                "oldrev": self.latest_rev(),
                "newTitle": new_title,
                "oldTitle": old_title,
                "playlistid": self.spotify_id,
            }),
            None,
        );
    }

    /// Tags `msg` with a fresh `qid` and sends it. Replies to `pending`
    /// requests are expected back through
    /// [`handle_resolver_message`](Self::handle_resolver_message).
    fn send(&self, mut msg: Value, pending: Option<PendingRequest>) -> Option<String> {
        let Some(account) = self.account.upgrade() else {
            warn!(playlist = %self.spotify_id, error = %UpdaterError::NoAccount, "Cannot send to Spotify");
            return None;
        };

        let qid = Uuid::new_v4().to_string();
        msg["qid"] = Value::from(qid.as_str());

        if let Some(pending) = pending {
            self.state().pending.insert(qid.clone(), pending);
        }

        account.send_message(msg);
        Some(qid)
    }

    /// Routes a resolver reply to the handler of the request it answers.
    ///
    /// Returns `Ok(false)` when the reply belongs to a request this updater
    /// did not make.
    ///
    /// # Errors
    ///
    /// Returns an [`UpdaterError`] if the reply is malformed.
    pub fn handle_resolver_message(&self, msg: &Value) -> Result<bool, UpdaterError> {
        let qid = reply_qid(msg)?;
        let kind = self.state().pending.get(qid).map(|p| p.kind);

        match kind {
            None => {
                debug!(playlist = %self.spotify_id, qid, "Ignoring reply to an unknown request");
                Ok(false)
            }
            Some(PendingKind::Insert) => self.on_tracks_inserted_return(msg).map(|()| true),
            Some(PendingKind::Remove) => self.on_tracks_removed_return(msg).map(|()| true),
            Some(PendingKind::Move) => self.on_tracks_moved_return(msg).map(|()| true),
        }
    }

    fn take_pending(&self, msg: &Value, expected: PendingKind) -> Result<PendingRequest, UpdaterError> {
        let qid = reply_qid(msg)?;
        let mut state = self.state();

        match state.pending.get(qid).map(|p| p.kind) {
            None => Err(UpdaterError::UnknownRequest(qid.to_string())),
            Some(kind) if kind != expected => Err(UpdaterError::UnexpectedReply {
                qid: qid.to_string(),
                expected: expected.name(),
            }),
            Some(_) => state
                .pending
                .remove(qid)
                .ok_or_else(|| UpdaterError::UnknownRequest(qid.to_string())),
        }
    }

    /// Assigns the Spotify ids of freshly added tracks.
    ///
    /// # Errors
    ///
    /// Returns an [`UpdaterError`] if `msg` does not answer a pending insert
    /// or lacks the inserted positions and ids.
    pub fn on_tracks_inserted_return(&self, msg: &Value) -> Result<(), UpdaterError> {
        let waiting = self.take_pending(msg, PendingKind::Insert)?.waiting_for_ids;

        if !reply_success(msg) {
            warn!(playlist = %self.spotify_id, "Spotify failed to add tracks");
            return Ok(());
        }

        let positions = reply_list(msg, "trackPosInserted")?;
        let ids = reply_list(msg, "trackIdInserted")?;

        for (position, id) in positions.iter().zip(ids) {
            let (Some(position), Some(id)) = (position.as_u64(), id.as_str()) else {
                continue;
            };
            let Some(entry) = usize::try_from(position).ok().and_then(|p| waiting.get(p)) else {
                warn!(playlist = %self.spotify_id, position, "Spotify returned an id for an unknown position");
                continue;
            };

            self.playlist.set_annotation(&entry.guid, id);
            self.state().spotify_ids.insert(entry.query.key(), id.to_string());
        }

        self.record_revision(msg);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an [`UpdaterError`] if `msg` does not answer a pending removal.
    pub fn on_tracks_removed_return(&self, msg: &Value) -> Result<(), UpdaterError> {
        self.take_pending(msg, PendingKind::Remove)?;

        if reply_success(msg) {
            self.record_revision(msg);
        } else {
            warn!(playlist = %self.spotify_id, "Spotify failed to remove tracks");
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an [`UpdaterError`] if `msg` does not answer a pending move.
    pub fn on_tracks_moved_return(&self, msg: &Value) -> Result<(), UpdaterError> {
        self.take_pending(msg, PendingKind::Move)?;

        if reply_success(msg) {
            self.record_revision(msg);
        } else {
            warn!(playlist = %self.spotify_id, "Spotify failed to move tracks");
        }
        Ok(())
    }

    fn record_revision(&self, msg: &Value) {
        if let Some(rev) = msg.get("revid").and_then(Value::as_str) {
            info!(playlist = %self.spotify_id, rev, "Spotify playlist updated");
            self.state().latest_rev = rev.to_string();
        }
    }
}

/// Finds the Spotify id of the closest entry before `position`, or an empty
/// string when none of them has one.
pub fn nearest_spotify_track(entries: &[PlaylistEntry], position: usize) -> String {
    entries[..position.min(entries.len())]
        .iter()
        .rev()
        .find(|e| !e.annotation.is_empty())
        .map(|e| e.annotation.clone())
        .unwrap_or_default()
}

fn known_ids(entries: &[PlaylistEntry]) -> HashMap<u64, String> {
    entries
        .iter()
        .filter(|e| !e.annotation.is_empty())
        .map(|e| (e.query.key(), e.annotation.clone()))
        .collect()
}

fn guids_with_ids(entries: &[PlaylistEntry], track_ids: &[String]) -> Vec<String> {
    entries
        .iter()
        .filter(|e| !e.annotation.is_empty() && track_ids.contains(&e.annotation))
        .map(|e| e.guid.clone())
        .collect()
}

fn reply_qid(msg: &Value) -> Result<&str, UpdaterError> {
    msg.get("qid")
        .and_then(Value::as_str)
        .ok_or(UpdaterError::MissingField("qid"))
}

fn reply_success(msg: &Value) -> bool {
    msg.get("success").and_then(Value::as_bool).unwrap_or(false)
}

fn reply_list<'a>(msg: &'a Value, field: &'static str) -> Result<&'a Vec<Value>, UpdaterError> {
    msg.get(field)
        .and_then(Value::as_array)
        .ok_or(UpdaterError::MissingField(field))
}
