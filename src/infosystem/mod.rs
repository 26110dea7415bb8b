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

//! Asynchronous metadata fetching.
//!
//! The info system answers metadata requests (cover art, album track
//! listings) on a dedicated worker thread so that slow lookups never block the
//! caller. Requests carry a `caller` id; every answer is broadcast to all
//! subscribers as an [`InfoEvent`] and it is up to each subscriber to ignore
//! answers that were not meant for it.
//!
//! For each request the worker asks its plugins in order. The first plugin
//! that supports the request type and produces an answer wins, and an
//! [`InfoEvent::Info`] is sent. An [`InfoEvent::Finished`] for the caller
//! always follows, whether or not anything was found.

mod plugins;

use std::{
    collections::HashMap,
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread,
};

use anyhow::Result;
use tracing::{debug, warn};

use crate::util::notify::Notifier;

pub use plugins::{CatalogTracksPlugin, LocalCoverPlugin};

pub type InfoStringHash = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoType {
    AlbumCoverArt,
    AlbumTracks,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoRequestData {
    pub caller: String,
    pub kind: InfoType,
    pub input: InfoStringHash,
}

impl InfoRequestData {
    /// Builds a request about one album of one artist.
    pub fn for_album(caller: &str, kind: InfoType, artist: &str, album: &str) -> Self {
        let mut input = InfoStringHash::new();
        input.insert("artist".to_string(), artist.to_string());
        input.insert("album".to_string(), album.to_string());

        Self {
            caller: caller.to_string(),
            kind,
            input,
        }
    }

    pub fn input_value(&self, key: &str) -> &str {
        self.input.get(key).map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InfoOutput {
    /// Raw image bytes, in whatever format the plugin found them.
    CoverArt(Arc<Vec<u8>>),
    /// Track titles in album order.
    AlbumTracks(Vec<String>),
}

#[derive(Debug, Clone)]
pub enum InfoEvent {
    Info(InfoRequestData, InfoOutput),
    Finished(String),
}

/// A provider of metadata answers.
pub trait InfoPlugin: Send {
    fn supports(&self, kind: InfoType) -> bool;

    /// Answers `request`, or returns `Ok(None)` when this plugin has nothing.
    fn fetch(&self, request: &InfoRequestData) -> Result<Option<InfoOutput>>;
}

/// Handle to the info system worker.
///
/// Cloning is cheap; the worker thread stops once every handle is dropped.
#[derive(Clone)]
pub struct InfoSystem {
    request_tx: Sender<InfoRequestData>,
    notifier: Arc<Notifier<InfoEvent>>,
}

impl InfoSystem {
    /// Spawns the worker thread that serves requests with `plugins`.
    pub fn new(plugins: Vec<Box<dyn InfoPlugin>>) -> Self {
        let (request_tx, request_rx) = mpsc::channel();
        let notifier = Arc::new(Notifier::new());

        spawn_info_worker(plugins, request_rx, Arc::clone(&notifier));

        Self {
            request_tx,
            notifier,
        }
    }

    /// Queues a request. The answer arrives later through [`subscribe`](Self::subscribe).
    pub fn get_info(&self, request: InfoRequestData) {
        debug!(caller = %request.caller, kind = ?request.kind, "Info request queued");

        if self.request_tx.send(request).is_err() {
            warn!("Info system worker has stopped, request dropped");
        }
    }

    pub fn subscribe(&self) -> Receiver<InfoEvent> {
        self.notifier.subscribe()
    }
}

fn spawn_info_worker(
    plugins: Vec<Box<dyn InfoPlugin>>,
    request_rx: Receiver<InfoRequestData>,
    notifier: Arc<Notifier<InfoEvent>>,
) {
    thread::spawn(move || {
        while let Ok(request) = request_rx.recv() {
            if let Some(output) = handle_request(&plugins, &request) {
                notifier.notify(InfoEvent::Info(request.clone(), output));
            }
            notifier.notify(InfoEvent::Finished(request.caller));
        }
    });
}

fn handle_request(plugins: &[Box<dyn InfoPlugin>], request: &InfoRequestData) -> Option<InfoOutput> {
    for plugin in plugins.iter().filter(|p| p.supports(request.kind)) {
        match plugin.fetch(request) {
            Ok(Some(output)) => return Some(output),
            Ok(None) => {}
            Err(e) => {
                warn!(caller = %request.caller, kind = ?request.kind, error = %format!("{e:#}"), "Info plugin failed");
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::bail;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct FixedCover;

    impl InfoPlugin for FixedCover {
        fn supports(&self, kind: InfoType) -> bool {
            kind == InfoType::AlbumCoverArt
        }

        fn fetch(&self, request: &InfoRequestData) -> Result<Option<InfoOutput>> {
            match request.input_value("album") {
                "Mezzanine" => Ok(Some(InfoOutput::CoverArt(Arc::new(vec![1, 2, 3])))),
                "Broken" => bail!("lookup failed"),
                _ => Ok(None),
            }
        }
    }

    fn cover_request(caller: &str, album: &str) -> InfoRequestData {
        InfoRequestData::for_album(caller, InfoType::AlbumCoverArt, "Massive Attack", album)
    }

    #[test]
    fn answer_is_followed_by_finished() {
        let info = InfoSystem::new(vec![Box::new(FixedCover)]);
        let events = info.subscribe();

        info.get_info(cover_request("c1", "Mezzanine"));

        match events.recv_timeout(TIMEOUT).unwrap() {
            InfoEvent::Info(request, InfoOutput::CoverArt(bytes)) => {
                assert_eq!(request.caller, "c1");
                assert_eq!(*bytes, vec![1, 2, 3]);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(events.recv_timeout(TIMEOUT).unwrap(), InfoEvent::Finished(c) if c == "c1"));
    }

    #[test]
    fn failures_and_misses_only_finish() {
        let info = InfoSystem::new(vec![Box::new(FixedCover)]);
        let events = info.subscribe();

        info.get_info(cover_request("c2", "Broken"));
        info.get_info(cover_request("c3", "Unknown"));
        info.get_info(InfoRequestData::for_album("c4", InfoType::AlbumTracks, "a", "Mezzanine"));

        for caller in ["c2", "c3", "c4"] {
            assert!(matches!(events.recv_timeout(TIMEOUT).unwrap(), InfoEvent::Finished(c) if c == caller));
        }
    }
}
