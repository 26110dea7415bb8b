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

//! # Tomahawk.
//!
//! Command line front end for the headless core. Scans the configured media
//! directories into the catalog and, given an artist and an album, lists the
//! album in playback order using the configured repeat and shuffle modes.
//!
//! ```text
//! tomahawk [ARTIST ALBUM]
//! ```

use std::time::Duration;

use anyhow::{Context, Result, bail};
use tomahawk::{
    Services,
    config::{self, AppConfig},
    infosystem::InfoEvent,
    logging,
    model::{Album, Artist, Collection, LOCAL_SOURCE_ID, Source},
    playlist::{ModelMode, PlaylistInterface, playback_order},
};

const COVER_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    logging::init_logging()?;

    let config = config::load_config();
    let services = Services::open(&config).context("Failed to initialise services")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(()),
        [artist, album] => list_album(&config, &services, artist, album),
        _ => bail!("Usage: tomahawk [ARTIST ALBUM]"),
    }
}

/// Prints the tracks of one album in the order they would be played.
fn list_album(config: &AppConfig, services: &Services, artist: &str, album: &str) -> Result<()> {
    let catalog = services.catalog.as_ref();
    let artist = Artist::get_by_name(catalog, artist, false).context("No catalog available")?;
    let album = Album::get_by_name(catalog, &artist, album, false).context("No catalog available")?;
    if album.id() == 0 {
        bail!("Album not found: {} - {}", artist.name(), album.name());
    }

    let source = services
        .sources
        .get(LOCAL_SOURCE_ID)
        .unwrap_or_else(|| Source::new(LOCAL_SOURCE_ID, "My Collection", true));
    let local = Collection::new(source, "local");
    let pli = album.playlist_interface(services, ModelMode::Database, Some(local));
    pli.set_repeat_mode(config.repeat_mode);
    pli.set_shuffled(config.shuffled);
    pli.set_retry_interval(config.retry_interval());

    println!("{} - {}", artist.name(), album.name());
    print_cover_size(services, &album);

    let order = playback_order(pli.as_ref());
    let tracks = pli.tracks();
    for (n, result) in order.iter().enumerate() {
        let title = tracks
            .iter()
            .find(|q| q.results().iter().any(|r| r.url == result.url))
            .map_or(result.url.as_str(), |q| q.title());
        println!("{:>3}. {title}", n + 1);
    }

    Ok(())
}

fn print_cover_size(services: &Services, album: &Album) {
    let Some(info_system) = &services.info_system else {
        return;
    };

    let events = info_system.subscribe();
    if album.cover(Some(info_system), None, true).is_none() {
        while let Ok(event) = events.recv_timeout(COVER_TIMEOUT) {
            album.handle_info_event(&event);
            if matches!(&event, InfoEvent::Finished(caller) if caller == album.info_id()) {
                break;
            }
        }
    }

    if let Some(cover) = album.cover(None, None, false) {
        println!("Cover: {}x{}", cover.width(), cover.height());
    }
}
