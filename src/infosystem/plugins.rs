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

//! Info plugins backed by the local catalog.

use std::sync::Arc;

use anyhow::Result;
use lofty::picture::PictureType;
use lofty::prelude::*;
use lofty::probe::Probe;
use tracing::debug;

use crate::{
    db::Catalog,
    infosystem::{InfoOutput, InfoPlugin, InfoRequestData, InfoType},
};

/// Answers cover art requests with pictures embedded in the album's files.
///
/// Front covers are preferred; otherwise the first picture found is used.
pub struct LocalCoverPlugin {
    catalog: Catalog,
}

impl LocalCoverPlugin {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl InfoPlugin for LocalCoverPlugin {
    fn supports(&self, kind: InfoType) -> bool {
        kind == InfoType::AlbumCoverArt
    }

    fn fetch(&self, request: &InfoRequestData) -> Result<Option<InfoOutput>> {
        let album_id = self
            .catalog
            .find_album(request.input_value("artist"), request.input_value("album"))?;
        if album_id == 0 {
            return Ok(None);
        }

        let mut fallback = None;

        for filename in self.catalog.album_files(album_id)? {
            let tagged_file = match Probe::open(&filename).and_then(|p| p.read()) {
                Ok(file) => file,
                Err(e) => {
                    debug!(%filename, error = %e, "Cannot read tags for cover art");
                    continue;
                }
            };

            for tag in tagged_file.tags() {
                for picture in tag.pictures() {
                    if picture.pic_type() == PictureType::CoverFront {
                        return Ok(Some(InfoOutput::CoverArt(Arc::new(picture.data().to_vec()))));
                    }
                    if fallback.is_none() {
                        fallback = Some(picture.data().to_vec());
                    }
                }
            }
        }

        Ok(fallback.map(|bytes| InfoOutput::CoverArt(Arc::new(bytes))))
    }
}

/// Answers album track requests from the catalog.
pub struct CatalogTracksPlugin {
    catalog: Catalog,
}

impl CatalogTracksPlugin {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl InfoPlugin for CatalogTracksPlugin {
    fn supports(&self, kind: InfoType) -> bool {
        kind == InfoType::AlbumTracks
    }

    fn fetch(&self, request: &InfoRequestData) -> Result<Option<InfoOutput>> {
        let album_id = self
            .catalog
            .find_album(request.input_value("artist"), request.input_value("album"))?;
        if album_id == 0 {
            return Ok(None);
        }

        let titles: Vec<String> = self
            .catalog
            .album_tracks(album_id, None)?
            .into_iter()
            .map(|t| t.title)
            .collect();

        Ok((!titles.is_empty()).then_some(InfoOutput::AlbumTracks(titles)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::track;

    fn catalog() -> Catalog {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.add_track("Björk", "Post", &track(0, 2, "Hyperballad")).unwrap();
        catalog.add_track("Björk", "Post", &track(0, 1, "Army of Me")).unwrap();
        catalog
    }

    #[test]
    fn catalog_tracks_are_listed_in_album_order() {
        let plugin = CatalogTracksPlugin::new(catalog());
        let request = InfoRequestData::for_album("c", InfoType::AlbumTracks, "björk", "post");

        assert_eq!(
            plugin.fetch(&request).unwrap(),
            Some(InfoOutput::AlbumTracks(vec![
                "Army of Me".to_string(),
                "Hyperballad".to_string()
            ]))
        );
    }

    #[test]
    fn unknown_albums_have_no_answer() {
        let catalog = catalog();
        let request = InfoRequestData::for_album("c", InfoType::AlbumCoverArt, "Björk", "Homogenic");

        assert_eq!(CatalogTracksPlugin::new(catalog.clone()).fetch(&request).unwrap(), None);
        assert_eq!(LocalCoverPlugin::new(catalog).fetch(&request).unwrap(), None);
    }

    #[test]
    fn unreadable_files_give_no_cover() {
        let plugin = LocalCoverPlugin::new(catalog());
        let request = InfoRequestData::for_album("c", InfoType::AlbumCoverArt, "Björk", "Post");

        assert_eq!(plugin.fetch(&request).unwrap(), None);
    }
}
