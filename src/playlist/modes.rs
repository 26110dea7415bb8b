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

//! Playback mode flags shared by every playlist interface.

use serde::{Deserialize, Serialize};

/// How a sequence behaves at its boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    NoRepeat,
    RepeatOne,
    RepeatAll,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Unknown,
    Tree,
    Flat,
    Album,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeekRestrictions {
    #[default]
    NoSeekRestrictions,
    NoSeek,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkipRestrictions {
    #[default]
    NoSkipRestrictions,
    NoSkipForwards,
    NoSkipBackwards,
    NoSkip,
}

/// Whether a sequence keeps asking for new tracks after it runs dry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryMode {
    #[default]
    NoRetry,
    Retry,
}

/// Whether a listener follows a source track by track (`RealTime`) or stays on
/// the song it is currently hearing (`StayOnSong`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LatchMode {
    #[default]
    StayOnSong,
    RealTime,
}

/// Where an album interface gets its track listing from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModelMode {
    /// The catalog first, the info system when the catalog has nothing.
    #[default]
    Mixed,
    Database,
    InfoSystem,
}
