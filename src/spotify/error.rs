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

use thiserror::Error;

/// Failures at the boundary with the Spotify resolver.
#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("message is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("reply {qid} does not answer a {expected} request")]
    UnexpectedReply { qid: String, expected: &'static str },

    #[error("no pending request with id {0}")]
    UnknownRequest(String),

    #[error("the Spotify account is not available")]
    NoAccount,

    #[error("malformed track: {0}")]
    InvalidTrack(#[from] serde_json::Error),
}
