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

//! Common utilities and helper functions.
//!
//! # Sub-modules
//!
//! * [`notify`]: Fan-out of change notifications to any number of channel
//!   subscribers.

pub(crate) mod notify;

/// Normalises a name for sorting and for catalog lookups.
///
/// The name is lower-cased, trimmed, and runs of whitespace are collapsed to a
/// single space. When `replace_article` is set a leading "the " is dropped so
/// that "The Beatles" sorts under "b".
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sortname("  The  Beatles ", true), "beatles");
/// assert_eq!(sortname("The Beatles", false), "the beatles");
/// ```
pub(crate) fn sortname(name: &str, replace_article: bool) -> String {
    let normalised = name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");

    if replace_article {
        if let Some(rest) = normalised.strip_prefix("the ") {
            return rest.to_string();
        }
    }

    normalised
}

#[cfg(test)]
mod tests {
    use super::sortname;

    #[test]
    fn sortname_collapses_whitespace_and_case() {
        assert_eq!(sortname("  Kind   of BLUE ", false), "kind of blue");
    }

    #[test]
    fn sortname_drops_leading_article_on_request() {
        assert_eq!(sortname("The Beatles", true), "beatles");
        assert_eq!(sortname("The Beatles", false), "the beatles");
        assert_eq!(sortname("Theatre", true), "theatre");
    }
}
