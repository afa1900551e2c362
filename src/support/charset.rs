//-
// Copyright (c) 2021, Jason Lingle
//
// This file is part of Mimesis.
//
// Mimesis is free software: you can redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Mimesis is distributed in the hope  that it will be useful, but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mimesis. If not, see <http://www.gnu.org/licenses/>.

//! Charset label resolution.
//!
//! Charset labels found in the wild are frequently not the labels the
//! decoder knows. Messages generated by older Windows software declare
//! `ks_c_5601-1987` where `euc-kr` is meant, mojibake-era Japanese mail says
//! `x-sjis`, and so on. The resolver maps such aliases to canonical labels
//! through a many-to-one table before the label ever reaches `encoding_rs`.
//!
//! Unknown labels are passed through unchanged. Whether an unknown label is
//! an error is the caller's decision; decoding a body falls back to UTF-8
//! while decoding an encoded word treats it as a failed word.

use std::collections::HashMap;

use encoding_rs::{Encoding, UTF_8};
use log::warn;

/// The label assumed when a part declares no charset at all.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// A many-to-one mapping from charset aliases to canonical labels.
///
/// The table is built from grouped entries of the form
/// `"alias1,alias2,...:canonical"`. Aliases are matched case-insensitively;
/// the canonical label is kept verbatim.
#[derive(Clone, Debug, Default)]
pub struct CharsetResolver {
    aliases: HashMap<String, String>,
}

impl CharsetResolver {
    pub fn new() -> Self {
        CharsetResolver::default()
    }

    /// Builds a resolver from grouped entries.
    pub fn from_grouped_entries<I: IntoIterator<Item = S>, S: AsRef<str>>(
        entries: I,
    ) -> Self {
        let mut this = CharsetResolver::new();
        for entry in entries {
            this.add_group(entry.as_ref());
        }
        this
    }

    /// Adds one `"alias1,alias2,...:canonical"` group to the table.
    ///
    /// Entries with no `:` separator are ignored.
    pub fn add_group(&mut self, entry: &str) {
        let colon = match entry.find(':') {
            Some(ix) => ix,
            None => {
                warn!("Ignoring malformed charset mapping: {:?}", entry);
                return;
            },
        };

        let canonical = entry[colon + 1..].trim();
        for alias in entry[..colon].split(',') {
            let alias = alias.trim();
            if !alias.is_empty() {
                self.aliases
                    .insert(alias.to_ascii_lowercase(), canonical.to_owned());
            }
        }
    }

    /// Resolves a declared charset label to the label to decode with.
    ///
    /// A missing or empty label resolves to [`DEFAULT_CHARSET`]. A label
    /// found in the alias table resolves to its canonical form. Anything
    /// else is returned unchanged.
    pub fn resolve<'a>(&'a self, label: Option<&'a str>) -> &'a str {
        let label = match label {
            Some(l) if !l.is_empty() => l,
            _ => return DEFAULT_CHARSET,
        };

        match self.aliases.get(&label.to_ascii_lowercase()) {
            Some(canonical) => canonical,
            None => label,
        }
    }

    /// Returns the encoding to decode a *body* declared with `label`.
    ///
    /// Labels that resolve to nothing `encoding_rs` knows fall back to
    /// UTF-8, so this never fails. Header decoding does not use this; an
    /// unresolvable label there makes the whole encoded word undecodable
    /// instead.
    pub fn encoding(&self, label: Option<&str>) -> &'static Encoding {
        Encoding::for_label_no_replacement(self.resolve(label).as_bytes())
            .unwrap_or(UTF_8)
    }
}
