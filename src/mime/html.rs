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

//! Reduction of an HTML body to the text a renderer would display.
//!
//! This is deliberately not an HTML parser. Script and style elements,
//! comments, and tags are stripped textually, the common entities are
//! decoded, and whitespace is collapsed to single spaces. That is all a
//! derived plain-text body needs to be useful to a client that asked for
//! `text/plain` and got a message with only an HTML part.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Elements whose text content must not leak into the output, plus
    /// comments. Non-greedy so adjacent elements survive; a block left
    /// unterminated swallows the rest of the input, as it would in a
    /// real parser.
    static ref DROPPED_BLOCKS: Regex = Regex::new(concat!(
        r"(?is)<script\b.*?</script\s*>|<script\b.*",
        r"|<style\b.*?</style\s*>|<style\b.*",
        r"|<!--.*?-->|<!--.*",
    ))
    .unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
}

/// Converts an HTML document to the plain text it would render as.
pub fn html_to_text(html: &str) -> String {
    let stripped = DROPPED_BLOCKS.replace_all(html, " ");
    let stripped = TAG.replace_all(&stripped, " ");
    let decoded = decode_entities(&stripped);

    // Collapse all runs of whitespace the way a renderer would
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> Cow<str> {
    if memchr::memchr(b'&', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        match parse_entity(rest) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            },
            None => {
                out.push('&');
                rest = &rest[1..];
            },
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

/// Parses the entity at the start of `s` (which begins with `&`), returning
/// the decoded character and the number of bytes consumed.
///
/// Only the entities that matter for plain-text rendering are known;
/// anything else, including entities with no terminator in sight, is left to
/// the caller to pass through.
fn parse_entity(s: &str) -> Option<(char, usize)> {
    // An entity longer than this is not worth chasing
    let window = &s.as_bytes()[..s.len().min(32)];
    let semi = memchr::memchr(b';', window)?;
    let body = &s[1..semi];

    let ch = if let Some(num) = body.strip_prefix('#') {
        let code = if let Some(hex) =
            num.strip_prefix('x').or_else(|| num.strip_prefix('X'))
        {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        std::char::from_u32(code)?
    } else {
        match body {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => ' ',
            _ => return None,
        }
    };

    Some((ch, semi + 1))
}
