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

//! Syntactic validation of `type/subtype` media types.

/// Whether `s` is a syntactically valid `type/subtype` media type, with both
/// halves being non-empty RFC 2045 tokens.
///
/// Parameters are not accepted; by the time a media type reaches this crate
/// it has been reduced to the bare type.
pub fn is_valid_media_type(s: &str) -> bool {
    let mut halves = s.splitn(2, '/');
    match (halves.next(), halves.next()) {
        (Some(typ), Some(subtype)) => is_token(typ) && is_token(subtype),
        _ => false,
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_char)
}

/// RFC 2045 `token` characters: printable ASCII less space and tspecials.
fn is_token_char(ch: u8) -> bool {
    if ch <= b' ' || ch >= 0x7f {
        return false;
    }

    match ch {
        b'(' | b')' | b'<' | b'>' | b'@' | b',' | b';' | b':' | b'\\'
        | b'"' | b'/' | b'[' | b']' | b'?' | b'=' => false,
        _ => true,
    }
}
