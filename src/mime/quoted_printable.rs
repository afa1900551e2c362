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

use std::borrow::Cow;
use std::str;

/// Decodes quoted-printable encoding, as described by RFC 2045.
///
/// Encoded bytes and soft line endings are both handled, the latter by
/// discarding. UNIX line endings are handled as well as DOS line endings.
///
/// This never fails. Invalid escape sequences are passed through
/// untransformed, as are 8-bit characters, including invalid UTF-8.
///
/// Returns the decoded text, as well as a possible "dangling" slice: an
/// escape sequence cut off by the end of the input before it was complete.
/// Callers decoding a complete payload can treat a non-empty dangling slice
/// as corruption.
pub fn qp_decode(s: &[u8]) -> (Cow<[u8]>, &[u8]) {
    let first = match memchr::memchr(b'=', s) {
        Some(ix) => ix,
        None => return (Cow::Borrowed(s), &[]),
    };

    let mut out = Vec::with_capacity(s.len());
    out.extend_from_slice(&s[..first]);

    let mut pos = first;
    while pos < s.len() {
        // s[pos] is always b'=' here
        let escape = &s[pos + 1..];
        if escape.starts_with(b"\n") {
            // Soft line break with UNIX ending, discard
            pos += 2;
        } else if escape.starts_with(b"\r\n") {
            // Soft line break with DOS ending, discard
            pos += 3;
        } else if escape.len() < 2 {
            // Incomplete escape cut off by the end of the input
            return (Cow::Owned(out), &s[pos..]);
        } else if let Some(byte) = hex_byte(&escape[..2]) {
            out.push(byte);
            pos += 3;
        } else {
            // Invalid escape, pass the '=' through verbatim
            out.push(b'=');
            pos += 1;
        }

        match memchr::memchr(b'=', &s[pos..]) {
            Some(ix) => {
                out.extend_from_slice(&s[pos..pos + ix]);
                pos += ix;
            },
            None => {
                out.extend_from_slice(&s[pos..]);
                break;
            },
        }
    }

    (Cow::Owned(out), &[])
}

fn hex_byte(s: &[u8]) -> Option<u8> {
    str::from_utf8(s)
        .ok()
        .and_then(|s| u8::from_str_radix(s, 16).ok())
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn assert_qp(expected: &[u8], expected_dangling: &[u8], input: &[u8]) {
        let (actual, actual_dangling) = qp_decode(input);
        assert_eq!(expected, &actual[..]);
        assert_eq!(expected_dangling, actual_dangling);
    }

    #[test]
    fn test_qp_decode() {
        assert_qp(b"", b"", b"");
        assert_qp(b"hello world", b"", b"hello world");
        assert_qp(b"\xabfoo", b"", b"=ABfoo");
        assert_qp(b"fo\xabo", b"", b"fo=ABo");
        assert_qp(b"foo\xab", b"", b"foo=AB");

        assert_qp(b"foo\xab\xcd", b"", b"foo=AB=CD");
        assert_qp(b"foo\xabbar\xcd", b"", b"foo=ABbar=CD");

        assert_qp(b"foo", b"", b"foo=\n");
        assert_qp(b"foobar", b"", b"foo=\nbar");
        assert_qp(b"foo", b"", b"foo=\r\n");
        assert_qp(b"foobar", b"", b"foo=\r\nbar");

        assert_qp(b"foo=()bar", b"", b"foo=()bar");
        assert_qp(b"foo=\xabbar", b"", b"foo==ABbar");
        assert_qp(b"foo=A\xabbar", b"", b"foo=A=ABbar");
        assert_qp("foo=ゑbar".as_bytes(), b"", "foo=ゑbar".as_bytes());
        assert_qp(b"foo=\x80\x80bar", b"", b"foo=\x80\x80bar");

        assert_qp(b"", b"=", b"=");
        assert_qp(b"foo", b"=", b"foo=");
        assert_qp(b"foo", b"=A", b"foo=A");
        assert_qp(b"foo", b"=\r", b"foo=\r");
    }

    proptest! {
        #[test]
        fn qp_decode_never_fails_for_str(s in ".*") {
            qp_decode(s.as_bytes());
        }

        #[test]
        fn qp_decode_never_fails_for_bytes(
            s in prop::collection::vec(prop::num::u8::ANY, 0..20)
        ) {
            qp_decode(&s);
        }
    }
}
