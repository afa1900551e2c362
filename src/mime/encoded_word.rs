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

//! Decoding of RFC 2047 "encoded words" in unstructured header values.
//!
//! The decoder walks the whole value and replaces every
//! `=?charset?encoding?text?=` token it can decode, leaving the literal text
//! around the tokens alone. Per RFC 2047 § 6.2, linear whitespace between
//! two adjacent encoded words is not rendered; whitespace next to a token
//! that failed to decode is kept so the raw token stays legible in context.
//!
//! RFC 2047 limits encoded words to 75 characters, but agents in the wild
//! produce longer ones and Thunderbird interprets them, so no length limit
//! is enforced here.
//!
//! The charset of each word goes through a [`CharsetResolver`] first, so
//! vendor aliases decode the same way here as in bodies. A word whose
//! resolved charset is unknown to `encoding_rs`, whose encoding letter is
//! something other than `B` or `Q`, or whose payload is corrupt is
//! undecodable; [`DecodeMode`] selects what happens then.

use std::borrow::Cow;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::mime::quoted_printable::qp_decode;
use crate::support::charset::CharsetResolver;
use crate::support::error::Error;

lazy_static! {
    static ref ENCODED_WORD: Regex =
        Regex::new(r"(?s)(.*?)=\?([^?]+?)\?(\w)\?([^?]+?)\?=").unwrap();
}

/// What to do with an encoded word that cannot be decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeMode {
    /// Keep the raw token verbatim in the output. This is what mail clients
    /// do, and the default.
    Silent,
    /// Fail the whole decode with [`Error::EncodedWord`].
    Strict,
}

impl Default for DecodeMode {
    fn default() -> Self {
        DecodeMode::Silent
    }
}

/// Decodes every RFC 2047 encoded word in `value`.
///
/// `value` must already be unfolded. If it contains no encoded words it is
/// returned unchanged and unallocated.
///
/// In [`DecodeMode::Silent`] this never fails.
pub fn decode_encoded_words<'a>(
    value: &'a str,
    charsets: &CharsetResolver,
    mode: DecodeMode,
) -> Result<Cow<'a, str>, Error> {
    let mut out = String::new();
    let mut tail = 0;
    let mut prev_decoded = false;

    for caps in ENCODED_WORD.captures_iter(value) {
        let whole = caps.get(0).unwrap();
        let separator = caps.get(1).unwrap().as_str();
        let charset = caps.get(2).unwrap().as_str();
        let encoding = caps.get(3).unwrap().as_str();
        let text = caps.get(4).unwrap().as_str();

        match decode_one(charset, encoding, text, charsets) {
            Ok(decoded) => {
                // Whitespace between two decoded words is not part of the
                // text; any other separator is.
                if !prev_decoded || !is_linear_whitespace(separator) {
                    out.push_str(separator);
                }
                out.push_str(&decoded);
                prev_decoded = true;
            },
            Err(reason) => {
                let word = &whole.as_str()[separator.len()..];
                if DecodeMode::Strict == mode {
                    return Err(Error::EncodedWord {
                        word: word.to_owned(),
                        reason,
                    });
                }

                debug!("Leaving encoded word undecoded ({}): {}", reason, word);
                out.push_str(whole.as_str());
                prev_decoded = false;
            },
        }

        tail = whole.end();
    }

    if 0 == tail {
        return Ok(Cow::Borrowed(value));
    }

    out.push_str(&value[tail..]);
    Ok(Cow::Owned(out))
}

fn decode_one(
    charset: &str,
    encoding: &str,
    text: &str,
    charsets: &CharsetResolver,
) -> Result<String, &'static str> {
    let resolved = charsets.resolve(Some(charset));
    let cs =
        encoding_rs::Encoding::for_label_no_replacement(resolved.as_bytes())
            .ok_or("unresolvable charset")?;

    let bytes = if encoding.eq_ignore_ascii_case("q") {
        decode_q(text)?
    } else if encoding.eq_ignore_ascii_case("b") {
        base64::decode(text).map_err(|_| "corrupt base64 payload")?
    } else {
        return Err("unsupported transfer encoding");
    };

    Ok(cs.decode_with_bom_removal(&bytes).0.into_owned())
}

fn decode_q(text: &str) -> Result<Vec<u8>, &'static str> {
    // _ in the content (before transfer decoding) stands for ASCII space
    // regardless of charset
    let mut bytes = text.as_bytes().to_vec();
    for byte in &mut bytes {
        if b'_' == *byte {
            *byte = b' ';
        }
    }

    let (decoded, dangling) = qp_decode(&bytes);
    if !dangling.is_empty() {
        return Err("corrupt quoted-printable payload");
    }
    Ok(decoded.into_owned())
}

fn is_linear_whitespace(s: &str) -> bool {
    s.bytes()
        .all(|b| b' ' == b || b'\t' == b || b'\r' == b || b'\n' == b)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn decode(input: &str) -> String {
        decode_encoded_words(
            input,
            &CharsetResolver::default(),
            DecodeMode::Silent,
        )
        .unwrap()
        .into_owned()
    }

    #[test]
    fn plain_text_is_returned_unchanged() {
        let input = "Just a subject line";
        let decoded = decode_encoded_words(
            input,
            &CharsetResolver::default(),
            DecodeMode::Silent,
        )
        .unwrap();

        match decoded {
            Cow::Borrowed(s) => assert_eq!(input, s),
            Cow::Owned(..) => panic!("input was needlessly copied"),
        }
        assert_eq!("", decode(""));
    }

    #[test]
    fn rfc2047_examples() {
        assert_eq!(
            "Keith Moore <moore@cs.utk.edu>",
            decode("=?US-ASCII?Q?Keith_Moore?= <moore@cs.utk.edu>")
        );
        assert_eq!(
            "Keld Jørn Simonsen <keld@dkuug.dk>",
            decode("=?ISO-8859-1?Q?Keld_J=F8rn_Simonsen?= <keld@dkuug.dk>")
        );
        assert_eq!(
            "André Pirard <PIRARD@vm1.ulg.ac.be>",
            decode("=?ISO-8859-1?Q?Andr=E9?= Pirard <PIRARD@vm1.ulg.ac.be>")
        );
        assert_eq!(
            "If you can read this you understand the example.",
            decode(
                "=?ISO-8859-1?B?SWYgeW91IGNhbiByZWFkIHRoaXMgeW8=?= \
                 =?ISO-8859-2?B?dSB1bmRlcnN0YW5kIHRoZSBleGFtcGxlLg==?="
            )
        );
        assert_eq!(
            "םולש ןב ילטפנ",
            decode("=?iso-8859-8?b?7eXs+SDv4SDp7Oj08A==?=")
        );
    }

    #[test]
    fn whitespace_between_decoded_words_is_dropped() {
        assert_eq!("a b", decode("=?ISO-8859-1?Q?a?= b"));
        assert_eq!("ab", decode("=?ISO-8859-1?Q?a?= =?ISO-8859-1?Q?b?="));
        assert_eq!("ab", decode("=?ISO-8859-1?Q?a?=\r\n =?ISO-8859-1?Q?b?="));
        assert_eq!("a b", decode("=?ISO-8859-1?Q?a?= =?ISO-8859-2?Q?_b?="));
        // Non-whitespace separators always survive
        assert_eq!("a//b", decode("=?utf-8?Q?a?=//=?utf-8?Q?b?="));
    }

    #[test]
    fn multibyte_and_bom_handling() {
        assert_eq!("Café", decode("=?UTF-8?Q?Caf=C3=A9?="));
        assert_eq!("안녕", decode("=?euc-kr?B?vsiz5w==?="));
        // A BOM carried inside the payload is not rendered
        assert_eq!("hi", decode("=?utf-16?B?//5oAGkA?="));
    }

    #[test]
    fn aliased_charsets_resolve_before_decoding() {
        let charsets =
            CharsetResolver::from_grouped_entries(&["ks_c_5601-1987:euc-kr"]);
        let decoded = decode_encoded_words(
            "=?KS_C_5601-1987?B?vsiz5w==?=",
            &charsets,
            DecodeMode::Silent,
        )
        .unwrap();
        assert_eq!("안녕", decoded);
    }

    #[test]
    fn undecodable_words_stay_verbatim_in_silent_mode() {
        assert_eq!(
            "=?bogus-9999?B?SGVsbG8=?=",
            decode("=?bogus-9999?B?SGVsbG8=?=")
        );
        assert_eq!("=?utf-8?X?foo?=", decode("=?utf-8?X?foo?="));
        assert_eq!("=?utf-8?B?!!!?=", decode("=?utf-8?B?!!!?="));
        assert_eq!("=?utf-8?Q?abc=?=", decode("=?utf-8?Q?abc=?="));
    }

    #[test]
    fn separators_around_failed_words_are_kept() {
        assert_eq!(
            "ok =?bogus-9999?Q?x?=",
            decode("=?utf-8?Q?ok?= =?bogus-9999?Q?x?=")
        );
        assert_eq!(
            "=?bogus-9999?Q?x?= b",
            decode("=?bogus-9999?Q?x?= =?utf-8?Q?b?=")
        );
    }

    #[test]
    fn partial_decode_keeps_surrounding_text() {
        assert_eq!(
            "before émid =?bogus-9999?Q?x?= after",
            decode("before =?utf-8?Q?=C3=A9mid?= =?bogus-9999?Q?x?= after")
        );
    }

    #[test]
    fn strict_mode_fails_on_undecodable_words() {
        let err = decode_encoded_words(
            "=?bogus-9999?B?SGVsbG8=?=",
            &CharsetResolver::default(),
            DecodeMode::Strict,
        )
        .unwrap_err();

        match err {
            Error::EncodedWord { word, reason } => {
                assert_eq!("=?bogus-9999?B?SGVsbG8=?=", word);
                assert_eq!("unresolvable charset", reason);
            },
            e => panic!("unexpected error: {}", e),
        }
    }

    #[test]
    fn strict_mode_succeeds_when_everything_decodes() {
        let decoded = decode_encoded_words(
            "=?utf-8?B?aGVsbG8=?= world",
            &CharsetResolver::default(),
            DecodeMode::Strict,
        )
        .unwrap();
        assert_eq!("hello world", decoded);
    }

    proptest! {
        #[test]
        fn silent_decode_never_fails(s in ".*") {
            let charsets = CharsetResolver::default();
            decode_encoded_words(&s, &charsets, DecodeMode::Silent).unwrap();
        }

        #[test]
        fn silent_decode_never_fails_on_wordlike_input(
            s in r"=\?[a-z0-9-]{1,12}\?[a-zA-Z]\?[!-~]{0,12}\?=",
        ) {
            let charsets = CharsetResolver::default();
            decode_encoded_words(&s, &charsets, DecodeMode::Silent).unwrap();
        }
    }
}
