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

//! The passive data types of reconstruction: part descriptors, the header
//! multimap, and the stack frames tracking where in the MIME tree the event
//! stream currently is.

/// Metadata about one leaf or multipart, as reported by the event source.
///
/// The event source is expected to have reduced the Content-Type header to a
/// bare `type/subtype` (no parameters) and to have extracted the charset
/// parameter and Content-Disposition filename separately. Nothing here is
/// re-parsed; descriptors are trusted as given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartDescriptor {
    /// The `type/subtype`, compared case-insensitively everywhere.
    pub mime_type: String,
    /// The charset parameter of the Content-Type, if any.
    pub charset: Option<String>,
    /// The filename from the Content-Disposition, if any. A part with a
    /// filename is never a body candidate.
    pub filename: Option<String>,
    /// The Content-ID, with any angle bracket delimiters still attached.
    pub content_id: Option<String>,
}

impl PartDescriptor {
    pub fn new(mime_type: impl Into<String>) -> Self {
        PartDescriptor {
            mime_type: mime_type.into(),
            charset: None,
            filename: None,
            content_id: None,
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// The major type, i.e. `image` out of `image/png`.
    pub fn media_type(&self) -> &str {
        match self.mime_type.find('/') {
            Some(ix) => &self.mime_type[..ix],
            None => &self.mime_type,
        }
    }

    pub fn is_mime_type(&self, mime_type: &str) -> bool {
        self.mime_type.eq_ignore_ascii_case(mime_type)
    }

    pub fn is_media_type(&self, media_type: &str) -> bool {
        self.media_type().eq_ignore_ascii_case(media_type)
    }

    /// The Content-ID with the angle bracket delimiters removed, which is
    /// the form `cid:` references use.
    pub fn content_id_unbracketed(&self) -> Option<&str> {
        self.content_id
            .as_deref()
            .map(|cid| cid.trim_start_matches('<').trim_end_matches('>'))
    }
}

/// An ordered multimap of header fields.
///
/// Every field from every entity in the message ends up here in arrival
/// order, duplicates included. Name lookups are case-insensitive and return
/// the first match, so when an embedded message repeats a field of the outer
/// message, the outer value wins.
#[derive(Clone, Debug, Default)]
pub struct Header {
    fields: Vec<(String, Vec<u8>)>,
}

impl Header {
    pub fn new() -> Self {
        Header::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Returns the first field named `name`, case-insensitively.
    ///
    /// The returned slice borrows from the header, not from `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// Returns every field named `name` in arrival order.
    pub fn get_all<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.fields
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Whether a message frame is the outermost message or one embedded as
/// `message/rfc822` content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageFrame {
    Root,
    Nested,
}

/// An open multipart, remembered while its children are delivered.
#[derive(Clone, Debug)]
pub struct MultipartFrame {
    pub descriptor: PartDescriptor,
}

impl MultipartFrame {
    pub fn new(descriptor: PartDescriptor) -> Self {
        MultipartFrame { descriptor }
    }

    /// Whether this multipart merges same-kind duplicate bodies instead of
    /// demoting them.
    pub fn is_mixed(&self) -> bool {
        self.descriptor.is_mime_type("multipart/mixed")
    }
}
