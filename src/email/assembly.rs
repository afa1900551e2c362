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

//! The logical email being assembled, and the policy for placing each
//! decoded leaf into it.
//!
//! A message has at most one plain text body, one HTML body and one calendar
//! body. Every other leaf is an attachment. Which parts land in the body
//! slots is a policy decision, not something the MIME tree spells out:
//!
//! - A part with a Content-Disposition filename was authored as an
//!   attachment and is never a body candidate, whatever its type.
//! - The first nameless `text/plain`, `text/html` or `text/calendar` leaf
//!   claims the matching slot.
//! - A later leaf of the same kind is a continuation if the innermost open
//!   multipart is `multipart/mixed` (clients render the pieces as one
//!   document, so they are merged in arrival order), and a competing
//!   rendition otherwise (kept as an attachment, still tagged with its
//!   kind).

use std::borrow::Cow;
use std::sync::Arc;

use log::debug;

use crate::email::model::{Header, MultipartFrame, PartDescriptor};
use crate::mime::encoded_word::{decode_encoded_words, DecodeMode};
use crate::support::buffer::{Payload, PayloadStore};
use crate::support::config::ReassemblyConfig;
use crate::support::error::Error;

/// What role a leaf plays in the reconstructed email.
///
/// The kind is assigned when the leaf is absorbed and never changes
/// afterwards, so a demoted duplicate HTML body can still be recognised as
/// HTML when it sits in the attachment list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    PlainText,
    Html,
    Calendar,
    /// Not a body candidate at all.
    Generic,
}

/// One leaf of the message: a payload plus the descriptor it arrived with.
///
/// Bodies and attachments are the same shape; the difference is only where
/// the reconstructed email holds them.
#[derive(Clone, Debug)]
pub struct Attachment {
    kind: BodyKind,
    descriptor: PartDescriptor,
    payload: Payload,
}

impl Attachment {
    pub(crate) fn new(
        kind: BodyKind,
        descriptor: PartDescriptor,
        payload: Payload,
    ) -> Self {
        Attachment {
            kind,
            descriptor,
            payload,
        }
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn descriptor(&self) -> &PartDescriptor {
        &self.descriptor
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The decoded size in bytes.
    pub fn len(&self) -> u64 {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The attachment's name, which is its Content-Disposition filename.
    ///
    /// An attachment without one has no name a client could show, and the
    /// finishing pass prunes it.
    pub fn name(&self) -> Option<&str> {
        self.descriptor.filename.as_deref()
    }

    pub(crate) fn replace_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    pub(crate) fn descriptor_mut(&mut self) -> &mut PartDescriptor {
        &mut self.descriptor
    }
}

/// The logical email a mail client would render from the event stream.
///
/// Values of this type are produced by
/// [`Reassembler::finish`](crate::email::sink::Reassembler::finish) and are
/// immutable from then on.
#[derive(Debug)]
pub struct Email {
    pub(crate) header: Header,
    pub(crate) plain_text: Option<Attachment>,
    pub(crate) html: Option<Attachment>,
    pub(crate) calendar: Option<Attachment>,
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) inlined: bool,
    pub(crate) decoded_size: u64,
    pub(crate) final_size: u64,
    pub(crate) config: Arc<ReassemblyConfig>,
}

impl Email {
    pub(crate) fn new(config: Arc<ReassemblyConfig>) -> Self {
        Email {
            header: Header::new(),
            plain_text: None,
            html: None,
            calendar: None,
            attachments: Vec::new(),
            inlined: false,
            decoded_size: 0,
            final_size: 0,
            config,
        }
    }

    /// All header fields of the message, including those of embedded
    /// messages.
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn plain_text_body(&self) -> Option<&Attachment> {
        self.plain_text.as_ref()
    }

    pub fn html_body(&self) -> Option<&Attachment> {
        self.html.as_ref()
    }

    pub fn calendar_body(&self) -> Option<&Attachment> {
        self.calendar.as_ref()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Whether any image attachment was folded into the HTML body as a
    /// `data:` URI.
    pub fn has_inlined_attachments(&self) -> bool {
        self.inlined
    }

    /// Total decoded size in bytes of all bodies and attachments as they
    /// arrived, before the finishing pass reshaped anything.
    pub fn decoded_size(&self) -> u64 {
        self.decoded_size
    }

    /// Total size in bytes of all bodies and attachments as a client would
    /// receive them.
    pub fn final_size(&self) -> u64 {
        self.final_size
    }

    pub fn subject(&self) -> Option<String> {
        self.decoded_header("Subject")
    }

    pub fn from(&self) -> Option<String> {
        self.decoded_header("From")
    }

    pub fn to(&self) -> Option<String> {
        self.decoded_header("To")
    }

    pub fn cc(&self) -> Option<String> {
        self.decoded_header("Cc")
    }

    pub fn bcc(&self) -> Option<String> {
        self.decoded_header("Bcc")
    }

    /// Returns the first header named `name`, unfolded and with its encoded
    /// words decoded.
    ///
    /// Decoding is always silent here; an address line with a broken
    /// encoded word is still mostly legible, which beats refusing to show
    /// it at all.
    pub fn decoded_header(&self, name: &str) -> Option<String> {
        let raw = self.header.get(name)?;
        let text = to_utf8(unfold(raw));
        decode_encoded_words(
            text.trim(),
            self.config.charsets(),
            DecodeMode::Silent,
        )
        .ok()
        .map(Cow::into_owned)
    }

    /// Places one decoded leaf, honoring the body-slot policy.
    ///
    /// `enclosing` is the innermost open multipart, if any.
    pub(crate) fn absorb(
        &mut self,
        descriptor: PartDescriptor,
        data: &[u8],
        enclosing: Option<&MultipartFrame>,
        store: &PayloadStore,
    ) -> Result<(), Error> {
        if self.add_plain_text(&descriptor, data, enclosing, store)? {
            return Ok(());
        }
        if self.add_html(&descriptor, data, enclosing, store)? {
            return Ok(());
        }
        if self.add_calendar(&descriptor, data, enclosing, store)? {
            return Ok(());
        }

        self.attachments.push(Attachment::new(
            BodyKind::Generic,
            descriptor,
            store.store(data)?,
        ));
        Ok(())
    }

    fn add_plain_text(
        &mut self,
        descriptor: &PartDescriptor,
        data: &[u8],
        enclosing: Option<&MultipartFrame>,
        store: &PayloadStore,
    ) -> Result<bool, Error> {
        if !is_body_candidate(descriptor, "text/plain") {
            return Ok(false);
        }

        match self.plain_text {
            None => {
                self.plain_text = Some(Attachment::new(
                    BodyKind::PlainText,
                    descriptor.clone(),
                    store.store(data)?,
                ));
            },
            Some(ref mut body) => merge_or_demote(
                body,
                &mut self.attachments,
                BodyKind::PlainText,
                descriptor,
                data,
                enclosing,
                store,
            )?,
        }
        Ok(true)
    }

    fn add_html(
        &mut self,
        descriptor: &PartDescriptor,
        data: &[u8],
        enclosing: Option<&MultipartFrame>,
        store: &PayloadStore,
    ) -> Result<bool, Error> {
        if !is_body_candidate(descriptor, "text/html") {
            return Ok(false);
        }

        match self.html {
            None => {
                self.html = Some(Attachment::new(
                    BodyKind::Html,
                    descriptor.clone(),
                    store.store(data)?,
                ));
            },
            Some(ref mut body) => merge_or_demote(
                body,
                &mut self.attachments,
                BodyKind::Html,
                descriptor,
                data,
                enclosing,
                store,
            )?,
        }
        Ok(true)
    }

    fn add_calendar(
        &mut self,
        descriptor: &PartDescriptor,
        data: &[u8],
        enclosing: Option<&MultipartFrame>,
        store: &PayloadStore,
    ) -> Result<bool, Error> {
        if !is_body_candidate(descriptor, "text/calendar") {
            return Ok(false);
        }

        match self.calendar {
            None => {
                self.calendar = Some(Attachment::new(
                    BodyKind::Calendar,
                    descriptor.clone(),
                    store.store(data)?,
                ));
            },
            Some(ref mut body) => merge_or_demote(
                body,
                &mut self.attachments,
                BodyKind::Calendar,
                descriptor,
                data,
                enclosing,
                store,
            )?,
        }
        Ok(true)
    }
}

fn is_body_candidate(descriptor: &PartDescriptor, mime_type: &str) -> bool {
    descriptor.filename.is_none() && descriptor.is_mime_type(mime_type)
}

/// Resolves a second body of an already-filled slot.
///
/// Under `multipart/mixed` the new chunk continues the existing body, so it
/// is appended to it. Under any other multipart the new chunk is a
/// competing rendition and becomes an attachment, keeping its kind.
fn merge_or_demote(
    body: &mut Attachment,
    attachments: &mut Vec<Attachment>,
    kind: BodyKind,
    descriptor: &PartDescriptor,
    data: &[u8],
    enclosing: Option<&MultipartFrame>,
    store: &PayloadStore,
) -> Result<(), Error> {
    let frame = match enclosing {
        Some(frame) => frame,
        None => return Err(Error::DuplicateBodyOutsideMultipart),
    };

    if frame.is_mixed() {
        debug!("Merging duplicate {:?} body under multipart/mixed", kind);
        let merged = store.concat(body.payload(), data)?;
        body.replace_payload(merged);
    } else {
        debug!(
            "Demoting duplicate {:?} body under {} to attachment",
            kind, frame.descriptor.mime_type
        );
        attachments.push(Attachment::new(
            kind,
            descriptor.clone(),
            store.store(data)?,
        ));
    }
    Ok(())
}

fn to_utf8(cow: Cow<[u8]>) -> Cow<str> {
    match cow {
        Cow::Owned(owned) => Cow::Owned(match String::from_utf8(owned) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }),
        Cow::Borrowed(borrowed) => String::from_utf8_lossy(borrowed),
    }
}

/// Removes RFC 5322 folding from a raw header value.
fn unfold(s: &[u8]) -> Cow<[u8]> {
    if memchr::memchr(b'\n', s).is_none() {
        return Cow::Borrowed(s);
    }

    let mut unfolded = Vec::with_capacity(s.len());
    let mut is_unfolding = false;
    for ch in s.iter().copied() {
        if is_unfolding {
            if b' ' == ch || b'\t' == ch || b'\r' == ch || b'\n' == ch {
                continue;
            } else {
                is_unfolding = false;
                unfolded.push(ch);
            }
        } else if b'\r' == ch || b'\n' == ch {
            unfolded.push(b' ');
            is_unfolding = true;
        } else {
            unfolded.push(ch);
        }
    }

    Cow::Owned(unfolded)
}

#[cfg(test)]
mod test {
    use super::*;

    fn email() -> Email {
        Email::new(Arc::new(ReassemblyConfig::default()))
    }

    fn store() -> PayloadStore {
        PayloadStore::new()
    }

    fn mixed_frame() -> MultipartFrame {
        MultipartFrame::new(PartDescriptor::new("multipart/mixed"))
    }

    fn alternative_frame() -> MultipartFrame {
        MultipartFrame::new(PartDescriptor::new("multipart/alternative"))
    }

    fn body_of(attachment: &Attachment) -> Vec<u8> {
        attachment.payload().read().unwrap()
    }

    #[test]
    fn first_matching_leaf_claims_each_slot() {
        let mut email = email();
        let store = store();
        let frame = alternative_frame();

        email
            .absorb(
                PartDescriptor::new("text/plain"),
                b"plain",
                Some(&frame),
                &store,
            )
            .unwrap();
        email
            .absorb(
                PartDescriptor::new("TEXT/HTML"),
                b"<p>html</p>",
                Some(&frame),
                &store,
            )
            .unwrap();
        email
            .absorb(
                PartDescriptor::new("text/calendar"),
                b"BEGIN:VCALENDAR",
                Some(&frame),
                &store,
            )
            .unwrap();

        assert_eq!(b"plain".to_vec(), body_of(email.plain_text_body().unwrap()));
        assert_eq!(
            b"<p>html</p>".to_vec(),
            body_of(email.html_body().unwrap())
        );
        assert_eq!(
            b"BEGIN:VCALENDAR".to_vec(),
            body_of(email.calendar_body().unwrap())
        );
        assert!(email.attachments().is_empty());
        assert_eq!(BodyKind::Html, email.html_body().unwrap().kind());
    }

    #[test]
    fn named_parts_are_never_body_candidates() {
        let mut email = email();
        let store = store();

        email
            .absorb(
                PartDescriptor::new("text/plain").with_filename("notes.txt"),
                b"not a body",
                None,
                &store,
            )
            .unwrap();

        assert!(email.plain_text_body().is_none());
        assert_eq!(1, email.attachments().len());
        assert_eq!(BodyKind::Generic, email.attachments()[0].kind());
        assert_eq!(Some("notes.txt"), email.attachments()[0].name());
    }

    #[test]
    fn mixed_duplicates_merge_in_arrival_order() {
        let mut email = email();
        let store = store();
        let frame = mixed_frame();

        email
            .absorb(PartDescriptor::new("text/plain"), b"B", Some(&frame), &store)
            .unwrap();
        email
            .absorb(PartDescriptor::new("text/plain"), b"A", Some(&frame), &store)
            .unwrap();

        assert_eq!(b"BA".to_vec(), body_of(email.plain_text_body().unwrap()));
        assert!(email.attachments().is_empty());
    }

    #[test]
    fn non_mixed_duplicates_demote_and_keep_their_kind() {
        let mut email = email();
        let store = store();
        let frame = alternative_frame();

        email
            .absorb(
                PartDescriptor::new("text/html"),
                b"<p>first</p>",
                Some(&frame),
                &store,
            )
            .unwrap();
        email
            .absorb(
                PartDescriptor::new("text/html"),
                b"<p>second</p>",
                Some(&frame),
                &store,
            )
            .unwrap();

        assert_eq!(
            b"<p>first</p>".to_vec(),
            body_of(email.html_body().unwrap())
        );
        assert_eq!(1, email.attachments().len());
        assert_eq!(BodyKind::Html, email.attachments()[0].kind());
        assert_eq!(
            b"<p>second</p>".to_vec(),
            body_of(&email.attachments()[0])
        );
    }

    #[test]
    fn duplicate_outside_any_multipart_is_an_error() {
        let mut email = email();
        let store = store();

        email
            .absorb(PartDescriptor::new("text/plain"), b"one", None, &store)
            .unwrap();
        let err = email
            .absorb(PartDescriptor::new("text/plain"), b"two", None, &store)
            .unwrap_err();

        assert_matches!(Error::DuplicateBodyOutsideMultipart, err);
    }

    #[test]
    fn unmatched_types_become_generic_attachments() {
        let mut email = email();
        let store = store();

        email
            .absorb(
                PartDescriptor::new("application/pdf"),
                b"%PDF-",
                None,
                &store,
            )
            .unwrap();

        assert_eq!(1, email.attachments().len());
        assert_eq!(BodyKind::Generic, email.attachments()[0].kind());
        assert_eq!(None, email.attachments()[0].name());
    }

    #[test]
    fn subject_is_unfolded_and_decoded() {
        let mut email = email();
        email
            .header
            .add("Subject", &b"Hello\r\n =?UTF-8?Q?Caf=C3=A9?="[..]);

        assert_eq!(Some("Hello Café".to_owned()), email.subject());
    }

    #[test]
    fn undecodable_subject_survives_verbatim() {
        let mut email = email();
        email
            .header
            .add("Subject", &b"=?bogus-9999?B?SGVsbG8=?= raw"[..]);

        assert_eq!(
            Some("=?bogus-9999?B?SGVsbG8=?= raw".to_owned()),
            email.subject()
        );
    }

    #[test]
    fn address_headers_decode_via_first_match() {
        let mut email = email();
        email.header.add("From", &b"alice@example.com"[..]);
        email.header.add("To", &b"=?utf-8?B?Qm9i?= <bob@example.com>"[..]);
        email.header.add("To", &b"shadowed@example.com"[..]);

        assert_eq!(Some("alice@example.com".to_owned()), email.from());
        assert_eq!(Some("Bob <bob@example.com>".to_owned()), email.to());
        assert_eq!(None, email.cc());
        assert_eq!(None, email.bcc());
    }
}
