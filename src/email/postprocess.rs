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

//! The finishing pass that runs once when the root message ends.
//!
//! At that point every leaf has been absorbed and the pass can make the
//! decisions that need the whole message in view:
//!
//! 1. Record the total decoded size as the parts arrived.
//! 2. If there is an HTML body but no plain text body, derive one from the
//!    HTML so consumers can always count on plain text being there.
//! 3. Fold image attachments referenced by `cid:` from the HTML body into
//!    it as `data:` URIs, and drop them from the attachment list.
//! 4. Prune attachments with no Content-Disposition filename; a client
//!    could not offer them for download under any name.
//! 5. Record the total size again, now describing what a client would
//!    actually receive.
//!
//! The pass is not idempotent (sizes and the HTML body change), so the
//! caller runs it exactly once.

use log::debug;

use crate::email::assembly::{Attachment, BodyKind, Email};
use crate::mime::html::html_to_text;
use crate::mime::media_type::is_valid_media_type;
use crate::support::buffer::PayloadStore;
use crate::support::config::ReassemblyConfig;
use crate::support::error::Error;

pub(crate) fn run(email: &mut Email, store: &PayloadStore) -> Result<(), Error> {
    email.decoded_size = total_size(email);

    derive_plain_text(email, store)?;
    inline_images(email, store)?;
    prune_nameless_attachments(email);

    email.final_size = total_size(email);
    Ok(())
}

fn total_size(email: &Email) -> u64 {
    let mut size = 0;
    for body in email
        .plain_text
        .iter()
        .chain(&email.html)
        .chain(&email.calendar)
    {
        size += body.len();
    }
    for attachment in &email.attachments {
        size += attachment.len();
    }
    size
}

/// Derives a plain text body from the HTML body when the message supplied
/// none of its own.
///
/// The derived body inherits the HTML part's descriptor and is encoded
/// with the charset the HTML declared, except where the encoder cannot
/// produce that charset (the UTF-16 family); then the bytes come out as
/// UTF-8 and the charset label is rewritten to match them.
fn derive_plain_text(
    email: &mut Email,
    store: &PayloadStore,
) -> Result<(), Error> {
    if email.plain_text.is_some() {
        return Ok(());
    }

    let html = match email.html {
        Some(ref html) => html,
        None => return Ok(()),
    };

    let encoding =
        email.config.charsets().encoding(html.descriptor().charset.as_deref());
    let data = html.payload().read()?;
    let text = html_to_text(&encoding.decode_with_bom_removal(&data).0);
    // encoding_rs never encodes to the UTF-16 family; the middle element is
    // the encoding the bytes are actually in
    let (encoded, actual, _) = encoding.encode(&text);

    let mut descriptor = html.descriptor().clone();
    if actual != encoding {
        descriptor.charset = Some(actual.name().to_owned());
    }

    debug!("Derived a {} byte plain text body from HTML", encoded.len());
    email.plain_text = Some(Attachment::new(
        BodyKind::PlainText,
        descriptor,
        store.store(&encoded)?,
    ));
    Ok(())
}

/// Rewrites `cid:` references in the HTML body to `data:` URIs and drops
/// the image attachments they pointed at.
///
/// The HTML body is re-encoded whenever it exists, substitutions or not, so
/// its payload always reflects one decode-process-encode round trip and its
/// charset label always matches its bytes.
fn inline_images(email: &mut Email, store: &PayloadStore) -> Result<(), Error> {
    let html = match email.html {
        Some(ref mut html) => html,
        None => return Ok(()),
    };

    let encoding =
        email.config.charsets().encoding(html.descriptor().charset.as_deref());
    let data = html.payload().read()?;
    let mut text = encoding.decode_with_bom_removal(&data).0.into_owned();

    let mut kept = Vec::with_capacity(email.attachments.len());
    for attachment in email.attachments.drain(..) {
        if substitute(&mut text, &attachment, &email.config)? {
            debug!(
                "Inlined image attachment {:?} into the HTML body",
                attachment.descriptor().content_id_unbracketed()
            );
            email.inlined = true;
        } else {
            kept.push(attachment);
        }
    }
    email.attachments = kept;

    let (encoded, actual, _) = encoding.encode(&text);
    if actual != encoding {
        html.descriptor_mut().charset = Some(actual.name().to_owned());
    }
    html.replace_payload(store.store(&encoded)?);
    Ok(())
}

/// Replaces every `cid:` reference to `attachment` in `text` with a `data:`
/// URI, returning whether anything was replaced.
fn substitute(
    text: &mut String,
    attachment: &Attachment,
    config: &ReassemblyConfig,
) -> Result<bool, Error> {
    if !is_image(attachment, config) {
        return Ok(false);
    }

    let cid = match attachment.descriptor().content_id_unbracketed() {
        Some(cid) if !cid.is_empty() => cid,
        _ => return Ok(false),
    };

    let reference = format!("cid:{}", cid);
    if !text.contains(&reference) {
        return Ok(false);
    }

    // A mangled declared type still inlines; browsers sniff the real type
    // from the payload when the URI carries none.
    let mime_type = attachment.descriptor().mime_type.as_str();
    let mime_type = if is_valid_media_type(mime_type) {
        mime_type
    } else {
        ""
    };

    let uri = format!(
        "data:{};base64,{}",
        mime_type,
        base64::encode(&attachment.payload().read()?)
    );
    *text = text.replace(&reference, &uri);
    Ok(true)
}

/// An attachment is an image if it says so or if its filename looks like
/// one. The filename check catches senders that label every attachment
/// `application/octet-stream`.
fn is_image(attachment: &Attachment, config: &ReassemblyConfig) -> bool {
    attachment.descriptor().is_media_type("image")
        || attachment
            .name()
            .map(|name| config.is_image_filename(name))
            .unwrap_or(false)
}

fn prune_nameless_attachments(email: &mut Email) {
    let before = email.attachments.len();
    email
        .attachments
        .retain(|attachment| attachment.name().is_some());

    let pruned = before - email.attachments.len();
    if pruned > 0 {
        debug!("Pruned {} nameless attachment(s)", pruned);
    }
}
