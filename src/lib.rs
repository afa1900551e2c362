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

//! Mimesis reconstructs the *logical* email out of raw MIME structure: the
//! message a mail client would actually show, rather than the tree the
//! sender's software happened to generate.
//!
//! A streaming MIME tokenizer (which this crate deliberately is not) pushes
//! events through the [`MimeSink`] trait as it walks a message. A
//! [`Reassembler`] consumes the stream and applies the policy questions the
//! tokenizer cannot answer: which `text/plain` leaf is *the* body and which
//! is an attachment, whether a second HTML part continues the first or
//! competes with it, what to do with an image that the HTML body references
//! by Content-ID, and how to read headers whose charset labels are lies.
//!
//! When the root message ends, a finishing pass derives a plain text body
//! from the HTML one if the sender supplied none, folds `cid:`-referenced
//! images into the HTML as `data:` URIs, and prunes attachments no client
//! could name. The result is an immutable [`Email`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use mimesis::{MimeSink, PartDescriptor, Reassembler, ReassemblyConfig};
//!
//! # fn main() -> Result<(), mimesis::Error> {
//! let config = Arc::new(ReassemblyConfig::default());
//! let mut reassembler = Reassembler::new(Arc::clone(&config));
//!
//! reassembler.message_start()?;
//! reassembler.header_field("Subject", b"=?utf-8?Q?Caf=C3=A9?=")?;
//! reassembler.multipart_start(PartDescriptor::new("multipart/alternative"))?;
//! reassembler.body_part(PartDescriptor::new("text/plain"), b"hello")?;
//! reassembler.body_part(PartDescriptor::new("text/html"), b"<p>hello</p>")?;
//! reassembler.multipart_end()?;
//! reassembler.message_end()?;
//!
//! let email = reassembler.finish()?;
//! assert_eq!(Some("Café".to_owned()), email.subject());
//! assert_eq!(5, email.plain_text_body().unwrap().len());
//! # Ok(())
//! # }
//! ```

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod email;
pub mod mime;
pub mod support;

pub use crate::email::assembly::{Attachment, BodyKind, Email};
pub use crate::email::model::{
    Header, MessageFrame, MultipartFrame, PartDescriptor,
};
pub use crate::email::sink::{MimeSink, Reassembler};
pub use crate::mime::encoded_word::{decode_encoded_words, DecodeMode};
pub use crate::support::buffer::{Payload, PayloadStore};
pub use crate::support::charset::CharsetResolver;
pub use crate::support::config::ReassemblyConfig;
pub use crate::support::error::Error;
