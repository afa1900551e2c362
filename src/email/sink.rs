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

//! The push interface between an external MIME tokenizer and the
//! reconstruction.
//!
//! The tokenizer owns syntax: boundaries, header parsing, transfer
//! decoding. It reports what it finds as a flat event stream, and the
//! [`Reassembler`] turns that stream back into the tree-shaped facts that
//! matter (which message and which multipart each leaf sits in) using two
//! stacks. Nothing here ever re-parses bytes.
//!
//! Embedded `message/rfc822` content gets the same events as the outer
//! message. The reconstruction describes only what the outermost message
//! presents, so leaves of embedded messages are dropped, while their
//! header fields still land in the shared header multimap.

use std::sync::Arc;

use log::debug;

use crate::email::assembly::Email;
use crate::email::model::{MessageFrame, MultipartFrame, PartDescriptor};
use crate::email::postprocess;
use crate::support::buffer::PayloadStore;
use crate::support::config::ReassemblyConfig;
use crate::support::error::Error;

/// The events a MIME tokenizer pushes into a reconstruction.
///
/// Methods correspond one-to-one to what a streaming tokenizer emits while
/// walking a message. Balanced nesting is the caller's responsibility;
/// unbalanced streams are reported as errors, never panics.
pub trait MimeSink {
    /// One header field of the entity currently being parsed, with the raw
    /// (possibly folded, possibly RFC 2047 encoded) value.
    fn header_field(&mut self, name: &str, value: &[u8]) -> Result<(), Error>;
    /// A message begins; the first event of the stream, and also emitted
    /// for each embedded `message/rfc822`.
    fn message_start(&mut self) -> Result<(), Error>;
    /// The message most recently started ends.
    fn message_end(&mut self) -> Result<(), Error>;
    /// A multipart entity begins.
    fn multipart_start(
        &mut self,
        descriptor: PartDescriptor,
    ) -> Result<(), Error>;
    /// The multipart most recently started ends.
    fn multipart_end(&mut self) -> Result<(), Error>;
    /// One decoded leaf, with the transfer encoding already removed.
    fn body_part(
        &mut self,
        descriptor: PartDescriptor,
        data: &[u8],
    ) -> Result<(), Error>;
}

/// Reconstructs one logical [`Email`] from a tokenizer's event stream.
///
/// Feed the events through the [`MimeSink`] impl, then call
/// [`finish`](Reassembler::finish). Each value handles exactly one message;
/// the configuration is shared, so reconstructing many messages with the
/// same policy means one `Arc<ReassemblyConfig>` and one `Reassembler` per
/// message.
pub struct Reassembler {
    email: Email,
    store: PayloadStore,
    message_stack: Vec<MessageFrame>,
    multipart_stack: Vec<MultipartFrame>,
    complete: bool,
}

impl Reassembler {
    pub fn new(config: Arc<ReassemblyConfig>) -> Self {
        Reassembler::with_store(config, PayloadStore::new())
    }

    /// Creates a reassembler with an explicit payload spill policy.
    pub fn with_store(
        config: Arc<ReassemblyConfig>,
        store: PayloadStore,
    ) -> Self {
        Reassembler {
            email: Email::new(config),
            store,
            message_stack: Vec::new(),
            multipart_stack: Vec::new(),
            complete: false,
        }
    }

    /// Takes the reconstructed email out.
    ///
    /// Fails with [`Error::ReconstructionIncomplete`] if the root message
    /// has not ended yet.
    pub fn finish(self) -> Result<Email, Error> {
        if !self.complete {
            return Err(Error::ReconstructionIncomplete);
        }
        Ok(self.email)
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.complete {
            return Err(Error::ReconstructionComplete);
        }
        Ok(())
    }
}

impl MimeSink for Reassembler {
    fn header_field(&mut self, name: &str, value: &[u8]) -> Result<(), Error> {
        self.check_open()?;
        // Fields of embedded messages accumulate here too; first-match
        // lookup keeps the outer message's values authoritative.
        self.email.header.add(name, value);
        Ok(())
    }

    fn message_start(&mut self) -> Result<(), Error> {
        self.check_open()?;
        let frame = if self.message_stack.is_empty() {
            MessageFrame::Root
        } else {
            MessageFrame::Nested
        };
        self.message_stack.push(frame);
        Ok(())
    }

    fn message_end(&mut self) -> Result<(), Error> {
        self.check_open()?;
        let frame = match self.message_stack.last() {
            Some(&frame) => frame,
            None => return Err(Error::UnmatchedMessageEnd),
        };

        if MessageFrame::Root == frame {
            postprocess::run(&mut self.email, &self.store)?;
            self.complete = true;
            debug!(
                "Reconstruction complete: {} => {} bytes, {} attachment(s)",
                self.email.decoded_size(),
                self.email.final_size(),
                self.email.attachments().len()
            );
        }

        self.message_stack.pop();
        Ok(())
    }

    fn multipart_start(
        &mut self,
        descriptor: PartDescriptor,
    ) -> Result<(), Error> {
        self.check_open()?;
        self.multipart_stack.push(MultipartFrame::new(descriptor));
        Ok(())
    }

    fn multipart_end(&mut self) -> Result<(), Error> {
        self.check_open()?;
        match self.multipart_stack.pop() {
            Some(..) => Ok(()),
            None => Err(Error::UnmatchedMultipartEnd),
        }
    }

    fn body_part(
        &mut self,
        descriptor: PartDescriptor,
        data: &[u8],
    ) -> Result<(), Error> {
        self.check_open()?;
        let top = match self.message_stack.last() {
            Some(&frame) => frame,
            None => return Err(Error::BodyOutsideMessage),
        };

        if MessageFrame::Nested == top {
            debug!(
                "Dropping {} leaf of embedded message",
                descriptor.mime_type
            );
            return Ok(());
        }

        self.email.absorb(
            descriptor,
            data,
            self.multipart_stack.last(),
            &self.store,
        )
    }
}
