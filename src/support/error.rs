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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The event source ended a multipart that was never started.
    #[error("Multipart end with no multipart open")]
    UnmatchedMultipartEnd,
    /// The event source ended a message that was never started.
    #[error("Message end with no message open")]
    UnmatchedMessageEnd,
    /// A body part arrived while no message was open.
    #[error("Body part outside any message")]
    BodyOutsideMessage,
    /// A second body of the same kind arrived with no enclosing multipart.
    /// A well-formed event stream cannot produce this.
    #[error("Duplicate body part with no enclosing multipart")]
    DuplicateBodyOutsideMultipart,
    /// An event arrived after the root message had already ended.
    #[error("Reconstruction is already complete")]
    ReconstructionComplete,
    /// `finish()` was called before the root message ended.
    #[error("Reconstruction is incomplete")]
    ReconstructionIncomplete,
    /// Strict-mode failure from the encoded-word decoder.
    #[error("Cannot decode encoded word {word}: {reason}")]
    EncodedWord { word: String, reason: &'static str },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
