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

//! Support for payloads, which are write-once-read-many values that spill to
//! a temporary file if they exceed a maximum size.
//!
//! A [`Payload`] is an immutable snapshot of one decoded body. "Mutation"
//! during reconstruction (merging a continuation chunk, rewriting an HTML
//! body) always produces a new snapshot through the [`PayloadStore`] that
//! created the original; the old snapshot simply ceases to be referenced.
//! Clones share backing storage, and spilled files are unlinked when the
//! last clone goes away.

use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::support::error::Error;

/// Payloads up to this many bytes stay in memory.
pub const DEFAULT_SPILL_THRESHOLD: usize = 65536;

/// An immutable snapshot of one decoded payload.
#[derive(Clone)]
pub struct Payload {
    len: u64,
    backing: Backing,
}

#[derive(Clone)]
enum Backing {
    Memory(Arc<[u8]>),
    Spilled(Arc<NamedTempFile>),
}

impl Payload {
    /// Creates an in-memory payload directly, bypassing any store.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Payload {
            len: data.len() as u64,
            backing: Backing::Memory(data.into()),
        }
    }

    pub fn empty() -> Self {
        Payload::from_vec(Vec::new())
    }

    /// Returns the length of the payload in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        0 == self.len
    }

    /// Reads the whole payload out.
    ///
    /// Reading is repeatable; a spilled payload is reopened from the start
    /// each time, so concurrent readers do not disturb each other.
    pub fn read(&self) -> Result<Vec<u8>, Error> {
        match self.backing {
            Backing::Memory(ref data) => Ok(data.to_vec()),
            Backing::Spilled(ref file) => {
                let mut data = Vec::with_capacity(self.len as usize);
                file.reopen()?.read_to_end(&mut data)?;
                Ok(data)
            },
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backing = match self.backing {
            Backing::Memory(..) => "memory",
            Backing::Spilled(..) => "spilled",
        };
        write!(f, "Payload {{ len: {}, backing: {} }}", self.len, backing)
    }
}

/// A factory for [`Payload`] snapshots with a common spill policy.
#[derive(Clone, Debug)]
pub struct PayloadStore {
    spill_threshold: usize,
    tmp: Option<PathBuf>,
}

impl Default for PayloadStore {
    fn default() -> Self {
        PayloadStore {
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
            tmp: None,
        }
    }
}

impl PayloadStore {
    /// Creates a store with the default spill threshold, spilling to the
    /// system temporary directory.
    pub fn new() -> Self {
        PayloadStore::default()
    }

    /// Creates a store which never spills to disk.
    pub fn in_memory() -> Self {
        PayloadStore {
            spill_threshold: usize::MAX,
            tmp: None,
        }
    }

    /// Creates a store with an explicit spill threshold and, optionally, an
    /// explicit directory for spill files.
    pub fn spilling(spill_threshold: usize, tmp: Option<PathBuf>) -> Self {
        PayloadStore {
            spill_threshold,
            tmp,
        }
    }

    /// Snapshots `data` into a new payload.
    pub fn store(&self, data: &[u8]) -> Result<Payload, Error> {
        let backing = if data.len() > self.spill_threshold {
            let mut file = match self.tmp {
                Some(ref dir) => NamedTempFile::new_in(dir)?,
                None => NamedTempFile::new()?,
            };
            file.write_all(data)?;
            file.flush()?;
            Backing::Spilled(Arc::new(file))
        } else {
            Backing::Memory(data.into())
        };

        Ok(Payload {
            len: data.len() as u64,
            backing,
        })
    }

    /// Produces a new payload holding `head` followed by `tail`.
    pub fn concat(&self, head: &Payload, tail: &[u8]) -> Result<Payload, Error> {
        let mut data = head.read()?;
        data.extend_from_slice(tail);
        self.store(&data)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn small_payloads_stay_in_memory() {
        let store = PayloadStore::new();
        let payload = store.store(b"hello world").unwrap();

        assert_eq!(11, payload.len());
        assert!(!payload.is_empty());
        assert_eq!(b"hello world".to_vec(), payload.read().unwrap());
        // Reads are repeatable
        assert_eq!(b"hello world".to_vec(), payload.read().unwrap());
    }

    #[test]
    fn large_payloads_spill_and_read_back() {
        let store = PayloadStore::spilling(16, None);
        let data = vec![42u8; 1000];
        let payload = store.store(&data).unwrap();

        assert_eq!(1000, payload.len());
        assert_eq!(data, payload.read().unwrap());
        assert_eq!(data, payload.read().unwrap());
    }

    #[test]
    fn threshold_is_inclusive() {
        let store = PayloadStore::spilling(4, None);
        let at = store.store(b"abcd").unwrap();
        let over = store.store(b"abcde").unwrap();

        assert_eq!(format!("{:?}", at), "Payload { len: 4, backing: memory }");
        assert_eq!(
            format!("{:?}", over),
            "Payload { len: 5, backing: spilled }"
        );
    }

    #[test]
    fn in_memory_stores_never_spill() {
        let store = PayloadStore::in_memory();
        let data = vec![7u8; 2 * DEFAULT_SPILL_THRESHOLD];
        let payload = store.store(&data).unwrap();

        assert_eq!(
            format!(
                "Payload {{ len: {}, backing: memory }}",
                2 * DEFAULT_SPILL_THRESHOLD
            ),
            format!("{:?}", payload)
        );
        assert_eq!(data, payload.read().unwrap());
    }

    #[test]
    fn clones_share_backing() {
        let store = PayloadStore::spilling(0, None);
        let payload = store.store(b"shared").unwrap();
        let clone = payload.clone();
        drop(payload);

        assert_eq!(b"shared".to_vec(), clone.read().unwrap());
    }

    #[test]
    fn concat_appends_in_order() {
        let store = PayloadStore::new();
        let head = store.store(b"B").unwrap();
        let merged = store.concat(&head, b"A").unwrap();

        assert_eq!(b"BA".to_vec(), merged.read().unwrap());
        // The original snapshot is unaffected
        assert_eq!(b"B".to_vec(), head.read().unwrap());
    }

    #[test]
    fn concat_across_the_spill_boundary() {
        let store = PayloadStore::spilling(8, None);
        let head = store.store(b"12345678").unwrap();
        let merged = store.concat(&head, b"9").unwrap();

        assert_eq!(b"123456789".to_vec(), merged.read().unwrap());
    }

    #[test]
    fn empty_payload() {
        let payload = Payload::empty();
        assert!(payload.is_empty());
        assert_eq!(Vec::<u8>::new(), payload.read().unwrap());
    }
}
