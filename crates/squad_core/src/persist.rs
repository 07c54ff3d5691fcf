//! Squad snapshots.
//!
//! Layout: `lz4(size-prepended msgpack) || sha256(compressed)`.
//! The msgpack body uses named fields so snapshots survive field reordering.

use std::fs::{remove_file, rename, File};
use std::io::{Read, Write};
use std::path::Path;

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rmp_serde::{from_slice, to_vec_named};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::PersistError;
use crate::leader::SquadLeader;

pub const SNAPSHOT_VERSION: u32 = 1;

const CHECKSUM_LEN: usize = 32;

/// Complete coordinator state: roster with its action arena, beacon,
/// active tactic and clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadSnapshot {
    pub version: u32,
    pub leader: SquadLeader,
}

impl SquadSnapshot {
    pub fn new(leader: SquadLeader) -> Self {
        Self { version: SNAPSHOT_VERSION, leader }
    }

    pub fn into_leader(self) -> SquadLeader {
        self.leader
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        let msgpack = to_vec_named(self)?;
        let mut bytes = compress_prepend_size(&msgpack);
        let checksum = Sha256::digest(&bytes);
        bytes.extend_from_slice(&checksum);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        // lz4 size prefix + checksum
        if bytes.len() < 4 + CHECKSUM_LEN {
            return Err(PersistError::Corrupted);
        }

        let (payload, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if Sha256::digest(payload)[..] != *checksum {
            return Err(PersistError::ChecksumMismatch);
        }

        let msgpack = decompress_size_prepended(payload).map_err(|_| PersistError::Decompression)?;
        let snapshot: Self = from_slice(&msgpack)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistError::VersionMismatch {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }

    /// Writes to a temp file first, then renames it over `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let temp_path = path.with_extension("tmp");

        let written = File::create(&temp_path).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = remove_file(&temp_path);
            return Err(e.into());
        }

        rename(&temp_path, path)?;
        log::debug!("snapshot written to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let mut bytes = Vec::new();
        File::open(path.as_ref())?.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Pretty JSON for inspection. Not read back.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
