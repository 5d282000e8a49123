//! Size-bounded chunking of neutral payloads
//!
//! A chunk is what goes out in one provider call. Planning walks keys in insertion
//! order and closes the current chunk when the next entry would push it over the
//! byte budget or the entry cap. An entry that alone exceeds the budget gets a chunk
//! of its own; entries are never split or dropped.

use serde::Deserialize;

use crate::Payload;
use crate::sync::error::{SyncError, SyncResult};

/// Limits applied to every planned chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChunkPolicy {
    /// Serialized-size budget of a chunk, in bytes
    pub max_bytes: usize,
    /// Maximum number of entries in a chunk
    pub max_entries: usize,
}

impl ChunkPolicy {
    pub const DEFAULT_MAX_BYTES: usize = 4096;
    pub const DEFAULT_MAX_ENTRIES: usize = 250;

    pub fn new(max_bytes: usize, max_entries: usize) -> Self {
        ChunkPolicy {
            max_bytes,
            max_entries,
        }
    }

    /// Policy with only a byte budget
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        ChunkPolicy {
            max_bytes,
            max_entries: usize::MAX,
        }
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.max_bytes == 0 {
            return Err(SyncError::Configuration(
                "chunking.max_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_entries == 0 {
            return Err(SyncError::Configuration(
                "chunking.max_entries must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        ChunkPolicy::new(Self::DEFAULT_MAX_BYTES, Self::DEFAULT_MAX_ENTRIES)
    }
}

/// Serialized size of one `"key":"value",` member of a JSON object
pub fn entry_size(key: &str, value: &str) -> usize {
    json_string_len(key) + json_string_len(value) + 2
}

fn json_string_len(text: &str) -> usize {
    serde_json::to_string(text)
        .map(|encoded| encoded.len())
        .unwrap_or(text.len() + 2)
}

/// Split `payload` into ordered chunks within `policy`.
///
/// Deterministic: the same payload and policy always give the same boundaries.
pub fn plan_chunks(payload: &Payload, policy: &ChunkPolicy) -> Vec<Payload> {
    let mut chunks = Vec::new();
    let mut current = Payload::new();
    // `{}` around the members
    let mut current_size = 2;

    for (key, value) in payload.iter() {
        let size = entry_size(key, value);
        let over_budget = current_size + size > policy.max_bytes;
        let over_count = current.len() >= policy.max_entries;

        if !current.is_empty() && (over_budget || over_count) {
            chunks.push(std::mem::take(&mut current));
            current_size = 2;
        }

        current.insert(key.to_string(), value.to_string());
        current_size += size;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Serialized size of a whole chunk under the same estimate `plan_chunks` uses
pub fn chunk_size(chunk: &Payload) -> usize {
    2 + chunk
        .iter()
        .map(|(key, value)| entry_size(key, value))
        .sum::<usize>()
}
