use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod config;
pub mod sync;

pub use config::SyncConfig;
pub use sync::{
    CancellationToken, ChunkPolicy, HttpProvider, LockRecord, MockMode, MockProvider,
    OrderTableStore, Orchestrator, StateAccessor, SyncError, SyncJob, SyncReport, SyncResult,
    TranslationProvider, VariableGrammar, VariableNormalizer,
};

/// Flat key -> text payload produced by a file adapter.
///
/// Keys are unique and insertion order is significant: it is the order chunks are
/// planned in and the order the merged result is handed back in.
///
/// ```ignore
/// let mut payload = Payload::new();
/// payload
///     .with_entry("greeting", "Hello, %s!")
///     .with_entry("inbox.count", "You have %d new messages");
/// assert_eq!(payload.keys().collect::<Vec<_>>(), vec!["greeting", "inbox.count"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    entries: Vec<(String, String)>,
    // key -> position in `entries`
    index: HashMap<String, usize>,
}

impl Payload {
    pub fn new() -> Self {
        Payload::default()
    }

    pub fn with_entry(&mut self, key: &str, value: &str) -> &mut Self {
        self.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Insert an entry. An existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: String, value: String) -> Option<String> {
        match self.index.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every entry of `other`, replacing values of keys already present.
    pub fn extend(&mut self, other: Payload) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }
}

impl FromIterator<(String, String)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for (key, value) in iter {
            payload.insert(key, value);
        }
        payload
    }
}

impl IntoIterator for Payload {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = Payload;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a flat object of string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Payload, A::Error> {
        let mut payload = Payload::new();
        while let Some((key, value)) = access.next_entry::<String, String>()? {
            payload.insert(key, value);
        }
        Ok(payload)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Payload, D::Error> {
        deserializer.deserialize_map(PayloadVisitor)
    }
}
