//! Previously synchronized state
//!
//! The lock record remembers, per (locale, key), the checksum of the source text that
//! was translated, the translation that came back, and the native fragment order of
//! that translation. A later run uses it to skip keys whose source did not change.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Payload;
use crate::sync::error::SyncResult;
use crate::sync::grammar::Fragment;
use crate::sync::normalizer::VariableNormalizer;

/// BLAKE3 hex digest of a source string
pub fn checksum(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Read access to previously synchronized state
pub trait StateAccessor: Send + Sync {
    /// Native fragment order of the stored translation for (locale, key)
    fn previous_order_table(&self, locale: &str, key: &str) -> Option<Vec<Fragment>>;

    /// Stored translation for (locale, key)
    fn previous_translation(&self, locale: &str, key: &str) -> Option<String>;

    /// Checksum of the source text the stored translation was made from
    fn previous_checksum(&self, locale: &str, key: &str) -> Option<String>;
}

type LocaleMap<T> = BTreeMap<String, BTreeMap<String, T>>;

/// JSON lock file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockRecord {
    pub version: u32,
    pub checksums: LocaleMap<String>,
    pub translations: LocaleMap<String>,
    pub order_tables: LocaleMap<Vec<Fragment>>,
}

impl LockRecord {
    pub const VERSION: u32 = 1;

    pub fn new() -> Self {
        LockRecord {
            version: Self::VERSION,
            ..LockRecord::default()
        }
    }

    pub fn from_json_str(source: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load a lock file; a missing file is an empty record
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(source) => Self::from_json_str(&source),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SyncResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Fold a finished locale into the record.
    ///
    /// Every key of `translated` gets the checksum of its source text, the
    /// translation itself, and the fragments `normalizer` finds in the translation.
    pub fn record_run(
        &mut self,
        normalizer: &VariableNormalizer,
        source: &Payload,
        locale: &str,
        translated: &Payload,
    ) {
        for (key, text) in translated.iter() {
            let Some(source_text) = source.get(key) else {
                continue;
            };
            self.checksums
                .entry(locale.to_string())
                .or_default()
                .insert(key.to_string(), checksum(source_text));
            self.translations
                .entry(locale.to_string())
                .or_default()
                .insert(key.to_string(), text.to_string());
            self.order_tables
                .entry(locale.to_string())
                .or_default()
                .insert(key.to_string(), normalizer.extract(text).fragments);
        }
    }

    fn lookup<'a, T>(map: &'a LocaleMap<T>, locale: &str, key: &str) -> Option<&'a T> {
        map.get(locale).and_then(|keys| keys.get(key))
    }
}

impl StateAccessor for LockRecord {
    fn previous_order_table(&self, locale: &str, key: &str) -> Option<Vec<Fragment>> {
        Self::lookup(&self.order_tables, locale, key).cloned()
    }

    fn previous_translation(&self, locale: &str, key: &str) -> Option<String> {
        Self::lookup(&self.translations, locale, key).cloned()
    }

    fn previous_checksum(&self, locale: &str, key: &str) -> Option<String> {
        Self::lookup(&self.checksums, locale, key).cloned()
    }
}
