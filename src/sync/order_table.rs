//! Per-run store of captured placeholder order
//!
//! For every (locale, key) the store keeps the fragments found at extraction time,
//! in appearance order. Index `i` of that sequence is what `{variable:i}` stands for
//! in the neutral text of that locale and key.
//!
//! The store is owned by the caller and lives for exactly one synchronization run;
//! two runs in the same process never share one.

use std::collections::HashMap;

use crate::sync::grammar::Fragment;

#[derive(Debug, Clone, Default)]
pub struct OrderTableStore {
    default_locale: String,
    // locale -> key -> fragments
    tables: HashMap<String, HashMap<String, Vec<Fragment>>>,
}

impl OrderTableStore {
    /// Create an empty store whose fallback tables come from `default_locale`
    pub fn new(default_locale: &str) -> Self {
        OrderTableStore {
            default_locale: default_locale.to_string(),
            tables: HashMap::new(),
        }
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Record the fragments captured for (locale, key).
    ///
    /// A key is extracted once per locale in a pass, so this replaces any earlier record.
    pub fn record(&mut self, locale: &str, key: &str, fragments: Vec<Fragment>) {
        self.tables
            .entry(locale.to_string())
            .or_default()
            .insert(key.to_string(), fragments);
    }

    /// Fragments recorded for exactly (locale, key)
    pub fn get(&self, locale: &str, key: &str) -> Option<&[Fragment]> {
        self.tables
            .get(locale)
            .and_then(|keys| keys.get(key))
            .map(Vec::as_slice)
    }

    /// Fragments for (locale, key), falling back to the default locale's table
    pub fn resolve(&self, locale: &str, key: &str) -> Option<&[Fragment]> {
        self.get(locale, key)
            .or_else(|| self.get(&self.default_locale, key))
    }

    pub fn contains(&self, locale: &str, key: &str) -> bool {
        self.get(locale, key).is_some()
    }

    /// Locales that have at least one recorded key
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(HashMap::is_empty)
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments(raws: &[&str]) -> Vec<Fragment> {
        raws.iter()
            .enumerate()
            .map(|(i, raw)| Fragment::new(*raw, i * 10))
            .collect()
    }

    #[test]
    fn test_record_and_get() {
        let mut store = OrderTableStore::new("en");
        store.record("en", "greeting", fragments(&["%s"]));

        assert_eq!(store.get("en", "greeting").unwrap()[0].raw, "%s");
        assert!(store.get("en", "other").is_none());
        assert!(store.get("de", "greeting").is_none());
    }

    #[test]
    fn test_resolve_falls_back_to_default_locale() {
        let mut store = OrderTableStore::new("en");
        store.record("en", "stats", fragments(&["%d", "%f"]));

        let resolved = store.resolve("de", "stats").unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].raw, "%d");
    }

    #[test]
    fn test_resolve_prefers_locale_table() {
        let mut store = OrderTableStore::new("en");
        store.record("en", "stats", fragments(&["%d", "%f"]));
        store.record("de", "stats", fragments(&["%f", "%d"]));

        assert_eq!(store.resolve("de", "stats").unwrap()[0].raw, "%f");
        assert_eq!(store.resolve("fr", "stats").unwrap()[0].raw, "%d");
    }

    #[test]
    fn test_resolve_missing_everywhere() {
        let store = OrderTableStore::new("en");
        assert!(store.resolve("de", "unknown").is_none());
    }

    #[test]
    fn test_empty_record_is_still_a_record() {
        let mut store = OrderTableStore::new("en");
        store.record("en", "plain", Vec::new());

        assert!(store.contains("en", "plain"));
        assert_eq!(store.resolve("de", "plain").unwrap().len(), 0);
    }

    #[test]
    fn test_clear_resets_store() {
        let mut store = OrderTableStore::new("en");
        store.record("en", "a", fragments(&["%s"]));
        assert!(!store.is_empty());

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.default_locale(), "en");
        assert_eq!(store.locales().count(), 0);
    }
}
