//! Variable normalization for translation payloads
//!
//! Before text crosses the translation boundary every native variable is replaced by
//! a neutral, position-indexed token. After translation the tokens are turned back
//! into the exact native text captured for that locale and key.
//!
//! # Example: reordered variables
//!
//! ```ignore
//! Source (en):   "You have %2$d new items and %1$s."
//! Neutral:       "You have {variable:0} new items and {variable:1}."
//! Order (en):    ["%2$d", "%1$s"]
//! Translated:    "{variable:1}: {variable:0} neue Elemente."
//! Restored (de): "%1$s: %2$d neue Elemente."
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::Payload;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::grammar::{Fragment, VariableGrammar};
use crate::sync::order_table::OrderTableStore;

static NEUTRAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{variable:(\d+)\}").expect("neutral token pattern is valid"));

/// Neutral token for the fragment at `index`
pub fn neutral_token(index: usize) -> String {
    format!("{{variable:{}}}", index)
}

/// Outcome of extracting a single string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// The string with every fragment replaced by its neutral token
    pub text: String,
    /// Captured fragments; index i corresponds to `{variable:i}`
    pub fragments: Vec<Fragment>,
}

/// Rewrites native variables to neutral tokens and back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableNormalizer {
    grammar: VariableGrammar,
}

impl VariableNormalizer {
    pub fn new(grammar: VariableGrammar) -> Self {
        VariableNormalizer { grammar }
    }

    /// Build a normalizer from a configuration identifier such as `"printf"`.
    ///
    /// Fails with [`SyncError::Configuration`] before any text is processed when the
    /// identifier is unknown.
    pub fn from_identifier(identifier: &str) -> SyncResult<Self> {
        Ok(Self::new(identifier.parse()?))
    }

    pub fn grammar(&self) -> VariableGrammar {
        self.grammar
    }

    /// Replace every fragment of `text` with its neutral token, scanning left to right
    pub fn extract(&self, text: &str) -> Extraction {
        let fragments = self.grammar.find_fragments(text);
        let mut neutral = String::with_capacity(text.len());
        let mut cursor = 0;

        for (index, fragment) in fragments.iter().enumerate() {
            neutral.push_str(&text[cursor..fragment.offset]);
            neutral.push_str(&neutral_token(index));
            cursor = fragment.offset + fragment.raw.len();
        }
        neutral.push_str(&text[cursor..]);

        Extraction {
            text: neutral,
            fragments,
        }
    }

    /// Extract `text` and record its fragments for (locale, key). Returns the neutral text.
    pub fn extract_into(
        &self,
        store: &mut OrderTableStore,
        locale: &str,
        key: &str,
        text: &str,
    ) -> String {
        let Extraction { text, fragments } = self.extract(text);
        store.record(locale, key, fragments);
        text
    }

    /// Extract every entry of `payload` for `locale`
    pub fn extract_payload(
        &self,
        store: &mut OrderTableStore,
        locale: &str,
        payload: &Payload,
    ) -> Payload {
        payload
            .iter()
            .map(|(key, text)| {
                let neutral = self.extract_into(store, locale, key, text);
                (key.to_string(), neutral)
            })
            .collect()
    }

    /// Turn neutral tokens in `neutral` back into native fragments.
    ///
    /// Tokens are resolved by index, wherever they sit in the translated text, using
    /// the (locale, key) table or the default locale's table when the locale has none.
    pub fn restore(
        &self,
        store: &OrderTableStore,
        locale: &str,
        key: &str,
        neutral: &str,
    ) -> SyncResult<String> {
        let fragments =
            store
                .resolve(locale, key)
                .ok_or_else(|| SyncError::MissingOrderTable {
                    locale: locale.to_string(),
                    key: key.to_string(),
                })?;

        let mut restored = String::with_capacity(neutral.len());
        let mut cursor = 0;

        for captures in NEUTRAL_TOKEN.captures_iter(neutral) {
            let (Some(token), Some(digits)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let fragment = digits
                .as_str()
                .parse::<usize>()
                .ok()
                .and_then(|index| fragments.get(index))
                .ok_or_else(|| SyncError::Normalization {
                    key: key.to_string(),
                    message: format!(
                        "token {} has no captured fragment ({} recorded)",
                        token.as_str(),
                        fragments.len()
                    ),
                })?;

            restored.push_str(&neutral[cursor..token.start()]);
            restored.push_str(&fragment.raw);
            cursor = token.end();
        }
        restored.push_str(&neutral[cursor..]);

        Ok(restored)
    }

    /// Restore every entry of a translated neutral payload for `locale`
    pub fn restore_payload(
        &self,
        store: &OrderTableStore,
        locale: &str,
        payload: &Payload,
    ) -> SyncResult<Payload> {
        payload
            .iter()
            .map(|(key, neutral)| {
                self.restore(store, locale, key, neutral)
                    .map(|native| (key.to_string(), native))
            })
            .collect()
    }
}
