//! Mock translation provider for testing
//!
//! This module provides a deterministic, network-free provider for exercising the
//! orchestration pipeline without an engine or API key. Every dispatch is recorded,
//! so tests can assert exactly which chunks went out and in which order.
//!
//! # Example
//!
//! ```ignore
//! use banana_i18n_sync::sync::{ChunkRequest, MockMode, MockProvider, TranslationProvider};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockProvider::new(MockMode::Suffix);
//!     let translated = mock.translate_chunk(&ChunkRequest::new("en", "fr", "app", &entries)).await?;
//!     assert_eq!(translated.get("greeting"), Some("Hello {variable:0}_fr"));
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::Payload;
use crate::sync::cancel::CancellationToken;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::provider::{ChunkRequest, Identity, TranslationProvider};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{variable:\d+\}").expect("token pattern is valid"));

/// Failure a mock dispatch can simulate
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Behaves like an HTTP 401
    Unauthorized(String),
    /// Behaves like an HTTP 400 for the requested target locale
    UnsupportedLocale(String),
    /// Behaves like a dropped connection
    Transport(String),
}

impl MockFailure {
    fn to_error(&self, target_locale: &str) -> SyncError {
        match self {
            MockFailure::Unauthorized(msg) => SyncError::Authorization(msg.clone()),
            MockFailure::UnsupportedLocale(msg) => SyncError::UnsupportedLocale {
                locale: target_locale.to_string(),
                message: msg.clone(),
            },
            MockFailure::Transport(msg) => SyncError::Transport(msg.clone()),
        }
    }
}

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append locale suffix: "hello" → "hello_fr"
    /// Neutral tokens are left intact
    Suffix,

    /// Use predefined mappings for realistic translations
    /// (neutral text, target_locale) → translation, falling back to `Suffix`
    Mappings(HashMap<(String, String), String>),

    /// Reverse the order of neutral tokens in each value, the way a translation
    /// into a language with different word order moves variables around
    ReverseTokens,

    /// Fail every dispatch
    Fail(MockFailure),

    /// No-op: return input unchanged
    NoOp,
}

/// One recorded `translate_chunk` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub source_locale: String,
    pub target_locale: String,
    pub file_key: String,
    pub keys: Vec<String>,
}

/// Mock provider that simulates various translation scenarios
#[derive(Debug, Clone)]
pub struct MockProvider {
    mode: MockMode,
    /// Optional simulated network delay (in milliseconds)
    delay_ms: u64,
    /// Per-target-locale failures, checked before `mode`
    locale_failures: HashMap<String, MockFailure>,
    /// Keys left out of every response
    omitted_keys: Vec<String>,
    /// Cancel this token when the n-th dispatch (1-based) starts
    cancel_on_dispatch: Option<(usize, CancellationToken)>,
    recognized_locale: String,
    dispatches: Arc<Mutex<Vec<DispatchRecord>>>,
}

impl MockProvider {
    /// Create a new MockProvider with the given mode
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay_ms: 0,
            locale_failures: HashMap::new(),
            omitted_keys: Vec::new(),
            cancel_on_dispatch: None,
            recognized_locale: "en".to_string(),
            dispatches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a simulated delay to every dispatch
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Fail every dispatch targeting `locale`
    pub fn failing_for(mut self, locale: &str, failure: MockFailure) -> Self {
        self.locale_failures.insert(locale.to_string(), failure);
        self
    }

    /// Leave `key` out of every response
    pub fn omitting(mut self, key: &str) -> Self {
        self.omitted_keys.push(key.to_string());
        self
    }

    /// Cancel `token` as soon as dispatch number `n` (1-based) begins
    ///
    /// ```ignore
    /// let cancel = CancellationToken::new();
    /// let mock = MockProvider::new(MockMode::Suffix).cancelling_on_dispatch(1, cancel.clone());
    /// // the first chunk goes out, cancellation lands while it is in flight
    /// ```
    pub fn cancelling_on_dispatch(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_on_dispatch = Some((n, token));
        self
    }

    /// Locale returned by `recognize_locale`
    pub fn recognizing(mut self, locale: &str) -> Self {
        self.recognized_locale = locale.to_string();
        self
    }

    /// Every dispatch so far, in the order they started
    pub fn dispatches(&self) -> Vec<DispatchRecord> {
        self.dispatches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Internal helper to apply the simulated delay
    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn record(&self, request: &ChunkRequest<'_>) -> usize {
        let mut log = self
            .dispatches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        log.push(DispatchRecord {
            source_locale: request.source_locale.to_string(),
            target_locale: request.target_locale.to_string(),
            file_key: request.file_key.to_string(),
            keys: request.entries.keys().map(str::to_string).collect(),
        });
        log.len()
    }

    /// Apply translation logic based on the mode
    fn apply_translation(&self, text: &str, target: &str) -> SyncResult<String> {
        match &self.mode {
            MockMode::Suffix => Ok(format!("{}_{}", text, target)),
            MockMode::Mappings(map) => {
                let key = (text.to_string(), target.to_string());
                Ok(map
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| format!("{}_{}", text, target)))
            }
            MockMode::ReverseTokens => Ok(reverse_tokens(text)),
            MockMode::Fail(failure) => Err(failure.to_error(target)),
            MockMode::NoOp => Ok(text.to_string()),
        }
    }
}

/// Swap neutral tokens end-for-end, leaving the surrounding text in place
fn reverse_tokens(text: &str) -> String {
    let matches: Vec<_> = TOKEN.find_iter(text).collect();
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;

    for (m, replacement) in matches.iter().zip(matches.iter().rev()) {
        result.push_str(&text[cursor..m.start()]);
        result.push_str(replacement.as_str());
        cursor = m.end();
    }
    result.push_str(&text[cursor..]);
    result
}

#[async_trait]
impl TranslationProvider for MockProvider {
    async fn translate_chunk(&self, request: &ChunkRequest<'_>) -> SyncResult<Payload> {
        let dispatch_number = self.record(request);
        if let Some((n, token)) = &self.cancel_on_dispatch {
            if dispatch_number >= *n {
                token.cancel();
            }
        }

        // Apply simulated delay (per chunk, not per entry)
        self.apply_delay().await;

        if let Some(failure) = self.locale_failures.get(request.target_locale) {
            return Err(failure.to_error(request.target_locale));
        }

        let mut translated = Payload::new();
        for (key, text) in request.entries.iter() {
            if self.omitted_keys.iter().any(|omitted| omitted == key) {
                continue;
            }
            let value = self.apply_translation(text, request.target_locale)?;
            translated.insert(key.to_string(), value);
        }
        Ok(translated)
    }

    async fn recognize_locale(
        &self,
        _text: &str,
        cancel: &CancellationToken,
    ) -> SyncResult<String> {
        cancel.check()?;
        Ok(self.recognized_locale.clone())
    }

    async fn whoami(&self, cancel: &CancellationToken) -> SyncResult<Option<Identity>> {
        cancel.check()?;
        Ok(Some(Identity {
            email: "mock@localhost".to_string(),
            id: "mock".to_string(),
        }))
    }

    fn provider_name(&self) -> &str {
        "Mock Provider"
    }
}
