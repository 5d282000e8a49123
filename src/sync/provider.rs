//! Translation provider trait and utilities
//!
//! This module defines the `TranslationProvider` trait for provider abstraction,
//! so the orchestrator can drive the HTTP engine, the mock, or anything else that
//! accepts a neutral chunk and answers with translated neutral entries.
//!
//! # Example
//!
//! ```ignore
//! use banana_i18n_sync::sync::{CancellationToken, ChunkRequest, HttpProvider, TranslationProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = HttpProvider::from_env()?;
//!     let mut entries = banana_i18n_sync::Payload::new();
//!     entries.with_entry("greeting", "Hello, {variable:0}!");
//!
//!     let request = ChunkRequest::new("en", "fr", "messages.json", &entries);
//!     let translated = provider.translate_chunk(&request).await?;
//!     println!("{:?}", translated.get("greeting"));
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Payload;
use crate::sync::cancel::CancellationToken;
use crate::sync::error::{SyncError, SyncResult};

/// One network call's worth of work: a single chunk for a single target locale
#[derive(Debug, Clone, Copy)]
pub struct ChunkRequest<'a> {
    pub source_locale: &'a str,
    pub target_locale: &'a str,
    /// Identifies the file the entries belong to on the wire
    pub file_key: &'a str,
    /// Neutral-form entries of the chunk
    pub entries: &'a Payload,
    /// Run-wide cancellation signal, checked by providers before sending
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> ChunkRequest<'a> {
    pub fn new(
        source_locale: &'a str,
        target_locale: &'a str,
        file_key: &'a str,
        entries: &'a Payload,
    ) -> Self {
        ChunkRequest {
            source_locale,
            target_locale,
            file_key,
            entries,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// `Err(SyncError::Aborted)` if the attached token has been cancelled
    pub fn check_cancelled(&self) -> SyncResult<()> {
        match self.cancel {
            Some(cancel) => cancel.check(),
            None => Ok(()),
        }
    }
}

/// Account the provider's credentials belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub id: String,
}

/// Generic trait for translation providers
///
/// All methods are async to support I/O-bound operations like network requests.
/// Implementations never retry; that is left to whoever wraps them.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate one chunk of neutral entries
    ///
    /// # Returns
    ///
    /// * `Ok(Payload)` - Translated neutral text keyed like the request entries
    /// * `Err(SyncError)` - Authorization, unsupported locale, transport or
    ///   malformed-response failures
    async fn translate_chunk(&self, request: &ChunkRequest<'_>) -> SyncResult<Payload>;

    /// Guess the locale of a piece of text
    async fn recognize_locale(&self, text: &str, cancel: &CancellationToken)
    -> SyncResult<String>;

    /// Who the credentials belong to, or `None` when the provider does not know them
    async fn whoami(&self, cancel: &CancellationToken) -> SyncResult<Option<Identity>>;

    /// Get the name of this translation provider
    ///
    /// Used for logging to identify which provider handled a chunk.
    fn provider_name(&self) -> &str;
}

/// Validate that a locale code can be sent to a provider
///
/// Locale tags are opaque: BCP 47 (`pt-BR`), POSIX (`sr@latin`, `en_US.UTF-8`) and
/// anything else the engine understands pass through. Only empty tags and tags with
/// whitespace or control characters are rejected.
///
/// ```ignore
/// validate_locale("en")?; // OK
/// validate_locale("sr@latin")?; // OK
/// validate_locale("en US").unwrap_err(); // Error
/// ```
pub fn validate_locale(locale: &str) -> SyncResult<()> {
    if locale.is_empty() {
        return Err(SyncError::InvalidLocale("Locale code is empty".to_string()));
    }

    if locale
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(SyncError::InvalidLocale(format!(
            "Invalid characters in locale code: {:?}",
            locale
        )));
    }

    Ok(())
}
