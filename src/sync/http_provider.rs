//! HTTP localization engine provider
//!
//! Talks to a localization engine over its JSON API:
//!
//! - `POST /i18n`: translate the entries of one file from a source to a target locale
//! - `POST /recognize`: guess the locale of a piece of text
//! - `POST /whoami`: identify the account behind the API key
//!
//! # Authentication
//!
//! Every request carries `Authorization: Bearer <key>`. The key must start with one
//! of the recognized prefixes (`api_` by default); anything else is rejected when the
//! provider is built, before any request is sent. `from_env` reads the key from
//! `BANANA_SYNC_API_KEY` and the engine URL from `BANANA_SYNC_API_URL`.
//!
//! # Example
//!
//! ```ignore
//! use banana_i18n_sync::sync::{ChunkRequest, HttpProvider, TranslationProvider};
//!
//! let provider = HttpProvider::new("https://engine.internal", "api_123".to_string())?;
//! let translated = provider
//!     .translate_chunk(&ChunkRequest::new("en", "de", "app.json", &entries))
//!     .await?;
//! ```

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Payload;
use crate::config::ApiConfig;
use crate::sync::cancel::CancellationToken;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::provider::{ChunkRequest, Identity, TranslationProvider, validate_locale};

#[derive(Serialize)]
struct LocalizeRequest<'a> {
    locale: LocalePair<'a>,
    data: LocalizeRequestData<'a>,
}

#[derive(Serialize)]
struct LocalePair<'a> {
    source: &'a str,
    target: &'a str,
}

#[derive(Serialize)]
struct LocalizeRequestData<'a> {
    version: &'a str,
    files: BTreeMap<&'a str, FileEntriesRef<'a>>,
}

#[derive(Serialize)]
struct FileEntriesRef<'a> {
    entries: &'a Payload,
}

#[derive(Deserialize)]
struct LocalizeResponse {
    data: LocalizeResponseData,
}

#[derive(Deserialize)]
struct LocalizeResponseData {
    #[serde(default)]
    locale: Option<String>,
    files: HashMap<String, FileEntries>,
}

#[derive(Deserialize)]
struct FileEntries {
    entries: Payload,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    locale: String,
}

/// Localization engine provider speaking the `/i18n` JSON contract
#[derive(Clone)]
pub struct HttpProvider {
    /// Bearer token for authentication
    api_key: String,
    /// HTTP client for async requests
    client: reqwest::Client,
    /// Engine base URL without trailing slash
    base_url: String,
}

impl HttpProvider {
    /// Key prefixes accepted when none are configured
    pub const DEFAULT_TOKEN_PREFIXES: &'static [&'static str] = &["api_"];

    /// `data.version` sent with every `/i18n` request
    pub const WIRE_VERSION: &'static str = "1";

    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a provider with the default key prefixes and timeout
    pub fn new(base_url: &str, api_key: String) -> SyncResult<Self> {
        Self::with_options(
            base_url,
            api_key,
            Self::DEFAULT_TOKEN_PREFIXES,
            Self::DEFAULT_TIMEOUT,
        )
    }

    /// Create a provider with explicit key prefixes and request timeout
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - New provider instance
    /// * `Err(SyncError::Configuration)` - Empty URL, empty key, or a key without a
    ///   recognized prefix
    pub fn with_options<S: AsRef<str>>(
        base_url: &str,
        api_key: String,
        token_prefixes: &[S],
        timeout: Duration,
    ) -> SyncResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SyncError::Configuration(
                "API URL cannot be empty".to_string(),
            ));
        }

        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(SyncError::Configuration(
                "API key cannot be empty".to_string(),
            ));
        }
        if !token_prefixes
            .iter()
            .any(|prefix| api_key.starts_with(prefix.as_ref()))
        {
            let expected: Vec<&str> = token_prefixes.iter().map(|p| p.as_ref()).collect();
            return Err(SyncError::Configuration(format!(
                "API key must start with one of: {}",
                expected.join(", ")
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                SyncError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key,
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Build a provider from the `[api]` section of the configuration
    pub fn from_config(config: &ApiConfig) -> SyncResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| SyncError::Configuration("api.url is not set".to_string()))?;
        let key = config
            .key
            .clone()
            .ok_or_else(|| SyncError::Configuration("api.key is not set".to_string()))?;

        Self::with_options(
            url,
            key,
            &config.token_prefixes,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Create a provider from `BANANA_SYNC_API_URL` and `BANANA_SYNC_API_KEY`
    pub fn from_env() -> SyncResult<Self> {
        let mut config = ApiConfig::default();
        config.apply_env(|name| std::env::var(name).ok());
        Self::from_config(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Map a non-200 response onto the error taxonomy
    async fn error_from_response(response: reqwest::Response, target_locale: &str) -> SyncError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);

        match status {
            StatusCode::UNAUTHORIZED => SyncError::Authorization(message),
            StatusCode::BAD_REQUEST => SyncError::UnsupportedLocale {
                locale: target_locale.to_string(),
                message,
            },
            other => SyncError::Provider {
                status: other.as_u16(),
                message,
            },
        }
    }
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TranslationProvider for HttpProvider {
    async fn translate_chunk(&self, request: &ChunkRequest<'_>) -> SyncResult<Payload> {
        validate_locale(request.source_locale)?;
        validate_locale(request.target_locale)?;

        if request.entries.is_empty() {
            return Ok(Payload::new());
        }
        request.check_cancelled()?;

        let body = LocalizeRequest {
            locale: LocalePair {
                source: request.source_locale,
                target: request.target_locale,
            },
            data: LocalizeRequestData {
                version: Self::WIRE_VERSION,
                files: BTreeMap::from([(
                    request.file_key,
                    FileEntriesRef {
                        entries: request.entries,
                    },
                )]),
            },
        };

        debug!(
            target_locale = request.target_locale,
            file_key = request.file_key,
            entries = request.entries.len(),
            "Dispatching chunk"
        );

        let response = self
            .client
            .post(self.endpoint("i18n"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::error_from_response(response, request.target_locale).await);
        }

        let text = response.text().await?;
        let parsed: LocalizeResponse = serde_json::from_str(&text).map_err(|e| {
            SyncError::MalformedResponse(format!("Failed to parse /i18n response: {}", e))
        })?;

        if let Some(locale) = parsed.data.locale.as_deref() {
            if locale != request.target_locale {
                debug!(
                    requested = request.target_locale,
                    answered = locale,
                    "Provider answered with a different locale tag"
                );
            }
        }

        let mut files = parsed.data.files;
        files
            .remove(request.file_key)
            .map(|file| file.entries)
            .ok_or_else(|| {
                SyncError::MalformedResponse(format!(
                    "Response has no entries for file '{}'",
                    request.file_key
                ))
            })
    }

    async fn recognize_locale(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> SyncResult<String> {
        cancel.check()?;

        let response = self
            .client
            .post(self.endpoint("recognize"))
            .bearer_auth(&self.api_key)
            .json(&RecognizeRequest { text })
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::error_from_response(response, "").await);
        }

        let body: RecognizeResponse = response.json().await?;
        Ok(body.locale)
    }

    async fn whoami(&self, cancel: &CancellationToken) -> SyncResult<Option<Identity>> {
        cancel.check()?;

        let response = self
            .client
            .post(self.endpoint("whoami"))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Ok(None);
        }

        let identity: Identity = response.json().await?;
        Ok(Some(identity))
    }

    fn provider_name(&self) -> &str {
        "HTTP localization engine"
    }
}
