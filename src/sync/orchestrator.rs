//! Translation orchestration
//!
//! One `run` synchronizes a source payload into a set of target locales:
//!
//! 1. Extract the source (and any existing target payloads) into neutral form,
//!    capturing placeholder order per (locale, key) in a store owned by the run
//! 2. For every target locale, skip keys the lock record says are up to date,
//!    plan the rest into chunks and dispatch them one after another
//! 3. Merge the chunk responses and restore native placeholders with that
//!    locale's order table
//!
//! Locales are independent units of work, processed up to `concurrency` at a time.
//! A failure in one locale never touches the results of another, and a key whose
//! placeholders cannot be restored is dropped from its locale without touching the
//! other keys. Cancellation is
//! global to the run and is observed before each locale starts, before every chunk
//! dispatch and when a response comes back.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tracing::{debug, info, warn};

use crate::Payload;
use crate::config::SyncConfig;
use crate::sync::cancel::CancellationToken;
use crate::sync::chunk::{ChunkPolicy, plan_chunks};
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::grammar::{Fragment, same_variables};
use crate::sync::normalizer::VariableNormalizer;
use crate::sync::order_table::OrderTableStore;
use crate::sync::provider::{ChunkRequest, TranslationProvider, validate_locale};
use crate::sync::state::{StateAccessor, checksum};

/// Everything one synchronization run needs to know about its input
#[derive(Debug, Clone)]
pub struct SyncJob {
    /// Wire identifier of the file the payload came from
    pub file_key: String,
    pub source_locale: String,
    /// Native source payload as produced by the file adapter
    pub source: Payload,
    pub target_locales: Vec<String>,
    /// Current native content of target files, used for their own placeholder order
    pub existing_targets: HashMap<String, Payload>,
}

impl SyncJob {
    pub fn new(file_key: &str, source_locale: &str, source: Payload) -> Self {
        SyncJob {
            file_key: file_key.to_string(),
            source_locale: source_locale.to_string(),
            source,
            target_locales: Vec::new(),
            existing_targets: HashMap::new(),
        }
    }

    pub fn with_target(mut self, locale: &str) -> Self {
        self.target_locales.push(locale.to_string());
        self
    }

    pub fn with_targets<I, S>(mut self, locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_locales.extend(locales.into_iter().map(Into::into));
        self
    }

    pub fn with_existing_target(mut self, locale: &str, payload: Payload) -> Self {
        self.existing_targets.insert(locale.to_string(), payload);
        self
    }
}

/// Result of one target locale
#[derive(Debug)]
pub struct LocaleOutcome {
    pub locale: String,
    /// Native translated payload in source key order, or the error that stopped the locale
    pub result: SyncResult<Payload>,
    /// Chunks that got a response from the provider
    pub dispatched_chunks: usize,
    /// Keys taken from the lock record instead of the provider
    pub reused_keys: usize,
    /// Keys left out of `result` because their translation could not be restored
    pub key_errors: Vec<(String, SyncError)>,
}

/// Per-locale outcomes of a finished run, in target order
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<LocaleOutcome>,
}

impl SyncReport {
    pub fn get(&self, locale: &str) -> Option<&LocaleOutcome> {
        self.outcomes.iter().find(|outcome| outcome.locale == locale)
    }

    /// Successful locales and their payloads
    pub fn translations(&self) -> impl Iterator<Item = (&str, &Payload)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.result {
            Ok(payload) => Some((outcome.locale.as_str(), payload)),
            Err(_) => None,
        })
    }

    /// Failed locales and their errors
    pub fn failures(&self) -> impl Iterator<Item = (&str, &SyncError)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.result {
            Ok(_) => None,
            Err(err) => Some((outcome.locale.as_str(), err)),
        })
    }

    /// Keys dropped from otherwise successful locales, as (locale, key, error)
    pub fn key_failures(&self) -> impl Iterator<Item = (&str, &str, &SyncError)> {
        self.outcomes.iter().flat_map(|outcome| {
            outcome
                .key_errors
                .iter()
                .map(move |(key, err)| (outcome.locale.as_str(), key.as_str(), err))
        })
    }

    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| outcome.result.is_ok() && outcome.key_errors.is_empty())
    }
}

#[derive(Default)]
struct LocaleStats {
    dispatched_chunks: usize,
    reused_keys: usize,
    key_errors: Vec<(String, SyncError)>,
}

/// Drives synchronization runs against a translation provider
pub struct Orchestrator {
    provider: Arc<dyn TranslationProvider>,
    normalizer: VariableNormalizer,
    chunking: ChunkPolicy,
    concurrency: usize,
    state: Option<Arc<dyn StateAccessor>>,
}

impl Orchestrator {
    pub const DEFAULT_CONCURRENCY: usize = 4;

    pub fn new(provider: Arc<dyn TranslationProvider>, normalizer: VariableNormalizer) -> Self {
        Orchestrator {
            provider,
            normalizer,
            chunking: ChunkPolicy::default(),
            concurrency: Self::DEFAULT_CONCURRENCY,
            state: None,
        }
    }

    /// Build an orchestrator from validated configuration
    pub fn from_config(
        config: &SyncConfig,
        provider: Arc<dyn TranslationProvider>,
    ) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self::new(provider, config.normalizer.build()?)
            .with_chunk_policy(config.chunking)
            .with_concurrency(config.orchestrator.concurrency))
    }

    pub fn with_chunk_policy(mut self, chunking: ChunkPolicy) -> Self {
        self.chunking = chunking;
        self
    }

    /// Number of target locales processed at the same time (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Previously synchronized state used to skip unchanged keys
    pub fn with_state(mut self, state: Arc<dyn StateAccessor>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn normalizer(&self) -> &VariableNormalizer {
        &self.normalizer
    }

    /// Synchronize `job.source` into every target locale.
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReport)` - One outcome per target locale; failed locales carry their error
    /// * `Err(SyncError::Aborted)` - Cancellation was observed somewhere in the run
    /// * `Err(SyncError::InvalidLocale)` - The source locale tag is malformed
    pub async fn run(&self, job: &SyncJob, cancel: &CancellationToken) -> SyncResult<SyncReport> {
        cancel.check()?;
        validate_locale(&job.source_locale)?;

        let mut store = OrderTableStore::new(&job.source_locale);
        let neutral_source =
            self.normalizer
                .extract_payload(&mut store, &job.source_locale, &job.source);
        self.capture_target_orders(job, &mut store);

        info!(
            provider = self.provider.provider_name(),
            file_key = %job.file_key,
            source_locale = %job.source_locale,
            targets = job.target_locales.len(),
            entries = job.source.len(),
            "Starting synchronization"
        );

        let store = &store;
        let neutral_source = &neutral_source;
        let outcomes: Vec<LocaleOutcome> = stream::iter(job.target_locales.iter())
            .map(|locale| self.sync_locale(job, locale, neutral_source, store, cancel))
            .buffered(self.concurrency)
            .collect()
            .await;

        if outcomes
            .iter()
            .any(|outcome| matches!(outcome.result, Err(SyncError::Aborted)))
        {
            warn!(file_key = %job.file_key, "Synchronization aborted");
            return Err(SyncError::Aborted);
        }

        Ok(SyncReport { outcomes })
    }

    /// Record each locale's own placeholder order: from its existing payload first,
    /// then from the lock record for keys the payload did not cover.
    ///
    /// A table is only taken when it carries the same variables as the current source
    /// string, and a lock table only when the source is unchanged since it was recorded.
    /// Otherwise the key restores with the source order.
    fn capture_target_orders(&self, job: &SyncJob, store: &mut OrderTableStore) {
        for (locale, existing) in &job.existing_targets {
            if *locale == job.source_locale {
                continue;
            }
            for (key, text) in existing.iter() {
                if !job.source.contains_key(key) {
                    continue;
                }
                let fragments = self.normalizer.extract(text).fragments;
                if Self::matches_source(store, job, key, &fragments) {
                    store.record(locale, key, fragments);
                } else {
                    debug!(
                        locale = %locale,
                        key,
                        "Existing translation has different variables, using source order"
                    );
                }
            }
        }

        let Some(state) = &self.state else {
            return;
        };
        for locale in &job.target_locales {
            if *locale == job.source_locale {
                continue;
            }
            for (key, source_text) in job.source.iter() {
                if store.contains(locale, key) {
                    continue;
                }
                let current = state
                    .previous_checksum(locale, key)
                    .is_some_and(|previous| previous == checksum(source_text));
                if !current {
                    continue;
                }
                if let Some(fragments) = state.previous_order_table(locale, key) {
                    if Self::matches_source(store, job, key, &fragments) {
                        store.record(locale, key, fragments);
                    }
                }
            }
        }
    }

    fn matches_source(
        store: &OrderTableStore,
        job: &SyncJob,
        key: &str,
        fragments: &[Fragment],
    ) -> bool {
        store
            .get(&job.source_locale, key)
            .is_some_and(|source| same_variables(source, fragments))
    }

    async fn sync_locale(
        &self,
        job: &SyncJob,
        locale: &str,
        neutral_source: &Payload,
        store: &OrderTableStore,
        cancel: &CancellationToken,
    ) -> LocaleOutcome {
        let mut stats = LocaleStats::default();
        let result = self
            .translate_locale(job, locale, neutral_source, store, cancel, &mut stats)
            .await;

        for (key, err) in &stats.key_errors {
            warn!(locale, key = %key, error = %err, "Entry dropped");
        }
        match &result {
            Ok(payload) => info!(
                locale,
                entries = payload.len(),
                chunks = stats.dispatched_chunks,
                reused = stats.reused_keys,
                "Locale synchronized"
            ),
            Err(SyncError::Aborted) => debug!(locale, "Locale aborted"),
            Err(err) => warn!(locale, error = %err, "Locale failed"),
        }

        LocaleOutcome {
            locale: locale.to_string(),
            result,
            dispatched_chunks: stats.dispatched_chunks,
            reused_keys: stats.reused_keys,
            key_errors: stats.key_errors,
        }
    }

    async fn translate_locale(
        &self,
        job: &SyncJob,
        locale: &str,
        neutral_source: &Payload,
        store: &OrderTableStore,
        cancel: &CancellationToken,
        stats: &mut LocaleStats,
    ) -> SyncResult<Payload> {
        cancel.check()?;
        validate_locale(locale)?;

        let mut reused = Payload::new();
        let mut pending = Payload::new();
        for (key, neutral) in neutral_source.iter() {
            match self.reusable_translation(job, locale, key) {
                Some(previous) => {
                    reused.insert(key.to_string(), previous);
                }
                None => {
                    pending.insert(key.to_string(), neutral.to_string());
                }
            }
        }
        stats.reused_keys = reused.len();

        let chunks = plan_chunks(&pending, &self.chunking);
        let mut translated = Payload::new();

        for (index, chunk) in chunks.iter().enumerate() {
            cancel.check()?;
            debug!(
                locale,
                chunk = index + 1,
                of = chunks.len(),
                entries = chunk.len(),
                "Dispatching chunk"
            );

            let request = ChunkRequest::new(&job.source_locale, locale, &job.file_key, chunk)
                .with_cancellation(cancel);
            let response = self.provider.translate_chunk(&request).await?;
            stats.dispatched_chunks += 1;

            // The call was allowed to finish, but its result does not count
            cancel.check()?;

            for key in chunk.keys() {
                let value = response.get(key).ok_or_else(|| {
                    SyncError::MalformedResponse(format!(
                        "chunk {} for '{}' has no entry for key '{}'",
                        index + 1,
                        locale,
                        key
                    ))
                })?;
                translated.insert(key.to_string(), value.to_string());
            }
        }

        let mut result = Payload::new();
        for key in job.source.keys() {
            if let Some(previous) = reused.get(key) {
                result.insert(key.to_string(), previous.to_string());
            } else if let Some(neutral) = translated.get(key) {
                match self.normalizer.restore(store, locale, key, neutral) {
                    Ok(native) => {
                        result.insert(key.to_string(), native);
                    }
                    Err(err) => stats.key_errors.push((key.to_string(), err)),
                }
            }
        }

        Ok(result)
    }

    /// Previous translation of (locale, key) if its source text is unchanged
    fn reusable_translation(&self, job: &SyncJob, locale: &str, key: &str) -> Option<String> {
        let state = self.state.as_ref()?;
        let source_text = job.source.get(key)?;
        let previous = state.previous_checksum(locale, key)?;
        if previous != checksum(source_text) {
            return None;
        }
        state.previous_translation(locale, key)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.provider_name())
            .field("normalizer", &self.normalizer)
            .field("chunking", &self.chunking)
            .field("concurrency", &self.concurrency)
            .field("state", &self.state.is_some())
            .finish()
    }
}
