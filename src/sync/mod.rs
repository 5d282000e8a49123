//! Synchronization Module
//!
//! This module keeps target-locale message payloads in step with a source payload by
//! sending the source through a translation provider, without ever letting the
//! provider see (or damage) the printf-style or named variables in the text.
//!
//! # Overview
//!
//! 1. **Variable Normalizer** - Rewrites native variables to `{variable:N}` tokens and back,
//!    remembering each (locale, key)'s own fragment order in an [`OrderTableStore`]
//! 2. **Chunk Planner** - Splits a neutral payload into size-bounded chunks
//! 3. **Providers** - [`TranslationProvider`] trait with an HTTP engine client and a mock
//! 4. **Lock Record** - Previously synchronized state used to skip unchanged keys
//! 5. **Orchestrator** - Runs every target locale, concurrently and cancellably
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use banana_i18n_sync::sync::{
//!     CancellationToken, HttpProvider, Orchestrator, SyncJob, VariableGrammar, VariableNormalizer,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut source = banana_i18n_sync::Payload::new();
//!     source.with_entry("inbox", "You have %d new messages");
//!
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(HttpProvider::from_env()?),
//!         VariableNormalizer::new(VariableGrammar::Printf),
//!     );
//!     let job = SyncJob::new("messages.json", "en", source).with_targets(["de", "fr"]);
//!     let report = orchestrator.run(&job, &CancellationToken::new()).await?;
//!
//!     for (locale, payload) in report.translations() {
//!         println!("{}: {:?}", locale, payload.get("inbox"));
//!     }
//!     Ok(())
//! }
//! ```
pub mod cancel;
pub mod chunk;
pub mod error;
pub mod grammar;
pub mod http_provider;
pub mod mock;
pub mod normalizer;
pub mod orchestrator;
pub mod order_table;
pub mod provider;
pub mod state;

#[cfg(test)]
mod integration_tests;

pub use cancel::CancellationToken;
pub use chunk::{ChunkPolicy, chunk_size, entry_size, plan_chunks};
pub use error::{SyncError, SyncResult};
pub use grammar::{Fragment, VariableGrammar, same_variables};
pub use http_provider::HttpProvider;
pub use mock::{DispatchRecord, MockFailure, MockMode, MockProvider};
pub use normalizer::{Extraction, VariableNormalizer, neutral_token};
pub use orchestrator::{LocaleOutcome, Orchestrator, SyncJob, SyncReport};
pub use order_table::OrderTableStore;
pub use provider::{ChunkRequest, Identity, TranslationProvider, validate_locale};
pub use state::{LockRecord, StateAccessor, checksum};
