//! End-to-End Integration Tests for the Synchronization Pipeline
//!
//! These tests drive `Orchestrator::run` from native source text to native target
//! text, with the mock provider standing in for the engine. The one live test needs
//! a real engine:
//!
//! ```bash
//! export BANANA_SYNC_API_URL=https://engine.example
//! export BANANA_SYNC_API_KEY=api_...
//! cargo test --lib sync::integration_tests -- --ignored --nocapture
//! ```

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::Payload;
    use crate::config::SyncConfig;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn payload(entries: &[(&str, &str)]) -> Payload {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sorted_fragments(normalizer: &VariableNormalizer, text: &str) -> Vec<String> {
        let mut raw: Vec<String> = normalizer
            .extract(text)
            .fragments
            .into_iter()
            .map(|f| f.raw)
            .collect();
        raw.sort();
        raw
    }

    // ============================================================================
    // Named variables, several locales, reordering engine
    // ============================================================================

    #[tokio::test]
    async fn test_e2e_named_variables_across_locales() {
        let normalizer = VariableNormalizer::new(VariableGrammar::Named);
        let source = payload(&[
            ("greeting", "Hello %(user)s, you have %(count)d messages"),
            ("title", "Inbox"),
        ]);

        let mut map = HashMap::new();
        map.insert(
            (
                "Hello {variable:0}, you have {variable:1} messages".to_string(),
                "ja".to_string(),
            ),
            "{variable:1} 件のメッセージがあります、{variable:0} さん".to_string(),
        );
        map.insert(("Inbox".to_string(), "ja".to_string()), "受信箱".to_string());
        let mock = MockProvider::new(MockMode::Mappings(map));

        let orchestrator = Orchestrator::new(Arc::new(mock.clone()), normalizer);
        let job = SyncJob::new("messages.json", "en", source.clone()).with_targets(["ja", "de"]);
        let report = orchestrator
            .run(&job, &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_success());
        let ja = report.get("ja").unwrap().result.as_ref().unwrap();
        assert_eq!(
            ja.get("greeting"),
            Some("%(count)d 件のメッセージがあります、%(user)s さん")
        );
        assert_eq!(ja.get("title"), Some("受信箱"));

        let de = report.get("de").unwrap().result.as_ref().unwrap();
        assert_eq!(
            de.get("greeting"),
            Some("Hello %(user)s, you have %(count)d messages_de")
        );

        // Every translated value carries exactly the source fragments
        for (_, translated) in report.translations() {
            for (key, text) in source.iter() {
                assert_eq!(
                    sorted_fragments(&normalizer, translated.get(key).unwrap()),
                    sorted_fragments(&normalizer, text)
                );
            }
        }

        // Each locale went out as a single chunk
        for record in mock.dispatches() {
            assert_eq!(record.keys, vec!["greeting", "title"]);
        }
    }

    // ============================================================================
    // Lock record carried between runs
    // ============================================================================

    #[tokio::test]
    async fn test_e2e_second_run_only_sends_changed_keys() {
        let normalizer = VariableNormalizer::new(VariableGrammar::Printf);
        let first_source = payload(&[
            ("inbox", "You have %d new messages"),
            ("sent", "%2$s was sent by %1$s"),
        ]);
        let targets = ["de", "fr"];

        let mock = MockProvider::new(MockMode::Suffix);
        let first = Orchestrator::new(Arc::new(mock.clone()), normalizer)
            .run(
                &SyncJob::new("app.json", "en", first_source.clone()).with_targets(targets),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(mock.dispatch_count(), 2);

        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("sync.lock.json");
        let mut lock = LockRecord::load(&lock_path).unwrap();
        for (locale, translated) in first.translations() {
            lock.record_run(&normalizer, &first_source, locale, translated);
        }
        lock.save(&lock_path).unwrap();

        // Unchanged source: nothing goes out, previous translations come back
        let lock = Arc::new(LockRecord::load(&lock_path).unwrap());
        let mock = MockProvider::new(MockMode::Suffix);
        let orchestrator =
            Orchestrator::new(Arc::new(mock.clone()), normalizer).with_state(lock.clone());
        let unchanged = orchestrator
            .run(
                &SyncJob::new("app.json", "en", first_source.clone()).with_targets(targets),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(mock.dispatch_count(), 0);
        for locale in targets {
            assert_eq!(
                unchanged.get(locale).unwrap().result.as_ref().unwrap(),
                first.get(locale).unwrap().result.as_ref().unwrap()
            );
            assert_eq!(unchanged.get(locale).unwrap().reused_keys, 2);
        }

        // One key edited: only that key is sent, once per locale
        let second_source = payload(&[
            ("inbox", "You have %d unread messages"),
            ("sent", "%2$s was sent by %1$s"),
        ]);
        let changed = orchestrator
            .run(
                &SyncJob::new("app.json", "en", second_source).with_targets(targets),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        let log = mock.dispatches();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|record| record.keys == vec!["inbox"]));

        let fr = changed.get("fr").unwrap().result.as_ref().unwrap();
        assert_eq!(fr.get("inbox"), Some("You have %d unread messages_fr"));
        assert_eq!(fr.get("sent"), Some("%2$s was sent by %1$s_fr"));
    }

    // ============================================================================
    // Byte-bounded chunking
    // ============================================================================

    #[tokio::test]
    async fn test_e2e_chunks_respect_byte_budget() {
        let normalizer = VariableNormalizer::new(VariableGrammar::Printf);
        let source: Payload = (0..40)
            .map(|i| {
                (
                    format!("message.{:03}", i),
                    format!("Message %s number {} with a little padding text", i),
                )
            })
            .collect();
        let policy = ChunkPolicy::with_max_bytes(512);

        let mock = MockProvider::new(MockMode::NoOp);
        let report = Orchestrator::new(Arc::new(mock.clone()), normalizer)
            .with_chunk_policy(policy)
            .run(
                &SyncJob::new("app.json", "en", source.clone()).with_target("de"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let log = mock.dispatches();
        assert!(log.len() > 1);

        // Dispatches cover every key exactly once, in source order
        let keys: Vec<String> = log.iter().flat_map(|record| record.keys.clone()).collect();
        let expected: Vec<String> = source.keys().map(str::to_string).collect();
        assert_eq!(keys, expected);

        // Re-plan the neutral payload to check each chunk stayed under budget
        let mut store = OrderTableStore::new("en");
        let neutral = normalizer.extract_payload(&mut store, "en", &source);
        for chunk in plan_chunks(&neutral, &policy) {
            assert!(chunk_size(&chunk) <= policy.max_bytes);
        }

        assert_eq!(report.get("de").unwrap().result.as_ref().unwrap(), &source);
    }

    // ============================================================================
    // Cancellation and partial failure
    // ============================================================================

    #[tokio::test]
    async fn test_e2e_cancellation_discards_in_flight_result() {
        let cancel = CancellationToken::new();
        let mock = MockProvider::new(MockMode::Suffix)
            .with_delay(20)
            .cancelling_on_dispatch(1, cancel.clone());

        let result = Orchestrator::new(
            Arc::new(mock.clone()),
            VariableNormalizer::new(VariableGrammar::Printf),
        )
        .with_concurrency(1)
        .run(
            &SyncJob::new("app.json", "en", payload(&[("a", "%s")])).with_targets(["de", "fr"]),
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(SyncError::Aborted)));
        assert_eq!(mock.dispatch_count(), 1);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_e2e_failed_locale_leaves_others_intact() {
        let mock = MockProvider::new(MockMode::Suffix)
            .failing_for("de", MockFailure::Transport("connection reset".to_string()));
        let source = payload(&[("a", "%d files")]);

        let report = Orchestrator::new(
            Arc::new(mock),
            VariableNormalizer::new(VariableGrammar::Printf),
        )
        .run(
            &SyncJob::new("app.json", "en", source).with_targets(["de", "fr"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(matches!(
            report.get("de").unwrap().result,
            Err(SyncError::Transport(_))
        ));
        assert_eq!(
            report.get("fr").unwrap().result.as_ref().unwrap().get("a"),
            Some("%d files_fr")
        );
    }

    #[tokio::test]
    async fn test_e2e_dropped_key_keeps_rest_of_locale() {
        let normalizer = VariableNormalizer::new(VariableGrammar::Printf);
        let source = payload(&[
            ("title", "Inbox"),
            ("bye", "Bye %s, you have %d"),
            ("broken", "Sent %s"),
        ]);
        let mut map = HashMap::new();
        map.insert(
            ("Sent {variable:0}".to_string(), "de".to_string()),
            "Gesendet {variable:0} {variable:1}".to_string(),
        );
        let mock = MockProvider::new(MockMode::Mappings(map));

        // The existing file predates the second variable of "bye"
        let job = SyncJob::new("app.json", "en", source.clone())
            .with_target("de")
            .with_existing_target(
                "de",
                payload(&[("title", "Posteingang"), ("bye", "Tschuess %s")]),
            );
        let report = Orchestrator::new(Arc::new(mock), normalizer)
            .run(&job, &CancellationToken::new())
            .await
            .unwrap();

        let de = report.get("de").unwrap().result.as_ref().unwrap();
        assert_eq!(de.get("title"), Some("Inbox_de"));
        assert_eq!(de.get("bye"), Some("Bye %s, you have %d_de"));
        assert_eq!(de.get("broken"), None);
        let dropped: Vec<&str> = report.key_failures().map(|(_, key, _)| key).collect();
        assert_eq!(dropped, vec!["broken"]);

        // Only restored keys reach the lock record, so "broken" is retried next run
        let mut lock = LockRecord::new();
        for (locale, translated) in report.translations() {
            lock.record_run(&normalizer, &source, locale, translated);
        }
        assert!(lock.previous_translation("de", "bye").is_some());
        assert!(lock.previous_translation("de", "broken").is_none());
    }

    #[test]
    fn test_e2e_unknown_grammar_fails_before_any_work() {
        let config = SyncConfig::from_toml_str("[normalizer]\ngrammar = \"icu\"\n");
        assert!(matches!(config, Err(SyncError::Configuration(_))));
    }

    // ============================================================================
    // Live engine
    // ============================================================================

    #[tokio::test]
    #[ignore]
    async fn test_e2e_live_engine() {
        let provider = match HttpProvider::from_env() {
            Ok(provider) => provider,
            Err(e) => {
                eprintln!("Skipping: {}", e);
                return;
            }
        };

        let source = payload(&[
            ("greeting", "Hello, %s!"),
            ("inbox", "You have %d new messages"),
        ]);
        let normalizer = VariableNormalizer::new(VariableGrammar::Printf);
        let report = Orchestrator::new(Arc::new(provider), normalizer)
            .run(
                &SyncJob::new("messages.json", "en", source.clone()).with_target("fr"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let fr = report.get("fr").unwrap().result.as_ref().unwrap();
        println!("{:#?}", fr);
        for (key, text) in source.iter() {
            assert_eq!(
                sorted_fragments(&normalizer, fr.get(key).unwrap()),
                sorted_fragments(&normalizer, text)
            );
        }
    }
}
