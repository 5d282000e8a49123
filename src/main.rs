use banana_i18n_sync::sync::{MockMode, MockProvider};
use banana_i18n_sync::{
    CancellationToken, HttpProvider, LockRecord, Orchestrator, Payload, SyncConfig, SyncJob,
    TranslationProvider,
};
use clap::{Arg, ArgAction, Command};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("banana-sync")
        .version("0.1.0")
        .about("Synchronize translations of a flat JSON message file")
        .arg(
            Arg::new("payload")
                .help("Source payload: a JSON object of key -> text")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .short('t')
                .help("Target locale (repeatable)")
                .required(true)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("source-locale")
                .long("source")
                .short('s')
                .help("Source locale (default: en)")
                .default_value("en"),
        )
        .arg(
            Arg::new("file-key")
                .long("file-key")
                .help("File identifier sent to the engine (default: payload file name)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("lock")
                .long("lock")
                .short('l')
                .help("Lock file used to skip unchanged keys; updated after the run"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Directory of <locale>.json target files; printed to stdout when absent"),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use the mock provider instead of the engine")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log every chunk dispatch")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let default_level = if matches.get_flag("verbose") {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let payload_path = PathBuf::from(
        matches
            .get_one::<String>("payload")
            .ok_or("missing payload path")?,
    );
    let source_locale = matches
        .get_one::<String>("source-locale")
        .map(String::as_str)
        .unwrap_or("en");
    let targets: Vec<String> = matches
        .get_many::<String>("target")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let file_key = match matches.get_one::<String>("file-key") {
        Some(key) => key.clone(),
        None => payload_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or("payload path has no file name")?,
    };
    let output_dir = matches.get_one::<String>("output").map(PathBuf::from);
    let lock_path = matches.get_one::<String>("lock").map(PathBuf::from);

    // 1. Configuration
    let config = match matches.get_one::<String>("config") {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    }
    .with_env_overrides();

    // 2. Provider
    let provider: Arc<dyn TranslationProvider> = if matches.get_flag("mock") {
        Arc::new(MockProvider::new(MockMode::Suffix))
    } else {
        match HttpProvider::from_config(&config.api) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                eprintln!("Cannot create engine client: {}", e);
                eprintln!(
                    "   Set {} and {}, or use --mock",
                    banana_i18n_sync::config::ApiConfig::URL_ENV,
                    banana_i18n_sync::config::ApiConfig::KEY_ENV
                );
                return Err(e.into());
            }
        }
    };

    // 3. Job
    let source: Payload = serde_json::from_str(&std::fs::read_to_string(&payload_path)?)?;
    let mut job = SyncJob::new(&file_key, source_locale, source).with_targets(targets);
    if let Some(dir) = &output_dir {
        for locale in job.target_locales.clone() {
            if let Some(existing) = read_target(dir, &locale)? {
                job = job.with_existing_target(&locale, existing);
            }
        }
    }

    let lock = match &lock_path {
        Some(path) => LockRecord::load(path)?,
        None => LockRecord::new(),
    };

    let mut orchestrator = Orchestrator::from_config(&config, provider)?;
    if lock_path.is_some() {
        orchestrator = orchestrator.with_state(Arc::new(lock.clone()));
    }

    // 4. Run, cancelling on Ctrl-C
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests");
            signal_token.cancel();
        }
    });

    let report = orchestrator.run(&job, &cancel).await?;

    // 5. Results
    let mut printed = BTreeMap::new();
    let mut lock = lock;
    for (locale, translated) in report.translations() {
        lock.record_run(orchestrator.normalizer(), &job.source, locale, translated);
        match &output_dir {
            Some(dir) => write_target(dir, locale, translated)?,
            None => {
                printed.insert(locale.to_string(), translated.clone());
            }
        }
    }
    if output_dir.is_none() {
        println!("{}", serde_json::to_string_pretty(&printed)?);
    }
    if let Some(path) = &lock_path {
        lock.save(path)?;
        info!(path = %path.display(), "Lock file updated");
    }

    let failures: Vec<_> = report.failures().collect();
    for (locale, err) in &failures {
        eprintln!("{}: {}", locale, err);
    }
    let dropped: Vec<_> = report.key_failures().collect();
    for (locale, key, err) in &dropped {
        eprintln!("{} [{}]: {}", locale, key, err);
    }
    if !failures.is_empty() {
        return Err(format!("{} of {} locales failed", failures.len(), report.outcomes.len()).into());
    }
    if !dropped.is_empty() {
        return Err(format!("{} entries could not be restored", dropped.len()).into());
    }

    Ok(())
}

fn read_target(dir: &Path, locale: &str) -> Result<Option<Payload>, Box<dyn std::error::Error>> {
    let path = dir.join(format!("{}.json", locale));
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&std::fs::read_to_string(path)?)?))
}

fn write_target(
    dir: &Path,
    locale: &str,
    payload: &Payload,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", locale));
    std::fs::write(&path, serde_json::to_string_pretty(payload)?)?;
    info!(locale, path = %path.display(), "Wrote target file");
    Ok(())
}
