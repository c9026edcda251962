//! Glycorisk: score and explain one feature vector.
//!
//! Reads a feature vector JSON object from the file given as the first
//! argument (or stdin when absent or `-`) and prints the response JSON.

use std::io::{IsTerminal, Read};

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use glycorisk::adapters::sanitize::SanitizingMakeWriter;
use glycorisk::adapters::ArtifactDirectory;
use glycorisk::{EngineConfig, FeatureVector, ModelStore, ScoringService};

fn read_input(arg: Option<&str>) -> Result<String> {
    match arg {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read feature vector from stdin")?;
            Ok(buf)
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature vector from {path}")),
    }
}

fn main() -> Result<()> {
    // Logs go to stderr by default so stdout stays valid JSON.
    // GLYCORISK_LOG_MODE: "file" | "stderr" | "auto" (file when stderr is not a TTY
    // and GLYCORISK_LOG_FILE is set).
    let log_mode = std::env::var("GLYCORISK_LOG_MODE").unwrap_or_else(|_| "auto".to_string());
    let log_file = std::env::var("GLYCORISK_LOG_FILE").ok();

    let use_file = match log_mode.as_str() {
        "file" => true,
        "stderr" => false,
        _ => log_file.is_some() && !std::io::stderr().is_terminal(),
    };

    let (writer, _guard) = if use_file {
        let path = log_file.unwrap_or_else(|| "glycorisk.log".to_string());
        if let Some(parent) = std::path::Path::new(&path).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {path}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let config = EngineConfig::from_env_or_default();
    let source = ArtifactDirectory::open(config.model_dir.clone(), &config.integrity_policy())
        .with_context(|| format!("Failed to open {}", config.model_dir.display()))?;
    let store = ModelStore::load(&source, &config).context("Failed to load model store")?;
    let service = ScoringService::new(store);

    let arg = std::env::args().nth(1);
    let input = read_input(arg.as_deref())?;
    let row: FeatureVector =
        serde_json::from_str(&input).context("Input is not a JSON object of features")?;

    let response = service.score_and_explain(&row)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
