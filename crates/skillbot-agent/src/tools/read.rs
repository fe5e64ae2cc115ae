//! `read_file`: universal reader for local files.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{debug, info, warn};

use skillbot_core::utils::{expand_home, truncate_with_marker};

use super::dispatcher::ToolSettings;
use super::extract::DocumentKind;

/// Strip whitespace and quote characters the model tends to wrap paths in.
fn clean_path(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// Read `raw_path` relative to the working directory.
///
/// Always returns text: document formats are converted, everything else is
/// read lossily and cut to `read_max_chars`.
pub async fn read_file(settings: &ToolSettings, raw_path: &str) -> String {
    let cleaned = clean_path(raw_path);
    let expanded = expand_home(cleaned);
    let path: PathBuf = if expanded.is_absolute() {
        expanded
    } else {
        settings.working_dir.join(expanded)
    };

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(m) => m,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "read_file target missing");
            return format!("Error: File not found: {cleaned}");
        }
    };
    if !metadata.is_file() {
        return format!("Error: Not a file: {cleaned}");
    }

    info!(
        file = %path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        "Reading file"
    );

    match DocumentKind::from_path(&path) {
        Some(kind) => {
            let extractor = Arc::clone(&settings.extractor);
            let target = path.clone();
            let result =
                tokio::task::spawn_blocking(move || extractor.extract(kind, &target)).await;
            match result {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => format!("{} Error: {e:#}", kind.label()),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Document extractor crashed");
                    format!("{} Error: {}", kind.label(), join_error_message(e))
                }
            }
        }
        None => match tokio::fs::read(&path).await {
            Ok(bytes) => truncate_with_marker(&String::from_utf8_lossy(&bytes), settings.read_max_chars),
            Err(e) => format!("Read Error: {e}"),
        },
    }
}

/// Readable text for a failed extraction task, including a panic message.
fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("extractor panicked: {message}")
}
