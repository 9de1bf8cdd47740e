use anyhow::{Context, Result};
use rcly_core::{NotificationDispatcher, NotificationKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize)]
pub struct PayloadFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Collects every `*.xml` file below `dir`, in walk order.
pub fn scan_payloads(dir: &Path) -> Result<Vec<PayloadFile>> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let mut result = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let p = entry.path();
        let is_xml = p
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if is_xml {
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            result.push(PayloadFile {
                path: p.to_path_buf(),
                size_bytes,
            });
        }
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Handled { kind: NotificationKind },
    Unknown,
    Failed { error: String },
}

/// Reads one payload from disk and runs it through the dispatcher.
/// Only an unreadable file is an error; decode failures are an outcome.
pub fn dispatch_file(dispatcher: &NotificationDispatcher, path: &Path) -> Result<Outcome> {
    let payload = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let outcome = match dispatcher.process(&payload) {
        Ok(Some(kind)) => Outcome::Handled { kind },
        Ok(None) => Outcome::Unknown,
        Err(e) => {
            tracing::error!(path = %path.display(), offset = e.offset(), error = %e, "malformed notification");
            Outcome::Failed {
                error: e.to_string(),
            }
        }
    };
    Ok(outcome)
}

#[derive(Debug, Default, Serialize)]
pub struct ReplaySummary {
    pub files: usize,
    pub handled: usize,
    pub unknown: usize,
    pub failed: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub failures: Vec<ReplayFailure>,
}

#[derive(Debug, Serialize)]
pub struct ReplayFailure {
    pub path: PathBuf,
    pub error: String,
}

impl ReplaySummary {
    fn record(&mut self, path: &Path, outcome: Outcome) {
        self.files += 1;
        match outcome {
            Outcome::Handled { kind } => {
                self.handled += 1;
                *self.by_kind.entry(kind.to_string()).or_default() += 1;
            }
            Outcome::Unknown => self.unknown += 1,
            Outcome::Failed { error } => {
                self.failed += 1;
                self.failures.push(ReplayFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }
}

/// Dispatches every payload found under `dir`. A file that cannot be read or
/// decoded is counted and the replay moves on.
pub fn replay_dir(dispatcher: &NotificationDispatcher, dir: &Path) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    for file in scan_payloads(dir)? {
        let outcome = dispatch_file(dispatcher, &file.path).unwrap_or_else(|e| Outcome::Failed {
            error: format!("{e:#}"),
        });
        tracing::debug!(path = %file.path.display(), bytes = file.size_bytes, ?outcome, "replayed");
        summary.record(&file.path, outcome);
    }
    tracing::info!(
        files = summary.files,
        handled = summary.handled,
        unknown = summary.unknown,
        failed = summary.failed,
        "replay finished"
    );
    Ok(summary)
}
