//! Structured JSONL event logging, shared by every binary in the workspace.
//!
//! Mirrors `atm-core::event_log`: one JSON object per line, best-effort
//! (a logging failure never propagates to the caller), size-based rotation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Map, Value, json};

const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;
const DEFAULT_MAX_FILES: u32 = 5;

#[derive(Clone, Debug)]
pub struct EventLogConfig {
    pub path: PathBuf,
    pub max_bytes: u64,
    pub max_files: u32,
}

impl EventLogConfig {
    pub fn from_env() -> Self {
        let default_path = dirs::home_dir()
            .map(|h| h.join(".vso").join("events.jsonl"))
            .unwrap_or_else(|| PathBuf::from("events.jsonl"));
        let path = std::env::var("VSO_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or(default_path);
        let max_bytes = std::env::var("VSO_LOG_MAX_BYTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_BYTES);
        let max_files = std::env::var("VSO_LOG_MAX_FILES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_FILES);

        Self {
            path,
            max_bytes,
            max_files,
        }
    }
}

/// A single structured event. `extra` carries any fields beyond the common
/// ones (e.g. `server_id`, `capability`, `exit_code`).
#[derive(Clone, Debug, Default)]
pub struct EventFields {
    pub level: &'static str,
    pub source: &'static str,
    pub action: &'static str,
    pub server_id: Option<String>,
    pub capability: Option<String>,
    pub result: Option<String>,
    pub extra: Option<Map<String, Value>>,
}

/// Append `fields` as one JSON line to the event log. Failures are logged
/// via `tracing` and swallowed — event logging must never be able to take
/// down a component that is otherwise healthy.
pub fn emit_event_best_effort(fields: EventFields) {
    let config = EventLogConfig::from_env();
    if let Err(e) = emit_event(&config, fields) {
        tracing::warn!("failed to write structured event: {e}");
    }
}

fn emit_event(config: &EventLogConfig, fields: EventFields) -> anyhow::Result<()> {
    rotate_if_needed(config)?;

    let mut obj = Map::new();
    obj.insert("ts".into(), json!(Utc::now().to_rfc3339()));
    obj.insert("level".into(), json!(fields.level));
    obj.insert("source".into(), json!(fields.source));
    obj.insert("action".into(), json!(fields.action));
    if let Some(id) = fields.server_id {
        obj.insert("server_id".into(), json!(id));
    }
    if let Some(cap) = fields.capability {
        obj.insert("capability".into(), json!(cap));
    }
    if let Some(result) = fields.result {
        obj.insert("result".into(), json!(result));
    }
    if let Some(extra) = fields.extra {
        for (k, v) in extra {
            obj.insert(k, v);
        }
    }

    if let Some(parent) = config.path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.path)?;
    writeln!(file, "{}", Value::Object(obj))?;
    Ok(())
}

fn rotate_if_needed(config: &EventLogConfig) -> anyhow::Result<()> {
    let Ok(metadata) = fs::metadata(&config.path) else {
        return Ok(());
    };
    if metadata.len() < config.max_bytes {
        return Ok(());
    }
    rotate_files(&config.path, config.max_files)
}

fn rotate_files(path: &Path, max_files: u32) -> anyhow::Result<()> {
    for i in (1..max_files).rev() {
        let src = numbered_path(path, i);
        let dst = numbered_path(path, i + 1);
        if src.exists() {
            let _ = fs::rename(&src, &dst);
        }
    }
    let first = numbered_path(path, 1);
    fs::rename(path, first)?;
    Ok(())
}

fn numbered_path(path: &Path, n: u32) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(format!(".{n}"));
    PathBuf::from(os)
}
