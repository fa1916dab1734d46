use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{EngineError, EngineResult};

/// Descriptive metadata prefilled for editing when a source is loaded.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDocument {
    /// Source file name.
    pub name: String,
    /// Declared MIME type.
    #[serde(rename = "type")]
    pub mime: String,
    /// Source size in bytes.
    pub size: u64,
    /// Last-modified timestamp (RFC 3339), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl MetadataDocument {
    /// Prefill from a file on disk: name, size, and modification time.
    pub fn for_file(path: &Path, mime: impl Into<String>) -> EngineResult<Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("read metadata of '{}'", path.display()))?;
        let last_modified = meta.modified().ok().map(|t| {
            chrono::DateTime::<chrono::Utc>::from(t)
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        });
        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            mime: mime.into(),
            size: meta.len(),
            last_modified,
        })
    }

    /// Pretty JSON suitable as the initial text of a metadata edit.
    pub fn to_edit_text(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self).context("serialize metadata document")?)
    }
}

/// Parse edited metadata text into `(key, value)` entries in the order they were written.
///
/// Accepts either a JSON object with scalar values or `key=value` lines. Blank lines are
/// skipped. Keys must be non-empty and free of whitespace and `=`.
pub fn parse_metadata_entries(text: &str) -> EngineResult<Vec<(String, String)>> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return parse_json_object(trimmed);
    }

    let mut entries = Vec::new();
    for (line_no, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| {
            EngineError::invalid_value(
                "metadataPolicy",
                format!("line {} is not key=value", line_no + 1),
            )
        })?;
        entries.push((checked_key(key.trim())?, value.trim().to_string()));
    }
    Ok(entries)
}

fn parse_json_object(text: &str) -> EngineResult<Vec<(String, String)>> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| EngineError::invalid_value("metadataPolicy", format!("invalid JSON: {e}")))?;
    let serde_json::Value::Object(map) = value else {
        return Err(EngineError::invalid_value(
            "metadataPolicy",
            "JSON metadata must be an object",
        ));
    };

    let mut entries = Vec::with_capacity(map.len());
    for (key, v) in map {
        let v = match v {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => String::new(),
            _ => {
                return Err(EngineError::invalid_value(
                    "metadataPolicy",
                    format!("value for '{key}' must be a string, number, or bool"),
                ));
            }
        };
        entries.push((checked_key(&key)?, v));
    }
    Ok(entries)
}

fn checked_key(key: &str) -> EngineResult<String> {
    if key.is_empty() || key.contains(char::is_whitespace) || key.contains('=') {
        return Err(EngineError::invalid_value(
            "metadataPolicy",
            format!("invalid metadata key '{key}'"),
        ));
    }
    Ok(key.to_string())
}

#[cfg(test)]
#[path = "../tests/unit/metadata.rs"]
mod tests;
