use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value, json};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct InteractionLog {
    success_path: PathBuf,
    error_path: PathBuf,
}

impl InteractionLog {
    pub fn new(success_path: impl Into<PathBuf>, error_path: impl Into<PathBuf>) -> Self {
        Self {
            success_path: success_path.into(),
            error_path: error_path.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.success_log_path(), cfg.error_log_path())
    }

    pub fn success_path(&self) -> &Path {
        &self.success_path
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    pub fn entries(&self) -> Vec<Value> {
        let contents = match fs::read(&self.success_path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!(path = %self.success_path.display(), error = %err, "no prior interaction log");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<Value>>(&contents) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(path = %self.success_path.display(), error = %err, "discarding unparsable interaction log");
                Vec::new()
            }
        }
    }

    pub fn record_success(&self, prompt: &str, response: &Value) -> Result<()> {
        let mut entries = self.entries();
        entries.push(merged_entry(prompt, response));

        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        entries
            .serialize(&mut serializer)
            .context("Failed to encode interaction log")?;
        buf.push(b'\n');

        fs::write(&self.success_path, buf)
            .with_context(|| format!("Failed to write '{}'", self.success_path.display()))?;
        info!(
            path = %self.success_path.display(),
            entry_count = entries.len(),
            "recorded interaction"
        );
        Ok(())
    }

    pub fn record_failure(
        &self,
        status: u16,
        status_text: &str,
        body: &Value,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let entry = json!({
            "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            "resp": { "status": status, "statusText": status_text },
            "data": body,
        });
        let mut block =
            serde_json::to_string_pretty(&entry).context("Failed to encode error log entry")?;
        block.push_str("\n\n");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.error_path)
            .with_context(|| format!("Failed to open '{}'", self.error_path.display()))?;
        file.write_all(block.as_bytes())
            .with_context(|| format!("Failed to append to '{}'", self.error_path.display()))?;
        info!(path = %self.error_path.display(), status, "recorded failed request");
        Ok(())
    }
}

// Response fields sit beside the prompt and win on collision.
fn merged_entry(prompt: &str, response: &Value) -> Value {
    let mut entry = Map::new();
    entry.insert("prompt".to_string(), Value::String(prompt.to_string()));
    match response {
        Value::Object(fields) => {
            entry.extend(fields.iter().map(|(key, value)| (key.clone(), value.clone())));
        }
        other => {
            entry.insert("response".to_string(), other.clone());
        }
    }
    Value::Object(entry)
}

pub fn failure_summary(status_text: &str, body: &Value) -> String {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .or_else(|| Some(status_text).filter(|text| !text.is_empty()))
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use std::fs;

    use super::{InteractionLog, failure_summary, merged_entry};

    fn log_in(dir: &tempfile::TempDir) -> InteractionLog {
        InteractionLog::new(dir.path().join("log.json"), dir.path().join("error.txt"))
    }

    #[test]
    fn sequential_successes_append_in_call_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = log_in(&dir);

        for idx in 0..3 {
            log.record_success(&format!("prompt {idx}"), &json!({ "id": idx }))
                .expect("record should succeed");
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        for (idx, entry) in entries.iter().enumerate() {
            assert_eq!(entry["prompt"], format!("prompt {idx}"));
            assert_eq!(entry["id"], idx);
        }
    }

    #[test]
    fn success_log_is_four_space_pretty_json_with_trailing_newline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = log_in(&dir);
        log.record_success("hi", &json!({ "object": "chat.completion" }))
            .expect("record should succeed");

        let text = fs::read_to_string(log.success_path()).expect("read");
        assert_eq!(
            text,
            "[\n    {\n        \"prompt\": \"hi\",\n        \"object\": \"chat.completion\"\n    }\n]\n"
        );
    }

    #[test]
    fn corrupt_log_is_replaced_by_single_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = log_in(&dir);
        fs::write(log.success_path(), "{ not json").expect("write");

        log.record_success("fresh", &json!({}))
            .expect("record should succeed");

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["prompt"], "fresh");
    }

    #[test]
    fn non_array_log_counts_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = log_in(&dir);
        fs::write(log.success_path(), r#"{"prompt":"x"}"#).expect("write");
        assert!(log.entries().is_empty());
    }

    #[test]
    fn merged_entry_flattens_response_fields() {
        let entry = merged_entry("q", &json!({ "id": "c1", "prompt": "from api" }));
        assert_eq!(entry, json!({ "prompt": "from api", "id": "c1" }));

        let entry = merged_entry("q", &Value::String("raw".to_string()));
        assert_eq!(entry, json!({ "prompt": "q", "response": "raw" }));
    }

    #[test]
    fn failures_append_separate_blocks_with_status_and_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = log_in(&dir);
        let at = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
            .single()
            .expect("valid timestamp");

        log.record_failure(500, "Internal Server Error", &json!({ "error": null }), at)
            .expect("record should succeed");
        log.record_failure(429, "Too Many Requests", &json!("slow down"), at)
            .expect("record should succeed");

        let text = fs::read_to_string(log.error_path()).expect("read");
        let blocks: Vec<&str> = text.split_terminator("\n\n").collect();
        assert_eq!(blocks.len(), 2);

        let first: Value = serde_json::from_str(blocks[0]).expect("block should be JSON");
        assert_eq!(first["timestamp"], "2024-03-01T12:30:00.000Z");
        assert_eq!(first["resp"]["status"], 500);
        assert_eq!(first["resp"]["statusText"], "Internal Server Error");
        assert!(text.ends_with("}\n\n"));
        assert!(!log.success_path().exists());
    }

    #[test]
    fn failure_summary_prefers_api_message_then_status_text() {
        assert_eq!(
            failure_summary("Bad Request", &json!({ "error": { "message": "model not found" } })),
            "model not found"
        );
        assert_eq!(failure_summary("Bad Request", &json!({})), "Bad Request");
        assert_eq!(failure_summary("", &json!("oops")), "unknown");
    }
}
