use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One line of `actions.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: String,
    pub timestamp: String,
    pub action: String,
    pub model: String,
    pub input_chars: usize,
    pub output_chars: usize,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl ActionRecord {
    pub fn new(action: &str, model: &str, input_chars: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            action: action.to_string(),
            model: model.to_string(),
            input_chars,
            output_chars: 0,
            input_tokens: 0,
            output_tokens: 0,
            latency_ms: 0,
            success: false,
            error: None,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} | {} | {:.1}s | in: {} chars, {} tokens | out: {} chars, {} tokens",
            self.action,
            if self.success { "ok" } else { "failed" },
            self.latency_ms as f64 / 1000.0,
            self.input_chars,
            self.input_tokens,
            self.output_chars,
            self.output_tokens,
        )
    }
}

/// Appends records to `<dir>/actions.jsonl`. Writes from concurrent sessions
/// are serialized so lines never interleave.
pub struct ActionLogger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ActionLogger {
    pub fn new(dir: &str) -> Result<Self> {
        let dir = PathBuf::from(dir);
        fs::create_dir_all(&dir).context("Failed to create logs directory")?;
        Ok(Self {
            path: dir.join("actions.jsonl"),
            lock: Mutex::new(()),
        })
    }

    pub fn write(&self, record: &ActionRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open log file")?;

        let json = serde_json::to_string(record).context("Failed to serialize action record")?;
        writeln!(file, "{}", json).context("Failed to write log")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let logger = ActionLogger::new(dir.path().to_str().unwrap()).unwrap();

        let mut record = ActionRecord::new("continue", "stub", 12);
        record.success = true;
        logger.write(&record).unwrap();
        logger.write(&ActionRecord::new("rewrite", "stub", 3)).unwrap();

        let content = fs::read_to_string(dir.path().join("actions.jsonl")).unwrap();
        let lines: Vec<ActionRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].action, "continue");
        assert!(lines[0].success);
        assert!(!lines[1].success);
    }

    #[test]
    fn test_summary() {
        let mut record = ActionRecord::new("enhance", "stub", 10);
        record.latency_ms = 1500;
        record.output_chars = 40;
        record.input_tokens = 25;
        record.output_tokens = 11;
        record.success = true;
        assert_eq!(
            record.summary(),
            "enhance | ok | 1.5s | in: 10 chars, 25 tokens | out: 40 chars, 11 tokens"
        );
    }
}
