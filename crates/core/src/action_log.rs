//! Append-only record of executed actions.

use crate::action::Action;
use crate::error::{EngineError, ErrorKind};
use alloy::primitives::B256;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// A step of the planned action list
    Action,
    /// Swap inserted to cover a repay shortfall
    InlineRepaySwap,
    /// Swap inserted to restore the gas reserve
    GasTopUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { tx_hash: B256 },
    Skipped { reason: String },
    Failed { kind: ErrorKind, message: String },
}

impl Outcome {
    pub fn failed(e: &EngineError) -> Self {
        Self::Failed {
            kind: e.kind(),
            message: e.message().to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            Self::Success { tx_hash } => Some(*tx_hash),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: LogKind,
    pub action: Action,
    pub outcome: Outcome,
}

impl LogEntry {
    pub fn now(kind: LogKind, action: Action, outcome: Outcome) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            action,
            outcome,
        }
    }
}

/// Durable sink for log entries. Entries are never rewritten.
pub trait ActionLog: Send + Sync {
    fn append(&self, entry: &LogEntry) -> Result<()>;
}

/// One JSON object per line.
#[derive(Debug)]
pub struct JsonlActionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlActionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry back, in append order.
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", self.path.display())),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).context("malformed log line"))
            .collect()
    }
}

impl ActionLog for JsonlActionLog {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        let line = serde_json::to_string(entry)?;
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// In-memory log for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryActionLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }
}

impl ActionLog for MemoryActionLog {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use hyperyield_chain::{Amount, ProtocolId};

    fn entry(outcome: Outcome) -> LogEntry {
        LogEntry::now(
            LogKind::Action,
            Action::Withdraw {
                protocol: ProtocolId::HyperLend,
                asset: Address::repeat_byte(1),
                amount: Amount::Full,
            },
            outcome,
        )
    }

    #[test]
    fn test_jsonl_appends_lines() {
        let path = std::env::temp_dir().join(format!("hyperyield-log-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let log = JsonlActionLog::new(&path);

        log.append(&entry(Outcome::Success { tx_hash: B256::repeat_byte(7) })).unwrap();
        log.append(&entry(Outcome::Failed {
            kind: ErrorKind::Execution,
            message: "reverted".into(),
        }))
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().next().unwrap().contains("\"status\":\"success\""));

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].outcome.tx_hash(), None);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_memory_log() {
        let log = MemoryActionLog::new();
        log.append(&entry(Outcome::Skipped { reason: "no debt".into() })).unwrap();
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn test_outcome_from_error() {
        let outcome = Outcome::failed(&EngineError::Precondition("borrow disabled".into()));
        assert_eq!(
            outcome,
            Outcome::Failed {
                kind: ErrorKind::Precondition,
                message: "borrow disabled".into(),
            }
        );
        assert!(!outcome.is_success());
    }
}
