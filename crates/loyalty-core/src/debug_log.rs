//! Bounded diagnostic log kept in storage.
//!
//! Used to reconstruct what happened across redirects and auth steps after the
//! fact. Only the newest [`MAX_ENTRIES`] entries are kept. Failures are logged
//! and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::Storage;

/// Storage key for the debug log.
pub const DEBUG_LOG_KEY: &str = "loyalty_debug_log";
pub const MAX_ENTRIES: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

pub struct DebugLog {
    storage: Box<dyn Storage>,
}

impl DebugLog {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    /// Appends an entry, dropping the oldest ones past [`MAX_ENTRIES`].
    pub fn append(&mut self, message: impl Into<String>, data: Option<Value>) {
        let mut entries = self.entries();
        entries.push(DebugEntry {
            timestamp: Utc::now(),
            message: message.into(),
            data,
        });
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(..excess);
        }

        match serde_json::to_string(&entries) {
            Ok(json) => {
                if let Err(err) = self.storage.write(DEBUG_LOG_KEY, &json) {
                    tracing::debug!(error = %format!("{err:#}"), "failed to write debug log");
                }
            }
            Err(err) => tracing::debug!(error = %err, "failed to serialize debug log"),
        }
    }

    /// All entries, oldest first. Unreadable logs read as empty.
    pub fn entries(&self) -> Vec<DebugEntry> {
        let raw = match self.storage.read(DEBUG_LOG_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::debug!(error = %format!("{err:#}"), "failed to read debug log");
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "debug log is corrupt; starting fresh");
            Vec::new()
        })
    }

    pub fn clear(&mut self) {
        if let Err(err) = self.storage.remove(DEBUG_LOG_KEY) {
            tracing::debug!(error = %format!("{err:#}"), "failed to clear debug log");
        }
    }
}

impl std::fmt::Debug for DebugLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugLog").finish_non_exhaustive()
    }
}
