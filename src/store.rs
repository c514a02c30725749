//! Custom label persistence.
//!
//! Labels are namespaced by conversation; the collapsed flag is global.
//! Callers treat every store failure as non-fatal: they log it and carry on
//! with what they hold in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::scanner::Entry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub trait LabelStore {
    fn get(&self, conversation: &str) -> Result<HashMap<String, String>, StoreError>;

    /// `None` deletes the label.
    fn set(&mut self, conversation: &str, entry: &str, label: Option<&str>) -> Result<(), StoreError>;

    fn collapsed(&self) -> Result<bool, StoreError>;

    fn set_collapsed(&mut self, collapsed: bool) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct StoreData {
    #[serde(default)]
    labels: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    collapsed: bool,
}

impl StoreData {
    fn apply(&mut self, conversation: &str, entry: &str, label: Option<&str>) {
        match label {
            Some(label) => {
                self.labels
                    .entry(conversation.to_string())
                    .or_default()
                    .insert(entry.to_string(), label.to_string());
            }
            None => {
                if let Some(map) = self.labels.get_mut(conversation) {
                    map.remove(entry);
                    if map.is_empty() {
                        self.labels.remove(conversation);
                    }
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: StoreData,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LabelStore for MemoryStore {
    fn get(&self, conversation: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.data.labels.get(conversation).cloned().unwrap_or_default())
    }

    fn set(&mut self, conversation: &str, entry: &str, label: Option<&str>) -> Result<(), StoreError> {
        self.data.apply(conversation, entry, label);
        Ok(())
    }

    fn collapsed(&self) -> Result<bool, StoreError> {
        Ok(self.data.collapsed)
    }

    fn set_collapsed(&mut self, collapsed: bool) -> Result<(), StoreError> {
        self.data.collapsed = collapsed;
        Ok(())
    }
}

/// One JSON document on disk, rewritten on every change.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreData, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreData::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, data: &StoreData) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(data).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, body).map_err(io_err)
    }
}

impl LabelStore for JsonFileStore {
    fn get(&self, conversation: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.load()?.labels.remove(conversation).unwrap_or_default())
    }

    fn set(&mut self, conversation: &str, entry: &str, label: Option<&str>) -> Result<(), StoreError> {
        let mut data = self.load()?;
        data.apply(conversation, entry, label);
        self.save(&data)
    }

    fn collapsed(&self) -> Result<bool, StoreError> {
        Ok(self.load()?.collapsed)
    }

    fn set_collapsed(&mut self, collapsed: bool) -> Result<(), StoreError> {
        let mut data = self.load()?;
        data.collapsed = collapsed;
        self.save(&data)
    }
}

/// Trim and cap a label at `max` characters. `None` when nothing is left.
pub fn normalize_label(raw: &str, max: usize) -> Option<String> {
    let label: String = raw.trim().chars().take(max).collect();
    let label = label.trim_end();
    (!label.is_empty()).then(|| label.to_string())
}

/// The in-memory view of one conversation's custom labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelBook {
    conversation: Option<String>,
    labels: HashMap<String, String>,
}

impl LabelBook {
    pub fn new(conversation: Option<String>, labels: HashMap<String, String>) -> Self {
        Self {
            conversation,
            labels,
        }
    }

    pub fn conversation(&self) -> Option<&str> {
        self.conversation.as_deref()
    }

    pub fn get(&self, entry: &str) -> Option<&str> {
        self.labels.get(entry).map(|s| s.as_str())
    }

    /// Custom label if one is set, otherwise the scanned summary.
    pub fn display_name<'a>(&'a self, entry: &'a Entry) -> &'a str {
        self.get(&entry.id).unwrap_or(entry.summary_text.as_str())
    }

    /// Normalise `raw` and record it; an empty result clears the label.
    /// Returns what was stored.
    pub fn assign(&mut self, entry: &str, raw: &str, max: usize) -> Option<String> {
        match normalize_label(raw, max) {
            Some(label) => {
                self.labels.insert(entry.to_string(), label.clone());
                Some(label)
            }
            None => {
                self.labels.remove(entry);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
