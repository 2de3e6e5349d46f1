//! Durable backends for the ledger document.
//!
//! Every backend stores the whole document on each write; there are no
//! partial updates.

use crate::error::LedgerError;
use crate::types::ContentKind;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const SLED_TREE: &str = "content_ledger";
const SLED_DOCUMENT_KEY: &[u8] = b"document";

/// One recorded, published content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub fingerprint: String,
    pub kind: ContentKind,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
}

/// Persisted ledger layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerDocument {
    /// Highest recorded sequence per kind, keyed by kind name.
    #[serde(default)]
    pub sequence_counters: BTreeMap<String, u64>,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl LedgerDocument {
    pub fn counter(&self, kind: ContentKind) -> u64 {
        self.sequence_counters
            .get(kind.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn set_counter(&mut self, kind: ContentKind, value: u64) {
        self.sequence_counters
            .insert(kind.as_str().to_string(), value);
    }
}

/// Storage port for the ledger document.
pub trait LedgerStore: Send + Sync {
    /// Load the stored document; `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<LedgerDocument>, LedgerError>;

    /// Replace the stored document with `document`.
    fn persist(&self, document: &LedgerDocument) -> Result<(), LedgerError>;

    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}

/// Pretty-printed JSON file, written atomically (temp file + rename).
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Persistence {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Option<LedgerDocument>, LedgerError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| LedgerError::Unreadable {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        let document = serde_json::from_str(&raw).map_err(|e| LedgerError::Unreadable {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(document))
    }

    fn persist(&self, document: &LedgerDocument) -> Result<(), LedgerError> {
        let serialized = serde_json::to_vec_pretty(document)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.persistence_error(e))?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path).map_err(|e| self.persistence_error(e))?;
            file.write_all(&serialized)
                .map_err(|e| self.persistence_error(e))?;
            file.sync_all().map_err(|e| self.persistence_error(e))?;
        }
        fs::rename(&temp_path, &self.path).map_err(|e| self.persistence_error(e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Embedded sled database holding the document under a single key.
pub struct SledLedgerStore {
    path: PathBuf,
    db: sled::Db,
    tree: sled::Tree,
}

impl SledLedgerStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path).map_err(to_backend)?;
        let tree = db.open_tree(SLED_TREE).map_err(to_backend)?;
        Ok(Self { path, db, tree })
    }
}

impl LedgerStore for SledLedgerStore {
    fn load(&self) -> Result<Option<LedgerDocument>, LedgerError> {
        let Some(raw) = self.tree.get(SLED_DOCUMENT_KEY).map_err(to_backend)? else {
            return Ok(None);
        };
        let document = serde_json::from_slice(&raw).map_err(|e| LedgerError::Unreadable {
            path: self.describe(),
            message: e.to_string(),
        })?;
        Ok(Some(document))
    }

    fn persist(&self, document: &LedgerDocument) -> Result<(), LedgerError> {
        let value = serde_json::to_vec(document)?;
        self.tree
            .insert(SLED_DOCUMENT_KEY, value)
            .map_err(to_backend)?;
        self.db.flush().map_err(to_backend)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sled:{}", self.path.display())
    }
}

fn to_backend(err: sled::Error) -> LedgerError {
    LedgerError::Backend(err.to_string())
}

/// In-memory store; writes can be made to fail to exercise persistence errors.
#[derive(Default)]
pub struct MemoryLedgerStore {
    document: Mutex<Option<LedgerDocument>>,
    fail_writes: AtomicBool,
    writes: Mutex<usize>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: LedgerDocument) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Option<LedgerDocument> {
        self.document.lock().clone()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Result<Option<LedgerDocument>, LedgerError> {
        Ok(self.document.lock().clone())
    }

    fn persist(&self, document: &LedgerDocument) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Persistence {
                path: self.describe(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "writes disabled"),
            });
        }
        *self.document.lock() = Some(document.clone());
        *self.writes.lock() += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
