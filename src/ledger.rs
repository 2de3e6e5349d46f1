//! Content Ledger
//!
//! Durable dedup store and per-kind sequence allocator. The whole document is
//! held in memory behind one mutex; every mutation runs under that lock and,
//! for `record`, persists the full document before the lock is released, so
//! concurrent writers never append from a stale snapshot.
//!
//! Sequence numbers are reserved with [`ContentLedger::next_sequence`] and
//! become durable when an entry carrying them is recorded. Reservations that
//! never reach `record` are not persisted, so the next run reuses them.

pub mod fingerprint;
pub mod store;

pub use fingerprint::{fingerprint, normalize_topic};
pub use store::{
    JsonFileStore, LedgerDocument, LedgerEntry, LedgerStore, MemoryLedgerStore, SledLedgerStore,
};

use crate::error::LedgerError;
use crate::types::{ContentKind, GenerationRequest};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fields of an entry about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub kind: ContentKind,
    pub topic: String,
    pub locale: Option<String>,
    pub sequence: Option<u64>,
    pub artifact_ref: Option<String>,
}

impl EntryDraft {
    pub fn new(kind: ContentKind, topic: impl Into<String>) -> Self {
        Self {
            kind,
            topic: topic.into(),
            locale: None,
            sequence: None,
            artifact_ref: None,
        }
    }

    pub fn from_request(request: &GenerationRequest) -> Self {
        Self {
            kind: request.kind,
            topic: request.topic.clone(),
            locale: request.locale.clone(),
            sequence: None,
            artifact_ref: None,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_sequence(mut self, sequence: Option<u64>) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_artifact_ref(mut self, artifact_ref: impl Into<String>) -> Self {
        self.artifact_ref = Some(artifact_ref.into());
        self
    }
}

/// Result of a `record` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Recorded(LedgerEntry),
    /// An entry with the same fingerprint already existed; nothing was written.
    AlreadyRecorded(LedgerEntry),
}

impl RecordOutcome {
    pub fn entry(&self) -> &LedgerEntry {
        match self {
            RecordOutcome::Recorded(entry) | RecordOutcome::AlreadyRecorded(entry) => entry,
        }
    }
}

/// Per-kind ledger statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindStats {
    pub entries: usize,
    pub last_sequence: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_entries: usize,
    pub per_kind: BTreeMap<String, KindStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub pending_durable: bool,
}

struct LedgerState {
    document: LedgerDocument,
    index: HashSet<String>,
    /// Highest reserved sequence per kind (>= the persisted counter).
    reserved: HashMap<ContentKind, u64>,
    /// Set when the in-memory document is ahead of durable storage.
    pending_durable: bool,
}

/// Idempotent content ledger.
pub struct ContentLedger {
    state: Mutex<LedgerState>,
    store: Arc<dyn LedgerStore>,
    dry_run: bool,
}

impl ContentLedger {
    /// Load the ledger from `store`.
    ///
    /// A missing or unreadable document yields an empty ledger and a warning;
    /// startup never fails here.
    pub fn open(store: Arc<dyn LedgerStore>, dry_run: bool) -> Self {
        let document = match store.load() {
            Ok(Some(document)) => {
                let document = repair(document);
                info!(
                    location = %store.describe(),
                    entries = document.entries.len(),
                    "Loaded content ledger"
                );
                document
            }
            Ok(None) => {
                warn!(
                    location = %store.describe(),
                    "Content ledger not found; starting empty. Previously published items will not be detected as duplicates"
                );
                LedgerDocument::default()
            }
            Err(e) => {
                warn!(
                    location = %store.describe(),
                    error = %e,
                    "Content ledger unreadable; starting empty. Previously published items will not be detected as duplicates"
                );
                LedgerDocument::default()
            }
        };

        let index = document
            .entries
            .iter()
            .map(|entry| entry.fingerprint.clone())
            .collect();
        let reserved = ContentKind::ALL
            .iter()
            .map(|kind| (*kind, document.counter(*kind)))
            .collect();

        Self {
            state: Mutex::new(LedgerState {
                document,
                index,
                reserved,
                pending_durable: false,
            }),
            store,
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// True iff an entry with the normalized fingerprint of `(kind, topic, locale)` exists.
    pub fn is_duplicate(&self, kind: ContentKind, topic: &str, locale: Option<&str>) -> bool {
        self.contains_fingerprint(&fingerprint(kind, topic, locale))
    }

    pub fn contains_fingerprint(&self, fingerprint: &str) -> bool {
        self.state.lock().index.contains(fingerprint)
    }

    /// Reserve the next sequence number for `kind`.
    pub fn next_sequence(&self, kind: ContentKind) -> u64 {
        let mut state = self.state.lock();
        let persisted = state.document.counter(kind);
        let reserved = state.reserved.entry(kind).or_insert(persisted);
        *reserved = (*reserved).max(persisted) + 1;
        debug!(kind = %kind, sequence = *reserved, "Reserved sequence number");
        *reserved
    }

    /// Return an unused reservation.
    ///
    /// Only the most recent reservation can be rewound; returns whether it was.
    pub fn release_sequence(&self, kind: ContentKind, sequence: u64) -> bool {
        let mut state = self.state.lock();
        let persisted = state.document.counter(kind);
        let reserved = state.reserved.entry(kind).or_insert(persisted);
        if *reserved == sequence && sequence > persisted {
            *reserved = sequence - 1;
            debug!(kind = %kind, sequence, "Released sequence number");
            true
        } else {
            warn!(
                kind = %kind,
                sequence,
                "Sequence reservation abandoned after later reservations; it will be reused next run"
            );
            false
        }
    }

    /// Highest durably recorded sequence for `kind`.
    pub fn sequence_counter(&self, kind: ContentKind) -> u64 {
        self.state.lock().document.counter(kind)
    }

    /// Append an entry and persist the whole document.
    ///
    /// Recording an already-known fingerprint is a no-op returning the existing entry.
    /// On a persistence failure the entry stays in memory (pending durable) and the
    /// error is returned so the caller can stop before publishing anything else.
    pub fn record(&self, draft: EntryDraft) -> Result<RecordOutcome, LedgerError> {
        let fingerprint = fingerprint(draft.kind, &draft.topic, draft.locale.as_deref());
        let mut state = self.state.lock();

        if state.index.contains(&fingerprint) {
            let existing = state
                .document
                .entries
                .iter()
                .find(|entry| entry.fingerprint == fingerprint)
                .cloned();
            if let Some(existing) = existing {
                debug!(kind = %draft.kind, topic = %draft.topic, "Entry already recorded");
                return Ok(RecordOutcome::AlreadyRecorded(existing));
            }
        }

        if let Some(sequence) = draft.sequence {
            let taken = state
                .document
                .entries
                .iter()
                .any(|entry| entry.kind == draft.kind && entry.sequence == Some(sequence));
            if taken {
                return Err(LedgerError::SequenceConflict {
                    kind: draft.kind.to_string(),
                    sequence,
                });
            }
            let counter = state.document.counter(draft.kind).max(sequence);
            state.document.set_counter(draft.kind, counter);
            let reserved = state.reserved.entry(draft.kind).or_insert(counter);
            *reserved = (*reserved).max(counter);
        }

        let now = Utc::now();
        let entry = LedgerEntry {
            fingerprint: fingerprint.clone(),
            kind: draft.kind,
            topic: draft.topic,
            locale: draft.locale,
            sequence: draft.sequence,
            created_at: now,
            artifact_ref: draft.artifact_ref,
        };
        state.document.entries.push(entry.clone());
        state.document.last_updated = Some(now);
        state.index.insert(fingerprint);

        if self.dry_run {
            debug!(kind = %entry.kind, topic = %entry.topic, "Dry run: ledger entry kept in memory only");
            return Ok(RecordOutcome::Recorded(entry));
        }

        match self.store.persist(&state.document) {
            Ok(()) => {
                state.pending_durable = false;
                info!(
                    kind = %entry.kind,
                    topic = %entry.topic,
                    sequence = ?entry.sequence,
                    "Recorded ledger entry"
                );
                Ok(RecordOutcome::Recorded(entry))
            }
            Err(e) => {
                state.pending_durable = true;
                error!(
                    location = %self.store.describe(),
                    kind = %entry.kind,
                    topic = %entry.topic,
                    error = %e,
                    "Ledger persistence failed; entry is pending durable and needs reconciliation"
                );
                Err(e)
            }
        }
    }

    /// Whether the in-memory ledger holds entries not yet durably stored.
    pub fn pending_durable(&self) -> bool {
        self.state.lock().pending_durable
    }

    /// Retry persisting after an earlier failure.
    pub fn flush_pending(&self) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if !state.pending_durable || self.dry_run {
            return Ok(());
        }
        self.store.persist(&state.document)?;
        state.pending_durable = false;
        info!(location = %self.store.describe(), "Pending ledger entries persisted");
        Ok(())
    }

    /// Entries of `kind`: sequenced entries by sequence descending, others newest first.
    pub fn entries(&self, kind: ContentKind) -> Vec<LedgerEntry> {
        let state = self.state.lock();
        let mut entries: Vec<LedgerEntry> = state
            .document
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.sequence
                .cmp(&a.sequence)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        entries
    }

    pub fn stats(&self) -> LedgerStats {
        let state = self.state.lock();
        let mut per_kind: BTreeMap<String, KindStats> = BTreeMap::new();
        for entry in &state.document.entries {
            per_kind.entry(entry.kind.to_string()).or_default().entries += 1;
        }
        for (kind, counter) in &state.document.sequence_counters {
            per_kind.entry(kind.clone()).or_default().last_sequence = *counter;
        }
        LedgerStats {
            total_entries: state.document.entries.len(),
            per_kind,
            last_updated: state.document.last_updated,
            pending_durable: state.pending_durable,
        }
    }

    /// Copy of the in-memory document.
    pub fn snapshot(&self) -> LedgerDocument {
        self.state.lock().document.clone()
    }
}

/// Bring a loaded document back in line with the ledger invariants.
///
/// Fingerprints are recomputed with the current normalization, later duplicates
/// are dropped, and counters are raised to the highest recorded sequence.
fn repair(mut document: LedgerDocument) -> LedgerDocument {
    let mut seen = HashSet::new();
    let before = document.entries.len();
    let mut rehashed = 0usize;

    document.entries.retain_mut(|entry| {
        let expected = fingerprint(entry.kind, &entry.topic, entry.locale.as_deref());
        if entry.fingerprint != expected {
            entry.fingerprint = expected;
            rehashed += 1;
        }
        seen.insert(entry.fingerprint.clone())
    });

    let dropped = before - document.entries.len();
    if dropped > 0 || rehashed > 0 {
        warn!(dropped, rehashed, "Repaired ledger entries on load");
    }

    let mut highest: HashMap<ContentKind, u64> = HashMap::new();
    for entry in &document.entries {
        if let Some(sequence) = entry.sequence {
            let slot = highest.entry(entry.kind).or_insert(0);
            *slot = (*slot).max(sequence);
        }
    }
    for (kind, sequence) in highest {
        if document.counter(kind) < sequence {
            document.set_counter(kind, sequence);
        }
    }
    document
}
