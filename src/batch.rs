//! Batch runs
//!
//! Caller-side orchestration around the cascade: dedup before generating,
//! publish, then record. Items run with bounded parallelism; the ledger is
//! the only state they share.
//!
//! Sequenced items reserve, publish and record while holding one async gate,
//! so a failed publish can always hand its number back and the recorded
//! sequence range stays contiguous. Generation itself runs outside the gate.

pub mod publisher;

pub use publisher::{slugify, DirectoryPublisher, Publisher};

use crate::cascade::CascadeController;
use crate::context::GenerationContext;
use crate::error::{ApiError, LedgerError};
use crate::ledger::{fingerprint, EntryDraft, RecordOutcome};
use crate::telemetry::UsageSummary;
use crate::types::{ArtifactSource, ContentKind, GenerationRequest};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// One caller-requested item.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub request: GenerationRequest,
    /// Whether the item takes the next sequence number of its kind
    pub sequenced: bool,
}

impl BatchItem {
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            request,
            sequenced: false,
        }
    }

    pub fn sequenced(request: GenerationRequest) -> Self {
        Self {
            request,
            sequenced: true,
        }
    }
}

/// Cooperative stop flag: once triggered no new item starts.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Generated {
        source: ArtifactSource,
        sequence: Option<u64>,
        artifact_ref: Option<String>,
    },
    SkippedDuplicate,
    PublishFailed {
        reason: String,
    },
    /// Over the per-run item limit; eligible next run
    Deferred,
    /// Not started because the run was stopped
    Cancelled,
    /// Published, but the ledger could not persist the record
    RecordFailed {
        reason: String,
    },
}

impl ItemOutcome {
    /// Short label for reports: provider id, "procedural", "skipped-duplicate", ...
    pub fn label(&self) -> String {
        match self {
            ItemOutcome::Generated { source, .. } => source.id().to_string(),
            ItemOutcome::SkippedDuplicate => "skipped-duplicate".to_string(),
            ItemOutcome::PublishFailed { .. } => "publish-failed".to_string(),
            ItemOutcome::Deferred => "deferred".to_string(),
            ItemOutcome::Cancelled => "cancelled".to_string(),
            ItemOutcome::RecordFailed { .. } => "record-failed".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub kind: ContentKind,
    pub topic: String,
    pub locale: Option<String>,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// One report per input item, in input order
    pub items: Vec<ItemReport>,
    pub usage: UsageSummary,
    pub dry_run: bool,
}

impl BatchReport {
    fn count(&self, predicate: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| predicate(&item.outcome)).count()
    }

    /// Items generated by a real provider.
    pub fn successes(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Generated { source, .. } if !source.is_procedural()))
    }

    pub fn fallbacks(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Generated { source, .. } if source.is_procedural()))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::SkippedDuplicate))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                ItemOutcome::PublishFailed { .. } | ItemOutcome::RecordFailed { .. }
            )
        })
    }

    pub fn deferred(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Deferred))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Cancelled))
    }
}

/// A run stopped by a ledger persistence failure; the partial report is kept.
#[derive(Debug, Error)]
#[error("Run aborted: {source}")]
pub struct RunAborted {
    pub report: BatchReport,
    #[source]
    pub source: LedgerError,
}

impl From<RunAborted> for ApiError {
    fn from(aborted: RunAborted) -> Self {
        ApiError::Ledger(aborted.source)
    }
}

/// Runner limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub max_items_per_run: usize,
    pub parallelism: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_items_per_run: 10,
            parallelism: 4,
        }
    }
}

impl From<&crate::config::RunConfig> for BatchOptions {
    fn from(run: &crate::config::RunConfig) -> Self {
        Self {
            max_items_per_run: run.max_items_per_run,
            parallelism: run.parallelism,
        }
    }
}

pub struct BatchRunner {
    context: Arc<GenerationContext>,
    cascade: CascadeController,
    publisher: Arc<dyn Publisher>,
    options: BatchOptions,
    shutdown: ShutdownSignal,
    sequence_gate: tokio::sync::Mutex<()>,
}

impl BatchRunner {
    pub fn new(
        context: Arc<GenerationContext>,
        publisher: Arc<dyn Publisher>,
        options: BatchOptions,
    ) -> Self {
        Self {
            cascade: CascadeController::new(context.clone()),
            context,
            publisher,
            options,
            shutdown: ShutdownSignal::new(),
            sequence_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Run `items` to completion, or until stopped.
    ///
    /// Duplicates (against the ledger and within the batch) are skipped before
    /// any generation and do not count towards the per-run limit.
    pub async fn run(&self, items: Vec<BatchItem>) -> Result<BatchReport, RunAborted> {
        let ledger = &self.context.ledger;
        let mut outcomes: Vec<Option<ItemOutcome>> = vec![None; items.len()];
        let mut claimed = HashSet::new();
        let mut work = Vec::new();

        for (index, item) in items.iter().enumerate() {
            let request = &item.request;
            let key = fingerprint(request.kind, &request.topic, request.locale.as_deref());
            if ledger.contains_fingerprint(&key) || !claimed.insert(key) {
                info!(kind = %request.kind, topic = %request.topic, "Skipping duplicate");
                outcomes[index] = Some(ItemOutcome::SkippedDuplicate);
            } else if work.len() >= self.options.max_items_per_run {
                outcomes[index] = Some(ItemOutcome::Deferred);
            } else {
                work.push(index);
            }
        }

        info!(
            requested = items.len(),
            scheduled = work.len(),
            parallelism = self.options.parallelism,
            "Starting batch"
        );

        let halted = AtomicBool::new(false);
        let failure: Mutex<Option<LedgerError>> = Mutex::new(None);
        let items_ref = &items;
        let halted_ref = &halted;
        let failure_ref = &failure;

        let results: Vec<(usize, ItemOutcome)> = stream::iter(work)
            .map(|index| async move {
                if self.shutdown.is_triggered() || halted_ref.load(Ordering::SeqCst) {
                    return (index, ItemOutcome::Cancelled);
                }
                match self.process(&items_ref[index]).await {
                    Ok(outcome) => (index, outcome),
                    Err(e) => {
                        error!(error = %e, "Ledger persistence failed; stopping run");
                        halted_ref.store(true, Ordering::SeqCst);
                        let reason = e.to_string();
                        failure_ref.lock().get_or_insert(e);
                        (index, ItemOutcome::RecordFailed { reason })
                    }
                }
            })
            .buffer_unordered(self.options.parallelism.max(1))
            .collect()
            .await;

        for (index, outcome) in results {
            outcomes[index] = Some(outcome);
        }

        let report = BatchReport {
            items: items
                .into_iter()
                .zip(outcomes)
                .map(|(item, outcome)| ItemReport {
                    kind: item.request.kind,
                    topic: item.request.topic,
                    locale: item.request.locale,
                    outcome: outcome.unwrap_or(ItemOutcome::Cancelled),
                })
                .collect(),
            usage: self.context.telemetry.summary(),
            dry_run: ledger.is_dry_run(),
        };

        info!(
            generated = report.successes(),
            fallbacks = report.fallbacks(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Batch finished"
        );

        match failure.into_inner() {
            Some(source) => Err(RunAborted { report, source }),
            None => Ok(report),
        }
    }

    /// Record on the blocking pool; persisting writes and syncs the ledger file.
    async fn record(&self, draft: EntryDraft) -> Result<RecordOutcome, LedgerError> {
        let ledger = Arc::clone(&self.context.ledger);
        tokio::task::spawn_blocking(move || ledger.record(draft))
            .await
            .map_err(|e| LedgerError::Backend(format!("Ledger write task failed: {}", e)))?
    }

    async fn process(&self, item: &BatchItem) -> Result<ItemOutcome, LedgerError> {
        let request = &item.request;
        let ledger = &self.context.ledger;
        let artifact = self.cascade.generate(request).await;
        let source = artifact.source.clone();

        let _gate = if item.sequenced {
            Some(self.sequence_gate.lock().await)
        } else {
            None
        };
        let sequence = item.sequenced.then(|| ledger.next_sequence(request.kind));

        if ledger.is_dry_run() {
            ledger.record(EntryDraft::from_request(request).with_sequence(sequence))?;
            info!(kind = %request.kind, topic = %request.topic, source = %source, "Dry run: not published");
            return Ok(ItemOutcome::Generated {
                source,
                sequence,
                artifact_ref: None,
            });
        }

        let artifact_ref = match self.publisher.publish(&artifact, request, sequence).await {
            Ok(artifact_ref) => artifact_ref,
            Err(e) => {
                if let Some(sequence) = sequence {
                    ledger.release_sequence(request.kind, sequence);
                }
                warn!(kind = %request.kind, topic = %request.topic, error = %e, "Publish failed; item not recorded");
                return Ok(ItemOutcome::PublishFailed {
                    reason: e.to_string(),
                });
            }
        };

        let draft = EntryDraft::from_request(request)
            .with_sequence(sequence)
            .with_artifact_ref(artifact_ref.clone());
        if let RecordOutcome::AlreadyRecorded(existing) = self.record(draft).await? {
            warn!(topic = %existing.topic, "Item was recorded concurrently");
        }

        Ok(ItemOutcome::Generated {
            source,
            sequence,
            artifact_ref: Some(artifact_ref),
        })
    }
}
