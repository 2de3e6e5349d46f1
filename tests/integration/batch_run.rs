//! End-to-end batch runs: parallel generation, publishing, and ledger recording.

use super::test_utils::{context_with_store, register, words, ScriptedProvider, Step};
use async_trait::async_trait;
use scribe::batch::{
    BatchItem, BatchOptions, BatchRunner, DirectoryPublisher, ItemOutcome, Publisher,
};
use scribe::error::ApiError;
use scribe::ledger::{JsonFileStore, MemoryLedgerStore};
use scribe::types::{ContentArtifact, ContentKind, GenerationRequest, MinLength};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn podcast_items(topics: &[String]) -> Vec<BatchItem> {
    topics
        .iter()
        .map(|topic| {
            BatchItem::sequenced(GenerationRequest::free_text(
                ContentKind::Podcast,
                topic.clone(),
                MinLength::words(500),
            ))
        })
        .collect()
}

fn topics(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("Gift Idea {}", i)).collect()
}

fn sorted_sequences(outcomes: impl Iterator<Item = ItemOutcome>) -> Vec<u64> {
    let mut sequences: Vec<u64> = outcomes
        .filter_map(|outcome| match outcome {
            ItemOutcome::Generated { sequence, .. } => sequence,
            _ => None,
        })
        .collect();
    sequences.sort_unstable();
    sequences
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_run_assigns_contiguous_sequences() {
    let temp_dir = TempDir::new().unwrap();
    let ledger_path = temp_dir.path().join("content_ledger.json");
    let output = temp_dir.path().join("output");

    let fast = ScriptedProvider::with_delay(
        "fast",
        vec![Step::ServerError, Step::Reply(words(700))],
        Duration::from_millis(5),
    );
    let backup = ScriptedProvider::with_delay(
        "backup",
        vec![Step::Reply(words(700))],
        Duration::from_millis(15),
    );
    let context = context_with_store(
        vec![register(&fast, 1), register(&backup, 2)],
        Arc::new(JsonFileStore::new(&ledger_path)),
        false,
    );
    let runner = BatchRunner::new(
        context.clone(),
        Arc::new(DirectoryPublisher::new(&output)),
        BatchOptions {
            max_items_per_run: 10,
            parallelism: 4,
        },
    );

    let report = runner.run(podcast_items(&topics(10))).await.unwrap();

    assert_eq!(report.successes(), 10);
    assert_eq!(
        sorted_sequences(report.items.iter().map(|i| i.outcome.clone())),
        (1..=10).collect::<Vec<u64>>()
    );
    assert_eq!(context.ledger.sequence_counter(ContentKind::Podcast), 10);
    assert_eq!(std::fs::read_dir(output.join("podcast")).unwrap().count(), 10);
    assert_eq!(report.usage.total_requests, 10);
    assert_eq!(report.usage.provider("fast").unwrap().counter.failures, 1);

    // Same topics again: nothing is generated or published
    let calls_before = fast.calls() + backup.calls();
    let again = runner.run(podcast_items(&topics(10))).await.unwrap();
    assert_eq!(again.skipped(), 10);
    assert_eq!(fast.calls() + backup.calls(), calls_before);
}

#[tokio::test]
async fn test_deferred_items_are_picked_up_by_next_run() {
    let temp_dir = TempDir::new().unwrap();
    let context = context_with_store(
        Vec::new(),
        Arc::new(MemoryLedgerStore::new()),
        false,
    );
    let runner = BatchRunner::new(
        context.clone(),
        Arc::new(DirectoryPublisher::new(temp_dir.path())),
        BatchOptions {
            max_items_per_run: 10,
            parallelism: 3,
        },
    );

    let mut list = topics(12);
    list.insert(0, "gift idea 3".to_string());
    let first = runner.run(podcast_items(&list)).await.unwrap();
    assert_eq!(first.fallbacks(), 10);
    assert_eq!(first.deferred(), 2);
    // the duplicate of "Gift Idea 3" appears later in the list
    assert_eq!(first.skipped(), 1);

    let second = runner.run(podcast_items(&list)).await.unwrap();
    assert_eq!(second.fallbacks(), 2);
    assert_eq!(second.skipped(), 11);
    assert_eq!(
        sorted_sequences(second.items.iter().map(|i| i.outcome.clone())),
        vec![11, 12]
    );
}

/// Delegates to a directory publisher but fails for one topic.
struct FailingFor {
    topic: String,
    inner: DirectoryPublisher,
}

#[async_trait]
impl Publisher for FailingFor {
    async fn publish(
        &self,
        artifact: &ContentArtifact,
        request: &GenerationRequest,
        sequence: Option<u64>,
    ) -> Result<String, ApiError> {
        if request.topic == self.topic {
            return Err(ApiError::PublishFailed("upload rejected".to_string()));
        }
        self.inner.publish(artifact, request, sequence).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_publish_leaves_no_sequence_gap() {
    let temp_dir = TempDir::new().unwrap();
    let context = context_with_store(Vec::new(), Arc::new(MemoryLedgerStore::new()), false);
    let runner = BatchRunner::new(
        context.clone(),
        Arc::new(FailingFor {
            topic: "Gift Idea 4".to_string(),
            inner: DirectoryPublisher::new(temp_dir.path()),
        }),
        BatchOptions {
            max_items_per_run: 10,
            parallelism: 4,
        },
    );

    let report = runner.run(podcast_items(&topics(8))).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(
        sorted_sequences(report.items.iter().map(|i| i.outcome.clone())),
        (1..=7).collect::<Vec<u64>>()
    );
    assert!(!context.ledger.is_duplicate(ContentKind::Podcast, "Gift Idea 4", None));
    assert_eq!(context.ledger.sequence_counter(ContentKind::Podcast), 7);
}

#[tokio::test]
async fn test_ledger_write_failure_aborts_with_partial_report() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryLedgerStore::new());
    store.set_fail_writes(true);
    let context = context_with_store(Vec::new(), store.clone(), false);
    let runner = BatchRunner::new(
        context.clone(),
        Arc::new(DirectoryPublisher::new(temp_dir.path())),
        BatchOptions {
            max_items_per_run: 10,
            parallelism: 1,
        },
    );

    let aborted = runner.run(podcast_items(&topics(5))).await.unwrap_err();

    assert_eq!(aborted.report.items.len(), 5);
    assert!(matches!(
        aborted.report.items[0].outcome,
        ItemOutcome::RecordFailed { .. }
    ));
    assert_eq!(aborted.report.cancelled(), 4);
    assert!(context.ledger.pending_durable());

    store.set_fail_writes(false);
    context.ledger.flush_pending().unwrap();
    assert!(!context.ledger.pending_durable());
    assert_eq!(store.stored().unwrap().entries.len(), 1);
}
