//! Ledger durability across process restarts, for both backends.

use scribe::ledger::{
    ContentLedger, EntryDraft, JsonFileStore, LedgerDocument, LedgerStore, RecordOutcome,
    SledLedgerStore,
};
use scribe::types::ContentKind;
use std::sync::Arc;
use tempfile::TempDir;

fn json_ledger(path: &std::path::Path) -> ContentLedger {
    ContentLedger::open(Arc::new(JsonFileStore::new(path)), false)
}

#[test]
fn test_recorded_topic_is_duplicate_after_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data").join("content_ledger.json");

    {
        let ledger = json_ledger(&path);
        let sequence = ledger.next_sequence(ContentKind::Seo);
        ledger
            .record(
                EntryDraft::new(ContentKind::Seo, "Gifts")
                    .with_locale("New York")
                    .with_sequence(Some(sequence))
                    .with_artifact_ref("seo/001-gifts-new-york.json"),
            )
            .unwrap();
    }

    let reopened = json_ledger(&path);
    assert!(reopened.is_duplicate(ContentKind::Seo, "gifts", Some("new  york")));
    assert!(!reopened.is_duplicate(ContentKind::Seo, "Gifts", Some("Boston")));
    assert!(!reopened.is_duplicate(ContentKind::Blog, "Gifts", Some("New York")));
    assert_eq!(reopened.sequence_counter(ContentKind::Seo), 1);
    assert_eq!(reopened.next_sequence(ContentKind::Seo), 2);

    let entries = reopened.entries(ContentKind::Seo);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].artifact_ref.as_deref(), Some("seo/001-gifts-new-york.json"));
}

#[test]
fn test_deleted_ledger_file_starts_fresh() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("content_ledger.json");

    {
        let ledger = json_ledger(&path);
        let sequence = ledger.next_sequence(ContentKind::Podcast);
        ledger
            .record(EntryDraft::new(ContentKind::Podcast, "Gifts").with_sequence(Some(sequence)))
            .unwrap();
        assert!(ledger.is_duplicate(ContentKind::Podcast, "Gifts", None));
    }

    std::fs::remove_file(&path).unwrap();

    let reopened = json_ledger(&path);
    assert!(!reopened.is_duplicate(ContentKind::Podcast, "Gifts", None));
    assert_eq!(reopened.stats().total_entries, 0);
    assert_eq!(reopened.next_sequence(ContentKind::Podcast), 1);
}

#[test]
fn test_ledger_document_uses_camel_case_layout() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("content_ledger.json");
    let ledger = json_ledger(&path);
    let sequence = ledger.next_sequence(ContentKind::Podcast);
    ledger
        .record(EntryDraft::new(ContentKind::Podcast, "Gifts").with_sequence(Some(sequence)))
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["sequenceCounters"]["podcast"], 1);
    assert_eq!(raw["entries"][0]["kind"], "podcast");
    assert!(raw["entries"][0]["createdAt"].is_string());
    assert!(raw["lastUpdated"].is_string());
}

#[test]
fn test_malformed_ledger_starts_empty_and_is_replaced_on_record() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("content_ledger.json");
    std::fs::write(&path, "{ not json").unwrap();

    let ledger = json_ledger(&path);
    assert_eq!(ledger.stats().total_entries, 0);
    assert!(matches!(
        ledger.record(EntryDraft::new(ContentKind::Blog, "Gifts")).unwrap(),
        RecordOutcome::Recorded(_)
    ));

    let reopened = json_ledger(&path);
    assert!(reopened.is_duplicate(ContentKind::Blog, "Gifts", None));
}

#[test]
fn test_hand_edited_counter_below_entries_is_repaired() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("content_ledger.json");
    std::fs::write(
        &path,
        r#"{
  "sequenceCounters": { "podcast": 1 },
  "entries": [
    {
      "fingerprint": "stale",
      "kind": "podcast",
      "topic": "Birthday Gifts",
      "sequence": 7,
      "createdAt": "2024-03-01T10:00:00Z"
    }
  ]
}"#,
    )
    .unwrap();

    let ledger = json_ledger(&path);
    assert!(ledger.is_duplicate(ContentKind::Podcast, "birthday gifts", None));
    assert_eq!(ledger.next_sequence(ContentKind::Podcast), 8);
}

#[test]
fn test_sled_backend_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger.sled");

    {
        let store: Arc<dyn LedgerStore> = Arc::new(SledLedgerStore::open(&path).unwrap());
        let ledger = ContentLedger::open(store, false);
        for topic in ["Gifts", "Toys", "Cards"] {
            let sequence = ledger.next_sequence(ContentKind::Podcast);
            ledger
                .record(EntryDraft::new(ContentKind::Podcast, topic).with_sequence(Some(sequence)))
                .unwrap();
        }
    }

    let store = SledLedgerStore::open(&path).unwrap();
    let document: LedgerDocument = store.load().unwrap().unwrap();
    assert_eq!(document.entries.len(), 3);
    assert_eq!(document.counter(ContentKind::Podcast), 3);

    let ledger = ContentLedger::open(Arc::new(store), false);
    assert!(ledger.is_duplicate(ContentKind::Podcast, "TOYS", None));
    assert_eq!(ledger.stats().per_kind["podcast"].last_sequence, 3);
}
