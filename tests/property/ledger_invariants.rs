//! Property-based tests for fingerprint stability and gap-free sequences

use proptest::prelude::*;
use scribe::ledger::{fingerprint, normalize_topic, ContentLedger, EntryDraft, MemoryLedgerStore};
use scribe::types::ContentKind;
use std::sync::Arc;

fn kind_strategy() -> impl Strategy<Value = ContentKind> {
    prop::sample::select(ContentKind::ALL.to_vec())
}

/// Normalizing twice is the same as normalizing once
#[test]
fn test_normalization_is_idempotent() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&"[ \t\nA-Za-z0-9\u{e0}\u{e9}\u{c9}\u{df}\u{ff21}-\u{ff3a}]{0,40}", |topic| {
            let once = normalize_topic(&topic);
            prop_assert_eq!(normalize_topic(&once), once.clone());
            prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
            prop_assert!(!once.contains("  "));
            Ok(())
        })
        .unwrap();
}

/// Case and whitespace variations of a topic collapse to one fingerprint
#[test]
fn test_fingerprint_ignores_case_and_spacing() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                kind_strategy(),
                prop::collection::vec("[a-z0-9]{1,8}", 1..5),
                "[ \t]{0,3}",
            ),
            |(kind, words, padding)| {
                let plain = words.join(" ");
                let noisy = format!(
                    "{}{}{}",
                    padding,
                    words
                        .iter()
                        .map(|w| w.to_uppercase())
                        .collect::<Vec<_>>()
                        .join("  \t"),
                    padding
                );
                prop_assert_eq!(fingerprint(kind, &plain, None), fingerprint(kind, &noisy, None));
                prop_assert_eq!(
                    fingerprint(kind, &plain, Some("")),
                    fingerprint(kind, &plain, None)
                );
                Ok(())
            },
        )
        .unwrap();
}

/// Distinct kinds never share a fingerprint for the same topic
#[test]
fn test_fingerprint_separates_kinds() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(kind_strategy(), kind_strategy(), ".{0,30}"), |(a, b, topic)| {
            prop_assume!(a != b);
            prop_assert_ne!(fingerprint(a, &topic, None), fingerprint(b, &topic, None));
            Ok(())
        })
        .unwrap();
}

/// Reserving, then either recording or releasing each sequence leaves recorded
/// sequences exactly 1..=n with no gaps
#[test]
fn test_recorded_sequences_are_contiguous() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(any::<bool>(), 0..40), |publishes| {
            let ledger = ContentLedger::open(Arc::new(MemoryLedgerStore::new()), false);
            for (index, published) in publishes.iter().enumerate() {
                let sequence = ledger.next_sequence(ContentKind::Podcast);
                if *published {
                    ledger
                        .record(
                            EntryDraft::new(ContentKind::Podcast, format!("topic {}", index))
                                .with_sequence(Some(sequence)),
                        )
                        .unwrap();
                } else {
                    prop_assert!(ledger.release_sequence(ContentKind::Podcast, sequence));
                }
            }

            let recorded = publishes.iter().filter(|p| **p).count() as u64;
            let mut sequences: Vec<u64> = ledger
                .entries(ContentKind::Podcast)
                .iter()
                .filter_map(|entry| entry.sequence)
                .collect();
            sequences.sort_unstable();
            prop_assert_eq!(sequences, (1..=recorded).collect::<Vec<u64>>());
            prop_assert_eq!(ledger.sequence_counter(ContentKind::Podcast), recorded);
            Ok(())
        })
        .unwrap();
}
