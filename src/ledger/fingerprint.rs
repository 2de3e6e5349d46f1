//! Topic normalization and fingerprint computation for deduplication.
//!
//! Fingerprint = blake3("kind:" || kind || "\0topic:" || normalize(topic) [|| "\0locale:" || normalize(locale)])
//!
//! Inconsistent normalization is the usual source of duplicate publication, so
//! every comparison in the ledger goes through [`normalize_topic`].

use crate::types::ContentKind;
use blake3::Hasher;
use unicode_normalization::UnicodeNormalization;

/// Normalize free text for comparison.
///
/// 1. Unicode NFKC (composed forms, compatibility characters folded)
/// 2. Lowercase
/// 3. Trim and collapse internal whitespace runs to a single space
pub fn normalize_topic(topic: &str) -> String {
    let folded: String = topic.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compute the hex fingerprint identifying `(kind, topic[, locale])`.
///
/// A locale that normalizes to the empty string is treated as absent.
pub fn fingerprint(kind: ContentKind, topic: &str, locale: Option<&str>) -> String {
    let mut hasher = Hasher::new();

    hasher.update(b"kind:");
    hasher.update(kind.as_str().as_bytes());

    hasher.update(b"\x00topic:");
    hasher.update(normalize_topic(topic).as_bytes());

    if let Some(locale) = locale.map(normalize_topic).filter(|l| !l.is_empty()) {
        hasher.update(b"\x00locale:");
        hasher.update(locale.as_bytes());
    }

    hex::encode(hasher.finalize().as_bytes())
}
