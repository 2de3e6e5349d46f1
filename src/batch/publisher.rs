//! Publishing: the caller-side external side effect that precedes a ledger record.

use crate::error::ApiError;
use crate::ledger::normalize_topic;
use crate::types::{ContentArtifact, GenerationRequest};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_SLUG_LEN: usize = 60;

/// External side effect for a finished artifact.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `artifact` and return a reference to it (file name, URL, id).
    async fn publish(
        &self,
        artifact: &ContentArtifact,
        request: &GenerationRequest,
        sequence: Option<u64>,
    ) -> Result<String, ApiError>;
}

/// Writes each artifact as pretty JSON under `{root}/{kind}/`.
pub struct DirectoryPublisher {
    root: PathBuf,
}

impl DirectoryPublisher {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Relative file name: `{kind}/{sequence:03}-{slug}.json`, or `{kind}/{slug}.json`.
    pub fn relative_path(request: &GenerationRequest, sequence: Option<u64>) -> PathBuf {
        let mut stem = slugify(&request.topic);
        if let Some(locale) = request.locale.as_deref().map(slugify).filter(|s| !s.is_empty()) {
            stem = format!("{}-{}", stem, locale);
        }
        let file_name = match sequence {
            Some(sequence) => format!("{:03}-{}.json", sequence, stem),
            None => format!("{}.json", stem),
        };
        PathBuf::from(request.kind.as_str()).join(file_name)
    }
}

#[async_trait]
impl Publisher for DirectoryPublisher {
    async fn publish(
        &self,
        artifact: &ContentArtifact,
        request: &GenerationRequest,
        sequence: Option<u64>,
    ) -> Result<String, ApiError> {
        let relative = Self::relative_path(request, sequence);
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ApiError::PublishFailed(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let serialized = serde_json::to_vec_pretty(artifact)
            .map_err(|e| ApiError::PublishFailed(format!("Failed to serialize artifact: {}", e)))?;
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &serialized)
            .await
            .map_err(|e| ApiError::PublishFailed(format!("Failed to write {}: {}", temp_path.display(), e)))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| ApiError::PublishFailed(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), "Published artifact");
        Ok(relative.to_string_lossy().replace('\\', "/"))
    }
}

/// File-name-safe form of `text`: normalized, ASCII alphanumerics and single dashes.
pub fn slugify(text: &str) -> String {
    let normalized = normalize_topic(text);
    let mut slug = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let mut slug: String = slug.chars().take(MAX_SLUG_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}
