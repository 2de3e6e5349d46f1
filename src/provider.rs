//! Content Provider Abstraction
//!
//! Unified interface over the external generation providers the cascade
//! consumes. A provider turns a [`GenerationRequest`] into raw output or a
//! [`ProviderError`]; it never validates its own output.

use crate::error::ProviderError;
use crate::types::{ContentKind, GenerationRequest};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Duration;

pub mod clients;
pub mod profile;
pub mod prompt;
pub mod registry;

pub use clients::ProviderFactory;
pub use profile::{ProviderConfig, ProviderType};
pub use registry::{ProviderRegistry, RegisteredProvider};

/// A generation provider.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    fn id(&self) -> &str;

    /// Whether the provider can be called at all (e.g. credentials present).
    ///
    /// An error here makes the cascade skip the provider without counting an attempt.
    fn check_ready(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Produce raw output for `request`.
    async fn call(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

/// Result of one provider call.
#[derive(Debug)]
pub enum ProviderCallOutcome {
    Success(String),
    Failure(ProviderError),
}

impl From<Result<String, ProviderError>> for ProviderCallOutcome {
    fn from(result: Result<String, ProviderError>) -> Self {
        match result {
            Ok(raw) => ProviderCallOutcome::Success(raw),
            Err(error) => ProviderCallOutcome::Failure(error),
        }
    }
}

/// Static capability descriptor for a registered provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: String,
    /// Ascending: lower priorities are tried first
    pub priority: u32,
    pub capabilities: BTreeSet<ContentKind>,
    pub call_timeout: Duration,
    pub enabled: bool,
}

impl ProviderDescriptor {
    /// Enabled descriptor advertising every content kind.
    pub fn new(id: impl Into<String>, priority: u32, call_timeout: Duration) -> Self {
        Self {
            id: id.into(),
            priority,
            capabilities: ContentKind::ALL.iter().copied().collect(),
            call_timeout,
            enabled: true,
        }
    }

    pub fn with_capabilities<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ContentKind>,
    {
        self.capabilities = kinds.into_iter().collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn serves(&self, kind: ContentKind) -> bool {
        self.enabled && self.capabilities.contains(&kind)
    }

    pub fn from_config(id: &str, config: &ProviderConfig) -> Self {
        Self {
            id: id.to_string(),
            priority: config.priority,
            capabilities: config.capability_set(),
            call_timeout: config.call_timeout(),
            enabled: config.enabled,
        }
    }
}
