//! Shared test utilities for integration tests
//!
//! Scripted in-process providers and helpers for building generation contexts.

use async_trait::async_trait;
use parking_lot::Mutex;
use scribe::context::GenerationContext;
use scribe::error::ProviderError;
use scribe::ledger::{ContentLedger, LedgerStore, MemoryLedgerStore};
use scribe::provider::{ContentProvider, ProviderDescriptor, ProviderRegistry, RegisteredProvider};
use scribe::telemetry::UsageTelemetry;
use scribe::types::{ContentKind, GenerationRequest};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One scripted provider response.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    ServerError,
    RateLimited,
    /// Never answers; the cascade's call timeout must fire
    Hang,
}

/// Provider that plays back a script; the last step repeats once the script is exhausted.
pub struct ScriptedProvider {
    id: String,
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedProvider {
    pub fn new(id: &str, steps: Vec<Step>) -> Arc<Self> {
        Self::with_delay(id, steps, Duration::ZERO)
    }

    pub fn with_delay(id: &str, steps: Vec<Step>, delay: Duration) -> Arc<Self> {
        let last = steps.last().cloned().unwrap_or(Step::ServerError);
        Arc::new(Self {
            id: id.to_string(),
            steps: Mutex::new(steps.into()),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn call(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.last.lock().clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match step {
            Step::Reply(raw) => Ok(raw),
            Step::ServerError => Err(ProviderError::ServerError {
                status: 503,
                message: "unavailable".to_string(),
            }),
            Step::RateLimited => Err(ProviderError::RateLimited("slow down".to_string())),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

/// Register `provider` at `priority` with a short call timeout.
pub fn register(provider: &Arc<ScriptedProvider>, priority: u32) -> RegisteredProvider {
    RegisteredProvider {
        descriptor: ProviderDescriptor::new(provider.id(), priority, Duration::from_millis(100)),
        client: provider.clone(),
    }
}

/// Register `provider` for a subset of kinds only.
pub fn register_for(
    provider: &Arc<ScriptedProvider>,
    priority: u32,
    kinds: &[ContentKind],
) -> RegisteredProvider {
    RegisteredProvider {
        descriptor: ProviderDescriptor::new(provider.id(), priority, Duration::from_millis(100))
            .with_capabilities(kinds.iter().copied()),
        client: provider.clone(),
    }
}

pub fn context_with(providers: Vec<RegisteredProvider>) -> Arc<GenerationContext> {
    context_with_store(providers, Arc::new(MemoryLedgerStore::new()), false)
}

pub fn context_with_store(
    providers: Vec<RegisteredProvider>,
    store: Arc<dyn LedgerStore>,
    dry_run: bool,
) -> Arc<GenerationContext> {
    Arc::new(GenerationContext::new(
        ProviderRegistry::new(providers).unwrap(),
        ContentLedger::open(store, dry_run),
        UsageTelemetry::with_session("run-integration"),
    ))
}

/// Free text comfortably over `words` words.
pub fn words(words: usize) -> String {
    vec!["gift"; words].join(" ")
}
