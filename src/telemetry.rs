//! Usage Telemetry
//!
//! Per-provider success, failure and rejection counters plus a distinct
//! procedural counter for one run. A rising procedural rate across runs is the
//! signal that an upstream provider is degraded. Every recorded outcome is also
//! appended to an in-memory event log with a monotonic sequence number.

mod types;

pub mod events;
pub mod summary;

pub use events::{
    AttemptSucceededData, ExhaustionData, OutputRejectedData, TelemetryEvent,
    TransientFailureData,
};
pub use summary::{ProviderUsage, UsageCounter, UsageSummary};
pub use types::{new_session_id, now_millis, now_rfc3339};

use crate::error::ProviderError;
use crate::types::GenerationRequest;
use crate::validator::Rejection;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Default)]
struct TelemetryState {
    counters: BTreeMap<String, UsageCounter>,
    procedural: u64,
    events: Vec<TelemetryEvent>,
    next_seq: u64,
}

impl TelemetryState {
    fn counter(&mut self, provider_id: &str) -> &mut UsageCounter {
        self.counters.entry(provider_id.to_string()).or_default()
    }

    fn push<T: Serialize>(&mut self, session: &str, event_type: &str, data: &T) {
        self.next_seq += 1;
        self.events.push(TelemetryEvent {
            ts: now_rfc3339(),
            session: session.to_string(),
            seq: self.next_seq,
            event_type: event_type.to_string(),
            data: serde_json::to_value(data).unwrap_or_default(),
        });
    }
}

/// Run-scoped usage telemetry sink, shared across concurrent cascades.
pub struct UsageTelemetry {
    session: String,
    state: Mutex<TelemetryState>,
}

impl Default for UsageTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageTelemetry {
    pub fn new() -> Self {
        Self::with_session(new_session_id())
    }

    pub fn with_session(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            state: Mutex::new(TelemetryState::default()),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn record_success(&self, provider_id: &str, request: &GenerationRequest, elapsed: Duration) {
        let mut state = self.state.lock();
        state.counter(provider_id).successes += 1;
        state.push(
            &self.session,
            events::ATTEMPT_SUCCEEDED,
            &AttemptSucceededData {
                provider_id: provider_id.to_string(),
                kind: request.kind.to_string(),
                topic: request.topic.clone(),
                duration_ms: elapsed.as_millis(),
            },
        );
    }

    pub fn record_failure(
        &self,
        provider_id: &str,
        request: &GenerationRequest,
        error: &ProviderError,
        elapsed: Option<Duration>,
    ) {
        let mut state = self.state.lock();
        let counter = state.counter(provider_id);
        counter.failures += 1;
        *counter
            .failure_reasons
            .entry(error.reason_code().to_string())
            .or_default() += 1;
        state.push(
            &self.session,
            events::TRANSIENT_FAILURE,
            &TransientFailureData {
                provider_id: provider_id.to_string(),
                kind: request.kind.to_string(),
                topic: request.topic.clone(),
                reason: error.reason_code().to_string(),
                error: error.to_string(),
                duration_ms: elapsed.map(|d| d.as_millis()),
            },
        );
    }

    pub fn record_rejection(
        &self,
        provider_id: &str,
        request: &GenerationRequest,
        rejection: &Rejection,
    ) {
        let mut state = self.state.lock();
        let counter = state.counter(provider_id);
        counter.rejects += 1;
        *counter
            .reject_reasons
            .entry(rejection.reason_code().to_string())
            .or_default() += 1;
        state.push(
            &self.session,
            events::OUTPUT_REJECTED,
            &OutputRejectedData {
                provider_id: provider_id.to_string(),
                kind: request.kind.to_string(),
                topic: request.topic.clone(),
                reason: rejection.reason_code().to_string(),
                detail: rejection.to_string(),
            },
        );
    }

    /// Count a request served by the procedural generator after `attempts` provider attempts.
    pub fn record_procedural(&self, request: &GenerationRequest, attempts: usize) {
        let mut state = self.state.lock();
        state.procedural += 1;
        state.push(
            &self.session,
            events::EXHAUSTION,
            &ExhaustionData {
                kind: request.kind.to_string(),
                topic: request.topic.clone(),
                attempts,
            },
        );
    }

    pub fn counter(&self, provider_id: &str) -> UsageCounter {
        self.state
            .lock()
            .counters
            .get(provider_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn procedural_count(&self) -> u64 {
        self.state.lock().procedural
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.state.lock().events.clone()
    }

    pub fn summary(&self) -> UsageSummary {
        let state = self.state.lock();
        UsageSummary::build(self.session.clone(), &state.counters, state.procedural)
    }
}
