//! Cascade Controller
//!
//! Drives one generation request to a content artifact:
//!
//! `PENDING -> TRYING_PROVIDER(i) -> VALIDATING(i) -> {ACCEPTED | TRYING_PROVIDER(i+1)} -> ... -> PROCEDURAL_FALLBACK -> ACCEPTED`
//!
//! Providers are tried one at a time in registry order, each under its own
//! call timeout. The first accepted output wins. Exhaustion falls through to
//! the procedural generator, so generation itself never fails.

use crate::context::GenerationContext;
use crate::error::ProviderError;
use crate::provider::{ProviderCallOutcome, RegisteredProvider};
use crate::types::{ArtifactSource, ContentArtifact, GenerationRequest};
use crate::validator::{self, Rejection, Validation};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-request cascade state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    Pending,
    TryingProvider(usize),
    Validating(usize),
    ProceduralFallback,
    Accepted,
}

/// What happened with one provider.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Accepted,
    Failed { reason: &'static str, message: String },
    Rejected(Rejection),
    /// Not called (e.g. missing credentials); not counted in telemetry.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeAttempt {
    pub provider_id: String,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

/// Record of one cascade run.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeTrace {
    pub attempts: Vec<CascadeAttempt>,
    pub states: Vec<CascadeState>,
}

impl CascadeTrace {
    fn new() -> Self {
        Self {
            attempts: Vec::new(),
            states: vec![CascadeState::Pending],
        }
    }

    fn enter(&mut self, state: CascadeState) {
        self.states.push(state);
    }

    fn attempt(&mut self, provider_id: &str, outcome: AttemptOutcome, elapsed: Duration) {
        self.attempts.push(CascadeAttempt {
            provider_id: provider_id.to_string(),
            outcome,
            elapsed,
        });
    }

    pub fn final_state(&self) -> CascadeState {
        self.states
            .last()
            .copied()
            .unwrap_or(CascadeState::Pending)
    }

    /// Providers actually called.
    pub fn called(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| !matches!(a.outcome, AttemptOutcome::Skipped { .. }))
            .count()
    }

    pub fn fell_back(&self) -> bool {
        self.states.contains(&CascadeState::ProceduralFallback)
    }
}

/// Artifact plus the trace that produced it.
#[derive(Debug, Clone)]
pub struct CascadeResult {
    pub artifact: ContentArtifact,
    pub trace: CascadeTrace,
}

pub struct CascadeController {
    context: Arc<GenerationContext>,
}

impl CascadeController {
    pub fn new(context: Arc<GenerationContext>) -> Self {
        Self { context }
    }

    /// Produce a valid artifact for `request`. Never fails.
    pub async fn generate(&self, request: &GenerationRequest) -> ContentArtifact {
        self.generate_traced(request).await.artifact
    }

    pub async fn generate_traced(&self, request: &GenerationRequest) -> CascadeResult {
        let telemetry = &self.context.telemetry;
        let mut trace = CascadeTrace::new();
        let providers = self.context.registry.providers_for(request.kind);

        for (index, provider) in providers.iter().enumerate() {
            let id = provider.descriptor.id.as_str();

            if let Err(e) = provider.client.check_ready() {
                debug!(provider = %id, reason = %e, "Skipping provider");
                trace.attempt(
                    id,
                    AttemptOutcome::Skipped {
                        reason: e.to_string(),
                    },
                    Duration::ZERO,
                );
                continue;
            }

            trace.enter(CascadeState::TryingProvider(index));
            debug!(
                provider = %id,
                kind = %request.kind,
                topic = %request.topic,
                timeout_ms = provider.descriptor.call_timeout.as_millis() as u64,
                "Trying provider"
            );
            let started = Instant::now();
            let outcome = invoke(provider, request).await;
            let elapsed = started.elapsed();

            let raw = match outcome {
                ProviderCallOutcome::Success(raw) => raw,
                ProviderCallOutcome::Failure(error) => {
                    warn!(
                        provider = %id,
                        reason = error.reason_code(),
                        error = %error,
                        "Provider failed; advancing cascade"
                    );
                    telemetry.record_failure(id, request, &error, Some(elapsed));
                    trace.attempt(
                        id,
                        AttemptOutcome::Failed {
                            reason: error.reason_code(),
                            message: error.to_string(),
                        },
                        elapsed,
                    );
                    continue;
                }
            };

            trace.enter(CascadeState::Validating(index));
            match validator::validate(&raw, request, ArtifactSource::Provider(id.to_string())) {
                Validation::Accepted(artifact) => {
                    info!(provider = %id, kind = %request.kind, topic = %request.topic, "Output accepted");
                    telemetry.record_success(id, request, elapsed);
                    trace.attempt(id, AttemptOutcome::Accepted, elapsed);
                    trace.enter(CascadeState::Accepted);
                    return CascadeResult { artifact, trace };
                }
                Validation::Rejected(rejection) => {
                    info!(
                        provider = %id,
                        reason = rejection.reason_code(),
                        detail = %rejection,
                        "Output rejected; advancing cascade"
                    );
                    telemetry.record_rejection(id, request, &rejection);
                    trace.attempt(id, AttemptOutcome::Rejected(rejection), elapsed);
                }
            }
        }

        warn!(
            kind = %request.kind,
            topic = %request.topic,
            attempts = trace.called(),
            "Providers exhausted; using procedural fallback"
        );
        telemetry.record_procedural(request, trace.called());
        trace.enter(CascadeState::ProceduralFallback);
        let artifact = self.context.fallback.generate(request);
        trace.enter(CascadeState::Accepted);
        CascadeResult { artifact, trace }
    }
}

/// Call `provider` under its timeout.
async fn invoke(provider: &RegisteredProvider, request: &GenerationRequest) -> ProviderCallOutcome {
    let timeout = provider.descriptor.call_timeout;
    match tokio::time::timeout(timeout, provider.client.call(request)).await {
        Ok(result) => result.into(),
        Err(_) => ProviderCallOutcome::Failure(ProviderError::Timeout(timeout)),
    }
}
