//! Cascade over real HTTP clients built from configuration, against mock servers.

use super::test_utils::words;
use scribe::cascade::{AttemptOutcome, CascadeController};
use scribe::context::GenerationContext;
use scribe::ledger::{ContentLedger, MemoryLedgerStore};
use scribe::provider::{ProviderConfig, ProviderRegistry, ProviderType};
use scribe::telemetry::UsageTelemetry;
use scribe::types::{ContentKind, GenerationRequest, MinLength};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(provider_type: ProviderType, endpoint: &str, key_env: &str, priority: u32) -> ProviderConfig {
    let mut config = ProviderConfig::new(provider_type, "test-model");
    config.endpoint = Some(endpoint.to_string());
    config.api_key_env = Some(key_env.to_string());
    config.priority = priority;
    config.timeout_secs = 5;
    config
}

#[tokio::test]
async fn test_configured_providers_cascade_over_http() {
    std::env::set_var("SCRIBE_IT_PRIMARY_KEY", "primary-secret");
    std::env::set_var("SCRIBE_IT_SECONDARY_KEY", "secondary-secret");
    std::env::remove_var("SCRIBE_IT_UNSET_KEY");

    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer primary-secret"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&primary)
        .await;

    let unkeyed = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&unkeyed)
        .await;

    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer secondary-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                { "message": { "role": "assistant", "content": format!("## Intro\n{}", words(650)) } }
            ]
        })))
        .expect(1)
        .mount(&secondary)
        .await;

    let mut configs = BTreeMap::new();
    configs.insert(
        "openai-main".to_string(),
        provider(ProviderType::OpenAI, &primary.uri(), "SCRIBE_IT_PRIMARY_KEY", 1),
    );
    configs.insert(
        "claude".to_string(),
        provider(ProviderType::Anthropic, &unkeyed.uri(), "SCRIBE_IT_UNSET_KEY", 2),
    );
    configs.insert(
        "groq-backup".to_string(),
        provider(ProviderType::Groq, &secondary.uri(), "SCRIBE_IT_SECONDARY_KEY", 3),
    );

    let context = Arc::new(GenerationContext::new(
        ProviderRegistry::from_config(&configs).unwrap(),
        ContentLedger::open(Arc::new(MemoryLedgerStore::new()), false),
        UsageTelemetry::with_session("run-http"),
    ));
    let request =
        GenerationRequest::free_text(ContentKind::Podcast, "Birthday Gifts", MinLength::words(500));

    let result = CascadeController::new(context.clone())
        .generate_traced(&request)
        .await;

    assert_eq!(result.artifact.source.id(), "groq-backup");
    assert!(!result.artifact.body().unwrap().contains("##"));
    assert!(matches!(
        result.trace.attempts[0].outcome,
        AttemptOutcome::Failed { reason: "server_error", .. }
    ));
    assert!(matches!(
        result.trace.attempts[1].outcome,
        AttemptOutcome::Skipped { .. }
    ));
    assert_eq!(context.telemetry.counter("claude").attempts(), 0);
    assert_eq!(context.telemetry.counter("openai-main").failures, 1);
}
