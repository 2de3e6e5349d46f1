//! Cascade behavior across provider failures, rejections and capabilities.

use super::test_utils::{context_with, register, register_for, words, ScriptedProvider, Step};
use scribe::cascade::{AttemptOutcome, CascadeController, CascadeState};
use scribe::types::{ArtifactSource, ContentKind, GenerationRequest, MinLength};

fn podcast(topic: &str) -> GenerationRequest {
    GenerationRequest::free_text(ContentKind::Podcast, topic, MinLength::words(500))
}

#[tokio::test]
async fn test_third_provider_serves_after_timeout_and_short_output() {
    let p1 = ScriptedProvider::new("p1", vec![Step::Hang]);
    let p2 = ScriptedProvider::new("p2", vec![Step::Reply(words(120))]);
    let p3 = ScriptedProvider::new("p3", vec![Step::Reply(words(800))]);
    let p4 = ScriptedProvider::new("p4", vec![Step::Reply(words(800))]);
    let context = context_with(vec![
        register(&p1, 1),
        register(&p2, 2),
        register(&p3, 3),
        register(&p4, 4),
    ]);

    let result = CascadeController::new(context.clone())
        .generate_traced(&podcast("Birthday Gifts"))
        .await;

    assert_eq!(result.artifact.source, ArtifactSource::Provider("p3".to_string()));
    assert_eq!(p4.calls(), 0);
    assert_eq!(result.trace.called(), 3);
    assert!(matches!(
        result.trace.attempts[0].outcome,
        AttemptOutcome::Failed { reason: "timeout", .. }
    ));
    assert!(matches!(result.trace.attempts[1].outcome, AttemptOutcome::Rejected(_)));

    let summary = context.telemetry.summary();
    assert_eq!(summary.total_requests, 1);
    assert_eq!(summary.provider("p3").unwrap().counter.successes, 1);
    assert_eq!(summary.provider("p2").unwrap().counter.reject_reasons["too_short"], 1);
    assert!(summary.provider("p4").is_none());
}

#[tokio::test]
async fn test_all_providers_failing_yields_deterministic_procedural_artifact() {
    let p1 = ScriptedProvider::new("p1", vec![Step::ServerError]);
    let p2 = ScriptedProvider::new("p2", vec![Step::RateLimited]);
    let p3 = ScriptedProvider::new("p3", vec![Step::Reply(String::new())]);
    let context = context_with(vec![register(&p1, 1), register(&p2, 2), register(&p3, 3)]);
    let controller = CascadeController::new(context.clone());
    let request = podcast("Anniversary Ideas");

    let first = controller.generate_traced(&request).await;
    let second = controller.generate(&request).await;

    assert!(first.artifact.source.is_procedural());
    assert_eq!(first.trace.final_state(), CascadeState::Accepted);
    assert!(first.trace.fell_back());
    assert_eq!(first.artifact.fields, second.fields);
    assert!(request.min_length.is_satisfied_by(first.artifact.body().unwrap()));

    let counters = context.telemetry.counter("p1");
    assert_eq!(counters.failure_reasons["server_error"], 1);
    assert_eq!(context.telemetry.counter("p2").failure_reasons["rate_limited"], 1);
    assert_eq!(context.telemetry.counter("p3").reject_reasons["empty"], 1);
    assert_eq!(context.telemetry.procedural_count(), 2);
}

#[tokio::test]
async fn test_providers_without_capability_are_not_called() {
    let blog_only = ScriptedProvider::new("blog-only", vec![Step::Reply(words(900))]);
    let general = ScriptedProvider::new("general", vec![Step::Reply(words(900))]);
    let context = context_with(vec![
        register_for(&blog_only, 1, &[ContentKind::Blog]),
        register(&general, 2),
    ]);

    let artifact = CascadeController::new(context)
        .generate(&podcast("Gifts"))
        .await;

    assert_eq!(artifact.source.id(), "general");
    assert_eq!(blog_only.calls(), 0);
}

#[tokio::test]
async fn test_structured_output_is_accepted_only_with_every_field() {
    let request = GenerationRequest::for_kind(ContentKind::Blog, "Gift Wrapping");
    let partial = ScriptedProvider::new(
        "partial",
        vec![Step::Reply(r#"{"title": "Wrapping", "article_html": "<p>x</p>"}"#.to_string())],
    );
    let fenced = ScriptedProvider::new(
        "fenced",
        vec![Step::Reply(
            "Here you go:\n```json\n{\"title\": \"Wrapping\", \"article_html\": \"<p>Fold</p>\", \"keywords\": \"gift, wrap\"}\n```"
                .to_string(),
        )],
    );
    let context = context_with(vec![register(&partial, 1), register(&fenced, 2)]);

    let result = CascadeController::new(context.clone())
        .generate_traced(&request)
        .await;

    assert_eq!(result.artifact.source.id(), "fenced");
    assert_eq!(result.artifact.field("keywords"), Some("gift, wrap"));
    assert_eq!(
        context.telemetry.counter("partial").reject_reasons["missing_field"],
        1
    );
}

#[tokio::test]
async fn test_concurrent_cascades_share_telemetry() {
    let flaky = ScriptedProvider::new(
        "flaky",
        vec![Step::ServerError, Step::Reply(words(600))],
    );
    let context = context_with(vec![register(&flaky, 1)]);
    let controller = CascadeController::new(context.clone());

    let requests: Vec<_> = (0..4).map(|i| podcast(&format!("Topic {}", i))).collect();
    let artifacts =
        futures::future::join_all(requests.iter().map(|r| controller.generate(r))).await;

    assert_eq!(artifacts.len(), 4);
    let summary = context.telemetry.summary();
    assert_eq!(summary.total_requests, 4);
    assert_eq!(summary.procedural, 1);
    assert_eq!(summary.provider("flaky").unwrap().counter.successes, 3);
    assert_eq!(summary.provider("flaky").unwrap().counter.failures, 1);
}
