//! Property-based tests for the procedural fallback

use proptest::prelude::*;
use scribe::fallback::{variant_index, ProceduralGenerator};
use scribe::types::{ArtifactSource, ContentKind, GenerationRequest, MinLength};
use scribe::validator::validate;

fn plain_topic_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{1,12}( [A-Za-z0-9]{1,12}){0,3}"
}

/// Any printable text, weighted towards markdown, fences and JSON punctuation.
fn text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\PC{0,40}",
        "[*#`{}\\[\\]\"\\\\:,_ a-zA-Z-]{1,30}",
        "```(json)?[ a-z*#]{0,12}```?",
    ]
}

/// Fallback output always passes the validator it would face as provider output
#[test]
fn test_fallback_output_always_validates() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let generator = ProceduralGenerator::new();

    runner
        .run(
            &(
                prop::sample::select(ContentKind::ALL.to_vec()),
                text_strategy(),
                prop::option::of(text_strategy()),
            ),
            |(kind, topic, locale)| {
                let mut request = GenerationRequest::for_kind(kind, topic);
                if let Some(locale) = locale {
                    request = request.with_locale(locale);
                }
                let raw = generator.render(&request);
                let verdict = validate(&raw, &request, ArtifactSource::Procedural);
                prop_assert!(verdict.is_accepted(), "rejected: {:?}", verdict);
                Ok(())
            },
        )
        .unwrap();
}

/// Raised minimum lengths are still met
#[test]
fn test_fallback_meets_any_free_text_minimum() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let generator = ProceduralGenerator::new();

    runner
        .run(
            &(text_strategy(), 1usize..3000, any::<bool>()),
            |(topic, minimum, in_words)| {
                let min_length = if in_words {
                    MinLength::words(minimum)
                } else {
                    MinLength::chars(minimum)
                };
                let request = GenerationRequest::free_text(ContentKind::Podcast, topic, min_length);
                let artifact = generator.generate(&request);
                prop_assert!(artifact.source.is_procedural());
                prop_assert!(min_length.is_satisfied_by(artifact.body().unwrap_or_default()));
                let raw = generator.render(&request);
                prop_assert!(validate(&raw, &request, ArtifactSource::Procedural).is_accepted());
                Ok(())
            },
        )
        .unwrap();
}

/// Same request, same content; topic case and spacing do not change the template
#[test]
fn test_fallback_is_deterministic() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let generator = ProceduralGenerator::new();

    runner
        .run(
            &(prop::sample::select(ContentKind::ALL.to_vec()), plain_topic_strategy()),
            |(kind, topic)| {
                let request = GenerationRequest::for_kind(kind, topic.clone());
                prop_assert_eq!(generator.render(&request), generator.render(&request));
                prop_assert_eq!(
                    generator.generate(&request).fields,
                    generator.generate(&request).fields
                );
                let shouted = GenerationRequest::for_kind(kind, format!("  {}  ", topic.to_uppercase()));
                prop_assert_eq!(
                    variant_index(kind, &request.topic, 3),
                    variant_index(kind, &shouted.topic, 3)
                );
                Ok(())
            },
        )
        .unwrap();
}
