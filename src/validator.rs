//! Content Validator
//!
//! Pure acceptance check for raw provider output. Rules, in order:
//! 1. empty or whitespace-only output is rejected;
//! 2. structured requests must yield a JSON object carrying every required field;
//! 3. free-text requests must reach the request's minimum length.
//!
//! No I/O happens here, so every rule is testable against literal fixtures.

use crate::types::{
    ArtifactSource, ContentArtifact, GenerationRequest, LengthUnit, BODY_FIELD,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Why raw output was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    Unparseable(String),
    MissingField(String),
    TooShort {
        actual: usize,
        required: usize,
        unit: LengthUnit,
    },
}

impl Rejection {
    /// Stable reason code used in telemetry counters.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Rejection::Empty => "empty",
            Rejection::Unparseable(_) => "unparseable",
            Rejection::MissingField(_) => "missing_field",
            Rejection::TooShort { .. } => "too_short",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "output is empty"),
            Rejection::Unparseable(msg) => write!(f, "structured payload unparseable: {}", msg),
            Rejection::MissingField(name) => write!(f, "missing required field '{}'", name),
            Rejection::TooShort {
                actual,
                required,
                unit,
            } => write!(f, "output too short: {} {} < {} {}", actual, unit, required, unit),
        }
    }
}

/// Validator verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Accepted(ContentArtifact),
    Rejected(Rejection),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted(_))
    }
}

/// Validate `raw` against `request`, attributing an accepted artifact to `source`.
pub fn validate(raw: &str, request: &GenerationRequest, source: ArtifactSource) -> Validation {
    match extract_fields(raw, request) {
        Ok(fields) => Validation::Accepted(ContentArtifact {
            content_kind: request.kind,
            fields,
            source,
            generated_at: Utc::now(),
        }),
        Err(rejection) => Validation::Rejected(rejection),
    }
}

/// Apply the validation rules and return the artifact fields on success.
pub fn extract_fields(
    raw: &str,
    request: &GenerationRequest,
) -> Result<BTreeMap<String, String>, Rejection> {
    if raw.trim().is_empty() {
        return Err(Rejection::Empty);
    }

    if let Some(required) = &request.required_fields {
        let fields = parse_payload(raw)?;
        for name in required {
            let present = fields
                .get(name)
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false);
            if !present {
                return Err(Rejection::MissingField(name.clone()));
            }
        }
        return Ok(fields);
    }

    let text = clean_free_text(raw);
    if text.is_empty() {
        return Err(Rejection::Empty);
    }
    let actual = request.min_length.measure(&text);
    if actual < request.min_length.value {
        return Err(Rejection::TooShort {
            actual,
            required: request.min_length.value,
            unit: request.min_length.unit,
        });
    }

    let mut fields = BTreeMap::new();
    fields.insert(BODY_FIELD.to_string(), text);
    Ok(fields)
}

/// Parse a structured payload, tolerating surrounding code fences or prose.
///
/// Output that already is a JSON object is taken as-is, so fences inside its
/// string values are never mistaken for wrappers. Otherwise candidates are
/// tried in order: a ```json fence, any ``` fence, then the outermost
/// `{ ... }` span. The first candidate's error is reported when none parse.
fn parse_payload(raw: &str) -> Result<BTreeMap<String, String>, Rejection> {
    let trimmed = raw.trim();
    let mut candidates = Vec::with_capacity(4);
    if !trimmed.starts_with("```") {
        candidates.push(trimmed);
    }
    candidates.extend(fenced_block(raw, "```json"));
    candidates.extend(fenced_block(raw, "```"));
    candidates.extend(brace_span(raw));

    let mut first_error = None;
    for candidate in candidates {
        match parse_structured(candidate) {
            Ok(fields) => return Ok(fields),
            Err(rejection) => {
                first_error.get_or_insert(rejection);
            }
        }
    }
    Err(first_error.unwrap_or_else(|| Rejection::Unparseable("no JSON object found".to_string())))
}

fn brace_span(raw: &str) -> Option<&str> {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&raw[start..=end]),
        _ => None,
    }
}

fn fenced_block<'a>(raw: &'a str, opening: &str) -> Option<&'a str> {
    let start = raw.find(opening)? + opening.len();
    let rest = &raw[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    let mut inner = rest[..end].trim();
    // Language tag on the fence line, e.g. ```JSON
    if !inner.starts_with(['{', '[']) {
        if let Some((_, body)) = inner.split_once('\n') {
            inner = body.trim();
        }
    }
    (!inner.is_empty()).then_some(inner)
}

fn parse_structured(payload: &str) -> Result<BTreeMap<String, String>, Rejection> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| Rejection::Unparseable(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(Rejection::Unparseable("expected a JSON object".to_string()));
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| (key, render_value(value)))
        .collect())
}

fn render_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Array(items) if items.iter().all(Value::is_string) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Drop markdown fences, emphasis and heading markers from spoken/plain text.
pub fn clean_free_text(raw: &str) -> String {
    raw.replace("```", "")
        .lines()
        .map(|line| line.trim_start_matches('#').replace('*', ""))
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
