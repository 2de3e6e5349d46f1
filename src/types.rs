//! Shared data model: content kinds, generation requests and content artifacts.

use crate::error::UnknownKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Source id used for artifacts produced by the procedural fallback generator.
pub const PROCEDURAL_SOURCE_ID: &str = "procedural";

/// Field name carrying the text of free-text artifacts.
pub const BODY_FIELD: &str = "body";

/// Kind of content item a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Location-targeted landing page; the request locale is the target city.
    Seo,
    Blog,
    Podcast,
    Social,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Seo,
        ContentKind::Blog,
        ContentKind::Podcast,
        ContentKind::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Seo => "seo",
            ContentKind::Blog => "blog",
            ContentKind::Podcast => "podcast",
            ContentKind::Social => "social",
        }
    }

    /// Structured field set providers are asked to return for this kind.
    ///
    /// `None` means the kind is free text.
    pub fn default_required_fields(&self) -> Option<Vec<String>> {
        let fields: &[&str] = match self {
            ContentKind::Seo => &[
                "title",
                "meta_desc",
                "intro_html",
                "problem_html",
                "solution_html",
                "howto_html",
                "local_html",
                "faq_html",
            ],
            ContentKind::Blog => &["title", "article_html", "keywords"],
            ContentKind::Podcast | ContentKind::Social => return None,
        };
        Some(fields.iter().map(|f| f.to_string()).collect())
    }

    pub fn default_min_length(&self) -> MinLength {
        match self {
            ContentKind::Seo => MinLength::chars(1500),
            ContentKind::Blog => MinLength::chars(2000),
            ContentKind::Podcast => MinLength::words(500),
            ContentKind::Social => MinLength::chars(200),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seo" => Ok(ContentKind::Seo),
            "blog" => Ok(ContentKind::Blog),
            "podcast" => Ok(ContentKind::Podcast),
            "social" => Ok(ContentKind::Social),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Unit a minimum length is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Chars,
    Words,
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthUnit::Chars => f.write_str("chars"),
            LengthUnit::Words => f.write_str("words"),
        }
    }
}

/// Minimum acceptable length for free-text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinLength {
    pub value: usize,
    pub unit: LengthUnit,
}

impl MinLength {
    pub const fn chars(value: usize) -> Self {
        Self {
            value,
            unit: LengthUnit::Chars,
        }
    }

    pub const fn words(value: usize) -> Self {
        Self {
            value,
            unit: LengthUnit::Words,
        }
    }

    /// Length of `text` in this threshold's unit.
    pub fn measure(&self, text: &str) -> usize {
        match self.unit {
            LengthUnit::Chars => text.chars().count(),
            LengthUnit::Words => text.split_whitespace().count(),
        }
    }

    pub fn is_satisfied_by(&self, text: &str) -> bool {
        self.measure(text) >= self.value
    }
}

/// One caller-requested content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: ContentKind,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub min_length: MinLength,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<Vec<String>>,
}

impl GenerationRequest {
    /// Request using the kind's default field set and length threshold.
    pub fn for_kind(kind: ContentKind, topic: impl Into<String>) -> Self {
        Self {
            kind,
            topic: topic.into(),
            locale: None,
            min_length: kind.default_min_length(),
            required_fields: kind.default_required_fields(),
        }
    }

    pub fn free_text(kind: ContentKind, topic: impl Into<String>, min_length: MinLength) -> Self {
        Self {
            kind,
            topic: topic.into(),
            locale: None,
            min_length,
            required_fields: None,
        }
    }

    pub fn structured<I, S>(kind: ContentKind, topic: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            topic: topic.into(),
            locale: None,
            min_length: kind.default_min_length(),
            required_fields: Some(fields.into_iter().map(Into::into).collect()),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_min_length(mut self, min_length: MinLength) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn is_structured(&self) -> bool {
        self.required_fields.is_some()
    }
}

/// Where an artifact came from: a named provider or the procedural generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactSource {
    Provider(String),
    Procedural,
}

impl ArtifactSource {
    pub fn id(&self) -> &str {
        match self {
            ArtifactSource::Provider(id) => id,
            ArtifactSource::Procedural => PROCEDURAL_SOURCE_ID,
        }
    }

    pub fn is_procedural(&self) -> bool {
        matches!(self, ArtifactSource::Procedural)
    }
}

impl From<String> for ArtifactSource {
    fn from(value: String) -> Self {
        if value == PROCEDURAL_SOURCE_ID {
            ArtifactSource::Procedural
        } else {
            ArtifactSource::Provider(value)
        }
    }
}

impl From<ArtifactSource> for String {
    fn from(value: ArtifactSource) -> Self {
        value.id().to_string()
    }
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Validated output handed to renderers and senders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentArtifact {
    pub content_kind: ContentKind,
    pub fields: BTreeMap<String, String>,
    #[serde(rename = "sourceProviderId")]
    pub source: ArtifactSource,
    pub generated_at: DateTime<Utc>,
}

impl ContentArtifact {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Text of a free-text artifact.
    pub fn body(&self) -> Option<&str> {
        self.field(BODY_FIELD)
    }
}
