//! Prompt construction for generation requests.

use crate::types::{ContentKind, GenerationRequest, LengthUnit};

/// System and user halves of a provider prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Both halves joined, for providers without a separate system slot.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

pub fn build_prompt(request: &GenerationRequest) -> Prompt {
    let system = match request.kind {
        ContentKind::Seo => "You are a senior SEO copywriter. Write natural, engaging copy in full paragraphs.",
        ContentKind::Blog => "You are a senior content writer. Write natural, engaging storytelling with real examples.",
        ContentKind::Podcast => "You are a podcast scriptwriter. Write in a warm, conversational spoken tone.",
        ContentKind::Social => "You are a social media copywriter. Write short, friendly posts.",
    }
    .to_string();

    let subject = match &request.locale {
        Some(locale) if !locale.trim().is_empty() => format!("\"{}\" in {}", request.topic, locale),
        _ => format!("\"{}\"", request.topic),
    };

    let task = match request.kind {
        ContentKind::Seo => format!("Write a comprehensive landing page about {}.", subject),
        ContentKind::Blog => format!("Write a comprehensive blog article about {}.", subject),
        ContentKind::Podcast => format!("Write a podcast script about {}.", subject),
        ContentKind::Social => format!("Write a social media post about {}.", subject),
    };

    let user = match &request.required_fields {
        Some(fields) => {
            let skeleton = fields
                .iter()
                .map(|name| format!("    \"{}\": \"...\"", name))
                .collect::<Vec<_>>()
                .join(",\n");
            format!(
                "{task}\n\nOUTPUT AS A SINGLE JSON OBJECT with exactly these keys:\n{{\n{skeleton}\n}}\n\nEvery value must be non-empty. Fields ending in _html contain <p> paragraphs.",
            )
        }
        None => {
            let unit = match request.min_length.unit {
                LengthUnit::Chars => "characters",
                LengthUnit::Words => "words",
            };
            format!(
                "{task}\n\nREQUIREMENTS:\n- MINIMUM {} {unit}\n- Plain text only: no markdown, no stage directions, no headings",
                request.min_length.value,
            )
        }
    };

    Prompt { system, user }
}
