//! Procedural Fallback Generator
//!
//! Deterministic, dependency-free content used when every real provider has
//! failed. A template variant is picked by a stable hash of `(kind, topic)`,
//! so the same request always renders the same text while distinct topics
//! spread across variants. Output satisfies the validator for the request it
//! was rendered for: structured requests get every required field, free-text
//! requests are extended until they reach the minimum length.

use crate::ledger::fingerprint::normalize_topic;
use crate::types::{
    ArtifactSource, ContentArtifact, ContentKind, GenerationRequest, BODY_FIELD,
};
use crate::validator::{clean_free_text, extract_fields};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Locale phrase used when a request carries none.
const DEFAULT_LOCALE: &str = "your area";

type Template = &'static [(&'static str, &'static str)];

const SEO_TEMPLATES: &[Template] = &[
    &[
        ("title", "{topic} in {locale}: A Practical Guide"),
        ("meta_desc", "Everything you need to know about {topic_lower} in {locale}, from first ideas to the finishing touches."),
        ("intro_html", "<p>Finding the right approach to {topic_lower} in {locale} can feel overwhelming. There are endless options, plenty of conflicting advice and very little time. This guide walks through what actually matters, so you can make a confident choice without spending a whole weekend researching.</p>"),
        ("problem_html", "<p>Most people start with {topic_lower} by browsing, comparing and second-guessing. The result is usually something that looks fine but says very little. What gets lost is the personal connection: the reason you cared enough to search for {topic_lower} in the first place.</p>"),
        ("solution_html", "<p>The most memorable results come from pairing a sensible choice with a personal touch. Decide what you want the recipient to feel, then choose something that supports that feeling. A short personal message, a shared memory or a small detail that only the two of you understand turns an ordinary choice into something that lasts.</p>"),
        ("howto_html", "<p><strong>Step 1:</strong> Write down who it is for and the occasion. <strong>Step 2:</strong> Set a budget and shortlist three options. <strong>Step 3:</strong> Add something personal, such as a note or recorded message. <strong>Step 4:</strong> Present it thoughtfully and enjoy the moment.</p>"),
        ("local_html", "<p>{locale} has plenty of independent shops, markets and department stores that make {topic_lower} easier. Start in the centre of {locale}, visit a local boutique for something unique, and leave time to add your own personal finishing touch.</p>"),
        ("faq_html", "<div class=\"faq-item\"><h4>How early should I start planning {topic_lower}?</h4><p>A week or two is plenty for most occasions, and leaves time to add a personal touch.</p></div><div class=\"faq-item\"><h4>Do I need a big budget?</h4><p>No. Thoughtfulness matters far more than price, and small personal details are remembered longest.</p></div>"),
    ],
    &[
        ("title", "The {locale} Guide to {topic}"),
        ("meta_desc", "Thinking about {topic_lower} in {locale}? Simple, practical ideas that make the result personal and memorable."),
        ("intro_html", "<p>{topic} is one of those things everyone in {locale} eventually needs to get right. The good news is that it does not have to be complicated. With a clear idea of what you want to say, the rest of the decisions become much easier.</p>"),
        ("problem_html", "<p>The usual trap with {topic_lower} is choosing something generic because it feels safe. Generic choices are quickly forgotten. They say that you remembered the date, but not much about why the person matters to you.</p>"),
        ("solution_html", "<p>Start from the relationship rather than the shop shelf. Think about a shared moment, a running joke or a goal the person is working towards. Build around that idea and add a personal message so the meaning is impossible to miss. Simple choices become special when the story behind them is clear.</p>"),
        ("howto_html", "<p><strong>Step 1:</strong> Pick the feeling you want to create. <strong>Step 2:</strong> Choose something that fits it. <strong>Step 3:</strong> Personalise it with your own words. <strong>Step 4:</strong> Hand it over in person whenever you can.</p>"),
        ("local_html", "<p>Around {locale} you will find florists, bookshops, jewellers and makers' markets that are ideal starting points for {topic_lower}. Local independents are often happy to help you add a finishing detail.</p>"),
        ("faq_html", "<div class=\"faq-item\"><h4>What makes {topic_lower} memorable?</h4><p>A personal story or message that connects the choice to the person receiving it.</p></div><div class=\"faq-item\"><h4>Is it fine to keep things simple?</h4><p>Absolutely. Simple and sincere beats elaborate and impersonal every time.</p></div>"),
    ],
];

const BLOG_TEMPLATES: &[Template] = &[
    &[
        ("title", "{topic}: A Guide to Meaningful Choices"),
        ("article_html", "<p>Have you ever picked something for {topic_lower} and wondered whether it would still be remembered a week later? Most of us have. The truth is that even carefully chosen things fade into the background when there is no story attached to them.</p><h2>Why {topic} Matters</h2><p>When it comes to {topic_lower}, the real challenge is expressing something meaningful through a physical choice. A card helps, but cards get lost. The choice itself might be perfect, yet without context it is just an object.</p><h2>Making It Personal</h2><p>The simplest fix is to attach your own words. Share a memory, offer encouragement or explain why you chose it. A few sincere sentences change how the whole thing is received, and they are what people talk about years later.</p><h2>Getting Started</h2><p>Begin with the person, not the product. Write down three things you appreciate about them, pick something that reflects one of those things, and add a message in your own voice. That is all it takes to make {topic_lower} genuinely memorable.</p>"),
        ("keywords", "{topic_lower}, personalised, meaningful, ideas"),
    ],
    &[
        ("title", "Rethinking {topic}"),
        ("article_html", "<p>{topic} often turns into a last-minute scramble. We scroll, compare and eventually settle for whatever arrives in time. It works, but it rarely feels special for either side.</p><h2>The Problem With Safe Choices</h2><p>Safe choices are safe because they say very little. They show that you remembered, but not that you thought deeply about the person. Over time those choices blur together and are forgotten.</p><h2>A Better Approach</h2><p>Think about a moment you shared, a challenge they overcame or something they have always wanted to try. Let that guide the decision, then add a personal message so the meaning is clear. Small, specific details are what make {topic_lower} stand out.</p><h2>Putting It Together</h2><p>Plan a little ahead, keep the budget realistic and spend the saved energy on the personal part. The result is something that feels thoughtful, lasts longer in memory and is far more enjoyable to give.</p>"),
        ("keywords", "{topic_lower}, thoughtful, personal touch, guide"),
    ],
];

const PODCAST_TEMPLATES: &[Template] = &[&[(
    BODY_FIELD,
    "Welcome back to the show. Today we are talking about {topic_lower}, and I think it is a topic almost everyone has wrestled with at some point.\n\n\
You know the feeling. You walk from shop to shop, scroll through page after page, and nothing feels quite right. Everything looks nice enough, but nothing feels like it really says what you want it to say. So you settle for something safe, and a week later nobody remembers it.\n\n\
Here is the thing most of us forget: the object matters less than the thought behind it. The problem is that thoughts are invisible. A card helps, but cards get lost in drawers. The choice itself cannot explain why you picked it, what it means to you, or how much the person matters.\n\n\
So today I want to share a simple approach to {topic_lower} that fixes that. Start with the person, not the product. Ask yourself what you want them to feel when they open it. Proud? Loved? Understood? Once you know the feeling, the choice becomes much easier, because you are looking for something that supports that feeling rather than something that merely fills a gap.\n\n\
Then add something personal. It can be a short note, a shared photo, or even a recorded message in your own voice. Hearing someone you love speak directly to you is incredibly powerful. People replay those messages for years.\n\n\
Let me give you an example. A listener told me about a grandmother who could not travel for her grandson's birthday. She sent a simple present, but with it came a message telling him stories about when she was his age. His parents said he played it every day for a week. The present was small. The memory was enormous.\n\n\
That is really the heart of it. Whatever {topic_lower} looks like for you, the most memorable version is the one that carries your voice, your story and your reasons. Keep it simple, keep it sincere, and do not worry about the budget.\n\n\
Thanks for listening today. If this helped, share it with a friend who is planning something special, and I will see you in the next episode.",
)], &[(
    BODY_FIELD,
    "Hello and welcome. In this episode we are taking a closer look at {topic_lower}, and why some choices are remembered for years while others are forgotten by the weekend.\n\n\
Let us start with a confession. Most of us leave {topic_lower} to the last minute. We are busy, the date sneaks up on us, and suddenly we are grabbing whatever is closest. There is no shame in that, but it does mean we miss the chance to make something genuinely meaningful.\n\n\
What makes the difference? After talking to a lot of people about this, the answer is surprisingly consistent: personal connection. The things people treasure are the ones that remind them of a specific person and a specific moment. Price barely comes into it.\n\n\
So here is a simple three step plan. First, write down one memory you share with the person. Just one. Second, choose something that connects to that memory, even loosely. Third, explain the connection in your own words, whether that is a handwritten note or a short recorded message they can play back whenever they like.\n\n\
That third step is the one people skip, and it is the most important. Without it, the meaning lives only in your head. With it, the meaning travels with the choice and can be rediscovered again and again.\n\n\
I heard from a father who did exactly this for his daughter's graduation. He chose a simple notebook, but he recorded a message about watching her grow up and all the notebooks she filled as a child. She told him she listened to it before every exam that year.\n\n\
So whatever {topic_lower} means for you this season, take ten extra minutes for the personal part. It costs nothing, and it is the part that will be remembered.\n\n\
That is all for today. Thank you for spending this time with me, and I will be back soon with another episode.",
)]];

const SOCIAL_TEMPLATES: &[Template] = &[
    &[(
        BODY_FIELD,
        "Planning {topic_lower}? Skip the generic option this time. Pick one shared memory, choose something that connects to it, and add a few words in your own voice. Small personal details are what people remember for years. What is the most meaningful thing you have ever received?",
    )],
    &[(
        BODY_FIELD,
        "Quick tip for {topic_lower}: start with the person, not the shop. Ask what you want them to feel, then add a personal message so the meaning is impossible to miss. Simple and sincere beats expensive and forgettable every single time. Save this for later!",
    )],
];

/// Paragraphs appended to free-text output until it reaches the minimum length.
const EXTENSION_PARAGRAPHS: &[&str] = &[
    "One more thought on {topic_lower}: the best results rarely come from the most expensive option. They come from paying attention to what the other person cares about and letting that guide every decision along the way.",
    "If you are short on time, focus on a single personal detail. A name, a date, an inside joke or a memory is enough to turn an ordinary choice into something that feels made for one person only.",
    "It also helps to think about how the moment will unfold. Will it be opened in person, sent by post or shared over a video call? Planning the delivery is part of making {topic_lower} feel considered rather than rushed.",
    "Finally, do not underestimate the power of your own voice. Written words are lovely, but hearing someone speak directly to you creates a connection that lasts long after the occasion itself has passed.",
];

const FILLER_FIELD: &str = "<p>{topic} deserves a thoughtful approach. Start with the person, choose something that reflects what they care about, and add a personal message that explains why it matters.</p>";

/// Deterministic generator of always-valid content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProceduralGenerator;

impl ProceduralGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Produce the artifact for `request`, attributed to the procedural source.
    ///
    /// Fields are those the validator extracts from [`render`](Self::render),
    /// so the artifact is exactly what an accepted provider reply would yield.
    pub fn generate(&self, request: &GenerationRequest) -> ContentArtifact {
        let fields = match extract_fields(&self.render(request), request) {
            Ok(fields) => fields,
            Err(rejection) => {
                warn!(
                    kind = %request.kind,
                    reason = rejection.reason_code(),
                    "Procedural output failed validation"
                );
                self.fields(request)
            }
        };
        ContentArtifact {
            content_kind: request.kind,
            fields,
            source: ArtifactSource::Procedural,
            generated_at: Utc::now(),
        }
    }

    /// Raw output in the same shape a provider would return it.
    pub fn render(&self, request: &GenerationRequest) -> String {
        let fields = self.fields(request);
        if request.is_structured() {
            let object: Map<String, Value> = fields
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            Value::Object(object).to_string()
        } else {
            fields.get(BODY_FIELD).cloned().unwrap_or_default()
        }
    }

    fn fields(&self, request: &GenerationRequest) -> BTreeMap<String, String> {
        let templates = templates_for(request.kind);
        let template = templates[variant_index(request.kind, &request.topic, templates.len())];
        let vars = Substitutions::new(request);

        match &request.required_fields {
            Some(required) => {
                let mut fields: BTreeMap<String, String> = template
                    .iter()
                    .map(|(name, text)| (name.to_string(), vars.apply(text)))
                    .collect();
                for name in required {
                    let missing = fields
                        .get(name)
                        .map(|value| value.trim().is_empty())
                        .unwrap_or(true);
                    if missing {
                        fields.insert(name.clone(), vars.apply(FILLER_FIELD));
                    }
                }
                fields
            }
            None => {
                let mut body = template
                    .iter()
                    .map(|(_, text)| vars.apply(text))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                // Length is judged on the cleaned text, as the validator sees it.
                // Paragraphs clean independently, so the measure grows additively.
                const SEPARATOR: &str = "\n\n";
                let minimum = request.min_length;
                let mut measured = minimum.measure(&clean_free_text(&body));
                let mut next = 0usize;
                while measured < minimum.value {
                    let paragraph =
                        vars.apply(EXTENSION_PARAGRAPHS[next % EXTENSION_PARAGRAPHS.len()]);
                    measured += minimum.measure(SEPARATOR)
                        + minimum.measure(&clean_free_text(&paragraph));
                    body.push_str(SEPARATOR);
                    body.push_str(&paragraph);
                    next += 1;
                }
                let mut fields = BTreeMap::new();
                fields.insert(BODY_FIELD.to_string(), body);
                fields
            }
        }
    }
}

fn templates_for(kind: ContentKind) -> &'static [Template] {
    match kind {
        ContentKind::Seo => SEO_TEMPLATES,
        ContentKind::Blog => BLOG_TEMPLATES,
        ContentKind::Podcast => PODCAST_TEMPLATES,
        ContentKind::Social => SOCIAL_TEMPLATES,
    }
}

/// Stable template choice for `(kind, topic)`; case and spacing of the topic do not matter.
pub fn variant_index(kind: ContentKind, topic: &str, variants: usize) -> usize {
    if variants <= 1 {
        return 0;
    }
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b"\x00");
    hasher.update(normalize_topic(topic).as_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    (u64::from_le_bytes(prefix) % variants as u64) as usize
}

struct Substitutions {
    topic: String,
    topic_lower: String,
    locale: String,
}

impl Substitutions {
    fn new(request: &GenerationRequest) -> Self {
        let topic = collapse_whitespace(&request.topic);
        let locale = request
            .locale
            .as_deref()
            .map(collapse_whitespace)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        Self {
            topic_lower: topic.to_lowercase(),
            topic,
            locale,
        }
    }

    fn apply(&self, text: &str) -> String {
        text.replace("{topic_lower}", &self.topic_lower)
            .replace("{topic}", &self.topic)
            .replace("{locale}", &self.locale)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
