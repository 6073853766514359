use crate::models::TrackedModel;
use anyhow::Result;
use async_trait::async_trait;
use futures::{stream, Stream};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

// Alias for the stream of reply tokens a source hands to the engine
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// Trait defining where assistant replies come from
#[async_trait]
pub trait ResponseSource: Send + Sync {
    // Returns the reply for `prompt` as a stream of tokens, in reveal order.
    async fn stream_reply(&self, model: &TrackedModel, prompt: &str) -> Result<DeltaStream>;
}

/// Canned-response style of a tracked model. Resolved once from the display
/// name when the model is created, then carried by the model.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    ChatGpt,
    Claude,
    Gemini,
    Grok,
    Perplexity,
}

impl Persona {
    pub fn from_display_name(name: &str) -> Option<Self> {
        match name {
            "ChatGPT" => Some(Self::ChatGpt),
            "Claude" => Some(Self::Claude),
            "Gemini" => Some(Self::Gemini),
            "Grok" => Some(Self::Grok),
            "Perplexity" => Some(Self::Perplexity),
            _ => None,
        }
    }

    /// Builds this persona's reply. Phrasing varies on keywords in the prompt.
    pub fn render(self, prompt: &str) -> String {
        let lower = prompt.to_lowercase();
        let pick = |keyword: &str, yes: &'static str, no: &'static str| {
            if lower.contains(keyword) {
                yes
            } else {
                no
            }
        };

        match self {
            Self::ChatGpt => format!(
                "Based on my analysis, {}. Here's what I recommend:\n\n1. Start by understanding the core requirements\n2. Break down the problem into manageable pieces\n3. Implement incrementally with testing at each stage\n\nWould you like me to elaborate on any of these points?",
                pick(
                    "best",
                    "the best approach would be to leverage a combination of techniques",
                    "I can help you with that"
                )
            ),
            Self::Claude => format!(
                "I appreciate your question about {}... Let me provide a thoughtful response:\n\nFrom my perspective, {}. I'd suggest:\n\n• Examining the foundational concepts first\n• Building upon established best practices\n• Adapting the approach based on specific context\n\nHappy to dive deeper into any aspect!",
                prefix(prompt, 30),
                pick(
                    "how",
                    "the methodology involves several key considerations",
                    "this is an interesting topic that requires careful analysis"
                )
            ),
            Self::Gemini => format!(
                "Great question! Regarding {}...\n\n{}:\n\n→ First, consider the broader context\n→ Next, identify the key variables\n→ Finally, synthesize a comprehensive solution\n\nI can provide more specific examples if you'd like.",
                prefix(prompt, 30),
                pick("what", "The answer lies in understanding", "Let me break this down for you")
            ),
            Self::Grok => format!(
                "Yo! So you're asking about {}... \n\nHere's the deal: {}.\n\n✓ Think of it from a practical angle\n✓ Don't overcomplicate things\n✓ Focus on what actually works\n\nLet me know if you want the unfiltered version 😎",
                prefix(prompt, 30),
                pick(
                    "why",
                    "there are multiple factors at play",
                    "this is actually pretty straightforward"
                )
            ),
            Self::Perplexity => format!(
                "[Analyzing query: \"{}...\"]\n\nBased on current information:\n\n{} the optimal approach involves:\n\n• Evidence-based methodology\n• Cross-referencing multiple sources\n• Practical implementation strategies\n\nSources: [1] [2] [3]\nWould you like citations for any specific point?",
                prefix(prompt, 40),
                pick("compare", "Comparison analysis shows", "Research indicates that")
            ),
        }
    }
}

/// Reply for a model without a persona.
pub fn fallback_reply(model_name: &str, prompt: &str) -> String {
    format!(
        "As {}, I can help with that. {}... This is an interesting question that requires careful consideration. Let me provide you with a comprehensive response based on my training and capabilities.",
        model_name,
        prefix(prompt, 20)
    )
}

/// Full canned reply for `model`.
pub fn canned_reply(model: &TrackedModel, prompt: &str) -> String {
    match model.persona {
        Some(persona) => persona.render(prompt),
        None => fallback_reply(&model.name, prompt),
    }
}

/// Splits a reply into reveal tokens. Joining them with single spaces gives
/// back the original text.
pub fn tokenize(reply: &str) -> Vec<String> {
    reply.split(' ').map(str::to_string).collect()
}

fn prefix(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

// --- Canned template responder ---

/// Answers from fixed templates without calling any model.
#[derive(Debug, Default)]
pub struct CannedResponder;

impl CannedResponder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseSource for CannedResponder {
    async fn stream_reply(&self, model: &TrackedModel, prompt: &str) -> Result<DeltaStream> {
        let reply = canned_reply(model, prompt);
        log::debug!(
            "Canned reply for '{}' ({:?}): {} chars",
            model.name,
            model.persona,
            reply.len()
        );
        let tokens = tokenize(&reply).into_iter().map(Ok);
        Ok(Box::pin(stream::iter(tokens)))
    }
}
