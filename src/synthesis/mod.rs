//! Answer synthesis.
//!
//! Builds a bounded prompt from the ranked context, calls the generation
//! backend once, and returns the answer together with the provenance of the
//! passages that actually made it into the prompt. Generation failures are
//! surfaced, never papered over: an unanswered query beats a fabricated one.

pub mod ollama;

pub use ollama::OllamaGenerator;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::errors::RagError;
use crate::fallback::SourceMode;
use crate::retrieval::{SearchResult, SourceTag};

/// Language-model backend seam.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_id(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, RagError>;

    async fn health_check(&self) -> bool;
}

/// Where a cited passage came from.
#[derive(Debug, Clone, Serialize)]
pub struct Provenance {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub score: f32,
    pub source: SourceTag,
}

impl From<&SearchResult> for Provenance {
    fn from(result: &SearchResult) -> Self {
        Self {
            reference: result.reference.clone(),
            title: result.title.clone(),
            score: result.score,
            source: result.source,
        }
    }
}

/// Synthesized answer with provenance and the mode that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub mode: SourceMode,
    pub sources: Vec<Provenance>,
}

pub struct AnswerSynthesizer {
    generator: Arc<dyn Generator>,
    max_context_chars: usize,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn Generator>, max_context_chars: usize) -> Self {
        Self {
            generator,
            max_context_chars,
        }
    }

    /// Generate an answer for `query` grounded in `context`.
    ///
    /// Context passages are consumed in rank order until the character
    /// budget is spent; whatever was dropped never appears in the cited
    /// sources. With no usable context the model is explicitly told there
    /// is no grounding instead of being handed an empty context block.
    pub async fn synthesize(
        &self,
        query: &str,
        context: &[SearchResult],
        mode: SourceMode,
    ) -> Result<Answer, RagError> {
        let (prompt, included) = self.build_prompt(query, context, mode);
        let text = self.generator.generate(&prompt).await?;

        Ok(Answer {
            text,
            mode,
            sources: included,
        })
    }

    fn build_prompt(
        &self,
        query: &str,
        context: &[SearchResult],
        mode: SourceMode,
    ) -> (String, Vec<Provenance>) {
        let mut parts = Vec::new();
        let mut included = Vec::new();
        let mut used = 0;

        for result in context {
            let formatted = match result.source {
                SourceTag::Local => format!("[Score: {:.3}] {}", result.score, result.text),
                SourceTag::Web => format!(
                    "[Web: {}] {}",
                    result.title.as_deref().unwrap_or(&result.reference),
                    result.text
                ),
            };
            let cost = formatted.chars().count();
            if used + cost > self.max_context_chars {
                // Ranked order means everything after this is lower-ranked;
                // truncation drops the tail, not the head.
                break;
            }
            used += cost;
            parts.push(formatted);
            included.push(Provenance::from(result));
        }

        if mode == SourceMode::Empty || included.is_empty() {
            let prompt = format!(
                "No supporting documents or web results were found for this \
                 question.\n\nQuestion: {query}\n\nAnswer from general knowledge \
                 if you can, and state clearly that the answer is not grounded \
                 in any retrieved source. Do not invent citations.\n\nAnswer:"
            );
            return (prompt, Vec::new());
        }

        let prompt = format!(
            "Context information:\n{}\n\nQuestion: {query}\n\nPlease answer the \
             question based on the provided context. If the context doesn't \
             contain enough information to answer the question, say so \
             clearly.\n\nAnswer:",
            parts.join("\n\n")
        );
        (prompt, included)
    }
}
