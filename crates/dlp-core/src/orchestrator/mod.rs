//! Query pipeline: RETRIEVE → BUILD_PROMPT → CALL_LLM → { SUCCESS | FAILED }.

mod gateway;

pub use gateway::{GatewayError, LlmGateway};

use crate::knowledge::{KnowledgeBase, RetrievalResult};
use crate::prompts::{PromptBuilder, PromptEnvelope};
use serde::Serialize;
use std::sync::Arc;

/// Prefix of every synthesized failure answer.
pub const SYSTEM_ERROR_PREFIX: &str = "System Error: ";

/// How retrieval hits are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Retrieval only supplies context; the model is always consulted.
    #[default]
    Augment,
    /// A hit returns the first matched entry's text without calling the model.
    /// Misses still go to the model.
    DirectMatch,
}

impl ResolveMode {
    /// Parses `augment` / `direct` (case-insensitive). Unknown values give `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "augment" => Some(Self::Augment),
            "direct" | "direct_match" => Some(Self::DirectMatch),
            _ => None,
        }
    }
}

/// Terminal state of one resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveOutcome {
    Generated,
    DirectMatch,
    Failed,
}

/// Answer plus what produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub answer: String,
    pub matched_keys: Vec<String>,
    pub outcome: ResolveOutcome,
}

/// Orchestrates knowledge lookup, prompt building and the gateway call.
/// Holds only shared read-only state, so one instance serves concurrent callers.
pub struct QueryProcessor {
    knowledge: Arc<KnowledgeBase>,
    gateway: Arc<dyn LlmGateway>,
    prompts: PromptBuilder,
    mode: ResolveMode,
}

impl QueryProcessor {
    pub fn new(knowledge: Arc<KnowledgeBase>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            knowledge,
            gateway,
            prompts: PromptBuilder::new(),
            mode: ResolveMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ResolveMode {
        self.mode
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn gateway_model(&self) -> &str {
        self.gateway.model()
    }

    /// Deterministic part of the pipeline (retrieval + prompt); no I/O.
    pub fn prepare(&self, query: &str) -> (RetrievalResult<'_>, PromptEnvelope) {
        let retrieval = self.knowledge.lookup(query);
        let envelope = self.prompts.build(query, &retrieval);
        (retrieval, envelope)
    }

    /// Resolves a non-empty query to an answer. Never fails: gateway errors become
    /// `System Error: <cause>`.
    pub async fn resolve(&self, query: &str) -> String {
        self.resolve_traced(query).await.answer
    }

    /// Same as [`resolve`](Self::resolve) but also reports the matched keys and outcome.
    pub async fn resolve_traced(&self, query: &str) -> Resolution {
        // RETRIEVE
        let retrieval = self.knowledge.lookup(query);
        let matched_keys: Vec<String> = retrieval.keys().into_iter().map(String::from).collect();
        tracing::debug!(
            target: "dlp::processor",
            matched = ?matched_keys,
            mode = ?self.mode,
            "Retrieval complete"
        );

        if self.mode == ResolveMode::DirectMatch {
            if let Some(entry) = retrieval.first() {
                tracing::debug!(target: "dlp::processor", key = %entry.key, "Direct match; model skipped");
                return Resolution {
                    answer: entry.text.clone(),
                    matched_keys,
                    outcome: ResolveOutcome::DirectMatch,
                };
            }
        }

        // BUILD_PROMPT
        let envelope = self.prompts.build(query, &retrieval);
        tracing::debug!(
            target: "dlp::processor",
            user_message_len = envelope.user_message.len(),
            "Prompt built"
        );

        // CALL_LLM
        match self.gateway.complete(&envelope).await {
            Ok(answer) => {
                tracing::debug!(target: "dlp::processor", answer_len = answer.len(), "Model answered");
                Resolution {
                    answer,
                    matched_keys,
                    outcome: ResolveOutcome::Generated,
                }
            }
            Err(e) => {
                tracing::error!(
                    target: "dlp::processor",
                    query = %query,
                    kind = e.kind(),
                    error = ?e,
                    model = %self.gateway.model(),
                    "LLM gateway call failed"
                );
                Resolution {
                    answer: format!("{}{}", SYSTEM_ERROR_PREFIX, e),
                    matched_keys,
                    outcome: ResolveOutcome::Failed,
                }
            }
        }
    }
}
