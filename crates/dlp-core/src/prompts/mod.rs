//! Prompt templates and the envelope handed to the LLM gateway.

pub mod dlp_assistant;

pub use dlp_assistant::{
    context_block_header, dlp_assistant_user_prompt, DLP_ASSISTANT_PROMPT_VERSION, DLP_ASSISTANT_SYSTEM,
    INSUFFICIENT_CONTEXT_REPLY, LEGAL_DISCLAIMER, OUT_OF_SCOPE_REPLY,
};

use crate::knowledge::{RetrievalResult, NO_DOCUMENTS_FOUND};
use serde::Serialize;

/// System + user message pair for one completion call. Built per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptEnvelope {
    pub system_message: &'static str,
    pub user_message: String,
}

/// Pure string assembly: same query and retrieval always give the same envelope.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    system: &'static str,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            system: DLP_ASSISTANT_SYSTEM,
        }
    }

    pub fn build(&self, query: &str, retrieval: &RetrievalResult<'_>) -> PromptEnvelope {
        PromptEnvelope {
            system_message: self.system,
            user_message: dlp_assistant_user_prompt(&Self::format_context(retrieval), query),
        }
    }

    /// Matched entries as `--- Info regarding '<key>' ---\n<text>` blocks separated by a
    /// blank line, or the no-documents marker.
    pub fn format_context(retrieval: &RetrievalResult<'_>) -> String {
        match retrieval {
            RetrievalResult::NoMatch => NO_DOCUMENTS_FOUND.to_string(),
            RetrievalResult::Matches(entries) => entries
                .iter()
                .map(|e| format!("{}\n{}", context_block_header(&e.key), e.text))
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
