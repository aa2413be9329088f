//! dlp-core: Malaysian DLP assistant core (knowledge base, strict prompts, query pipeline,
//! conversation log, configuration).
//!
//! The single externally visible pipeline operation is [`QueryProcessor::resolve`]; the HTTP
//! gateway and the concrete LLM backend live in the `dlp-gateway` and `dlp-skills` crates.

mod history;
mod knowledge;
mod orchestrator;
pub mod prompts;
mod shared;

pub use shared::CoreConfig;

pub use history::{ConversationLog, ExchangeRecord, FeedbackRecord, HistoryError};

pub use knowledge::{
    guidelines, legal_references, KnowledgeBase, KnowledgeEntry, KnowledgeError, ReferenceRecord,
    RetrievalResult, DLP_GUIDELINES, DLP_RULES, LEGAL_REFERENCES, NO_DOCUMENTS_FOUND,
};

pub use orchestrator::{
    GatewayError, LlmGateway, QueryProcessor, Resolution, ResolveMode, ResolveOutcome, SYSTEM_ERROR_PREFIX,
};

pub use prompts::{PromptBuilder, PromptEnvelope};
