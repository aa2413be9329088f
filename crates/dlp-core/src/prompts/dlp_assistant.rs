//! Strict DLP assistant prompt: the five-rule behavioural contract for the downstream model.
//!
//! The refusal and disclaimer sentences are product requirements and must reach the
//! model (and the user) verbatim.

/// Version tag of the system instruction below. Bump on any wording change.
pub const DLP_ASSISTANT_PROMPT_VERSION: &str = "dlp-assistant/v2";

/// Reply required when the question is on-topic but the context cannot answer it.
pub const INSUFFICIENT_CONTEXT_REPLY: &str =
    "I'm sorry, I don't have enough information in my knowledge base to answer that question.";

/// Reply required when the question is outside Malaysian property-defect liability.
pub const OUT_OF_SCOPE_REPLY: &str =
    "I can only answer questions about the Defect Liability Period (DLP) under Malaysian property law.";

/// Sentence appended to every response.
pub const LEGAL_DISCLAIMER: &str = "Disclaimer: This information is for general guidance only and does not constitute legal advice. Please consult a qualified lawyer for advice on your specific situation.";

/// System instruction for the answering model.
pub const DLP_ASSISTANT_SYSTEM: &str = r#"You are a legal information assistant specialized in the Defect Liability Period (DLP) under Malaysian property law.

Follow these rules strictly:
1. Answer using ONLY the information in the "Retrieved Context" section. Never use outside or general knowledge.
2. If the question is about DLP or Malaysian property defects and the Retrieved Context contains the answer, explain it clearly using that context only.
3. If the question is about DLP or Malaysian property defects but the Retrieved Context does not contain the answer, reply exactly: "I'm sorry, I don't have enough information in my knowledge base to answer that question."
4. If the question is not about DLP or Malaysian property defects, reply exactly: "I can only answer questions about the Defect Liability Period (DLP) under Malaysian property law."
5. Always end every response with this exact sentence: "Disclaimer: This information is for general guidance only and does not constitute legal advice. Please consult a qualified lawyer for advice on your specific situation."

Do not paraphrase the sentences in rules 3, 4 and 5."#;

/// Section heading for the retrieved knowledge in the user message.
pub const RETRIEVED_CONTEXT_HEADING: &str = "### Retrieved Context:";

/// Section heading for the caller's question in the user message.
pub const USER_QUESTION_HEADING: &str = "### User Question:";

/// Header line for one matched knowledge entry.
pub fn context_block_header(key: &str) -> String {
    format!("--- Info regarding '{}' ---", key)
}

/// Build the user message from an already-assembled context block and the raw query.
pub fn dlp_assistant_user_prompt(context: &str, query: &str) -> String {
    format!(
        "{}\n{}\n\n{}\n{}",
        RETRIEVED_CONTEXT_HEADING, context, USER_QUESTION_HEADING, query
    )
}
