//! Curated DLP knowledge base (keyword retrieval) and static reference content.
//!
//! ## Knowledge Layout
//!
//! | Source              | Type              | Used by                                  |
//! |---------------------|-------------------|------------------------------------------|
//! | Topic entries       | `KnowledgeBase`   | Substring retrieval for every chat query |
//! | Guidelines          | `ReferenceRecord` | `/api/guidelines` (UI content)           |
//! | Legal references    | `ReferenceRecord` | `/api/legal-references` (UI content)     |
//!
//! The knowledge base is built once at startup and never mutated afterwards, so a
//! single `Arc<KnowledgeBase>` can be shared by every request without locking.

mod bootstrap;
mod store;

pub use bootstrap::{guidelines, legal_references, ReferenceRecord, DLP_GUIDELINES, DLP_RULES, LEGAL_REFERENCES};
pub use store::{KnowledgeBase, KnowledgeEntry, KnowledgeError, RetrievalResult, NO_DOCUMENTS_FOUND};
