//! HTTP handlers for the chat pipeline, static content, feedback and history.

pub(crate) mod chat;
pub(crate) mod content;
pub(crate) mod feedback;
