//! Sled-backed conversation log: chat exchanges and user feedback.
//!
//! Keys are a zero-padded sled sequence id (`Db::generate_id`), so byte order is insertion
//! order even within one millisecond and "most recent" is a reverse scan.

use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use uuid::Uuid;

const HISTORY_TREE: &str = "history";
const FEEDBACK_TREE: &str = "feedback";

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid feedback: {0}")]
    InvalidFeedback(String),
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn record_key(seq: u64) -> String {
    format!("{:020}", seq)
}

/// One user question and the answer that was returned for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub id: Uuid,
    pub timestamp_ms: i64,
    pub user: String,
    pub bot: String,
}

/// Feedback submitted from the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub timestamp_ms: i64,
    /// Category chosen in the form (e.g. "suggestion", "bug").
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Star rating, 1–5. Kept wide so out-of-range form values reach validation.
    #[serde(default)]
    pub rating: Option<i64>,
    pub message: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl FeedbackRecord {
    pub fn new(kind: impl Into<String>, rating: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp_ms: 0,
            kind: kind.into(),
            rating,
            message: message.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.message.trim().is_empty() {
            return Err(HistoryError::InvalidFeedback("message must not be empty".into()));
        }
        if let Some(r) = self.rating {
            if !(1..=5).contains(&r) {
                return Err(HistoryError::InvalidFeedback(format!(
                    "rating must be between 1 and 5 (got {})",
                    r
                )));
            }
        }
        Ok(())
    }
}

/// Append-only store for exchanges and feedback.
pub struct ConversationLog {
    db: Db,
}

impl ConversationLog {
    /// Opens or creates the log at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn save_exchange(&self, user: &str, bot: &str) -> Result<ExchangeRecord, HistoryError> {
        let record = ExchangeRecord {
            id: Uuid::new_v4(),
            timestamp_ms: now_ms(),
            user: user.to_string(),
            bot: bot.to_string(),
        };
        let tree = self.db.open_tree(HISTORY_TREE)?;
        let key = record_key(self.db.generate_id()?);
        tree.insert(key.as_bytes(), serde_json::to_vec(&record)?)?;
        tracing::debug!(target: "dlp::history", key = %key, "Exchange recorded");
        Ok(record)
    }

    /// Newest first.
    pub fn recent_exchanges(&self, limit: usize) -> Result<Vec<ExchangeRecord>, HistoryError> {
        self.recent(HISTORY_TREE, limit)
    }

    /// Validates, stamps and stores the feedback. Returns the stored record.
    /// A rating of 0 (form left unrated) and a blank email are stored as absent.
    pub fn save_feedback(&self, mut feedback: FeedbackRecord) -> Result<FeedbackRecord, HistoryError> {
        if feedback.rating == Some(0) {
            feedback.rating = None;
        }
        if feedback.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            feedback.email = None;
        }
        feedback.validate()?;
        let id = Uuid::new_v4();
        feedback.id = Some(id);
        feedback.timestamp_ms = now_ms();
        let tree = self.db.open_tree(FEEDBACK_TREE)?;
        let key = record_key(self.db.generate_id()?);
        tree.insert(key.as_bytes(), serde_json::to_vec(&feedback)?)?;
        tracing::info!(
            target: "dlp::history",
            kind = %feedback.kind,
            rating = ?feedback.rating,
            "Feedback recorded"
        );
        Ok(feedback)
    }

    /// Newest first.
    pub fn recent_feedback(&self, limit: usize) -> Result<Vec<FeedbackRecord>, HistoryError> {
        self.recent(FEEDBACK_TREE, limit)
    }

    fn recent<T: serde::de::DeserializeOwned>(&self, tree: &str, limit: usize) -> Result<Vec<T>, HistoryError> {
        let tree = self.db.open_tree(tree)?;
        let mut out = Vec::new();
        for item in tree.iter().rev().take(limit) {
            let (_, bytes) = item?;
            // Skip undecodable rows rather than failing the whole read.
            if let Ok(record) = serde_json::from_slice::<T>(&bytes) {
                out.push(record);
            }
        }
        Ok(out)
    }
}
