//! Conversation turn — one completed query/answer exchange.

use serde::{Deserialize, Serialize};

/// A completed exchange retained in history.
///
/// Only built from a stream that finished successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The user's literal input for that turn
    pub query: String,

    /// The full synthesized answer
    pub answer: String,
}

impl Turn {
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
        }
    }
}
