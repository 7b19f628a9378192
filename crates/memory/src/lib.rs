//! Conversation history for localseek.

pub mod history;

pub use history::HistoryStore;
