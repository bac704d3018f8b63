//! Context Window Management
//!
//! Chooses which recent messages accompany a strategy request.

use crate::memory::store::{ChatMessage, ChatRole};

/// Keeps the last `max_messages` turns of a history
#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    max_messages: usize,
}

impl ContextWindow {
    pub fn new(max_messages: usize) -> Self {
        Self { max_messages }
    }

    /// Recent messages, oldest first.
    ///
    /// Callers often store the current user message before the turn runs; that
    /// trailing copy is dropped because the request appends it itself.
    pub fn prepare<'a>(&self, history: &'a [ChatMessage], current_text: &str) -> &'a [ChatMessage] {
        let mut end = history.len();
        if let Some(last) = history.last() {
            if last.role == ChatRole::User && last.text.trim() == current_text.trim() {
                end -= 1;
            }
        }

        let start = end.saturating_sub(self.max_messages);
        &history[start..end]
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(10)
    }
}
