//! Conversation memory
//!
//! Message history owned by the caller, and the recent-message window that
//! accompanies strategy requests.

pub mod context_manager;
pub mod store;

pub use context_manager::ContextWindow;
pub use store::{ChatMessage, ChatRole, ConversationHistory};
