//! Text-completion service port
//!
//! The coach treats the hosted model as an opaque `complete` call that can be slow,
//! fail, or answer with garbage. Every caller wraps it with a timeout and owns a
//! deterministic fallback.

use crate::error::CoachError;
use crate::memory::ChatMessage;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

pub mod gemini;
pub use gemini::GeminiClient;

/// Why a completion is requested. Drives logging and test routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallPurpose {
    CrisisCheck,
    SlotExtraction,
    Strategy,
}

impl fmt::Display for CallPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallPurpose::CrisisCheck => "crisis_check",
            CallPurpose::SlotExtraction => "slot_extraction",
            CallPurpose::Strategy => "strategy",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub purpose: CallPurpose,
    pub system_instruction: String,
    /// Conversation turns, the last one being the message to answer.
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(purpose: CallPurpose, system_instruction: impl Into<String>) -> Self {
        Self {
            purpose,
            system_instruction: system_instruction.into(),
            messages: Vec::new(),
            temperature: 0.0,
            max_tokens: 256,
        }
    }

    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Text of the final message, if any
    pub fn last_text(&self) -> Option<&str> {
        self.messages.last().map(|m| m.text.as_str())
    }
}

/// Trait for the hosted text-completion service
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Run one completion with an upper bound on latency.
pub async fn complete_within(
    service: &dyn CompletionService,
    request: CompletionRequest,
    timeout: Duration,
) -> Result<String> {
    let purpose = request.purpose;
    match tokio::time::timeout(timeout, service.complete(request)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(%purpose, timeout_ms = timeout.as_millis() as u64, "Completion call timed out");
            Err(CoachError::Timeout(timeout))
        }
    }
}

/// First well-formed JSON object embedded in a model answer.
///
/// Models wrap JSON in code fences or prose; any `{` that starts a complete
/// object is accepted.
pub fn extract_json_object(raw: &str) -> Option<Value> {
    raw.match_indices('{').find_map(|(idx, _)| {
        let mut stream = serde_json::Deserializer::from_str(&raw[idx..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) if value.is_object() => Some(value),
            _ => None,
        }
    })
}

/// Completion service used when no credentials are configured.
/// Every call fails, so the coach runs entirely on its deterministic fallbacks.
pub struct OfflineCompletion;

#[async_trait]
impl CompletionService for OfflineCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        Err(CoachError::ExternalService(format!(
            "offline mode: no completion service for {}",
            request.purpose
        )))
    }
}

type Handler = dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync;

/// Scriptable completion service for development & testing
pub struct MockCompletion {
    handler: Box<Handler>,
    delay: Duration,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockCompletion {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Same answer for every request
    pub fn replying(answer: impl Into<String>) -> Self {
        let answer = answer.into();
        Self::new(move |_| Ok(answer.clone()))
    }

    /// Every request fails like an unreachable service
    pub fn unavailable() -> Self {
        Self::new(|request| {
            Err(CoachError::ExternalService(format!(
                "simulated outage during {}",
                request.purpose
            )))
        })
    }

    /// One scripted answer per purpose; `None` makes that purpose fail.
    pub fn routed(crisis: Option<&str>, extraction: Option<&str>, strategy: Option<&str>) -> Self {
        let crisis = crisis.map(str::to_string);
        let extraction = extraction.map(str::to_string);
        let strategy = strategy.map(str::to_string);

        Self::new(move |request| {
            let answer = match request.purpose {
                CallPurpose::CrisisCheck => &crisis,
                CallPurpose::SlotExtraction => &extraction,
                CallPurpose::Strategy => &strategy,
            };
            answer.clone().ok_or_else(|| {
                CoachError::ExternalService(format!("no scripted answer for {}", request.purpose))
            })
        })
    }

    /// Simulated latency per request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn calls_for(&self, purpose: CallPurpose) -> usize {
        self.calls().iter().filter(|c| c.purpose == purpose).count()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.handler)(&request)
    }
}
