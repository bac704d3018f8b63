//! Crisis guardrail
//!
//! A cheap keyword prefilter decides whether a message needs a second look.
//! Only then is the completion service asked to confirm, which filters out
//! idioms like "me muero de la risa". When confirmation fails the prefilter
//! is trusted: the signal keeps a reduced confidence but is marked
//! unconfirmed, which still replaces the turn.

use crate::completion::{complete_within, extract_json_object, CallPurpose, CompletionRequest, CompletionService};
use crate::error::CoachError;
use crate::memory::ChatMessage;
use crate::models::CrisisSignal;
use crate::Result;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Fixed reply for a confirmed crisis. Nothing else is said in that turn.
pub const CRISIS_MESSAGE: &str = "Escucho que estás en un momento muy difícil. Por favor, busca apoyo inmediato: **llama al 4141** (línea gratuita y confidencial del MINSAL). No estás sola/o.";

/// Appended to a normal reply when the confirmation came back with a low confidence.
pub const HELPLINE_NOTICE: &str = "Si en algún momento sientes que no puedes más, llama al 4141 (línea MINSAL gratuita). Están para ayudarte 24/7.";

/// Risk terms, matched against the lowercased message
const RISK_TERMS: &[&str] = &[
    "suicid",
    "quitarme la vida",
    "no quiero vivir",
    "hacerme daño",
    "matarme",
    "morirme",
    "quiero morir",
    "me muero",
    "autolesi",
    "cortarme",
    "desaparecer para siempre",
];

const CONFIRMATION_PROMPT: &str = r#"Eres un clasificador de riesgo para un asistente de estudio.
Decide si el mensaje del estudiante expresa riesgo real de suicidio o autolesión.
Las expresiones idiomáticas ("me muero de la risa", "me mata este ramo") NO son riesgo.
Responde SOLO con JSON: {"is_crisis": true|false, "confidence": 0.0-1.0, "reason": "texto breve"}"#;

const CONFIRMATION_MAX_TOKENS: u32 = 150;

#[derive(Debug, Deserialize)]
struct Verdict {
    is_crisis: bool,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    reason: String,
}

pub struct CrisisGuardrail {
    completion: Arc<dyn CompletionService>,
    timeout: Duration,
    fallback_confidence: f32,
}

impl CrisisGuardrail {
    pub fn new(completion: Arc<dyn CompletionService>, timeout: Duration, fallback_confidence: f32) -> Self {
        Self {
            completion,
            timeout,
            fallback_confidence,
        }
    }

    /// True when any risk term appears in the message.
    pub fn prefilter(text: &str) -> bool {
        let lowered = text.to_lowercase();
        RISK_TERMS.iter().any(|term| lowered.contains(term))
    }

    pub async fn check(&self, text: &str) -> CrisisSignal {
        if !Self::prefilter(text) {
            return CrisisSignal::clear();
        }

        match self.confirm(text).await {
            Ok(signal) => {
                info!(
                    is_crisis = signal.is_crisis,
                    confidence = signal.confidence,
                    "Crisis prefilter matched, confirmation received"
                );
                signal
            }
            Err(e) => {
                warn!("Crisis confirmation failed, trusting prefilter: {}", e);
                CrisisSignal {
                    is_crisis: true,
                    confidence: self.fallback_confidence,
                    reason: "prefilter".to_string(),
                    unconfirmed: true,
                }
            }
        }
    }

    async fn confirm(&self, text: &str) -> Result<CrisisSignal> {
        let request = CompletionRequest::new(CallPurpose::CrisisCheck, CONFIRMATION_PROMPT)
            .with_message(ChatMessage::user(text))
            .with_temperature(0.0)
            .with_max_tokens(CONFIRMATION_MAX_TOKENS);

        let raw = complete_within(self.completion.as_ref(), request, self.timeout).await?;
        let value = extract_json_object(&raw)
            .ok_or_else(|| CoachError::MalformedExtraction(format!("no JSON verdict in {:?}", raw)))?;
        let verdict: Verdict = serde_json::from_value(value)?;

        if !verdict.confidence.is_finite() {
            return Err(CoachError::MalformedExtraction(
                "non-finite crisis confidence".to_string(),
            ));
        }

        Ok(CrisisSignal {
            is_crisis: verdict.is_crisis,
            confidence: verdict.confidence.clamp(0.0, 1.0),
            reason: verdict.reason,
            unconfirmed: false,
        })
    }
}
