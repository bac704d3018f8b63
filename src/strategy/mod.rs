//! Strategy generation
//!
//! The completion service writes the strategy; when it cannot, a chain of
//! canned templates does. A turn always ends up with a strategy.

pub mod templates;

use crate::completion::{complete_within, CallPurpose, CompletionRequest, CompletionService};
use crate::error::CoachError;
use crate::memory::{ChatMessage, ContextWindow};
use crate::models::{Construal, SessionState, Slots, TimeBlock};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const COACH_NAME: &str = "Flou";

const STRATEGY_TEMPERATURE: f32 = 0.75;
const STRATEGY_MAX_TOKENS: u32 = 400;
const REPEAT_DETAIL_CHARS: usize = 80;

/// Where a strategy came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategySource {
    Model,
    Intent,
    Combination,
    FitGap,
    TaskType,
    Keywords,
    Generic,
}

#[derive(Debug, Clone)]
pub struct Strategy {
    pub text: String,
    pub source: StrategySource,
}

/// Everything the generator reads for one turn
pub struct StrategyInput<'a> {
    pub session: &'a SessionState,
    pub user_text: &'a str,
    pub context: &'a str,
    pub history: &'a [ChatMessage],
    /// The previous strategy just failed; a new task strategy is owed, not a chat reply
    pub recalibrating: bool,
}

pub struct StrategyGenerator {
    completion: Arc<dyn CompletionService>,
    timeout: Duration,
    window: ContextWindow,
    default_time_block: TimeBlock,
}

impl StrategyGenerator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        timeout: Duration,
        window: ContextWindow,
        default_time_block: TimeBlock,
    ) -> Self {
        Self {
            completion,
            timeout,
            window,
            default_time_block,
        }
    }

    pub async fn generate(&self, input: StrategyInput<'_>) -> Strategy {
        let strategy = match self.generate_with_model(&input).await {
            Ok(text) => Strategy {
                text,
                source: StrategySource::Model,
            },
            Err(e) => {
                warn!("Strategy generation failed, using canned strategy: {}", e);
                let time_block = input.session.slots.time_block.unwrap_or(self.default_time_block);
                let intent = if input.recalibrating {
                    None
                } else {
                    intent_reply(input.user_text, time_block)
                };
                intent.unwrap_or_else(|| {
                    fallback_strategy(
                        &input.session.slots,
                        input.session.construal.unwrap_or(Construal::Concrete),
                        input.user_text,
                        self.default_time_block,
                    )
                })
            }
        };

        debug!(source = ?strategy.source, "Strategy ready");

        Strategy {
            text: refresh_if_repeated(
                strategy.text,
                input.session.last_strategy.as_deref(),
                input.user_text,
            ),
            ..strategy
        }
    }

    async fn generate_with_model(&self, input: &StrategyInput<'_>) -> Result<String> {
        let info = context_block(input.session, input.context, self.default_time_block);
        let recent = self.window.prepare(input.history, input.user_text);

        let request = CompletionRequest::new(CallPurpose::Strategy, system_prompt())
            .with_messages(recent.iter().cloned())
            .with_message(ChatMessage::user(format!(
                "{}\n\nEstudiante: {}",
                info, input.user_text
            )))
            .with_temperature(STRATEGY_TEMPERATURE)
            .with_max_tokens(STRATEGY_MAX_TOKENS);

        let text = complete_within(self.completion.as_ref(), request, self.timeout).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(CoachError::ExternalService("empty strategy".to_string()));
        }
        Ok(text.to_string())
    }
}

/// Canned answer to a message that asks for something other than a task strategy.
pub fn intent_reply(user_text: &str, time_block: TimeBlock) -> Option<Strategy> {
    templates::for_intent(user_text).map(|template| Strategy {
        text: templates::render(template, time_block),
        source: StrategySource::Intent,
    })
}

/// Canned strategy: combination, fit gap, task type, keywords, then a generic plan.
pub fn fallback_strategy(slots: &Slots, construal: Construal, user_text: &str, default_block: TimeBlock) -> Strategy {
    let (template, source) = if let Some(t) = templates::for_combination(slots) {
        (t, StrategySource::Combination)
    } else if let Some(t) = templates::for_fit_gap(slots) {
        (t, StrategySource::FitGap)
    } else if let Some(task) = slots.task_type {
        (templates::for_task(task), StrategySource::TaskType)
    } else if let Some(t) = templates::for_keywords(user_text) {
        (t, StrategySource::Keywords)
    } else {
        (templates::GENERIC_PLAN, StrategySource::Generic)
    };

    let body = templates::render(template, slots.time_block.unwrap_or(default_block));
    let text = match templates::framing_line(construal) {
        Some(framing) => format!("{}\n\n{}", framing, body),
        None => body,
    };

    Strategy { text, source }
}

/// Acknowledge the latest message when the strategy would repeat verbatim.
pub fn refresh_if_repeated(reply: String, last: Option<&str>, user_text: &str) -> String {
    let Some(last) = last else {
        return reply;
    };
    if reply.trim() != last.trim() {
        return reply;
    }

    let detail = user_text.trim();
    let detail = if detail.is_empty() {
        "lo último que mencionaste".to_string()
    } else if detail.chars().count() > REPEAT_DETAIL_CHARS {
        let cut: String = detail.chars().take(REPEAT_DETAIL_CHARS).collect();
        format!("{}...", cut.trim_end())
    } else {
        detail.to_string()
    };

    format!(
        "Anotado lo que dices (\"{}\"). Mantengamos la micro-estrategia, pero avísame si quieres ajustarla:\n\n{}",
        detail, reply
    )
}

fn context_block(session: &SessionState, context: &str, default_block: TimeBlock) -> String {
    let slots = &session.slots;
    let or_unknown = |value: Option<String>| value.unwrap_or_else(|| "no especificado".to_string());

    let task = match (slots.task_type, slots.subject.as_deref()) {
        (Some(task), Some(subject)) => format!("{} de {}", task, subject),
        (Some(task), None) => task.to_string(),
        (None, _) => "no especificada".to_string(),
    };
    let feeling = match (slots.feeling, slots.feeling_other.as_deref()) {
        (Some(feeling), Some(other)) => format!("{} ({})", feeling, other),
        (feeling, _) => or_unknown(feeling.map(|f| f.to_string())),
    };

    let mut block = format!(
        "[Info contextual]:\n- Sentimiento: {}\n- Tarea: {}\n- Plazo: {}\n- Fase: {}\n- Tiempo: {} min",
        feeling,
        task,
        or_unknown(slots.deadline.map(|d| d.to_string())),
        or_unknown(slots.phase.map(|p| p.to_string())),
        slots.time_block.unwrap_or(default_block).minutes(),
    );

    if let Some(regulation) = session.regulation() {
        block.push_str("\n- Cómo plantearlo: ");
        block.push_str(templates::framing_guidance(regulation.focus, regulation.construal));
    }

    let context = context.trim();
    if !context.is_empty() {
        block.push_str("\n[Contexto de la app]: ");
        block.push_str(context);
    }

    block
}

fn system_prompt() -> String {
    format!(
        r#"Eres {name}, una tutora de motivación que ayuda a estudiantes universitarios.

Hablas de forma cercana y amigable, validas la emoción antes de aconsejar y usas lenguaje simple. Emojis ocasionales.

Cómo das consejos:
1. Valida su emoción en una frase.
2. Da UNA estrategia concreta, máximo 3 pasos simples, con una sub-tarea verificable (p.ej. "solo escribe 5 ideas principales").
3. Usa el bloque de tiempo indicado en la info contextual.
4. Termina preguntando cómo le fue y cómo se siente.

Reglas:
- Español de Chile, sin jergas. Máximo 200 palabras.
- Nunca muestres clasificaciones técnicas (A, B, promoción, prevención, símbolos).
- Recuerda lo que el estudiante contó antes y adapta lo que ya intentaron juntos.
- Si detectas riesgo de suicidio, di: "Por favor llama al 4141 (línea MINSAL gratuita). Están para ayudarte 24/7"."#,
        name = COACH_NAME
    )
}
