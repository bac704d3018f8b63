//! Slot extraction
//!
//! The completion service proposes slot values as JSON; anything it cannot
//! deliver is covered by the lexical rules. `extract` never fails.

pub mod lexical;

pub use lexical::extract_lexical;

use crate::completion::{complete_within, extract_json_object, CallPurpose, CompletionRequest, CompletionService};
use crate::error::CoachError;
use crate::memory::ChatMessage;
use crate::models::{Slots, TimeBlock};
use crate::Result;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const EXTRACTION_TEMPERATURE: f32 = 0.2;
const EXTRACTION_MAX_TOKENS: u32 = 500;

const EXTRACTION_PROMPT: &str = r#"Extrae como JSON compacto los campos del texto del usuario:
- sentimiento: aburrimiento|frustracion|ansiedad_error|dispersion_rumiacion|baja_autoeficacia|otro
- sentimiento_otro: texto libre si sentimiento es "otro"
- tipo_tarea: ensayo|esquema|borrador|lectura_tecnica|resumen|resolver_problemas|protocolo_lab|mcq|presentacion|coding_bugfix|programacion|proofreading
- ramo: nombre del ramo o materia
- plazo: hoy|<24h|esta_semana|>1_semana
- fase: ideacion|planificacion|ejecucion|revision
- tiempo_bloque: 10|12|15|25

Si un campo no aparece, usa null. Responde SOLO con JSON válido, sin texto adicional."#;

pub struct SlotExtractor {
    completion: Arc<dyn CompletionService>,
    timeout: Duration,
}

impl SlotExtractor {
    pub fn new(completion: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self { completion, timeout }
    }

    /// Merged slots for this message: `current` updated with whatever was found.
    pub async fn extract(&self, text: &str, current: &Slots) -> Slots {
        let update = match self.extract_structured(text, current).await {
            Ok(update) => {
                debug!(?update, "Structured extraction succeeded");
                update
            }
            Err(e) => {
                warn!("Structured extraction failed, using lexical rules: {}", e);
                extract_lexical(text)
            }
        };

        current.merge(&update)
    }

    async fn extract_structured(&self, text: &str, current: &Slots) -> Result<Slots> {
        let current_json = serde_json::to_string(current)?;
        let prompt = format!(
            "Texto del usuario: \"{}\"\n\nSlots actuales: {}\n\nJSON extraído:",
            text, current_json
        );

        let request = CompletionRequest::new(CallPurpose::SlotExtraction, EXTRACTION_PROMPT)
            .with_message(ChatMessage::user(prompt))
            .with_temperature(EXTRACTION_TEMPERATURE)
            .with_max_tokens(EXTRACTION_MAX_TOKENS);

        let raw = complete_within(self.completion.as_ref(), request, self.timeout).await?;
        parse_slots(&raw)
    }
}

/// Slots from a model answer. Out-of-vocabulary fields are dropped one by one;
/// an answer without any JSON object is an error.
pub fn parse_slots(raw: &str) -> Result<Slots> {
    let value = extract_json_object(raw)
        .ok_or_else(|| CoachError::MalformedExtraction(format!("no JSON object in {:?}", raw)))?;

    let fields = value
        .as_object()
        .ok_or_else(|| CoachError::MalformedExtraction("expected a JSON object".to_string()))?;

    Ok(Slots {
        feeling: field(fields, "sentimiento"),
        feeling_other: text_field(fields, "sentimiento_otro"),
        task_type: field(fields, "tipo_tarea"),
        subject: text_field(fields, "ramo"),
        deadline: field(fields, "plazo"),
        phase: field(fields, "fase"),
        time_block: time_block_field(fields),
    })
}

fn field<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str) -> Option<T> {
    let value = fields.get(key)?;
    if value.is_null() {
        return None;
    }

    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(field = key, %value, "Dropping extracted value outside the allowed set");
            None
        }
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accepts `15` and `"15"`.
fn time_block_field(fields: &Map<String, Value>) -> Option<TimeBlock> {
    let minutes = match fields.get("tiempo_bloque")? {
        Value::Null => return None,
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    let block = minutes
        .and_then(|m| u32::try_from(m).ok())
        .and_then(TimeBlock::new);
    if block.is_none() {
        warn!(field = "tiempo_bloque", "Dropping extracted value outside the allowed set");
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::MockCompletion;
    use crate::models::{Deadline, Feeling, Phase, TaskType};

    fn extractor(mock: MockCompletion) -> SlotExtractor {
        SlotExtractor::new(Arc::new(mock), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_structured_answer_is_merged() {
        let mock = MockCompletion::replying(
            r#"```json
{"sentimiento":"frustracion","tipo_tarea":"resolver_problemas","ramo":"cálculo","plazo":null,"fase":null,"tiempo_bloque":null}
```"#,
        );
        let current = Slots {
            deadline: Some(Deadline::ThisWeek),
            ..Slots::default()
        };

        let slots = extractor(mock).extract("no me salen los ejercicios", &current).await;

        assert_eq!(slots.feeling, Some(Feeling::Frustration));
        assert_eq!(slots.task_type, Some(TaskType::ProblemSolving));
        assert_eq!(slots.subject.as_deref(), Some("cálculo"));
        assert_eq!(slots.deadline, Some(Deadline::ThisWeek));
    }

    #[tokio::test]
    async fn test_unavailable_service_falls_back_to_lexical() {
        let slots = extractor(MockCompletion::unavailable())
            .extract(
                "Estoy aburrido, tengo que hacer un ensayo para hoy, recién estoy empezando",
                &Slots::default(),
            )
            .await;

        assert_eq!(slots.feeling, Some(Feeling::Boredom));
        assert_eq!(slots.task_type, Some(TaskType::Essay));
        assert_eq!(slots.deadline, Some(Deadline::Today));
        assert_eq!(slots.phase, Some(Phase::Ideation));
    }

    #[tokio::test]
    async fn test_prose_answer_falls_back_to_lexical() {
        let mock = MockCompletion::replying("No estoy segura de qué campos hay.");
        let slots = extractor(mock).extract("estoy revisando", &Slots::default()).await;
        assert_eq!(slots.phase, Some(Phase::Review));
    }

    #[tokio::test]
    async fn test_fallback_never_regresses_known_slots() {
        let current = Slots {
            feeling: Some(Feeling::ErrorAnxiety),
            task_type: Some(TaskType::Summary),
            ..Slots::default()
        };

        let slots = extractor(MockCompletion::unavailable())
            .extract("ok", &current)
            .await;
        assert_eq!(slots, current);
    }

    #[test]
    fn test_invalid_field_is_dropped_alone() {
        let slots = parse_slots(
            r#"{"sentimiento":"euforia","tipo_tarea":"ensayo","plazo":"<24h","tiempo_bloque":"25"}"#,
        )
        .unwrap();

        assert_eq!(slots.feeling, None);
        assert_eq!(slots.task_type, Some(TaskType::Essay));
        assert_eq!(slots.deadline, Some(Deadline::Within24h));
        assert_eq!(slots.time_block, TimeBlock::new(25));
    }

    #[test]
    fn test_unlisted_time_block_is_dropped() {
        let slots = parse_slots(r#"{"tiempo_bloque": 45}"#).unwrap();
        assert_eq!(slots.time_block, None);
    }

    #[test]
    fn test_missing_json_is_malformed() {
        let result = parse_slots("sentimiento: aburrimiento");
        assert!(matches!(result, Err(CoachError::MalformedExtraction(_))));
    }
}
