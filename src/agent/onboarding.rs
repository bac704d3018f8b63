//! Fixed replies and quick-reply menus of the dialogue.
//!
//! Menu values are plain sentences: they go back through slot extraction like
//! any typed message.

use crate::models::{QuickReply, SlotField};
use crate::strategy::COACH_NAME;

pub const WELLNESS_TARGET: &str = "NAVIGATE_WELLNESS";

pub const GREETING_AGAIN: &str = "Hola de nuevo 😊 ¿En qué puedo ayudarte hoy?";

pub const FAREWELL: &str = "¡Qué bueno escuchar eso! 😊 Me alegra mucho que te haya servido.\n\n\
Recuerda que siempre puedes volver cuando necesites apoyo o una nueva estrategia.\n\n\
¡Mucho éxito con tu tarea! 🚀";

pub const ESCALATION_OFFER: &str = "Veo que hemos intentado un par de estrategias y todavía no te sientes mejor 😔\n\n\
A veces lo que sentimos no es solo un tema de método de estudio. El cuerpo y la mente necesitan un respiro antes de seguir intentando.\n\n\
¿Qué te parece si primero hacemos un ejercicio breve de bienestar? Hay de respiración, relajación o mindfulness y toman 3 a 5 minutos. ¿Quieres probar?";

pub const HANDOFF: &str = "Perfecto 😊 Te llevo a la sección de Bienestar. Elige el ejercicio que más te llame la atención y tómate tu tiempo. Cuando termines, vuelve aquí y seguimos con tu tarea.";

pub const APOLOGY: &str = "Perdón, tuve un problema para procesar tu mensaje 🙏 ¿Me lo puedes contar de nuevo?";

/// Phrases that ask for the alternate activity, in any greeted state
const WELLNESS_INTENTS: &[&str] = &[
    "navigate_wellness",
    "derivar_bienestar",
    "quiero probar un ejercicio de bienestar",
    "ir a bienestar",
];

/// A negation earlier in the same clause cancels a wellness phrase
const NEGATIONS: &[&str] = &["no", "nunca", "tampoco", "ni"];

const BARE_GREETINGS: &[&str] = &[
    "hola",
    "holi",
    "hey",
    "hi",
    "buenas",
    "buenos días",
    "buenos dias",
    "buenas tardes",
    "buenas noches",
];

pub fn welcome() -> String {
    format!(
        "Hola! 👋 Soy {}, tu asistente metamotivacional.\n\n\
Estoy aquí para ayudarte a encontrar la mejor forma de trabajar según cómo te sientas y qué tengas que hacer.\n\n\
¿En qué puedo ayudarte hoy?",
        COACH_NAME
    )
}

fn normalized(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() || c == '¡' || c == '¿')
        .trim()
        .to_lowercase()
}

/// A message that is only a greeting, nothing else to extract
pub fn is_bare_greeting(text: &str) -> bool {
    BARE_GREETINGS.contains(&normalized(text).as_str())
}

pub fn wants_wellness(text: &str) -> bool {
    let lowered = text.to_lowercase();
    WELLNESS_INTENTS.iter().any(|intent| {
        lowered
            .match_indices(intent)
            .any(|(start, _)| !negated(&lowered[..start]))
    })
}

fn negated(before: &str) -> bool {
    let clause = before
        .rsplit(|c: char| matches!(c, '.' | ';' | '!' | '?'))
        .next()
        .unwrap_or(before);
    clause
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| NEGATIONS.contains(&word))
}

pub fn question(field: SlotField) -> &'static str {
    match field {
        SlotField::Feeling => "Antes de proponerte algo, cuéntame: ¿cómo te sientes ahora con lo que tienes que hacer?",
        SlotField::TaskType => "¿Qué tipo de tarea tienes pendiente?",
        SlotField::Deadline => "¿Para cuándo la necesitas?",
        SlotField::Phase => "¿En qué etapa vas?",
    }
}

pub fn menu(field: SlotField) -> Vec<QuickReply> {
    let options: &[(&str, &str)] = match field {
        SlotField::Feeling => &[
            ("😑 Aburrido/a", "me siento aburrido"),
            ("😤 Frustrado/a", "me siento frustrado"),
            ("😰 Ansioso/a", "me siento ansioso"),
            ("🌀 Distraído/a", "estoy distraído"),
            ("😕 Inseguro/a", "me siento inseguro"),
        ],
        SlotField::TaskType => &[
            ("✍️ Ensayo", "ensayo"),
            ("🧮 Ejercicios", "ejercicios"),
            ("📖 Lectura", "leer un paper"),
            ("🎤 Presentación", "presentación"),
            ("📝 Prueba", "prueba"),
            ("💻 Programación", "programar"),
        ],
        SlotField::Deadline => &[
            ("🔥 Hoy", "hoy"),
            ("⏰ Mañana", "mañana"),
            ("📅 Esta semana", "esta semana"),
            ("🗓️ Más adelante", "en unas semanas"),
        ],
        SlotField::Phase => &[
            ("🌱 Empezando", "recién empezando"),
            ("🗺️ Planificando", "planificando"),
            ("🚧 Avanzando", "avanzando"),
            ("🔍 Revisando", "revisando"),
        ],
    };

    options
        .iter()
        .map(|(label, value)| QuickReply::new(*label, *value))
        .collect()
}

pub fn escalation_menu() -> Vec<QuickReply> {
    vec![
        QuickReply::new("🌿 Ir a Bienestar", WELLNESS_TARGET),
        QuickReply::new(
            "🔄 Seguir con estrategias",
            "No gracias, sigamos intentando con otras estrategias",
        ),
    ]
}

pub fn handoff_menu() -> Vec<QuickReply> {
    vec![QuickReply::new("🌿 Ir a Bienestar", WELLNESS_TARGET)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::extract_lexical;
    use crate::models::Slots;

    #[test]
    fn test_menu_values_fill_their_slot() {
        for field in SlotField::MANDATORY {
            for reply in menu(field) {
                let slots = extract_lexical(&reply.value);
                assert!(slots.has(field), "{:?} menu value {:?}", field, reply.value);
            }
        }
    }

    #[test]
    fn test_bare_greetings() {
        assert!(is_bare_greeting("Hola!"));
        assert!(is_bare_greeting("  buenas tardes "));
        assert!(!is_bare_greeting("hola, tengo un ensayo"));
    }

    #[test]
    fn test_wellness_intent() {
        assert!(wants_wellness("NAVIGATE_WELLNESS"));
        assert!(wants_wellness("Quiero probar un ejercicio de bienestar"));
        assert!(!wants_wellness("No gracias, sigamos intentando con otras estrategias"));
    }

    #[test]
    fn test_negated_wellness_is_a_decline() {
        assert!(!wants_wellness("no, no quiero ir a bienestar, sigamos"));
        assert!(!wants_wellness("tampoco quiero probar un ejercicio de bienestar"));
        // negation only reaches within its own sentence
        assert!(wants_wellness("No sé. Quiero probar un ejercicio de bienestar"));
    }

    #[test]
    fn test_escalation_menu_shape() {
        let menu = escalation_menu();
        assert_eq!(menu.len(), 2);
        assert_eq!(menu[0].navigation_target(), Some("WELLNESS"));
        assert!(!wants_wellness(&menu[1].value));
        assert_eq!(extract_lexical(&menu[1].value), Slots::default());
    }
}
