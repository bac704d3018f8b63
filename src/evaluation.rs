//! Evaluation classifier
//!
//! Reads the student's reply to a strategy. Negative phrases are checked
//! before positive ones because they often contain them ("no me ayudó").

use crate::models::{EvaluationResult, QuickReply};

const WORSENED_PHRASES: &[&str] = &["peor", "me siento peor", "estoy peor", "más mal", "mas mal"];

const UNCHANGED_PHRASES: &[&str] = &[
    "no funcionó",
    "no funciono",
    "no me funcionó",
    "no me funciono",
    "no me ayudó",
    "no me ayudo",
    "sigo igual",
    "estoy igual",
    "igual que antes",
    "no mejoró",
    "no mejoro",
    "no ayudó",
    "no ayudo",
    "no sirvió",
    "no sirvio",
    "no me sirvió",
    "no me sirvio",
    "no me siento bien",
    "no estoy bien",
    "nada bien",
    "no me siento mejor",
    "no estoy mejor",
    "no estoy mejor que antes",
    "no mejor",
    "nada mejor",
    "no me siento mucho mejor",
    "no estoy mucho mejor",
];

const SUCCEEDED_PHRASES: &[&str] = &[
    "me ayudó",
    "me ayudo",
    "sí me ayudó",
    "si me ayudo",
    "funcionó bien",
    "funciono bien",
    "sí funcionó",
    "si funciono",
    "mejor",
    "me siento mejor",
    "estoy mejor",
    "mucho mejor",
    "bien",
    "muy bien",
    "genial",
    "excelente",
    "perfecto",
];

/// Whole-word phrase match on lowercased text
fn contains_phrase(text: &str, phrase: &str) -> bool {
    text.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        !before.map_or(false, char::is_alphanumeric) && !after.map_or(false, char::is_alphanumeric)
    })
}

fn matches_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| contains_phrase(text, phrase))
}

pub fn classify_evaluation(text: &str) -> EvaluationResult {
    let lowered = text.to_lowercase();

    if matches_any(&lowered, WORSENED_PHRASES) {
        EvaluationResult::Worsened
    } else if matches_any(&lowered, UNCHANGED_PHRASES) {
        EvaluationResult::Unchanged
    } else if matches_any(&lowered, SUCCEEDED_PHRASES) {
        EvaluationResult::Succeeded
    } else {
        EvaluationResult::Unrelated
    }
}

/// Menu shown under every strategy
pub fn evaluation_quick_replies() -> Vec<QuickReply> {
    vec![
        QuickReply::new("✅ Me ayudó", "me ayudó"),
        QuickReply::new("😐 Sigo igual", "sigo igual"),
        QuickReply::new("😟 No me sirvió", "no funcionó"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation_beats_positive_substring() {
        assert_eq!(classify_evaluation("no me ayudó"), EvaluationResult::Unchanged);
        assert_eq!(classify_evaluation("No funcionó"), EvaluationResult::Unchanged);
        assert_eq!(classify_evaluation("no me siento bien"), EvaluationResult::Unchanged);
    }

    #[test]
    fn test_negated_improvement_is_unchanged() {
        for reply in [
            "no me siento mejor",
            "No estoy mejor que antes",
            "nada mejor, la verdad",
            "no estoy mucho mejor",
        ] {
            assert_eq!(classify_evaluation(reply), EvaluationResult::Unchanged, "{}", reply);
        }
        assert_eq!(classify_evaluation("me siento mucho mejor"), EvaluationResult::Succeeded);
    }

    #[test]
    fn test_worsened() {
        assert_eq!(classify_evaluation("me siento peor que antes"), EvaluationResult::Worsened);
        assert_eq!(classify_evaluation("estoy más mal"), EvaluationResult::Worsened);
    }

    #[test]
    fn test_succeeded() {
        assert_eq!(classify_evaluation("¡Me ayudó harto!"), EvaluationResult::Succeeded);
        assert_eq!(classify_evaluation("genial, gracias"), EvaluationResult::Succeeded);
    }

    #[test]
    fn test_whole_words_only() {
        // "bienestar" contains "bien"
        assert_eq!(classify_evaluation("quiero ir a bienestar"), EvaluationResult::Unrelated);
        assert_eq!(classify_evaluation("tengo otra tarea"), EvaluationResult::Unrelated);
    }

    #[test]
    fn test_quick_reply_values_classify() {
        let results: Vec<_> = evaluation_quick_replies()
            .iter()
            .map(|reply| classify_evaluation(&reply.value))
            .collect();

        assert_eq!(
            results,
            vec![
                EvaluationResult::Succeeded,
                EvaluationResult::Unchanged,
                EvaluationResult::Unchanged
            ]
        );
    }
}
