//! Lexical slot extraction
//!
//! Ordered pattern rules, evaluated top-down; the first matching rule wins.
//! More specific categories come before general ones, so an explicit bug
//! mention is a debugging task before it is a programming task.

use crate::models::{Deadline, Feeling, Phase, Slots, TaskType, TimeBlock};
use lazy_static::lazy_static;
use regex::Regex;

/// A pattern and the label it yields
pub struct LexicalRule<T> {
    pattern: Regex,
    pub label: T,
}

impl<T: Copy> LexicalRule<T> {
    fn new(pattern: &str, label: T) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("lexical rule pattern must compile"),
            label,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

lazy_static! {
    pub static ref DEADLINE_RULES: Vec<LexicalRule<Deadline>> = vec![
        LexicalRule::new(
            r"\bhoy\b|hoy d(í|i)a|\bahora\b|\burgente\b|\binmediato\b|\bya\b|al tiro|en este momento|\bpronto\b|cuanto antes",
            Deadline::Today,
        ),
        LexicalRule::new(
            r"\bma(ñ|n)ana\b|24\s*h(oras)?|para ma(ñ|n)|en un d(í|i)a|pasado ma(ñ|n)ana",
            Deadline::Within24h,
        ),
        LexicalRule::new(
            r"pr(ó|o)xima semana|la otra semana|esta semana|en unos d(í|i)as|en pocos d(í|i)as|fin de semana|para el (lunes|martes|mi(é|e)rcoles|jueves|viernes)",
            Deadline::ThisWeek,
        ),
        LexicalRule::new(
            r"\bmes\b|semanas|pr(ó|o)ximo mes|m(á|a)s adelante|largo plazo|tengo tiempo|no es urgente|con calma|para el otro mes",
            Deadline::BeyondWeek,
        ),
    ];

    pub static ref TASK_RULES: Vec<LexicalRule<TaskType>> = vec![
        LexicalRule::new(
            r"\bbug\b|\berror\b|debug|arreglar.*c(ó|o)digo|corregir.*c(ó|o)digo|\bfix\b",
            TaskType::Debugging,
        ),
        LexicalRule::new(
            r"\bcorregir\b|\brevis(ar|i(ó|o)n)\b.*\b(texto|ensayo|escrito|trabajo)\b|proof|edita(r|ci(ó|o)n)|\bpulir\b|mejorar\s+(el|mi)\s+(texto|ensayo)",
            TaskType::Proofreading,
        ),
        LexicalRule::new(
            r"\bensayo\b|\bessay\b|redacci(ó|o)n\s+de|escribir\s+(un|una)\s+(ensayo|essay|composici(ó|o)n|trabajo\s+escrito)|composici(ó|o)n\s+argumentativa",
            TaskType::Essay,
        ),
        LexicalRule::new(
            r"\bborrador\b|\bdraft\b|primera?\s+(versi(ó|o)n|intento)|versi(ó|o)n\s+(inicial|preliminar)",
            TaskType::Draft,
        ),
        LexicalRule::new(
            r"\besquema\b|\boutline\b|estructura\s+(de|del|para)|mapa\s+(conceptual|mental)|diagrama\s+de",
            TaskType::Outline,
        ),
        LexicalRule::new(
            r"presentaci(ó|o)n|\bslides?\b|\bppt\b|powerpoint|exposici(ó|o)n|\bdisertaci(ó|o)n\b|preparar.*presentar",
            TaskType::Presentation,
        ),
        LexicalRule::new(
            r"\bmcq\b|alternativas?|\btest\b|\bprueba\b|\bexamen\b|\bquiz\b|cuestionario",
            TaskType::MultipleChoice,
        ),
        LexicalRule::new(
            r"protocolo\s+(de\s+)?lab|laboratorio|experimento|pr(á|a)ctica\s+(de\s+)?lab|informe\s+de\s+lab",
            TaskType::LabProtocol,
        ),
        LexicalRule::new(
            r"\bproblemas?\b.*resolver|\bejercicios?\b|c(á|a)lculo|matem(á|a)tica|resolver.*(gu(í|i)a|tarea|problemas)",
            TaskType::ProblemSolving,
        ),
        LexicalRule::new(
            r"\bleer\b.*(paper|art(í|i)culo|texto|cap(í|i)tulo)|\bpaper\b|art(í|i)culo.*cient(í|i)fico|lectura.*t(é|e)cnica|estudiar.*(texto|libro|cap(í|i)tulo)",
            TaskType::TechnicalReading,
        ),
        LexicalRule::new(
            r"\bresumen\b|sintetizar|resumir|s(í|i)ntesis\s+de|extracto",
            TaskType::Summary,
        ),
        LexicalRule::new(
            r"\bprogramar\b|\bc(ó|o)digo\b|\bscript\b|desarrollo.*software|crear.*(programa|aplicaci(ó|o)n)",
            TaskType::Programming,
        ),
    ];

    pub static ref PHASE_RULES: Vec<LexicalRule<Phase>> = vec![
        LexicalRule::new(
            r"\bide(a|as|aci(ó|o)n)\b|\bbrainstorm|\bpensar\b.*ideas|inspiraci(ó|o)n|empezar.*idea|\binicio\b|pensando.*tema|buscar.*tema|no s(é|e).*qu(é|e).*escribir|\bempezando\b|\bcomenzando\b|reci(é|e)n empiezo|desde cero|en blanco",
            Phase::Ideation,
        ),
        LexicalRule::new(
            r"\bplan(ear)?\b|\bplanific(ar|ando|aci(ó|o)n)\b|\borganizar\b|\borganizando\b|\bestructurar\b|esquematizar|\bpreparar\b|definir.*estructura|armar.*(plan|estructura)|antes de empezar",
            Phase::Planning,
        ),
        LexicalRule::new(
            r"\bescribir\b|\bescribiendo\b|redacci(ó|o)n|\bhacer\b|\bhaciendo\b|\bresolver\b|\bresolviendo\b|\bejecutar\b|desarrollar|\btrabajando\b|en proceso|a mitad|avanzando",
            Phase::Execution,
        ),
        LexicalRule::new(
            r"\brevis(ar|ando|i(ó|o)n)\b|\beditar\b|\bproof\b|\bcorregir\b|verificar|chequear|\bpulir\b|ya.*casi|falta poco|\bfinal(es|izar)?\b",
            Phase::Review,
        ),
    ];

    pub static ref FEELING_RULES: Vec<LexicalRule<Feeling>> = vec![
        LexicalRule::new(
            r"\bfrustra(do|da|ci(ó|o)n)?\b|\benoja(do|da)?\b|\birrita(do|da)?\b|\bmolest(o|a|ado|ada)\b|\brabia\b|\bbronca\b|\bimpotente\b|\bharto\b|\bharta\b|no me sale|no.*funciona.*nada",
            Feeling::Frustration,
        ),
        LexicalRule::new(
            r"\bansiedad\b|\bansios(o|a)\b|miedo.*equivocar|\bnervios\b|\bnervios(o|a)\b|\bestresad(o|a)\b|\bagobiad(o|a)\b|\bpresionad(o|a)\b|\btens(o|a)\b|\bp(á|a)nico\b|\bpreocupad(o|a)\b|miedo.*fallar",
            Feeling::ErrorAnxiety,
        ),
        LexicalRule::new(
            r"\baburri(do|da|miento)\b|\blater(o|a)\b|\bfloj(o|a)\b|sin ganas|\bdesganad(o|a)\b|\bmon(ó|o)ton(o|a)\b|poco motivad(o|a)|\bdesmotivad(o|a)\b|no me interesa",
            Feeling::Boredom,
        ),
        LexicalRule::new(
            r"\bdispers(o|a|i(ó|o)n)\b|\brumia(ndo|ci(ó|o)n)?\b|\bdistra(í|i)d(o|a)\b|no me (puedo )?concentr(o|ar)|pensando en otra|no me enfoco|\bdesconcentrad(o|a)\b|mil cosas en la cabeza",
            Feeling::Distraction,
        ),
        LexicalRule::new(
            r"autoeficacia baja|\bno puedo\b|no soy capaz|\bincapaz\b|\binsegur(o|a)\b|\bdudo\b|no creo poder|no.*voy a lograr|no soy buen(o|a)|no sirvo",
            Feeling::LowSelfEfficacy,
        ),
    ];

    static ref COURSE_PATTERN: Regex =
        Regex::new(r"\b(?:ramo|curso|asignatura|materia|clase)\s+de\s+(\p{L}{3,})")
            .expect("course pattern must compile");

    static ref FOR_PATTERN: Regex =
        Regex::new(r"\bpara (?:el|la)\s+(\p{L}{3,})").expect("subject pattern must compile");

    static ref TIME_BLOCK_PATTERN: Regex =
        Regex::new(r"\b(\d{1,2})\s*(?:min\b|mins\b|minutos\b)").expect("time block pattern must compile");
}

/// Words that follow "para el/la" without naming a subject
const NOT_A_SUBJECT: &[&str] = &[
    "hoy", "mañana", "manana", "semana", "lunes", "martes", "miércoles", "miercoles", "jueves",
    "viernes", "sábado", "sabado", "domingo", "tarde", "noche", "prueba", "tarea", "entrega",
    "próxima", "proxima", "otra", "otro", "ramo", "clase", "curso",
];

fn first_match<T: Copy>(rules: &[LexicalRule<T>], text: &str) -> Option<T> {
    let lowered = text.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.label)
}

pub fn guess_deadline(text: &str) -> Option<Deadline> {
    first_match(&DEADLINE_RULES, text)
}

pub fn guess_task_type(text: &str) -> Option<TaskType> {
    first_match(&TASK_RULES, text)
}

pub fn guess_phase(text: &str) -> Option<Phase> {
    first_match(&PHASE_RULES, text)
}

pub fn guess_feeling(text: &str) -> Option<Feeling> {
    first_match(&FEELING_RULES, text)
}

/// Course name after "ramo de", "curso de", "para el"...
pub fn guess_subject(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    if let Some(course) = COURSE_PATTERN.captures(&lowered).and_then(|caps| caps.get(1)) {
        return Some(course.as_str().to_string());
    }

    FOR_PATTERN
        .captures_iter(&lowered)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|word| !NOT_A_SUBJECT.contains(word))
        .map(str::to_string)
}

/// "25 min" style mentions, only for the block sizes the coach proposes.
pub fn guess_time_block(text: &str) -> Option<TimeBlock> {
    let lowered = text.to_lowercase();
    TIME_BLOCK_PATTERN
        .captures_iter(&lowered)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .find_map(TimeBlock::new)
}

/// Every guess at once; fields without a match stay `None`.
pub fn extract_lexical(text: &str) -> Slots {
    Slots {
        feeling: guess_feeling(text),
        feeling_other: None,
        task_type: guess_task_type(text),
        subject: guess_subject(text),
        deadline: guess_deadline(text),
        phase: guess_phase(text),
        time_block: guess_time_block(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_message_fills_all_slots() {
        let slots =
            extract_lexical("Estoy aburrido, tengo que hacer un ensayo para hoy, recién estoy empezando");

        assert_eq!(slots.feeling, Some(Feeling::Boredom));
        assert_eq!(slots.task_type, Some(TaskType::Essay));
        assert_eq!(slots.deadline, Some(Deadline::Today));
        assert_eq!(slots.phase, Some(Phase::Ideation));
        assert_eq!(slots.subject, None);
    }

    #[test]
    fn test_bug_wins_over_programming() {
        assert_eq!(
            guess_task_type("tengo un bug en el código de mi app"),
            Some(TaskType::Debugging)
        );
        assert_eq!(
            guess_task_type("tengo que programar un script"),
            Some(TaskType::Programming)
        );
    }

    #[test]
    fn test_no_match_is_none() {
        let slots = extract_lexical("hola");
        assert_eq!(slots, Slots::default());
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let deadlines: Vec<_> = DEADLINE_RULES.iter().map(|r| r.label).collect();
        assert_eq!(
            deadlines,
            vec![Deadline::Today, Deadline::Within24h, Deadline::ThisWeek, Deadline::BeyondWeek]
        );

        let phases: Vec<_> = PHASE_RULES.iter().map(|r| r.label).collect();
        assert_eq!(
            phases,
            vec![Phase::Ideation, Phase::Planning, Phase::Execution, Phase::Review]
        );

        assert_eq!(TASK_RULES.first().map(|r| r.label), Some(TaskType::Debugging));
        assert_eq!(TASK_RULES.last().map(|r| r.label), Some(TaskType::Programming));
    }

    #[test]
    fn test_feeling_menu_values() {
        let cases = [
            ("me siento aburrido", Feeling::Boredom),
            ("me siento frustrado", Feeling::Frustration),
            ("me siento ansioso", Feeling::ErrorAnxiety),
            ("estoy distraído", Feeling::Distraction),
            ("me siento inseguro", Feeling::LowSelfEfficacy),
        ];
        for (text, expected) in cases {
            assert_eq!(guess_feeling(text), Some(expected), "{}", text);
        }
    }

    #[test]
    fn test_task_menu_values() {
        let cases = [
            ("ensayo", TaskType::Essay),
            ("ejercicios", TaskType::ProblemSolving),
            ("leer un paper", TaskType::TechnicalReading),
            ("presentación", TaskType::Presentation),
            ("prueba", TaskType::MultipleChoice),
            ("programar", TaskType::Programming),
        ];
        for (text, expected) in cases {
            assert_eq!(guess_task_type(text), Some(expected), "{}", text);
        }
    }

    #[test]
    fn test_deadline_menu_values() {
        let cases = [
            ("hoy", Deadline::Today),
            ("mañana", Deadline::Within24h),
            ("esta semana", Deadline::ThisWeek),
            ("en unas semanas", Deadline::BeyondWeek),
        ];
        for (text, expected) in cases {
            assert_eq!(guess_deadline(text), Some(expected), "{}", text);
        }
    }

    #[test]
    fn test_phase_menu_values() {
        let cases = [
            ("recién empezando", Phase::Ideation),
            ("planificando", Phase::Planning),
            ("avanzando", Phase::Execution),
            ("revisando", Phase::Review),
        ];
        for (text, expected) in cases {
            assert_eq!(guess_phase(text), Some(expected), "{}", text);
        }
    }

    #[test]
    fn test_subject_skips_deadline_words() {
        assert_eq!(guess_subject("es para el viernes"), None);
        assert_eq!(
            guess_subject("un informe para el ramo de química orgánica"),
            Some("química".to_string())
        );
        assert_eq!(
            guess_subject("una tarea para la clase de historia"),
            Some("historia".to_string())
        );
    }

    #[test]
    fn test_time_block_only_allowed_sizes() {
        assert_eq!(guess_time_block("puedo darle 25 minutos"), TimeBlock::new(25));
        assert_eq!(guess_time_block("tengo 20 min"), None);
    }
}
