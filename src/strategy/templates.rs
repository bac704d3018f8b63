//! Canned strategies used when the completion service cannot answer.
//!
//! `{tiempo}` is replaced with the session's block length in minutes.

use crate::models::{Construal, Deadline, Feeling, Phase, RegulatoryFocus, Slots, TaskType, TimeBlock};
use lazy_static::lazy_static;
use regex::Regex;

pub const TIME_PLACEHOLDER: &str = "{tiempo}";

pub const GENERIC_PLAN: &str = "Vamos directo a la acción. Haz este micro-plan:\n\
1. Anota en un post-it qué quieres dejar listo en los próximos {tiempo} minutos.\n\
2. Trabaja ese bloque con el celular lejos y enfócate solo en completar ese mini entregable.\n\
3. Al terminar, marca lo logrado y dime si necesitamos cambiar la táctica.";

pub fn render(template: &str, time_block: TimeBlock) -> String {
    template.replace(TIME_PLACEHOLDER, &time_block.minutes().to_string())
}

/// Strategy for a specific task and feeling, refined by phase or deadline where it matters.
pub fn for_combination(slots: &Slots) -> Option<&'static str> {
    let task = slots.task_type?;
    let feeling = slots.feeling?;
    let urgent = slots.deadline.map_or(false, Deadline::is_urgent);

    let template = match (task, feeling) {
        (TaskType::Essay, Feeling::Boredom) if slots.phase == Some(Phase::Ideation) => {
            "Entiendo que te aburra pensar en el ensayo. Te propongo algo diferente: en vez de buscar 'ideas', escribe 3 preguntas provocadoras sobre el tema, preguntas que te den curiosidad. {tiempo} minutos. Las ideas fluyen mejor así. ¿Cuál es el tema?"
        }
        (TaskType::Essay, Feeling::Boredom) => {
            "Entiendo que te aburra escribir. Prueba esto: escribe como si le explicaras el tema a un niño de 10 años, sin términos técnicos, solo ideas simples. {tiempo} minutos. Después lo formalizas. ¿De qué es el ensayo?"
        }
        (TaskType::Essay, Feeling::ErrorAnxiety) => {
            "Entiendo tu ansiedad con el ensayo. La presión por hacerlo perfecto paraliza. Te propongo un 'brain dump': anota todas las ideas sin estructura ni gramática. {tiempo} minutos. Después ordenas. ¿Cuál es el tema?"
        }
        (TaskType::Essay, Feeling::Frustration) if slots.phase.map_or(false, Phase::is_early) => {
            "Entiendo tu frustración. Cuando nos trabamos pensando, ayuda hacer algo concreto: haz solo un esquema de 3 puntos (inicio, medio y final) sin desarrollar. {tiempo} minutos. ¿De qué es el ensayo?"
        }
        (TaskType::Essay, Feeling::Frustration) => {
            "Entiendo tu frustración con el ensayo. Cuando nos trabamos escribiendo, ayuda cambiar de sección. ¿Hay alguna parte que sea más fácil o que te guste más? Empieza por esa. {tiempo} minutos."
        }
        (TaskType::ProblemSolving, Feeling::Boredom) => {
            "Entiendo que te aburran los ejercicios. Ponte un reto de velocidad: ¿cuántos puedes resolver en {tiempo} minutos? Sin revisar, solo resolver. Después revisas. ¿De qué materia son?"
        }
        (TaskType::ProblemSolving, Feeling::ErrorAnxiety) => {
            "Entiendo tu ansiedad con los ejercicios. El miedo a equivocarse paraliza. Resuélvelos en lápiz, permitiéndote borrar y equivocarte. Haz solo 3 sin juzgarte. {tiempo} minutos. ¿De qué materia son?"
        }
        (TaskType::ProblemSolving, Feeling::Frustration) => {
            "Entiendo tu frustración con los ejercicios. Salta los difíciles por ahora y haz solo los que sabes hacer. {tiempo} minutos. Vuelves a los difíciles después con más confianza."
        }
        (TaskType::ProblemSolving, Feeling::Distraction) => {
            "Entiendo que te cueste concentrarte. Los ejercicios ayudan porque son concretos: resuelve solo 1 ejercicio completo, sin el celular cerca. Unos {tiempo} minutos. Después decides si sigues."
        }
        (TaskType::TechnicalReading, Feeling::Boredom) => {
            "Entiendo que te aburra leer. Antes de empezar anota 3 preguntas y lee buscando sus respuestas, como detective. {tiempo} minutos. ¿De qué tema es la lectura?"
        }
        (TaskType::TechnicalReading, Feeling::ErrorAnxiety) => {
            "Entiendo tu ansiedad con la lectura. La presión por 'entender todo' agobia. Solo subraya lo que creas importante, sin tomar apuntes. {tiempo} minutos. Después decides qué hacer con eso."
        }
        (TaskType::TechnicalReading, Feeling::Distraction) => {
            "Entiendo que te cueste concentrarte al leer. Lee en voz alta, aunque sea susurrando; obliga a tu mente a enfocarse. Solo {tiempo} minutos de las primeras páginas."
        }
        (TaskType::TechnicalReading, _) if urgent => {
            "Tienes poco tiempo para leer, así que vamos con lectura estratégica: solo la introducción, la conclusión y el primer párrafo de cada sección. {tiempo} minutos. Captarás las ideas principales."
        }
        (TaskType::Presentation, Feeling::ErrorAnxiety) => {
            "Entiendo tu ansiedad con la presentación. Crea solo el índice de slides: sin diseño y sin texto extenso, solo títulos. {tiempo} minutos. El contenido viene después. ¿De qué tema es?"
        }
        (TaskType::Presentation, Feeling::Boredom) => {
            "Entiendo que te aburra hacer la presentación. Empieza buscando 3 imágenes o gráficos llamativos sobre tu tema. Solo visuales. {tiempo} minutos. Te dará ideas y es más entretenido."
        }
        (TaskType::Presentation, _) if slots.phase == Some(Phase::Ideation) => {
            "Estás empezando la presentación. Anota solo los 5 mensajes clave que quieres que tu audiencia recuerde, sin desarrollarlos. {tiempo} minutos. Eso es tu columna vertebral."
        }
        (TaskType::Debugging, Feeling::Frustration) => {
            "Entiendo tu frustración con el código. Prueba 'duck debugging': explícale tu código en voz alta a un objeto (o a mí), línea por línea. {tiempo} minutos. Muchas veces el error aparece al explicarlo. ¿Qué bug estás buscando?"
        }
        (TaskType::Debugging, Feeling::ErrorAnxiety) | (TaskType::Programming, Feeling::ErrorAnxiety) => {
            "Entiendo tu ansiedad al programar. El miedo a romper cosas paraliza. Haz una copia del código o un commit primero y luego experimenta sin miedo; si falla, vuelves atrás. {tiempo} minutos de prueba y error seguro."
        }
        (TaskType::Debugging, Feeling::Distraction) | (TaskType::Programming, Feeling::Distraction) => {
            "Entiendo que te cueste concentrarte programando. Programa solo una función pequeña, sin pensar en el resto, y pruébala. {tiempo} minutos. Lo concreto ayuda a enfocar. ¿Qué funcionalidad estás haciendo?"
        }
        (TaskType::Proofreading, Feeling::Boredom) => {
            "Entiendo que te aburra revisar. Revisa leyendo hacia atrás, de la última oración a la primera. Suena raro pero te obliga a mirar cada palabra. {tiempo} minutos. ¿Qué texto estás revisando?"
        }
        (TaskType::Proofreading, _) if urgent => {
            "Tienes poco tiempo para revisar, así que prioriza: busca solo errores graves (argumentos flojos, datos incorrectos, faltas evidentes). Sin perfeccionar. {tiempo} minutos."
        }
        _ => return None,
    };

    Some(template)
}

/// Reframing for a mismatch between what the task demands and how the student is.
pub fn for_fit_gap(slots: &Slots) -> Option<&'static str> {
    let task = slots.task_type?;
    let urgent = slots.deadline.map_or(false, Deadline::is_urgent);
    let early = slots.phase.map_or(false, Phase::is_early);

    if task.is_creative() && urgent {
        return Some("Tu tarea es creativa pero el plazo es cortísimo, y eso choca: explorar pide calma y el plazo pide cerrar. Cambiemos a modo asegurar: define solo el mínimo entregable (por ejemplo introducción y esquema) y trabájalo {tiempo} minutos para tener un avance tangible.");
    }
    if task.is_analytic() && slots.feeling == Some(Feeling::Boredom) {
        return Some("Las tareas analíticas repetitivas bajan la activación. Conviértelo en un reto de eficiencia: mide cuántos ejercicios o páginas avanzas en {tiempo} minutos y después trata de superarte.");
    }
    if slots.feeling == Some(Feeling::ErrorAnxiety) && early {
        return Some("Estás en una etapa de explorar, pero tu cabeza está en modo evitar errores. Para bajar la ansiedad haz un prototipo feo: {tiempo} minutos escribiendo ideas sin juzgar, y marca con ⭐ lo que valga la pena pulir después.");
    }
    if slots.feeling == Some(Feeling::Distraction) && task.is_creative() {
        return Some("Cuando la mente divaga y la tarea pide creatividad, ayuda un ancla concreta. Abre un documento nuevo y escribe solo una lista numerada con 5 lugares por donde podrías comenzar. No desarrolles, solo lista. {tiempo} minutos.");
    }
    None
}

pub fn for_task(task: TaskType) -> &'static str {
    match task {
        TaskType::Essay => "Para tu ensayo, empieza con algo pequeño: escribe solo 3 ideas principales en bullets. Sin redactar, solo ideas clave. Unos {tiempo} minutos. ¿Cómo te suena?",
        TaskType::ProblemSolving => "Para tus ejercicios, resuelve solo los 3 primeros, sin presión de terminar todo. Unos {tiempo} minutos. Cuando termines esos 3, ya avanzaste.",
        TaskType::TechnicalReading => "Para tu lectura, lee solo las primeras 3 a 5 páginas subrayando las ideas principales, sin apuntes extensos. Unos {tiempo} minutos. ¿Te parece?",
        TaskType::Presentation => "Para tu presentación, crea solo el índice de los temas que vas a cubrir. Sin desarrollar nada, solo títulos. Unos {tiempo} minutos.",
        TaskType::Debugging => "Para tu código, trabaja solo en una función o componente pequeño, sin intentar arreglar todo. Unos {tiempo} minutos enfocados.",
        TaskType::Programming => "Para programar, elige UNA funcionalidad pequeña, abre el archivo y deja solo lo necesario para esa parte. {tiempo} minutos y luego la pruebas.",
        TaskType::Proofreading => "Para revisar, parte solo por la primera página o sección. Busca errores evidentes, no perfección. Unos {tiempo} minutos.",
        TaskType::MultipleChoice => "Para tu prueba, responde primero solo las preguntas que sabes con seguridad, sin quedarte pegado pensando. Unos {tiempo} minutos.",
        TaskType::Outline => "Para tu esquema, anota solo las 3 a 5 secciones principales. Sin detalles, solo estructura. {tiempo} minutos.",
        TaskType::Draft => "Para tu borrador, escribe libremente sin juzgar. No edites mientras escribes, solo avanza. {tiempo} minutos.",
        TaskType::Summary => "Para tu resumen, subraya las 5 ideas más importantes del texto original. Solo subrayar, no escribir aún. {tiempo} minutos.",
        TaskType::LabProtocol => "Para tu protocolo de lab, completa solo la sección de materiales y métodos, sin análisis aún. {tiempo} minutos.",
    }
}

/// Keyword scan of the raw message, for turns where slots say too little
pub fn for_keywords(text: &str) -> Option<&'static str> {
    const KEYWORD_TEMPLATES: &[(&[&str], &str)] = &[
        (
            &["programar", "código", "codigo", "chatbot", "app", "software"],
            "Enfoquemos la programación en micro-tramos: elige UNA funcionalidad pequeña, abre el archivo y deja solo lo necesario para esa parte. Trabaja {tiempo} minutos, prueba lo que hiciste y luego me cuentas si necesitas otro ajuste.",
        ),
        (
            &["leer", "estudiar", "libro", "paper", "artículo", "articulo"],
            "Para lectura usa modo barrido: cronometra {tiempo} minutos, subraya solo ideas fuerza y deja un post-it con la duda más grande. Así mantenemos foco sin agobiarnos.",
        ),
        (
            &["escribir", "ensayo", "texto", "redactar"],
            "Vamos con escritura guiada: escribe tres bullets con idea principal, ejemplo y frase de cierre. Nada de redactar completo todavía; solo estructura rápida en {tiempo} minutos y luego vemos si extendemos.",
        ),
        (
            &["ejercicio", "ejercicios", "problema", "problemas", "matemática", "física", "cálculo"],
            "Divide los ejercicios en un lote mínimo: resuelve solo 2 o 3 problemas parecidos, anota los pasos clave y detente para revisar patrones. {tiempo} minutos bastan para destrabar.",
        ),
    ];

    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    KEYWORD_TEMPLATES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| words.contains(k)))
        .map(|(_, template)| *template)
}

lazy_static! {
    /// Checked in order; the first match answers.
    static ref INTENT_TEMPLATES: Vec<(Regex, &'static str)> = [
        (
            r"\btermin(é|e)\b|\blo logr(é|e)\b|\blisto\b|\bya acab(é|e)\b|\bme result(ó|o)\b|\bqued(ó|o) bien\b",
            "¡Qué bien! 🙌 Me alegra que hayas avanzado. Si quieres, cuéntame cómo te sientes ahora o qué tarea sigue y ajustamos otra estrategia.",
        ),
        (
            r"sin energ(í|i)a|sin pilas|\bcansad(o|a)\b|\bagotad(o|a)\b|no tengo fuerzas|no me da el cuerpo|\bmolid(o|a)\b",
            "Si la energía está al piso, primero toca una micro-recarga: levántate, toma agua y haz 5 respiraciones profundas alargando la exhalación. Después retomamos con un bloque de {tiempo} minutos. ¿Te parece?",
        ),
        (
            r"necesito (una )?pausa|quiero descansar|dame un respiro|\bbreak\b|descansar un rato",
            "Vale, tu mente pide una pausa. Cambiar un rato a modo descanso evita el desgaste: haz 3 minutos de respiración cuadrada (inhala 4 segundos, mantén 4, exhala 4, mantén 4) y vuelve a contarme cómo te sientes.",
        ),
        (
            r"otras? estrategias?|cambiemos de plan|algo distinto|no me sirve lo anterior|dame otra idea|\breencuadr",
            "Probemos un reencuadre. Cuando una táctica no engancha, cambiamos el nivel: si estabas pensando en el \"para qué\", bajemos al \"cómo\" con un micro-paso verificable (por ejemplo, solo abre el documento y escribe el título). {tiempo} minutos y me cuentas.",
        ),
        (
            r"\bgracias\b|te agradezco|\bthanks\b",
            "¡De nada! 😊 Me alegra poder ayudarte. Si necesitas más apoyo o una nueva estrategia, aquí estoy.",
        ),
    ]
    .into_iter()
    .map(|(pattern, template)| {
        (
            Regex::new(pattern).expect("intent pattern must compile"),
            template,
        )
    })
    .collect();
}

/// Reply to what the message asks for (rest, a change, thanks) rather than to the task
pub fn for_intent(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    INTENT_TEMPLATES
        .iter()
        .find(|(pattern, _)| pattern.is_match(&lowered))
        .map(|(_, template)| *template)
}

/// Opening line that sets the abstraction level of a canned strategy.
pub fn framing_line(construal: Construal) -> Option<&'static str> {
    match construal {
        Construal::Abstract => Some(
            "Antes de partir, piensa un momento para qué te sirve esta tarea y qué quieres lograr con ella.",
        ),
        Construal::Mixed => Some(
            "Ten presente para qué haces esta tarea, pero avanza con un paso bien concreto.",
        ),
        Construal::Concrete => None,
    }
}

/// Tone guidance for the model, by focus and construal level.
pub fn framing_guidance(focus: RegulatoryFocus, construal: Construal) -> &'static str {
    match (focus, construal) {
        (RegulatoryFocus::Promotion, Construal::Abstract) => {
            "Enfoca en lo que puede ganar y en el sentido de la tarea; invita a explorar ideas sin juzgar."
        }
        (RegulatoryFocus::Promotion, Construal::Concrete) => {
            "Enfoca en avanzar y sumar logros; da un primer paso práctico y visible."
        }
        (RegulatoryFocus::Promotion, Construal::Mixed) => {
            "Conecta brevemente el propósito con un primer paso práctico; tono entusiasta."
        }
        (RegulatoryFocus::Prevention, Construal::Abstract) => {
            "Enfoca en asegurar lo importante y en por qué vale la pena hacerlo bien; tono calmado."
        }
        (RegulatoryFocus::Prevention, Construal::Concrete) => {
            "Enfoca en cuidar la calidad y evitar errores; pasos precisos y verificables."
        }
        (RegulatoryFocus::Prevention, Construal::Mixed) => {
            "Recuerda por qué importa la precisión y da un paso concreto de verificación."
        }
    }
}
