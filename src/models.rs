//! Core data models for the motivation coach
//!
//! Wire names (serde) follow the Spanish vocabulary the extraction prompt and the
//! caller's storage use; Rust names are English.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Slot Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Feeling {
    #[serde(rename = "aburrimiento")]
    Boredom,
    #[serde(rename = "frustracion", alias = "frustración")]
    Frustration,
    #[serde(rename = "ansiedad_error", alias = "ansiedad")]
    ErrorAnxiety,
    #[serde(rename = "dispersion_rumiacion", alias = "dispersion")]
    Distraction,
    #[serde(rename = "baja_autoeficacia")]
    LowSelfEfficacy,
    #[serde(rename = "otro")]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskType {
    #[serde(rename = "ensayo")]
    Essay,
    #[serde(rename = "esquema")]
    Outline,
    #[serde(rename = "borrador")]
    Draft,
    #[serde(rename = "lectura_tecnica")]
    TechnicalReading,
    #[serde(rename = "resumen")]
    Summary,
    #[serde(rename = "resolver_problemas")]
    ProblemSolving,
    #[serde(rename = "protocolo_lab")]
    LabProtocol,
    #[serde(rename = "mcq")]
    MultipleChoice,
    #[serde(rename = "presentacion")]
    Presentation,
    #[serde(rename = "coding_bugfix")]
    Debugging,
    #[serde(rename = "programacion")]
    Programming,
    #[serde(rename = "proofreading")]
    Proofreading,
}

impl TaskType {
    /// Tasks whose demands favour vigilant, error-avoiding work.
    pub fn is_analytic(self) -> bool {
        matches!(
            self,
            TaskType::Proofreading
                | TaskType::MultipleChoice
                | TaskType::LabProtocol
                | TaskType::ProblemSolving
                | TaskType::Debugging
                | TaskType::Programming
                | TaskType::TechnicalReading
                | TaskType::Summary
        )
    }

    /// Tasks that ask for generating and shaping ideas.
    pub fn is_creative(self) -> bool {
        matches!(
            self,
            TaskType::Essay | TaskType::Outline | TaskType::Draft | TaskType::Presentation
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Deadline {
    #[serde(rename = "hoy")]
    Today,
    #[serde(rename = "<24h")]
    Within24h,
    #[serde(rename = "esta_semana")]
    ThisWeek,
    #[serde(rename = ">1_semana")]
    BeyondWeek,
}

impl Deadline {
    pub fn is_urgent(self) -> bool {
        matches!(self, Deadline::Today | Deadline::Within24h)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Phase {
    #[serde(rename = "ideacion", alias = "ideación")]
    Ideation,
    #[serde(rename = "planificacion", alias = "planificación")]
    Planning,
    #[serde(rename = "ejecucion", alias = "ejecución")]
    Execution,
    #[serde(rename = "revision", alias = "revisión")]
    Review,
}

impl Phase {
    pub fn is_early(self) -> bool {
        matches!(self, Phase::Ideation | Phase::Planning)
    }
}

/// Work block length in minutes, restricted to the sizes the coach proposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeBlock(u32);

impl TimeBlock {
    pub const ALLOWED: [u32; 4] = [10, 12, 15, 25];
    pub const TEN: TimeBlock = TimeBlock(10);
    pub const TWELVE: TimeBlock = TimeBlock(12);
    pub const FIFTEEN: TimeBlock = TimeBlock(15);

    pub fn new(minutes: u32) -> Option<Self> {
        Self::ALLOWED.contains(&minutes).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for TimeBlock {
    type Error = String;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        TimeBlock::new(minutes)
            .ok_or_else(|| format!("{} is not an allowed time block {:?}", minutes, Self::ALLOWED))
    }
}

impl From<TimeBlock> for u32 {
    fn from(block: TimeBlock) -> Self {
        block.0
    }
}

//
// ================= Slots =================
//

/// The mandatory slots, in the order onboarding asks for them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SlotField {
    Feeling,
    TaskType,
    Deadline,
    Phase,
}

impl SlotField {
    pub const MANDATORY: [SlotField; 4] = [
        SlotField::Feeling,
        SlotField::TaskType,
        SlotField::Deadline,
        SlotField::Phase,
    ];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slots {
    #[serde(rename = "sentimiento", default)]
    pub feeling: Option<Feeling>,
    #[serde(rename = "sentimiento_otro", default)]
    pub feeling_other: Option<String>,
    #[serde(rename = "tipo_tarea", default)]
    pub task_type: Option<TaskType>,
    #[serde(rename = "ramo", default)]
    pub subject: Option<String>,
    #[serde(rename = "plazo", default)]
    pub deadline: Option<Deadline>,
    #[serde(rename = "fase", default)]
    pub phase: Option<Phase>,
    #[serde(rename = "tiempo_bloque", default)]
    pub time_block: Option<TimeBlock>,
}

impl Slots {
    /// Field-wise `new ?? old`: a known value is never replaced by an unknown one.
    pub fn merge(&self, update: &Slots) -> Slots {
        Slots {
            feeling: update.feeling.or(self.feeling),
            feeling_other: update
                .feeling_other
                .clone()
                .or_else(|| self.feeling_other.clone()),
            task_type: update.task_type.or(self.task_type),
            subject: update.subject.clone().or_else(|| self.subject.clone()),
            deadline: update.deadline.or(self.deadline),
            phase: update.phase.or(self.phase),
            time_block: update.time_block.or(self.time_block),
        }
    }

    pub fn has(&self, field: SlotField) -> bool {
        match field {
            SlotField::Feeling => self.feeling.is_some(),
            SlotField::TaskType => self.task_type.is_some(),
            SlotField::Deadline => self.deadline.is_some(),
            SlotField::Phase => self.phase.is_some(),
        }
    }

    /// First missing mandatory slot in onboarding priority order.
    pub fn next_missing(&self) -> Option<SlotField> {
        SlotField::MANDATORY.into_iter().find(|field| !self.has(*field))
    }

    pub fn is_complete(&self) -> bool {
        self.next_missing().is_none()
    }
}

//
// ================= Regulatory Classification =================
//

/// Q2: what the task demands from the student.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskDemand {
    /// "A": divergent, exploratory work.
    #[serde(rename = "A")]
    Divergent,
    /// "B": analytic, error-sensitive work.
    #[serde(rename = "B")]
    Analytic,
}

/// Q3: abstraction level of the framing ("why" versus "how").
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Construal {
    Abstract,
    Concrete,
    Mixed,
}

impl Construal {
    /// Abstract and concrete swap; mixed has no opposite and stays.
    pub fn flipped(self) -> Construal {
        match self {
            Construal::Abstract => Construal::Concrete,
            Construal::Concrete => Construal::Abstract,
            Construal::Mixed => Construal::Mixed,
        }
    }
}

/// Enfoque: regulatory focus derived from the task demand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RegulatoryFocus {
    Promotion,
    Prevention,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Regulation {
    pub demand: TaskDemand,
    pub construal: Construal,
    pub focus: RegulatoryFocus,
}

//
// ================= Session =================
//

/// Per-user dialogue state. The caller persists it between turns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionState {
    pub user_id: Uuid,
    pub slots: Slots,
    pub greeted: bool,
    pub onboarding_complete: bool,
    pub iteration: u32,
    #[serde(rename = "sentimiento_inicial")]
    pub initial_feeling: Option<Feeling>,
    #[serde(rename = "sentimiento_actual")]
    pub current_feeling: Option<Feeling>,
    #[serde(rename = "q2")]
    pub demand: Option<TaskDemand>,
    #[serde(rename = "q3")]
    pub construal: Option<Construal>,
    #[serde(rename = "enfoque")]
    pub focus: Option<RegulatoryFocus>,
    pub last_strategy: Option<String>,
    pub failed_attempts: u32,
    pub strategy_given: bool,
    pub escalation_offered: bool,
}

impl SessionState {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            slots: Slots::default(),
            greeted: false,
            onboarding_complete: false,
            iteration: 0,
            initial_feeling: None,
            current_feeling: None,
            demand: None,
            construal: None,
            focus: None,
            last_strategy: None,
            failed_attempts: 0,
            strategy_given: false,
            escalation_offered: false,
        }
    }

    /// A brand-new session for the same user.
    pub fn reset(&self) -> Self {
        Self::new(self.user_id)
    }

    pub fn regulation(&self) -> Option<Regulation> {
        Some(Regulation {
            demand: self.demand?,
            construal: self.construal?,
            focus: self.focus?,
        })
    }

    pub fn apply_regulation(&mut self, regulation: Regulation) {
        self.demand = Some(regulation.demand);
        self.construal = Some(regulation.construal);
        self.focus = Some(regulation.focus);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Uuid::nil())
    }
}

//
// ================= Turn I/O =================
//

pub const NAVIGATE_PREFIX: &str = "NAVIGATE_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuickReply {
    pub label: String,
    pub value: String,
}

impl QuickReply {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// `Some("WELLNESS")` for a `NAVIGATE_WELLNESS` value.
    pub fn navigation_target(&self) -> Option<&str> {
        self.value.strip_prefix(NAVIGATE_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationResult {
    Succeeded,
    Unchanged,
    Worsened,
    Unrelated,
}

impl EvaluationResult {
    pub fn is_failure(self) -> bool {
        matches!(self, EvaluationResult::Unchanged | EvaluationResult::Worsened)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrisisSignal {
    pub is_crisis: bool,
    pub confidence: f32,
    pub reason: String,
    /// Risk terms matched but the confirmation never came back.
    #[serde(default)]
    pub unconfirmed: bool,
}

impl CrisisSignal {
    pub fn clear() -> Self {
        Self {
            is_crisis: false,
            confidence: 1.0,
            reason: "no risk terms".to_string(),
            unconfirmed: false,
        }
    }

    /// Replaces the whole turn: confirmed above the threshold, or not confirmable at all.
    pub fn short_circuits(&self, threshold: f32) -> bool {
        self.is_crisis && (self.unconfirmed || self.confidence > threshold)
    }
}

/// Branch of the dialogue protocol a turn went through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "slot", rename_all = "snake_case")]
pub enum Transition {
    Crisis,
    Welcome,
    Greeting,
    AskSlot(SlotField),
    Strategy,
    Recalibrated,
    SuccessClose,
    EscalationOffered,
    EscalationAccepted,
    InternalFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub session: SessionState,
    pub quick_replies: Option<Vec<QuickReply>>,
    pub transition: Transition,
}

//
// ================= Display =================
//

impl fmt::Display for Feeling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Feeling::Boredom => "aburrimiento",
            Feeling::Frustration => "frustracion",
            Feeling::ErrorAnxiety => "ansiedad_error",
            Feeling::Distraction => "dispersion_rumiacion",
            Feeling::LowSelfEfficacy => "baja_autoeficacia",
            Feeling::Other => "otro",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskType::Essay => "ensayo",
            TaskType::Outline => "esquema",
            TaskType::Draft => "borrador",
            TaskType::TechnicalReading => "lectura_tecnica",
            TaskType::Summary => "resumen",
            TaskType::ProblemSolving => "resolver_problemas",
            TaskType::LabProtocol => "protocolo_lab",
            TaskType::MultipleChoice => "mcq",
            TaskType::Presentation => "presentacion",
            TaskType::Debugging => "coding_bugfix",
            TaskType::Programming => "programacion",
            TaskType::Proofreading => "proofreading",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Deadline::Today => "hoy",
            Deadline::Within24h => "<24h",
            Deadline::ThisWeek => "esta_semana",
            Deadline::BeyondWeek => ">1_semana",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Ideation => "ideacion",
            Phase::Planning => "planificacion",
            Phase::Execution => "ejecucion",
            Phase::Review => "revision",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for TimeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.0)
    }
}
