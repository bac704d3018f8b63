//! Regulatory Classifier
//!
//! Maps slots to a task demand (Q2), a construal level (Q3) and a regulatory
//! focus. Each dimension is an ordered rule list: every rule that applies
//! overwrites the previous label, so the last applicable rule wins.

use crate::models::{Construal, Phase, Regulation, RegulatoryFocus, Slots, TaskDemand, TaskType};

/// One override in an ordered rule list
pub struct Rule<T> {
    pub name: &'static str,
    pub applies: fn(&Slots) -> bool,
    pub label: T,
}

fn always(_: &Slots) -> bool {
    true
}

fn analytic_task(slots: &Slots) -> bool {
    slots.task_type.map_or(false, TaskType::is_analytic)
}

fn review_or_urgent(slots: &Slots) -> bool {
    slots.phase == Some(Phase::Review) || slots.deadline.map_or(false, |d| d.is_urgent())
}

fn early_stage(slots: &Slots) -> bool {
    slots.phase.map_or(false, Phase::is_early)
}

fn essay_in_progress(slots: &Slots) -> bool {
    slots.task_type == Some(TaskType::Essay)
        && matches!(slots.phase, Some(Phase::Planning) | Some(Phase::Execution))
}

/// Q2 overrides, later wins. Early stage beats deadline pressure.
pub const DEMAND_RULES: &[Rule<TaskDemand>] = &[
    Rule {
        name: "default_divergent",
        applies: always,
        label: TaskDemand::Divergent,
    },
    Rule {
        name: "analytic_task",
        applies: analytic_task,
        label: TaskDemand::Analytic,
    },
    Rule {
        name: "review_or_urgent",
        applies: review_or_urgent,
        label: TaskDemand::Analytic,
    },
    Rule {
        name: "early_stage",
        applies: early_stage,
        label: TaskDemand::Divergent,
    },
];

/// Q3 overrides, later wins.
pub const CONSTRUAL_RULES: &[Rule<Construal>] = &[
    Rule {
        name: "default_concrete",
        applies: always,
        label: Construal::Concrete,
    },
    Rule {
        name: "early_stage",
        applies: early_stage,
        label: Construal::Abstract,
    },
    Rule {
        name: "review_or_urgent",
        applies: review_or_urgent,
        label: Construal::Concrete,
    },
    Rule {
        name: "essay_in_progress",
        applies: essay_in_progress,
        label: Construal::Mixed,
    },
];

fn last_applicable<T: Copy>(rules: &[Rule<T>], slots: &Slots, default: T) -> T {
    rules
        .iter()
        .filter(|rule| (rule.applies)(slots))
        .last()
        .map_or(default, |rule| rule.label)
}

pub fn focus_for(demand: TaskDemand) -> RegulatoryFocus {
    match demand {
        TaskDemand::Divergent => RegulatoryFocus::Promotion,
        TaskDemand::Analytic => RegulatoryFocus::Prevention,
    }
}

/// Pure: identical slots always give the same regulation.
pub fn classify(slots: &Slots) -> Regulation {
    let demand = last_applicable(DEMAND_RULES, slots, TaskDemand::Divergent);
    let construal = last_applicable(CONSTRUAL_RULES, slots, Construal::Concrete);

    Regulation {
        demand,
        construal,
        focus: focus_for(demand),
    }
}

/// Recalibration keeps demand and focus and only moves the construal level.
pub fn recalibrate(regulation: Regulation) -> Regulation {
    Regulation {
        construal: regulation.construal.flipped(),
        ..regulation
    }
}
