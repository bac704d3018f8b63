//! Main orchestrator - one coaching turn end to end
//!
//! CRISIS CHECK ∥ EXTRACT → GREET? → ONBOARD | EVALUATE → RECALIBRATE | ESCALATE → STRATEGY
//!
//! The caller owns the session: it passes the current value in and stores the
//! returned one. A turn never fails; internal errors become an apology with
//! the session left as it was.

pub mod onboarding;

use crate::classifier::{classify, recalibrate};
use crate::completion::{CompletionService, GeminiClient, OfflineCompletion};
use crate::config::CoachConfig;
use crate::error::CoachError;
use crate::evaluation::{classify_evaluation, evaluation_quick_replies};
use crate::extraction::SlotExtractor;
use crate::guardrail::{CrisisGuardrail, CRISIS_MESSAGE, HELPLINE_NOTICE};
use crate::memory::{ChatMessage, ContextWindow};
use crate::models::{
    EvaluationResult, QuickReply, Regulation, SessionState, Slots, Transition, TurnOutcome,
};
use crate::strategy::{StrategyGenerator, StrategyInput};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where a session stands, derived from its flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueState {
    NotGreeted,
    Onboarding,
    AwaitingEvaluation,
    EscalationOffered,
}

impl DialogueState {
    pub fn of(session: &SessionState) -> Self {
        if !session.greeted {
            DialogueState::NotGreeted
        } else if session.escalation_offered {
            DialogueState::EscalationOffered
        } else if session.strategy_given {
            DialogueState::AwaitingEvaluation
        } else {
            DialogueState::Onboarding
        }
    }
}

/// One user message with what the caller knows around it
pub struct Turn<'a> {
    pub text: &'a str,
    /// Free-form app context (e.g. the screen the student came from)
    pub context: &'a str,
    /// Recent messages, oldest first; may end with `text` itself
    pub history: &'a [ChatMessage],
}

fn outcome(
    reply: impl Into<String>,
    session: SessionState,
    quick_replies: Option<Vec<QuickReply>>,
    transition: Transition,
) -> TurnOutcome {
    TurnOutcome {
        reply: reply.into(),
        session,
        quick_replies,
        transition,
    }
}

/// Coaching orchestrator shared by all sessions
pub struct Orchestrator {
    config: CoachConfig,
    guardrail: CrisisGuardrail,
    extractor: SlotExtractor,
    strategist: StrategyGenerator,
}

impl Orchestrator {
    pub fn new(completion: Arc<dyn CompletionService>, config: CoachConfig) -> Self {
        let guardrail = CrisisGuardrail::new(
            completion.clone(),
            config.call_timeout,
            config.crisis_fallback_confidence,
        );
        let extractor = SlotExtractor::new(completion.clone(), config.call_timeout);
        let strategist = StrategyGenerator::new(
            completion,
            config.call_timeout,
            ContextWindow::new(config.history_window),
            config.default_time_block,
        );

        Self {
            config,
            guardrail,
            extractor,
            strategist,
        }
    }

    /// Gemini when a key is configured, otherwise fully offline.
    pub fn from_config(config: CoachConfig) -> Result<Self> {
        let completion: Arc<dyn CompletionService> = match &config.gemini_api_key {
            Some(key) => Arc::new(GeminiClient::new(
                key.clone(),
                &config.gemini_model,
                config.call_timeout,
            )?),
            None => {
                warn!("GEMINI_API_KEY not set, running with canned strategies only");
                Arc::new(OfflineCompletion)
            }
        };
        Ok(Self::new(completion, config))
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    /// Process one message and return the reply with the next session value.
    pub async fn handle_turn(&self, session: &SessionState, turn: Turn<'_>) -> TurnOutcome {
        match self.run_turn(session, &turn).await {
            Ok(result) => {
                info!(
                    user_id = %session.user_id,
                    transition = ?result.transition,
                    iteration = result.session.iteration,
                    failed_attempts = result.session.failed_attempts,
                    "Turn complete"
                );
                result
            }
            Err(e) => {
                if e.is_recoverable() {
                    warn!(user_id = %session.user_id, "Turn aborted: {}", e);
                } else {
                    error!(user_id = %session.user_id, "Turn aborted: {}", e);
                }
                outcome(
                    onboarding::APOLOGY,
                    session.clone(),
                    None,
                    Transition::InternalFallback,
                )
            }
        }
    }

    async fn run_turn(&self, session: &SessionState, turn: &Turn<'_>) -> Result<TurnOutcome> {
        // Both only read the input
        let (signal, slots) = tokio::join!(
            self.guardrail.check(turn.text),
            self.extractor.extract(turn.text, &session.slots)
        );

        if signal.short_circuits(self.config.crisis_threshold) {
            warn!(
                user_id = %session.user_id,
                confidence = signal.confidence,
                reason = %signal.reason,
                "Crisis detected, replying with support resources"
            );
            return Ok(outcome(CRISIS_MESSAGE, session.clone(), None, Transition::Crisis));
        }

        debug!(?slots, "Slots after extraction");

        let mut result = self.dispatch(session, slots, turn).await?;

        if signal.is_crisis {
            info!(confidence = signal.confidence, "Low-confidence crisis verdict, adding helpline notice");
            result.reply = format!("{}\n\n{}", result.reply, HELPLINE_NOTICE);
        }

        Ok(result)
    }

    async fn dispatch(
        &self,
        session: &SessionState,
        slots: Slots,
        turn: &Turn<'_>,
    ) -> Result<TurnOutcome> {
        let state = DialogueState::of(session);

        let mut next = session.clone();
        next.slots = slots;
        track_feelings(&mut next);

        if state == DialogueState::NotGreeted {
            next.greeted = true;
            return Ok(outcome(onboarding::welcome(), next, None, Transition::Welcome));
        }

        if onboarding::is_bare_greeting(turn.text) {
            return Ok(outcome(
                onboarding::GREETING_AGAIN,
                session.clone(),
                None,
                Transition::Greeting,
            ));
        }

        if onboarding::wants_wellness(turn.text) {
            next.iteration = 0;
            next.failed_attempts = 0;
            next.strategy_given = false;
            next.escalation_offered = false;
            return Ok(outcome(
                onboarding::HANDOFF,
                next,
                Some(onboarding::handoff_menu()),
                Transition::EscalationAccepted,
            ));
        }

        match state {
            DialogueState::NotGreeted | DialogueState::Onboarding => self.onboard(next, turn).await,
            DialogueState::AwaitingEvaluation => {
                let evaluation = classify_evaluation(turn.text);
                debug!(?evaluation, "Strategy evaluation");

                match evaluation {
                    EvaluationResult::Succeeded => Ok(self.close_success(&next)),
                    failure if failure.is_failure() => {
                        next.failed_attempts += 1;
                        if next.failed_attempts >= self.config.failure_threshold {
                            Ok(self.offer_escalation(next))
                        } else {
                            self.recalibrate(next, turn).await
                        }
                    }
                    // unrelated: no penalty, fresh strategy
                    _ => {
                        let regulation = classify(&next.slots);
                        self.deliver_strategy(next, regulation, turn, Transition::Strategy)
                            .await
                    }
                }
            }
            DialogueState::EscalationOffered => match classify_evaluation(turn.text) {
                EvaluationResult::Succeeded => Ok(self.close_success(&next)),
                _ => {
                    info!("Alternate activity declined");
                    self.recalibrate(next, turn).await
                }
            },
        }
    }

    async fn onboard(&self, mut next: SessionState, turn: &Turn<'_>) -> Result<TurnOutcome> {
        if let Some(field) = next.slots.next_missing() {
            return Ok(outcome(
                onboarding::question(field),
                next,
                Some(onboarding::menu(field)),
                Transition::AskSlot(field),
            ));
        }

        if next.slots.time_block.is_none() {
            next.slots.time_block = Some(self.config.default_time_block);
        }
        next.onboarding_complete = true;

        let regulation = classify(&next.slots);
        info!(
            demand = ?regulation.demand,
            construal = ?regulation.construal,
            focus = ?regulation.focus,
            "Onboarding complete"
        );
        self.deliver_strategy(next, regulation, turn, Transition::Strategy)
            .await
    }

    async fn recalibrate(&self, mut next: SessionState, turn: &Turn<'_>) -> Result<TurnOutcome> {
        let regulation = recalibrate(classify(&next.slots));
        next.slots.time_block = Some(self.config.recalibration_time_block);
        next.escalation_offered = false;

        info!(
            construal = ?regulation.construal,
            time_block = self.config.recalibration_time_block.minutes(),
            failed_attempts = next.failed_attempts,
            "Recalibrating strategy"
        );
        self.deliver_strategy(next, regulation, turn, Transition::Recalibrated)
            .await
    }

    async fn deliver_strategy(
        &self,
        mut next: SessionState,
        regulation: Regulation,
        turn: &Turn<'_>,
        transition: Transition,
    ) -> Result<TurnOutcome> {
        if !next.slots.is_complete() {
            return Err(CoachError::InvariantViolation(format!(
                "strategy requested with missing slot {:?}",
                next.slots.next_missing()
            )));
        }

        next.apply_regulation(regulation);
        if next.slots.time_block.is_none() {
            next.slots.time_block = Some(self.config.default_time_block);
        }

        let strategy = self
            .strategist
            .generate(StrategyInput {
                session: &next,
                user_text: turn.text,
                context: turn.context,
                history: turn.history,
                recalibrating: transition == Transition::Recalibrated,
            })
            .await;

        next.strategy_given = true;
        next.iteration += 1;
        next.last_strategy = Some(strategy.text.clone());

        Ok(outcome(
            strategy.text,
            next,
            Some(evaluation_quick_replies()),
            transition,
        ))
    }

    fn offer_escalation(&self, mut next: SessionState) -> TurnOutcome {
        info!(
            threshold = self.config.failure_threshold,
            "Failure threshold reached, offering alternate activity"
        );
        next.failed_attempts = 0;
        next.escalation_offered = true;

        outcome(
            onboarding::ESCALATION_OFFER,
            next,
            Some(onboarding::escalation_menu()),
            Transition::EscalationOffered,
        )
    }

    fn close_success(&self, next: &SessionState) -> TurnOutcome {
        outcome(
            onboarding::FAREWELL,
            next.reset(),
            None,
            Transition::SuccessClose,
        )
    }
}

fn track_feelings(session: &mut SessionState) {
    if let Some(feeling) = session.slots.feeling {
        session.initial_feeling.get_or_insert(feeling);
        session.current_feeling = Some(feeling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CallPurpose, MockCompletion};
    use crate::models::{Construal, Deadline, Feeling, Phase, SlotField, TaskDemand, TaskType};
    use std::time::Duration;
    use uuid::Uuid;

    const SCENARIO_A: &str =
        "Estoy aburrido, tengo que hacer un ensayo para hoy, recién estoy empezando";

    fn orchestrator(mock: MockCompletion) -> (Orchestrator, Arc<MockCompletion>) {
        let mock = Arc::new(mock);
        let config = CoachConfig {
            call_timeout: Duration::from_millis(500),
            ..CoachConfig::default()
        };
        (Orchestrator::new(mock.clone(), config), mock)
    }

    fn greeted() -> SessionState {
        let mut session = SessionState::new(Uuid::new_v4());
        session.greeted = true;
        session
    }

    async fn say(orchestrator: &Orchestrator, session: &SessionState, text: &str) -> TurnOutcome {
        orchestrator
            .handle_turn(
                session,
                Turn {
                    text,
                    context: "",
                    history: &[],
                },
            )
            .await
    }

    #[tokio::test]
    async fn test_first_turn_is_welcome_and_keeps_slots() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let session = SessionState::new(Uuid::new_v4());

        let result = say(&coach, &session, SCENARIO_A).await;

        assert_eq!(result.transition, Transition::Welcome);
        assert!(result.session.greeted);
        assert!(result.quick_replies.is_none());
        assert_eq!(result.session.slots.task_type, Some(TaskType::Essay));
        assert_eq!(result.session.initial_feeling, Some(Feeling::Boredom));
    }

    #[tokio::test]
    async fn test_single_message_reaches_strategy() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());

        let result = say(&coach, &greeted(), SCENARIO_A).await;

        assert_eq!(result.transition, Transition::Strategy);
        let session = &result.session;
        assert_eq!(session.demand, Some(TaskDemand::Divergent));
        assert_eq!(session.slots.time_block.map(|b| b.minutes()), Some(15));
        assert!(session.strategy_given);
        assert!(session.onboarding_complete);
        assert_eq!(session.iteration, 1);
        assert_eq!(session.last_strategy.as_deref(), Some(result.reply.as_str()));
        assert_eq!(result.quick_replies.map(|q| q.len()), Some(3));
    }

    #[tokio::test]
    async fn test_onboarding_asks_in_fixed_order() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());

        let first = say(&coach, &greeted(), "es para esta semana y estoy revisando").await;
        assert_eq!(first.transition, Transition::AskSlot(SlotField::Feeling));
        assert_eq!(first.quick_replies.as_ref().map(Vec::len), Some(5));

        let second = say(&coach, &first.session, "me siento frustrado").await;
        assert_eq!(second.transition, Transition::AskSlot(SlotField::TaskType));

        let third = say(&coach, &second.session, "ensayo").await;
        assert_eq!(third.transition, Transition::Strategy);
        assert_eq!(third.session.demand, Some(TaskDemand::Analytic));
        assert_eq!(third.session.slots.deadline, Some(Deadline::ThisWeek));
        assert_eq!(third.session.slots.phase, Some(Phase::Review));
    }

    #[tokio::test]
    async fn test_two_failures_lead_to_escalation_offer() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());

        let strategy = say(&coach, &greeted(), SCENARIO_A).await;
        assert_eq!(strategy.session.construal, Some(Construal::Concrete));

        let recalibrated = say(&coach, &strategy.session, "no funcionó").await;
        assert_eq!(recalibrated.transition, Transition::Recalibrated);
        assert_eq!(recalibrated.session.failed_attempts, 1);
        assert_eq!(recalibrated.session.construal, Some(Construal::Abstract));
        assert_eq!(recalibrated.session.demand, Some(TaskDemand::Divergent));
        assert_eq!(recalibrated.session.slots.time_block.map(|b| b.minutes()), Some(10));

        let offer = say(&coach, &recalibrated.session, "no funcionó").await;
        assert_eq!(offer.transition, Transition::EscalationOffered);
        assert_eq!(offer.reply, onboarding::ESCALATION_OFFER);
        assert_eq!(offer.quick_replies.as_ref().map(Vec::len), Some(2));
        assert_eq!(offer.session.failed_attempts, 0);
    }

    #[tokio::test]
    async fn test_confirmed_crisis_short_circuits() {
        let (coach, _) = orchestrator(MockCompletion::routed(
            Some(r#"{"is_crisis": true, "confidence": 0.95, "reason": "ideación explícita"}"#),
            None,
            None,
        ));
        let strategy = say(&coach, &greeted(), SCENARIO_A).await;

        let result = say(&coach, &strategy.session, "quiero matarme").await;

        assert_eq!(result.reply, CRISIS_MESSAGE);
        assert_eq!(result.transition, Transition::Crisis);
        assert_eq!(result.session, strategy.session);
        assert!(result.quick_replies.is_none());
    }

    #[tokio::test]
    async fn test_crisis_short_circuits_offline() {
        let coach = Orchestrator::new(Arc::new(OfflineCompletion), CoachConfig::default());
        let session = greeted();

        let result = say(&coach, &session, "quiero matarme").await;

        assert_eq!(result.reply, CRISIS_MESSAGE);
        assert_eq!(result.transition, Transition::Crisis);
        assert_eq!(result.session, session);
        assert!(result.quick_replies.is_none());
    }

    #[tokio::test]
    async fn test_low_confidence_crisis_adds_helpline() {
        let (coach, mock) = orchestrator(MockCompletion::routed(
            Some(r#"{"is_crisis": true, "confidence": 0.6, "reason": "ambiguo"}"#),
            None,
            None,
        ));

        let result = say(&coach, &greeted(), "me muero de sueño, tengo un ensayo").await;

        assert_ne!(result.transition, Transition::Crisis);
        assert!(result.reply.ends_with(HELPLINE_NOTICE));
        assert_eq!(mock.calls_for(CallPurpose::CrisisCheck), 1);
        assert_eq!(mock.calls_for(CallPurpose::SlotExtraction), 1);
    }

    #[tokio::test]
    async fn test_worsened_reply_recalibrates() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let strategy = say(&coach, &greeted(), SCENARIO_A).await;

        let result = say(&coach, &strategy.session, "me siento peor").await;

        assert_eq!(result.transition, Transition::Recalibrated);
        assert_eq!(result.session.failed_attempts, 1);
        assert_eq!(result.session.slots.time_block.map(|b| b.minutes()), Some(10));
        assert_eq!(result.session.iteration, 2);
    }

    #[tokio::test]
    async fn test_unrelated_turn_between_failures_keeps_count() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let strategy = say(&coach, &greeted(), SCENARIO_A).await;

        let first = say(&coach, &strategy.session, "sigo igual").await;
        assert_eq!(first.transition, Transition::Recalibrated);
        assert_eq!(first.session.failed_attempts, 1);

        let aside = say(&coach, &first.session, "tengo otra duda sobre la tarea").await;
        assert_eq!(aside.transition, Transition::Strategy);
        assert_eq!(aside.session.failed_attempts, 1);

        let second = say(&coach, &aside.session, "sigo igual").await;
        assert_eq!(second.transition, Transition::EscalationOffered);
        assert_eq!(second.session.failed_attempts, 0);
        assert!(second.session.escalation_offered);
    }

    #[tokio::test]
    async fn test_inconsistent_session_gets_apology() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let mut session = greeted();
        session.strategy_given = true;

        let result = say(&coach, &session, "tengo otra duda").await;

        assert_eq!(result.transition, Transition::InternalFallback);
        assert_eq!(result.reply, onboarding::APOLOGY);
        assert_eq!(result.session, session);
        assert!(result.quick_replies.is_none());
    }

    #[tokio::test]
    async fn test_success_while_escalation_pending_closes() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let strategy = say(&coach, &greeted(), SCENARIO_A).await;
        let mut session = strategy.session;
        session.escalation_offered = true;

        let result = say(&coach, &session, "me ayudó").await;

        assert_eq!(result.transition, Transition::SuccessClose);
        assert_eq!(result.reply, onboarding::FAREWELL);
        assert_eq!(result.session, SessionState::new(session.user_id));
    }

    #[tokio::test]
    async fn test_mixed_construal_recalibration_only_shrinks_block() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let mut session = greeted();
        session.slots = Slots {
            feeling: Some(Feeling::Frustration),
            task_type: Some(TaskType::Essay),
            deadline: Some(Deadline::ThisWeek),
            phase: Some(Phase::Execution),
            ..Slots::default()
        };

        let strategy = say(&coach, &session, "ok").await;
        assert_eq!(strategy.transition, Transition::Strategy);
        assert_eq!(strategy.session.construal, Some(Construal::Mixed));
        assert_eq!(strategy.session.slots.time_block.map(|b| b.minutes()), Some(15));

        let result = say(&coach, &strategy.session, "no funcionó").await;

        assert_eq!(result.transition, Transition::Recalibrated);
        assert_eq!(result.session.construal, Some(Construal::Mixed));
        assert_eq!(result.session.demand, Some(TaskDemand::Divergent));
        assert_eq!(result.session.slots.time_block.map(|b| b.minutes()), Some(10));
    }

    #[tokio::test]
    async fn test_success_resets_to_new_session() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let strategy = say(&coach, &greeted(), SCENARIO_A).await;

        let close = say(&coach, &strategy.session, "me ayudó").await;
        assert_eq!(close.transition, Transition::SuccessClose);
        assert_eq!(close.session, SessionState::new(strategy.session.user_id));

        let again = say(&coach, &close.session, "hola").await;
        assert_eq!(again.transition, Transition::Welcome);
    }

    #[tokio::test]
    async fn test_accepting_escalation_hands_off() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let mut session = greeted();
        session.slots = Slots {
            feeling: Some(Feeling::Frustration),
            task_type: Some(TaskType::Debugging),
            deadline: Some(Deadline::Today),
            phase: Some(Phase::Execution),
            ..Slots::default()
        };
        session.strategy_given = true;
        session.escalation_offered = true;
        session.iteration = 2;

        let result = say(&coach, &session, "NAVIGATE_WELLNESS").await;

        assert_eq!(result.transition, Transition::EscalationAccepted);
        assert_eq!(result.session.iteration, 0);
        assert!(!result.session.escalation_offered);
        assert!(result.session.greeted);
        let replies = result.quick_replies.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].navigation_target(), Some("WELLNESS"));
    }

    #[tokio::test]
    async fn test_declining_escalation_recalibrates() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let strategy = say(&coach, &greeted(), SCENARIO_A).await;
        let mut session = strategy.session;
        session.escalation_offered = true;

        let result = say(
            &coach,
            &session,
            "No gracias, sigamos intentando con otras estrategias",
        )
        .await;

        assert_eq!(result.transition, Transition::Recalibrated);
        assert!(!result.session.escalation_offered);
        assert!(result.session.strategy_given);
    }

    #[tokio::test]
    async fn test_negated_wellness_at_offer_recalibrates() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let strategy = say(&coach, &greeted(), SCENARIO_A).await;
        let mut session = strategy.session;
        session.escalation_offered = true;

        let result = say(&coach, &session, "no, no quiero ir a bienestar, sigamos").await;

        assert_eq!(result.transition, Transition::Recalibrated);
        assert!(!result.session.escalation_offered);
    }

    #[tokio::test]
    async fn test_negated_improvement_is_not_success() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let strategy = say(&coach, &greeted(), SCENARIO_A).await;

        let result = say(&coach, &strategy.session, "no me siento mejor").await;

        assert_eq!(result.transition, Transition::Recalibrated);
        assert_eq!(result.session.failed_attempts, 1);
    }

    #[tokio::test]
    async fn test_unrelated_reply_regenerates_without_penalty() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let strategy = say(&coach, &greeted(), SCENARIO_A).await;
        let mut session = strategy.session;
        session.failed_attempts = 1;

        let result = say(&coach, &session, "tengo otra duda sobre la tarea").await;

        assert_eq!(result.transition, Transition::Strategy);
        assert_eq!(result.session.failed_attempts, 1);
        assert_eq!(result.session.iteration, 2);
    }

    #[tokio::test]
    async fn test_bare_greeting_leaves_session_untouched() {
        let (coach, _) = orchestrator(MockCompletion::unavailable());
        let session = greeted();

        let result = say(&coach, &session, "hola!").await;

        assert_eq!(result.transition, Transition::Greeting);
        assert_eq!(result.session, session);
    }

    #[tokio::test]
    async fn test_model_strategy_is_used_when_available() {
        let (coach, mock) = orchestrator(MockCompletion::routed(
            None,
            Some(r#"{"sentimiento":"aburrimiento","tipo_tarea":"ensayo","plazo":"hoy","fase":"ideacion"}"#),
            Some("Escribe 3 preguntas sobre tu tema durante 15 minutos. ¿Cómo te fue?"),
        ));

        let result = say(&coach, &greeted(), "uf, ensayo para hoy").await;

        assert_eq!(result.transition, Transition::Strategy);
        assert!(result.reply.starts_with("Escribe 3 preguntas"));
        assert_eq!(mock.calls_for(CallPurpose::Strategy), 1);
        assert_eq!(mock.calls_for(CallPurpose::CrisisCheck), 0);
    }
}
