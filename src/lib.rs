//! Motivation Coach
//!
//! A multi-turn coaching dialogue for students stuck on a task:
//! - Screens every message for crisis signals before anything else
//! - Extracts feeling, task, deadline and phase from free text
//! - Classifies task demand and construal level with ordered rules
//! - Proposes one small, time-boxed strategy and reads the student's verdict
//! - Recalibrates after a failure and offers a wellness break after repeated ones
//!
//! TURN:
//! CRISIS CHECK ∥ EXTRACT → ONBOARD → CLASSIFY → STRATEGY → EVALUATE → RECALIBRATE | ESCALATE

pub mod agent;
pub mod classifier;
pub mod completion;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod extraction;
pub mod guardrail;
pub mod memory;
pub mod models;
pub mod state;
pub mod strategy;

pub use error::Result;

// Re-export common types
pub use agent::{Orchestrator, Turn};
pub use config::CoachConfig;
pub use models::*;
