//! Coach configuration
//!
//! Defaults match the latest tuning of the coaching protocol; every knob can be
//! overridden from the environment (a `.env` file is honoured).

use crate::error::CoachError;
use crate::models::TimeBlock;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct CoachConfig {
    /// Consecutive failed evaluations before the alternate activity is offered.
    pub failure_threshold: u32,
    /// Block length assigned once the four mandatory slots are known.
    pub default_time_block: TimeBlock,
    /// Smaller block forced by recalibration.
    pub recalibration_time_block: TimeBlock,
    /// Recent messages sent along with a strategy request.
    pub history_window: usize,
    /// Crisis confidence strictly above this replaces the whole turn.
    pub crisis_threshold: f32,
    /// Confidence reported when a risk term matched but confirmation failed.
    pub crisis_fallback_confidence: f32,
    /// Upper bound for each completion call.
    pub call_timeout: Duration,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            default_time_block: TimeBlock::FIFTEEN,
            recalibration_time_block: TimeBlock::TEN,
            history_window: 10,
            crisis_threshold: 0.7,
            crisis_fallback_confidence: 0.5,
            call_timeout: Duration::from_millis(8000),
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl CoachConfig {
    /// Load from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let failure_threshold = parse_or(&lookup, "COACH_FAILURE_THRESHOLD", defaults.failure_threshold)?;
        if failure_threshold == 0 {
            return Err(CoachError::Config(
                "COACH_FAILURE_THRESHOLD must be at least 1".to_string(),
            ));
        }

        let default_time_block = time_block_or(&lookup, "COACH_DEFAULT_TIME_BLOCK", defaults.default_time_block)?;
        let recalibration_time_block = time_block_or(
            &lookup,
            "COACH_RECALIBRATION_TIME_BLOCK",
            defaults.recalibration_time_block,
        )?;

        let crisis_threshold = probability_or(&lookup, "COACH_CRISIS_THRESHOLD", defaults.crisis_threshold)?;
        let crisis_fallback_confidence = probability_or(
            &lookup,
            "COACH_CRISIS_FALLBACK_CONFIDENCE",
            defaults.crisis_fallback_confidence,
        )?;

        let timeout_ms: u64 = parse_or(&lookup, "COACH_CALL_TIMEOUT_MS", defaults.call_timeout.as_millis() as u64)?;

        Ok(Self {
            failure_threshold,
            default_time_block,
            recalibration_time_block,
            history_window: parse_or(&lookup, "COACH_HISTORY_WINDOW", defaults.history_window)?,
            crisis_threshold,
            crisis_fallback_confidence,
            call_timeout: Duration::from_millis(timeout_ms),
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|key| !key.trim().is_empty()),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoachError::Config(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

fn time_block_or<F>(lookup: &F, key: &str, default: TimeBlock) -> Result<TimeBlock>
where
    F: Fn(&str) -> Option<String>,
{
    let minutes: u32 = parse_or(lookup, key, default.minutes())?;
    TimeBlock::try_from(minutes).map_err(|e| CoachError::Config(format!("{}: {}", key, e)))
}

fn probability_or<F>(lookup: &F, key: &str, default: f32) -> Result<f32>
where
    F: Fn(&str) -> Option<String>,
{
    let value: f32 = parse_or(lookup, key, default)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(CoachError::Config(format!("{} must be within [0, 1]", key)));
    }
    Ok(value)
}
