//! Sequential day-by-day week synthesis.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::constraints::{ConstraintState, DayTargets};
use super::prompt::{DAY_TEMPERATURE, day_messages};
use super::types::{DAYS_PER_WEEK, DayPlan};
use super::validate::{ValidationError, validate_day};
use crate::generation::{CompletionOptions, GenerationClient, GenerationError};
use crate::parse::{ParseError, parse_json};
use crate::profile::NutritionProfile;
use crate::store::PersistenceError;

/// Why a week plan could not be produced.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("a new week plan is available in {days_left} day(s), at {next_allowed_at}")]
    Cooldown {
        days_left: i64,
        next_allowed_at: DateTime<Utc>,
    },

    #[error("day {day}: {source}")]
    Generation {
        day: u8,
        #[source]
        source: GenerationError,
    },

    #[error("day {day}: {source}")]
    Parse {
        day: u8,
        #[source]
        source: ParseError,
    },

    #[error("day {day}: {source}")]
    Validation {
        day: u8,
        #[source]
        source: ValidationError,
    },

    #[error("expected {DAYS_PER_WEEK} days, got {days}", DAYS_PER_WEEK = DAYS_PER_WEEK)]
    Incomplete { days: usize },

    #[error("failed to save week plan: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Generate days 1..=7 in order, threading the constraint state.
///
/// Any day failing generation, parsing or validation aborts the whole week;
/// nothing is retried at this level.
pub async fn synthesize_days(
    client: &GenerationClient,
    profile: &NutritionProfile,
) -> Result<Vec<DayPlan>, SynthesisError> {
    let targets = DayTargets::for_profile(profile);
    let mut state = ConstraintState::new();
    let mut days = Vec::with_capacity(usize::from(DAYS_PER_WEEK));

    for day in 1..=DAYS_PER_WEEK {
        let plan = generate_day(client, profile, &targets, &state, day).await?;
        state = state.record_day(&plan);
        days.push(plan);
    }

    ensure_complete(&days)?;
    Ok(days)
}

async fn generate_day(
    client: &GenerationClient,
    profile: &NutritionProfile,
    targets: &DayTargets,
    state: &ConstraintState,
    day: u8,
) -> Result<DayPlan, SynthesisError> {
    let blocked = state.blocked_names().len();
    tracing::info!(day, blocked, "generating day");

    let messages = day_messages(profile, targets, state, day);
    let raw = client
        .complete(messages, CompletionOptions::json(DAY_TEMPERATURE))
        .await
        .map_err(|source| SynthesisError::Generation { day, source })?;

    let value = parse_json(&raw).map_err(|source| SynthesisError::Parse { day, source })?;
    let plan = validate_day(&value, day).map_err(|source| SynthesisError::Validation { day, source })?;

    let report = targets.check(&plan);
    if report.within_bands() {
        tracing::debug!(day, calories = report.totals.calories, "day within bands");
    } else {
        tracing::warn!(
            day,
            calories = report.totals.calories,
            protein = report.totals.protein,
            fat = report.totals.fat,
            carbs = report.totals.carbs,
            out_of_band = ?report.out_of_band,
            "generated day is outside tolerance bands"
        );
    }

    for meal in &plan.meals {
        if state.name_uses(&meal.name) >= super::constraints::MAX_NAME_USES {
            tracing::warn!(day, name = %meal.name, "blocked meal name generated again");
        }
    }

    Ok(plan)
}

pub(crate) fn ensure_complete(days: &[DayPlan]) -> Result<(), SynthesisError> {
    if days.len() != usize::from(DAYS_PER_WEEK) {
        return Err(SynthesisError::Incomplete { days: days.len() });
    }
    Ok(())
}
