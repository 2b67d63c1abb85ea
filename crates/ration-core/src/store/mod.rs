//! Persistence gateway for week plans and recipes.
//!
//! [`PlanStore`] is the only way the rest of the core touches storage. A
//! week plan is written once, atomically, together with all of its meals;
//! recipes are written later, one meal at a time.

mod memory;
mod pg;

pub use memory::MemoryPlanStore;
pub use pg::PgPlanStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::plan::{DAYS_PER_WEEK, DayPlan, MEALS_PER_DAY, MealRecipe, Recipe, WeekPlan};
use crate::profile::NutritionProfile;

/// A storage operation failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("week plan {0} not found")]
    WeekPlanNotFound(Uuid),

    #[error("meal {0} not found")]
    MealNotFound(Uuid),

    #[error("user {0} has no week plans")]
    NoWeekPlanForUser(i64),

    #[error("refusing to save malformed week plan: {0}")]
    Malformed(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Save a complete week in one transaction and return it with the
    /// store-assigned plan id, meal ids and creation time.
    async fn save_week_plan(
        &self,
        user_id: i64,
        profile: &NutritionProfile,
        days: &[DayPlan],
    ) -> Result<WeekPlan, PersistenceError>;

    /// Replace the recipe of one meal. Writing the same recipe twice is a
    /// no-op apart from timestamps.
    async fn update_meal_recipe(&self, meal_id: Uuid, recipe: &Recipe) -> Result<(), PersistenceError>;

    /// A saved week plan with whatever recipes have been stored so far.
    async fn get_week_plan(&self, id: Uuid) -> Result<Option<WeekPlan>, PersistenceError>;

    /// The user's most recently created week plan.
    async fn latest_week_plan(&self, user_id: i64) -> Result<Option<WeekPlan>, PersistenceError>;

    /// A meal's name and recipe; the recipe is empty when none is stored.
    async fn get_meal_recipe(&self, meal_id: Uuid) -> Result<Option<MealRecipe>, PersistenceError>;

    async fn latest_week_plan_created_at(
        &self,
        user_id: i64,
    ) -> Result<Option<DateTime<Utc>>, PersistenceError>;
}

// Must stay usable as `dyn PlanStore`.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};

/// Reject anything but seven days numbered 1..=7 with three meals each.
pub(crate) fn check_complete_week(days: &[DayPlan]) -> Result<(), PersistenceError> {
    if days.len() != usize::from(DAYS_PER_WEEK) {
        return Err(PersistenceError::Malformed(format!(
            "expected {DAYS_PER_WEEK} days, got {}",
            days.len()
        )));
    }
    for (index, day) in days.iter().enumerate() {
        if usize::from(day.day_number) != index + 1 {
            return Err(PersistenceError::Malformed(format!(
                "day at position {} is numbered {}",
                index + 1,
                day.day_number
            )));
        }
        if day.meals.len() != MEALS_PER_DAY {
            return Err(PersistenceError::Malformed(format!(
                "day {} has {} meals",
                day.day_number,
                day.meals.len()
            )));
        }
    }
    Ok(())
}
