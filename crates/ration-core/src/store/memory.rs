use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PersistenceError, PlanStore, check_complete_week};
use crate::plan::{DayPlan, MealRecipe, Recipe, WeekPlan};
use crate::profile::NutritionProfile;

#[derive(Default)]
struct State {
    plans: HashMap<Uuid, WeekPlan>,
    /// meal id -> (plan id, day index, meal index)
    meals: HashMap<Uuid, (Uuid, usize, usize)>,
}

/// In-process [`PlanStore`] for tests and embedding callers.
#[derive(Default)]
pub struct MemoryPlanStore {
    state: RwLock<State>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already identified plan as-is, e.g. to seed history.
    pub async fn insert(&self, plan: WeekPlan) {
        let mut state = self.state.write().await;
        for (d, day) in plan.days.iter().enumerate() {
            for (m, meal) in day.meals.iter().enumerate() {
                if let Some(id) = meal.id {
                    state.meals.insert(id, (plan.id, d, m));
                }
            }
        }
        state.plans.insert(plan.id, plan);
    }

    pub async fn plan_count(&self) -> usize {
        self.state.read().await.plans.len()
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn save_week_plan(
        &self,
        user_id: i64,
        profile: &NutritionProfile,
        days: &[DayPlan],
    ) -> Result<WeekPlan, PersistenceError> {
        check_complete_week(days)?;

        let mut days = days.to_vec();
        for meal in days.iter_mut().flat_map(|d| d.meals.iter_mut()) {
            meal.id = Some(Uuid::new_v4());
            meal.recipe = None;
        }
        let plan = WeekPlan {
            id: Uuid::new_v4(),
            user_id,
            profile: *profile,
            created_at: Utc::now(),
            days,
        };

        self.insert(plan.clone()).await;
        Ok(plan)
    }

    async fn update_meal_recipe(&self, meal_id: Uuid, recipe: &Recipe) -> Result<(), PersistenceError> {
        let mut state = self.state.write().await;
        let (plan_id, d, m) = *state
            .meals
            .get(&meal_id)
            .ok_or(PersistenceError::MealNotFound(meal_id))?;
        let meal = state
            .plans
            .get_mut(&plan_id)
            .and_then(|p| p.days.get_mut(d))
            .and_then(|day| day.meals.get_mut(m))
            .ok_or(PersistenceError::MealNotFound(meal_id))?;
        meal.recipe = Some(recipe.clone());
        Ok(())
    }

    async fn get_week_plan(&self, id: Uuid) -> Result<Option<WeekPlan>, PersistenceError> {
        Ok(self.state.read().await.plans.get(&id).cloned())
    }

    async fn latest_week_plan(&self, user_id: i64) -> Result<Option<WeekPlan>, PersistenceError> {
        let state = self.state.read().await;
        Ok(state
            .plans
            .values()
            .filter(|p| p.user_id == user_id)
            .max_by_key(|p| (p.created_at, p.id))
            .cloned())
    }

    async fn get_meal_recipe(&self, meal_id: Uuid) -> Result<Option<MealRecipe>, PersistenceError> {
        let state = self.state.read().await;
        let Some(&(plan_id, d, m)) = state.meals.get(&meal_id) else {
            return Ok(None);
        };
        let meal = state
            .plans
            .get(&plan_id)
            .and_then(|p| p.days.get(d))
            .and_then(|day| day.meals.get(m));

        Ok(meal.map(|meal| MealRecipe {
            meal_id,
            name: meal.name.clone(),
            recipe: meal.recipe.clone().unwrap_or_default(),
        }))
    }

    async fn latest_week_plan_created_at(
        &self,
        user_id: i64,
    ) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        let state = self.state.read().await;
        Ok(state
            .plans
            .values()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.created_at)
            .max())
    }
}
