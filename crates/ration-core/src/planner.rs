//! Caller-facing operations.
//!
//! [`MealPlanner`] wires the generation client, the store and the caches
//! together. It is built once with explicit collaborators and is cheap to
//! clone.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cache::{Caches, PlanCacheKey};
use crate::enrich::{DEFAULT_WORKERS, Enricher, EnrichmentHandle, EnrichmentReport};
use crate::generation::GenerationClient;
use crate::plan::{CooldownStatus, Meal, MealRecipe, SynthesisError, WeekPlan, cooldown_status, synthesize_days};
use crate::profile::NutritionProfile;
use crate::shopping::shopping_list_for_meals;
use crate::store::{PersistenceError, PlanStore};

/// Tunables of a [`MealPlanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Concurrent recipe enrichment workers per week plan.
    pub enrichment_workers: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            enrichment_workers: DEFAULT_WORKERS,
        }
    }
}

/// A freshly synthesized (or cached) week plan.
///
/// The plan is structurally complete; recipes arrive in the store in the
/// background and `enrichment` tracks them.
#[derive(Debug)]
pub struct WeekPlanHandle {
    pub plan: WeekPlan,
    /// The plan came from the plan cache and no generation happened.
    pub from_cache: bool,
    pub enrichment: EnrichmentHandle,
}

#[derive(Clone)]
pub struct MealPlanner {
    client: Arc<GenerationClient>,
    store: Arc<dyn PlanStore>,
    caches: Arc<Caches>,
    config: PlannerConfig,
    shutdown: CancellationToken,
}

impl MealPlanner {
    pub fn new(
        client: Arc<GenerationClient>,
        store: Arc<dyn PlanStore>,
        caches: Arc<Caches>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            client,
            store,
            caches,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn PlanStore> {
        &self.store
    }

    pub fn caches(&self) -> &Arc<Caches> {
        &self.caches
    }

    /// Stop every enrichment run started by this planner from picking up
    /// further meals.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Where `user_id` stands with respect to the generation cooldown.
    pub async fn cooldown(&self, user_id: i64) -> Result<CooldownStatus, PersistenceError> {
        let last = self.store.latest_week_plan_created_at(user_id).await?;
        Ok(cooldown_status(last, Utc::now()))
    }

    /// Produce a week plan for `user_id` and start enriching its recipes.
    ///
    /// An unexpired cached plan for the same user and profile is returned
    /// without any generation call. Otherwise the cooldown is enforced
    /// unless `force` is set, the seven days are generated in order and the
    /// week is saved atomically. Returns as soon as the plan is saved.
    pub async fn synthesize_week_plan(
        &self,
        user_id: i64,
        profile: &NutritionProfile,
        force: bool,
    ) -> Result<WeekPlanHandle, SynthesisError> {
        let key = PlanCacheKey::new(user_id, profile);
        if let Some(plan) = self.caches.plans.get(&key).await {
            tracing::info!(user_id, week_plan_id = %plan.id, "week plan served from cache");
            return Ok(WeekPlanHandle {
                plan,
                from_cache: true,
                enrichment: EnrichmentHandle::completed(EnrichmentReport::default()),
            });
        }

        if !force {
            if let CooldownStatus::Blocked {
                days_left,
                next_allowed_at,
            } = self.cooldown(user_id).await?
            {
                tracing::info!(user_id, days_left, "week plan refused by cooldown");
                return Err(SynthesisError::Cooldown {
                    days_left,
                    next_allowed_at,
                });
            }
        }

        tracing::info!(user_id, calories = profile.daily_calories, goal = %profile.goal, "synthesizing week plan");
        let days = synthesize_days(&self.client, profile).await?;
        let plan = self.store.save_week_plan(user_id, profile, &days).await?;
        tracing::info!(user_id, week_plan_id = %plan.id, "week plan saved");

        self.caches.plans.insert(key, plan.without_recipes()).await;

        let enricher = Enricher::new(
            self.client.clone(),
            self.store.clone(),
            self.caches.clone(),
            self.config.enrichment_workers,
        );
        let enrichment = enricher.spawn(
            plan.id,
            profile.goal,
            plan.meals().cloned().collect(),
            self.shutdown.child_token(),
        );

        Ok(WeekPlanHandle {
            plan,
            from_cache: false,
            enrichment,
        })
    }

    pub async fn week_plan(&self, id: Uuid) -> Result<WeekPlan, PersistenceError> {
        self.store
            .get_week_plan(id)
            .await?
            .ok_or(PersistenceError::WeekPlanNotFound(id))
    }

    /// The user's current week plan, i.e. the one created last.
    pub async fn latest_week_plan(&self, user_id: i64) -> Result<WeekPlan, PersistenceError> {
        self.store
            .latest_week_plan(user_id)
            .await?
            .ok_or(PersistenceError::NoWeekPlanForUser(user_id))
    }

    /// Shopping list over the recipes stored so far for a week plan.
    pub async fn shopping_list_for_week_plan(&self, id: Uuid) -> Result<String, PersistenceError> {
        let plan = self.week_plan(id).await?;
        let meals: Vec<Meal> = plan.meals().cloned().collect();
        Ok(shopping_list_for_meals(&meals))
    }

    /// Shopping list for the user's current week plan.
    pub async fn shopping_list_for_user(&self, user_id: i64) -> Result<String, PersistenceError> {
        let plan = self.latest_week_plan(user_id).await?;
        let meals: Vec<Meal> = plan.meals().cloned().collect();
        Ok(shopping_list_for_meals(&meals))
    }

    pub async fn recipe_for_meal(&self, meal_id: Uuid) -> Result<MealRecipe, PersistenceError> {
        self.store
            .get_meal_recipe(meal_id)
            .await?
            .ok_or(PersistenceError::MealNotFound(meal_id))
    }

    /// Shopping list over meals the caller already holds.
    pub fn shopping_list(meals: &[Meal]) -> String {
        shopping_list_for_meals(meals)
    }
}
