//! Shared fixtures for ration-core integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::time::Instant;
use uuid::Uuid;

use ration_core::Goal;
use ration_core::generation::{
    ChatRequest, ChatTransport, GenerationClient, GenerationConfig, TransportError,
};
use ration_core::plan::{DayPlan, MealRecipe, Recipe, WeekPlan};
use ration_core::profile::NutritionProfile;
use ration_core::store::{MemoryPlanStore, PersistenceError, PlanStore};

type Handler = dyn Fn(&ChatRequest) -> Result<String, TransportError> + Send + Sync;

/// A transport answering from a closure, recording every request.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<(Instant, ChatRequest)>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&ChatRequest) -> Result<String, TransportError> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn request_times(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    /// User message content of every request, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.messages.last().map(|m| m.content.clone()).unwrap_or_default())
            .collect()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = (self.handler)(request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn client(transport: Arc<ScriptedTransport>) -> Arc<GenerationClient> {
    Arc::new(GenerationClient::new(transport, GenerationConfig::default()))
}

pub fn profile() -> NutritionProfile {
    NutritionProfile {
        daily_calories: 2000,
        protein_grams: 150,
        fat_grams: 67,
        carbs_grams: 200,
        goal: Goal::Maintain,
    }
}

/// Same targets as [`profile`] with a different goal, so it misses the
/// plan cache.
pub fn profile_for_gain() -> NutritionProfile {
    NutritionProfile {
        goal: Goal::Gain,
        ..profile()
    }
}

// ---------------------------------------------------------------------------
// Canned responses
// ---------------------------------------------------------------------------

/// Day number of a day-generation prompt, `None` for other prompts.
pub fn requested_day(request: &ChatRequest) -> Option<u8> {
    let prompt = &request.messages.last()?.content;
    (1..=7).find(|day| prompt.contains(&format!("на день {day} из 7")))
}

/// Meal name of a recipe prompt, `None` for other prompts.
pub fn requested_recipe(request: &ChatRequest) -> Option<String> {
    let prompt = &request.messages.last()?.content;
    let rest = prompt.strip_prefix("Составь рецепт блюда \"")?;
    rest.split('"').next().map(str::to_owned)
}

/// A day hitting the 2000/150/67/200 profile exactly. Breakfast is the
/// same dish every day; lunch and dinner are unique per day.
pub fn day_json(day: u8) -> serde_json::Value {
    json!({
        "dayNumber": day,
        "meals": [
            {
                "mealTime": "breakfast", "name": "Омлет с овощами",
                "calories": 500, "protein": 38, "fat": 17, "carbs": 50,
                "portionWeight": 300,
                "proteinSource": "яйца", "carbSource": "хлеб", "fiberSource": "шпинат"
            },
            {
                "mealTime": "lunch", "name": format!("Курица с гречкой {day}"),
                "calories": 800, "protein": 60, "fat": 27, "carbs": 80,
                "portionWeight": 400,
                "proteinSource": "курица", "carbSource": "гречка", "fiberSource": "брокколи"
            },
            {
                "mealTime": "dinner", "name": format!("Треска с рисом {day}"),
                "calories": 700, "protein": 52, "fat": 23, "carbs": 70,
                "portionWeight": 380,
                "proteinSource": "треска", "carbSource": "рис", "fiberSource": "морковь"
            }
        ]
    })
}

pub fn days() -> Vec<DayPlan> {
    (1..=7)
        .map(|day| serde_json::from_value(day_json(day)).unwrap())
        .collect()
}

/// [`days`] with a distinct breakfast every day.
pub fn unique_days() -> Vec<DayPlan> {
    let mut days = days();
    for day in &mut days {
        day.meals[0].name = format!("Омлет с овощами {}", day.day_number);
    }
    days
}

pub fn recipe_json() -> serde_json::Value {
    json!({
        "ingredients": ["200 г куриной грудки", "1 зубчик чеснока", "соль по вкусу"],
        "steps": ["Нарезать", "Обжарить"],
        "cookingTimeMinutes": 25
    })
}

/// Answers day prompts with [`day_json`] and recipe prompts with
/// [`recipe_json`].
pub fn happy_path(request: &ChatRequest) -> Result<String, TransportError> {
    if let Some(day) = requested_day(request) {
        return Ok(format!("```json\n{}\n```", day_json(day)));
    }
    Ok(recipe_json().to_string())
}

// ---------------------------------------------------------------------------
// Store with injected failures
// ---------------------------------------------------------------------------

/// A [`MemoryPlanStore`] that can be told to fail saves or the recipe
/// updates of particular meals.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryPlanStore,
    fail_save: AtomicBool,
    fail_updates: Mutex<HashSet<Uuid>>,
}

impl FlakyStore {
    pub fn fail_saves(&self) {
        self.fail_save.store(true, Ordering::SeqCst);
    }

    pub fn fail_update_of(&self, meal_id: Uuid) {
        self.fail_updates.lock().unwrap().insert(meal_id);
    }
}

#[async_trait]
impl PlanStore for FlakyStore {
    async fn save_week_plan(
        &self,
        user_id: i64,
        profile: &NutritionProfile,
        days: &[DayPlan],
    ) -> Result<WeekPlan, PersistenceError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(PersistenceError::Backend(anyhow::anyhow!("connection reset")));
        }
        self.inner.save_week_plan(user_id, profile, days).await
    }

    async fn update_meal_recipe(&self, meal_id: Uuid, recipe: &Recipe) -> Result<(), PersistenceError> {
        if self.fail_updates.lock().unwrap().contains(&meal_id) {
            return Err(PersistenceError::Backend(anyhow::anyhow!("deadlock detected")));
        }
        self.inner.update_meal_recipe(meal_id, recipe).await
    }

    async fn get_week_plan(&self, id: Uuid) -> Result<Option<WeekPlan>, PersistenceError> {
        self.inner.get_week_plan(id).await
    }

    async fn latest_week_plan(&self, user_id: i64) -> Result<Option<WeekPlan>, PersistenceError> {
        self.inner.latest_week_plan(user_id).await
    }

    async fn get_meal_recipe(&self, meal_id: Uuid) -> Result<Option<MealRecipe>, PersistenceError> {
        self.inner.get_meal_recipe(meal_id).await
    }

    async fn latest_week_plan_created_at(
        &self,
        user_id: i64,
    ) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        self.inner.latest_week_plan_created_at(user_id).await
    }
}
