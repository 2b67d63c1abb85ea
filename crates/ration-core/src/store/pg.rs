use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ration_db::models::{MealRow, WeekPlanRow};
use ration_db::queries::{meals, week_plans};

use super::{PersistenceError, PlanStore, check_complete_week};
use crate::plan::{DayPlan, Meal, MealRecipe, Recipe, WeekPlan};
use crate::profile::NutritionProfile;

/// [`PlanStore`] backed by the PostgreSQL schema of `ration-db`.
#[derive(Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_i32(value: u32, what: &str) -> Result<i32, PersistenceError> {
    i32::try_from(value).map_err(|_| PersistenceError::Malformed(format!("{what} {value} out of range")))
}

fn recipe_from_row(row: &MealRow) -> Option<Recipe> {
    let json = row.recipe.as_ref()?;
    match serde_json::from_value::<Recipe>(json.0.clone()) {
        Ok(recipe) => Some(recipe),
        Err(e) => {
            tracing::warn!(meal_id = %row.id, error = %e, "stored recipe is unreadable; treating as empty");
            Some(Recipe::empty())
        }
    }
}

fn meal_from_row(row: MealRow) -> Meal {
    let recipe = recipe_from_row(&row);
    Meal {
        id: Some(row.id),
        meal_time: row.meal_time,
        name: row.name,
        calories: row.calories,
        protein: row.protein,
        fat: row.fat,
        carbs: row.carbs,
        portion_weight_grams: row.portion_weight_grams,
        protein_source: row.protein_source,
        carb_source: row.carb_source,
        fiber_source: row.fiber_source,
        recipe,
    }
}

/// Assemble a [`WeekPlan`] from its row and its meal rows (any order).
fn week_from_rows(plan: WeekPlanRow, rows: Vec<MealRow>) -> WeekPlan {
    let mut days: Vec<DayPlan> = Vec::new();
    let mut rows = rows;
    rows.sort_by_key(|r| (r.day_number, r.meal_time));

    for row in rows {
        let day_number = u8::try_from(row.day_number).unwrap_or(0);
        let meal = meal_from_row(row);
        match days.last_mut() {
            Some(day) if day.day_number == day_number => day.meals.push(meal),
            _ => days.push(DayPlan {
                day_number,
                meals: vec![meal],
            }),
        }
    }

    WeekPlan {
        id: plan.id,
        user_id: plan.user_id,
        profile: NutritionProfile {
            daily_calories: u32::try_from(plan.daily_calories).unwrap_or(0),
            protein_grams: u32::try_from(plan.protein_grams).unwrap_or(0),
            fat_grams: u32::try_from(plan.fat_grams).unwrap_or(0),
            carbs_grams: u32::try_from(plan.carbs_grams).unwrap_or(0),
            goal: plan.goal,
        },
        created_at: plan.created_at,
        days,
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn save_week_plan(
        &self,
        user_id: i64,
        profile: &NutritionProfile,
        days: &[DayPlan],
    ) -> Result<WeekPlan, PersistenceError> {
        check_complete_week(days)?;

        let new_plan = week_plans::NewWeekPlan {
            user_id,
            daily_calories: to_i32(profile.daily_calories, "daily calories")?,
            protein_grams: to_i32(profile.protein_grams, "protein grams")?,
            fat_grams: to_i32(profile.fat_grams, "fat grams")?,
            carbs_grams: to_i32(profile.carbs_grams, "carbs grams")?,
            goal: profile.goal,
        };
        let new_meals: Vec<week_plans::NewMeal<'_>> = days
            .iter()
            .flat_map(|day| {
                day.meals.iter().map(move |m| week_plans::NewMeal {
                    day_number: i16::from(day.day_number),
                    meal_time: m.meal_time,
                    name: &m.name,
                    calories: m.calories,
                    protein: m.protein,
                    fat: m.fat,
                    carbs: m.carbs,
                    portion_weight_grams: m.portion_weight_grams,
                    protein_source: m.protein_source.as_deref(),
                    carb_source: m.carb_source.as_deref(),
                    fiber_source: m.fiber_source.as_deref(),
                })
            })
            .collect();

        let (plan_row, meal_rows) =
            week_plans::insert_week_plan_with_meals(&self.pool, &new_plan, &new_meals).await?;

        tracing::info!(
            week_plan_id = %plan_row.id,
            user_id,
            meals = meal_rows.len(),
            "saved week plan"
        );
        Ok(week_from_rows(plan_row, meal_rows))
    }

    async fn update_meal_recipe(&self, meal_id: Uuid, recipe: &Recipe) -> Result<(), PersistenceError> {
        let json = serde_json::to_value(recipe).context("failed to serialize recipe")?;
        if meals::update_meal_recipe(&self.pool, meal_id, &json).await? {
            Ok(())
        } else {
            Err(PersistenceError::MealNotFound(meal_id))
        }
    }

    async fn get_week_plan(&self, id: Uuid) -> Result<Option<WeekPlan>, PersistenceError> {
        let Some(plan) = week_plans::get_week_plan(&self.pool, id).await? else {
            return Ok(None);
        };
        let rows = meals::list_meals_for_week_plan(&self.pool, id).await?;
        Ok(Some(week_from_rows(plan, rows)))
    }

    async fn latest_week_plan(&self, user_id: i64) -> Result<Option<WeekPlan>, PersistenceError> {
        let Some(plan) = week_plans::latest_week_plan_for_user(&self.pool, user_id).await? else {
            return Ok(None);
        };
        let rows = meals::list_meals_for_week_plan(&self.pool, plan.id).await?;
        Ok(Some(week_from_rows(plan, rows)))
    }

    async fn get_meal_recipe(&self, meal_id: Uuid) -> Result<Option<MealRecipe>, PersistenceError> {
        let Some(row) = meals::get_meal(&self.pool, meal_id).await? else {
            return Ok(None);
        };
        let recipe = recipe_from_row(&row).unwrap_or_default();
        Ok(Some(MealRecipe {
            meal_id,
            name: row.name,
            recipe,
        }))
    }

    async fn latest_week_plan_created_at(
        &self,
        user_id: i64,
    ) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        Ok(week_plans::latest_created_at_for_user(&self.pool, user_id).await?)
    }
}
