//! Database query functions for the `week_plans` table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Goal, MealRow, MealTime, WeekPlanRow};

/// Column values for a new `week_plans` row.
#[derive(Debug, Clone)]
pub struct NewWeekPlan {
    pub user_id: i64,
    pub daily_calories: i32,
    pub protein_grams: i32,
    pub fat_grams: i32,
    pub carbs_grams: i32,
    pub goal: Goal,
}

/// Column values for a new `meals` row. The week plan id is supplied by
/// [`insert_week_plan_with_meals`].
#[derive(Debug, Clone)]
pub struct NewMeal<'a> {
    pub day_number: i16,
    pub meal_time: MealTime,
    pub name: &'a str,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub portion_weight_grams: f64,
    pub protein_source: Option<&'a str>,
    pub carb_source: Option<&'a str>,
    pub fiber_source: Option<&'a str>,
}

/// Insert a week plan and all of its meals inside a single transaction.
///
/// Returns the plan row and the meal rows in insertion order. If any insert
/// fails the transaction is dropped without commit, so no partial week is
/// ever visible to readers.
pub async fn insert_week_plan_with_meals(
    pool: &PgPool,
    plan: &NewWeekPlan,
    meals: &[NewMeal<'_>],
) -> Result<(WeekPlanRow, Vec<MealRow>)> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan_row = sqlx::query_as::<_, WeekPlanRow>(
        "INSERT INTO week_plans (user_id, daily_calories, protein_grams, fat_grams, carbs_grams, goal) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(plan.user_id)
    .bind(plan.daily_calories)
    .bind(plan.protein_grams)
    .bind(plan.fat_grams)
    .bind(plan.carbs_grams)
    .bind(plan.goal)
    .fetch_one(&mut *tx)
    .await
    .context("failed to insert week plan")?;

    let mut meal_rows = Vec::with_capacity(meals.len());
    for meal in meals {
        let row = sqlx::query_as::<_, MealRow>(
            "INSERT INTO meals (week_plan_id, day_number, meal_time, name, calories, protein, fat, carbs, \
                                portion_weight_grams, protein_source, carb_source, fiber_source) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING *",
        )
        .bind(plan_row.id)
        .bind(meal.day_number)
        .bind(meal.meal_time)
        .bind(meal.name)
        .bind(meal.calories)
        .bind(meal.protein)
        .bind(meal.fat)
        .bind(meal.carbs)
        .bind(meal.portion_weight_grams)
        .bind(meal.protein_source)
        .bind(meal.carb_source)
        .bind(meal.fiber_source)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| {
            format!(
                "failed to insert meal {:?} (day {}, {})",
                meal.name, meal.day_number, meal.meal_time
            )
        })?;
        meal_rows.push(row);
    }

    tx.commit().await.context("failed to commit transaction")?;

    Ok((plan_row, meal_rows))
}

/// Fetch a week plan by its ID.
pub async fn get_week_plan(pool: &PgPool, id: Uuid) -> Result<Option<WeekPlanRow>> {
    let plan = sqlx::query_as::<_, WeekPlanRow>("SELECT * FROM week_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch week plan")?;

    Ok(plan)
}

/// The user's most recent week plan, if any.
pub async fn latest_week_plan_for_user(pool: &PgPool, user_id: i64) -> Result<Option<WeekPlanRow>> {
    let plan = sqlx::query_as::<_, WeekPlanRow>(
        "SELECT * FROM week_plans WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch latest week plan")?;

    Ok(plan)
}

/// Creation time of the user's most recent week plan, if any.
pub async fn latest_created_at_for_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<DateTime<Utc>>> {
    let latest: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT MAX(created_at) FROM week_plans WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .context("failed to fetch latest week plan time")?;

    Ok(latest)
}
