//! Database query functions for the `meals` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::MealRow;

/// Fetch a single meal by ID.
pub async fn get_meal(pool: &PgPool, id: Uuid) -> Result<Option<MealRow>> {
    let meal = sqlx::query_as::<_, MealRow>("SELECT * FROM meals WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch meal")?;

    Ok(meal)
}

/// List all meals of a week plan ordered by day, then breakfast/lunch/dinner.
pub async fn list_meals_for_week_plan(pool: &PgPool, week_plan_id: Uuid) -> Result<Vec<MealRow>> {
    let meals = sqlx::query_as::<_, MealRow>(
        "SELECT * FROM meals WHERE week_plan_id = $1 \
         ORDER BY day_number ASC, \
                  CASE meal_time WHEN 'breakfast' THEN 0 WHEN 'lunch' THEN 1 ELSE 2 END ASC",
    )
    .bind(week_plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list meals for week plan")?;

    Ok(meals)
}

/// Overwrite the recipe document of one meal.
///
/// Writing the same document twice leaves the row unchanged apart from
/// `recipe_updated_at`. Returns `false` when no meal has this id.
pub async fn update_meal_recipe(
    pool: &PgPool,
    meal_id: Uuid,
    recipe: &serde_json::Value,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE meals SET recipe = $1, recipe_updated_at = now() WHERE id = $2",
    )
    .bind(Json(recipe))
    .bind(meal_id)
    .execute(pool)
    .await
    .context("failed to update meal recipe")?;

    Ok(result.rows_affected() > 0)
}
