//! `ration recipe <meal-id>`: print a meal's stored recipe.

use std::fmt::Write as _;

use anyhow::Result;

use ration_core::plan::MealRecipe;
use ration_core::store::{PersistenceError, PgPlanStore, PlanStore};

use crate::parse_id;

pub async fn run_recipe(store: &PgPlanStore, raw_id: &str) -> Result<()> {
    let id = parse_id("meal", raw_id)?;
    let recipe = store
        .get_meal_recipe(id)
        .await?
        .ok_or(PersistenceError::MealNotFound(id))?;
    print!("{}", format_recipe(&recipe));
    Ok(())
}

fn format_recipe(meal: &MealRecipe) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", meal.name);

    if meal.recipe.is_empty() {
        let _ = writeln!(out, "  No recipe available yet.");
        return out;
    }

    if meal.recipe.cooking_time_minutes > 0 {
        let _ = writeln!(out, "  Cooking time: {} min", meal.recipe.cooking_time_minutes);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Ingredients:");
    for line in &meal.recipe.ingredients {
        let _ = writeln!(out, "  - {line}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Steps:");
    for (i, step) in meal.recipe.steps.iter().enumerate() {
        let _ = writeln!(out, "  {}. {step}", i + 1);
    }
    out
}
