//! Week plan domain types.
//!
//! Field names serialize in camelCase, the shape the generation service is
//! asked to produce and the shape recipes are stored in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use ration_db::models::MealTime;

use crate::profile::NutritionProfile;

/// Number of days in a week plan.
pub const DAYS_PER_WEEK: u8 = 7;

/// Number of meals in a day plan.
pub const MEALS_PER_DAY: usize = 3;

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// Cooking instructions attached to a meal after the plan is saved.
///
/// Every field defaults to empty, so a partial document still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recipe {
    /// Free-text ingredient lines, e.g. `"200 г куриной грудки"`.
    #[serde(deserialize_with = "lenient_strings")]
    pub ingredients: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub steps: Vec<String>,
    #[serde(deserialize_with = "lenient_minutes")]
    pub cooking_time_minutes: u32,
}

impl Recipe {
    /// The placeholder stored when no recipe could be generated.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there is nothing to cook from.
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty() && self.steps.is_empty()
    }
}

/// Accepts an array of strings; numbers are stringified and anything else
/// is dropped. A non-array becomes an empty list.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::String(s) => Some(s.trim().to_owned()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect())
}

/// Accepts `30`, `30.5`, `"30"` or `"30 минут"`; anything else is 0.
fn lenient_minutes<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let minutes = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s
            .split_whitespace()
            .next()
            .and_then(|token| token.replace(',', ".").parse::<f64>().ok())
            .unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(minutes.round().clamp(0.0, f64::from(u32::MAX)) as u32)
}

// ---------------------------------------------------------------------------
// Meals and days
// ---------------------------------------------------------------------------

/// One meal of a day plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    /// Assigned by the store when the week plan is saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub meal_time: MealTime,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    #[serde(alias = "portionWeight")]
    pub portion_weight_grams: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carb_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Recipe>,
}

/// Summed energy and macros of a set of meals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl MacroTotals {
    pub fn of<'a>(meals: impl IntoIterator<Item = &'a Meal>) -> Self {
        meals.into_iter().fold(Self::default(), |acc, m| Self {
            calories: acc.calories + m.calories,
            protein: acc.protein + m.protein,
            fat: acc.fat + m.fat,
            carbs: acc.carbs + m.carbs,
        })
    }
}

/// The three meals of one day, ordered breakfast, lunch, dinner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day_number: u8,
    pub meals: Vec<Meal>,
}

impl DayPlan {
    pub fn meal(&self, time: MealTime) -> Option<&Meal> {
        self.meals.iter().find(|m| m.meal_time == time)
    }

    pub fn totals(&self) -> MacroTotals {
        MacroTotals::of(&self.meals)
    }
}

/// A saved seven-day plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekPlan {
    pub id: Uuid,
    pub user_id: i64,
    pub profile: NutritionProfile,
    pub created_at: DateTime<Utc>,
    pub days: Vec<DayPlan>,
}

impl WeekPlan {
    /// All meals, day by day.
    pub fn meals(&self) -> impl Iterator<Item = &Meal> {
        self.days.iter().flat_map(|d| d.meals.iter())
    }

    /// Copy of the plan without recipe documents.
    pub fn without_recipes(&self) -> Self {
        let mut plan = self.clone();
        for meal in plan.days.iter_mut().flat_map(|d| d.meals.iter_mut()) {
            meal.recipe = None;
        }
        plan
    }
}

/// A meal's name together with its stored recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRecipe {
    pub meal_id: Uuid,
    pub name: String,
    pub recipe: Recipe,
}
