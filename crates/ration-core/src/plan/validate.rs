//! Structural validation of a generated day.
//!
//! Only the shape is checked here: a day number, exactly three meals, one
//! per meal time, and every required field present with a usable value.
//! Macro bands are checked separately and never cause a rejection.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

use ration_db::models::MealTime;

use super::types::{DayPlan, MEALS_PER_DAY, Meal};

/// A generated day does not have the required structure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("expected a JSON object for the day, got {0}")]
    NotAnObject(&'static str),

    #[error("missing field {field:?} in {location}")]
    MissingField {
        field: &'static str,
        location: String,
    },

    #[error("invalid field {field:?} in {location}: {reason}")]
    InvalidField {
        field: &'static str,
        location: String,
        reason: String,
    },

    #[error("expected exactly 3 meals, got {0}")]
    MealCount(usize),

    #[error("meal time {0} appears more than once")]
    DuplicateMealTime(MealTime),
}

const NUMERIC_FIELDS: [&str; 4] = ["calories", "protein", "fat", "carbs"];

/// Validate one generated day and convert it to a [`DayPlan`].
///
/// A response wrapped as `{"days": [ {...} ]}` is unwrapped first. The
/// returned day always carries `requested_day`; a different `dayNumber` in
/// the response is logged and overridden.
pub fn validate_day(value: &Value, requested_day: u8) -> Result<DayPlan, ValidationError> {
    let object = unwrap_day(value)?;

    let day_field = object
        .get("dayNumber")
        .ok_or_else(|| missing("dayNumber", "day"))?;
    let reported = as_number(day_field).ok_or_else(|| invalid("dayNumber", "day", "not a number"))?;
    if reported != f64::from(requested_day) {
        tracing::warn!(
            requested = requested_day,
            reported,
            "generated day number differs from requested day; using requested"
        );
    }

    let meals_value = object.get("meals").ok_or_else(|| missing("meals", "day"))?;
    let Value::Array(raw_meals) = meals_value else {
        return Err(invalid("meals", "day", "not an array"));
    };
    if raw_meals.len() != MEALS_PER_DAY {
        return Err(ValidationError::MealCount(raw_meals.len()));
    }

    let mut seen = BTreeSet::new();
    let mut meals = Vec::with_capacity(MEALS_PER_DAY);
    for (index, raw) in raw_meals.iter().enumerate() {
        let meal = validate_meal(raw, index + 1)?;
        if !seen.insert(meal.meal_time) {
            return Err(ValidationError::DuplicateMealTime(meal.meal_time));
        }
        meals.push(meal);
    }
    meals.sort_by_key(|m| m.meal_time);

    Ok(DayPlan {
        day_number: requested_day,
        meals,
    })
}

fn unwrap_day(value: &Value) -> Result<&Map<String, Value>, ValidationError> {
    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::NotAnObject(kind(value)))?;
    if object.contains_key("meals") {
        return Ok(object);
    }
    match object.get("days").and_then(Value::as_array).map(Vec::as_slice) {
        Some([single]) => single
            .as_object()
            .ok_or_else(|| ValidationError::NotAnObject(kind(single))),
        _ => Ok(object),
    }
}

fn validate_meal(raw: &Value, position: usize) -> Result<Meal, ValidationError> {
    let location = format!("meal {position}");
    let object = raw.as_object().ok_or_else(|| ValidationError::InvalidField {
        field: "meals",
        location: location.clone(),
        reason: format!("expected an object, got {}", kind(raw)),
    })?;

    let time_value = object
        .get("mealTime")
        .ok_or_else(|| missing("mealTime", &location))?;
    let meal_time = time_value
        .as_str()
        .and_then(|s| s.parse::<MealTime>().ok())
        .ok_or_else(|| invalid("mealTime", &location, "expected breakfast, lunch or dinner"))?;

    let name = object
        .get("name")
        .ok_or_else(|| missing("name", &location))?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("name", &location, "expected a non-empty string"))?
        .to_owned();

    let mut numbers = [0.0; 4];
    for (slot, field) in numbers.iter_mut().zip(NUMERIC_FIELDS) {
        *slot = required_number(object, field, &location)?;
    }
    let [calories, protein, fat, carbs] = numbers;

    let portion = match object
        .get("portionWeight")
        .or_else(|| object.get("portionWeightGrams"))
    {
        Some(v) => non_negative(v, "portionWeight", &location)?,
        None => return Err(missing("portionWeight", &location)),
    };

    Ok(Meal {
        id: None,
        meal_time,
        name,
        calories,
        protein,
        fat,
        carbs,
        portion_weight_grams: portion,
        protein_source: optional_text(object, "proteinSource"),
        carb_source: optional_text(object, "carbSource"),
        fiber_source: optional_text(object, "fiberSource"),
        recipe: None,
    })
}

fn required_number(
    object: &Map<String, Value>,
    field: &'static str,
    location: &str,
) -> Result<f64, ValidationError> {
    let value = object.get(field).ok_or_else(|| missing(field, location))?;
    non_negative(value, field, location)
}

fn non_negative(value: &Value, field: &'static str, location: &str) -> Result<f64, ValidationError> {
    match as_number(value) {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
        Some(_) => Err(invalid(field, location, "must be a non-negative number")),
        None => Err(invalid(field, location, "not a number")),
    }
}

/// A number, or a string whose first token is a number (`"350"`, `"350 ккал"`).
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .split_whitespace()
            .next()?
            .replace(',', ".")
            .parse()
            .ok(),
        _ => None,
    }
}

fn optional_text(object: &Map<String, Value>, field: &str) -> Option<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn missing(field: &'static str, location: &str) -> ValidationError {
    ValidationError::MissingField {
        field,
        location: location.to_owned(),
    }
}

fn invalid(field: &'static str, location: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        field,
        location: location.to_owned(),
        reason: reason.to_owned(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
