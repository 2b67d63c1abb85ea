use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Time of day a meal is eaten.
///
/// Variant order is the display order within a day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MealTime {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealTime {
    /// All meal times in display order.
    pub const ALL: [MealTime; 3] = [Self::Breakfast, Self::Lunch, Self::Dinner];
}

impl fmt::Display for MealTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        };
        f.write_str(s)
    }
}

impl FromStr for MealTime {
    type Err = MealTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            _ => Err(MealTimeParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`MealTime`] string.
#[derive(Debug, Clone)]
pub struct MealTimeParseError(pub String);

impl fmt::Display for MealTimeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid meal time: {:?}", self.0)
    }
}

impl std::error::Error for MealTimeParseError {}

// ---------------------------------------------------------------------------

/// Dietary goal of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Lose,
    Maintain,
    Gain,
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lose => "lose",
            Self::Maintain => "maintain",
            Self::Gain => "gain",
        };
        f.write_str(s)
    }
}

impl FromStr for Goal {
    type Err = GoalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lose" => Ok(Self::Lose),
            "maintain" => Ok(Self::Maintain),
            "gain" => Ok(Self::Gain),
            _ => Err(GoalParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Goal`] string.
#[derive(Debug, Clone)]
pub struct GoalParseError(pub String);

impl fmt::Display for GoalParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid goal: {:?} (expected lose, maintain, or gain)", self.0)
    }
}

impl std::error::Error for GoalParseError {}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row in the `week_plans` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WeekPlanRow {
    pub id: Uuid,
    pub user_id: i64,
    pub daily_calories: i32,
    pub protein_grams: i32,
    pub fat_grams: i32,
    pub carbs_grams: i32,
    pub goal: Goal,
    pub created_at: DateTime<Utc>,
}

/// A row in the `meals` table.
///
/// `recipe` holds the recipe JSON document once enrichment has written it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MealRow {
    pub id: Uuid,
    pub week_plan_id: Uuid,
    pub day_number: i16,
    pub meal_time: MealTime,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub portion_weight_grams: f64,
    pub protein_source: Option<String>,
    pub carb_source: Option<String>,
    pub fiber_source: Option<String>,
    pub recipe: Option<Json<serde_json::Value>>,
    pub recipe_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_time_round_trips_through_strings() {
        for mt in MealTime::ALL {
            assert_eq!(mt.to_string().parse::<MealTime>().unwrap(), mt);
        }
        assert_eq!(" Lunch ".parse::<MealTime>().unwrap(), MealTime::Lunch);
        assert!("brunch".parse::<MealTime>().is_err());
    }

    #[test]
    fn meal_time_orders_breakfast_first() {
        let mut times = vec![MealTime::Dinner, MealTime::Breakfast, MealTime::Lunch];
        times.sort();
        assert_eq!(times, MealTime::ALL.to_vec());
    }

    #[test]
    fn goal_parse_rejects_unknown() {
        assert_eq!("gain".parse::<Goal>().unwrap(), Goal::Gain);
        let err = "bulk".parse::<Goal>().unwrap_err();
        assert!(err.to_string().contains("bulk"));
    }
}
