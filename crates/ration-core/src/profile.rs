//! Daily nutrition targets.
//!
//! A [`NutritionProfile`] is normally supplied by the caller. For callers
//! that only know body metrics, [`NutritionProfile::from_metrics`] derives
//! one with the Mifflin-St Jeor equation, an activity multiplier, a goal
//! adjustment and a fixed 30/30/40 macro split.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ration_db::models::Goal;

/// Daily calorie and macro targets of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionProfile {
    pub daily_calories: u32,
    pub protein_grams: u32,
    pub fat_grams: u32,
    pub carbs_grams: u32,
    pub goal: Goal,
}

impl NutritionProfile {
    /// Targets for the given body metrics and goal.
    pub fn from_metrics(metrics: &BodyMetrics, goal: Goal) -> Self {
        let maintenance = metrics.bmr() * metrics.activity.factor();
        let daily_calories = round_u32(maintenance * goal_multiplier(goal));
        let (protein_grams, fat_grams, carbs_grams) = macro_split(daily_calories);

        Self {
            daily_calories,
            protein_grams,
            fat_grams,
            carbs_grams,
            goal,
        }
    }
}

impl fmt::Display for NutritionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kcal (P {} g / F {} g / C {} g, goal {})",
            self.daily_calories, self.protein_grams, self.fat_grams, self.carbs_grams, self.goal
        )
    }
}

fn goal_multiplier(goal: Goal) -> f64 {
    match goal {
        Goal::Lose => 0.8,
        Goal::Maintain => 1.0,
        Goal::Gain => 1.2,
    }
}

/// Grams of protein, fat and carbs for 30% / 30% / 40% of `calories`.
fn macro_split(calories: u32) -> (u32, u32, u32) {
    let kcal = f64::from(calories);
    (
        round_u32(kcal * 0.30 / 4.0),
        round_u32(kcal * 0.30 / 9.0),
        round_u32(kcal * 0.40 / 4.0),
    )
}

fn round_u32(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

// ---------------------------------------------------------------------------
// Body metrics
// ---------------------------------------------------------------------------

/// Inputs of the calorie calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMetrics {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age_years: u32,
    pub sex: Sex,
    pub activity: ActivityLevel,
}

impl BodyMetrics {
    /// Basal metabolic rate in kcal/day (Mifflin-St Jeor).
    pub fn bmr(&self) -> f64 {
        let base = 10.0 * self.weight_kg + 6.25 * self.height_cm - 5.0 * f64::from(self.age_years);
        match self.sex {
            Sex::Male => base + 5.0,
            Sex::Female => base - 161.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl FromStr for Sex {
    type Err = MetricParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "м" | "муж" | "мужской" => Ok(Self::Male),
            "female" | "f" | "ж" | "жен" | "женский" => Ok(Self::Female),
            _ => Err(MetricParseError::new("sex", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
}

impl ActivityLevel {
    pub fn factor(self) -> f64 {
        match self {
            Self::Low => 1.2,
            Self::Medium => 1.55,
            Self::High => 1.725,
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = MetricParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "низкий" => Ok(Self::Low),
            "medium" | "средний" => Ok(Self::Medium),
            "high" | "высокий" => Ok(Self::High),
            _ => Err(MetricParseError::new("activity level", s)),
        }
    }
}

/// Error returned when parsing an invalid [`Sex`] or [`ActivityLevel`].
#[derive(Debug, Clone)]
pub struct MetricParseError {
    kind: &'static str,
    value: String,
}

impl MetricParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

impl fmt::Display for MetricParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for MetricParseError {}
