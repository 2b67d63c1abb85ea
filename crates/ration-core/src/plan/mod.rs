//! Week plan synthesis: types, cross-day constraints, prompts, validation
//! and the sequential day generator.

pub mod constraints;
pub mod cooldown;
pub mod prompt;
pub mod synthesize;
pub mod types;
pub mod validate;

pub use constraints::{BandReport, ConstraintState, DayTargets};
pub use cooldown::{CooldownStatus, cooldown_status};
pub use synthesize::{SynthesisError, synthesize_days};
pub use types::{DAYS_PER_WEEK, DayPlan, MEALS_PER_DAY, MacroTotals, Meal, MealRecipe, Recipe, WeekPlan};
pub use validate::{ValidationError, validate_day};
