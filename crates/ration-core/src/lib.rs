//! Weekly meal-plan synthesis, recipe enrichment and shopping lists.
//!
//! [`planner::MealPlanner`] is the entry point; the other modules are the
//! components it wires together and can be used on their own.

pub mod cache;
pub mod enrich;
pub mod generation;
pub mod parse;
pub mod plan;
pub mod planner;
pub mod profile;
pub mod shopping;
pub mod store;

pub use ration_db::models::{Goal, MealTime};
