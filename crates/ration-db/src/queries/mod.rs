//! Query functions, one module per table.

pub mod meals;
pub mod week_plans;
