//! PostgreSQL storage for week plans and their meals.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
