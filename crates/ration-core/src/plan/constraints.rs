//! Cross-day constraints carried through week synthesis.
//!
//! [`ConstraintState`] counts how often each meal name and ingredient source
//! has been used so far. It is threaded through the days as a fold: each
//! validated day produces a new state via [`ConstraintState::record_day`].
//! [`DayTargets`] holds the tolerance bands a generated day is checked
//! against.

use std::collections::BTreeMap;

use ration_db::models::MealTime;

use super::types::{DayPlan, MacroTotals};
use crate::profile::NutritionProfile;

/// A meal name used this many times is excluded from later days.
pub const MAX_NAME_USES: u32 = 2;

/// Advisory caps on distinct sources across the week.
pub const PROTEIN_SOURCE_CAP: usize = 5;
pub const CARB_SOURCE_CAP: usize = 3;
pub const FIBER_SOURCE_CAP: usize = 5;

/// Usage counters accumulated over the days generated so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintState {
    names: BTreeMap<String, u32>,
    protein_sources: BTreeMap<String, u32>,
    carb_sources: BTreeMap<String, u32>,
    fiber_sources: BTreeMap<String, u32>,
}

/// Sources already present in the week, per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedSources<'a> {
    pub protein: Vec<&'a str>,
    pub carb: Vec<&'a str>,
    pub fiber: Vec<&'a str>,
}

impl UsedSources<'_> {
    pub fn is_empty(&self) -> bool {
        self.protein.is_empty() && self.carb.is_empty() && self.fiber.is_empty()
    }
}

impl ConstraintState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The state after `day` has been appended to the week.
    pub fn record_day(&self, day: &DayPlan) -> Self {
        let mut next = self.clone();
        for meal in &day.meals {
            bump(&mut next.names, &meal.name);
            if let Some(source) = &meal.protein_source {
                bump(&mut next.protein_sources, source);
            }
            if let Some(source) = &meal.carb_source {
                bump(&mut next.carb_sources, source);
            }
            if let Some(source) = &meal.fiber_source {
                bump(&mut next.fiber_sources, source);
            }
        }
        next
    }

    /// Meal names that must not be generated again.
    pub fn blocked_names(&self) -> Vec<&str> {
        self.names
            .iter()
            .filter(|(_, count)| **count >= MAX_NAME_USES)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn used_sources(&self) -> UsedSources<'_> {
        UsedSources {
            protein: self.protein_sources.keys().map(String::as_str).collect(),
            carb: self.carb_sources.keys().map(String::as_str).collect(),
            fiber: self.fiber_sources.keys().map(String::as_str).collect(),
        }
    }

    pub fn name_uses(&self, name: &str) -> u32 {
        self.names.get(&normalize_key(name)).copied().unwrap_or(0)
    }
}

fn bump(counts: &mut BTreeMap<String, u32>, raw: &str) {
    let key = normalize_key(raw);
    if !key.is_empty() {
        *counts.entry(key).or_insert(0) += 1;
    }
}

fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Tolerance bands
// ---------------------------------------------------------------------------

/// Closed interval a quantity should fall into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    fn around(target: f64, low: f64, high: f64) -> Self {
        Self {
            min: target * low,
            max: target * high,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Per-day bands derived from a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct DayTargets {
    pub calories: Band,
    pub protein: Band,
    pub fat: Band,
    pub carbs: Band,
    /// Calorie band per meal time, as a share of the daily target.
    pub meals: [(MealTime, Band); 3],
}

impl DayTargets {
    pub fn for_profile(profile: &NutritionProfile) -> Self {
        let kcal = f64::from(profile.daily_calories);
        Self {
            calories: Band::around(kcal, 0.99, 1.01),
            protein: Band::around(f64::from(profile.protein_grams), 0.97, 1.03),
            fat: Band::around(f64::from(profile.fat_grams), 0.97, 1.03),
            carbs: Band::around(f64::from(profile.carbs_grams), 0.97, 1.03),
            meals: [
                (MealTime::Breakfast, Band::around(kcal, 0.22, 0.28)),
                (MealTime::Lunch, Band::around(kcal, 0.37, 0.43)),
                (MealTime::Dinner, Band::around(kcal, 0.32, 0.38)),
            ],
        }
    }

    /// Compare a day against the bands. Never fails; the report lists what
    /// is out of range.
    pub fn check(&self, day: &DayPlan) -> BandReport {
        let totals = day.totals();
        let mut out_of_band = Vec::new();

        for (label, band, value) in [
            ("calories", self.calories, totals.calories),
            ("protein", self.protein, totals.protein),
            ("fat", self.fat, totals.fat),
            ("carbs", self.carbs, totals.carbs),
        ] {
            if !band.contains(value) {
                out_of_band.push(format!(
                    "{label} {value:.0} outside {:.0}..{:.0}",
                    band.min, band.max
                ));
            }
        }

        for (time, band) in &self.meals {
            let Some(meal) = day.meal(*time) else {
                continue;
            };
            if !band.contains(meal.calories) {
                out_of_band.push(format!(
                    "{time} calories {:.0} outside {:.0}..{:.0}",
                    meal.calories, band.min, band.max
                ));
            }
        }

        BandReport {
            totals,
            out_of_band,
        }
    }
}

/// Outcome of [`DayTargets::check`].
#[derive(Debug, Clone, PartialEq)]
pub struct BandReport {
    pub totals: MacroTotals,
    pub out_of_band: Vec<String>,
}

impl BandReport {
    pub fn within_bands(&self) -> bool {
        self.out_of_band.is_empty()
    }
}
