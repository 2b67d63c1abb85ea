//! `ration targets`: print daily targets without touching the database.

use anyhow::Result;

use ration_core::profile::NutritionProfile;

use crate::profile_args::ProfileArgs;

pub fn run_targets(args: &ProfileArgs) -> Result<()> {
    let profile = args.to_profile()?;
    if let Some(metrics) = args.metrics() {
        println!("  BMR:      {:.0} kcal", metrics.bmr());
        println!("  Activity: x{}", metrics.activity.factor());
    }
    print!("{}", format_targets(&profile));
    Ok(())
}

fn format_targets(profile: &NutritionProfile) -> String {
    format!(
        "  Goal:     {}\n  Calories: {} kcal\n  Protein:  {} g\n  Fat:      {} g\n  Carbs:    {} g\n",
        profile.goal, profile.daily_calories, profile.protein_grams, profile.fat_grams, profile.carbs_grams
    )
}
