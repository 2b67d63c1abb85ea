//! Command-line description of a nutrition profile: either explicit daily
//! targets or the body metrics to derive them from.

use anyhow::{Result, bail};
use clap::Args;

use ration_core::Goal;
use ration_core::profile::{ActivityLevel, BodyMetrics, NutritionProfile, Sex};

#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    /// Goal: lose, maintain or gain
    #[arg(long, default_value = "maintain")]
    pub goal: Goal,

    /// Daily calories (use with --protein, --fat and --carbs)
    #[arg(long, conflicts_with_all = ["weight", "height", "age", "sex", "activity"])]
    pub calories: Option<u32>,
    /// Daily protein in grams
    #[arg(long)]
    pub protein: Option<u32>,
    /// Daily fat in grams
    #[arg(long)]
    pub fat: Option<u32>,
    /// Daily carbs in grams
    #[arg(long)]
    pub carbs: Option<u32>,

    /// Body weight in kilograms
    #[arg(long)]
    pub weight: Option<f64>,
    /// Height in centimeters
    #[arg(long)]
    pub height: Option<f64>,
    /// Age in years
    #[arg(long)]
    pub age: Option<u32>,
    /// Sex: male or female
    #[arg(long)]
    pub sex: Option<Sex>,
    /// Activity level: low, medium or high
    #[arg(long)]
    pub activity: Option<ActivityLevel>,
}

impl ProfileArgs {
    /// Body metrics, when all of them were given.
    pub fn metrics(&self) -> Option<BodyMetrics> {
        Some(BodyMetrics {
            weight_kg: self.weight?,
            height_cm: self.height?,
            age_years: self.age?,
            sex: self.sex?,
            activity: self.activity?,
        })
    }

    pub fn to_profile(&self) -> Result<NutritionProfile> {
        if let (Some(daily_calories), Some(protein_grams), Some(fat_grams), Some(carbs_grams)) =
            (self.calories, self.protein, self.fat, self.carbs)
        {
            if daily_calories == 0 {
                bail!("--calories must be positive");
            }
            return Ok(NutritionProfile {
                daily_calories,
                protein_grams,
                fat_grams,
                carbs_grams,
                goal: self.goal,
            });
        }

        let Some(metrics) = self.metrics() else {
            bail!(
                "give either --calories/--protein/--fat/--carbs or all of \
                 --weight/--height/--age/--sex/--activity"
            );
        };
        if metrics.weight_kg <= 0.0 || metrics.height_cm <= 0.0 {
            bail!("--weight and --height must be positive");
        }
        Ok(NutritionProfile::from_metrics(&metrics, self.goal))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        profile: ProfileArgs,
    }

    fn parse(args: &[&str]) -> Result<NutritionProfile> {
        let mut argv = vec!["harness"];
        argv.extend_from_slice(args);
        Harness::try_parse_from(argv)?.profile.to_profile()
    }

    #[test]
    fn explicit_targets_are_taken_as_is() {
        let profile = parse(&[
            "--calories", "2000", "--protein", "150", "--fat", "67", "--carbs", "200",
        ])
        .unwrap();
        assert_eq!(profile.daily_calories, 2000);
        assert_eq!(profile.carbs_grams, 200);
        assert_eq!(profile.goal, Goal::Maintain);
    }

    #[test]
    fn metrics_are_converted() {
        let metrics = [
            "--weight", "80", "--height", "180", "--age", "30", "--sex", "male", "--activity",
            "medium", "--goal", "maintain",
        ];
        let expected = NutritionProfile::from_metrics(
            &BodyMetrics {
                weight_kg: 80.0,
                height_cm: 180.0,
                age_years: 30,
                sex: Sex::Male,
                activity: ActivityLevel::Medium,
            },
            Goal::Maintain,
        );
        assert_eq!(parse(&metrics).unwrap(), expected);
    }

    #[test]
    fn partial_input_is_rejected() {
        let err = parse(&["--weight", "80"]).unwrap_err();
        assert!(err.to_string().contains("--calories"), "{err}");
    }

    #[test]
    fn calories_need_all_macros() {
        assert!(parse(&["--calories", "2000"]).is_err());
    }
}
