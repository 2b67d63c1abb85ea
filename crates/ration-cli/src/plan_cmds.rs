//! Operator CLI handlers for `ration plan` subcommands.
//!
//! Implements:
//! - `ration plan generate`          -- synthesize, save and enrich a week plan
//! - `ration plan show <plan-id>`    -- print a saved week plan
//! - `ration plan show --user-id N`  -- print the user's latest week plan
//! - `ration plan cooldown`          -- whether a user may generate again

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use ration_core::enrich::{EnrichmentHandle, EnrichmentProgress, EnrichmentReport};
use ration_core::plan::{CooldownStatus, WeekPlan, cooldown_status};
use ration_core::planner::MealPlanner;
use ration_core::store::{PersistenceError, PlanStore};

use crate::parse_id;
use crate::profile_args::ProfileArgs;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Which saved week plan a command works on.
#[derive(Debug, Clone, Args)]
pub struct PlanTarget {
    /// Week plan ID
    #[arg(required_unless_present = "user_id", conflicts_with = "user_id")]
    pub week_plan_id: Option<String>,
    /// Use this user's most recent week plan instead of an ID
    #[arg(long)]
    pub user_id: Option<i64>,
}

/// Load the plan named by `target` from `store`.
pub async fn load_plan<S: PlanStore + ?Sized>(store: &S, target: &PlanTarget) -> Result<WeekPlan> {
    let plan = match (&target.week_plan_id, target.user_id) {
        (Some(raw), _) => {
            let id = parse_id("week plan", raw)?;
            store
                .get_week_plan(id)
                .await?
                .ok_or(PersistenceError::WeekPlanNotFound(id))?
        }
        (None, Some(user_id)) => store
            .latest_week_plan(user_id)
            .await?
            .ok_or(PersistenceError::NoWeekPlanForUser(user_id))?,
        (None, None) => anyhow::bail!("give a week plan ID or --user-id"),
    };
    Ok(plan)
}

pub struct GenerateOptions {
    pub user_id: i64,
    pub force: bool,
    /// Upper bound on waiting for recipe enrichment.
    pub wait: Duration,
    pub json: bool,
}

// -----------------------------------------------------------------------
// ration plan generate
// -----------------------------------------------------------------------

pub async fn cmd_generate(planner: &MealPlanner, args: &ProfileArgs, options: GenerateOptions) -> Result<()> {
    let profile = args.to_profile()?;
    let handle = planner
        .synthesize_week_plan(options.user_id, &profile, options.force)
        .await?;

    print_plan(&handle.plan, options.json)?;

    if handle.from_cache {
        println!();
        println!("Served from cache; recipes were enriched by the earlier run.");
    } else {
        let report = await_enrichment(handle.enrichment, options.wait).await?;
        println!();
        println!("{}", format_report(&report));
        if report.skipped > 0 {
            println!("Enrichment stopped early; meals without a recipe are left out of the list.");
        }
    }

    let list = planner.shopping_list_for_week_plan(handle.plan.id).await?;
    println!();
    println!("{list}");
    Ok(())
}

/// Report progress until the run finishes or `limit` passes. On timeout the
/// run is cancelled and the meals already in flight are allowed to land.
async fn await_enrichment(handle: EnrichmentHandle, limit: Duration) -> Result<EnrichmentReport> {
    let deadline = tokio::time::Instant::now() + limit;
    let mut last = EnrichmentProgress::default();

    while !handle.is_finished() {
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(wait_secs = limit.as_secs(), "enrichment did not finish in time, cancelling");
            handle.cancel();
            break;
        }
        let progress = handle.progress();
        if progress != last {
            eprintln!("  recipes: {}/{}", progress.completed, progress.total);
            last = progress;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    Ok(handle.wait().await?)
}

fn format_report(report: &EnrichmentReport) -> String {
    let mut line = format!(
        "Recipes: {} generated, {} cached, {} fallback (of {})",
        report.generated, report.cached, report.fallback, report.total
    );
    if report.persist_failures > 0 {
        let _ = write!(line, ", {} not saved", report.persist_failures);
    }
    if report.skipped > 0 {
        let _ = write!(line, ", {} skipped", report.skipped);
    }
    line
}

// -----------------------------------------------------------------------
// ration plan show
// -----------------------------------------------------------------------

pub async fn cmd_show<S: PlanStore + ?Sized>(store: &S, target: &PlanTarget, json: bool) -> Result<()> {
    let plan = load_plan(store, target).await?;
    print_plan(&plan, json)
}

fn print_plan(plan: &WeekPlan, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(plan)?);
    } else {
        print!("{}", format_plan(plan));
    }
    Ok(())
}

fn format_plan(plan: &WeekPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Week plan {}", plan.id);
    let _ = writeln!(out, "  User:    {}", plan.user_id);
    let _ = writeln!(out, "  Created: {}", plan.created_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "  Targets: {}", plan.profile);

    for day in &plan.days {
        let totals = day.totals();
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Day {}  ({:.0} kcal, P {:.0} / F {:.0} / C {:.0})",
            day.day_number, totals.calories, totals.protein, totals.fat, totals.carbs
        );
        for meal in &day.meals {
            let recipe = match &meal.recipe {
                Some(r) if !r.is_empty() => "recipe",
                _ => "-",
            };
            let _ = writeln!(
                out,
                "  {:<10} {:<40} {:>5.0} kcal  {:>4.0} g  {:<6} {}",
                meal.meal_time.to_string(),
                meal.name,
                meal.calories,
                meal.portion_weight_grams,
                recipe,
                meal.id.map(|id| id.to_string()).unwrap_or_default(),
            );
        }
    }
    out
}

// -----------------------------------------------------------------------
// ration plan cooldown
// -----------------------------------------------------------------------

pub async fn cmd_cooldown<S: PlanStore + ?Sized>(store: &S, user_id: i64) -> Result<()> {
    let last = store.latest_week_plan_created_at(user_id).await?;
    println!("{}", format_cooldown(cooldown_status(last, Utc::now())));
    Ok(())
}

fn format_cooldown(status: CooldownStatus) -> String {
    match status {
        CooldownStatus::Allowed => "A new week plan can be generated now.".to_owned(),
        CooldownStatus::Blocked {
            days_left,
            next_allowed_at,
        } => format!(
            "Next week plan in {days_left} day(s), from {}.",
            next_allowed_at.format("%Y-%m-%d %H:%M UTC")
        ),
    }
}
