//! Query functions against a migrated PostgreSQL database.

use serde_json::json;

use ration_db::models::{Goal, MealTime};
use ration_db::pool;
use ration_db::queries::week_plans::{NewMeal, NewWeekPlan};
use ration_db::queries::{meals, week_plans};
use ration_test_utils::TestDb;

fn new_plan(user_id: i64) -> NewWeekPlan {
    NewWeekPlan {
        user_id,
        daily_calories: 2000,
        protein_grams: 150,
        fat_grams: 67,
        carbs_grams: 200,
        goal: Goal::Maintain,
    }
}

fn new_meals(names: &[String]) -> Vec<NewMeal<'_>> {
    let mut out = Vec::new();
    for day in 1..=7i16 {
        for (i, time) in MealTime::ALL.iter().enumerate() {
            let name = &names[(day as usize - 1) * 3 + i];
            out.push(NewMeal {
                day_number: day,
                meal_time: *time,
                name,
                calories: 650.0,
                protein: 50.0,
                fat: 22.0,
                carbs: 66.0,
                portion_weight_grams: 350.0,
                protein_source: Some("курица"),
                carb_source: None,
                fiber_source: Some("брокколи"),
            });
        }
    }
    out
}

fn names() -> Vec<String> {
    (0..21).map(|i| format!("Блюдо {i}")).collect()
}

#[tokio::test]
async fn insert_returns_plan_and_meals() {
    let db = TestDb::create().await;
    let names = names();

    let (plan, rows) = week_plans::insert_week_plan_with_meals(&db.pool, &new_plan(1), &new_meals(&names))
        .await
        .unwrap();
    assert_eq!(plan.user_id, 1);
    assert_eq!(plan.goal, Goal::Maintain);
    assert_eq!(rows.len(), 21);
    assert!(rows.iter().all(|r| r.week_plan_id == plan.id && r.recipe.is_none()));

    let listed = meals::list_meals_for_week_plan(&db.pool, plan.id).await.unwrap();
    let order: Vec<(i16, MealTime)> = listed.iter().map(|m| (m.day_number, m.meal_time)).collect();
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);

    let fetched = week_plans::get_week_plan(&db.pool, plan.id).await.unwrap().unwrap();
    assert_eq!(fetched.created_at, plan.created_at);

    db.teardown().await;
}

#[tokio::test]
async fn failed_meal_insert_rolls_back_the_plan() {
    let db = TestDb::create().await;
    let names = names();
    let mut meals_in = new_meals(&names);
    // second breakfast on day 1 violates the (plan, day, meal time) key
    meals_in[1].meal_time = MealTime::Breakfast;

    let result = week_plans::insert_week_plan_with_meals(&db.pool, &new_plan(3), &meals_in).await;
    assert!(result.is_err());
    assert!(week_plans::latest_week_plan_for_user(&db.pool, 3).await.unwrap().is_none());

    assert_eq!(pool::store_counts(&db.pool).await.unwrap(), pool::StoreCounts::default());

    db.teardown().await;
}

#[tokio::test]
async fn recipe_update_is_idempotent() {
    let db = TestDb::create().await;
    let names = names();
    let (plan, rows) = week_plans::insert_week_plan_with_meals(&db.pool, &new_plan(1), &new_meals(&names))
        .await
        .unwrap();
    let recipe = json!({"ingredients": ["2 яйца"], "steps": ["Взбить"], "cookingTimeMinutes": 5});

    assert!(meals::update_meal_recipe(&db.pool, rows[0].id, &recipe).await.unwrap());
    assert!(meals::update_meal_recipe(&db.pool, rows[0].id, &recipe).await.unwrap());

    let meal = meals::get_meal(&db.pool, rows[0].id).await.unwrap().unwrap();
    assert_eq!(meal.recipe.map(|j| j.0), Some(recipe.clone()));
    assert!(meal.recipe_updated_at.is_some());
    assert_eq!(
        pool::store_counts(&db.pool).await.unwrap(),
        pool::StoreCounts {
            week_plans: 1,
            meals: 21,
            meals_with_recipe: 1,
        }
    );
    assert_eq!(meal.week_plan_id, plan.id);

    let missing = meals::update_meal_recipe(&db.pool, uuid::Uuid::new_v4(), &recipe).await;
    assert!(!missing.unwrap(), "unknown meal id must report no row updated");

    db.teardown().await;
}

#[tokio::test]
async fn latest_created_at_tracks_newest_plan() {
    let db = TestDb::create().await;
    let names = names();

    assert_eq!(week_plans::latest_created_at_for_user(&db.pool, 8).await.unwrap(), None);
    week_plans::insert_week_plan_with_meals(&db.pool, &new_plan(8), &new_meals(&names))
        .await
        .unwrap();
    let (newer, _) = week_plans::insert_week_plan_with_meals(&db.pool, &new_plan(8), &new_meals(&names))
        .await
        .unwrap();

    assert_eq!(
        week_plans::latest_created_at_for_user(&db.pool, 8).await.unwrap(),
        Some(newer.created_at)
    );
    let latest = week_plans::latest_week_plan_for_user(&db.pool, 8).await.unwrap().unwrap();
    assert_eq!(latest.id, newer.id);
    assert!(week_plans::latest_week_plan_for_user(&db.pool, 9).await.unwrap().is_none());

    db.teardown().await;
}
