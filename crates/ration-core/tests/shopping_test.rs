//! Shopping list aggregation over realistic recipe ingredient lists.

use serde_json::json;

use ration_core::plan::{Meal, Recipe};
use ration_core::planner::MealPlanner;
use ration_core::shopping::{EMPTY_SHOPPING_LIST, build_shopping_list, shopping_list_for_meals};

const LINES: [&str; 14] = [
    "200 г куриной грудки",
    "100г куриной грудки",
    "1 зубчик чеснока",
    "2 зубчика чеснока",
    "1 ст. л. оливкового масла",
    "1,5 столовые ложки оливкового масла",
    "Соль и перец по вкусу",
    "150 гр. гречки",
    "2 яйца",
    "1 яйцо",
    "100 г свежих ягод",
    "200 мл молока",
    "30 г грецких орехов",
    "1/2 ч. л. корицы",
];

fn meal_with(ingredients: &[&str]) -> Meal {
    let mut meal: Meal = serde_json::from_value(json!({
        "mealTime": "breakfast",
        "name": "Каша",
        "calories": 400,
        "protein": 20,
        "fat": 10,
        "carbs": 55,
        "portionWeight": 300
    }))
    .unwrap();
    meal.recipe = Some(Recipe {
        ingredients: ingredients.iter().map(|s| (*s).to_owned()).collect(),
        steps: vec!["Смешать".into()],
        cooking_time_minutes: 10,
    });
    meal
}

#[test]
fn merges_spelling_variants_into_one_line() {
    let list = build_shopping_list(&[
        "200 г куриной грудки",
        "100г куриной грудки",
        "1 зубчик чеснока",
        "2 зубчика чеснока",
    ]);
    assert_eq!(
        list,
        "Мясо и рыба\n • 300 г куриная грудка\n\nОвощи\n • 3 зубч чеснок"
    );
}

#[test]
fn full_list_is_grouped_and_rounded() {
    let list = build_shopping_list(&LINES);
    let expected = [
        "Мясо и рыба",
        " • 300 г куриная грудка",
        "",
        "Овощи",
        " • 3 зубч чеснок",
        "",
        "Фрукты и ягоды",
        " • 100 г ягоды",
        "",
        "Зерновые и крупы",
        " • 150 г гречка",
        "",
        "Молочные продукты",
        " • 200 мл молоко",
        "",
        "Яйца",
        " • 3 яйца",
        "",
        "Орехи и семена",
        " • 30 г грецкие орехи",
        "",
        "Масла и приправы",
        " • 0.5 ч.л. корица",
        " • 2.5 ст.л. оливковое масло",
        " • соль и перец",
    ]
    .join("\n");
    assert_eq!(list, expected);
}

#[test]
fn ranges_merge_with_plain_quantities() {
    let list = build_shopping_list(&["2-3 зубчика чеснока", "1 зубчик чеснока", "1 – 2 ст. ложки меда"]);
    assert_eq!(list, "Овощи\n • 4 зубч чеснок\n\nМасла и приправы\n • 2 ст.л. мед");
}

#[test]
fn dairy_and_onion_variants_merge() {
    let list = build_shopping_list(&[
        "200 мл молока",
        "100 мл молоко",
        "1 л молока",
        "200 г сыра",
        "50 г сыр",
        "1 луковица",
        "2 луковицы",
    ]);
    assert_eq!(
        list,
        "Овощи\n • 3 лук\n\nМолочные продукты\n • 1 л молоко\n • 300 мл молоко\n • 250 г сыр"
    );
}

#[test]
fn output_ignores_input_order() {
    let reference = build_shopping_list(&LINES);

    let mut reversed = LINES.to_vec();
    reversed.reverse();
    assert_eq!(build_shopping_list(&reversed), reference);

    for shift in 1..LINES.len() {
        let mut rotated = LINES.to_vec();
        rotated.rotate_left(shift);
        assert_eq!(build_shopping_list(&rotated), reference, "rotation {shift}");
    }

    let mut interleaved: Vec<&str> = LINES.iter().step_by(2).copied().collect();
    interleaved.extend(LINES.iter().skip(1).step_by(2).copied());
    assert_eq!(build_shopping_list(&interleaved), reference);
}

#[test]
fn unknown_lines_land_in_other() {
    let list = build_shopping_list(&["щепотка чего-нибудь", "2 шт батарейки"]);
    assert!(list.starts_with("Прочее\n"), "{list}");
    assert!(list.contains(" • 2 шт батарейки"), "{list}");
    assert!(list.contains(" • щепотка чего-нибудь"), "{list}");
}

#[test]
fn meals_feed_the_aggregator() {
    let meals = vec![
        meal_with(&["200 г куриной грудки"]),
        meal_with(&["100г куриной грудки"]),
        meal_with(&[]),
    ];
    assert_eq!(
        shopping_list_for_meals(&meals),
        "Мясо и рыба\n • 300 г куриная грудка"
    );
    assert_eq!(MealPlanner::shopping_list(&meals), shopping_list_for_meals(&meals));
}

#[test]
fn meals_without_recipes_give_the_empty_message() {
    let mut bare = meal_with(&[]);
    bare.recipe = None;
    assert_eq!(shopping_list_for_meals(&[bare, meal_with(&["по вкусу"])]), EMPTY_SHOPPING_LIST);
}
