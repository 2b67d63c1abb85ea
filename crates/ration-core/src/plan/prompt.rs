//! Prompt text for day and recipe generation.

use std::fmt::Write as _;

use ration_db::models::{Goal, MealTime};

use super::constraints::{
    CARB_SOURCE_CAP, ConstraintState, DayTargets, FIBER_SOURCE_CAP, PROTEIN_SOURCE_CAP,
};
use super::types::Meal;
use crate::generation::ChatMessage;
use crate::profile::NutritionProfile;

/// Sampling temperature for day generation.
pub const DAY_TEMPERATURE: f32 = 0.2;

/// Sampling temperature for recipe generation.
pub const RECIPE_TEMPERATURE: f32 = 0.4;

const SYSTEM_PROMPT: &str = "Ты опытный диетолог. Ты составляешь меню строго по заданным \
    нормам калорий и БЖУ и отвечаешь только валидным JSON-объектом без пояснений и без \
    markdown-разметки.";

fn goal_phrase(goal: Goal) -> &'static str {
    match goal {
        Goal::Lose => "снижение веса",
        Goal::Maintain => "поддержание веса",
        Goal::Gain => "набор массы",
    }
}

fn meal_time_phrase(time: MealTime) -> &'static str {
    match time {
        MealTime::Breakfast => "завтрак",
        MealTime::Lunch => "обед",
        MealTime::Dinner => "ужин",
    }
}

fn join_or_none(items: &[&str]) -> String {
    if items.is_empty() {
        "нет".to_owned()
    } else {
        items.join(", ")
    }
}

/// Messages asking for the meals of day `day`.
pub fn day_messages(
    profile: &NutritionProfile,
    targets: &DayTargets,
    state: &ConstraintState,
    day: u8,
) -> Vec<ChatMessage> {
    let mut p = String::new();

    let _ = writeln!(
        p,
        "Составь меню на день {day} из 7 для человека с суточной нормой {} ккал \
         (белки {} г, жиры {} г, углеводы {} г). Цель: {}.",
        profile.daily_calories,
        profile.protein_grams,
        profile.fat_grams,
        profile.carbs_grams,
        goal_phrase(profile.goal),
    );
    let _ = writeln!(
        p,
        "Сумма за день должна попасть в диапазоны: калории {:.0}–{:.0} ккал, \
         белки {:.0}–{:.0} г, жиры {:.0}–{:.0} г, углеводы {:.0}–{:.0} г.",
        targets.calories.min,
        targets.calories.max,
        targets.protein.min,
        targets.protein.max,
        targets.fat.min,
        targets.fat.max,
        targets.carbs.min,
        targets.carbs.max,
    );
    p.push_str("Калорийность приёмов пищи:\n");
    for (time, band) in &targets.meals {
        let _ = writeln!(
            p,
            "- {}: {:.0}–{:.0} ккал",
            meal_time_phrase(*time),
            band.min,
            band.max
        );
    }

    let blocked = state.blocked_names();
    let _ = writeln!(
        p,
        "Не используй эти блюда, они уже были дважды: {}.",
        join_or_none(&blocked)
    );

    let used = state.used_sources();
    let _ = writeln!(
        p,
        "По возможности повторно используй уже выбранные продукты, чтобы список покупок \
         был коротким. Белки: {}. Углеводы: {}. Клетчатка: {}.",
        join_or_none(&used.protein),
        join_or_none(&used.carb),
        join_or_none(&used.fiber),
    );
    let _ = writeln!(
        p,
        "За неделю должно быть не больше {PROTEIN_SOURCE_CAP} разных источников белка, \
         {CARB_SOURCE_CAP} источников углеводов и {FIBER_SOURCE_CAP} источников клетчатки."
    );

    let _ = write!(
        p,
        "Ровно 3 приёма пищи: breakfast, lunch, dinner. Верни JSON строго такого вида:\n\
         {{\"dayNumber\": {day}, \"meals\": [{{\"mealTime\": \"breakfast\", \"name\": \"...\", \
         \"calories\": 0, \"protein\": 0, \"fat\": 0, \"carbs\": 0, \"portionWeight\": 0, \
         \"proteinSource\": \"...\", \"carbSource\": \"...\", \"fiberSource\": \"...\"}}]}}"
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(p)]
}

/// Messages asking for the recipe of one meal.
pub fn recipe_messages(meal: &Meal, goal: Goal) -> Vec<ChatMessage> {
    let prompt = format!(
        "Составь рецепт блюда \"{name}\" ({time}) на порцию {portion:.0} г: {kcal:.0} ккал, \
         белки {protein:.0} г, жиры {fat:.0} г, углеводы {carbs:.0} г. Цель: {goal}.\n\
         Каждый ингредиент пиши одной строкой в формате \"<количество> <единица> <продукт>\", \
         единицы: г, кг, мл, л, шт, ст.л., ч.л., зубч. Специи указывай как \"по вкусу\".\n\
         Верни JSON: {{\"ingredients\": [\"...\"], \"steps\": [\"...\"], \"cookingTimeMinutes\": 0}}",
        name = meal.name,
        time = meal_time_phrase(meal.meal_time),
        portion = meal.portion_weight_grams,
        kcal = meal.calories,
        protein = meal.protein,
        fat = meal.fat,
        carbs = meal.carbs,
        goal = goal_phrase(goal),
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)]
}
