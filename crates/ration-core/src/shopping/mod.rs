//! Deterministic shopping list aggregation.
//!
//! Free-text ingredient lines (Russian, roughly `"<qty> <unit> <name>"`)
//! are normalized, summed per (name, unit), grouped into fixed categories
//! and rendered as plain text. The pipeline has no I/O and its output
//! depends only on the multiset of input lines.

pub mod category;
pub mod normalize;

use std::collections::BTreeMap;
use std::fmt::Write as _;

pub use category::{Category, categorize};
pub use normalize::{ParsedIngredient, parse_ingredient};

use crate::plan::Meal;

/// Returned by [`shopping_list_for_meals`] when there is nothing to buy.
pub const EMPTY_SHOPPING_LIST: &str = "Список покупок пуст. Нет доступных ингредиентов.";

/// Names that are always listed without a quantity.
const SEASONINGS: [&str; 4] = ["соль", "перец", "специи", "соль и перец"];

/// One line of the shopping list.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedIngredient {
    pub name: String,
    /// Canonical unit, or empty for unit-less and seasoning items.
    pub unit: String,
    pub amount: f64,
}

/// One section of the shopping list.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingCategory {
    pub category: Category,
    pub items: Vec<AggregatedIngredient>,
}

/// Normalize and sum ingredient lines, sorted by (name, unit).
///
/// Seasonings and "to taste" items lose their quantity and unit, so they
/// merge by name. Lines whose name normalizes to nothing are dropped.
pub fn aggregate<S: AsRef<str>>(lines: &[S]) -> Vec<AggregatedIngredient> {
    let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();

    for line in lines {
        let parsed = parse_ingredient(line.as_ref());
        if parsed.name.is_empty() {
            continue;
        }
        let (amount, unit) = if parsed.to_taste || SEASONINGS.contains(&parsed.name.as_str()) {
            (0.0, String::new())
        } else {
            (parsed.amount, parsed.unit)
        };
        groups.entry((parsed.name, unit)).or_default().push(amount);
    }

    groups
        .into_iter()
        .map(|((name, unit), mut amounts)| {
            // fixed summation order keeps float results independent of input order
            amounts.sort_by(f64::total_cmp);
            AggregatedIngredient {
                name,
                unit,
                amount: amounts.iter().sum(),
            }
        })
        .collect()
}

/// Group aggregated items into the non-empty categories, in display order.
pub fn categorize_all(items: Vec<AggregatedIngredient>) -> Vec<ShoppingCategory> {
    let mut by_category: BTreeMap<Category, Vec<AggregatedIngredient>> = BTreeMap::new();
    for item in items {
        by_category.entry(categorize(&item.name)).or_default().push(item);
    }

    by_category
        .into_iter()
        .map(|(category, mut items)| {
            items.sort_by(|a, b| {
                sort_key(&a.name)
                    .cmp(&sort_key(&b.name))
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.unit.cmp(&b.unit))
            });
            ShoppingCategory { category, items }
        })
        .collect()
}

/// Alphabetical key: `ё` sorts as `е`, not after `я`.
fn sort_key(name: &str) -> String {
    name.replace('ё', "е").replace('Ё', "Е")
}

fn is_spoon(unit: &str) -> bool {
    unit == normalize::TABLESPOON || unit == normalize::TEASPOON
}

/// Quantity text for an item, or `None` when it rounds to zero.
fn format_quantity(item: &AggregatedIngredient) -> Option<String> {
    let text = if is_spoon(&item.unit) {
        let rounded = (item.amount * 10.0).round() / 10.0;
        if rounded == 0.0 {
            return None;
        }
        format!("{rounded}")
    } else {
        let rounded = item.amount.round();
        if rounded == 0.0 {
            return None;
        }
        format!("{}", rounded as i64)
    };

    if item.unit.is_empty() {
        Some(text)
    } else {
        Some(format!("{text} {}", item.unit))
    }
}

/// Render categories as heading lines followed by ` • ` item lines, with a
/// blank line between categories.
pub fn render(categories: &[ShoppingCategory]) -> String {
    let mut out = String::new();
    for section in categories.iter().filter(|s| !s.items.is_empty()) {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", section.category.title());
        for item in &section.items {
            match format_quantity(item) {
                Some(qty) => {
                    let _ = writeln!(out, " • {qty} {}", item.name);
                }
                None => {
                    let _ = writeln!(out, " • {}", item.name);
                }
            }
        }
    }
    out.trim_end().to_owned()
}

/// The whole pipeline over raw ingredient lines. Empty output means
/// nothing usable was found.
pub fn build_shopping_list<S: AsRef<str>>(lines: &[S]) -> String {
    render(&categorize_all(aggregate(lines)))
}

/// Shopping list over the recipes of `meals`. Meals without a recipe are
/// skipped.
pub fn shopping_list_for_meals(meals: &[Meal]) -> String {
    let lines: Vec<&str> = meals
        .iter()
        .filter_map(|m| m.recipe.as_ref())
        .flat_map(|r| r.ingredients.iter().map(String::as_str))
        .collect();

    let list = build_shopping_list(&lines);
    if list.is_empty() {
        EMPTY_SHOPPING_LIST.to_owned()
    } else {
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, unit: &str, amount: f64) -> AggregatedIngredient {
        AggregatedIngredient {
            name: name.into(),
            unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn seasonings_merge_without_quantity() {
        let items = aggregate(&["1 ч.л. соли", "соль по вкусу", "Соль"]);
        assert_eq!(items, vec![item("соль", "", 0.0)]);
    }

    #[test]
    fn to_taste_drops_quantity() {
        let items = aggregate(&["1 ст.л. меда по желанию"]);
        assert_eq!(items, vec![item("мед", "", 0.0)]);
    }

    #[test]
    fn different_units_stay_separate() {
        let items = aggregate(&["1 кг картофеля", "300 г картофеля"]);
        assert_eq!(items, vec![item("картофель", "г", 300.0), item("картофель", "кг", 1.0)]);
    }

    #[test]
    fn empty_names_are_dropped() {
        assert!(aggregate(&["", "   ", "1/2", "(по вкусу)"]).is_empty());
    }

    #[test]
    fn quantities_round_by_unit() {
        assert_eq!(format_quantity(&item("мед", "ст.л.", 1.25)).as_deref(), Some("1.3 ст.л."));
        assert_eq!(format_quantity(&item("мед", "ч.л.", 2.0)).as_deref(), Some("2 ч.л."));
        assert_eq!(format_quantity(&item("рис", "г", 149.6)).as_deref(), Some("150 г"));
        assert_eq!(format_quantity(&item("яйца", "", 3.0)).as_deref(), Some("3"));
        assert_eq!(format_quantity(&item("зелень", "", 0.0)), None);
    }

    #[test]
    fn yo_sorts_with_ye() {
        let sections = categorize_all(vec![
            item("ящик", "шт", 1.0),
            item("ёршик", "шт", 1.0),
            item("бумага", "шт", 2.0),
        ]);
        assert_eq!(sections[0].category, Category::Other);
        let names: Vec<&str> = sections[0].items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["бумага", "ёршик", "ящик"]);
    }

    #[test]
    fn render_uses_fixed_category_order() {
        let text = build_shopping_list(&["2 яйца", "100 г риса", "200 г куриной грудки", "соль по вкусу"]);
        assert_eq!(
            text,
            "Мясо и рыба\n • 200 г куриная грудка\n\n\
             Зерновые и крупы\n • 100 г рис\n\n\
             Яйца\n • 2 яйца\n\n\
             Масла и приправы\n • соль"
        );
    }

    #[test]
    fn meals_without_ingredients_give_placeholder() {
        assert_eq!(shopping_list_for_meals(&[]), EMPTY_SHOPPING_LIST);
    }
}
