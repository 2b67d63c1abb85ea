use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Shopping list sections, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    MeatAndFish,
    Vegetables,
    FruitsAndBerries,
    Grains,
    Dairy,
    Eggs,
    NutsAndSeeds,
    OilsAndSeasonings,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Self::MeatAndFish,
        Self::Vegetables,
        Self::FruitsAndBerries,
        Self::Grains,
        Self::Dairy,
        Self::Eggs,
        Self::NutsAndSeeds,
        Self::OilsAndSeasonings,
        Self::Other,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::MeatAndFish => "Мясо и рыба",
            Self::Vegetables => "Овощи",
            Self::FruitsAndBerries => "Фрукты и ягоды",
            Self::Grains => "Зерновые и крупы",
            Self::Dairy => "Молочные продукты",
            Self::Eggs => "Яйца",
            Self::NutsAndSeeds => "Орехи и семена",
            Self::OilsAndSeasonings => "Масла и приправы",
            Self::Other => "Прочее",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Ordered (category, pattern) rules; the first match wins. Plain
/// seasonings come first so that "перец" does not land in vegetables.
pub const CATEGORY_RULES: &[(Category, &str)] = &[
    (Category::OilsAndSeasonings, r"^(?:соль|перец|специи|соль и перец)$"),
    (
        Category::MeatAndFish,
        r"курин|куриц|индейк|говяд|свинин|баранин|телятин|фарш|рыб|лосос|треск|тунец|филе|креветк|кальмар|мяс",
    ),
    (
        Category::Vegetables,
        r"брокколи|морков|картоф|перец|лук|чеснок|шпинат|помидор|томат|огур|салат|горош|фасол|цукини|кабач|капуст|свекл|баклажан|сельдер|зелень|укроп|петрушк|овощ|\bнут\b|чечевиц|тыкв|редис|спарж",
    ),
    (
        Category::FruitsAndBerries,
        r"ягод|яблок|банан|апельсин|лимон|лайм|авокадо|клубник|малин|черник|груш|киви|манго|изюм|финик|курага",
    ),
    (
        Category::Grains,
        r"овсян|гречк|\bрис\b|киноа|хлоп|круп|мук|булгур|макарон|спагетти|хлеб|лаваш|кускус|тортиль|отруб",
    ),
    (
        Category::Dairy,
        r"молок|творог|сыр|йогурт|кефир|сметан|сливк|ряженк|моцарелл|пармезан|фета",
    ),
    (Category::Eggs, r"яйц|яиц|яйк"),
    (
        Category::NutsAndSeeds,
        r"орех|семеч|семена|семя|миндал|кешью|фисташ|арахис|кунжут|\bчиа\b|\bльн",
    ),
    (
        Category::OilsAndSeasonings,
        r"масл|соль|перец|специ|\bмед\b|сахар|уксус|соус|приправ|паприк|кориц|ванил|сироп|горчиц|куркум|имбир",
    ),
];

static COMPILED_RULES: LazyLock<Vec<(Category, Regex)>> = LazyLock::new(|| {
    CATEGORY_RULES
        .iter()
        .filter_map(|(category, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((*category, re)),
            Err(e) => {
                tracing::error!(pattern, error = %e, "invalid category pattern");
                None
            }
        })
        .collect()
});

/// Category of a canonical ingredient name.
pub fn categorize(name: &str) -> Category {
    COMPILED_RULES
        .iter()
        .find(|(_, re)| re.is_match(name))
        .map_or(Category::Other, |(category, _)| *category)
}
