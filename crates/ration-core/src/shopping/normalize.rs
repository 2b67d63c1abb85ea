//! Ingredient line normalization.
//!
//! A line goes through three steps:
//!
//! 1. [`preprocess`]: whitespace, parentheticals and "to taste" phrases are
//!    removed and the unit word right after the quantity is rewritten to
//!    its canonical abbreviation.
//! 2. [`parse_quantity`]: the leading number and known unit are split off.
//! 3. [`normalize_name`]: the rest is lower-cased, cosmetic adjectives are
//!    dropped and the [`NAME_RULES`] table collapses variants.
//!
//! All regexes are compiled once. A pattern that fails to compile is
//! skipped, which only ever makes normalization less aggressive.

use std::sync::LazyLock;

use regex::Regex;

/// Canonical unit abbreviations.
pub const GRAM: &str = "г";
pub const KILOGRAM: &str = "кг";
pub const MILLILITRE: &str = "мл";
pub const LITRE: &str = "л";
pub const PIECE: &str = "шт";
pub const TABLESPOON: &str = "ст.л.";
pub const TEASPOON: &str = "ч.л.";
pub const CLOVE: &str = "зубч";

/// A preprocessed ingredient line.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessed {
    pub text: String,
    /// The line said "по вкусу" or "по желанию".
    pub to_taste: bool,
}

/// A parsed ingredient line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIngredient {
    pub amount: f64,
    /// Canonical unit, or empty.
    pub unit: String,
    /// Canonical name, possibly empty.
    pub name: String,
    pub to_taste: bool,
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "invalid ingredient pattern");
            None
        }
    }
}

fn compile_table(table: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    table
        .iter()
        .filter_map(|(pattern, replacement)| compile(pattern).map(|re| (re, *replacement)))
        .collect()
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"\s+"));

static TO_TASTE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)\(?\s*по\s+(?:вкусу|желанию)\s*\)?"));

static PARENTHETICAL: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"\s*\([^)]*\)?"));

/// Number at the start of a line: a range `a-b`, a fraction `a/b`, or an
/// integer or decimal with `.` or `,`. Ranges come first so their lower
/// bound is not taken alone.
const NUMBER: &str = r"\d+(?:[.,]\d+)?\s*[-–—]\s*\d+(?:[.,]\d+)?|\d+\s*/\s*\d+|\d+(?:[.,]\d+)?";

/// Spelling variants of each unit, matched right after the leading number.
const UNIT_VARIANTS: &[(&str, &str)] = &[
    (TABLESPOON, r"ст\.?\s*л\.?|столов\w*\s+ложк\w*|ст\.?\s*ложк\w*|ложк\w*|ложек"),
    (TEASPOON, r"ч\.?\s*л\.?|чайн\w*\s+ложк\w*|ч\.?\s*ложк\w*"),
    (CLOVE, r"зубч\w*|зуб\."),
    (KILOGRAM, r"кг\.?|килограмм\w*"),
    (GRAM, r"г\.?|гр\.?|грамм\w*"),
    (MILLILITRE, r"мл\.?|миллилитр\w*"),
    (LITRE, r"л\.?|литр\w*"),
    (PIECE, r"шт\.?|штук\w*|штуки"),
];

static UNIT_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    UNIT_VARIANTS
        .iter()
        .filter_map(|(canonical, variants)| {
            compile(&format!(
                r"(?i)^(?P<qty>{NUMBER})\s*(?:{variants})(?:\s+|$)(?P<rest>.*)$"
            ))
            .map(|re| (re, *canonical))
        })
        .collect()
});

fn collapse_whitespace(text: &str) -> String {
    match WHITESPACE.as_ref() {
        Some(re) => re.replace_all(text, " ").trim().to_owned(),
        None => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Clean a raw line and canonicalize the unit after the leading number.
pub fn preprocess(raw: &str) -> Preprocessed {
    let mut text = collapse_whitespace(raw);

    let mut to_taste = false;
    if let Some(re) = TO_TASTE.as_ref() {
        if re.is_match(&text) {
            to_taste = true;
            text = re.replace_all(&text, " ").into_owned();
        }
    }
    if let Some(re) = PARENTHETICAL.as_ref() {
        text = re.replace_all(&text, "").into_owned();
    }
    text = collapse_whitespace(&text);

    for (re, canonical) in UNIT_RULES.iter() {
        if let Some(caps) = re.captures(&text) {
            let qty: String = caps["qty"].chars().filter(|c| !c.is_whitespace()).collect();
            text = collapse_whitespace(&format!("{qty} {canonical} {}", &caps["rest"]));
            break;
        }
    }

    Preprocessed { text, to_taste }
}

// ---------------------------------------------------------------------------
// Quantity
// ---------------------------------------------------------------------------

static QUANTITY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(&format!(
        r"^(?P<qty>{NUMBER})\s*(?:(?P<unit>кг|г|мл|л|шт|ст\.л\.|ч\.л\.|зубч)(?:\s+|$))?(?P<name>.*)$"
    ))
});

fn parse_decimal(token: &str) -> f64 {
    token.replace(',', ".").parse().unwrap_or(0.0)
}

/// Value of a [`NUMBER`] token. A range resolves to its upper bound.
fn parse_number(token: &str) -> f64 {
    let token: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some((_, upper)) = token.split_once(['-', '–', '—']) {
        return parse_decimal(upper);
    }
    if let Some((num, den)) = token.split_once('/') {
        let num = parse_decimal(num);
        let den = parse_decimal(den);
        return if den == 0.0 { 0.0 } else { num / den };
    }
    parse_decimal(&token)
}

/// Split a preprocessed line into amount, canonical unit and raw name.
/// Lines without a leading number have amount 0 and no unit.
pub fn parse_quantity(text: &str) -> (f64, &str, &str) {
    let caps = QUANTITY.as_ref().and_then(|re| re.captures(text));
    match caps {
        Some(caps) => {
            let amount = caps.name("qty").map_or(0.0, |m| parse_number(m.as_str()));
            let unit = caps.name("unit").map_or("", |m| m.as_str());
            let name = caps.name("name").map_or("", |m| m.as_str());
            (amount, unit, name.trim())
        }
        None => (0.0, "", text.trim()),
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

static COSMETIC_WORDS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        r"\b(?:свеж|отварн|запеч[её]нн|консервированн|замороженн|мелко|крупно|нарезанн|рублен)\w*\b|\b(?:для подачи|для посыпки|для украшения|для жарки|для заправки)\b",
    )
});

static EDGE_PUNCTUATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"^[\s,.;:\-–]+|[\s,.;:\-–]+$"));

/// Ordered (pattern, canonical name) rules, applied one after another to
/// the lower-cased name. Each rule rewrites only the text it matches.
pub const NAME_RULES: &[(&str, &str)] = &[
    (r"\bкурин\w*\s+(?:филе|грудк\w*)|\bфиле\s+курин\w*|\bкуриц\w*\s+грудк\w*|\bгрудк\w*\s+куриц\w*", "куриная грудка"),
    (r"\b(?:филе\s+)?индейк\w*", "филе индейки"),
    (r"\b(?:филе\s+)?треск\w*", "филе трески"),
    (r"\b(?:филе\s+)?(?:лосос|сёмг|семг)\w*", "филе лосося"),
    (r"\bтун(?:ец|ца|цом)\b", "тунец"),
    (r"\b(?:филе\s+)?(?:бел\w*\s+)?рыб\w*", "рыба"),
    (r"\bговядин\w*", "говядина"),
    (r"\bовсян\w*\s+хлоп\w*|\bовсянк\w*|\bгеркулес\w*", "овсяные хлопья"),
    (r"\bкино[аa]\w*", "киноа"),
    (r"\bгреч\w*", "гречка"),
    (r"\bрис(?:а|ом|овой|овая)?\b", "рис"),
    (r"\bкартоф\w*|\bкартошк\w*", "картофель"),
    (r"\bпомидор\w*\s+черри|\bчерри\b", "помидоры черри"),
    (r"\bпомидор\w*", "помидоры"),
    (r"\bкрасн\w*\s+лук\w*|\bлук\w*\s+красн\w*", "лук красный"),
    (r"\bлукович\w*", "лук"),
    (r"\bлук(?:а|ом|у)?\b", "лук"),
    (r"\bогур\w*|\bогурц\w*", "огурец"),
    (r"\bчеснок\w*|\bчесноч\w*", "чеснок"),
    (r"\bморков\w*|\bморковк\w*", "морковь"),
    (r"\bшпинат\w*", "шпинат"),
    (r"\bброккол\w*", "брокколи"),
    (r"^овощ\w*.*$", "овощи смешанные"),
    (r"\bсол(?:и|ью)\b", "соль"),
    (r"\bсоль\b.*\bперец\w*.*|\bперец\b.*\bсоль\b.*", "соль и перец"),
    (r"\bперец\s+черн\w*(?:\s+молот\w*)?|\bчерн\w*\s+(?:молот\w*\s+)?перец\w*", "перец"),
    (r"\bлимонн\w*\s+сок\w*|\bсок\w*\s+(?:половин\w*\s+)?лимон\w*|\bлимон\w*", "лимон"),
    (r"\bягод\w*", "ягоды"),
    (r"\bяйц\w*|\bяиц\b|\bяйк\w*", "яйца"),
    (r"\bмолок\w*|\bмолочк\w*", "молоко"),
    (r"\bсыр(?:а|ом|у|ы|ов)?\b", "сыр"),
    (r"\bтворог\w*|\bтворож\w*", "творог"),
    (r"\b(?:греческ\w*\s+)?йогурт\w*", "йогурт"),
    (r"\bоливк\w*\s+масл\w*|\bоливков\w*\s+масл\w*|\bмасл\w*\s+оливков\w*", "оливковое масло"),
    (r"\bм[её]д(?:а|ом|у)?\b", "мед"),
    (r"\bкленов\w*\s+сироп\w*", "кленовый сироп"),
    (r"\bкориц\w*", "корица"),
    (r"\bминдал\w*", "миндаль"),
    (r"\bгрецк\w*\s+орех\w*", "грецкие орехи"),
    (r"\bорех\w*", "орехи"),
    (r"\bбанан\w*", "банан"),
];

static COMPILED_NAME_RULES: LazyLock<Vec<(Regex, &'static str)>> =
    LazyLock::new(|| compile_table(NAME_RULES));

/// Lower-case, strip cosmetic words and apply [`NAME_RULES`] in order.
pub fn normalize_name(raw: &str) -> String {
    let mut name = raw.to_lowercase();
    if let Some(re) = COSMETIC_WORDS.as_ref() {
        name = re.replace_all(&name, " ").into_owned();
    }
    name = collapse_whitespace(&name);

    for (re, canonical) in COMPILED_NAME_RULES.iter() {
        if re.is_match(&name) {
            name = re.replace_all(&name, *canonical).into_owned();
        }
    }

    let name = collapse_whitespace(&name);
    match EDGE_PUNCTUATION.as_ref() {
        Some(re) => re.replace_all(&name, "").into_owned(),
        None => name,
    }
}

/// Run the whole normalization for one raw line.
pub fn parse_ingredient(raw: &str) -> ParsedIngredient {
    let pre = preprocess(raw);
    let (amount, unit, name) = parse_quantity(&pre.text);
    ParsedIngredient {
        amount,
        unit: unit.to_owned(),
        name: normalize_name(name),
        to_taste: pre.to_taste,
    }
}
