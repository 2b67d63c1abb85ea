//! Tolerant extraction of JSON documents from model output.
//!
//! Model replies are meant to be bare JSON but routinely arrive wrapped in
//! code fences, surrounded by prose, with trailing commas or with
//! typographic quotes. [`parse_json`] runs an ordered list of repair stages
//! and, for every candidate text a stage produces, tries a strict decoder
//! followed by a lenient one. The first success wins.
//!
//! Everything here is a pure function of its input.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// The model output could not be turned into JSON by any repair stage.
#[derive(Debug, Error)]
#[error("unparseable model output after {attempts} decode attempts: {last_error}")]
pub struct ParseError {
    /// Number of (candidate, decoder) pairs tried.
    pub attempts: usize,
    /// Syntax error reported by the final attempt.
    pub last_error: String,
}

/// Produces the candidate text for one repair stage, or `None` if the stage
/// does not apply to this input.
type Stage = fn(&str) -> Option<String>;

/// Turns a candidate text into a JSON value.
type Decoder = fn(&str) -> Result<Value, serde_json::Error>;

/// Repair stages in the order they are tried. Later stages work on the
/// output of [`strip_code_fences`], not on each other's output.
const STAGES: &[(&str, Stage)] = &[
    ("fences", strip_code_fences),
    ("braces", extract_braced_object),
    ("typography", normalize_typography),
];

const DECODERS: &[(&str, Decoder)] = &[("strict", decode_strict), ("lenient", decode_lenient)];

/// Parse model output into a JSON value, repairing it if needed.
pub fn parse_json(raw: &str) -> Result<Value, ParseError> {
    let mut attempts = 0usize;
    let mut last_error = String::from("empty response");

    for (stage_name, stage) in STAGES {
        let Some(candidate) = stage(raw) else {
            continue;
        };
        if candidate.is_empty() {
            continue;
        }
        for (decoder_name, decode) in DECODERS {
            attempts += 1;
            match decode(&candidate) {
                Ok(value) => {
                    if attempts > 1 {
                        tracing::debug!(
                            stage = stage_name,
                            decoder = decoder_name,
                            attempts,
                            "repaired model output"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => last_error = e.to_string(),
            }
        }
    }

    Err(ParseError {
        attempts,
        last_error,
    })
}

/// [`parse_json`] followed by deserialization into `T`.
pub fn parse_into<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let value = parse_json(raw)?;
    serde_json::from_value(value).map_err(|e| ParseError {
        attempts: 1,
        last_error: format!("shape mismatch: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Remove a leading ```` ``` ```` / ```` ```json ```` line and a trailing
/// ```` ``` ````. Text without a leading fence is returned trimmed.
fn strip_code_fences(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return Some(trimmed.to_owned());
    };

    let body = match after_open.split_once('\n') {
        Some((tag, rest)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => after_open,
    };
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    Some(body.trim().to_owned())
}

/// The substring from the first `{` to the last `}`.
fn extract_braced_object(raw: &str) -> Option<String> {
    let text = strip_code_fences(raw)?;
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].to_owned())
}

static TRAILING_COMMA: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").ok());

/// Straighten typographic quotes and drop trailing commas. Works on the
/// braced object when there is one.
fn normalize_typography(raw: &str) -> Option<String> {
    let base = extract_braced_object(raw).or_else(|| strip_code_fences(raw))?;
    let straightened: String = base
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            other => other,
        })
        .collect();
    let cleaned = match TRAILING_COMMA.as_ref() {
        Some(re) => re.replace_all(&straightened, "$1").into_owned(),
        None => straightened,
    };
    Some(cleaned)
}

// ---------------------------------------------------------------------------
// Decoders
// ---------------------------------------------------------------------------

fn decode_strict(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}

fn decode_lenient(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&relax(text))
}

/// Rewrite relaxed JSON into strict JSON: drops `//` and `/* */` comments
/// and commas that directly precede `}` or `]`. String literals are copied
/// verbatim.
fn relax(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            ',' if closes_after(&chars, i + 1) => {
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Whether the next significant character from `from` closes a container.
fn closes_after(chars: &[char], from: usize) -> bool {
    chars[from.min(chars.len())..]
        .iter()
        .find(|c| !c.is_whitespace())
        .is_some_and(|c| *c == '}' || *c == ']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "dayNumber": 3,
            "meals": [
                {"mealTime": "breakfast", "name": "Овсянка с ягодами", "calories": 450.5},
                {"mealTime": "lunch", "name": "Суп \"домашний\"", "tags": []}
            ],
            "note": null
        })
    }

    #[test]
    fn plain_json_parses_strictly() {
        let text = serde_json::to_string(&sample()).unwrap();
        assert_eq!(parse_json(&text).unwrap(), sample());
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let text = format!("```json\n{}\n```", serde_json::to_string_pretty(&sample()).unwrap());
        assert_eq!(parse_json(&text).unwrap(), sample());

        let bare_fence = format!("```\n{}\n```", serde_json::to_string(&sample()).unwrap());
        assert_eq!(parse_json(&bare_fence).unwrap(), sample());
    }

    #[test]
    fn trailing_commas_are_tolerated() {
        let text = r#"{"a": [1, 2, 3,], "b": {"c": "x",},}"#;
        assert_eq!(parse_json(text).unwrap(), json!({"a": [1, 2, 3], "b": {"c": "x"}}));
    }

    #[test]
    fn comments_are_tolerated() {
        let text = "{\n  // day one\n  \"day\": 1, /* inline */ \"ok\": true\n}";
        assert_eq!(parse_json(text).unwrap(), json!({"day": 1, "ok": true}));
    }

    #[test]
    fn commas_inside_strings_survive_relaxing() {
        let text = r#"{"steps": ["Нарезать, затем ]обжарить", "Подать",],}"#;
        assert_eq!(
            parse_json(text).unwrap(),
            json!({"steps": ["Нарезать, затем ]обжарить", "Подать"]})
        );
    }

    #[test]
    fn prose_around_object_is_dropped() {
        let text = "Конечно! Вот меню:\n{\"dayNumber\": 1, \"meals\": []}\nПриятного аппетита.";
        assert_eq!(parse_json(text).unwrap(), json!({"dayNumber": 1, "meals": []}));
    }

    #[test]
    fn typographic_quotes_are_straightened() {
        let text = "Ответ: {\u{201C}name\u{201D}: \u{201C}Омлет\u{201D}, \u{201C}calories\u{201D}: 300,}";
        assert_eq!(parse_json(text).unwrap(), json!({"name": "Омлет", "calories": 300}));
    }

    #[test]
    fn non_object_values_round_trip() {
        for value in [json!([1, 2, 3]), json!("text"), json!(42), json!(true), json!(null)] {
            let text = serde_json::to_string(&value).unwrap();
            assert_eq!(parse_json(&text).unwrap(), value);
            let fenced = format!("```json\n{text}\n```");
            assert_eq!(parse_json(&fenced).unwrap(), value);
        }
    }

    #[test]
    fn garbage_reports_last_syntax_error() {
        let err = parse_json("definitely not json").unwrap_err();
        assert!(err.attempts >= 2);
        assert!(err.to_string().contains("expected"), "unexpected error: {err}");
    }

    #[test]
    fn empty_input_fails() {
        let err = parse_json("   ").unwrap_err();
        assert_eq!(err.attempts, 0);
        assert!(err.last_error.contains("empty"));
    }

    #[test]
    fn typed_helper_deserializes_repaired_value() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct Doc {
            steps: Vec<String>,
        }
        let doc: Doc = parse_into("```json\n{\"steps\": [\"a\", \"b\",]}\n```").unwrap();
        assert_eq!(doc.steps, vec!["a", "b"]);

        let err = parse_into::<Doc>("{\"steps\": 5}").unwrap_err();
        assert!(err.last_error.contains("shape mismatch"));
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "```json\n{\"a\": 1,}\n```";
        assert_eq!(parse_json(text).unwrap(), parse_json(text).unwrap());
    }
}
