//! Field normalizers.
//!
//! Every function here is total: odd input yields a best-effort value,
//! never an error. Language, source, geo and list cleaning are idempotent.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

pub const NATIVE: &str = "Native";
pub const ENGLISH: &str = "English";

lazy_static! {
    static ref FIRST_NUMBER: Regex = Regex::new(r"\d+(?:\.\d+)?").unwrap();
    static ref TWO_LETTERS: Regex = Regex::new(r"[A-Za-z]{2}").unwrap();
}

const ENGLISH_GEOS: [&str; 5] = ["uk", "us", "gb", "au", "ca"];

/// Canonical comma-joined language list. Absent or blank input is `Native`.
pub fn clean_language(raw: Option<&str>) -> String {
    let languages: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(canonical_language)
        .collect();

    if languages.is_empty() {
        NATIVE.to_string()
    } else {
        languages.join(",")
    }
}

fn canonical_language(token: &str) -> String {
    let lower = token.to_lowercase();
    let known = match lower.as_str() {
        "en" | "eng" | "english" => "English",
        "fr" | "fre" | "french" => "French",
        "it" | "ita" | "italian" => "Italian",
        "es" | "esp" | "spanish" => "Spanish",
        "de" | "ger" | "german" => "German",
        "nl" | "dut" | "dutch" => "Dutch",
        "pt" | "por" | "portuguese" => "Portuguese",
        "ru" | "rus" | "russian" => "Russian",
        "se" | "swe" | "swedish" => "Swedish",
        "dk" | "dan" | "danish" => "Danish",
        "no" | "nor" | "norwegian" => "Norwegian",
        "fi" | "fin" | "finnish" => "Finnish",
        "nat" | "native" | "local" => NATIVE,
        _ => return capitalize(&lower),
    };
    known.to_string()
}

/// Upper-cases the first letter unless that would expand it (`ß` stays `ß`).
fn capitalize(lower: &str) -> String {
    let mut chars = lower.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut upper = first.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => std::iter::once(single).chain(chars).collect(),
        _ => lower.to_string(),
    }
}

/// Canonical `|`-joined traffic sources. Accepts `|` or `+` as separators.
pub fn clean_source(raw: &str) -> String {
    raw.split(|c: char| c == '|' || c == '+')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(canonical_source)
        .collect::<Vec<_>>()
        .join("|")
}

// Case-sensitive on purpose: "Display" and "display" are both valid but
// only the lower-case spelling is an alias.
fn canonical_source(token: &str) -> &str {
    match token {
        "fb" | "FB" | "facebook" => "Facebook",
        "gg" | "GG" | "google" => "Google",
        "google display" => "Google Display",
        "google seo" => "Google SEO",
        "dv360" | "dv" | "google dv360" | "google dv 360" | "dv 360" => "Google DV360",
        "display" => "Display",
        "seo" | "SEO" => "SEO",
        "taboola" | "TABOOLA" => "Taboola",
        "bing" | "BING" => "Bing",
        "native" => "Native",
        "tiktok" => "TikTok",
        "push" => "Push",
        "email" => "Email",
        other => other,
    }
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

/// Country token: flags stripped, first two-letter run upper-cased.
pub fn clean_geo(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !is_regional_indicator(*c)).collect();

    if let Some(code) = TWO_LETTERS.find(&stripped) {
        return code.as_str().to_ascii_uppercase();
    }

    stripped
        .split_whitespace()
        .next()
        .map(str::to_ascii_uppercase)
        .unwrap_or_default()
}

/// Percentage-like value as a fraction rounded to four places.
///
/// Accepts `10`, `10%`, `0.1`, a `10-12` range (its mean) or any text with a
/// number in it. `None` when there is nothing numeric.
pub fn clean_fraction(raw: &str) -> Option<f64> {
    let cleaned = raw.replace('%', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    let value = if cleaned.contains('-') {
        parse_range(cleaned).or_else(|| first_number(cleaned))
    } else {
        parse_finite(cleaned).or_else(|| first_number(cleaned))
    }?;

    Some(to_fraction(value))
}

/// Values above 1 are percentages.
pub fn to_fraction(value: f64) -> f64 {
    let fraction = if value > 1.0 { value / 100.0 } else { value };
    round4(fraction)
}

/// Fraction from a JSON number or a numeric string.
pub fn fraction_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).map(to_fraction),
        Value::String(s) => clean_fraction(s),
        _ => None,
    }
}

/// Plain number from a JSON number or a string such as `"1200"` or `"$1,200"`.
pub fn number_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let compact: String = s.chars().filter(|c| !matches!(c, ',' | '$' | '€')).collect();
            let compact = compact.trim();
            if compact.is_empty() || compact == "&" {
                return None;
            }
            parse_finite(compact).or_else(|| first_number(compact))
        }
        _ => None,
    }
}

/// Comma-joined list with brackets and quotes removed.
pub fn clean_list(raw: &str) -> String {
    split_list(raw).join(",")
}

/// The items of a loosely formatted list such as `['a', "b", c]`.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.chars()
        .filter(|c| !matches!(c, '[' | ']' | '\'' | '"'))
        .collect::<String>()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// `English` for English-speaking geos, `Native` otherwise.
pub fn default_language(geo: &str) -> String {
    let english = geo
        .split(|c: char| !c.is_ascii_alphabetic())
        .any(|token| ENGLISH_GEOS.contains(&token.to_lowercase().as_str()));

    let language = if english { ENGLISH } else { NATIVE };
    language.to_string()
}

pub(crate) fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_range(raw: &str) -> Option<f64> {
    let (low, high) = raw.split_once('-')?;
    let low = parse_finite(low.trim())?;
    let high = parse_finite(high.trim())?;
    Some((low + high) / 2.0)
}

fn first_number(raw: &str) -> Option<f64> {
    FIRST_NUMBER
        .find(raw)
        .and_then(|m| parse_finite(m.as_str()))
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_clean_language_aliases() {
        assert_eq!(clean_language(Some("EN,fr")), "English,French");
        assert_eq!(clean_language(Some(" ger , nat ")), "German,Native");
        assert_eq!(clean_language(Some("polish")), "Polish");
        assert_eq!(clean_language(Some("éWE")), "Éwe");
        assert_eq!(clean_language(Some("ßx")), "ßx");
        assert_eq!(clean_language(Some(" , ")), "Native");
        assert_eq!(clean_language(None), "Native");
    }

    #[test]
    fn test_clean_source_aliases() {
        assert_eq!(clean_source("fb+google"), "Facebook|Google");
        assert_eq!(clean_source("dv 360 | taboola"), "Google DV360|Taboola");
        assert_eq!(clean_source("Display"), "Display");
        assert_eq!(clean_source("Snapchat"), "Snapchat");
        assert_eq!(clean_source(""), "");
    }

    #[test]
    fn test_clean_geo_strips_flags() {
        assert_eq!(clean_geo("🇬🇧 UK Native"), "UK");
        assert_eq!(clean_geo("de"), "DE");
        assert_eq!(clean_geo("🇩🇪"), "");
        assert_eq!(clean_geo("1 2"), "1");
        assert_eq!(clean_geo(""), "");
    }

    #[test]
    fn test_clean_geo_keeps_non_ascii_letters() {
        assert_eq!(clean_geo("ßx"), "ßX");
        assert_eq!(clean_geo("ßX"), "ßX");
        assert_eq!(clean_geo("ﬀ 1"), "ﬀ");
    }

    #[test]
    fn test_clean_fraction_forms() {
        assert_eq!(clean_fraction("10"), Some(0.1));
        assert_eq!(clean_fraction("0.1"), Some(0.1));
        assert_eq!(clean_fraction("10-12"), Some(0.11));
        assert_eq!(clean_fraction("12%"), Some(0.12));
        assert_eq!(clean_fraction("around 8 percent"), Some(0.08));
        assert_eq!(clean_fraction(""), None);
        assert_eq!(clean_fraction("n/a"), None);
    }

    #[test]
    fn test_fraction_from_json_accepts_numbers_and_strings() {
        assert_eq!(fraction_from_json(&json!(10)), Some(0.1));
        assert_eq!(fraction_from_json(&json!(0.05)), Some(0.05));
        assert_eq!(fraction_from_json(&json!("15%")), Some(0.15));
        assert_eq!(fraction_from_json(&json!(null)), None);
        assert_eq!(fraction_from_json(&json!([10])), None);
    }

    #[test]
    fn test_number_from_json() {
        assert_eq!(number_from_json(&json!(1200)), Some(1200.0));
        assert_eq!(number_from_json(&json!("$1,200")), Some(1200.0));
        assert_eq!(number_from_json(&json!("1100 usd")), Some(1100.0));
        assert_eq!(number_from_json(&json!("&")), None);
        assert_eq!(number_from_json(&json!(true)), None);
    }

    #[test]
    fn test_clean_list() {
        assert_eq!(clean_list("['Quantum', \"Bitcoin\" ,, Era]"), "Quantum,Bitcoin,Era");
        assert_eq!(split_list("a, b"), vec!["a", "b"]);
        assert!(split_list("[]").is_empty());
    }

    #[test]
    fn test_default_language() {
        assert_eq!(default_language("UK"), "English");
        assert_eq!(default_language("ca-fr"), "English");
        assert_eq!(default_language("DE"), "Native");
        assert_eq!(default_language("UKR"), "Native");
    }

    proptest! {
        #[test]
        fn language_is_idempotent(raw in "[A-Za-zßéø ,]{0,24}") {
            let once = clean_language(Some(&raw));
            prop_assert_eq!(clean_language(Some(&once)), once);
        }

        #[test]
        fn source_is_idempotent(raw in "[A-Za-z0-9 |+]{0,24}") {
            let once = clean_source(&raw);
            prop_assert_eq!(clean_source(&once), once);
        }

        #[test]
        fn geo_is_idempotent(raw in "[A-Za-z0-9 ßéøﬀ\u{1F1E6}-\u{1F1FF}]{0,12}") {
            let once = clean_geo(&raw);
            prop_assert_eq!(clean_geo(&once), once);
        }

        #[test]
        fn list_is_idempotent(raw in "[A-Za-z0-9 ,'\\[\\]\"]{0,24}") {
            let once = clean_list(&raw);
            prop_assert_eq!(clean_list(&once), once);
        }

        #[test]
        fn fraction_is_idempotent_on_percent_range(value in 0.0f64..=100.0) {
            let once = clean_fraction(&value.to_string());
            prop_assert!(once.is_some());
            let again = once.and_then(|v| clean_fraction(&v.to_string()));
            prop_assert_eq!(again, once);
        }
    }
}
