//! Lightweight text heuristics shared by the resolver strategies.

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("Invalid Regex"));

static WHOLE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").expect("Invalid Regex"));

static LOCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)in ([A-Za-z ]+)").expect("Invalid Regex"));

/// Every signed decimal literal in `text`, left to right.
pub fn extract_numbers(text: &str) -> Vec<f64> {
    NUMBER_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// `text` parsed as a number if the whole (trimmed) string is one.
pub fn parse_whole_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if WHOLE_NUMBER_RE.is_match(trimmed) {
        trimmed.parse().ok()
    } else {
        None
    }
}

/// Everything after the first colon, or the whole query, trimmed.
pub fn colon_text(query: &str) -> String {
    match query.split_once(':') {
        Some((_, rest)) => rest.trim().to_string(),
        None => query.trim().to_string(),
    }
}

/// Words following "in ", e.g. "weather in New York" -> "New York".
pub fn extract_location(query: &str) -> Option<String> {
    LOCATION_RE
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_numbers() {
        assert_eq!(extract_numbers("add 3 and -4.5"), vec![3.0, -4.5]);
        assert_eq!(extract_numbers("what is 3 + 4"), vec![3.0, 4.0]);
        assert_eq!(extract_numbers("no digits here"), Vec::<f64>::new());
        assert_eq!(extract_numbers("10-2"), vec![10.0, -2.0]);
    }

    #[test]
    fn test_parse_whole_number() {
        assert_eq!(parse_whole_number(" 42 "), Some(42.0));
        assert_eq!(parse_whole_number("-1.5"), Some(-1.5));
        assert_eq!(parse_whole_number("1e5"), None);
        assert_eq!(parse_whole_number("3 apples"), None);
        assert_eq!(parse_whole_number(""), None);
    }

    #[test]
    fn test_colon_text() {
        assert_eq!(colon_text("shout: hello world"), "hello world");
        assert_eq!(colon_text("  reverse this  "), "reverse this");
        assert_eq!(colon_text("a: b: c"), "b: c");
    }

    #[test]
    fn test_extract_location() {
        assert_eq!(extract_location("what's the weather in Paris").as_deref(), Some("Paris"));
        assert_eq!(extract_location("Weather IN New York").as_deref(), Some("New York"));
        assert_eq!(extract_location("forecast for Tokyo"), None);
    }
}
