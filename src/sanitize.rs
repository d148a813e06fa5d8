//! Permissive input coercion and markup stripping for client-supplied fields.
//!
//! Malformed or missing values coerce to zero or empty rather than failing
//! the request; callers decide afterwards which coerced values are
//! acceptable. Stripping markup is a second line of defense only: every
//! query still binds its parameters.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>?").expect("static pattern compiles"));

static PHP_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\?php.*?\?>").expect("static pattern compiles"));

static LEADING_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("static pattern compiles"));

static LEADING_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+))").expect("static pattern compiles"));

/// Removes markup-like substrings: anything from `<` up to the next `>`
/// (or the end of input), then any `<?php ... ?>` block.
pub fn sanitize(input: &str) -> String {
    let without_tags = MARKUP_TAG.replace_all(input, "");
    PHP_BLOCK.replace_all(&without_tags, "").into_owned()
}

/// Renders a JSON scalar the way a form field would arrive.
fn raw_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Sanitized text; missing or non-scalar values become the empty string.
pub fn coerce_text(value: Option<&Value>) -> String {
    raw_text(value).map(|text| sanitize(&text)).unwrap_or_default()
}

/// Sanitized, trimmed text, `None` when nothing is left.
pub fn coerce_optional_text(value: Option<&Value>) -> Option<String> {
    let text = coerce_text(value);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parses the leading integer of the sanitized value; `2.9` is `2`,
/// `"7 loaves"` is `7`, anything unparseable is `0`.
pub fn coerce_int(value: Option<&Value>) -> i64 {
    let text = sanitize(&raw_text(value).unwrap_or_default());
    LEADING_INTEGER
        .captures(&text)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
        .unwrap_or(0)
}

/// [`coerce_int`] narrowed to `i32`; out-of-range values become `0`.
pub fn coerce_i32(value: Option<&Value>) -> i32 {
    i32::try_from(coerce_int(value)).unwrap_or(0)
}

/// Parses the leading decimal of the sanitized value, accepting a comma as
/// the decimal separator (`"2,50"` is `2.50`). Unparseable values are `0`.
pub fn coerce_decimal(value: Option<&Value>) -> Decimal {
    let text = sanitize(&raw_text(value).unwrap_or_default()).replacen(',', ".", 1);
    LEADING_DECIMAL
        .captures(&text)
        .and_then(|captures| captures.get(1))
        .and_then(|number| Decimal::from_str(number.as_str().trim_end_matches('.')).ok())
        .unwrap_or(Decimal::ZERO)
}

/// Exclusive upper bound of a stored price: `NUMERIC(10,2)` holds at most
/// eight integer digits.
pub fn price_limit() -> Decimal {
    Decimal::new(100_000_000, 0)
}

/// Coerces a client-supplied price to cents. Negative or unstorable
/// amounts become zero like any other malformed value.
pub fn coerce_price(value: Option<&Value>) -> Decimal {
    let price = coerce_decimal(value).round_dp(2);
    if price < Decimal::ZERO || price >= price_limit() {
        Decimal::ZERO
    } else {
        price
    }
}
