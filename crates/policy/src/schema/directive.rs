//! Typed directive values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type tag of a directive value. Fixed by the first layer that defines a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Bool,
    Number,
    String,
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveKind::Bool => write!(f, "bool"),
            DirectiveKind::Number => write!(f, "number"),
            DirectiveKind::String => write!(f, "string"),
        }
    }
}

/// A policy-wide parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectiveValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl DirectiveValue {
    /// Type raw directive text.
    ///
    /// - `true` / `false` become bools
    /// - plain decimals (`95`, `0.25`, `-1.5`) become numbers
    /// - one pair of enclosing double quotes is stripped and the inner text
    ///   is kept as a string, so `"true"` stays a string
    /// - anything else is a string as written
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();

        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            return DirectiveValue::String(text[1..text.len() - 1].to_string());
        }

        match text {
            "true" => return DirectiveValue::Bool(true),
            "false" => return DirectiveValue::Bool(false),
            _ => {}
        }

        if is_decimal(text) {
            if let Ok(n) = text.parse::<f64>() {
                return DirectiveValue::Number(n);
            }
        }

        DirectiveValue::String(text.to_string())
    }

    pub fn kind(&self) -> DirectiveKind {
        match self {
            DirectiveValue::Bool(_) => DirectiveKind::Bool,
            DirectiveValue::Number(_) => DirectiveKind::Number,
            DirectiveValue::String(_) => DirectiveKind::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DirectiveValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DirectiveValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DirectiveValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DirectiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveValue::Bool(b) => write!(f, "{b}"),
            DirectiveValue::Number(n) => write!(f, "{n}"),
            DirectiveValue::String(s) => write!(f, "\"{s}\""),
        }
    }
}

/// `-?[0-9]+(\.[0-9]+)?` -- rejects exponents, `inf`, `NaN` and bare dots
/// that `f64::from_str` would otherwise accept.
fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.map_or(true, all_digits)
}
