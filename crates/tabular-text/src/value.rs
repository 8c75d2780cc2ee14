//! Cell values
//!
//! Every cell of a table is one of five kinds. Each kind has exactly one
//! printed form, so writing a value and reading it back is stable:
//!
//! | Variant  | Printed form                                          |
//! |----------|-------------------------------------------------------|
//! | `Null`   | `null`                                                |
//! | `Bool`   | `true` / `false`                                      |
//! | `Int`    | decimal digits                                        |
//! | `Float`  | 6 decimal places, trailing zeros and dot removed      |
//! | `String` | JSON string literal (quotes and backslashes escaped)  |

use std::fmt;

use crate::error::LiteralError;

/// A single table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Side on which alignment padding goes for a data cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadSide {
    /// Spaces before the closing quote
    InsideQuotes,
    /// Spaces before the literal
    Before,
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Render the printed form used in the dump
    pub fn literal(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => quote(s),
        }
    }

    /// Read a literal token as it appears in a row line.
    ///
    /// Spaces right before the closing quote of a string are alignment
    /// padding and are dropped.
    pub fn parse_literal(token: &str) -> Result<Value, LiteralError> {
        let token = token.trim();
        match token {
            "" => Err(LiteralError::Empty),
            "null" => Ok(Value::Null),
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            _ if token.starts_with('"') => parse_string_literal(token),
            _ => parse_number(token),
        }
    }

    pub fn pad_side(&self) -> PadSide {
        match self {
            Value::String(_) => PadSide::InsideQuotes,
            _ => PadSide::Before,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; integral floats and numeric strings are accepted
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Null => None,
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthiness as used by flag columns (`Visible`)
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            _ => None,
        }
    }

    /// Text used for display and as a lookup key: strings unquoted,
    /// everything else in printed form
    pub fn display_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.literal(),
        }
    }

    /// Convert a scalar JSON value; arrays and objects are rejected
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float)),
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

// ============================================================================
// Printed forms
// ============================================================================

/// JSON-style quoting of a string value
pub fn quote(s: &str) -> String {
    // Serializing a str into JSON cannot fail
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

fn format_float(f: f64) -> String {
    let mut s = format!("{:.6}", f);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

fn parse_string_literal(token: &str) -> Result<Value, LiteralError> {
    if token.len() < 2 || !token.ends_with('"') {
        return Err(LiteralError::InvalidString(token.to_string()));
    }
    let body = token[1..token.len() - 1].trim_end_matches(' ');
    serde_json::from_str::<String>(&format!("\"{}\"", body))
        .map(Value::String)
        .map_err(|_| LiteralError::InvalidString(token.to_string()))
}

fn parse_number(token: &str) -> Result<Value, LiteralError> {
    let digits = token.strip_prefix('-').unwrap_or(token);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = token.parse::<i64>() {
            return Ok(Value::Int(i));
        }
    }

    let numeric_chars = token
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if numeric_chars && token.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = token.parse::<f64>() {
            if f.is_finite() {
                return Ok(Value::Float(f));
            }
        }
    }

    Err(LiteralError::Unrecognized(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_printed_form() {
        assert_eq!(Value::Float(0.1).literal(), "0.1");
        assert_eq!(Value::Float(2.0).literal(), "2");
        assert_eq!(Value::Float(1.23456789).literal(), "1.234568");
        assert_eq!(Value::Float(-0.0000001).literal(), "0");
        assert_eq!(Value::Float(-12.5).literal(), "-12.5");
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(Value::parse_literal("null").unwrap(), Value::Null);
        assert_eq!(Value::parse_literal(" true ").unwrap(), Value::Bool(true));
        assert_eq!(Value::parse_literal("False").unwrap(), Value::Bool(false));
        assert_eq!(Value::parse_literal("-42").unwrap(), Value::Int(-42));
        assert_eq!(Value::parse_literal("0.5").unwrap(), Value::Float(0.5));
        assert_eq!(Value::parse_literal("1e3").unwrap(), Value::Float(1000.0));
    }

    #[test]
    fn test_parse_padded_string() {
        assert_eq!(
            Value::parse_literal(r#""Motor speed    ""#).unwrap(),
            Value::string("Motor speed")
        );
    }

    #[test]
    fn test_escaped_quotes_are_symmetric() {
        let v = Value::string(r#"say "hi" \ bye"#);
        let printed = v.literal();
        assert_eq!(printed, r#""say \"hi\" \\ bye""#);
        assert_eq!(Value::parse_literal(&printed).unwrap(), v);
    }

    #[test]
    fn test_padding_after_trailing_backslash() {
        assert_eq!(
            Value::parse_literal(r#""C:\\   ""#).unwrap(),
            Value::string("C:\\")
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(
            Value::parse_literal("abc"),
            Err(LiteralError::Unrecognized("abc".into()))
        );
        assert!(Value::parse_literal("\"open").is_err());
        assert!(Value::parse_literal("inf").is_err());
        assert_eq!(Value::parse_literal("  "), Err(LiteralError::Empty));
    }

    #[test]
    fn test_integer_views() {
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float(3.5).as_i64(), None);
        assert_eq!(Value::string(" 7 ").as_i64(), Some(7));
        assert_eq!(Value::Null.as_i64(), None);
    }
}
