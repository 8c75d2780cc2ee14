//! Row line tokenizer
//!
//! A row line is a bracketed, comma-separated list written on one line:
//!
//! ```text
//!       [         "MotorSpeed"   , 1    , "say \"hi\", bye" ],
//! ```
//!
//! Splitting happens only on top-level commas. A comma inside a quoted
//! string is content, and a backslash makes the next character literal so an
//! escaped quote never toggles the quote state.

/// One row line split into raw element tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLine {
    /// Leading whitespace of the line, kept apart from content
    pub indent: String,
    /// Trimmed element tokens, still in literal form
    pub tokens: Vec<String>,
    /// Whether the line ended with `],`
    pub trailing_comma: bool,
}

/// Tokenize a row line; `None` when the line is not a bracketed array
pub fn tokenize_row(line: &str) -> Option<RowLine> {
    let content = line.trim_end_matches(['\r', '\n']);
    let body = content.trim_start();
    let indent = content[..content.len() - body.len()].to_string();

    let mut body = body.trim_end();
    let trailing_comma = body.ends_with(',');
    if trailing_comma {
        body = body[..body.len() - 1].trim_end();
    }

    if body.len() < 2 || !body.starts_with('[') || !body.ends_with(']') {
        return None;
    }

    Some(RowLine {
        indent,
        tokens: split_top_level(&body[1..body.len() - 1]),
        trailing_comma,
    })
}

/// Split the inside of a bracketed row on top-level commas
pub fn split_top_level(inner: &str) -> Vec<String> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Vec::new();
    }

    let mut elements = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape_next = false;

    for c in inner.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }
        match c {
            '\\' => {
                current.push(c);
                escape_next = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                elements.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    elements.push(current.trim().to_string());

    elements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_row() {
        let row = tokenize_row(r#"      [  "a"  , 1 , null ],"#).unwrap();
        assert_eq!(row.indent, "      ");
        assert_eq!(row.tokens, vec![r#""a""#, "1", "null"]);
        assert!(row.trailing_comma);
    }

    #[test]
    fn test_comma_inside_quotes_is_content() {
        let row = tokenize_row(r#"[ "x, y", 2 ]"#).unwrap();
        assert_eq!(row.tokens, vec![r#""x, y""#, "2"]);
        assert!(!row.trailing_comma);
    }

    #[test]
    fn test_escaped_quote_does_not_toggle() {
        let row = tokenize_row(r#"[ "say \"a, b\"", 3 ]"#).unwrap();
        assert_eq!(row.tokens, vec![r#""say \"a, b\"""#, "3"]);
    }

    #[test]
    fn test_empty_array() {
        let row = tokenize_row("    [ ]").unwrap();
        assert!(row.tokens.is_empty());
    }

    #[test]
    fn test_not_a_row() {
        assert_eq!(tokenize_row(r#"    "rows": ["#), None);
        assert_eq!(tokenize_row("    ]"), None);
        assert_eq!(tokenize_row(""), None);
    }
}
