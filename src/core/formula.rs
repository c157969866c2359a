//! String literals inside formula expressions
//!
//! A literal is `"..."` with `""` standing for one embedded quote. Quoted
//! sheet names (`'My Sheet'!A1`) are skipped so their contents are never
//! mistaken for literals.

use crate::error::{GlossaError, GlossaResult};

/// Longest string literal Excel accepts in a formula
pub const MAX_LITERAL_CHARS: usize = 255;

/// One literal: byte span of the quoted form plus its decoded text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaLiteral {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// All complete string literals in `expression`, left to right
pub fn string_literals(expression: &str) -> Vec<FormulaLiteral> {
    let bytes = expression.as_bytes();
    let mut literals = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let start = i;
                let mut text = String::new();
                let mut segment_start = i + 1;
                let mut j = i + 1;
                let mut closed = false;
                while j < bytes.len() {
                    if bytes[j] == b'"' {
                        text.push_str(&expression[segment_start..j]);
                        if bytes.get(j + 1) == Some(&b'"') {
                            text.push('"');
                            j += 2;
                            segment_start = j;
                            continue;
                        }
                        closed = true;
                        break;
                    }
                    j += 1;
                }
                if !closed {
                    break;
                }
                literals.push(FormulaLiteral {
                    start,
                    end: j + 1,
                    text,
                });
                i = j + 1;
            }
            b'\'' => {
                let mut j = i + 1;
                while j < bytes.len() {
                    if bytes[j] == b'\'' {
                        if bytes.get(j + 1) == Some(&b'\'') {
                            j += 2;
                            continue;
                        }
                        break;
                    }
                    j += 1;
                }
                i = j + 1;
            }
            _ => i += 1,
        }
    }

    literals
}

/// Quote text as a formula literal, doubling embedded quotes
pub fn quote_literal(text: &str) -> GlossaResult<String> {
    let length = text.chars().count();
    if length > MAX_LITERAL_CHARS {
        return Err(GlossaError::Format(format!(
            "formula string literal of {} characters exceeds the {}-character limit",
            length, MAX_LITERAL_CHARS
        )));
    }
    Ok(format!("\"{}\"", text.replace('"', "\"\"")))
}

/// Rewrite each literal through `replace`. Returns `None` when no literal changed.
pub fn replace_literals<F>(expression: &str, mut replace: F) -> GlossaResult<Option<String>>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut result = String::with_capacity(expression.len());
    let mut last = 0;
    let mut changed = false;

    for literal in string_literals(expression) {
        let Some(new_text) = replace(&literal.text) else {
            continue;
        };
        if new_text == literal.text {
            continue;
        }
        result.push_str(&expression[last..literal.start]);
        result.push_str(&quote_literal(&new_text)?);
        last = literal.end;
        changed = true;
    }

    if !changed {
        return Ok(None);
    }
    result.push_str(&expression[last..]);
    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(expression: &str) -> Vec<String> {
        string_literals(expression)
            .into_iter()
            .map(|literal| literal.text)
            .collect()
    }

    #[test]
    fn test_literals_in_order() {
        assert_eq!(
            texts(r#"CONCATENATE("Hello", " ", "World")"#),
            vec!["Hello", " ", "World"]
        );
        assert_eq!(texts(r#"IF(A1>0,"Yes","")"#), vec!["Yes", ""]);
        assert!(texts("SUM(A1:A10)").is_empty());
    }

    #[test]
    fn test_doubled_quotes_decode() {
        assert_eq!(texts(r#""Say ""hi""" & A1"#), vec![r#"Say "hi""#]);
    }

    #[test]
    fn test_quoted_sheet_names_skipped() {
        assert_eq!(
            texts(r#"'Bob''s "Data"'!A1 & "units""#),
            vec!["units"]
        );
    }

    #[test]
    fn test_unterminated_literal_ignored() {
        assert_eq!(texts(r#""ok" & "broken"#), vec!["ok"]);
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("Monde").unwrap(), "\"Monde\"");
        assert_eq!(quote_literal("a\"b").unwrap(), "\"a\"\"b\"");
        assert!(quote_literal(&"x".repeat(255)).is_ok());
        let err = quote_literal(&"x".repeat(256)).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_replace_literals_only_changed() {
        let out = replace_literals(r#"CONCATENATE("Hello", " ", "World")"#, |text| match text {
            "Hello" => Some("Bonjour".into()),
            "World" => Some("Monde".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(out.unwrap(), r#"CONCATENATE("Bonjour", " ", "Monde")"#);

        let unchanged = replace_literals(r#"IF(A1,"Yes","No")"#, |text| Some(text.to_string())).unwrap();
        assert!(unchanged.is_none());
    }

    #[test]
    fn test_replacement_with_quote_is_requoted() {
        let out = replace_literals(r#"="x""#, |_| Some("a\"b".into())).unwrap();
        assert_eq!(out.unwrap(), r#"="a""b""#);
    }
}
