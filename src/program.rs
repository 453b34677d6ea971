use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid integer '{text}' at position {index}")]
    InvalidInteger { index: usize, text: String },
}

/// Parse a comma-separated Intcode literal such as `"1,9,10,3,2,3,11,0,99"`.
///
/// Whitespace around values (including a trailing newline) is ignored, as
/// is a single trailing comma. An empty literal parses to an empty program.
pub fn parse(text: &str) -> Result<Vec<i64>, ParseError> {
    let text = text.trim();
    let text = text.strip_suffix(',').unwrap_or(text);
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .enumerate()
        .map(|(index, field)| {
            let field = field.trim();
            field.parse::<i64>().map_err(|_| ParseError::InvalidInteger {
                index,
                text: field.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(parse("1,9,10,3,2,3,11,0,99"), Ok(vec![1, 9, 10, 3, 2, 3, 11, 0, 99]));
    }

    #[test]
    fn test_parse_negative_and_whitespace() {
        assert_eq!(parse(" 109, -1 ,\n204,1\n"), Ok(vec![109, -1, 204, 1]));
    }

    #[test]
    fn test_parse_trailing_comma() {
        assert_eq!(parse("99,"), Ok(vec![99]));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse(""), Ok(vec![]));
        assert_eq!(parse("  \n"), Ok(vec![]));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            parse("1,x,3"),
            Err(ParseError::InvalidInteger {
                index: 1,
                text: "x".to_string()
            })
        );
        assert!(parse("1,,3").is_err());
    }
}
