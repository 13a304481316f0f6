//! Kusto tokenizer using nom.
//!
//! Splits a cleaned query into three token kinds. Concatenating the token
//! texts reproduces the input exactly.
//!
//! ```text
//! Events | where Name == "x"
//! ──┬─── ┬ ──┬── ─┬── ── ─┬─
//!   │    │   │    │       └── String
//!   │    │   │    └── Identifier
//!   │    │   └── Identifier
//!   │    └── Other
//!   └── Identifier
//! ```

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{anychar, char, none_of},
    combinator::{map, recognize, verify},
    multi::many0_count,
    sequence::{delimited, pair},
    IResult,
};

use crate::error::{TranslateError, TranslateResult};

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A maximal run of word characters (Unicode alphanumerics and `_`).
    Identifier,
    /// A quoted literal including its quotes.
    String,
    /// Punctuation, operators and whitespace.
    Other,
}

/// A token borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the token in the source.
    pub start: usize,
}

impl Token<'_> {
    /// Byte offset just past the token.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Word characters, matching `\w`.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize a query.
///
/// Fails with [`TranslateError::MalformedQuery`] when a quote is not closed
/// on the line it opens.
pub fn tokenize(input: &str) -> TranslateResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let start = input.len() - rest.len();
        let (remaining, (kind, text)) = match parse_token(rest) {
            Ok(parsed) => parsed,
            Err(_) => {
                return Err(TranslateError::malformed(
                    start,
                    format!(
                        "unterminated string literal starting with {}",
                        rest.chars().next().unwrap_or('"')
                    ),
                ));
            }
        };
        tokens.push(Token { kind, text, start });
        rest = remaining;
    }

    Ok(tokens)
}

/// True when the character right before the token is a hyphen.
pub fn preceded_by_hyphen(source: &str, token: &Token<'_>) -> bool {
    source[..token.start].ends_with('-')
}

/// True when the token is directly followed by `(` or whitespace.
///
/// A token at the very end of the source is not followed by anything and so
/// does not qualify.
pub fn followed_by_call_or_space(source: &str, token: &Token<'_>) -> bool {
    source[token.end()..]
        .chars()
        .next()
        .is_some_and(|c| c == '(' || c.is_whitespace())
}

/// True for `[_a-zA-Z][_a-zA-Z0-9]*`.
pub fn is_plain_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

fn parse_token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        map(string_literal, |s| (TokenKind::String, s)),
        map(take_while1(is_word_char), |s| (TokenKind::Identifier, s)),
        map(
            take_while1(|c: char| !is_word_char(c) && c != '"' && c != '\''),
            |s| (TokenKind::Other, s),
        ),
    ))(input)
}

/// Escape-aware literals first; when no closing quote is found that way, a
/// backslash is an ordinary character (`@"C:\Logs\"`).
fn string_literal(input: &str) -> IResult<&str, &str> {
    alt((
        quoted('"', "\"\\\n"),
        quoted('\'', "'\\\n"),
        verbatim('"', "\"\n"),
        verbatim('\'', "'\n"),
    ))(input)
}

/// A literal delimited by `quote`; a backslash escapes any character but a
/// newline.
fn quoted<'a>(quote: char, stop: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        recognize(delimited(
            char(quote),
            many0_count(alt((
                recognize(pair(char('\\'), verify(anychar, |c: &char| *c != '\n'))),
                recognize(none_of(stop)),
            ))),
            char(quote),
        ))(input)
    }
}

/// A literal delimited by `quote` with no escapes.
fn verbatim<'a>(quote: char, stop: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        recognize(delimited(
            char(quote),
            many0_count(none_of(stop)),
            char(quote),
        ))(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, &str)> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_simple_pipeline() {
        assert_eq!(
            kinds("Events | where Name == \"x\""),
            vec![
                (TokenKind::Identifier, "Events"),
                (TokenKind::Other, " | "),
                (TokenKind::Identifier, "where"),
                (TokenKind::Other, " "),
                (TokenKind::Identifier, "Name"),
                (TokenKind::Other, " == "),
                (TokenKind::String, "\"x\""),
            ]
        );
    }

    #[test]
    fn test_escaped_quotes() {
        assert_eq!(
            kinds(r#"'it\'s' "say \"hi\"""#),
            vec![
                (TokenKind::String, r"'it\'s'"),
                (TokenKind::Other, " "),
                (TokenKind::String, r#""say \"hi\"""#),
            ]
        );
    }

    #[test]
    fn test_trailing_backslash_literal() {
        assert_eq!(
            kinds(r#"p startswith @"C:\Logs\" | take 1"#),
            vec![
                (TokenKind::Identifier, "p"),
                (TokenKind::Other, " "),
                (TokenKind::Identifier, "startswith"),
                (TokenKind::Other, " @"),
                (TokenKind::String, r#""C:\Logs\""#),
                (TokenKind::Other, " | "),
                (TokenKind::Identifier, "take"),
                (TokenKind::Other, " "),
                (TokenKind::Identifier, "1"),
            ]
        );
        assert_eq!(
            kinds(r"@'C:\'"),
            vec![(TokenKind::Other, "@"), (TokenKind::String, r"'C:\'")]
        );
    }

    #[test]
    fn test_mixed_quotes_inside() {
        assert_eq!(kinds(r#""a'b""#), vec![(TokenKind::String, r#""a'b""#)]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("where x == \"abc").unwrap_err();
        match err {
            TranslateError::MalformedQuery { position, .. } => assert_eq!(position, 11),
            other => panic!("Expected MalformedQuery, got {other:?}"),
        }
    }

    #[test]
    fn test_string_cannot_span_lines() {
        assert!(tokenize("'abc\ndef'").is_err());
    }

    #[test]
    fn test_roundtrip_text() {
        let input = "T | extend d = ago(1d), s = strcat('a', \"b\") // x";
        let joined: String = tokenize(input).unwrap().iter().map(|t| t.text).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn test_context_helpers() {
        let source = "project-away Col fn(x)";
        let tokens = tokenize(source).unwrap();
        let away = tokens.iter().find(|t| t.text == "away").unwrap();
        let project = tokens.iter().find(|t| t.text == "project").unwrap();
        let col = tokens.iter().find(|t| t.text == "Col").unwrap();
        let func = tokens.iter().find(|t| t.text == "fn").unwrap();
        let x = tokens.iter().find(|t| t.text == "x").unwrap();

        assert!(preceded_by_hyphen(source, away));
        assert!(!preceded_by_hyphen(source, project));
        assert!(!followed_by_call_or_space(source, project));
        assert!(followed_by_call_or_space(source, col));
        assert!(followed_by_call_or_space(source, func));
        assert!(!followed_by_call_or_space(source, x));
    }

    #[test]
    fn test_plain_identifier() {
        assert!(is_plain_identifier("_x1"));
        assert!(is_plain_identifier("Name"));
        assert!(!is_plain_identifier("1d"));
        assert!(!is_plain_identifier("café"));
        assert!(!is_plain_identifier(""));
    }
}
