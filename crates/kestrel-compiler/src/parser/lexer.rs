//! Lexer: wraps the logos-derived token alphabet into packed tokens.

use logos::Logos;

use kestrel_ir::node::LiteralValue;
use kestrel_ir::{Token, TokenKind};

use crate::diagnostics::Diagnostics;

/// Tokenize a source string. Runs of unlexable characters are merged into
/// single diagnostics, mirroring how the parser reports at most one error
/// per bad fragment.
pub fn tokenize(src: &str) -> (Vec<Token>, Diagnostics) {
    let mut tokens = Vec::new();
    let mut diagnostics = Diagnostics::new();
    let mut lexer = TokenKind::lexer(src);
    let mut error_span: Option<std::ops::Range<usize>> = None;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(kind) => {
                if let Some(bad) = error_span.take() {
                    report_bad_fragment(&mut diagnostics, bad);
                }
                tokens.push(Token::new(
                    kind,
                    span.start as u32,
                    (span.end - span.start) as u32,
                ));
            }
            Err(()) => match &mut error_span {
                None => error_span = Some(span),
                Some(existing) => existing.end = span.end,
            },
        }
    }
    if let Some(bad) = error_span.take() {
        report_bad_fragment(&mut diagnostics, bad);
    }

    tokens.push(Token::new(TokenKind::Eof, src.len() as u32, 0));
    (tokens, diagnostics)
}

fn report_bad_fragment(diagnostics: &mut Diagnostics, span: std::ops::Range<usize>) {
    let token = Token::new(
        TokenKind::Synthetic,
        span.start as u32,
        (span.end - span.start) as u32,
    );
    diagnostics.error("unexpected character sequence", token).emit();
}

/// Parse a numeric token into the narrowest literal: int when
/// representable, long when integral, double otherwise.
pub fn parse_number(text: &str) -> LiteralValue {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return match i64::from_str_radix(hex, 16) {
            Ok(v) => LiteralValue::narrowest_long(v),
            Err(_) => LiteralValue::Number(
                hex.bytes()
                    .fold(0.0, |acc, b| acc * 16.0 + hex_digit(b) as f64),
            ),
        };
    }
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(v) = text.parse::<i64>() {
            return LiteralValue::narrowest_long(v);
        }
    }
    let value: f64 = text.parse().unwrap_or(f64::NAN);
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        // Integral doubles written with exponent or fraction still narrow.
        return LiteralValue::narrowest_long(value as i64);
    }
    LiteralValue::Number(value)
}

fn hex_digit(b: u8) -> u32 {
    (b as char).to_digit(16).unwrap_or(0)
}

/// Strip quotes and process escapes of a string token.
pub fn parse_string(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    let code = hi.to_digit(16).unwrap_or(0) * 16 + lo.to_digit(16).unwrap_or(0);
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                    }
                }
            }
            Some('u') => {
                let mut code = 0;
                for _ in 0..4 {
                    match chars.next().and_then(|c| c.to_digit(16)) {
                        Some(d) => code = code * 16 + d,
                        None => break,
                    }
                }
                if let Some(ch) = char::from_u32(code) {
                    out.push(ch);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, diag) = tokenize(src);
        assert!(!diag.has_errors(), "{}", diag.printer().render());
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_beat_identifiers() {
        assert_eq!(
            kinds("var x = typeof y;"),
            vec![
                TokenKind::Var,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Typeof,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn compound_operators_lex_greedily() {
        assert_eq!(
            kinds("a >>> b === c"),
            vec![
                TokenKind::Ident,
                TokenKind::Ushr,
                TokenKind::Ident,
                TokenKind::EqEqEq,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a // trailing\n/* block */ b"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn bad_fragment_is_one_diagnostic() {
        let (_, diag) = tokenize("a # b");
        assert_eq!(diag.error_count(), 1);
    }

    #[test]
    fn numbers_narrow() {
        assert_eq!(parse_number("7"), LiteralValue::Int(7));
        assert_eq!(parse_number("2147483648"), LiteralValue::Long(2147483648));
        assert_eq!(parse_number("1.5"), LiteralValue::Number(1.5));
        assert_eq!(parse_number("0xff"), LiteralValue::Int(255));
        assert_eq!(parse_number("1e2"), LiteralValue::Int(100));
    }

    #[test]
    fn strings_unescape() {
        assert_eq!(parse_string(r#""a\nb""#), "a\nb");
        assert_eq!(parse_string(r"'it\'s'"), "it's");
        assert_eq!(parse_string(r#""A""#), "A");
    }
}
