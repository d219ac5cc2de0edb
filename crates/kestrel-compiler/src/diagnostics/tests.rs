use kestrel_ir::{Token, TokenKind};

use super::Diagnostics;

fn ident_token(start: u32, len: u32) -> Token {
    Token::new(TokenKind::Ident, start, len)
}

#[test]
fn counts_by_severity() {
    let mut diag = Diagnostics::new();
    diag.error("redeclared variable", ident_token(4, 1)).emit();
    diag.warning("unused variable", ident_token(10, 1)).emit();

    assert!(diag.has_errors());
    assert!(diag.has_warnings());
    assert_eq!(diag.error_count(), 1);
    assert_eq!(diag.warning_count(), 1);
    assert_eq!(diag.first_error_message(), Some("redeclared variable"));
}

#[test]
fn plain_rendering_without_source() {
    let mut diag = Diagnostics::new();
    diag.error("duplicate parameter", ident_token(12, 1)).emit();
    let out = diag.printer().render();
    assert!(out.contains("error at 12..13: duplicate parameter"));
}

#[test]
fn snippet_rendering_with_source() {
    let source = "function f(x, x) { }";
    let mut diag = Diagnostics::new();
    diag.error("duplicate parameter", ident_token(14, 1))
        .related_to("first declared here", ident_token(11, 1))
        .emit();
    let out = diag.printer().source(source).path("test.js").render();
    assert!(out.contains("duplicate parameter"));
    assert!(out.contains("test.js"));
}

#[test]
fn extend_merges_collections() {
    let mut a = Diagnostics::new();
    a.error("first", ident_token(0, 1)).emit();
    let mut b = Diagnostics::new();
    b.warning("second", ident_token(2, 1)).emit();
    a.extend(b);
    assert_eq!(a.len(), 2);
}
