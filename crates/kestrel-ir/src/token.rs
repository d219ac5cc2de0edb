//! Token model: a token packs its kind, start offset, and length.
//!
//! `TokenKind` doubles as the lexer alphabet (via `logos`); the parser turns
//! lexer output into `Token` values that every IR node carries for source
//! attribution.

use logos::Logos;

/// Lexical token kinds for the JavaScript subset.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*(?:[^*]|\*[^/])*\*/")]
pub enum TokenKind {
    // Keywords.
    #[token("var")]
    Var,
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("function")]
    Function,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("of")]
    Of,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("throw")]
    Throw,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("debugger")]
    Debugger,
    #[token("new")]
    New,
    #[token("typeof")]
    Typeof,
    #[token("delete")]
    Delete,
    #[token("void")]
    Void,
    #[token("instanceof")]
    Instanceof,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Punctuation.
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,

    // Operators.
    #[token("=")]
    Assign,
    #[token("+=")]
    AssignAdd,
    #[token("-=")]
    AssignSub,
    #[token("*=")]
    AssignMul,
    #[token("/=")]
    AssignDiv,
    #[token("%=")]
    AssignMod,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token(">>>")]
    Ushr,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("===")]
    EqEqEq,
    #[token("!==")]
    NotEqEq,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,

    // Literals and names.
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"0[xX][0-9a-fA-F]+")]
    Number,
    #[regex(r#""(?:[^"\\\n]|\\.)*""#)]
    #[regex(r"'(?:[^'\\\n]|\\.)*'")]
    Str,

    // Never produced by the lexer; the parser synthesizes these.
    Eof,
    Synthetic,
}

/// A packed token: kind, start offset, and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub start: u32,
    pub len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, start: u32, len: u32) -> Self {
        Self { kind, start, len }
    }

    /// A zero-width token for nodes manufactured by the pipeline.
    pub fn synthetic() -> Self {
        Self::new(TokenKind::Synthetic, 0, 0)
    }

    /// Exclusive end offset.
    pub fn finish(self) -> u32 {
        self.start + self.len
    }

    pub fn range(self) -> std::ops::Range<usize> {
        self.start as usize..self.finish() as usize
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::synthetic()
    }
}
