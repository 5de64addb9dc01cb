//! logos-based structural CSS tokenizer.
//!
//! Unlike a value-level lexer, this tokenizer only recognizes the
//! constructs that determine stylesheet *structure*: comments, string
//! literals, braces, semicolons, and at-keywords. Everything else is an
//! opaque text run. There is no skip pattern, so the emitted spans tile
//! the input exactly and the parser can reconstruct any byte of the
//! source from them.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `/*` as a comment opener beats `/`)
//! 2. For equal length matches, earlier-defined variants win
//!
//! Our ordering ensures:
//! - `/* ... */` matches [`Token::Comment`], not `Slash` + text
//! - `@media` matches [`Token::AtKeyword`], not `At` + text
//! - a quoted string containing `}` stays a single token, hiding the
//!   brace from the structural scan

use logos::{Lexer, Logos};

/// Consume the rest of a block comment, including the closing `*/`.
/// An unterminated comment extends to the end of input.
fn lex_block_comment(lex: &mut Lexer<Token>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => lex.bump(end + 2),
        None => lex.bump(lex.remainder().len()),
    }
    true
}

/// Structural CSS token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    // ── Compound tokens (longer matches, defined first) ──────────────
    /// Block comment `/* ... */`.
    #[token("/*", lex_block_comment)]
    Comment,

    /// Double-quoted string literal, backslash escapes respected.
    #[regex(r#""([^"\\]|\\.)*""#)]
    DoubleQuoted,

    /// Single-quoted string literal, backslash escapes respected.
    #[regex(r"'([^'\\]|\\.)*'")]
    SingleQuoted,

    /// At-keyword: `@media`, `@import`, `@-webkit-keyframes`, ...
    #[regex(r"@[a-zA-Z-][a-zA-Z0-9-]*")]
    AtKeyword,

    /// Whitespace run.
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    /// Any run of text free of structural characters.
    #[regex(r#"[^{}@;'"/ \t\r\n\f]+"#)]
    Text,

    // ── Single-character punctuation ─────────────────────────────────
    /// `{`
    #[token("{")]
    BraceOpen,

    /// `}`
    #[token("}")]
    BraceClose,

    /// `;`
    #[token(";")]
    Semicolon,

    /// A `/` that does not open a comment.
    #[token("/")]
    Slash,

    /// A stray `@` not followed by an identifier.
    #[token("@")]
    At,
}

/// A token plus the byte range it covers in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

/// Tokenize `input` into spans that tile it completely.
///
/// Fragments the lexer cannot classify (an unterminated string, a lone
/// quote) are downgraded to [`Token::Text`] rather than dropped, so the
/// tiling property holds for arbitrary input.
pub fn tokenize(input: &str) -> Vec<SpannedToken> {
    Token::lexer(input)
        .spanned()
        .map(|(result, span)| SpannedToken {
            token: result.unwrap_or(Token::Text),
            start: span.start,
            end: span.end,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: tokenize and return just the token variants.
    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input).into_iter().map(|t| t.token).collect()
    }

    /// Helper: tokenize and return (token, slice) pairs.
    fn tokens_with_text(input: &str) -> Vec<(Token, String)> {
        tokenize(input)
            .into_iter()
            .map(|t| (t.token, input[t.start..t.end].to_string()))
            .collect()
    }

    /// Every byte of the input must belong to exactly one span.
    fn assert_tiles(input: &str) {
        let spans = tokenize(input);
        let mut offset = 0;
        for span in &spans {
            assert_eq!(span.start, offset, "gap before span in {input:?}");
            offset = span.end;
        }
        assert_eq!(offset, input.len(), "spans do not reach end of {input:?}");
    }

    // ── Structural punctuation ───────────────────────────────────────

    #[test]
    fn punctuation() {
        assert_eq!(
            tokens("{};/@"),
            vec![
                Token::BraceOpen,
                Token::BraceClose,
                Token::Semicolon,
                Token::Slash,
                Token::At,
            ]
        );
    }

    // ── Comments ─────────────────────────────────────────────────────

    #[test]
    fn comment_is_single_token() {
        let result = tokens_with_text("a /* b } c */ d");
        assert_eq!(result[2], (Token::Comment, "/* b } c */".into()));
    }

    #[test]
    fn unterminated_comment_extends_to_eof() {
        let result = tokens_with_text("a /* b");
        assert_eq!(result[2], (Token::Comment, "/* b".into()));
        assert_tiles("a /* b");
    }

    #[test]
    fn slash_alone_is_not_comment() {
        assert_eq!(tokens("a/b"), vec![Token::Text, Token::Slash, Token::Text]);
    }

    // ── Strings hide structure ───────────────────────────────────────

    #[test]
    fn double_quoted_string_hides_brace() {
        let result = tokens_with_text(r#"content: "}" ;"#);
        assert!(result
            .iter()
            .any(|(t, s)| *t == Token::DoubleQuoted && s == "\"}\""));
    }

    #[test]
    fn single_quoted_string_with_escape() {
        let result = tokens_with_text(r"content: 'a\'b';");
        assert!(result
            .iter()
            .any(|(t, s)| *t == Token::SingleQuoted && s == r"'a\'b'"));
    }

    #[test]
    fn lone_quote_degrades_to_text() {
        // No closing quote: the lexer error is downgraded, tiling holds.
        assert_tiles("a ' b");
    }

    // ── At-keywords ──────────────────────────────────────────────────

    #[test]
    fn at_keywords() {
        let result = tokens_with_text("@media @import @-webkit-keyframes");
        assert_eq!(result[0], (Token::AtKeyword, "@media".into()));
        assert_eq!(result[2], (Token::AtKeyword, "@import".into()));
        assert_eq!(result[4], (Token::AtKeyword, "@-webkit-keyframes".into()));
    }

    #[test]
    fn stray_at_is_its_own_token() {
        assert_eq!(
            tokens("@ x"),
            vec![Token::At, Token::Whitespace, Token::Text]
        );
    }

    // ── Tiling ───────────────────────────────────────────────────────

    #[test]
    fn spans_tile_typical_stylesheet() {
        assert_tiles("h1, h2 { color: red; }\n@media (x) { .a { b: url('q'); } }\n/* c */");
    }

    #[test]
    fn spans_tile_non_ascii() {
        assert_tiles(".rubrik { content: \"Varf\u{f6}r?\"; }");
    }

    #[test]
    fn empty_input() {
        assert!(tokenize("").is_empty());
    }
}
