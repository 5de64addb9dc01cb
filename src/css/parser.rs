//! Lenient structural CSS parser.
//!
//! Parses CSS text into a [`Stylesheet`] of [`Node`]s using the
//! structural tokenizer from [`crate::css::tokenizer`]. The parser is
//! infallible by design: any fragment it cannot classify — a selector
//! with no block, an unterminated construct, a stray brace — is
//! retained verbatim as [`Node::Raw`] instead of being rejected.
//! Real-world CSS is not guaranteed well-formed, and losing bytes is
//! the one failure mode this crate must never have.

use crate::css::model::{AtBody, AtRule, Comment, Node, RawFragment, Rule, Stylesheet};
use crate::css::tokenizer::{tokenize, SpannedToken, Token};

/// Parse a CSS string into a [`Stylesheet`].
pub fn parse(input: &str) -> Stylesheet {
    let mut parser = Parser {
        source: input,
        tokens: tokenize(input),
        cursor: 0,
    };
    let (nodes, trailing) = parser.parse_nodes(false);
    Stylesheet { nodes, trailing }
}

/// Split a rule prelude into its comma-separated selector segments.
///
/// Commas nested in parentheses, brackets, or string literals do not
/// split (`:not(a, b)`, `[title="a,b"]`). Segments keep their original
/// whitespace so that rejoining with `,` reproduces the prelude.
pub fn split_selector_list(prelude: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = prelude.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' | '[' => {
                    depth += 1;
                    current.push(c);
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => segments.push(std::mem::take(&mut current)),
                _ => current.push(c),
            },
        }
    }

    segments.push(current);
    segments
}

/// Cursor-based parser over spanned tokens.
struct Parser<'a> {
    source: &'a str,
    tokens: Vec<SpannedToken>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<SpannedToken> {
        self.tokens.get(self.cursor).copied()
    }

    fn slice(&self, tok: SpannedToken) -> &'a str {
        &self.source[tok.start..tok.end]
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        let tok = self.peek();
        if tok.is_some() {
            self.cursor += 1;
        }
        tok
    }

    /// Everything from `start` to the end of input, as an opaque node.
    fn raw_to_eof(&mut self, leading: String, start: usize) -> Node {
        self.cursor = self.tokens.len();
        Node::Raw(RawFragment {
            leading,
            text: self.source[start..].to_string(),
        })
    }

    /// Parse a node sequence until EOF or, when `stop_at_brace_close`
    /// is set, until an unconsumed `}` that closes the enclosing block.
    fn parse_nodes(&mut self, stop_at_brace_close: bool) -> (Vec<Node>, String) {
        let mut nodes = Vec::new();
        let mut trivia = String::new();

        while let Some(tok) = self.peek() {
            match tok.token {
                Token::Whitespace => {
                    trivia.push_str(self.slice(tok));
                    self.cursor += 1;
                }
                Token::BraceClose if stop_at_brace_close => break,
                Token::BraceClose => {
                    // Stray close brace at the top level, kept verbatim.
                    self.cursor += 1;
                    nodes.push(Node::Raw(RawFragment {
                        leading: std::mem::take(&mut trivia),
                        text: "}".to_string(),
                    }));
                }
                Token::Comment => {
                    self.cursor += 1;
                    let text = self.slice(tok);
                    match text
                        .strip_prefix("/*")
                        .and_then(|t| t.strip_suffix("*/"))
                    {
                        Some(inner) => nodes.push(Node::Comment(Comment {
                            leading: std::mem::take(&mut trivia),
                            text: inner.to_string(),
                        })),
                        // Unterminated comment: opaque so serialization
                        // does not invent a closing delimiter.
                        None => nodes.push(Node::Raw(RawFragment {
                            leading: std::mem::take(&mut trivia),
                            text: text.to_string(),
                        })),
                    }
                }
                Token::AtKeyword => {
                    let leading = std::mem::take(&mut trivia);
                    nodes.push(self.parse_at_rule(leading));
                }
                _ => {
                    let leading = std::mem::take(&mut trivia);
                    nodes.push(self.parse_rule(leading));
                }
            }
        }

        (nodes, trivia)
    }

    /// Parse an at-rule starting at the current `AtKeyword` token.
    fn parse_at_rule(&mut self, leading: String) -> Node {
        let kw_tok = self.advance().expect("caller checked AtKeyword");
        let keyword = self.slice(kw_tok)[1..].to_string();
        let mut prelude = String::new();

        loop {
            let Some(tok) = self.peek() else {
                return self.raw_to_eof(leading, kw_tok.start);
            };
            match tok.token {
                Token::Semicolon => {
                    self.cursor += 1;
                    return Node::AtRule(AtRule {
                        leading,
                        keyword,
                        prelude,
                        body: AtBody::None,
                    });
                }
                Token::BraceOpen => {
                    self.cursor += 1;
                    return self.parse_at_rule_body(leading, keyword, prelude, kw_tok.start, tok.end);
                }
                Token::BraceClose => {
                    // Malformed: the enclosing block closes mid-prelude.
                    return Node::Raw(RawFragment {
                        leading,
                        text: self.source[kw_tok.start..tok.start].to_string(),
                    });
                }
                _ => {
                    prelude.push_str(self.slice(tok));
                    self.cursor += 1;
                }
            }
        }
    }

    /// Parse the braced body of an at-rule. `rule_start`/`body_start`
    /// are byte offsets used for opaque fallbacks.
    fn parse_at_rule_body(
        &mut self,
        leading: String,
        keyword: String,
        prelude: String,
        rule_start: usize,
        body_start: usize,
    ) -> Node {
        let conditional = matches!(
            keyword.as_str(),
            "media" | "supports" | "document" | "-moz-document"
        );

        if conditional {
            let (nodes, trailing) = self.parse_nodes(true);
            match self.peek() {
                Some(close) if close.token == Token::BraceClose => {
                    self.cursor += 1;
                    Node::AtRule(AtRule {
                        leading,
                        keyword,
                        prelude,
                        body: AtBody::Nested(Stylesheet { nodes, trailing }),
                    })
                }
                // Unterminated group: fall back to the raw source span.
                _ => self.raw_to_eof(leading, rule_start),
            }
        } else {
            let mut depth = 1usize;
            while let Some(tok) = self.advance() {
                match tok.token {
                    Token::BraceOpen => depth += 1,
                    Token::BraceClose => {
                        depth -= 1;
                        if depth == 0 {
                            return Node::AtRule(AtRule {
                                leading,
                                keyword,
                                prelude,
                                body: AtBody::Block(
                                    self.source[body_start..tok.start].to_string(),
                                ),
                            });
                        }
                    }
                    _ => {}
                }
            }
            self.raw_to_eof(leading, rule_start)
        }
    }

    /// Parse a style rule, or an opaque fragment if no block follows.
    fn parse_rule(&mut self, leading: String) -> Node {
        let start = self.peek().expect("caller checked a token exists").start;

        loop {
            let Some(tok) = self.peek() else {
                return self.raw_to_eof(leading, start);
            };
            match tok.token {
                Token::Semicolon => {
                    // Declaration-like garbage outside a block.
                    self.cursor += 1;
                    return Node::Raw(RawFragment {
                        leading,
                        text: self.source[start..tok.end].to_string(),
                    });
                }
                Token::BraceClose => {
                    // The enclosing block closes before this rule opened.
                    // Leave the brace for the caller to interpret.
                    return Node::Raw(RawFragment {
                        leading,
                        text: self.source[start..tok.start].to_string(),
                    });
                }
                Token::BraceOpen => {
                    let prelude = &self.source[start..tok.start];
                    self.cursor += 1;
                    return self.parse_rule_body(leading, prelude, start, tok.end);
                }
                _ => {
                    self.cursor += 1;
                }
            }
        }
    }

    /// Parse the declaration block of a rule.
    fn parse_rule_body(
        &mut self,
        leading: String,
        prelude: &str,
        rule_start: usize,
        body_start: usize,
    ) -> Node {
        let mut depth = 1usize;
        while let Some(tok) = self.advance() {
            match tok.token {
                Token::BraceOpen => depth += 1,
                Token::BraceClose => {
                    depth -= 1;
                    if depth == 0 {
                        let selectors = split_selector_list(prelude);
                        if selectors.iter().all(|s| s.trim().is_empty()) {
                            // `{ ... }` with no selector: opaque.
                            return Node::Raw(RawFragment {
                                leading,
                                text: self.source[rule_start..tok.end].to_string(),
                            });
                        }
                        return Node::Rule(Rule {
                            leading,
                            selectors,
                            body: self.source[body_start..tok.start].to_string(),
                        });
                    }
                }
                _ => {}
            }
        }
        self.raw_to_eof(leading, rule_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_rule(input: &str) -> Rule {
        let sheet = parse(input);
        for node in sheet.nodes {
            if let Node::Rule(rule) = node {
                return rule;
            }
        }
        panic!("expected a rule in {input:?}");
    }

    // ── Rules ────────────────────────────────────────────────────────

    #[test]
    fn parse_simple_rule() {
        let rule = first_rule("h1 { color: red; }");
        assert_eq!(rule.selectors, vec!["h1 "]);
        assert_eq!(rule.body, " color: red; ");
    }

    #[test]
    fn parse_selector_list_keeps_segments_verbatim() {
        let rule = first_rule("h1, h2 ,h3 { x: y }");
        assert_eq!(rule.selectors, vec!["h1", " h2 ", "h3 "]);
    }

    #[test]
    fn parse_multiple_rules_in_order() {
        let sheet = parse(".a { x: 1 } .b { x: 2 }");
        assert_eq!(sheet.nodes.len(), 2);
        assert!(matches!(&sheet.nodes[0], Node::Rule(r) if r.selectors[0].trim() == ".a"));
        assert!(matches!(&sheet.nodes[1], Node::Rule(r) if r.selectors[0].trim() == ".b"));
    }

    #[test]
    fn leading_trivia_attaches_to_node() {
        let sheet = parse("\n\n  h1 { x: y }");
        match &sheet.nodes[0] {
            Node::Rule(rule) => assert_eq!(rule.leading, "\n\n  "),
            other => panic!("expected rule, got {other:?}"),
        }
    }

    // ── At-rules ─────────────────────────────────────────────────────

    #[test]
    fn parse_import_is_bodyless() {
        let sheet = parse("@import url(other.css);");
        match &sheet.nodes[0] {
            Node::AtRule(at) => {
                assert_eq!(at.keyword, "import");
                assert_eq!(at.prelude, " url(other.css)");
                assert_eq!(at.body, AtBody::None);
            }
            other => panic!("expected at-rule, got {other:?}"),
        }
    }

    #[test]
    fn parse_media_nests_rules() {
        let sheet = parse("@media (max-width: 900px) { .a { x: y } }");
        match &sheet.nodes[0] {
            Node::AtRule(at) => {
                assert_eq!(at.keyword, "media");
                assert_eq!(at.prelude, " (max-width: 900px) ");
                match &at.body {
                    AtBody::Nested(inner) => {
                        assert_eq!(inner.nodes.len(), 1);
                        assert!(matches!(&inner.nodes[0], Node::Rule(_)));
                    }
                    other => panic!("expected nested body, got {other:?}"),
                }
            }
            other => panic!("expected at-rule, got {other:?}"),
        }
    }

    #[test]
    fn parse_keyframes_body_is_verbatim() {
        let css = "@-webkit-keyframes spin { from { top: 0 } to { top: 9px } }";
        let sheet = parse(css);
        match &sheet.nodes[0] {
            Node::AtRule(at) => {
                assert!(at.is_keyframes());
                assert_eq!(
                    at.body,
                    AtBody::Block(" from { top: 0 } to { top: 9px } ".to_string())
                );
            }
            other => panic!("expected at-rule, got {other:?}"),
        }
    }

    #[test]
    fn parse_font_face_is_opaque_block() {
        let sheet = parse("@font-face { src: url(x.woff); }");
        match &sheet.nodes[0] {
            Node::AtRule(at) => {
                assert_eq!(at.keyword, "font-face");
                assert!(matches!(at.body, AtBody::Block(_)));
            }
            other => panic!("expected at-rule, got {other:?}"),
        }
    }

    // ── Comments ─────────────────────────────────────────────────────

    #[test]
    fn parse_comment_between_rules() {
        let sheet = parse(".a { x: y } /* note */ .b { x: y }");
        assert!(matches!(&sheet.nodes[1], Node::Comment(c) if c.text == " note "));
    }

    #[test]
    fn braces_inside_comment_do_not_nest() {
        let sheet = parse(".a { x: y } /* { } } { */ .b { x: y }");
        assert_eq!(sheet.nodes.len(), 3);
    }

    // ── Leniency ─────────────────────────────────────────────────────

    #[test]
    fn selector_without_block_is_raw() {
        let sheet = parse(".a { x: y }\n.dangling-selector");
        assert!(matches!(&sheet.nodes[1], Node::Raw(f) if f.text == ".dangling-selector"));
    }

    #[test]
    fn stray_close_brace_is_raw() {
        let sheet = parse("} .a { x: y }");
        assert!(matches!(&sheet.nodes[0], Node::Raw(f) if f.text == "}"));
        assert!(matches!(&sheet.nodes[1], Node::Rule(_)));
    }

    #[test]
    fn unterminated_block_is_raw() {
        let sheet = parse(".a { x: y");
        assert!(matches!(&sheet.nodes[0], Node::Raw(f) if f.text == ".a { x: y"));
    }

    #[test]
    fn string_hides_brace_in_declaration() {
        let rule = first_rule(r#".a { content: "}" }"#);
        assert_eq!(rule.body, r#" content: "}" "#);
    }

    #[test]
    fn empty_input_parses_to_empty_sheet() {
        let sheet = parse("");
        assert!(sheet.nodes.is_empty());
        assert!(sheet.trailing.is_empty());
    }

    #[test]
    fn whitespace_only_becomes_trailing() {
        let sheet = parse("  \n\t");
        assert!(sheet.nodes.is_empty());
        assert_eq!(sheet.trailing, "  \n\t");
    }

    // ── split_selector_list ──────────────────────────────────────────

    #[test]
    fn split_plain_list() {
        assert_eq!(split_selector_list("h1, h2"), vec!["h1", " h2"]);
    }

    #[test]
    fn split_protects_parens() {
        assert_eq!(
            split_selector_list(":not(a, b), .c"),
            vec![":not(a, b)", " .c"]
        );
    }

    #[test]
    fn split_protects_brackets_and_strings() {
        assert_eq!(
            split_selector_list(r#"[title="a,b"], input[type='x,y']"#),
            vec![r#"[title="a,b"]"#, r#" input[type='x,y']"#]
        );
    }

    #[test]
    fn split_single_selector() {
        assert_eq!(split_selector_list(".only "), vec![".only "]);
    }
}
