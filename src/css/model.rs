//! CSS node model: an order-preserving representation of a stylesheet.
//!
//! Every node owns its leading trivia (whitespace before the construct)
//! and the raw text of whatever the parser did not need to understand,
//! so serialization can reproduce the source byte-for-byte. Dropping a
//! node during filtering drops its trivia with it, which keeps filtered
//! output free of stranded blank lines.

/// Marker inside a comment that protects the following construct from
/// filtering and rewriting.
pub const ANNOTATION_MARKER: &str = "cullcss: keep";

/// A parsed stylesheet: ordered nodes plus trailing trivia.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub nodes: Vec<Node>,
    /// Whitespace after the last node, preserved for round-tripping.
    pub trailing: String,
}

impl Stylesheet {
    /// Create an empty stylesheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if the sheet contains at least one rule or at-rule.
    ///
    /// Comments and opaque fragments alone do not count: a conditional
    /// group reduced to them has no reason to survive filtering.
    pub fn has_substance(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n, Node::Rule(_) | Node::AtRule(_)))
    }
}

/// One construct in a stylesheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
    Comment(Comment),
    /// A span the parser could not classify, retained verbatim.
    Raw(RawFragment),
}

impl Node {
    /// Leading trivia of this node.
    pub fn leading(&self) -> &str {
        match self {
            Node::Rule(r) => &r.leading,
            Node::AtRule(a) => &a.leading,
            Node::Comment(c) => &c.leading,
            Node::Raw(f) => &f.leading,
        }
    }
}

/// A style rule: selector list plus raw declaration text.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub leading: String,
    /// Verbatim comma-separated selector segments, whitespace intact.
    /// Joining all segments with `,` reproduces the source prelude.
    pub selectors: Vec<String>,
    /// Raw text between the braces, untouched by parsing.
    pub body: String,
}

/// An at-rule: `@keyword prelude` plus an optional body.
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub leading: String,
    /// Keyword without the `@`, e.g. `media`, `-webkit-keyframes`.
    pub keyword: String,
    /// Raw text between the keyword and the `{` or `;`.
    pub prelude: String,
    pub body: AtBody,
}

impl AtRule {
    /// `true` for `@keyframes` and its vendor-prefixed variants.
    pub fn is_keyframes(&self) -> bool {
        self.keyword == "keyframes" || self.keyword.ends_with("-keyframes")
    }

    /// `true` for conditional group rules whose body nests full rules.
    pub fn is_conditional_group(&self) -> bool {
        matches!(
            self.keyword.as_str(),
            "media" | "supports" | "document" | "-moz-document"
        )
    }
}

/// Body of an at-rule.
#[derive(Debug, Clone, PartialEq)]
pub enum AtBody {
    /// Body-less, `;`-terminated: `@import`, `@charset`, `@namespace`.
    None,
    /// A braced block kept verbatim: keyframes, font-face, unknown.
    Block(String),
    /// A braced block of nested rules: media, supports, document.
    Nested(Stylesheet),
}

/// A block comment (delimiters not included in `text`).
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub leading: String,
    pub text: String,
}

impl Comment {
    /// `true` if this comment instructs the engine to preserve the
    /// following construct verbatim.
    pub fn is_annotation(&self) -> bool {
        self.text.contains(ANNOTATION_MARKER)
    }
}

/// An opaque source fragment preserved byte-for-byte.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    pub leading: String,
    pub text: String,
}
