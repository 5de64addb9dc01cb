//! Stylesheet filtering: decide which rules survive against a set of
//! DOM trees.
//!
//! A rule survives if any of its selectors matches any tree in the set
//! (the union semantics that make shared sheets work across pages).
//! At-rules follow per-kind policy: body-less rules and opaque blocks
//! are never judged, conditional groups recurse, and keyframes live or
//! die by whether a kept rule references their animation name.

use std::collections::{HashMap, HashSet};

use crate::css::model::{AtBody, AtRule, Node, Rule, Stylesheet};
use crate::dom::matcher::SelectorMatcher;
use crate::dom::Document;

/// Per-run cache of selector verdicts against a fixed DOM-tree set.
///
/// Owned by a single filter invocation and discarded with it; verdicts
/// never leak across runs.
pub struct UsageOracle<'a, M: SelectorMatcher> {
    matcher: &'a M,
    doms: &'a [&'a Document],
    verdicts: HashMap<String, bool>,
}

impl<'a, M: SelectorMatcher> UsageOracle<'a, M> {
    pub fn new(matcher: &'a M, doms: &'a [&'a Document]) -> Self {
        Self {
            matcher,
            doms,
            verdicts: HashMap::new(),
        }
    }

    /// `true` if `selector` matches at least one element of any tree.
    pub fn is_used(&mut self, selector: &str) -> bool {
        let key = selector.trim();
        if let Some(&verdict) = self.verdicts.get(key) {
            return verdict;
        }
        let verdict = self.doms.iter().any(|dom| self.matcher.matches(key, dom));
        self.verdicts.insert(key.to_string(), verdict);
        verdict
    }
}

/// Filter a stylesheet against the union of `doms`.
///
/// Pure function of its inputs: node order is preserved, surviving
/// rules keep their original declaration text, and a fresh verdict
/// cache is built per call.
pub fn filter_stylesheet<M: SelectorMatcher>(
    sheet: &Stylesheet,
    doms: &[&Document],
    matcher: &M,
) -> Stylesheet {
    let mut oracle = UsageOracle::new(matcher, doms);
    let mut nodes = filter_nodes(&sheet.nodes, &mut oracle);

    let live = collect_animation_names(&nodes);
    prune_dead_keyframes(&mut nodes, &live);

    Stylesheet {
        nodes,
        trailing: sheet.trailing.clone(),
    }
}

/// `true` if `nodes[index]` is exempt from filtering because the node
/// before it is an annotation comment.
fn is_protected(nodes: &[Node], index: usize) -> bool {
    index > 0 && matches!(&nodes[index - 1], Node::Comment(c) if c.is_annotation())
}

fn filter_nodes<M: SelectorMatcher>(nodes: &[Node], oracle: &mut UsageOracle<M>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut preserve_next = false;

    for node in nodes {
        if preserve_next && !matches!(node, Node::Comment(_)) {
            out.push(node.clone());
            preserve_next = false;
            continue;
        }

        match node {
            Node::Comment(comment) if comment.is_annotation() => {
                out.push(node.clone());
                preserve_next = true;
            }
            Node::Comment(_) => {}
            Node::Raw(_) => out.push(node.clone()),
            Node::Rule(rule) => {
                let kept: Vec<String> = rule
                    .selectors
                    .iter()
                    .filter(|selector| oracle.is_used(selector))
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    log::debug!("dropping rule {:?}", rule.selectors.join(",").trim());
                } else {
                    out.push(Node::Rule(Rule {
                        leading: rule.leading.clone(),
                        selectors: kept,
                        body: rule.body.clone(),
                    }));
                }
            }
            Node::AtRule(at) => match &at.body {
                // `@import` and friends: no DOM can prove them unused.
                AtBody::None => out.push(node.clone()),
                // Opaque blocks (keyframes, font-face, unknown) pass
                // through here; dead keyframes go in a second pass once
                // the surviving animation names are known.
                AtBody::Block(_) => out.push(node.clone()),
                AtBody::Nested(inner) => {
                    let filtered = Stylesheet {
                        nodes: filter_nodes(&inner.nodes, oracle),
                        trailing: inner.trailing.clone(),
                    };
                    if filtered.has_substance() {
                        out.push(Node::AtRule(AtRule {
                            leading: at.leading.clone(),
                            keyword: at.keyword.clone(),
                            prelude: at.prelude.clone(),
                            body: AtBody::Nested(filtered),
                        }));
                    } else {
                        log::debug!("dropping empty @{} group", at.keyword);
                    }
                }
            },
        }
    }

    out
}

// ── Keyframes liveness ───────────────────────────────────────────────

/// Value keywords that can appear in an `animation` shorthand and are
/// never animation names.
const ANIMATION_KEYWORDS: &[&str] = &[
    "none",
    "infinite",
    "linear",
    "ease",
    "ease-in",
    "ease-out",
    "ease-in-out",
    "step-start",
    "step-end",
    "normal",
    "reverse",
    "alternate",
    "alternate-reverse",
    "forwards",
    "backwards",
    "both",
    "running",
    "paused",
    "initial",
    "inherit",
    "unset",
    "revert",
];

/// Animation names referenced by the declarations of kept rules,
/// including rules nested in conditional groups. Keyframes bodies
/// themselves are not scanned.
fn collect_animation_names(nodes: &[Node]) -> HashSet<String> {
    let mut live = HashSet::new();
    collect_into(nodes, &mut live);
    live
}

fn collect_into(nodes: &[Node], live: &mut HashSet<String>) {
    for node in nodes {
        match node {
            Node::Rule(rule) => harvest_declarations(&rule.body, live),
            Node::AtRule(at) => {
                if let AtBody::Nested(inner) = &at.body {
                    collect_into(&inner.nodes, live);
                }
            }
            _ => {}
        }
    }
}

fn harvest_declarations(body: &str, live: &mut HashSet<String>) {
    let cleaned = strip_comments(body);
    for declaration in split_declarations(&cleaned) {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        if property == "animation-name" || property.ends_with("-animation-name") {
            for name in value.split(',') {
                push_candidate(name.trim(), live);
            }
        } else if property == "animation" || property.ends_with("-animation") {
            for item in value.split(',') {
                for token in item.split_whitespace() {
                    push_candidate(token, live);
                }
            }
        }
    }
}

fn push_candidate(token: &str, live: &mut HashSet<String>) {
    if !is_identifier(token) {
        return;
    }
    if ANIMATION_KEYWORDS.contains(&token.to_ascii_lowercase().as_str()) {
        return;
    }
    live.insert(token.to_string());
}

/// A CSS identifier: starts with a letter, `_`, or `-` followed by a
/// letter; continues with letters, digits, `-`, `_`.
fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let head_ok = match first {
        'a'..='z' | 'A'..='Z' | '_' => true,
        '-' => token
            .chars()
            .nth(1)
            .is_some_and(|c| c.is_ascii_alphabetic()),
        _ => false,
    };
    head_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Replace block comments with a single space.
fn strip_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
            i += 2;
            while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(bytes.len());
            result.push(' ');
        } else {
            // Safe to walk bytewise: comment delimiters are ASCII.
            let ch_len = utf8_len(bytes[i]);
            result.push_str(&input[i..i + ch_len]);
            i += ch_len;
        }
    }

    result
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >= 0xf0 => 4,
        b if b >= 0xe0 => 3,
        _ => 2,
    }
}

/// Split declaration text on `;`, ignoring separators nested in
/// parentheses (data URIs) or strings.
fn split_declarations(body: &str) -> Vec<String> {
    let mut declarations = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in body.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ';' if depth == 0 => declarations.push(std::mem::take(&mut current)),
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() {
        declarations.push(current);
    }

    declarations
}

fn prune_dead_keyframes(nodes: &mut Vec<Node>, live: &HashSet<String>) {
    let mut i = 0;
    while i < nodes.len() {
        let protected = is_protected(nodes, i);
        let remove = match &mut nodes[i] {
            Node::AtRule(at) if at.is_keyframes() && !protected => {
                let name = at.prelude.trim();
                if live.contains(name) {
                    false
                } else {
                    log::debug!("dropping @{} {name:?}: no surviving animation uses it", at.keyword);
                    true
                }
            }
            Node::AtRule(at) if !protected => {
                if let AtBody::Nested(inner) = &mut at.body {
                    prune_dead_keyframes(&mut inner.nodes, live);
                    // A group emptied by keyframes pruning has nothing
                    // left to say.
                    !inner.has_substance()
                } else {
                    false
                }
            }
            _ => false,
        };
        if remove {
            nodes.remove(i);
        } else {
            i += 1;
        }
    }
}
