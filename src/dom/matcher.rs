//! Selector evaluation against a DOM tree.
//!
//! The matching engine is hidden behind [`SelectorMatcher`] so the
//! filter can be tested with a scripted matcher and the real engine can
//! be swapped without touching serialization or fetching. The default
//! implementation delegates structural matching to the HTML parser's
//! selector support.
//!
//! A static DOM snapshot cannot observe interaction state, so pseudo
//! constructs are handled by policy before matching:
//!
//! - pseudo-elements, vendor-prefixed pseudos, and state pseudo-classes
//!   are stripped and the remaining structural selector is tested;
//! - tree-structural pseudo-classes (`:first-child`, `:not(...)`, ...)
//!   are left in place and evaluated;
//! - if stripping leaves any compound empty, or the stripped selector
//!   cannot be parsed by the matching layer, the verdict is "used".
//!   Deleting styling the engine cannot judge is the one unrecoverable
//!   mistake, so doubt always keeps the rule.

use scraper::Selector;

use super::Document;

/// Pseudo-classes a static DOM snapshot *can* evaluate. Everything
/// else is stripped before matching.
const STRUCTURAL_PSEUDOS: &[&str] = &[
    "first-child",
    "last-child",
    "only-child",
    "first-of-type",
    "last-of-type",
    "only-of-type",
    "nth-child",
    "nth-of-type",
    "nth-last-child",
    "nth-last-of-type",
    "not",
    "is",
    "where",
    "empty",
    "root",
];

/// Decides whether a selector is satisfied by at least one element of
/// a DOM tree.
pub trait SelectorMatcher {
    fn matches(&self, selector: &str, dom: &Document) -> bool;
}

/// The default matcher, backed by the HTML parser's selector engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperMatcher;

impl SelectorMatcher for ScraperMatcher {
    fn matches(&self, selector: &str, dom: &Document) -> bool {
        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return true;
        }
        let Some(stripped) = strip_unobservable_pseudos(trimmed) else {
            // Nothing structural left to test.
            return true;
        };
        let result = match Selector::parse(&stripped) {
            Ok(parsed) => dom.html().select(&parsed).next().is_some(),
            Err(err) => {
                log::debug!("cannot evaluate selector {stripped:?}: {err}");
                true
            }
        };
        result
    }
}

/// One piece of a selector: a compound or the combinator between two.
enum Part {
    Compound(String),
    Combinator(String),
}

/// Split a selector into compounds and combinator runs at the top
/// level. Whitespace, `>`, `+`, and `~` inside brackets, parentheses,
/// or strings do not split.
fn split_parts(selector: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut buf_is_combinator = false;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut skip_escape = false;

    for c in selector.chars() {
        let combinator_char = quote.is_none()
            && depth == 0
            && (c.is_whitespace() || c == '>' || c == '+' || c == '~');

        if !buf.is_empty() && combinator_char != buf_is_combinator {
            let chunk = std::mem::take(&mut buf);
            parts.push(if buf_is_combinator {
                Part::Combinator(chunk)
            } else {
                Part::Compound(chunk)
            });
        }
        buf_is_combinator = combinator_char;

        if skip_escape {
            skip_escape = false;
        } else if let Some(q) = quote {
            if c == '\\' {
                skip_escape = true;
            } else if c == q {
                quote = None;
            }
        } else {
            match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        buf.push(c);
    }

    if !buf.is_empty() {
        parts.push(if buf_is_combinator {
            Part::Combinator(buf)
        } else {
            Part::Compound(buf)
        });
    }

    parts
}

/// Remove every pseudo construct the DOM cannot observe from one
/// compound selector, keeping structural pseudo-classes in place.
fn strip_compound(compound: &str) -> String {
    let chars: Vec<char> = compound.chars().collect();
    let mut out = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                i += 1;
                out.push(chars[i]);
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
                i += 1;
            }
            '(' | '[' => {
                depth += 1;
                out.push(c);
                i += 1;
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                out.push(c);
                i += 1;
            }
            ':' if depth == 0 => {
                let start = i;
                i += 1;
                let mut colons = 1;
                if i < chars.len() && chars[i] == ':' {
                    colons += 1;
                    i += 1;
                }
                let name_start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '-' || chars[i] == '_')
                {
                    i += 1;
                }
                let name: String = chars[name_start..i].iter().collect();

                // Swallow a parenthesized argument list if present.
                let mut end = i;
                if end < chars.len() && chars[end] == '(' {
                    let mut arg_depth = 0usize;
                    let mut arg_quote: Option<char> = None;
                    while end < chars.len() {
                        let a = chars[end];
                        if let Some(q) = arg_quote {
                            if a == '\\' {
                                end += 1;
                            } else if a == q {
                                arg_quote = None;
                            }
                        } else {
                            match a {
                                '\'' | '"' => arg_quote = Some(a),
                                '(' => arg_depth += 1,
                                ')' => {
                                    arg_depth -= 1;
                                    if arg_depth == 0 {
                                        end += 1;
                                        break;
                                    }
                                }
                                _ => {}
                            }
                        }
                        end += 1;
                    }
                }

                let lowered = name.to_ascii_lowercase();
                if colons == 1 && STRUCTURAL_PSEUDOS.contains(&lowered.as_str()) {
                    out.extend(chars[start..end].iter());
                }
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Strip unobservable pseudos from a whole selector.
///
/// Returns `None` when the result cannot be meaningfully evaluated:
/// the selector was pseudo-only, or stripping emptied one of its
/// compounds (`div > :hover`).
pub fn strip_unobservable_pseudos(selector: &str) -> Option<String> {
    let mut out = String::new();

    for part in split_parts(selector.trim()) {
        match part {
            Part::Combinator(text) => out.push_str(&text),
            Part::Compound(text) => {
                let stripped = strip_compound(&text);
                if stripped.trim().is_empty() {
                    return None;
                }
                out.push_str(&stripped);
            }
        }
    }

    if out.trim().is_empty() {
        None
    } else {
        Some(out)
    }
}
