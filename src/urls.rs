//! URL resolution and `url(...)` rewriting.
//!
//! Filtered stylesheets are written somewhere other than where they
//! were fetched from, so relative asset references inside them must be
//! made environment-independent. Resolution follows RFC 3986 base +
//! reference combination; the rewriter is a byte scanner that is aware
//! of comments and string literals, so a `url(` inside either never
//! triggers a rewrite.

use url::Url;

use crate::css::model::{AtBody, Node, Stylesheet};
use crate::error::Error;

/// How `url(...)` references are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlMode {
    /// Every reference is resolved to fully qualified absolute form.
    AbsoluteAll,
    /// References on a different remote host keep their original
    /// bytes; everything local to the sheet is made absolute.
    #[default]
    PreserveRemote,
}

/// Resolve `reference` against `base` with standard base-URL
/// combination semantics.
///
/// `resolve("http://x/elsewhere", "./style.css")` is `http://x/style.css`
/// while `resolve("http://x/elsewhere/", "./style.css")` is
/// `http://x/elsewhere/style.css`; a reference starting with `/`
/// replaces the whole path and `//host/..` replaces the authority.
pub fn make_absolute_url(base: &str, reference: &str) -> Result<String, Error> {
    let base_url = Url::parse(base).map_err(|source| Error::InvalidUrl {
        input: base.to_string(),
        source,
    })?;
    base_url
        .join(reference)
        .map(|resolved| resolved.to_string())
        .map_err(|source| Error::InvalidUrl {
            input: reference.to_string(),
            source,
        })
}

/// Rewrite the `url(...)` references of one declaration block.
///
/// References that stay untouched keep their original bytes (quoting
/// included); rewritten references are emitted double-quoted.
pub fn rewrite_urls(css: &str, sheet_url: &str, mode: UrlMode) -> String {
    let Ok(base) = Url::parse(sheet_url) else {
        log::warn!("cannot rewrite urls against unparseable base {sheet_url:?}");
        return css.to_string();
    };

    #[derive(PartialEq)]
    enum State {
        Normal,
        SingleString,
        DoubleString,
        Comment,
    }

    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut state = State::Normal;
    let mut i = 0usize;
    let mut last_emit = 0usize;

    while i < bytes.len() {
        match state {
            State::Normal => {
                if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
                    state = State::Comment;
                    i += 2;
                    continue;
                }
                if bytes[i] == b'\'' {
                    state = State::SingleString;
                    i += 1;
                    continue;
                }
                if bytes[i] == b'"' {
                    state = State::DoubleString;
                    i += 1;
                    continue;
                }

                if is_url_function_at(bytes, i) {
                    if let Some(token) = scan_url_token(css, i) {
                        if let Some(absolute) = rewrite_reference(&token.reference, &base, mode) {
                            out.push_str(&css[last_emit..i]);
                            out.push_str("url(\"");
                            out.push_str(&absolute);
                            out.push_str("\")");
                            last_emit = token.end;
                        }
                        i = token.end;
                        continue;
                    }
                }

                i += 1;
            }
            State::Comment => {
                if bytes[i] == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                    state = State::Normal;
                    i += 2;
                } else {
                    i += 1;
                }
            }
            State::SingleString => {
                if bytes[i] == b'\\' {
                    i += 2;
                } else {
                    if bytes[i] == b'\'' {
                        state = State::Normal;
                    }
                    i += 1;
                }
            }
            State::DoubleString => {
                if bytes[i] == b'\\' {
                    i += 2;
                } else {
                    if bytes[i] == b'"' {
                        state = State::Normal;
                    }
                    i += 1;
                }
            }
        }
    }

    out.push_str(&css[last_emit..]);
    out
}

/// Apply [`rewrite_urls`] to every rewritable part of a filtered sheet:
/// rule bodies, opaque at-rule blocks (`@font-face` sources), and
/// conditional groups recursively. Body-less at-rules (`@import`) and
/// annotation-protected constructs keep their original bytes.
pub fn rewrite_sheet_urls(sheet: &mut Stylesheet, sheet_url: &str, mode: UrlMode) {
    rewrite_nodes(&mut sheet.nodes, sheet_url, mode);
}

fn rewrite_nodes(nodes: &mut [Node], sheet_url: &str, mode: UrlMode) {
    for index in 0..nodes.len() {
        let protected =
            index > 0 && matches!(&nodes[index - 1], Node::Comment(c) if c.is_annotation());
        if protected {
            continue;
        }
        match &mut nodes[index] {
            Node::Rule(rule) => rule.body = rewrite_urls(&rule.body, sheet_url, mode),
            Node::AtRule(at) => match &mut at.body {
                AtBody::Block(raw) => *raw = rewrite_urls(raw, sheet_url, mode),
                AtBody::Nested(inner) => rewrite_nodes(&mut inner.nodes, sheet_url, mode),
                AtBody::None => {}
            },
            _ => {}
        }
    }
}

/// `url` (any case) at `i`, not preceded by an identifier character.
fn is_url_function_at(bytes: &[u8], i: usize) -> bool {
    if i + 3 > bytes.len() {
        return false;
    }
    if !bytes[i].eq_ignore_ascii_case(&b'u')
        || !bytes[i + 1].eq_ignore_ascii_case(&b'r')
        || !bytes[i + 2].eq_ignore_ascii_case(&b'l')
    {
        return false;
    }
    if i > 0 {
        let prev = bytes[i - 1];
        if prev.is_ascii_alphanumeric() || prev == b'-' || prev == b'_' {
            return false;
        }
    }
    true
}

struct UrlToken {
    reference: String,
    /// Byte offset just past the closing `)`.
    end: usize,
}

/// Scan a complete `url( ... )` token starting at the `u`. Returns
/// `None` when no well-formed token is present.
fn scan_url_token(css: &str, start: usize) -> Option<UrlToken> {
    let bytes = css.as_bytes();
    let mut i = start + 3;

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b'(' {
        return None;
    }
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    if i < bytes.len() && (bytes[i] == b'\'' || bytes[i] == b'"') {
        let quote = bytes[i];
        i += 1;
        let ref_start = i;
        while i < bytes.len() && bytes[i] != quote {
            i += if bytes[i] == b'\\' { 2 } else { 1 };
        }
        if i >= bytes.len() {
            return None;
        }
        let reference = css[ref_start..i].to_string();
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b')' {
            return None;
        }
        Some(UrlToken {
            reference,
            end: i + 1,
        })
    } else {
        let ref_start = i;
        while i < bytes.len() && bytes[i] != b')' {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        Some(UrlToken {
            reference: css[ref_start..i].trim().to_string(),
            end: i + 1,
        })
    }
}

/// Decide what a reference becomes. `None` means "leave as written".
fn rewrite_reference(reference: &str, base: &Url, mode: UrlMode) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with("data:") || reference.starts_with('#') {
        return None;
    }
    let absolute = base.join(reference).ok()?;
    match mode {
        UrlMode::AbsoluteAll => Some(absolute.to_string()),
        UrlMode::PreserveRemote => {
            let has_own_host = reference.starts_with("//")
                || Url::parse(reference)
                    .map(|parsed| parsed.has_host())
                    .unwrap_or(false);
            if has_own_host && absolute.host_str() != base.host_str() {
                None
            } else {
                Some(absolute.to_string())
            }
        }
    }
}
