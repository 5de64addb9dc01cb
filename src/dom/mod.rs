//! DOM facade and stylesheet discovery.
//!
//! Wraps the HTML parser behind [`Document`] and locates the two kinds
//! of stylesheet a page can carry: inline `<style>` blocks and
//! `<link rel="stylesheet">` references. Inline blocks are found by
//! scanning the raw HTML text rather than the parsed tree, because the
//! reported 1-based line number of the opening tag must be exact and
//! DOM parsers do not preserve source positions.

pub mod matcher;

use scraper::{Html, Selector};

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse HTML text. Lenient: malformed markup yields whatever tree
    /// the parser can recover, never an error.
    pub fn parse(html_text: &str) -> Self {
        Self {
            html: Html::parse_document(html_text),
        }
    }

    /// The underlying parsed tree.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Hrefs of `<link rel="stylesheet">` elements, in document order.
    ///
    /// Empty and `data:` hrefs are skipped. The `rel` attribute is
    /// treated as a whitespace-separated, case-insensitive token list.
    pub fn stylesheet_hrefs(&self) -> Vec<String> {
        let Ok(link) = Selector::parse("link") else {
            return Vec::new();
        };
        self.html
            .select(&link)
            .filter(|el| {
                el.value().attr("rel").is_some_and(|rel| {
                    rel.split_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("stylesheet"))
                })
            })
            .filter_map(|el| el.value().attr("href"))
            .filter(|href| !href.is_empty() && !href.starts_with("data:"))
            .map(str::to_string)
            .collect()
    }
}

/// An inline `<style>` block located in raw HTML text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineBlock {
    /// 1-based line of the opening `<style` tag.
    pub line: usize,
    /// The CSS text between the tags, verbatim.
    pub text: String,
}

/// Locate every inline `<style>` block in `html_text`, in document
/// order. An unclosed block extends to the end of the input.
pub fn inline_style_blocks(html_text: &str) -> Vec<InlineBlock> {
    let lower = html_text.to_ascii_lowercase();
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find("<style") {
        let tag_start = cursor + found;
        let after_name = tag_start + "<style".len();

        // Require a real tag: `<style>`, `<style ...>`, or `<style/>`.
        match lower.as_bytes().get(after_name).copied() {
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/') => {}
            _ => {
                cursor = after_name;
                continue;
            }
        }

        let Some(open_end) = lower[after_name..].find('>') else {
            break;
        };
        let content_start = after_name + open_end + 1;

        let content_end = lower[content_start..]
            .find("</style")
            .map(|i| content_start + i)
            .unwrap_or(html_text.len());

        let line = 1 + html_text[..tag_start]
            .bytes()
            .filter(|&b| b == b'\n')
            .count();
        blocks.push(InlineBlock {
            line,
            text: html_text[content_start..content_end].to_string(),
        });

        cursor = content_end;
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Link discovery ───────────────────────────────────────────────

    #[test]
    fn finds_stylesheet_links_in_order() {
        let doc = Document::parse(
            r#"<html><head>
            <link rel="stylesheet" href="a.css">
            <link rel="icon" href="favicon.ico">
            <link rel="StyleSheet" href="b.css">
            </head><body></body></html>"#,
        );
        assert_eq!(doc.stylesheet_hrefs(), vec!["a.css", "b.css"]);
    }

    #[test]
    fn skips_empty_and_data_hrefs() {
        let doc = Document::parse(
            r#"<html><head>
            <link rel="stylesheet" href="">
            <link rel="stylesheet" href="data:text/css,body{}">
            <link rel="stylesheet" href="real.css">
            </head></html>"#,
        );
        assert_eq!(doc.stylesheet_hrefs(), vec!["real.css"]);
    }

    #[test]
    fn rel_token_list_is_honored() {
        let doc = Document::parse(r#"<link rel="alternate stylesheet" href="alt.css">"#);
        assert_eq!(doc.stylesheet_hrefs(), vec!["alt.css"]);
    }

    // ── Inline block discovery ───────────────────────────────────────

    #[test]
    fn inline_block_line_is_one_based() {
        let html = "<html>\n<head>\n<style>\nh1 { x: y }\n</style>\n</head>\n</html>";
        let blocks = inline_style_blocks(html);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].line, 3);
        assert_eq!(blocks[0].text, "\nh1 { x: y }\n");
    }

    #[test]
    fn multiple_blocks_in_document_order() {
        let html = "<style>a{}</style>\n<p>x</p>\n<style type=\"text/css\">b{}</style>";
        let blocks = inline_style_blocks(html);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "a{}");
        assert_eq!(blocks[0].line, 1);
        assert_eq!(blocks[1].text, "b{}");
        assert_eq!(blocks[1].line, 3);
    }

    #[test]
    fn style_prefix_words_are_not_tags() {
        // <styled-widget> must not be mistaken for a style tag.
        let blocks = inline_style_blocks("<styled-widget>text</styled-widget>");
        assert!(blocks.is_empty());
    }

    #[test]
    fn unclosed_block_extends_to_eof() {
        let blocks = inline_style_blocks("<style>h1 { x: y }");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "h1 { x: y }");
    }

    #[test]
    fn case_insensitive_tags() {
        let blocks = inline_style_blocks("<STYLE>a{}</STYLE>");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "a{}");
    }
}
