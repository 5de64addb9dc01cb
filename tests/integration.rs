//! Integration tests for cullcss.
//!
//! These exercise the public API from outside the crate over `file://`
//! fixtures, covering the full pipeline: fetch, DOM parse, filter,
//! URL rewrite, result assembly.

use std::path::Path;

use cullcss::{Processor, ProcessorOptions, Report};

fn fixture_url(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    format!("file://{}", path.display())
}

async fn process(pages: &[&str]) -> Report {
    let urls: Vec<String> = pages.iter().map(|p| fixture_url(p)).collect();
    Processor::new(ProcessorOptions::default())
        .process(&urls)
        .await
}

// ---------------------------------------------------------------------------
// Inline stylesheets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inline_block_at_line_seven_loses_its_unused_rule() {
    let report = process(&["one.html"]).await;
    assert!(report.is_complete());
    assert_eq!(report.inlines.len(), 1);

    let inline = &report.inlines[0];
    assert_eq!(inline.line, 7);
    assert!(inline.after.len() < inline.before.len());
    assert!(inline.after.contains("h1, h2, h3 { text-align: center; }"));
    assert!(inline.after.contains("h3 { font-family: serif; }"));
    assert!(inline.after.contains("h2 { color:red }"));
    assert!(!inline.after.contains(".unused-banner"));
}

// ---------------------------------------------------------------------------
// Linked sheets shared across pages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shared_sheet_usage_is_the_union_of_referencing_pages() {
    let report = process(&["shared_a.html", "shared_b.html"]).await;
    assert!(report.is_complete());
    assert_eq!(report.links.len(), 1, "one result per distinct resolved URL");

    let link = &report.links[0];
    assert_eq!(link.href, "shared.css");
    assert!(link.after.contains(".x"));
    assert!(link.after.contains(".y"));
    assert!(!link.after.contains(".z"));
}

#[tokio::test]
async fn single_page_processing_narrows_the_same_sheet_further() {
    let report = process(&["shared_a.html"]).await;
    let link = &report.links[0];
    assert!(link.after.contains(".x"));
    assert!(!link.after.contains(".y"));
    assert!(!link.after.contains(".z"));
}

// ---------------------------------------------------------------------------
// URL rewriting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preserve_remote_resolves_local_refs_and_keeps_remote_ones() {
    let report = process(&["assets.html"]).await;
    assert!(report.is_complete());

    let link = &report.links[0];
    let absolute_bg = fixture_url("img/bg.png");
    assert!(
        link.after.contains(&format!("url(\"{absolute_bg}\")")),
        "relative reference must resolve against the sheet URL: {}",
        link.after
    );
    assert!(
        link.after.contains("url('http://www.google.com/north.png')"),
        "remote reference must keep its original bytes: {}",
        link.after
    );
}

// ---------------------------------------------------------------------------
// Partial failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_sheet_is_reported_without_aborting_the_run() {
    let report = process(&["broken.html"]).await;
    assert!(!report.is_complete());
    assert_eq!(report.links.len(), 1);
    assert_eq!(report.links[0].href, "shared.css");
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].url.ends_with("nope.css"));
}

// ---------------------------------------------------------------------------
// Result invariants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_result_is_brace_balanced() {
    let report = process(&["one.html", "shared_a.html", "shared_b.html", "assets.html"]).await;
    for text in report
        .inlines
        .iter()
        .map(|i| &i.after)
        .chain(report.links.iter().map(|l| &l.after))
    {
        assert_eq!(
            text.matches('{').count(),
            text.matches('}').count(),
            "unbalanced braces in {text:?}"
        );
    }
}

#[tokio::test]
async fn filtering_never_grows_a_sheet_without_url_rewrites() {
    // one.html's inline block and shared.css contain no url() refs, so
    // the pure-filtering monotonicity bound applies to them.
    let report = process(&["one.html", "shared_a.html"]).await;
    for inline in &report.inlines {
        assert!(inline.after.len() <= inline.before.len());
    }
    for link in &report.links {
        assert!(link.after.len() <= link.before.len());
    }
}
