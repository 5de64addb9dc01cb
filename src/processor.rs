//! Multi-page aggregation: discover stylesheets, drive the filter,
//! assemble before/after results.
//!
//! One [`Processor::process`] call owns everything it creates — DOM
//! trees, verdict caches, results — and frees it on return; nothing is
//! shared across invocations. Fetches fan out concurrently on a
//! `JoinSet` and are re-collected by input index, so `inlines` and
//! `links` come back in document / first-seen order no matter which
//! fetch finished first. Dropping the returned future cancels all
//! in-flight work.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::css::parser;
use crate::css::serializer;
use crate::dom::matcher::{ScraperMatcher, SelectorMatcher};
use crate::dom::{inline_style_blocks, Document};
use crate::error::Error;
use crate::fetch::{Fetch, Fetched, HttpFetcher, Renderer};
use crate::filter::filter_stylesheet;
use crate::urls::{make_absolute_url, rewrite_sheet_urls, UrlMode};

/// Per-invocation configuration.
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    pub url_mode: UrlMode,
    /// When set, page HTML comes from the renderer instead of the
    /// fetcher. Stylesheet text always comes from the fetcher.
    pub renderer: Option<Renderer>,
}

/// Result for one inline `<style>` block. Blocks are never merged
/// across pages, even when textually identical.
#[derive(Debug, Clone)]
pub struct InlineResult {
    pub page_url: String,
    /// 1-based line of the opening tag in the page source.
    pub line: usize,
    pub before: String,
    pub after: String,
}

/// Result for one distinct linked stylesheet. Identity is the resolved
/// URL; usage is the union over every page that references it.
#[derive(Debug, Clone)]
pub struct LinkResult {
    /// The href as first written in a referencing page.
    pub href: String,
    /// The resolved absolute URL the sheet was fetched from.
    pub url: String,
    pub before: String,
    pub after: String,
}

/// A resource that failed without aborting the rest of the run.
#[derive(Debug)]
pub struct Failure {
    pub url: String,
    pub error: Error,
}

/// Everything one `process` call produced.
#[derive(Debug, Default)]
pub struct Report {
    pub inlines: Vec<InlineResult>,
    pub links: Vec<LinkResult>,
    pub failures: Vec<Failure>,
}

impl Report {
    /// `true` when every page and sheet was processed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives fetching, filtering, and rewriting for a set of pages.
pub struct Processor<F = HttpFetcher> {
    fetcher: Arc<F>,
    options: ProcessorOptions,
}

impl Processor<HttpFetcher> {
    pub fn new(options: ProcessorOptions) -> Self {
        Self::with_fetcher(HttpFetcher::new(), options)
    }
}

impl<F> Processor<F>
where
    F: Fetch + Send + Sync + 'static,
{
    pub fn with_fetcher(fetcher: F, options: ProcessorOptions) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            options,
        }
    }

    /// Process `page_urls` in order and return one result per inline
    /// block and per distinct linked sheet.
    ///
    /// A fetch or render failure isolates to its resource: the failing
    /// page or sheet becomes a [`Failure`] entry and everything else
    /// still produces results.
    pub async fn process<S: AsRef<str>>(&self, page_urls: &[S]) -> Report {
        let mut report = Report::default();

        // Fetch every page concurrently, then restore input order.
        let mut page_tasks: JoinSet<(usize, Result<String, Error>)> = JoinSet::new();
        for (index, url) in page_urls.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let renderer = self.options.renderer.clone();
            let url = url.as_ref().to_string();
            page_tasks.spawn(async move {
                let html = match renderer {
                    Some(renderer) => renderer.render(&url).await,
                    None => fetcher.fetch_text(&url).await.map(|fetched| fetched.text),
                };
                (index, html)
            });
        }
        let mut fetched_pages: Vec<Option<Result<String, Error>>> =
            (0..page_urls.len()).map(|_| None).collect();
        while let Some(joined) = page_tasks.join_next().await {
            match joined {
                Ok((index, result)) => fetched_pages[index] = Some(result),
                Err(err) => log::warn!("page task failed: {err}"),
            }
        }

        struct Page {
            url: String,
            html: String,
            dom: Document,
        }
        let mut pages: Vec<Page> = Vec::new();
        for (index, url) in page_urls.iter().enumerate() {
            let url = url.as_ref().to_string();
            match fetched_pages[index].take() {
                Some(Ok(html)) => {
                    let dom = Document::parse(&html);
                    pages.push(Page { url, html, dom });
                }
                Some(Err(error)) => report.failures.push(Failure { url, error }),
                None => {
                    let error = Error::fetch(url.clone(), "page task aborted");
                    report.failures.push(Failure { url, error });
                }
            }
        }

        // Group linked sheets by resolved URL across all pages, in
        // first-seen order.
        struct LinkGroup {
            href: String,
            resolved: String,
            page_indices: Vec<usize>,
        }
        let mut groups: Vec<LinkGroup> = Vec::new();
        let mut slot_by_resolved: HashMap<String, usize> = HashMap::new();
        for (page_index, page) in pages.iter().enumerate() {
            for href in page.dom.stylesheet_hrefs() {
                match make_absolute_url(&page.url, &href) {
                    Ok(resolved) => {
                        let slot = *slot_by_resolved.entry(resolved.clone()).or_insert_with(|| {
                            groups.push(LinkGroup {
                                href: href.clone(),
                                resolved,
                                page_indices: Vec::new(),
                            });
                            groups.len() - 1
                        });
                        if !groups[slot].page_indices.contains(&page_index) {
                            groups[slot].page_indices.push(page_index);
                        }
                    }
                    Err(error) => report.failures.push(Failure { url: href, error }),
                }
            }
        }

        // Fetch each distinct sheet once, concurrently.
        let mut sheet_tasks: JoinSet<(usize, Result<Fetched, Error>)> = JoinSet::new();
        for (slot, group) in groups.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let url = group.resolved.clone();
            sheet_tasks.spawn(async move { (slot, fetcher.fetch_text(&url).await) });
        }
        let mut sheets: Vec<Option<Result<Fetched, Error>>> =
            (0..groups.len()).map(|_| None).collect();
        while let Some(joined) = sheet_tasks.join_next().await {
            match joined {
                Ok((slot, result)) => sheets[slot] = Some(result),
                Err(err) => log::warn!("stylesheet task failed: {err}"),
            }
        }

        let matcher = ScraperMatcher;

        // Inline blocks: page order, each judged against its own page
        // only.
        for page in &pages {
            for block in inline_style_blocks(&page.html) {
                let doms = [&page.dom];
                let after = minimize(&block.text, &doms, &matcher, &page.url, self.options.url_mode);
                report.inlines.push(InlineResult {
                    page_url: page.url.clone(),
                    line: block.line,
                    before: block.text,
                    after,
                });
            }
        }

        // Linked sheets: first-seen order, each judged against the
        // union of its referencing pages.
        for (slot, group) in groups.iter().enumerate() {
            match sheets[slot].take() {
                Some(Ok(fetched)) => {
                    if let Some(content_type) = &fetched.content_type {
                        if !content_type.contains("css") {
                            log::warn!(
                                "{} served as {content_type}, processing anyway",
                                group.resolved
                            );
                        }
                    }
                    let doms: Vec<&Document> = group
                        .page_indices
                        .iter()
                        .map(|&index| &pages[index].dom)
                        .collect();
                    let after = minimize(
                        &fetched.text,
                        &doms,
                        &matcher,
                        &group.resolved,
                        self.options.url_mode,
                    );
                    report.links.push(LinkResult {
                        href: group.href.clone(),
                        url: group.resolved.clone(),
                        before: fetched.text,
                        after,
                    });
                }
                Some(Err(error)) => report.failures.push(Failure {
                    url: group.resolved.clone(),
                    error,
                }),
                None => {
                    let error = Error::fetch(group.resolved.clone(), "stylesheet task aborted");
                    report.failures.push(Failure {
                        url: group.resolved.clone(),
                        error,
                    });
                }
            }
        }

        report
    }
}

/// Parse, filter, rewrite, serialize: the whole pipeline for one sheet.
fn minimize<M: SelectorMatcher>(
    css: &str,
    doms: &[&Document],
    matcher: &M,
    base_url: &str,
    mode: UrlMode,
) -> String {
    let sheet = parser::parse(css);
    let mut filtered = filter_stylesheet(&sheet, doms, matcher);
    rewrite_sheet_urls(&mut filtered, base_url, mode);
    serializer::serialize(&filtered)
}
