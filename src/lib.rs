//! # cullcss
//!
//! cullcss looks at what's actually in the DOM of one or more HTML
//! pages and rewrites their stylesheets — inline blocks and linked
//! files alike — down to just the rules those pages exercise. Anything
//! it cannot safely judge (`@import`, `@font-face`, vendor pseudo
//! selectors, unparseable fragments, annotated blocks) is preserved
//! verbatim; when in doubt, it keeps.
//!
//! ## Core Systems
//!
//! - **[`css`]** — structural tokenizer, order-preserving node model,
//!   lenient parser, byte-faithful serializer
//! - **[`dom`]** — HTML facade, stylesheet discovery, selector
//!   evaluation with pseudo-class policy
//! - **[`filter`]** — usage oracle and the rule/at-rule filtering pass,
//!   including keyframes liveness
//! - **[`urls`]** — base-URL resolution and `url(...)` rewriting
//! - **[`fetch`]** — fetch trait, HTTP/file fetcher, optional external
//!   renderer for script-dependent pages
//! - **[`processor`]** — multi-page aggregation and result assembly
//!
//! ## Example
//!
//! ```no_run
//! use cullcss::{Processor, ProcessorOptions};
//!
//! # async fn demo() {
//! let processor = Processor::new(ProcessorOptions::default());
//! let report = processor.process(&["https://example.com/"]).await;
//! for link in &report.links {
//!     println!("{}: {} -> {} bytes", link.href, link.before.len(), link.after.len());
//! }
//! # }
//! ```

pub mod css;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod processor;
pub mod urls;

pub use error::Error;
pub use fetch::{Fetch, Fetched, HttpFetcher, Renderer};
pub use processor::{Failure, InlineResult, LinkResult, Processor, ProcessorOptions, Report};
pub use urls::UrlMode;
