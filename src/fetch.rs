//! Fetch and render collaborators.
//!
//! The processor talks to the outside world through the narrow
//! [`Fetch`] trait, so tests inject scripted fetchers and the network
//! stack stays swappable. [`HttpFetcher`] is the default: `http(s)://`
//! over the shared client, `file://` straight from disk. Pages whose
//! DOM depends on client-side script go through the optional
//! [`Renderer`], an external headless-browser process that prints the
//! final HTML to stdout.

use std::future::Future;
use std::path::PathBuf;

use url::Url;

use crate::error::Error;

/// Text retrieved for a URL, with the server-reported content type
/// when one exists.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub text: String,
    pub content_type: Option<String>,
}

/// Retrieves the text behind a URL.
pub trait Fetch {
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<Fetched, Error>> + Send;
}

/// Default fetcher: `http(s)://` and `file://`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cullcss/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|err| {
                log::warn!("falling back to default HTTP client: {err}");
                reqwest::Client::new()
            });
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<Fetched, Error> {
        let parsed = Url::parse(url).map_err(|source| Error::InvalidUrl {
            input: url.to_string(),
            source,
        })?;

        match parsed.scheme() {
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|()| Error::fetch(url, "not a local file path"))?;
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|err| Error::fetch(url, err.to_string()))?;
                log::debug!("read {} bytes from {}", text.len(), path.display());
                Ok(Fetched {
                    text,
                    content_type: None,
                })
            }
            "http" | "https" => {
                let response = self
                    .client
                    .get(parsed)
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .map_err(|err| Error::fetch(url, err.to_string()))?;
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                let text = response
                    .text()
                    .await
                    .map_err(|err| Error::fetch(url, err.to_string()))?;
                log::debug!("fetched {} bytes from {url}", text.len());
                Ok(Fetched { text, content_type })
            }
            other => Err(Error::fetch(url, format!("unsupported scheme {other:?}"))),
        }
    }
}

/// External rendering collaborator for script-dependent pages.
///
/// The binary is invoked as `binary [args..] URL` and must print the
/// settled DOM as HTML on stdout. Extra args are passed through
/// unchanged (cookie files, profile flags, whatever the engine takes).
#[derive(Debug, Clone)]
pub struct Renderer {
    binary: PathBuf,
    args: Vec<String>,
}

impl Renderer {
    /// Fails fast with [`Error::Config`] when the binary does not
    /// exist, before any fetching begins.
    pub fn new(binary: impl Into<PathBuf>, args: Vec<String>) -> Result<Self, Error> {
        let binary = binary.into();
        if !binary.exists() {
            return Err(Error::Config(format!(
                "renderer binary {} does not exist",
                binary.display()
            )));
        }
        Ok(Self { binary, args })
    }

    /// Render `url` and return the final HTML.
    pub async fn render(&self, url: &str) -> Result<String, Error> {
        log::debug!("rendering {url} via {}", self.binary.display());
        let output = tokio::process::Command::new(&self.binary)
            .args(&self.args)
            .arg(url)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| Error::render(url, err.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::render(
                url,
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        let html = String::from_utf8_lossy(&output.stdout).into_owned();
        if html.trim().is_empty() {
            return Err(Error::render(url, "renderer produced no output"));
        }
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_scheme_reads_from_disk() {
        let dir = std::env::temp_dir().join(format!("cullcss-fetch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.css");
        std::fs::write(&path, "body { margin: 0 }").unwrap();

        let url = Url::from_file_path(&path).unwrap().to_string();
        let fetched = HttpFetcher::new().fetch_text(&url).await.unwrap();
        assert_eq!(fetched.text, "body { margin: 0 }");
        assert!(fetched.content_type.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let err = HttpFetcher::new()
            .fetch_text("file:///definitely/not/here.css")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_rejected() {
        let err = HttpFetcher::new()
            .fetch_text("ftp://example.com/x.css")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[tokio::test]
    async fn garbage_url_is_invalid() {
        let err = HttpFetcher::new().fetch_text("not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn missing_renderer_binary_fails_fast() {
        let err = Renderer::new("/definitely/not/a/renderer", Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn renderer_captures_stdout() {
        // /bin/echo prints its args (ending with the URL), which is
        // enough to prove the stdout plumbing works.
        let echo = PathBuf::from("/bin/echo");
        if !echo.exists() {
            return;
        }
        let renderer = Renderer::new(echo, vec!["<html>rendered</html>".into()]).unwrap();
        let html = renderer.render("http://example.com/").await.unwrap();
        assert!(html.contains("rendered"));
    }
}
