use async_trait::async_trait;
use regex::Regex;
use reqwest::header::ACCEPT;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use super::detector::Inspection;
use super::port::target_url;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Connection to {url} failed")]
    Connect { url: String },

    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),
}

/// A page that answered, as seen by whoever embeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFrame {
    /// Origin of the final document, after redirects.
    pub origin: String,
    pub status: u16,
    pub title: Option<String>,
}

impl LoadedFrame {
    /// Read the document the way an embedder at `embedder_origin` could.
    ///
    /// `None` means there is no embedding page and the document is read
    /// directly.
    pub fn inspect(&self, embedder_origin: Option<&str>) -> Inspection {
        match embedder_origin {
            Some(origin) if origin != self.origin => Inspection::CrossOrigin,
            _ => Inspection::Document {
                title: self.title.clone().unwrap_or_default(),
            },
        }
    }
}

#[async_trait]
pub trait FrameLoader: Send + Sync + 'static {
    async fn load(&self, port: u16) -> Result<LoadedFrame, LoadError>;
}

/// Loads `http://127.0.0.1:<port>` the way a browser frame would, following
/// redirects.
#[derive(Debug, Clone)]
pub struct HttpFrameLoader {
    client: reqwest::Client,
}

impl HttpFrameLoader {
    pub fn new() -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ccui/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .map_err(LoadError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FrameLoader for HttpFrameLoader {
    async fn load(&self, port: u16) -> Result<LoadedFrame, LoadError> {
        let url = target_url(port);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/html")
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    debug!("Connect to {} failed: {}", url, e);
                    LoadError::Connect { url: url.clone() }
                } else {
                    LoadError::Request(e)
                }
            })?;

        let status = response.status().as_u16();
        let origin = response.url().origin().ascii_serialization();
        let body = response.text().await.map_err(LoadError::Request)?;

        let frame = LoadedFrame {
            origin,
            status,
            title: extract_title(&body),
        };
        debug!(
            "Loaded {} (status {}, title {:?})",
            frame.origin, frame.status, frame.title
        );
        Ok(frame)
    }
}

pub(crate) fn extract_title(html: &str) -> Option<String> {
    static TITLE_RE: OnceLock<Regex> = OnceLock::new();
    let title_re = TITLE_RE
        .get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));

    title_re
        .captures(html)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
}
