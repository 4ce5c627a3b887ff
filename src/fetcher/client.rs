use crate::fetcher::{
    errors::FetchError,
    pipeline::process_body,
    types::{FetchMode, FetchResponse},
};
use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::{
    Client, ClientBuilder, Response, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, LOCATION},
};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DEFAULT_MAX_BODY_SIZE: u64 = 10 * 1024 * 1024; // 10MB
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "SiteInfoBot/0.1 (+https://github.com/siteinfo/siteinfo)";

const REDIRECT_STATUSES: [StatusCode; 5] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::SEE_OTHER,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

/// Retrieves a URL, following redirects, and hands back the final body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<FetchResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Deadline for a single hop, body included.
    pub timeout: Duration,
    /// Deadline for the whole lookup, every redirect hop included.
    pub deadline: Duration,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
    pub max_body_size: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            deadline: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        // Redirects are walked by hand so the hop limit and the
        // self-redirect rule stay under our control.
        let client = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(FetchError::from_reqwest_error)?;

        Ok(Self { client, config })
    }

    async fn follow(&self, url: &str, mode: FetchMode) -> Result<FetchResponse, FetchError> {
        let mut current = parse_http_url(url)?;

        for hop in 0..=self.config.max_redirects {
            let response = self
                .client
                .get(current.clone())
                .header(ACCEPT, accept_for(mode))
                .send()
                .await
                .map_err(FetchError::from_reqwest_error)?;

            let status = response.status();
            if status == StatusCode::OK {
                info!(%status, redirects = hop, url_final = %current, "fetched");
                return self.read_success(current, hop, mode, response).await;
            }

            if !REDIRECT_STATUSES.contains(&status) {
                info!(%status, "upstream answered without content");
                return Err(FetchError::Http { status });
            }

            let next = next_hop(&current, status, response.headers())?;
            debug!(%status, from = %current, to = %next, "following redirect");
            current = next;
        }

        warn!(max = self.config.max_redirects, "redirect limit reached");
        Err(FetchError::MaxRedirectsExceeded(self.config.max_redirects))
    }

    async fn read_success(
        &self,
        url_final: Url,
        redirects: usize,
        mode: FetchMode,
        mut response: Response,
    ) -> Result<FetchResponse, FetchError> {
        let max = self.config.max_body_size;

        // Check content length before downloading
        if let Some(content_length) = response.content_length()
            && content_length > max
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(str::to_string);

        // Content-Length may be absent or wrong, so the ceiling is also
        // enforced while the body streams in.
        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(FetchError::from_reqwest_error)?
        {
            let received = (body.len() + chunk.len()) as u64;
            if received > max {
                return Err(FetchError::BodyTooLarge(received));
            }
            body.extend_from_slice(&chunk);
        }

        let body = process_body(mode, content_type.as_deref(), body.freeze());

        Ok(FetchResponse {
            url_final,
            status,
            content_type,
            redirects,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url, mode = ?mode))]
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<FetchResponse, FetchError> {
        let deadline = self.config.deadline;
        timeout(deadline, self.follow(url, mode)).await.unwrap_or_else(|_| {
            warn!(?deadline, "lookup deadline exceeded");
            Err(FetchError::RequestTimeout)
        })
    }
}

fn accept_for(mode: FetchMode) -> &'static str {
    match mode {
        FetchMode::Text => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        FetchMode::Binary => "*/*",
    }
}

fn parse_http_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(FetchError::UnsupportedScheme(scheme.to_string())),
    }
}

/// Resolves the `Location` of a redirect response against the URL that
/// produced it.
fn next_hop(current: &Url, status: StatusCode, headers: &HeaderMap) -> Result<Url, FetchError> {
    let bad = |reason: &str| FetchError::BadRedirect {
        status,
        reason: reason.to_string(),
    };

    let location = headers
        .get(LOCATION)
        .ok_or_else(|| bad("missing Location header"))?
        .to_str()
        .map_err(|_| bad("Location header is not valid text"))?
        .trim();
    if location.is_empty() {
        return Err(bad("empty Location header"));
    }

    let next = current
        .join(location)
        .map_err(|e| bad(&format!("unparsable Location {location:?}: {e}")))?;
    if &next == current {
        return Err(bad("Location points back at the same URL"));
    }
    match next.scheme() {
        "http" | "https" => Ok(next),
        scheme => Err(FetchError::UnsupportedScheme(scheme.to_string())),
    }
}
