use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroUsize, str::FromStr, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    cache::{CacheKey, CacheStats, ResultCache, Weigh},
    extractor::{self, SiteMetadata},
    fetcher::{FetchError, FetchMode, Fetcher},
};

const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// The class of content a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Site,
    /// Reserved; always answered with an empty result.
    Voice,
    File,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Voice => "voice",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = DispatchError;

    /// An empty string means the default, `site`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "" | "site" => Ok(Self::Site),
            "voice" => Ok(Self::Voice),
            "file" => Ok(Self::File),
            other => Err(DispatchError::InvalidType(other.to_string())),
        }
    }
}

/// Page metadata plus the URL the caller originally asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SiteInfo {
    #[serde(flatten)]
    pub metadata: SiteMetadata,
    pub url: String,
}

/// Raw bytes of a remote file plus the URL the caller originally asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub file: Bytes,
    pub url: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Site(Arc<SiteInfo>),
    File(Arc<FileInfo>),
}

impl Weigh for Payload {
    fn weight(&self) -> usize {
        match self {
            Self::Site(info) => {
                let metadata = &info.metadata;
                info.url.len()
                    + [&metadata.title, &metadata.desc, &metadata.icon]
                        .iter()
                        .filter_map(|field| field.as_deref())
                        .map(str::len)
                        .sum::<usize>()
            }
            Self::File(file) => file.file.len() + file.url.len() + file.content_type.len(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("invalid type: {0:?}")]
    InvalidType(String),

    #[error("invalid url: {0:?}")]
    InvalidUrl(String),

    #[error("{0} lookups are not supported")]
    Unsupported(ContentKind),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("no metadata found")]
    NotFound,
}

impl DispatchError {
    /// Rejected before any lookup was attempted.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidType(_) | Self::InvalidUrl(_))
    }

    /// The upstream could not be reached at all, as opposed to answering
    /// with something unusable.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Fetch(err) if err.is_transport())
    }
}

/// Validates a lookup, answers it from the cache when possible and otherwise
/// fetches and extracts.
pub struct Dispatcher {
    fetcher: Arc<dyn Fetcher>,
    cache: ResultCache<CacheKey, Payload>,
}

impl Dispatcher {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        cache_capacity: NonZeroUsize,
        cache_max_bytes: usize,
    ) -> Self {
        Self {
            fetcher,
            cache: ResultCache::new(cache_capacity, cache_max_bytes),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    #[instrument(skip_all, fields(kind = %kind, url = %url))]
    pub async fn handle(&self, kind: &str, url: &str) -> Result<Payload, DispatchError> {
        let kind = kind.parse::<ContentKind>().inspect_err(|err| warn!(%err, "type invalid"))?;
        if !url.starts_with("http") {
            warn!("url invalid");
            return Err(DispatchError::InvalidUrl(url.to_string()));
        }

        let key = CacheKey::new(kind, url);
        if let Some(cached) = self.cache.get(&key) {
            info!("use cache");
            return Ok(cached);
        }

        let payload = match kind {
            ContentKind::Site => self.lookup_site(url).await?,
            ContentKind::File => self.lookup_file(url).await?,
            ContentKind::Voice => return Err(DispatchError::Unsupported(kind)),
        };

        if !self.cache.insert(key, payload.clone()) {
            debug!(weight = payload.weight(), "result too large to cache");
        }
        Ok(payload)
    }

    async fn lookup_site(&self, url: &str) -> Result<Payload, DispatchError> {
        let response = self.fetcher.fetch(url, FetchMode::Text).await?;
        debug!(url_final = %response.url_final, bytes = response.body.len(), "page fetched");
        if response.body.is_empty() {
            return Err(DispatchError::NotFound);
        }

        let metadata = extractor::extract(&response.url_final, &response.body.into_text());
        if metadata.is_empty() {
            return Err(DispatchError::NotFound);
        }

        Ok(Payload::Site(Arc::new(SiteInfo {
            metadata,
            url: url.to_string(),
        })))
    }

    async fn lookup_file(&self, url: &str) -> Result<Payload, DispatchError> {
        let response = self.fetcher.fetch(url, FetchMode::Binary).await?;
        let content_type = response
            .content_type
            .unwrap_or_else(|| DEFAULT_FILE_CONTENT_TYPE.to_string());

        Ok(Payload::File(Arc::new(FileInfo {
            file: response.body.into_bytes(),
            url: url.to_string(),
            content_type,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FetchResponse, FetchedBody, MockFetcher};
    use mockall::predicate::eq;
    use reqwest::StatusCode;
    use url::Url;

    const PAGE: &str = r#"<html><head>
        <title>Example Domain</title>
        <meta name="description" content="An example page">
        <link rel="icon" href="/favicon.ico">
    </head></html>"#;

    fn page_response(url_final: &str, body: FetchedBody) -> FetchResponse {
        FetchResponse {
            url_final: Url::parse(url_final).unwrap(),
            status: StatusCode::OK,
            content_type: None,
            redirects: 0,
            body,
        }
    }

    fn dispatcher(fetcher: MockFetcher) -> Dispatcher {
        Dispatcher::new(Arc::new(fetcher), NonZeroUsize::new(16).unwrap(), 1024 * 1024)
    }

    #[test]
    fn test_content_kind_parsing() {
        assert_eq!("".parse::<ContentKind>().unwrap(), ContentKind::Site);
        assert_eq!("site".parse::<ContentKind>().unwrap(), ContentKind::Site);
        assert_eq!("voice".parse::<ContentKind>().unwrap(), ContentKind::Voice);
        assert_eq!("file".parse::<ContentKind>().unwrap(), ContentKind::File);
        assert!(matches!(
            "Site".parse::<ContentKind>(),
            Err(DispatchError::InvalidType(_))
        ));
    }

    #[test]
    fn test_site_info_serializes_flat() {
        let info = SiteInfo {
            metadata: SiteMetadata {
                title: Some("T".to_string()),
                desc: None,
                icon: Some("https://example.com/i.png".to_string()),
            },
            url: "https://example.com".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            serde_json::json!({
                "title": "T",
                "icon": "https://example.com/i.png",
                "url": "https://example.com"
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_type_never_fetches() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(0);
        let dispatcher = dispatcher(fetcher);

        let result = dispatcher.handle("video", "https://example.com").await;
        assert!(matches!(result, Err(DispatchError::InvalidType(kind)) if kind == "video"));
    }

    #[tokio::test]
    async fn test_invalid_url_never_fetches() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(0);
        let dispatcher = dispatcher(fetcher);

        for url in ["", "ftp://example.com", "example.com", "//example.com"] {
            let result = dispatcher.handle("site", url).await;
            assert!(matches!(result, Err(DispatchError::InvalidUrl(_))), "{url}");
        }
    }

    #[tokio::test]
    async fn test_voice_never_fetches() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(0);
        let dispatcher = dispatcher(fetcher);

        let result = dispatcher.handle("voice", "https://example.com/a.mp3").await;
        assert!(matches!(
            result,
            Err(DispatchError::Unsupported(ContentKind::Voice))
        ));
        assert_eq!(dispatcher.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_site_uses_original_url_and_final_url_for_icons() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq("http://short.test/x"), eq(FetchMode::Text))
            .times(1)
            .returning(|_, _| {
                Ok(page_response(
                    "https://www.example.com/landing",
                    FetchedBody::Text(PAGE.to_string()),
                ))
            });
        let dispatcher = dispatcher(fetcher);

        let Payload::Site(info) = dispatcher.handle("site", "http://short.test/x").await.unwrap()
        else {
            panic!("expected site payload");
        };

        assert_eq!(info.url, "http://short.test/x");
        assert_eq!(info.metadata.title.as_deref(), Some("Example Domain"));
        assert_eq!(info.metadata.desc.as_deref(), Some("An example page"));
        assert_eq!(
            info.metadata.icon.as_deref(),
            Some("https://www.example.com/favicon.ico")
        );
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(1).returning(|url, _| {
            Ok(page_response(url, FetchedBody::Text(PAGE.to_string())))
        });
        let dispatcher = dispatcher(fetcher);

        let first = dispatcher.handle("site", "https://example.com/").await.unwrap();
        let second = dispatcher.handle("site", "https://example.com/").await.unwrap();

        assert_eq!(first, second);
        let (Payload::Site(a), Payload::Site(b)) = (&first, &second) else {
            panic!("expected site payloads");
        };
        assert_eq!(
            serde_json::to_vec(a.as_ref()).unwrap(),
            serde_json::to_vec(b.as_ref()).unwrap()
        );
        assert_eq!(dispatcher.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_empty_metadata_is_not_cached() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(2).returning(|url, _| {
            Ok(page_response(
                url,
                FetchedBody::Text("<html><body>nothing</body></html>".to_string()),
            ))
        });
        let dispatcher = dispatcher(fetcher);

        for _ in 0..2 {
            let result = dispatcher.handle("site", "https://example.com/").await;
            assert!(matches!(result, Err(DispatchError::NotFound)));
        }
        assert_eq!(dispatcher.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_cached() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(2)
            .returning(|_, _| Err(FetchError::MaxRedirectsExceeded(10)));
        let dispatcher = dispatcher(fetcher);

        for _ in 0..2 {
            let result = dispatcher.handle("site", "https://loop.test/").await;
            assert!(matches!(
                result,
                Err(DispatchError::Fetch(FetchError::MaxRedirectsExceeded(10)))
            ));
        }
    }

    #[tokio::test]
    async fn test_file_returns_raw_bytes() {
        let bytes = Bytes::from_static(&[0x89, b'P', b'N', b'G', 0x00, 0xff]);
        let body = bytes.clone();

        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq("https://example.com/logo.png"), eq(FetchMode::Binary))
            .times(1)
            .returning(move |url, _| {
                let mut response = page_response(url, FetchedBody::Binary(body.clone()));
                response.content_type = Some("image/png".to_string());
                Ok(response)
            });
        let dispatcher = dispatcher(fetcher);

        let Payload::File(file) = dispatcher
            .handle("file", "https://example.com/logo.png")
            .await
            .unwrap()
        else {
            panic!("expected file payload");
        };

        assert_eq!(file.file, bytes);
        assert_eq!(file.url, "https://example.com/logo.png");
        assert_eq!(file.content_type, "image/png");

        // cached under the file kind only
        assert!(dispatcher.handle("file", "https://example.com/logo.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_file_over_byte_budget_is_not_cached() {
        let body = Bytes::from(vec![0u8; 2048]);

        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(2).returning(move |url, _| {
            Ok(page_response(url, FetchedBody::Binary(body.clone())))
        });
        let dispatcher =
            Dispatcher::new(Arc::new(fetcher), NonZeroUsize::new(16).unwrap(), 1024);

        for _ in 0..2 {
            let Payload::File(file) = dispatcher
                .handle("file", "https://example.com/big.bin")
                .await
                .unwrap()
            else {
                panic!("expected file payload");
            };
            assert_eq!(file.file.len(), 2048);
            assert_eq!(file.content_type, DEFAULT_FILE_CONTENT_TYPE);
        }
        assert_eq!(dispatcher.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_empty_body_is_not_found() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|url, _| Ok(page_response(url, FetchedBody::Text(String::new()))));
        let dispatcher = dispatcher(fetcher);

        let result = dispatcher.handle("site", "https://example.com/").await;
        assert!(matches!(result, Err(DispatchError::NotFound)));
    }

    #[test]
    fn test_transport_failures_are_flagged() {
        assert!(DispatchError::Fetch(FetchError::ConnectTimeout).is_transport());
        assert!(!DispatchError::Fetch(FetchError::MaxRedirectsExceeded(10)).is_transport());
        assert!(!DispatchError::NotFound.is_transport());
        assert!(!DispatchError::InvalidUrl("ftp://x".to_string()).is_transport());
    }
}
