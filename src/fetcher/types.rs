use bytes::Bytes;
use reqwest::StatusCode;
use url::Url;

/// How the body of a successful response is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Decode to UTF-8 text (HTML pages).
    Text,
    /// Keep the raw bytes untouched.
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedBody {
    Text(String),
    Binary(Bytes),
}

impl FetchedBody {
    /// Length in bytes; for text, of the decoded UTF-8.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text view of the body. Binary bodies are decoded lossily.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// A `200 OK` response reached after following any redirects.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// URL of the hop that answered `200`; differs from the requested URL
    /// when redirects were followed.
    pub url_final: Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub redirects: usize,
    pub body: FetchedBody,
}
