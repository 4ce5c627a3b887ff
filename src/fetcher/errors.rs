use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("dns failure: {0}")]
    Dns(String),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("request timeout")]
    RequestTimeout,

    #[error("redirect limit of {0} hops exceeded")]
    MaxRedirectsExceeded(usize),

    #[error("unusable redirect {status}: {reason}")]
    BadRedirect {
        status: reqwest::StatusCode,
        reason: String,
    },

    #[error("http error {status}")]
    Http { status: reqwest::StatusCode },

    #[error("body too large ({0} bytes)")]
    BodyTooLarge(u64),

    #[error("io error: {0}")]
    Io(String),

    #[error("unknown: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Whether the failure came from the network layer rather than from what
    /// the upstream answered.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Dns(_)
                | Self::Tls(_)
                | Self::ConnectTimeout
                | Self::RequestTimeout
                | Self::Io(_)
                | Self::Unknown(_)
        )
    }

    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            if err.is_connect() {
                Self::ConnectTimeout
            } else {
                Self::RequestTimeout
            }
        } else if let Some(status) = err.status() {
            Self::Http { status }
        } else if err.is_connect() {
            let message = err.to_string();
            if looks_like_tls(&err) {
                Self::Tls(message)
            } else {
                Self::Dns(message)
            }
        } else if err.is_body() || err.is_decode() {
            Self::Io(err.to_string())
        } else if err.is_request() {
            Self::Dns(err.to_string())
        } else {
            Self::Unknown(err.to_string())
        }
    }
}

fn looks_like_tls(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        let text = inner.to_string().to_ascii_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("handshake") {
            return true;
        }
        source = std::error::Error::source(inner);
    }
    false
}
