use axum::{
    Json,
    extract::{Request, State},
    http::header::REFERER,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;
use utoipa::ToSchema;

use crate::app_state::AppState;

const NOTICE_TITLE: &str = "Please deploy your own instance of this service";
const NOTICE_DESC: &str = "This instance only answers requests coming from its configured sites.";

/// Body sent to callers whose referer is not on the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccessNotice {
    pub title: String,
    pub desc: String,
}

impl AccessNotice {
    pub fn self_host() -> Self {
        Self {
            title: NOTICE_TITLE.to_string(),
            desc: NOTICE_DESC.to_string(),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RefererError {
    #[error("referer can not be empty")]
    Missing,

    #[error("referer is not a url: {0}")]
    Malformed(String),

    #[error("referer host not allowed: {0}")]
    NotAllowed(String),
}

/// Allow-list of referer hostnames. The empty string stands for "no referer".
#[derive(Debug, Clone, Default)]
pub struct RefererPolicy {
    allowed: HashSet<String>,
}

impl RefererPolicy {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: hosts
                .into_iter()
                .map(|host| host.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn check(&self, referer: &str) -> Result<(), RefererError> {
        if referer.is_empty() {
            return if self.allowed.contains("") {
                Ok(())
            } else {
                Err(RefererError::Missing)
            };
        }

        let url = Url::parse(referer).map_err(|_| RefererError::Malformed(referer.to_string()))?;
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if self.allowed.contains(&host) {
            Ok(())
        } else {
            Err(RefererError::NotAllowed(host))
        }
    }
}

/// Turns away requests whose referer is not allowed before they reach any
/// handler.
pub async fn referer_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let referer = req
        .headers()
        .get(REFERER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default();

    match state.referer_policy.check(&referer) {
        Ok(()) => {
            info!(referer = %referer, "referer ok");
            next.run(req).await
        }
        Err(err) => {
            warn!(error = %err, "request turned away");
            Json(AccessNotice::self_host()).into_response()
        }
    }
}
