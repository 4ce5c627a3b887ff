use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{CONTENT_LOCATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, info};
use utoipa::IntoParams;

use crate::{
    app_state::AppState,
    dispatcher::{FileInfo, Payload},
};

/// Directive for the CDN in front of the service, unrelated to the
/// in-process cache.
pub static CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");
pub const CDN_MAX_AGE: &str = "max-age=604800";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SiteInfoQuery {
    /// `site` (default), `voice` or `file`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Target URL; must start with `http`.
    #[serde(default)]
    pub url: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1",
    tag = "siteinfo",
    params(SiteInfoQuery),
    responses(
        (status = 200, description = "Site metadata as JSON, the raw file for `type=file`, or `{}` when nothing could be extracted", body = crate::dispatcher::SiteInfo),
    )
)]
pub async fn site_info(
    State(state): State<AppState>,
    query: Result<Query<SiteInfoQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            debug!(error = %rejection, "query string rejected");
            return empty_object(HeaderMap::new());
        }
    };

    let kind = query.kind.as_deref().unwrap_or_default();
    let url = query.url.as_deref().unwrap_or_default();

    match state.dispatcher.handle(kind, url).await {
        Ok(Payload::Site(info)) => (cdn_headers(), Json(info.as_ref())).into_response(),
        Ok(Payload::File(file)) => file_response(&file),
        Err(err) if err.is_invalid_input() => empty_object(HeaderMap::new()),
        Err(err) => {
            info!(error = %err, transport = err.is_transport(), "lookup produced nothing");
            empty_object(cdn_headers())
        }
    }
}

fn cdn_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CDN_CACHE_CONTROL.clone(), HeaderValue::from_static(CDN_MAX_AGE));
    headers
}

fn empty_object(headers: HeaderMap) -> Response {
    (headers, Json(serde_json::Map::new())).into_response()
}

fn file_response(file: &FileInfo) -> Response {
    let mut headers = cdn_headers();
    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert(CONTENT_TYPE, content_type);
    match HeaderValue::from_str(&file.url) {
        Ok(location) => {
            headers.insert(CONTENT_LOCATION, location);
        }
        Err(_) => debug!(url = %file.url, "url not representable as a header"),
    }

    (headers, file.file.clone()).into_response()
}
