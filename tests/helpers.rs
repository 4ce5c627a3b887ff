use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use std::{num::NonZeroUsize, sync::Arc};
use tower::ServiceExt;

use siteinfo::{
    api::{self, referer::RefererPolicy},
    app_state::AppState,
    cache,
    dispatcher::Dispatcher,
    fetcher::{FetcherConfig, HttpFetcher},
};

pub fn test_app(allowed_hosts: &[&str]) -> Router {
    test_app_with(allowed_hosts, FetcherConfig::default())
}

pub fn test_app_with(allowed_hosts: &[&str], fetcher: FetcherConfig) -> Router {
    let fetcher = HttpFetcher::new(fetcher).expect("Failed to build fetcher");
    let state = AppState {
        dispatcher: Arc::new(Dispatcher::new(
            Arc::new(fetcher),
            NonZeroUsize::new(64).unwrap(),
            cache::DEFAULT_MAX_BYTES,
        )),
        referer_policy: Arc::new(RefererPolicy::new(allowed_hosts.iter().copied())),
    };

    api::router(state)
}

pub fn lookup_uri(kind: Option<&str>, url: &str) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(kind) = kind {
        query.append_pair("type", kind);
    }
    query.append_pair("url", url);
    format!("/api/v1?{}", query.finish())
}

pub async fn get(app: &Router, uri: &str, referer: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().method("GET").uri(uri);
    if let Some(referer) = referer {
        request = request.header("referer", referer);
    }

    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
