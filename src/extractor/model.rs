use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Summary of a page for link previews. Missing fields are omitted from the
/// serialized form rather than written as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SiteMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Always an absolute `http(s)` or protocol-relative URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl SiteMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.desc.is_none() && self.icon.is_none()
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
