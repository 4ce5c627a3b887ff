pub mod icon;
pub mod model;
pub mod strategy;

#[cfg(test)]
mod tests;

pub use model::SiteMetadata;

use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

use crate::extractor::strategy::{DESCRIPTION, ICON, ICON_FALLBACK, TITLE, first_value};

/// Pulls title, description and icon out of an HTML document. Each field is
/// resolved on its own; a field that cannot be found is simply absent.
#[instrument(skip_all, fields(base_url = %base_url))]
pub fn extract(base_url: &Url, html: &str) -> SiteMetadata {
    let document = Html::parse_document(html);

    let metadata = SiteMetadata {
        title: first_value(TITLE, &document),
        desc: first_value(DESCRIPTION, &document),
        icon: extract_icon(base_url, &document),
    };

    debug!(
        title = metadata.title.is_some(),
        desc = metadata.desc.is_some(),
        icon = metadata.icon.is_some(),
        "extracted metadata"
    );
    metadata
}

fn extract_icon(base_url: &Url, document: &Html) -> Option<String> {
    // 1. Declared icons and social images
    let declared = first_value(ICON, document).filter(|icon| !icon::is_inline(icon));

    // 2. Any <link> whose rel mentions "icon"
    let icon = declared.or_else(|| {
        ICON_FALLBACK.iter().find_map(|strategy| {
            strategy
                .values(document)
                .into_iter()
                .find(|href| !icon::is_inline(href))
        })
    })?;

    // 3. Absolute URL
    icon::resolve_icon(base_url, &icon)
}
