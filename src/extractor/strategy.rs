use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::extractor::model::normalize_whitespace;

/// One way of pulling a value out of a parsed document. Field extraction
/// walks an ordered list of these and keeps the first non-empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Text of the document `<title>`. Titles nested in inline SVG are not
    /// the page title.
    TitleElement,
    /// `content` of `<meta property="...">` in the head.
    MetaProperty(&'static str),
    /// `content` of `<meta name="...">` in the head.
    MetaName(&'static str),
    /// `content` of a head `<meta>` keyed by either `property` or `name`.
    MetaPropertyOrName(&'static str),
    /// `href` of a head `<link>` whose `rel` is exactly the given value.
    LinkRel(&'static str),
    /// `href` of any `<link>` whose `rel` contains the given substring.
    LinkRelContaining(&'static str),
}

pub const TITLE: &[Strategy] = &[Strategy::TitleElement, Strategy::MetaProperty("og:title")];

pub const DESCRIPTION: &[Strategy] = &[
    Strategy::MetaProperty("og:description"),
    Strategy::MetaName("description"),
];

pub const ICON: &[Strategy] = &[
    Strategy::LinkRel("apple-touch-icon"),
    Strategy::LinkRel("icon"),
    Strategy::MetaProperty("og:image"),
    Strategy::MetaPropertyOrName("twitter:image"),
];

/// Catches non-standard rel values such as `shortcut icon`.
pub const ICON_FALLBACK: &[Strategy] = &[Strategy::LinkRelContaining("icon")];

impl Strategy {
    /// First non-empty value this strategy finds.
    pub fn apply(&self, document: &Html) -> Option<String> {
        self.values(document).into_iter().next()
    }

    /// Every non-empty value this strategy finds, in document order.
    pub fn values(&self, document: &Html) -> Vec<String> {
        let Some(selector) = self.selector() else {
            return Vec::new();
        };

        document
            .select(&selector)
            .filter_map(|element| self.value_of(element))
            .filter(|value| !value.is_empty())
            .collect()
    }

    fn selector(&self) -> Option<Selector> {
        let css = match self {
            Self::TitleElement => "head > title".to_string(),
            Self::MetaProperty(property) => format!(r#"head meta[property="{property}"]"#),
            Self::MetaName(name) => format!(r#"head meta[name="{name}"]"#),
            Self::MetaPropertyOrName(key) => {
                format!(r#"head meta[property="{key}"], head meta[name="{key}"]"#)
            }
            Self::LinkRel(rel) => format!(r#"head link[rel="{rel}"]"#),
            Self::LinkRelContaining(_) => "link[rel][href]".to_string(),
        };

        match Selector::parse(&css) {
            Ok(selector) => Some(selector),
            Err(err) => {
                debug!(strategy = ?self, error = %err, "selector rejected, strategy skipped");
                None
            }
        }
    }

    fn value_of(&self, element: ElementRef<'_>) -> Option<String> {
        let attrs = element.value();
        match self {
            Self::TitleElement => Some(normalize_whitespace(&element.text().collect::<String>())),
            Self::MetaProperty(_) | Self::MetaName(_) | Self::MetaPropertyOrName(_) => {
                attrs.attr("content").map(normalize_whitespace)
            }
            Self::LinkRel(_) => attrs.attr("href").map(|href| href.trim().to_string()),
            Self::LinkRelContaining(needle) => attrs
                .attr("rel")
                .filter(|rel| rel.contains(needle))
                .and(attrs.attr("href"))
                .map(|href| href.trim().to_string()),
        }
    }
}

/// Walks `chain` in order and returns the first value any strategy yields.
pub fn first_value(chain: &[Strategy], document: &Html) -> Option<String> {
    chain.iter().find_map(|strategy| strategy.apply(document))
}
