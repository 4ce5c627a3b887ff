use std::fs;
use url::Url;

use crate::extractor::{SiteMetadata, extract};

fn base(url: &str) -> Url {
    Url::parse(url).unwrap()
}

#[test]
fn test_extract_article() {
    let html = fs::read_to_string("src/extractor/tests/fixtures/article.html")
        .expect("Failed to read test fixture");

    let metadata = extract(&base("https://news.example/2024/sample"), &html);

    // <title> wins over og:title
    assert_eq!(metadata.title.as_deref(), Some("Sample Article | News Site"));
    assert_eq!(
        metadata.desc.as_deref(),
        Some("A short summary of the sample article.")
    );
    // apple-touch-icon wins over rel=icon and og:image
    assert_eq!(
        metadata.icon.as_deref(),
        Some("https://news.example/static/apple-touch-icon.png")
    );
}

#[test]
fn test_extract_blog_post() {
    let html = fs::read_to_string("src/extractor/tests/fixtures/blog.html")
        .expect("Failed to read test fixture");

    let metadata = extract(&base("https://blog.example.com/posts/better-software"), &html);

    assert_eq!(metadata.title, None);
    assert_eq!(
        metadata.desc.as_deref(),
        Some("Notes on building better software.")
    );
    assert_eq!(
        metadata.icon.as_deref(),
        Some("https://blog.example.com/images/card.png")
    );
}

#[test]
fn test_og_title_used_without_title_element() {
    let html = r#"<html><head><meta property="og:title" content="Only OG"></head></html>"#;
    let metadata = extract(&base("https://example.com"), html);
    assert_eq!(metadata.title.as_deref(), Some("Only OG"));
}

#[test]
fn test_svg_title_does_not_shadow_og_title() {
    let html = r#"<html><head>
        <link rel="icon" href="favicon.ico">
        <meta property="og:title" content="Page Title">
    </head><body>
        <svg viewBox="0 0 16 16"><title>Menu icon</title><path d="M0 0h16v16H0z"/></svg>
    </body></html>"#;

    let metadata = extract(&base("https://example.com/a/b"), html);
    assert_eq!(metadata.title.as_deref(), Some("Page Title"));

    let empty_title = html.replace("<head>", "<head><title></title>");
    let metadata = extract(&base("https://example.com/a/b"), &empty_title);
    assert_eq!(metadata.title.as_deref(), Some("Page Title"));
}

#[test]
fn test_inline_icon_only_yields_no_icon() {
    let html = r#"<html><head>
        <title>Inline</title>
        <link rel="icon" href="data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==">
    </head></html>"#;

    let metadata = extract(&base("https://example.com/page"), html);

    assert_eq!(metadata.title.as_deref(), Some("Inline"));
    assert_eq!(metadata.icon, None);
}

#[test]
fn test_inline_icon_falls_back_to_rel_containing_icon() {
    let html = r#"<html><head>
        <link rel="icon" href="data:image/svg+xml,%3Csvg%3E%3C/svg%3E">
        <link rel="shortcut icon" href="/favicon.ico">
    </head></html>"#;

    let metadata = extract(&base("https://example.com/page"), html);
    assert_eq!(
        metadata.icon.as_deref(),
        Some("https://example.com/favicon.ico")
    );
}

#[test]
fn test_relative_icon_resolves_against_origin() {
    let html = r#"<html><head><link rel="icon" href="/favicon.ico"></head></html>"#;
    let metadata = extract(&base("https://example.com/page"), html);
    assert_eq!(
        metadata.icon.as_deref(),
        Some("https://example.com/favicon.ico")
    );
}

#[test]
fn test_og_image_before_twitter_image() {
    let html = r#"<html><head>
        <meta property="twitter:image" content="https://example.com/twitter.png">
        <meta property="og:image" content="https://example.com/og.png">
    </head></html>"#;

    let metadata = extract(&base("https://example.com"), html);
    assert_eq!(metadata.icon.as_deref(), Some("https://example.com/og.png"));
}

#[test]
fn test_fields_fail_independently() {
    // Broken markup around the title must not cost us the description.
    let html = r#"<html><head><title></title><meta name="description" content="Still here"><link rel="icon"></head><body><p>unclosed"#;

    let metadata = extract(&base("https://example.com"), html);
    assert_eq!(
        metadata,
        SiteMetadata {
            title: None,
            desc: Some("Still here".to_string()),
            icon: None,
        }
    );
}

#[test]
fn test_non_html_input_is_empty() {
    let metadata = extract(&base("https://example.com"), "\u{0}\u{1}binary garbage\u{7f}");
    assert!(metadata.is_empty());

    let metadata = extract(&base("https://example.com"), "");
    assert!(metadata.is_empty());
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_extract_never_panics(
            html in ".*",
            url in "https://[a-z]+\\.com/.*"
        ) {
            let base = Url::parse(&url).unwrap();
            let _ = extract(&base, &html);
        }

        #[test]
        fn test_icon_never_inline_or_relative(
            href in "[a-z:/._-]{0,40}",
        ) {
            let html = format!(r#"<html><head><link rel="icon" href="{href}"></head></html>"#);
            let metadata = extract(&Url::parse("https://example.com/x").unwrap(), &html);
            if let Some(icon) = metadata.icon {
                prop_assert!(!icon.starts_with("data:"));
                prop_assert!(
                    icon.starts_with("http://") || icon.starts_with("https://") || icon.starts_with("//")
                );
            }
        }
    }
}
