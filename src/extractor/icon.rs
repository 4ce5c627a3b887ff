use url::Url;

/// Inline `data:` URIs are never propagated as icons.
pub fn is_inline(icon: &str) -> bool {
    icon.get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// `http://`, `https://` or protocol-relative `//`.
pub fn is_absolute(icon: &str) -> bool {
    let lower = icon.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

/// Makes an icon reference absolute by joining it onto the origin of
/// `base_url`. References that resolve to a non-http scheme are dropped.
pub fn resolve_icon(base_url: &Url, icon: &str) -> Option<String> {
    if is_absolute(icon) {
        return Some(icon.to_string());
    }

    let origin = Url::parse(&base_url.origin().ascii_serialization()).ok()?;
    let resolved = origin.join(icon).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.into()),
        _ => None,
    }
}
