use crate::fetcher::types::{FetchMode, FetchedBody};
use bytes::Bytes;
use encoding_rs::Encoding;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

static META_HTTP_EQUIV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+[^>]*?http-equiv\s*=\s*["']?content-type["']?[^>]*?content\s*=\s*["']?[^"'>]*?charset\s*=\s*([^"'\s;/>]+)"#).unwrap()
});

/// Number of leading bytes scanned for `<meta>` charset hints.
const SNIFF_WINDOW: usize = 4096;

pub fn process_body(mode: FetchMode, content_type: Option<&str>, body_bytes: Bytes) -> FetchedBody {
    match mode {
        FetchMode::Binary => FetchedBody::Binary(body_bytes),
        FetchMode::Text => {
            let encoding = detect_charset(content_type.unwrap_or_default(), &body_bytes);
            FetchedBody::Text(decode_to_utf8(&body_bytes, encoding))
        }
    }
}

fn detect_charset(content_type: &str, body_bytes: &[u8]) -> &'static Encoding {
    // 1. Content-Type header
    if let Some(encoding) = label_from(&CHARSET_REGEX, content_type) {
        return encoding;
    }

    // 2. <meta charset> or http-equiv in the first few KB
    let search_bytes = &body_bytes[..body_bytes.len().min(SNIFF_WINDOW)];
    let search_str = String::from_utf8_lossy(search_bytes);

    if let Some(encoding) = label_from(&META_CHARSET_REGEX, &search_str) {
        return encoding;
    }
    if let Some(encoding) = label_from(&META_HTTP_EQUIV_REGEX, &search_str) {
        return encoding;
    }

    // 3. Heuristics
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(search_bytes, false);
    detector.guess(None, true)
}

fn label_from(regex: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = regex.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

fn decode_to_utf8(body_bytes: &[u8], encoding: &'static Encoding) -> String {
    let (decoded, used, had_errors) = encoding.decode(body_bytes);
    if had_errors {
        warn!(encoding = used.name(), "body contained malformed sequences");
    }
    decoded.into_owned()
}
