use crate::fetcher::{
    errors::FetchError,
    types::{Charset, PageResponse},
};
use bytes::Bytes;
use chrono::Utc;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::{StatusCode, header::HeaderMap};
use std::sync::LazyLock;
use tracing::warn;
use url::Url;

/// Bytes of the body inspected for `<meta>` charset declarations.
const SNIFF_WINDOW: usize = 4096;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

static META_HTTP_EQUIV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+[^>]*?http-equiv\s*=\s*["']?content-type["']?[^>]*?content\s*=\s*["']?[^"'>]*?charset\s*=\s*([^"'\s;/>]+)"#).unwrap()
});

pub fn process_response(
    url_final: Url,
    status: StatusCode,
    headers: HeaderMap,
    body_bytes: Bytes,
    content_type: &str,
) -> Result<PageResponse, FetchError> {
    let encoding = detect_encoding(content_type, &body_bytes);
    let body_utf8 = decode_to_utf8(&body_bytes, encoding);

    Ok(PageResponse {
        url_final,
        status,
        headers,
        body_raw: body_bytes,
        body_utf8,
        charset: Charset::from_encoding(encoding),
        fetched_at: Utc::now(),
    })
}

fn label_to_encoding(regex: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = regex.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

fn detect_encoding(content_type: &str, body_bytes: &[u8]) -> &'static Encoding {
    // 1. Content-Type header
    if let Some(encoding) = label_to_encoding(&CHARSET_REGEX, content_type) {
        return encoding;
    }

    // 2. <meta charset> / <meta http-equiv> near the top of the document
    let search_bytes = &body_bytes[..body_bytes.len().min(SNIFF_WINDOW)];
    let search_str = String::from_utf8_lossy(search_bytes);
    if let Some(encoding) = label_to_encoding(&META_CHARSET_REGEX, &search_str)
        .or_else(|| label_to_encoding(&META_HTTP_EQUIV_REGEX, &search_str))
    {
        return encoding;
    }

    // 3. Heuristic detection
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(search_bytes, false);
    detector.guess(None, true)
}

/// Undecodable sequences become U+FFFD; a stray byte never loses the page.
fn decode_to_utf8(body_bytes: &[u8], encoding: &'static Encoding) -> String {
    let (decoded, _encoding, had_errors) = encoding.decode(body_bytes);

    if had_errors {
        warn!(
            "Body is not valid {}, undecodable bytes were replaced",
            encoding.name()
        );
    }

    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_charset_from_content_type() {
        let body = b"<html><head><title>Test</title></head></html>";
        let encoding = detect_encoding("text/html; charset=utf-8", body);
        assert_eq!(Charset::from_encoding(encoding), Charset::Utf8);
    }

    #[test]
    fn test_detect_charset_from_meta_tag() {
        let body = b"<html><head><meta charset=\"iso-8859-1\"><title>Test</title></head></html>";
        // ISO-8859-1 is mapped to windows-1252 by encoding_rs
        let encoding = detect_encoding("text/html", body);
        assert_eq!(Charset::from_encoding(encoding), Charset::Windows1252);
    }

    #[test]
    fn test_detect_charset_from_meta_http_equiv() {
        let body = b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1252\"><title>Test</title></head></html>";
        let encoding = detect_encoding("text/html", body);
        assert_eq!(Charset::from_encoding(encoding), Charset::Windows1252);
    }

    #[test]
    fn test_decode_latin1_page() {
        // "Meeting café" in windows-1252
        let body = b"Meeting caf\xe9";
        let decoded = decode_to_utf8(body, encoding_rs::WINDOWS_1252);
        assert_eq!(decoded, "Meeting café");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let body = b"bad \xff\xfe bytes";
        let decoded = decode_to_utf8(body, encoding_rs::UTF_8);
        assert_eq!(decoded, "bad \u{FFFD}\u{FFFD} bytes");
    }

    #[test]
    fn test_stray_byte_keeps_links() {
        let body = Bytes::from_static(
            b"<html><body><a href=\"/m/2026-01-15.pdf\">Minutes \xe9</a></body></html>",
        );
        let page = process_response(
            Url::parse("https://www.example.gov/board").unwrap(),
            StatusCode::OK,
            HeaderMap::new(),
            body,
            "text/html; charset=utf-8",
        )
        .unwrap();

        assert_eq!(page.charset, Charset::Utf8);
        assert!(page.body_utf8.contains(r#"<a href="/m/2026-01-15.pdf">Minutes \u{FFFD}</a>"#));
    }
}
