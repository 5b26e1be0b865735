use std::time::Duration;

use docket::fetcher::{Charset, FetchError, HttpTransport, Transport, fetch_page};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_fetch_page_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/board"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(
                    "<html><head><title>Board</title></head><body>Voting minutes</body></html>"
                        .as_bytes(),
                )
                .insert_header("Content-Type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/board", mock_server.uri());
    let result = fetch_page(&HttpTransport::new(), &url, TIMEOUT).await.unwrap();

    assert!(result.status.is_success());
    assert!(result.body_utf8.contains("Voting minutes"));
    assert_eq!(result.url_final.as_str(), url);
    assert_eq!(result.charset, Charset::Utf8);
}

#[tokio::test]
async fn test_fetch_page_decodes_legacy_charset() {
    let mock_server = MockServer::start().await;

    // "Décision" in windows-1252
    let body = b"<html><body>D\xe9cision</body></html>".to_vec();
    Mock::given(method("GET"))
        .and(path("/legacy"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("Content-Type", "text/html; charset=windows-1252"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/legacy", mock_server.uri());
    let result = fetch_page(&HttpTransport::new(), &url, TIMEOUT).await.unwrap();

    assert!(result.body_utf8.contains("Décision"));
}

#[tokio::test]
async fn test_fetch_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notfound"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = format!("{}/notfound", mock_server.uri());
    let result = HttpTransport::new().fetch(&url, TIMEOUT).await;

    match result {
        Err(FetchError::Http { status, retriable }) => {
            assert_eq!(status.as_u16(), 404);
            assert!(!retriable);
        }
        _ => panic!("Expected HTTP 404 error"),
    }
}

#[tokio::test]
async fn test_fetch_503_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let url = format!("{}/error", mock_server.uri());
    let result = HttpTransport::new().fetch(&url, TIMEOUT).await;

    match result {
        Err(FetchError::Http { status, retriable }) => {
            assert_eq!(status.as_u16(), 503);
            assert!(retriable);
        }
        _ => panic!("Expected HTTP 503 error"),
    }
}

#[tokio::test]
async fn test_fetch_redirect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redirect"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/final"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("<html><body>Final page</body></html>".as_bytes())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/redirect", mock_server.uri());
    let result = fetch_page(&HttpTransport::new(), &url, TIMEOUT).await.unwrap();

    assert!(result.body_utf8.contains("Final page"));
    assert!(result.url_final.as_str().ends_with("/final"));
}

#[tokio::test]
async fn test_fetch_timeout_is_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("%PDF-1.4".as_bytes())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/slow", mock_server.uri());
    let err = HttpTransport::new()
        .fetch(&url, Duration::from_millis(200))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RequestTimeout));
    assert!(err.should_retry());
}

#[tokio::test]
async fn test_fetch_pdf_bytes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/minutes.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4 body".to_vec())
                .insert_header("Content-Type", "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/minutes.pdf", mock_server.uri());
    let fetched = HttpTransport::new().fetch(&url, TIMEOUT).await.unwrap();

    assert_eq!(fetched.content_type(), Some("application/pdf"));
    assert_eq!(&fetched.body[..], b"%PDF-1.4 body");
}

#[tokio::test]
async fn test_fetch_page_rejects_documents() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/minutes.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4".to_vec())
                .insert_header("Content-Type", "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/minutes.pdf", mock_server.uri());
    let result = fetch_page(&HttpTransport::new(), &url, TIMEOUT).await;

    match result {
        Err(FetchError::UnsupportedContentType(content_type)) => {
            assert_eq!(content_type, "application/pdf");
        }
        _ => panic!("Expected UnsupportedContentType error"),
    }
}

#[tokio::test]
async fn test_fetch_page_too_large() {
    let mock_server = MockServer::start().await;

    // 6MB > 5MB page limit
    let large_body = "x".repeat(6 * 1024 * 1024);

    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(large_body.as_bytes())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/large", mock_server.uri());
    let result = fetch_page(&HttpTransport::new(), &url, TIMEOUT).await;

    match result {
        Err(FetchError::BodyTooLarge(size)) => {
            assert_eq!(size, 6 * 1024 * 1024);
        }
        _ => panic!("Expected BodyTooLarge error"),
    }
}

#[tokio::test]
async fn test_document_size_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/huge.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![b'x'; 4096])
                .insert_header("Content-Type", "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/huge.pdf", mock_server.uri());
    let err = HttpTransport::new()
        .with_max_body_size(1024)
        .fetch(&url, TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::BodyTooLarge(4096)));
    assert!(!err.should_retry());
}

#[tokio::test]
async fn test_fetch_invalid_url() {
    let result = fetch_page(&HttpTransport::new(), "not-a-valid-url", TIMEOUT).await;

    match result {
        Err(FetchError::InvalidUrl(_)) => {}
        _ => panic!("Expected InvalidUrl error"),
    }
}
