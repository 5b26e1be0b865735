use crate::fetcher::{
    errors::FetchError,
    pipeline::process_response,
    types::{FetchedBody, PageResponse},
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::instrument;

const MAX_PAGE_SIZE: u64 = 5 * 1024 * 1024; // 5MB
const DEFAULT_MAX_BODY_SIZE: u64 = 50 * 1024 * 1024; // 50MB
const USER_AGENT: &str = "DocketBot/0.1 (+https://github.com/docket-minutes/docket)";

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::ACCEPT,
                reqwest::header::HeaderValue::from_static(
                    "text/html,application/xhtml+xml,application/pdf;q=0.9,*/*;q=0.8",
                ),
            );
            headers
        })
        .build()
        .expect("Failed to build HTTP client")
});

pub fn get_client() -> &'static Client {
    &HTTP_CLIENT
}

/// The network capability: one GET with a bounded timeout.
///
/// Non-success statuses come back as `FetchError::Http`, so callers only see
/// `Ok` for 2xx responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedBody, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    max_body_size: u64,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_client(get_client().clone())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedBody, FetchError> {
        let parsed_url = url::Url::parse(url)?;

        let response = self
            .client
            .get(parsed_url)
            .timeout(timeout)
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        // Check content length before downloading
        if let Some(content_length) = response.content_length()
            && content_length > self.max_body_size
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        let url_final = response.url().clone();
        let headers = response.headers().clone();

        let body = response
            .bytes()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        // Content-Length may be missing or wrong
        if body.len() as u64 > self.max_body_size {
            return Err(FetchError::BodyTooLarge(body.len() as u64));
        }

        Ok(FetchedBody {
            url_final,
            status,
            headers,
            body,
        })
    }
}

/// Fetch an HTML page and decode it to UTF-8.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_page(
    transport: &dyn Transport,
    url: &str,
    timeout: Duration,
) -> Result<PageResponse, FetchError> {
    let fetched = transport.fetch(url, timeout).await?;

    if fetched.body.len() as u64 > MAX_PAGE_SIZE {
        return Err(FetchError::BodyTooLarge(fetched.body.len() as u64));
    }

    let content_type = fetched.content_type().unwrap_or("text/html").to_string();

    // Only HTML pages carry links worth extracting
    if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
        return Err(FetchError::UnsupportedContentType(content_type));
    }

    process_response(
        fetched.url_final,
        fetched.status,
        fetched.headers,
        fetched.body,
        &content_type,
    )
}
