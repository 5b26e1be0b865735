#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

use docket::fetcher::{FetchError, FetchedBody, Transport};
use docket::repositories::{DocumentStore, StoreError};

/// One scripted answer of the stub transport.
#[derive(Debug, Clone)]
pub enum Reply {
    Html(String),
    Pdf(Vec<u8>),
    Status(u16),
    Timeout,
    /// Body refused by the size cap.
    TooLarge(u64),
}

/// Transport that answers from a script and records every call.
///
/// Each URL has a queue of replies; the last reply repeats once the queue is
/// down to one entry. Unknown URLs get a 404.
#[derive(Default)]
pub struct StubTransport {
    script: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into_iter().collect());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut script = self.script.lock().unwrap();
        match script.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Status(404)),
            None => Reply::Status(404),
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<FetchedBody, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let url_final = Url::parse(url)?;

        let (content_type, body) = match self.next_reply(url) {
            Reply::Html(html) => ("text/html; charset=utf-8", html.into_bytes()),
            Reply::Pdf(bytes) => ("application/pdf", bytes),
            Reply::Status(code) => {
                let status = StatusCode::from_u16(code).unwrap();
                return Err(FetchError::from_status(status));
            }
            Reply::Timeout => return Err(FetchError::RequestTimeout),
            Reply::TooLarge(size) => return Err(FetchError::BodyTooLarge(size)),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Ok(FetchedBody {
            url_final,
            status: StatusCode::OK,
            headers,
            body: Bytes::from(body),
        })
    }
}

/// Document store kept in memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.documents.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.documents.lock().unwrap().contains_key(name))
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> Result<u64, StoreError> {
        self.documents
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(bytes.len() as u64)
    }
}

/// Smallest structurally valid PDF: header, two objects, xref, trailer.
pub fn minimal_pdf() -> Vec<u8> {
    let mut pdf = b"%PDF-1.4\n".to_vec();
    pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    pdf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    let xref = pdf.len();
    pdf.extend_from_slice(b"xref\n0 3\n0000000000 65535 f \n");
    pdf.extend_from_slice(
        format!("trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n", xref).as_bytes(),
    );
    pdf
}
