pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

pub use client::{HttpTransport, Transport, fetch_page, get_client};
pub use errors::FetchError;
pub use types::{Charset, FetchedBody, PageResponse};

#[cfg(test)]
pub use client::MockTransport;
