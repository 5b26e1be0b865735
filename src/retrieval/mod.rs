//! Turning discovered links into stored documents.

pub mod backoff;
pub mod pipeline;
pub mod resolver;
pub mod types;
pub mod validator;

pub use backoff::calculate_backoff_delay;
pub use pipeline::{RetrievalPipeline, RetryPolicy};
pub use resolver::{ResolveError, UrlResolver};
pub use types::{
    DocumentFormat, ErrorKind, RetrievalOutcome, RetrievalRequest, RetrievalStatus,
    RetrievalSummary, canonical_name,
};
pub use validator::{ContentValidator, PdfValidator};
