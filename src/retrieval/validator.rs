//! Structural checks on downloaded documents.
//!
//! Servers happily answer a document URL with an HTML login page, an error
//! page with status 200, or a truncated body. None of those may be stored.

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::types::DocumentFormat;

/// Decides whether fetched bytes are a structurally valid document.
pub trait ContentValidator: Send + Sync {
    fn format(&self) -> DocumentFormat;

    fn validate(&self, bytes: &[u8]) -> bool;
}

const HEADER_WINDOW: usize = 1024;
const TRAILER_WINDOW: usize = 1024;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)%PDF-\d\.\d").expect("valid regex"));

static STARTXREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)startxref\s+(\d+)").expect("valid regex"));

static INDIRECT_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)^\d+\s+\d+\s+obj\b").expect("valid regex"));

static XREF_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)(?:^|[\r\n])xref\s").expect("valid regex"));

static XREF_STREAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)/Type\s*/XRef\b").expect("valid regex"));

/// PDF validator.
///
/// A body passes when:
/// - a `%PDF-x.y` header sits in the first kilobyte,
/// - `%%EOF` sits in the last kilobyte,
/// - the document has a cross-reference section,
/// - at least one `obj`/`endobj` pair exists.
///
/// Readers rebuild a broken xref by scanning, so the `startxref` offset is
/// tried relative to the header, then as an absolute offset, and finally any
/// `xref` table or xref stream in the body is accepted. Leading junk and
/// CRLF-rewritten files therefore still pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfValidator;

impl PdfValidator {
    pub fn new() -> Self {
        Self
    }

    fn header_offset(bytes: &[u8]) -> Option<usize> {
        HEADER
            .find(&bytes[..bytes.len().min(HEADER_WINDOW)])
            .map(|m| m.start())
    }

    fn has_eof_marker(bytes: &[u8]) -> bool {
        let tail = &bytes[bytes.len().saturating_sub(TRAILER_WINDOW)..];
        find(tail, b"%%EOF").is_some()
    }

    fn has_cross_reference(bytes: &[u8], header: usize) -> bool {
        if let Some(offset) = Self::startxref_offset(bytes) {
            let candidates = [header.checked_add(offset), Some(offset)];
            if candidates
                .into_iter()
                .flatten()
                .any(|at| Self::points_at_xref(bytes, at))
            {
                return true;
            }
        }

        XREF_TABLE.is_match(bytes) || XREF_STREAM.is_match(bytes)
    }

    fn startxref_offset(bytes: &[u8]) -> Option<usize> {
        let tail_start = bytes.len().saturating_sub(TRAILER_WINDOW);
        let captures = STARTXREF.captures_iter(&bytes[tail_start..]).last()?;
        std::str::from_utf8(&captures[1]).ok()?.parse().ok()
    }

    fn points_at_xref(bytes: &[u8], at: usize) -> bool {
        if at >= bytes.len() {
            return false;
        }
        let target = trim_leading_whitespace(&bytes[at..]);
        target.starts_with(b"xref") || INDIRECT_OBJECT.is_match(target)
    }

    fn has_objects(bytes: &[u8]) -> bool {
        match find(bytes, b" obj") {
            Some(start) => find(&bytes[start..], b"endobj").is_some(),
            None => false,
        }
    }
}

impl ContentValidator for PdfValidator {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn validate(&self, bytes: &[u8]) -> bool {
        let Some(header) = Self::header_offset(bytes) else {
            return false;
        };
        Self::has_eof_marker(bytes)
            && Self::has_cross_reference(bytes, header)
            && Self::has_objects(&bytes[header..])
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn trim_leading_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}
