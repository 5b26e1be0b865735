use thiserror::Error;
use url::Url;

use crate::config::LinkPatterns;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("empty source url")]
    Empty,

    #[error("cannot build an absolute url from '{0}'")]
    NotJoinable(String),

    #[error("unsupported scheme '{scheme}' in {url}")]
    UnsupportedScheme { scheme: String, url: String },

    #[error("share link without a file id: {0}")]
    MissingFileId(String),
}

/// Turns a stored href into the URL that actually serves the bytes.
///
/// Relative hrefs are joined against the base url. Cloud-drive share links
/// (`/file/d/{id}/view`, `open?id={id}`) are rewritten to the direct-download
/// endpoint. Anything else is already direct.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    base: Url,
    share_hosts: Vec<String>,
    direct_download_endpoint: String,
}

impl UrlResolver {
    pub fn new(base: Url, patterns: &LinkPatterns) -> Self {
        Self {
            base,
            share_hosts: patterns
                .share_hosts
                .iter()
                .map(|h| h.to_lowercase())
                .collect(),
            direct_download_endpoint: patterns.direct_download_endpoint.clone(),
        }
    }

    pub fn resolve(&self, source_url: &str) -> Result<Url, ResolveError> {
        let source = source_url.trim();
        if source.is_empty() {
            return Err(ResolveError::Empty);
        }

        let url = self
            .base
            .join(source)
            .map_err(|_| ResolveError::NotJoinable(source.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ResolveError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
                url: url.to_string(),
            });
        }

        if !self.is_share_host(&url) {
            return Ok(url);
        }

        match share_file_id(&url) {
            Some(id) => self.direct_url(&id),
            None => Err(ResolveError::MissingFileId(url.to_string())),
        }
    }

    fn is_share_host(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| host.to_lowercase())
            .is_some_and(|host| self.share_hosts.iter().any(|h| host == *h))
    }

    fn direct_url(&self, id: &str) -> Result<Url, ResolveError> {
        let mut url = Url::parse(&self.direct_download_endpoint)
            .map_err(|_| ResolveError::NotJoinable(self.direct_download_endpoint.clone()))?;
        url.query_pairs_mut().append_pair("id", id);
        Ok(url)
    }
}

/// File id from `/file/d/{id}/...` or an `id=` query parameter.
fn share_file_id(url: &Url) -> Option<String> {
    let from_path = url
        .path_segments()
        .and_then(|segments| {
            let segments: Vec<&str> = segments.collect();
            segments
                .windows(3)
                .find(|w| w[0] == "file" && w[1] == "d")
                .map(|w| w[2].to_string())
        })
        .filter(|id| is_file_id(id));

    from_path.or_else(|| {
        url.query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .filter(|id| is_file_id(id))
    })
}

fn is_file_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
