//! Configuration handling for discovery and retrieval runs.
//!
//! Everything a component needs (paths, timeouts, retry policy and the pattern
//! tables used to classify links) lives on `Config` and is handed to each
//! component's constructor. `Config::from_env` reads overrides from the
//! environment and falls back to development defaults.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable names.
pub const ENV_TARGET_URL: &str = "DOCKET_TARGET_URL";
pub const ENV_BASE_URL: &str = "DOCKET_BASE_URL";
pub const ENV_DATA_DIR: &str = "DOCKET_DATA_DIR";
pub const ENV_DOWNLOAD_DIR: &str = "DOCKET_DOWNLOAD_DIR";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "DOCKET_REQUEST_TIMEOUT_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "DOCKET_MAX_ATTEMPTS";
pub const ENV_BASE_BACKOFF_MS: &str = "DOCKET_BASE_BACKOFF_MS";
pub const ENV_MAX_BACKOFF_MS: &str = "DOCKET_MAX_BACKOFF_MS";
pub const ENV_CONCURRENCY: &str = "DOCKET_CONCURRENCY";
pub const ENV_MAX_PAGES: &str = "DOCKET_MAX_PAGES";
pub const ENV_MAX_DOCUMENT_BYTES: &str = "DOCKET_MAX_DOCUMENT_BYTES";

const DEFAULT_TARGET_URL: &str =
    "https://www.boston.gov/departments/licensing-board/licensing-board-information-and-members";
const DEFAULT_BASE_URL: &str = "https://www.boston.gov";
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_DOWNLOAD_DIR: &str = "./voting_minutes_pdfs";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_BACKOFF_MS: u64 = 500;
const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;
const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_MAX_PAGES: usize = 10;
const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 50 * 1024 * 1024; // 50MB
const DEFAULT_DOCUMENT_PREFIX: &str = "voting_minutes";

const MINUTES_LINKS_FILE: &str = "voting_minutes_links.json";
const VIDEO_LINKS_FILE: &str = "hearing_video_links.json";
const EXCLUDE_LIST_FILE: &str = "url_exclude_list.json";
const STATS_LOG_FILE: &str = "link_stats_log.csv";
const EXCEPTION_DIR: &str = "exception_pdfs";

/// Pattern tables used to classify and rewrite links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPatterns {
    /// Href prefixes handled by the browser rather than served as documents.
    pub client_side_prefixes: Vec<String>,
    /// Host fragments of video-hosting services.
    pub video_hosts: Vec<String>,
    /// Hosts serving cloud-drive share links.
    pub share_hosts: Vec<String>,
    /// Direct-download endpoint; the file id is appended as `&id=`.
    pub direct_download_endpoint: String,
}

impl Default for LinkPatterns {
    fn default() -> Self {
        Self {
            client_side_prefixes: ["tel:", "mailto:", "#", "javascript:"]
                .into_iter()
                .map(String::from)
                .collect(),
            video_hosts: ["youtube.com", "youtube-nocookie.com", "youtu.be", "vimeo.com"]
                .into_iter()
                .map(String::from)
                .collect(),
            share_hosts: ["drive.google.com", "docs.google.com"]
                .into_iter()
                .map(String::from)
                .collect(),
            direct_download_endpoint: "https://drive.google.com/uc?export=download".to_string(),
        }
    }
}

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    target_url: String,
    base_url: String,
    data_dir: PathBuf,
    download_dir: PathBuf,
    request_timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
    concurrency: usize,
    max_pages: usize,
    max_document_bytes: u64,
    document_prefix: String,
    patterns: LinkPatterns,
}

impl Config {
    /// Create a config with default tuning for the given page and directories.
    pub fn new(
        target_url: impl Into<String>,
        base_url: impl Into<String>,
        data_dir: impl Into<PathBuf>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            base_url: base_url.into(),
            data_dir: data_dir.into(),
            download_dir: download_dir.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            concurrency: DEFAULT_CONCURRENCY,
            max_pages: DEFAULT_MAX_PAGES,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            document_prefix: DEFAULT_DOCUMENT_PREFIX.to_string(),
            patterns: LinkPatterns::default(),
        }
    }

    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let target_url = env::var(ENV_TARGET_URL).unwrap_or_else(|_| DEFAULT_TARGET_URL.to_string());
        let base_url = env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let data_dir = env::var(ENV_DATA_DIR).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        let download_dir =
            env::var(ENV_DOWNLOAD_DIR).unwrap_or_else(|_| DEFAULT_DOWNLOAD_DIR.to_string());

        let mut config = Self::new(target_url, base_url, data_dir, download_dir);

        config.request_timeout = Duration::from_secs(parse_env(
            ENV_REQUEST_TIMEOUT_SECS,
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        config.max_attempts = parse_env(ENV_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)?;
        config.base_backoff =
            Duration::from_millis(parse_env(ENV_BASE_BACKOFF_MS, DEFAULT_BASE_BACKOFF_MS)?);
        config.max_backoff =
            Duration::from_millis(parse_env(ENV_MAX_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS)?);
        config.concurrency = parse_env(ENV_CONCURRENCY, DEFAULT_CONCURRENCY)?;
        config.max_pages = parse_env(ENV_MAX_PAGES, DEFAULT_MAX_PAGES)?;
        config.max_document_bytes = parse_env(ENV_MAX_DOCUMENT_BYTES, DEFAULT_MAX_DOCUMENT_BYTES)?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                field: ENV_BASE_URL,
                reason: format!("not an absolute url: {}", self.base_url),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_MAX_ATTEMPTS,
                reason: "must be at least 1".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_CONCURRENCY,
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, base_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_backoff = base_backoff;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_patterns(mut self, patterns: LinkPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    /// Board page the discovery run starts from.
    pub fn target_url(&self) -> &str {
        &self.target_url
    }
    /// Base used to resolve relative hrefs.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
    /// Destination directory for retrieved documents.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }
    pub fn minutes_links_path(&self) -> PathBuf {
        self.data_dir.join(MINUTES_LINKS_FILE)
    }
    pub fn video_links_path(&self) -> PathBuf {
        self.data_dir.join(VIDEO_LINKS_FILE)
    }
    pub fn exclude_list_path(&self) -> PathBuf {
        self.data_dir.join(EXCLUDE_LIST_FILE)
    }
    pub fn stats_log_path(&self) -> PathBuf {
        self.data_dir.join(STATS_LOG_FILE)
    }
    /// Manually supplied documents copied into the download directory.
    pub fn exception_dir(&self) -> PathBuf {
        self.data_dir.join(EXCEPTION_DIR)
    }
    /// Bounded timeout applied to every fetch attempt.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
    pub fn base_backoff(&self) -> Duration {
        self.base_backoff
    }
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }
    /// Number of retrieval requests processed at the same time.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }
    pub fn max_document_bytes(&self) -> u64 {
        self.max_document_bytes
    }
    pub fn document_prefix(&self) -> &str {
        &self.document_prefix
    }
    pub fn patterns(&self) -> &LinkPatterns {
        &self.patterns
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_TARGET_URL,
            DEFAULT_BASE_URL,
            DEFAULT_DATA_DIR,
            DEFAULT_DOWNLOAD_DIR,
        )
    }
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: key,
            reason: format!("cannot parse '{}'", raw),
        }),
        Err(_) => Ok(default),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Ensure environment-variable manipulating tests run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ALL_KEYS: [&str; 11] = [
        ENV_TARGET_URL,
        ENV_BASE_URL,
        ENV_DATA_DIR,
        ENV_DOWNLOAD_DIR,
        ENV_REQUEST_TIMEOUT_SECS,
        ENV_MAX_ATTEMPTS,
        ENV_BASE_BACKOFF_MS,
        ENV_MAX_BACKOFF_MS,
        ENV_CONCURRENCY,
        ENV_MAX_PAGES,
        ENV_MAX_DOCUMENT_BYTES,
    ];

    fn clear_env() {
        for key in ALL_KEYS {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn defaults_when_env_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.target_url(), DEFAULT_TARGET_URL);
        assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
        assert_eq!(cfg.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(
            cfg.exclude_list_path(),
            Path::new(DEFAULT_DATA_DIR).join("url_exclude_list.json")
        );
    }

    #[test]
    fn overrides_when_env_present() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_BASE_URL, "https://example.org");
            env::set_var(ENV_DATA_DIR, "/tmp/docket");
            env::set_var(ENV_MAX_ATTEMPTS, "5");
            env::set_var(ENV_CONCURRENCY, "2");
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.base_url(), "https://example.org");
        assert_eq!(cfg.minutes_links_path(), Path::new("/tmp/docket/voting_minutes_links.json"));
        assert_eq!(cfg.max_attempts(), 5);
        assert_eq!(cfg.concurrency(), 2);
        clear_env();
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_MAX_ATTEMPTS, "three");
        }
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_ATTEMPTS));
        clear_env();
    }

    #[test]
    fn rejects_zero_attempts() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_MAX_ATTEMPTS, "0");
        }
        assert!(Config::from_env().is_err());
        clear_env();
    }
}
