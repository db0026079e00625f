//! Blocking HTTP client for repository and download operations.
//!
//! This module provides a wrapper around `reqwest::blocking` with:
//! - Automatic retry logic with exponential backoff
//! - Custom User-Agent header
//! - Timeout handling
//! - `Last-Modified` probing used to decide whether a package is stale
//!
//! # Examples
//!
//! ```no_run
//! use depot_pm::http::{HttpClient, HttpClientConfig};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig::new()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_max_retries(5);
//! let client = HttpClient::with_config(config)?;
//!
//! let pom = client.get_text("https://repo1.maven.org/maven2/junit/junit/4.13.2/junit-4.13.2.pom")?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::LAST_MODIFIED;
use reqwest::StatusCode;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = concat!("depot/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Max retries exceeded for {url}")]
    MaxRetries { url: String },
}

impl HttpError {
    /// Whether the server answered that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HttpError::HttpStatus { status: 404, .. } | HttpError::HttpStatus { status: 410, .. })
    }
}

pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .user_agent(&config.user_agent);

        if let Some(proxy_url) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        if let Some(cafile) = &config.cafile {
            if let Ok(cert_bytes) = std::fs::read(cafile) {
                if let Ok(cert) = reqwest::Certificate::from_pem(&cert_bytes) {
                    builder = builder.add_root_certificate(cert);
                }
            }
        }

        Ok(Self {
            client: builder.build()?,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    /// Perform GET request with automatic retries
    pub fn get(&self, url: &str) -> Result<Response, HttpError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.client.get(url).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(HttpError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    } else {
                        // Don't retry on client errors (4xx except 429)
                        return Err(HttpError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                }
                Err(e) => last_error = Some(HttpError::Request(e)),
            }

            if attempt < self.max_retries {
                let delay = self.retry_delay * 2_u32.pow(attempt);
                log::debug!("Retrying {} in {:?}", url, delay);
                std::thread::sleep(delay);
            }
        }

        Err(last_error.unwrap_or_else(|| HttpError::MaxRetries {
            url: url.to_string(),
        }))
    }

    /// GET a text document
    pub fn get_text(&self, url: &str) -> Result<String, HttpError> {
        Ok(self.get(url)?.text()?)
    }

    /// Download `url` to `dest`, creating parent directories.
    ///
    /// The body is written to a temporary file first so an interrupted
    /// transfer never leaves a truncated artifact behind.
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64, HttpError> {
        let mut response = self.get(url)?;

        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        let written = response.copy_to(temp.as_file_mut())?;
        temp.as_file_mut().flush()?;
        temp.persist(dest).map_err(|e| HttpError::Io(e.error))?;

        Ok(written)
    }

    /// `Last-Modified` of a resource, via HEAD. `None` when unknown.
    pub fn last_modified(&self, url: &str) -> Option<DateTime<Utc>> {
        let response = self.client.head(url).send().ok()?;
        if !response.status().is_success() {
            return None;
        }
        let header = response.headers().get(LAST_MODIFIED)?.to_str().ok()?;
        parse_http_date(header)
    }
}

/// Parse an RFC 7231 date (`Wed, 21 Oct 2015 07:28:00 GMT`).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub proxy: Option<String>,
    pub cafile: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            proxy: None,
            cafile: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_cafile(mut self, cafile: PathBuf) -> Self {
        self.cafile = Some(cafile);
        self
    }
}
