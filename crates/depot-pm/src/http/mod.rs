mod client;

pub use client::{parse_http_date, HttpClient, HttpClientConfig, HttpError};
