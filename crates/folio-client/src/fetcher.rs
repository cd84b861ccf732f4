use std::time::Duration;

use folio_core::error::AppError;
use folio_core::models::{RawContent, Request};
use folio_core::traits::{FetcherFactory, PageFetcher};
use reqwest::{Client, RequestBuilder};

/// HTTP fetcher using reqwest.
///
/// JSON requests are POSTed and the body parsed as JSON. Rendered requests
/// are plain GETs: the markup is returned as served, without running
/// scripts, so the ready selector, scrolling and settle time are ignored.
/// Use the browser fetcher for pages that render client-side.
#[derive(Clone, Debug)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    /// Fetcher with a 30 s timeout.
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<reqwest::Response, AppError> {
        let response = builder.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }
        Ok(response)
    }

    fn map_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }
}

impl PageFetcher for ReqwestFetcher {
    async fn fetch(&self, request: &Request) -> Result<RawContent, AppError> {
        match request {
            Request::Json { url, payload } => {
                tracing::debug!(%url, "POST");
                let response = self.send(self.client.post(url).json(payload), url).await?;
                let body = response.bytes().await.map_err(|e| self.map_error(e))?;
                Ok(RawContent::Json(serde_json::from_slice(&body)?))
            }
            Request::Rendered { url, .. } => {
                tracing::debug!(%url, "GET");
                let response = self.send(self.client.get(url), url).await?;
                let html = response.text().await.map_err(|e| {
                    AppError::HttpError(format!("Failed to read response body: {e}"))
                })?;
                Ok(RawContent::Html(html))
            }
        }
    }
}

/// Every session shares the same connection pool.
impl FetcherFactory for ReqwestFetcher {
    type Fetcher = ReqwestFetcher;

    async fn open(&self) -> Result<ReqwestFetcher, AppError> {
        Ok(self.clone())
    }
}
