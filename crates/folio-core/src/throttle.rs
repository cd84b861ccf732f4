//! Courtesy delays between requests to the same host.
//!
//! [`ThrottledFetcher`] keeps a configured gap, plus optional jitter, between
//! requests to one origin. Different origins never wait on each other.
//! [`ThrottledFactory`] applies it to every session a factory opens.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use folio_core::throttle::{ThrottleConfig, ThrottledFetcher};
//!
//! # use folio_core::traits::PageFetcher;
//! # use folio_core::models::{RawContent, Request};
//! # #[derive(Clone)] struct MyFetcher;
//! # impl PageFetcher for MyFetcher {
//! #     async fn fetch(&self, _: &Request) -> Result<RawContent, folio_core::error::AppError> { todo!() }
//! # }
//! let config = ThrottleConfig::new(Duration::from_millis(100))
//!     .with_jitter(Duration::from_millis(50));
//! let fetcher = ThrottledFetcher::new(MyFetcher, config);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::error::AppError;
use crate::models::{RawContent, Request};
use crate::traits::{FetcherFactory, PageFetcher};

/// Per-host spacing, optionally randomized.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Minimum gap between two requests to the same host.
    pub delay: Duration,

    /// Upper bound of the random extra gap drawn for each request.
    pub jitter: Duration,
}

impl ThrottleConfig {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn gap(&self) -> Duration {
        self.delay + Duration::from_millis(jitter_ms(self.jitter.as_millis() as u64))
    }
}

impl Default for ThrottleConfig {
    /// 100 ms between requests, no jitter.
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

/// A [`PageFetcher`] wrapper that spaces requests to the same host.
///
/// One harvest session awaits its requests one after another, so the
/// wrapper only remembers when each host may next be contacted. A request
/// books its slot before sleeping, which keeps the schedule correct without
/// holding the lock across the wait. Clones share one schedule.
#[derive(Clone)]
pub struct ThrottledFetcher<F> {
    inner: F,
    config: ThrottleConfig,
    next_slot: Arc<Mutex<HashMap<String, Instant>>>,
}

impl<F: PageFetcher> ThrottledFetcher<F> {
    pub fn new(inner: F, config: ThrottleConfig) -> Self {
        Self {
            inner,
            config,
            next_slot: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Books the next slot for `origin` and returns when it starts.
    fn reserve(&self, origin: String) -> Instant {
        let now = Instant::now();
        let mut slots = self
            .next_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let start = slots.get(&origin).map_or(now, |&slot| slot.max(now));
        slots.insert(origin, start + self.config.gap());
        start
    }
}

/// `scheme://host[:port]`, with the default port left out.
fn origin(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

impl<F: PageFetcher> PageFetcher for ThrottledFetcher<F> {
    async fn fetch(&self, request: &Request) -> Result<RawContent, AppError> {
        if let Some(origin) = origin(request.url()) {
            let start = self.reserve(origin);
            let wait = start.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                tracing::debug!(
                    url = %request.url(),
                    wait_ms = wait.as_millis() as u64,
                    "Courtesy delay"
                );
                tokio::time::sleep_until(start).await;
            }
        }
        self.inner.fetch(request).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}

/// Opens throttled fetchers from an inner factory.
#[derive(Clone)]
pub struct ThrottledFactory<FF> {
    inner: FF,
    config: ThrottleConfig,
}

impl<FF: FetcherFactory> ThrottledFactory<FF> {
    pub fn new(inner: FF, config: ThrottleConfig) -> Self {
        Self { inner, config }
    }
}

impl<FF: FetcherFactory> FetcherFactory for ThrottledFactory<FF> {
    type Fetcher = ThrottledFetcher<FF::Fetcher>;

    async fn open(&self) -> Result<Self::Fetcher, AppError> {
        let inner = self.inner.open().await?;
        Ok(ThrottledFetcher::new(inner, self.config.clone()))
    }
}

/// Uniform-ish draw from `0..=max_ms`, seeded per call by std's random hasher keys.
fn jitter_ms(max_ms: u64) -> u64 {
    use std::hash::{BuildHasher, RandomState};

    if max_ms == 0 {
        return 0;
    }
    RandomState::new().hash_one(std::time::SystemTime::now()) % (max_ms + 1)
}
