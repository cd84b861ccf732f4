use std::future::Future;

use crate::error::AppError;
use crate::models::{RawContent, Request};

/// Obtains raw content (a JSON payload or rendered markup) for a request.
pub trait PageFetcher: Send + Sync + Clone {
    fn fetch(&self, request: &Request) -> impl Future<Output = Result<RawContent, AppError>> + Send;

    /// Release whatever the fetcher holds (browser process, connections).
    ///
    /// Called exactly once per session, on every exit path.
    fn close(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Opens a fresh fetcher session.
///
/// The harvester calls [`open`](Self::open) once per outer attempt, so a
/// browser-backed factory starts a new browser each time.
pub trait FetcherFactory: Send + Sync {
    type Fetcher: PageFetcher;

    fn open(&self) -> impl Future<Output = Result<Self::Fetcher, AppError>> + Send;
}
