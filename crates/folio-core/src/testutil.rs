//! Test utilities: mock implementations of the fetcher traits.
//!
//! Handwritten mocks for dependency injection in unit tests. All mocks use
//! `Arc<Mutex<_>>` for interior mutability, allowing assertions on recorded
//! calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::harvest::{HarvestEvent, HarvestReporter};
use crate::models::{RawContent, Request};
use crate::traits::{FetcherFactory, PageFetcher};

/// A rendered-page request with no scrolling or settle time.
pub fn html_page(url: &str, ready_selector: &str) -> Request {
    Request::Rendered {
        url: url.to_string(),
        ready_selector: ready_selector.to_string(),
        scroll: false,
        settle: Duration::ZERO,
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that pops queued responses.
///
/// Each call pops the first element; once the queue is empty, every call
/// returns a default HTML page. Clones share the queue and the call log.
#[derive(Clone)]
pub struct MockFetcher {
    responses: Arc<Mutex<Vec<Result<RawContent, AppError>>>>,
    pub requests: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<usize>>,
}

impl MockFetcher {
    pub fn new(responses: Vec<Result<RawContent, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(Mutex::new(0)),
        }
    }

    pub fn html(pages: &[&str]) -> Self {
        Self::new(
            pages
                .iter()
                .map(|page| Ok(RawContent::Html(page.to_string())))
                .collect(),
        )
    }

    /// URLs requested so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        *self.closed.lock().unwrap()
    }
}

impl PageFetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<RawContent, AppError> {
        self.requests.lock().unwrap().push(request.url().to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(RawContent::Html("<html><body>default</body></html>".to_string()))
        } else {
            responses.remove(0)
        }
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() += 1;
    }
}

// ---------------------------------------------------------------------------
// MockFactory
// ---------------------------------------------------------------------------

/// Mock factory that hands out clones of one [`MockFetcher`].
///
/// Queued open errors are returned first, one per `open` call.
#[derive(Clone)]
pub struct MockFactory {
    pub fetcher: MockFetcher,
    open_errors: Arc<Mutex<Vec<AppError>>>,
    pub opened: Arc<Mutex<usize>>,
}

impl MockFactory {
    pub fn new(responses: Vec<Result<RawContent, AppError>>) -> Self {
        Self::with_fetcher(MockFetcher::new(responses))
    }

    pub fn with_fetcher(fetcher: MockFetcher) -> Self {
        Self {
            fetcher,
            open_errors: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_open_errors(self, errors: Vec<AppError>) -> Self {
        *self.open_errors.lock().unwrap() = errors;
        self
    }

    pub fn open_count(&self) -> usize {
        *self.opened.lock().unwrap()
    }
}

impl FetcherFactory for MockFactory {
    type Fetcher = MockFetcher;

    async fn open(&self) -> Result<MockFetcher, AppError> {
        let mut errors = self.open_errors.lock().unwrap();
        if !errors.is_empty() {
            return Err(errors.remove(0));
        }
        *self.opened.lock().unwrap() += 1;
        Ok(self.fetcher.clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that keeps a one-line summary of every event.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl HarvestReporter for RecordingReporter {
    fn report(&self, event: HarvestEvent<'_>) {
        let line = match event {
            HarvestEvent::RunStarted { source, targets } => format!("run {source} {targets}"),
            HarvestEvent::SessionOpened { attempt } => format!("session {attempt}"),
            HarvestEvent::SessionFailed {
                attempt,
                will_retry,
                ..
            } => format!("session-failed {attempt} {will_retry}"),
            HarvestEvent::TargetStarted { label } => format!("target {label}"),
            HarvestEvent::AttemptFailed {
                label,
                attempt,
                will_retry,
                ..
            } => format!("attempt-failed {label} {attempt} {will_retry}"),
            HarvestEvent::TargetCompleted { label, records } => {
                format!("completed {label} {records}")
            }
            HarvestEvent::TargetAbandoned { label, .. } => format!("abandoned {label}"),
            HarvestEvent::DetailFailed { external_id, .. } => format!("detail-failed {external_id}"),
            HarvestEvent::RunCompleted { source, records } => format!("done {source} {records}"),
        };
        self.events.lock().unwrap().push(line);
    }
}
