use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use folio_core::{AppError, FetcherFactory, PageFetcher, RawContent, Request};

/// Fetcher serving canned responses per URL.
///
/// Each URL has its own queue; the last queued response is repeated once
/// the queue is down to one entry. Unknown URLs answer with HTTP 404.
#[derive(Clone, Default)]
pub struct SiteFetcher {
    routes: Arc<Mutex<HashMap<String, VecDeque<Result<RawContent, AppError>>>>>,
    pub log: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<Mutex<usize>>,
}

impl SiteFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, response: Result<RawContent, AppError>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn html(self, url: &str, body: &str) -> Self {
        self.route(url, Ok(RawContent::Html(body.to_string())))
    }

    pub fn fetched(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

fn duplicate(response: &Result<RawContent, AppError>) -> Result<RawContent, AppError> {
    match response {
        Ok(content) => Ok(content.clone()),
        Err(e) => Err(AppError::Generic(e.to_string())),
    }
}

impl PageFetcher for SiteFetcher {
    async fn fetch(&self, request: &Request) -> Result<RawContent, AppError> {
        let url = request.url().to_string();
        self.log.lock().unwrap().push(url.clone());

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => duplicate(&queue[0]),
            None => Err(AppError::HttpError(format!("HTTP 404 for {url}"))),
        }
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() += 1;
    }
}

impl FetcherFactory for SiteFetcher {
    type Fetcher = SiteFetcher;

    async fn open(&self) -> Result<SiteFetcher, AppError> {
        Ok(self.clone())
    }
}
