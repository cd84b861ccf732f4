use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use folio_core::error::AppError;
use folio_core::models::{RawContent, Request};
use folio_core::traits::{FetcherFactory, PageFetcher};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const LAUNCH_ARGS: &[&str] = &[
    "--headless=new",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1280,1024",
    "--disable-extensions",
    "--disable-blink-features=AutomationControlled",
    "--log-level=3",
];

/// Chrome/Chromium locations tried on CI runners.
const CI_BINARIES: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium-browser",
    "/usr/bin/chromium",
];

/// The snap wrapper at `/snap/bin/chromium` drops unknown flags, breaking
/// headless mode, so the real binary inside the snap is preferred.
const LOCAL_BINARIES: &[&str] = &["/snap/chromium/current/usr/lib/chromium-browser/chrome"];

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Bound on a single navigation.
    pub page_load: Duration,
    /// Bound on waiting for a ready selector.
    pub wait: Duration,
    /// Explicit browser binary; resolved from the environment when `None`.
    pub executable: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            page_load: Duration::from_secs(60),
            wait: Duration::from_secs(30),
            executable: None,
        }
    }
}

struct Session {
    browser: Mutex<Browser>,
    /// The one tab every navigation goes through.
    page: Mutex<Page>,
    handler: JoinHandle<()>,
    closed: AtomicBool,
}

/// Headless-browser fetcher using Chromium via the Chrome DevTools Protocol.
///
/// One Chromium process and one tab per session; clones share both, and
/// navigations are serialized on the tab.
#[derive(Clone)]
pub struct BrowserFetcher {
    session: Arc<Session>,
    options: BrowserOptions,
}

impl BrowserFetcher {
    pub async fn launch(options: BrowserOptions) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .request_timeout(options.page_load);

        if let Some(bin) = options.executable.clone().or_else(find_chrome_binary) {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }
        for arg in LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }

        let config = builder
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "Browser CDP handler error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(AppError::BrowserError(format!("Failed to open tab: {e}")));
            }
        };

        Ok(Self {
            session: Arc::new(Session {
                browser: Mutex::new(browser),
                page: Mutex::new(page),
                handler,
                closed: AtomicBool::new(false),
            }),
            options,
        })
    }

    async fn wait_for(&self, page: &Page, selector: &str) -> Result<(), AppError> {
        let deadline = Instant::now() + self.options.wait;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AppError::Timeout(self.options.wait.as_secs()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, request: &Request) -> Result<RawContent, AppError> {
        let Request::Rendered {
            url,
            ready_selector,
            scroll,
            settle,
        } = request
        else {
            return Err(AppError::BrowserError(format!(
                "Cannot POST a JSON request through the browser: {}",
                request.url()
            )));
        };

        let page = self.session.page.lock().await;

        tracing::debug!(%url, "Navigating");
        tokio::time::timeout(self.options.page_load, page.goto(url.as_str()))
            .await
            .map_err(|_| AppError::Timeout(self.options.page_load.as_secs()))?
            .map_err(|e| AppError::BrowserError(format!("Failed to navigate to {url}: {e}")))?;

        self.wait_for(&page, ready_selector).await?;

        if *scroll {
            page.evaluate(SCROLL_TO_BOTTOM)
                .await
                .map_err(|e| AppError::BrowserError(format!("Failed to scroll: {e}")))?;
        }
        if !settle.is_zero() {
            tokio::time::sleep(*settle).await;
        }

        let html = page
            .content()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))?;
        Ok(RawContent::Html(html))
    }

    async fn close(&self) {
        if self.session.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut browser = self.session.browser.lock().await;
        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "Browser process did not exit cleanly");
        }
        self.session.handler.abort();
        tracing::info!("Browser closed");
    }
}

/// Launches a fresh browser for every session.
#[derive(Debug, Clone, Default)]
pub struct BrowserFactory {
    options: BrowserOptions,
}

impl BrowserFactory {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

impl FetcherFactory for BrowserFactory {
    type Fetcher = BrowserFetcher;

    async fn open(&self) -> Result<BrowserFetcher, AppError> {
        BrowserFetcher::launch(self.options.clone()).await
    }
}

/// Locate a Chrome/Chromium binary: `CHROME_BIN` first, then the well-known
/// paths for the current environment. `None` leaves the lookup to
/// chromiumoxide.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(path = %p, "CHROME_BIN does not exist, ignoring");
    }

    let ci = std::env::var_os("GITHUB_ACTIONS").is_some();
    binary_candidates(ci).into_iter().find(|p| p.exists())
}

fn binary_candidates(ci: bool) -> Vec<PathBuf> {
    let paths = if ci { CI_BINARIES } else { LOCAL_BINARIES };
    paths.iter().map(PathBuf::from).collect()
}
