#[cfg(feature = "browser")]
pub mod browser_fetcher;
pub mod fetcher;

#[cfg(feature = "browser")]
pub use browser_fetcher::{BrowserFactory, BrowserFetcher, BrowserOptions};
pub use fetcher::ReqwestFetcher;
