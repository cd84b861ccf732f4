pub mod dedup;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod models;
pub mod normalize;
pub mod results;
pub mod retry;
pub mod sources;
pub mod throttle;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use dedup::{DedupTable, FoldOutcome};
pub use error::AppError;
pub use harvest::{
    FailurePolicy, HarvestConfig, HarvestEvent, HarvestReporter, HarvestService,
    TracingHarvestReporter,
};
pub use models::{ExtractedFields, Field, RawContent, Record, Request, Target};
pub use results::{OutputShape, ResultSet};
pub use retry::{Backoff, RetryPolicy};
pub use sources::SourceProfile;
pub use throttle::{ThrottleConfig, ThrottledFactory, ThrottledFetcher};
pub use traits::{FetcherFactory, PageFetcher};
