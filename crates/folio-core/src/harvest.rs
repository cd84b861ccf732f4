use crate::error::AppError;
use crate::extract::{self, Extraction};
use crate::models::{ExtractedFields, Request, Target};
use crate::normalize::normalize;
use crate::dedup::FoldOutcome;
use crate::results::ResultSet;
use crate::retry::RetryPolicy;
use crate::sources::{DetailPage, SourceProfile};
use crate::traits::{FetcherFactory, PageFetcher};

/// Events emitted while harvesting, for monitoring/logging.
#[derive(Debug, Clone)]
pub enum HarvestEvent<'a> {
    RunStarted {
        source: &'a str,
        targets: usize,
    },
    SessionOpened {
        attempt: u32,
    },
    SessionFailed {
        attempt: u32,
        error: &'a AppError,
        will_retry: bool,
    },
    TargetStarted {
        label: &'a str,
    },
    AttemptFailed {
        label: &'a str,
        attempt: u32,
        error: &'a AppError,
        will_retry: bool,
    },
    TargetCompleted {
        label: &'a str,
        records: usize,
    },
    /// All attempts failed; the target contributes no records.
    TargetAbandoned {
        label: &'a str,
        error: &'a AppError,
    },
    DetailFailed {
        external_id: &'a str,
        error: &'a AppError,
    },
    RunCompleted {
        source: &'a str,
        records: usize,
    },
}

/// Receives harvest events (decoupled logging).
pub trait HarvestReporter: Send + Sync {
    fn report(&self, event: HarvestEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHarvestReporter;

impl HarvestReporter for TracingHarvestReporter {
    fn report(&self, event: HarvestEvent<'_>) {
        match event {
            HarvestEvent::RunStarted { source, targets } => {
                tracing::info!(%source, %targets, "Harvest started");
            }
            HarvestEvent::SessionOpened { attempt } => {
                tracing::info!(%attempt, "Fetch session opened");
            }
            HarvestEvent::SessionFailed {
                attempt,
                error,
                will_retry,
            } => {
                if will_retry {
                    tracing::warn!(%attempt, %error, "Session failed, restarting");
                } else {
                    tracing::error!(%attempt, %error, "Session failed, giving up");
                }
            }
            HarvestEvent::TargetStarted { label } => {
                tracing::info!(%label, "Fetching target");
            }
            HarvestEvent::AttemptFailed {
                label,
                attempt,
                error,
                will_retry,
            } => {
                if error.is_fetch_failure() {
                    tracing::warn!(%label, %attempt, %error, %will_retry, "Fetch failed");
                } else {
                    tracing::error!(%label, %attempt, %error, %will_retry, "Extraction failed");
                }
            }
            HarvestEvent::TargetCompleted { label, records } => {
                tracing::info!(%label, %records, "Target completed");
            }
            HarvestEvent::TargetAbandoned { label, error } => {
                tracing::error!(%label, %error, "Target abandoned after retries");
            }
            HarvestEvent::DetailFailed { external_id, error } => {
                tracing::warn!(%external_id, %error, "Detail page failed");
            }
            HarvestEvent::RunCompleted { source, records } => {
                tracing::info!(%source, %records, "Harvest completed");
            }
        }
    }
}

/// What happens when a target still fails after its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log it and continue with the next target; the target's group stays
    /// empty.
    Isolate,
    /// Return the error from the session (single-shot sources). A page
    /// whose ready selector never appeared still only yields an empty
    /// group.
    Propagate,
}

impl FailurePolicy {
    /// Whether `error`, left over after the target's retries, ends the
    /// session.
    pub fn is_fatal(&self, error: &AppError) -> bool {
        match self {
            FailurePolicy::Isolate => false,
            FailurePolicy::Propagate => !matches!(error, AppError::Timeout(_)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Retry applied to each target (and each detail page).
    pub retry: RetryPolicy,
    pub failure_policy: FailurePolicy,
    /// Whole-session attempts; each one opens a fresh fetcher.
    pub session_attempts: u32,
    /// Candidate items considered per target.
    pub item_cap: Option<usize>,
    /// Fetch the per-book detail page when the source has one.
    pub fetch_detail: bool,
    /// Visit the source's warm-up page after opening a session.
    pub warm_up: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            failure_policy: FailurePolicy::Isolate,
            session_attempts: 2,
            item_cap: None,
            fetch_detail: false,
            warm_up: true,
        }
    }
}

/// Orchestrates a run: session → targets → fetch → extract → normalize → dedup.
///
/// Generic over the fetcher factory and the reporter, enabling dependency
/// injection and testability without a real network or browser.
pub struct HarvestService<FF, R>
where
    FF: FetcherFactory,
    R: HarvestReporter,
{
    factory: FF,
    reporter: R,
    config: HarvestConfig,
}

impl<FF, R> HarvestService<FF, R>
where
    FF: FetcherFactory,
    R: HarvestReporter,
{
    pub fn new(factory: FF, reporter: R, config: HarvestConfig) -> Self {
        Self {
            factory,
            reporter,
            config,
        }
    }

    /// Harvest every target of `profile`, in order.
    ///
    /// A failing session (fetcher cannot open, warm-up fails, or a target
    /// fails under [`FailurePolicy::Propagate`]) is retried from scratch up
    /// to `session_attempts` times. The fetcher is closed after every
    /// session, whatever its outcome.
    pub async fn run(
        &self,
        profile: &SourceProfile,
        targets: &[Target],
    ) -> Result<ResultSet, AppError> {
        self.reporter.report(HarvestEvent::RunStarted {
            source: profile.name,
            targets: targets.len(),
        });

        let sessions = RetryPolicy::new(self.config.session_attempts, self.config.retry.backoff);
        let results = sessions
            .run(
                move |attempt| self.run_session(attempt, profile, targets),
                |attempt, error, will_retry| {
                    self.reporter.report(HarvestEvent::SessionFailed {
                        attempt,
                        error,
                        will_retry,
                    })
                },
            )
            .await?;

        self.reporter.report(HarvestEvent::RunCompleted {
            source: profile.name,
            records: results.len(),
        });
        Ok(results)
    }

    async fn run_session(
        &self,
        attempt: u32,
        profile: &SourceProfile,
        targets: &[Target],
    ) -> Result<ResultSet, AppError> {
        let fetcher = self.factory.open().await?;
        self.reporter.report(HarvestEvent::SessionOpened { attempt });

        let outcome = self.warm_up_and_harvest(&fetcher, profile, targets).await;
        fetcher.close().await;
        outcome
    }

    async fn warm_up_and_harvest<F: PageFetcher>(
        &self,
        fetcher: &F,
        profile: &SourceProfile,
        targets: &[Target],
    ) -> Result<ResultSet, AppError> {
        if self.config.warm_up {
            if let Some(warm_up) = &profile.warm_up {
                tracing::info!(url = %warm_up.url, "Warming up session");
                fetcher.fetch(&warm_up.request()).await?;
            }
        }
        self.harvest(fetcher, profile, targets).await
    }

    /// Harvest `targets` with an already open fetcher.
    pub async fn harvest<F: PageFetcher>(
        &self,
        fetcher: &F,
        profile: &SourceProfile,
        targets: &[Target],
    ) -> Result<ResultSet, AppError> {
        let mut results = ResultSet::new();

        for target in targets {
            let label = target.label.as_str();
            results.open(label);
            self.reporter.report(HarvestEvent::TargetStarted { label });

            let outcome = self
                .config
                .retry
                .run(
                    move |_| self.harvest_target(fetcher, profile, target),
                    |attempt, error, will_retry| {
                        self.reporter.report(HarvestEvent::AttemptFailed {
                            label,
                            attempt,
                            error,
                            will_retry,
                        })
                    },
                )
                .await;

            match outcome {
                Ok(items) => {
                    let mut records = 0;
                    for record in items.into_iter().filter_map(normalize) {
                        if results.fold(label, record) == FoldOutcome::Inserted {
                            records += 1;
                        }
                    }
                    self.reporter
                        .report(HarvestEvent::TargetCompleted { label, records });
                }
                Err(error) if self.config.failure_policy.is_fatal(&error) => return Err(error),
                Err(error) => {
                    self.reporter.report(HarvestEvent::TargetAbandoned {
                        label,
                        error: &error,
                    });
                }
            }
        }

        Ok(results)
    }

    /// One attempt at a target: fetch, split, extract, and (optionally)
    /// enrich each item from its detail page.
    async fn harvest_target<F: PageFetcher>(
        &self,
        fetcher: &F,
        profile: &SourceProfile,
        target: &Target,
    ) -> Result<Vec<ExtractedFields>, AppError> {
        let content = fetcher.fetch(&target.request).await?;
        let Extraction {
            mut items,
            untitled,
            skipped,
        } = extract::extract_items(profile.split, profile.rules, &content, self.config.item_cap)?;
        tracing::debug!(label = %target.label, found = items.len(), untitled, skipped, "Extracted items");

        if self.config.fetch_detail {
            if let Some(detail) = &profile.detail {
                for fields in &mut items {
                    self.enrich(fetcher, detail, fields).await;
                }
            }
        }
        Ok(items)
    }

    /// Merge detail-page fields into `fields`. Failures leave the detail
    /// fields at their empty sentinel.
    async fn enrich<F: PageFetcher>(
        &self,
        fetcher: &F,
        detail: &DetailPage,
        fields: &mut ExtractedFields,
    ) {
        let external_id = fields
            .external_id
            .clone()
            .filter(|id| !id.is_empty());

        if let Some(external_id) = external_id {
            let request = detail.request(&external_id);
            let request = &request;
            let external_id = external_id.as_str();
            let found = self
                .config
                .retry
                .run_or_default(
                    move |_| Self::fetch_detail(fetcher, detail, request),
                    |_, error, will_retry| {
                        if !will_retry {
                            self.reporter.report(HarvestEvent::DetailFailed {
                                external_id,
                                error,
                            });
                        }
                    },
                )
                .await;
            fields.absorb(found);
        }

        for rule in detail.rules {
            fields.declare(rule.field);
        }
    }

    async fn fetch_detail<F: PageFetcher>(
        fetcher: &F,
        detail: &DetailPage,
        request: &Request,
    ) -> Result<ExtractedFields, AppError> {
        let content = fetcher.fetch(request).await?;
        extract::extract_page(detail.rules, &content)
    }
}
