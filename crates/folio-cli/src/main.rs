use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use folio_client::ReqwestFetcher;
use folio_core::sources::{SourceProfile, manning, oreilly, yes24};
use folio_core::{
    Backoff, FailurePolicy, FetcherFactory, HarvestConfig, HarvestService, RetryPolicy, Target,
    ThrottleConfig, ThrottledFactory, TracingHarvestReporter,
};

#[derive(Parser)]
#[command(name = "folio", version, about = "Harvest new-book listings from publisher catalogs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the newest books from the Manning catalog API
    Manning {
        /// Output JSON file
        #[arg(short, long, env = "FOLIO_OUTPUT", default_value = "manning_books.json")]
        output: PathBuf,

        /// Catalog page to request
        #[arg(long, env = "FOLIO_PAGE", default_value_t = 1)]
        page: u32,

        /// HTTP request timeout in seconds
        #[arg(long, env = "FOLIO_TIMEOUT", default_value_t = 30)]
        timeout: u64,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Scrape the O'Reilly search results page (needs the `browser` feature)
    Oreilly {
        /// Output JSON file
        #[arg(short, long, env = "FOLIO_OUTPUT", default_value = "oreilly_books.json")]
        output: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Scrape recent titles per publisher from Yes24 (needs the `browser` feature)
    Yes24 {
        /// Output JSON file
        #[arg(short, long, env = "FOLIO_OUTPUT", default_value = "books_data.json")]
        output: PathBuf,

        /// JSON file with `[{"name": .., "id": ..}]` publisher entries
        #[arg(long, env = "FOLIO_PUBLISHERS")]
        publishers: Option<PathBuf>,

        /// Candidate items looked at per publisher
        #[arg(long, env = "FOLIO_ITEM_CAP", default_value_t = yes24::DEFAULT_ITEM_CAP)]
        item_cap: usize,

        /// Also visit each book's page for publication date and sales index
        #[arg(long, env = "FOLIO_DETAIL", default_value_t = false)]
        detail: bool,

        /// Skip the warm-up visit to the mobile home page
        #[arg(long, env = "FOLIO_NO_WARM_UP", default_value_t = false)]
        no_warm_up: bool,

        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        browser: BrowserArgs,
    },
}

/// Retry and pacing options shared by every source.
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Attempts per target
    #[arg(long, env = "FOLIO_ATTEMPTS", default_value_t = 3)]
    attempts: u32,

    /// Backoff step in seconds (grows linearly with the attempt number)
    #[arg(long, env = "FOLIO_BACKOFF", default_value_t = 2)]
    backoff: u64,

    /// Whole-session attempts; each one starts a fresh fetcher
    #[arg(long, env = "FOLIO_SESSION_ATTEMPTS", default_value_t = 2)]
    session_attempts: u32,

    /// Minimum delay between requests to the same host, in milliseconds
    #[arg(long, env = "FOLIO_DELAY_MS", default_value_t = 100)]
    delay_ms: u64,

    /// Random extra delay on top of --delay-ms, in milliseconds
    #[arg(long, env = "FOLIO_JITTER_MS", default_value_t = 0)]
    jitter_ms: u64,
}

impl RunArgs {
    fn harvest_config(&self, failure_policy: FailurePolicy) -> HarvestConfig {
        HarvestConfig {
            retry: RetryPolicy::new(
                self.attempts,
                Backoff::Linear(Duration::from_secs(self.backoff)),
            ),
            failure_policy,
            session_attempts: self.session_attempts,
            ..Default::default()
        }
    }

    fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig::new(Duration::from_millis(self.delay_ms))
            .with_jitter(Duration::from_millis(self.jitter_ms))
    }
}

#[derive(Args, Debug, Clone)]
struct BrowserArgs {
    /// Page load timeout in seconds
    #[arg(long, env = "FOLIO_PAGE_LOAD_TIMEOUT", default_value_t = 60)]
    page_load_timeout: u64,

    /// Ready-selector wait in seconds
    #[arg(long, env = "FOLIO_WAIT_TIMEOUT", default_value_t = 30)]
    wait_timeout: u64,

    /// Chrome/Chromium binary (defaults to $CHROME_BIN, then well-known paths)
    #[arg(long, env = "FOLIO_CHROME")]
    chrome: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("folio=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Manning {
            output,
            page,
            timeout,
            run,
        } => {
            let fetcher = ReqwestFetcher::with_timeout(Duration::from_secs(timeout))
                .context("Failed to create HTTP client")?;
            let target = manning::CatalogQuery {
                page,
                ..Default::default()
            }
            .target()?;
            let config = run.harvest_config(FailurePolicy::Propagate);
            cmd_harvest(fetcher, &manning::PROFILE, &[target], config, run.throttle(), &output)
                .await?;
        }
        Commands::Oreilly {
            output,
            run,
            browser,
        } => {
            let factory = browser_factory(&browser, "oreilly")?;
            let config = run.harvest_config(FailurePolicy::Propagate);
            cmd_harvest(
                factory,
                &oreilly::PROFILE,
                &[oreilly::target()],
                config,
                run.throttle(),
                &output,
            )
            .await?;
        }
        Commands::Yes24 {
            output,
            publishers,
            item_cap,
            detail,
            no_warm_up,
            run,
            browser,
        } => {
            let factory = browser_factory(&browser, "yes24")?;
            let publishers = match publishers {
                Some(path) => yes24::load_publishers(&path).with_context(|| {
                    format!("Failed to read publisher list: {}", path.display())
                })?,
                None => yes24::default_publishers(),
            };
            tracing::info!(publishers = publishers.len(), "Loaded publishers");

            let config = HarvestConfig {
                item_cap: Some(item_cap),
                fetch_detail: detail,
                warm_up: !no_warm_up,
                ..run.harvest_config(FailurePolicy::Isolate)
            };
            let targets = yes24::targets(&publishers);
            cmd_harvest(factory, &yes24::PROFILE, &targets, config, run.throttle(), &output)
                .await?;
        }
    }

    Ok(())
}

async fn cmd_harvest<FF: FetcherFactory>(
    factory: FF,
    profile: &SourceProfile,
    targets: &[Target],
    config: HarvestConfig,
    throttle: ThrottleConfig,
    output: &Path,
) -> Result<()> {
    let service = HarvestService::new(
        ThrottledFactory::new(factory, throttle),
        TracingHarvestReporter,
        config,
    );

    let results = service
        .run(profile, targets)
        .await
        .with_context(|| format!("Harvest of {} failed", profile.name))?;

    results
        .write_json(output, profile.output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Saved {} books to {}", results.len(), output.display());
    Ok(())
}

#[cfg(feature = "browser")]
fn browser_factory(args: &BrowserArgs, _command: &str) -> Result<folio_client::BrowserFactory> {
    Ok(folio_client::BrowserFactory::new(
        folio_client::BrowserOptions {
            page_load: Duration::from_secs(args.page_load_timeout),
            wait: Duration::from_secs(args.wait_timeout),
            executable: args.chrome.clone(),
        },
    ))
}

#[cfg(not(feature = "browser"))]
fn browser_factory(_args: &BrowserArgs, command: &str) -> Result<ReqwestFetcher> {
    anyhow::bail!(
        "`folio {command}` renders pages in Chromium; rebuild with `--features browser`"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn every_flag_has_an_env_fallback() {
        let cli = Cli::command();
        for sub in cli.get_subcommands() {
            for arg in sub.get_arguments() {
                let id = arg.get_id().as_str();
                if id == "help" || id == "version" {
                    continue;
                }
                let env = arg.get_env().and_then(|e| e.to_str());
                assert!(
                    env.is_some_and(|e| e.starts_with("FOLIO_")),
                    "`{} --{id}` has no FOLIO_ env fallback",
                    sub.get_name()
                );
            }
        }
    }

    #[test]
    fn manning_defaults() {
        let cli = Cli::try_parse_from(["folio", "manning"]).unwrap();
        let Commands::Manning {
            output,
            page,
            timeout,
            run,
        } = cli.command
        else {
            panic!("expected manning");
        };
        assert_eq!(output, PathBuf::from("manning_books.json"));
        assert_eq!(page, 1);
        assert_eq!(timeout, 30);

        let config = run.harvest_config(FailurePolicy::Propagate);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff, Backoff::Linear(Duration::from_secs(2)));
        assert_eq!(config.failure_policy, FailurePolicy::Propagate);
        assert_eq!(run.throttle().delay, Duration::from_millis(100));
    }

    #[test]
    fn yes24_flags() {
        let cli = Cli::try_parse_from([
            "folio",
            "yes24",
            "--publishers",
            "config/publishers.json",
            "--item-cap",
            "7",
            "--detail",
            "--no-warm-up",
            "--attempts",
            "5",
        ])
        .unwrap();
        let Commands::Yes24 {
            publishers,
            item_cap,
            detail,
            no_warm_up,
            run,
            ..
        } = cli.command
        else {
            panic!("expected yes24");
        };
        assert_eq!(publishers, Some(PathBuf::from("config/publishers.json")));
        assert_eq!(item_cap, 7);
        assert!(detail);
        assert!(no_warm_up);
        assert_eq!(run.attempts, 5);
    }

    #[cfg(not(feature = "browser"))]
    #[test]
    fn browser_commands_need_the_feature() {
        let args = BrowserArgs {
            page_load_timeout: 60,
            wait_timeout: 30,
            chrome: None,
        };
        let err = browser_factory(&args, "oreilly").unwrap_err();
        assert!(err.to_string().contains("--features browser"));
    }
}
