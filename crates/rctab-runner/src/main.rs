/*
[INPUT]:  CLI arguments, environment settings, OS shutdown signals
[OUTPUT]: A running collection job with graceful shutdown
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rctab_adapter::{ApiAuth, AzureClient, RctabClient};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rctab_runner::{Settings, jobs, scheduler};

#[derive(Parser, Debug)]
#[command(name = "rctab-runner", version, about = "RCTab collection job runner")]
struct Cli {
    #[command(subcommand)]
    job: Job,
    /// Run a single invocation and exit
    #[arg(long)]
    once: bool,
    /// Seconds between runs (defaults to the job's own interval)
    #[arg(long, value_name = "SECONDS")]
    every: Option<u64>,
    /// Overrides the LOG_LEVEL setting
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Job {
    /// Collect recent daily usage and upload it
    Usage,
    /// Collect previous-month usage on the 7th and 8th
    MonthlyUsage,
    /// Collect year-to-date cost management totals
    CostManagement,
    /// Collect subscription status and role assignments
    Status,
    /// Enable or disable subscriptions as directed by the API
    Controller,
}

impl Job {
    fn name(self) -> &'static str {
        match self {
            Job::Usage => "usage",
            Job::MonthlyUsage => "monthly-usage",
            Job::CostManagement => "cost-management",
            Job::Status => "status",
            Job::Controller => "controller",
        }
    }

    /// Identity the job presents to the accounting API
    fn api_subject(self) -> &'static str {
        match self {
            Job::Usage | Job::MonthlyUsage | Job::CostManagement => "usage-app",
            Job::Status => "status-app",
            Job::Controller => "controller-app",
        }
    }

    fn default_interval(self) -> Duration {
        match self {
            Job::Usage => Duration::from_secs(3600),
            Job::MonthlyUsage => Duration::from_secs(7200),
            Job::CostManagement => Duration::from_secs(86400),
            Job::Status => Duration::from_secs(3600),
            Job::Controller => Duration::from_secs(3600),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // If incorrect settings have been given, better to find out sooner
    // rather than later.
    let settings = Settings::load().context("load settings")?;
    init_tracing(args.log_level.as_deref().unwrap_or(&settings.log_level))?;

    info!(job = args.job.name(), once = args.once, "starting rctab-runner");

    let auth = ApiAuth::new(&settings.private_key, args.job.api_subject())
        .context("build API signer")?;
    let rctab =
        RctabClient::new(settings.api_url.as_str(), auth).context("build accounting client")?;
    let azure = AzureClient::new(settings.azure_credentials()?).context("build Azure client")?;

    if args.once {
        return dispatch(args.job, &settings, &azure, &rctab).await;
    }

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    let every = args
        .every
        .map(Duration::from_secs)
        .unwrap_or_else(|| args.job.default_interval());
    info!(job = args.job.name(), interval = ?every, "scheduling job");

    scheduler::run_repeating(args.job.name(), every, shutdown, async || {
        dispatch(args.job, &settings, &azure, &rctab).await
    })
    .await;

    info!("runner stopped");
    Ok(())
}

async fn dispatch(
    job: Job,
    settings: &Settings,
    azure: &AzureClient,
    rctab: &RctabClient,
) -> Result<()> {
    match job {
        Job::Usage => jobs::usage::run(settings, azure, rctab).await,
        Job::MonthlyUsage => jobs::monthly::run(settings, azure, rctab).await,
        Job::CostManagement => jobs::cost::run(settings, azure, rctab).await,
        Job::Status => jobs::status::run(settings, azure, rctab).await,
        Job::Controller => jobs::controller::run(settings, azure, rctab).await,
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
