//! Command-line interface for report-rs

mod output;

use anyhow::{Context, anyhow, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use report_client::{HttpReportClient, ReportBackend};
use report_core::{JobKind, JobRequest, NetMode, Preset, ReportView};
use report_jobs::{CoverageChecker, CoverageMode, PollerState, ReportSession, ReportState, SessionConfig};
use report_utils::{Config, init_tracing_with};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "report-cli")]
#[command(about = "Run cost/PnL reports against the report backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a report for a time window
    Run(RunArgs),
    /// Generate an AI narrative for an existing report
    Analyze(AnalyzeArgs),
    /// Check market data coverage for a time window
    Coverage(RequestArgs),
    /// List exchange accounts
    Accounts,
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Named window: last_7d, last_30d, this_month, last_month, ytd or all_time
    #[arg(long, conflicts_with_all = ["start", "end"])]
    preset: Option<Preset>,

    /// First day of an explicit window (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,

    /// Last day of an explicit window (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,

    /// Restrict to an account id; repeat for several
    #[arg(long = "account", value_name = "ID")]
    accounts: Vec<String>,

    /// Restrict to one exchange
    #[arg(long)]
    exchange: Option<String>,

    /// Net formula: fees_only or fees_plus_funding
    #[arg(long, default_value_t = NetMode::FeesOnly)]
    net_mode: NetMode,
}

impl RequestArgs {
    fn to_request(&self) -> JobRequest {
        let mut request = match (self.start, self.end) {
            (Some(start), Some(end)) => JobRequest::range(start, end),
            _ => JobRequest::preset(self.preset.unwrap_or_default()),
        };
        if !self.accounts.is_empty() {
            request = request.with_accounts(self.accounts.iter().cloned());
        }
        if let Some(exchange) = &self.exchange {
            request = request.with_exchange(exchange.clone());
        }
        request.with_net_mode(self.net_mode)
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Skip the market coverage check and produce a fees-only report
    #[arg(long)]
    fees_only: bool,

    /// Wait on the synchronous endpoint instead of polling
    #[arg(long)]
    sync: bool,

    /// Also generate an AI narrative once the report is ready
    #[arg(long)]
    analyze: bool,

    /// API key for AI narratives
    #[arg(long, env = "REPORT_ANALYSIS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Id of the report to analyse
    report_id: String,

    /// Regenerate even if a narrative already exists
    #[arg(long)]
    refresh: bool,

    /// Wait on the synchronous endpoint instead of polling
    #[arg(long)]
    sync: bool,

    /// Net formula used for the summary table
    #[arg(long, default_value_t = NetMode::FeesOnly)]
    net_mode: NetMode,

    /// API key for AI narratives
    #[arg(long, env = "REPORT_ANALYSIS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().unwrap_or_else(|err| {
        eprintln!("{err}; falling back to default logging");
        Config::default()
    });
    init_tracing_with(&config)?;
    info!("Starting {}", config.app_name);

    let client = HttpReportClient::from_env().context("failed to configure the report client")?;
    let backend: Arc<dyn ReportBackend> = Arc::new(client);

    match cli.command {
        Commands::Run(args) => run(backend, args).await,
        Commands::Analyze(args) => analyze(backend, args).await,
        Commands::Coverage(args) => coverage(backend, &args).await,
        Commands::Accounts => accounts(backend.as_ref()).await,
    }
}

async fn run(backend: Arc<dyn ReportBackend>, args: RunArgs) -> anyhow::Result<()> {
    let api_key = if args.analyze {
        Some(require_api_key(args.api_key.as_deref())?)
    } else {
        None
    };
    let request = args.request.to_request();
    let net_mode = request.net_mode;
    let mode = if args.fees_only {
        CoverageMode::Skip
    } else {
        CoverageMode::Check
    };

    let mut session = ReportSession::new(backend, SessionConfig::default())?;
    let progress = print_progress(session.subscribe());

    if args.sync {
        session.run_report_blocking(request, mode).await?;
        if let Some(key) = &api_key {
            session.generate_analysis_blocking(key, false).await?;
        }
    } else {
        let handle = session.run_report(request, mode).await?;
        info!("Waiting for {}", handle);
        ensure_completed(&session, JobKind::Report).await?;

        if let Some(key) = &api_key {
            session.generate_analysis(key, false).await?;
            ensure_completed(&session, JobKind::Analysis).await?;
        }
    }

    progress.abort();
    print_report(&session.state(), net_mode)
}

async fn analyze(backend: Arc<dyn ReportBackend>, args: AnalyzeArgs) -> anyhow::Result<()> {
    let api_key = require_api_key(args.api_key.as_deref())?;

    let mut session = ReportSession::new(backend, SessionConfig::default())?;
    session
        .open_report(&args.report_id)
        .await
        .with_context(|| format!("failed to load report {}", args.report_id))?;
    let progress = print_progress(session.subscribe());

    if args.sync {
        session
            .generate_analysis_blocking(&api_key, args.refresh)
            .await?;
    } else {
        session.generate_analysis(&api_key, args.refresh).await?;
        ensure_completed(&session, JobKind::Analysis).await?;
    }

    progress.abort();
    print_report(&session.state(), args.net_mode)
}

async fn coverage(backend: Arc<dyn ReportBackend>, args: &RequestArgs) -> anyhow::Result<()> {
    let checker = CoverageChecker::new(backend, SessionConfig::default().request_timeout);
    let report = checker.check(&args.to_request()).await?;
    println!("{}", output::coverage_table(&report));
    Ok(())
}

async fn accounts(backend: &dyn ReportBackend) -> anyhow::Result<()> {
    let accounts = backend.list_accounts().await?;
    if accounts.is_empty() {
        println!("No accounts configured");
    } else {
        println!("{}", output::accounts_table(&accounts));
    }
    Ok(())
}

fn require_api_key(key: Option<&str>) -> anyhow::Result<String> {
    match key.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => bail!("an analysis API key is required (--api-key or REPORT_ANALYSIS_API_KEY)"),
    }
}

/// Wait for the job of `kind` to end; Ctrl-C abandons it
async fn ensure_completed(session: &ReportSession, kind: JobKind) -> anyhow::Result<()> {
    let finished = async {
        match kind {
            JobKind::Report => session.wait_report().await,
            JobKind::Analysis => session.wait_analysis().await,
        }
    };

    let outcome = tokio::select! {
        outcome = finished => outcome,
        _ = tokio::signal::ctrl_c() => return Err(anyhow!("interrupted")),
    };

    if outcome == Some(PollerState::Completed) {
        return Ok(());
    }
    match &session.state().track(kind).error {
        Some(error) => bail!("{kind} job failed: {error}"),
        None => bail!("{kind} job did not complete ({outcome:?})"),
    }
}

fn print_progress(mut updates: watch::Receiver<ReportState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = None;
        while updates.changed().await.is_ok() {
            let line = output::progress_line(&updates.borrow_and_update());
            if line != last {
                if let Some(text) = &line {
                    eprintln!("{text}");
                }
                last = line;
            }
        }
    })
}

fn print_report(state: &ReportState, net_mode: NetMode) -> anyhow::Result<()> {
    if let Some(message) = &state.warning {
        warn!("{}", message);
    }
    let report = state.report.as_ref().context("no report available")?;
    let view = ReportView::new(report, net_mode);

    println!("{}", output::report_table(&view));
    if let Some(narrative) = &view.narrative {
        println!("\n{narrative}");
    } else if !report.base_narrative.is_empty() {
        println!("\n{}", report.base_narrative);
    }
    Ok(())
}
