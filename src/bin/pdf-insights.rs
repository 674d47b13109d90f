//! CLI binary for pdf-insights.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, drives one `InsightsSession` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use futures::future::{self, Either};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_insights::render::{render_answer, render_results};
use pdf_insights::{
    ClientConfig, InsightsSession, NoopObserver, Observer, PollObserver, PollOutcome, PollReport,
    QaSession, Slot, SlotError,
};
use serde::Serialize;
use std::future::Future;
use std::io;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI poll observer using indicatif ────────────────────────────────────────

/// Terminal observer: a spinner with the tick counter, plus one log line per
/// slot as it arrives or fails.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER_TICKS);
        bar.set_style(style);
        bar.set_prefix("Processing");
        bar.set_message("Waiting for the backend…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PollObserver for CliObserver {
    fn on_poll_start(&self, max_ticks: u32) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Polling for results (up to {max_ticks} checks)…"))
        ));
    }

    fn on_tick(&self, tick: u32, max_ticks: u32) {
        self.bar.set_prefix(format!("Check {tick}/{max_ticks}"));
        self.bar.set_message("Fetching results…");
    }

    fn on_slot_ready(&self, slot: Slot) {
        self.bar
            .println(format!("  {} {} available", green("✓"), capitalise(slot.label())));
        self.bar.set_message(format!("{} ready", slot.label()));
    }

    fn on_slot_error(&self, slot: Slot, error: &SlotError) {
        let msg = error.to_string();
        // Truncate very long error messages to keep output tidy.
        let msg = if msg.chars().count() > 80 {
            format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
        } else {
            msg
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), slot.label(), dim(&msg)));
    }

    fn on_poll_finished(&self, outcome: &PollOutcome) {
        self.bar.finish_and_clear();
        let mark = match outcome {
            PollOutcome::Completed { .. } => green("✔"),
            PollOutcome::Exhausted { .. } => cyan("⚠"),
            PollOutcome::Aborted { .. } => red("✘"),
        };
        eprintln!(
            "{} {}  {}",
            mark,
            bold(outcome.message()),
            dim(&format!("after {} check(s)", outcome.ticks()))
        );
        if let PollOutcome::Exhausted { missing, .. } = outcome {
            let names: Vec<_> = missing.iter().map(|s| s.label()).collect();
            eprintln!("   still missing: {}", names.join(", "));
        }
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Upload two PDFs, wait for results, print them
  pdf-insights report-2023.pdf report-2024.pdf

  # Upload from a URL and ask a follow-up once results are in
  pdf-insights https://arxiv.org/pdf/1706.03762 --ask "What is multi-head attention?"

  # Poll results of a run that is already in progress
  pdf-insights --poll-only

  # Ask questions only (corpus already uploaded)
  pdf-insights --ask "Which document reports higher revenue?" --ask "Why?"

  # Check every 3 seconds, give up after 20 checks, JSON output
  pdf-insights --interval 3 --max-ticks 20 --json *.pdf > results.json

ENVIRONMENT VARIABLES:
  PDF_INSIGHTS_BASE_URL      Backend base URL
  PDF_INSIGHTS_INTERVAL      Seconds between checks
  PDF_INSIGHTS_MAX_TICKS     Checks before giving up
  RUST_LOG                   Override log filter (e.g. pdf_insights=debug)

EXIT CODES:
  0  all results fetched (or questions answered)
  2  gave up before every result arrived
  130  interrupted with Ctrl-C
"#;

/// Upload PDFs to an insights backend, poll for results, and ask questions.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-insights",
    version,
    about = "Upload PDFs to an insights backend, poll for results, and ask questions",
    long_about = "Upload one or more PDF documents (local files or URLs) to a document-insights \
backend, wait for the final summaries, comparisons, top questions and table visualisations it \
produces, and ask free-text questions against the uploaded corpus.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF paths or HTTP/HTTPS URLs to upload as one batch.
    inputs: Vec<String>,

    /// Backend base URL.
    #[arg(long, env = "PDF_INSIGHTS_BASE_URL")]
    base_url: Option<String>,

    /// Seconds between result checks.
    #[arg(long, env = "PDF_INSIGHTS_INTERVAL", default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Result checks before giving up.
    #[arg(long, env = "PDF_INSIGHTS_MAX_TICKS", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_ticks: u32,

    /// Number of most recent table visualisations to show.
    #[arg(long, env = "PDF_INSIGHTS_TABLE_LIMIT", default_value_t = 10)]
    table_limit: usize,

    /// Skip the upload and poll results of a run already in progress.
    #[arg(long, conflicts_with = "inputs")]
    poll_only: bool,

    /// Question to ask after results arrive (repeatable).
    #[arg(short = 'a', long = "ask", value_name = "QUESTION")]
    questions: Vec<String>,

    /// Output structured JSON instead of text.
    #[arg(long, env = "PDF_INSIGHTS_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF_INSIGHTS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_INSIGHTS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "PDF_INSIGHTS_QUIET")]
    quiet: bool,

    /// Per-request timeout for result checks and questions, in seconds.
    #[arg(long, env = "PDF_INSIGHTS_REQUEST_TIMEOUT", default_value_t = 60)]
    request_timeout: u64,

    /// Upload timeout in seconds.
    #[arg(long, env = "PDF_INSIGHTS_UPLOAD_TIMEOUT", default_value_t = 600)]
    upload_timeout: u64,

    /// Download timeout for URL inputs in seconds.
    #[arg(long, env = "PDF_INSIGHTS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

/// Everything printed by `--json`.
#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    poll: Option<&'a PollReport>,
    answers: &'a [QaSession],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active;
    // the spinner provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let base_url = config.base_url.clone();
    let mut session = InsightsSession::new(config).context("Failed to create HTTP client")?;

    // ── Upload + poll ────────────────────────────────────────────────────
    let observer: Observer = if show_progress {
        CliObserver::new() as Observer
    } else {
        Arc::new(NoopObserver)
    };

    let mut report = None;
    if !cli.inputs.is_empty() {
        for input in &cli.inputs {
            session
                .add_input(input)
                .await
                .with_context(|| format!("Failed to add '{input}'"))?;
        }
        if !cli.quiet {
            eprintln!(
                "{} Uploading {} file(s), {} bytes → {}",
                cyan("◆"),
                session.batch().len(),
                session.batch().total_bytes(),
                dim(&base_url)
            );
        }
        session
            .submit(observer)
            .await
            .context("Error during processing")?;
        report = wait_with_ctrl_c(&mut session).await;
    } else if cli.poll_only {
        session
            .resume_polling(observer)
            .context("Failed to start polling")?;
        report = wait_with_ctrl_c(&mut session).await;
    }

    // ── Questions ────────────────────────────────────────────────────────
    let mut interrupted = matches!(
        report.as_ref().map(|r| &r.outcome),
        Some(PollOutcome::Aborted { .. })
    );
    let mut answers = Vec::new();
    if !interrupted {
        for question in &cli.questions {
            let asked = or_interrupt(session.ask(question), ctrl_c())
                .await
                .map(|r| r.cloned());
            match asked {
                Some(Ok(qa)) => answers.push(qa),
                Some(Err(e)) => eprintln!("{} {}", red("✗"), e),
                None => {
                    eprintln!("{} Interrupted", red("✘"));
                    interrupted = true;
                    break;
                }
            }
        }
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let out = JsonOutput {
            poll: report.as_ref(),
            answers: &answers,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialise output")?
        );
    } else {
        if let Some(ref r) = report {
            println!("{}", render_results(&r.state, &base_url));
            if !cli.quiet && !show_progress {
                eprintln!(
                    "{} (after {} check(s))",
                    r.outcome.message(),
                    r.outcome.ticks()
                );
            }
        }
        for qa in &answers {
            println!("{}", render_answer(qa));
        }
        if !cli.quiet && cli.questions.is_empty() {
            if let Some(first) = session.suggested_questions().first() {
                eprintln!(
                    "{} Ask a follow-up: pdf-insights --ask {:?}",
                    dim("tip:"),
                    first
                );
            }
        }
    }

    if interrupted {
        std::process::exit(130);
    }
    match report.map(|r| r.outcome) {
        Some(PollOutcome::Exhausted { .. }) => std::process::exit(2),
        _ => Ok(()),
    }
}

// ── Ctrl-C ───────────────────────────────────────────────────────────────────

/// Resolves on Ctrl-C; never, if the signal handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Drive `work` to completion. If `interrupt` fires first, call `stop` and
/// keep awaiting `work` so it can wind down and report.
async fn stop_on_interrupt<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = ()>,
    stop: impl FnOnce(),
) -> T {
    let work = pin!(work);
    let interrupt = pin!(interrupt);
    match future::select(work, interrupt).await {
        Either::Left((out, _)) => out,
        Either::Right(((), work)) => {
            stop();
            work.await
        }
    }
}

/// `Some(output)` of `work`, or `None` if `interrupt` fires first.
async fn or_interrupt<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = ()>,
) -> Option<T> {
    let work = pin!(work);
    let interrupt = pin!(interrupt);
    match future::select(work, interrupt).await {
        Either::Left((out, _)) => Some(out),
        Either::Right(_) => None,
    }
}

/// Wait for the session's poll, stopping it cleanly on Ctrl-C.
async fn wait_with_ctrl_c(session: &mut InsightsSession) -> Option<PollReport> {
    let stopper = session.stopper();
    stop_on_interrupt(session.wait(), ctrl_c(), move || {
        if let Some(stopper) = stopper {
            stopper.stop();
        }
    })
    .await
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .poll_interval(Duration::from_secs(cli.interval))
        .max_ticks(cli.max_ticks)
        .table_visuals_limit(cli.table_limit)
        .request_timeout_secs(cli.request_timeout)
        .upload_timeout_secs(cli.upload_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }

    builder.build().context("Invalid configuration")
}
