//! market-report: research a product idea from the terminal.
//!
//!   market-report --query "A subscription box for artisanal coffee"
//!   market-report                      (prompts for ideas until EOF or `quit`)
//!
//! Requires OPENAI_API_KEY, read from the environment or a local `.env`.

use anyhow::{Context, Result};
use clap::Parser;

use market_report::settings::Settings;
use market_report::stage::{SearchContextSize, StageCallbacks, verbose_callbacks};
use market_report::{AnalysisManager, OpenAiResponses, present};

#[derive(Parser)]
#[command(name = "market-report", about = "Turn a product idea into a business report")]
struct Args {
    /// Product idea to analyze; omit to be prompted interactively
    #[arg(short, long)]
    query: Option<String>,

    /// Base URL of the Responses-compatible endpoint (overrides OPENAI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Model used by every stage (overrides MARKET_REPORT_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Web search context size: low, medium or high
    #[arg(long)]
    search_context: Option<SearchContextSize>,

    /// Trace viewer URL printed at the start of each run
    #[arg(long)]
    trace_viewer: Option<String>,

    /// Log every stage request and response
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of settings read from the
    /// environment.
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(url) = &self.base_url {
            settings = settings.base_url(url);
        }
        if let Some(model) = &self.model {
            settings = settings.model(model);
        }
        if let Some(size) = self.search_context {
            settings = settings.search_context_size(size);
        }
        if let Some(url) = &self.trace_viewer {
            settings = settings.trace_viewer(url);
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_report=info".into()),
        )
        .init();

    let args = Args::parse();
    // .env values win over the inherited environment
    let settings = args.apply(Settings::load().context("failed to load settings")?);
    tracing::debug!(?settings, "Loaded settings");

    let callbacks = if args.verbose {
        verbose_callbacks()
    } else {
        StageCallbacks::default()
    };
    let service = OpenAiResponses::from_settings(&settings);
    let manager = AnalysisManager::with_callbacks(service, settings, callbacks)?;

    let mut stdout = std::io::stdout();
    match args.query {
        Some(query) => {
            present::stream_to(&manager, &query, &mut stdout).await?;
        }
        None => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let completed = present::interactive(&manager, stdin, &mut stdout).await?;
            tracing::info!(completed, "Session ended");
        }
    }

    Ok(())
}
