//! The analysis pipeline.
//!
//! [`AnalysisManager::run`] drives the four stages for one query in a fixed
//! order and hands progress back as a lazy stream. The stream is pull-driven:
//! each item is produced only when the consumer polls for it, and the next
//! stage does not start until then.
//!
//! ```text
//! Init -> Competitor -> Market -> Financial -> Writing -> Delivering -> (finished)
//!    \________\___________\__________\____________\-----> (failed)
//! ```
//!
//! A finished or failed run holds no phase; polling it again yields nothing.

use std::sync::Arc;

use futures::stream::{self, Stream};
use serde_json::json;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::error::Result;
use crate::normalize::{normalize_inputs, to_mapping};
use crate::schema::{
    BusinessReport, CompetitorAnalysisResult, FinancialEstimationResult, MarketResearchOutput,
};
use crate::service::ReasoningService;
use crate::settings::Settings;
use crate::stage::{Stage, StageCallbacks, StageKind, prompt};

pub const COMPETITOR_DONE: &str = "Competitor analysis completed, starting market research..";
pub const MARKET_DONE: &str = "Market research completed, starting financial estimation..";
pub const FINANCIAL_DONE: &str = "Financial estimation completed, writing report..";
pub const REPORT_DONE: &str = "Report complete..";

/// Generate a fresh trace identifier: `trace_` followed by 32 hex digits.
pub fn gen_trace_id() -> String {
    format!("trace_{}", Uuid::new_v4().simple())
}

/// Runs the competitor, market, financial and writer stages for a query.
pub struct AnalysisManager<S> {
    pipeline: Arc<Pipeline<S>>,
}

impl<S> Clone for AnalysisManager<S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

struct Pipeline<S> {
    service: S,
    settings: Settings,
    competitor: Stage<CompetitorAnalysisResult>,
    market: Stage<MarketResearchOutput>,
    financial: Stage<FinancialEstimationResult>,
    writer: Stage<BusinessReport>,
}

impl<S: ReasoningService + 'static> AnalysisManager<S> {
    pub fn new(service: S, settings: Settings) -> Result<Self> {
        Self::with_callbacks(service, settings, StageCallbacks::default())
    }

    /// Build the pipeline with observability callbacks attached to every
    /// stage.
    pub fn with_callbacks(
        service: S,
        settings: Settings,
        callbacks: StageCallbacks,
    ) -> Result<Self> {
        let config = settings.stage_config();
        let pipeline = Pipeline {
            competitor: Stage::new(StageKind::Competitor, config.clone())?
                .with_callbacks(callbacks.clone()),
            market: Stage::new(StageKind::Market, config.clone())?
                .with_callbacks(callbacks.clone()),
            financial: Stage::new(StageKind::Financial, config.clone())?
                .with_callbacks(callbacks.clone()),
            writer: Stage::new(StageKind::Writer, config)?.with_callbacks(callbacks),
            service,
            settings,
        };
        Ok(Self {
            pipeline: Arc::new(pipeline),
        })
    }

    /// Start a run for `query`.
    ///
    /// Yields the trace reference, one notice per completed stage, a
    /// completion notice and finally the report markdown. If a stage fails,
    /// its error is yielded once and the stream ends. Dropping the stream
    /// abandons the run.
    pub fn run(&self, query: &str) -> impl Stream<Item = Result<String>> + Send + use<S> {
        let run = Run::new(Arc::clone(&self.pipeline), query.to_string());
        stream::unfold(run, |mut run| async move {
            let item = run.step().await?;
            Some((item, run))
        })
    }
}

enum Phase {
    Init,
    Competitor,
    Market(CompetitorAnalysisResult),
    Financial(CompetitorAnalysisResult, MarketResearchOutput),
    Writing(
        CompetitorAnalysisResult,
        MarketResearchOutput,
        FinancialEstimationResult,
    ),
    Delivering(BusinessReport),
}

/// State of a single run.
struct Run<S> {
    pipeline: Arc<Pipeline<S>>,
    query: String,
    trace_id: String,
    span: Span,
    /// `None` once the run has finished or failed.
    phase: Option<Phase>,
}

impl<S: ReasoningService + 'static> Run<S> {
    fn new(pipeline: Arc<Pipeline<S>>, query: String) -> Self {
        let trace_id = gen_trace_id();
        let span = tracing::info_span!("market_analysis", trace_id = %trace_id);
        Self {
            pipeline,
            query,
            trace_id,
            span,
            phase: Some(Phase::Init),
        }
    }

    /// Advance one phase. `None` once the run is done or has failed.
    async fn step(&mut self) -> Option<Result<String>> {
        let phase = self.phase.take()?;
        let span = self.span.clone();

        match self.advance(phase).instrument(span.clone()).await {
            Ok((next, item)) => {
                self.phase = next;
                Some(Ok(item))
            }
            Err(e) => {
                tracing::error!(parent: &span, error = %e, "Analysis failed");
                Some(Err(e))
            }
        }
    }

    async fn advance(&self, phase: Phase) -> Result<(Option<Phase>, String)> {
        let pipeline = &*self.pipeline;
        let service = &pipeline.service;

        match phase {
            Phase::Init => {
                let url = pipeline.settings.trace_url(&self.trace_id);
                tracing::info!(%url, "Starting analysis");
                Ok((Some(Phase::Competitor), format!("View trace: {}", url)))
            }
            Phase::Competitor => {
                tracing::info!("Performing competitor analysis");
                let competitor = pipeline.competitor.run(service, &self.query).await?;
                tracing::info!(
                    competitors = competitor.competitors.len(),
                    "Competitor analysis completed"
                );
                Ok((Some(Phase::Market(competitor)), COMPETITOR_DONE.to_string()))
            }
            Phase::Market(competitor) => {
                tracing::info!("Performing market research");
                let market = pipeline.market.run(service, &self.query).await?;
                tracing::info!("Market research completed");
                Ok((
                    Some(Phase::Financial(competitor, market)),
                    MARKET_DONE.to_string(),
                ))
            }
            Phase::Financial(competitor, market) => {
                tracing::info!("Performing financial estimation");
                let context = financial_context(&competitor, &market);
                let financial = pipeline.financial.run(service, &context).await?;
                tracing::info!(
                    tam = financial.tam,
                    sam = financial.sam,
                    som = financial.som,
                    "Financial estimation completed"
                );
                Ok((
                    Some(Phase::Writing(competitor, market, financial)),
                    FINANCIAL_DONE.to_string(),
                ))
            }
            Phase::Writing(competitor, market, financial) => {
                tracing::info!("Writing report");
                let task = writer_prompt(&competitor, &market, &financial);
                let report = pipeline.writer.run(service, &task).await?;
                tracing::info!(
                    confidence = %report.confidence_score,
                    citations = report.citations.len(),
                    "Report complete"
                );
                Ok((Some(Phase::Delivering(report)), REPORT_DONE.to_string()))
            }
            Phase::Delivering(report) => Ok((None, report.report_markdown)),
        }
    }
}

/// Input for the financial stage: both prior results as one JSON document.
pub fn financial_context(
    competitor: &CompetitorAnalysisResult,
    market: &MarketResearchOutput,
) -> String {
    let context = json!({
        "competitor_data": to_mapping(competitor),
        "market_data": to_mapping(market),
    });
    serde_json::to_string_pretty(&context).unwrap_or_else(|_| context.to_string())
}

/// Task for the writer stage with the three normalized results embedded as
/// labeled sections.
pub fn writer_prompt(
    competitor: &CompetitorAnalysisResult,
    market: &MarketResearchOutput,
    financial: &FinancialEstimationResult,
) -> String {
    let [competitor, market, financial] =
        normalize_inputs(competitor, market, financial).sections();
    prompt::writer_task(&competitor, &market, &financial)
}
