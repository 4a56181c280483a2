//! market-report - turn a product idea into a business report
//!
//! Four stages call a hosted reasoning service in a fixed order: competitor
//! analysis and market research (both with live web search), financial
//! estimation over those two results, and a writer that synthesizes the
//! final report. Every stage's reply is validated against a generated JSON
//! Schema before the next stage sees it. Progress comes back as a lazy
//! stream of strings that ends with the report markdown.
//!
//! # Quick Start
//!
//! ```ignore
//! use futures::StreamExt;
//! use market_report::{AnalysisManager, OpenAiResponses, Settings};
//!
//! #[tokio::main]
//! async fn main() -> market_report::Result<()> {
//!     let settings = Settings::load()?;
//!     let service = OpenAiResponses::from_settings(&settings);
//!     let manager = AnalysisManager::new(service, settings)?;
//!
//!     let mut chunks = Box::pin(manager.run("A subscription box for artisanal coffee"));
//!     while let Some(chunk) = chunks.next().await {
//!         println!("{}", chunk?);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
pub mod manager;
pub mod normalize;
pub mod present;
pub mod schema;
pub mod service;
pub mod settings;
pub mod stage;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use manager::AnalysisManager;
pub use normalize::{NormalizedInputs, normalize_inputs, to_mapping};
pub use schema::{
    BusinessReport, Competitor, CompetitorAnalysisResult, ConfidenceScore,
    FinancialEstimationResult, MarketResearchOutput,
};
pub use service::{OpenAiResponses, ReasoningService, StageRequest};
pub use settings::Settings;
pub use stage::{Stage, StageConfig, StageKind};
