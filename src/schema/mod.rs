//! Structured results produced by each pipeline stage.
//!
//! Every record is a plain value with a generated JSON Schema. The doc
//! comments on fields end up as `description` entries in that schema, which
//! is what the reasoning service sees when it is asked for structured output.

mod contract;

pub use contract::{Contract, StageOutput};

use chrono::{NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Largest number of competitors a competitor analysis may list.
pub const MAX_COMPETITORS: usize = 5;

/// A single competitor profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Competitor {
    /// Competitor name
    pub name: String,
    /// 2-3 sentence overview of product/service
    pub description: String,
    /// Official website URL
    #[serde(default)]
    pub website: Option<String>,
    /// Key strengths and differentiators
    #[serde(default)]
    pub strengths: Vec<String>,
    /// Notable weaknesses or limitations
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Pricing information if available
    #[serde(default)]
    pub pricing: Option<String>,
    /// Funding stage or total raised
    #[serde(default)]
    pub funding: Option<String>,
    /// Market share, niche, or position
    #[serde(default)]
    pub market_position: Option<String>,
    /// Low / Medium / High competitive threat
    #[serde(default)]
    pub threat_level: Option<String>,
}

/// Output of the competitor analysis stage. Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CompetitorAnalysisResult {
    /// Industry the product idea belongs to
    #[schemars(length(min = 1))]
    pub industry: String,
    /// Up to 5 direct and indirect competitors
    #[schemars(length(max = 5))]
    pub competitors: Vec<Competitor>,
    /// Overall competitive landscape insights
    #[serde(default)]
    pub insights: Option<String>,
}

/// Output of the market research stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarketResearchOutput {
    /// Market size in USD or user base
    pub market_size: String,
    /// Growth rate (CAGR) with source
    pub growth_rate: String,
    pub short_term_trends: Vec<String>,
    pub mid_term_trends: Vec<String>,
    pub long_term_trends: Vec<String>,
    /// Major industry players and emerging entrants
    pub major_players: Vec<String>,
    /// Regulatory, technological or other barriers to entry
    pub barriers_to_entry: Vec<String>,
    /// Opportunities for innovation and differentiation
    pub opportunities: Vec<String>,
    /// Economic, political and technological threats
    pub threats: Vec<String>,
    pub citations: Vec<String>,
}

/// Output of the financial estimation stage. Market sizes are in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialEstimationResult {
    /// Total Addressable Market (TAM) value in monetary terms, representing the maximum revenue opportunity for the product or service.
    #[serde(rename = "TAM")]
    #[schemars(range(min = 0))]
    pub tam: f64,
    /// Serviceable Addressable Market (SAM) value in monetary terms, indicating the portion of TAM targeted by the company.
    #[serde(rename = "SAM")]
    #[schemars(range(min = 0))]
    pub sam: f64,
    /// Serviceable Obtainable Market (SOM) value in monetary terms, representing the realistic market share the company expects to capture.
    #[serde(rename = "SOM")]
    #[schemars(range(min = 0))]
    pub som: f64,
    /// Projected annual revenue scenarios (e.g., conservative, moderate, aggressive) based on various business assumptions.
    pub annual_revenue_scenarios: String,
    /// Analysis of revenue and cost per unit, including metrics like CAC (Customer Acquisition Cost) and LTV (Lifetime Value).
    pub unit_economics: String,
    /// Key assumptions made while preparing financial estimates, such as growth rate, pricing strategy, and customer base size.
    pub assumptions: String,
    /// Identified financial and operational risks, along with uncertainties that could impact the estimates.
    pub risks_and_uncertainties: String,
}

impl FinancialEstimationResult {
    /// Whether SOM <= SAM <= TAM holds.
    pub fn is_nested(&self) -> bool {
        self.som <= self.sam && self.sam <= self.tam
    }
}

/// Final output of the writer stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BusinessReport {
    /// The complete business report formatted in Markdown, including sections, bullet points, and tables where applicable.
    #[schemars(length(min = 1))]
    pub report_markdown: String,
    /// A list of sources, references, or URLs cited in the report to support claims and data.
    pub citations: Vec<String>,
    /// A score from 0 to 100 indicating the model's confidence in the accuracy and reliability of the report.
    pub confidence_score: ConfidenceScore,
    /// The ISO 8601 timestamp indicating when the report was generated.
    pub generated_at: String,
}

impl BusinessReport {
    /// Build a report, checking the confidence range.
    pub fn new(
        report_markdown: impl Into<String>,
        citations: Vec<String>,
        confidence_score: i64,
        generated_at: impl Into<String>,
    ) -> Result<Self, InvalidScore> {
        Ok(Self {
            report_markdown: report_markdown.into(),
            citations,
            confidence_score: ConfidenceScore::try_from(confidence_score)?,
            generated_at: generated_at.into(),
        })
    }
}

/// Whether a timestamp string is an ISO-8601 date or date-time.
pub(crate) fn is_iso8601(value: &str) -> bool {
    let value = value.trim();
    chrono::DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Current UTC time in RFC 3339 form.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Self-reported report confidence, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub struct ConfidenceScore(u8);

impl ConfidenceScore {
    pub const MAX: u8 = 100;

    pub fn get(self) -> u8 {
        self.0
    }
}

/// A confidence score outside `0..=100` or not a whole number.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidScore(pub String);

impl fmt::Display for InvalidScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "confidence score {} is not an integer in 0..=100", self.0)
    }
}

impl std::error::Error for InvalidScore {}

impl TryFrom<i64> for ConfidenceScore {
    type Error = InvalidScore;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (0..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(InvalidScore(value.to_string()))
        }
    }
}

impl TryFrom<f64> for ConfidenceScore {
    type Error = InvalidScore;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(InvalidScore(value.to_string()));
        }
        if value < 0.0 || value > f64::from(Self::MAX) {
            return Err(InvalidScore(value.to_string()));
        }
        Ok(Self(value as u8))
    }
}

impl From<ConfidenceScore> for u8 {
    fn from(score: ConfidenceScore) -> Self {
        score.0
    }
}

impl fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl JsonSchema for ConfidenceScore {
    fn inline_schema() -> bool {
        true
    }

    fn schema_name() -> Cow<'static, str> {
        "ConfidenceScore".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "integer",
            "minimum": 0,
            "maximum": 100
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_bounds() {
        assert!(ConfidenceScore::try_from(0i64).is_ok());
        assert_eq!(ConfidenceScore::try_from(100i64).unwrap().get(), 100);
        assert!(ConfidenceScore::try_from(101i64).is_err());
        assert!(ConfidenceScore::try_from(-1i64).is_err());
    }

    #[test]
    fn test_confidence_from_json() {
        let score: ConfidenceScore = serde_json::from_str("87").unwrap();
        assert_eq!(score.get(), 87);

        let score: ConfidenceScore = serde_json::from_str("87.0").unwrap();
        assert_eq!(score.get(), 87);

        assert!(serde_json::from_str::<ConfidenceScore>("87.5").is_err());
        assert!(serde_json::from_str::<ConfidenceScore>("101").is_err());
        assert!(serde_json::from_str::<ConfidenceScore>("-1").is_err());

        assert_eq!(serde_json::to_string(&score).unwrap(), "87");
    }

    #[test]
    fn test_business_report_new_rejects_out_of_range() {
        assert!(BusinessReport::new("# Report", vec![], 101, "2025-01-01").is_err());
        assert!(BusinessReport::new("# Report", vec![], -1, "2025-01-01").is_err());

        let report = BusinessReport::new("# Report", vec![], 75, "2025-01-01").unwrap();
        assert_eq!(report.confidence_score.get(), 75);
    }

    #[test]
    fn test_competitor_absent_distinct_from_empty() {
        let json = r#"{
            "name": "Acme",
            "description": "Coffee club",
            "website": "",
            "strengths": [],
            "weaknesses": []
        }"#;
        let competitor: Competitor = serde_json::from_str(json).unwrap();
        assert_eq!(competitor.website, Some(String::new()));
        assert_eq!(competitor.pricing, None);
    }

    #[test]
    fn test_competitor_analysis_rejects_unknown_fields() {
        let json = r#"{"industry": "Coffee", "competitors": [], "insights": null, "extra": 1}"#;
        assert!(serde_json::from_str::<CompetitorAnalysisResult>(json).is_err());
    }

    #[test]
    fn test_market_research_ignores_unknown_fields() {
        let json = serde_json::json!({
            "market_size": "$1B",
            "growth_rate": "5%",
            "short_term_trends": [],
            "mid_term_trends": [],
            "long_term_trends": [],
            "major_players": [],
            "barriers_to_entry": [],
            "opportunities": [],
            "threats": [],
            "citations": [],
            "notes": "ignored"
        });
        assert!(serde_json::from_value::<MarketResearchOutput>(json).is_ok());
    }

    #[test]
    fn test_financial_wire_names() {
        let result = FinancialEstimationResult {
            tam: 100.0,
            sam: 50.0,
            som: 5.0,
            annual_revenue_scenarios: String::new(),
            unit_economics: String::new(),
            assumptions: String::new(),
            risks_and_uncertainties: String::new(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["TAM"], 100.0);
        assert_eq!(value["SOM"], 5.0);
        assert!(result.is_nested());
    }

    #[test]
    fn test_is_iso8601() {
        assert!(is_iso8601("2025-03-04T10:00:00Z"));
        assert!(is_iso8601("2025-03-04T10:00:00+02:00"));
        assert!(is_iso8601("2025-03-04T10:00:00"));
        assert!(is_iso8601("2025-03-04"));
        assert!(!is_iso8601("March 4th"));
        assert!(is_iso8601(&now_rfc3339()));
    }
}
