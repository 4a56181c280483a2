//! Test doubles and fixtures shared by unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use serde_json::json;

use crate::error::{Error, Result};
use crate::service::{ReasoningService, StageRequest};

/// A reasoning service that replays scripted replies in order and records
/// every request it receives.
#[derive(Default)]
pub(crate) struct ScriptedService {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<StageRequest>>,
}

impl ScriptedService {
    pub(crate) fn new(replies: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    /// Replies for a full successful run.
    pub(crate) fn happy_path() -> Self {
        Self::new([
            Ok(competitor_reply()),
            Ok(market_reply()),
            Ok(financial_reply()),
            Ok(report_reply()),
        ])
    }

    pub(crate) fn requests(&self) -> Vec<StageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ReasoningService for ScriptedService {
    fn respond(&self, request: StageRequest) -> impl Future<Output = Result<String>> + Send {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("no scripted reply left".into())));
        async move { reply }
    }
}

pub(crate) fn competitor_reply() -> String {
    json!({
        "industry": "Specialty coffee subscriptions",
        "competitors": [
            {
                "name": "Trade Coffee",
                "description": "Subscription marketplace matching drinkers with independent roasters.",
                "website": "https://www.drinktrade.com",
                "strengths": ["Roaster network", "Personalized quiz"],
                "weaknesses": ["Premium pricing"],
                "pricing": "From $15 per bag",
                "funding": "Series B",
                "market_position": "US market leader",
                "threat_level": "High"
            },
            {
                "name": "Atlas Coffee Club",
                "description": "Monthly single-origin coffee from a different country each month.",
                "website": null,
                "strengths": ["Storytelling"],
                "weaknesses": ["Limited choice"],
                "pricing": null,
                "funding": null,
                "market_position": "Niche travel theme",
                "threat_level": "Medium"
            }
        ],
        "insights": "Fragmented market with room for curation."
    })
    .to_string()
}

pub(crate) fn market_reply() -> String {
    // Fenced output, as some models still wrap JSON in markdown.
    format!(
        "```json\n{}\n```",
        json!({
            "market_size": "$45B global specialty coffee (2024)",
            "growth_rate": "7.2% CAGR [1]",
            "short_term_trends": ["Direct trade sourcing"],
            "mid_term_trends": ["Home espresso adoption"],
            "long_term_trends": ["Climate-driven supply shifts"],
            "major_players": ["Trade Coffee", "Atlas Coffee Club", "Blue Bottle"],
            "barriers_to_entry": ["Roaster relationships"],
            "opportunities": ["Corporate gifting"],
            "threats": ["Subscription fatigue"],
            "citations": ["https://example.com/specialty-coffee-report"]
        })
    )
}

pub(crate) fn financial_reply() -> String {
    json!({
        "TAM": 45.0e9,
        "SAM": 3.2e9,
        "SOM": 1.6e7,
        "annual_revenue_scenarios": "Pessimistic $2M, realistic $6M, optimistic $12M by year 3.",
        "unit_economics": "CAC $45, LTV $210, gross margin 38%.",
        "assumptions": "Average order $28, 9-month retention.",
        "risks_and_uncertainties": "Green coffee price volatility."
    })
    .to_string()
}

pub(crate) fn report_reply() -> String {
    json!({
        "report_markdown": "# Artisanal Coffee Subscription Box\n\n## Executive Summary\n\n- Growing niche\n\n**Confidence:** 72/100 (limited primary data)",
        "citations": ["https://example.com/specialty-coffee-report"],
        "confidence_score": 72,
        "generated_at": "2025-06-01T12:00:00Z"
    })
    .to_string()
}
