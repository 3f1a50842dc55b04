//! Recommendation output handed to the human decision layer.

use crate::{config::EngineConfig, scorer::ScoredCandidate, types::UserId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Which path produced a recommendation. Recorded for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMethod {
    LlmReasoning,
    ScoreBased,
}

impl AgentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMethod::LlmReasoning => "llm_reasoning",
            AgentMethod::ScoreBased => "score_based",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "llm_reasoning" => Some(AgentMethod::LlmReasoning),
            "score_based" => Some(AgentMethod::ScoreBased),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub user_id: UserId,
    pub name: String,
    /// 0–100.
    pub score: u32,
    pub primary_reason: String,
    pub reasons: Vec<String>,
    pub explanation: String,
    /// Deterministic total from the scorer, unscaled.
    pub algorithm_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Ranked best-first; index 0 is top1.
    pub entries: Vec<RecommendationEntry>,
    pub overall_analysis: String,
    pub agent_method: AgentMethod,
}

pub const FALLBACK_ANALYSIS: &str =
    "Recommendations based on algorithmic scoring (LLM unavailable)";

impl Recommendation {
    /// Deterministic recommendation straight from the scorer's ranking.
    pub fn score_based(config: &EngineConfig, ranked: &[ScoredCandidate]) -> Self {
        let entries = ranked
            .iter()
            .enumerate()
            .map(|(i, c)| RecommendationEntry {
                user_id: c.person.user_id.clone(),
                name: c.person.display_name(),
                score: scale_score(config, c.total_score),
                primary_reason: "score_based".to_string(),
                reasons: score_reasons(c),
                explanation: format!("Ranked {} based on combined scoring algorithm", i + 1),
                algorithm_score: c.total_score,
            })
            .collect();
        Self {
            entries,
            overall_analysis: FALLBACK_ANALYSIS.to_string(),
            agent_method: AgentMethod::ScoreBased,
        }
    }

    pub fn top1(&self) -> Option<&RecommendationEntry> {
        self.entries.first()
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        self.entries.iter().map(|e| e.user_id.clone()).collect()
    }

    /// `{top1..topN, overall_analysis, agent_method}`.
    pub fn to_output_json(&self) -> Value {
        let mut out = Map::new();
        for (i, e) in self.entries.iter().enumerate() {
            out.insert(
                format!("top{}", i + 1),
                json!({
                    "user_id": e.user_id,
                    "name": e.name,
                    "score": e.score,
                    "primary_reason": e.primary_reason,
                    "reasons": e.reasons,
                    "explanation": e.explanation,
                }),
            );
        }
        out.insert("overall_analysis".into(), json!(self.overall_analysis));
        out.insert("agent_method".into(), json!(self.agent_method.as_str()));
        Value::Object(out)
    }
}

/// Map a raw total onto 0–100 against the config's best possible total.
pub fn scale_score(config: &EngineConfig, total: u32) -> u32 {
    let max = config.max_total_score();
    if max == 0 {
        return 0;
    }
    ((total as f64 / max as f64) * 100.0).round().min(100.0) as u32
}

fn score_reasons(c: &ScoredCandidate) -> Vec<String> {
    let on_call = if c.person.on_call { "Yes" } else { "No" };
    let workload = match (c.open_count, c.person.max_concurrent) {
        (Some(open), Some(max)) => format!(" ({open}/{max} open)"),
        _ => String::new(),
    };
    vec![
        format!("Skill match score: {}", c.skill_score),
        format!("On-call: {on_call} (score {})", c.oncall_score),
        format!("Shift score: {}", c.shift_score),
        format!("Availability score: {}{workload}", c.availability_score),
    ]
}
