//! Reasoning adapter — optional natural-language explanation step.
//!
//! The adapter never changes the ranking. It asks the reasoning service
//! to justify the deterministic top-K and merges the answer back in
//! scorer order. Anything off-shape is a failure for the whole response,
//! and the agent falls back to the score-based recommendation.

use crate::{
    config::ReasonerConfig,
    recommendation::{AgentMethod, Recommendation, RecommendationEntry},
    scorer::ScoredCandidate,
    ticket::Ticket,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReasoningError {
    #[error("Reasoning service unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Malformed reasoning response: {0}")]
    Malformed(String),

    #[error("Reasoning service returned an empty response")]
    EmptyResponse,
}

// ── Transport ───────────────────────────────────────────────────────

/// A JSON-in, JSON-out chat completion call.
pub trait LlmClient: Send + Sync {
    fn call_json(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, ReasoningError>;
}

/// OpenAI-compatible chat completions over blocking HTTP.
pub struct HttpLlmClient {
    config: ReasonerConfig,
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpLlmClient {
    pub fn new(config: &ReasonerConfig) -> Result<Self, ReasoningError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| ReasoningError::Unavailable("no endpoint configured".into()))?
            .trim_end_matches('/');
        let url = if endpoint.ends_with("/chat/completions") {
            endpoint.to_string()
        } else {
            format!("{endpoint}/v1/chat/completions")
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ReasoningError::Unavailable(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            config: config.clone(),
            url,
            client,
        })
    }
}

impl LlmClient for HttpLlmClient {
    fn call_json(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, ReasoningError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": self.config.temperature,
            "response_format": {"type": "json_object"},
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ReasoningError::Timeout(self.config.timeout_secs)
            } else {
                ReasoningError::Http(format!("Request failed: {e}"))
            }
        })?;
        if !response.status().is_success() {
            return Err(ReasoningError::Http(format!("HTTP {}", response.status())));
        }

        let response_json: Value = response
            .json()
            .map_err(|e| ReasoningError::Malformed(format!("Failed to parse response: {e}")))?;
        let text = response_json
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .ok_or(ReasoningError::EmptyResponse)?;

        serde_json::from_str(text)
            .map_err(|e| ReasoningError::Malformed(format!("Output is not valid JSON: {e}")))
    }
}

// ── Reasoner capability ─────────────────────────────────────────────

pub trait Reasoner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Explain `top` (already ranked). Must keep the given order.
    fn explain(&self, ticket: &Ticket, top: &[ScoredCandidate]) -> Result<Recommendation, ReasoningError>;
}

/// Stands in when no reasoning service is configured. Always fails at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReasoner;

impl Reasoner for NullReasoner {
    fn name(&self) -> &'static str {
        "null"
    }

    fn explain(&self, _ticket: &Ticket, _top: &[ScoredCandidate]) -> Result<Recommendation, ReasoningError> {
        Err(ReasoningError::Unavailable("no reasoning service configured".into()))
    }
}

pub struct LlmReasoner {
    client: Box<dyn LlmClient>,
}

impl LlmReasoner {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self { client }
    }
}

impl Reasoner for LlmReasoner {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn explain(&self, ticket: &Ticket, top: &[ScoredCandidate]) -> Result<Recommendation, ReasoningError> {
        if top.is_empty() {
            return Err(ReasoningError::Malformed("no candidates to explain".into()));
        }
        let prompt = build_prompt(ticket, top);
        let raw = self.client.call_json(SYSTEM_PROMPT, &prompt)?;
        merge_response(&raw, top)
    }
}

/// LlmReasoner when an endpoint is configured and the client builds,
/// NullReasoner otherwise.
pub fn build_reasoner(config: &ReasonerConfig) -> Box<dyn Reasoner> {
    if !config.is_enabled() {
        log::info!("No reasoning endpoint configured; using score-based recommendations");
        return Box::new(NullReasoner);
    }
    match HttpLlmClient::new(config) {
        Ok(client) => Box::new(LlmReasoner::new(Box::new(client))),
        Err(e) => {
            log::warn!("Reasoning client init failed, using score-based recommendations: {e}");
            Box::new(NullReasoner)
        }
    }
}

// ── Prompt ──────────────────────────────────────────────────────────

pub const SYSTEM_PROMPT: &str = "You are an expert ticket assignment assistant. \
Analyze incidents and explain why each listed team member fits. \
Provide structured JSON responses with scores (0-100) and clear explanations. \
Focus on skill matching, on-call status, workload capacity, and incident priority.";

pub fn build_prompt(ticket: &Ticket, top: &[ScoredCandidate]) -> String {
    let mut candidates = String::new();
    for (i, c) in top.iter().enumerate() {
        let p = &c.person;
        candidates.push_str(&format!(
            "\nCandidate {}: {} (ID: {})\n  - Skills: {}\n  - Group: {}\n  - On-Call: {}\n  - Max Capacity: {}\n  - Initial Score: {}\n",
            i + 1,
            p.display_name(),
            p.user_id,
            p.skills.join(", "),
            or_na(&p.group),
            if p.on_call { "Yes" } else { "No" },
            p.max_concurrent.map(|m| m.to_string()).unwrap_or_else(|| "N/A".into()),
            c.total_score,
        ));
    }

    let entry_keys: Vec<String> = (1..=top.len()).map(|i| format!("\"top{i}\"")).collect();
    format!(
        "INCIDENT DETAILS:
- Short Description: {short}
- Description: {desc}
- Category: {cat}
- Subcategory: {sub}
- Priority: {prio}
- Opened At: {opened}

CANDIDATES (already ranked; keep this order):
{candidates}
REQUIRED OUTPUT (JSON object with keys {keys} and \"overall_analysis\"):
{{
  \"top1\": {{
    \"user_id\": \"ID\",
    \"name\": \"Candidate Name\",
    \"recommendation_score\": 85,
    \"primary_reason\": \"skill_match\",
    \"reasons\": [\"Skill match: Database\", \"On-call status provides immediate response\"],
    \"explanation\": \"Best match because...\"
  }},
  \"overall_analysis\": \"Brief analysis of the incident urgency and candidate fit\"
}}

One entry per candidate, topN matching candidate N. recommendation_score is 0-100.
PRIMARY REASONS to use: skill_match, on_call, workload, priority, shift.
Be concise but specific.",
        short = or_na(&ticket.short_description),
        desc = or_na(&ticket.description),
        cat = or_na(&ticket.category),
        sub = or_na(&ticket.subcategory),
        prio = ticket.priority,
        opened = ticket.opened_at.as_deref().unwrap_or("N/A"),
        keys = entry_keys.join(", "),
    )
}

fn or_na(s: &str) -> &str {
    if s.is_empty() {
        "N/A"
    } else {
        s
    }
}

// ── Response ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LlmEntry {
    user_id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(alias = "score")]
    recommendation_score: f64,
    primary_reason: String,
    reasons: Vec<String>,
    explanation: String,
}

/// Validate the whole response, then merge it onto `top` in scorer order.
/// Nothing is returned unless every entry checks out.
pub fn merge_response(raw: &Value, top: &[ScoredCandidate]) -> Result<Recommendation, ReasoningError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ReasoningError::Malformed("response is not a JSON object".into()))?;
    let overall_analysis = obj
        .get("overall_analysis")
        .and_then(Value::as_str)
        .ok_or_else(|| ReasoningError::Malformed("missing overall_analysis".into()))?
        .to_string();

    let mut parsed: Vec<(String, LlmEntry)> = Vec::with_capacity(top.len());
    for i in 1..=top.len() {
        let key = format!("top{i}");
        let value = obj
            .get(&key)
            .ok_or_else(|| ReasoningError::Malformed(format!("missing {key}")))?;
        let entry: LlmEntry = serde_json::from_value(value.clone())
            .map_err(|e| ReasoningError::Malformed(format!("{key}: {e}")))?;
        let user_id = match &entry.user_id {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(ReasoningError::Malformed(format!("{key}: bad user_id {other}")));
            }
        };
        let score = entry.recommendation_score;
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(ReasoningError::Malformed(format!("{key}: score {score} outside 0-100")));
        }
        parsed.push((user_id, entry));
    }

    let expected: HashSet<&str> = top.iter().map(|c| c.user_id()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    for (user_id, _) in &parsed {
        if !expected.contains(user_id.as_str()) {
            return Err(ReasoningError::Malformed(format!("unknown user_id {user_id}")));
        }
        if !seen.insert(user_id.as_str()) {
            return Err(ReasoningError::Malformed(format!("duplicate user_id {user_id}")));
        }
    }

    let mut entries = Vec::with_capacity(top.len());
    for c in top {
        let (_, e) = parsed
            .iter()
            .find(|(id, _)| id == c.user_id())
            .ok_or_else(|| ReasoningError::Malformed(format!("no entry for {}", c.user_id())))?;
        entries.push(RecommendationEntry {
            user_id: c.person.user_id.clone(),
            name: e.name.clone().unwrap_or_else(|| c.person.display_name()),
            score: e.recommendation_score.round() as u32,
            primary_reason: e.primary_reason.clone(),
            reasons: e.reasons.clone(),
            explanation: e.explanation.clone(),
            algorithm_score: c.total_score,
        });
    }

    Ok(Recommendation {
        entries,
        overall_analysis,
        agent_method: AgentMethod::LlmReasoning,
    })
}
