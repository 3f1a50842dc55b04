use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for any single scoring constant.
pub const MAX_SCORE_CONSTANT: u32 = 1000;

/// Tunable scoring and orchestration parameters.
///
/// Every constant the scorer uses lives here so tests can vary them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of ranked recommendations surfaced per ticket.
    pub top_k: usize,
    /// Ordered priority → on-call boost table. Unknown priorities take
    /// the boost of the last entry.
    pub priority_boosts: Vec<(String, u32)>,
    /// Base score for an on-call person, before the priority boost.
    pub oncall_base: u32,
    pub skill_score_exact: u32,
    /// Flat score for a substring skill match, regardless of match length.
    pub skill_score_partial: u32,
    pub shift_score_in_window: u32,
    pub shift_score_out_window: u32,
    /// Score used when the ticket carries no opened_at.
    pub shift_score_neutral: u32,
    /// Availability score when a person's capacity is zero or unknown.
    pub availability_score_unknown: u32,
    /// Organization reference timezone as a fixed offset east of UTC.
    pub reference_utc_offset_minutes: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            priority_boosts: vec![
                ("P1".into(), 40),
                ("P2".into(), 30),
                ("P3".into(), 20),
                ("P4".into(), 10),
            ],
            oncall_base: 50,
            skill_score_exact: 50,
            skill_score_partial: 30,
            shift_score_in_window: 30,
            shift_score_out_window: 0,
            shift_score_neutral: 20,
            availability_score_unknown: 5,
            // Asia/Kolkata, which observes no DST.
            reference_utc_offset_minutes: 330,
        }
    }
}

impl EngineConfig {
    /// Load from `{data_dir}/config/engine.json`.
    /// Missing keys fall back to the defaults.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/config/engine.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.top_k == 0 {
            anyhow::bail!("top_k must be at least 1");
        }
        if self.priority_boosts.is_empty() {
            anyhow::bail!("priority_boosts must not be empty");
        }
        if self.offset_opt().is_none() {
            anyhow::bail!(
                "reference_utc_offset_minutes {} is out of range",
                self.reference_utc_offset_minutes
            );
        }
        let constants = [
            ("oncall_base", self.oncall_base),
            ("skill_score_exact", self.skill_score_exact),
            ("skill_score_partial", self.skill_score_partial),
            ("shift_score_in_window", self.shift_score_in_window),
            ("shift_score_out_window", self.shift_score_out_window),
            ("shift_score_neutral", self.shift_score_neutral),
            ("availability_score_unknown", self.availability_score_unknown),
        ];
        let boosts = self
            .priority_boosts
            .iter()
            .map(|(label, boost)| (label.as_str(), *boost));
        for (name, value) in constants.into_iter().chain(boosts) {
            if value > MAX_SCORE_CONSTANT {
                anyhow::bail!("{name} = {value} exceeds {MAX_SCORE_CONSTANT}");
            }
        }
        Ok(())
    }

    fn offset_opt(&self) -> Option<FixedOffset> {
        self.reference_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }

    /// On-call boost for a priority label, e.g. "P2".
    pub fn priority_boost(&self, priority: &str) -> u32 {
        for (label, boost) in &self.priority_boosts {
            if label.eq_ignore_ascii_case(priority) {
                return *boost;
            }
        }
        self.priority_boosts.last().map(|(_, b)| *b).unwrap_or(0)
    }

    pub fn reference_offset(&self) -> FixedOffset {
        self.offset_opt().unwrap_or_else(|| {
            log::warn!(
                "reference offset {} min out of range, using UTC",
                self.reference_utc_offset_minutes
            );
            Utc.fix()
        })
    }

    /// Highest total a single candidate can reach with this config.
    /// Used to normalise algorithm scores onto the 0–100 output scale.
    pub fn max_total_score(&self) -> u32 {
        let max_boost = self.priority_boosts.iter().map(|(_, b)| *b).max().unwrap_or(0);
        let skill = self.skill_score_exact.max(self.skill_score_partial);
        let shift = self
            .shift_score_in_window
            .max(self.shift_score_out_window)
            .max(self.shift_score_neutral);
        skill
            .saturating_add(self.oncall_base)
            .saturating_add(max_boost)
            .saturating_add(shift)
            .saturating_add(crate::scorer::AVAILABILITY_SCORE_MAX)
    }
}

// ── Reasoning service ──────────────────────────────────────────────

pub const DEFAULT_LLM_MODEL: &str = "gpt-4-turbo-preview";

/// Connection settings for the natural-language reasoning service.
/// An absent endpoint disables the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonerConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f64,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout_secs: 30,
            temperature: 0.3,
        }
    }
}

impl ReasonerConfig {
    /// Read `TRIAGE_LLM_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            endpoint: non_empty("TRIAGE_LLM_ENDPOINT"),
            api_key: non_empty("TRIAGE_LLM_API_KEY"),
            model: non_empty("TRIAGE_LLM_MODEL").unwrap_or(defaults.model),
            timeout_secs: non_empty("TRIAGE_LLM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            temperature: non_empty("TRIAGE_LLM_TEMPERATURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
