//! Roster and ticket sources.
//!
//! RULE: The engine never knows which backend is active.
//! Anything that yields RosterRecord / TicketRecord rows can sit
//! behind these traits: JSON exports, a database, a REST client.

use crate::{
    roster::{people_from_records, Person, RosterRecord},
    ticket::{Ticket, TicketRecord},
};
use serde::Deserialize;
use serde_json::Value;

pub trait RosterSource {
    fn load_roster(&self) -> anyhow::Result<Vec<RosterRecord>>;

    /// Fresh, parsed snapshot of the roster.
    fn people(&self) -> anyhow::Result<Vec<Person>> {
        Ok(people_from_records(&self.load_roster()?))
    }
}

pub trait TicketSource {
    fn load_tickets(&self) -> anyhow::Result<Vec<TicketRecord>>;

    fn tickets(&self) -> anyhow::Result<Vec<Ticket>> {
        Ok(self.load_tickets()?.iter().map(Ticket::from_record).collect())
    }
}

// ── JSON files ──────────────────────────────────────────────────────

// Rows stay raw so one bad row cannot sink the whole file.
#[derive(Debug, Deserialize)]
struct RosterFile {
    roster: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TicketsFile {
    tickets: Vec<TicketRecord>,
}

/// Reads `{data_dir}/roster/roster.json` and `{data_dir}/tickets/tickets.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    data_dir: String,
}

impl JsonFileSource {
    pub fn new(data_dir: &str) -> Self {
        Self {
            data_dir: data_dir.trim_end_matches('/').to_string(),
        }
    }

    fn read(&self, rel: &str) -> anyhow::Result<String> {
        let path = format!("{}/{rel}", self.data_dir);
        std::fs::read_to_string(&path).map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))
    }
}

impl RosterSource for JsonFileSource {
    fn load_roster(&self) -> anyhow::Result<Vec<RosterRecord>> {
        let content = self.read("roster/roster.json")?;
        let file: RosterFile = serde_json::from_str(&content)?;
        let total = file.roster.len();
        let records: Vec<RosterRecord> = file
            .roster
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| match serde_json::from_value::<RosterRecord>(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping roster row {i}: {e}");
                    None
                }
            })
            .collect();
        log::info!("Loaded roster: {} of {total} rows", records.len());
        Ok(records)
    }
}

impl TicketSource for JsonFileSource {
    fn load_tickets(&self) -> anyhow::Result<Vec<TicketRecord>> {
        let content = self.read("tickets/tickets.json")?;
        let file: TicketsFile = serde_json::from_str(&content)?;
        let missing = file
            .tickets
            .iter()
            .filter(|t| t.subcategory.trim().is_empty() || t.opened_at.is_none())
            .count();
        if missing > 0 {
            log::warn!("{missing} tickets lack a subcategory or opened_at");
        }
        log::info!("Loaded tickets: {}", file.tickets.len());
        Ok(file.tickets)
    }
}

// ── In-memory ───────────────────────────────────────────────────────

/// Fixed records, for tests and embedding callers that already hold rows.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub roster: Vec<RosterRecord>,
    pub tickets: Vec<TicketRecord>,
}

impl RosterSource for StaticSource {
    fn load_roster(&self) -> anyhow::Result<Vec<RosterRecord>> {
        Ok(self.roster.clone())
    }
}

impl TicketSource for StaticSource {
    fn load_tickets(&self) -> anyhow::Result<Vec<TicketRecord>> {
        Ok(self.tickets.clone())
    }
}
