//! triage-runner: headless front end for the ticket assignment engine.
//!
//! Usage:
//!   triage-runner recommend --data-dir ./data --ticket 0 --top-k 3
//!   triage-runner assign    --data-dir ./data --ticket 0 --user 1001
//!   triage-runner close     --assignment ASSIGN_20240601_093000_1001_ab12cd34
//!   triage-runner stats
//!   triage-runner open
//!   triage-runner --ipc-mode --db assignments.db
//!
//! The reasoning service is configured from TRIAGE_LLM_* environment
//! variables; without an endpoint every recommendation is score-based.

use anyhow::{bail, Context, Result};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use triage_core::{
    agent::{AssignmentAgent, RecommendationReport},
    config::{EngineConfig, ReasonerConfig},
    error::AssignError,
    reasoner::build_reasoner,
    source::{JsonFileSource, RosterSource, TicketSource},
    store::SqliteStore,
    ticket::{Ticket, TicketRecord},
};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Recommend {
        ticket: TicketRecord,
        #[serde(default)]
        top_k: Option<usize>,
    },
    /// Decide on `ticket`, or on the last recommendation when omitted.
    Assign {
        #[serde(default)]
        ticket: Option<TicketRecord>,
        user_id: String,
    },
    Close {
        assignment_id: String,
    },
    Stats,
    OpenAssignments,
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let subcommand = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("recommend");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");
    let default_db = format!("{data_dir}/assignments.db");
    let db = str_arg(&args, "--db").unwrap_or(&default_db);
    let ticket_index = parse_arg(&args, "--ticket", 0usize);
    let top_k = str_arg(&args, "--top-k").and_then(|v| v.parse::<usize>().ok());

    let config = EngineConfig::load(data_dir).unwrap_or_else(|e| {
        log::warn!("{e}; using default engine config");
        EngineConfig::default()
    });
    let source = JsonFileSource::new(data_dir);
    let roster = source.people()?;
    let store = SqliteStore::open_migrated(db).with_context(|| format!("opening store {db}"))?;
    let agent = AssignmentAgent::new(config, roster, Arc::new(store))
        .with_reasoner(build_reasoner(&ReasonerConfig::from_env()));

    if ipc_mode {
        return run_ipc_loop(&agent);
    }

    println!("Ticket assignment — triage-runner");
    println!("  data_dir:  {data_dir}");
    println!("  db:        {db}");
    println!();

    match subcommand {
        "recommend" => {
            let ticket = load_ticket(&source, ticket_index)?;
            let report = agent.recommend(&ticket, top_k)?;
            print_report(&report);
        }
        "assign" => {
            let Some(user_id) = str_arg(&args, "--user") else {
                bail!("assign needs --user <user_id>");
            };
            let ticket = load_ticket(&source, ticket_index)?;
            let report = agent.recommend(&ticket, top_k)?;
            print_report(&report);
            let record = agent.assign(&report, user_id)?;
            println!();
            println!("=== ASSIGNED ===");
            println!("  id:        {}", record.assignment_id);
            println!("  user:      {}", record.selected_user_id);
            println!("  action:    {}", record.action.as_str());
            println!("  saved:     {:.0} min", record.time_saved_minutes);
        }
        "close" => {
            let Some(id) = str_arg(&args, "--assignment") else {
                bail!("close needs --assignment <assignment_id>");
            };
            if agent.close(id)? {
                println!("Closed {id}");
            } else {
                println!("{id} is unknown or already closed");
            }
        }
        "stats" => print_stats(&agent)?,
        "open" => {
            let open = agent.open_assignments()?;
            println!("=== OPEN ASSIGNMENTS ({}) ===", open.len());
            for r in &open {
                println!(
                    "  {} | {} | {} {} | {}",
                    r.assignment_id, r.selected_user_id, r.priority, r.subcategory, r.short_description
                );
            }
            println!();
            println!("  {}", agent.availability_message());
        }
        other => bail!("unknown subcommand '{other}' (recommend, assign, close, stats, open)"),
    }
    Ok(())
}

fn run_ipc_loop(agent: &AssignmentAgent) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mut last_report: Option<RecommendationReport> = None;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let reply = match handle_command(agent, cmd, &mut last_report) {
            Ok(v) => v,
            Err(e) => error_json(&e),
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    agent: &AssignmentAgent,
    cmd: IpcCommand,
    last_report: &mut Option<RecommendationReport>,
) -> Result<serde_json::Value, AssignError> {
    match cmd {
        IpcCommand::Recommend { ticket, top_k } => {
            let report = agent.recommend(&Ticket::from_record(&ticket), top_k)?;
            let mut out = report.recommendation.to_output_json();
            out["total_candidates"] = serde_json::json!(report.total_candidates);
            *last_report = Some(report);
            Ok(out)
        }
        IpcCommand::Assign { ticket, user_id } => {
            if let Some(ticket) = ticket {
                *last_report = Some(agent.recommend(&Ticket::from_record(&ticket), None)?);
            }
            let Some(report) = last_report.as_ref() else {
                return Err(AssignError::InvalidRecord {
                    reason: "assign without a ticket and no prior recommendation".into(),
                });
            };
            let record = agent.assign(report, &user_id)?;
            Ok(serde_json::to_value(&record)?)
        }
        IpcCommand::Close { assignment_id } => {
            let closed = agent.close(&assignment_id)?;
            Ok(serde_json::json!({ "assignment_id": assignment_id, "closed": closed }))
        }
        IpcCommand::Stats => Ok(serde_json::to_value(agent.statistics()?)?),
        IpcCommand::OpenAssignments => Ok(serde_json::to_value(agent.open_assignments()?)?),
        IpcCommand::Quit => Ok(serde_json::Value::Null),
    }
}

fn error_json(e: &AssignError) -> serde_json::Value {
    match e {
        AssignError::NoCandidates { cause, message } => {
            serde_json::json!({ "error": message, "cause": cause })
        }
        other => serde_json::json!({ "error": other.to_string() }),
    }
}

fn load_ticket(source: &JsonFileSource, index: usize) -> Result<Ticket> {
    let tickets = source.tickets()?;
    let count = tickets.len();
    tickets
        .into_iter()
        .nth(index)
        .with_context(|| format!("ticket {index} out of range ({count} loaded)"))
}

fn print_report(report: &RecommendationReport) {
    let t = &report.ticket;
    let rec = &report.recommendation;
    println!("=== TICKET ===");
    println!("  {} | {} / {}", t.priority, t.category, t.subcategory);
    println!("  {}", t.short_description);
    println!();
    println!(
        "=== RECOMMENDATION ({} of {} candidates, {}) ===",
        rec.entries.len(),
        report.total_candidates,
        rec.agent_method.as_str()
    );
    for (i, e) in rec.entries.iter().enumerate() {
        println!(
            "  #{} {} ({}) | score {} | algorithm {} | {}",
            i + 1,
            e.name,
            e.user_id,
            e.score,
            e.algorithm_score,
            e.primary_reason
        );
        println!("     {}", e.explanation);
        for r in &e.reasons {
            println!("       - {r}");
        }
    }
    println!();
    println!("  {}", rec.overall_analysis);
}

fn print_stats(agent: &AssignmentAgent) -> Result<()> {
    let s = agent.statistics()?;
    println!("=== ASSIGNMENT STATS ===");
    println!("  total:          {}", s.total_assignments);
    println!("  acceptance:     {:.1}%", s.acceptance_rate);
    println!("  time saved:     {:.0} min", s.total_time_saved_minutes);
    println!("  open:           {}", s.open_assignments);
    println!("  closed:         {}", s.closed_assignments);
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
