//! Logs command - inspect and prune `logs.duckdb`

use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use serde_json::json;

use receipts_core::services::logging::now_ms;
use receipts_core::{LogEntry, LoggingService};

use super::get_receipts_dir;
use crate::output;

const MS_PER_DAY: i64 = 86_400_000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent entries, newest first
    List {
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
        /// Only failed operations
        #[arg(long)]
        errors: bool,
        #[arg(long)]
        json: bool,
    },
    /// Remove entries older than a number of days
    Clear {
        #[arg(long, default_value_t = 30)]
        older_than_days: u32,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Entry counts per event and database location
    Stats {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let dir = get_receipts_dir()?;
    std::fs::create_dir_all(&dir)?;
    let log = LoggingService::new(&dir, env!("CARGO_PKG_VERSION"))?;

    match command {
        LogsCommands::List {
            limit,
            errors,
            json,
        } => list(&log, limit, errors, json),
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(&log, older_than_days, force, json),
        LogsCommands::Stats { json } => stats(&log, json),
    }
}

fn local_time(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

/// "edit via http", "upload", or empty
fn origin(entry: &LogEntry) -> String {
    match (entry.command.as_deref(), entry.gateway.as_deref()) {
        (Some(cmd), Some(gw)) => format!("{} via {}", cmd, gw),
        (Some(cmd), None) => cmd.to_string(),
        (None, Some(gw)) => gw.to_string(),
        (None, None) => String::new(),
    }
}

fn list(log: &LoggingService, limit: usize, errors_only: bool, json: bool) -> Result<()> {
    let entries = if errors_only {
        log.get_errors(limit)?
    } else {
        log.get_recent(limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("{}", "The event log is empty.".dimmed());
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Origin", "Failure"]);
    for entry in &entries {
        let failure = match (&entry.error_category, &entry.error_message) {
            (Some(category), Some(message)) => format!("{}: {}", category, message),
            (Some(category), None) => category.clone(),
            _ => String::new(),
        };
        table.add_row(vec![
            local_time(entry.logged_at),
            entry.event.clone(),
            origin(entry),
            failure,
        ]);
    }
    println!("{}", table);

    let failed = entries.iter().filter(|e| e.is_error()).count();
    if !errors_only && failed > 0 {
        println!(
            "{}",
            format!("{} of {} entries are failures; see --errors", failed, entries.len()).yellow()
        );
    }
    Ok(())
}

fn clear(log: &LoggingService, days: u32, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove log entries older than {} days?", days))
            .default(false)
            .interact()?;
        if !confirmed {
            output::warning("Nothing removed.");
            return Ok(());
        }
    }

    let removed = log.delete_before(now_ms() - i64::from(days) * MS_PER_DAY)?;
    if json {
        println!("{}", json!({ "removed": removed }));
    } else {
        output::success(&format!("Removed {} log entries", removed));
    }
    Ok(())
}

fn stats(log: &LoggingService, json: bool) -> Result<()> {
    let total = log.count()?;
    let failures = log.error_count()?;
    let per_event = log.event_counts()?;
    let path = log.db_path();
    let bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    if json {
        let report = json!({
            "entries": total,
            "failures": failures,
            "per_event": per_event,
            "path": path.display().to_string(),
            "size_bytes": bytes,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Event log".bold());
    println!("  {} entries, {} failures", total, failures);
    println!("  {} ({})", path.display(), output::format_size(bytes));

    if !per_event.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Event", "Entries"]);
        for row in per_event {
            table.add_row(vec![row.event, row.count.to_string()]);
        }
        println!();
        println!("{}", table);
    }
    Ok(())
}
