//! Event log in `logs.duckdb`
//!
//! Receipt content never reaches the log. An entry holds the event name,
//! the CLI command and gateway involved, and for failures the error
//! category with its fixed user-facing text.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::Utc;
use duckdb::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;
use crate::log_migrations::{BOOTSTRAP, LOG_MIGRATIONS};

const LOG_DB_FILE: &str = "logs.duckdb";

/// Milliseconds since the unix epoch
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// One thing that happened, before it is stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            gateway: None,
            command: None,
            error_category: None,
            error_message: None,
        }
    }

    /// Gateway in use ("http", "demo")
    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = Some(gateway.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attach a failure as category plus fixed text
    ///
    /// The error's own text can quote server responses, so it is dropped.
    pub fn with_error(mut self, error: &Error) -> Self {
        self.error_category = Some(error.category().to_string());
        self.error_message = Some(error.user_message().to_string());
        self
    }
}

/// A stored event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    /// Unix milliseconds
    pub logged_at: i64,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub gateway: Option<String>,
    pub command: Option<String>,
    pub error_category: Option<String>,
    pub error_message: Option<String>,
}

impl LogEntry {
    pub fn is_error(&self) -> bool {
        self.error_category.is_some()
    }

    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            logged_at: row.get("logged_at")?,
            app_version: row.get("app_version")?,
            platform: row.get("platform")?,
            event: row.get("event")?,
            gateway: row.get("gateway")?,
            command: row.get("command")?,
            error_category: row.get("error_category")?,
            error_message: row.get("error_message")?,
        })
    }
}

/// Number of entries recorded for one event name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventCount {
    pub event: String,
    pub count: u64,
}

/// Which entries a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    Errors,
}

impl Scope {
    fn predicate(self) -> &'static str {
        match self {
            Scope::All => "TRUE",
            Scope::Errors => "error_category IS NOT NULL",
        }
    }
}

/// Apply pending migrations, returning how many ran
fn migrate(conn: &Connection) -> Result<usize> {
    conn.execute_batch(BOOTSTRAP)
        .context("Failed to create sys_migrations")?;

    let applied: HashSet<String> = {
        let mut stmt = conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        names.collect::<duckdb::Result<_>>()?
    };

    let mut ran = 0;
    for &(name, sql) in LOG_MIGRATIONS {
        if applied.contains(name) {
            continue;
        }
        conn.execute_batch(sql)
            .with_context(|| format!("Log migration {} failed", name))?;
        conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            params![name],
        )?;
        ran += 1;
    }
    Ok(ran)
}

/// Writes and reads the event log
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    app_version: String,
}

impl LoggingService {
    /// Open `logs.duckdb` under `receipts_dir`, creating and migrating it
    /// as needed
    pub fn new(receipts_dir: &Path, app_version: impl Into<String>) -> Result<Self> {
        let db_path = receipts_dir.join(LOG_DB_FILE);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            app_version: app_version.into(),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn log(&self, event: LogEvent) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sys_logs (logged_at, app_version, platform, event, \
             gateway, command, error_category, error_message) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                now_ms(),
                self.app_version,
                std::env::consts::OS,
                event.event,
                event.gateway,
                event.command,
                event.error_category,
                event.error_message,
            ],
        )?;
        Ok(())
    }

    /// Shorthand for a failed `event`
    pub fn log_error(&self, event: &str, error: &Error) -> Result<()> {
        self.log(LogEvent::new(event).with_error(error))
    }

    fn list(&self, scope: Scope, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT id, logged_at, app_version, platform, event, gateway, command, \
             error_category, error_message FROM sys_logs WHERE {} \
             ORDER BY logged_at DESC, id DESC LIMIT ?",
            scope.predicate()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], LogEntry::from_row)?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    /// Newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.list(Scope::All, limit)
    }

    /// Newest failures first
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.list(Scope::Errors, limit)
    }

    fn count_where(&self, scope: Scope) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM sys_logs WHERE {}", scope.predicate());
        let n: i64 = self.conn().query_row(&sql, [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    pub fn count(&self) -> Result<u64> {
        self.count_where(Scope::All)
    }

    pub fn error_count(&self) -> Result<u64> {
        self.count_where(Scope::Errors)
    }

    /// Entries per event name, most frequent first
    pub fn event_counts(&self) -> Result<Vec<EventCount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT event, COUNT(*) AS n FROM sys_logs GROUP BY event ORDER BY n DESC, event",
        )?;
        let rows = stmt.query_map([], |row| {
            let n: i64 = row.get(1)?;
            Ok(EventCount {
                event: row.get(0)?,
                count: n.max(0) as u64,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    /// Drop entries logged before `cutoff_ms`; returns how many went
    pub fn delete_before(&self, cutoff_ms: i64) -> Result<u64> {
        let removed = self
            .conn()
            .execute("DELETE FROM sys_logs WHERE logged_at < ?", params![cutoff_ms])?;
        Ok(removed as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
