//! CLI command implementations

pub mod analytics;
pub mod auth;
pub mod delete;
pub mod demo;
pub mod edit;
pub mod list;
pub mod logs;
pub mod search;
pub mod upload;

use std::future::Future;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use receipts_core::{LogEvent, LoggingService, ReceiptsContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let receipts_dir = get_receipts_dir().ok()?;
    std::fs::create_dir_all(&receipts_dir).ok()?;
    LoggingService::new(&receipts_dir, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Log the outcome of a gateway call under `event`, or `failed_event` on error
pub fn log_outcome<T>(
    logger: &Option<LoggingService>,
    ctx: &ReceiptsContext,
    command: &str,
    event: &str,
    failed_event: &str,
    result: &receipts_core::domain::result::Result<T>,
) {
    let entry = match result {
        Ok(_) => LogEvent::new(event),
        Err(e) => LogEvent::new(failed_event).with_error(e),
    };
    log_event(
        logger,
        entry.with_command(command).with_gateway(ctx.gateway_name()),
    );
}

/// Get the receipts directory from environment or default
pub fn get_receipts_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RECEIPTS_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".receipts"))
        .ok_or_else(|| anyhow!("Could not find home directory; set RECEIPTS_DIR"))
}

/// Get or create the receipts context
pub fn get_context() -> Result<ReceiptsContext> {
    let receipts_dir = get_receipts_dir()?;

    std::fs::create_dir_all(&receipts_dir)
        .with_context(|| format!("Failed to create receipts directory: {:?}", receipts_dir))?;

    ReceiptsContext::new(&receipts_dir).context("Failed to initialize receipts context")
}

/// Drive one async command to completion on a fresh runtime
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}
