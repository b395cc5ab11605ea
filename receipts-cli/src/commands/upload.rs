//! Upload command - send a receipt image for extraction

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use receipts_core::services::{load_image_file, UPLOAD_FAILED_MESSAGE};
use receipts_core::{LogEvent, OperationResult};

use super::{block_on, get_context, get_logger, log_event, log_outcome};
use crate::output;

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub fn run(file: &Path, json: bool) -> Result<()> {
    let image = load_image_file(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let ctx = get_context()?;
    let logger = get_logger();

    if let Err(e) = ctx.upload_flow.select(image.clone()) {
        log_event(
            &logger,
            LogEvent::new("upload_failed")
                .with_command("upload")
                .with_error(&e),
        );
        if let Some(status) = ctx.upload_flow.status() {
            output::status(&status);
        }
        return Err(e.into());
    }

    let bar = (!json).then(|| {
        spinner(format!(
            "Uploading {} ({})",
            image.file_name,
            output::format_size(image.size() as u64)
        ))
    });
    let result = block_on(ctx.upload_flow.submit())?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    log_outcome(&logger, &ctx, "upload", "receipt_uploaded", "upload_failed", &result);

    if json {
        let failed = result.is_err();
        println!("{}", serde_json::to_string_pretty(&OperationResult::from(result))?);
        if failed {
            bail!(UPLOAD_FAILED_MESSAGE);
        }
        return Ok(());
    }

    if result.is_err() {
        if let Some(status) = ctx.upload_flow.status() {
            output::status(&status);
        }
    }
    let created = result?;

    if let Some(status) = ctx.upload_flow.status() {
        output::status(&status);
    }
    if let Some(receipt) = &created.receipt {
        println!("{}", output::receipts_table(std::slice::from_ref(receipt)));
    } else if let Some(id) = created.receipt_id {
        println!("Receipt ID: {}", id);
        println!("{}", "Run 'receipts list' to see the extracted details.".dimmed());
    }
    Ok(())
}
