//! Delete command - remove a receipt

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use super::{block_on, get_context, get_logger, log_outcome};
use crate::output;

pub fn run(id: i64, force: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    if !force {
        let loaded = block_on(ctx.collection_service.refresh())?;
        if let Some(receipt) = loaded.ok().and_then(|_| ctx.store.find(id)) {
            println!(
                "\n{}",
                format!(
                    "This will delete receipt {} ({}, {}, {}).",
                    id,
                    receipt.vendor_name,
                    output::format_amount(receipt.total_amount),
                    receipt.display_date()
                )
                .yellow()
            );
        }

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let result = block_on(ctx.collection_service.delete(id))?;
    log_outcome(&logger, &ctx, "delete", "receipt_deleted", "delete_failed", &result);
    result?;

    output::success(&format!("Receipt {} deleted", id));
    Ok(())
}
