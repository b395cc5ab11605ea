//! List command - show the receipt collection

use anyhow::Result;

use super::{block_on, get_context, get_logger, log_outcome};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let result = block_on(ctx.collection_service.refresh())?;
    log_outcome(&logger, &ctx, "list", "receipts_listed", "list_failed", &result);
    let receipts = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&receipts)?);
        return Ok(());
    }

    if receipts.is_empty() {
        output::warning("No receipts yet. Use 'receipts upload <FILE>' to add one.");
        return Ok(());
    }

    println!("{}", output::receipts_table(&receipts));
    println!();
    println!("{} receipt(s)", receipts.len());
    Ok(())
}
