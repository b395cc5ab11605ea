//! Edit command - change fields of one receipt

use anyhow::{bail, Result};
use clap::Args;

use receipts_core::{LogEvent, OperationResult, ReceiptField};

use super::{block_on, get_context, get_logger, log_event, log_outcome};
use crate::output;

#[derive(Args)]
pub struct EditArgs {
    /// Receipt ID
    pub id: i64,
    #[arg(long)]
    pub vendor: Option<String>,
    #[arg(long)]
    pub amount: Option<String>,
    /// Date or ISO date-time
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub bill_type: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl EditArgs {
    fn changes(&self) -> Vec<(ReceiptField, &str)> {
        [
            (ReceiptField::VendorName, &self.vendor),
            (ReceiptField::TotalAmount, &self.amount),
            (ReceiptField::DateTime, &self.date),
            (ReceiptField::BillType, &self.bill_type),
            (ReceiptField::City, &self.city),
            (ReceiptField::State, &self.state),
            (ReceiptField::Country, &self.country),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }
}

pub fn run(args: EditArgs) -> Result<()> {
    let changes = args.changes();
    if changes.is_empty() {
        bail!("Nothing to change. Pass at least one of --vendor, --amount, --date, --bill-type, --city, --state, --country.");
    }

    let ctx = get_context()?;
    let logger = get_logger();

    block_on(ctx.collection_service.refresh())??;
    ctx.edit_session.begin_by_id(args.id)?;
    for (field, value) in changes {
        if let Err(e) = ctx.edit_session.update_field(field, value) {
            log_event(
                &logger,
                LogEvent::new("update_failed").with_command("edit").with_error(&e),
            );
            ctx.edit_session.cancel()?;
            return Err(e.into());
        }
    }

    let result = block_on(ctx.edit_session.save())?;
    log_outcome(&logger, &ctx, "edit", "receipt_updated", "update_failed", &result);

    if args.json {
        let failed = result.is_err();
        println!("{}", serde_json::to_string_pretty(&OperationResult::from(result))?);
        if failed {
            bail!("Receipt {} was not updated", args.id);
        }
        return Ok(());
    }

    if result.is_err() {
        if let Some(status) = ctx.edit_session.status() {
            output::status(&status);
        }
    }
    let receipt = result?;

    if let Some(status) = ctx.edit_session.status() {
        output::status(&status);
    }
    println!("{}", output::receipts_table(std::slice::from_ref(&receipt)));
    Ok(())
}
