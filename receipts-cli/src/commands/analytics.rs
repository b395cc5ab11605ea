//! Analytics command - spending summary and vendor breakdown

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use receipts_core::domain::analytics::format_percent;
use receipts_core::services::{AnalyticsReport, AnalyticsSource, VerificationReport};
use receipts_core::{AnalyticsAggregate, AnalyticsFilter, LogEvent};

use super::{block_on, get_context, get_logger, log_event, log_outcome};
use crate::output;

#[derive(Args)]
pub struct AnalyticsArgs {
    /// Where the aggregate comes from (defaults to the configured source)
    #[arg(long)]
    pub source: Option<AnalyticsSource>,
    /// Compute locally and compare against the server aggregate
    #[arg(long)]
    pub verify: bool,
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,
    #[arg(long)]
    pub vendor: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: AnalyticsArgs) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let filter = AnalyticsFilter {
        year: args.year,
        month: args.month,
        vendor_name: args.vendor.clone(),
        ..Default::default()
    };

    if args.verify {
        let result = block_on(ctx.analytics_service.verify(&filter))?;
        log_outcome(&logger, &ctx, "analytics", "analytics_verified", "analytics_failed", &result);
        let report = result?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_verification(&report);
        }
        return Ok(());
    }

    let source = args.source.unwrap_or(ctx.config.analytics_source);
    let result = block_on(ctx.analytics_service.fetch(source, &filter))?;
    log_outcome(&logger, &ctx, "analytics", "analytics_viewed", "analytics_failed", &result);
    let report = result?;

    if report.fell_back {
        log_event(
            &logger,
            LogEvent::new("analytics_fallback")
                .with_command("analytics")
                .with_gateway(ctx.gateway_name()),
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &AnalyticsReport) {
    if report.fell_back {
        output::warning("Server analytics unavailable; computed from the local collection.");
    }

    let aggregate = &report.aggregate;
    println!("{}", "Spending Summary".bold());
    println!("  Total spent:     {}", output::format_amount(aggregate.total_spent));
    println!(
        "  Average receipt: {}",
        aggregate
            .average_amount
            .map(output::format_amount)
            .unwrap_or_else(|| "-".to_string())
    );
    println!("  Receipts:        {}", aggregate.receipt_count);
    println!("  Top vendor:      {}", aggregate.top_vendor().unwrap_or("-"));
    println!("  Source:          {}", report.source);
    println!();

    if aggregate.vendor_summary.is_empty() {
        println!("No receipts in range.");
        return;
    }

    println!("{}", breakdown_table(aggregate));
}

fn breakdown_table(aggregate: &AnalyticsAggregate) -> comfy_table::Table {
    let mut table = output::create_table();
    table.set_header(vec!["Vendor", "Receipts", "Total", "Share"]);
    for share in aggregate.ranked_breakdown() {
        table.add_row(vec![
            share.vendor.clone(),
            share.count.to_string(),
            output::format_amount(share.total),
            share.display_share(),
        ]);
    }
    table
}

fn print_verification(report: &VerificationReport) {
    let mut table = output::create_table();
    table.set_header(vec!["", "Server", "Client"]);
    table.add_row(vec![
        "Total spent".to_string(),
        output::format_amount(report.server.total_spent),
        output::format_amount(report.client.total_spent),
    ]);
    table.add_row(vec![
        "Receipts".to_string(),
        report.server.receipt_count.to_string(),
        report.client.receipt_count.to_string(),
    ]);
    table.add_row(vec![
        "Vendors".to_string(),
        report.server.vendor_summary.len().to_string(),
        report.client.vendor_summary.len().to_string(),
    ]);
    if let Some(top) = report.client.top_vendor() {
        table.add_row(vec![
            format!("{} share", top),
            format_percent(report.server.share_of(top)),
            format_percent(report.client.share_of(top)),
        ]);
    }
    println!("{}", table);

    if report.is_consistent() {
        output::success("Server and client analytics agree.");
        return;
    }

    output::error(&format!("{} mismatch(es):", report.mismatches.len()));
    for m in &report.mismatches {
        println!("  {}: server {} / client {}", m.field, m.server, m.client);
    }
}
