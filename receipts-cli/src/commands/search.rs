//! Search command - replace the collection with server-side search results

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;

use receipts_core::services::SearchQuery;
use receipts_core::SearchFilter;

use super::{block_on, get_context, get_logger, log_outcome};
use crate::output;

#[derive(Args)]
pub struct SearchArgs {
    /// Vendor name contains
    #[arg(long)]
    pub vendor: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub bill_type: Option<String>,
    /// Receipt date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub min_amount: Option<String>,
    #[arg(long)]
    pub max_amount: Option<String>,
    /// Pre-encoded query string, sent unchanged (overrides the other filters)
    #[arg(long)]
    pub query: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_amount(flag: &str, value: Option<String>) -> Result<Option<Decimal>> {
    value
        .map(|v| {
            v.trim()
                .parse::<Decimal>()
                .with_context(|| format!("Invalid {}: {}", flag, v))
        })
        .transpose()
}

fn build_query(args: SearchArgs) -> Result<SearchQuery> {
    if let Some(raw) = args.query {
        return Ok(SearchQuery::Raw(raw));
    }
    Ok(SearchQuery::Filter(SearchFilter {
        vendor: args.vendor,
        city: args.city,
        state: args.state,
        country: args.country,
        bill_type: args.bill_type,
        date: args.date,
        min_amount: parse_amount("--min-amount", args.min_amount)?,
        max_amount: parse_amount("--max-amount", args.max_amount)?,
    }))
}

pub fn run(args: SearchArgs) -> Result<()> {
    let json = args.json;
    let query = build_query(args)?;

    let ctx = get_context()?;
    let logger = get_logger();

    let result = block_on(ctx.collection_service.search(&query))?;
    log_outcome(&logger, &ctx, "search", "receipts_searched", "search_failed", &result);
    let receipts = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&receipts)?);
        return Ok(());
    }

    if receipts.is_empty() {
        output::warning("No receipts match.");
        return Ok(());
    }

    println!("{}", output::receipts_table(&receipts));
    println!();
    println!("{} receipt(s) found", receipts.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SearchArgs {
        SearchArgs {
            vendor: None,
            city: None,
            state: None,
            country: None,
            bill_type: None,
            date: None,
            min_amount: None,
            max_amount: None,
            query: None,
            json: false,
        }
    }

    #[test]
    fn test_raw_query_wins() {
        let query = build_query(SearchArgs {
            vendor: Some("cafe".into()),
            query: Some("vendor=Blue%20Cafe".into()),
            ..args()
        })
        .unwrap();
        assert_eq!(query.encoded(), "vendor=Blue%20Cafe");
    }

    #[test]
    fn test_bad_amount_is_rejected() {
        let result = build_query(SearchArgs {
            min_amount: Some("ten".into()),
            ..args()
        });
        assert!(result.is_err());
    }
}
