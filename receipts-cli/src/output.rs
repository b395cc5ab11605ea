//! Terminal output: colored status lines and receipt tables

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use receipts_core::domain::StatusMessage;
use receipts_core::{Error as CoreError, Receipt};
use rust_decimal::Decimal;

pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg.green());
}

/// Goes to stderr
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg.red());
}

pub fn warning(msg: &str) {
    println!("{} {}", "!".yellow().bold(), msg.yellow());
}

/// Text for a failed command
///
/// Core errors can quote the server, so they show as their fixed message
/// and category. Context added by the CLI itself is kept in front.
pub fn describe_error(err: &anyhow::Error) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        if let Some(core) = cause.downcast_ref::<CoreError>() {
            parts.push(format!("{} [{}]", core.user_message(), core.category()));
            break;
        }
        parts.push(cause.to_string());
    }
    parts.join(": ")
}

/// Print a flow's status line, green on success and red otherwise
pub fn status(message: &StatusMessage) {
    if message.is_success() {
        success(&message.text)
    } else {
        error(&message.text)
    }
}

pub fn create_table() -> Table {
    let mut out = Table::new();
    out.load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    out
}

/// One row per receipt; `"nan"` locations show as blank cells
pub fn receipts_table(receipts: &[Receipt]) -> Table {
    let mut out = create_table();
    out.set_header(vec![
        "ID", "Date", "Vendor", "Amount", "Type", "City", "State", "Country",
    ]);
    out.add_rows(receipts.iter().map(|r| {
        vec![
            r.id.to_string(),
            r.display_date().to_string(),
            r.vendor_name.clone(),
            format_amount(r.total_amount),
            r.bill_type.clone(),
            r.display_city().to_string(),
            r.display_state().to_string(),
            r.display_country().to_string(),
        ]
    }));
    out
}

pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Bytes in the largest unit that keeps the value at or above one
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_describe_error_hides_server_text() {
        let server_text = "Failed to delete receipt: connection to server at 10.0.0.5 failed";
        let err = anyhow::Error::from(CoreError::network(server_text));

        let shown = describe_error(&err);
        assert!(!shown.contains("10.0.0.5"));
        assert_eq!(
            shown,
            format!(
                "{} [network_failure]",
                CoreError::network("").user_message()
            )
        );
    }

    #[test]
    fn test_describe_error_keeps_cli_context() {
        let err = anyhow::Error::from(CoreError::not_found("receipt 9 not found in table receipts"))
            .context("Receipt 9 was not deleted");

        let shown = describe_error(&err);
        assert!(shown.starts_with("Receipt 9 was not deleted: "));
        assert!(shown.ends_with("[not_found]"));
        assert!(!shown.contains("table receipts"));
    }

    #[test]
    fn test_describe_error_plain_anyhow() {
        let err = anyhow::anyhow!("Nothing to change");
        assert_eq!(describe_error(&err), "Nothing to change");
    }

    #[test]
    fn test_format_amount_two_places() {
        assert_eq!(format_amount(Decimal::from_str("91.25").unwrap()), "91.25");
        assert_eq!(format_amount(Decimal::from(70)), "70.00");
    }
}
