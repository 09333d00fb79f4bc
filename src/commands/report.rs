use std::path::PathBuf;

use anyhow::Result;

use super::{format_number, load_snapshot, truncate, warn_skipped};
use crate::aggregator::Aggregator;
use crate::error::TrackerError;
use crate::models::MonthReport;

pub fn show_report(
    file: Option<PathBuf>,
    month: Option<String>,
    top: usize,
    rows: bool,
    json: bool,
) -> Result<()> {
    let snapshot = load_snapshot(file)?;
    let aggregator = Aggregator::new(&snapshot.normalized.table).with_top_n(top);

    let month = match month.or_else(|| aggregator.latest_month()) {
        Some(month) => month,
        None => return Err(TrackerError::EmptyResult.into()),
    };
    let report = aggregator.month_report(&month)?;

    if json {
        let mut output = serde_json::json!({
            "source": snapshot.source.display().to_string(),
            "month": report.month,
            "records": report.row_count,
            "skipped": snapshot.normalized.diagnostics.len(),
            "totals": {
                "tokens": report.total_tokens,
                "cost": report.total_cost
            },
            "model_tokens": report.model_tokens,
            "model_cost": report.model_cost,
            "user_cost": report.user_cost,
        });
        if rows {
            output["rows"] = serde_json::to_value(&report.rows)?;
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        warn_skipped(&snapshot);
        print_text_report(&report, aggregator.top_n(), rows);
    }

    Ok(())
}

fn print_text_report(report: &MonthReport, top: usize, rows: bool) {
    println!("📈 Top {} Total Tokens Used by Model ({})\n", top, report.month);
    println!("{:<40} {:>15}", "Model", "Tokens");
    println!("{}", "─".repeat(56));
    for entry in &report.model_tokens {
        println!(
            "{:<40} {:>15}",
            truncate(&entry.model, 40),
            format_number(entry.total_tokens)
        );
    }

    println!("\n💰 Top {} Total Cost by Model ({})\n", top, report.month);
    println!("{:<40} {:>15}", "Model", "Cost");
    println!("{}", "─".repeat(56));
    for entry in &report.model_cost {
        println!("{:<40} ${:>14.4}", truncate(&entry.model, 40), entry.total_cost);
    }

    println!("\n👥 Total Cost by User ({})\n", report.month);
    println!("{:<40} {:>15}", "User", "Cost");
    println!("{}", "─".repeat(56));
    for entry in &report.user_cost {
        if entry.is_total() {
            println!("{}", "─".repeat(56));
        }
        println!("{:<40} ${:>14.4}", truncate(&entry.user, 40), entry.total_cost);
    }

    if rows {
        println!("\n📝 Records ({})\n", report.month);
        println!(
            "{:<26} {:<24} {:<24} {:>12} {:>10}",
            "Timestamp", "User", "Model", "Tokens", "Cost"
        );
        println!("{}", "─".repeat(100));
        for row in &report.rows {
            println!(
                "{:<26} {:<24} {:<24} {:>12} ${:>9.4}",
                row.timestamp.format("%Y-%m-%d %H:%M:%S%.f"),
                truncate(&row.user, 24),
                truncate(&row.model, 24),
                format_number(row.total_tokens),
                row.total_cost
            );
        }
    }
}
