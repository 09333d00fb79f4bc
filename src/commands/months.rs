use std::path::PathBuf;

use anyhow::Result;

use super::{format_number, load_snapshot, warn_skipped};
use crate::aggregator::Aggregator;

pub fn show_months(file: Option<PathBuf>, json: bool) -> Result<()> {
    let snapshot = load_snapshot(file)?;
    let aggregator = Aggregator::new(&snapshot.normalized.table);
    let months = aggregator.months();

    if json {
        let output = serde_json::json!({
            "source": snapshot.source.display().to_string(),
            "months": months.iter().filter_map(|m| {
                let report = aggregator.month_report(m).ok()?;
                Some(serde_json::json!({
                    "month": report.month,
                    "records": report.row_count,
                    "tokens": report.total_tokens,
                    "cost": report.total_cost,
                }))
            }).collect::<Vec<_>>()
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        warn_skipped(&snapshot);
        println!("📅 Available Months\n");
        println!("{:<10} {:>10} {:>15} {:>12}", "Month", "Records", "Tokens", "Cost");
        println!("{}", "─".repeat(50));

        for month in &months {
            let report = aggregator.month_report(month)?;
            println!(
                "{:<10} {:>10} {:>15} ${:>11.2}",
                report.month,
                report.row_count,
                format_number(report.total_tokens),
                report.total_cost
            );
        }
    }

    Ok(())
}
