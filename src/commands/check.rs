use std::path::PathBuf;

use anyhow::Result;

use super::load_snapshot;
use crate::aggregator::Aggregator;

pub fn show_check(file: Option<PathBuf>, json: bool) -> Result<()> {
    let snapshot = load_snapshot(file)?;
    let normalized = &snapshot.normalized;
    let months = Aggregator::new(&normalized.table).months();
    let warning = normalized.warning().map(|w| w.to_string());

    if json {
        let output = serde_json::json!({
            "source": snapshot.source.display().to_string(),
            "shape": normalized.shape.map(|s| s.to_string()),
            "records": normalized.table.len(),
            "months": months,
            "skipped": normalized.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
            "warning": warning,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("🔍 Export Check\n");
        println!("   Source:  {}", snapshot.source.display());
        if let Some(shape) = normalized.shape {
            println!("   Shape:   {}", shape);
        }
        println!("   Records: {} valid, {} skipped", normalized.table.len(), normalized.diagnostics.len());
        println!("   Months:  {}", months.join(", "));

        if !normalized.diagnostics.is_empty() {
            println!("\n⚠️  Skipped:");
            for diagnostic in &normalized.diagnostics {
                println!("   {}", diagnostic);
            }
        }
        if let Some(warning) = warning {
            println!("\n⚠️  {}", warning);
        }
    }

    Ok(())
}
