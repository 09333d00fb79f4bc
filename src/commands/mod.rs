pub mod check;
pub mod months;
pub mod report;

pub use check::*;
pub use months::*;
pub use report::*;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::resolve_input;
use crate::data_loader::{DataLoader, Snapshot};

pub(crate) fn load_snapshot(file: Option<PathBuf>) -> Result<Snapshot> {
    let path = resolve_input(file)?;
    DataLoader::new(&path)
        .load()
        .with_context(|| format!("Failed to load {}", path.display()))
}

pub(crate) fn warn_skipped(snapshot: &Snapshot) {
    let skipped = snapshot.normalized.diagnostics.len();
    if skipped > 0 {
        eprintln!(
            "⚠️  {} record(s) skipped; run `cost-tracker check` for details",
            skipped
        );
    }
    if let Some(warning) = snapshot.normalized.warning() {
        eprintln!("⚠️  {}", warning);
    }
}

pub(crate) fn format_number(n: i64) -> String {
    let s = n.unsigned_abs().to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    if n < 0 {
        result.push('-');
    }
    result.chars().rev().collect()
}

pub(crate) fn truncate(label: &str, width: usize) -> String {
    if label.chars().count() > width {
        let head: String = label.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_get_thousands_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_234_567), "1,234,567");
        assert_eq!(format_number(-12_000), "-12,000");
    }

    #[test]
    fn long_labels_are_shortened() {
        assert_eq!(truncate("gpt-4o", 10), "gpt-4o");
        assert_eq!(truncate("anthropic.claude-3-5-sonnet", 12), "anthropic...");
    }
}
