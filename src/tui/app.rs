use tracing::info;

use crate::aggregator::Aggregator;
use crate::data_loader::{DataLoader, Snapshot, SnapshotCache};
use crate::error::Result;
use crate::models::MonthReport;

pub struct App {
    loader: DataLoader,
    pub snapshot: Snapshot,
    pub months: Vec<String>,
    pub top_n: usize,
    pub selected_tab: Tab,
    pub selected_month: usize,
    /// Result of the last processed month; `None` until a month is processed.
    pub report: Option<Result<MonthReport>>,
    pub scroll: usize,
    pub status: Option<String>,
    pub should_quit: bool,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Tab {
    Charts,
    Tables,
    Rows,
    Diagnostics,
}

impl App {
    pub fn new(mut loader: DataLoader, top_n: usize) -> Result<Self> {
        let snapshot = loader.load()?;
        let mut app = Self {
            loader,
            snapshot,
            months: Vec::new(),
            top_n: top_n.max(1),
            selected_tab: Tab::Charts,
            selected_month: 0,
            report: None,
            scroll: 0,
            status: None,
            should_quit: false,
        };
        app.refresh_months();
        app.process();
        Ok(app)
    }

    fn refresh_months(&mut self) {
        self.months = Aggregator::new(&self.snapshot.normalized.table).months();
        // Latest month first in focus.
        self.selected_month = self.months.len().saturating_sub(1);
    }

    pub fn selected_month(&self) -> Option<&str> {
        self.months.get(self.selected_month).map(String::as_str)
    }

    pub fn next_tab(&mut self) {
        self.selected_tab = match self.selected_tab {
            Tab::Charts => Tab::Tables,
            Tab::Tables => Tab::Rows,
            Tab::Rows => Tab::Diagnostics,
            Tab::Diagnostics => Tab::Charts,
        };
        self.scroll = 0;
    }

    pub fn previous_tab(&mut self) {
        self.selected_tab = match self.selected_tab {
            Tab::Charts => Tab::Diagnostics,
            Tab::Tables => Tab::Charts,
            Tab::Rows => Tab::Tables,
            Tab::Diagnostics => Tab::Rows,
        };
        self.scroll = 0;
    }

    pub fn next_month(&mut self) {
        if self.selected_month + 1 < self.months.len() {
            self.selected_month += 1;
        }
    }

    pub fn previous_month(&mut self) {
        if self.selected_month > 0 {
            self.selected_month -= 1;
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_add(lines).min(self.scroll_limit());
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    fn scroll_limit(&self) -> usize {
        let len = match self.selected_tab {
            Tab::Rows => match &self.report {
                Some(Ok(report)) => report.rows.len(),
                _ => 0,
            },
            Tab::Diagnostics => self.snapshot.normalized.diagnostics.len(),
            Tab::Charts | Tab::Tables => 0,
        };
        len.saturating_sub(1)
    }

    /// Runs the aggregation for the highlighted month.
    pub fn process(&mut self) {
        self.scroll = 0;
        self.report = match self.selected_month() {
            Some(month) => Some(
                Aggregator::new(&self.snapshot.normalized.table)
                    .with_top_n(self.top_n)
                    .month_report(month),
            ),
            None => self.snapshot.normalized.warning().map(Err),
        };
    }

    /// Re-reads the file. Unchanged content is served from the cache.
    pub fn reload(&mut self) {
        let hits = self.loader.cache().hits();
        match self.loader.load() {
            Ok(snapshot) => {
                let unchanged = self.loader.cache().hits() > hits;
                self.snapshot = snapshot;
                self.refresh_months();
                self.process();
                self.status = Some(if unchanged {
                    "File unchanged".to_string()
                } else {
                    format!("Reloaded {} records", self.snapshot.normalized.table.len())
                });
                info!("Reload complete (cached: {})", unchanged);
            }
            Err(e) => {
                self.status = Some(format!("Reload failed: {}", e));
            }
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        self.loader.cache()
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use std::fs;
    use tempfile::tempdir;

    const EXPORT: &str = r#"{
        "alice": [
            {"timestamp": "2024-10-03T09:00:00", "model": "gpt-4o", "total_cost": 2, "input_tokens": 10},
            {"timestamp": "2024-11-03T09:00:00.123456", "model": "gpt-4o", "total_cost": "1.5"}
        ],
        "bob": [{"timestamp": "2024-11-04T09:00:00", "model": "claude", "total_cost": 3}, "oops"]
    }"#;

    fn app_with(contents: &str) -> (tempfile::TempDir, App) {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("costs.json");
        fs::write(&path, contents).expect("write export");
        let app = App::new(DataLoader::new(path), 10).expect("app");
        (dir, app)
    }

    #[test]
    fn starts_on_latest_month_with_report() {
        let (_dir, app) = app_with(EXPORT);

        assert_eq!(app.months, ["2024-10", "2024-11"]);
        assert_eq!(app.selected_month(), Some("2024-11"));
        let report = app.report.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(report.user_cost.last().unwrap().total_cost, 4.5);
        assert_eq!(app.snapshot.normalized.diagnostics.len(), 1);
    }

    #[test]
    fn selecting_and_processing_another_month() {
        let (_dir, mut app) = app_with(EXPORT);
        app.previous_month();
        app.previous_month();
        app.process();

        let report = app.report.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(report.month, "2024-10");
        assert_eq!(report.model_tokens[0].total_tokens, 10);

        app.next_month();
        app.next_month();
        assert_eq!(app.selected_month(), Some("2024-11"));
    }

    #[test]
    fn empty_export_surfaces_empty_result() {
        let (_dir, app) = app_with(r#"[{"timestamp": "never"}]"#);

        assert!(app.months.is_empty());
        assert!(matches!(app.report, Some(Err(TrackerError::EmptyResult))));
    }

    #[test]
    fn reload_of_unchanged_file_hits_cache() {
        let (dir, mut app) = app_with(EXPORT);
        app.reload();
        assert_eq!(app.status.as_deref(), Some("File unchanged"));

        fs::write(
            dir.path().join("costs.json"),
            r#"[{"timestamp": "2025-01-01T00:00:00", "user": "carol"}]"#,
        )
        .unwrap();
        app.reload();
        assert_eq!(app.status.as_deref(), Some("Reloaded 1 records"));
        assert_eq!(app.months, ["2025-01"]);
    }

    #[test]
    fn zero_top_n_shows_one_model() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("costs.json");
        fs::write(&path, EXPORT).expect("write export");
        let app = App::new(DataLoader::new(path), 0).expect("app");

        assert_eq!(app.top_n, 1);
        let report = app.report.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(report.model_cost.len(), 1);
    }

    #[test]
    fn tabs_cycle_both_ways() {
        let (_dir, mut app) = app_with(EXPORT);
        app.next_tab();
        assert_eq!(app.selected_tab, Tab::Tables);
        app.previous_tab();
        app.previous_tab();
        assert_eq!(app.selected_tab, Tab::Diagnostics);

        app.scroll_down(5);
        assert_eq!(app.scroll, 0);
    }
}
