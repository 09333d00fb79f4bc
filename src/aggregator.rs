//! Monthly views over a [`UsageTable`].
//!
//! Groups are accumulated in label order, then stably sorted by the summed
//! metric, so equal sums keep ascending label order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::{Result, TrackerError};
use crate::models::{
    CanonicalRow, ModelCost, ModelTokens, MonthReport, UsageTable, UserCost,
};

pub const DEFAULT_TOP_N: usize = 10;

pub struct Aggregator<'a> {
    table: &'a UsageTable,
    top_n: usize,
}

impl<'a> Aggregator<'a> {
    pub fn new(table: &'a UsageTable) -> Self {
        Self {
            table,
            top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.max(1);
        self
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Distinct months, oldest first.
    pub fn months(&self) -> Vec<String> {
        self.table
            .rows()
            .iter()
            .map(|row| row.month.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn latest_month(&self) -> Option<String> {
        self.table.rows().iter().map(|row| &row.month).max().cloned()
    }

    pub fn month_report(&self, month: &str) -> Result<MonthReport> {
        let rows: Vec<&CanonicalRow> = self.table.for_month(month).collect();
        if rows.is_empty() {
            return Err(TrackerError::NoDataForMonth(month.to_string()));
        }
        debug!("Aggregating {} rows for {}", rows.len(), month);

        let token_sums = sum_by(&rows, |r| &r.model, |r| r.total_tokens, i64::saturating_add);
        let model_tokens = ranked(token_sums, |a, b| b.cmp(a))
            .into_iter()
            .take(self.top_n)
            .map(|(model, total_tokens)| ModelTokens {
                model,
                total_tokens,
            })
            .collect();

        let cost_sums = sum_by(&rows, |r| &r.model, |r| r.total_cost, add_f64);
        let model_cost = ranked(cost_sums, descending_f64)
            .into_iter()
            .take(self.top_n)
            .map(|(model, total_cost)| ModelCost { model, total_cost })
            .collect();

        let mut user_cost: Vec<UserCost> =
            ranked(sum_by(&rows, |r| &r.user, |r| r.total_cost, add_f64), descending_f64)
                .into_iter()
                .map(|(user, total_cost)| UserCost::new(user, total_cost))
                .collect();
        let total_cost: f64 = user_cost.iter().map(|u| u.total_cost).sum();
        user_cost.push(UserCost::total(total_cost));

        Ok(MonthReport {
            month: month.to_string(),
            row_count: rows.len(),
            total_tokens: rows
                .iter()
                .fold(0i64, |acc, r| acc.saturating_add(r.total_tokens)),
            total_cost,
            model_tokens,
            model_cost,
            user_cost,
            rows: rows.into_iter().cloned().collect(),
        })
    }
}

fn sum_by<V>(
    rows: &[&CanonicalRow],
    key: impl Fn(&CanonicalRow) -> &String,
    value: impl Fn(&CanonicalRow) -> V,
    combine: fn(V, V) -> V,
) -> BTreeMap<String, V>
where
    V: Copy + Default,
{
    let mut sums: BTreeMap<String, V> = BTreeMap::new();
    for &row in rows {
        let sum = sums.entry(key(row).clone()).or_default();
        *sum = combine(*sum, value(row));
    }
    sums
}

fn add_f64(a: f64, b: f64) -> f64 {
    a + b
}

fn ranked<V>(sums: BTreeMap<String, V>, order: impl Fn(&V, &V) -> Ordering) -> Vec<(String, V)> {
    let mut groups: Vec<(String, V)> = sums.into_iter().collect();
    groups.sort_by(|(_, a), (_, b)| order(a, b));
    groups
}

fn descending_f64(a: &f64, b: &f64) -> Ordering {
    b.total_cmp(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use serde_json::json;

    fn table(data: serde_json::Value) -> UsageTable {
        normalize(&data).table
    }

    #[test]
    fn user_table_ends_with_total() {
        let table = table(json!({
            "alice": [
                {"timestamp": "2024-11-01T10:00:00", "total_cost": 4},
                {"timestamp": "2024-11-20T10:00:00", "total_cost": 6}
            ],
            "bob": [{"timestamp": "2024-11-02T10:00:00", "total_cost": 5}]
        }));
        let report = Aggregator::new(&table).month_report("2024-11").unwrap();

        assert_eq!(
            report.user_cost,
            vec![
                UserCost::new("alice".into(), 10.0),
                UserCost::new("bob".into(), 5.0),
                UserCost::total(15.0),
            ]
        );
        let total = report.user_cost.last().unwrap();
        assert!(total.is_total());
        assert_eq!(total.user, "Total");
        assert_eq!(total.total_cost, 15.0);
        assert_eq!(report.total_cost, 15.0);
        assert_eq!(report.row_count, 3);
    }

    #[test]
    fn user_named_total_is_not_the_summary_row() {
        let table = table(json!({
            "Total": [{"timestamp": "2024-11-01T10:00:00", "total_cost": 7}],
            "bob": [{"timestamp": "2024-11-02T10:00:00", "total_cost": 2}]
        }));
        let report = Aggregator::new(&table).month_report("2024-11").unwrap();

        let flags: Vec<_> = report.user_cost.iter().map(|u| u.is_total()).collect();
        assert_eq!(flags, [false, false, true]);
        assert_eq!(report.user_cost[0].user, "Total");
        assert_eq!(report.user_cost[2].total_cost, 9.0);
    }

    #[test]
    fn huge_token_counts_saturate() {
        let table = table(json!([
            {"timestamp": "2024-11-01T10:00:00", "model": "m", "input_tokens": 9_000_000_000_000_000_000i64},
            {"timestamp": "2024-11-02T10:00:00", "model": "m", "input_tokens": 9_000_000_000_000_000_000i64}
        ]));
        let report = Aggregator::new(&table).month_report("2024-11").unwrap();

        assert_eq!(report.model_tokens[0].total_tokens, i64::MAX);
        assert_eq!(report.total_tokens, i64::MAX);
    }

    #[test]
    fn zero_top_n_is_raised_to_one() {
        let table = table(json!([
            {"timestamp": "2024-11-01T10:00:00", "model": "a"},
            {"timestamp": "2024-11-01T10:00:00", "model": "b"}
        ]));
        let aggregator = Aggregator::new(&table).with_top_n(0);
        assert_eq!(aggregator.top_n(), 1);
        assert_eq!(aggregator.month_report("2024-11").unwrap().model_tokens.len(), 1);
    }

    #[test]
    fn unmatched_month_is_no_data() {
        let table = table(json!([{"timestamp": "2024-11-01T10:00:00", "user": "bob"}]));
        let err = Aggregator::new(&table).month_report("2024-10").unwrap_err();

        assert!(matches!(err, TrackerError::NoDataForMonth(ref m) if m == "2024-10"));
        assert_eq!(err.to_string(), "no data available for 2024-10");
    }

    #[test]
    fn rankings_are_capped_and_descending() {
        let records: Vec<_> = (1..=15)
            .map(|i| {
                json!({
                    "timestamp": "2024-11-01T10:00:00",
                    "model": format!("model-{i:02}"),
                    "total_cost": i as f64 * 0.5,
                    "input_tokens": i * 100,
                    "output_tokens": i
                })
            })
            .collect();
        let table = table(serde_json::Value::Array(records));
        let report = Aggregator::new(&table).month_report("2024-11").unwrap();

        assert_eq!(report.model_tokens.len(), 10);
        assert_eq!(report.model_cost.len(), 10);
        assert_eq!(report.model_tokens[0].model, "model-15");
        assert_eq!(report.model_tokens[0].total_tokens, 1515);
        assert!(report
            .model_tokens
            .windows(2)
            .all(|w| w[0].total_tokens > w[1].total_tokens));
        assert!(report
            .model_cost
            .windows(2)
            .all(|w| w[0].total_cost > w[1].total_cost));
        assert_eq!(report.model_cost.last().unwrap().model, "model-06");
    }

    #[test]
    fn top_n_can_be_narrowed() {
        let table = table(json!([
            {"timestamp": "2024-11-01T10:00:00", "model": "a", "total_cost": 1},
            {"timestamp": "2024-11-01T10:00:00", "model": "b", "total_cost": 2},
            {"timestamp": "2024-11-01T10:00:00", "model": "c", "total_cost": 3}
        ]));
        let report = Aggregator::new(&table)
            .with_top_n(2)
            .month_report("2024-11")
            .unwrap();

        let models: Vec<_> = report.model_cost.iter().map(|m| m.model.as_str()).collect();
        assert_eq!(models, ["c", "b"]);
    }

    #[test]
    fn models_are_summed_within_the_month_only() {
        let table = table(json!([
            {"timestamp": "2024-11-01T10:00:00", "model": "gpt-4o", "input_tokens": 10, "output_tokens": 5},
            {"timestamp": "2024-11-09T10:00:00.5", "model": "gpt-4o", "input_tokens": 1},
            {"timestamp": "2024-12-01T10:00:00", "model": "gpt-4o", "input_tokens": 1000}
        ]));
        let report = Aggregator::new(&table).month_report("2024-11").unwrap();

        assert_eq!(
            report.model_tokens,
            vec![ModelTokens { model: "gpt-4o".into(), total_tokens: 16 }]
        );
        assert_eq!(report.rows.len(), 2);
    }

    #[test]
    fn ties_fall_back_to_label_order() {
        let table = table(json!([
            {"timestamp": "2024-11-01T10:00:00", "model": "zeta", "total_cost": 1, "user": "zoe"},
            {"timestamp": "2024-11-01T10:00:00", "model": "alpha", "total_cost": 1, "user": "amy"},
            {"timestamp": "2024-11-01T10:00:00", "model": "mid", "total_cost": 1, "user": "max"}
        ]));
        let report = Aggregator::new(&table).month_report("2024-11").unwrap();

        let models: Vec<_> = report.model_cost.iter().map(|m| m.model.as_str()).collect();
        assert_eq!(models, ["alpha", "mid", "zeta"]);
        let users: Vec<_> = report.user_cost.iter().map(|u| u.user.as_str()).collect();
        assert_eq!(users, ["amy", "max", "zoe", "Total"]);
    }

    #[test]
    fn months_are_distinct_and_chronological() {
        let table = table(json!([
            {"timestamp": "2024-12-01T10:00:00"},
            {"timestamp": "2024-02-01T10:00:00"},
            {"timestamp": "2024-12-15T10:00:00"},
            {"timestamp": "2023-12-01T10:00:00"}
        ]));
        let aggregator = Aggregator::new(&table);

        assert_eq!(aggregator.months(), ["2023-12", "2024-02", "2024-12"]);
        assert_eq!(aggregator.latest_month().as_deref(), Some("2024-12"));
    }

    #[test]
    fn reports_are_deterministic() {
        let data = json!({
            "alice": [{"timestamp": "2024-11-01T10:00:00", "model": "a", "total_cost": 0.1}],
            "bob": [{"timestamp": "2024-11-01T10:00:00", "model": "b", "total_cost": 0.2}]
        });
        let first = table(data.clone());
        let second = table(data);

        assert_eq!(
            Aggregator::new(&first).month_report("2024-11").unwrap(),
            Aggregator::new(&second).month_report("2024-11").unwrap()
        );
    }
}
