use chrono::NaiveDateTime;
use serde::Serialize;

pub const UNKNOWN_MODEL: &str = "Unknown Model";
pub const UNKNOWN_USER: &str = "Unknown User";
pub const TOTAL_LABEL: &str = "Total";

/// One validated record from the export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRow {
    pub month: String, // YYYY-MM format
    pub timestamp: NaiveDateTime,
    pub model: String,
    pub user: String,
    pub total_cost: f64,
    pub total_tokens: i64,
}

/// Immutable collection of rows built from a single load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageTable {
    rows: Vec<CanonicalRow>,
}

impl UsageTable {
    pub fn new(rows: Vec<CanonicalRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn for_month<'a>(&'a self, month: &'a str) -> impl Iterator<Item = &'a CanonicalRow> + 'a {
        self.rows.iter().filter(move |row| row.month == month)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelTokens {
    pub model: String,
    pub total_tokens: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCost {
    pub model: String,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserCost {
    pub user: String,
    pub total_cost: f64,
    #[serde(skip)]
    summary: bool,
}

impl UserCost {
    pub fn new(user: String, total_cost: f64) -> Self {
        Self {
            user,
            total_cost,
            summary: false,
        }
    }

    /// The synthetic trailing row summing every user.
    pub fn total(total_cost: f64) -> Self {
        Self {
            user: TOTAL_LABEL.to_string(),
            total_cost,
            summary: true,
        }
    }

    pub fn is_total(&self) -> bool {
        self.summary
    }
}

/// Everything the presentation layer needs for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthReport {
    pub month: String,
    pub row_count: usize,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub model_tokens: Vec<ModelTokens>,
    pub model_cost: Vec<ModelCost>,
    /// Sorted by cost, with the synthetic `Total` row last.
    pub user_cost: Vec<UserCost>,
    pub rows: Vec<CanonicalRow>,
}
