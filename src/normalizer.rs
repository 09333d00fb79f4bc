//! Turns the parsed export into canonical rows.
//!
//! Two shapes are accepted and told apart structurally: a top-level array
//! of records (each carrying its own `user`), or a top-level object mapping
//! a user identifier to that user's records. Bad records never abort the
//! pass; each one is dropped with a single [`Diagnostic`].

use std::fmt;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{SkipReason, TrackerError};
use crate::models::{CanonicalRow, UsageTable, UNKNOWN_MODEL, UNKNOWN_USER};

struct TimestampFormat {
    pattern: &'static str,
    max_fraction_digits: usize,
}

/// Tried in order, first match wins. chrono's `%.f` reads up to nine
/// fractional digits, so the microsecond format caps the count itself.
const TIMESTAMP_FORMATS: [TimestampFormat; 2] = [
    TimestampFormat {
        pattern: "%Y-%m-%dT%H:%M:%S%.f",
        max_fraction_digits: 6,
    },
    TimestampFormat {
        pattern: "%Y-%m-%dT%H:%M:%S",
        max_fraction_digits: 0,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// `[record, ...]`
    Flat,
    /// `{"user": [record, ...], ...}`
    Grouped,
}

impl InputShape {
    pub fn detect(value: &Value) -> Option<Self> {
        match value {
            Value::Array(_) => Some(Self::Flat),
            Value::Object(_) => Some(Self::Grouped),
            _ => None,
        }
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat list"),
            Self::Grouped => write!(f, "grouped by user"),
        }
    }
}

/// Where in the input a diagnostic points.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordLocation {
    Document,
    Group(String),
    Record { group: Option<String>, index: usize },
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "input"),
            Self::Group(user) => write!(f, "group {:?}", user),
            Self::Record { group: Some(user), index } => {
                write!(f, "group {:?} record {}", user, index)
            }
            Self::Record { group: None, index } => write!(f, "record {}", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub location: RecordLocation,
    pub reason: SkipReason,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.reason)
    }
}

/// Where a row's `user` comes from.
#[derive(Debug, Clone, Copy)]
pub enum UserSource<'a> {
    /// The record's own `user` field.
    Field,
    /// The enclosing key in the grouped shape; overrides any `user` field.
    Group(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub shape: Option<InputShape>,
    pub table: UsageTable,
    pub diagnostics: Vec<Diagnostic>,
}

impl Normalized {
    /// `EmptyResult` when nothing survived validation.
    pub fn warning(&self) -> Option<TrackerError> {
        self.table.is_empty().then_some(TrackerError::EmptyResult)
    }
}

pub fn normalize(value: &Value) -> Normalized {
    let shape = InputShape::detect(value);
    let mut rows = Vec::new();
    let mut diagnostics = Vec::new();

    let mut report = |location: RecordLocation, reason: SkipReason| {
        debug!("Skipping {}: {}", location, reason);
        diagnostics.push(Diagnostic { location, reason });
    };

    match value {
        Value::Array(records) => {
            for (index, record) in records.iter().enumerate() {
                match normalize_record(record, UserSource::Field) {
                    Ok(row) => rows.push(row),
                    Err(reason) => report(RecordLocation::Record { group: None, index }, reason),
                }
            }
        }
        Value::Object(groups) => {
            for (user, records) in groups {
                let Value::Array(records) = records else {
                    report(
                        RecordLocation::Group(user.clone()),
                        SkipReason::GroupNotList(json_kind(records)),
                    );
                    continue;
                };

                for (index, record) in records.iter().enumerate() {
                    match normalize_record(record, UserSource::Group(user)) {
                        Ok(row) => rows.push(row),
                        Err(reason) => report(
                            RecordLocation::Record {
                                group: Some(user.clone()),
                                index,
                            },
                            reason,
                        ),
                    }
                }
            }
        }
        other => report(
            RecordLocation::Document,
            SkipReason::UnsupportedShape(json_kind(other)),
        ),
    }

    info!(
        "Normalized {} rows ({} skipped)",
        rows.len(),
        diagnostics.len()
    );

    let normalized = Normalized {
        shape,
        table: UsageTable::new(rows),
        diagnostics,
    };
    if let Some(warning) = normalized.warning() {
        warn!("{}", warning);
    }
    normalized
}

/// Validates one raw record. The checks run in a fixed order and the first
/// failure is returned.
pub fn normalize_record(record: &Value, user: UserSource<'_>) -> Result<CanonicalRow, SkipReason> {
    let Value::Object(fields) = record else {
        return Err(SkipReason::NotAnObject(json_kind(record)));
    };

    let raw_timestamp = match fields.get("timestamp") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => return Err(SkipReason::MissingTimestamp),
    };
    let timestamp = parse_timestamp(raw_timestamp)
        .ok_or_else(|| SkipReason::BadTimestamp(raw_timestamp.clone()))?;
    let month = timestamp.format("%Y-%m").to_string();

    let model = label(fields.get("model"), UNKNOWN_MODEL);
    let total_cost = coerce_cost(fields.get("total_cost"), &model)?;
    let total_tokens =
        token_count(fields, "input_tokens").saturating_add(token_count(fields, "output_tokens"));

    let user = match user {
        UserSource::Field => label(fields.get("user"), UNKNOWN_USER),
        UserSource::Group(key) => key.to_string(),
    };

    debug!("Accepted record for {} / {} in {}", user, model, month);

    Ok(CanonicalRow {
        month,
        timestamp,
        model,
        user,
        total_cost,
        total_tokens,
    })
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let fraction_digits = raw.rsplit_once('.').map_or(0, |(_, fraction)| fraction.len());
    TIMESTAMP_FORMATS
        .iter()
        .filter(|format| fraction_digits <= format.max_fraction_digits)
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format.pattern).ok())
}

fn coerce_cost(value: Option<&Value>, model: &str) -> Result<f64, SkipReason> {
    let invalid = |value: String| SkipReason::BadCost {
        model: model.to_string(),
        value,
    };

    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| invalid(n.to_string())),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid(s.clone())),
        Some(other) => Err(invalid(other.to_string())),
    }
}

fn token_count(fields: &Map<String, Value>, key: &str) -> i64 {
    match fields.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn label(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
