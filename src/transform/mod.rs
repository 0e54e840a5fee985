// src/transform/mod.rs
use crate::frame::{cmp_values, Frame, Value};
use crate::stats;
use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tracing::warn;

/// First numeric group in a messy cell: optional sign, digits with
/// thousands commas, optional decimal part.
static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?").expect("numeric pattern compiles"));

/// Parse a messy cell into a number. Handles `"70%"`, `"12,000"`, and
/// prose like `"12,000 (expandable)"`; anything without digits is None.
pub(crate) fn parse_numeric_str(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.strip_suffix('%').unwrap_or(s);
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }
    let found = NUMERIC_RE.find(s)?;
    let cleaned: String = found.as_str().chars().filter(|c| *c != ',').collect();
    cleaned.parse().ok()
}

/// Numeric view of a column without touching the frame. Unparseable text
/// becomes missing; the caller drops it from aggregates.
pub fn to_numeric(frame: &Frame, column: &str) -> Result<Vec<Option<f64>>> {
    let idx = frame.column_index(column)?;
    Ok(frame
        .rows()
        .iter()
        .map(|row| match &row[idx] {
            Value::Null => None,
            Value::Int(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            Value::Text(s) => parse_numeric_str(s),
        })
        .collect())
}

/// Rewrite a column in place as numeric; cells that fail to parse become
/// missing. Returns how many were dropped.
pub fn coerce_numeric(frame: &mut Frame, column: &str) -> Result<usize> {
    let idx = frame.column_index(column)?;
    let mut dropped = 0;
    for row in frame.rows_mut() {
        let cell = &mut row[idx];
        let next = match cell {
            Value::Null | Value::Int(_) | Value::Real(_) => None,
            Value::Text(s) => match parse_numeric_str(s) {
                Some(v) => Some(Value::Real(v)),
                None => {
                    dropped += 1;
                    Some(Value::Null)
                }
            },
        };
        if let Some(v) = next {
            *cell = v;
        }
    }
    if dropped > 0 {
        warn!(column, dropped, "cells failed numeric coercion; treated as missing");
    }
    Ok(dropped)
}

/// Trim a categorical column and relabel NULL/blank cells with a sentinel.
/// Returns how many cells were relabeled.
pub fn clean_category(frame: &mut Frame, column: &str, missing_label: &str) -> Result<usize> {
    let idx = frame.column_index(column)?;
    let mut relabeled = 0;
    for row in frame.rows_mut() {
        let cell = &mut row[idx];
        let next = match cell {
            Value::Null => {
                relabeled += 1;
                Some(Value::Text(missing_label.to_string()))
            }
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    relabeled += 1;
                    Some(Value::Text(missing_label.to_string()))
                } else if trimmed.len() != s.len() {
                    Some(Value::Text(trimmed.to_string()))
                } else {
                    None
                }
            }
            _ => None,
        };
        if let Some(v) = next {
            *cell = v;
        }
    }
    Ok(relabeled)
}

/// Append a column derived cell-by-cell from `source`.
pub fn with_derived<F>(frame: &mut Frame, source: &str, name: &str, derive: F) -> Result<()>
where
    F: Fn(&Value) -> Value,
{
    let idx = frame.column_index(source)?;
    let derived: Vec<Value> = frame.rows().iter().map(|row| derive(&row[idx])).collect();
    frame.add_column(name, derived)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Mean,
    Std,
    Median,
}

impl Aggregate {
    fn suffix(self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
            Aggregate::Mean => "mean",
            Aggregate::Std => "std",
            Aggregate::Median => "median",
        }
    }

    /// Aggregate over the group's non-missing values. Count and Sum are
    /// total (0 for an empty group); the others have no defined value there
    /// and yield NULL, as does Std for a single observation.
    fn apply(self, xs: &[f64]) -> Value {
        match self {
            Aggregate::Count => Value::Int(xs.len() as i64),
            Aggregate::Sum => Value::Real(xs.iter().sum()),
            Aggregate::Mean => stats::mean(xs).map(Value::Real).unwrap_or(Value::Null),
            Aggregate::Std => stats::sample_std(xs).map(Value::Real).unwrap_or(Value::Null),
            Aggregate::Median => stats::median(xs).map(Value::Real).unwrap_or(Value::Null),
        }
    }
}

/// Ordering wrapper so [`Value`] group keys can live in a BTreeMap.
#[derive(Debug, Clone, PartialEq)]
struct GroupKey(Value);

impl Eq for GroupKey {}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_values(&self.0, &other.0)
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Group by `key` and aggregate the numeric `value` column. Rows with a
/// NULL key are dropped; missing values are excluded per group. Output
/// columns are the key plus `<value>_<agg>`, sorted by key.
pub fn group_by(frame: &Frame, key: &str, value: &str, aggs: &[Aggregate]) -> Result<Frame> {
    if aggs.is_empty() {
        bail!("group_by needs at least one aggregate");
    }
    let key_idx = frame.column_index(key)?;
    let values = frame.f64_column(value)?;

    let mut groups: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    for (row, v) in frame.rows().iter().zip(&values) {
        let k = &row[key_idx];
        if k.is_null() {
            continue;
        }
        let bucket = groups.entry(GroupKey(k.clone())).or_default();
        if let Some(v) = v {
            bucket.push(*v);
        }
    }

    let mut columns = vec![key.to_string()];
    columns.extend(aggs.iter().map(|a| format!("{}_{}", value, a.suffix())));
    let mut out = Frame::new(columns);
    for (GroupKey(k), xs) in groups {
        let mut row = vec![k];
        row.extend(aggs.iter().map(|a| a.apply(&xs)));
        out.push_row(row)?;
    }
    Ok(out)
}

/// Occurrences of each distinct non-NULL value, sorted by value. Columns
/// are the original name plus `count`; callers re-sort by count if needed.
pub fn value_counts(frame: &Frame, column: &str) -> Result<Frame> {
    let idx = frame.column_index(column)?;
    let mut counts: BTreeMap<GroupKey, i64> = BTreeMap::new();
    for row in frame.rows() {
        let v = &row[idx];
        if v.is_null() {
            continue;
        }
        *counts.entry(GroupKey(v.clone())).or_insert(0) += 1;
    }
    let mut out = Frame::new(vec![column.to_string(), "count".to_string()]);
    for (GroupKey(v), n) in counts {
        out.push_row(vec![v, Value::Int(n)])?;
    }
    Ok(out)
}

/// Declared domain for a long→wide pivot. The output covers the whole
/// `rows` range and every listed column, whether or not the input does.
#[derive(Debug, Clone)]
pub struct PivotSpec<'a> {
    pub row_key: &'a str,
    pub col_key: &'a str,
    pub value: &'a str,
    pub rows: RangeInclusive<i64>,
    pub columns: Vec<String>,
    pub fill: f64,
}

/// Pivot with summed cells. Input rows whose row key falls outside the
/// declared range, or whose column label is not listed, are dropped; every
/// declared (row, column) pair absent from the input gets `fill`.
pub fn pivot_sum(frame: &Frame, spec: &PivotSpec<'_>) -> Result<Frame> {
    let row_keys = frame.i64_column(spec.row_key)?;
    let col_labels = frame.text_column(spec.col_key)?;
    let values = frame.f64_column(spec.value)?;

    let mut acc: BTreeMap<(i64, usize), f64> = BTreeMap::new();
    for ((row_key, col_label), value) in row_keys.iter().zip(&col_labels).zip(&values) {
        let (Some(r), Some(v)) = (row_key, value) else {
            continue;
        };
        if !spec.rows.contains(r) {
            continue;
        }
        let Some(c) = spec.columns.iter().position(|col| col == col_label) else {
            continue;
        };
        *acc.entry((*r, c)).or_insert(0.0) += v;
    }

    let mut columns = vec![spec.row_key.to_string()];
    columns.extend(spec.columns.iter().cloned());
    let mut out = Frame::new(columns);
    for r in spec.rows.clone() {
        let mut row = vec![Value::Int(r)];
        for c in 0..spec.columns.len() {
            row.push(Value::Real(acc.get(&(r, c)).copied().unwrap_or(spec.fill)));
        }
        out.push_row(row)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,rustytuesday::transform=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn frame_of(columns: &[&str], rows: Vec<Vec<Value>>) -> Frame {
        let mut f = Frame::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            f.push_row(row).unwrap();
        }
        f
    }

    #[test]
    fn numeric_parsing_handles_messy_cells() {
        assert_eq!(parse_numeric_str("70%"), Some(70.0));
        assert_eq!(parse_numeric_str(" 72.5% "), Some(72.5));
        assert_eq!(parse_numeric_str("12,000"), Some(12000.0));
        assert_eq!(parse_numeric_str("12,000 (expandable to 15,000)"), Some(12000.0));
        assert_eq!(parse_numeric_str("-249"), Some(-249.0));
        assert_eq!(parse_numeric_str("n/a"), None);
        assert_eq!(parse_numeric_str(""), None);
        assert_eq!(parse_numeric_str("unknown"), None);
    }

    #[test]
    fn coercion_drops_bad_cells_not_the_run() {
        init_test_logging();
        let mut f = frame_of(
            &["pct", "rating"],
            vec![
                vec![Value::Text("70%".into()), Value::Real(3.0)],
                vec![Value::Text("70%".into()), Value::Real(4.0)],
                vec![Value::Text("n/a".into()), Value::Real(5.0)],
            ],
        );
        let dropped = coerce_numeric(&mut f, "pct").unwrap();
        assert_eq!(dropped, 1);
        let pct = f.f64_column("pct").unwrap();
        assert_eq!(pct, vec![Some(70.0), Some(70.0), None]);

        // The n/a row is excluded from the group, not fatal.
        let grouped = group_by(&f, "pct", "rating", &[Aggregate::Mean, Aggregate::Count]).unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped.f64_column("rating_mean").unwrap(), vec![Some(3.5)]);
    }

    #[test]
    fn group_means_per_key() {
        let f = frame_of(
            &["g", "v"],
            vec![
                vec![Value::Text("A".into()), Value::Real(10.0)],
                vec![Value::Text("A".into()), Value::Real(20.0)],
                vec![Value::Text("B".into()), Value::Real(5.0)],
            ],
        );
        let out = group_by(&f, "g", "v", &[Aggregate::Mean]).unwrap();
        assert_eq!(out.text_column("g").unwrap(), vec!["A", "B"]);
        assert_eq!(
            out.f64_column("v_mean").unwrap(),
            vec![Some(15.0), Some(5.0)]
        );
    }

    #[test]
    fn std_of_single_observation_is_missing() {
        let f = frame_of(
            &["g", "v"],
            vec![
                vec![Value::Text("A".into()), Value::Real(1.0)],
                vec![Value::Text("A".into()), Value::Real(3.0)],
                vec![Value::Text("B".into()), Value::Real(5.0)],
            ],
        );
        let out = group_by(&f, "g", "v", &[Aggregate::Std]).unwrap();
        let stds = out.f64_column("v_std").unwrap();
        assert!((stds[0].unwrap() - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert_eq!(stds[1], None);
    }

    #[test]
    fn value_counts_sorted_and_null_free() {
        let f = frame_of(
            &["decade"],
            vec![
                vec![Value::Int(1970)],
                vec![Value::Int(1960)],
                vec![Value::Int(1970)],
                vec![Value::Null],
            ],
        );
        let counts = value_counts(&f, "decade").unwrap();
        assert_eq!(counts.text_column("decade").unwrap(), vec!["1960", "1970"]);
        assert_eq!(
            counts.f64_column("count").unwrap(),
            vec![Some(1.0), Some(2.0)]
        );
    }

    #[test]
    fn pivot_is_rectangular_over_declared_domain() {
        // Data only covers seasons 21 to 24; the declared domain runs to 26.
        let mut rows = Vec::new();
        for season in 21..=24 {
            rows.push(vec![
                Value::Int(season),
                Value::Text("Homer".into()),
                Value::Int(100),
            ]);
            rows.push(vec![
                Value::Int(season),
                Value::Text("Marge".into()),
                Value::Int(50),
            ]);
        }
        let f = frame_of(&["season", "character", "lines"], rows);
        let spec = PivotSpec {
            row_key: "season",
            col_key: "character",
            value: "lines",
            rows: 21..=26,
            columns: vec!["Homer".into(), "Marge".into()],
            fill: 0.0,
        };
        let wide = pivot_sum(&f, &spec).unwrap();

        assert_eq!(wide.len(), 6);
        assert_eq!(wide.columns(), &["season", "Homer", "Marge"]);
        let homer = wide.f64_column("Homer").unwrap();
        assert_eq!(homer[0], Some(100.0));
        assert_eq!(homer[4], Some(0.0));
        assert_eq!(homer[5], Some(0.0));
        let marge = wide.f64_column("Marge").unwrap();
        assert_eq!(marge[5], Some(0.0));
    }

    #[test]
    fn pivot_sums_duplicate_cells_and_drops_out_of_domain() {
        let f = frame_of(
            &["season", "character", "lines"],
            vec![
                vec![Value::Int(21), Value::Text("Homer".into()), Value::Int(1)],
                vec![Value::Int(21), Value::Text("Homer".into()), Value::Int(2)],
                vec![Value::Int(99), Value::Text("Homer".into()), Value::Int(7)],
                vec![Value::Int(21), Value::Text("Ned".into()), Value::Int(9)],
            ],
        );
        let spec = PivotSpec {
            row_key: "season",
            col_key: "character",
            value: "lines",
            rows: 21..=22,
            columns: vec!["Homer".into()],
            fill: 0.0,
        };
        let wide = pivot_sum(&f, &spec).unwrap();
        assert_eq!(wide.f64_column("Homer").unwrap(), vec![Some(3.0), Some(0.0)]);
    }

    #[test]
    fn clean_category_relabels_blank_and_null() {
        let mut f = frame_of(
            &["origin"],
            vec![
                vec![Value::Text("  Peru ".into())],
                vec![Value::Text("   ".into())],
                vec![Value::Null],
                vec![Value::Text("Fiji".into())],
            ],
        );
        let relabeled = clean_category(&mut f, "origin", "Unknown").unwrap();
        assert_eq!(relabeled, 2);
        assert_eq!(
            f.text_column("origin").unwrap(),
            vec!["Peru", "Unknown", "Unknown", "Fiji"]
        );
    }

    #[test]
    fn derived_decade_column() {
        let mut f = frame_of(
            &["release_year"],
            vec![
                vec![Value::Int(1968)],
                vec![Value::Int(1970)],
                vec![Value::Null],
            ],
        );
        with_derived(&mut f, "release_year", "decade", |v| match v.as_f64() {
            Some(y) => Value::Int(((y / 10.0).floor() as i64) * 10),
            None => Value::Null,
        })
        .unwrap();
        assert_eq!(f.text_column("decade").unwrap(), vec!["1960", "1970", ""]);
        // A second derive under the same name is refused.
        assert!(with_derived(&mut f, "release_year", "decade", |v| v.clone()).is_err());
    }
}
