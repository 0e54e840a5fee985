//! Pima diabetes risk factors: Welch t-tests of positive vs negative
//! outcome groups, plus a mean/median profile chart per factor.
//!
//! Reads an existing `IndianDiabetes.db`; nothing is fetched or ingested
//! here, so provision the store before running.

use anyhow::{Context, Result};
use rusqlite::Connection;
use rustytuesday::present::chart::{self, Chart, ChartKind, Series};
use rustytuesday::{logging, query, stats, store};
use std::path::Path;

const STORE: &str = "IndianDiabetes.db";
const FACTORS: &[&str] = &["age", "pregnancy_num", "triceps_mm", "bmi"];
const ALPHA: f64 = 0.05;

fn main() -> Result<()> {
    logging::init();

    let store_path = Path::new(STORE);
    for factor in FACTORS {
        test_of_significance(store_path, factor)?;
    }
    for factor in FACTORS {
        profile_chart(store_path, factor)?;
    }
    Ok(())
}

/// Factor values split into the diabetes-positive and -negative groups.
/// The column name goes through the allow-list before touching SQL.
fn split_groups(conn: &Connection, factor: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let column = query::checked_ident(factor, FACTORS)?;
    let frame = query::run(
        conn,
        &format!("SELECT diabetes_5y, {column} FROM diabetes WHERE {column} IS NOT NULL"),
        [],
    )?;
    let outcomes = frame.text_column("diabetes_5y")?;
    let values = frame.f64_column(column)?;

    let mut pos = Vec::new();
    let mut neg = Vec::new();
    for (outcome, value) in outcomes.iter().zip(values) {
        let Some(v) = value else { continue };
        match outcome.as_str() {
            "pos" => pos.push(v),
            "neg" => neg.push(v),
            _ => {}
        }
    }
    Ok((pos, neg))
}

/// Welch's t-test of the factor across outcome groups, printed.
fn test_of_significance(store_path: &Path, factor: &str) -> Result<()> {
    let conn = store::open_existing(store_path)?;
    let (pos, neg) = split_groups(&conn, factor)?;
    let test = stats::welch_t_test(&pos, &neg)
        .with_context(|| format!("t-test for factor {factor}"))?;
    let verdict = if test.significant(ALPHA) {
        "Significant difference"
    } else {
        "No significant difference"
    };

    println!("Factor tested: {factor}");
    println!(
        "Mean (pos): {:.2}, Mean (neg): {:.2}",
        test.mean_a, test.mean_b
    );
    println!("t = {:.3}, p = {:.3} ➡️  {verdict}", test.t, test.p_value);
    println!();
    Ok(())
}

/// Mean and median of the factor per outcome group, side by side.
fn profile_chart(store_path: &Path, factor: &str) -> Result<()> {
    let conn = store::open_existing(store_path)?;
    let (pos, neg) = split_groups(&conn, factor)?;

    let summary = |group: &str, xs: &[f64]| -> Result<Vec<f64>> {
        let mean = stats::mean(xs)
            .with_context(|| format!("no {factor} values in the {group} group"))?;
        let median = stats::median(xs)
            .with_context(|| format!("no {factor} values in the {group} group"))?;
        Ok(vec![mean, median])
    };

    let mut chart = Chart::new(
        format!("{} - Mean and Median by Diabetes Status", capitalize(factor)),
        ChartKind::GroupedBar {
            categories: vec!["Mean".into(), "Median".into()],
            series: vec![
                Series {
                    name: "Positive".into(),
                    values: summary("positive", &pos)?,
                },
                Series {
                    name: "Negative".into(),
                    values: summary("negative", &neg)?,
                },
            ],
        },
    );
    chart.y_label = factor.to_string();
    chart.size = (700, 500);

    let path = format!("charts/diabetes_{factor}.svg");
    chart::render_svg(&chart, Path::new(&path))?;
    println!("chart written → {path}");
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
