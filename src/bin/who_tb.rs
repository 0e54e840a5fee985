//! WHO TB mortality: the global average, country extremes, and countries
//! that halved their rate since 2020.

use anyhow::{Context, Result};
use rusqlite::params;
use rustytuesday::present::chart::{self, Chart, ChartKind};
use rustytuesday::store::{self, IngestOutcome, RefreshPolicy};
use rustytuesday::{fetch, logging, present, query, stats, transform};
use std::path::Path;

const DATA_URL: &str =
    "https://raw.githubusercontent.com/rfordatascience/tidytuesday/main/data/2025/2025-11-18/who_tb_data.csv";
const STORE: &str = "WHOTB.db";
const TOP_CHART: &str = "charts/who_tb_top20.svg";
const LOW_CHART: &str = "charts/who_tb_lowest20.svg";

const YEAR: i64 = 2023;
const BASE_YEAR: i64 = 2020;
const TOP: i64 = 20;

fn main() -> Result<()> {
    logging::init();

    let client = fetch::http_client()?;
    let dataset = fetch::fetch_csv(&client, DATA_URL)?;
    println!("→ fetched {} rows from {}", dataset.row_count(), DATA_URL);

    let store_path = Path::new(STORE);
    match store::ensure_store(
        store_path,
        &[("tbdata", &dataset)],
        RefreshPolicy::OnContentChange,
    )? {
        IngestOutcome::Created => println!("✅ created store {STORE}"),
        IngestOutcome::Refreshed => println!("✅ refreshed store {STORE} (source changed)"),
        IngestOutcome::Reused => println!("store {STORE} already up to date; reusing"),
    }

    average_mortality(store_path)?;
    top_mortality(store_path)?;
    lowest_mortality(store_path)?;
    halved_since_base(store_path)?;
    Ok(())
}

/// Mean estimated deaths per 100k across every country row in [`YEAR`];
/// non-numeric cells are dropped, not fatal.
fn average_mortality(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let rates = query::run(
        &conn,
        "SELECT e_mort_100k FROM tbdata WHERE year = ?1",
        params![YEAR],
    )?;
    let values: Vec<f64> = transform::to_numeric(&rates, "e_mort_100k")?
        .into_iter()
        .flatten()
        .collect();
    let avg = stats::mean(&values).context("no mortality figures for the year")?;
    println!("Average estimated TB deaths per 100k in {YEAR}: {avg:.1}");
    Ok(())
}

/// The [`TOP`] hardest-hit countries, charted.
fn top_mortality(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let top = query::run(
        &conn,
        "SELECT country, e_mort_100k FROM tbdata
         WHERE year = ?1 AND e_mort_100k IS NOT NULL
         ORDER BY e_mort_100k DESC
         LIMIT ?2",
        params![YEAR, TOP],
    )?;

    let mut chart = Chart::new(
        format!("Top {TOP} Countries by TB Deaths per 100k ({YEAR})"),
        ChartKind::Bar {
            categories: top.text_column("country")?,
            values: top.f64_column("e_mort_100k")?.into_iter().flatten().collect(),
        },
    );
    chart.x_label = "Country".into();
    chart.y_label = "TB deaths per 100k".into();
    chart.size = (1200, 600);
    chart.rotate_x_labels = true;
    chart::render_svg(&chart, Path::new(TOP_CHART))?;
    println!("chart written → {TOP_CHART}");
    Ok(())
}

/// The [`TOP`] countries with the lowest recorded rate, charted.
fn lowest_mortality(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let lowest = query::run(
        &conn,
        "SELECT country, e_mort_100k FROM tbdata
         WHERE year = ?1 AND e_mort_100k IS NOT NULL
         ORDER BY e_mort_100k ASC
         LIMIT ?2",
        params![YEAR, TOP],
    )?;

    let mut chart = Chart::new(
        format!("Countries with {TOP} lowest TB Deaths per 100k ({YEAR})"),
        ChartKind::Bar {
            categories: lowest.text_column("country")?,
            values: lowest
                .f64_column("e_mort_100k")?
                .into_iter()
                .flatten()
                .collect(),
        },
    );
    chart.x_label = "Country".into();
    chart.y_label = "TB deaths per 100k".into();
    chart.size = (1200, 600);
    chart.rotate_x_labels = true;
    chart::render_svg(&chart, Path::new(LOW_CHART))?;
    println!("chart written → {LOW_CHART}");
    Ok(())
}

/// Countries whose [`YEAR`] rate is at most half their [`BASE_YEAR`] rate.
fn halved_since_base(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let halved = query::run(
        &conn,
        "SELECT t_now.country
         FROM tbdata AS t_now
         JOIN tbdata AS t_base ON t_now.country = t_base.country
         WHERE t_now.year = ?1
           AND t_base.year = ?2
           AND t_now.e_mort_100k <= 0.5 * t_base.e_mort_100k",
        params![YEAR, BASE_YEAR],
    )?;
    println!("\nCountries at or below half their {BASE_YEAR} TB mortality rate:");
    present::print_frame(&halved);
    Ok(())
}
