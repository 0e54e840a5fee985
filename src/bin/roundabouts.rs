//! Roundabout inventory: busiest towns, countries with 100+ roundabouts,
//! US states on a tile grid, and the distribution of approach counts.

use anyhow::{Context, Result};
use rusqlite::params;
use rustytuesday::present::chart::{self, Chart, ChartKind};
use rustytuesday::store::{self, IngestOutcome, RefreshPolicy};
use rustytuesday::{fetch, logging, present, query};
use std::path::Path;

const DATA_URL: &str =
    "https://raw.githubusercontent.com/rfordatascience/tidytuesday/main/data/2025/2025-12-16/roundabouts_clean.csv";
const STORE: &str = "Roundabouts.db";
const COUNTRY_CHART: &str = "charts/roundabouts_countries.svg";
const STATES_CHART: &str = "charts/roundabouts_states.svg";

const COUNTRY_FLOOR: i64 = 99;
const STATE_FLOOR: i64 = 10;
const STATES_COUNTRY: &str = "United States";

fn main() -> Result<()> {
    logging::init();

    let client = fetch::http_client()?;
    let dataset = fetch::fetch_csv(&client, DATA_URL)?;
    println!("→ fetched {} rows from {}", dataset.row_count(), DATA_URL);

    let store_path = Path::new(STORE);
    match store::ensure_store(
        store_path,
        &[("roundabouts", &dataset)],
        RefreshPolicy::OnContentChange,
    )? {
        IngestOutcome::Created => println!("✅ created store {STORE}"),
        IngestOutcome::Refreshed => println!("✅ refreshed store {STORE} (source changed)"),
        IngestOutcome::Reused => println!("store {STORE} already up to date; reusing"),
    }

    count_by_town(store_path)?;
    count_by_country(store_path)?;
    states_choropleth(store_path)?;
    approaches_count(store_path)?;
    Ok(())
}

/// Roundabouts per town, busiest ten printed.
fn count_by_town(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let towns = query::run(
        &conn,
        "SELECT town_city, COUNT(*) AS roundabout_count
         FROM roundabouts
         WHERE town_city IS NOT NULL AND town_city <> ''
         GROUP BY town_city
         ORDER BY roundabout_count DESC",
        [],
    )?;
    println!("\nRoundabouts by town:");
    present::print_frame_preview(&towns, 10);
    Ok(())
}

/// Countries with more than [`COUNTRY_FLOOR`] roundabouts, charted.
fn count_by_country(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let countries = query::run(
        &conn,
        "SELECT country, COUNT(*) AS country_count
         FROM roundabouts
         WHERE country IS NOT NULL AND country <> ''
         GROUP BY country
         HAVING COUNT(*) > ?1
         ORDER BY country_count DESC",
        params![COUNTRY_FLOOR],
    )?;

    let mut chart = Chart::new(
        "Countries with 100+ Roundabouts",
        ChartKind::Bar {
            categories: countries.text_column("country")?,
            values: countries
                .f64_column("country_count")?
                .into_iter()
                .flatten()
                .collect(),
        },
    );
    chart.x_label = "Country".into();
    chart.y_label = "Number of Roundabouts".into();
    chart.rotate_x_labels = true;
    chart::render_svg(&chart, Path::new(COUNTRY_CHART))?;
    println!("chart written → {COUNTRY_CHART}");
    Ok(())
}

/// US roundabouts per state on the tile grid. Only two-letter regions
/// count, which screens out county rows in the same column.
fn states_choropleth(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let states = query::run(
        &conn,
        "SELECT UPPER(TRIM(state_region)) AS state, COUNT(*) AS state_count
         FROM roundabouts
         WHERE country = ?1
           AND state_region IS NOT NULL
           AND TRIM(state_region) <> ''
           AND LENGTH(TRIM(state_region)) = 2
         GROUP BY UPPER(TRIM(state_region))
         HAVING COUNT(*) > ?2
         ORDER BY state_count DESC",
        params![STATES_COUNTRY, STATE_FLOOR],
    )?;
    println!("Rows to plot: {}", states.len());
    present::print_frame_preview(&states, 10);

    let codes = states.text_column("state")?;
    let counts = states.f64_column("state_count")?;
    let regions: Vec<(String, f64)> = codes
        .into_iter()
        .zip(counts)
        .filter_map(|(code, n)| Some((code, n?)))
        .collect();

    let chart = Chart::new(
        "Roundabouts per State (States with >10)",
        ChartKind::Choropleth { regions },
    );
    chart::render_svg(&chart, Path::new(STATES_CHART))?;
    println!("chart written → {STATES_CHART}");
    Ok(())
}

/// How many approaches roundabouts have, and which count is most common.
fn approaches_count(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let counts = query::run(
        &conn,
        "SELECT approaches, COUNT(*) AS total
         FROM roundabouts
         WHERE approaches IS NOT NULL AND approaches <> ''
         GROUP BY approaches
         ORDER BY total DESC",
        [],
    )?;
    println!("\nRoundabouts by approach count:");
    present::print_frame(&counts);

    let first = counts
        .rows()
        .first()
        .context("no approach counts in the store")?;
    println!(
        "The most common number of approaches for a roundabout is {} approaches with {} total roundabouts.",
        first[0], first[1]
    );
    Ok(())
}
