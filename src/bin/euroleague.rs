//! EuroLeague arenas: capacity rundown and total seating by country.

use anyhow::Result;
use rustytuesday::frame::SortDir;
use rustytuesday::present::chart::{self, Chart, ChartKind};
use rustytuesday::store::{self, IngestOutcome, RefreshPolicy};
use rustytuesday::transform::{self, Aggregate};
use rustytuesday::{fetch, logging, present, query};
use std::path::Path;

const DATA_URL: &str =
    "https://raw.githubusercontent.com/rfordatascience/tidytuesday/main/data/2025/2025-10-07/euroleague_basketball.csv";
const STORE: &str = "EuroLeague.db";
const CHART: &str = "charts/euroleague_capacity.svg";

fn main() -> Result<()> {
    logging::init();

    let client = fetch::http_client()?;
    let dataset = fetch::fetch_csv(&client, DATA_URL)?;
    println!("→ fetched {} rows from {}", dataset.row_count(), DATA_URL);

    let store_path = Path::new(STORE);
    match store::ensure_store(
        store_path,
        &[("basketball", &dataset)],
        RefreshPolicy::OnContentChange,
    )? {
        IngestOutcome::Created => println!("✅ created store {STORE}"),
        IngestOutcome::Refreshed => println!("✅ refreshed store {STORE} (source changed)"),
        IngestOutcome::Reused => println!("store {STORE} already up to date; reusing"),
    }

    arenas_by_capacity(store_path)?;
    capacity_by_country(store_path)?;
    Ok(())
}

/// Every arena ordered by its raw capacity value, as stored.
fn arenas_by_capacity(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let arenas = query::run(
        &conn,
        "SELECT Arena, Capacity, Country FROM basketball ORDER BY Capacity",
        [],
    )?;
    println!("\nArenas Organized by Capacity:\n");
    present::print_frame(&arenas);
    Ok(())
}

/// Seating summed per country. Capacity cells read like
/// `"12,000 (expandable to 15,000)"`; only the first number counts.
fn capacity_by_country(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let mut arenas = query::run(&conn, "SELECT Country, Capacity FROM basketball", [])?;
    transform::coerce_numeric(&mut arenas, "Capacity")?;
    let mut totals = transform::group_by(&arenas, "Country", "Capacity", &[Aggregate::Sum])?;
    totals.sort_by("Capacity_sum", SortDir::Descending)?;

    println!("\n🏀 Total Seating Capacity by Country:\n");
    present::print_frame(&totals);

    let mut chart = Chart::new(
        "EuroLeague Arena Seating Capacity by Country",
        ChartKind::Bar {
            categories: totals.text_column("Country")?,
            values: totals
                .f64_column("Capacity_sum")?
                .into_iter()
                .flatten()
                .collect(),
        },
    );
    chart.x_label = "Country".into();
    chart.y_label = "Total Seating Capacity".into();
    chart.size = (1000, 600);
    chart.rotate_x_labels = true;
    chart::render_svg(&chart, Path::new(CHART))?;
    println!("chart written → {CHART}");
    Ok(())
}
