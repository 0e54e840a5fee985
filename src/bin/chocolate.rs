//! Chocolate bar ratings: rating by cocoa percentage, bars with nutty
//! notes, and the distribution of bean origins.

use anyhow::Result;
use rusqlite::params;
use rustytuesday::frame::SortDir;
use rustytuesday::present::chart::{self, Chart, ChartKind};
use rustytuesday::store::{self, IngestOutcome, RefreshPolicy};
use rustytuesday::transform::{self, Aggregate};
use rustytuesday::{fetch, logging, present, query};
use std::path::Path;

const DATA_URL: &str =
    "https://raw.githubusercontent.com/rfordatascience/tidytuesday/main/data/2022/2022-01-18/chocolate.csv";
const STORE: &str = "chocolate.db";
const PIE_CHART: &str = "charts/chocolate_origin_pie.svg";
const BAR_CHART: &str = "charts/chocolate_origin_bar.svg";
const NUTTY_PATTERN: &str = "%nutty%";

fn main() -> Result<()> {
    logging::init();

    let client = fetch::http_client()?;
    let dataset = fetch::fetch_csv(&client, DATA_URL)?;
    println!("→ fetched {} rows from {}", dataset.row_count(), DATA_URL);

    let store_path = Path::new(STORE);
    match store::ensure_store(
        store_path,
        &[("chocolate_rating", &dataset)],
        RefreshPolicy::OnContentChange,
    )? {
        IngestOutcome::Created => println!("✅ created store {STORE}"),
        IngestOutcome::Refreshed => println!("✅ refreshed store {STORE} (source changed)"),
        IngestOutcome::Reused => println!("store {STORE} already up to date; reusing"),
    }

    rating_by_cocoa(store_path)?;
    nutty_bars(store_path)?;
    origin_pie(store_path)?;
    origin_bar(store_path)?;
    Ok(())
}

/// Mean and spread of the rating at each cocoa percentage. The percent
/// column arrives as text like `"70%"` and is coerced first.
fn rating_by_cocoa(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let mut ratings = query::run(
        &conn,
        "SELECT cocoa_percent, rating FROM chocolate_rating",
        [],
    )?;
    transform::coerce_numeric(&mut ratings, "cocoa_percent")?;
    let summary = transform::group_by(
        &ratings,
        "cocoa_percent",
        "rating",
        &[Aggregate::Mean, Aggregate::Std],
    )?;
    println!("\nRating by cocoa percentage:");
    present::print_frame(&summary);
    Ok(())
}

/// Bars whose memorable characteristics mention "nutty".
fn nutty_bars(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let nutty = query::run(
        &conn,
        "SELECT company_manufacturer, country_of_bean_origin, cocoa_percent,
                most_memorable_characteristics, rating
         FROM chocolate_rating
         WHERE most_memorable_characteristics LIKE ?1",
        params![NUTTY_PATTERN],
    )?;
    if nutty.is_empty() {
        println!("No rows matched the filter (nutty).");
    } else {
        println!("\nBars with nutty notes ({} rows):", nutty.len());
        present::print_frame(&nutty);
    }
    Ok(())
}

/// Share of bars by bean origin, as a pie with labels and percentages.
fn origin_pie(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let origins = query::run(
        &conn,
        "SELECT country_of_bean_origin FROM chocolate_rating",
        [],
    )?;
    let counts = transform::value_counts(&origins, "country_of_bean_origin")?;

    let mut chart = Chart::new(
        "Percentage by Origin of the Beans",
        ChartKind::Pie {
            labels: counts.text_column("country_of_bean_origin")?,
            values: counts.f64_column("count")?.into_iter().flatten().collect(),
        },
    );
    chart.size = (1000, 1000);
    chart::render_svg(&chart, Path::new(PIE_CHART))?;
    println!("chart written → {PIE_CHART}");
    Ok(())
}

/// How often each origin appears, busiest first; blanks count as Unknown.
fn origin_bar(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let mut origins = query::run(
        &conn,
        "SELECT country_of_bean_origin FROM chocolate_rating",
        [],
    )?;
    transform::clean_category(&mut origins, "country_of_bean_origin", "Unknown")?;
    let mut counts = transform::value_counts(&origins, "country_of_bean_origin")?;
    counts.sort_by("count", SortDir::Descending)?;

    let mut chart = Chart::new(
        "Frequency of Bean Country of Origin",
        ChartKind::Bar {
            categories: counts.text_column("country_of_bean_origin")?,
            values: counts.f64_column("count")?.into_iter().flatten().collect(),
        },
    );
    chart.x_label = "Origin".into();
    chart.y_label = "Total".into();
    chart.size = (1000, 600);
    chart.rotate_x_labels = true;
    chart::render_svg(&chart, Path::new(BAR_CHART))?;
    println!("chart written → {BAR_CHART}");
    Ok(())
}
