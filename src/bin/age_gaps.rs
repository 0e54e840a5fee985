//! Hollywood age gaps: movies where the main character is a woman and the
//! actor age gap exceeds five years.

use anyhow::Result;
use rusqlite::params;
use rustytuesday::present::chart::{self, Chart, ChartKind};
use rustytuesday::store::{self, IngestOutcome, RefreshPolicy};
use rustytuesday::{fetch, logging, query};
use std::path::Path;

const DATA_URL: &str =
    "https://raw.githubusercontent.com/rfordatascience/tidytuesday/main/data/2023/2023-02-14/age_gaps.csv";
const STORE: &str = "age_differences.db";
const CHART: &str = "charts/age_gaps.svg";
const MIN_GAP: i64 = 5;

fn main() -> Result<()> {
    logging::init();

    let client = fetch::http_client()?;
    let dataset = fetch::fetch_csv(&client, DATA_URL)?;
    println!("→ fetched {} rows from {}", dataset.row_count(), DATA_URL);

    let store_path = Path::new(STORE);
    match store::ensure_store(
        store_path,
        &[("age_gaps", &dataset)],
        RefreshPolicy::OnContentChange,
    )? {
        IngestOutcome::Created => println!("✅ created store {STORE}"),
        IngestOutcome::Refreshed => println!("✅ refreshed store {STORE} (source changed)"),
        IngestOutcome::Reused => println!("store {STORE} already up to date; reusing"),
    }

    wide_gaps(store_path)?;
    Ok(())
}

/// Bar chart of age gaps above [`MIN_GAP`] where character 1 is a woman.
fn wide_gaps(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let gaps = query::run(
        &conn,
        "SELECT movie_name, (actor_1_age - actor_2_age) AS age_gap
         FROM age_gaps
         WHERE character_1_gender = ?1
           AND (actor_1_age - actor_2_age) > ?2",
        params!["woman", MIN_GAP],
    )?;
    println!("{} movies with an age gap over {MIN_GAP} years", gaps.len());

    let mut chart = Chart::new(
        "Age gaps > 5 years where the main character is a woman",
        ChartKind::Bar {
            categories: gaps.text_column("movie_name")?,
            values: gaps.f64_column("age_gap")?.into_iter().flatten().collect(),
        },
    );
    chart.x_label = "Movie".into();
    chart.y_label = "Age Gap".into();
    chart.size = (1200, 600);
    chart.rotate_x_labels = true;
    chart::render_svg(&chart, Path::new(CHART))?;
    println!("chart written → {CHART}");
    Ok(())
}
