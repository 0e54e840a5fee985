//! Rolling Stone album rankings: billboard stayers, the biggest rank
//! drops, top-50 release years, and ranked albums by decade.

use anyhow::Result;
use rusqlite::params;
use rustytuesday::frame::Value;
use rustytuesday::present::chart::{self, Chart, ChartKind};
use rustytuesday::store::{self, IngestOutcome, RefreshPolicy};
use rustytuesday::transform;
use rustytuesday::{fetch, logging, query};
use std::path::Path;

const DATA_URL: &str =
    "https://raw.githubusercontent.com/rfordatascience/tidytuesday/main/data/2024/2024-05-07/rolling_stone.csv";
const STORE: &str = "RollingStone.db";
const WEEKS_CHART: &str = "charts/rolling_stone_100_weeks.svg";
const DECLINE_CHART: &str = "charts/rolling_stone_decline.svg";
const SCATTER_CHART: &str = "charts/rolling_stone_release_rank.svg";
const DECADES_CHART: &str = "charts/rolling_stone_decades.svg";

const WEEKS_FLOOR: i64 = 99;
const DROP_FLOOR: i64 = -249;
const TOP_RANK: i64 = 51;

fn main() -> Result<()> {
    logging::init();

    let client = fetch::http_client()?;
    let dataset = fetch::fetch_csv(&client, DATA_URL)?;
    println!("→ fetched {} rows from {}", dataset.row_count(), DATA_URL);

    let store_path = Path::new(STORE);
    match store::ensure_store(
        store_path,
        &[("album_ranks", &dataset)],
        RefreshPolicy::OnContentChange,
    )? {
        IngestOutcome::Created => println!("✅ created store {STORE}"),
        IngestOutcome::Refreshed => println!("✅ refreshed store {STORE} (source changed)"),
        IngestOutcome::Reused => println!("store {STORE} already up to date; reusing"),
    }

    over_100_weeks(store_path)?;
    largest_decline(store_path)?;
    release_rank(store_path)?;
    album_decades(store_path)?;
    Ok(())
}

/// Albums that stayed on the billboard chart past [`WEEKS_FLOOR`] weeks.
fn over_100_weeks(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let albums = query::run(
        &conn,
        "SELECT album, weeks_on_billboard AS charts
         FROM album_ranks
         WHERE weeks_on_billboard > ?1",
        params![WEEKS_FLOOR],
    )?;

    let mut chart = Chart::new(
        "Albums on billboard chart for 100+ weeks",
        ChartKind::Bar {
            categories: albums.text_column("album")?,
            values: albums.f64_column("charts")?.into_iter().flatten().collect(),
        },
    );
    chart.x_label = "Album Name".into();
    chart.y_label = "Weeks".into();
    chart.size = (1500, 800);
    chart.rotate_x_labels = true;
    chart::render_svg(&chart, Path::new(WEEKS_CHART))?;
    println!("chart written → {WEEKS_CHART}");
    Ok(())
}

/// Artists whose 2020 rank fell below [`DROP_FLOOR`] against 2003.
fn largest_decline(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let drops = query::run(
        &conn,
        "SELECT clean_name, differential
         FROM album_ranks
         WHERE differential < ?1 AND rank_2020 IS NOT NULL",
        params![DROP_FLOOR],
    )?;

    let mut chart = Chart::new(
        "Artist who dropped 250+ positions in rank",
        ChartKind::Bar {
            categories: drops.text_column("clean_name")?,
            values: drops
                .f64_column("differential")?
                .into_iter()
                .flatten()
                .collect(),
        },
    );
    chart.x_label = "Artist".into();
    chart.y_label = "Positions Dropped".into();
    chart.size = (1000, 600);
    chart.rotate_x_labels = true;
    chart::render_svg(&chart, Path::new(DECLINE_CHART))?;
    println!("chart written → {DECLINE_CHART}");
    Ok(())
}

/// Release year against 2020 rank for the top 50; the y axis is inverted
/// because rank 1 is best.
fn release_rank(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let top = query::run(
        &conn,
        "SELECT rank_2020, release_year FROM album_ranks WHERE rank_2020 < ?1",
        params![TOP_RANK],
    )?;
    let years = top.f64_column("release_year")?;
    let ranks = top.f64_column("rank_2020")?;
    let points: Vec<(f64, f64)> = years
        .into_iter()
        .zip(ranks)
        .filter_map(|(x, y)| Some((x?, y?)))
        .collect();

    let mut chart = Chart::new(
        "Album Rankings by Year of Release",
        ChartKind::Scatter {
            points,
            invert_y: true,
        },
    );
    chart.x_label = "Year of Release".into();
    chart.y_label = "Ranking".into();
    chart.size = (1000, 600);
    chart::render_svg(&chart, Path::new(SCATTER_CHART))?;
    println!("chart written → {SCATTER_CHART}");
    Ok(())
}

/// Release decades of every album ranked in 2020, as a pie.
fn album_decades(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;
    let mut ranked = query::run(
        &conn,
        "SELECT release_year FROM album_ranks WHERE rank_2020 IS NOT NULL",
        [],
    )?;
    transform::with_derived(&mut ranked, "release_year", "decade", |v| match v.as_f64() {
        Some(year) => Value::Int(((year / 10.0).floor() as i64) * 10),
        None => Value::Null,
    })?;
    let counts = transform::value_counts(&ranked, "decade")?;

    let mut chart = Chart::new(
        "Percentage by Decade of Ranked Albums",
        ChartKind::Pie {
            labels: counts.text_column("decade")?,
            values: counts.f64_column("count")?.into_iter().flatten().collect(),
        },
    );
    chart.size = (800, 800);
    chart::render_svg(&chart, Path::new(DECADES_CHART))?;
    println!("chart written → {DECADES_CHART}");
    Ok(())
}
