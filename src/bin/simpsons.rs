//! Speaking lines per season for the core Simpson family, seasons 21-26.

use anyhow::Result;
use rusqlite::params_from_iter;
use rustytuesday::fetch::{self, Dataset};
use rustytuesday::frame::Value;
use rustytuesday::present::chart::{self, Chart, ChartKind, Series};
use rustytuesday::store::{self, IngestOutcome, RefreshPolicy};
use rustytuesday::transform::{self, PivotSpec};
use rustytuesday::{logging, present, query};
use std::ops::RangeInclusive;
use std::path::Path;

const BASE_URL: &str =
    "https://raw.githubusercontent.com/rfordatascience/tidytuesday/main/data/2025/2025-02-04/";
const STORE: &str = "simpsons.db";
const CHART: &str = "charts/simpsons_speaking_lines.svg";

const TABLES: &[(&str, &str)] = &[
    ("characters", "simpsons_characters.csv"),
    ("episodes", "simpsons_episodes.csv"),
    ("locations", "simpsons_locations.csv"),
    ("script_lines", "simpsons_script_lines.csv"),
];

/// Core family and their script-line character ids.
const CHARACTERS: &[(&str, i64)] = &[
    ("Marge", 1),
    ("Homer", 2),
    ("Bart", 8),
    ("Lisa", 9),
    ("Maggie", 105),
];

/// The dataset only carries these seasons with usable script lines.
const SEASONS: RangeInclusive<i64> = 21..=26;

fn main() -> Result<()> {
    logging::init();

    let client = fetch::http_client()?;
    let mut datasets: Vec<(&str, Dataset)> = Vec::with_capacity(TABLES.len());
    for (table, file) in TABLES.iter().copied() {
        let dataset = fetch::fetch_csv(&client, &format!("{BASE_URL}{file}"))?;
        println!("→ fetched {} rows of {table}", dataset.row_count());
        datasets.push((table, dataset));
    }
    let tables: Vec<(&str, &Dataset)> = datasets.iter().map(|(t, d)| (*t, d)).collect();

    let store_path = Path::new(STORE);
    match store::ensure_store(store_path, &tables, RefreshPolicy::OnContentChange)? {
        IngestOutcome::Created => println!("✅ created store {STORE}"),
        IngestOutcome::Refreshed => println!("✅ refreshed store {STORE} (source changed)"),
        IngestOutcome::Reused => println!("store {STORE} already up to date; reusing"),
    }

    speaking_lines_by_season(store_path)?;
    Ok(())
}

/// Count speaking lines per (season, character), pivot to one column per
/// family member over the full [`SEASONS`] range, and chart grouped bars.
fn speaking_lines_by_season(store_path: &Path) -> Result<()> {
    let conn = store::open(store_path)?;

    let placeholders = vec!["?"; CHARACTERS.len()].join(",");
    let sql = format!(
        "SELECT e.season AS season, s.character_id, COUNT(*) AS speaking_lines
         FROM script_lines s
         JOIN episodes e ON s.episode_id = e.id
         WHERE s.character_id IN ({placeholders})
           AND CASE
                 WHEN s.speaking_line IS NULL THEN 0
                 WHEN LOWER(CAST(s.speaking_line AS TEXT)) IN ('false','0','no','n','f') THEN 0
                 ELSE 1
               END = 1
         GROUP BY e.season, s.character_id
         ORDER BY e.season, s.character_id"
    );
    let ids = CHARACTERS.iter().map(|(_, id)| *id);
    let mut long = query::run(&conn, &sql, params_from_iter(ids))?;

    transform::with_derived(&mut long, "character_id", "character", |v| {
        let name = v.as_i64().and_then(|id| {
            CHARACTERS
                .iter()
                .find(|(_, cid)| *cid == id)
                .map(|(name, _)| *name)
        });
        match name {
            Some(name) => Value::Text(name.to_string()),
            None => Value::Null,
        }
    })?;

    let mut names: Vec<String> = CHARACTERS.iter().map(|(name, _)| name.to_string()).collect();
    names.sort();
    let wide = transform::pivot_sum(
        &long,
        &PivotSpec {
            row_key: "season",
            col_key: "character",
            value: "speaking_lines",
            rows: SEASONS,
            columns: names.clone(),
            fill: 0.0,
        },
    )?;
    present::print_frame_preview(&wide, 10);

    let categories = wide.text_column("season")?;
    let mut series = Vec::with_capacity(names.len());
    for name in &names {
        series.push(Series {
            name: name.clone(),
            values: wide.f64_column(name)?.into_iter().flatten().collect(),
        });
    }

    let mut chart = Chart::new(
        "Speaking lines by season",
        ChartKind::GroupedBar { categories, series },
    );
    chart.x_label = "Season".into();
    chart.y_label = "Number of speaking lines".into();
    chart.size = (1100, 650);
    chart::render_svg(&chart, Path::new(CHART))?;
    println!("chart written → {CHART}");
    Ok(())
}
