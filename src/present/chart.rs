// src/present/chart.rs
use super::tiles::STATE_TILES;
use anyhow::{bail, Context, Result};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Declarative chart description; [`render_svg`] is its only consumer.
/// Presentation never feeds back into queries or the store.
#[derive(Debug, Clone)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub size: (u32, u32),
    /// Draw the x tick labels vertically (long categorical labels).
    pub rotate_x_labels: bool,
    pub kind: ChartKind,
}

#[derive(Debug, Clone)]
pub enum ChartKind {
    Bar {
        categories: Vec<String>,
        values: Vec<f64>,
    },
    GroupedBar {
        categories: Vec<String>,
        series: Vec<Series>,
    },
    /// Always rendered with slice labels and percentages.
    Pie {
        labels: Vec<String>,
        values: Vec<f64>,
    },
    Scatter {
        points: Vec<(f64, f64)>,
        /// Flip the y axis so lower values sit higher (rank axes).
        invert_y: bool,
    },
    /// US-state tile grid shaded on a linear scale; keys are two-letter
    /// state codes. Tiles without data stay grey.
    Choropleth { regions: Vec<(String, f64)> },
}

#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Chart {
    pub fn new(title: impl Into<String>, kind: ChartKind) -> Self {
        Chart {
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            size: (900, 600),
            rotate_x_labels: false,
            kind,
        }
    }
}

/// Render the chart as one SVG file, creating parent directories as
/// needed.
pub fn render_svg(chart: &Chart, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
    }
    let root = SVGBackend::new(path, chart.size).into_drawing_area();
    root.fill(&WHITE)?;
    match &chart.kind {
        ChartKind::Bar { categories, values } => draw_bar(chart, &root, categories, values)?,
        ChartKind::GroupedBar { categories, series } => {
            draw_grouped_bar(chart, &root, categories, series)?
        }
        ChartKind::Pie { labels, values } => draw_pie(chart, &root, labels, values)?,
        ChartKind::Scatter { points, invert_y } => {
            draw_scatter(chart, &root, points, *invert_y)?
        }
        ChartKind::Choropleth { regions } => draw_choropleth(chart, &root, regions)?,
    }
    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    info!(chart = %chart.title, path = %path.display(), "chart written");
    Ok(())
}

type CartesianCtx<'a, 'b> =
    ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_bar(
    chart: &Chart,
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    categories: &[String],
    values: &[f64],
) -> Result<()> {
    if categories.len() != values.len() {
        bail!(
            "bar chart `{}`: {} categories vs {} values",
            chart.title,
            categories.len(),
            values.len()
        );
    }
    if categories.is_empty() {
        bail!("bar chart `{}` has no data", chart.title);
    }
    let n = categories.len();
    let (y_lo, y_hi) = padded_value_range(values);
    let bottom_px = if chart.rotate_x_labels { 130 } else { 48 };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(bottom_px)
        .y_label_area_size(64)
        .build_cartesian_2d(-0.6..(n as f64 - 0.4), y_lo..y_hi)?;

    configure_category_mesh(&mut ctx, chart, categories, n)?;

    ctx.draw_series(values.iter().enumerate().map(|(i, v)| {
        Rectangle::new(
            [(i as f64 - 0.35, 0.0), (i as f64 + 0.35, *v)],
            BLUE.mix(0.6).filled(),
        )
    }))?;

    if chart.rotate_x_labels {
        rotated_category_labels(root, &ctx, categories, y_lo)?;
    }
    Ok(())
}

fn draw_grouped_bar(
    chart: &Chart,
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    categories: &[String],
    series: &[Series],
) -> Result<()> {
    if categories.is_empty() || series.is_empty() {
        bail!("grouped bar chart `{}` has no data", chart.title);
    }
    for s in series {
        if s.values.len() != categories.len() {
            bail!(
                "series `{}` has {} values for {} categories",
                s.name,
                s.values.len(),
                categories.len()
            );
        }
    }
    let n = categories.len();
    let all: Vec<f64> = series.iter().flat_map(|s| s.values.iter().copied()).collect();
    let (y_lo, y_hi) = padded_value_range(&all);
    let bottom_px = if chart.rotate_x_labels { 130 } else { 48 };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(bottom_px)
        .y_label_area_size(64)
        .build_cartesian_2d(-0.6..(n as f64 - 0.4), y_lo..y_hi)?;

    configure_category_mesh(&mut ctx, chart, categories, n)?;

    let width = 0.8 / series.len() as f64;
    for (j, s) in series.iter().enumerate() {
        let color = Palette99::pick(j).mix(0.9);
        ctx.draw_series(s.values.iter().enumerate().map(|(i, v)| {
            let x0 = i as f64 - 0.4 + j as f64 * width;
            Rectangle::new(
                [(x0 + width * 0.06, 0.0), (x0 + width * 0.94, *v)],
                color.filled(),
            )
        }))?
        .label(s.name.as_str())
        .legend(move |(x, y)| {
            Rectangle::new([(x, y - 5), (x + 10, y + 5)], Palette99::pick(j).mix(0.9).filled())
        });
    }
    ctx.configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.85))
        .draw()?;

    if chart.rotate_x_labels {
        rotated_category_labels(root, &ctx, categories, y_lo)?;
    }
    Ok(())
}

fn draw_pie(
    chart: &Chart,
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    labels: &[String],
    values: &[f64],
) -> Result<()> {
    if labels.len() != values.len() {
        bail!(
            "pie chart `{}`: {} labels vs {} values",
            chart.title,
            labels.len(),
            values.len()
        );
    }
    let total: f64 = values.iter().sum();
    if labels.is_empty() || total <= 0.0 || values.iter().any(|v| *v < 0.0) {
        bail!(
            "pie chart `{}` needs non-negative slices and a positive total",
            chart.title
        );
    }

    let _ = root.titled(
        chart.title.as_str(),
        TextStyle::from(("sans-serif", 24).into_font()),
    )?;
    let dims = root.dim_in_pixel();
    let center = (dims.0 as i32 / 2, dims.1 as i32 / 2 + 14);
    let radius = f64::from(dims.0.min(dims.1)) * 0.32;
    let colors: Vec<RGBColor> = (0..labels.len())
        .map(|i| {
            let (r, g, b) = Palette99::COLORS[i % Palette99::COLORS.len()];
            RGBColor(r, g, b)
        })
        .collect();

    let mut pie = Pie::new(&center, &radius, values, &colors, labels);
    pie.label_style(("sans-serif", 14).into_font().color(&BLACK));
    pie.percentages(("sans-serif", 12).into_font().color(&BLACK));
    root.draw(&pie)?;
    Ok(())
}

fn draw_scatter(
    chart: &Chart,
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    points: &[(f64, f64)],
    invert_y: bool,
) -> Result<()> {
    if points.is_empty() {
        bail!("scatter chart `{}` has no data", chart.title);
    }
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let (x_lo, x_hi) = span_with_margin(&xs);
    let (y_lo, y_hi) = span_with_margin(&ys);
    let y_range = if invert_y { y_hi..y_lo } else { y_lo..y_hi };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(64)
        .build_cartesian_2d(x_lo..x_hi, y_range)?;
    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    ctx.draw_series(
        points
            .iter()
            .map(|(x, y)| Circle::new((*x, *y), 4, BLUE.mix(0.7).filled())),
    )?;
    Ok(())
}

fn draw_choropleth(
    chart: &Chart,
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    regions: &[(String, f64)],
) -> Result<()> {
    if regions.is_empty() {
        bail!("choropleth `{}` has no data", chart.title);
    }
    let lookup: HashMap<String, f64> = regions
        .iter()
        .map(|(code, v)| (code.trim().to_uppercase(), *v))
        .collect();
    for code in lookup.keys() {
        if !STATE_TILES.iter().any(|(tile, _, _)| tile == code) {
            warn!(code = %code, "region code not on the state tile grid; skipped");
        }
    }
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in lookup.values() {
        lo = lo.min(*v);
        hi = hi.max(*v);
    }
    let span = (hi - lo).max(1e-9);

    let _ = root.titled(
        chart.title.as_str(),
        TextStyle::from(("sans-serif", 24).into_font()),
    )?;
    let dims = root.dim_in_pixel();
    let (w, h) = (dims.0 as i32, dims.1 as i32);
    let (top, legend_h) = (46, 54);
    let cell = ((w - 32) / 11).min((h - top - legend_h - 16) / 8);
    let x0 = (w - cell * 11) / 2;
    let y0 = top;

    for (code, col, row) in STATE_TILES {
        let x = x0 + i32::from(*col) * cell;
        let y = y0 + i32::from(*row) * cell;
        let rect = [(x + 1, y + 1), (x + cell - 1, y + cell - 1)];
        match lookup.get(*code) {
            Some(v) => {
                let t = (v - lo) / span;
                root.draw(&Rectangle::new(rect, blues(t).filled()))?;
                let ink = if t > 0.55 { &WHITE } else { &BLACK };
                let code_style = TextStyle::from(("sans-serif", 13).into_font())
                    .color(ink)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                root.draw(&Text::new(
                    (*code).to_string(),
                    (x + cell / 2, y + cell / 2 - 7),
                    code_style,
                ))?;
                let value_style = TextStyle::from(("sans-serif", 11).into_font())
                    .color(ink)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                root.draw(&Text::new(
                    format!("{}", v),
                    (x + cell / 2, y + cell / 2 + 8),
                    value_style,
                ))?;
            }
            None => {
                root.draw(&Rectangle::new(rect, RGBColor(235, 235, 235).filled()))?;
                let style = TextStyle::from(("sans-serif", 12).into_font())
                    .color(&RGBColor(150, 150, 150))
                    .pos(Pos::new(HPos::Center, VPos::Center));
                root.draw(&Text::new(
                    (*code).to_string(),
                    (x + cell / 2, y + cell / 2),
                    style,
                ))?;
            }
        }
    }

    // Color-scale legend under the grid.
    let ly = y0 + 8 * cell + 18;
    let seg_w = ((cell * 11) / 2 / 100).max(1);
    for i in 0..100 {
        let t = f64::from(i) / 99.0;
        let sx = x0 + i * seg_w;
        root.draw(&Rectangle::new(
            [(sx, ly), (sx + seg_w, ly + 12)],
            blues(t).filled(),
        ))?;
    }
    let lab = TextStyle::from(("sans-serif", 12).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Top));
    root.draw(&Text::new(format!("{:.0}", lo), (x0, ly + 16), lab.clone()))?;
    root.draw(&Text::new(
        format!("{:.0}", hi),
        (x0 + seg_w * 100, ly + 16),
        lab.pos(Pos::new(HPos::Right, VPos::Top)),
    ))?;
    Ok(())
}

fn configure_category_mesh(
    ctx: &mut CartesianCtx<'_, '_>,
    chart: &Chart,
    categories: &[String],
    n: usize,
) -> Result<()> {
    if chart.rotate_x_labels {
        ctx.configure_mesh()
            .disable_x_mesh()
            .disable_x_axis()
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .axis_desc_style(("sans-serif", 16))
            .draw()?;
    } else {
        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(n.min(16))
            .x_label_formatter(&|x| category_tick(categories, *x))
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .axis_desc_style(("sans-serif", 16))
            .draw()?;
    }
    Ok(())
}

/// Labels drawn by hand under the plot, reading downward, one per bar.
fn rotated_category_labels(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    ctx: &CartesianCtx<'_, '_>,
    categories: &[String],
    y_floor: f64,
) -> Result<()> {
    let style = TextStyle::from(("sans-serif", 13).into_font())
        .transform(FontTransform::Rotate90)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (i, name) in categories.iter().enumerate() {
        let (px, py) = ctx.backend_coord(&(i as f64, y_floor));
        root.draw(&Text::new(name.clone(), (px, py + 6), style.clone()))?;
    }
    Ok(())
}

fn category_tick(categories: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 0.25 || idx < 0.0 {
        return String::new();
    }
    categories.get(idx as usize).cloned().unwrap_or_default()
}

/// Bar ranges always include zero; the data side gets an 8% headroom.
fn padded_value_range(values: &[f64]) -> (f64, f64) {
    let mut lo = 0.0f64;
    let mut hi = 0.0f64;
    for v in values {
        lo = lo.min(*v);
        hi = hi.max(*v);
    }
    if lo == 0.0 && hi == 0.0 {
        return (0.0, 1.0);
    }
    (
        if lo < 0.0 { lo * 1.08 } else { 0.0 },
        if hi > 0.0 { hi * 1.08 } else { 0.0 },
    )
}

fn span_with_margin(values: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        lo = lo.min(*v);
        hi = hi.max(*v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let span = (hi - lo).max(1.0);
    (lo - span * 0.05, hi + span * 0.05)
}

fn blues(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
    RGBColor(lerp(247, 8), lerp(251, 48), lerp(255, 107))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn bar_chart_renders_title_and_categories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bar.svg");
        let mut chart = Chart::new(
            "Widest gaps",
            ChartKind::Bar {
                categories: vec!["Alpha".into(), "Beta".into()],
                values: vec![12.0, 7.5],
            },
        );
        chart.rotate_x_labels = true;
        chart.y_label = "Years".into();
        render_svg(&chart, &path).unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Widest gaps"));
        assert!(svg.contains("Alpha"));
    }

    #[test]
    fn negative_bars_keep_the_zero_baseline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("drops.svg");
        let chart = Chart::new(
            "Biggest drops",
            ChartKind::Bar {
                categories: vec!["one".into(), "two".into()],
                values: vec![-250.0, -300.0],
            },
        );
        render_svg(&chart, &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("Biggest drops"));
    }

    #[test]
    fn grouped_bar_carries_a_legend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grouped.svg");
        let chart = Chart::new(
            "Speaking lines by season",
            ChartKind::GroupedBar {
                categories: vec!["21".into(), "22".into()],
                series: vec![
                    Series { name: "Homer".into(), values: vec![120.0, 110.0] },
                    Series { name: "Marge".into(), values: vec![80.0, 90.0] },
                ],
            },
        );
        render_svg(&chart, &path).unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Homer"));
        assert!(svg.contains("Marge"));
    }

    #[test]
    fn pie_shows_labels_and_percentages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pie.svg");
        let chart = Chart::new(
            "Share by origin",
            ChartKind::Pie {
                labels: vec!["Peru".into(), "Fiji".into()],
                values: vec![3.0, 1.0],
            },
        );
        render_svg(&chart, &path).unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Peru"));
        assert!(svg.contains('%'));
    }

    #[test]
    fn scatter_accepts_an_inverted_axis() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scatter.svg");
        let chart = Chart::new(
            "Rank by year",
            ChartKind::Scatter {
                points: vec![(1969.0, 1.0), (1971.0, 4.0), (1966.0, 2.0)],
                invert_y: true,
            },
        );
        render_svg(&chart, &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("<svg"));
    }

    #[test]
    fn choropleth_shades_known_states_and_greys_the_rest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.svg");
        let chart = Chart::new(
            "Roundabouts per state",
            ChartKind::Choropleth {
                regions: vec![("wa".into(), 30.0), ("FL".into(), 11.0), ("ZZ".into(), 5.0)],
            },
        );
        render_svg(&chart, &path).unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("WA"));
        assert!(svg.contains("MT"), "states without data still appear");
    }

    #[test]
    fn mismatched_bar_data_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.svg");
        let chart = Chart::new(
            "broken",
            ChartKind::Bar {
                categories: vec!["a".into()],
                values: vec![1.0, 2.0],
            },
        );
        assert!(render_svg(&chart, &path).is_err());
    }
}
