use std::fmt::{self, Write};
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::style::Style;
use crate::trends::ChartData;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const MARGIN_TOP: f64 = 20.0;
const MARGIN_RIGHT: f64 = 80.0;
const MARGIN_BOTTOM: f64 = 50.0;
const MARGIN_LEFT: f64 = 50.0;
const CHART_WIDTH: f64 = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
const CHART_HEIGHT: f64 = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
const GRID_STEPS: usize = 5;
const POINT_RADIUS: f64 = 4.0;

const STYLESHEET: &str = r#"
body { font-family: system-ui, sans-serif; background: #f3f4f6; margin: 0; padding: 1rem; }
section { background: #fff; border-radius: 0.5rem; box-shadow: 0 1px 3px rgba(0,0,0,.1); padding: 1rem; margin-bottom: 2rem; }
h2 { font-size: 1.5rem; margin: 0 0 1rem; }
svg { overflow: visible; }
svg text { font-size: 0.75rem; fill: #6b7280; }
circle:hover { r: 6; }
.legend { display: flex; flex-wrap: wrap; gap: 1rem; margin-top: 1rem; }
.legend div, .year .dominant { display: flex; align-items: center; gap: 0.5rem; }
.swatch { width: 1rem; height: 1rem; border-radius: 9999px; display: inline-block; }
.year { display: flex; justify-content: space-between; align-items: center; padding: 1rem; border: 1px solid #e5e7eb; border-radius: 0.5rem; margin-bottom: 1rem; }
.year .label { font-weight: 500; }
.year .total { color: #4b5563; }
"#;

/// Renders the style trend line chart and the per-year summary as one
/// standalone HTML page.
pub fn render_chart(data: &ChartData) -> String {
    let mut html = String::new();
    render_document(&mut html, data).expect("formatting into a String cannot fail");
    html
}

/// Writes the chart and returns a `file://` URL pointing at it.
pub fn write_chart(path: &Path, data: &ChartData) -> Result<String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_chart(data))?;

    let absolute = fs::canonicalize(path)?;
    let url = format!("file://{}", absolute.display());
    info!(%url, dates = data.by_date.len(), "Chart written");
    Ok(url)
}

fn render_document(out: &mut String, data: &ChartData) -> fmt::Result {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html>\n<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>Style Trends</title>")?;
    writeln!(out, "<style>{}</style>", STYLESHEET)?;
    writeln!(out, "</head>\n<body>")?;

    render_trend_section(out, data)?;
    render_summary_section(out, data)?;

    // raw data for anyone who wants to re-plot it
    let json = serde_json::to_string(data).unwrap_or_else(|_| "null".to_owned());
    writeln!(
        out,
        "<script type=\"application/json\" id=\"style-data\">{}</script>",
        json.replace("</", "<\\/")
    )?;

    writeln!(out, "</body>\n</html>")
}

fn render_trend_section(out: &mut String, data: &ChartData) -> fmt::Result {
    let points = data.by_date.len();
    let max_value = data.max_count() as f64;

    let x_at = |i: usize| -> f64 {
        if points <= 1 {
            0.0
        } else {
            i as f64 / (points - 1) as f64 * CHART_WIDTH
        }
    };
    let y_at = |value: usize| -> f64 {
        if max_value == 0.0 {
            CHART_HEIGHT
        } else {
            CHART_HEIGHT - value as f64 / max_value * CHART_HEIGHT
        }
    };

    writeln!(out, "<section id=\"trends\">")?;
    writeln!(out, "<h2>Style Evolution</h2>")?;
    writeln!(out, "<svg width=\"{}\" height=\"{}\">", WIDTH, HEIGHT)?;
    writeln!(
        out,
        "<g transform=\"translate({}, {})\">",
        MARGIN_LEFT, MARGIN_TOP
    )?;

    for step in 0..=GRID_STEPS {
        let y = CHART_HEIGHT / GRID_STEPS as f64 * step as f64;
        let value = (max_value - max_value / GRID_STEPS as f64 * step as f64).round();
        writeln!(
            out,
            "<line x1=\"0\" y1=\"{y}\" x2=\"{w}\" y2=\"{y}\" stroke=\"#e5e7eb\" stroke-dasharray=\"4,4\"/>",
            y = y,
            w = CHART_WIDTH
        )?;
        writeln!(
            out,
            "<text x=\"-10\" y=\"{}\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>",
            y, value
        )?;
    }

    for (i, bucket) in data.by_date.iter().enumerate() {
        writeln!(
            out,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\">{}</text>",
            x_at(i),
            CHART_HEIGHT + 20.0,
            escape(&bucket.label())
        )?;
    }

    for style in Style::ALL {
        let path = data
            .by_date
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let cmd = if i == 0 { 'M' } else { 'L' };
                format!("{} {} {}", cmd, x_at(i), y_at(b.counts.get(style)))
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            out,
            "<path d=\"{}\" stroke=\"{}\" fill=\"none\" stroke-width=\"2\" data-style=\"{}\"/>",
            path,
            style.color(),
            escape(style.label())
        )?;
    }

    for style in Style::ALL {
        for (i, bucket) in data.by_date.iter().enumerate() {
            let value = bucket.counts.get(style);
            writeln!(
                out,
                "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{}\"><title>{}, {}: {}</title></circle>",
                x_at(i),
                y_at(value),
                POINT_RADIUS,
                style.color(),
                escape(&bucket.label()),
                escape(style.label()),
                value
            )?;
        }
    }

    writeln!(out, "</g>\n</svg>")?;

    writeln!(out, "<div class=\"legend\">")?;
    for style in Style::ALL {
        writeln!(
            out,
            "<div><span class=\"swatch\" style=\"background-color: {}\"></span><span>{}</span></div>",
            style.color(),
            escape(style.label())
        )?;
    }
    writeln!(out, "</div>")?;
    writeln!(out, "</section>")
}

fn render_summary_section(out: &mut String, data: &ChartData) -> fmt::Result {
    writeln!(out, "<section id=\"summary\">")?;
    writeln!(out, "<h2>Style Summary</h2>")?;

    for year in &data.yearly {
        writeln!(out, "<div class=\"year\">")?;
        writeln!(out, "<div class=\"label\">{}</div>", year.year)?;
        writeln!(out, "<div class=\"total\">Total: {}</div>", year.total)?;
        match year.dominant_style {
            Some(style) => writeln!(
                out,
                "<div class=\"dominant\"><span class=\"swatch\" style=\"background-color: {}\"></span><span>{} ({:.1}%)</span></div>",
                style.color(),
                escape(style.label()),
                year.percentage
            )?,
            None => writeln!(out, "<div class=\"dominant\"><span>no classified pins</span></div>")?,
        }
        writeln!(out, "</div>")?;
    }

    writeln!(out, "</section>")
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
