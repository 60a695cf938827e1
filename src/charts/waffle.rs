use serde_json::json;

use crate::charts::Figure;
use crate::config::AggregationProfile;
use crate::error::Result;
use crate::grouping::assign_groups;
use crate::models::{PerformanceGroup, StudentRecord};
use crate::summary::bucket_counts;

pub const EDUCATION_LEVELS: [&str; 4] = ["None", "High School", "Bachelor", "Master"];

const COLUMNS: usize = 8;
const GROUP_GAP: usize = 2;
const MARKER_SIZE: usize = 8;

/// One square per student, grouped by parental education and coloured by performance.
pub fn build(records: &[StudentRecord], profile: &AggregationProfile) -> Result<Figure> {
    let grouping = assign_groups(records, &profile.grouping)?;
    let rows = grouping.rows(records);
    let counts = bucket_counts(&rows, |r| r.parental_education_level.clone());
    let count = |level: &str, group: PerformanceGroup| {
        counts.get(&(level.to_string(), group)).copied().unwrap_or(0)
    };

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut colors = Vec::new();
    let mut texts = Vec::new();
    let mut max_rows = 0;

    for (i, level) in EDUCATION_LEVELS.iter().enumerate() {
        let x_offset = i * (COLUMNS + GROUP_GAP);
        let mut pos = 0;
        for group in PerformanceGroup::DESCENDING {
            let total = count(level, group);
            for _ in 0..total {
                let row = pos / COLUMNS;
                let col = pos % COLUMNS;
                xs.push((x_offset + col) as f64 + 0.5);
                ys.push(row as f64 + 0.5);
                colors.push(group.color());
                texts.push(format!(
                    "Education: {level}<br>Performance: {}<br>Total Students: {total}",
                    group.short_label()
                ));
                pos += 1;
            }
        }
        max_rows = max_rows.max(pos.div_ceil(COLUMNS));
    }

    let mut annotations: Vec<_> = EDUCATION_LEVELS
        .iter()
        .enumerate()
        .map(|(i, level)| {
            json!({
                "x": (i * (COLUMNS + GROUP_GAP)) as f64 + COLUMNS as f64 / 2.0,
                "y": -1.2,
                "text": format!("<b>{level}</b>"),
                "showarrow": false,
                "font": {"size": 10},
            })
        })
        .collect();
    for (j, group) in PerformanceGroup::DESCENDING.iter().enumerate() {
        annotations.push(json!({
            "xref": "paper",
            "yref": "paper",
            "x": 1.02,
            "y": 0.9 - j as f64 * 0.1,
            "text": format!("<span style='color:{}'><b>{}</b></span>", group.color(), group.short_label()),
            "showarrow": false,
            "font": {"size": 10},
        }));
    }

    let width = EDUCATION_LEVELS.len() * (COLUMNS + GROUP_GAP);
    Ok(Figure {
        data: vec![json!({
            "type": "scatter",
            "mode": "markers",
            "x": xs,
            "y": ys,
            "marker": {"size": MARKER_SIZE, "color": colors, "symbol": "square"},
            "text": texts,
            "hoverinfo": "text",
        })],
        layout: json!({
            "title": "Waffle Chart: Student Performance by Parental Education Level",
            "annotations": annotations,
            "dragmode": false,
            "xaxis": {"showgrid": false, "zeroline": false, "showticklabels": false, "range": [-1, width]},
            "yaxis": {
                "showgrid": false,
                "zeroline": false,
                "showticklabels": false,
                "range": [-2, max_rows + 1],
                "autorange": "reversed",
            },
            "margin": {"t": 25, "l": 10, "r": 60, "b": 40},
            "height": (max_rows * MARKER_SIZE) as f64 * 1.5 + 50.0,
            "plot_bgcolor": "white",
        }),
    })
}
