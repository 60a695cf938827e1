use serde_json::{json, Value};

use crate::charts::Figure;
use crate::models::{HabitSummary, Metric, PerformanceGroup};

const USER_COLOR: &str = "blue";

fn group_hover() -> &'static str {
    "<b>Group:</b> %{fullData.name}<br><b>Habit:</b> %{theta}<br><b>Average value:</b> %{r:.2f}<extra></extra>"
}

fn user_hover() -> &'static str {
    "<b>Habit:</b> %{theta}<br><b>Your value:</b> %{r:.2f}<br><b>Advice:</b> %{customdata}<extra></extra>"
}

/// A student's own normalized habits with one advice line per habit.
#[derive(Debug, Clone)]
pub struct UserTrace {
    pub values: Vec<f64>,
    pub advice: Vec<&'static str>,
}

/// Closes a polygon by repeating its first point.
fn closed<T: Clone>(items: &[T]) -> Vec<T> {
    let mut out = items.to_vec();
    if let Some(first) = items.first() {
        out.push(first.clone());
    }
    out
}

/// Normalized group profiles on a polar chart, optionally with the viewer's own profile.
pub fn build(
    summaries: &[HabitSummary<PerformanceGroup>],
    habits: &[Metric],
    range: (f64, f64),
    user: Option<&UserTrace>,
) -> Figure {
    let labels: Vec<&str> = habits.iter().map(|h| h.label()).collect();
    let theta = closed(&labels);

    let mut data: Vec<Value> = PerformanceGroup::DESCENDING
        .iter()
        .filter_map(|group| summaries.iter().find(|s| s.group == *group))
        .map(|summary| {
            let r: Vec<f64> = habits
                .iter()
                .map(|h| summary.mean(*h).unwrap_or(f64::NAN))
                .collect();
            json!({
                "type": "scatterpolar",
                "r": closed(&r),
                "theta": theta,
                "fill": "toself",
                "name": summary.group.long_label(),
                "line": {"color": summary.group.color()},
                "hovertemplate": group_hover(),
            })
        })
        .collect();

    if let Some(user) = user {
        data.push(json!({
            "type": "scatterpolar",
            "r": closed(&user.values),
            "theta": theta,
            "fill": "toself",
            "name": "You",
            "line": {"color": USER_COLOR, "dash": "dash"},
            "customdata": closed(&user.advice),
            "hovertemplate": user_hover(),
        }));
    }

    Figure {
        data,
        layout: json!({
            "legend": {"traceorder": "normal"},
            "polar": {"radialaxis": {"visible": true, "range": [range.0, range.1]}},
            "showlegend": true,
            "title": "Comparison between groups based on habits",
        }),
    }
}
