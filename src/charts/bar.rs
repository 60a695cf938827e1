use serde_json::json;

use crate::charts::Figure;
use crate::config::AggregationProfile;
use crate::error::Result;
use crate::grouping::assign_groups;
use crate::models::{PerformanceGroup, StudentRecord};
use crate::stats::round_to;
use crate::summary::column_means;

fn hover_template(group: &str) -> String {
    format!(
        "Group: {group}<br>Habit: %{{x}}<br>Average: %{{y:.2f}} %{{customdata[0]}}<extra></extra>"
    )
}

/// Average habits of top performers, low performers and everyone.
///
/// A performance group with no members is left out.
pub fn build(records: &[StudentRecord], profile: &AggregationProfile) -> Result<Figure> {
    let grouping = assign_groups(records, &profile.grouping)?;
    let rows = grouping.rows(records);

    let members = |group: PerformanceGroup| -> Vec<&StudentRecord> {
        rows.iter().filter(|(_, g)| *g == group).map(|(r, _)| *r).collect()
    };
    let everyone: Vec<&StudentRecord> = records.iter().collect();

    let labels: Vec<&str> = profile.habits.iter().map(|h| h.label()).collect();
    let units: Vec<[&str; 1]> = profile.habits.iter().map(|h| [h.unit()]).collect();

    let series = [
        ("Top Performers", members(PerformanceGroup::Top)),
        ("Low Performers", members(PerformanceGroup::Low)),
        ("All Students", everyone),
    ];

    let data = series
        .iter()
        .filter(|(_, group)| !group.is_empty())
        .map(|(name, group)| {
            let means: Vec<f64> = column_means(group, &profile.habits)
                .into_iter()
                .map(|(_, v)| round_to(v, 2))
                .collect();
            json!({
                "type": "bar",
                "name": name,
                "x": labels,
                "y": means,
                "customdata": units,
                "hovertemplate": hover_template(name),
            })
        })
        .collect();

    Ok(Figure {
        data,
        layout: json!({
            "title": "Average Student Habits by Performance Group",
            "xaxis": {"title": "Habits"},
            "yaxis": {"title": "Average Value", "tickformat": ".2f"},
            "barmode": "group",
            "template": "plotly_white",
        }),
    })
}
