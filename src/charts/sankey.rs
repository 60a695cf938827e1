use serde_json::json;

use crate::charts::Figure;
use crate::config::AggregationProfile;
use crate::error::{DashboardError, Result};
use crate::grouping::assign_groups;
use crate::models::{Metric, PerformanceGroup, StudentRecord};
use crate::stats;
use crate::summary::{flow_cells, Demographic};

fn link_hover(habit: Metric) -> String {
    format!(
        "Performance: %{{customdata[0]}}<br>Number of students: %{{customdata[1]}}<br>Avg {}: %{{customdata[2]:.2f}}<extra></extra>",
        habit.column()
    )
}

/// Flow from a demographic (age or gender) to performance groups, weighted by the mean habit.
pub fn build(
    records: &[StudentRecord],
    profile: &AggregationProfile,
    left: Demographic,
    habit: Metric,
) -> Result<Figure> {
    if !profile.habits.contains(&habit) {
        return Err(DashboardError::InvalidInput(format!(
            "habit {habit} is not offered in the flow diagram"
        )));
    }

    let grouping = assign_groups(records, &profile.grouping)?;
    let rows = grouping.rows(records);
    let buckets = left.ordered_values(&rows);
    let cells = flow_cells(&rows, left, habit);

    let mut labels: Vec<String> = buckets.clone();
    labels.extend(PerformanceGroup::ASCENDING.iter().map(|g| g.short_label().to_string()));
    let n_left = buckets.len();

    let index_of = |label: &str| labels.iter().position(|l| l == label).unwrap_or(0);
    let sources: Vec<usize> = cells.iter().map(|c| index_of(&c.bucket)).collect();
    let targets: Vec<usize> = cells
        .iter()
        .map(|c| n_left + PerformanceGroup::ASCENDING.iter().position(|g| *g == c.group).unwrap_or(0))
        .collect();
    let values: Vec<f64> = cells.iter().map(|c| c.mean).collect();
    let link_data: Vec<_> = cells
        .iter()
        .map(|c| json!([c.group.short_label(), c.count, c.mean]))
        .collect();

    let left_ys: Vec<f64> = if n_left == 1 {
        vec![0.5]
    } else {
        (0..n_left)
            .map(|i| 1.0 - i as f64 / (n_left - 1) as f64)
            .collect()
    };
    let mut node_x = vec![0.0; n_left];
    node_x.extend([1.0, 1.0, 1.0]);
    let mut node_y = left_ys;
    node_y.extend([0.8, 0.5, 0.2]);
    let mut node_colors = vec!["cornflowerblue"; n_left];
    node_colors.extend(PerformanceGroup::ASCENDING.iter().map(|g| g.color()));

    let mut node_hover: Vec<String> = buckets
        .iter()
        .map(|bucket| {
            let members: Vec<&StudentRecord> = rows
                .iter()
                .filter(|(r, _)| left.key(r).as_deref() == Some(bucket.as_str()))
                .map(|(r, _)| *r)
                .collect();
            let values: Vec<f64> = members.iter().filter_map(|r| habit.value(r)).collect();
            format!(
                "{}: {bucket}<br>Number of students: {}<br>Avg {}: {:.2}",
                left.title(),
                members.len(),
                habit.column(),
                stats::mean(&values).unwrap_or(0.0)
            )
        })
        .collect();
    node_hover.extend(PerformanceGroup::ASCENDING.iter().map(|g| {
        let total = rows.iter().filter(|(_, group)| group == g).count();
        format!("Performance: {}<br>Number of students: {total}", g.short_label())
    }));

    let habit_options: Vec<_> = profile
        .habits
        .iter()
        .map(|h| json!({"label": h.column(), "value": h.column()}))
        .collect();

    Ok(Figure {
        data: vec![json!({
            "type": "sankey",
            "arrangement": "fixed",
            "domain": {"x": [0, 1], "y": [0, 1]},
            "node": {
                "label": labels,
                "color": node_colors,
                "x": node_x,
                "y": node_y,
                "pad": 15,
                "thickness": 20,
                "line": {"color": "black", "width": 0.5},
                "customdata": node_hover,
                "hovertemplate": "%{customdata}<extra></extra>",
            },
            "link": {
                "source": sources,
                "target": targets,
                "value": values,
                "customdata": link_data,
                "hovertemplate": link_hover(habit),
            },
        })],
        layout: json!({
            "title": {"text": format!(
                "Sankey: {} (left) → PerformanceGroup (Avg {})",
                left.title(),
                habit.column()
            )},
            "font": {"size": 12},
            "margin": {"l": 50, "r": 50, "t": 50, "b": 50},
            "meta": {
                "left_options": ["age", "gender"],
                "habit_options": habit_options,
            },
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, SANKEY_PROFILE};

    fn students() -> Vec<StudentRecord> {
        (0..12)
            .map(|i| StudentRecord {
                student_id: format!("S{i}"),
                age: Some(18 + (i % 3) as u32),
                gender: Some(if i % 2 == 0 { "Female" } else { "Male" }.to_string()),
                sleep_hours: Some(6.0 + (i % 4) as f64),
                exam_score: Some(45.0 + 4.0 * i as f64),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn links_connect_every_bucket_to_every_group() {
        let config = Config::default();
        let profile = config.profile(SANKEY_PROFILE).unwrap();
        let figure = build(&students(), profile, Demographic::Age, Metric::SleepHours).unwrap();

        let node = &figure.data[0]["node"];
        let labels: Vec<&str> = node["label"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l.as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["20", "19", "18", "Low", "Mid", "Top"]);

        let link = &figure.data[0]["link"];
        assert_eq!(link["source"].as_array().unwrap().len(), 9);
        assert_eq!(link["target"][0], 3);
        assert_eq!(link["target"][2], 5);
        assert_eq!(figure.title(), Some("Sankey: Age (left) → PerformanceGroup (Avg sleep_hours)"));
    }

    #[test]
    fn gender_buckets_are_alphabetical() {
        let config = Config::default();
        let profile = config.profile(SANKEY_PROFILE).unwrap();
        let figure = build(&students(), profile, Demographic::Gender, Metric::SleepHours).unwrap();
        assert_eq!(figure.data[0]["node"]["label"][0], "Female");
        assert_eq!(figure.data[0]["node"]["y"][0], 1.0);
        assert_eq!(figure.data[0]["node"]["y"][1], 0.0);
    }

    #[test]
    fn habits_outside_the_profile_are_rejected() {
        let config = Config::default();
        let profile = config.profile(SANKEY_PROFILE).unwrap();
        assert!(matches!(
            build(&students(), profile, Demographic::Age, Metric::ExamScore),
            Err(DashboardError::InvalidInput(_))
        ));
    }
}
