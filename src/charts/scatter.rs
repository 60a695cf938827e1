use serde_json::{json, Value};

use crate::charts::Figure;
use crate::cluster::{ClusterProfile, Clustering};
use crate::models::{Metric, StudentRecord};

/// Hover card shared by every point of a cluster.
pub fn profile_card(profile: &ClusterProfile) -> String {
    let avg = |m: Metric| profile.average(m).map_or("n/a".to_string(), |v| format!("{v:.1}"));
    format!(
        "<b>{}</b><br>Sleep: {} hrs<br>Study: {} hrs<br>Screen Time: {} hrs<br>Social Media: {} hrs<br>% Female: {:.1}%",
        profile.name,
        avg(Metric::SleepHours),
        avg(Metric::StudyHoursPerDay),
        avg(Metric::NetflixHours),
        avg(Metric::SocialMediaHours),
        profile.pct_female,
    )
}

/// Students on the first two principal components, one trace per persona.
pub fn build(records: &[StudentRecord], clustering: &Clustering) -> Figure {
    let profiles = clustering.profiles(records);

    let data = profiles
        .iter()
        .map(|profile| {
            let points: Vec<_> = clustering
                .assignments
                .iter()
                .filter(|a| a.cluster == profile.cluster)
                .collect();
            let xs: Vec<f64> = points.iter().map(|p| p.pc1).collect();
            let ys: Vec<f64> = points.iter().map(|p| p.pc2).collect();
            // [cluster id, student id] per point; the page looks the profile up by cluster.
            let ids: Vec<Value> = points
                .iter()
                .map(|p| {
                    let student = records.get(p.index).map(|r| r.student_id.as_str());
                    json!([p.cluster, student])
                })
                .collect();
            let cards = vec![profile_card(profile); points.len()];
            json!({
                "type": "scatter",
                "mode": "markers",
                "name": profile.name,
                "x": xs,
                "y": ys,
                "text": cards,
                "customdata": ids,
                "hovertemplate": "%{text}<extra></extra>",
                "marker": {
                    "size": 10,
                    "color": profile.color,
                    "line": {"width": 1, "color": "black"},
                },
            })
        })
        .collect();

    Figure {
        data,
        layout: json!({
            "title": "Patterns of Success: Student Profiles and Habit Clusters",
            "xaxis": {"title": "PC1"},
            "yaxis": {"title": "PC2"},
            "hoverlabel": {"bgcolor": "white", "font": {"size": 12}},
            "legend": {"title": {"text": "cluster_name"}},
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterProfile, CLUSTER_COUNT};
    use crate::models::Persona;

    #[test]
    fn card_lists_rounded_averages() {
        let profile = ClusterProfile {
            cluster: 0,
            persona: Persona::Bookworm,
            name: Persona::Bookworm.name(),
            color: Persona::Bookworm.color(),
            description: Persona::Bookworm.description(),
            count: 3,
            pct_female: 66.666,
            averages: vec![
                (Metric::SleepHours, 6.54),
                (Metric::StudyHoursPerDay, 5.0),
                (Metric::NetflixHours, 0.76),
            ],
        };
        let card = profile_card(&profile);
        assert!(card.starts_with("<b>The Bookworm</b>"));
        assert!(card.contains("Sleep: 6.5 hrs"));
        assert!(card.contains("Screen Time: 0.8 hrs"));
        assert!(card.contains("Social Media: n/a hrs"));
        assert!(card.contains("% Female: 66.7%"));
    }

    #[test]
    fn one_trace_per_cluster() {
        let records: Vec<StudentRecord> = (0..24)
            .map(|i| {
                let c = (i % 4) as f64;
                StudentRecord {
                    student_id: format!("S{i}"),
                    gender: Some("Male".to_string()),
                    study_hours_per_day: Some(c * 2.0 + i as f64 * 0.01),
                    social_media_hours: Some(6.0 - c + i as f64 * 0.01),
                    netflix_hours: Some((c * 3.0) % 5.0),
                    sleep_hours: Some(5.0 + c),
                    mental_health_rating: Some(2.0 + c * 2.0),
                    attendance_percentage: Some(70.0 + c * 8.0),
                    ..Default::default()
                }
            })
            .collect();
        let clustering =
            crate::cluster::cluster_students(&records, &crate::config::ClusteringConfig::default())
                .unwrap();
        let figure = build(&records, &clustering);

        assert_eq!(figure.data.len(), CLUSTER_COUNT);
        let points: usize = figure
            .data
            .iter()
            .map(|t| t["x"].as_array().unwrap().len())
            .sum();
        assert_eq!(points, records.len());

        for (trace, profile) in figure.data.iter().zip(clustering.profiles(&records)) {
            for point in trace["customdata"].as_array().unwrap() {
                assert_eq!(point[0], profile.cluster);
                assert!(point[1].as_str().unwrap().starts_with('S'));
            }
        }
    }
}
