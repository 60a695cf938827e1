use std::fmt::Write;

use chrono::NaiveDate;

use crate::config::RADAR_PROFILE;
use crate::correlation::{correlation_matrix, strongest_pairs, CORRELATION_COLUMNS};
use crate::dashboard::Dashboard;
use crate::error::Result;
use crate::grouping::assign_groups;
use crate::models::{HabitSummary, Metric, PerformanceGroup};
use crate::summary::{in_display_order, summarize_by};

/// Raw (unnormalized) habit means per performance group, Top first.
pub fn group_summaries(dashboard: &Dashboard) -> Result<(Vec<HabitSummary<PerformanceGroup>>, [f64; 2])> {
    let profile = dashboard.profile(RADAR_PROFILE)?;
    let grouping = assign_groups(&dashboard.records, &profile.grouping)?;
    let rows = grouping.rows(&dashboard.records);
    let summaries = summarize_by(&rows, &profile.habits, None);
    Ok((
        in_display_order(&summaries, &PerformanceGroup::DESCENDING),
        grouping.thresholds,
    ))
}

pub fn format_summary_line(summary: &HabitSummary<PerformanceGroup>) -> String {
    let habits: Vec<String> = summary
        .means
        .iter()
        .map(|(habit, mean)| format!("{} {:.2}", habit.label(), mean))
        .collect();
    format!(
        "- {} ({} students): {}",
        summary.group.long_label(),
        summary.count,
        habits.join(", ")
    )
}

pub fn build_report(dashboard: &Dashboard, generated: NaiveDate) -> Result<String> {
    let (summaries, thresholds) = group_summaries(dashboard)?;

    let mut output = String::new();
    let _ = writeln!(output, "# Student Habits vs. Academic Performance");
    let _ = writeln!(
        output,
        "Generated on {} from {} students",
        generated,
        dashboard.records.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance Groups");
    let _ = writeln!(
        output,
        "Exam score thresholds: {:.1} and {:.1}",
        thresholds[0], thresholds[1]
    );

    if summaries.is_empty() {
        let _ = writeln!(output, "No students with complete habit data.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(output, "{}", format_summary_line(summary));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Student Profiles");

    match dashboard.cluster_profiles() {
        Ok(profiles) => {
            for profile in profiles.iter() {
                let avg = |m: Metric| profile.average(m).unwrap_or(f64::NAN);
                let _ = writeln!(
                    output,
                    "- {} ({} students): study {:.1} h, sleep {:.1} h, social media {:.1} h, streaming {:.1} h, {:.1}% female",
                    profile.name,
                    profile.count,
                    avg(Metric::StudyHoursPerDay),
                    avg(Metric::SleepHours),
                    avg(Metric::SocialMediaHours),
                    avg(Metric::NetflixHours),
                    profile.pct_female
                );
            }
        }
        Err(e) => {
            let _ = writeln!(output, "Profiles unavailable: {e}");
        }
    }

    let matrix = correlation_matrix(&dashboard.records, &CORRELATION_COLUMNS);
    let with_score: Vec<_> = strongest_pairs(&matrix)
        .into_iter()
        .filter(|(a, b, _)| *a == Metric::ExamScore || *b == Metric::ExamScore)
        .take(5)
        .collect();

    let _ = writeln!(output);
    let _ = writeln!(output, "## Habits Most Related to Exam Score");

    if with_score.is_empty() {
        let _ = writeln!(output, "Not enough complete rows to correlate.");
    } else {
        for (a, b, r) in with_score {
            let habit = if a == Metric::ExamScore { b } else { a };
            let _ = writeln!(output, "- {}: {:+.2}", habit.label(), r);
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::tests::sample_dashboard;

    #[test]
    fn report_has_every_section() {
        let dashboard = sample_dashboard();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let report = build_report(&dashboard, date).unwrap();

        assert!(report.starts_with("# Student Habits vs. Academic Performance"));
        assert!(report.contains("Generated on 2026-03-01"));
        assert!(report.contains("## Performance Groups"));
        assert!(report.contains("- Top Performers ("));
        assert!(report.contains("## Student Profiles"));
        assert!(report.contains("The Media Addict"));
        assert!(report.contains("## Habits Most Related to Exam Score"));
        assert!(report.contains("Study Hours per Day: +"));
    }

    #[test]
    fn summaries_are_top_first() {
        let dashboard = sample_dashboard();
        let (summaries, thresholds) = group_summaries(&dashboard).unwrap();
        assert_eq!(summaries[0].group, PerformanceGroup::Top);
        assert!(thresholds[0] < thresholds[1]);
    }

    #[test]
    fn summary_line_format() {
        let summary = HabitSummary {
            group: PerformanceGroup::Mid,
            count: 12,
            means: vec![(Metric::SleepHours, 6.4571)],
        };
        assert_eq!(
            format_summary_line(&summary),
            "- Mid-Level Performers (12 students): Sleep Hours 6.46"
        );
    }
}
