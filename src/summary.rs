//! Per-group habit means and demographic bucket counts.

use std::collections::BTreeMap;

use crate::models::{HabitSummary, Metric, PerformanceGroup, StudentRecord};
use crate::stats::{self, MinMaxScaler};

/// Mean of every habit per group key.
///
/// Rows missing any of `habits` are dropped first. With `normalize`, each
/// habit is min-max scaled onto `(lo, hi)` using bounds from all surviving
/// rows, before grouping. Groups with no rows never appear in the output.
pub fn summarize_by<K: Ord + Clone>(
    rows: &[(&StudentRecord, K)],
    habits: &[Metric],
    normalize: Option<(f64, f64)>,
) -> Vec<HabitSummary<K>> {
    let complete: Vec<(Vec<f64>, &K)> = rows
        .iter()
        .filter_map(|(record, key)| Metric::values(habits, record).map(|v| (v, key)))
        .collect();

    let scaler = normalize.and_then(|(lo, hi)| {
        let matrix: Vec<Vec<f64>> = complete.iter().map(|(v, _)| v.clone()).collect();
        MinMaxScaler::fit(&matrix, lo, hi)
    });

    let mut buckets: BTreeMap<K, Vec<Vec<f64>>> = BTreeMap::new();
    for (values, key) in complete {
        let values = match &scaler {
            Some(s) => s.transform(&values),
            None => values,
        };
        buckets.entry(key.clone()).or_default().push(values);
    }

    buckets
        .into_iter()
        .map(|(group, members)| {
            let count = members.len();
            let means = habits
                .iter()
                .enumerate()
                .map(|(j, habit)| {
                    let sum: f64 = members.iter().map(|m| m[j]).sum();
                    (*habit, sum / count as f64)
                })
                .collect();
            HabitSummary { group, count, means }
        })
        .collect()
}

/// Mean of each habit computed independently, skipping missing values per column.
pub fn column_means(records: &[&StudentRecord], habits: &[Metric]) -> Vec<(Metric, f64)> {
    habits
        .iter()
        .map(|habit| {
            let values: Vec<f64> = records.iter().filter_map(|r| habit.value(r)).collect();
            (*habit, stats::mean(&values).unwrap_or(f64::NAN))
        })
        .collect()
}

/// Reorders performance-group summaries for display. Absent groups are skipped.
pub fn in_display_order(
    summaries: &[HabitSummary<PerformanceGroup>],
    order: &[PerformanceGroup],
) -> Vec<HabitSummary<PerformanceGroup>> {
    order
        .iter()
        .filter_map(|g| summaries.iter().find(|s| s.group == *g).cloned())
        .collect()
}

/// Left-hand dimension of the flow diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demographic {
    Age,
    Gender,
}

impl Demographic {
    pub fn key(self, record: &StudentRecord) -> Option<String> {
        match self {
            Demographic::Age => record.age.map(|a| a.to_string()),
            Demographic::Gender => record.gender.clone(),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Demographic::Age => "Age",
            Demographic::Gender => "Gender",
        }
    }

    /// Distinct values in display order: ages descending, genders ascending.
    pub fn ordered_values(self, rows: &[(&StudentRecord, PerformanceGroup)]) -> Vec<String> {
        match self {
            Demographic::Age => {
                let mut ages: Vec<u32> = rows.iter().filter_map(|(r, _)| r.age).collect();
                ages.sort_unstable_by(|a, b| b.cmp(a));
                ages.dedup();
                ages.into_iter().map(|a| a.to_string()).collect()
            }
            Demographic::Gender => {
                let mut genders: Vec<String> =
                    rows.iter().filter_map(|(r, _)| r.gender.clone()).collect();
                genders.sort();
                genders.dedup();
                genders
            }
        }
    }
}

impl std::str::FromStr for Demographic {
    type Err = crate::error::DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "age" => Ok(Demographic::Age),
            "gender" => Ok(Demographic::Gender),
            other => Err(crate::error::DashboardError::InvalidInput(format!(
                "left dimension must be age or gender, got {other:?}"
            ))),
        }
    }
}

/// Aggregate for one (demographic value, performance group) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowCell {
    pub bucket: String,
    pub group: PerformanceGroup,
    pub count: usize,
    /// Mean of the habit, or 0.0 when the pair is empty.
    pub mean: f64,
}

/// Mean habit and count for every (bucket, group) pair, in bucket-major order.
///
/// Empty pairs are kept with a zero mean so that link positions stay fixed
/// when the selected habit changes.
pub fn flow_cells(
    rows: &[(&StudentRecord, PerformanceGroup)],
    demographic: Demographic,
    habit: Metric,
) -> Vec<FlowCell> {
    let buckets = demographic.ordered_values(rows);
    let mut cells = Vec::with_capacity(buckets.len() * 3);

    for bucket in buckets {
        for group in PerformanceGroup::ASCENDING {
            let members: Vec<&StudentRecord> = rows
                .iter()
                .filter(|(r, g)| *g == group && demographic.key(r).as_deref() == Some(bucket.as_str()))
                .map(|(r, _)| *r)
                .collect();
            let values: Vec<f64> = members.iter().filter_map(|r| habit.value(r)).collect();
            cells.push(FlowCell {
                bucket: bucket.clone(),
                group,
                count: members.len(),
                mean: stats::mean(&values).unwrap_or(0.0),
            });
        }
    }
    cells
}

/// Number of labelled students per (bucket value, performance group).
pub fn bucket_counts<F>(
    rows: &[(&StudentRecord, PerformanceGroup)],
    bucket: F,
) -> BTreeMap<(String, PerformanceGroup), usize>
where
    F: Fn(&StudentRecord) -> Option<String>,
{
    let mut counts = BTreeMap::new();
    for (record, group) in rows {
        if let Some(key) = bucket(record) {
            *counts.entry((key, *group)).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(study: Option<f64>, sleep: f64, age: u32, gender: &str) -> StudentRecord {
        StudentRecord {
            student_id: "S".to_string(),
            study_hours_per_day: study,
            sleep_hours: Some(sleep),
            age: Some(age),
            gender: Some(gender.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn groups_without_rows_are_omitted() {
        let a = student(Some(2.0), 6.0, 20, "Male");
        let b = student(Some(4.0), 8.0, 21, "Female");
        let rows = vec![(&a, PerformanceGroup::Low), (&b, PerformanceGroup::Low)];
        let summaries = summarize_by(&rows, &[Metric::StudyHoursPerDay, Metric::SleepHours], None);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].group, PerformanceGroup::Low);
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].mean(Metric::StudyHoursPerDay), Some(3.0));
        assert_eq!(summaries[0].mean(Metric::SleepHours), Some(7.0));
    }

    #[test]
    fn counts_sum_to_complete_labelled_rows() {
        let records: Vec<StudentRecord> = (0..9)
            .map(|i| student(if i == 4 { None } else { Some(i as f64) }, 7.0, 20, "Male"))
            .collect();
        let groups = [PerformanceGroup::Low, PerformanceGroup::Mid, PerformanceGroup::Top];
        let rows: Vec<_> = records.iter().enumerate().map(|(i, r)| (r, groups[i % 3])).collect();

        let summaries = summarize_by(&rows, &[Metric::StudyHoursPerDay], None);
        let total: usize = summaries.iter().map(|s| s.count).sum();
        assert_eq!(total, 8);
    }

    #[test]
    fn normalization_is_fit_before_grouping() {
        let low = student(Some(0.0), 4.0, 20, "Male");
        let mid = student(Some(5.0), 6.0, 20, "Male");
        let top = student(Some(10.0), 8.0, 20, "Male");
        let rows = vec![
            (&low, PerformanceGroup::Low),
            (&mid, PerformanceGroup::Mid),
            (&top, PerformanceGroup::Top),
        ];
        let summaries = summarize_by(
            &rows,
            &[Metric::StudyHoursPerDay, Metric::SleepHours],
            Some((0.0, 5.0)),
        );

        let by_group = |g| summaries.iter().find(|s| s.group == g).unwrap();
        assert_eq!(by_group(PerformanceGroup::Low).mean(Metric::StudyHoursPerDay), Some(0.0));
        assert_eq!(by_group(PerformanceGroup::Top).mean(Metric::StudyHoursPerDay), Some(5.0));
        assert_eq!(by_group(PerformanceGroup::Mid).mean(Metric::SleepHours), Some(2.5));
    }

    #[test]
    fn display_order_is_applied_on_top() {
        let a = student(Some(1.0), 6.0, 20, "Male");
        let b = student(Some(2.0), 6.0, 20, "Male");
        let rows = vec![(&a, PerformanceGroup::Low), (&b, PerformanceGroup::Top)];
        let summaries = summarize_by(&rows, &[Metric::StudyHoursPerDay], None);
        let ordered = in_display_order(&summaries, &PerformanceGroup::DESCENDING);
        let groups: Vec<_> = ordered.iter().map(|s| s.group).collect();
        assert_eq!(groups, vec![PerformanceGroup::Top, PerformanceGroup::Low]);
    }

    #[test]
    fn flow_cells_cover_every_pair() {
        let a = student(Some(2.0), 6.0, 19, "Male");
        let b = student(Some(4.0), 8.0, 22, "Female");
        let c = student(Some(6.0), 7.0, 22, "Female");
        let rows = vec![
            (&a, PerformanceGroup::Low),
            (&b, PerformanceGroup::Top),
            (&c, PerformanceGroup::Top),
        ];

        let cells = flow_cells(&rows, Demographic::Age, Metric::StudyHoursPerDay);
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0].bucket, "22");
        assert_eq!(cells[2].group, PerformanceGroup::Top);
        assert_eq!(cells[2].count, 2);
        assert_eq!(cells[2].mean, 5.0);
        assert_eq!(cells[3].bucket, "19");
        assert_eq!(cells[4].count, 0);
        assert_eq!(cells[4].mean, 0.0);

        let by_gender = flow_cells(&rows, Demographic::Gender, Metric::SleepHours);
        assert_eq!(by_gender[0].bucket, "Female");
    }

    #[test]
    fn bucket_counts_by_education() {
        let mut a = student(Some(1.0), 6.0, 20, "Male");
        a.parental_education_level = Some("Master".to_string());
        let mut b = a.clone();
        b.parental_education_level = Some("Bachelor".to_string());
        let rows = vec![
            (&a, PerformanceGroup::Top),
            (&a, PerformanceGroup::Top),
            (&b, PerformanceGroup::Low),
        ];
        let counts = bucket_counts(&rows, |r| r.parental_education_level.clone());
        assert_eq!(counts[&("Master".to_string(), PerformanceGroup::Top)], 2);
        assert_eq!(counts.get(&("Master".to_string(), PerformanceGroup::Low)), None);
    }

    #[test]
    fn demographic_parses_selector() {
        assert_eq!("Age".parse::<Demographic>().unwrap(), Demographic::Age);
        assert!("income".parse::<Demographic>().is_err());
    }
}
