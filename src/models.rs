use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DashboardError;

/// One row of the source table. Optional fields are empty cells in the CSV.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub study_hours_per_day: Option<f64>,
    pub social_media_hours: Option<f64>,
    pub netflix_hours: Option<f64>,
    #[serde(deserialize_with = "yes_no")]
    pub part_time_job: Option<bool>,
    pub attendance_percentage: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub diet_quality: Option<DietQuality>,
    pub exercise_frequency: Option<f64>,
    pub parental_education_level: Option<String>,
    #[serde(default)]
    pub internet_quality: Option<String>,
    pub mental_health_rating: Option<f64>,
    #[serde(deserialize_with = "yes_no")]
    pub extracurricular_participation: Option<bool>,
    pub exam_score: Option<f64>,
}

impl StudentRecord {
    pub fn is_female(&self) -> bool {
        self.gender
            .as_deref()
            .is_some_and(|g| g.eq_ignore_ascii_case("female"))
    }
}

fn yes_no<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("yes") => Ok(Some(true)),
        Some(v) if v.eq_ignore_ascii_case("no") => Ok(Some(false)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected Yes or No, got {other:?}"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum DietQuality {
    Poor,
    Fair,
    Good,
}

impl DietQuality {
    /// Ordinal encoding used wherever diet is averaged.
    pub fn score(self) -> f64 {
        match self {
            DietQuality::Poor => 1.0,
            DietQuality::Fair => 2.0,
            DietQuality::Good => 3.0,
        }
    }
}

/// Numeric columns that aggregations can select by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    StudyHoursPerDay,
    SocialMediaHours,
    NetflixHours,
    SleepHours,
    DietQuality,
    ExerciseFrequency,
    MentalHealthRating,
    AttendancePercentage,
    ExamScore,
    Age,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::StudyHoursPerDay,
        Metric::SocialMediaHours,
        Metric::NetflixHours,
        Metric::SleepHours,
        Metric::DietQuality,
        Metric::ExerciseFrequency,
        Metric::MentalHealthRating,
        Metric::AttendancePercentage,
        Metric::ExamScore,
        Metric::Age,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Metric::StudyHoursPerDay => "study_hours_per_day",
            Metric::SocialMediaHours => "social_media_hours",
            Metric::NetflixHours => "netflix_hours",
            Metric::SleepHours => "sleep_hours",
            Metric::DietQuality => "diet_quality",
            Metric::ExerciseFrequency => "exercise_frequency",
            Metric::MentalHealthRating => "mental_health_rating",
            Metric::AttendancePercentage => "attendance_percentage",
            Metric::ExamScore => "exam_score",
            Metric::Age => "age",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::StudyHoursPerDay => "Study Hours per Day",
            Metric::SocialMediaHours => "Social Media Hours",
            Metric::NetflixHours => "Netflix Hours",
            Metric::SleepHours => "Sleep Hours",
            Metric::DietQuality => "Diet Quality",
            Metric::ExerciseFrequency => "Exercise Frequency",
            Metric::MentalHealthRating => "Mental Health Rating",
            Metric::AttendancePercentage => "Attendance Percentage",
            Metric::ExamScore => "Exam Score",
            Metric::Age => "Age",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::StudyHoursPerDay
            | Metric::SocialMediaHours
            | Metric::NetflixHours
            | Metric::SleepHours => "hours",
            Metric::ExerciseFrequency => "times/week",
            Metric::MentalHealthRating => "(1–10 scale)",
            Metric::DietQuality => "(1–3 scale)",
            Metric::AttendancePercentage => "%",
            Metric::ExamScore => "points",
            Metric::Age => "years",
        }
    }

    pub fn value(self, record: &StudentRecord) -> Option<f64> {
        let value = match self {
            Metric::StudyHoursPerDay => record.study_hours_per_day,
            Metric::SocialMediaHours => record.social_media_hours,
            Metric::NetflixHours => record.netflix_hours,
            Metric::SleepHours => record.sleep_hours,
            Metric::DietQuality => record.diet_quality.map(DietQuality::score),
            Metric::ExerciseFrequency => record.exercise_frequency,
            Metric::MentalHealthRating => record.mental_health_rating,
            Metric::AttendancePercentage => record.attendance_percentage,
            Metric::ExamScore => record.exam_score,
            Metric::Age => record.age.map(f64::from),
        };
        value.filter(|v| v.is_finite())
    }

    /// Collects the values of `metrics` for one record, or `None` if any is missing.
    pub fn values(metrics: &[Metric], record: &StudentRecord) -> Option<Vec<f64>> {
        metrics.iter().map(|m| m.value(record)).collect()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Metric {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.column() == trimmed || (trimmed == "diet_quality_numeric" && *m == Metric::DietQuality))
            .ok_or_else(|| DashboardError::InvalidInput(format!("unknown column {trimmed:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PerformanceGroup {
    Low,
    Mid,
    Top,
}

impl PerformanceGroup {
    pub const ASCENDING: [PerformanceGroup; 3] =
        [PerformanceGroup::Low, PerformanceGroup::Mid, PerformanceGroup::Top];
    pub const DESCENDING: [PerformanceGroup; 3] =
        [PerformanceGroup::Top, PerformanceGroup::Mid, PerformanceGroup::Low];

    pub fn short_label(self) -> &'static str {
        match self {
            PerformanceGroup::Low => "Low",
            PerformanceGroup::Mid => "Mid",
            PerformanceGroup::Top => "Top",
        }
    }

    pub fn long_label(self) -> &'static str {
        match self {
            PerformanceGroup::Low => "Low Performers",
            PerformanceGroup::Mid => "Mid-Level Performers",
            PerformanceGroup::Top => "Top Performers",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            PerformanceGroup::Low => "red",
            PerformanceGroup::Mid => "orange",
            PerformanceGroup::Top => "green",
        }
    }
}

impl fmt::Display for PerformanceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_label())
    }
}

/// The four behavioural archetypes produced by clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Persona {
    Bookworm,
    BalancedLearner,
    MediaAddict,
    Minimalist,
}

impl Persona {
    /// Positional order: cluster id `i` maps to `POSITIONAL[i]` under positional naming.
    pub const POSITIONAL: [Persona; 4] = [
        Persona::Bookworm,
        Persona::BalancedLearner,
        Persona::MediaAddict,
        Persona::Minimalist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Persona::Bookworm => "The Bookworm",
            Persona::BalancedLearner => "The Balanced Learner",
            Persona::MediaAddict => "The Media Addict",
            Persona::Minimalist => "The Minimalist",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Persona::Bookworm => "#1f77b4",
            Persona::BalancedLearner => "#2ca02c",
            Persona::MediaAddict => "#d62728",
            Persona::Minimalist => "#9467bd",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Persona::Bookworm => "Long study sessions, little time spent on screens.",
            Persona::BalancedLearner => "Moderate habits across study, rest and leisure.",
            Persona::MediaAddict => "Heavy social media and streaming use.",
            Persona::Minimalist => "Low engagement across most tracked habits.",
        }
    }

    pub fn from_name(name: &str) -> Option<Persona> {
        Persona::POSITIONAL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mean of each habit over one group of records.
#[derive(Debug, Clone, Serialize)]
pub struct HabitSummary<K> {
    pub group: K,
    pub count: usize,
    pub means: Vec<(Metric, f64)>,
}

impl<K> HabitSummary<K> {
    pub fn mean(&self, metric: Metric) -> Option<f64> {
        self.means
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<Metric>,
    pub values: Vec<Vec<f64>>,
    pub rows_used: usize,
}

impl CorrelationMatrix {
    #[cfg(test)]
    pub fn get(&self, a: Metric, b: Metric) -> Option<f64> {
        let i = self.columns.iter().position(|c| *c == a)?;
        let j = self.columns.iter().position(|c| *c == b)?;
        Some(self.values[i][j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diet_quality_maps_to_ordinal_score() {
        let record = StudentRecord {
            diet_quality: Some(DietQuality::Fair),
            ..Default::default()
        };
        assert_eq!(Metric::DietQuality.value(&record), Some(2.0));
    }

    #[test]
    fn metric_parses_column_names() {
        assert_eq!("sleep_hours".parse::<Metric>().unwrap(), Metric::SleepHours);
        assert_eq!(
            "diet_quality_numeric".parse::<Metric>().unwrap(),
            Metric::DietQuality
        );
        assert!("shoe_size".parse::<Metric>().is_err());
    }

    #[test]
    fn values_fail_when_any_metric_missing() {
        let record = StudentRecord {
            sleep_hours: Some(7.0),
            ..Default::default()
        };
        assert_eq!(Metric::values(&[Metric::SleepHours], &record), Some(vec![7.0]));
        assert_eq!(
            Metric::values(&[Metric::SleepHours, Metric::NetflixHours], &record),
            None
        );
    }

    #[test]
    fn gender_match_ignores_case() {
        let record = StudentRecord {
            gender: Some("Female".to_string()),
            ..Default::default()
        };
        assert!(record.is_female());
    }

    #[test]
    fn persona_round_trips_through_name() {
        for persona in Persona::POSITIONAL {
            assert_eq!(Persona::from_name(persona.name()), Some(persona));
        }
    }
}
