//! Configuration file handling.
//!
//! Settings live in `dashboard.toml`. Every section has defaults, so a
//! missing file means "use the built-in profiles".

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::grouping::GroupingScheme;
use crate::models::{Metric, StudentRecord};

pub const DEFAULT_CONFIG_PATH: &str = "dashboard.toml";

pub const RADAR_PROFILE: &str = "radar";
pub const BAR_PROFILE: &str = "bar";
pub const SANKEY_PROFILE: &str = "sankey";
pub const WAFFLE_PROFILE: &str = "waffle";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// Named aggregation profiles. Entries here replace the built-in profile of the same name.
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, AggregationProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            server: ServerConfig::default(),
            clustering: ClusteringConfig::default(),
            profiles: default_profiles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV file with one row per student.
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/student_habits_performance.csv")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Raises the log level to debug so every recompute event is logged.
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8050
}

/// How cluster ids are turned into persona names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaNaming {
    /// Inspect centroids: most screen time is the Media Addict, and so on.
    Centroid,
    /// Fixed id order: 0 Bookworm, 1 Balanced Learner, 2 Media Addict, 3 Minimalist.
    Positional,
}

/// Non-numeric columns that must be present for a row to be clustered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxColumn {
    Gender,
    ParentalEducationLevel,
    PartTimeJob,
    ExtracurricularParticipation,
    InternetQuality,
}

impl AuxColumn {
    pub fn present(self, record: &StudentRecord) -> bool {
        match self {
            AuxColumn::Gender => record.gender.is_some(),
            AuxColumn::ParentalEducationLevel => record.parental_education_level.is_some(),
            AuxColumn::PartTimeJob => record.part_time_job.is_some(),
            AuxColumn::ExtracurricularParticipation => {
                record.extracurricular_participation.is_some()
            }
            AuxColumn::InternetQuality => record.internet_quality.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default = "default_cluster_features")]
    pub features: Vec<Metric>,

    #[serde(default = "default_auxiliary")]
    pub auxiliary: Vec<AuxColumn>,

    /// Seed for k-means++ initialisation. Same seed, same labels.
    #[serde(default)]
    pub seed: u64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Independent k-means runs; the lowest inertia wins.
    #[serde(default = "default_restarts")]
    pub restarts: usize,

    #[serde(default = "default_naming")]
    pub naming: PersonaNaming,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            features: default_cluster_features(),
            auxiliary: default_auxiliary(),
            seed: 0,
            max_iterations: default_max_iterations(),
            restarts: default_restarts(),
            naming: default_naming(),
        }
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<()> {
        if !(6..=9).contains(&self.features.len()) {
            return Err(DashboardError::Config(format!(
                "clustering needs 6 to 9 features, got {}",
                self.features.len()
            )));
        }
        if has_duplicates(&self.features) {
            return Err(DashboardError::Config(
                "clustering features must be unique".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_cluster_features() -> Vec<Metric> {
    vec![
        Metric::SleepHours,
        Metric::StudyHoursPerDay,
        Metric::NetflixHours,
        Metric::MentalHealthRating,
        Metric::SocialMediaHours,
        Metric::AttendancePercentage,
    ]
}

fn default_auxiliary() -> Vec<AuxColumn> {
    vec![AuxColumn::Gender]
}

fn default_max_iterations() -> usize {
    300
}

fn default_restarts() -> usize {
    10
}

fn default_naming() -> PersonaNaming {
    PersonaNaming::Centroid
}

/// One named way of grouping and summarizing habits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationProfile {
    pub grouping: GroupingScheme,

    #[serde(default = "default_habits")]
    pub habits: Vec<Metric>,

    /// Min-max target range, e.g. `[0.0, 5.0]`.
    #[serde(default)]
    pub normalize: Option<[f64; 2]>,
}

impl AggregationProfile {
    pub fn normalize_range(&self) -> Option<(f64, f64)> {
        self.normalize.map(|[lo, hi]| (lo, hi))
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        self.grouping
            .validate()
            .map_err(|e| DashboardError::Config(format!("profile {name}: {e}")))?;
        if self.habits.is_empty() || has_duplicates(&self.habits) {
            return Err(DashboardError::Config(format!(
                "profile {name}: habits must be a non-empty list of distinct columns"
            )));
        }
        if let Some([lo, hi]) = self.normalize {
            if !(lo < hi) {
                return Err(DashboardError::Config(format!(
                    "profile {name}: normalize range must satisfy lo < hi"
                )));
            }
        }
        Ok(())
    }
}

/// Habits compared across performance groups, in chart order.
pub fn default_habits() -> Vec<Metric> {
    vec![
        Metric::StudyHoursPerDay,
        Metric::SocialMediaHours,
        Metric::NetflixHours,
        Metric::SleepHours,
        Metric::DietQuality,
        Metric::ExerciseFrequency,
        Metric::MentalHealthRating,
    ]
}

fn default_profiles() -> BTreeMap<String, AggregationProfile> {
    let mut profiles = BTreeMap::new();
    profiles.insert(
        RADAR_PROFILE.to_string(),
        AggregationProfile {
            grouping: GroupingScheme::Tiered { cut_points: [0.5, 0.85] },
            habits: default_habits(),
            normalize: Some([0.0, 5.0]),
        },
    );
    profiles.insert(
        BAR_PROFILE.to_string(),
        AggregationProfile {
            grouping: GroupingScheme::Extremes { low: 0.4, high: 0.8 },
            habits: vec![
                Metric::StudyHoursPerDay,
                Metric::SleepHours,
                Metric::SocialMediaHours,
                Metric::NetflixHours,
                Metric::ExerciseFrequency,
                Metric::MentalHealthRating,
                Metric::DietQuality,
            ],
            normalize: None,
        },
    );
    profiles.insert(
        SANKEY_PROFILE.to_string(),
        AggregationProfile {
            grouping: GroupingScheme::Tiered { cut_points: [0.25, 0.75] },
            habits: vec![
                Metric::StudyHoursPerDay,
                Metric::SleepHours,
                Metric::SocialMediaHours,
                Metric::NetflixHours,
                Metric::ExerciseFrequency,
                Metric::MentalHealthRating,
                Metric::DietQuality,
            ],
            normalize: None,
        },
    );
    profiles.insert(
        WAFFLE_PROFILE.to_string(),
        AggregationProfile {
            grouping: GroupingScheme::Tiered { cut_points: [0.25, 0.75] },
            habits: default_habits(),
            normalize: None,
        },
    );
    profiles
}

fn has_duplicates(metrics: &[Metric]) -> bool {
    let mut sorted = metrics.to_vec();
    sorted.sort();
    sorted.windows(2).any(|w| w[0] == w[1])
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // User profiles extend the built-in set rather than replacing it wholesale.
        for (name, profile) in default_profiles() {
            config.profiles.entry(name).or_insert(profile);
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.clustering.validate()?;
        for (name, profile) in &self.profiles {
            profile.validate(name)?;
        }
        for required in [RADAR_PROFILE, BAR_PROFILE, SANKEY_PROFILE, WAFFLE_PROFILE] {
            self.profile(required)?;
        }
        let radar = self.profile(RADAR_PROFILE)?;
        if !matches!(radar.grouping, GroupingScheme::Tiered { .. }) || radar.normalize.is_none() {
            return Err(DashboardError::Config(
                "the radar profile needs a tiered grouping and a normalize range".to_string(),
            ));
        }
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Result<&AggregationProfile> {
        self.profiles
            .get(name)
            .ok_or_else(|| DashboardError::UnknownProfile(name.to_string()))
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8050);
        assert_eq!(config.clustering.features.len(), 6);
        assert_eq!(config.clustering.naming, PersonaNaming::Centroid);
        let radar = config.profile(RADAR_PROFILE).unwrap();
        assert_eq!(radar.normalize_range(), Some((0.0, 5.0)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[data]
path = "students.csv"

[server]
port = 9000

[clustering]
seed = 42
naming = "positional"
features = ["sleep_hours", "study_hours_per_day", "netflix_hours",
            "mental_health_rating", "social_media_hours", "attendance_percentage",
            "exercise_frequency"]

[profiles.radar.grouping]
scheme = "tiered"
cut_points = [0.4, 0.8]

[profiles.radar]
normalize = [0.0, 1.0]
"#;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.toml");
        std::fs::write(&path, toml_content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.data.path, PathBuf::from("students.csv"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.clustering.seed, 42);
        assert_eq!(config.clustering.naming, PersonaNaming::Positional);
        assert_eq!(config.clustering.features.len(), 7);

        let radar = config.profile(RADAR_PROFILE).unwrap();
        assert_eq!(
            radar.grouping,
            GroupingScheme::Tiered { cut_points: [0.4, 0.8] }
        );
        assert_eq!(radar.habits, default_habits());
        assert!(config.profile(BAR_PROFILE).is_ok());
    }

    #[test]
    fn rejects_unknown_columns() {
        let toml_content = r#"
[clustering]
features = ["sleep_hours", "shoe_size"]
"#;
        assert!(toml::from_str::<Config>(toml_content).is_err());
    }

    #[test]
    fn rejects_bad_profiles() {
        let mut config = Config::default();
        config.profiles.insert(
            "broken".to_string(),
            AggregationProfile {
                grouping: GroupingScheme::Tiered { cut_points: [0.9, 0.1] },
                habits: default_habits(),
                normalize: None,
            },
        );
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.clustering.features.truncate(3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[clustering]"));
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.profiles.len(), 4);
    }
}
